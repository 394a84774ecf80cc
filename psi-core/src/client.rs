//! Client side of the PSI protocol.

use crate::crypto::{PrivateKey, KEY_SIZE};
use crate::error::{PsiError, Result};
use crate::messages::{Request, Response, ServerSetup};
use curve25519_dalek::ristretto::CompressedRistretto;
use log::debug;
use std::fmt;

/// Client side of a PSI session.
///
/// The client blinds its elements into a [`Request`], and once it holds the
/// server's [`ServerSetup`] and [`Response`] it strips its own blinding and
/// looks the results up in the setup.
///
/// A client created with `reveal_intersection` learns which of its elements
/// are in the intersection; otherwise it only learns how many are.
pub struct PsiClient {
    key: Option<PrivateKey>,
    reveal_intersection: bool,
    /// Original input index of each element of the last request, in request
    /// order. Only kept when revealing the intersection.
    permutation: Option<Vec<usize>>,
}

impl PsiClient {
    /// Create a client with a fresh random key.
    pub fn create_with_new_key(reveal_intersection: bool) -> Result<Self> {
        Ok(Self::with_key(PrivateKey::random(), reveal_intersection))
    }

    /// Create a client from a key previously returned by
    /// [`get_private_key_bytes`](Self::get_private_key_bytes).
    ///
    /// # Errors
    /// Returns `PsiError::InvalidKey` if `key_bytes` is not a valid 32-byte
    /// scalar
    pub fn create_from_key(key_bytes: &[u8], reveal_intersection: bool) -> Result<Self> {
        Ok(Self::with_key(
            PrivateKey::from_bytes(key_bytes)?,
            reveal_intersection,
        ))
    }

    fn with_key(key: PrivateKey, reveal_intersection: bool) -> Self {
        Self {
            key: Some(key),
            reveal_intersection,
            permutation: None,
        }
    }

    fn key(&self) -> Result<&PrivateKey> {
        self.key.as_ref().ok_or(PsiError::InstanceDeleted)
    }

    /// Whether this client learns the intersection itself rather than its
    /// size.
    pub fn reveal_intersection(&self) -> bool {
        self.reveal_intersection
    }

    /// Blind `inputs` into a request for the server.
    ///
    /// The blinded elements are sorted by their bytes so the server cannot
    /// link them to input positions. In reveal mode the client remembers the
    /// permutation to map results back, which is why this takes `&mut self`;
    /// a later call replaces it.
    pub fn create_request<T: AsRef<[u8]>>(&mut self, inputs: &[T]) -> Result<Request> {
        let key = self.key()?;

        let mut encrypted: Vec<(CompressedRistretto, usize)> = inputs
            .iter()
            .enumerate()
            .map(|(index, input)| (key.encrypt(input.as_ref()), index))
            .collect();
        encrypted.sort_unstable_by(|a, b| a.0.as_bytes().cmp(b.0.as_bytes()));

        let (elements, permutation): (Vec<_>, Vec<_>) = encrypted.into_iter().unzip();
        self.permutation = self.reveal_intersection.then_some(permutation);

        debug!(
            "Created request with {} elements (reveal_intersection = {})",
            elements.len(),
            self.reveal_intersection
        );
        Ok(Request::new(elements, self.reveal_intersection))
    }

    /// Number of the client's elements that are in the server's set.
    ///
    /// With a Bloom filter or GCS setup this may over-count by the false
    /// positives the setup was sized for.
    ///
    /// # Errors
    /// Returns `PsiError::RevealModeMismatch` if `response` was produced in the
    /// other mode, and `PsiError::MalformedMessage` if it holds an invalid
    /// group element
    pub fn get_intersection_size(
        &self,
        server_setup: &ServerSetup,
        response: &Response,
    ) -> Result<usize> {
        let matches = self.process_response(server_setup, response)?;
        Ok(matches.len())
    }

    /// Indices into the inputs of the last [`create_request`](Self::create_request)
    /// call that are in the server's set, ascending.
    ///
    /// # Errors
    /// - `PsiError::RevealModeMismatch` if this client or `response` is not in
    ///   reveal mode
    /// - `PsiError::MissingRequest` if no request was created
    /// - `PsiError::MalformedMessage` if `response` does not answer the last
    ///   request
    pub fn get_intersection(
        &self,
        server_setup: &ServerSetup,
        response: &Response,
    ) -> Result<Vec<usize>> {
        self.key()?;
        if !self.reveal_intersection {
            return Err(PsiError::RevealModeMismatch {
                expected: true,
                actual: false,
            });
        }
        self.check_response_mode(response)?;

        let permutation = self.permutation.as_ref().ok_or(PsiError::MissingRequest)?;
        if response.len() != permutation.len() {
            return Err(PsiError::MalformedMessage(format!(
                "response has {} elements, request had {}",
                response.len(),
                permutation.len()
            )));
        }

        let mut indices: Vec<usize> = self
            .process_response(server_setup, response)?
            .into_iter()
            .map(|position| permutation[position])
            .collect();
        indices.sort_unstable();
        Ok(indices)
    }

    fn check_response_mode(&self, response: &Response) -> Result<()> {
        if response.reveal_intersection != self.reveal_intersection {
            return Err(PsiError::RevealModeMismatch {
                expected: self.reveal_intersection,
                actual: response.reveal_intersection,
            });
        }
        Ok(())
    }

    /// Unblind the response and return the positions that match the setup.
    fn process_response(
        &self,
        server_setup: &ServerSetup,
        response: &Response,
    ) -> Result<Vec<usize>> {
        let key = self.key()?;
        self.check_response_mode(response)?;

        let inverse = key.invert()?;
        let unblinded = response
            .encrypted_elements
            .iter()
            .enumerate()
            .map(|(index, element)| {
                inverse.re_encrypt(element).map_err(|_| {
                    PsiError::MalformedMessage(format!(
                        "response element {} is not a valid group element",
                        index
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let matches = server_setup.intersect(&unblinded);
        debug!(
            "{} of {} response elements found in {:?} setup",
            matches.len(),
            unblinded.len(),
            server_setup.data_structure()
        );
        Ok(matches)
    }

    /// This client's private key. DO NOT SEND THIS KEY TO ANY OTHER PARTY!
    pub fn get_private_key_bytes(&self) -> Result<[u8; KEY_SIZE]> {
        Ok(self.key()?.to_bytes())
    }

    /// Wipe the key and the stored permutation. Every later call, including
    /// another `delete`, fails with `PsiError::InstanceDeleted`.
    pub fn delete(&mut self) -> Result<()> {
        self.permutation = None;
        match self.key.take() {
            Some(_) => Ok(()),
            None => Err(PsiError::InstanceDeleted),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.key.is_none()
    }
}

impl fmt::Debug for PsiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PsiClient")
            .field("reveal_intersection", &self.reveal_intersection)
            .field("deleted", &self.is_deleted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datastructure::DataStructure;
    use crate::server::PsiServer;

    fn inputs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("Element {}", i)).collect()
    }

    #[test]
    fn test_key_round_trip() {
        let client = PsiClient::create_with_new_key(true).unwrap();
        let bytes = client.get_private_key_bytes().unwrap();
        let loaded = PsiClient::create_from_key(&bytes, false).unwrap();
        assert_eq!(loaded.get_private_key_bytes().unwrap(), bytes);
        assert!(!loaded.reveal_intersection());
    }

    #[test]
    fn test_create_from_invalid_key() {
        assert!(matches!(
            PsiClient::create_from_key(&[0u8; 32], true),
            Err(PsiError::InvalidKey(_))
        ));
        assert!(matches!(
            PsiClient::create_from_key(&[], false),
            Err(PsiError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_request_is_sorted_permutation_of_inputs() {
        let mut client = PsiClient::create_with_new_key(true).unwrap();
        let key = PrivateKey::from_bytes(&client.get_private_key_bytes().unwrap()).unwrap();
        let inputs = inputs(25);

        let request = client.create_request(&inputs).unwrap();
        assert!(request.reveal_intersection);
        assert_eq!(request.len(), 25);
        assert!(request
            .encrypted_elements
            .windows(2)
            .all(|pair| pair[0].as_bytes() < pair[1].as_bytes()));

        let permutation = client.permutation.as_ref().unwrap();
        for (element, index) in request.encrypted_elements.iter().zip(permutation) {
            assert_eq!(*element, key.encrypt(inputs[*index].as_bytes()));
        }
    }

    #[test]
    fn test_cardinality_client_keeps_no_permutation() {
        let mut client = PsiClient::create_with_new_key(false).unwrap();
        let request = client.create_request(&inputs(5)).unwrap();
        assert!(!request.reveal_intersection);
        assert!(client.permutation.is_none());
    }

    #[test]
    fn test_empty_request() {
        let mut client = PsiClient::create_with_new_key(true).unwrap();
        let request = client.create_request::<&str>(&[]).unwrap();
        assert!(request.is_empty());
    }

    #[test]
    fn test_intersection() {
        let server = PsiServer::create_with_new_key(true).unwrap();
        let mut client = PsiClient::create_with_new_key(true).unwrap();
        let server_inputs = ["Element 1", "Element 3", "Element 4", "other"];

        let setup = server
            .create_setup_message(1e-9, 6, &server_inputs, DataStructure::Raw)
            .unwrap();
        let request = client.create_request(&inputs(6)).unwrap();
        let response = server.process_request(&request).unwrap();

        assert_eq!(
            client.get_intersection(&setup, &response).unwrap(),
            vec![1, 3, 4]
        );
        assert_eq!(client.get_intersection_size(&setup, &response).unwrap(), 3);
    }

    #[test]
    fn test_get_intersection_requires_reveal_client() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        let mut client = PsiClient::create_with_new_key(false).unwrap();
        let setup = server
            .create_setup_message(0.01, 3, &["a"], DataStructure::Gcs)
            .unwrap();
        let response = server
            .process_request(&client.create_request(&["a", "b", "c"]).unwrap())
            .unwrap();

        assert_eq!(
            client.get_intersection(&setup, &response).unwrap_err(),
            PsiError::RevealModeMismatch {
                expected: true,
                actual: false
            }
        );
    }

    #[test]
    fn test_response_mode_must_match_client() {
        // same key, one server per mode
        let counting_server = PsiServer::create_with_new_key(false).unwrap();
        let revealing_server = PsiServer::create_from_key(
            &counting_server.get_private_key_bytes().unwrap(),
            true,
        )
        .unwrap();
        let setup = counting_server
            .create_setup_message(0.01, 3, &["a"], DataStructure::Raw)
            .unwrap();

        let mut revealing = PsiClient::create_with_new_key(true).unwrap();
        let mut request = revealing.create_request(&["a", "b"]).unwrap();
        request.reveal_intersection = false;
        let response = counting_server.process_request(&request).unwrap();
        assert_eq!(
            revealing.get_intersection(&setup, &response).unwrap_err(),
            PsiError::RevealModeMismatch {
                expected: true,
                actual: false
            }
        );
        assert!(matches!(
            revealing.get_intersection_size(&setup, &response),
            Err(PsiError::RevealModeMismatch { .. })
        ));

        let mut counting = PsiClient::create_with_new_key(false).unwrap();
        let mut request = counting.create_request(&["a", "b"]).unwrap();
        request.reveal_intersection = true;
        let response = revealing_server.process_request(&request).unwrap();
        assert_eq!(
            counting.get_intersection_size(&setup, &response).unwrap_err(),
            PsiError::RevealModeMismatch {
                expected: false,
                actual: true
            }
        );
    }

    #[test]
    fn test_get_intersection_without_request() {
        let server = PsiServer::create_with_new_key(true).unwrap();
        let client = PsiClient::create_with_new_key(true).unwrap();
        let setup = server
            .create_setup_message(0.01, 3, &["a"], DataStructure::Raw)
            .unwrap();
        let response = Response::new(vec![], true);
        assert_eq!(
            client.get_intersection(&setup, &response).unwrap_err(),
            PsiError::MissingRequest
        );
    }

    #[test]
    fn test_get_intersection_rejects_wrong_length() {
        let server = PsiServer::create_with_new_key(true).unwrap();
        let mut client = PsiClient::create_with_new_key(true).unwrap();
        let setup = server
            .create_setup_message(0.01, 3, &["a"], DataStructure::Raw)
            .unwrap();
        let request = client.create_request(&["a", "b", "c"]).unwrap();
        let mut response = server.process_request(&request).unwrap();
        response.encrypted_elements.pop();

        assert!(matches!(
            client.get_intersection(&setup, &response),
            Err(PsiError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_invalid_response_element() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        let mut client = PsiClient::create_with_new_key(false).unwrap();
        let setup = server
            .create_setup_message(0.01, 3, &["a"], DataStructure::Gcs)
            .unwrap();
        client.create_request(&["a"]).unwrap();
        let response = Response::new(vec![CompressedRistretto([0xffu8; 32])], false);

        assert!(matches!(
            client.get_intersection_size(&setup, &response),
            Err(PsiError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_operations_fail_after_delete() {
        let server = PsiServer::create_with_new_key(true).unwrap();
        let mut client = PsiClient::create_with_new_key(true).unwrap();
        let setup = server
            .create_setup_message(0.01, 3, &["a"], DataStructure::Raw)
            .unwrap();
        let request = client.create_request(&["a"]).unwrap();
        let response = server.process_request(&request).unwrap();

        client.delete().unwrap();
        assert!(client.is_deleted());
        assert_eq!(
            client.create_request(&["a"]).unwrap_err(),
            PsiError::InstanceDeleted
        );
        assert_eq!(
            client.get_intersection(&setup, &response).unwrap_err(),
            PsiError::InstanceDeleted
        );
        assert_eq!(
            client.get_intersection_size(&setup, &response).unwrap_err(),
            PsiError::InstanceDeleted
        );
        assert_eq!(
            client.get_private_key_bytes().unwrap_err(),
            PsiError::InstanceDeleted
        );
        assert_eq!(client.delete().unwrap_err(), PsiError::InstanceDeleted);
    }

    #[test]
    fn test_debug_hides_key() {
        let client = PsiClient::create_with_new_key(true).unwrap();
        assert_eq!(
            format!("{:?}", client),
            "PsiClient { reveal_intersection: true, deleted: false, .. }"
        );
    }
}
