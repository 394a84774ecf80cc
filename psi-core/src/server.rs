//! Server side of the PSI protocol.

use crate::config::SetupConfig;
use crate::crypto::{PrivateKey, KEY_SIZE};
use crate::datastructure::DataStructure;
use crate::error::{PsiError, Result};
use crate::messages::{Request, Response, ServerSetup};
use curve25519_dalek::ristretto::CompressedRistretto;
use log::{debug, info};
use std::fmt;

/// Server side of a PSI session.
///
/// The server encrypts its own elements into a [`ServerSetup`] once, and
/// answers each client [`Request`] by adding its layer of blinding to the
/// client's elements.
///
/// A server created without `reveal_intersection` only answers requests in
/// cardinality mode, so its clients can learn the size of the intersection
/// but not its members.
pub struct PsiServer {
    /// `None` once the instance has been deleted
    key: Option<PrivateKey>,
    reveal_intersection: bool,
}

impl PsiServer {
    /// Create a server with a fresh random key.
    pub fn create_with_new_key(reveal_intersection: bool) -> Result<Self> {
        Ok(Self {
            key: Some(PrivateKey::random()),
            reveal_intersection,
        })
    }

    /// Create a server from a key previously returned by
    /// [`get_private_key_bytes`](Self::get_private_key_bytes).
    ///
    /// Reusing a key across sessions lets a client link its queries; prefer
    /// [`create_with_new_key`](Self::create_with_new_key).
    ///
    /// # Errors
    /// Returns `PsiError::InvalidKey` if `key_bytes` is not a valid 32-byte
    /// scalar
    pub fn create_from_key(key_bytes: &[u8], reveal_intersection: bool) -> Result<Self> {
        Ok(Self {
            key: Some(PrivateKey::from_bytes(key_bytes)?),
            reveal_intersection,
        })
    }

    fn key(&self) -> Result<&PrivateKey> {
        self.key.as_ref().ok_or(PsiError::InstanceDeleted)
    }

    /// Whether this server answers requests that reveal the intersection.
    pub fn reveal_intersection(&self) -> bool {
        self.reveal_intersection
    }

    /// Build the setup message holding the server's encrypted elements.
    ///
    /// Each input `y` becomes `H(y)^s` and is inserted into `data_structure`,
    /// sized so that `num_client_inputs` lookups produce a false positive with
    /// probability about `fpr`.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidParameter` if `fpr` is not in (0,1) or
    /// `num_client_inputs` is zero
    pub fn create_setup_message<T: AsRef<[u8]>>(
        &self,
        fpr: f64,
        num_client_inputs: usize,
        inputs: &[T],
        data_structure: DataStructure,
    ) -> Result<ServerSetup> {
        let config = SetupConfig::new(fpr, num_client_inputs, data_structure);
        self.create_setup_message_with_config(&config, inputs)
    }

    /// As [`create_setup_message`](Self::create_setup_message), with the
    /// parameters taken from `config`.
    pub fn create_setup_message_with_config<T: AsRef<[u8]>>(
        &self,
        config: &SetupConfig,
        inputs: &[T],
    ) -> Result<ServerSetup> {
        let key = self.key()?;
        config.validate()?;

        let encrypted: Vec<CompressedRistretto> = inputs
            .iter()
            .map(|input| key.encrypt(input.as_ref()))
            .collect();
        let setup = ServerSetup::build(
            config.data_structure,
            &encrypted,
            config.fpr,
            config.num_client_inputs,
        )?;

        info!(
            "Created {:?} setup for {} server elements (fpr {}, {} client inputs)",
            config.data_structure,
            inputs.len(),
            config.fpr,
            config.num_client_inputs
        );
        Ok(setup)
    }

    /// Blind every element of `request` with the server key.
    ///
    /// The response keeps the request order if the request asks to reveal the
    /// intersection, and is sorted otherwise so the client cannot tell which
    /// of its elements matched.
    ///
    /// # Errors
    /// - `PsiError::RevealModeMismatch` if the request's mode differs from
    ///   this server's
    /// - `PsiError::MalformedMessage` if an element is not a valid group
    ///   element
    pub fn process_request(&self, request: &Request) -> Result<Response> {
        let key = self.key()?;
        if request.reveal_intersection != self.reveal_intersection {
            return Err(PsiError::RevealModeMismatch {
                expected: self.reveal_intersection,
                actual: request.reveal_intersection,
            });
        }

        let mut encrypted = request
            .encrypted_elements
            .iter()
            .enumerate()
            .map(|(index, element)| {
                key.re_encrypt(element).map_err(|_| {
                    PsiError::MalformedMessage(format!(
                        "request element {} is not a valid group element",
                        index
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if !request.reveal_intersection {
            encrypted.sort_unstable_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        }

        debug!(
            "Processed request with {} elements (reveal_intersection = {})",
            encrypted.len(),
            request.reveal_intersection
        );
        Ok(Response::new(encrypted, request.reveal_intersection))
    }

    /// This server's private key. DO NOT SEND THIS KEY TO ANY OTHER PARTY!
    pub fn get_private_key_bytes(&self) -> Result<[u8; KEY_SIZE]> {
        Ok(self.key()?.to_bytes())
    }

    /// Wipe the key. Every later call, including another `delete`, fails with
    /// `PsiError::InstanceDeleted`.
    pub fn delete(&mut self) -> Result<()> {
        match self.key.take() {
            Some(_) => Ok(()),
            None => Err(PsiError::InstanceDeleted),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.key.is_none()
    }
}

impl fmt::Debug for PsiServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PsiServer")
            .field("reveal_intersection", &self.reveal_intersection)
            .field("deleted", &self.is_deleted())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::WireMessage;

    fn client_request(n: usize, reveal_intersection: bool) -> (PrivateKey, Request) {
        let key = PrivateKey::random();
        let elements = (0..n)
            .map(|i| key.encrypt(format!("Element {}", i).as_bytes()))
            .collect();
        (key, Request::new(elements, reveal_intersection))
    }

    #[test]
    fn test_key_round_trip() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        let bytes = server.get_private_key_bytes().unwrap();
        let loaded = PsiServer::create_from_key(&bytes, true).unwrap();
        assert_eq!(loaded.get_private_key_bytes().unwrap(), bytes);
        assert!(loaded.reveal_intersection());
    }

    #[test]
    fn test_create_from_invalid_key() {
        assert!(matches!(
            PsiServer::create_from_key(&[0u8; 32], false),
            Err(PsiError::InvalidKey(_))
        ));
        assert!(matches!(
            PsiServer::create_from_key(&[1u8; 31], true),
            Err(PsiError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_setup_is_deterministic_for_a_key() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        let inputs = ["a", "b", "c"];
        let first = server
            .create_setup_message(0.01, 10, &inputs, DataStructure::Gcs)
            .unwrap();
        let second = server
            .create_setup_message(0.01, 10, &inputs, DataStructure::Gcs)
            .unwrap();
        assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
    }

    #[test]
    fn test_setup_rejects_bad_parameters() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        let inputs = ["a", "b"];
        for fpr in [0.0, 1.0, -0.5, f64::NAN] {
            for data_structure in [
                DataStructure::Raw,
                DataStructure::BloomFilter,
                DataStructure::Gcs,
            ] {
                assert!(matches!(
                    server.create_setup_message(fpr, 10, &inputs, data_structure),
                    Err(PsiError::InvalidParameter(_))
                ));
            }
        }
        assert!(matches!(
            server.create_setup_message(0.01, 0, &inputs, DataStructure::Raw),
            Err(PsiError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_setup_with_config() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        let config = SetupConfig::new(0.01, 10, DataStructure::BloomFilter);
        let setup = server
            .create_setup_message_with_config(&config, &["a", "b"])
            .unwrap();
        assert_eq!(setup.data_structure(), DataStructure::BloomFilter);
    }

    #[test]
    fn test_process_request_preserves_order_when_revealing() {
        let server = PsiServer::create_with_new_key(true).unwrap();
        let server_key =
            PrivateKey::from_bytes(&server.get_private_key_bytes().unwrap()).unwrap();
        let (_, request) = client_request(20, true);

        let response = server.process_request(&request).unwrap();
        assert!(response.reveal_intersection);
        assert_eq!(response.len(), 20);
        let pairs = request
            .encrypted_elements
            .iter()
            .zip(&response.encrypted_elements);
        for (sent, received) in pairs {
            assert_eq!(server_key.re_encrypt(sent).unwrap(), *received);
        }
    }

    #[test]
    fn test_process_request_sorts_for_cardinality() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        let (_, request) = client_request(20, false);

        let response = server.process_request(&request).unwrap();
        assert!(!response.reveal_intersection);
        assert!(response
            .encrypted_elements
            .windows(2)
            .all(|pair| pair[0].as_bytes() <= pair[1].as_bytes()));
    }

    #[test]
    fn test_cardinality_server_rejects_reveal_request() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        let (_, mut request) = client_request(5, false);
        request.reveal_intersection = true;
        assert_eq!(
            server.process_request(&request).unwrap_err(),
            PsiError::RevealModeMismatch {
                expected: false,
                actual: true
            }
        );
    }

    #[test]
    fn test_reveal_server_rejects_cardinality_request() {
        let server = PsiServer::create_with_new_key(true).unwrap();
        let (_, request) = client_request(5, false);
        assert_eq!(
            server.process_request(&request).unwrap_err(),
            PsiError::RevealModeMismatch {
                expected: true,
                actual: false
            }
        );
    }

    #[test]
    fn test_process_request_rejects_invalid_point() {
        let server = PsiServer::create_with_new_key(true).unwrap();
        let (_, mut request) = client_request(3, true);
        request.encrypted_elements[1] = CompressedRistretto([0xffu8; 32]);
        assert!(matches!(
            server.process_request(&request),
            Err(PsiError::MalformedMessage(_))
        ));
    }

    #[test]
    fn test_process_empty_request() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        let response = server.process_request(&Request::new(vec![], false)).unwrap();
        assert!(response.is_empty());
    }

    #[test]
    fn test_operations_fail_after_delete() {
        let mut server = PsiServer::create_with_new_key(false).unwrap();
        let (_, request) = client_request(2, false);
        assert!(!server.is_deleted());
        server.delete().unwrap();
        assert!(server.is_deleted());

        assert_eq!(
            server
                .create_setup_message(0.01, 10, &["a"], DataStructure::Gcs)
                .unwrap_err(),
            PsiError::InstanceDeleted
        );
        assert_eq!(
            server.process_request(&request).unwrap_err(),
            PsiError::InstanceDeleted
        );
        assert_eq!(
            server.get_private_key_bytes().unwrap_err(),
            PsiError::InstanceDeleted
        );
        assert_eq!(server.delete().unwrap_err(), PsiError::InstanceDeleted);
    }

    #[test]
    fn test_deleted_check_comes_first() {
        let mut server = PsiServer::create_with_new_key(false).unwrap();
        server.delete().unwrap();
        // invalid parameters still report the deleted instance
        assert_eq!(
            server
                .create_setup_message(2.0, 0, &["a"], DataStructure::Gcs)
                .unwrap_err(),
            PsiError::InstanceDeleted
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let server = PsiServer::create_with_new_key(false).unwrap();
        assert_eq!(
            format!("{:?}", server),
            "PsiServer { reveal_intersection: false, deleted: false, .. }"
        );
    }
}
