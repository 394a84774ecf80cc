use super::golomb::{self, MAX_DIV};
use super::{check_fpr, check_num_client_inputs, corrected_fpr, digest_mod, SetEncoder};
use crate::error::{PsiError, Result};
use curve25519_dalek::ristretto::CompressedRistretto;
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A Golomb-compressed set.
///
/// Every element is hashed into `[0, hash_range)`, and the sorted hashes are
/// stored as Golomb-Rice coded gaps. Two elements collide, and a lookup is a
/// false positive, with probability about `1 / hash_range` per stored element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gcs {
    div: u32,
    hash_range: u64,
    bits: Vec<u8>,
}

impl Gcs {
    pub fn div(&self) -> u32 {
        self.div
    }

    pub fn hash_range(&self) -> u64 {
        self.hash_range
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    fn hash(&self, element: &CompressedRistretto) -> u64 {
        hash_into_range(element, self.hash_range)
    }
}

fn hash_into_range(element: &CompressedRistretto, hash_range: u64) -> u64 {
    let digest = Sha256::digest(element.as_bytes());
    digest_mod(&digest, hash_range)
}

impl SetEncoder for Gcs {
    fn build(
        elements: &[CompressedRistretto],
        fpr: f64,
        num_client_inputs: usize,
    ) -> Result<Self> {
        check_fpr(fpr)?;
        check_num_client_inputs(num_client_inputs)?;

        let max_elements = num_client_inputs.max(elements.len());
        let hash_range =
            ((max_elements as f64 / corrected_fpr(fpr, num_client_inputs)) as u64).max(1);

        let mut hashes: Vec<u64> = elements
            .iter()
            .map(|element| hash_into_range(element, hash_range))
            .collect();
        hashes.sort_unstable();
        let (div, bits) = golomb::compress(&hashes, None);

        debug!(
            "Built GCS with {} elements, hash range {}, div {}, {} bytes",
            elements.len(),
            hash_range,
            div,
            bits.len()
        );
        Ok(Self {
            div,
            hash_range,
            bits,
        })
    }

    fn contains(&self, element: &CompressedRistretto) -> bool {
        let hash = self.hash(element);
        golomb::Decoder::new(&self.bits, self.div)
            .take_while(|value| *value <= hash)
            .any(|value| value == hash)
    }

    /// Decodes the set once, merging it with the sorted candidate hashes.
    fn intersect(&self, elements: &[CompressedRistretto]) -> Vec<usize> {
        let mut hashes: Vec<(u64, usize)> = elements
            .iter()
            .enumerate()
            .map(|(index, element)| (self.hash(element), index))
            .collect();
        hashes.sort_unstable();

        let mut result = golomb::intersect(&self.bits, self.div, &hashes);
        result.sort_unstable();
        result
    }

    fn validate(&self) -> Result<()> {
        if self.hash_range == 0 {
            return Err(PsiError::MalformedMessage(
                "GCS hash range must be positive".to_string(),
            ));
        }
        if self.div > MAX_DIV {
            return Err(PsiError::MalformedMessage(format!(
                "GCS div {} exceeds {}",
                self.div, MAX_DIV
            )));
        }
        Ok(())
    }
}
