use super::{check_fpr, check_num_client_inputs, corrected_fpr, digest_mod, SetEncoder};
use crate::error::{PsiError, Result};
use curve25519_dalek::ristretto::CompressedRistretto;
use log::debug;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A Bloom filter over serialized blinded elements.
///
/// For a per-query false-positive rate `e` and `n` elements the filter uses
/// `k = ceil(-log2(e))` hash functions and `m = -n * log2(e) / ln 2` bits,
/// rounded up to whole bytes. The i-th hash of `x` is
/// `SHA256("1" || x) + i * SHA256("2" || x)` modulo `m`.
/// Upper bound on the number of hash functions: `-log2` of the smallest
/// positive `f64`, the most any valid rate can ask for.
pub const MAX_HASH_FUNCTIONS: u32 = 1074;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BloomFilter {
    num_hash_functions: u32,
    bits: Vec<u8>,
}

impl BloomFilter {
    /// Create an empty filter that keeps the false-positive rate of a single
    /// lookup below `fpr` for up to `max_elements` insertions.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidParameter` if `fpr` is not in (0,1)
    pub fn with_capacity(fpr: f64, max_elements: usize) -> Result<Self> {
        check_fpr(fpr)?;
        let num_hash_functions = (-fpr.log2()).ceil() as u32;
        let num_bytes = (-(max_elements as f64) * fpr.log2() / std::f64::consts::LN_2 / 8.0)
            .ceil()
            .max(1.0) as usize;
        Ok(Self {
            num_hash_functions,
            bits: vec![0u8; num_bytes],
        })
    }

    pub fn num_hash_functions(&self) -> u32 {
        self.num_hash_functions
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    /// Insert an element.
    pub fn add(&mut self, element: &CompressedRistretto) {
        for index in self.hash(element.as_bytes()) {
            self.bits[index / 8] |= 1 << (index % 8);
        }
    }

    fn num_bits(&self) -> u64 {
        8 * self.bits.len() as u64
    }

    fn hash(&self, input: &[u8]) -> impl Iterator<Item = usize> {
        let num_bits = self.num_bits();
        let h1 = digest_mod(&prefixed_sha256(b"1", input), num_bits);
        let h2 = digest_mod(&prefixed_sha256(b"2", input), num_bits);
        (0..u64::from(self.num_hash_functions)).map(move |i| {
            let index = (u128::from(h1) + u128::from(i) * u128::from(h2)) % u128::from(num_bits);
            index as usize
        })
    }
}

fn prefixed_sha256(prefix: &[u8], input: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(prefix);
    hasher.update(input);
    hasher.finalize().into()
}

impl SetEncoder for BloomFilter {
    fn build(
        elements: &[CompressedRistretto],
        fpr: f64,
        num_client_inputs: usize,
    ) -> Result<Self> {
        check_fpr(fpr)?;
        check_num_client_inputs(num_client_inputs)?;

        let max_elements = num_client_inputs.max(elements.len());
        let mut filter =
            Self::with_capacity(corrected_fpr(fpr, num_client_inputs), max_elements)?;
        for element in elements {
            filter.add(element);
        }
        debug!(
            "Built Bloom filter with {} elements, {} hash functions, {} bytes",
            elements.len(),
            filter.num_hash_functions,
            filter.bits.len()
        );
        Ok(filter)
    }

    fn contains(&self, element: &CompressedRistretto) -> bool {
        self.hash(element.as_bytes())
            .all(|index| (self.bits[index / 8] >> (index % 8)) & 1 == 1)
    }

    fn validate(&self) -> Result<()> {
        if self.num_hash_functions == 0 {
            return Err(PsiError::MalformedMessage(
                "Bloom filter has no hash functions".to_string(),
            ));
        }
        if self.num_hash_functions > MAX_HASH_FUNCTIONS {
            return Err(PsiError::MalformedMessage(format!(
                "Bloom filter uses {} hash functions, at most {} allowed",
                self.num_hash_functions, MAX_HASH_FUNCTIONS
            )));
        }
        if self.bits.is_empty() {
            return Err(PsiError::MalformedMessage(
                "Bloom filter has no bits".to_string(),
            ));
        }
        Ok(())
    }
}
