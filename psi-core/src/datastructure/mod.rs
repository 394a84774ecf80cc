//! Encodings of the server's blinded set.
//!
//! The server inserts its blinded elements into one of three structures and
//! ships the result to the client as the setup message:
//!
//! - [`RawSet`] - the sorted elements themselves, exact
//! - [`BloomFilter`] - bit array with `k` hash functions, probabilistic
//! - [`Gcs`] - Golomb-compressed set of truncated hashes, probabilistic and
//!   the most compact for a given false-positive rate
//!
//! The probabilistic structures are sized so that the chance of at least one
//! false positive over all client queries is about `fpr`.

mod bloom_filter;
mod gcs;
pub mod golomb;
mod raw;

pub use bloom_filter::BloomFilter;
pub use gcs::Gcs;
pub use raw::RawSet;

use crate::error::{PsiError, Result};
use curve25519_dalek::ristretto::CompressedRistretto;
use serde::{Deserialize, Serialize};

/// Which structure the server uses to encode its set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataStructure {
    Raw,
    #[default]
    Gcs,
    BloomFilter,
}

/// A membership structure over blinded group elements.
pub trait SetEncoder: Sized {
    /// Encode `elements`, sized for `num_client_inputs` lookups with an overall
    /// false-positive rate of `fpr`.
    fn build(
        elements: &[CompressedRistretto],
        fpr: f64,
        num_client_inputs: usize,
    ) -> Result<Self>;

    /// Whether `element` tests positive. Never false for an inserted element.
    fn contains(&self, element: &CompressedRistretto) -> bool;

    /// Indices of `elements` that test positive, in ascending order.
    fn intersect(&self, elements: &[CompressedRistretto]) -> Vec<usize> {
        elements
            .iter()
            .enumerate()
            .filter(|(_, element)| self.contains(element))
            .map(|(index, _)| index)
            .collect()
    }

    /// Check the internal consistency of a structure received over the wire.
    fn validate(&self) -> Result<()>;
}

/// Reject rates outside the open interval `(0, 1)`, NaN included.
pub(crate) fn check_fpr(fpr: f64) -> Result<()> {
    if fpr > 0.0 && fpr < 1.0 {
        Ok(())
    } else {
        Err(PsiError::InvalidParameter(format!(
            "`fpr` must be in (0,1), got {}",
            fpr
        )))
    }
}

pub(crate) fn check_num_client_inputs(num_client_inputs: usize) -> Result<()> {
    if num_client_inputs == 0 {
        return Err(PsiError::InvalidParameter(
            "`num_client_inputs` must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Per-query false-positive rate for an overall rate of `fpr` across
/// `num_client_inputs` queries.
pub(crate) fn corrected_fpr(fpr: f64, num_client_inputs: usize) -> f64 {
    fpr / num_client_inputs as f64
}

/// Interpret a big-endian digest as an integer and reduce it modulo `modulus`.
pub(crate) fn digest_mod(digest: &[u8], modulus: u64) -> u64 {
    let modulus = u128::from(modulus);
    digest
        .iter()
        .fold(0u128, |acc, &byte| ((acc << 8) | u128::from(byte)) % modulus) as u64
}
