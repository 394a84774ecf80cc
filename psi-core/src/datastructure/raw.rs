use super::{check_fpr, check_num_client_inputs, SetEncoder};
use crate::error::{PsiError, Result};
use curve25519_dalek::ristretto::CompressedRistretto;
use log::debug;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// The server's blinded elements, sorted by their serialized bytes so the
/// insertion order is not revealed.
///
/// Exact: no false positives, but the size grows with every element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawSet {
    encrypted_elements: Vec<CompressedRistretto>,
}

fn by_bytes(a: &CompressedRistretto, b: &CompressedRistretto) -> Ordering {
    a.as_bytes().cmp(b.as_bytes())
}

impl RawSet {
    /// Create a raw set, sorting `elements`.
    pub fn new(mut elements: Vec<CompressedRistretto>) -> Self {
        elements.sort_unstable_by(by_bytes);
        Self {
            encrypted_elements: elements,
        }
    }

    /// The sorted elements.
    pub fn encrypted_elements(&self) -> &[CompressedRistretto] {
        &self.encrypted_elements
    }

    pub fn len(&self) -> usize {
        self.encrypted_elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encrypted_elements.is_empty()
    }
}

impl SetEncoder for RawSet {
    fn build(
        elements: &[CompressedRistretto],
        fpr: f64,
        num_client_inputs: usize,
    ) -> Result<Self> {
        check_fpr(fpr)?;
        check_num_client_inputs(num_client_inputs)?;
        debug!("Building raw set with {} elements", elements.len());
        Ok(Self::new(elements.to_vec()))
    }

    fn contains(&self, element: &CompressedRistretto) -> bool {
        self.encrypted_elements
            .binary_search_by(|stored| by_bytes(stored, element))
            .is_ok()
    }

    /// Sorts the candidates and merges them with the stored elements, so the
    /// cost is `O(n log n + m)` rather than a search per candidate.
    fn intersect(&self, elements: &[CompressedRistretto]) -> Vec<usize> {
        let mut candidates: Vec<(&CompressedRistretto, usize)> =
            elements.iter().zip(0..).collect();
        candidates.sort_unstable_by(|a, b| by_bytes(a.0, b.0));

        let mut result = Vec::new();
        let mut stored = self.encrypted_elements.iter().peekable();
        for (candidate, index) in candidates {
            while stored
                .next_if(|s| by_bytes(s, candidate) == Ordering::Less)
                .is_some()
            {}
            match stored.peek() {
                Some(s) if by_bytes(s, candidate) == Ordering::Equal => result.push(index),
                Some(_) => {}
                None => break,
            }
        }
        result.sort_unstable();
        result
    }

    fn validate(&self) -> Result<()> {
        let sorted = self
            .encrypted_elements
            .windows(2)
            .all(|pair| by_bytes(&pair[0], &pair[1]) != Ordering::Greater);
        if !sorted {
            return Err(PsiError::MalformedMessage(
                "raw set elements are not sorted".to_string(),
            ));
        }
        Ok(())
    }
}
