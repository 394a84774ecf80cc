//! Message types exchanged between the PSI client and server.
//!
//! All messages are plain serde structs; [`WireMessage`] gives each of them a
//! deterministic binary encoding (bincode) so independently built peers agree
//! on the bytes.

use crate::datastructure::{BloomFilter, DataStructure, Gcs, RawSet, SetEncoder};
use crate::error::Result;
use curve25519_dalek::ristretto::CompressedRistretto;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Binary encoding shared by every protocol message.
pub trait WireMessage: Serialize + DeserializeOwned {
    /// Serialize the message.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Parse a message and check its internal consistency.
    ///
    /// # Errors
    /// Returns `PsiError::MalformedMessage` if the bytes do not decode or the
    /// decoded message is inconsistent
    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let message: Self = bincode::deserialize(bytes)?;
        message.check()?;
        Ok(message)
    }

    /// Structural checks run after decoding.
    fn check(&self) -> Result<()> {
        Ok(())
    }
}

/// Client request: the client's blinded elements, `H(x)^c`, sorted by their
/// serialized bytes.
///
/// `reveal_intersection` tells the server whether to keep the request order
/// in its response (the client learns which of its elements matched) or to
/// sort it (the client only learns how many matched).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub encrypted_elements: Vec<CompressedRistretto>,
    pub reveal_intersection: bool,
}

impl Request {
    pub fn new(encrypted_elements: Vec<CompressedRistretto>, reveal_intersection: bool) -> Self {
        Self {
            encrypted_elements,
            reveal_intersection,
        }
    }

    /// Returns the number of elements in this request.
    pub fn len(&self) -> usize {
        self.encrypted_elements.len()
    }

    /// Returns true if this request contains no elements.
    pub fn is_empty(&self) -> bool {
        self.encrypted_elements.is_empty()
    }
}

impl WireMessage for Request {}

/// Server response: the request's elements blinded again, `H(x)^(cs)`.
///
/// Echoes the request's `reveal_intersection` so the client can tell which
/// ordering the server applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub encrypted_elements: Vec<CompressedRistretto>,
    pub reveal_intersection: bool,
}

impl Response {
    pub fn new(encrypted_elements: Vec<CompressedRistretto>, reveal_intersection: bool) -> Self {
        Self {
            encrypted_elements,
            reveal_intersection,
        }
    }

    /// Returns the number of elements in this response.
    pub fn len(&self) -> usize {
        self.encrypted_elements.len()
    }

    /// Returns true if this response contains no elements.
    pub fn is_empty(&self) -> bool {
        self.encrypted_elements.is_empty()
    }
}

impl WireMessage for Response {}

/// Server setup: the server's blinded set, `H(y)^s`, in one of the supported
/// encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerSetup {
    Raw(RawSet),
    BloomFilter(BloomFilter),
    Gcs(Gcs),
}

impl ServerSetup {
    /// Encode `elements` with the chosen data structure.
    pub fn build(
        data_structure: DataStructure,
        elements: &[CompressedRistretto],
        fpr: f64,
        num_client_inputs: usize,
    ) -> Result<Self> {
        Ok(match data_structure {
            DataStructure::Raw => Self::Raw(RawSet::build(elements, fpr, num_client_inputs)?),
            DataStructure::BloomFilter => {
                Self::BloomFilter(BloomFilter::build(elements, fpr, num_client_inputs)?)
            }
            DataStructure::Gcs => Self::Gcs(Gcs::build(elements, fpr, num_client_inputs)?),
        })
    }

    /// The data structure this setup is encoded with.
    pub fn data_structure(&self) -> DataStructure {
        match self {
            Self::Raw(_) => DataStructure::Raw,
            Self::BloomFilter(_) => DataStructure::BloomFilter,
            Self::Gcs(_) => DataStructure::Gcs,
        }
    }

    /// Whether `element` tests positive against the encoded set.
    pub fn contains(&self, element: &CompressedRistretto) -> bool {
        match self {
            Self::Raw(set) => set.contains(element),
            Self::BloomFilter(filter) => filter.contains(element),
            Self::Gcs(gcs) => gcs.contains(element),
        }
    }

    /// Indices of `elements` that test positive, ascending.
    pub fn intersect(&self, elements: &[CompressedRistretto]) -> Vec<usize> {
        match self {
            Self::Raw(set) => set.intersect(elements),
            Self::BloomFilter(filter) => filter.intersect(elements),
            Self::Gcs(gcs) => gcs.intersect(elements),
        }
    }
}

impl WireMessage for ServerSetup {
    fn check(&self) -> Result<()> {
        match self {
            Self::Raw(set) => set.validate(),
            Self::BloomFilter(filter) => filter.validate(),
            Self::Gcs(gcs) => gcs.validate(),
        }
    }
}
