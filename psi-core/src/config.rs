//! Parameters for building the server's setup message.

use crate::datastructure::{check_fpr, check_num_client_inputs, DataStructure};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Setup parameters agreed on before a session.
///
/// Missing fields fall back to the defaults when deserialized, so a config
/// file only needs to name what it changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SetupConfig {
    /// Probability that the client sees at least one false positive over all
    /// of its queries. Must be in (0,1).
    pub fpr: f64,
    /// Number of elements the client is expected to query.
    pub num_client_inputs: usize,
    /// Encoding of the server's set.
    pub data_structure: DataStructure,
}

impl SetupConfig {
    pub fn new(fpr: f64, num_client_inputs: usize, data_structure: DataStructure) -> Self {
        Self {
            fpr,
            num_client_inputs,
            data_structure,
        }
    }

    /// Check that the parameters can be used to build a setup message.
    ///
    /// # Errors
    /// Returns `PsiError::InvalidParameter` if `fpr` is not in (0,1) or
    /// `num_client_inputs` is zero
    pub fn validate(&self) -> Result<()> {
        check_fpr(self.fpr)?;
        check_num_client_inputs(self.num_client_inputs)
    }
}

impl Default for SetupConfig {
    fn default() -> Self {
        Self {
            fpr: 1e-9,
            num_client_inputs: 1000,
            data_structure: DataStructure::default(),
        }
    }
}
