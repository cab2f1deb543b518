//! Parameter sets for encrypted polls
//!
//! BFV parameters shared by the poll server and every participant. A ciphertext
//! or key produced under one parameter set cannot be decoded under another, so
//! clients fetch these from the server before generating keys.

use std::sync::Arc;

use fhe::bfv::{BfvParameters, BfvParametersBuilder};
use serde::{Deserialize, Serialize};

/// Number of availability slots in a poll response.
pub const VECTOR_LEN: usize = 7;

/// BFV parameters for a poll deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollParams {
    /// Ring degree n (power of two)
    pub degree: usize,

    /// Plaintext modulus t
    /// Must be ≡ 1 (mod 2n) so vectors can be batched into slots
    pub plaintext_modulus: u64,

    /// Bit sizes of the ciphertext moduli q_i
    pub moduli_sizes: Vec<usize>,
}

impl PollParams {
    /// Degree 8192 with a 218-bit ciphertext modulus
    pub fn pn13() -> Self {
        Self {
            degree: 8192,
            plaintext_modulus: 65537, // Fermat prime F4, ≡ 1 (mod 2n) up to n = 32768
            moduli_sizes: vec![54, 54, 55, 55],
        }
    }

    /// Degree 16384 for more noise headroom (larger polls)
    pub fn pn14() -> Self {
        Self {
            degree: 16384,
            plaintext_modulus: 65537,
            moduli_sizes: vec![54, 54, 54, 55, 55, 55, 55, 56],
        }
    }

    /// Select a preset by ring degree
    pub fn from_degree(degree: usize) -> Option<Self> {
        match degree {
            8192 => Some(Self::pn13()),
            16384 => Some(Self::pn14()),
            _ => None,
        }
    }

    /// Total bit size of the ciphertext modulus q
    pub fn log_q(&self) -> usize {
        self.moduli_sizes.iter().sum()
    }

    /// Check if parameters are valid
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.degree.is_power_of_two() {
            return Err("degree must be a power of two");
        }

        if self.degree < VECTOR_LEN {
            return Err("degree must hold at least VECTOR_LEN slots");
        }

        // Batching needs a primitive 2n-th root of unity mod t
        if self.plaintext_modulus % (2 * self.degree as u64) != 1 {
            return Err("plaintext_modulus must be ≡ 1 (mod 2n) for batching");
        }

        if self.moduli_sizes.is_empty() {
            return Err("at least one ciphertext modulus is required");
        }

        if self.moduli_sizes.iter().any(|&s| !(10..=62).contains(&s)) {
            return Err("ciphertext moduli sizes must be between 10 and 62 bits");
        }

        Ok(())
    }

    /// Instantiate the BFV parameters
    pub fn build(&self) -> Result<Arc<BfvParameters>, fhe::Error> {
        BfvParametersBuilder::new()
            .set_degree(self.degree)
            .set_plaintext_modulus(self.plaintext_modulus)
            .set_moduli_sizes(&self.moduli_sizes)
            .build_arc()
    }
}

impl Default for PollParams {
    fn default() -> Self {
        Self::pn13()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_valid() {
        assert!(PollParams::pn13().validate().is_ok());
        assert!(PollParams::pn14().validate().is_ok());
        assert_eq!(PollParams::default(), PollParams::pn13());
    }

    #[test]
    fn test_log_q() {
        assert_eq!(PollParams::pn13().log_q(), 218);
    }

    #[test]
    fn test_from_degree() {
        assert_eq!(PollParams::from_degree(16384), Some(PollParams::pn14()));
        assert!(PollParams::from_degree(1000).is_none());
    }

    #[test]
    fn test_rejects_non_batching_modulus() {
        let mut params = PollParams::pn13();
        params.plaintext_modulus = 65536;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_rejects_bad_degree_and_moduli() {
        let mut params = PollParams::pn13();
        params.degree = 6000;
        assert!(params.validate().is_err());

        let mut params = PollParams::pn13();
        params.moduli_sizes = vec![];
        assert!(params.validate().is_err());

        let mut params = PollParams::pn13();
        params.moduli_sizes = vec![63];
        assert!(params.validate().is_err());
    }
}
