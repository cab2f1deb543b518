//! Homomorphic aggregation of poll responses
//!
//! Folds the ciphertexts of a poll into one ciphertext encrypting their
//! slot-wise product. For 0/1 availability vectors this is the element-wise AND:
//! a slot decrypts to 1 only if every participant is available.
//!
//! # Reduction order
//!
//! The inputs seed a FIFO queue. While more than one ciphertext remains, the two
//! at the front are multiplied, the product is relinearized, and the result is
//! pushed to the back:
//!
//! ```text
//! [c0, c1, c2, c3, c4] → [c2, c3, c4, r01] → [c4, r01, r23] → [r23, r4_01] → [r]
//! ```
//!
//! Relinearizing after every multiplication keeps each intermediate at the
//! baseline degree, so the noise consumed grows with the depth of this queue
//! rather than with the participant count.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};

use fhe::bfv::{Ciphertext, RelinearizationKey};
use thiserror::Error;

/// Failure of a homomorphic operation during aggregation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregationError {
    #[error("nothing to aggregate")]
    Empty,
    #[error("homomorphic multiplication failed: {0}")]
    Multiply(String),
    #[error("relinearization failed: {0}")]
    Relinearize(String),
}

/// Homomorphic operations the aggregation needs
pub trait Evaluator {
    type Ciphertext;
    type EvaluationKey;

    fn multiply(
        &self,
        a: &Self::Ciphertext,
        b: &Self::Ciphertext,
    ) -> Result<Self::Ciphertext, AggregationError>;

    fn relinearize(
        &self,
        ct: Self::Ciphertext,
        key: &Self::EvaluationKey,
    ) -> Result<Self::Ciphertext, AggregationError>;
}

/// Evaluator backed by the BFV implementation of the `fhe` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct BfvEvaluator;

impl Evaluator for BfvEvaluator {
    type Ciphertext = Ciphertext;
    type EvaluationKey = RelinearizationKey;

    fn multiply(&self, a: &Ciphertext, b: &Ciphertext) -> Result<Ciphertext, AggregationError> {
        // The library asserts on mismatched parameters or levels instead of
        // returning an error; a malformed response must not take the server down.
        panic::catch_unwind(AssertUnwindSafe(|| a * b))
            .map_err(|payload| AggregationError::Multiply(panic_message(payload)))
    }

    fn relinearize(
        &self,
        mut ct: Ciphertext,
        key: &RelinearizationKey,
    ) -> Result<Ciphertext, AggregationError> {
        match panic::catch_unwind(AssertUnwindSafe(|| key.relinearizes(&mut ct))) {
            Ok(Ok(())) => Ok(ct),
            Ok(Err(e)) => Err(AggregationError::Relinearize(e.to_string())),
            Err(payload) => Err(AggregationError::Relinearize(panic_message(payload))),
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation panicked".to_string()
    }
}

/// Reduce `inputs` to a single ciphertext by queue-order pairwise multiplication.
///
/// A single input is returned unchanged. Callers reject empty polls before
/// aggregating; an empty input yields [`AggregationError::Empty`].
pub fn aggregate<E: Evaluator>(
    evaluator: &E,
    inputs: Vec<E::Ciphertext>,
    key: &E::EvaluationKey,
) -> Result<E::Ciphertext, AggregationError> {
    let mut queue: VecDeque<E::Ciphertext> = inputs.into();

    loop {
        let a = queue.pop_front().ok_or(AggregationError::Empty)?;
        let Some(b) = queue.pop_front() else {
            return Ok(a);
        };
        let product = evaluator.multiply(&a, &b)?;
        queue.push_back(evaluator.relinearize(product, key)?);
    }
}
