//! Request-level operations exposed to the transport layer
//!
//! [`PollService`] resolves poll identifiers through the [`Registry`] and maps
//! every outcome into a [`ProtocolError`] the transport can translate directly
//! (not found, conflict, bad request, internal failure).

use std::sync::Arc;

use fhe::bfv::BfvParameters;
use thiserror::Error;

use crate::aggregate::{AggregationError, BfvEvaluator};
use crate::codec::DecodeError;
use crate::params::PollParams;
use crate::poll::{PollError, PollHandle, PollId, PollSnapshot, Registry};

/// Outcome of a rejected request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("poll not found")]
    NotFound,
    #[error("poll is closed")]
    Closed,
    #[error("poll is already closed")]
    AlreadyClosed,
    #[error("bad payload: {0}")]
    BadPayload(DecodeError),
    #[error("aggregation failed: {0}")]
    Aggregation(AggregationError),
}

impl From<PollError> for ProtocolError {
    fn from(err: PollError) -> Self {
        match err {
            PollError::Closed => Self::Closed,
            PollError::AlreadyClosed => Self::AlreadyClosed,
            PollError::BadPayload(e) => Self::BadPayload(e),
            PollError::Aggregation(e) => Self::Aggregation(e),
        }
    }
}

impl From<DecodeError> for ProtocolError {
    fn from(err: DecodeError) -> Self {
        Self::BadPayload(err)
    }
}

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Poll server state: the parameter set and the registry of polls
pub struct PollService {
    params: PollParams,
    registry: Registry,
    evaluator: BfvEvaluator,
}

impl PollService {
    pub fn new(params: PollParams) -> std::result::Result<Self, fhe::Error> {
        let bfv = params.build()?;
        Ok(Self::with_bfv_params(params, bfv))
    }

    pub fn with_bfv_params(params: PollParams, bfv: Arc<BfvParameters>) -> Self {
        Self {
            params,
            registry: Registry::new(bfv),
            evaluator: BfvEvaluator,
        }
    }

    pub fn params(&self) -> &PollParams {
        &self.params
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Create a poll from base64 public and relinearization keys.
    pub fn create_poll(&self, public_key_text: &str, evaluation_key_text: &str) -> Result<PollId> {
        Ok(self.registry.create_poll(public_key_text, evaluation_key_text)?)
    }

    /// Record a participant's base64 ciphertext on an open poll.
    pub fn submit_response(&self, poll_id: &str, participant: &str, ciphertext_text: &str) -> Result<()> {
        Ok(self.poll(poll_id)?.register_response(participant, ciphertext_text)?)
    }

    /// Close a poll, computing its encrypted result.
    pub fn close_poll(&self, poll_id: &str) -> Result<()> {
        Ok(self.poll(poll_id)?.close(&self.evaluator)?)
    }

    pub fn get_poll_public_state(&self, poll_id: &str) -> Result<PollSnapshot> {
        Ok(self.poll(poll_id)?.public_snapshot())
    }

    fn poll(&self, poll_id: &str) -> Result<PollHandle> {
        self.registry.get(poll_id).ok_or(ProtocolError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::NIL;
    use crate::poll::testutil::{tiny_params, Keys};

    fn service(keys: &Keys) -> PollService {
        PollService::with_bfv_params(tiny_params(), keys.par.clone())
    }

    #[test]
    fn test_unknown_poll() {
        let keys = Keys::generate();
        let svc = service(&keys);
        let ct = keys.encrypt_text(&[1; 7]);

        assert_eq!(svc.submit_response("missing", "alice", &ct), Err(ProtocolError::NotFound));
        assert_eq!(svc.close_poll("missing"), Err(ProtocolError::NotFound));
        assert_eq!(svc.get_poll_public_state("missing"), Err(ProtocolError::NotFound));
    }

    #[test]
    fn test_create_bad_keys() {
        let keys = Keys::generate();
        let svc = service(&keys);
        let err = svc.create_poll("!!", &keys.rlk_text()).unwrap_err();
        assert!(matches!(err, ProtocolError::BadPayload(DecodeError::Base64(_))));
    }

    #[test]
    fn test_full_flow() {
        let keys = Keys::generate();
        let svc = service(&keys);
        let id = svc.create_poll(&keys.pk_text(), &keys.rlk_text()).unwrap();

        let state = svc.get_poll_public_state(&id).unwrap();
        assert_eq!(state.result, NIL);
        assert!(!state.closed);

        svc.submit_response(&id, "alice", &keys.encrypt_text(&[1, 1, 0, 1, 1, 0, 1])).unwrap();
        svc.submit_response(&id, "bob", &keys.encrypt_text(&[1, 0, 1, 1, 1, 0, 1])).unwrap();
        let err = svc.submit_response(&id, "carol", "bm90IGEgY2lwaGVydGV4dA==").unwrap_err();
        assert!(matches!(err, ProtocolError::BadPayload(_)));

        svc.close_poll(&id).unwrap();
        assert_eq!(svc.close_poll(&id), Err(ProtocolError::AlreadyClosed));
        assert_eq!(
            svc.submit_response(&id, "dave", &keys.encrypt_text(&[1; 7])),
            Err(ProtocolError::Closed)
        );

        let state = svc.get_poll_public_state(&id).unwrap();
        assert!(state.closed);
        let result = crate::codec::decode_from_text(&state.result, &keys.par).unwrap();
        assert_eq!(keys.decrypt(&result), vec![1, 0, 0, 1, 1, 0, 1]);
    }
}
