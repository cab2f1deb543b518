//! Poll state and lifecycle transitions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fhe::bfv::{BfvParameters, Ciphertext, PublicKey, RelinearizationKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{aggregate, Evaluator};
use crate::codec::{decode_from_text, encode_to_text, fingerprint, DecodeError};

use super::error::{PollError, Result};

/// Poll identifier: hex SHA-256 of the serialized public key
pub type PollId = String;

/// Lifecycle phase of a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Accepting responses
    Open,
    /// Aggregation in progress; responses are frozen
    Closing,
    /// Result computed (or poll closed empty); terminal
    Closed,
}

/// Public view of a poll, safe to hand to anyone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub id: PollId,
    /// Base64 public key participants encrypt under
    pub pubkey: String,
    /// Base64 result ciphertext, or `"nil"` while absent
    pub result: String,
    pub closed: bool,
}

struct PollState {
    lifecycle: Lifecycle,
    responses: BTreeMap<String, Ciphertext>,
    result: Option<Ciphertext>,
}

/// A single encrypted poll.
///
/// Keys and identity are immutable; the mutable state sits behind one mutex so
/// that concurrent submissions and a concurrent close are serialized.
pub struct Poll {
    id: PollId,
    params: Arc<BfvParameters>,
    public_key: PublicKey,
    evaluation_key: RelinearizationKey,
    state: Mutex<PollState>,
}

impl Poll {
    /// Decode both keys and open a new poll identified by the public key fingerprint.
    pub fn create(
        params: &Arc<BfvParameters>,
        public_key_text: &str,
        evaluation_key_text: &str,
    ) -> std::result::Result<Self, DecodeError> {
        let public_key: PublicKey = decode_from_text(public_key_text, params)?;
        let evaluation_key: RelinearizationKey = decode_from_text(evaluation_key_text, params)?;

        Ok(Self {
            id: fingerprint(&public_key),
            params: params.clone(),
            public_key,
            evaluation_key,
            state: Mutex::new(PollState {
                lifecycle: Lifecycle::Open,
                responses: BTreeMap::new(),
                result: None,
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lock().lifecycle
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle() == Lifecycle::Closed
    }

    /// Number of distinct participants who responded
    pub fn response_count(&self) -> usize {
        self.lock().responses.len()
    }

    /// Participant identifiers in aggregation order
    pub fn participants(&self) -> Vec<String> {
        self.lock().responses.keys().cloned().collect()
    }

    pub fn response(&self, participant: &str) -> Option<Ciphertext> {
        self.lock().responses.get(participant).cloned()
    }

    pub fn result(&self) -> Option<Ciphertext> {
        self.lock().result.clone()
    }

    /// Record `participant`'s encrypted response, replacing any earlier one.
    pub fn register_response(&self, participant: &str, ciphertext_text: &str) -> Result<()> {
        if self.lifecycle() != Lifecycle::Open {
            return Err(PollError::Closed);
        }

        let ct: Ciphertext = decode_from_text(ciphertext_text, &self.params)?;
        self.check_fresh(&ct)?;

        let mut state = self.lock();
        // A close may have started while decoding
        if state.lifecycle != Lifecycle::Open {
            return Err(PollError::Closed);
        }
        let replaced = state.responses.insert(participant.to_string(), ct).is_some();

        debug!(
            poll = %self.id,
            participant,
            replaced,
            total = state.responses.len(),
            "registered response"
        );
        Ok(())
    }

    /// Close the poll and compute its result.
    ///
    /// Responses are frozen as soon as the close begins. If aggregation fails the
    /// poll returns to Open with its responses intact and may be closed again.
    pub fn close<E>(&self, evaluator: &E) -> Result<()>
    where
        E: Evaluator<Ciphertext = Ciphertext, EvaluationKey = RelinearizationKey>,
    {
        let inputs: Vec<Ciphertext> = {
            let mut state = self.lock();
            if state.lifecycle != Lifecycle::Open {
                return Err(PollError::AlreadyClosed);
            }
            if state.responses.is_empty() {
                state.lifecycle = Lifecycle::Closed;
                info!(poll = %self.id, "closed poll without responses");
                return Ok(());
            }
            state.lifecycle = Lifecycle::Closing;
            state.responses.values().cloned().collect()
        };

        let count = inputs.len();
        match aggregate(evaluator, inputs, &self.evaluation_key) {
            Ok(result) => {
                let mut state = self.lock();
                state.result = Some(result);
                state.lifecycle = Lifecycle::Closed;
                info!(poll = %self.id, responses = count, "closed poll");
                Ok(())
            }
            Err(e) => {
                self.lock().lifecycle = Lifecycle::Open;
                warn!(poll = %self.id, error = %e, "aggregation failed, poll reopened");
                Err(e.into())
            }
        }
    }

    /// Only fresh encryptions (two parts at the top of the modulus chain) can
    /// enter the aggregation.
    fn check_fresh(&self, ct: &Ciphertext) -> std::result::Result<(), DecodeError> {
        if ct.len() != 2 {
            return Err(DecodeError::Format(format!(
                "expected a 2-part ciphertext, got {} parts",
                ct.len()
            )));
        }
        let level = self
            .params
            .level_of_context(ct[0].ctx())
            .map_err(|e| DecodeError::Format(e.to_string()))?;
        if level != 0 {
            return Err(DecodeError::Format(format!(
                "expected a level 0 ciphertext, got level {level}"
            )));
        }
        Ok(())
    }

    pub fn public_snapshot(&self) -> PollSnapshot {
        let state = self.lock();
        PollSnapshot {
            id: self.id.clone(),
            pubkey: encode_to_text(Some(&self.public_key)),
            result: encode_to_text(state.result.as_ref()),
            closed: state.lifecycle == Lifecycle::Closed,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PollState> {
        // Every transition completes under a single guard, so a poisoned
        // state is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Poll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Poll")
            .field("id", &self.id)
            .field("lifecycle", &state.lifecycle)
            .field("responses", &state.responses.len())
            .field("has_result", &state.result.is_some())
            .finish()
    }
}
