//! Process-wide store of polls.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use fhe::bfv::BfvParameters;
use tracing::{info, warn};

use crate::codec::DecodeError;

use super::entity::{Poll, PollId};

/// Shared handle to a registered poll
pub type PollHandle = Arc<Poll>;

/// Polls keyed by identifier. Polls are never evicted.
pub struct Registry {
    params: Arc<BfvParameters>,
    polls: RwLock<HashMap<PollId, PollHandle>>,
}

impl Registry {
    pub fn new(params: Arc<BfvParameters>) -> Self {
        Self {
            params,
            polls: RwLock::new(HashMap::new()),
        }
    }

    pub fn params(&self) -> &Arc<BfvParameters> {
        &self.params
    }

    /// Create a poll from its base64 keys and register it.
    ///
    /// A poll created with the same public key as an existing one has the same
    /// identifier and replaces it.
    pub fn create_poll(
        &self,
        public_key_text: &str,
        evaluation_key_text: &str,
    ) -> Result<PollId, DecodeError> {
        // Key decoding happens before the map is locked
        let poll = Arc::new(Poll::create(&self.params, public_key_text, evaluation_key_text)?);
        let id = poll.id().to_string();

        let previous = self
            .polls
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.clone(), poll);

        if previous.is_some() {
            warn!(poll = %id, "replaced existing poll with identical public key");
        }
        info!(poll = %id, "created poll");
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Option<PollHandle> {
        self.polls
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.polls.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::BfvEvaluator;
    use crate::poll::testutil::Keys;
    use crate::poll::Lifecycle;
    use std::thread;

    #[test]
    fn test_create_and_get() {
        let keys = Keys::generate();
        let registry = Registry::new(keys.par.clone());
        assert!(registry.is_empty());

        let id = registry.create_poll(&keys.pk_text(), &keys.rlk_text()).unwrap();
        let poll = registry.get(&id).unwrap();
        assert_eq!(poll.id(), id);
        assert_eq!(registry.len(), 1);
        assert!(registry.get("deadbeef").is_none());
    }

    #[test]
    fn test_create_rejects_malformed_keys() {
        let keys = Keys::generate();
        let registry = Registry::new(keys.par.clone());

        assert!(registry.create_poll("nil", &keys.rlk_text()).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_identical_key_replaces_poll() {
        let keys = Keys::generate();
        let registry = Registry::new(keys.par.clone());

        let first = registry.create_poll(&keys.pk_text(), &keys.rlk_text()).unwrap();
        registry
            .get(&first)
            .unwrap()
            .register_response("alice", &keys.encrypt_text(&[1; 7]))
            .unwrap();

        let second = registry.create_poll(&keys.pk_text(), &keys.rlk_text()).unwrap();
        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&second).unwrap().response_count(), 0);
    }

    #[test]
    fn test_concurrent_creation() {
        let params = Keys::generate().par;
        let registry = Registry::new(params);
        let key_sets: Vec<Keys> = (0..8).map(|_| Keys::generate()).collect();

        let ids: Vec<PollId> = thread::scope(|s| {
            let handles: Vec<_> = key_sets
                .iter()
                .map(|keys| {
                    let registry = &registry;
                    s.spawn(move || registry.create_poll(&keys.pk_text(), &keys.rlk_text()).unwrap())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(registry.len(), 8);
        for id in &ids {
            assert!(registry.get(id).is_some());
        }
    }

    #[test]
    fn test_concurrent_responses_not_lost() {
        let keys = Keys::generate();
        let registry = Registry::new(keys.par.clone());
        let id = registry.create_poll(&keys.pk_text(), &keys.rlk_text()).unwrap();
        let cts: Vec<String> = (0..16).map(|_| keys.encrypt_text(&[1; 7])).collect();

        thread::scope(|s| {
            for (i, ct) in cts.iter().enumerate() {
                let registry = &registry;
                let id = &id;
                s.spawn(move || {
                    let poll = registry.get(id).unwrap();
                    poll.register_response(&format!("participant-{i:02}"), ct).unwrap();
                });
            }
        });

        let poll = registry.get(&id).unwrap();
        assert_eq!(poll.response_count(), 16);
    }

    #[test]
    fn test_responses_racing_close() {
        let keys = Keys::generate();
        let registry = Registry::new(keys.par.clone());
        let id = registry.create_poll(&keys.pk_text(), &keys.rlk_text()).unwrap();
        let poll = registry.get(&id).unwrap();
        poll.register_response("seed", &keys.encrypt_text(&[1; 7])).unwrap();
        let cts: Vec<String> = (0..8).map(|_| keys.encrypt_text(&[1; 7])).collect();

        let accepted: usize = thread::scope(|s| {
            let closer = {
                let poll = poll.clone();
                s.spawn(move || poll.close(&BfvEvaluator).unwrap())
            };
            let submitters: Vec<_> = cts
                .iter()
                .enumerate()
                .map(|(i, ct)| {
                    let poll = poll.clone();
                    s.spawn(move || poll.register_response(&format!("p{i}"), ct).is_ok())
                })
                .collect();
            closer.join().unwrap();
            submitters
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(poll.lifecycle(), Lifecycle::Closed);
        // Whatever was accepted went in before the close froze the responses
        assert_eq!(poll.response_count(), accepted + 1);
        assert!(poll.result().is_some());
    }
}
