//! Private polls: scheduling over encrypted availabilities
//!
//! A poll owner generates a BFV key pair and opens a poll with the public and
//! relinearization keys. Participants encrypt a 0/1 availability vector under the
//! public key. When the poll is closed the server multiplies all responses
//! homomorphically, producing a ciphertext of the slot-wise AND that only the
//! owner can decrypt. The server never sees a plaintext response.
//!
//! Key components:
//! - [`codec`]: base64 transport encoding and fingerprints of keys and ciphertexts
//! - [`poll`]: poll lifecycle and the registry of polls
//! - [`aggregate`]: queue-order multiply/relinearize reduction
//! - [`protocol`]: request-level operations for a transport layer
//! - [`client`]: participant session (key generation, encryption, decryption)

pub mod params;
pub mod codec;
pub mod aggregate;
pub mod poll;
pub mod protocol;
pub mod client;
#[cfg(feature = "server")]
pub mod http;

pub use aggregate::{aggregate, AggregationError, BfvEvaluator, Evaluator};
pub use client::{ClientError, KeyBundle, PollClient};
pub use codec::{decode_from_text, encode_to_text, fingerprint, DecodeError, NIL};
pub use params::{PollParams, VECTOR_LEN};
pub use poll::{Lifecycle, Poll, PollError, PollHandle, PollId, PollSnapshot, Registry};
pub use protocol::{PollService, ProtocolError};
