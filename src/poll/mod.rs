//! Encrypted polls
//!
//! A poll is created from a participant-generated public key and relinearization
//! key. Participants submit encrypted availability vectors under the public key;
//! closing the poll multiplies them together (see [`crate::aggregate`]) so that
//! only the key holder learns the slots every participant is available for.
//!
//! # Lifecycle
//!
//! ```text
//! Open ──close──▶ Closing ──aggregation ok──▶ Closed
//!   ▲                │
//!   └──aggregation failed
//! ```
//!
//! Responses are accepted only while Open. A resubmission from the same
//! participant replaces the previous ciphertext. The result is written exactly
//! once, together with the Closed transition.

mod entity;
mod error;
mod registry;

pub use entity::{Lifecycle, Poll, PollId, PollSnapshot};
pub use error::{PollError, Result};
pub use registry::{PollHandle, Registry};
