//! Live broadcast of poll counts
//!
//! Connections join poll rooms; a publish pushes the payload to every
//! connection currently in the room. Nothing is stored or replayed: a
//! connection that is not in the room at publish time, or whose queue is full,
//! never sees the update.

pub mod protocol;
pub mod rooms;

use crate::Result;
use crate::types::PollUpdate;

pub use protocol::{ClientEvent, ServerEvent};
pub use rooms::{CONNECTION_QUEUE_CAPACITY, ConnectionId, PollRooms};

/// Sink for recomputed poll counts
///
/// The vote service is handed one of these at construction.
pub trait PollPublisher: Send + Sync {
    /// Deliver the update to the room of `update.poll_id` and return how many
    /// connections it reached. An empty room is not an error.
    fn publish(&self, update: &PollUpdate) -> Result<usize>;
}
