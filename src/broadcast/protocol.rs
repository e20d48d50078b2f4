//! Real-time wire protocol
//!
//! Every frame is a JSON object `{"event": <name>, "data": <payload>}`.

use crate::types::{PollId, PollUpdate};
use serde::{Deserialize, Serialize};

/// Events sent by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientEvent {
    /// Join the room of a poll
    JoinPoll(PollId),

    /// Leave the room of a poll
    LeavePoll(PollId),
}

/// Events pushed to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Fresh counts for a poll the client joined
    PollUpdated(PollUpdate),
}
