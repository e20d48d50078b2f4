//! Vote submission

pub mod lock;
pub mod service;

pub use lock::{PollLockService, PollVoteGuard};
pub use service::{ALREADY_VOTED, VoteService};
