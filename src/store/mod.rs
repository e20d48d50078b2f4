//! Persistence for users, polls, options and votes
//!
//! Every backend implements [`VoteStore`]. The one rule a backend must enforce
//! itself is vote uniqueness per (user, poll): [`VoteStore::insert_vote`] is a
//! single conditional insert and reports [`VoteInsert::AlreadyVoted`] instead
//! of writing a second row.

pub mod memory;
pub mod postgres;

use crate::Result;
use crate::config::StoreConfig;
use crate::types::{OptionCount, Poll, PollId, PollOption, User, Vote};
use async_trait::async_trait;
use std::sync::Arc;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Message returned when a vote references a user that does not exist
pub const INVALID_USER: &str = "Invalid userId";

/// Outcome of a conditional vote insert
#[derive(Debug, Clone, PartialEq)]
pub enum VoteInsert {
    /// The vote was written
    Inserted(Vote),

    /// A vote by this user already exists somewhere in the poll; nothing was written
    AlreadyVoted,
}

#[async_trait]
pub trait VoteStore: Send + Sync {
    /// Insert a new user. Fails with a conflict if the email is taken.
    async fn insert_user(&self, user: User) -> Result<User>;

    async fn user(&self, user_id: &str) -> Result<Option<User>>;

    /// Insert a poll and all of its options in one step. Fails with a
    /// validation error if the creator does not exist.
    async fn insert_poll(&self, poll: Poll, options: Vec<PollOption>) -> Result<()>;

    async fn poll(&self, poll_id: &str) -> Result<Option<Poll>>;

    /// All polls, newest first
    async fn polls(&self) -> Result<Vec<Poll>>;

    /// Resolve an option to the poll that owns it
    async fn poll_id_for_option(&self, option_id: &str) -> Result<Option<PollId>>;

    /// Whether the user has a vote on any option of the poll
    async fn has_voted(&self, user_id: &str, poll_id: &str) -> Result<bool>;

    /// Insert the vote unless the user already voted in `vote.poll_id`.
    /// A vote for an unknown user fails with a validation error.
    async fn insert_vote(&self, vote: Vote) -> Result<VoteInsert>;

    /// Per-option vote counts for every option of the poll, ordered by option text
    async fn option_counts(&self, poll_id: &str) -> Result<Vec<OptionCount>>;
}

/// Open the configured backend: PostgreSQL when a database URL is set,
/// otherwise a fresh in-memory store.
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn VoteStore>> {
    match config.database_url {
        Some(_) => {
            tracing::info!("Using PostgreSQL store");
            Ok(Arc::new(PgStore::connect(config).await?))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
