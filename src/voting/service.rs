//! Vote submission service
//!
//! Validates a vote, enforces one vote per user per poll, persists it,
//! recomputes the poll's counts and pushes them to the poll room.
//!
//! Submission flow:
//! 1. Reject empty `userId` / `optionId`
//! 2. Resolve the option to its poll (unknown option is a validation error)
//! 3. Take the (user, poll) lock, check for an existing vote, insert
//! 4. Recompute counts for every option of the poll
//! 5. Publish the counts; a publish failure is logged and never fails the vote

use crate::broadcast::PollPublisher;
use crate::store::{VoteInsert, VoteStore};
use crate::types::{PollUpdate, Vote, VoteRequest};
use crate::voting::PollLockService;
use crate::{Result, conflict_error, validation_error};
use std::sync::Arc;

/// Message returned for a second vote in the same poll
pub const ALREADY_VOTED: &str = "User has already voted in this poll";

pub struct VoteService {
    store: Arc<dyn VoteStore>,
    publisher: Arc<dyn PollPublisher>,
    locks: PollLockService,
}

impl VoteService {
    pub fn new(
        store: Arc<dyn VoteStore>,
        publisher: Arc<dyn PollPublisher>,
        locks: PollLockService,
    ) -> Self {
        Self {
            store,
            publisher,
            locks,
        }
    }

    /// Cast a vote and return the poll's recomputed counts
    pub async fn submit_vote(&self, request: VoteRequest) -> Result<PollUpdate> {
        let VoteRequest { user_id, option_id } = request.validated()?;

        let poll_id = self
            .store
            .poll_id_for_option(&option_id)
            .await?
            .ok_or_else(|| validation_error!("Invalid optionId"))?;

        {
            let _guard = self.locks.acquire(&user_id, &poll_id).await?;

            if self.store.has_voted(&user_id, &poll_id).await? {
                tracing::info!(user_id = %user_id, poll_id = %poll_id, "Duplicate vote rejected");
                return Err(conflict_error!(ALREADY_VOTED));
            }

            let vote = Vote::new(user_id.clone(), option_id, poll_id.clone());
            match self.store.insert_vote(vote).await? {
                VoteInsert::Inserted(vote) => {
                    tracing::info!(
                        vote_id = %vote.id,
                        user_id = %vote.user_id,
                        option_id = %vote.option_id,
                        poll_id = %vote.poll_id,
                        "Vote recorded"
                    );
                }
                VoteInsert::AlreadyVoted => {
                    tracing::warn!(
                        user_id = %user_id,
                        poll_id = %poll_id,
                        "Store rejected duplicate vote"
                    );
                    return Err(conflict_error!(ALREADY_VOTED));
                }
            }
        }

        let options = self.store.option_counts(&poll_id).await?;
        let update = PollUpdate { poll_id, options };

        self.broadcast(&update);

        Ok(update)
    }

    fn broadcast(&self, update: &PollUpdate) {
        match self.publisher.publish(update) {
            Ok(delivered) => {
                tracing::debug!(poll_id = %update.poll_id, delivered, "Vote counts broadcast");
            }
            Err(e) => {
                tracing::warn!(
                    poll_id = %update.poll_id,
                    error = %e,
                    "Vote count broadcast failed"
                );
            }
        }
    }
}
