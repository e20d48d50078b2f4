//! In-process store
//!
//! All tables live behind one `RwLock`, so each trait method observes and
//! mutates a consistent snapshot. `insert_vote` checks and writes under the
//! same write guard, which makes it the atomic conditional insert the vote
//! service relies on.

use super::{INVALID_USER, VoteInsert, VoteStore};
use crate::types::{OptionCount, Poll, PollId, PollOption, User, UserId, Vote, sort_counts};
use crate::{Error, Result, conflict_error, validation_error};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    emails: HashMap<String, UserId>,
    polls: HashMap<PollId, Poll>,
    options: HashMap<String, PollOption>,
    votes: Vec<Vote>,
    voted: HashSet<(UserId, PollId)>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored votes for the poll
    pub fn vote_rows(&self, poll_id: &str) -> Result<usize> {
        let tables = self.read()?;
        Ok(tables
            .votes
            .iter()
            .filter(|vote| vote.poll_id == poll_id)
            .count())
    }

    /// Number of stored votes by the user in the poll
    pub fn votes_by(&self, user_id: &str, poll_id: &str) -> Result<usize> {
        let tables = self.read()?;
        Ok(tables
            .votes
            .iter()
            .filter(|vote| vote.user_id == user_id && vote.poll_id == poll_id)
            .count())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| Error::internal("Memory store read error"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| Error::internal("Memory store write error"))
    }
}

#[async_trait]
impl VoteStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        let mut tables = self.write()?;

        let email_key = user.email.to_lowercase();
        if tables.emails.contains_key(&email_key) {
            return Err(conflict_error!("Email already in use"));
        }

        tables.emails.insert(email_key, user.id.clone());
        tables.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    async fn user(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.read()?.users.get(user_id).cloned())
    }

    async fn insert_poll(&self, poll: Poll, options: Vec<PollOption>) -> Result<()> {
        let mut tables = self.write()?;

        if !tables.users.contains_key(&poll.creator_id) {
            return Err(validation_error!("Creator not found"));
        }

        for option in options {
            tables.options.insert(option.id.clone(), option);
        }
        tables.polls.insert(poll.id.clone(), poll);
        Ok(())
    }

    async fn poll(&self, poll_id: &str) -> Result<Option<Poll>> {
        Ok(self.read()?.polls.get(poll_id).cloned())
    }

    async fn polls(&self) -> Result<Vec<Poll>> {
        let mut polls: Vec<Poll> = self.read()?.polls.values().cloned().collect();
        polls.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(polls)
    }

    async fn poll_id_for_option(&self, option_id: &str) -> Result<Option<PollId>> {
        Ok(self
            .read()?
            .options
            .get(option_id)
            .map(|option| option.poll_id.clone()))
    }

    async fn has_voted(&self, user_id: &str, poll_id: &str) -> Result<bool> {
        Ok(self
            .read()?
            .voted
            .contains(&(user_id.to_string(), poll_id.to_string())))
    }

    async fn insert_vote(&self, vote: Vote) -> Result<VoteInsert> {
        let mut tables = self.write()?;

        if !tables.users.contains_key(&vote.user_id) {
            return Err(validation_error!(INVALID_USER));
        }

        match tables.options.get(&vote.option_id) {
            Some(option) if option.poll_id == vote.poll_id => {}
            _ => return Err(validation_error!("Invalid optionId")),
        }

        if !tables
            .voted
            .insert((vote.user_id.clone(), vote.poll_id.clone()))
        {
            return Ok(VoteInsert::AlreadyVoted);
        }

        tables.votes.push(vote.clone());
        Ok(VoteInsert::Inserted(vote))
    }

    async fn option_counts(&self, poll_id: &str) -> Result<Vec<OptionCount>> {
        let tables = self.read()?;

        let mut counts: HashMap<&str, u64> = HashMap::new();
        for vote in tables.votes.iter().filter(|vote| vote.poll_id == poll_id) {
            *counts.entry(vote.option_id.as_str()).or_default() += 1;
        }

        let mut options: Vec<OptionCount> = tables
            .options
            .values()
            .filter(|option| option.poll_id == poll_id)
            .map(|option| OptionCount {
                id: option.id.clone(),
                text: option.text.clone(),
                count: counts.get(option.id.as_str()).copied().unwrap_or(0),
            })
            .collect();

        sort_counts(&mut options);
        Ok(options)
    }
}
