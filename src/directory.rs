//! User registration and poll reads/creation
//!
//! Thin layer over [`VoteStore`]: request validation, id generation, password
//! hashing and assembly of [`PollView`]s with live counts.

use crate::password::PasswordHasher;
use crate::store::VoteStore;
use crate::types::{
    CreatePollRequest, CreateUserRequest, CreatorView, OptionCount, Poll, PollOption, PollView,
    User, UserView, new_id,
};
use crate::{Error, Result};
use chrono::Utc;
use std::sync::Arc;
use zeroize::Zeroize;

pub struct Directory {
    store: Arc<dyn VoteStore>,
    hasher: PasswordHasher,
}

impl Directory {
    pub fn new(store: Arc<dyn VoteStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    /// Register a user. The plaintext password is wiped once hashed.
    pub async fn register_user(&self, mut request: CreateUserRequest) -> Result<UserView> {
        request.validate()?;

        // Argon2 is CPU-bound; hash on the blocking pool.
        let hasher = self.hasher.clone();
        let mut password = std::mem::take(&mut request.password);
        let password_hash = tokio::task::spawn_blocking(move || {
            let hashed = hasher.hash(&password);
            password.zeroize();
            hashed
        })
        .await
        .map_err(|e| Error::internal(format!("Password hashing task failed: {e}")))??;

        let user = User {
            id: new_id(),
            name: request.name.trim().to_string(),
            email: request.email.trim().to_string(),
            password_hash,
            created_at: Utc::now(),
        };

        let user = self.store.insert_user(user).await?;
        tracing::info!(user_id = %user.id, "User registered");

        Ok(UserView::from(&user))
    }

    pub async fn get_user(&self, user_id: &str) -> Result<UserView> {
        self.store
            .user(user_id)
            .await?
            .map(|user| UserView::from(&user))
            .ok_or_else(|| Error::not_found("User not found"))
    }

    /// Create a poll together with its options
    pub async fn create_poll(&self, request: CreatePollRequest) -> Result<PollView> {
        let request = request.validated()?;

        let now = Utc::now();
        let poll = Poll {
            id: new_id(),
            question: request.question,
            is_published: request.is_published.unwrap_or(false),
            creator_id: request.creator_id,
            created_at: now,
            updated_at: now,
        };

        let options: Vec<PollOption> = request
            .options
            .into_iter()
            .map(|text| PollOption {
                id: new_id(),
                poll_id: poll.id.clone(),
                text,
            })
            .collect();

        self.store.insert_poll(poll.clone(), options).await?;
        tracing::info!(poll_id = %poll.id, creator_id = %poll.creator_id, "Poll created");

        self.view(poll).await
    }

    /// Every poll, newest first
    pub async fn list_polls(&self) -> Result<Vec<PollView>> {
        let polls = self.store.polls().await?;

        let mut views = Vec::with_capacity(polls.len());
        for poll in polls {
            views.push(self.view(poll).await?);
        }
        Ok(views)
    }

    pub async fn get_poll(&self, poll_id: &str) -> Result<PollView> {
        let poll = self
            .store
            .poll(poll_id)
            .await?
            .ok_or_else(|| Error::not_found("Poll not found"))?;

        self.view(poll).await
    }

    async fn view(&self, poll: Poll) -> Result<PollView> {
        let creator = self
            .store
            .user(&poll.creator_id)
            .await?
            .map(|user| CreatorView {
                id: user.id,
                name: user.name,
            })
            .ok_or_else(|| Error::internal(format!("Poll {} has no creator", poll.id)))?;

        let options: Vec<OptionCount> = self.store.option_counts(&poll.id).await?;

        Ok(PollView {
            id: poll.id,
            question: poll.question,
            is_published: poll.is_published,
            created_at: poll.created_at,
            updated_at: poll.updated_at,
            creator,
            options,
        })
    }
}
