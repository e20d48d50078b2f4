//! # Core Types for the Poll Service
//!
//! Fundamental records persisted by the store, the request bodies accepted over
//! HTTP, and the views returned to clients.
//!
//! ## Type Categories
//!
//! ### Stored Records
//! - [`User`]: registered account, never serialized with its password hash
//! - [`Poll`]: question owned by one creator
//! - [`PollOption`]: selectable choice belonging to exactly one poll
//! - [`Vote`]: one user's choice of one option
//!
//! ### Requests
//! - [`VoteRequest`], [`CreateUserRequest`], [`CreatePollRequest`]
//!
//! ### Views
//! - [`OptionCount`], [`PollUpdate`], [`PollView`], [`UserView`]
//!
//! All wire types use camelCase field names.
//!
//! ## Usage Examples
//!
//! ```rust
//! use livepoll::types::VoteRequest;
//!
//! let request = VoteRequest {
//!     user_id: " u1 ".to_string(),
//!     option_id: "o1".to_string(),
//! };
//!
//! let request = request.validated().unwrap();
//! assert_eq!(request.user_id, "u1");
//! ```

use crate::{Result, validation_error};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque user identifier
pub type UserId = String;

/// Opaque poll identifier
pub type PollId = String;

/// Opaque option identifier
pub type OptionId = String;

/// Generate a fresh identifier for a new row
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// A registered user
///
/// The password hash never leaves the server: it is skipped on serialization
/// and [`UserView`] is what handlers return.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a [`User`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserView {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }
}

/// A poll question
///
/// Options are created together with the poll and never added or removed
/// afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Poll {
    pub id: PollId,
    pub question: String,
    pub is_published: bool,
    pub creator_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A selectable choice within a poll
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct PollOption {
    pub id: OptionId,
    pub poll_id: PollId,
    pub text: String,
}

/// A cast vote
///
/// The persisted relation is (user, option). `poll_id` is the owning poll of
/// the option, carried so that uniqueness can be enforced per (user, poll).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub user_id: UserId,
    pub option_id: OptionId,
    pub poll_id: PollId,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    /// Create a new vote record
    pub fn new(user_id: UserId, option_id: OptionId, poll_id: PollId) -> Self {
        Self {
            id: new_id(),
            user_id,
            option_id,
            poll_id,
            created_at: Utc::now(),
        }
    }
}

/// An option together with the number of votes cast for it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionCount {
    pub id: OptionId,
    pub text: String,
    pub count: u64,
}

/// Sort counts by option text, then id, so every reader sees the same order
pub fn sort_counts(counts: &mut [OptionCount]) {
    counts.sort_by(|a, b| a.text.cmp(&b.text).then_with(|| a.id.cmp(&b.id)));
}

/// Recomputed counts for one poll
///
/// Returned from `POST /votes` and pushed to the poll's room as the
/// `pollUpdated` payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollUpdate {
    pub poll_id: PollId,
    pub options: Vec<OptionCount>,
}

impl PollUpdate {
    /// Total votes across all options
    pub fn total_votes(&self) -> u64 {
        self.options.iter().map(|option| option.count).sum()
    }
}

/// Creator summary embedded in a [`PollView`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatorView {
    pub id: UserId,
    pub name: String,
}

/// A poll with its creator and live option counts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollView {
    pub id: PollId,
    pub question: String,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub creator: CreatorView,
    pub options: Vec<OptionCount>,
}

/// Body of `POST /votes`
///
/// Missing fields deserialize as empty strings so that they are reported by
/// [`VoteRequest::validated`] as validation failures.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteRequest {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub option_id: String,
}

impl VoteRequest {
    /// Trim both references and reject empty ones
    pub fn validated(self) -> Result<Self> {
        let user_id = required(self.user_id, "userId")?;
        let option_id = required(self.option_id, "optionId")?;

        Ok(Self { user_id, option_id })
    }
}

/// Body of `POST /users`
#[derive(Clone, Default, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 6;

impl CreateUserRequest {
    /// Check name, email and password
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(validation_error!("name is required"));
        }

        if !is_valid_email(self.email.trim()) {
            return Err(validation_error!("email must be a valid email address"));
        }

        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(validation_error!(
                "password must be at least {} characters",
                MIN_PASSWORD_LEN
            ));
        }

        Ok(())
    }
}

/// Body of `POST /polls`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePollRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub is_published: Option<bool>,
    #[serde(default)]
    pub creator_id: String,
    #[serde(default)]
    pub options: Vec<String>,
}

/// Minimum number of options a poll is created with
pub const MIN_POLL_OPTIONS: usize = 2;

impl CreatePollRequest {
    /// Trim every text field and reject empty ones
    pub fn validated(self) -> Result<Self> {
        let question = required(self.question, "question")?;
        let creator_id = required(self.creator_id, "creatorId")?;

        if self.options.len() < MIN_POLL_OPTIONS {
            return Err(validation_error!(
                "options must contain at least {} entries",
                MIN_POLL_OPTIONS
            ));
        }

        let options = self
            .options
            .into_iter()
            .map(|text| required(text, "options"))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            question,
            is_published: Some(self.is_published.unwrap_or(false)),
            creator_id,
            options,
        })
    }
}

fn required(value: String, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(validation_error!("{} is required", field));
    }
    Ok(trimmed.to_string())
}

/// Shape check only: one `@`, a non-empty local part and a dotted domain
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
