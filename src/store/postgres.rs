//! PostgreSQL store
//!
//! Schema lives in `migrations/`. `votes` carries the option's `poll_id` and a
//! `UNIQUE (user_id, poll_id)` constraint, so `insert_vote` is a single
//! `INSERT .. ON CONFLICT DO NOTHING` and the database is the final arbiter of
//! one vote per user per poll.

use super::{INVALID_USER, VoteInsert, VoteStore};
use crate::config::StoreConfig;
use crate::types::{OptionCount, Poll, PollId, PollOption, User, Vote};
use crate::{Error, Result, conflict_error, validation_error};
use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Foreign key from `votes (option_id, poll_id)` to `poll_options`
const VOTES_OPTION_FKEY: &str = "votes_option_fkey";

pub struct PgStore {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct CountRow {
    id: String,
    text: String,
    count: i64,
}

impl From<CountRow> for OptionCount {
    fn from(row: CountRow) -> Self {
        Self {
            id: row.id,
            text: row.text,
            count: u64::try_from(row.count).unwrap_or_default(),
        }
    }
}

impl PgStore {
    /// Connect using the configured URL and bring the schema up to date
    pub async fn connect(config: &StoreConfig) -> Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .ok_or_else(|| Error::internal("DATABASE_URL must be set for the PostgreSQL store"))?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(database_url)
            .await?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::internal(format!("Migration failed: {e}")))?;

        tracing::info!("Database schema is up to date");
        Ok(())
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_foreign_key_violation())
}

/// Name of the violated constraint, if the database reported one
fn violated_constraint(err: &sqlx::Error) -> Option<&str> {
    match err {
        sqlx::Error::Database(db) => db.constraint(),
        _ => None,
    }
}

#[async_trait]
impl VoteStore for PgStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        let result = sqlx::query(
            "INSERT INTO users (id, name, email, password_hash, created_at) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(e) if is_unique_violation(&e) => Err(conflict_error!("Email already in use")),
            Err(e) => Err(e.into()),
        }
    }

    async fn user(&self, user_id: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn insert_poll(&self, poll: Poll, options: Vec<PollOption>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO polls (id, question, is_published, creator_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(&poll.id)
        .bind(&poll.question)
        .bind(poll.is_published)
        .bind(&poll.creator_id)
        .bind(poll.created_at)
        .bind(poll.updated_at)
        .execute(&mut *tx)
        .await;

        match result {
            Ok(_) => {}
            Err(e) if is_foreign_key_violation(&e) => {
                return Err(validation_error!("Creator not found"));
            }
            Err(e) => return Err(e.into()),
        }

        for option in &options {
            sqlx::query("INSERT INTO poll_options (id, poll_id, text) VALUES ($1, $2, $3)")
                .bind(&option.id)
                .bind(&option.poll_id)
                .bind(&option.text)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn poll(&self, poll_id: &str) -> Result<Option<Poll>> {
        let poll = sqlx::query_as::<_, Poll>(
            "SELECT id, question, is_published, creator_id, created_at, updated_at FROM polls \
             WHERE id = $1",
        )
        .bind(poll_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(poll)
    }

    async fn polls(&self) -> Result<Vec<Poll>> {
        let polls = sqlx::query_as::<_, Poll>(
            "SELECT id, question, is_published, creator_id, created_at, updated_at FROM polls \
             ORDER BY created_at DESC, id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(polls)
    }

    async fn poll_id_for_option(&self, option_id: &str) -> Result<Option<PollId>> {
        let poll_id =
            sqlx::query_scalar::<_, String>("SELECT poll_id FROM poll_options WHERE id = $1")
                .bind(option_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(poll_id)
    }

    async fn has_voted(&self, user_id: &str, poll_id: &str) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM votes WHERE user_id = $1 AND poll_id = $2)",
        )
        .bind(user_id)
        .bind(poll_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn insert_vote(&self, vote: Vote) -> Result<VoteInsert> {
        let result = sqlx::query(
            "INSERT INTO votes (id, user_id, option_id, poll_id, created_at) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT ON CONSTRAINT votes_user_poll_key DO NOTHING",
        )
        .bind(&vote.id)
        .bind(&vote.user_id)
        .bind(&vote.option_id)
        .bind(&vote.poll_id)
        .bind(vote.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Ok(VoteInsert::AlreadyVoted),
            Ok(_) => Ok(VoteInsert::Inserted(vote)),
            Err(e) if is_foreign_key_violation(&e) => match violated_constraint(&e) {
                Some(VOTES_OPTION_FKEY) => Err(validation_error!("Invalid optionId")),
                _ => Err(validation_error!(INVALID_USER)),
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn option_counts(&self, poll_id: &str) -> Result<Vec<OptionCount>> {
        let rows = sqlx::query_as::<_, CountRow>(
            "SELECT o.id, o.text, COUNT(v.id) AS count \
             FROM poll_options o LEFT JOIN votes v ON v.option_id = o.id \
             WHERE o.poll_id = $1 \
             GROUP BY o.id, o.text \
             ORDER BY o.text ASC, o.id ASC",
        )
        .bind(poll_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OptionCount::from).collect())
    }
}
