//! Shared fixtures for integration tests
#![allow(dead_code)]

use chrono::{Duration, Utc};
use livepoll::store::{MemoryStore, VoteStore};
use livepoll::types::{Poll, PollOption, User};
use std::sync::Arc;

/// Store holding users `u1`..`u{users}` and poll `p1` with options
/// `o1` ("A") and `o2` ("B").
pub async fn seeded_store(users: usize) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());

    for n in 1..=users.max(1) {
        store
            .insert_user(User {
                id: format!("u{n}"),
                name: format!("User {n}"),
                email: format!("u{n}@example.com"),
                password_hash: "salt$hash".to_string(),
                created_at: Utc::now(),
            })
            .await
            .expect("seed user");
    }

    add_poll(&store, "p1", &[("o1", "A"), ("o2", "B")], 0).await;
    store
}

/// Add a poll owned by `u1`, created `age_secs` seconds ago
pub async fn add_poll(store: &MemoryStore, poll_id: &str, options: &[(&str, &str)], age_secs: i64) {
    let created_at = Utc::now() - Duration::seconds(age_secs);
    let poll = Poll {
        id: poll_id.to_string(),
        question: format!("Question {poll_id}"),
        is_published: true,
        creator_id: "u1".to_string(),
        created_at,
        updated_at: created_at,
    };

    let options = options
        .iter()
        .map(|(id, text)| PollOption {
            id: id.to_string(),
            poll_id: poll_id.to_string(),
            text: text.to_string(),
        })
        .collect();

    store.insert_poll(poll, options).await.expect("seed poll");
}
