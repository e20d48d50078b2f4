//! End-to-end tests of vote submission and the live broadcast that follows it
//!
//! Covers:
//! - The one-vote-per-user-per-poll rule, including a 50-way race
//! - Validation failures leaving the store untouched
//! - Counts matching stored vote rows
//! - Room delivery while subscribed and silence after leaving
//! - Broadcast failures never failing a recorded vote

mod common;

use async_trait::async_trait;
use common::{add_poll, seeded_store};
use livepoll::{
    Error, Result,
    broadcast::{PollPublisher, PollRooms, ServerEvent},
    store::{MemoryStore, VoteInsert, VoteStore},
    types::{OptionCount, Poll, PollId, PollOption, PollUpdate, User, Vote, VoteRequest},
    voting::{ALREADY_VOTED, PollLockService, VoteService},
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_test::{assert_err, assert_ok};

fn vote(user: &str, option: &str) -> VoteRequest {
    VoteRequest {
        user_id: user.to_string(),
        option_id: option.to_string(),
    }
}

fn service_with(store: Arc<MemoryStore>, rooms: Arc<PollRooms>) -> VoteService {
    VoteService::new(store, rooms, PollLockService::new())
}

fn option(id: &str, text: &str, count: u64) -> OptionCount {
    OptionCount {
        id: id.to_string(),
        text: text.to_string(),
        count,
    }
}

#[tokio::test]
async fn test_first_vote_then_conflict_scenario() -> Result<()> {
    let store = seeded_store(1).await;
    let service = service_with(store.clone(), Arc::new(PollRooms::new()));

    let update = service.submit_vote(vote("u1", "o1")).await?;
    assert_eq!(
        update,
        PollUpdate {
            poll_id: "p1".to_string(),
            options: vec![option("o1", "A", 1), option("o2", "B", 0)],
        }
    );

    let err = assert_err!(service.submit_vote(vote("u1", "o2")).await);
    assert!(matches!(err, Error::Conflict { .. }));
    assert_eq!(err.to_string(), ALREADY_VOTED);
    assert_eq!(assert_ok!(store.vote_rows("p1")), 1);

    Ok(())
}

#[tokio::test]
async fn test_fifty_concurrent_votes_one_succeeds() -> Result<()> {
    let store = seeded_store(1).await;
    let service = Arc::new(service_with(store.clone(), Arc::new(PollRooms::new())));

    let mut handles = Vec::new();
    for i in 0..50 {
        let service = service.clone();
        let option_id = if i % 2 == 0 { "o1" } else { "o2" };
        handles.push(tokio::spawn(async move {
            service.submit_vote(vote("u1", option_id)).await
        }));
    }

    let mut inserted = 0;
    let mut conflicts = 0;
    for handle in handles {
        match handle.await.expect("task panicked") {
            Ok(_) => inserted += 1,
            Err(Error::Conflict { .. }) => conflicts += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    assert_eq!(inserted, 1);
    assert_eq!(conflicts, 49);
    assert_eq!(store.votes_by("u1", "p1")?, 1);
    assert_eq!(store.vote_rows("p1")?, 1);

    Ok(())
}

#[tokio::test]
async fn test_concurrent_votes_across_polls_and_users() -> Result<()> {
    let store = seeded_store(5).await;
    add_poll(&store, "p2", &[("o3", "C"), ("o4", "D")], 0).await;
    let service = Arc::new(service_with(store.clone(), Arc::new(PollRooms::new())));

    let mut handles = Vec::new();
    for user in 1..=5 {
        for option_id in ["o1", "o2", "o3", "o4"] {
            for _ in 0..3 {
                let service = service.clone();
                let user_id = format!("u{user}");
                handles.push(tokio::spawn(async move {
                    service.submit_vote(vote(&user_id, option_id)).await
                }));
            }
        }
    }

    let mut inserted = 0;
    for handle in handles {
        if handle.await.expect("task panicked").is_ok() {
            inserted += 1;
        }
    }

    // one vote per user in each of the two polls
    assert_eq!(inserted, 10);
    for user in 1..=5 {
        assert_eq!(store.votes_by(&format!("u{user}"), "p1")?, 1);
        assert_eq!(store.votes_by(&format!("u{user}"), "p2")?, 1);
    }

    Ok(())
}

#[tokio::test]
async fn test_unknown_option_never_mutates() -> Result<()> {
    let store = seeded_store(1).await;
    let rooms = Arc::new(PollRooms::new());
    let (connection, mut events) = rooms.connect()?;
    rooms.subscribe(connection, "p1")?;
    let service = service_with(store.clone(), rooms);

    let err = service.submit_vote(vote("u1", "nope")).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    let err = service.submit_vote(vote("", "o1")).await.unwrap_err();
    assert!(matches!(err, Error::Validation { .. }));

    assert_eq!(store.vote_rows("p1")?, 0);
    assert!(!store.has_voted("u1", "p1").await?);
    assert!(events.try_recv().is_err());

    // the user can still vote afterwards
    service.submit_vote(vote("u1", "o2")).await?;
    Ok(())
}

#[tokio::test]
async fn test_counts_sum_to_vote_rows() -> Result<()> {
    let store = seeded_store(7).await;
    let service = service_with(store.clone(), Arc::new(PollRooms::new()));

    let mut last = None;
    for user in 1..=7 {
        let option_id = if user % 3 == 0 { "o2" } else { "o1" };
        last = Some(service.submit_vote(vote(&format!("u{user}"), option_id)).await?);
    }

    let update = last.expect("at least one vote");
    assert_eq!(update.total_votes() as usize, store.vote_rows("p1")?);
    assert_eq!(update.options, vec![option("o1", "A", 5), option("o2", "B", 2)]);

    Ok(())
}

#[tokio::test]
async fn test_subscriber_receives_updates_until_unsubscribed() -> Result<()> {
    let store = seeded_store(3).await;
    let rooms = Arc::new(PollRooms::new());
    let service = service_with(store, rooms.clone());

    let (watcher, mut watcher_events) = rooms.connect()?;
    let (leaver, mut leaver_events) = rooms.connect()?;
    let (dropper, mut dropper_events) = rooms.connect()?;
    for connection in [watcher, leaver, dropper] {
        rooms.subscribe(connection, "p1")?;
    }

    let first = service.submit_vote(vote("u1", "o1")).await?;
    for events in [&mut watcher_events, &mut leaver_events, &mut dropper_events] {
        let ServerEvent::PollUpdated(received) = events.try_recv().expect("update delivered");
        assert_eq!(received, first);
    }

    rooms.unsubscribe(leaver, "p1")?;
    rooms.disconnect(dropper)?;

    let second = service.submit_vote(vote("u2", "o2")).await?;
    let ServerEvent::PollUpdated(received) = watcher_events.try_recv().expect("update delivered");
    assert_eq!(received, second);
    assert!(leaver_events.try_recv().is_err());
    assert!(dropper_events.try_recv().is_err());

    Ok(())
}

#[tokio::test]
async fn test_updates_only_reach_their_poll_room() -> Result<()> {
    let store = seeded_store(1).await;
    add_poll(&store, "p2", &[("o3", "C"), ("o4", "D")], 0).await;
    let rooms = Arc::new(PollRooms::new());
    let service = service_with(store, rooms.clone());

    let (other, mut other_events) = rooms.connect()?;
    rooms.subscribe(other, "p2")?;

    service.submit_vote(vote("u1", "o1")).await?;
    assert!(other_events.try_recv().is_err());

    Ok(())
}

struct FailingPublisher {
    calls: AtomicUsize,
}

impl PollPublisher for FailingPublisher {
    fn publish(&self, _update: &PollUpdate) -> Result<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(Error::internal("broadcast channel closed"))
    }
}

#[tokio::test]
async fn test_broadcast_failure_does_not_fail_vote() -> Result<()> {
    let store = seeded_store(1).await;
    let publisher = Arc::new(FailingPublisher {
        calls: AtomicUsize::new(0),
    });
    let service = VoteService::new(store.clone(), publisher.clone(), PollLockService::new());

    let update = service.submit_vote(vote("u1", "o2")).await?;

    assert_eq!(update.total_votes(), 1);
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.vote_rows("p1")?, 1);

    Ok(())
}

#[tokio::test]
async fn test_conflict_does_not_broadcast() -> Result<()> {
    let store = seeded_store(1).await;
    let publisher = Arc::new(FailingPublisher {
        calls: AtomicUsize::new(0),
    });
    let service = VoteService::new(store, publisher.clone(), PollLockService::new());

    service.submit_vote(vote("u1", "o1")).await?;
    let _ = service.submit_vote(vote("u1", "o1")).await.unwrap_err();

    assert_eq!(publisher.calls.load(Ordering::SeqCst), 1);
    Ok(())
}

/// Store whose existence check always misses, leaving the conditional insert
/// as the only guard.
struct BlindCheckStore {
    inner: MemoryStore,
}

#[async_trait]
impl VoteStore for BlindCheckStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        self.inner.insert_user(user).await
    }

    async fn user(&self, user_id: &str) -> Result<Option<User>> {
        self.inner.user(user_id).await
    }

    async fn insert_poll(&self, poll: Poll, options: Vec<PollOption>) -> Result<()> {
        self.inner.insert_poll(poll, options).await
    }

    async fn poll(&self, poll_id: &str) -> Result<Option<Poll>> {
        self.inner.poll(poll_id).await
    }

    async fn polls(&self) -> Result<Vec<Poll>> {
        self.inner.polls().await
    }

    async fn poll_id_for_option(&self, option_id: &str) -> Result<Option<PollId>> {
        self.inner.poll_id_for_option(option_id).await
    }

    async fn has_voted(&self, _user_id: &str, _poll_id: &str) -> Result<bool> {
        Ok(false)
    }

    async fn insert_vote(&self, vote: Vote) -> Result<VoteInsert> {
        self.inner.insert_vote(vote).await
    }

    async fn option_counts(&self, poll_id: &str) -> Result<Vec<OptionCount>> {
        self.inner.option_counts(poll_id).await
    }
}

#[tokio::test]
async fn test_store_level_uniqueness_backstop() -> Result<()> {
    let seeded = seeded_store(1).await;
    let inner = Arc::try_unwrap(seeded).unwrap_or_else(|_| panic!("store still shared"));
    let store = Arc::new(BlindCheckStore { inner });
    let service = VoteService::new(
        store.clone(),
        Arc::new(PollRooms::new()),
        PollLockService::new(),
    );

    service.submit_vote(vote("u1", "o1")).await?;
    let err = service.submit_vote(vote("u1", "o2")).await.unwrap_err();

    assert_eq!(err.to_string(), ALREADY_VOTED);
    assert_eq!(store.inner.vote_rows("p1")?, 1);
    Ok(())
}

/// Store that is reachable for lookups but fails every count query
struct BrokenCountsStore {
    inner: Arc<MemoryStore>,
}

#[async_trait]
impl VoteStore for BrokenCountsStore {
    async fn insert_user(&self, user: User) -> Result<User> {
        self.inner.insert_user(user).await
    }

    async fn user(&self, user_id: &str) -> Result<Option<User>> {
        self.inner.user(user_id).await
    }

    async fn insert_poll(&self, poll: Poll, options: Vec<PollOption>) -> Result<()> {
        self.inner.insert_poll(poll, options).await
    }

    async fn poll(&self, poll_id: &str) -> Result<Option<Poll>> {
        self.inner.poll(poll_id).await
    }

    async fn polls(&self) -> Result<Vec<Poll>> {
        self.inner.polls().await
    }

    async fn poll_id_for_option(&self, option_id: &str) -> Result<Option<PollId>> {
        self.inner.poll_id_for_option(option_id).await
    }

    async fn has_voted(&self, user_id: &str, poll_id: &str) -> Result<bool> {
        self.inner.has_voted(user_id, poll_id).await
    }

    async fn insert_vote(&self, vote: Vote) -> Result<VoteInsert> {
        self.inner.insert_vote(vote).await
    }

    async fn option_counts(&self, _poll_id: &str) -> Result<Vec<OptionCount>> {
        Err(Error::internal("connection pool exhausted"))
    }
}

#[tokio::test]
async fn test_store_failure_is_internal_error() -> Result<()> {
    let store = Arc::new(BrokenCountsStore {
        inner: seeded_store(1).await,
    });
    let publisher = Arc::new(FailingPublisher {
        calls: AtomicUsize::new(0),
    });
    let service = VoteService::new(store, publisher.clone(), PollLockService::new());

    let err = service.submit_vote(vote("u1", "o1")).await.unwrap_err();

    assert!(matches!(err, Error::Internal { .. }));
    assert!(!err.is_client_error());
    assert_eq!(publisher.calls.load(Ordering::SeqCst), 0);
    Ok(())
}
