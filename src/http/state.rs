//! Shared handler state

use std::sync::Arc;

use crate::broadcast::PollRooms;
use crate::directory::Directory;
use crate::password::PasswordHasher;
use crate::store::VoteStore;
use crate::voting::{PollLockService, VoteService};

#[derive(Clone)]
pub struct AppState {
    pub votes: Arc<VoteService>,
    pub directory: Arc<Directory>,
    pub rooms: Arc<PollRooms>,
}

impl AppState {
    /// Wire the services around one store. The room registry is handed to the
    /// vote service as its publisher.
    pub fn new(store: Arc<dyn VoteStore>, hasher: PasswordHasher) -> Self {
        let rooms = Arc::new(PollRooms::new());
        let votes = Arc::new(VoteService::new(
            store.clone(),
            rooms.clone(),
            PollLockService::new(),
        ));
        let directory = Arc::new(Directory::new(store, hasher));

        Self {
            votes,
            directory,
            rooms,
        }
    }
}
