//! Poll room registry
//!
//! Two indexes behind one `RwLock`: poll → members and connection → joined
//! polls. The reverse index is what lets `disconnect` clear every room a
//! connection joined without scanning the whole map.
//!
//! Each connection has a bounded queue. A publish never waits on a slow
//! reader: when its queue is full the update is dropped for that connection.

use super::{PollPublisher, ServerEvent};
use crate::types::{PollId, PollUpdate};
use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc::{self, Receiver, Sender, error::TrySendError};
use uuid::Uuid;

/// Identifier of one live connection
pub type ConnectionId = Uuid;

/// Events buffered per connection before further updates are dropped
pub const CONNECTION_QUEUE_CAPACITY: usize = 64;

struct Connection {
    sender: Sender<ServerEvent>,
    polls: HashSet<PollId>,
}

#[derive(Default)]
struct Registry {
    rooms: HashMap<PollId, HashSet<ConnectionId>>,
    connections: HashMap<ConnectionId, Connection>,
}

/// Rooms keyed by poll identifier
#[derive(Default)]
pub struct PollRooms {
    registry: RwLock<Registry>,
}

impl PollRooms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection and hand back the queue its events arrive on
    pub fn connect(&self) -> Result<(ConnectionId, Receiver<ServerEvent>)> {
        let (sender, receiver) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);
        let connection_id = Uuid::new_v4();

        self.write()?.connections.insert(
            connection_id,
            Connection {
                sender,
                polls: HashSet::new(),
            },
        );

        tracing::debug!(%connection_id, "Connection registered");
        Ok((connection_id, receiver))
    }

    /// Add the connection to the poll's room. Returns `false` if it was
    /// already a member.
    pub fn subscribe(&self, connection_id: ConnectionId, poll_id: &str) -> Result<bool> {
        let mut registry = self.write()?;

        let connection = registry
            .connections
            .get_mut(&connection_id)
            .ok_or_else(|| Error::internal(format!("Unknown connection {connection_id}")))?;

        if !connection.polls.insert(poll_id.to_string()) {
            return Ok(false);
        }

        registry
            .rooms
            .entry(poll_id.to_string())
            .or_default()
            .insert(connection_id);

        tracing::debug!(%connection_id, poll_id, "Joined poll room");
        Ok(true)
    }

    /// Remove the connection from the poll's room only. Returns `false` if it
    /// was not a member.
    pub fn unsubscribe(&self, connection_id: ConnectionId, poll_id: &str) -> Result<bool> {
        let mut registry = self.write()?;

        let was_member = registry
            .connections
            .get_mut(&connection_id)
            .is_some_and(|connection| connection.polls.remove(poll_id));

        if was_member {
            leave_room(&mut registry.rooms, poll_id, connection_id);
            tracing::debug!(%connection_id, poll_id, "Left poll room");
        }

        Ok(was_member)
    }

    /// Forget the connection and remove it from every room it joined
    pub fn disconnect(&self, connection_id: ConnectionId) -> Result<()> {
        let mut registry = self.write()?;

        if let Some(connection) = registry.connections.remove(&connection_id) {
            for poll_id in &connection.polls {
                leave_room(&mut registry.rooms, poll_id, connection_id);
            }

            tracing::debug!(
                %connection_id,
                rooms_left = connection.polls.len(),
                "Connection closed"
            );
        }

        Ok(())
    }

    /// Push an event to every member of the poll's room. Members whose queue
    /// is full or closed are skipped.
    pub fn publish_event(&self, poll_id: &str, event: &ServerEvent) -> Result<usize> {
        let registry = self.read()?;

        let Some(members) = registry.rooms.get(poll_id) else {
            return Ok(0);
        };

        let mut delivered = 0;
        for connection_id in members {
            let Some(connection) = registry.connections.get(connection_id) else {
                continue;
            };

            match connection.sender.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::debug!(%connection_id, poll_id, "Queue full, update dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(%connection_id, poll_id, "Skipping closed connection");
                }
            }
        }

        Ok(delivered)
    }

    /// Number of connections in the poll's room
    pub fn room_size(&self, poll_id: &str) -> Result<usize> {
        Ok(self.read()?.rooms.get(poll_id).map_or(0, HashSet::len))
    }

    /// Number of rooms with at least one member
    pub fn room_count(&self) -> Result<usize> {
        Ok(self.read()?.rooms.len())
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> Result<usize> {
        Ok(self.read()?.connections.len())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Registry>> {
        self.registry
            .read()
            .map_err(|_| Error::internal("Room registry read error"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Registry>> {
        self.registry
            .write()
            .map_err(|_| Error::internal("Room registry write error"))
    }
}

fn leave_room(
    rooms: &mut HashMap<PollId, HashSet<ConnectionId>>,
    poll_id: &str,
    connection_id: ConnectionId,
) {
    if let Some(members) = rooms.get_mut(poll_id) {
        members.remove(&connection_id);
        if members.is_empty() {
            rooms.remove(poll_id);
        }
    }
}

impl PollPublisher for PollRooms {
    fn publish(&self, update: &PollUpdate) -> Result<usize> {
        let event = ServerEvent::PollUpdated(update.clone());
        let delivered = self.publish_event(&update.poll_id, &event)?;

        tracing::debug!(poll_id = %update.poll_id, delivered, "Poll update published");
        Ok(delivered)
    }
}
