//! Pull-request rooms: the process-wide index of live connections.
//!
//! Each websocket connection belongs to at most one room at a time; joining a
//! second room implicitly leaves the first. Membership is ephemeral session
//! state, rebuilt on reconnect, and every mutation of a room's member set is
//! applied under the registry lock so a set is never observed mid-mutation.

use std::collections::HashMap;
use std::sync::Mutex;

use api_types::ServerEvent;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

pub type ConnectionId = Uuid;

pub fn pr_room(project_id: Uuid, pr_number: i64) -> String {
    format!("pr:{project_id}:{pr_number}")
}

#[derive(Default)]
struct Inner {
    /// room key -> connection id -> outbound frame sender
    rooms: HashMap<String, HashMap<ConnectionId, UnboundedSender<String>>>,
    /// connection id -> room key it currently occupies
    joined: HashMap<ConnectionId, String>,
}

impl Inner {
    fn remove_member(&mut self, connection: ConnectionId, room: &str) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&connection);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
    }
}

#[derive(Default)]
pub struct RoomRegistry {
    inner: Mutex<Inner>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection to `room`, leaving any room it currently occupies.
    /// Returns the room size including the new member.
    pub fn join(
        &self,
        connection: ConnectionId,
        sender: UnboundedSender<String>,
        room: &str,
    ) -> usize {
        let mut inner = self.inner.lock().expect("room registry lock poisoned");
        if let Some(previous) = inner.joined.remove(&connection) {
            if previous != room {
                inner.remove_member(connection, &previous);
            }
        }
        inner.joined.insert(connection, room.to_string());
        let members = inner.rooms.entry(room.to_string()).or_default();
        members.insert(connection, sender);
        members.len()
    }

    /// Idempotent: removing a non-member is a no-op.
    pub fn leave(&self, connection: ConnectionId, room: &str) {
        let mut inner = self.inner.lock().expect("room registry lock poisoned");
        if inner.joined.get(&connection).map(String::as_str) == Some(room) {
            inner.joined.remove(&connection);
        }
        inner.remove_member(connection, room);
    }

    /// Drop a connection from whatever room it occupies. No broadcast is
    /// emitted for this.
    pub fn disconnect(&self, connection: ConnectionId) {
        let mut inner = self.inner.lock().expect("room registry lock poisoned");
        if let Some(room) = inner.joined.remove(&connection) {
            inner.remove_member(connection, &room);
        }
    }

    pub fn room_size(&self, room: &str) -> usize {
        let inner = self.inner.lock().expect("room registry lock poisoned");
        inner.rooms.get(room).map_or(0, HashMap::len)
    }

    /// Deliver `event` to every member of `room`, including the connection
    /// that triggered it. Members whose channel is gone are pruned. Returns
    /// the number of connections the event was delivered to.
    pub fn broadcast(&self, room: &str, event: &ServerEvent) -> usize {
        let frame = match serde_json::to_string(event) {
            Ok(frame) => frame,
            Err(error) => {
                tracing::error!(?error, room, "failed to serialize room event");
                return 0;
            }
        };

        let mut guard = self.inner.lock().expect("room registry lock poisoned");
        let inner = &mut *guard;
        let Some(members) = inner.rooms.get_mut(room) else {
            return 0;
        };

        let mut dead: Vec<ConnectionId> = Vec::new();
        let mut delivered = 0;
        for (connection, sender) in members.iter() {
            if sender.send(frame.clone()).is_ok() {
                delivered += 1;
            } else {
                dead.push(*connection);
            }
        }
        for connection in dead {
            members.remove(&connection);
            inner.joined.remove(&connection);
        }
        if inner.rooms.get(room).is_some_and(HashMap::is_empty) {
            inner.rooms.remove(room);
        }
        delivered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};

    fn connect() -> (ConnectionId, UnboundedSender<String>, UnboundedReceiver<String>) {
        let (tx, rx) = unbounded_channel();
        (Uuid::new_v4(), tx, rx)
    }

    fn event() -> ServerEvent {
        ServerEvent::RoomJoined {
            room: "pr:test".to_string(),
            client_count: 1,
        }
    }

    #[test]
    fn join_returns_room_size_including_self() {
        let registry = RoomRegistry::new();
        let (c1, tx1, _rx1) = connect();
        let (c2, tx2, _rx2) = connect();

        assert_eq!(registry.join(c1, tx1, "pr:p:5"), 1);
        assert_eq!(registry.join(c2, tx2, "pr:p:5"), 2);
        assert_eq!(registry.room_size("pr:p:5"), 2);
    }

    #[test]
    fn joining_a_second_room_leaves_the_first() {
        let registry = RoomRegistry::new();
        let (c1, tx1, _rx1) = connect();
        let (c2, tx2, _rx2) = connect();

        registry.join(c1, tx1.clone(), "pr:p:5");
        registry.join(c2, tx2, "pr:p:5");
        assert_eq!(registry.room_size("pr:p:5"), 2);

        registry.join(c1, tx1, "pr:p:7");
        assert_eq!(registry.room_size("pr:p:5"), 1);
        assert_eq!(registry.room_size("pr:p:7"), 1);
    }

    #[test]
    fn broadcast_reaches_all_members_including_originator() {
        let registry = RoomRegistry::new();
        let (c1, tx1, mut rx1) = connect();
        let (c2, tx2, mut rx2) = connect();
        registry.join(c1, tx1, "pr:p:7");
        registry.join(c2, tx2, "pr:p:7");

        let delivered = registry.broadcast("pr:p:7", &event());
        assert_eq!(delivered, 2);
        assert!(rx1.try_recv().is_ok());
        assert!(rx2.try_recv().is_ok());
    }

    #[test]
    fn broadcast_to_empty_room_delivers_nothing() {
        let registry = RoomRegistry::new();
        assert_eq!(registry.broadcast("pr:p:1", &event()), 0);
    }

    #[test]
    fn broadcast_prunes_dropped_connections() {
        let registry = RoomRegistry::new();
        let (c1, tx1, rx1) = connect();
        let (c2, tx2, mut rx2) = connect();
        registry.join(c1, tx1, "pr:p:7");
        registry.join(c2, tx2, "pr:p:7");

        drop(rx1);
        assert_eq!(registry.broadcast("pr:p:7", &event()), 1);
        assert!(rx2.try_recv().is_ok());
        assert_eq!(registry.room_size("pr:p:7"), 1);
    }

    #[test]
    fn leave_is_idempotent() {
        let registry = RoomRegistry::new();
        let (c1, tx1, _rx1) = connect();
        registry.join(c1, tx1, "pr:p:5");

        registry.leave(c1, "pr:p:5");
        registry.leave(c1, "pr:p:5");
        assert_eq!(registry.room_size("pr:p:5"), 0);

        // Leaving a room never joined is also a no-op.
        let (c2, _tx2, _rx2) = connect();
        registry.leave(c2, "pr:p:9");
    }

    #[test]
    fn disconnect_removes_membership() {
        let registry = RoomRegistry::new();
        let (c1, tx1, _rx1) = connect();
        registry.join(c1, tx1, "pr:p:5");
        registry.disconnect(c1);
        assert_eq!(registry.room_size("pr:p:5"), 0);
        // A second disconnect is harmless.
        registry.disconnect(c1);
    }
}
