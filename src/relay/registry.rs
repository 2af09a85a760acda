//! Room registry
//!
//! The single piece of mutable shared state in the relay: which connections
//! are live, and which of them are members of which room. Rooms are plain map
//! keys; a room exists exactly while it has at least one member.
//!
//! Every read and write goes through one mutex that guards the map structure
//! only. It is never held across an `.await` or while writing to a channel;
//! callers that need to fan out take a [`RoomRegistry::members`] snapshot and
//! release the lock first.

use crate::error::{RelayError, Result};
use super::connection::{Connection, ConnectionId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Room identifier
pub type RoomId = String;

/// Result of a successful join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The connection was not yet a member
    Joined,
    /// The connection was already a member; membership is unchanged
    Refreshed,
}

#[derive(Default)]
struct RegistryState {
    /// Live connections
    connections: HashMap<ConnectionId, Weak<Connection>>,
    /// Room -> members
    rooms: HashMap<RoomId, HashMap<ConnectionId, Weak<Connection>>>,
    /// Connection -> rooms it has joined (reverse index for sweeps)
    memberships: HashMap<ConnectionId, HashSet<RoomId>>,
}

impl RegistryState {
    fn remove_member(&mut self, room_id: &str, conn_id: &str) -> bool {
        let Some(members) = self.rooms.get_mut(room_id) else {
            return false;
        };
        let removed = members.remove(conn_id).is_some();
        if members.is_empty() {
            self.rooms.remove(room_id);
        }
        removed
    }

    fn sweep(&mut self, conn_id: &str) -> Vec<RoomId> {
        let rooms = self.memberships.remove(conn_id).unwrap_or_default();
        let mut left: Vec<RoomId> = rooms
            .into_iter()
            .filter(|room_id| self.remove_member(room_id, conn_id))
            .collect();
        left.sort();
        left
    }
}

/// Shared mapping from room to member connections
///
/// # Example
///
/// ```rust,ignore
/// use roomrelay::relay::RoomRegistry;
/// use std::sync::Arc;
///
/// let registry = Arc::new(RoomRegistry::new());
/// registry.register(&conn)?;
/// registry.join("lobby", &conn)?;
/// for member in registry.members("lobby") {
///     let _ = member.send_text("hello");
/// }
/// ```
pub struct RoomRegistry {
    state: Mutex<RegistryState>,
    /// Maximum number of connections allowed (0 = unlimited)
    max_connections: usize,
    total_connections: AtomicU64,
    total_broadcasts: AtomicU64,
    total_evictions: AtomicU64,
}

impl RoomRegistry {
    /// Create a registry with unlimited connections
    pub fn new() -> Self {
        Self::with_max_connections(0)
    }

    /// Create a registry with a maximum connection limit (0 = unlimited)
    pub fn with_max_connections(max_connections: usize) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            max_connections,
            total_connections: AtomicU64::new(0),
            total_broadcasts: AtomicU64::new(0),
            total_evictions: AtomicU64::new(0),
        }
    }

    // A panic elsewhere never leaves the maps half-updated (every mutation
    // is a handful of infallible map operations), so a poisoned lock is
    // still safe to use.
    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a live connection
    ///
    /// # Errors
    /// * `RelayError::ServiceUnavailable` - connection limit reached
    /// * `RelayError::Write` - the connection is already closed
    pub fn register(&self, conn: &Arc<Connection>) -> Result<()> {
        let mut state = self.lock();

        if conn.is_closed() {
            return Err(RelayError::write("connection is closed"));
        }
        if self.max_connections > 0 && state.connections.len() >= self.max_connections {
            return Err(RelayError::service_unavailable(format!(
                "Maximum connection limit ({}) reached",
                self.max_connections
            )));
        }

        state
            .connections
            .insert(conn.id().to_string(), Arc::downgrade(conn));
        self.total_connections.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Forget a connection and remove it from every room
    ///
    /// Returns the rooms it was removed from. Idempotent.
    pub fn unregister(&self, conn_id: &str) -> Vec<RoomId> {
        let mut state = self.lock();
        state.connections.remove(conn_id);
        state.sweep(conn_id)
    }

    /// Add a connection to a room, creating the room if needed
    ///
    /// Joining a room the connection is already in leaves membership
    /// unchanged and reports [`JoinOutcome::Refreshed`].
    ///
    /// # Errors
    /// * `RelayError::Write` - the connection is already closed. The closed
    ///   check happens under the registry lock, so a join can never slip in
    ///   after the disconnect sweep.
    pub fn join(&self, room_id: &str, conn: &Arc<Connection>) -> Result<JoinOutcome> {
        let mut state = self.lock();

        if conn.is_closed() {
            return Err(RelayError::write("connection is closed"));
        }

        let conn_id = conn.id().to_string();
        let members = state.rooms.entry(room_id.to_string()).or_default();
        let outcome = if members.contains_key(&conn_id) {
            JoinOutcome::Refreshed
        } else {
            members.insert(conn_id.clone(), Arc::downgrade(conn));
            JoinOutcome::Joined
        };

        state
            .memberships
            .entry(conn_id)
            .or_default()
            .insert(room_id.to_string());

        Ok(outcome)
    }

    /// Remove a connection from one room. Returns whether it was a member.
    pub fn leave(&self, room_id: &str, conn_id: &str) -> bool {
        let mut state = self.lock();

        if let Some(rooms) = state.memberships.get_mut(conn_id) {
            rooms.remove(room_id);
            if rooms.is_empty() {
                state.memberships.remove(conn_id);
            }
        }
        state.remove_member(room_id, conn_id)
    }

    /// Remove a connection from every room it is in
    ///
    /// Returns the rooms it was removed from. Idempotent.
    pub fn leave_all(&self, conn_id: &str) -> Vec<RoomId> {
        self.lock().sweep(conn_id)
    }

    /// Snapshot of the live members of a room
    ///
    /// Entries whose connection has already been dropped are pruned on the
    /// way through.
    pub fn members(&self, room_id: &str) -> Vec<Arc<Connection>> {
        let mut state = self.lock();

        let Some(members) = state.rooms.get_mut(room_id) else {
            return Vec::new();
        };

        let mut live = Vec::with_capacity(members.len());
        let mut dead = Vec::new();
        for (conn_id, member) in members.iter() {
            match member.upgrade() {
                Some(conn) => live.push(conn),
                None => dead.push(conn_id.clone()),
            }
        }

        for conn_id in dead {
            state.remove_member(room_id, &conn_id);
            if let Some(rooms) = state.memberships.get_mut(&conn_id) {
                rooms.remove(room_id);
                if rooms.is_empty() {
                    state.memberships.remove(&conn_id);
                }
            }
        }

        live
    }

    /// Whether a connection is currently a member of a room
    pub fn is_member(&self, room_id: &str, conn_id: &str) -> bool {
        self.lock()
            .rooms
            .get(room_id)
            .is_some_and(|members| members.contains_key(conn_id))
    }

    /// Rooms a connection is currently in, sorted
    pub fn rooms_of(&self, conn_id: &str) -> Vec<RoomId> {
        let state = self.lock();
        let mut rooms: Vec<RoomId> = state
            .memberships
            .get(conn_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// Number of members in a room
    pub fn member_count(&self, room_id: &str) -> usize {
        self.lock().rooms.get(room_id).map_or(0, HashMap::len)
    }

    /// Number of non-empty rooms
    pub fn room_count(&self) -> usize {
        self.lock().rooms.len()
    }

    /// Number of registered connections
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Get a registered connection by id
    pub fn get(&self, conn_id: &str) -> Option<Arc<Connection>> {
        self.lock().connections.get(conn_id).and_then(Weak::upgrade)
    }

    /// Close a connection and sweep it from the registry
    ///
    /// Only the first caller for a given connection does the sweep; later
    /// calls return `false` without touching the registry.
    pub fn close_connection(&self, conn: &Connection, reason: &str) -> bool {
        if !conn.close() {
            return false;
        }

        let rooms = self.unregister(conn.id());
        tracing::info!(
            conn_id = %conn.id(),
            user_id = %conn.user_id(),
            reason,
            rooms = ?rooms,
            "Connection closed"
        );
        true
    }

    /// Close a connection that failed a write, counting the eviction
    pub fn evict(&self, conn: &Connection, reason: &str) -> bool {
        let evicted = self.close_connection(conn, reason);
        if evicted {
            self.total_evictions.fetch_add(1, Ordering::Relaxed);
        }
        evicted
    }

    pub(crate) fn record_broadcast(&self) {
        self.total_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the maximum number of connections allowed (0 = unlimited)
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Get registry metrics
    pub fn metrics(&self) -> RegistryMetrics {
        let (active_connections, room_count) = {
            let state = self.lock();
            (state.connections.len(), state.rooms.len())
        };

        RegistryMetrics {
            active_connections,
            max_connections: self.max_connections,
            total_connections: self.total_connections.load(Ordering::Relaxed),
            total_broadcasts: self.total_broadcasts.load(Ordering::Relaxed),
            total_evictions: self.total_evictions.load(Ordering::Relaxed),
            room_count,
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry metrics for monitoring
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct RegistryMetrics {
    /// Current number of registered connections
    pub active_connections: usize,
    /// Maximum connections allowed (0 = unlimited)
    pub max_connections: usize,
    /// Total connections ever registered
    pub total_connections: u64,
    /// Total broadcasts sent
    pub total_broadcasts: u64,
    /// Connections closed because a write to them failed
    pub total_evictions: u64,
    /// Number of non-empty rooms
    pub room_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Identity;
    use crate::relay::Message;
    use tokio::sync::mpsc;

    fn conn(id: &str) -> (Arc<Connection>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(8);
        (Arc::new(Connection::with_id(id, Identity::new(format!("user-{id}"), id), tx)), rx)
    }

    #[test]
    fn test_register_and_unregister() {
        let registry = RoomRegistry::new();
        let (a, _rx) = conn("a");

        registry.register(&a).unwrap();
        assert_eq!(registry.connection_count(), 1);
        assert!(registry.get("a").is_some());

        registry.unregister("a");
        assert_eq!(registry.connection_count(), 0);
        assert!(registry.get("a").is_none());
    }

    #[test]
    fn test_connection_limit() {
        let registry = RoomRegistry::with_max_connections(1);
        let (a, _rx_a) = conn("a");
        let (b, _rx_b) = conn("b");

        registry.register(&a).unwrap();
        let err = registry.register(&b).unwrap_err();
        assert!(matches!(err, RelayError::ServiceUnavailable(_)));

        registry.unregister("a");
        registry.register(&b).unwrap();
    }

    #[test]
    fn test_join_creates_room_and_rejoin_refreshes() {
        let registry = RoomRegistry::new();
        let (a, _rx) = conn("a");

        assert_eq!(registry.join("r1", &a).unwrap(), JoinOutcome::Joined);
        assert_eq!(registry.join("r1", &a).unwrap(), JoinOutcome::Refreshed);
        assert_eq!(registry.member_count("r1"), 1);
        assert_eq!(registry.room_count(), 1);
        let members = registry.members("r1");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id(), "user-a");
    }

    #[test]
    fn test_join_refused_after_close() {
        let registry = RoomRegistry::new();
        let (a, _rx) = conn("a");
        registry.register(&a).unwrap();

        assert!(registry.close_connection(&a, "test"));
        assert!(matches!(registry.join("r1", &a), Err(RelayError::Write(_))));
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_leave_prunes_empty_room() {
        let registry = RoomRegistry::new();
        let (a, _rx_a) = conn("a");
        let (b, _rx_b) = conn("b");
        registry.join("r1", &a).unwrap();
        registry.join("r1", &b).unwrap();

        assert!(registry.leave("r1", "a"));
        assert!(!registry.leave("r1", "a"));
        assert_eq!(registry.member_count("r1"), 1);

        assert!(registry.leave("r1", "b"));
        assert_eq!(registry.room_count(), 0);
        assert!(registry.rooms_of("b").is_empty());
    }

    #[test]
    fn test_leave_all_sweeps_every_room() {
        let registry = RoomRegistry::new();
        let (a, _rx_a) = conn("a");
        let (b, _rx_b) = conn("b");
        registry.join("r1", &a).unwrap();
        registry.join("r2", &a).unwrap();
        registry.join("r2", &b).unwrap();

        assert_eq!(registry.rooms_of("a"), vec!["r1".to_string(), "r2".to_string()]);
        assert_eq!(registry.leave_all("a"), vec!["r1".to_string(), "r2".to_string()]);
        assert!(registry.leave_all("a").is_empty());

        assert!(!registry.is_member("r1", "a"));
        assert!(!registry.is_member("r2", "a"));
        assert!(registry.is_member("r2", "b"));
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn test_close_connection_runs_once() {
        let registry = RoomRegistry::new();
        let (a, _rx) = conn("a");
        registry.register(&a).unwrap();
        registry.join("r1", &a).unwrap();

        assert!(registry.close_connection(&a, "read failed"));
        assert!(!registry.close_connection(&a, "write failed"));
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_members_skips_dropped_connections() {
        let registry = RoomRegistry::new();
        let (a, _rx_a) = conn("a");
        let (b, _rx_b) = conn("b");
        registry.join("r1", &a).unwrap();
        registry.join("r1", &b).unwrap();

        drop(b);
        let members = registry.members("r1");
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].id(), "a");
        assert_eq!(registry.member_count("r1"), 1);
        assert!(registry.rooms_of("b").is_empty());
    }

    #[test]
    fn test_membership_follows_last_operation() {
        let registry = RoomRegistry::new();
        let (a, _rx) = conn("a");

        let ops = ["join", "join", "leave", "join", "leave", "leave", "join"];
        for op in ops {
            match op {
                "join" => {
                    registry.join("r1", &a).unwrap();
                }
                _ => {
                    registry.leave("r1", "a");
                }
            }
            assert_eq!(registry.is_member("r1", "a"), op == "join");
        }

        registry.close_connection(&a, "disconnect");
        assert!(!registry.is_member("r1", "a"));
    }

    #[test]
    fn test_metrics() {
        let registry = RoomRegistry::with_max_connections(10);
        let (a, _rx) = conn("a");
        registry.register(&a).unwrap();
        registry.join("r1", &a).unwrap();
        registry.record_broadcast();

        let metrics = registry.metrics();
        assert_eq!(metrics.active_connections, 1);
        assert_eq!(metrics.max_connections, 10);
        assert_eq!(metrics.total_connections, 1);
        assert_eq!(metrics.total_broadcasts, 1);
        assert_eq!(metrics.total_evictions, 0);
        assert_eq!(metrics.room_count, 1);
    }
}
