//! Live exam connections, for health reporting and shutdown.

use std::time::Instant;

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use mentora_core::ids::{SessionId, UserId};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(format!("conn_{}", Uuid::now_v7()))
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct LiveSession {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub connected_at: Instant,
    cancel: CancellationToken,
}

/// Every connection gets its own entry; a reconnect to the same session is
/// a second entry until the first one goes away.
pub struct LiveSessions {
    sessions: DashMap<ConnectionId, LiveSession>,
    shutdown: CancellationToken,
}

impl LiveSessions {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Track a connection. The returned token fires on [`Self::cancel_all`]
    /// or when this connection is cancelled individually.
    pub fn register(&self, session_id: &SessionId, user_id: &UserId) -> (ConnectionId, CancellationToken) {
        let id = ConnectionId::new();
        let cancel = self.shutdown.child_token();
        let _ = self.sessions.insert(
            id.clone(),
            LiveSession {
                session_id: session_id.clone(),
                user_id: user_id.clone(),
                connected_at: Instant::now(),
                cancel: cancel.clone(),
            },
        );
        (id, cancel)
    }

    pub fn unregister(&self, id: &ConnectionId) {
        let _ = self.sessions.remove(id);
    }

    pub fn cancel(&self, id: &ConnectionId) -> bool {
        match self.sessions.get(id) {
            Some(entry) => {
                entry.cancel.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancel every live connection, including ones registered later.
    pub fn cancel_all(&self) -> usize {
        self.shutdown.cancel();
        self.sessions.len()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    pub fn connections_for(&self, session_id: &SessionId) -> usize {
        self.sessions
            .iter()
            .filter(|entry| &entry.session_id == session_id)
            .count()
    }
}

impl Default for LiveSessions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (SessionId, UserId) {
        (SessionId::from_raw("sess_1"), UserId::from_raw("user_1"))
    }

    #[test]
    fn connection_ids_are_unique() {
        let a = ConnectionId::new();
        assert_ne!(a, ConnectionId::new());
        assert!(a.to_string().starts_with("conn_"));
    }

    #[test]
    fn register_and_unregister() {
        let live = LiveSessions::new();
        let (session, user) = ids();
        let (a, _) = live.register(&session, &user);
        let (b, _) = live.register(&session, &user);
        assert_eq!(live.count(), 2);
        assert_eq!(live.connections_for(&session), 2);

        live.unregister(&a);
        assert_eq!(live.count(), 1);
        live.unregister(&b);
        assert_eq!(live.count(), 0);
    }

    #[test]
    fn cancel_single_connection() {
        let live = LiveSessions::new();
        let (session, user) = ids();
        let (a, token_a) = live.register(&session, &user);
        let (_, token_b) = live.register(&session, &user);
        assert!(live.cancel(&a));
        assert!(token_a.is_cancelled());
        assert!(!token_b.is_cancelled());
        assert!(!live.cancel(&ConnectionId::new()));
    }

    #[test]
    fn cancel_all_reaches_every_connection() {
        let live = LiveSessions::new();
        let (session, user) = ids();
        let (_, token) = live.register(&session, &user);
        assert_eq!(live.cancel_all(), 1);
        assert!(token.is_cancelled());
        let (_, late) = live.register(&session, &user);
        assert!(late.is_cancelled());
    }
}
