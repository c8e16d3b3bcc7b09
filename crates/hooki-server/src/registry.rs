//! Identity registry: which live connections belong to which user.
//!
//! Every realtime connection registers on connect and gets an outbound
//! queue. A connection starts anonymous and is bound to a user by
//! `announce`. A user may hold several connections at once (multi-device);
//! user-scoped events go to all of them, global broadcasts go to every open
//! connection.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use hooki_shared::events::ServerEvent;
use hooki_shared::types::{ConnectionId, UserId};
use hooki_shared::HookiError;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::RwLock;
use tracing::{debug, info};

struct ConnectionEntry {
    sender: UnboundedSender<ServerEvent>,
    user: Option<UserId>,
}

#[derive(Default)]
struct RegistryInner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    users: HashMap<UserId, HashSet<ConnectionId>>,
}

impl RegistryInner {
    fn unbind(&mut self, conn: ConnectionId, user: &UserId) {
        if let Some(set) = self.users.get_mut(user) {
            set.remove(&conn);
            if set.is_empty() {
                self.users.remove(user);
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct IdentityRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new anonymous connection. The receiver yields every event
    /// pushed to it, in push order.
    pub async fn register(&self) -> (ConnectionId, UnboundedReceiver<ServerEvent>) {
        let (tx, rx) = unbounded_channel();
        let conn = ConnectionId::new();

        let mut guard = self.inner.write().await;
        guard.connections.insert(
            conn,
            ConnectionEntry {
                sender: tx,
                user: None,
            },
        );
        debug!(connection = %conn, total = guard.connections.len(), "Connection registered");

        (conn, rx)
    }

    /// Bind `conn` to `user`, replacing any previous binding of that
    /// connection. Returns `false` (and does nothing) for an unknown
    /// connection.
    pub async fn announce(&self, conn: ConnectionId, user: UserId) -> bool {
        let mut guard = self.inner.write().await;

        let previous = match guard.connections.get_mut(&conn) {
            Some(entry) => entry.user.replace(user.clone()),
            None => {
                debug!(connection = %conn, user = %user, "Announce on unknown connection ignored");
                return false;
            }
        };
        if let Some(previous) = previous {
            guard.unbind(conn, &previous);
        }
        guard.users.entry(user.clone()).or_default().insert(conn);

        info!(
            connection = %conn,
            user = %user,
            devices = guard.users.get(&user).map(|s| s.len()).unwrap_or(0),
            "User announced"
        );
        true
    }

    /// Live connections bound to `user`; empty when offline.
    pub async fn connections_for(&self, user: &UserId) -> HashSet<ConnectionId> {
        self.inner
            .read()
            .await
            .users
            .get(user)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn user_of(&self, conn: ConnectionId) -> Option<UserId> {
        self.inner
            .read()
            .await
            .connections
            .get(&conn)
            .and_then(|entry| entry.user.clone())
    }

    /// Forget a connection and its binding. Safe to call more than once.
    pub async fn remove(&self, conn: ConnectionId) -> Option<UserId> {
        let mut guard = self.inner.write().await;
        let entry = guard.connections.remove(&conn)?;
        if let Some(user) = &entry.user {
            guard.unbind(conn, user);
        }
        debug!(connection = %conn, user = ?entry.user, "Connection removed");
        entry.user
    }

    /// Push `event` to every connection of `user`. Returns how many
    /// connections accepted it.
    pub async fn send_to_user(&self, user: &UserId, event: &ServerEvent) -> usize {
        let (delivered, dead) = {
            let guard = self.inner.read().await;
            let Some(conns) = guard.users.get(user) else {
                return 0;
            };
            push(&guard, conns.iter().copied(), event)
        };
        self.prune(dead).await;
        delivered
    }

    /// Push `event` to every open connection, announced or not.
    pub async fn broadcast(&self, event: &ServerEvent) -> usize {
        let (delivered, dead) = {
            let guard = self.inner.read().await;
            push(&guard, guard.connections.keys().copied(), event)
        };
        self.prune(dead).await;
        delivered
    }

    pub async fn connection_count(&self) -> usize {
        self.inner.read().await.connections.len()
    }

    pub async fn online_user_count(&self) -> usize {
        self.inner.read().await.users.len()
    }

    async fn prune(&self, dead: Vec<ConnectionId>) {
        for conn in dead {
            self.remove(conn).await;
        }
    }
}

/// Send to each connection; a closed queue is a transient delivery failure
/// that is logged and reported back for pruning.
fn push(
    inner: &RegistryInner,
    targets: impl Iterator<Item = ConnectionId>,
    event: &ServerEvent,
) -> (usize, Vec<ConnectionId>) {
    let mut delivered = 0;
    let mut dead = Vec::new();

    for conn in targets {
        let Some(entry) = inner.connections.get(&conn) else {
            continue;
        };
        if entry.sender.send(event.clone()).is_ok() {
            delivered += 1;
        } else {
            let err = HookiError::TransientDelivery(conn);
            debug!(error = %err, event = event.name(), "Dropping event for closed connection");
            dead.push(conn);
        }
    }

    (delivered, dead)
}
