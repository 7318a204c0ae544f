// File: registry.rs

use std::collections::{HashMap, HashSet};

use actix::Recipient;

use crate::message_hub::SessionEvent;

/// Live connection table: logical user id -> open websocket sessions.
///
/// Owned by the `MessageHub` actor, whose mailbox serializes every mutation.
/// Fan-out never runs against the live table; senders take a
/// `SessionSnapshot` first, so a slow push can never hold up connect and
/// disconnect traffic.
pub struct SessionRegistry {
    sessions: HashMap<String, Vec<Recipient<SessionEvent>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry {
            sessions: HashMap::new(),
        }
    }

    /// Adds a connection under `user_id` and returns how many that user now
    /// has open. A user may hold any number of simultaneous connections
    /// (multiple tabs, multiple devices).
    pub fn register(&mut self, user_id: &str, addr: Recipient<SessionEvent>) -> usize {
        let conns = self.sessions.entry(user_id.to_string()).or_default();
        conns.push(addr);
        conns.len()
    }

    /// Removes one connection and returns how many the user still has open.
    /// Unknown users and already-removed connections are a no-op, so a
    /// session may report its disconnect more than once.
    pub fn unregister(&mut self, user_id: &str, addr: &Recipient<SessionEvent>) -> usize {
        let remaining = match self.sessions.get_mut(user_id) {
            Some(conns) => {
                conns.retain(|a| a != addr);
                conns.len()
            }
            None => return 0,
        };
        if remaining == 0 {
            self.sessions.remove(user_id);
        }
        remaining
    }

    pub fn connection_count(&self, user_id: &str) -> usize {
        self.sessions.get(user_id).map_or(0, |conns| conns.len())
    }

    /// Clones the table as it stands right now. Pushes issued against the
    /// snapshot do not see registrations that happen afterwards.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            sessions: self.sessions.clone(),
        }
    }
}

/// An immutable copy of the registration table, taken at send time and
/// safe to use across await points.
pub struct SessionSnapshot {
    sessions: HashMap<String, Vec<Recipient<SessionEvent>>>,
}

impl SessionSnapshot {
    /// Pushes `event` to every connection of every id in `user_ids`,
    /// skipping `exclude` (the connection the send arrived on, if any).
    /// Ids listed twice are expanded once. Returns the number of pushes
    /// issued.
    ///
    /// Delivery is fire-and-forget: a connection that is mid-disconnect
    /// silently misses the event and recovers it from message history.
    pub fn push_to<'a, I>(
        &self,
        user_ids: I,
        event: &SessionEvent,
        exclude: Option<&Recipient<SessionEvent>>,
    ) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut delivered = 0;
        for user_id in user_ids {
            if !seen.insert(user_id) {
                continue;
            }
            if let Some(conns) = self.sessions.get(user_id) {
                for conn in conns {
                    if Some(conn) == exclude {
                        continue;
                    }
                    conn.do_send(event.clone());
                    delivered += 1;
                }
            }
        }
        delivered
    }
}
