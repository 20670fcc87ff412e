mod lifecycle;
mod pairing;
mod registry;
mod router;

pub use lifecycle::{Connection, ConnectionState};
pub use pairing::PairingTable;
pub use registry::Registry;

use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Per-connection outbound queue
pub type Outbox = mpsc::Sender<ServerMessage>;

/// Matching behavior switches
#[derive(Debug, Clone, Default)]
pub struct BrokerOptions {
    /// Also pair waiting users when a counselor registers
    pub match_on_counselor_arrival: bool,
}

/// Session-and-pairing broker.
///
/// Owns the registry, the pairing table and every connection's outbox. All
/// mutation goes through `&mut self`, so exactly one event is applied at a
/// time; see [`crate::hub`] for the task that drives it.
#[derive(Debug, Default)]
pub struct Broker {
    pub(crate) registry: Registry,
    pub(crate) pairings: PairingTable,
    pub(crate) connections: HashMap<ParticipantId, Connection>,
    pub(crate) options: BrokerOptions,
}

impl Broker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: BrokerOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn pairings(&self) -> &PairingTable {
        &self.pairings
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn stats(&self) -> BrokerStats {
        BrokerStats {
            connections: self.connections.len(),
            participants: self.registry.len(),
            users: self.registry.count_role(Role::User),
            counselors: self.registry.count_role(Role::Counselor),
            pairings: self.pairings.len(),
            waiting_users: self.waiting_users(),
        }
    }

    /// Fire-and-forget delivery to one connection. Full or closed queues drop
    /// the message.
    pub(crate) fn send_to(&self, id: &str, msg: ServerMessage) -> bool {
        let Some(conn) = self.connections.get(id) else {
            return false;
        };
        match conn.outbox.try_send(msg) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(participant = %id, "Dropped outbound message: {}", e);
                false
            }
        }
    }

    /// Deliver to every registered participant, returning how many accepted it
    pub(crate) fn send_to_registered(&self, msg: &ServerMessage) -> usize {
        self.registry
            .ids()
            .filter(|id| self.send_to(id, msg.clone()))
            .count()
    }

    /// Push the current registry snapshot to every open connection
    pub(crate) fn announce_registry(&self) {
        let msg = ServerMessage::RegistryChanged {
            participants: self.registry.snapshot(),
        };
        for id in self.connections.keys() {
            self.send_to(id, msg.clone());
        }
    }
}
