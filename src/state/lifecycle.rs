//! Per-connection state machine: `Connected -> Registered -> Disconnected`

use super::{Broker, Outbox};
use crate::error::{Outcome, Rejection};
use crate::protocol::{ServerMessage, PROTOCOL_VERSION};
use crate::types::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Transport is open, no participant record yet
    Connected,
    /// Participant exists in the registry
    Registered,
}

#[derive(Debug)]
pub struct Connection {
    pub outbox: Outbox,
    pub state: ConnectionState,
}

impl Broker {
    /// Accept a new transport connection and greet it with its id
    pub fn connect(&mut self, id: ParticipantId, outbox: Outbox) -> Outcome {
        if self.connections.contains_key(&id) {
            tracing::warn!(connection = %id, "Rejected duplicate connection id");
            return Rejection::DuplicateConnection.into();
        }

        tracing::info!(connection = %id, "Connection opened");
        self.connections.insert(
            id.clone(),
            Connection {
                outbox,
                state: ConnectionState::Connected,
            },
        );

        self.send_to(
            &id,
            ServerMessage::Welcome {
                participant_id: id.clone(),
                protocol: PROTOCOL_VERSION.to_string(),
            },
        );
        self.send_to(
            &id,
            ServerMessage::RegistryChanged {
                participants: self.registry.snapshot(),
            },
        );
        Outcome::Accepted
    }

    pub fn connection_state(&self, id: &str) -> Option<ConnectionState> {
        self.connections.get(id).map(|c| c.state)
    }

    /// Register (or re-register) the participant behind a connection.
    ///
    /// A user is matched immediately. Re-registration updates the display
    /// name; the role is fixed by the first registration, so a differing role
    /// is ignored and reported as `RoleLocked` after the name is applied.
    pub fn register(
        &mut self,
        id: &str,
        display_name: Option<&str>,
        role: Option<Role>,
    ) -> Outcome {
        let Some(state) = self.connection_state(id) else {
            return Rejection::UnknownConnection.into();
        };
        let requested = role.unwrap_or_default();
        let locked_role = match state {
            ConnectionState::Registered => self.registry.role_of(id),
            ConnectionState::Connected => None,
        };
        let role = locked_role.unwrap_or(requested);
        let role_refused = role != requested;
        if role_refused {
            tracing::debug!(participant = %id, ?requested, "Refused role change, keeping {:?}", role);
        }

        let participant = Participant::new(id, display_name, role);
        tracing::info!(
            participant = %id,
            display_name = %participant.display_name,
            ?role,
            "Participant registered"
        );
        self.registry.register(participant);
        if let Some(conn) = self.connections.get_mut(id) {
            conn.state = ConnectionState::Registered;
        }

        match role {
            Role::User => {
                if self.match_user(id).is_none() && self.pairings.counselor_of(id).is_none() {
                    tracing::info!(participant = %id, "No counselor available, user waiting");
                }
            }
            Role::Counselor => {
                if self.options.match_on_counselor_arrival {
                    let paired = self.match_waiting_users(id);
                    if paired > 0 {
                        tracing::info!(counselor = %id, paired, "Paired waiting users");
                    }
                }
            }
        }

        self.announce_registry();
        if role_refused {
            return Rejection::RoleLocked.into();
        }
        Outcome::Accepted
    }

    /// Tear down a connection. Idempotent.
    pub fn disconnect(&mut self, id: &str) -> Outcome {
        let Some(conn) = self.connections.remove(id) else {
            return Rejection::UnknownConnection.into();
        };

        let was_registered = conn.state == ConnectionState::Registered;
        self.unregister(id);
        tracing::info!(connection = %id, was_registered, "Connection closed");

        if was_registered {
            self.announce_registry();
        }
        Outcome::Accepted
    }

    /// Remove a participant and every pairing that references it.
    /// Unknown ids are a no-op.
    pub fn unregister(&mut self, id: &str) {
        let removed = self.registry.unregister(id);
        let dissolved = self.pairings.remove_participant(id);
        if removed.is_some() || dissolved > 0 {
            tracing::debug!(participant = %id, dissolved, "Participant unregistered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn open(broker: &mut Broker, id: &str) -> mpsc::Receiver<ServerMessage> {
        let (tx, rx) = mpsc::channel(32);
        assert!(broker.connect(id.to_string(), tx).is_accepted());
        rx
    }

    fn drain(rx: &mut mpsc::Receiver<ServerMessage>) -> Vec<ServerMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    #[test]
    fn test_connect_sends_welcome() {
        let mut broker = Broker::new();
        let mut rx = open(&mut broker, "a");

        let msgs = drain(&mut rx);
        assert!(matches!(
            msgs.first(),
            Some(ServerMessage::Welcome { participant_id, .. }) if participant_id == "a"
        ));
        assert_eq!(broker.connection_state("a"), Some(ConnectionState::Connected));
        assert!(!broker.registry().contains("a"));
    }

    #[test]
    fn test_duplicate_connect_rejected() {
        let mut broker = Broker::new();
        let _rx = open(&mut broker, "a");
        let (tx, _rx2) = mpsc::channel(1);

        assert_eq!(
            broker.connect("a".to_string(), tx),
            Outcome::Rejected(Rejection::DuplicateConnection)
        );
    }

    #[test]
    fn test_register_moves_to_registered() {
        let mut broker = Broker::new();
        let _rx = open(&mut broker, "a");

        assert!(broker
            .register("a", Some("Alice"), Some(Role::User))
            .is_accepted());
        assert_eq!(
            broker.connection_state("a"),
            Some(ConnectionState::Registered)
        );
        assert_eq!(broker.registry().get("a").unwrap().display_name, "Alice");
    }

    #[test]
    fn test_register_without_connection_rejected() {
        let mut broker = Broker::new();
        assert_eq!(
            broker.register("ghost", Some("x"), Some(Role::User)),
            Outcome::Rejected(Rejection::UnknownConnection)
        );
        assert!(broker.registry().is_empty());
    }

    #[test]
    fn test_missing_role_defaults_to_user() {
        let mut broker = Broker::new();
        let _rx = open(&mut broker, "a");

        broker.register("a", None, None);
        let participant = broker.registry().get("a").unwrap();
        assert_eq!(participant.role, Role::User);
        assert_eq!(participant.display_name, "Anonymous");
    }

    #[test]
    fn test_role_change_refused_but_name_applied() {
        let mut broker = Broker::new();
        let _c = open(&mut broker, "c");
        let mut a = open(&mut broker, "a");
        broker.register("c", Some("Lee"), Some(Role::Counselor));
        broker.register("a", Some("Bob"), Some(Role::User));
        drain(&mut a);

        assert_eq!(
            broker.register("a", Some("NewName"), Some(Role::Counselor)),
            Outcome::Rejected(Rejection::RoleLocked)
        );
        let participant = broker.registry().get("a").unwrap();
        assert_eq!(participant.role, Role::User);
        assert_eq!(participant.display_name, "NewName");
        assert!(broker.pairings().is_paired("a", "c"));

        let msgs = drain(&mut a);
        assert!(msgs.iter().any(|m| matches!(
            m,
            ServerMessage::RegistryChanged { participants }
                if participants.iter().any(|p| p.id == "a" && p.display_name == "NewName")
        )));
    }

    #[test]
    fn test_reregistration_keeps_pairing() {
        let mut broker = Broker::new();
        let _c = open(&mut broker, "c");
        let mut u = open(&mut broker, "u");
        broker.register("c", Some("Lee"), Some(Role::Counselor));
        broker.register("u", Some("Bob"), Some(Role::User));
        drain(&mut u);

        broker.register("c", Some("Dr. Lee"), Some(Role::Counselor));
        broker.register("u", Some("Robert"), Some(Role::User));

        assert!(broker.pairings().is_paired("u", "c"));
        assert_eq!(broker.pairings().len(), 1);
        assert_eq!(broker.registry().get("u").unwrap().display_name, "Robert");

        // no second paired event for an already paired user
        let msgs = drain(&mut u);
        assert!(!msgs
            .iter()
            .any(|m| matches!(m, ServerMessage::Paired { .. })));
    }

    #[test]
    fn test_reregistration_rematches_orphaned_user() {
        let mut broker = Broker::new();
        let _c1 = open(&mut broker, "c1");
        let _c2 = open(&mut broker, "c2");
        let _u = open(&mut broker, "u");
        broker.register("c1", Some("Lee"), Some(Role::Counselor));
        broker.register("u", Some("Bob"), Some(Role::User));
        broker.register("c2", Some("Kim"), Some(Role::Counselor));

        broker.disconnect("c1");
        assert!(broker.pairings().counselor_of("u").is_none());

        broker.register("u", Some("Bob"), Some(Role::User));
        assert!(broker.pairings().is_paired("u", "c2"));
    }

    #[test]
    fn test_disconnect_is_terminal_and_idempotent() {
        let mut broker = Broker::new();
        let _rx = open(&mut broker, "a");
        broker.register("a", Some("Alice"), Some(Role::User));

        assert!(broker.disconnect("a").is_accepted());
        assert_eq!(broker.connection_state("a"), None);
        assert!(!broker.registry().contains("a"));

        assert_eq!(
            broker.disconnect("a"),
            Outcome::Rejected(Rejection::UnknownConnection)
        );
        assert_eq!(
            broker.register("a", Some("Alice"), Some(Role::User)),
            Outcome::Rejected(Rejection::UnknownConnection)
        );
    }

    #[test]
    fn test_disconnect_announces_registry() {
        let mut broker = Broker::new();
        let _a = open(&mut broker, "a");
        let mut b = open(&mut broker, "b");
        broker.register("a", Some("Alice"), Some(Role::User));
        broker.register("b", Some("Bob"), Some(Role::User));
        drain(&mut b);

        broker.disconnect("a");

        let msgs = drain(&mut b);
        match msgs.as_slice() {
            [ServerMessage::RegistryChanged { participants }] => {
                assert_eq!(participants.len(), 1);
                assert_eq!(participants[0].id, "b");
            }
            other => panic!("Expected one RegistryChanged, got {:?}", other),
        }
    }
}
