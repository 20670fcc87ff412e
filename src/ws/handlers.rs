//! Client message dispatch
//!
//! Maps decoded client messages onto broker operations. Runs inside the
//! broker task, so every call sees a consistent registry.

use crate::error::Outcome;
use crate::protocol::ClientMessage;
use crate::state::Broker;

/// Apply one client message on behalf of connection `from`
pub fn handle_message(broker: &mut Broker, from: &str, msg: ClientMessage) -> Outcome {
    let outcome = match msg {
        ClientMessage::Register { display_name, role } => {
            broker.register(from, display_name.as_deref(), role)
        }

        ClientMessage::Broadcast { text } => broker.broadcast(from, text),

        ClientMessage::DirectMessage { target_id, text } => {
            broker.direct_message(from, &target_id, text)
        }
    };

    if let Outcome::Rejected(ref reason) = outcome {
        tracing::debug!(connection = %from, "Event rejected: {}", reason);
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;
    use crate::protocol::ServerMessage;
    use crate::types::Role;
    use tokio::sync::mpsc;

    #[test]
    fn test_events_before_registration_are_ignored() {
        let mut broker = Broker::new();
        let (tx, mut rx) = mpsc::channel(8);
        broker.connect("a".to_string(), tx);
        while rx.try_recv().is_ok() {}

        let outcome = handle_message(
            &mut broker,
            "a",
            ClientMessage::Broadcast {
                text: "hello".to_string(),
            },
        );
        assert_eq!(outcome, Outcome::Rejected(Rejection::NotRegistered));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_register_dispatch() {
        let mut broker = Broker::new();
        let (tx, mut rx) = mpsc::channel(8);
        broker.connect("a".to_string(), tx);
        while rx.try_recv().is_ok() {}

        let outcome = handle_message(
            &mut broker,
            "a",
            ClientMessage::Register {
                display_name: Some("Alice".to_string()),
                role: Some(Role::User),
            },
        );
        assert!(outcome.is_accepted());

        match rx.try_recv() {
            Ok(ServerMessage::RegistryChanged { participants }) => {
                assert_eq!(participants.len(), 1);
                assert_eq!(participants[0].display_name, "Alice");
            }
            other => panic!("Expected RegistryChanged, got {:?}", other),
        }
    }
}
