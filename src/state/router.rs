//! Public room fan-out and pairing-scoped direct messages

use super::Broker;
use crate::error::{Outcome, Rejection};
use crate::protocol::{ServerMessage, Stamp};
use crate::types::*;

impl Broker {
    /// Post to the public room. Users only; the sender gets its own echo.
    pub fn broadcast(&mut self, sender_id: &str, text: String) -> Outcome {
        let sender = match self.registered_sender(sender_id) {
            Ok(sender) => sender,
            Err(reason) => return reason.into(),
        };
        if sender.role != Role::User {
            tracing::debug!(participant = %sender_id, "Dropped counselor broadcast");
            return Rejection::CounselorBroadcast.into();
        }

        let msg = ServerMessage::broadcast(&sender, text, Stamp::now());
        let delivered = self.send_to_registered(&msg);
        tracing::debug!(participant = %sender_id, delivered, "Broadcast sent");
        Outcome::Accepted
    }

    /// Send to the other end of the sender's pairing, echoing to the sender.
    pub fn direct_message(&mut self, sender_id: &str, target_id: &str, text: String) -> Outcome {
        let sender = match self.registered_sender(sender_id) {
            Ok(sender) => sender,
            Err(reason) => return reason.into(),
        };
        if let Err(reason) = self.authorize_direct(&sender, target_id) {
            tracing::debug!(
                participant = %sender_id,
                target = %target_id,
                "Dropped direct message: {}",
                reason
            );
            return reason.into();
        }

        let msg = ServerMessage::direct(&sender, text, Stamp::now());
        self.send_to(target_id, msg.clone());
        self.send_to(sender_id, msg);
        Outcome::Accepted
    }

    /// Allow-list check against the live pairing table
    pub fn authorize_direct(&self, sender: &Participant, target_id: &str) -> Result<(), Rejection> {
        if !self.registry.contains(target_id) {
            return Err(Rejection::UnknownTarget);
        }

        let allowed = match sender.role {
            Role::User => self.pairings.is_paired(&sender.id, target_id),
            Role::Counselor => self.pairings.is_paired(target_id, &sender.id),
        };
        if allowed {
            Ok(())
        } else {
            Err(Rejection::NotPaired)
        }
    }

    fn registered_sender(&self, id: &str) -> Result<Participant, Rejection> {
        if !self.connections.contains_key(id) {
            return Err(Rejection::UnknownConnection);
        }
        self.registry
            .get(id)
            .cloned()
            .ok_or(Rejection::NotRegistered)
    }
}
