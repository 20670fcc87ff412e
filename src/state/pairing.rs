//! Pairing table and the first-match policy

use super::Broker;
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;

/// Directed `user -> counselor` associations
#[derive(Debug, Default)]
pub struct PairingTable {
    by_user: HashMap<ParticipantId, ParticipantId>,
}

impl PairingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pair a user with a counselor. A user holds at most one counselor.
    pub fn pair(&mut self, user_id: ParticipantId, counselor_id: ParticipantId) {
        self.by_user.insert(user_id, counselor_id);
    }

    pub fn counselor_of(&self, user_id: &str) -> Option<&ParticipantId> {
        self.by_user.get(user_id)
    }

    pub fn users_of<'a>(&'a self, counselor_id: &'a str) -> impl Iterator<Item = &'a ParticipantId> {
        self.by_user
            .iter()
            .filter(move |(_, c)| c.as_str() == counselor_id)
            .map(|(u, _)| u)
    }

    pub fn is_paired(&self, user_id: &str, counselor_id: &str) -> bool {
        self.counselor_of(user_id)
            .is_some_and(|c| c.as_str() == counselor_id)
    }

    /// Drop every row that references `id` on either side
    pub fn remove_participant(&mut self, id: &str) -> usize {
        let before = self.by_user.len();
        self.by_user.retain(|u, c| u.as_str() != id && c.as_str() != id);
        before - self.by_user.len()
    }

    pub fn references(&self, id: &str) -> bool {
        self.by_user.iter().any(|(u, c)| u.as_str() == id || c.as_str() == id)
    }

    pub fn len(&self) -> usize {
        self.by_user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_user.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ParticipantId, &ParticipantId)> {
        self.by_user.iter()
    }
}

impl Broker {
    /// Pair a newly registered user with the first available counselor.
    /// Users that already have a counselor are left alone.
    pub(crate) fn match_user(&mut self, user_id: &str) -> Option<ParticipantId> {
        if self.pairings.counselor_of(user_id).is_some() {
            return None;
        }

        let counselor_id = self.registry.find_available_counselor()?.id.clone();
        self.create_pairing(user_id, &counselor_id)
            .then_some(counselor_id)
    }

    /// Pair every waiting user with an arriving counselor, in registry order.
    /// Only runs when `match_on_counselor_arrival` is enabled.
    pub(crate) fn match_waiting_users(&mut self, counselor_id: &str) -> usize {
        let waiting: Vec<ParticipantId> = self
            .registry
            .iter()
            .filter(|p| p.role == Role::User && self.pairings.counselor_of(&p.id).is_none())
            .map(|p| p.id.clone())
            .collect();

        waiting
            .iter()
            .filter(|user_id| self.create_pairing(user_id, counselor_id))
            .count()
    }

    /// Record the pairing and notify both endpoints
    fn create_pairing(&mut self, user_id: &str, counselor_id: &str) -> bool {
        let (Some(user), Some(counselor)) = (
            self.registry.get(user_id).cloned(),
            self.registry.get(counselor_id).cloned(),
        ) else {
            return false;
        };
        if user.role != Role::User || counselor.role != Role::Counselor {
            return false;
        }

        self.pairings.pair(user.id.clone(), counselor.id.clone());
        tracing::info!(
            user = %user.id,
            counselor = %counselor.id,
            "Paired user with counselor"
        );

        self.send_to(&user.id, ServerMessage::paired_with(&counselor));
        self.send_to(&counselor.id, ServerMessage::paired_with(&user));
        true
    }

    /// Users currently registered without a counselor
    pub fn waiting_users(&self) -> usize {
        self.registry
            .iter()
            .filter(|p| p.role == Role::User && self.pairings.counselor_of(&p.id).is_none())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_overwrites_existing_counselor() {
        let mut table = PairingTable::new();
        table.pair("u1".into(), "c1".into());
        table.pair("u1".into(), "c2".into());

        assert_eq!(table.len(), 1);
        assert_eq!(table.counselor_of("u1").map(String::as_str), Some("c2"));
    }

    #[test]
    fn test_counselor_serves_many_users() {
        let mut table = PairingTable::new();
        table.pair("u1".into(), "c1".into());
        table.pair("u2".into(), "c1".into());
        table.pair("u3".into(), "c2".into());

        let mut users: Vec<_> = table.users_of("c1").cloned().collect();
        users.sort();
        assert_eq!(users, vec!["u1", "u2"]);
        assert!(table.is_paired("u3", "c2"));
        assert!(!table.is_paired("u3", "c1"));
    }

    #[test]
    fn test_remove_participant_clears_both_sides() {
        let mut table = PairingTable::new();
        table.pair("u1".into(), "c1".into());
        table.pair("u2".into(), "c1".into());
        table.pair("u3".into(), "c2".into());

        assert_eq!(table.remove_participant("c1"), 2);
        assert!(!table.references("c1"));
        assert_eq!(table.len(), 1);

        assert_eq!(table.remove_participant("u3"), 1);
        assert!(table.is_empty());

        assert_eq!(table.remove_participant("unknown"), 0);
    }
}
