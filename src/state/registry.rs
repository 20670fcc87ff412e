//! Live participants keyed by connection id.
//!
//! Iteration follows first-registration order; overwriting a record keeps
//! its original position, which is what the first-match policy relies on.

use crate::types::*;
use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct Registry {
    participants: HashMap<ParticipantId, Participant>,
    order: Vec<ParticipantId>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the participant record, returning the previous one
    pub fn register(&mut self, participant: Participant) -> Option<Participant> {
        let previous = self
            .participants
            .insert(participant.id.clone(), participant.clone());
        if previous.is_none() {
            self.order.push(participant.id);
        }
        previous
    }

    /// Remove a participant. Unknown ids are a no-op.
    pub fn unregister(&mut self, id: &str) -> Option<Participant> {
        let removed = self.participants.remove(id)?;
        self.order.retain(|existing| existing != id);
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.participants.contains_key(id)
    }

    pub fn role_of(&self, id: &str) -> Option<Role> {
        self.participants.get(id).map(|p| p.role)
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Participants in registration order
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.order.iter().filter_map(|id| self.participants.get(id))
    }

    pub fn ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.order.iter()
    }

    /// Registered counselors in registration order
    pub fn counselors(&self) -> impl Iterator<Item = &Participant> {
        self.iter().filter(|p| p.role == Role::Counselor)
    }

    /// First registered counselor. Counselors already paired stay eligible.
    pub fn find_available_counselor(&self) -> Option<&Participant> {
        self.counselors().next()
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.participants.values().filter(|p| p.role == role).count()
    }

    pub fn snapshot(&self) -> Vec<Participant> {
        self.iter().cloned().collect()
    }
}
