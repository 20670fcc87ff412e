use serde::{Deserialize, Serialize};

/// Connection-scoped identifier assigned by the transport
pub type ParticipantId = String;

pub const DEFAULT_DISPLAY_NAME: &str = "Anonymous";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    #[serde(alias = "therapist")]
    Counselor,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub id: ParticipantId,
    pub display_name: String,
    pub role: Role,
}

impl Participant {
    pub fn new(id: impl Into<ParticipantId>, display_name: Option<&str>, role: Role) -> Self {
        Self {
            id: id.into(),
            display_name: normalize_display_name(display_name),
            role,
        }
    }
}

/// Trim the requested name, falling back to "Anonymous" when nothing is left
pub fn normalize_display_name(name: Option<&str>) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => DEFAULT_DISPLAY_NAME.to_string(),
    }
}

/// Presence counters for the stats endpoint
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BrokerStats {
    pub connections: usize,
    pub participants: usize,
    pub users: usize,
    pub counselors: usize,
    pub pairings: usize,
    pub waiting_users: usize,
}
