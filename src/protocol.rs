use crate::types::*;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Declare display name and role for this connection
    Register {
        #[serde(default)]
        display_name: Option<String>,
        #[serde(default)]
        role: Option<Role>,
    },
    /// Public room message (users only)
    Broadcast { text: String },
    /// Message within the sender's pairing
    DirectMessage {
        target_id: ParticipantId,
        text: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "t", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Sent once after the socket is accepted
    Welcome {
        participant_id: ParticipantId,
        protocol: String,
    },
    /// Full registry snapshot in registration order
    RegistryChanged { participants: Vec<Participant> },
    /// Sent to both endpoints of a new pairing
    Paired {
        partner_id: ParticipantId,
        partner_display_name: String,
    },
    BroadcastMessage {
        sender_display_name: String,
        text: String,
        time: String,
        sent_at: String,
    },
    DirectMessage {
        sender_id: ParticipantId,
        sender_display_name: String,
        text: String,
        time: String,
        sent_at: String,
    },
    Error {
        code: String,
        msg: String,
    },
}

/// Send time captured once when a chat message is built
#[derive(Debug, Clone, PartialEq)]
pub struct Stamp {
    /// Server-local wall clock, `HH:MM`
    pub time: String,
    /// RFC 3339 UTC instant
    pub sent_at: String,
}

impl Stamp {
    pub fn now() -> Self {
        Self::at(Utc::now())
    }

    pub fn at(instant: DateTime<Utc>) -> Self {
        Self {
            time: instant.with_timezone(&Local).format("%H:%M").to_string(),
            sent_at: instant.to_rfc3339(),
        }
    }
}

impl ServerMessage {
    pub fn broadcast(sender: &Participant, text: String, stamp: Stamp) -> Self {
        ServerMessage::BroadcastMessage {
            sender_display_name: sender.display_name.clone(),
            text,
            time: stamp.time,
            sent_at: stamp.sent_at,
        }
    }

    pub fn direct(sender: &Participant, text: String, stamp: Stamp) -> Self {
        ServerMessage::DirectMessage {
            sender_id: sender.id.clone(),
            sender_display_name: sender.display_name.clone(),
            text,
            time: stamp.time,
            sent_at: stamp.sent_at,
        }
    }

    pub fn paired_with(partner: &Participant) -> Self {
        ServerMessage::Paired {
            partner_id: partner.id.clone(),
            partner_display_name: partner.display_name.clone(),
        }
    }

    pub fn parse_error(err: &serde_json::Error) -> Self {
        ServerMessage::Error {
            code: "PARSE_ERROR".to_string(),
            msg: format!("Invalid message format: {}", err),
        }
    }
}
