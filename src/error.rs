use thiserror::Error;

/// Why the broker dropped an inbound event.
///
/// Never sent to clients; the relay fails silently and these only show up in
/// logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no open connection with this id")]
    UnknownConnection,
    #[error("connection id is already in use")]
    DuplicateConnection,
    #[error("sender has not registered")]
    NotRegistered,
    #[error("role cannot change after registration")]
    RoleLocked,
    #[error("counselors cannot post to the public room")]
    CounselorBroadcast,
    #[error("target is not a registered participant")]
    UnknownTarget,
    #[error("sender is not paired with target")]
    NotPaired,
}

/// Result of handing one event to the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected(Rejection),
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Outcome::Accepted => None,
            Outcome::Rejected(reason) => Some(reason),
        }
    }
}

impl From<Rejection> for Outcome {
    fn from(reason: Rejection) -> Self {
        Outcome::Rejected(reason)
    }
}

/// Startup and serving failures
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
