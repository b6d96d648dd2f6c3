use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollError {
    #[error("poll {0} not found")]
    NotFound(String),

    #[error("no poll is loaded")]
    NotLoaded,

    #[error("{action} rejected for poll {poll_id}: {reason}")]
    Rejected {
        action: &'static str,
        poll_id: String,
        reason: String,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidConfig { key: &'static str, value: String },

    #[error("invalid route pattern: {0}")]
    InvalidRoute(String),
}

impl PollError {
    pub fn rejected(action: &'static str, poll_id: &str, reason: impl Into<String>) -> Self {
        PollError::Rejected {
            action,
            poll_id: poll_id.to_string(),
            reason: reason.into(),
        }
    }
}
