use thiserror::Error;

/// Rejections raised while constructing a [`Contest`](crate::Contest).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContestError {
    #[error("Contest title is empty")]
    EmptyTitle,

    #[error("Contest duration is negative ({seconds}s)")]
    NegativeDuration { seconds: i64 },

    #[error("Contest end is out of range ({seconds}s after start)")]
    EndOutOfRange { seconds: i64 },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("{key} must be {expected}, got {value:?}")]
    Invalid {
        key: &'static str,
        expected: &'static str,
        value: String,
    },
}
