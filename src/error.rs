//! Error types shared across the crate.

/// Errors surfaced by network, world and pool operations.
#[derive(Debug, Clone, PartialEq)]
pub enum EvoError {
    /// A caller broke an operation's contract (bad index, out-of-range value).
    InvalidArgument(String),
    /// A requested resource does not exist (e.g. no free world cell).
    EmptyResource(String),
    /// The background training thread stopped without handing back a result.
    Worker(String),
}

impl std::fmt::Display for EvoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            Self::EmptyResource(msg) => write!(f, "Empty resource: {}", msg),
            Self::Worker(msg) => write!(f, "Worker failed: {}", msg),
        }
    }
}

impl std::error::Error for EvoError {}

impl EvoError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
