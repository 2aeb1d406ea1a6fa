//! The error taxonomy shared by every layer of the runtime.
//!
//! Every fallible operation in `servin-core` returns [`ServinResult`].
//! Variants map directly onto the category list the facade exposes to
//! callers; the CLI maps each category onto a process exit code via
//! [`ServinError::exit_code`].

use std::fmt;

pub type ServinResult<T> = Result<T, ServinError>;

/// A structured runtime error carrying its category and context.
///
/// Each variant holds a human-readable message; richer context (the
/// container ID, the attempted transition, etc.) is folded into the
/// message rather than kept as separate typed fields, since the only
/// consumers are logs and CLI error text.
#[derive(Debug, thiserror::Error)]
pub enum ServinError {
    /// Malformed user input: a bad port spec, an empty volume name, ...
    #[error("validation error: {0}")]
    Validation(String),

    /// A container, image, volume, or network reference did not resolve.
    #[error("not found: {0}")]
    NotFound(String),

    /// A create operation collided with an existing name or ID.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The requested state transition is forbidden by the state machine.
    #[error("invalid state transition: {0}")]
    InvalidState(String),

    /// The operation requires a privilege the caller doesn't hold.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No implementation exists for this operation on this host, and
    /// no VM fallback is configured.
    #[error("unsupported on this platform: {0}")]
    PlatformUnsupported(String),

    /// No VM provider could be constructed for this host.
    #[error("no VM provider available: {0}")]
    ProviderUnavailable(String),

    /// A bounded wait (graceful stop, SSH readiness) was exceeded.
    #[error("timed out: {0}")]
    Timeout(String),

    /// A filesystem or network error surfaced from an underlying primitive.
    #[error("I/O error: {0}")]
    Io(String),

    /// An invariant the runtime relies on was broken; indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServinError {
    /// Exit code the CLI facade should use for this error category (§6).
    pub fn exit_code(&self) -> i32 {
        match self {
            ServinError::Validation(_) => 2,
            ServinError::NotFound(_) => 3,
            ServinError::PermissionDenied(_) => 4,
            ServinError::PlatformUnsupported(_) => 5,
            ServinError::AlreadyExists(_)
            | ServinError::InvalidState(_)
            | ServinError::ProviderUnavailable(_)
            | ServinError::Timeout(_)
            | ServinError::Io(_)
            | ServinError::Internal(_) => 1,
        }
    }

    /// Attach an operation tag to a message, used consistently across
    /// call sites so log lines read `op=start container=<id>: <msg>`.
    pub fn internal(op: &str, msg: impl fmt::Display) -> Self {
        ServinError::Internal(format!("{op}: {msg}"))
    }
}

impl From<std::io::Error> for ServinError {
    fn from(e: std::io::Error) -> Self {
        ServinError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for ServinError {
    fn from(e: serde_json::Error) -> Self {
        ServinError::Io(format!("serialization error: {e}"))
    }
}
