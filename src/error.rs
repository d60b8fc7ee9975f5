//! Error taxonomy for the OneView client.
//!
//! Every failure kind a caller may want to branch on is its own variant.
//! Only [`OneViewError::TransientIo`] is ever absorbed locally, and only by
//! the task monitor while inside its connection failure window.

use std::fmt;

use thiserror::Error;

pub const MSG_INVALID_TASK: &str = "Invalid task was provided";
pub const MSG_UNKNOWN_OBJECT_TYPE: &str = "Unknown object type";
pub const MSG_UNKNOWN_EXCEPTION: &str = "Unknown task error";
pub const MSG_UNRECOGNIZED_URI: &str = "Unrecognized URI for this resource";

pub type Result<T> = std::result::Result<T, OneViewError>;

/// Network-level failure kinds that the task monitor may tolerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    Timeout,
    ConnectionAborted,
    ConnectionReset,
    ConnectionRefused,
    Unreachable,
}

impl fmt::Display for TransientKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransientKind::Timeout => "timed out",
            TransientKind::ConnectionAborted => "connection aborted",
            TransientKind::ConnectionReset => "connection reset",
            TransientKind::ConnectionRefused => "connection refused",
            TransientKind::Unreachable => "network unreachable",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum OneViewError {
    #[error("Invalid task was provided")]
    InvalidTask,

    #[error("{0}")]
    UnknownType(String),

    #[error("Task type: '{0}' resource is not a recognized version")]
    UnrecognizedTaskType(String),

    #[error("Waited {timeout} seconds for task to complete, aborting")]
    Timeout { timeout: u64 },

    #[error("{message}")]
    TaskError {
        message: String,
        error_code: Option<String>,
    },

    #[error("{kind}: {message}")]
    TransientIo {
        kind: TransientKind,
        message: String,
    },

    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        error_code: Option<String>,
    },

    #[error("{0}")]
    InvalidArgument(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl OneViewError {
    pub fn unknown_object_type() -> Self {
        OneViewError::UnknownType(MSG_UNKNOWN_OBJECT_TYPE.to_string())
    }

    pub fn unrecognized_uri() -> Self {
        OneViewError::UnknownType(MSG_UNRECOGNIZED_URI.to_string())
    }

    /// True for network failures the polling loop is allowed to ride out.
    pub fn is_transient(&self) -> bool {
        matches!(self, OneViewError::TransientIo { .. })
    }

    /// Vendor error code carried by task and HTTP failures.
    pub fn error_code(&self) -> Option<&str> {
        match self {
            OneViewError::TaskError { error_code, .. } | OneViewError::Http { error_code, .. } => {
                error_code.as_deref()
            }
            _ => None,
        }
    }
}

impl From<reqwest::Error> for OneViewError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return OneViewError::TransientIo {
                kind: TransientKind::Timeout,
                message: error.to_string(),
            };
        }
        if let Some(status) = error.status() {
            return OneViewError::Http {
                status: status.as_u16(),
                message: error.to_string(),
                error_code: None,
            };
        }
        if let Some(kind) = io_source_kind(&error).and_then(transient_kind) {
            return OneViewError::TransientIo {
                kind,
                message: error.to_string(),
            };
        }
        if error.is_connect() {
            return OneViewError::TransientIo {
                kind: TransientKind::ConnectionRefused,
                message: error.to_string(),
            };
        }
        // The connection was up but went away before a full response arrived
        if error.is_request() || error.is_body() {
            return OneViewError::TransientIo {
                kind: TransientKind::ConnectionAborted,
                message: error.to_string(),
            };
        }
        OneViewError::Transport(error.to_string())
    }
}

impl From<std::io::Error> for OneViewError {
    fn from(error: std::io::Error) -> Self {
        match transient_kind(error.kind()) {
            Some(kind) => OneViewError::TransientIo {
                kind,
                message: error.to_string(),
            },
            None => OneViewError::Transport(error.to_string()),
        }
    }
}

fn transient_kind(kind: std::io::ErrorKind) -> Option<TransientKind> {
    use std::io::ErrorKind;

    match kind {
        ErrorKind::TimedOut => Some(TransientKind::Timeout),
        ErrorKind::ConnectionAborted | ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof => {
            Some(TransientKind::ConnectionAborted)
        }
        ErrorKind::ConnectionReset => Some(TransientKind::ConnectionReset),
        ErrorKind::ConnectionRefused => Some(TransientKind::ConnectionRefused),
        ErrorKind::NotConnected => Some(TransientKind::Unreachable),
        _ => None,
    }
}

/// Kind of the first `std::io::Error` in the source chain of `error`.
fn io_source_kind(error: &(dyn std::error::Error + 'static)) -> Option<std::io::ErrorKind> {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return Some(io.kind());
        }
        source = cause.source();
    }
    None
}

impl From<url::ParseError> for OneViewError {
    fn from(error: url::ParseError) -> Self {
        OneViewError::Config(format!("invalid appliance URL: {error}"))
    }
}
