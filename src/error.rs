//! Allclient error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Transport-level introspection failure
pub const INTROSPECTION_FAILED: &str = "INTROSPECTION_FAILED";

/// Introspection succeeded but the procedure listing could not be understood
pub const MALFORMED_INTROSPECTION: &str = "ALLSERVER_MALFORMED_INTROSPECTION";

/// The transport rejected the procedure call
pub const PROCEDURE_UNREACHABLE: &str = "ALLSERVER_PROCEDURE_UNREACHABLE";

/// The `before` hook failed
pub const CLIENT_BEFORE_ERROR: &str = "ALLSERVER_CLIENT_BEFORE_ERROR";

/// The `after` hook failed
pub const CLIENT_AFTER_ERROR: &str = "ALLSERVER_CLIENT_AFTER_ERROR";

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Either a transport or a uri is required")]
    MissingDestination,

    #[error("Unsupported transport scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid uri: {0}")]
    InvalidUri(String),

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),

    /// Underlying error surfaced as-is when `never_throw` is off.
    #[error(transparent)]
    Rpc(#[from] anyhow::Error),
}

impl ClientError {
    /// Configuration errors are raised at construction regardless of `never_throw`.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ClientError::MissingDestination
                | ClientError::UnsupportedScheme(_)
                | ClientError::InvalidUri(_)
        )
    }

    /// The pass-through code of a re-thrown [`RpcError`], if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Rpc(err) => err
                .downcast_ref::<RpcError>()
                .and_then(|e| e.code.as_deref()),
            _ => None,
        }
    }
}

/// An error that may carry its own machine-readable code.
///
/// Hooks and transports return `anyhow::Error`. When such an error downcasts
/// to an `RpcError` with a code, the code and message are reported verbatim
/// instead of the default taxonomy.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RpcError {
    pub message: String,
    pub code: Option<String>,
}

impl RpcError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

/// Extract `(code, message)` from an error that carries its own code.
pub(crate) fn own_code(err: &anyhow::Error) -> Option<(String, String)> {
    let rpc = err.downcast_ref::<RpcError>()?;
    rpc.code
        .as_ref()
        .map(|code| (code.clone(), rpc.message.clone()))
}
