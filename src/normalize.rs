//! Error normalization
//!
//! Turns an error raised at any pipeline stage into a failure [`CallResult`]
//! with a stable code and message. An error that carries its own code (an
//! [`RpcError`](crate::error::RpcError) with `code` set) keeps that code and
//! its own message.

use crate::error::{
    own_code, CLIENT_AFTER_ERROR, CLIENT_BEFORE_ERROR, INTROSPECTION_FAILED,
    MALFORMED_INTROSPECTION, PROCEDURE_UNREACHABLE,
};
use crate::result::CallResult;

/// Failure for a `before` hook error
pub fn before_failure(procedure: &str, error: anyhow::Error) -> CallResult {
    middleware_failure("before", CLIENT_BEFORE_ERROR, procedure, error)
}

/// Failure for an `after` hook error
pub fn after_failure(procedure: &str, error: anyhow::Error) -> CallResult {
    middleware_failure("after", CLIENT_AFTER_ERROR, procedure, error)
}

/// Failure for a rejected transport call
pub fn unreachable(procedure: &str, error: anyhow::Error) -> CallResult {
    CallResult::failure(
        PROCEDURE_UNREACHABLE,
        format!("Couldn't reach remote procedure: {}", procedure),
    )
    .with_error(error)
}

pub fn introspection_failed(uri: &str, error: anyhow::Error) -> CallResult {
    CallResult::failure(INTROSPECTION_FAILED, format!("Couldn't introspect {}", uri))
        .with_error(error)
}

pub fn malformed_introspection(uri: &str, error: Option<anyhow::Error>) -> CallResult {
    let result = CallResult::failure(
        MALFORMED_INTROSPECTION,
        format!("Malformed introspection from {}", uri),
    );
    match error {
        Some(error) => result.with_error(error),
        None => result,
    }
}

fn middleware_failure(
    stage: &str,
    default_code: &str,
    procedure: &str,
    error: anyhow::Error,
) -> CallResult {
    let (code, message) = own_code(&error).unwrap_or_else(|| {
        (
            default_code.to_string(),
            format!(
                "The '{}' middleware threw while calling: {}",
                stage, procedure
            ),
        )
    });
    CallResult::failure(code, message).with_error(error)
}
