//! Module system errors.

use thiserror::Error;

use crate::integrations::IntegrationError;

/// Errors raised by a module while it is constructed, probed, or executed.
///
/// These never reach the transport layer directly: the dispatch gateway
/// converts them into structured `{success: false, error}` envelopes.
#[derive(Debug, Error)]
pub enum ModuleError {
    /// Required configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A status probe failed (OS call, counter read, ...).
    #[error("Status probe failed: {0}")]
    Probe(String),

    /// Third-party API call failed.
    #[error(transparent)]
    Integration(#[from] IntegrationError),

    /// Runtime error during module execution.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

/// Errors surfaced by the dispatch gateway.
///
/// An action id a module does not recognise is not an error here; the
/// module answers with its own structured failure result.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// No module is registered under the requested id.
    #[error("Module not found: {0}")]
    NotFound(String),

    /// The invocation envelope was malformed (missing `action_id`, bad JSON).
    #[error("{0}")]
    BadRequest(String),

    /// The module faulted while serving the request.
    #[error("{0}")]
    Execution(String),
}

impl GatewayError {
    /// Short machine-readable kind for log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::Execution(_) => "execution_error",
        }
    }
}

impl From<ModuleError> for GatewayError {
    fn from(err: ModuleError) -> Self {
        Self::Execution(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_error_converts_to_execution() {
        let err: GatewayError = ModuleError::Probe("disk read failed".into()).into();
        assert!(matches!(err, GatewayError::Execution(_)));
        assert_eq!(err.to_string(), "Status probe failed: disk read failed");
    }

    #[test]
    fn test_gateway_error_kinds() {
        assert_eq!(GatewayError::NotFound("x".into()).kind(), "not_found");
        assert_eq!(GatewayError::BadRequest("x".into()).kind(), "bad_request");
        assert_eq!(GatewayError::Execution("x".into()).kind(), "execution_error");
    }
}
