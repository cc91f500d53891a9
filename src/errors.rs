//! Typed error hierarchy for the bridge.
//!
//! Two enums cover the library surface:
//! - `BridgeError`: failures surfaced to the host for the current phase
//! - `SessionError`: failures of the underlying session storage

use thiserror::Error;

/// Errors surfaced to the host while processing a phase.
///
/// View resolution failures are expected outcomes the host may branch on;
/// everything else aborts the current phase.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("No default view configured for portlet mode '{mode}' and no view was signaled")]
    DefaultViewNotSpecified { mode: String },

    #[error("View path '{path}' does not map to an existing view")]
    InvalidViewPath { path: String },

    #[error("No implementation registered for required factory '{factory}'")]
    FactoryNotFound { factory: &'static str },

    #[error("Session storage failure: {0}")]
    Session(#[from] SessionError),

    #[error("Failed to encode request scope: {0}")]
    ScopeEncoding(#[source] serde_json::Error),
}

/// Errors from the session-backed scope storage.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session I/O failed for key {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Session unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_error_default_view_carries_mode() {
        let err = BridgeError::DefaultViewNotSpecified {
            mode: "edit".to_string(),
        };
        match &err {
            BridgeError::DefaultViewNotSpecified { mode } => assert_eq!(mode, "edit"),
            _ => panic!("Expected DefaultViewNotSpecified"),
        }
        assert!(err.to_string().contains("'edit'"));
    }

    #[test]
    fn bridge_error_invalid_view_path_carries_path() {
        let err = BridgeError::InvalidViewPath {
            path: "/missing.xhtml".to_string(),
        };
        assert!(err.to_string().contains("/missing.xhtml"));
    }

    #[test]
    fn bridge_error_converts_from_session_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "store down");
        let inner = SessionError::Io {
            key: "scope-1".to_string(),
            source: io_err,
        };
        let err: BridgeError = inner.into();
        match &err {
            BridgeError::Session(SessionError::Io { key, source }) => {
                assert_eq!(key, "scope-1");
                assert_eq!(source.kind(), std::io::ErrorKind::BrokenPipe);
            }
            _ => panic!("Expected BridgeError::Session(Io {{ .. }})"),
        }
    }

    #[test]
    fn bridge_error_variants_are_distinct() {
        let default_err = BridgeError::DefaultViewNotSpecified {
            mode: "view".into(),
        };
        let path_err = BridgeError::InvalidViewPath { path: "/x".into() };
        assert!(matches!(
            default_err,
            BridgeError::DefaultViewNotSpecified { .. }
        ));
        assert!(!matches!(path_err, BridgeError::DefaultViewNotSpecified { .. }));
    }

    #[test]
    fn all_error_types_implement_std_error_trait() {
        fn assert_std_error<E: std::error::Error>(_: &E) {}
        assert_std_error(&BridgeError::FactoryNotFound {
            factory: "view_resolver",
        });
        assert_std_error(&SessionError::Unavailable("closed".into()));
    }
}
