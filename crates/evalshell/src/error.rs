//! Error types for shell-service operations.
//!
//! Two layers: [`TransportError`] describes a single failed HTTP exchange
//! with the service, [`ShellError`] is the boundary callers of sessions,
//! evaluators, and completions see. On the evaluate path most transport
//! failures never reach the caller as errors at all; they are folded into
//! the output cell as an error display (see `evaluator`).

/// Error type for one HTTP exchange with the shell service.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Failed to initialize HTTP client: {0}")]
    Init(#[source] reqwest::Error),

    #[error("Request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Malformed reply from {endpoint}: {detail}")]
    MalformedReply { endpoint: String, detail: String },

    #[error("Service not ready after {attempts} probes")]
    NeverReady { attempts: u32 },
}

impl TransportError {
    /// Endpoint path the failing exchange was addressed to, when known.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            TransportError::Request { endpoint, .. }
            | TransportError::Status { endpoint, .. }
            | TransportError::MalformedReply { endpoint, .. } => Some(endpoint),
            TransportError::Init(_) | TransportError::NeverReady { .. } => None,
        }
    }
}

/// Error type for session and evaluation operations.
#[derive(Debug, thiserror::Error)]
pub enum ShellError {
    /// The service could not be located, never became ready, or refused to
    /// hand out a shell. Fatal to session creation.
    #[error("Evaluation service unavailable: {0}")]
    ServiceUnavailable(String),

    /// An evaluation is already running on this session. Raised before any
    /// network traffic; the running evaluation is unaffected.
    #[error("An evaluation is already in progress on this shell")]
    EvaluationInProgress,

    /// A request on an established session failed at the wire.
    #[error("Transport failure: {0}")]
    Transport(#[from] TransportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_unavailable_display() {
        let err = ShellError::ServiceUnavailable("locate failed".to_string());
        assert_eq!(
            err.to_string(),
            "Evaluation service unavailable: locate failed"
        );
    }

    #[test]
    fn test_transport_error_carries_endpoint() {
        let err = TransportError::Status {
            endpoint: "/fsharp/evaluate".to_string(),
            status: 500,
        };
        assert_eq!(err.endpoint(), Some("/fsharp/evaluate"));
        assert_eq!(err.to_string(), "/fsharp/evaluate returned HTTP 500");

        let err = TransportError::NeverReady { attempts: 20 };
        assert_eq!(err.endpoint(), None);
    }

    #[test]
    fn test_transport_folds_into_shell_error() {
        let err: ShellError = TransportError::NeverReady { attempts: 3 }.into();
        assert!(matches!(err, ShellError::Transport(_)));
        assert_eq!(
            err.to_string(),
            "Transport failure: Service not ready after 3 probes"
        );
    }
}
