//! The seam between the client and its hosting application.
//!
//! The host knows two things the client cannot work out on its own: where
//! the backend service lives (the host may have to launch the process
//! first) and the identity of the notebook session, which backends use to
//! reach shared session state. [`BackendGateway`] abstracts both;
//! [`StaticGateway`] answers with fixed values for CLIs and tests.

use async_trait::async_trait;

use crate::config::ServiceSpec;

/// What the client asks of its host.
///
/// Errors are host-specific strings; the client wraps them in
/// `ShellError::ServiceUnavailable`.
#[async_trait]
pub trait BackendGateway: Send + Sync {
    /// Resolve the base URL of the backend described by `spec`, launching
    /// it first if the host needs to.
    async fn locate_service(&self, spec: &ServiceSpec) -> Result<String, String>;

    /// Identity of the hosting notebook session, when there is one.
    fn session_id(&self) -> Option<String>;
}

/// Gateway with fixed answers: a known service URL and an optional
/// session identity.
#[derive(Debug, Clone)]
pub struct StaticGateway {
    base_url: String,
    session_id: Option<String>,
}

impl StaticGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_id: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

#[async_trait]
impl BackendGateway for StaticGateway {
    async fn locate_service(&self, _spec: &ServiceSpec) -> Result<String, String> {
        Ok(self.base_url.clone())
    }

    fn session_id(&self) -> Option<String> {
        self.session_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_gateway_answers_fixed_url() {
        let gateway = StaticGateway::new("http://127.0.0.1:9000");
        let spec = ServiceSpec::new("FSharp", "fsharp/fsharpPlugin", "started");
        assert_eq!(
            gateway.locate_service(&spec).await.unwrap(),
            "http://127.0.0.1:9000"
        );
        assert_eq!(gateway.session_id(), None);
    }

    #[test]
    fn test_static_gateway_session_id() {
        let gateway = StaticGateway::new("http://localhost").with_session_id("session-9");
        assert_eq!(gateway.session_id().as_deref(), Some("session-9"));
    }
}
