//! Service discovery and session opening.
//!
//! [`ShellClient`] drives the front door of the protocol: resolve the
//! service base URL through the host gateway, wait for the backend to
//! answer readiness probes, then run the getShell / setShellOptions /
//! bootstrap handshake that produces a live [`Session`]. Any failure on
//! this path is fatal to session creation and surfaces as
//! [`ShellError::ServiceUnavailable`].

use std::sync::Arc;

use log::{info, warn};

use crate::config::{ServiceSpec, ShellConfig, ShellOptions};
use crate::error::ShellError;
use crate::gateway::BackendGateway;
use crate::output::decode;
use crate::session::Session;
use crate::transport::ShellTransport;
use crate::ShellId;

#[derive(Debug)]
pub struct ShellClient<G> {
    gateway: G,
    config: ShellConfig,
    transport: Arc<ShellTransport>,
}

impl<G: BackendGateway> ShellClient<G> {
    /// Locate the service described by `spec` and wait until it is ready.
    pub async fn connect(
        gateway: G,
        spec: &ServiceSpec,
        config: ShellConfig,
    ) -> Result<Self, ShellError> {
        let base_url = gateway
            .locate_service(spec)
            .await
            .map_err(ShellError::ServiceUnavailable)?;
        info!(
            "[shell-client] Located {} service at {base_url}",
            spec.plugin_name
        );

        let transport = ShellTransport::new(base_url, &config.lang)
            .map_err(|e| ShellError::ServiceUnavailable(e.to_string()))?;
        transport
            .wait_until_ready(config.ready_attempts, config.ready_delay)
            .await
            .map_err(|e| ShellError::ServiceUnavailable(e.to_string()))?;

        Ok(Self {
            gateway,
            config,
            transport: Arc::new(transport),
        })
    }

    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Open a session: allocate a shell (or revalidate `prior`), push its
    /// option set, and evaluate the bootstrap expression when the host
    /// has a session identity.
    pub async fn open_session(
        &self,
        prior: Option<&ShellId>,
        options: ShellOptions,
    ) -> Result<Session, ShellError> {
        let session_id = self.gateway.session_id();

        let shell_id = self
            .transport
            .get_shell(prior, session_id.as_deref())
            .await
            .map_err(|e| ShellError::ServiceUnavailable(format!("getShell failed: {e}")))?;
        info!("[shell-client] Got shell {shell_id}");

        self.transport
            .set_shell_options(&shell_id, &options)
            .await
            .map_err(|e| {
                ShellError::ServiceUnavailable(format!("setShellOptions failed: {e}"))
            })?;

        if let Some(session_id) = &session_id {
            if let Some(bootstrap) = self.config.render_bootstrap(session_id) {
                self.run_bootstrap(&shell_id, &bootstrap).await;
            }
        }

        Ok(Session::new(
            Arc::clone(&self.transport),
            shell_id,
            options,
            self.config.eval_timeout,
        ))
    }

    /// Evaluate the bootstrap expression once. A failed bootstrap leaves
    /// the session usable without its host bridge, so it is logged,
    /// not raised.
    async fn run_bootstrap(&self, shell_id: &ShellId, code: &str) {
        match self.transport.evaluate(shell_id, code).await {
            Ok(reply) if reply.succeeded() => {
                info!("[shell-client] Bootstrap evaluated on shell {shell_id}");
            }
            Ok(reply) => {
                warn!(
                    "[shell-client] Bootstrap rejected on shell {shell_id}: {:?}",
                    decode(&reply)
                );
            }
            Err(e) => {
                warn!("[shell-client] Bootstrap request failed on shell {shell_id}: {e}");
            }
        }
    }
}
