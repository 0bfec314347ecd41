//! evalshell - client for remote evaluation-shell services.
//!
//! A notebook-style front end hands code fragments to a remote
//! interpreter (a "shell") over HTTP and renders whatever comes back.
//! This crate is that client: it locates the service through the hosting
//! application, opens and configures shells, runs at most one evaluation
//! per session at a time with cooperative cancellation, and decodes the
//! tagged result payloads into a display model.
//!
//! ```ignore
//! use evalshell::{OutputCell, ServiceSpec, ShellClient, ShellConfig, ShellOptions, StaticGateway};
//!
//! let gateway = StaticGateway::new("http://127.0.0.1:8801");
//! let spec = ServiceSpec::new("FSharp", "fsharp/fsharpPlugin", "Successfully started server");
//! let client = ShellClient::connect(gateway, &spec, ShellConfig::new("fsharp")).await?;
//!
//! let session = client
//!     .open_session(None, ShellOptions::new().with("useIntellisense", "true"))
//!     .await?;
//!
//! let cell = OutputCell::new();
//! session.evaluator().evaluate("1 + 1", &cell).await?;
//! println!("{:?} in {:?}", cell.display(), cell.elapsed());
//!
//! session.exit().await;
//! ```

use serde::{Deserialize, Serialize};

pub mod client;
pub mod completion;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod gateway;
pub mod output;
pub mod protocol;
pub mod session;
pub mod transport;

pub use client::ShellClient;
pub use completion::Completions;
pub use config::{ServiceSpec, ShellConfig, ShellOptions};
pub use error::{ShellError, TransportError};
pub use evaluator::Evaluator;
pub use gateway::{BackendGateway, StaticGateway};
pub use output::{decode, Output, OutputCell};
pub use protocol::{Declaration, EvaluateReply, IntellisenseReply};
pub use session::Session;
pub use transport::ShellTransport;

/// Opaque identifier of a remote shell, issued by the service on
/// `getShell` and threaded through every subsequent request. The client
/// never inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShellId(String);

impl ShellId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ShellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ShellId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ShellId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_id_display_and_serde() {
        let id = ShellId::new("a1b2");
        assert_eq!(id.to_string(), "a1b2");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"a1b2\"");

        let parsed: ShellId = serde_json::from_str("\"a1b2\"").unwrap();
        assert_eq!(parsed, id);
    }
}
