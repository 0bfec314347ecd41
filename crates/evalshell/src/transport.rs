//! HTTP wire layer for one shell service.
//!
//! Every operation is a form-encoded POST to `{base_url}/{lang}/{op}` with
//! a JSON reply. The transport knows nothing about session state; it takes
//! a shell id, performs one exchange, and reports the reply or a
//! [`TransportError`]. Requests carry no client-side deadline, callers
//! that want one wrap the future (see `evaluator`).

use std::time::Duration;

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ShellOptions;
use crate::error::TransportError;
use crate::protocol::{shell_id_from_reply, AutocompleteReply, EvaluateReply, IntellisenseReply};
use crate::ShellId;

/// Wire-level client for a located shell service.
#[derive(Debug, Clone)]
pub struct ShellTransport {
    http: reqwest::Client,
    base_url: String,
    lang: String,
}

impl ShellTransport {
    /// Create a transport for a service base URL and language path
    /// segment. A trailing slash on the base URL is tolerated.
    pub fn new(base_url: impl Into<String>, lang: impl Into<String>) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(TransportError::Init)?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            lang: lang.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn lang(&self) -> &str {
        &self.lang
    }

    fn url(&self, op: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.lang, op)
    }

    fn path(&self, op: &str) -> String {
        format!("/{}/{}", self.lang, op)
    }

    /// One form-encoded POST; any non-2xx reply is an error.
    async fn post(
        &self,
        op: &str,
        form: &[(&str, String)],
    ) -> Result<reqwest::Response, TransportError> {
        let endpoint = self.path(op);
        let response = self
            .http
            .post(self.url(op))
            .form(form)
            .send()
            .await
            .map_err(|source| TransportError::Request {
                endpoint: endpoint.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }
        Ok(response)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        op: &str,
        form: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let endpoint = self.path(op);
        let response = self.post(op, form).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| TransportError::MalformedReply {
                endpoint,
                detail: e.to_string(),
            })
    }

    /// Acknowledgement-only exchange; the reply body is discarded.
    async fn post_ack(&self, op: &str, form: &[(&str, String)]) -> Result<(), TransportError> {
        self.post(op, form).await?;
        Ok(())
    }

    /// Ask the service for a shell. An empty prior id allocates a fresh
    /// one; a known id revalidates it. The host session identity is
    /// forwarded when there is one.
    pub async fn get_shell(
        &self,
        prior: Option<&ShellId>,
        session_id: Option<&str>,
    ) -> Result<ShellId, TransportError> {
        let mut form = vec![(
            "shellId",
            prior.map(|id| id.as_str().to_string()).unwrap_or_default(),
        )];
        if let Some(session_id) = session_id {
            form.push(("sessionId", session_id.to_string()));
        }

        let reply: Value = self.post_json("getShell", &form).await?;
        shell_id_from_reply(&reply)
            .map(ShellId::new)
            .ok_or_else(|| TransportError::MalformedReply {
                endpoint: self.path("getShell"),
                detail: format!("no shell id in {reply}"),
            })
    }

    /// Replace the shell's option set wholesale.
    pub async fn set_shell_options(
        &self,
        shell_id: &ShellId,
        options: &ShellOptions,
    ) -> Result<(), TransportError> {
        let mut form = vec![("shellId", shell_id.as_str().to_string())];
        for (name, value) in options.iter() {
            form.push((name, value.to_string()));
        }
        self.post_ack("setShellOptions", &form).await
    }

    pub async fn evaluate(
        &self,
        shell_id: &ShellId,
        code: &str,
    ) -> Result<EvaluateReply, TransportError> {
        let form = [
            ("shellId", shell_id.as_str().to_string()),
            ("code", code.to_string()),
        ];
        self.post_json("evaluate", &form).await
    }

    pub async fn interrupt(&self, shell_id: &ShellId) -> Result<(), TransportError> {
        self.post_ack("interrupt", &[("shellId", shell_id.as_str().to_string())])
            .await
    }

    pub async fn autocomplete(
        &self,
        shell_id: &ShellId,
        code: &str,
        caret_position: usize,
    ) -> Result<AutocompleteReply, TransportError> {
        let form = [
            ("shellId", shell_id.as_str().to_string()),
            ("code", code.to_string()),
            ("caretPosition", caret_position.to_string()),
        ];
        self.post_json("autocomplete", &form).await
    }

    pub async fn intellisense(
        &self,
        shell_id: &ShellId,
        code: &str,
        line_index: usize,
        char_index: usize,
    ) -> Result<IntellisenseReply, TransportError> {
        let form = [
            ("shellId", shell_id.as_str().to_string()),
            ("code", code.to_string()),
            ("lineIndex", line_index.to_string()),
            ("charIndex", char_index.to_string()),
        ];
        self.post_json("intellisense", &form).await
    }

    pub async fn exit(&self, shell_id: &ShellId) -> Result<(), TransportError> {
        self.post_ack("exit", &[("shellId", shell_id.as_str().to_string())])
            .await
    }

    /// Wipe the interpreter state behind the shell without allocating a
    /// new one.
    pub async fn reset_environment(&self, shell_id: &ShellId) -> Result<(), TransportError> {
        self.post_ack(
            "resetEnvironment",
            &[("shellId", shell_id.as_str().to_string())],
        )
        .await
    }

    /// Single readiness probe.
    pub async fn ready(&self) -> bool {
        match self.http.post(self.url("ready")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Probe `/{lang}/ready` until the service answers, up to `attempts`
    /// probes spaced `delay` apart.
    pub async fn wait_until_ready(
        &self,
        attempts: u32,
        delay: Duration,
    ) -> Result<(), TransportError> {
        info!("[transport] Waiting for {} service to be ready...", self.lang);
        for attempt in 1..=attempts {
            if self.ready().await {
                debug!(
                    "[transport] {} service ready after {attempt} probe(s)",
                    self.lang
                );
                return Ok(());
            }
            debug!("[transport] Not ready (probe {attempt}/{attempts})");
            if attempt < attempts {
                tokio::time::sleep(delay).await;
            }
        }
        Err(TransportError::NeverReady { attempts })
    }
}
