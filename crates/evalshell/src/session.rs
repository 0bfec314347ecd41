//! One remote interpreter instance and the client-side state attached to it.
//!
//! A [`Session`] is produced by `ShellClient::open_session` after the
//! getShell / setShellOptions / bootstrap handshake. It owns the shell id,
//! the last option set sent to the service, and the evaluation slot that
//! [`Evaluator`] and the cancel path share. Evaluation itself lives in
//! `evaluator`; completions in `completion`. Dropping a `Session` does not
//! tear down the remote shell, call [`exit`](Session::exit) for that.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{info, warn};

use crate::completion::Completions;
use crate::config::ShellOptions;
use crate::error::ShellError;
use crate::evaluator::{EvalSlot, Evaluator};
use crate::transport::ShellTransport;
use crate::ShellId;

#[derive(Debug)]
pub struct Session {
    transport: Arc<ShellTransport>,
    shell_id: ShellId,
    options: Mutex<ShellOptions>,
    eval: Arc<Mutex<EvalSlot>>,
    eval_timeout: Option<Duration>,
    exited: AtomicBool,
}

impl Session {
    pub(crate) fn new(
        transport: Arc<ShellTransport>,
        shell_id: ShellId,
        options: ShellOptions,
        eval_timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            shell_id,
            options: Mutex::new(options),
            eval: Arc::new(Mutex::new(EvalSlot::new())),
            eval_timeout,
            exited: AtomicBool::new(false),
        }
    }

    pub fn shell_id(&self) -> &ShellId {
        &self.shell_id
    }

    /// Snapshot of the option set the service currently holds.
    pub fn options(&self) -> ShellOptions {
        self.options.lock().unwrap().clone()
    }

    /// Whether an evaluation is currently in flight on this session.
    pub fn is_evaluating(&self) -> bool {
        !self.eval.lock().unwrap().is_idle()
    }

    /// Evaluation controller for this session. All controllers of one
    /// session share the same in-flight slot.
    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new(
            Arc::clone(&self.transport),
            self.shell_id.clone(),
            Arc::clone(&self.eval),
            self.eval_timeout,
        )
    }

    /// Completion service for this session.
    pub fn completions(&self) -> Completions {
        Completions::new(Arc::clone(&self.transport), self.shell_id.clone())
    }

    /// Replace the shell's option set wholesale. The local snapshot is
    /// only updated once the service has acknowledged the new set.
    pub async fn configure(&self, options: ShellOptions) -> Result<(), ShellError> {
        self.transport
            .set_shell_options(&self.shell_id, &options)
            .await?;
        info!(
            "[session] Shell {} reconfigured ({} option(s))",
            self.shell_id,
            options.len()
        );
        *self.options.lock().unwrap() = options;
        Ok(())
    }

    /// Ask the service to interrupt whatever the shell is doing. This is
    /// the bare wire call; cancelling a tracked evaluation (and getting
    /// the cancelling display) goes through [`Evaluator::cancel`].
    pub async fn interrupt(&self) -> Result<(), ShellError> {
        self.transport.interrupt(&self.shell_id).await?;
        info!("[session] Sent interrupt for shell {}", self.shell_id);
        Ok(())
    }

    /// Wipe the interpreter state behind this shell while keeping the
    /// shell id valid.
    pub async fn reset_environment(&self) -> Result<(), ShellError> {
        self.transport.reset_environment(&self.shell_id).await?;
        info!("[session] Reset environment of shell {}", self.shell_id);
        Ok(())
    }

    /// Tear down the remote shell. Idempotent: repeat calls do nothing,
    /// and a service-side failure is logged rather than surfaced. The
    /// session must not be used for evaluation afterwards.
    pub async fn exit(&self) {
        if self.exited.swap(true, Ordering::SeqCst) {
            return;
        }
        match self.transport.exit(&self.shell_id).await {
            Ok(()) => info!("[session] Shell {} exited", self.shell_id),
            Err(e) => warn!("[session] Exit of shell {} failed: {e}", self.shell_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_session() -> Session {
        let transport = ShellTransport::new("http://127.0.0.1:1", "fsharp").unwrap();
        Session::new(
            Arc::new(transport),
            ShellId::new("shell-1"),
            ShellOptions::new().with("useIntellisense", "true"),
            None,
        )
    }

    #[test]
    fn test_session_exposes_shell_id_and_options() {
        let session = test_session();
        assert_eq!(session.shell_id().as_str(), "shell-1");
        assert_eq!(session.options().get("useIntellisense"), Some("true"));
    }

    #[test]
    fn test_fresh_session_is_idle() {
        let session = test_session();
        assert!(!session.is_evaluating());
    }

    #[test]
    fn test_evaluators_share_one_slot() {
        let session = test_session();
        let a = session.evaluator();
        let b = session.evaluator();
        assert!(a.shares_slot_with(&b));
    }
}
