//! Evaluation control: at most one in-flight evaluation per session.
//!
//! The evaluator owns the request/settle cycle around `transport::evaluate`
//! and the cancel handshake. The rules, in order:
//!
//! - A second `evaluate` while one is in flight is rejected synchronously,
//!   before any network traffic. Nothing is queued.
//! - A progress display is published into the output cell before the
//!   request leaves the client.
//! - `cancel` asks the service to interrupt and renders the cancelling
//!   display, but the evaluation still settles through its own reply.
//! - Settlement always returns the slot to idle and drops the cancel
//!   handle, so a cancel that arrives after settlement does nothing.
//! - Transport failures settle as an error display; `evaluate` itself
//!   still returns `Ok`. The only error it raises is the guard rejection.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, warn};

use crate::error::ShellError;
use crate::output::{decode, Output, OutputCell};
use crate::transport::ShellTransport;
use crate::ShellId;

/// Where the session's evaluation currently stands.
#[derive(Debug, Clone, Copy, PartialEq)]
enum EvalState {
    Idle,
    InProgress { started: Instant },
    Cancelling { started: Instant },
}

/// Context retained while an evaluation is in flight: where to render the
/// cancelling display. Present exactly while the slot is not idle.
#[derive(Debug, Clone)]
struct CancelHandle {
    output: OutputCell,
}

/// The per-session evaluation slot. One mutex guards both the state and
/// the cancel handle so guard checks and transitions are atomic.
#[derive(Debug)]
pub(crate) struct EvalSlot {
    state: EvalState,
    cancel: Option<CancelHandle>,
}

impl EvalSlot {
    pub(crate) fn new() -> Self {
        Self {
            state: EvalState::Idle,
            cancel: None,
        }
    }

    pub(crate) fn is_idle(&self) -> bool {
        matches!(self.state, EvalState::Idle)
    }
}

/// Runs evaluations for one session.
///
/// Obtained from `Session::evaluator`. Cheap to clone indirectly (all
/// controllers handed out by one session share the same slot), so two
/// tasks holding controllers still cannot start two evaluations at once.
pub struct Evaluator {
    transport: Arc<ShellTransport>,
    shell_id: ShellId,
    slot: Arc<Mutex<EvalSlot>>,
    timeout: Option<Duration>,
}

impl Evaluator {
    pub(crate) fn new(
        transport: Arc<ShellTransport>,
        shell_id: ShellId,
        slot: Arc<Mutex<EvalSlot>>,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            transport,
            shell_id,
            slot,
            timeout,
        }
    }

    /// Override the evaluation deadline for this controller.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Evaluate `code` on the session's shell, rendering into `output`.
    ///
    /// Resolves once the evaluation has settled, successfully or not; the
    /// outcome is whatever `output` holds. The returned error is only ever
    /// [`ShellError::EvaluationInProgress`]: interpreter failures,
    /// transport failures, and timeouts all settle into the cell as error
    /// displays instead.
    pub async fn evaluate(&self, code: &str, output: &OutputCell) -> Result<(), ShellError> {
        let started = self.begin(output)?;

        let outcome = match self.timeout {
            None => Some(self.transport.evaluate(&self.shell_id, code).await),
            Some(limit) => {
                match tokio::time::timeout(limit, self.transport.evaluate(&self.shell_id, code))
                    .await
                {
                    Ok(result) => Some(result),
                    Err(_) => None,
                }
            }
        };

        let display = match outcome {
            Some(Ok(reply)) => {
                if !reply.succeeded() {
                    debug!(
                        "[evaluate] Shell {} reported status {:?}",
                        self.shell_id, reply.status
                    );
                }
                decode(&reply)
            }
            Some(Err(e)) => {
                warn!("[evaluate] Shell {} evaluation failed: {e}", self.shell_id);
                Output::error_text(e.to_string())
            }
            None => {
                // Deadline hit: same motions as a user cancel, then a
                // local failure display. The abandoned request is dropped.
                let limit = self.timeout.unwrap_or_default();
                warn!(
                    "[evaluate] Shell {} evaluation exceeded {:.1}s; interrupting",
                    self.shell_id,
                    limit.as_secs_f64()
                );
                self.cancel().await;
                Output::error_text(format!(
                    "Evaluation timed out after {:.1}s",
                    limit.as_secs_f64()
                ))
            }
        };

        self.settle(output, display, started);
        Ok(())
    }

    /// How long the current evaluation has been in flight, if any.
    pub fn elapsed_in_flight(&self) -> Option<Duration> {
        let slot = self.slot.lock().unwrap();
        match slot.state {
            EvalState::InProgress { started } | EvalState::Cancelling { started } => {
                Some(started.elapsed())
            }
            EvalState::Idle => None,
        }
    }

    /// Request interruption of the in-flight evaluation, if any.
    ///
    /// Advisory and asynchronous: the service decides when the evaluation
    /// actually stops, and the evaluate future settles through its own
    /// reply. With nothing in flight this is a no-op. Repeating it
    /// re-sends the interrupt.
    pub async fn cancel(&self) {
        if !self.request_cancel() {
            debug!(
                "[evaluate] Cancel requested on shell {} with nothing in flight",
                self.shell_id
            );
            return;
        }
        info!("[evaluate] Interrupting shell {}", self.shell_id);
        if let Err(e) = self.transport.interrupt(&self.shell_id).await {
            warn!("[evaluate] Interrupt of shell {} failed: {e}", self.shell_id);
        }
    }

    /// Guard, transition to in-progress, install the cancel handle, and
    /// render the progress display. No I/O happens in here. Returns the
    /// flight's start instant for the elapsed-time arithmetic at settle.
    fn begin(&self, output: &OutputCell) -> Result<Instant, ShellError> {
        let started = Instant::now();
        {
            let mut slot = self.slot.lock().unwrap();
            if !slot.is_idle() {
                return Err(ShellError::EvaluationInProgress);
            }
            slot.state = EvalState::InProgress { started };
            slot.cancel = Some(CancelHandle {
                output: output.clone(),
            });
        }
        output.publish(Output::Progress {
            started_at: Utc::now(),
        });
        debug!("[evaluate] Evaluation started on shell {}", self.shell_id);
        Ok(started)
    }

    /// Mark the flight as cancelling and render the cancelling display.
    /// Returns false when no evaluation is in flight. The display is
    /// published under the slot lock so it cannot land after settlement.
    fn request_cancel(&self) -> bool {
        let mut slot = self.slot.lock().unwrap();
        let Some(handle) = slot.cancel.clone() else {
            return false;
        };
        if let EvalState::InProgress { started } = slot.state {
            slot.state = EvalState::Cancelling { started };
        }
        handle.output.publish(Output::Cancelling);
        true
    }

    /// Return the slot to idle, drop the cancel handle, and record the
    /// final display plus elapsed time.
    fn settle(&self, output: &OutputCell, display: Output, started: Instant) {
        {
            let mut slot = self.slot.lock().unwrap();
            slot.state = EvalState::Idle;
            slot.cancel = None;
        }
        let elapsed = started.elapsed();
        output.complete(display, elapsed);
        debug!(
            "[evaluate] Shell {} settled after {elapsed:?}",
            self.shell_id
        );
    }

    #[cfg(test)]
    pub(crate) fn shares_slot_with(&self, other: &Evaluator) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}
