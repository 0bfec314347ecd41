//! Symbol completion and signature info for a code buffer.
//!
//! Stateless: every call is an independent round trip keyed by the shell
//! id, with no guard and no interaction with the evaluation slot.
//! Concurrent requests are fine; the service answers each on its own.

use std::sync::Arc;

use crate::error::ShellError;
use crate::protocol::IntellisenseReply;
use crate::transport::ShellTransport;
use crate::ShellId;

/// Completion service for one session, obtained from
/// `Session::completions`.
#[derive(Clone)]
pub struct Completions {
    transport: Arc<ShellTransport>,
    shell_id: ShellId,
}

impl Completions {
    pub(crate) fn new(transport: Arc<ShellTransport>, shell_id: ShellId) -> Self {
        Self {
            transport,
            shell_id,
        }
    }

    /// Candidate completions for a caret offset, in service order.
    pub async fn complete(
        &self,
        code: &str,
        caret_position: usize,
    ) -> Result<Vec<String>, ShellError> {
        let reply = self
            .transport
            .autocomplete(&self.shell_id, code, caret_position)
            .await?;
        Ok(reply.declarations)
    }

    /// Declarations with documentation for a line/column cursor, plus the
    /// column where the replacement span starts.
    pub async fn intellisense(
        &self,
        code: &str,
        line_index: usize,
        char_index: usize,
    ) -> Result<IntellisenseReply, ShellError> {
        let reply = self
            .transport
            .intellisense(&self.shell_id, code, line_index, char_index)
            .await?;
        Ok(reply)
    }
}
