//! Display model for evaluation results and the cell that holds them.
//!
//! [`decode`] maps one raw evaluate reply to exactly one [`Output`]
//! variant. It is pure and total: every reply, including malformed ones,
//! produces a displayable value, and the same reply always produces the
//! same output. Transport failures never reach this module; the evaluator
//! folds those into an [`Output::Error`] itself.
//!
//! [`OutputCell`] is the sink an evaluation renders into: the current
//! display, the elapsed time once settled, and a broadcast channel for
//! observers that want to re-render on changes.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

use crate::protocol::EvaluateReply;

/// One rendered state of an evaluation, from acceptance to settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Output {
    /// Nothing has been evaluated into the cell yet.
    Empty,

    /// Evaluation accepted and running on the service.
    Progress { started_at: DateTime<Utc> },

    /// Interruption requested; the evaluation has not settled yet.
    Cancelling,

    /// Untyped passthrough of the payload data.
    Plain { value: Value },

    /// Raw HTML markup, rendered verbatim by the front end.
    Markup { html: String },

    /// Tabular result: column names plus row values, both verbatim from
    /// the payload.
    Table {
        column_names: Vec<String>,
        values: Vec<Vec<Value>>,
    },

    /// Failure display: interpreter diagnostics, transport failures, and
    /// malformed payloads all land here.
    Error { message: Value },
}

impl Output {
    /// Error display wrapping a plain text message.
    pub fn error_text(message: impl Into<String>) -> Self {
        Output::Error {
            message: Value::String(message.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Output::Error { .. })
    }

    /// Whether the cell is still waiting on the service.
    pub fn is_pending(&self) -> bool {
        matches!(self, Output::Progress { .. } | Output::Cancelling)
    }
}

/// Decode a raw evaluate reply into its display form.
///
/// Success payloads dispatch on `ContentType`: `image/*` becomes an inline
/// data-URI markup, `table/grid` a table, `text/html` raw markup, and
/// anything else (including an absent tag) passes the data through
/// untouched. A non-zero or missing status wraps the payload data in an
/// error display. Payloads whose data does not match their tag decode to
/// an error display describing the mismatch.
pub fn decode(reply: &EvaluateReply) -> Output {
    let result = reply.result.as_ref();
    let data = result.and_then(|r| r.data.clone());

    if !reply.succeeded() {
        return Output::Error {
            message: data.unwrap_or(Value::Null),
        };
    }

    let Some(result) = result else {
        return Output::error_text("Evaluation reply carried no result payload");
    };

    match result.content_type.as_deref() {
        Some(content_type) if content_type.starts_with("image/") => match &data {
            Some(Value::String(b64)) => Output::Markup {
                html: format!(r#"<img src="data:{content_type};base64,{b64}" />"#),
            },
            _ => Output::error_text(format!(
                "Malformed {content_type} payload: expected base64 string data"
            )),
        },
        Some("table/grid") => decode_table(data.as_ref()),
        Some("text/html") => match data {
            Some(Value::String(html)) => Output::Markup { html },
            _ => Output::error_text("Malformed text/html payload: expected markup string"),
        },
        // Plain passthrough for unrecognized or untagged payloads.
        _ => Output::Plain {
            value: data.unwrap_or(Value::Null),
        },
    }
}

/// `table/grid` data is `{Columns: [name, ..], Rows: [[cell, ..], ..]}`.
fn decode_table(data: Option<&Value>) -> Output {
    let malformed =
        || Output::error_text("Malformed table/grid payload: expected Columns and Rows arrays");

    let Some(Value::Object(map)) = data else {
        return malformed();
    };
    let (Some(Value::Array(columns)), Some(Value::Array(rows))) =
        (map.get("Columns"), map.get("Rows"))
    else {
        return malformed();
    };

    let mut column_names = Vec::with_capacity(columns.len());
    for column in columns {
        match column.as_str() {
            Some(name) => column_names.push(name.to_string()),
            None => return malformed(),
        }
    }

    let mut values = Vec::with_capacity(rows.len());
    for row in rows {
        match row {
            Value::Array(cells) => values.push(cells.clone()),
            _ => return malformed(),
        }
    }

    Output::Table {
        column_names,
        values,
    }
}

/// Capacity of the per-cell observer channel. Re-renders are cheap and
/// observers only need the latest display, so lagging is harmless.
const CELL_EVENT_CAPACITY: usize = 64;

#[derive(Debug)]
struct CellInner {
    display: Output,
    elapsed: Option<Duration>,
}

/// The sink an evaluation renders into.
///
/// Cheap to clone; clones share the same cell. Writers use [`publish`]
/// for intermediate states and [`complete`] at settlement; observers
/// either poll [`display`] or [`subscribe`] for pushed updates.
///
/// [`publish`]: OutputCell::publish
/// [`complete`]: OutputCell::complete
/// [`display`]: OutputCell::display
/// [`subscribe`]: OutputCell::subscribe
#[derive(Debug, Clone)]
pub struct OutputCell {
    inner: Arc<Mutex<CellInner>>,
    events: broadcast::Sender<Output>,
}

impl OutputCell {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(CELL_EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(CellInner {
                display: Output::Empty,
                elapsed: None,
            })),
            events,
        }
    }

    /// Current display.
    pub fn display(&self) -> Output {
        self.inner.lock().unwrap().display.clone()
    }

    /// Wall-clock duration of the last settled evaluation, if any.
    pub fn elapsed(&self) -> Option<Duration> {
        self.inner.lock().unwrap().elapsed
    }

    /// Replace the display and notify observers.
    pub fn publish(&self, output: Output) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.display = output.clone();
        }
        // Only fails when nobody is subscribed, which is fine.
        let _ = self.events.send(output);
    }

    /// Record the final display and how long the evaluation took.
    pub fn complete(&self, output: Output, elapsed: Duration) {
        {
            let mut inner = self.inner.lock().unwrap();
            inner.display = output.clone();
            inner.elapsed = Some(elapsed);
        }
        let _ = self.events.send(output);
    }

    /// Subscribe to display changes. Each published display is delivered
    /// once; a lagged receiver skips to newer displays.
    pub fn subscribe(&self) -> broadcast::Receiver<Output> {
        self.events.subscribe()
    }
}

impl Default for OutputCell {
    fn default() -> Self {
        Self::new()
    }
}
