//! Reply envelopes for the shell service's HTTP endpoints.
//!
//! Requests are form-encoded key/value pairs (assembled in `transport`);
//! replies are JSON in the shapes below. Field casing follows the service
//! verbatim and is not uniform across endpoints, hence the per-field
//! renames. Every field is optional or defaulted so that a reply that
//! parses as JSON always produces an envelope; deciding what a partial
//! envelope means is the decoder's job, not the wire layer's.

use serde::Deserialize;
use serde_json::Value;

/// Reply to `evaluate`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluateReply {
    /// Zero for success; any other value (or absence) is an interpreter
    /// failure.
    #[serde(default)]
    pub status: Option<i64>,

    /// Tagged payload. Absent on some failure paths.
    #[serde(default)]
    pub result: Option<RawResult>,
}

impl EvaluateReply {
    /// Whether the interpreter reported success.
    pub fn succeeded(&self) -> bool {
        self.status == Some(0)
    }
}

/// The `{ContentType, Data}` payload inside an evaluate reply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawResult {
    #[serde(rename = "ContentType", default)]
    pub content_type: Option<String>,

    #[serde(rename = "Data", default)]
    pub data: Option<Value>,
}

/// Reply to `autocomplete`: candidate completions, already ordered by the
/// service.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutocompleteReply {
    #[serde(rename = "Declarations", default)]
    pub declarations: Vec<String>,
}

/// Reply to `intellisense`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IntellisenseReply {
    /// Candidate declarations for the cursor position.
    #[serde(default)]
    pub declarations: Vec<Declaration>,

    /// Column where the replacement span starts.
    #[serde(rename = "startIndex", default)]
    pub start_index: usize,
}

/// One intellisense candidate.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Declaration {
    #[serde(default)]
    pub name: String,

    /// Icon index understood by the editor front end.
    #[serde(default)]
    pub glyph: Option<i64>,

    #[serde(default)]
    pub documentation: Option<String>,
}

/// Extract the shell id from a `getShell` reply.
///
/// The service answers with the id as a bare JSON string; an object
/// carrying a `shellId` field is accepted as well.
pub fn shell_id_from_reply(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map
            .get("shellId")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => None,
    }
}
