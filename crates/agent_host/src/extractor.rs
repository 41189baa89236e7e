//! Artifact extraction from raw model responses.
//!
//! Three payload shapes are recognised, in this order per message:
//! - `tool_calls[*].function` with name `create_code_artifact` and a
//!   JSON-encoded argument string
//! - a `tool_use` event named `create_code_artifact` (fields in `input`,
//!   or `parameters` when `input` is absent)
//! - a legacy `tool_use` event named `Write` or `Edit` carrying
//!   `{file_path, content}`
//!
//! Malformed entries are logged and skipped. Extraction never fails.

use serde_json::Value;
use shared::artifact::Artifact;
use tracing::{debug, warn};

const CREATE_CODE_ARTIFACT: &str = "create_code_artifact";
const DEFAULT_LANGUAGE: &str = "js";
const UNKNOWN_EXTENSION: &str = "text";

/// Un-normalised artifact payload found in a message
#[derive(Debug, Clone, PartialEq)]
enum Candidate {
    /// `create_code_artifact` arguments (tool call or tool-use event)
    CodeArtifact(Value),
    /// `Write` / `Edit` input
    FileWrite(Value),
}

/// Extract every artifact from a sequence of raw response messages,
/// preserving message order and, within a message, tool-call order.
pub fn extract_artifacts(messages: &[Value]) -> Vec<Artifact> {
    let artifacts: Vec<Artifact> = messages
        .iter()
        .flat_map(classify)
        .filter_map(normalize)
        .collect();

    debug!(
        messages = messages.len(),
        artifacts = artifacts.len(),
        "extracted artifacts"
    );
    artifacts
}

fn classify(message: &Value) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    if let Some(calls) = message.get("tool_calls").and_then(Value::as_array) {
        for call in calls {
            let Some(function) = call.get("function") else {
                continue;
            };
            if function.get("name").and_then(Value::as_str) != Some(CREATE_CODE_ARTIFACT) {
                continue;
            }
            match parse_arguments(function.get("arguments")) {
                Ok(args) => candidates.push(Candidate::CodeArtifact(args)),
                Err(e) => warn!("Skipping create_code_artifact call with bad arguments: {}", e),
            }
        }
    }

    if message.get("type").and_then(Value::as_str) == Some("tool_use") {
        match message.get("name").and_then(Value::as_str) {
            Some(CREATE_CODE_ARTIFACT) => {
                let fields = message
                    .get("input")
                    .filter(|v| !v.is_null())
                    .or_else(|| message.get("parameters"));
                match fields {
                    Some(fields) => candidates.push(Candidate::CodeArtifact(fields.clone())),
                    None => warn!("create_code_artifact event carries neither input nor parameters"),
                }
            }
            Some("Write") | Some("Edit") => match message.get("input") {
                Some(input) => candidates.push(Candidate::FileWrite(input.clone())),
                None => warn!("Write/Edit event without input"),
            },
            _ => {}
        }
    }

    candidates
}

fn parse_arguments(arguments: Option<&Value>) -> Result<Value, String> {
    match arguments {
        Some(Value::String(raw)) => serde_json::from_str(raw).map_err(|e| e.to_string()),
        Some(obj @ Value::Object(_)) => Ok(obj.clone()),
        Some(other) => Err(format!("unexpected argument type: {}", other)),
        None => Err("missing arguments".to_string()),
    }
}

fn normalize(candidate: Candidate) -> Option<Artifact> {
    match candidate {
        Candidate::CodeArtifact(args) => {
            let (Some(filename), Some(content)) =
                (text_field(&args, "filename"), text_field(&args, "content"))
            else {
                warn!("Incomplete code artifact dropped: {}", summarize(&args));
                return None;
            };
            let language = text_field(&args, "language").unwrap_or(DEFAULT_LANGUAGE);
            Some(Artifact::from_language(filename, language, content))
        }
        Candidate::FileWrite(input) => {
            let (Some(path), Some(content)) =
                (text_field(&input, "file_path"), text_field(&input, "content"))
            else {
                warn!("Incomplete Write/Edit payload dropped: {}", summarize(&input));
                return None;
            };
            let filename = path.rsplit('/').next().unwrap_or(path);
            if filename.is_empty() {
                warn!("Write/Edit path has no file name: {}", path);
                return None;
            }
            let language = extension_of(filename);
            Some(Artifact::from_language(filename, language, content))
        }
    }
}

/// Non-empty string field
fn text_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn extension_of(filename: &str) -> String {
    match filename.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_lowercase(),
        _ => UNKNOWN_EXTENSION.to_string(),
    }
}

fn summarize(value: &Value) -> String {
    let text = value.to_string();
    if text.chars().count() > 120 {
        let cut: String = text.chars().take(120).collect();
        format!("{}...", cut)
    } else {
        text
    }
}
