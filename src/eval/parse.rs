use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{CALL_END_MARKER, CALL_START_MARKER};

/// Canonical form of one call directive. Immutable after construction; the
/// comparator reads two of these side by side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub function_name: String,
    pub arguments: IndexMap<String, serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ParseError {
    DelimitersNotFound,
    JsonDecode { message: String },
    ArgsDecode { message: String },
    ArgsNotObject { found: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::DelimitersNotFound => write!(f, "delimiters not found"),
            ParseError::JsonDecode { message } => {
                write!(f, "invalid JSON in call directive: {}", message)
            }
            ParseError::ArgsDecode { message } => {
                write!(f, "invalid JSON in arguments: {}", message)
            }
            ParseError::ArgsNotObject { found } => {
                write!(f, "arguments should be an object or string, got {}", found)
            }
        }
    }
}

/// Decoding strategy for the string-encoded arguments field. The training
/// data serializes argument maps as Python dict literals; newly generated
/// data can use strict JSON instead without touching the rest of the
/// pipeline.
pub trait DecodeArgs {
    fn decode(&self, raw: &str) -> Result<IndexMap<String, serde_json::Value>, ParseError>;
}

/// Best-effort rewrite of a Python dict literal into JSON: single quotes
/// become double quotes, `True`/`False` become `true`/`false`. The rewrite
/// is textual, so argument values that themselves contain an apostrophe or
/// the substrings `True`/`False` come out corrupted. That behavior is
/// intentional and pinned by tests.
pub struct LegacyPyArgs;

impl DecodeArgs for LegacyPyArgs {
    fn decode(&self, raw: &str) -> Result<IndexMap<String, serde_json::Value>, ParseError> {
        let normalized = raw
            .replace('\'', "\"")
            .replace("True", "true")
            .replace("False", "false");
        decode_args_object(&normalized)
    }
}

/// Strict decoder for data whose arguments field is real JSON.
pub struct StrictJsonArgs;

impl DecodeArgs for StrictJsonArgs {
    fn decode(&self, raw: &str) -> Result<IndexMap<String, serde_json::Value>, ParseError> {
        decode_args_object(raw)
    }
}

fn decode_args_object(raw: &str) -> Result<IndexMap<String, serde_json::Value>, ParseError> {
    serde_json::from_str::<IndexMap<String, serde_json::Value>>(raw).map_err(|e| {
        ParseError::ArgsDecode {
            message: e.to_string(),
        }
    })
}

/// Reduce a free-text transcript to a canonical call record.
///
/// The transcript is expected to contain one directive of the form
/// `<functioncall> {"name": ..., "arguments": ...} <|im_end|>`. A missing
/// name field yields an empty function name; a missing arguments field
/// yields an empty argument map. A structured arguments object is accepted
/// as-is, a string-valued one goes through the decoder.
pub fn parse_transcript(
    text: &str,
    decoder: &dyn DecodeArgs,
) -> Result<CallRecord, ParseError> {
    let start = text
        .find(CALL_START_MARKER)
        .ok_or(ParseError::DelimitersNotFound)?;
    let payload_start = start + CALL_START_MARKER.len();
    let end = text[payload_start..]
        .find(CALL_END_MARKER)
        .ok_or(ParseError::DelimitersNotFound)?;
    let payload = &text[payload_start..payload_start + end];

    let directive: serde_json::Value =
        serde_json::from_str(payload).map_err(|e| ParseError::JsonDecode {
            message: e.to_string(),
        })?;

    let function_name = directive
        .get("name")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();

    let arguments = match directive.get("arguments") {
        None => IndexMap::new(),
        Some(serde_json::Value::String(raw)) => decoder.decode(raw)?,
        Some(serde_json::Value::Object(map)) => {
            map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
        }
        Some(other) => {
            return Err(ParseError::ArgsNotObject {
                found: json_type_name(other).to_string(),
            });
        }
    };

    Ok(CallRecord {
        function_name,
        arguments,
    })
}

/// Parse with the legacy Python-dict argument decoder, the format the
/// training data is stored in.
pub fn parse_transcript_legacy(text: &str) -> Result<CallRecord, ParseError> {
    parse_transcript(text, &LegacyPyArgs)
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
