//! Wire envelopes for the OCR method channel.
//!
//! One JSON object per line in each direction:
//!
//! ```text
//! -> {"id": 1, "method": "extractText", "args": {"imagePath": "/tmp/doc.png"}}
//! <- {"id": 1, "result": "line one\nline two"}
//! <- {"id": 1, "error": {"code": "not_found", "message": "Image not found", "details": "/tmp/doc.png"}}
//! ```

use anyhow::Result;
use sehat_ocr::{ErrorCode, OcrFailure, OcrOutcome};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message of the `bad_args` reply for a line that is not a call envelope
pub const MALFORMED_ENVELOPE: &str = "Malformed request envelope";

/// A method invocation received from the application layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Correlates the reply; any JSON value, echoed back verbatim.
    /// Absent ids are replied to with `null`.
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl MethodCall {
    pub fn new(id: Value, method: impl Into<String>, args: Value) -> Self {
        Self {
            id,
            method: method.into(),
            args,
        }
    }
}

/// The single reply slot for a call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelReply {
    Result(String),
    Error(OcrFailure),
}

impl From<OcrOutcome> for ChannelReply {
    fn from(outcome: OcrOutcome) -> Self {
        match outcome {
            Ok(response) => ChannelReply::Result(response.text),
            Err(failure) => ChannelReply::Error(failure),
        }
    }
}

impl ChannelReply {
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            ChannelReply::Result(_) => None,
            ChannelReply::Error(failure) => Some(failure.code),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub id: Value,
    #[serde(flatten)]
    pub reply: ChannelReply,
}

impl ReplyEnvelope {
    pub fn new(id: Value, reply: ChannelReply) -> Self {
        Self { id, reply }
    }
}

/// Decode one request line.
///
/// A line that is not a call envelope yields `bad_args`, carrying the id
/// when one could still be read from the line.
pub fn decode_call(line: &str) -> Result<MethodCall, (Value, OcrFailure)> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        (
            Value::Null,
            OcrFailure::new(ErrorCode::BadArgs, MALFORMED_ENVELOPE, Some(e.to_string())),
        )
    })?;

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    serde_json::from_value(value).map_err(|e| {
        (
            id,
            OcrFailure::new(ErrorCode::BadArgs, MALFORMED_ENVELOPE, Some(e.to_string())),
        )
    })
}

pub fn encode_reply(reply: &ReplyEnvelope) -> Result<String> {
    Ok(serde_json::to_string(reply)?)
}
