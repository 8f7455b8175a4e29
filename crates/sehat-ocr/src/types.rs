//! Request, response and failure types shared by the service and the channel.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Argument key carrying the image path in an `extractText` call
pub const IMAGE_PATH_KEY: &str = "imagePath";

pub const MSG_MISSING_IMAGE_PATH: &str = "Missing imagePath";
pub const MSG_IMAGE_NOT_FOUND: &str = "Image not found";
pub const MSG_METHOD_NOT_IMPLEMENTED: &str = "Method not implemented";

/// Closed set of failure kinds that can cross the channel boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Missing or malformed request payload
    BadArgs,
    /// The referenced image does not exist at call time
    NotFound,
    /// The recognition engine failed
    VisionError,
    /// The channel received a method name it does not serve
    MethodNotImplemented,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadArgs => "bad_args",
            ErrorCode::NotFound => "not_found",
            ErrorCode::VisionError => "vision_error",
            ErrorCode::MethodNotImplemented => "method_not_implemented",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed failure delivered in place of recognized text
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code}: {message}")]
pub struct OcrFailure {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl OcrFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details,
        }
    }

    pub fn bad_args() -> Self {
        Self::new(ErrorCode::BadArgs, MSG_MISSING_IMAGE_PATH, None)
    }

    /// `details` echoes the requested path verbatim
    pub fn not_found(image_path: &str) -> Self {
        Self::new(
            ErrorCode::NotFound,
            MSG_IMAGE_NOT_FOUND,
            Some(image_path.to_string()),
        )
    }

    pub fn vision(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::VisionError, message, None)
    }

    pub fn method_not_implemented(method: &str) -> Self {
        Self::new(
            ErrorCode::MethodNotImplemented,
            MSG_METHOD_NOT_IMPLEMENTED,
            Some(method.to_string()),
        )
    }
}

/// A single text-extraction request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrRequest {
    #[serde(rename = "imagePath")]
    pub image_path: String,
}

impl OcrRequest {
    pub fn new(image_path: impl Into<String>) -> Self {
        Self {
            image_path: image_path.into(),
        }
    }

    /// Validate untyped channel arguments.
    ///
    /// Arguments must be a map with a non-empty string under `imagePath`.
    /// Anything else is `bad_args`; the filesystem is never consulted here.
    pub fn from_args(args: &Value) -> Result<Self, OcrFailure> {
        args.as_object()
            .and_then(|map| map.get(IMAGE_PATH_KEY))
            .and_then(Value::as_str)
            .filter(|path| !path.is_empty())
            .map(Self::new)
            .ok_or_else(OcrFailure::bad_args)
    }
}

/// Successful recognition result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrResponse {
    /// Recognized lines joined with `\n`; empty when the image has no text
    pub text: String,
}

impl OcrResponse {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn line_count(&self) -> usize {
        if self.text.is_empty() {
            0
        } else {
            self.text.split('\n').count()
        }
    }
}

/// Exactly one of these is produced per request
pub type OcrOutcome = Result<OcrResponse, OcrFailure>;
