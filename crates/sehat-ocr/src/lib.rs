// Suppress warnings from objc crate macros
#![allow(unexpected_cfgs)]

pub mod access;
pub mod engine;
pub mod service;
pub mod types;

pub use access::{NoSecurityScope, ScopedAccess, SecurityScope};
pub use engine::{
    aggregate_lines, create_engine, Candidate, Observation, RecognitionEngine, RecognitionOptions,
};
pub use service::{FileProbe, HostFileProbe, OcrHandle, OcrService};
pub use types::{ErrorCode, OcrFailure, OcrOutcome, OcrRequest, OcrResponse, IMAGE_PATH_KEY};
