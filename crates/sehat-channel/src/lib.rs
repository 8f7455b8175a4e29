//! Request channel for the OCR bridge.
//!
//! [`MethodChannel`] dispatches named calls to the OCR service;
//! [`transport::serve`] exposes it as newline-delimited JSON.

pub mod channel;
pub mod codec;
pub mod transport;

pub use channel::{MethodChannel, EXTRACT_TEXT};
pub use codec::{decode_call, encode_reply, ChannelReply, MethodCall, ReplyEnvelope};
pub use transport::{serve, serve_stdio};
