use crate::codec::{ChannelReply, MethodCall, ReplyEnvelope};
use sehat_ocr::{OcrFailure, OcrService};
use serde_json::Value;
use tracing::{debug, warn};

/// The only method this channel serves
pub const EXTRACT_TEXT: &str = "extractText";

/// Named request/response entry point in front of the OCR service.
///
/// Calls are not serialized or batched; concurrent invocations run
/// independently and may complete in any order.
#[derive(Clone)]
pub struct MethodChannel {
    name: String,
    service: OcrService,
}

impl MethodChannel {
    pub fn new(name: impl Into<String>, service: OcrService) -> Self {
        Self {
            name: name.into(),
            service,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn service(&self) -> &OcrService {
        &self.service
    }

    /// Invoke `method` and wait for its single reply
    pub async fn invoke(&self, method: &str, args: &Value) -> ChannelReply {
        debug!(channel = %self.name, method, "method call");
        match method {
            EXTRACT_TEXT => self.service.extract_text_from_args(args).await.into(),
            other => {
                warn!(channel = %self.name, method = other, "method not implemented");
                ChannelReply::Error(OcrFailure::method_not_implemented(other))
            }
        }
    }

    pub async fn handle(&self, call: MethodCall) -> ReplyEnvelope {
        let reply = self.invoke(&call.method, &call.args).await;
        ReplyEnvelope::new(call.id, reply)
    }
}
