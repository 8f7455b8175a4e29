//! Newline-delimited JSON transport over any async reader/writer pair.

use crate::channel::MethodChannel;
use crate::codec::{decode_call, encode_reply, ChannelReply, ReplyEnvelope, MALFORMED_ENVELOPE};
use anyhow::Result;
use sehat_ocr::{ErrorCode, OcrFailure};
use serde_json::Value;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Replies buffered between request tasks and the writer
const REPLY_BUFFER: usize = 64;

/// Serve the channel until `reader` reaches EOF.
///
/// Every request runs on its own task. Replies funnel through one writer,
/// one line each, in completion order. A line that is not valid UTF-8 or
/// not a call envelope gets a `bad_args` reply and serving continues.
/// In-flight requests are drained before returning, even when reading
/// fails, so each request gets exactly one reply line.
/// Returns the number of request lines handled.
pub async fn serve<R, W>(channel: Arc<MethodChannel>, reader: R, writer: W) -> Result<usize>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (tx, mut rx) = mpsc::channel::<ReplyEnvelope>(REPLY_BUFFER);

    let read_loop = async move {
        let mut reader = BufReader::new(reader);
        let mut buf = Vec::new();
        let mut handled = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let decoded = match std::str::from_utf8(&buf) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    decode_call(line)
                }
                Err(e) => Err((
                    Value::Null,
                    OcrFailure::new(
                        ErrorCode::BadArgs,
                        MALFORMED_ENVELOPE,
                        Some(format!("request line is not valid UTF-8: {}", e)),
                    ),
                )),
            };
            handled += 1;

            match decoded {
                Ok(call) => {
                    let channel = Arc::clone(&channel);
                    let tx = tx.clone();
                    tokio::spawn(async move {
                        let reply = channel.handle(call).await;
                        if tx.send(reply).await.is_err() {
                            warn!("reply writer closed, dropping reply");
                        }
                    });
                }
                Err((id, failure)) => {
                    warn!(error = ?failure.details, "malformed request line");
                    if tx
                        .send(ReplyEnvelope::new(id, ChannelReply::Error(failure)))
                        .await
                        .is_err()
                    {
                        warn!("reply writer closed, dropping reply");
                    }
                }
            }
        }

        // Writer stops once in-flight requests release their senders
        drop(tx);
        debug!(handled, "request stream closed");
        Ok::<usize, anyhow::Error>(handled)
    };

    let write_loop = async move {
        let mut writer = BufWriter::new(writer);
        while let Some(reply) = rx.recv().await {
            let mut line = encode_reply(&reply)?;
            line.push('\n');
            writer.write_all(line.as_bytes()).await?;
            writer.flush().await?;
        }
        Ok::<(), anyhow::Error>(())
    };

    let (read_result, write_result) = tokio::join!(read_loop, write_loop);
    write_result?;
    let handled = read_result?;
    info!(handled, "channel served");
    Ok(handled)
}

/// Serve the channel over this process's stdin/stdout
pub async fn serve_stdio(channel: Arc<MethodChannel>) -> Result<usize> {
    info!(channel = channel.name(), "serving on stdio");
    serve(channel, tokio::io::stdin(), tokio::io::stdout()).await
}
