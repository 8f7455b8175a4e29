//! OCR execution service.
//!
//! Each call moves through `Received -> Validating -> CheckingFile ->
//! AccessingResource -> Recognizing -> Aggregating -> Completed`, or stops
//! at the first failure. Validation and the existence check run on the
//! caller; recognition runs on a spawned task and its outcome comes back
//! through an [`OcrHandle`] that resolves exactly once.

use crate::access::{default_security_scope, NoSecurityScope, ScopedAccess, SecurityScope};
use crate::engine::{aggregate_lines, create_engine, RecognitionEngine, RecognitionOptions};
use crate::types::{OcrFailure, OcrOutcome, OcrRequest, OcrResponse};
use anyhow::Result;
use futures_util::FutureExt;
use sehat_config::Config;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Existence check against the host filesystem
pub trait FileProbe: Send + Sync {
    fn is_file(&self, path: &Path) -> bool;
}

pub struct HostFileProbe;

impl FileProbe for HostFileProbe {
    fn is_file(&self, path: &Path) -> bool {
        std::fs::metadata(path)
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }
}

/// Pending result of one `extractText` call.
///
/// Resolves exactly once, to success or a typed failure. Completion is
/// observed wherever the handle is awaited, so the caller's task sees the
/// outcome on its own executor even though recognition ran elsewhere.
/// Dropping the handle detaches the caller; the recognition task still
/// runs to completion and releases its file access.
#[must_use = "an OcrHandle does nothing unless awaited"]
pub struct OcrHandle {
    rx: oneshot::Receiver<OcrOutcome>,
}

impl OcrHandle {
    fn ready(outcome: OcrOutcome) -> Self {
        let (tx, rx) = oneshot::channel();
        let _ = tx.send(outcome);
        Self { rx }
    }
}

impl Future for OcrHandle {
    type Output = OcrOutcome;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| Err(OcrFailure::vision("recognition task terminated")))
        })
    }
}

/// Stateless OCR service; every call is independent
#[derive(Clone)]
pub struct OcrService {
    engine: Arc<dyn RecognitionEngine>,
    scope: Arc<dyn SecurityScope>,
    probe: Arc<dyn FileProbe>,
    options: RecognitionOptions,
}

impl OcrService {
    pub fn new(engine: Arc<dyn RecognitionEngine>) -> Self {
        Self {
            engine,
            scope: Arc::new(NoSecurityScope),
            probe: Arc::new(HostFileProbe),
            options: RecognitionOptions::default(),
        }
    }

    /// Build the service for this host from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let engine: Arc<dyn RecognitionEngine> = Arc::from(create_engine(config)?);
        Ok(Self::new(engine)
            .with_security_scope(default_security_scope(&config.ocr))
            .with_options(RecognitionOptions::from(&config.ocr)))
    }

    pub fn with_security_scope(mut self, scope: Arc<dyn SecurityScope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_file_probe(mut self, probe: Arc<dyn FileProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_options(mut self, options: RecognitionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn options(&self) -> &RecognitionOptions {
        &self.options
    }

    /// Validate untyped channel arguments and extract text
    pub fn extract_text_from_args(&self, args: &Value) -> OcrHandle {
        debug!("validating extractText arguments");
        match OcrRequest::from_args(args) {
            Ok(request) => self.extract_text(request),
            Err(failure) => {
                warn!(code = %failure.code, "rejected extractText call");
                OcrHandle::ready(Err(failure))
            }
        }
    }

    /// Extract text from the image named by `request`.
    ///
    /// Must be called from within a Tokio runtime; outside one the handle
    /// resolves to `vision_error` instead of panicking.
    pub fn extract_text(&self, request: OcrRequest) -> OcrHandle {
        if request.image_path.is_empty() {
            return OcrHandle::ready(Err(OcrFailure::bad_args()));
        }

        let path = PathBuf::from(&request.image_path);
        if !self.probe.is_file(&path) {
            warn!(path = %request.image_path, "image not found");
            return OcrHandle::ready(Err(OcrFailure::not_found(&request.image_path)));
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!(error = %e, "no async runtime for recognition");
                return OcrHandle::ready(Err(OcrFailure::vision(format!(
                    "No async runtime available: {}",
                    e
                ))));
            }
        };

        let (tx, rx) = oneshot::channel();
        let engine = Arc::clone(&self.engine);
        let scope = Arc::clone(&self.scope);
        let options = self.options.clone();

        let recognition = async move {
            let _access = ScopedAccess::acquire(scope.as_ref(), &path);

            debug!(path = %path.display(), engine = engine.name(), "recognizing");
            let observations = engine
                .recognize(&path, &options)
                .await
                .map_err(|e| OcrFailure::vision(format!("{:#}", e)))?;

            debug!(observations = observations.len(), "aggregating");
            Ok::<_, OcrFailure>(OcrResponse::new(aggregate_lines(&observations)))
        };

        runtime.spawn(async move {
            let outcome = AssertUnwindSafe(recognition)
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(OcrFailure::vision(panic_message(panic.as_ref()))));

            match &outcome {
                Ok(response) => info!(
                    lines = response.line_count(),
                    chars = response.text.len(),
                    "OCR completed"
                ),
                Err(failure) => warn!(code = %failure.code, message = %failure.message, "OCR failed"),
            }

            if tx.send(outcome).is_err() {
                debug!("caller dropped OCR handle before completion");
            }
        });

        OcrHandle { rx }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "recognition task panicked".to_string()
    }
}
