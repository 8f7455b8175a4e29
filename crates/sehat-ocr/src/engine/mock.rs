//! Mock recognition engine for testing
//!
//! Returns scripted observations, errors or panics without touching a real
//! recognizer. Outcomes can be set globally or per image path, optionally
//! with a delay so tests can force completion order.
//!
//! # Example
//!
//! ```rust,ignore
//! use sehat_ocr::engine::mock::{MockEngine, MockOutcome};
//!
//! let engine = MockEngine::new()
//!     .with_lines(&["Blood Group", "O+"])
//!     .for_path("/tmp/blank.png", MockOutcome::lines(&[]));
//! ```

use super::{Observation, RecognitionEngine, RecognitionOptions};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the mock does when asked to recognize an image
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Observations(Vec<Observation>),
    Error(String),
    Panic(String),
}

impl MockOutcome {
    /// One single-candidate observation per line
    pub fn lines(lines: &[&str]) -> Self {
        MockOutcome::Observations(
            lines
                .iter()
                .map(|line| Observation::single(*line, 1.0))
                .collect(),
        )
    }
}

#[derive(Debug, Clone)]
struct Route {
    outcome: MockOutcome,
    delay: Option<Duration>,
}

pub struct MockEngine {
    default: Route,
    routes: HashMap<PathBuf, Route>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(PathBuf, RecognitionOptions)>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// A mock that finds no text in any image
    pub fn new() -> Self {
        Self {
            default: Route {
                outcome: MockOutcome::Observations(Vec::new()),
                delay: None,
            },
            routes: HashMap::new(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with_outcome(mut self, outcome: MockOutcome) -> Self {
        self.default.outcome = outcome;
        self
    }

    pub fn with_lines(self, lines: &[&str]) -> Self {
        self.with_outcome(MockOutcome::lines(lines))
    }

    pub fn with_observations(self, observations: Vec<Observation>) -> Self {
        self.with_outcome(MockOutcome::Observations(observations))
    }

    pub fn with_error(self, message: &str) -> Self {
        self.with_outcome(MockOutcome::Error(message.to_string()))
    }

    pub fn with_panic(self, message: &str) -> Self {
        self.with_outcome(MockOutcome::Panic(message.to_string()))
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.default.delay = Some(delay);
        self
    }

    /// Override the outcome for one image path
    pub fn for_path(mut self, path: impl Into<PathBuf>, outcome: MockOutcome) -> Self {
        self.routes.insert(
            path.into(),
            Route {
                outcome,
                delay: None,
            },
        );
        self
    }

    /// Override the outcome for one image path and delay its completion
    pub fn for_path_delayed(
        mut self,
        path: impl Into<PathBuf>,
        outcome: MockOutcome,
        delay: Duration,
    ) -> Self {
        self.routes.insert(
            path.into(),
            Route {
                outcome,
                delay: Some(delay),
            },
        );
        self
    }

    /// Number of times `recognize` was invoked
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Options passed on the most recent invocation
    pub fn last_options(&self) -> Option<RecognitionOptions> {
        self.seen
            .lock()
            .ok()
            .and_then(|seen| seen.last().map(|(_, options)| options.clone()))
    }

    /// Paths passed to `recognize`, in call order
    pub fn seen_paths(&self) -> Vec<PathBuf> {
        self.seen
            .lock()
            .map(|seen| seen.iter().map(|(path, _)| path.clone()).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl RecognitionEngine for MockEngine {
    async fn recognize(&self, path: &Path, options: &RecognitionOptions) -> Result<Vec<Observation>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push((path.to_path_buf(), options.clone()));
        }

        let route = self.routes.get(path).unwrap_or(&self.default).clone();

        if let Some(delay) = route.delay {
            tokio::time::sleep(delay).await;
        }

        match route.outcome {
            MockOutcome::Observations(observations) => Ok(observations),
            MockOutcome::Error(message) => Err(anyhow::anyhow!(message)),
            MockOutcome::Panic(message) => panic!("{}", message),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
