//! Extractor: the enrichment collaborator interface
//!
//! Whatever turns raw text into candidate nodes and links sits behind this
//! trait and is treated as a black box. Three implementations:
//! - `CommandExtractor`: pipes a JSON request into an external process
//! - `ReplayExtractor`: treats the subject text as an already-produced response
//! - `MockExtractor`: returns preconfigured responses (testing)

use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Errors from an extractor call. None of these are fatal to a session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("extractor not available: {0}")]
    Unavailable(String),
    #[error("extractor timed out after {0:?}")]
    Timeout(Duration),
    #[error("extractor rate limited")]
    RateLimited,
    #[error("extraction failed: {0}")]
    InvocationFailed(String),
}

/// The enrichment collaborator.
///
/// Returns the raw response text; the caller parses it into a fragment at
/// the boundary, so an extractor never has to validate its own output.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Stable identifier used in logs
    fn id(&self) -> &str;

    /// Extract candidate entities from `raw_text`.
    ///
    /// `known_class_ids` lists the Class nodes already in the graph so the
    /// extractor can reuse them.
    async fn extract(&self, raw_text: &str, known_class_ids: &[String]) -> Result<String, ExtractError>;
}

/// Spawns an external program per call.
///
/// The request `{"text": ..., "known_classes": [...]}` is written to the
/// child's stdin; its stdout is the response.
pub struct CommandExtractor {
    program: String,
    args: Vec<String>,
}

impl CommandExtractor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl Extractor for CommandExtractor {
    fn id(&self) -> &str {
        &self.program
    }

    async fn extract(&self, raw_text: &str, known_class_ids: &[String]) -> Result<String, ExtractError> {
        let request = serde_json::json!({
            "text": raw_text,
            "known_classes": known_class_ids,
        });

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExtractError::Unavailable(format!("spawn {}: {}", self.program, e)))?;

        // Feed stdin while stdout drains; a child that echoes as it reads
        // would otherwise fill its output pipe and stall the write.
        let stdin = child.stdin.take();
        let payload = request.to_string();
        let write = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(payload.as_bytes()).await?;
            }
            Ok::<(), std::io::Error>(())
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output.map_err(|e| ExtractError::InvocationFailed(format!("wait: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::InvocationFailed(format!(
                "exit {}: {}",
                output.status,
                stderr.chars().take(200).collect::<String>()
            )));
        }

        // A child may answer without reading all of its input.
        if let Err(e) = written {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(ExtractError::InvocationFailed(format!("write stdin: {}", e)));
            }
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Replays pre-extracted responses: the subject text is the response.
#[derive(Debug, Default)]
pub struct ReplayExtractor;

#[async_trait]
impl Extractor for ReplayExtractor {
    fn id(&self) -> &str {
        "replay"
    }

    async fn extract(&self, raw_text: &str, _known_class_ids: &[String]) -> Result<String, ExtractError> {
        Ok(raw_text.to_string())
    }
}

/// Mock extractor for testing. Returns preconfigured responses keyed by
/// subject text and records every call.
pub struct MockExtractor {
    responses: HashMap<String, Result<String, ExtractError>>,
    delay: Duration,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            delay: Duration::ZERO,
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Register a response for a subject text.
    pub fn with_response(mut self, raw_text: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses.insert(raw_text.into(), Ok(response.into()));
        self
    }

    /// Register a failure for a subject text.
    pub fn with_failure(mut self, raw_text: impl Into<String>, error: ExtractError) -> Self {
        self.responses.insert(raw_text.into(), Err(error));
        self
    }

    /// Simulated latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Subject texts in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Highest number of calls observed running at once.
    pub fn max_concurrency(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl Default for MockExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    fn id(&self) -> &str {
        "mock"
    }

    async fn extract(&self, raw_text: &str, _known_class_ids: &[String]) -> Result<String, ExtractError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(raw_text.to_string());
        }
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        match self.responses.get(raw_text) {
            Some(result) => result.clone(),
            None => Err(ExtractError::InvocationFailed(format!(
                "no mock response for '{}'",
                raw_text
            ))),
        }
    }
}
