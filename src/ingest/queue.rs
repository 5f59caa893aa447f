//! IngestionQueue: strictly sequential, paced enrichment of subjects
//!
//! One worker task drains an unbounded channel. Each subject is marked
//! in flight, sent to the extractor, parsed at the boundary and handed to
//! the sink; failures are logged and swallowed. The in-flight mark is
//! cleared whatever the outcome. Subjects queued back to back are spaced by
//! the pacing delay; the first subject after an idle period runs at once.

use super::cancel::SessionToken;
use super::extractor::{ExtractError, Extractor};
use super::fragment::Fragment;
use super::pending::PendingRegistry;
use super::sink::{FragmentSink, MergeOutcome};
use crate::config::QueueConfig;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Errors from queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("ingestion queue worker has stopped")]
    Closed,
}

/// One unit of work: raw text to enrich, identified for progress display.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichmentSubject {
    pub id: String,
    pub text: String,
}

impl EnrichmentSubject {
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
        }
    }
}

struct QueuedSubject {
    subject: EnrichmentSubject,
    token: SessionToken,
    enqueued_at: DateTime<Utc>,
}

/// Sequential, paced ingestion queue.
pub struct IngestionQueue {
    tx: mpsc::UnboundedSender<QueuedSubject>,
    sink: Arc<dyn FragmentSink>,
    pending: PendingRegistry,
    /// Subjects enqueued but not yet settled
    outstanding: Arc<watch::Sender<usize>>,
    worker: JoinHandle<()>,
}

impl IngestionQueue {
    /// Start the worker task. Must be called inside a tokio runtime.
    pub fn spawn(
        extractor: Arc<dyn Extractor>,
        sink: Arc<dyn FragmentSink>,
        config: QueueConfig,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = PendingRegistry::new();
        let (outstanding, _) = watch::channel(0usize);
        let outstanding = Arc::new(outstanding);

        let worker = Worker {
            extractor,
            sink: sink.clone(),
            config,
            pending: pending.clone(),
            outstanding: outstanding.clone(),
        };
        let worker = tokio::spawn(worker.run(rx));

        Self {
            tx,
            sink,
            pending,
            outstanding,
            worker,
        }
    }

    /// Queue a batch for the session currently accepting work.
    pub fn enqueue(&self, batch: Vec<EnrichmentSubject>) -> Result<(), QueueError> {
        if batch.is_empty() {
            return Ok(());
        }

        let token = self.sink.current_token();
        let enqueued_at = Utc::now();
        let count = batch.len();
        self.outstanding.send_modify(|n| *n += count);

        for subject in batch {
            let queued = QueuedSubject {
                subject,
                token: token.clone(),
                enqueued_at,
            };
            if self.tx.send(queued).is_err() {
                self.outstanding.send_modify(|n| *n = 0);
                return Err(QueueError::Closed);
            }
        }
        debug!(count, session = %token.session_id(), "batch enqueued");
        Ok(())
    }

    /// Subjects currently being enriched.
    pub fn pending(&self) -> &PendingRegistry {
        &self.pending
    }

    /// Watch the in-flight count.
    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.pending.subscribe()
    }

    /// Number of subjects enqueued and not yet settled.
    pub fn outstanding(&self) -> usize {
        *self.outstanding.borrow()
    }

    /// Resolve once every enqueued subject has settled.
    pub async fn wait_idle(&self) {
        let mut rx = self.outstanding.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Stop accepting work, let queued subjects drain, and join the worker.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.worker.await {
            warn!(error = %e, "ingestion worker ended abnormally");
        }
    }
}

struct Worker {
    extractor: Arc<dyn Extractor>,
    sink: Arc<dyn FragmentSink>,
    config: QueueConfig,
    pending: PendingRegistry,
    outstanding: Arc<watch::Sender<usize>>,
}

impl Worker {
    async fn run(self, mut rx: mpsc::UnboundedReceiver<QueuedSubject>) {
        // True while subjects keep arriving without the queue going idle
        let mut busy = false;

        loop {
            let next = if busy {
                match rx.try_recv() {
                    Ok(item) => Some(item),
                    Err(TryRecvError::Empty) => {
                        busy = false;
                        rx.recv().await
                    }
                    Err(TryRecvError::Disconnected) => None,
                }
            } else {
                rx.recv().await
            };
            let Some(item) = next else {
                break;
            };

            if busy && !item.token.is_cancelled() {
                tokio::time::sleep(self.config.pacing()).await;
            }

            if item.token.is_cancelled() {
                debug!(subject = %item.subject.id, "discarding subject from a reset session");
                self.settle();
                continue;
            }

            busy = true;
            self.process(item).await;
            self.settle();
        }

        debug!("ingestion worker stopped");
    }

    async fn process(&self, item: QueuedSubject) {
        let QueuedSubject {
            subject,
            token,
            enqueued_at,
        } = item;

        self.pending.mark(&subject.id, enqueued_at);

        let known_classes = self.sink.known_class_ids();
        let call = self.extractor.extract(&subject.text, &known_classes);
        let response = tokio::time::timeout(self.config.call_timeout(), call)
            .await
            .unwrap_or(Err(ExtractError::Timeout(self.config.call_timeout())));
        let response = match response {
            Ok(response) => Some(response),
            Err(e) => {
                warn!(subject = %subject.id, extractor = self.extractor.id(), error = %e, "extraction failed");
                None
            }
        };

        if let Some(response) = response {
            match Fragment::from_response_text(&response) {
                Ok(fragment) => match self.sink.accept(&token, fragment) {
                    MergeOutcome::Applied(delta) => debug!(
                        subject = %subject.id,
                        added_nodes = delta.added_nodes.len(),
                        added_links = delta.added_links.len(),
                        "subject merged"
                    ),
                    MergeOutcome::Discarded => {
                        debug!(subject = %subject.id, "result discarded after session reset")
                    }
                },
                Err(failure) => {
                    warn!(subject = %subject.id, error = %failure, "malformed extractor response")
                }
            }
        }

        self.pending.clear(&subject.id);
    }

    fn settle(&self) {
        self.outstanding.send_modify(|n| *n = n.saturating_sub(1));
    }
}
