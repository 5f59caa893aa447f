//! Ingestion: collaborator responses in, merged fragments out
//!
//! - [`Fragment`] is the checked boundary type parsed from collaborator text
//! - [`Extractor`] is the enrichment collaborator interface
//! - [`IngestionQueue`] sequences subjects and feeds a [`FragmentSink`]

mod cancel;
mod extractor;
mod fragment;
mod pending;
mod queue;
mod sink;

pub use cancel::SessionToken;
pub use extractor::{CommandExtractor, ExtractError, Extractor, MockExtractor, ReplayExtractor};
pub use fragment::{extract_json, Fragment, ParseFailure};
pub use pending::{PendingItem, PendingRegistry};
pub use queue::{EnrichmentSubject, IngestionQueue, QueueError};
pub use sink::{FragmentSink, MergeOutcome};
