//! FragmentSink: where the ingestion queue delivers parsed fragments

use super::cancel::SessionToken;
use super::fragment::Fragment;
use crate::graph::MergeDelta;

/// What happened to a delivered fragment.
#[derive(Debug, Clone)]
pub enum MergeOutcome {
    /// Merged into the current session; the delta may be empty
    Applied(MergeDelta),
    /// The fragment belonged to a session that has since been reset
    Discarded,
}

impl MergeOutcome {
    pub fn delta(&self) -> Option<&MergeDelta> {
        match self {
            Self::Applied(delta) => Some(delta),
            Self::Discarded => None,
        }
    }
}

/// The single writer the ingestion queue feeds.
///
/// Implementations must serialize `accept` calls; the queue never calls
/// it concurrently, but other writers sharing the sink might.
pub trait FragmentSink: Send + Sync {
    /// Token of the session currently accepting work.
    fn current_token(&self) -> SessionToken;

    /// Class ids handed to the extractor alongside each subject.
    fn known_class_ids(&self) -> Vec<String>;

    /// Merge a fragment produced for the session identified by `token`.
    fn accept(&self, token: &SessionToken, fragment: Fragment) -> MergeOutcome;
}
