//! Session: one topic's canonical graph, layout and filters
//!
//! The session is the only writer of canonical state. A merge that adds
//! anything places the new nodes, recomputes the view, resyncs the layout
//! and reheats it partially; an empty delta touches nothing downstream.
//! Resetting cancels the session token, so work enqueued for the old topic
//! is dropped before it starts and results that settle late are discarded.

use crate::config::SessionConfig;
use crate::graph::{to_json_ld, to_json_ld_string, EntityStore, MergeDelta, NodeId, NodeKind};
use crate::ingest::{Fragment, FragmentSink, MergeOutcome, SessionToken};
use crate::layout::{
    LayoutEngine, LayoutError, LayoutState, PositionAllocator, TickFrame, TickObserver, Vec2,
};
use crate::view::{view, Filters, ViewGraph};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub struct Session {
    topic: String,
    created_at: DateTime<Utc>,
    config: SessionConfig,
    token: SessionToken,
    store: EntityStore,
    allocator: PositionAllocator,
    layout: LayoutEngine,
    filters: Filters,
    view: ViewGraph,
    observers: Vec<Arc<dyn TickObserver>>,
}

impl Session {
    pub fn new(topic: impl Into<String>, config: SessionConfig) -> Self {
        Self::with_filters(topic, config, Filters::default())
    }

    fn with_filters(topic: impl Into<String>, config: SessionConfig, filters: Filters) -> Self {
        let store = if config.seed_ontology {
            EntityStore::seeded()
        } else {
            EntityStore::new()
        };
        let layout = LayoutEngine::new(config.layout.clone());
        let allocator = PositionAllocator::new(layout.center(), &config.placement);

        let mut session = Self {
            topic: topic.into(),
            created_at: Utc::now(),
            config,
            token: SessionToken::new(),
            store,
            allocator,
            layout,
            filters,
            view: ViewGraph::default(),
            observers: Vec::new(),
        };
        let seeded: Vec<NodeId> = session.store.nodes().iter().map(|n| n.id.clone()).collect();
        session.allocator.place(session.layout.bodies_mut(), &seeded);
        session.refresh_view();

        info!(
            topic = %session.topic,
            session = %session.token.session_id(),
            nodes = session.store.node_count(),
            "session started"
        );
        session
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Token for work enqueued now.
    pub fn token(&self) -> SessionToken {
        self.token.clone()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn layout(&self) -> &LayoutEngine {
        &self.layout
    }

    pub fn filters(&self) -> &Filters {
        &self.filters
    }

    pub fn view(&self) -> &ViewGraph {
        &self.view
    }

    /// Merge a fragment produced for the session identified by `token`.
    pub fn merge(&mut self, token: &SessionToken, fragment: Fragment) -> MergeOutcome {
        if token.is_cancelled() || !token.same_session(&self.token) {
            debug!(
                stale = %token.session_id(),
                current = %self.token.session_id(),
                "discarding fragment from a previous session"
            );
            return MergeOutcome::Discarded;
        }
        MergeOutcome::Applied(self.merge_fragment(fragment))
    }

    /// Merge a fragment into this session directly.
    pub fn merge_fragment(&mut self, fragment: Fragment) -> MergeDelta {
        for rejection in &fragment.rejections {
            debug!(item = %rejection.description, reason = %rejection.reason, "fragment item dropped");
        }

        let delta = self.store.merge(fragment.nodes, fragment.links);
        if delta.is_empty() {
            return delta;
        }

        let placed = self
            .allocator
            .place(self.layout.bodies_mut(), delta.added_nodes.iter().map(|n| &n.id));
        self.refresh_view();
        self.layout.reheat();

        debug!(
            placed = placed.len(),
            visible = self.view.nodes.len(),
            alpha = self.layout.alpha(),
            "layout reheated"
        );
        delta
    }

    /// Recompute the view and hand it to the layout; returns whether the
    /// simulated membership changed.
    fn refresh_view(&mut self) -> bool {
        self.view = view(&self.store, &self.filters);
        self.layout
            .sync(self.view.layout_nodes(), self.view.layout_links())
    }

    /// Replace all filters. The layout is reheated only when the visible
    /// node or link set changed.
    pub fn set_filters(&mut self, filters: Filters) {
        if filters == self.filters {
            return;
        }
        self.filters = filters;
        if self.refresh_view() {
            self.layout.reheat();
        }
    }

    pub fn set_type_filter(&mut self, kind: Option<NodeKind>) {
        let filters = Filters {
            type_filter: kind,
            ..self.filters.clone()
        };
        self.set_filters(filters);
    }

    pub fn set_show_ontology_layer(&mut self, show: bool) {
        let filters = Filters {
            show_ontology_layer: show,
            ..self.filters.clone()
        };
        self.set_filters(filters);
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        let filters = Filters {
            search_term: term.into(),
            ..self.filters.clone()
        };
        self.set_filters(filters);
    }

    pub fn add_observer(&mut self, observer: Arc<dyn TickObserver>) {
        self.observers.push(observer);
    }

    pub fn is_animating(&self) -> bool {
        self.layout.state() == LayoutState::Running
    }

    /// Advance the layout one step and hand the frame to every observer.
    pub fn tick(&mut self) -> Option<Arc<TickFrame>> {
        let frame = Arc::new(self.layout.tick()?);
        for observer in &self.observers {
            observer.on_tick(Arc::clone(&frame));
        }
        Some(frame)
    }

    pub fn begin_drag(&mut self, id: &NodeId) -> Result<(), LayoutError> {
        self.layout.begin_drag(id)
    }

    pub fn update_drag(&mut self, id: &NodeId, position: Vec2) -> Result<(), LayoutError> {
        self.layout.update_drag(id, position)
    }

    pub fn end_drag(&mut self, id: &NodeId) -> Result<(), LayoutError> {
        self.layout.end_drag(id)
    }

    pub fn export_json_ld(&self) -> Value {
        to_json_ld(&self.store)
    }

    pub fn export_json_ld_string(&self) -> Result<String, serde_json::Error> {
        to_json_ld_string(&self.store)
    }

    /// Start over on a new topic with a fresh store, layout and token.
    ///
    /// Filters and observers carry over.
    pub fn reset(&mut self, topic: impl Into<String>) {
        self.token.cancel();
        let previous = self.token.session_id();

        let observers = std::mem::take(&mut self.observers);
        let mut next = Self::with_filters(topic, self.config.clone(), self.filters.clone());
        next.observers = observers;
        *self = next;

        info!(previous = %previous, topic = %self.topic, "session reset");
    }
}

/// Shared handle to a session: the sink the ingestion queue writes to and
/// the source the animation driver ticks.
///
/// The mutex is never held across an `.await`.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
    wake: Arc<Notify>,
    frames: Arc<watch::Sender<Option<Arc<TickFrame>>>>,
}

impl SessionHandle {
    pub fn new(mut session: Session) -> Self {
        let (frames, _) = watch::channel(None);
        let frames = Arc::new(frames);
        session.add_observer(frames.clone());
        Self {
            inner: Arc::new(Mutex::new(session)),
            wake: Arc::new(Notify::new()),
            frames,
        }
    }

    /// Lock the session. A panic in another holder does not poison it for us.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the session, then wake the animation driver if the
    /// layout was left running.
    pub fn update<R>(&self, f: impl FnOnce(&mut Session) -> R) -> R {
        let (result, animating) = {
            let mut session = self.lock();
            let result = f(&mut *session);
            (result, session.is_animating())
        };
        if animating {
            self.wake.notify_one();
        }
        result
    }

    /// Latest emitted frame; slow readers skip frames.
    pub fn frames(&self) -> watch::Receiver<Option<Arc<TickFrame>>> {
        self.frames.subscribe()
    }

    pub fn reset(&self, topic: impl Into<String>) {
        self.update(|session| session.reset(topic));
    }

    /// Tick at the configured frame rate while Running; park while Idle or
    /// Settled until a merge, filter change or drag wakes the layout.
    pub fn spawn_animation(&self) -> AnimationDriver {
        let handle = self.clone();
        let interval = self.lock().config().layout.frame_interval();
        let task = tokio::spawn(async move {
            loop {
                let ticked = handle.lock().tick().is_some();
                if ticked {
                    tokio::time::sleep(interval).await;
                } else {
                    handle.wake.notified().await;
                }
            }
        });
        AnimationDriver { task }
    }
}

impl FragmentSink for SessionHandle {
    fn current_token(&self) -> SessionToken {
        self.lock().token()
    }

    fn known_class_ids(&self) -> Vec<String> {
        self.lock().store().class_ids()
    }

    fn accept(&self, token: &SessionToken, fragment: Fragment) -> MergeOutcome {
        self.update(|session| session.merge(token, fragment))
    }
}

/// Background task driving layout ticks.
pub struct AnimationDriver {
    task: JoinHandle<()>,
}

impl AnimationDriver {
    pub fn stop(self) {
        self.task.abort();
    }
}
