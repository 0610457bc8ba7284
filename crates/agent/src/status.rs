//! Status emitter — live run status for observers.
//!
//! Observers are plain callbacks invoked synchronously, in emission order.
//! There is no replay: an observer only sees updates emitted after it
//! subscribed. Async consumers can take a [`channel`](StatusEmitter::channel)
//! instead, which never blocks the engine.

use thoughtline_core::agent::{AgentStatus, StatusDelta};
use tokio::sync::mpsc;

/// What observers receive.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusUpdate {
    /// Only the fields that changed.
    Delta(StatusDelta),
    /// The full status, sent on reset.
    Snapshot(AgentStatus),
    /// A streamed model text fragment, for display only.
    Fragment(String),
}

/// Handle returned by [`StatusEmitter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type StatusObserver = Box<dyn Fn(&StatusUpdate) + Send + Sync>;

#[derive(Default)]
pub struct StatusEmitter {
    status: AgentStatus,
    observers: Vec<(SubscriptionId, StatusObserver)>,
    next_id: u64,
}

impl StatusEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The merged status as of the last update.
    pub fn current(&self) -> &AgentStatus {
        &self.status
    }

    /// Add an observer alongside any existing ones.
    pub fn subscribe(
        &mut self,
        observer: impl Fn(&StatusUpdate) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Replace every observer with this one.
    pub fn set_subscriber(
        &mut self,
        observer: impl Fn(&StatusUpdate) + Send + Sync + 'static,
    ) -> SubscriptionId {
        self.observers.clear();
        self.subscribe(observer)
    }

    /// Returns `false` if the id was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(existing, _)| *existing != id);
        self.observers.len() != before
    }

    /// Subscribe an unbounded channel. Updates arrive in emission order;
    /// a dropped receiver is ignored.
    pub fn channel(&mut self) -> mpsc::UnboundedReceiver<StatusUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(move |update| {
            let _ = tx.send(update.clone());
        });
        rx
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Merge a delta and forward it.
    ///
    /// The forwarded progress is the merged value, so observers never see it
    /// leave [0, 1] or move backwards.
    pub fn emit(&mut self, mut delta: StatusDelta) {
        self.status.apply(&delta);
        if delta.progress.is_some() {
            delta.progress = Some(self.status.progress);
        }
        self.notify(&StatusUpdate::Delta(delta));
    }

    /// Replace the whole status and forward it.
    pub fn reset(&mut self, status: AgentStatus) {
        self.status = AgentStatus {
            progress: thoughtline_core::agent::clamp_progress(status.progress),
            ..status
        };
        self.notify(&StatusUpdate::Snapshot(self.status.clone()));
    }

    pub fn fragment(&self, text: &str) {
        self.notify(&StatusUpdate::Fragment(text.to_string()));
    }

    fn notify(&self, update: &StatusUpdate) {
        for (_, observer) in &self.observers {
            observer(update);
        }
    }
}

impl std::fmt::Debug for StatusEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusEmitter")
            .field("status", &self.status)
            .field("observers", &self.observers.len())
            .finish()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────
