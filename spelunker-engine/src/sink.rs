use crate::error::ExploreError;
use crate::node::Node;
use crate::result::ExploreStats;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Receiver of discovered nodes.
///
/// `on_node_discovered` is called once per unique node, from whichever worker
/// thread fetched it, so implementations must tolerate concurrent calls.
/// Exactly one of `on_complete` or `on_error` ends a run.
pub trait DiscoverySink: Send + Sync {
    fn on_node_discovered(&self, node: &Node);

    fn on_complete(&self, _stats: &ExploreStats) {}

    fn on_error(&self, _reason: &ExploreError) {}
}

impl<F> DiscoverySink for F
where
    F: Fn(&Node) + Send + Sync,
{
    fn on_node_discovered(&self, node: &Node) {
        self(node)
    }
}

/// Collects nodes in arrival order. Clones share the same storage.
#[derive(Clone, Default)]
pub struct CollectingSink {
    inner: Arc<Mutex<Collected>>,
}

#[derive(Default)]
struct Collected {
    nodes: Vec<Node>,
    completions: usize,
    errors: Vec<String>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn nodes(&self) -> Vec<Node> {
        self.lock().nodes.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().nodes.is_empty()
    }

    /// Number of times `on_complete` fired.
    pub fn completions(&self) -> usize {
        self.lock().completions
    }

    pub fn errors(&self) -> Vec<String> {
        self.lock().errors.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Collected> {
        // A panicking sink user must not hide what was collected so far
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DiscoverySink for CollectingSink {
    fn on_node_discovered(&self, node: &Node) {
        self.lock().nodes.push(node.clone());
    }

    fn on_complete(&self, _stats: &ExploreStats) {
        self.lock().completions += 1;
    }

    fn on_error(&self, reason: &ExploreError) {
        self.lock().errors.push(reason.to_string());
    }
}

#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    Node(Node),
    Complete(ExploreStats),
    Error(String),
}

/// Funnels discovery events into a single-consumer queue.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<DiscoveryEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<DiscoveryEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl DiscoverySink for ChannelSink {
    fn on_node_discovered(&self, node: &Node) {
        // Receiver gone means nobody is listening any more; nothing to do
        let _ = self.tx.send(DiscoveryEvent::Node(node.clone()));
    }

    fn on_complete(&self, stats: &ExploreStats) {
        let _ = self.tx.send(DiscoveryEvent::Complete(stats.clone()));
    }

    fn on_error(&self, reason: &ExploreError) {
        let _ = self.tx.send(DiscoveryEvent::Error(reason.to_string()));
    }
}
