use crate::error::{ExploreError, Failure, Result};
use crate::node::{Node, NodeId};
use crate::result::{BranchFailure, ExploreStats};
use crate::sink::DiscoverySink;
use crate::token::SessionToken;
use crate::transport::{Fetched, Transport};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Called with the running total of discovered nodes and the id just found.
pub type ProgressCallback = Arc<dyn Fn(usize, &str) + Send + Sync>;
pub type FailureCallback = Arc<dyn Fn(&BranchFailure) + Send + Sync>;

/// Cooperative cancellation flag shared by every task of a run.
///
/// Aborting only stops new branches from being spawned. Requests already in
/// flight finish and their nodes are still emitted.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle {
    flag: Arc<AtomicBool>,
}

impl AbortHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// A run started with [`Crawler::explore`].
pub struct Exploration {
    abort: AbortHandle,
    handle: JoinHandle<Result<ExploreStats>>,
}

impl Exploration {
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn abort(&self) {
        self.abort.abort();
    }

    /// Waits for every spawned branch to settle.
    pub async fn finish(self) -> Result<ExploreStats> {
        self.handle.await?
    }
}

pub struct Crawler<T: Transport> {
    transport: Arc<T>,
    progress_callback: Option<ProgressCallback>,
    failure_callback: Option<FailureCallback>,
}

impl<T: Transport> Crawler<T> {
    pub fn new(transport: T) -> Self {
        Self::from_shared(Arc::new(transport))
    }

    pub fn from_shared(transport: Arc<T>) -> Self {
        Self {
            transport,
            progress_callback: None,
            failure_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_failure_callback(mut self, callback: FailureCallback) -> Self {
        self.failure_callback = Some(callback);
        self
    }

    /// Starts exploring `name` in the background.
    ///
    /// Must be called from within a tokio runtime.
    pub fn explore<S>(&self, name: &str, sink: S) -> Exploration
    where
        S: DiscoverySink + 'static,
    {
        let abort = AbortHandle::new();
        let (run, completed) = self.prepare(name, Arc::new(sink), abort.clone());
        let handle = tokio::spawn(run.execute(completed));
        Exploration { abort, handle }
    }

    /// Explores `name` to completion using an abort handle the caller already holds.
    pub async fn explore_with<S>(&self, name: &str, sink: S, abort: AbortHandle) -> Result<ExploreStats>
    where
        S: DiscoverySink + 'static,
    {
        let (run, completed) = self.prepare(name, Arc::new(sink), abort);
        run.execute(completed).await
    }

    fn prepare(
        &self,
        name: &str,
        sink: Arc<dyn DiscoverySink>,
        abort: AbortHandle,
    ) -> (Arc<Run<T>>, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        let run = Run {
            name: name.to_string(),
            transport: self.transport.clone(),
            sink,
            abort,
            progress_callback: self.progress_callback.clone(),
            failure_callback: self.failure_callback.clone(),
            discovered: Mutex::new(HashSet::new()),
            // The entrance holds one slot until its fan-out is done
            outstanding: AtomicUsize::new(1),
            completion: Mutex::new(Some(tx)),
            tally: Mutex::new(Tally::default()),
        };
        (Arc::new(run), rx)
    }
}

#[derive(Default)]
struct Tally {
    discovered: usize,
    requests: usize,
    skipped: usize,
    failures: Vec<BranchFailure>,
}

/// State of one exploration run, shared by all of its tasks.
struct Run<T: Transport> {
    name: String,
    transport: Arc<T>,
    sink: Arc<dyn DiscoverySink>,
    abort: AbortHandle,
    progress_callback: Option<ProgressCallback>,
    failure_callback: Option<FailureCallback>,
    discovered: Mutex<HashSet<NodeId>>,
    outstanding: AtomicUsize,
    completion: Mutex<Option<oneshot::Sender<()>>>,
    tally: Mutex<Tally>,
}

/// Settles a branch when dropped, even if the branch panicked.
struct Settle<T: Transport>(Arc<Run<T>>);

impl<T: Transport> Drop for Settle<T> {
    fn drop(&mut self) {
        self.0.settle();
    }
}

impl<T: Transport> Run<T> {
    async fn execute(self: Arc<Self>, completed: oneshot::Receiver<()>) -> Result<ExploreStats> {
        let started = Instant::now();
        info!("Starting exploration of {}", self.name);

        let entrance = match self.transport.fetch_entrance(&self.name).await {
            Ok(fetched) => fetched,
            Err(failure) => {
                let err = ExploreError::from(failure);
                warn!("Exploration of {} failed: {}", self.name, err);
                self.sink.on_error(&err);
                return Err(err);
            }
        };

        let Fetched { node, token } = entrance;
        self.claim(&node.id);
        self.emit(&node);
        self.fork_children(&node, &token);
        self.settle();

        // The sender lives in `self`, so this only resolves through `settle`
        let _ = completed.await;

        let stats = self.stats(started);
        info!(
            "Exploration of {} complete. Discovered {} rooms with {} requests ({} failed)",
            self.name,
            stats.discovered,
            stats.requests,
            stats.failures.len()
        );
        self.sink.on_complete(&stats);
        Ok(stats)
    }

    /// Spawns one branch per neighbor, each holding its own copy of `token`.
    fn fork_children(self: &Arc<Self>, node: &Node, token: &SessionToken) {
        if self.abort.is_aborted() {
            debug!("Aborted, not forking from {}", node.id);
            return;
        }
        for xid in &node.neighbors {
            self.spawn_branch(xid.clone(), token.fork());
        }
    }

    fn spawn_branch(self: &Arc<Self>, xid: NodeId, token: SessionToken) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
        let guard = Settle(Arc::clone(self));
        tokio::spawn(async move {
            let run = Arc::clone(&guard.0);
            run.explore_branch(xid, token).await;
            drop(guard);
        });
    }

    async fn explore_branch(self: &Arc<Self>, xid: NodeId, token: SessionToken) {
        if !self.claim(&xid) {
            debug!("{} already discovered, skipping", xid);
            self.tally().skipped += 1;
            return;
        }

        self.tally().requests += 1;
        let fetched = match self.transport.fetch_node(&self.name, &xid, &token).await {
            Ok(fetched) => fetched,
            Err(failure) => {
                self.record_failure(xid, &failure);
                return;
            }
        };

        let Fetched { node, token } = fetched;
        if node.id != xid && !self.claim(&node.id) {
            debug!("{} answered as already discovered {}", xid, node.id);
            return;
        }
        self.emit(&node);
        self.fork_children(&node, &token);
    }

    /// Inserts `xid` into the discovered-set; false if it was already there.
    fn claim(&self, xid: &str) -> bool {
        let mut discovered = self
            .discovered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if discovered.contains(xid) {
            false
        } else {
            discovered.insert(xid.to_string())
        }
    }

    fn emit(&self, node: &Node) {
        let total = {
            let mut tally = self.tally();
            tally.discovered += 1;
            tally.discovered
        };
        debug!("Discovered {} ({} so far)", node.id, total);
        self.sink.on_node_discovered(node);
        if let Some(ref callback) = self.progress_callback {
            callback(total, &node.id);
        }
    }

    fn record_failure(&self, xid: NodeId, failure: &Failure) {
        warn!("Error fetching {} in {}: {}", xid, self.name, failure);
        let branch_failure = BranchFailure::new(xid, failure);
        if let Some(ref callback) = self.failure_callback {
            callback(&branch_failure);
        }
        self.tally().failures.push(branch_failure);
    }

    /// Marks one branch as done; the last one signals completion.
    fn settle(&self) {
        if self.outstanding.fetch_sub(1, Ordering::AcqRel) == 1 {
            let sender = self
                .completion
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .take();
            if let Some(sender) = sender {
                let _ = sender.send(());
            }
        }
    }

    fn tally(&self) -> MutexGuard<'_, Tally> {
        self.tally.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn stats(&self, started: Instant) -> ExploreStats {
        let tally = self.tally();
        let mut stats = ExploreStats::new(self.name.clone());
        stats.discovered = tally.discovered;
        stats.requests = tally.requests;
        stats.skipped = tally.skipped;
        stats.failures = tally.failures.clone();
        stats.aborted = self.abort.is_aborted();
        stats.elapsed = started.elapsed();
        stats
    }
}
