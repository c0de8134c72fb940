use indicatif::{ProgressBar, ProgressStyle};
use spelunker_engine::error::ExploreError;
use spelunker_engine::{
    AbortHandle, CollectingSink, Crawler, DiscoverySink, ExploreStats, HttpTransport, Node,
    TransportConfig,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Options for configuring an exploration
pub struct ExploreOptions {
    pub base_url: String,
    pub names: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub show_progress_bars: bool,
}

/// Callback for reporting exploration progress
pub type ExploreProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Callback for receiving each room as it is discovered
pub type NodeCallback = Arc<dyn Fn(&Node) + Send + Sync>;

/// Everything learned about one labyrinth
#[derive(Debug, Clone)]
pub struct ExplorationOutcome {
    pub name: String,
    pub nodes: Vec<Node>,
    pub stats: ExploreStats,
}

/// Collects rooms for the outcome and forwards them to an optional callback.
#[derive(Clone)]
struct OutcomeSink {
    collected: CollectingSink,
    node_callback: Option<NodeCallback>,
}

impl DiscoverySink for OutcomeSink {
    fn on_node_discovered(&self, node: &Node) {
        self.collected.on_node_discovered(node);
        if let Some(ref callback) = self.node_callback {
            callback(node);
        }
    }
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Explore each named labyrinth in turn.
///
/// A labyrinth whose entrance cannot be reached is reported through the
/// progress callback and skipped; the call only fails if every one failed.
/// Triggering `abort` stops branching in the current run and skips the rest.
pub async fn execute_exploration(
    options: ExploreOptions,
    abort: AbortHandle,
    progress_callback: Option<ExploreProgressCallback>,
    node_callback: Option<NodeCallback>,
) -> Result<Vec<ExplorationOutcome>, ExploreError> {
    let ExploreOptions {
        base_url,
        names,
        timeout_secs,
        show_progress_bars,
    } = options;

    let mut config = TransportConfig::new(base_url);
    if let Some(secs) = timeout_secs {
        config = config.with_timeout(secs);
    }
    let transport = Arc::new(HttpTransport::new(config)?);

    let mut outcomes = Vec::new();
    let mut last_error = None;

    for (idx, name) in names.iter().enumerate() {
        if abort.is_aborted() {
            break;
        }
        if let Some(ref callback) = progress_callback
            && names.len() > 1
        {
            callback(format!(
                "Exploring labyrinth {}/{}: {}",
                idx + 1,
                names.len(),
                name
            ));
        }

        let progress_bar = show_progress_bars.then(|| {
            let pb = spinner();
            pb.set_message(format!("Exploring {}...", name));
            Arc::new(pb)
        });

        let mut crawler = Crawler::from_shared(transport.clone());
        if let Some(ref pb) = progress_bar {
            let pb_clone = pb.clone();
            let name_clone = name.clone();
            crawler = crawler.with_progress_callback(Arc::new(move |total: usize, _xid: &str| {
                pb_clone.set_message(format!(
                    "Exploring {}... {} rooms discovered",
                    name_clone, total
                ));
            }));
        }

        let sink = OutcomeSink {
            collected: CollectingSink::new(),
            node_callback: node_callback.clone(),
        };

        match crawler.explore_with(name, sink.clone(), abort.clone()).await {
            Ok(stats) => {
                if let Some(ref pb) = progress_bar {
                    pb.finish_with_message(format!(
                        "Explored {}: {} rooms discovered",
                        name, stats.discovered
                    ));
                }
                outcomes.push(ExplorationOutcome {
                    name: name.clone(),
                    nodes: sink.collected.nodes(),
                    stats,
                });
            }
            Err(e) => {
                warn!("Skipping labyrinth {}: {}", name, e);
                if let Some(ref pb) = progress_bar {
                    pb.finish_and_clear();
                }
                if let Some(ref callback) = progress_callback {
                    callback(format!("[!]  Failed to explore {}: {}", name, e));
                }
                last_error = Some(e);
            }
        }
    }

    info!("Explored {} of {} labyrinth(s)", outcomes.len(), names.len());
    match last_error {
        Some(e) if outcomes.is_empty() => Err(e),
        _ => Ok(outcomes),
    }
}
