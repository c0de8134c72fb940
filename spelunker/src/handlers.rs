use clap::ArgMatches;
use colored::Colorize;
use spelunker_core::explore::{ExploreOptions, NodeCallback, execute_exploration};
use spelunker_core::report::{ReportData, ReportFormat, generate_report, save_report};
use spelunker_engine::{AbortHandle, GraphRequest, HttpTransport, Node, TransportConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use url::Url;

// Helper functions for explore handler

/// Parse a single line as a labyrinth name, skipping blanks and `#` comments
pub fn parse_graph_name(line: &str) -> Option<String> {
    let name = line.trim();
    if name.is_empty() || name.starts_with('#') {
        return None;
    }
    Some(name.to_string())
}

/// Load names from either a file or the positional arguments
pub fn load_names_from_source(
    names: Vec<String>,
    names_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(names_file_path) = names_file {
        load_names_from_file(names_file_path)
    } else if !names.is_empty() {
        Ok(names.iter().filter_map(|n| parse_graph_name(n)).collect())
    } else {
        Err("Either a labyrinth name or --names-file must be provided".to_string())
    }
}

/// Load and parse labyrinth names from a file
pub fn load_names_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read names file {}: {}", path.display(), e))?;

    let names: Vec<String> = content.lines().filter_map(parse_graph_name).collect();

    if names.is_empty() {
        return Err(format!("No labyrinth names found in {}", path.display()));
    }

    Ok(names)
}

/// Expand `~` in a user supplied output path
pub fn resolve_output_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

/// Where the report for `name` goes when several labyrinths share one `--output`
pub fn output_path_for(base: &Path, name: &str, total: usize) -> PathBuf {
    if total <= 1 {
        return base.to_path_buf();
    }
    let stem = base
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "report".to_string());
    let file_name = match base.extension() {
        Some(ext) => format!("{}-{}.{}", stem, name, ext.to_string_lossy()),
        None => format!("{}-{}", stem, name),
    };
    base.with_file_name(file_name)
}

/// One room as an event-stream frame
pub fn format_stream_event(node: &Node) -> String {
    let json = serde_json::to_string(node).unwrap_or_else(|_| "{}".to_string());
    format!("data: {}\n\n", json)
}

pub fn format_done_event() -> String {
    "event: done\ndata: plz close connection\n\n".to_string()
}

pub async fn handle_explore(sub_matches: &ArgMatches, quiet: bool) {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let names: Vec<String> = sub_matches
        .get_many::<String>("NAME")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let names_file = sub_matches.get_one::<PathBuf>("names-file");
    let base_url = sub_matches
        .get_one::<Url>("base-url")
        .map(|u| u.as_str().to_string())
        .unwrap_or_default();
    let timeout_secs = sub_matches.get_one::<u64>("timeout").copied();
    let output = sub_matches.get_one::<String>("output");
    let stream = sub_matches.get_flag("stream");
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);

    let names = match load_names_from_source(names, names_file) {
        Ok(names) => names,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    if !quiet && !stream {
        println!("Exploring {} labyrinth(s) at {}", names.len(), base_url.bright_white());
        println!("Press Ctrl-C to stop branching and finish early\n");
    }

    // Ctrl-C stops new branches; rooms already requested still arrive
    let abort = AbortHandle::new();
    let abort_clone = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\n{} Aborting, waiting for open requests...", "→".yellow().bold());
            abort_clone.abort();
        }
    });

    let node_callback: Option<NodeCallback> = if stream {
        Some(Arc::new(|node: &Node| print!("{}", format_stream_event(node))))
    } else {
        None
    };

    let options = ExploreOptions {
        base_url,
        names,
        timeout_secs,
        show_progress_bars: !stream && !quiet,
    };
    let progress_callback = Arc::new(|msg: String| {
        eprintln!("{}", msg);
    });

    let outcomes =
        match execute_exploration(options, abort, Some(progress_callback), node_callback).await {
            Ok(outcomes) => outcomes,
            Err(e) => {
                if stream {
                    print!("event: error\ndata: {}\n\n", e);
                }
                eprintln!("{} Exploration failed: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        };

    if stream {
        print!("{}", format_done_event());
    }

    let total = outcomes.len();
    for outcome in &outcomes {
        let data = ReportData::new(outcome);
        let report = match generate_report(&data, format) {
            Ok(report) => report,
            Err(e) => {
                eprintln!("{} Failed to render report: {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        };

        match output {
            Some(raw) => {
                let path = output_path_for(&resolve_output_path(raw), &outcome.name, total);
                debug!("Writing report for {} to {}", outcome.name, path.display());
                if let Err(e) = save_report(&report, &path) {
                    eprintln!(
                        "{} Failed to write {}: {}",
                        "✗".red().bold(),
                        path.display(),
                        e
                    );
                    std::process::exit(1);
                }
                if !quiet {
                    println!(
                        "{} Report for {} saved to {}",
                        "✓".green().bold(),
                        outcome.name,
                        path.display().to_string().bright_white()
                    );
                }
            }
            None if !stream => print!("{}", report),
            None => {}
        }
    }
}

pub async fn handle_create(args: &ArgMatches) {
    let Some(name) = args.get_one::<String>("name") else {
        unreachable!("clap requires --name");
    };
    let Some(message) = args.get_one::<String>("message") else {
        unreachable!("clap requires --message");
    };
    let shape = args
        .get_one::<String>("shape")
        .cloned()
        .unwrap_or_else(|| "hex".to_string());
    let seed = args.get_one::<u64>("seed").copied().unwrap_or(123);
    let base_url = args
        .get_one::<Url>("base-url")
        .map(|u| u.as_str().to_string())
        .unwrap_or_default();

    let transport = match HttpTransport::new(TransportConfig::new(base_url)) {
        Ok(transport) => transport,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let request = GraphRequest::new(name.as_str(), message.as_str())
        .with_shape(shape)
        .with_seed(seed);
    match transport.create_graph(&request).await {
        Ok(()) => {
            println!("{} Labyrinth {} created", "✓".green().bold(), name.bright_white());
            println!(
                "{} Explore it with: spelunker explore {}",
                "→".blue(),
                name
            );
        }
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    }
}
