// Report generation from exploration outcomes

use crate::explore::ExplorationOutcome;
use crate::map::{Bounds, DanglingEdge, GraphMap};
use serde::Serialize;
use spelunker_engine::{BranchFailure, Node};
use std::fs::File;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReportFormat {
    Text,
    Json,
    Csv,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "csv" => Some(ReportFormat::Csv),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MapSummary {
    pub rooms: usize,
    pub passages: usize,
    pub dangling: Vec<DanglingEdge>,
    pub bounds: Option<Bounds>,
    pub colors: Vec<(String, usize)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub name: String,
    pub requests: usize,
    pub skipped: usize,
    pub aborted: bool,
    pub complete: bool,
    pub elapsed_ms: u64,
    pub failures: Vec<BranchFailure>,
    pub map: MapSummary,
    pub nodes: Vec<Node>,
}

impl ReportData {
    pub fn new(outcome: &ExplorationOutcome) -> Self {
        let map = GraphMap::from_nodes(outcome.nodes.iter().cloned());
        Self {
            name: outcome.name.clone(),
            requests: outcome.stats.requests,
            skipped: outcome.stats.skipped,
            aborted: outcome.stats.aborted,
            complete: outcome.stats.is_complete(),
            elapsed_ms: outcome.stats.elapsed.as_millis() as u64,
            failures: outcome.stats.failures.clone(),
            map: MapSummary {
                rooms: map.node_count(),
                passages: map.edge_count(),
                dangling: map.dangling_edges().to_vec(),
                bounds: map.bounds(),
                colors: map.colors(),
            },
            nodes: outcome.nodes.clone(),
        }
    }

    fn status(&self) -> &str {
        if self.aborted {
            "Aborted"
        } else if self.complete {
            "Completed"
        } else {
            "Completed with failures"
        }
    }
}

pub fn generate_report(data: &ReportData, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Json => generate_json_report(data),
        ReportFormat::Csv => Ok(generate_csv_report(data)),
        ReportFormat::Markdown => Ok(generate_markdown_report(data)),
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let rule = "━".repeat(60);
    let mut report = String::new();

    report.push_str(&format!("{}\n", rule));
    report.push_str(&format!("  LABYRINTH: {}\n", data.name));
    report.push_str(&format!("{}\n\n", rule));

    report.push_str(&format!("Status:       {}\n", data.status()));
    report.push_str(&format!("Rooms:        {}\n", data.map.rooms));
    report.push_str(&format!("Passages:     {}\n", data.map.passages));
    report.push_str(&format!("Requests:     {}\n", data.requests));
    report.push_str(&format!("Duration:     {} ms\n", data.elapsed_ms));
    if let Some(b) = data.map.bounds {
        report.push_str(&format!(
            "Extent:       ({}, {}) to ({}, {})\n",
            b.min_x, b.min_y, b.max_x, b.max_y
        ));
    }
    report.push('\n');

    if !data.map.colors.is_empty() {
        report.push_str("# Colors:\n");
        for (color, count) in &data.map.colors {
            report.push_str(&format!("  {}  {}\n", color, count));
        }
        report.push('\n');
    }

    if !data.failures.is_empty() {
        report.push_str("# Failed branches:\n");
        for failure in &data.failures {
            report.push_str(&format!(
                "  \x1b[31m{}\x1b[0m {}  {}\n",
                failure.status, failure.xid, failure.message
            ));
        }
        report.push('\n');
    }

    if !data.map.dangling.is_empty() {
        report.push_str("# Unexplored passages:\n");
        for edge in &data.map.dangling {
            report.push_str(&format!("  {} -> {}\n", edge.from, edge.to));
        }
        report.push('\n');
    }

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Spelunker",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "labyrinth": data.name,
            "status": data.status(),
            "summary": {
                "rooms": data.map.rooms,
                "passages": data.map.passages,
                "requests": data.requests,
                "skipped": data.skipped,
                "duration_ms": data.elapsed_ms,
                "bounds": data.map.bounds,
                "colors": data.map.colors
            },
            "failures": data.failures,
            "dangling": data.map.dangling,
            "rooms": data.nodes
        }
    });

    serde_json::to_string_pretty(&json_report)
}

/// One row per room in discovery order.
pub fn generate_csv_report(data: &ReportData) -> String {
    let mut report = String::from("xid,color,x,y,neighbors\n");
    for node in &data.nodes {
        report.push_str(&format!(
            "{},{},{},{},{}\n",
            csv_field(&node.id),
            csv_field(&node.color),
            node.position.x,
            node.position.y,
            csv_field(&node.neighbors.join(";"))
        ));
    }
    report
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let mut report = String::new();
    report.push_str(&format!("# Labyrinth `{}`\n\n", data.name));
    report.push_str("| | |\n|---|---|\n");
    report.push_str(&format!("| Status | {} |\n", data.status()));
    report.push_str(&format!("| Rooms | {} |\n", data.map.rooms));
    report.push_str(&format!("| Passages | {} |\n", data.map.passages));
    report.push_str(&format!("| Requests | {} |\n", data.requests));
    report.push_str(&format!("| Duration | {} ms |\n\n", data.elapsed_ms));

    if !data.failures.is_empty() {
        report.push_str("## Failed branches\n\n");
        for failure in &data.failures {
            report.push_str(&format!(
                "- `{}`: {} {}\n",
                failure.xid, failure.status, failure.message
            ));
        }
        report.push('\n');
    }

    report.push_str("## Rooms\n\n| xid | color | position | neighbors |\n|---|---|---|---|\n");
    for node in &data.nodes {
        report.push_str(&format!(
            "| `{}` | {} | ({}, {}) | {} |\n",
            node.id,
            node.color,
            node.position.x,
            node.position.y,
            node.neighbors.len()
        ));
    }
    report
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
