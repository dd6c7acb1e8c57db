//! Run summary reporters
//!
//! Two formats: `text` for terminals, `json` for scripting.

use crate::pipeline::RunSummary;
use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" | "terminal" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!("unknown output format: {s} (expected text or json)")),
        }
    }
}

pub fn render(summary: &RunSummary, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => render_text(summary),
        OutputFormat::Json => render_json(summary),
    }
}

fn render_text(summary: &RunSummary) -> Result<String> {
    let mut out = String::new();

    out.push_str(&format!("\n{BOLD}Comprehender Run{RESET}\n"));
    out.push_str(&format!(
        "{DIM}──────────────────────────────────────{RESET}\n"
    ));
    out.push_str(&format!(
        "Files: {} discovered, {} parsed",
        summary.files_discovered, summary.files_parsed
    ));
    if !summary.parse_errors.is_empty() {
        out.push_str(&format!(
            "  {RED}{} failed{RESET}",
            summary.parse_errors.len()
        ));
    }
    out.push('\n');
    out.push_str(&format!(
        "Types: {}  References: {}\n",
        summary.types_found, summary.edges_found
    ));

    if summary.cycles.is_empty() {
        out.push_str("Cycles: none\n");
    } else {
        out.push_str(&format!(
            "{YELLOW}Cycles: {}{RESET}\n",
            summary.cycles.len()
        ));
        for cycle in &summary.cycles {
            out.push_str(&format!("  {DIM}{}{RESET}\n", cycle.join(" -> ")));
        }
    }

    out.push_str(&format!(
        "\n{BOLD}ANNOTATIONS{RESET}\n  {} submitted, {} succeeded, {} failed, {} cancelled, {} skipped\n",
        summary.tasks_submitted,
        summary.tasks_succeeded,
        summary.tasks_failed,
        summary.tasks_cancelled,
        summary.tasks_skipped,
    ));
    if summary.total_retries > 0 {
        out.push_str(&format!("  {} retries performed\n", summary.total_retries));
    }

    for err in &summary.parse_errors {
        out.push_str(&format!("  {RED}{err}{RESET}\n"));
    }

    out.push_str(&format!(
        "\n{} annotated files written",
        summary.files_written
    ));
    if let Some(path) = &summary.graph_export {
        out.push_str(&format!(", graph exported to {}", path.display()));
    }
    out.push_str(&format!(" {DIM}({:.1}s){RESET}\n", summary.elapsed_secs));

    Ok(out)
}

fn render_json(summary: &RunSummary) -> Result<String> {
    #[derive(Serialize)]
    struct JsonSummary<'a> {
        files_discovered: usize,
        files_parsed: usize,
        parse_errors: Vec<String>,
        types_found: usize,
        edges_found: usize,
        cycles: &'a [Vec<String>],
        tasks_submitted: usize,
        tasks_skipped: usize,
        tasks_succeeded: usize,
        tasks_failed: usize,
        tasks_cancelled: usize,
        total_retries: u32,
        files_written: usize,
        graph_export: Option<String>,
        elapsed_secs: f64,
    }

    let json = JsonSummary {
        files_discovered: summary.files_discovered,
        files_parsed: summary.files_parsed,
        parse_errors: summary.parse_errors.iter().map(|e| e.to_string()).collect(),
        types_found: summary.types_found,
        edges_found: summary.edges_found,
        cycles: &summary.cycles,
        tasks_submitted: summary.tasks_submitted,
        tasks_skipped: summary.tasks_skipped,
        tasks_succeeded: summary.tasks_succeeded,
        tasks_failed: summary.tasks_failed,
        tasks_cancelled: summary.tasks_cancelled,
        total_retries: summary.total_retries,
        files_written: summary.files_written,
        graph_export: summary.graph_export.as_ref().map(|p| p.display().to_string()),
        elapsed_secs: summary.elapsed_secs,
    };
    Ok(serde_json::to_string_pretty(&json)?)
}
