//! End-to-end run orchestration
//!
//! Discover Java files, parse them into the structural model, build and
//! export the dependency graph, then run the annotation pipeline and write
//! annotated copies. Originals are never modified; all output lands under
//! the configured output directory.

use crate::annotate::{
    merge_file, partition_unit, AnnotationResult, AnnotationScheduler, AnnotationTask,
    CompletionService, TaskStatus,
};
use crate::config::{RunConfig, GRAPH_EXPORT_FILE, SKIP_DIRS};
use crate::graph::{find_cycles, DependencyGraph, GraphExport};
use crate::models::{output_path, CompilationUnit, SourceFile};
use crate::parser::{parse_file, ParseError};
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// What one run did, for the final report.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub files_discovered: usize,
    pub files_parsed: usize,
    pub parse_errors: Vec<ParseError>,
    pub types_found: usize,
    pub edges_found: usize,
    pub cycles: Vec<Vec<String>>,
    pub tasks_submitted: usize,
    pub tasks_skipped: usize,
    pub tasks_succeeded: usize,
    pub tasks_failed: usize,
    pub tasks_cancelled: usize,
    pub total_retries: u32,
    pub files_written: usize,
    pub graph_export: Option<PathBuf>,
    pub elapsed_secs: f64,
}

/// Execute a full run.
///
/// The completion service is injected so the CLI can wire the real client
/// and tests can substitute mocks. Cancelling `cancel` stops annotation
/// work promptly; discovery, parsing, and graph export still complete.
pub async fn run(
    config: &RunConfig,
    service: Arc<dyn CompletionService>,
    cancel: CancellationToken,
) -> Result<RunSummary> {
    let started = Instant::now();
    let mut summary = RunSummary::default();

    let files = discover_files(&config.input_root)?;
    summary.files_discovered = files.len();
    info!(count = files.len(), root = %config.input_root.display(), "discovered Java files");

    let (sources, units) = parse_all(config, &files, &mut summary);
    summary.files_parsed = units.len();
    summary.types_found = units.iter().map(|u| u.all_types().len()).sum();

    std::fs::create_dir_all(&config.output_root).with_context(|| {
        format!("creating output directory {}", config.output_root.display())
    })?;

    let graph = DependencyGraph::build(&units);
    summary.edges_found = graph.edge_count();
    summary.cycles = find_cycles(&graph, config.max_cycle_length);
    for cycle in &summary.cycles {
        warn!("dependency cycle: {}", cycle.join(" -> "));
    }

    if config.export_graph {
        let export = GraphExport::from_graph(&graph, summary.cycles.clone());
        let path = config.output_root.join(GRAPH_EXPORT_FILE);
        std::fs::write(&path, export.to_json()?)
            .with_context(|| format!("writing graph export to {}", path.display()))?;
        summary.graph_export = Some(path);
    }

    if config.annotate {
        annotate_all(config, service, cancel, &sources, &units, &mut summary).await?;
    }

    summary.elapsed_secs = started.elapsed().as_secs_f64();
    Ok(summary)
}

/// Walk the input tree for Java files, honoring gitignore rules, skipping
/// build output directories and test/generated files. Sorted so runs are
/// deterministic.
pub fn discover_files(root: &Path) -> Result<Vec<PathBuf>> {
    let walker = WalkBuilder::new(root)
        .hidden(true)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(true)
        .filter_entry(|entry| {
            let name = entry.file_name().to_string_lossy();
            !(entry.path().is_dir() && SKIP_DIRS.contains(&name.as_ref()))
        })
        .build();

    let mut files = Vec::new();
    for entry in walker.filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("java") {
            continue;
        }
        let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
        if crate::config::is_skipped_file(name) {
            continue;
        }
        let relative = path.strip_prefix(root).unwrap_or(path);
        files.push(relative.to_path_buf());
    }
    files.sort();
    Ok(files)
}

fn parse_all(
    config: &RunConfig,
    files: &[PathBuf],
    summary: &mut RunSummary,
) -> (Vec<SourceFile>, Vec<CompilationUnit>) {
    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(bar_style());
    bar.set_message("parsing");

    let mut sources = Vec::new();
    let mut units = Vec::new();
    for relative in files {
        match parse_file(&config.input_root, relative) {
            Ok((source, unit)) => {
                sources.push(source);
                units.push(unit);
            }
            Err(err) => {
                warn!("{err}");
                summary.parse_errors.push(err);
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    (sources, units)
}

async fn annotate_all(
    config: &RunConfig,
    service: Arc<dyn CompletionService>,
    cancel: CancellationToken,
    sources: &[SourceFile],
    units: &[CompilationUnit],
    summary: &mut RunSummary,
) -> Result<()> {
    // Partition every unit, then drop already-documented targets if asked
    let mut per_file: HashMap<&Path, Vec<AnnotationTask>> = HashMap::new();
    let mut scheduled = Vec::new();
    for (source, unit) in sources.iter().zip(units) {
        let tasks = partition_unit(source, unit, config.min_member_size);
        for task in tasks {
            if config.skip_documented && task.documented {
                summary.tasks_skipped += 1;
                continue;
            }
            scheduled.push(task.clone());
            per_file.entry(unit.path.as_path()).or_default().push(task);
        }
    }
    summary.tasks_submitted = scheduled.len();
    info!(
        tasks = scheduled.len(),
        skipped = summary.tasks_skipped,
        "annotation tasks partitioned"
    );

    let scheduler = AnnotationScheduler::new(service, config.scheduler_config());
    let scheduler_token = scheduler.cancellation_token();
    let forward = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            cancel.cancelled().await;
            scheduler_token.cancel();
        }
    });

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(spinner_style());
    spinner.set_message(format!("annotating ({} tasks)", scheduled.len()));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    let results = scheduler.run(scheduled, &config.model).await;
    spinner.finish_and_clear();
    forward.abort();

    let mut by_file: HashMap<&Path, Vec<&AnnotationResult>> = HashMap::new();
    for result in &results {
        match &result.status {
            TaskStatus::Succeeded => summary.tasks_succeeded += 1,
            TaskStatus::Failed(err) => {
                warn!(file = %result.task_id.file.display(), "annotation failed: {err}");
                summary.tasks_failed += 1;
            }
            TaskStatus::Cancelled => summary.tasks_cancelled += 1,
        }
        summary.total_retries += result.retries;
        by_file
            .entry(result.task_id.file.as_path())
            .or_default()
            .push(result);
    }

    for (source, unit) in sources.iter().zip(units) {
        let tasks = match per_file.get(unit.path.as_path()) {
            Some(tasks) => tasks.as_slice(),
            None => &[],
        };
        let owned: Vec<AnnotationResult> = by_file
            .get(unit.path.as_path())
            .map(|rs| rs.iter().map(|r| (*r).clone()).collect())
            .unwrap_or_default();

        let merged = merge_file(source, tasks, &owned);
        let out = output_path(&config.output_root, &unit.path, &config.file_suffix);
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        std::fs::write(&out, merged)
            .with_context(|| format!("writing {}", out.display()))?;
        summary.files_written += 1;
    }

    // Files that failed to parse are still copied through unmodified so the
    // output tree stays complete.
    for err in &summary.parse_errors {
        let input = config.input_root.join(&err.path);
        let out = output_path(&config.output_root, &err.path, &config.file_suffix);
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        if std::fs::copy(&input, &out).is_ok() {
            summary.files_written += 1;
        }
    }

    Ok(())
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
        .template("{spinner:.green} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓▒░  ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discovery_skips_build_and_test_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::create_dir_all(root.join("src/com/x")).unwrap();
        std::fs::create_dir_all(root.join("target/classes")).unwrap();
        std::fs::write(root.join("src/com/x/Foo.java"), "class Foo {}").unwrap();
        std::fs::write(root.join("src/com/x/FooTest.java"), "class FooTest {}").unwrap();
        std::fs::write(root.join("src/com/x/package-info.java"), "").unwrap();
        std::fs::write(root.join("target/classes/Gen.java"), "class Gen {}").unwrap();
        std::fs::write(root.join("README.md"), "docs").unwrap();

        let files = discover_files(root).expect("walk");
        assert_eq!(files, vec![PathBuf::from("src/com/x/Foo.java")]);
    }

    #[test]
    fn test_discovery_is_sorted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path();
        std::fs::write(root.join("B.java"), "class B {}").unwrap();
        std::fs::write(root.join("A.java"), "class A {}").unwrap();
        std::fs::write(root.join("C.java"), "class C {}").unwrap();

        let files = discover_files(root).expect("walk");
        assert_eq!(
            files,
            vec![
                PathBuf::from("A.java"),
                PathBuf::from("B.java"),
                PathBuf::from("C.java")
            ]
        );
    }
}
