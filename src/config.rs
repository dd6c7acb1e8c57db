//! Run configuration
//!
//! One immutable [`RunConfig`] per run, assembled by the CLI from flags and
//! environment, then handed to the pipeline. Nothing mutates it afterwards.

use crate::annotate::SchedulerConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Suffix appended to annotated file stems (`Foo.java` -> `Foo_commented.java`).
pub const DEFAULT_FILE_SUFFIX: &str = "_commented";

/// Name of the graph export written under the output directory.
pub const GRAPH_EXPORT_FILE: &str = "dependency_graph.json";

/// File name patterns skipped during discovery, matched against the file
/// name only.
pub const SKIP_FILE_PATTERNS: &[&str] = &[
    "*Test.java",
    "*Tests.java",
    "package-info.java",
    "*Generated*.java",
];

/// Directory names never descended into.
pub const SKIP_DIRS: &[&str] = &["target", "build", "out", ".git", ".idea"];

#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Repository root to read from
    pub input_root: PathBuf,
    /// Directory the annotated copies and graph export are written under
    pub output_root: PathBuf,
    /// Suffix appended to annotated file stems
    pub file_suffix: String,
    /// Model name passed through to the completion service
    pub model: String,
    pub api_url: String,
    pub api_key: String,
    /// Maximum concurrent service calls
    pub concurrency: usize,
    pub requests_per_second: f64,
    pub max_retries: u32,
    pub request_timeout: Duration,
    /// Consecutive fatal service errors before the run is cancelled
    pub fatal_error_limit: u32,
    /// Members with bodies below this byte count get inline comments
    pub min_member_size: usize,
    /// Longest elementary cycle reported
    pub max_cycle_length: usize,
    /// Skip targets that already carry a Javadoc block
    pub skip_documented: bool,
    /// Generate comments and write annotated copies
    pub annotate: bool,
    /// Build and export the dependency graph
    pub export_graph: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        let scheduler = SchedulerConfig::default();
        Self {
            input_root: PathBuf::from("."),
            output_root: PathBuf::from("annotated"),
            file_suffix: DEFAULT_FILE_SUFFIX.to_string(),
            model: crate::annotate::DEFAULT_MODEL.to_string(),
            api_url: crate::annotate::DEFAULT_API_URL.to_string(),
            api_key: String::new(),
            concurrency: scheduler.concurrency,
            requests_per_second: scheduler.requests_per_second,
            max_retries: scheduler.max_retries,
            request_timeout: scheduler.request_timeout,
            fatal_error_limit: scheduler.fatal_error_limit,
            min_member_size: 80,
            max_cycle_length: 8,
            skip_documented: true,
            annotate: true,
            export_graph: true,
        }
    }
}

impl RunConfig {
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            concurrency: self.concurrency,
            requests_per_second: self.requests_per_second,
            max_retries: self.max_retries,
            request_timeout: self.request_timeout,
            fatal_error_limit: self.fatal_error_limit,
            ..SchedulerConfig::default()
        }
    }
}

/// Match a file name against one skip pattern. Only `*` wildcards, which is
/// all the patterns need.
pub fn matches_pattern(name: &str, pattern: &str) -> bool {
    fn inner(name: &[u8], pattern: &[u8]) -> bool {
        match pattern.first() {
            None => name.is_empty(),
            Some(b'*') => {
                (0..=name.len()).any(|i| inner(&name[i..], &pattern[1..]))
            }
            Some(&c) => name.first() == Some(&c) && inner(&name[1..], &pattern[1..]),
        }
    }
    inner(name.as_bytes(), pattern.as_bytes())
}

/// Whether discovery should skip this file name.
pub fn is_skipped_file(name: &str) -> bool {
    SKIP_FILE_PATTERNS.iter().any(|p| matches_pattern(name, p))
}
