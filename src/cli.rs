//! CLI definition and run handler

use crate::annotate::{CompletionService, OpenAiService};
use crate::config::RunConfig;
use crate::report::OutputFormat;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Parse and validate the concurrency cap (1-64)
fn parse_concurrency(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("concurrency must be at least 1".to_string())
    } else if n > 64 {
        Err("concurrency cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

/// Comprehender - AI-assisted Java codebase annotation
///
/// Parses a Java source tree, maps its class dependency graph, and writes
/// annotated copies of each file with generated documentation comments.
/// Originals are never modified.
#[derive(Parser, Debug)]
#[command(name = "comprehender")]
#[command(
    version,
    about = "Annotate a Java codebase with AI-generated comments and map its dependency graph",
    after_help = "\
Examples:
  comprehender ./my-project                      Annotate into ./my-project/annotated
  comprehender . -o docs/annotated               Choose the output directory
  comprehender . --graph-only                    Dependency graph only, no API calls
  comprehender . --concurrency 8 --rps 10        Tune throughput
  comprehender . --format json                   Machine-readable run summary

The API key is read from OPENAI_API_KEY."
)]
pub struct Cli {
    /// Path to the Java repository (default: current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Output directory for annotated copies and the graph export
    #[arg(long, short = 'o', default_value = "annotated")]
    pub output: PathBuf,

    /// Model name sent to the completion service
    #[arg(long, default_value = crate::annotate::DEFAULT_MODEL)]
    pub model: String,

    /// Chat-completions endpoint URL
    #[arg(long, default_value = crate::annotate::DEFAULT_API_URL)]
    pub api_url: String,

    /// API key (prefer the environment variable)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true, default_value = "")]
    pub api_key: String,

    /// Maximum concurrent service calls (1-64)
    #[arg(long, value_parser = parse_concurrency)]
    pub concurrency: Option<usize>,

    /// Requests per second across all workers
    #[arg(long = "rps", default_value = "5.0")]
    pub requests_per_second: f64,

    /// Retries per task on transient service errors
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "60")]
    pub request_timeout: u64,

    /// Consecutive fatal service errors before the run is cancelled
    #[arg(long, default_value = "3")]
    pub fatal_error_limit: u32,

    /// Members with bodies smaller than this get inline comments
    #[arg(long, default_value = "80")]
    pub min_member_size: usize,

    /// Longest dependency cycle to report
    #[arg(long, default_value = "8")]
    pub max_cycle_length: usize,

    /// Suffix appended to annotated file names
    #[arg(long, default_value = crate::config::DEFAULT_FILE_SUFFIX)]
    pub suffix: String,

    /// Build the dependency graph but skip comment generation
    #[arg(long)]
    pub graph_only: bool,

    /// Generate comments but skip the graph export
    #[arg(long, conflicts_with = "graph_only")]
    pub comments_only: bool,

    /// Also annotate targets that already have Javadoc
    #[arg(long)]
    pub include_documented: bool,

    /// Run summary format: text, json
    #[arg(long, short = 'f', default_value = "text")]
    pub format: OutputFormat,
}

impl Cli {
    fn into_config(self) -> Result<RunConfig> {
        if !self.path.is_dir() {
            bail!("{} is not a directory", self.path.display());
        }
        if self.requests_per_second <= 0.0 {
            bail!("--rps must be positive");
        }
        if !self.graph_only && self.api_key.is_empty() {
            bail!("no API key: set OPENAI_API_KEY or pass --api-key (or use --graph-only)");
        }

        let defaults = RunConfig::default();
        Ok(RunConfig {
            input_root: self.path,
            output_root: self.output,
            file_suffix: self.suffix,
            model: self.model,
            api_url: self.api_url,
            api_key: self.api_key,
            concurrency: self.concurrency.unwrap_or(defaults.concurrency),
            requests_per_second: self.requests_per_second,
            max_retries: self.max_retries,
            request_timeout: Duration::from_secs(self.request_timeout),
            fatal_error_limit: self.fatal_error_limit,
            min_member_size: self.min_member_size,
            max_cycle_length: self.max_cycle_length,
            skip_documented: !self.include_documented,
            annotate: !self.graph_only,
            export_graph: !self.comments_only,
        })
    }
}

pub fn run(cli: Cli) -> Result<()> {
    let format = cli.format;
    let config = cli.into_config()?;

    let service: Arc<dyn CompletionService> =
        Arc::new(OpenAiService::new(&config.api_url, &config.api_key)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    let summary = runtime.block_on(async {
        let cancel = tokio_util::sync::CancellationToken::new();
        tokio::spawn({
            let cancel = cancel.clone();
            async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupt received, finishing in-flight work");
                    cancel.cancel();
                }
            }
        });
        crate::pipeline::run(&config, service, cancel).await
    })?;

    print!("{}", crate::report::render(&summary, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_bounds() {
        assert!(parse_concurrency("0").is_err());
        assert!(parse_concurrency("65").is_err());
        assert_eq!(parse_concurrency("8"), Ok(8));
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["comprehender", "--graph-only"]);
        assert!(cli.graph_only);
        assert_eq!(cli.requests_per_second, 5.0);
        let config = cli.into_config().unwrap();
        assert!(!config.annotate);
        assert!(config.export_graph);
        assert!(config.skip_documented);
        assert_eq!(config.fatal_error_limit, 3);
    }

    #[test]
    fn test_fatal_error_limit_flag() {
        let cli = Cli::parse_from([
            "comprehender",
            "--graph-only",
            "--fatal-error-limit",
            "5",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.fatal_error_limit, 5);
        assert_eq!(config.scheduler_config().fatal_error_limit, 5);
    }

    #[test]
    fn test_conflicting_modes_rejected() {
        assert!(
            Cli::try_parse_from(["comprehender", "--graph-only", "--comments-only"]).is_err()
        );
    }
}
