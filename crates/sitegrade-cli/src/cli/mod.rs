//! Command definitions and dispatch for the `sitegrade` binary.

pub mod audit_cmd;
pub mod catalogue_cmd;
pub mod output;
pub mod progress;
pub mod settings;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use sitegrade::{CancelPolicy, PsiStrategy};
use std::path::PathBuf;
use std::process::ExitCode;

/// sitegrade: audit a website and grade it.
#[derive(Parser, Debug)]
#[command(
    name = "sitegrade",
    version,
    about = "Crawl a website, score it across seven categories and grade it A+ to D",
    after_help = "\
Examples:
  sitegrade audit example.com                    Audit with defaults
  sitegrade audit example.com --max-pages 10     Smaller crawl
  sitegrade --json audit example.com > out.json  JSON report for scripting
  sitegrade catalogue                            List every metric

Provider credentials are read from PSI_API_KEY, SITEGRADE_AUTHORITY_ENDPOINT
and SITEGRADE_AUTHORITY_KEY."
)]
pub struct Cli {
    /// Print machine-readable JSON to stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress everything except errors
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Show every metric and debug logs
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Config file (default: ~/.sitegrade/config.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum StrategyArg {
    Mobile,
    Desktop,
}

impl From<StrategyArg> for PsiStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Mobile => PsiStrategy::Mobile,
            StrategyArg::Desktop => PsiStrategy::Desktop,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OnCancelArg {
    /// Grade whatever was collected and mark the report partial
    Partial,
    /// Fail with an error
    Error,
}

impl From<OnCancelArg> for CancelPolicy {
    fn from(arg: OnCancelArg) -> Self {
        match arg {
            OnCancelArg::Partial => CancelPolicy::Partial,
            OnCancelArg::Error => CancelPolicy::Error,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Audit a website
    #[command(after_help = "\
Exit status:
  0  graded (and at or above --fail-under, if given)
  1  graded below --fail-under
  2  ungradeable: nothing could be measured")]
    Audit {
        /// Site to audit; a bare host gets https://
        url: String,

        /// Maximum pages to fetch
        #[arg(long)]
        max_pages: Option<usize>,

        /// Maximum link hops from the start page
        #[arg(long)]
        max_depth: Option<u32>,

        /// Wall-clock budget for the whole audit, in milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,

        /// Timeout for each request, in milliseconds
        #[arg(long, value_name = "MS")]
        request_timeout_ms: Option<u64>,

        /// Concurrent page fetches
        #[arg(long)]
        concurrency: Option<usize>,

        /// Competitor site to audit alongside (seed page only); repeatable
        #[arg(long = "competitor", value_name = "URL")]
        competitors: Vec<String>,

        /// PageSpeed Insights strategy
        #[arg(long, value_enum)]
        psi_strategy: Option<StrategyArg>,

        /// Crawl pages that robots.txt disallows
        #[arg(long)]
        ignore_robots: bool,

        /// What to do when cancelled or out of time
        #[arg(long, value_enum)]
        on_cancel: Option<OnCancelArg>,

        /// Also write the JSON report to this file
        #[arg(long, short = 'o', value_name = "FILE")]
        output: Option<PathBuf>,

        /// Exit with status 1 when the overall score is below this
        #[arg(long, value_name = "SCORE")]
        fail_under: Option<f64>,
    },

    /// List the metric catalogue
    Catalogue,

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

pub async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Audit {
            url,
            max_pages,
            max_depth,
            timeout_ms,
            request_timeout_ms,
            concurrency,
            competitors,
            psi_strategy,
            ignore_robots,
            on_cancel,
            output,
            fail_under,
        } => {
            let overrides = settings::FlagOverrides {
                max_pages,
                max_depth,
                timeout_ms,
                request_timeout_ms,
                concurrency,
                competitors,
                psi_strategy: psi_strategy.map(Into::into),
                ignore_robots,
                cancel_policy: on_cancel.map(Into::into),
            };
            audit_cmd::run(audit_cmd::AuditArgs {
                url,
                config: cli.config,
                overrides,
                output,
                fail_under,
            })
            .await
        }
        Commands::Catalogue => {
            catalogue_cmd::run()?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            let name = command.get_name().to_string();
            clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
            Ok(ExitCode::SUCCESS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_audit_flags() {
        let cli = Cli::try_parse_from([
            "sitegrade",
            "--json",
            "audit",
            "example.com",
            "--max-pages",
            "5",
            "--competitor",
            "a.example",
            "--competitor",
            "b.example",
            "--psi-strategy",
            "desktop",
            "--on-cancel",
            "error",
        ])
        .unwrap();
        assert!(cli.json);
        let Commands::Audit {
            url,
            max_pages,
            competitors,
            psi_strategy,
            on_cancel,
            ..
        } = cli.command
        else {
            panic!("expected audit");
        };
        assert_eq!(url, "example.com");
        assert_eq!(max_pages, Some(5));
        assert_eq!(competitors, vec!["a.example", "b.example"]);
        assert_eq!(PsiStrategy::from(psi_strategy.unwrap()), PsiStrategy::Desktop);
        assert_eq!(CancelPolicy::from(on_cancel.unwrap()), CancelPolicy::Error);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["sitegrade", "catalogue", "--quiet", "--log-format", "json"])
            .unwrap();
        assert!(cli.quiet);
        assert_eq!(cli.log_format, LogFormat::Json);
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        assert!(Cli::try_parse_from(["sitegrade", "-q", "-v", "catalogue"]).is_err());
    }
}
