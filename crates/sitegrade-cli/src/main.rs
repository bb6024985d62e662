//! `sitegrade` command-line front end.

mod cli;

use clap::Parser;
use cli::{Cli, LogFormat};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Read by cli::output; set before any thread exists.
    if cli.json {
        std::env::set_var("SITEGRADE_JSON", "1");
    }
    if cli.quiet {
        std::env::set_var("SITEGRADE_QUIET", "1");
    }
    if cli.verbose {
        std::env::set_var("SITEGRADE_VERBOSE", "1");
    }
    if cli.no_color {
        std::env::set_var("SITEGRADE_NO_COLOR", "1");
    }

    init_tracing(cli.log_format, cli.verbose, cli.quiet);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::run(cli)) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat, verbose: bool, quiet: bool) {
    let default = if verbose {
        "sitegrade=debug"
    } else if quiet {
        "sitegrade=error"
    } else {
        "sitegrade=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.with_ansi(cli::output::color_enabled()).init(),
    }
}
