// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

use crate::news::NewsAction;

/// Command-line arguments for `sagaflow`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "sagaflow",
    version,
    about = "Run effect-driven news workflows triggered by published actions.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Sagaflow.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Sagaflow.toml")]
    pub config: String,

    /// Publish an action at startup, e.g. `route-changed=/popular-news` or
    /// `fetch-news`. May be repeated; actions are published in order.
    #[arg(long = "publish", value_name = "KIND[=PAYLOAD]")]
    pub publish: Vec<NewsAction>,

    /// Exit once every started workflow has settled and nothing is queued.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SAGAFLOW_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the policies, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_flags_parse_into_actions_in_order() {
        let args = CliArgs::try_parse_from([
            "sagaflow",
            "--publish",
            "route-changed=/latest-news",
            "--publish",
            "fetch-news",
            "--once",
        ])
        .unwrap();

        assert_eq!(
            args.publish,
            vec![
                NewsAction::RouteChanged("/latest-news".into()),
                NewsAction::FetchNews
            ]
        );
        assert!(args.once);
        assert_eq!(args.config, "Sagaflow.toml");
    }

    #[test]
    fn unknown_action_kind_is_a_usage_error() {
        assert!(CliArgs::try_parse_from(["sagaflow", "--publish", "launch-rockets"]).is_err());
    }
}
