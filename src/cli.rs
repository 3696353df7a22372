//! CLI struct definitions for the `aqhi` command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(
    name = "aqhi",
    version = env!("CARGO_PKG_VERSION"),
    about = "Air Quality Health Index engine for Zhejiang cities"
)]
pub(crate) struct Cli {
    /// Config file (default: $AQHI_CONFIG, then ./aqhi.toml).
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// List the supported cities
    Cities,
    /// Show the active data source and window size
    Meta,
    /// Current AQHI for one city
    Index {
        /// City name, e.g. 杭州
        #[clap(long)]
        city: String,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Current AQHI for every city
    IndexAll {
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Raw hourly concentrations for one city
    History {
        #[clap(long)]
        city: String,
        /// Number of hourly buckets ending at the current hour (1-168).
        #[clap(long, default_value_t = 24)]
        hours: i64,
        /// Output format: 'text' or 'json'.
        #[clap(long, default_value = "text")]
        format: String,
    },
    /// Run one ingest pass for the current hour
    Ingest,
    /// Ingest on a fixed interval until interrupted
    Schedule {
        /// Seconds between passes (default: [ingest] interval_secs).
        #[clap(long)]
        interval_secs: Option<u64>,
    },
    /// Execute JSON RPC requests
    Rpc {
        /// Operation name (health, meta, cities, aqhi, aqhi_all, history, ingest)
        #[clap(long, conflicts_with = "stdin")]
        op: Option<String>,
        /// Operation parameters as a JSON object
        #[clap(long, requires = "op")]
        params: Option<String>,
        /// Read one request per line from stdin
        #[clap(long)]
        stdin: bool,
    },
    /// Write a default config file and create the store
    Init {
        /// Overwrite an existing config file
        #[clap(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = crate::core::error::AqhiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(crate::core::error::AqhiError::ValidationError(format!(
                "unknown format '{}', expected 'text' or 'json'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_index() {
        let cli = Cli::try_parse_from(["aqhi", "index", "--city", "杭州", "--format", "json"]).unwrap();
        match cli.command {
            Command::Index { city, format } => {
                assert_eq!(city, "杭州");
                assert_eq!(format.parse::<OutputFormat>().unwrap(), OutputFormat::Json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_config_flag() {
        let cli = Cli::try_parse_from(["aqhi", "meta", "--config", "/tmp/a.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/a.toml")));
    }

    #[test]
    fn test_history_default_hours() {
        let cli = Cli::try_parse_from(["aqhi", "history", "--city", "宁波"]).unwrap();
        match cli.command {
            Command::History { hours, .. } => assert_eq!(hours, 24),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_format_rejected() {
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
