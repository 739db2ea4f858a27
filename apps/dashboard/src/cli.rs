use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Command line shell for the clinical dashboard API.
#[derive(Debug, Parser)]
#[command(name = "dashboard", version, about)]
pub struct Cli {
    /// Directory holding `client.toml` and `dashboard.log`
    #[arg(long, env = "DASHBOARD_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign in and store the issued credentials
    Login {
        email: String,

        #[arg(long, env = "DASHBOARD_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// GET a backend path and print its value as JSON
    Get {
        path: String,

        /// Query pair as `key=value`, repeatable
        #[arg(long = "query", short = 'q', value_parser = parse_query_pair)]
        query: Vec<(String, String)>,
    },

    /// Forget the stored credentials
    Logout,

    /// Report whether usable credentials are stored
    Status,
}

pub(crate) fn parse_query_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

