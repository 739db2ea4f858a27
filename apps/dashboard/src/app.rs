//! Wires config, logging and the API client together for one CLI command.

use crate::cli::{Cli, Command};
use crate::error::DashboardError;
use crate::logger;
use crate::session::{LOGIN_HINT, SessionWatcher};

use api_client::config::ClientConfig;
use api_client::{ApiClient, LOGIN_PATH, RequestOptions};

use std::path::{Path, PathBuf};
use std::time::Duration;

use log::info;
use serde_json::{Value, json};

const APP_DIR_NAME: &str = "clinic-dashboard";
const WATCHER_GRACE: Duration = Duration::from_secs(1);

/// `{config_dir}/clinic-dashboard`, or the working directory when the
/// platform has no config directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub async fn run(cli: Cli) -> Result<(), DashboardError> {
    let config_dir = cli.config_dir.unwrap_or_else(default_config_dir);
    prepare_dir(&config_dir)?;
    logger::initialize(&config_dir)?;

    info!("Dashboard starting, config directory: {}", config_dir.display());

    if ClientConfig::write_default_if_missing(&config_dir)? {
        info!("Wrote default client config to {}", config_dir.display());
    }

    let config = ClientConfig::load(&config_dir)?;
    let client = ApiClient::from_config(&config)?;
    let watcher = SessionWatcher::spawn(client.subscribe_session_events());

    let result = execute(&client, cli.command).await;

    drop(client);
    if watcher.finish(WATCHER_GRACE).await.is_some() {
        eprintln!("{LOGIN_HINT}");
    }

    result
}

/// Run a single command against an already built client.
pub async fn execute(client: &ApiClient, command: Command) -> Result<(), DashboardError> {
    match command {
        Command::Login { email, password } => {
            let value: Value = client
                .authenticate(LOGIN_PATH, &json!({ "email": email, "password": password }))
                .await?;

            let name = value
                .pointer("/user/email")
                .and_then(Value::as_str)
                .unwrap_or(email.as_str());
            println!("Signed in as {name}");
        }
        Command::Get { path, query } => {
            let options = query
                .into_iter()
                .fold(RequestOptions::default(), |options, (key, value)| {
                    options.with_query(key, value)
                });

            let value: Value = client.get_with(&path, options).await?;
            println!("{}", render(&value)?);
        }
        Command::Logout => {
            client.logout()?;
            println!("Signed out");
        }
        Command::Status => {
            if client.is_authenticated()? {
                println!("Signed in");
            } else {
                println!("Not signed in");
            }
        }
    }

    Ok(())
}

pub(crate) fn render(value: &Value) -> Result<String, DashboardError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| DashboardError::dashboard(format!("Failed to render response: {e}")))
}

fn prepare_dir(dir: &Path) -> Result<(), DashboardError> {
    std::fs::create_dir_all(dir).map_err(|e| {
        DashboardError::dashboard(format!(
            "Failed to create config directory {}: {e}",
            dir.display()
        ))
    })
}
