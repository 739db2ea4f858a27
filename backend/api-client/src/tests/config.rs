use crate::DEFAULT_API_BASE_URL;
use crate::config::{
    CONFIG_FILE_NAME, ClientConfig, ENV_API_TIMEOUT_SECS, ENV_API_URL, ENV_CREDENTIALS_FILE,
};
use crate::error::config::ConfigError;

use std::path::PathBuf;
use std::time::Duration;

use serial_test::serial;
use tempfile::TempDir;

struct EnvGuard {
    keys: Vec<&'static str>,
}

impl EnvGuard {
    fn set(pairs: &[(&'static str, &str)]) -> Self {
        for (key, value) in pairs {
            // SAFETY: tests touching the environment run under #[serial]
            unsafe { std::env::set_var(key, value) };
        }
        Self {
            keys: pairs.iter().map(|(key, _)| *key).collect(),
        }
    }

    fn clear_all() -> Self {
        let keys = vec![ENV_API_URL, ENV_API_TIMEOUT_SECS, ENV_CREDENTIALS_FILE];
        for key in &keys {
            // SAFETY: tests touching the environment run under #[serial]
            unsafe { std::env::remove_var(key) };
        }
        Self { keys }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            // SAFETY: tests touching the environment run under #[serial]
            unsafe { std::env::remove_var(key) };
        }
    }
}

#[test]
fn given_default_config_when_validated_then_passes() {
    let config = ClientConfig::default();

    assert!(config.validate().is_ok());
    assert_eq!(config.base_url, DEFAULT_API_BASE_URL);
    assert_eq!(config.refresh_path, "auth/refresh");
    assert_eq!(config.timeout(), Duration::from_secs(30));
}

#[test]
#[serial]
fn given_no_config_file_when_loaded_then_uses_defaults() {
    let _env = EnvGuard::clear_all();
    let temp_dir = TempDir::new().unwrap();

    let config = ClientConfig::load(temp_dir.path()).unwrap();

    assert_eq!(config, ClientConfig::default());
}

/// **VALUE**: Saved config loads back identically.
///
/// **BUG THIS CATCHES**: Would catch `credentials_file` being dropped by the writer, or
/// the temp file never being renamed into place.
#[test]
#[serial]
fn given_saved_config_when_loaded_then_values_match() {
    // GIVEN: A non-default config saved to disk
    let _env = EnvGuard::clear_all();
    let temp_dir = TempDir::new().unwrap();
    let config = ClientConfig {
        base_url: "https://dashboard.example.com/api/".to_string(),
        timeout_secs: 10,
        refresh_path: "session/renew".to_string(),
        refresh_lifetime_days: 7,
        credentials_file: Some(PathBuf::from("/var/lib/dashboard/credentials.json")),
    };
    config.save(temp_dir.path()).unwrap();

    // WHEN: Loading it back
    let loaded = ClientConfig::load(temp_dir.path()).unwrap();

    // THEN: Every field survives
    assert_eq!(loaded, config);
    assert!(!temp_dir.path().join("client.toml.tmp").exists());
}

#[test]
#[serial]
fn given_partial_file_when_loaded_then_missing_fields_use_defaults() {
    let _env = EnvGuard::clear_all();
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("client.toml"), "timeout_secs = 5\n").unwrap();

    let config = ClientConfig::load(temp_dir.path()).unwrap();

    assert_eq!(config.timeout_secs, 5);
    assert_eq!(config.base_url, DEFAULT_API_BASE_URL);
}

#[test]
#[serial]
fn given_env_overrides_when_loaded_then_env_wins_over_file() {
    let _clear = EnvGuard::clear_all();
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(
        temp_dir.path().join("client.toml"),
        "base_url = \"http://file.example.com/api/\"\ntimeout_secs = 5\n",
    )
    .unwrap();
    let _env = EnvGuard::set(&[
        (ENV_API_URL, "https://env.example.com/api/"),
        (ENV_API_TIMEOUT_SECS, " 12 "),
        (ENV_CREDENTIALS_FILE, "/tmp/creds.json"),
    ]);

    let config = ClientConfig::load(temp_dir.path()).unwrap();

    assert_eq!(config.base_url, "https://env.example.com/api/");
    assert_eq!(config.timeout_secs, 12);
    assert_eq!(
        config.credentials_path(),
        Some(PathBuf::from("/tmp/creds.json"))
    );
}

#[test]
#[serial]
fn given_non_numeric_timeout_env_when_loaded_then_returns_env_error() {
    let _clear = EnvGuard::clear_all();
    let temp_dir = TempDir::new().unwrap();
    let _env = EnvGuard::set(&[(ENV_API_TIMEOUT_SECS, "soon")]);

    let err = ClientConfig::load(temp_dir.path()).unwrap_err();

    assert!(matches!(
        err,
        ConfigError::EnvError { variable, .. } if variable == ENV_API_TIMEOUT_SECS
    ));
}

#[test]
#[serial]
fn given_malformed_toml_when_loaded_then_returns_parse_error() {
    let _env = EnvGuard::clear_all();
    let temp_dir = TempDir::new().unwrap();
    std::fs::write(temp_dir.path().join("client.toml"), "timeout_secs = [").unwrap();

    let err = ClientConfig::load(temp_dir.path()).unwrap_err();

    assert!(matches!(err, ConfigError::ParseError { .. }));
}

#[test]
fn given_out_of_range_values_when_validated_then_each_is_rejected() {
    let cases = [
        ClientConfig {
            base_url: "ftp://example.com/".to_string(),
            ..ClientConfig::default()
        },
        ClientConfig {
            base_url: "not a url".to_string(),
            ..ClientConfig::default()
        },
        ClientConfig {
            timeout_secs: 0,
            ..ClientConfig::default()
        },
        ClientConfig {
            timeout_secs: 301,
            ..ClientConfig::default()
        },
        ClientConfig {
            refresh_path: "/".to_string(),
            ..ClientConfig::default()
        },
        ClientConfig {
            refresh_lifetime_days: 0,
            ..ClientConfig::default()
        },
    ];

    for config in cases {
        let result = config.validate();
        assert!(
            matches!(result, Err(ConfigError::ValidationError { .. })),
            "expected validation error for {config:?}"
        );
    }
}

#[test]
fn given_invalid_config_when_saved_then_nothing_is_written() {
    let temp_dir = TempDir::new().unwrap();
    let config = ClientConfig {
        timeout_secs: 0,
        ..ClientConfig::default()
    };

    assert!(config.save(temp_dir.path()).is_err());
    assert!(!temp_dir.path().join("client.toml").exists());
}

/// **VALUE**: First run leaves a default `client.toml` the user can edit.
///
/// **BUG THIS CATCHES**: Would catch a later run overwriting the user's edits with
/// defaults.
#[test]
#[serial]
fn given_empty_dir_when_writing_default_then_file_written_once_and_never_overwritten() {
    // GIVEN: An empty config directory
    let _env = EnvGuard::clear_all();
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join(CONFIG_FILE_NAME);

    // WHEN: Writing the default twice, with a user edit in between
    let first = ClientConfig::write_default_if_missing(temp_dir.path()).unwrap();
    std::fs::write(&config_path, "timeout_secs = 7\n").unwrap();
    let second = ClientConfig::write_default_if_missing(temp_dir.path()).unwrap();

    // THEN: Only the first call wrote, and the edit survives
    assert!(first);
    assert!(!second);
    let loaded = ClientConfig::load(temp_dir.path()).unwrap();
    assert_eq!(loaded.timeout_secs, 7);
}

#[test]
#[serial]
fn given_default_written_when_loaded_then_matches_defaults() {
    let _env = EnvGuard::clear_all();
    let temp_dir = TempDir::new().unwrap();

    ClientConfig::write_default_if_missing(temp_dir.path()).unwrap();

    assert!(temp_dir.path().join(CONFIG_FILE_NAME).exists());
    assert_eq!(
        ClientConfig::load(temp_dir.path()).unwrap(),
        ClientConfig::default()
    );
}
