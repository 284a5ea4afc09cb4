// Process configuration, loaded once at start.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::RngCore;

use judge_infra_sqlite::PoolSettings;

/// File holding the generated secret key when `SECRET_KEY` is unset.
const SECRET_KEY_FILE: &str = ".secret_key";

/// Bytes of generated secret key material.
const SECRET_KEY_LEN: usize = 128;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

#[derive(Clone)]
pub struct JudgeConfig {
    pub database_uri: String,
    pub redis_uri: String,
    /// Session/signing secret shared with the live-push transport.
    pub secret_key: Vec<u8>,
    pub enable_events: bool,
    pub judge_url: String,
    pub digitalocean_api_token: Option<String>,
    pub listen_addr: String,
    /// Database pool bounds, handed down to the store layer.
    pub pool: PoolSettings,
}

impl JudgeConfig {
    /// Read every setting from the environment; the secret key falls back
    /// to a file at the app root, generated on first start. Test runs point
    /// at `TEST_DATABASE_URI` instead of the real database.
    pub fn load(app_root: &Path, testing: bool) -> Result<Self> {
        let enable_events = std::env::var("ENABLE_SOCKETIO")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .map(|v| v != 0)
            .unwrap_or(true);

        let database_var = if testing {
            "TEST_DATABASE_URI"
        } else {
            "DATABASE_URI"
        };

        let defaults = PoolSettings::default();
        let pool = PoolSettings {
            max_connections: env_parse("JUDGE_POOL_SIZE").unwrap_or(defaults.max_connections),
            busy_timeout: env_parse("JUDGE_POOL_TIMEOUT")
                .map(Duration::from_secs)
                .unwrap_or(defaults.busy_timeout),
        };

        Ok(Self {
            database_uri: std::env::var(database_var).unwrap_or_default(),
            redis_uri: std::env::var("REDIS_URI").unwrap_or_default(),
            secret_key: load_secret_key(app_root)?,
            enable_events,
            judge_url: std::env::var("JUDGE_URL").unwrap_or_default(),
            digitalocean_api_token: std::env::var("DIGITALOCEAN_API_TOKEN")
                .ok()
                .filter(|token| !token.is_empty()),
            listen_addr: std::env::var("JUDGE_LISTEN_ADDR")
                .unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string()),
            pool,
        })
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|s| s.parse().ok())
}

fn load_secret_key(app_root: &Path) -> Result<Vec<u8>> {
    if let Ok(key) = std::env::var("SECRET_KEY") {
        return Ok(key.into_bytes());
    }
    secret_key_from_file(&app_root.join(SECRET_KEY_FILE))
}

fn secret_key_from_file(path: &Path) -> Result<Vec<u8>> {
    match std::fs::read(path) {
        Ok(contents) if !contents.is_empty() => Ok(contents),
        _ => {
            let mut key = vec![0u8; SECRET_KEY_LEN];
            rand::thread_rng().fill_bytes(&mut key);
            std::fs::write(path, &key)
                .with_context(|| format!("writing secret key to {}", path.display()))?;
            Ok(key)
        }
    }
}
