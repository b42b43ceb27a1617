use std::{env, fs, path::Path, time::Duration};

use crate::{errors::Error, Result};

pub const DEFAULT_API_HOST: &str = "telegram.org";
pub const DEFAULT_POLLING_TIMEOUT: u64 = 300;
pub const MIN_POLLING_TIMEOUT: u64 = 10;
pub const MAX_POLLING_TIMEOUT: u64 = 300;
pub const DEFAULT_STALE_AFTER: u64 = 300;

/// Typed runtime configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// Opaque bot credential, embedded in every request path.
    pub api_token: String,
    /// Requests go to `https://api.<api_host>/bot<token>/<method>`.
    pub api_host: String,
    /// Long-poll `timeout` passed to `getUpdates`.
    pub polling_timeout: Duration,
    /// Messages older than this are dropped before routing.
    pub stale_after: Duration,
    /// Optional cap on concurrently running handlers. `None` = unbounded.
    pub max_in_flight_handlers: Option<usize>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let api_token = env_str("BOT_API_TOKEN").unwrap_or_default();
        if api_token.trim().is_empty() {
            return Err(Error::Config(
                "BOT_API_TOKEN environment variable is required".to_string(),
            ));
        }

        let api_host = env_str("BOT_API_HOST")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_API_HOST.to_string());

        let polling_timeout = Duration::from_secs(clamp_polling_timeout(
            env_u64("POLLING_TIMEOUT").unwrap_or(DEFAULT_POLLING_TIMEOUT),
        ));
        let stale_after =
            Duration::from_secs(env_u64("MESSAGE_STALE_AFTER").unwrap_or(DEFAULT_STALE_AFTER));
        let max_in_flight_handlers = env_usize("MAX_IN_FLIGHT_HANDLERS").filter(|n| *n > 0);

        Ok(Self {
            api_token: api_token.trim().to_string(),
            api_host,
            polling_timeout,
            stale_after,
            max_in_flight_handlers,
        })
    }

    /// Config with defaults for everything but the token.
    pub fn with_token(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
            api_host: DEFAULT_API_HOST.to_string(),
            polling_timeout: Duration::from_secs(DEFAULT_POLLING_TIMEOUT),
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER),
            max_in_flight_handlers: None,
        }
    }
}

fn clamp_polling_timeout(secs: u64) -> u64 {
    secs.clamp(MIN_POLLING_TIMEOUT, MAX_POLLING_TIMEOUT)
}

pub fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    env_str(key).and_then(|s| s.trim().parse::<usize>().ok())
}

pub fn env_i64(key: &str) -> Option<i64> {
    env_str(key).and_then(|s| s.trim().parse::<i64>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
