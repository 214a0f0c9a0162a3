use anyhow::{Context, Result, bail};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use lotto_lib::{DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_CHECKPOINT_PAUSE, DEFAULT_MAX_PROBES, SyncConfig};

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
    pub max_probes: u32,
    pub checkpoint_interval: u32,
    pub checkpoint_pause: Duration,
    pub request_timeout: Duration,
}

impl Config {
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            max_probes: self.max_probes,
            checkpoint_interval: self.checkpoint_interval,
            checkpoint_pause: self.checkpoint_pause,
        }
    }
}

pub fn load() -> Result<Config> {
    from_lookup(|key| env::var(key).ok())
}

fn from_lookup<F>(lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let database_path = lookup("LOTTO_DB_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("data/lotto.db"));

    let max_probes = parse_var(&lookup, "LOTTO_MAX_PROBES", DEFAULT_MAX_PROBES)?;
    if max_probes == 0 {
        bail!("LOTTO_MAX_PROBES must be at least 1");
    }

    let checkpoint_interval = parse_var(&lookup, "LOTTO_CHECKPOINT_EVERY", DEFAULT_CHECKPOINT_INTERVAL)?;
    if checkpoint_interval == 0 {
        bail!("LOTTO_CHECKPOINT_EVERY must be at least 1");
    }

    let pause_ms = parse_var(
        &lookup,
        "LOTTO_CHECKPOINT_PAUSE_MS",
        DEFAULT_CHECKPOINT_PAUSE.as_millis() as u64,
    )?;
    let timeout_secs = parse_var(&lookup, "LOTTO_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;

    Ok(Config {
        database_path,
        max_probes,
        checkpoint_interval,
        checkpoint_pause: Duration::from_millis(pause_ms),
        request_timeout: Duration::from_secs(timeout_secs),
    })
}

fn parse_var<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("data/lotto.db"));
        assert_eq!(config.max_probes, 5000);
        assert_eq!(config.checkpoint_interval, 20);
        assert_eq!(config.checkpoint_pause, Duration::from_millis(50));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
    }

    #[test]
    fn overrides_are_parsed() {
        let config = config_from(&[
            ("LOTTO_DB_PATH", "/tmp/draws.db"),
            ("LOTTO_MAX_PROBES", "1500"),
            ("LOTTO_CHECKPOINT_PAUSE_MS", "0"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/draws.db"));
        assert_eq!(config.sync_config().max_probes, 1500);
        assert!(config.sync_config().checkpoint_pause.is_zero());
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(config_from(&[("LOTTO_MAX_PROBES", "lots")]).is_err());
        assert!(config_from(&[("LOTTO_MAX_PROBES", "0")]).is_err());
        assert!(config_from(&[("LOTTO_CHECKPOINT_EVERY", "0")]).is_err());
    }
}
