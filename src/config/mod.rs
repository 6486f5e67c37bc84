//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use crate::game::PhaseTimings;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed client origins for CORS, comma-separated
    pub client_origin: String,
    /// Seed for reproducible card faces
    pub toss_seed: Option<u64>,
    /// Delays between toss phases
    pub timings: PhaseTimings,
    /// Global HTTP request budget per second
    pub http_rate_limit: u32,
    /// How long an unwatched, idle match is kept
    pub match_idle_ttl: Duration,
    /// How often abandoned matches are swept
    pub sweep_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PORT wins over SERVER_ADDR for hosted deployments
        let server_addr = if let Some(port) = lookup("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string())
        };

        let defaults = PhaseTimings::default();
        let timings = PhaseTimings {
            announce: millis(&lookup, "ANNOUNCE_DELAY_MS", defaults.announce)?,
            resolve: millis(&lookup, "RESOLVE_DELAY_MS", defaults.resolve)?,
            draw_settle: millis(&lookup, "DRAW_SETTLE_MS", defaults.draw_settle)?,
            round_settle: millis(&lookup, "ROUND_SETTLE_MS", defaults.round_settle)?,
            finish: millis(&lookup, "FINISH_DELAY_MS", defaults.finish)?,
        };
        if timings.resolve < timings.announce {
            return Err(ConfigError::ResolveBeforeAnnounce);
        }

        let toss_seed = match lookup("TOSS_SEED") {
            Some(raw) => Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidNumber("TOSS_SEED"))?,
            ),
            None => None,
        };

        let http_rate_limit = match lookup("HTTP_RATE_LIMIT") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidNumber("HTTP_RATE_LIMIT"))?,
            None => 20,
        };

        let match_idle_ttl = secs(&lookup, "MATCH_IDLE_TTL_SECS", Duration::from_secs(1800))?;
        let sweep_interval = secs(&lookup, "MATCH_SWEEP_INTERVAL_SECS", Duration::from_secs(60))?;
        if sweep_interval.is_zero() {
            return Err(ConfigError::InvalidNumber("MATCH_SWEEP_INTERVAL_SECS"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            client_origin: lookup("CLIENT_ORIGIN")
                .unwrap_or_else(|| "http://localhost:3000".to_string()),

            toss_seed,
            timings,
            http_rate_limit,
            match_idle_ttl,
            sweep_interval,
        })
    }
}

fn millis<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|_| ConfigError::InvalidNumber(key)),
        None => Ok(default),
    }
}

fn secs<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| ConfigError::InvalidNumber(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format")]
    InvalidAddress,

    #[error("Invalid numeric value for environment variable: {0}")]
    InvalidNumber(&'static str),

    #[error("RESOLVE_DELAY_MS must not be shorter than ANNOUNCE_DELAY_MS")]
    ResolveBeforeAnnounce,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = assert_ok!(load(&[]));
        assert_eq!(config.server_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.timings, PhaseTimings::default());
        assert_eq!(config.toss_seed, None);
        assert_eq!(config.http_rate_limit, 20);
        assert_eq!(config.match_idle_ttl, Duration::from_secs(1800));
        assert_eq!(config.sweep_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_eviction_settings() {
        let config = assert_ok!(load(&[
            ("MATCH_IDLE_TTL_SECS", "120"),
            ("MATCH_SWEEP_INTERVAL_SECS", "15"),
        ]));
        assert_eq!(config.match_idle_ttl, Duration::from_secs(120));
        assert_eq!(config.sweep_interval, Duration::from_secs(15));

        assert!(matches!(
            assert_err!(load(&[("MATCH_SWEEP_INTERVAL_SECS", "0")])),
            ConfigError::InvalidNumber("MATCH_SWEEP_INTERVAL_SECS")
        ));
    }

    #[test]
    fn test_port_overrides_server_addr() {
        let config = assert_ok!(load(&[("PORT", "9000"), ("SERVER_ADDR", "127.0.0.1:1")]));
        assert_eq!(config.server_addr.port(), 9000);
    }

    #[test]
    fn test_timing_overrides() {
        let config = assert_ok!(load(&[
            ("ANNOUNCE_DELAY_MS", "100"),
            ("RESOLVE_DELAY_MS", "400"),
            ("TOSS_SEED", "17"),
        ]));
        assert_eq!(config.timings.announce, Duration::from_millis(100));
        assert_eq!(config.timings.resolve, Duration::from_millis(400));
        assert_eq!(config.toss_seed, Some(17));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            assert_err!(load(&[("DRAW_SETTLE_MS", "soon")])),
            ConfigError::InvalidNumber("DRAW_SETTLE_MS")
        ));
        assert!(matches!(
            assert_err!(load(&[("ANNOUNCE_DELAY_MS", "900"), ("RESOLVE_DELAY_MS", "500")])),
            ConfigError::ResolveBeforeAnnounce
        ));
        assert!(matches!(
            assert_err!(load(&[("SERVER_ADDR", "not-an-addr")])),
            ConfigError::InvalidAddress
        ));
        assert!(matches!(
            assert_err!(load(&[("HTTP_RATE_LIMIT", "0")])),
            ConfigError::InvalidNumber("HTTP_RATE_LIMIT")
        ));
    }
}
