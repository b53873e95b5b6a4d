use anyhow::{Context, Result, anyhow};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use game_core::GameRules;

use crate::websocket::TransportSettings;

pub const DEFAULT_API_KEY: &str = "test-key-123";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_key: String,
    pub words_file: PathBuf,
    pub database_url: String,
    pub rules: GameRules,
    pub tick_millis: u64,
    pub connection_timeout_seconds: u64,
    pub handshake_timeout_seconds: u64,
    pub rate_limit_burst: u32,
    pub rate_limit_refill_millis: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds a config from any variable source; unset variables keep
    /// their defaults, malformed ones are an error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let rules = GameRules {
            round_seconds: parse_var(&lookup, "ROUND_SECONDS", defaults.rules.round_seconds)?,
            max_passes: parse_var(&lookup, "MAX_PASSES", defaults.rules.max_passes)?,
            guess_countdown_seconds: parse_var(
                &lookup,
                "GUESS_COUNTDOWN_SECONDS",
                defaults.rules.guess_countdown_seconds,
            )?,
            allow_negative_points: match lookup("ALLOW_NEGATIVE_POINTS") {
                Some(value) => parse_flag(&value)
                    .with_context(|| format!("Invalid ALLOW_NEGATIVE_POINTS: {:?}", value))?,
                None => defaults.rules.allow_negative_points,
            },
        };

        let config = Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parse_var(&lookup, "PORT", defaults.port)?,
            api_key: lookup("INTESA_API_KEY").unwrap_or(defaults.api_key),
            words_file: lookup("WORDS_FILE")
                .map(PathBuf::from)
                .unwrap_or(defaults.words_file),
            database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
            rules,
            tick_millis: parse_var(&lookup, "TICK_MILLIS", defaults.tick_millis)?,
            connection_timeout_seconds: parse_var(
                &lookup,
                "CONNECTION_TIMEOUT_SECONDS",
                defaults.connection_timeout_seconds,
            )?,
            handshake_timeout_seconds: parse_var(
                &lookup,
                "HANDSHAKE_TIMEOUT_SECONDS",
                defaults.handshake_timeout_seconds,
            )?,
            rate_limit_burst: parse_var(&lookup, "RATE_LIMIT_BURST", defaults.rate_limit_burst)?,
            rate_limit_refill_millis: parse_var(
                &lookup,
                "RATE_LIMIT_REFILL_MILLIS",
                defaults.rate_limit_refill_millis,
            )?,
        };

        if config.tick_millis == 0 {
            return Err(anyhow!("TICK_MILLIS must be greater than zero"));
        }
        if config.rate_limit_refill_millis == 0 {
            return Err(anyhow!("RATE_LIMIT_REFILL_MILLIS must be greater than zero"));
        }

        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .with_context(|| format!("Invalid HOST: {:?}", self.host))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn uses_default_api_key(&self) -> bool {
        self.api_key == DEFAULT_API_KEY
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn connection_timeout(&self) -> Duration {
        Duration::from_secs(self.connection_timeout_seconds)
    }

    pub fn transport(&self) -> TransportSettings {
        TransportSettings {
            handshake_timeout: Duration::from_secs(self.handshake_timeout_seconds),
            rate_limit_burst: self.rate_limit_burst,
            rate_limit_refill: Duration::from_millis(self.rate_limit_refill_millis),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            api_key: DEFAULT_API_KEY.to_string(),
            words_file: PathBuf::from("words.json"),
            database_url: "sqlite://intesa.db?mode=rwc".to_string(),
            rules: GameRules::default(),
            tick_millis: 1000,
            connection_timeout_seconds: 300,
            handshake_timeout_seconds: 10,
            rate_limit_burst: 30,
            rate_limit_refill_millis: 500,
        }
    }
}

fn parse_var<F, T>(lookup: &F, name: &str, default: T) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {}: {:?} ({})", name, value, e)),
        None => Ok(default),
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(anyhow!("expected true or false")),
    }
}
