use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use mcp_scaffold::ApiClientConfig;

pub const DEFAULT_API_BASE_URL: &str = "https://api.example.com";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_RATE_LIMIT: u32 = 100;
const DEFAULT_PORT: u16 = 3000;

#[derive(Parser, Debug, Default)]
#[command(name = "scaffold-app")]
#[command(about = "Example MCP server (stdio or HTTP)")]
pub struct Args {
    /// Override an environment variable, e.g. `--env CACHE_TTL=60`. Repeatable.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub env: Vec<(String, String)>,

    /// Transport to serve on. Takes precedence over MCP_TRANSPORT.
    #[arg(long, value_enum)]
    pub transport: Option<Transport>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {key}={value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Process configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub cache_ttl: Duration,
    pub cache_max_entries: Option<usize>,
    /// Declared for parity with deployments that set it; nothing enforces it.
    pub rate_limit: u32,
    pub port: u16,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
    pub transport: Transport,
}

impl Config {
    /// Build from the process environment with `--env` pairs layered on top.
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let overrides: HashMap<&str, &str> = args
            .env
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        let mut config = Self::from_lookup(|key| match overrides.get(key) {
            Some(v) => Some((*v).to_string()),
            None => std::env::var(key).ok(),
        })?;
        if let Some(transport) = args.transport {
            config.transport = transport;
        }
        Ok(config)
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let transport = match get("MCP_TRANSPORT") {
            Some(v) => Transport::from_str(&v, true).map_err(|_| ConfigError::Invalid {
                key: "MCP_TRANSPORT",
                value: v.clone(),
                reason: "expected `stdio` or `http`".into(),
            })?,
            None => Transport::default(),
        };

        let cache_max_entries = match get("CACHE_MAX_ENTRIES") {
            Some(v) => {
                let n: usize = parse_number("CACHE_MAX_ENTRIES", &v)?;
                if n == 0 {
                    return Err(ConfigError::Invalid {
                        key: "CACHE_MAX_ENTRIES",
                        value: v,
                        reason: "must be at least 1".into(),
                    });
                }
                Some(n)
            }
            None => None,
        };

        Ok(Self {
            api_key: get("API_KEY"),
            api_base_url: get("API_BASE_URL").unwrap_or_else(|| DEFAULT_API_BASE_URL.into()),
            cache_ttl: Duration::from_secs(
                get("CACHE_TTL")
                    .map(|v| parse_number("CACHE_TTL", &v))
                    .transpose()?
                    .unwrap_or(DEFAULT_CACHE_TTL_SECS),
            ),
            cache_max_entries,
            rate_limit: get("RATE_LIMIT")
                .map(|v| parse_number("RATE_LIMIT", &v))
                .transpose()?
                .unwrap_or(DEFAULT_RATE_LIMIT),
            port: get("PORT")
                .map(|v| parse_number("PORT", &v))
                .transpose()?
                .unwrap_or(DEFAULT_PORT),
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_dir: get("LOG_DIR").map(PathBuf::from),
            transport,
        })
    }

    pub fn client_config(&self) -> ApiClientConfig {
        ApiClientConfig {
            api_key: self.api_key.clone(),
            cache_ttl: self.cache_ttl,
            cache_capacity: self.cache_max_entries,
            ..ApiClientConfig::new(self.api_base_url.clone())
        }
    }
}

fn parse_number<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{}`", s)),
    }
}
