use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{FnlogError, Result};
use crate::query::DEFAULT_LIMIT;

pub const DEFAULT_STORE_CAPACITY: usize = 1000;
pub const DEFAULT_MAX_REQUEST_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub otlp_grpc_addr: String,
    pub otlp_http_addr: String,
    pub query_http_addr: String,
    pub store_capacity: usize,
    pub max_request_bytes: usize,
    pub default_query_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            otlp_grpc_addr: "127.0.0.1:4317".to_string(),
            otlp_http_addr: "127.0.0.1:4318".to_string(),
            query_http_addr: "127.0.0.1:8000".to_string(),
            store_capacity: DEFAULT_STORE_CAPACITY,
            max_request_bytes: DEFAULT_MAX_REQUEST_BYTES,
            default_query_limit: DEFAULT_LIMIT,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.store_capacity == 0 {
            return Err(FnlogError::Config(
                "store_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_request_bytes == 0 {
            return Err(FnlogError::Config(
                "max_request_bytes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    otlp_grpc_addr: Option<String>,
    otlp_http_addr: Option<String>,
    query_http_addr: Option<String>,
    store_capacity: Option<usize>,
    max_request_bytes: Option<usize>,
    default_query_limit: Option<usize>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("FNLOG_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("fnlog/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| FnlogError::Config(format!("failed reading {}: {e}", path.display())))?;
    parse_file_overrides(&raw)
        .map(Some)
        .map_err(|e| FnlogError::Config(format!("failed parsing {}: {e}", path.display())))
}

fn parse_file_overrides(raw: &str) -> std::result::Result<ConfigOverrides, toml::de::Error> {
    toml::from_str(raw)
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    Ok(ConfigOverrides {
        otlp_grpc_addr: env::var("FNLOG_OTLP_GRPC_ADDR").ok(),
        otlp_http_addr: env::var("FNLOG_OTLP_HTTP_ADDR").ok(),
        query_http_addr: env::var("FNLOG_QUERY_HTTP_ADDR").ok(),
        store_capacity: env_usize("FNLOG_STORE_CAPACITY")?,
        max_request_bytes: env_usize("FNLOG_MAX_REQUEST_BYTES")?,
        default_query_limit: env_usize("FNLOG_DEFAULT_QUERY_LIMIT")?,
    })
}

fn env_usize(name: &str) -> Result<Option<usize>> {
    match env::var(name) {
        Ok(v) => v
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| FnlogError::Config(format!("bad {name} in environment: {e}"))),
        Err(_) => Ok(None),
    }
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.otlp_grpc_addr {
        cfg.otlp_grpc_addr = v;
    }
    if let Some(v) = overrides.otlp_http_addr {
        cfg.otlp_http_addr = v;
    }
    if let Some(v) = overrides.query_http_addr {
        cfg.query_http_addr = v;
    }
    if let Some(v) = overrides.store_capacity {
        if v == 0 {
            return Err(FnlogError::Config(format!(
                "bad store_capacity in {source}: must be at least 1"
            )));
        }
        cfg.store_capacity = v;
    }
    if let Some(v) = overrides.max_request_bytes {
        cfg.max_request_bytes = v;
    }
    if let Some(v) = overrides.default_query_limit {
        cfg.default_query_limit = v;
    }
    Ok(())
}
