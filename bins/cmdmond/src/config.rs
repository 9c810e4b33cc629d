use std::net::SocketAddr;
use std::path::PathBuf;

use cmdmon_collab::BindAddresses;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error while reading TOML config file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Error while deserializing TOML: {0}")]
    Deserialize(#[from] toml::de::Error),
}

#[derive(Debug, Deserialize)]
pub struct RawConfig {
    pub bind: RawBindOptions,
    pub max_sources: i64,
    pub dump_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct RawBindOptions {
    ipv4: Option<SocketAddr>,
    ipv6: Option<SocketAddr>,
    unix: Option<PathBuf>,
}

#[derive(Debug)]
pub struct Config {
    pub bind: BindAddresses,
    pub max_sources: usize,
    pub dump_dir: PathBuf,
}

impl From<RawConfig> for Config {
    fn from(value: RawConfig) -> Self {
        Self {
            bind: BindAddresses {
                ipv4: value.bind.ipv4,
                ipv6: value.bind.ipv6,
                unix: value.bind.unix,
            },
            max_sources: value.max_sources.max(0) as usize,
            dump_dir: value.dump_dir,
        }
    }
}

impl Config {
    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let parsed: RawConfig = toml::from_str(&raw)?;
        Ok(Self::from(parsed))
    }
}
