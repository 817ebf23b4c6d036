//! Server configuration read from the environment.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

use crate::items::ValidationPolicy;
use crate::query::ParamPolicy;
use crate::storage::StoreConfig;

/// Errors that can occur while reading configuration
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Configuration for the catalog server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Backing JSON document
    pub data_path: PathBuf,
    pub host: IpAddr,
    pub port: u16,
    pub param_policy: ParamPolicy,
    pub validation: ValidationPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("./data/items.json"),
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3001,
            param_policy: ParamPolicy::Lenient,
            validation: ValidationPolicy::None,
        }
    }
}

impl ServerConfig {
    /// Create from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let data_path = lookup("DATA_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);
        let host = parse_var(&lookup, "HOST")?.unwrap_or(defaults.host);
        let port = parse_var(&lookup, "PORT")?.unwrap_or(defaults.port);
        let param_policy =
            parse_var(&lookup, "QUERY_PARAM_POLICY")?.unwrap_or(defaults.param_policy);
        let validation = parse_var(&lookup, "ITEM_VALIDATION")?.unwrap_or(defaults.validation);

        Ok(Self {
            data_path,
            host,
            port,
            param_policy,
            validation,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::new(self.data_path.clone())
    }
}

#[cfg(test)]
impl ServerConfig {
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = path.into();
        self
    }

    pub fn with_param_policy(mut self, policy: ParamPolicy) -> Self {
        self.param_policy = policy;
        self
    }

    pub fn with_validation(mut self, policy: ValidationPolicy) -> Self {
        self.validation = policy;
        self
    }
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        None => Ok(None),
        Some(value) if value.trim().is_empty() => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name,
                value,
                reason: e.to_string(),
            }),
    }
}
