use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use architect_provider::DEFAULT_MODEL;

pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var}={value:?} is not valid: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Where the provider API key comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Read this environment variable on every request, so a missing key
    /// is reported per request and never cached.
    Env(String),
    /// A key fixed at construction. `None` behaves like an unset variable.
    Fixed(Option<String>),
}

impl CredentialSource {
    pub fn env_var_name(&self) -> Option<&str> {
        match self {
            CredentialSource::Env(var) => Some(var),
            CredentialSource::Fixed(_) => None,
        }
    }

    /// The current key, if any. Empty values count as missing.
    pub fn resolve(&self) -> Option<String> {
        let key = match self {
            CredentialSource::Env(var) => std::env::var(var).ok(),
            CredentialSource::Fixed(key) => key.clone(),
        };
        key.filter(|k| !k.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub credential: CredentialSource,
    pub model: String,
    pub bind: IpAddr,
    pub port: u16,
    /// Serve built frontend assets from here for unmatched paths.
    pub static_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            credential: CredentialSource::Env(API_KEY_VAR.to_string()),
            model: DEFAULT_MODEL.to_string(),
            bind: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            static_dir: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable lookup. Unset or empty variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let mut config = ServerConfig::default();

        if let Some(model) = get("ARCHITECT_MODEL") {
            config.model = model;
        }
        if let Some(raw) = get("ARCHITECT_BIND") {
            config.bind = raw.trim().parse().map_err(|e: std::net::AddrParseError| {
                ConfigError::Invalid {
                    var: "ARCHITECT_BIND",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(raw) = get("PORT") {
            config.port = raw.trim().parse().map_err(|e: std::num::ParseIntError| {
                ConfigError::Invalid {
                    var: "PORT",
                    value: raw.clone(),
                    reason: e.to_string(),
                }
            })?;
        }
        config.static_dir = get("ARCHITECT_STATIC_DIR").map(PathBuf::from);

        Ok(config)
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}
