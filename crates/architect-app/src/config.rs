use std::path::PathBuf;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000";

/// Where the app finds the proxy and keeps its local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub endpoint: String,
    pub data_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let endpoint = lookup("ARCHITECT_ENDPOINT")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let data_dir = architect_core::data_dir_from(&lookup);
        Self { endpoint, data_dir }
    }
}
