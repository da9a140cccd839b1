//! Start-up configuration read from the environment.

use glass::forum::storage::DEFAULT_DATA_DIR;
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{info, warn};

const DEFAULT_BIND: ([u8; 4], u16) = ([127, 0, 0, 1], 8000);

#[derive(Debug, Clone)]
pub struct Config {
    /// Address the HTTP server listens on
    pub bind: SocketAddr,
    /// Directory holding the forum database
    pub data_dir: PathBuf,
    /// Only send the session cookie over HTTPS
    pub secure_cookies: bool,
    /// Directory served under `/static`
    pub static_dir: PathBuf,
}

impl Config {
    pub fn load() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_static = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/static"));
        Self {
            bind: try_load(&lookup, "GLASS_BIND", SocketAddr::from(DEFAULT_BIND)),
            data_dir: lookup("GLASS_DATA")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            secure_cookies: lookup("GLASS_SECURE_COOKIES")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false),
            static_dir: lookup("GLASS_STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or(default_static),
        }
    }
}

fn try_load<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!("Invalid {key} value {raw:?}: {e}, using default: {default}");
            default
        }),
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]);
        assert_eq!(config.bind, SocketAddr::from(DEFAULT_BIND));
        assert_eq!(config.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert!(!config.secure_cookies);
        assert!(config.static_dir.ends_with("static"));
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("GLASS_BIND", "0.0.0.0:9000"),
            ("GLASS_DATA", "/var/lib/glass"),
            ("GLASS_SECURE_COOKIES", "TRUE"),
        ]);
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/glass"));
        assert!(config.secure_cookies);
    }

    #[test]
    fn test_invalid_bind_falls_back() {
        let config = config(&[("GLASS_BIND", "not an address")]);
        assert_eq!(config.bind, SocketAddr::from(DEFAULT_BIND));
    }
}
