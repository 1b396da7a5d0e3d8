//! Process configuration, read from the environment (and `.env`).

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use esxi_vsphere::VsphereConfig;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub esxi: VsphereConfig,
    pub server: ServerConfig,
    pub log_format: LogFormat,
    /// `tracing` filter directive, e.g. `info` or `esxi_vsphere=debug`
    pub log_filter: String,
}

impl AppConfig {
    /// Load from the process environment, after merging a `.env` file if
    /// one is present.
    pub fn from_env() -> Result<Self, ConfigError> {
        // a missing .env is normal
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup. Blank values count as
    /// unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("ESXI_HOST").ok_or(ConfigError::Missing("ESXI_HOST"))?;
        let password = get("ESXI_PASSWORD").ok_or(ConfigError::Missing("ESXI_PASSWORD"))?;
        let username = get("ESXI_USERNAME").unwrap_or_else(|| "root".to_string());
        let insecure = match get("ESXI_INSECURE") {
            Some(v) => parse_bool("ESXI_INSECURE", &v)?,
            None => false,
        };

        let esxi = VsphereConfig {
            host: host.trim().to_string(),
            username,
            password,
            insecure,
            ..Default::default()
        };
        esxi.base_url().map_err(|e| ConfigError::Invalid {
            name: "ESXI_HOST",
            reason: e.to_string(),
        })?;

        let mut server = ServerConfig::default();
        if let Some(v) = get("MCP_HOST") {
            server.host = v.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "MCP_HOST",
                reason: format!("{e}"),
            })?;
        }
        if let Some(v) = get("MCP_PORT") {
            server.port = v.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "MCP_PORT",
                reason: format!("{e}"),
            })?;
        }

        let log_format = match get("LOG_FORMAT").map(|v| v.trim().to_ascii_lowercase()) {
            None => LogFormat::Text,
            Some(v) if v == "text" => LogFormat::Text,
            Some(v) if v == "json" => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "LOG_FORMAT",
                    reason: format!("expected 'text' or 'json', got '{other}'"),
                })
            }
        };
        let log_filter = get("RUST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            esxi,
            server,
            log_format,
            log_filter,
        })
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let cfg = load(&[("ESXI_HOST", "esxi01.lab"), ("ESXI_PASSWORD", "pw")]).unwrap();
        assert_eq!(cfg.esxi.username, "root");
        assert!(!cfg.esxi.insecure);
        assert_eq!(cfg.esxi.timeout_secs, 30);
        assert_eq!(cfg.server.bind_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(cfg.log_format, LogFormat::Text);
        assert_eq!(cfg.log_filter, "info");
    }

    #[test]
    fn host_and_password_are_required() {
        assert_eq!(
            load(&[("ESXI_PASSWORD", "pw")]).unwrap_err(),
            ConfigError::Missing("ESXI_HOST")
        );
        assert_eq!(
            load(&[("ESXI_HOST", "h"), ("ESXI_PASSWORD", "  ")]).unwrap_err(),
            ConfigError::Missing("ESXI_PASSWORD")
        );
    }

    #[test]
    fn overrides_are_applied() {
        let cfg = load(&[
            ("ESXI_HOST", "https://vc.lab:8443"),
            ("ESXI_USERNAME", "administrator@vsphere.local"),
            ("ESXI_PASSWORD", "pw"),
            ("ESXI_INSECURE", "TRUE"),
            ("MCP_HOST", "127.0.0.1"),
            ("MCP_PORT", "8080"),
            ("LOG_FORMAT", "json"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();
        assert!(cfg.esxi.insecure);
        assert_eq!(cfg.esxi.base_url().unwrap(), "https://vc.lab:8443");
        assert_eq!(cfg.server.bind_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(cfg.log_format, LogFormat::Json);
        assert_eq!(cfg.log_filter, "debug");
    }

    #[test]
    fn unparsable_values_are_rejected() {
        let base = [("ESXI_HOST", "h"), ("ESXI_PASSWORD", "pw")];
        let with = |extra: (&'static str, &'static str)| {
            let mut v = base.to_vec();
            v.push(extra);
            load(&v).unwrap_err()
        };

        assert!(matches!(with(("MCP_PORT", "70000")), ConfigError::Invalid { name: "MCP_PORT", .. }));
        assert!(matches!(with(("MCP_HOST", "localhost:1")), ConfigError::Invalid { name: "MCP_HOST", .. }));
        assert!(matches!(with(("ESXI_INSECURE", "maybe")), ConfigError::Invalid { name: "ESXI_INSECURE", .. }));
        assert!(matches!(with(("LOG_FORMAT", "xml")), ConfigError::Invalid { name: "LOG_FORMAT", .. }));
    }

    #[test]
    fn malformed_host_is_rejected() {
        let err = load(&[("ESXI_HOST", "http://"), ("ESXI_PASSWORD", "pw")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "ESXI_HOST", .. }));
    }
}
