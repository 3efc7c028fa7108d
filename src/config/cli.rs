//! Command line interface.
//!
//! Flags override values from the settings file, which in turn override the
//! built-in defaults.

use std::path::PathBuf;

use clap::Parser;

use crate::config::loader::{load_config, ConfigError};
use crate::config::schema::{ProxyConfig, TlsConfig};
use crate::config::validation::validate_config;

#[derive(Debug, Parser)]
#[command(name = "vhost-proxy")]
#[command(version, about = "TLS-terminating virtual host reverse proxy", long_about = None)]
pub struct Cli {
    /// Settings file (TOML). Defaults apply when omitted.
    #[arg(short, long, env = "VHOST_PROXY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Routing file: one section per virtual host with a `host` field.
    #[arg(short, long, env = "VHOST_PROXY_ROUTES")]
    pub routes: Option<PathBuf>,

    /// Listen address, e.g. 0.0.0.0:443.
    #[arg(short, long)]
    pub bind: Option<String>,

    /// TLS certificate (PEM).
    #[arg(long, requires = "key")]
    pub cert: Option<PathBuf>,

    /// TLS private key (PEM).
    #[arg(long, requires = "cert")]
    pub key: Option<PathBuf>,

    /// Reload the routing file whenever it changes on disk.
    #[arg(long)]
    pub watch: bool,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Cli {
    /// Resolve the effective configuration.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let base = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };
        let config = self.apply(base);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn apply(self, mut config: ProxyConfig) -> ProxyConfig {
        if let Some(routes) = self.routes {
            config.routes.path = routes;
        }
        if let Some(bind) = self.bind {
            config.listener.bind_address = bind;
        }
        if let (Some(cert_path), Some(key_path)) = (self.cert, self.key) {
            config.listener.tls = Some(TlsConfig {
                cert_path,
                key_path,
            });
        }
        if self.watch {
            config.routes.watch = true;
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        config
    }
}
