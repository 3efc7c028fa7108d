//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde/toml handle syntax)
//! - Routing sections: every virtual host names exactly one `host:port`
//! - Settings: addresses parse, timeouts are non-zero
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the parsed document
//! - Runs before a config or routing table is accepted into the system

use std::collections::HashMap;
use std::net::SocketAddr;
use std::str::FromStr;

use axum::http::uri::Authority;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("[{section}] is not a section")]
    NotASection { section: String },

    #[error("[{section}] is missing required field `host`")]
    MissingHost { section: String },

    #[error("[{section}] has no `host`; a dotted virtual host must be quoted, as in [\"{dotted}\"]")]
    UnquotedSection { section: String, dotted: String },

    #[error("[{section}] field `host` must be a string")]
    HostNotString { section: String },

    #[error("[{section}] field `host` is empty")]
    EmptyHost { section: String },

    #[error("[{section}] host {value:?} must not carry a scheme")]
    SchemeInHost { section: String, value: String },

    #[error("[{section}] host {value:?} is not a valid host:port")]
    InvalidHost { section: String, value: String },

    #[error("[{section}] host {value:?} is missing a port")]
    MissingPort { section: String, value: String },

    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("observability.metrics_address {0:?} is not a socket address")]
    InvalidMetricsAddress(String),

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),

    #[error("listener.tls paths must not be empty")]
    EmptyTlsPath,
}

/// Validate the routing document and extract `virtual host -> backend`.
pub fn validate_sections(
    document: &toml::Table,
) -> Result<HashMap<String, String>, Vec<ValidationError>> {
    let mut routes = HashMap::with_capacity(document.len());
    let mut errors = Vec::new();

    for (section, value) in document {
        let Some(fields) = value.as_table() else {
            errors.push(ValidationError::NotASection {
                section: section.clone(),
            });
            continue;
        };

        let host = match fields.get("host") {
            // `[chat.example.com]` parses as nested tables `chat -> example -> com`.
            None if !fields.is_empty() && fields.values().all(toml::Value::is_table) => {
                errors.push(ValidationError::UnquotedSection {
                    section: section.clone(),
                    dotted: dotted_name(section, fields),
                });
                continue;
            }
            None => {
                errors.push(ValidationError::MissingHost {
                    section: section.clone(),
                });
                continue;
            }
            Some(toml::Value::String(host)) => host.trim(),
            Some(_) => {
                errors.push(ValidationError::HostNotString {
                    section: section.clone(),
                });
                continue;
            }
        };

        match check_backend(section, host) {
            Ok(()) => {
                routes.insert(section.clone(), host.to_string());
            }
            Err(e) => errors.push(e),
        }
    }

    if errors.is_empty() {
        Ok(routes)
    } else {
        Err(errors)
    }
}

/// Rebuild the name the user most likely meant from a chain of nested tables.
fn dotted_name(section: &str, mut fields: &toml::Table) -> String {
    let mut name = section.to_string();
    while !fields.contains_key("host") {
        let Some((key, toml::Value::Table(inner))) = fields.iter().next() else {
            break;
        };
        name.push('.');
        name.push_str(key);
        fields = inner;
    }
    name
}

fn check_backend(section: &str, host: &str) -> Result<(), ValidationError> {
    if host.is_empty() {
        return Err(ValidationError::EmptyHost {
            section: section.to_string(),
        });
    }
    if host.contains("://") {
        return Err(ValidationError::SchemeInHost {
            section: section.to_string(),
            value: host.to_string(),
        });
    }
    let authority = Authority::from_str(host).map_err(|_| ValidationError::InvalidHost {
        section: section.to_string(),
        value: host.to_string(),
    })?;
    // Userinfo ("user@host") is a valid authority but not a backend address.
    if authority.as_str().contains('@') {
        return Err(ValidationError::InvalidHost {
            section: section.to_string(),
            value: host.to_string(),
        });
    }
    if authority.port_u16().is_none() {
        return Err(ValidationError::MissingPort {
            section: section.to_string(),
            value: host.to_string(),
        });
    }
    Ok(())
}

/// Validate process settings.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.as_os_str().is_empty() || tls.key_path.as_os_str().is_empty() {
            errors.push(ValidationError::EmptyTlsPath);
        }
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidMetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    let timeouts = [
        ("connect_secs", config.timeouts.connect_secs),
        ("request_secs", config.timeouts.request_secs),
        ("close_secs", config.timeouts.close_secs),
    ];
    for (name, value) in timeouts {
        if value == 0 {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
