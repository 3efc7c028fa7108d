//! TLS configuration and certificate loading.

use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;
use crate::net::listener::ListenerError;

/// Load the listener's rustls configuration from PEM certificate and key.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, ListenerError> {
    require_file(&config.cert_path, "Certificate")?;
    require_file(&config.key_path, "Private key")?;

    let tls = RustlsConfig::from_pem_file(&config.cert_path, &config.key_path)
        .await
        .map_err(ListenerError::Tls)?;

    tracing::info!(cert = ?config.cert_path, "TLS certificate loaded");
    Ok(tls)
}

fn require_file(path: &Path, what: &str) -> Result<(), ListenerError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ListenerError::Tls(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} file not found: {:?}", what, path),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_certificate_is_reported() {
        let config = TlsConfig {
            cert_path: "/nonexistent/cert.pem".into(),
            key_path: "/nonexistent/key.pem".into(),
        };
        let err = load_tls_config(&config).await.unwrap_err();
        assert!(err.to_string().contains("Certificate file not found"));
    }
}
