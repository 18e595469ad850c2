//! TLS configuration and certificate loading.

use std::io;
use std::path::Path;

use axum_server::tls_rustls::RustlsConfig;

use crate::config::TlsConfig;

/// Load a rustls configuration from PEM certificate and key files.
pub async fn load_tls_config(tls: &TlsConfig) -> Result<RustlsConfig, io::Error> {
    let cert = Path::new(&tls.cert_path);
    let key = Path::new(&tls.key_path);

    for (what, path) in [("Certificate", cert), ("Private key", key)] {
        if !path.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{what} file not found: {}", path.display()),
            ));
        }
    }

    tracing::info!(cert = %cert.display(), "Loading TLS certificate");
    RustlsConfig::from_pem_file(cert, key).await
}
