//! TLS support using rustls
//!
//! Certificates come from PEM files when both paths are configured, otherwise
//! a self-signed certificate is generated at startup. ALPN offers HTTP/1.1
//! only.

use crate::{Error, Result};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use tokio_rustls::TlsAcceptor;

/// TLS configuration
#[derive(Debug, Clone)]
pub struct TlsConfig {
    /// PEM certificate chain; self-signed when `None`
    pub cert_path: Option<String>,
    /// PEM private key; self-signed when `None`
    pub key_path: Option<String>,
    /// Names put on a generated certificate
    pub self_signed_names: Vec<String>,
    /// ALPN protocols (default: ["http/1.1"])
    pub alpn_protocols: Vec<Vec<u8>>,
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            cert_path: None,
            key_path: None,
            self_signed_names: vec!["localhost".to_string()],
            alpn_protocols: vec![b"http/1.1".to_vec()],
        }
    }
}

impl TlsConfig {
    /// Generated certificate for `localhost`
    pub fn self_signed() -> Self {
        Self::default()
    }

    /// Certificate and key from PEM files
    pub fn from_pem(cert_path: impl Into<String>, key_path: impl Into<String>) -> Self {
        Self {
            cert_path: Some(cert_path.into()),
            key_path: Some(key_path.into()),
            ..Self::default()
        }
    }

    /// Add a name to the generated certificate
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.self_signed_names.contains(&name) {
            self.self_signed_names.push(name);
        }
        self
    }

    /// Build rustls ServerConfig
    pub fn build_server_config(&self) -> Result<Arc<rustls::ServerConfig>> {
        let (certs, key) = match (&self.cert_path, &self.key_path) {
            (Some(cert), Some(key)) => (load_certs(cert)?, load_private_key(key)?),
            (None, None) => generate_self_signed(&self.self_signed_names)?,
            _ => {
                return Err(Error::Tls(
                    "certificate and key must be configured together".to_string(),
                ))
            }
        };

        let mut config = rustls::ServerConfig::builder()
            .with_no_client_auth()
            .with_single_cert(certs, key)
            .map_err(|e| Error::Tls(e.to_string()))?;
        config.alpn_protocols = self.alpn_protocols.clone();

        Ok(Arc::new(config))
    }

    /// Build a tokio acceptor
    pub fn acceptor(&self) -> Result<TlsAcceptor> {
        Ok(TlsAcceptor::from(self.build_server_config()?))
    }
}

/// Generate a self-signed certificate for the given names
pub fn generate_self_signed(
    names: &[String],
) -> Result<(Vec<CertificateDer<'static>>, PrivateKeyDer<'static>)> {
    let generated = rcgen::generate_simple_self_signed(names.to_vec())
        .map_err(|e| Error::Tls(format!("Failed to generate certificate: {}", e)))?;

    let cert = CertificateDer::from(generated.cert.der().to_vec());
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(generated.key_pair.serialize_der()));
    Ok((vec![cert], key))
}

/// Load certificates from PEM file
pub fn load_certs(path: &str) -> Result<Vec<CertificateDer<'static>>> {
    let file = File::open(Path::new(path))
        .map_err(|e| Error::Tls(format!("Failed to open cert file: {}", e)))?;
    let mut reader = BufReader::new(file);

    let certs = rustls_pemfile::certs(&mut reader)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| Error::Tls(format!("Failed to parse certs: {}", e)))?;

    if certs.is_empty() {
        return Err(Error::Tls("No certificates found in file".to_string()));
    }

    Ok(certs)
}

/// Load private key from PEM file
pub fn load_private_key(path: &str) -> Result<PrivateKeyDer<'static>> {
    let file = File::open(Path::new(path))
        .map_err(|e| Error::Tls(format!("Failed to open key file: {}", e)))?;
    let mut reader = BufReader::new(file);

    rustls_pemfile::private_key(&mut reader)
        .map_err(|e| Error::Tls(format!("Failed to parse key: {}", e)))?
        .ok_or_else(|| Error::Tls("No private key found in file".to_string()))
}
