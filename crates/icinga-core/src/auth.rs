//! Authentication context for the Icinga 2 API.
//!
//! The API accepts either a client certificate signed by the Icinga CA or an
//! API user with basic authentication. [`AuthContext::resolve`] prefers the
//! certificate when all three PKI files exist for the node.

use crate::config::IcingaClientConfig;
use crate::{Error, Result};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolved credentials, immutable once constructed.
#[derive(Debug, Clone)]
pub enum AuthContext {
    /// Mutual TLS with a client certificate
    Certificate {
        /// PEM encoded client certificate
        cert_pem: Vec<u8>,
        /// PEM encoded private key
        key_pem: Vec<u8>,
        /// PEM encoded CA bundle
        ca_pem: Vec<u8>,
    },
    /// HTTP basic authentication
    Basic {
        /// API user
        user: String,
        /// API password
        password: SecretString,
    },
}

impl AuthContext {
    /// Basic authentication context.
    #[must_use]
    pub fn basic(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            user: user.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Whether TLS peer verification is performed.
    ///
    /// Always `false`: the Icinga API is reached with peer verification disabled
    /// in both modes.
    #[must_use]
    pub const fn verify_ssl(&self) -> bool {
        false
    }

    /// Returns true for the client certificate mode.
    #[must_use]
    pub const fn is_certificate(&self) -> bool {
        matches!(self, Self::Certificate { .. })
    }

    /// Load a certificate context from `<pki>/<node>.crt`, `<pki>/<node>.key`
    /// and `<pki>/ca.crt`.
    ///
    /// Returns `Ok(None)` when any of the files is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a file exists but cannot be read.
    pub fn from_pki(pki_path: &Path, node_name: &str) -> Result<Option<Self>> {
        let files = PkiFiles::new(pki_path, node_name);
        if !files.all_present() {
            return Ok(None);
        }

        Ok(Some(Self::Certificate {
            cert_pem: read_pem(&files.cert)?,
            key_pem: read_pem(&files.key)?,
            ca_pem: read_pem(&files.ca)?,
        }))
    }

    /// Select certificate or basic authentication for the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if certificate files cannot be read, or if no
    /// certificate is available and no user is configured.
    pub fn resolve(config: &IcingaClientConfig) -> Result<Self> {
        if let Some(pki_path) = &config.pki_path {
            let node_name = config.node_name();
            if let Some(auth) = Self::from_pki(pki_path, &node_name)? {
                debug!(node = %node_name, "PKI found, using client certificates for the Icinga 2 API");
                return Ok(auth);
            }
        }

        debug!("PKI not found, using basic auth for the Icinga 2 API");

        let user = config.user.clone().ok_or_else(|| {
            Error::ConfigError("no client certificate found and no API user configured".to_string())
        })?;

        Ok(Self::Basic {
            user,
            password: config
                .password
                .clone()
                .unwrap_or_else(|| SecretString::from(String::new())),
        })
    }
}

struct PkiFiles {
    cert: PathBuf,
    key: PathBuf,
    ca: PathBuf,
}

impl PkiFiles {
    fn new(pki_path: &Path, node_name: &str) -> Self {
        Self {
            cert: pki_path.join(format!("{node_name}.crt")),
            key: pki_path.join(format!("{node_name}.key")),
            ca: pki_path.join("ca.crt"),
        }
    }

    fn all_present(&self) -> bool {
        self.cert.is_file() && self.key.is_file() && self.ca.is_file()
    }
}

fn read_pem(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|err| Error::ConfigError(format!("Failed to read {}: {err}", path.display())))
}
