use std::{fmt, fs, path::Path};

use reqwest::{Certificate, ClientBuilder, Identity};

use crate::{Error, Result, TransportError, TransportResult};

/// TLS settings installed on the transport. Only one mode is active at a time.
#[derive(Clone)]
pub enum TlsConfig {
    /// Trust only the pinned roots and present a client certificate (mutual TLS).
    Pinned(PinnedTls),
    /// Accept any server certificate, whatever its issuer, validity or host name.
    SkipVerification,
}

#[derive(Clone)]
pub struct PinnedTls {
    roots: Vec<Certificate>,
    identity_pem: Vec<u8>,
}

impl PinnedTls {
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    fn identity(&self) -> reqwest::Result<Identity> {
        Identity::from_pem(&self.identity_pem)
    }
}

impl TlsConfig {
    /// Loads a PEM root CA bundle and a PEM client certificate/private key pair.
    pub fn load(
        ca_cert_path: impl AsRef<Path>,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<Self> {
        let ca_cert_path = ca_cert_path.as_ref();
        let ca = read(ca_cert_path)?;
        let roots = Certificate::from_pem_bundle(&ca)
            .map_err(|e| Error::certificate(ca_cert_path, e))?;
        if roots.is_empty() {
            return Err(Error::certificate(ca_cert_path, "no PEM certificate found"));
        }

        let cert_path = cert_path.as_ref();
        let key_path = key_path.as_ref();
        let mut identity_pem = read(cert_path)?;
        if !identity_pem.ends_with(b"\n") {
            identity_pem.push(b'\n');
        }
        identity_pem.extend(read(key_path)?);

        let pinned = PinnedTls {
            roots,
            identity_pem,
        };
        pinned.identity().map_err(|e| {
            Error::certificate(
                cert_path,
                format!("cannot pair with key {}: {}", key_path.display(), e),
            )
        })?;
        Ok(TlsConfig::Pinned(pinned))
    }

    pub fn is_verification_skipped(&self) -> bool {
        matches!(self, TlsConfig::SkipVerification)
    }

    pub(crate) fn apply(&self, builder: ClientBuilder) -> TransportResult<ClientBuilder> {
        match self {
            TlsConfig::Pinned(pinned) => {
                let identity = pinned
                    .identity()
                    .map_err(TransportError::build)?;
                let builder = pinned
                    .roots
                    .iter()
                    .cloned()
                    .fold(builder.tls_built_in_root_certs(false), |builder, root| {
                        builder.add_root_certificate(root)
                    });
                Ok(builder.identity(identity))
            }
            TlsConfig::SkipVerification => Ok(builder.danger_accept_invalid_certs(true)),
        }
    }
}

impl fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TlsConfig::Pinned(pinned) => f
                .debug_struct("Pinned")
                .field("roots", &pinned.root_count())
                .finish_non_exhaustive(),
            TlsConfig::SkipVerification => f.write_str("SkipVerification"),
        }
    }
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::certificate(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_pair(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
        let certified = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let cert = dir.join("client.pem");
        let key = dir.join("client.key");
        fs::write(&cert, certified.cert.pem()).unwrap();
        fs::write(&key, certified.key_pair.serialize_pem()).unwrap();
        (cert, key)
    }

    #[test]
    fn test_load() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, key) = write_pair(dir.path());
        let config = TlsConfig::load(&cert, &cert, &key).unwrap();
        assert!(!config.is_verification_skipped());
        assert_eq!(format!("{:?}", config), "Pinned { roots: 1, .. }");
        assert!(config.apply(reqwest::Client::builder()).is_ok());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.pem");
        let err = TlsConfig::load(&missing, &missing, &missing).unwrap_err();
        assert!(matches!(err, Error::Certificate { ref path, .. } if *path == missing));
    }

    #[test]
    fn test_load_empty_ca() {
        let dir = tempfile::tempdir().unwrap();
        let ca = dir.path().join("ca.pem");
        fs::write(&ca, "not a certificate").unwrap();
        let err = TlsConfig::load(&ca, &ca, &ca).unwrap_err();
        assert!(err.to_string().contains("ca.pem"));
    }

    #[test]
    fn test_load_key_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let (cert, _) = write_pair(dir.path());
        // a certificate in place of the key leaves the identity without a private key
        let err = TlsConfig::load(&cert, &cert, &cert).unwrap_err();
        assert!(matches!(err, Error::Certificate { ref path, .. } if *path == cert));
    }

    #[test]
    fn test_skip_verification() {
        let config = TlsConfig::SkipVerification;
        assert_eq!(format!("{:?}", config), "SkipVerification");
        assert!(config.is_verification_skipped());
        assert!(config.apply(reqwest::Client::builder()).is_ok());
    }
}
