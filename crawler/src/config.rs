use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{client::DEFAULT_TIMEOUT_SECS, RequestClient, Result};

/// A serializable description of a [`RequestClient`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub proxy: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default)]
    pub tls: Option<TlsSettings>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TlsSettings {
    Pinned {
        ca_cert: PathBuf,
        cert: PathBuf,
        key: PathBuf,
    },
    SkipVerify {
        skip_verify: bool,
    },
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            proxy: None,
            headers: Vec::new(),
            tls: None,
        }
    }

    pub fn into_client(self) -> Result<RequestClient> {
        let mut client = RequestClient::new(self.base_url);
        client.set_timeout(self.timeout_secs);
        for (name, value) in &self.headers {
            client.add_header(name, value)?;
        }
        match self.tls {
            Some(TlsSettings::Pinned { ca_cert, cert, key }) => {
                client.set_certificate(ca_cert, cert, key)?;
            }
            Some(TlsSettings::SkipVerify { skip_verify: true }) => {
                client.skip_certificate_verification();
            }
            Some(TlsSettings::SkipVerify { skip_verify: false }) | None => {}
        }
        if let Some(proxy) = self.proxy {
            client.set_proxy(proxy);
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::time::Duration;

    #[test]
    fn test_deserialize_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"base_url": "https://www.baidu.com"}"#).unwrap();
        assert_eq!(config, ClientConfig::new("https://www.baidu.com"));

        let client = config.into_client().unwrap();
        assert_eq!(client.timeout(), Some(Duration::from_secs(10)));
        assert!(client.tls().is_none());
    }

    #[test]
    fn test_deserialize_full() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "base_url": "https://www.google.com.hk",
                "timeout_secs": 5,
                "proxy": "http://localhost:7890",
                "headers": [["User-Agent", "crawler"], ["Accept", "text/html"], ["Accept", "*/*"]],
                "tls": {"skip_verify": true}
            }"#,
        )
        .unwrap();
        assert_eq!(
            config.tls,
            Some(TlsSettings::SkipVerify { skip_verify: true })
        );

        let client = config.into_client().unwrap();
        assert_eq!(client.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(client.proxy(), Some("http://localhost:7890"));
        assert!(client.tls().unwrap().is_verification_skipped());
        assert_eq!(client.headers().get_all("accept").iter().count(), 2);
    }

    #[test]
    fn test_pinned_missing_files() {
        let config: ClientConfig = serde_json::from_str(
            r#"{
                "base_url": "https://localhost",
                "tls": {"ca_cert": "/nonexistent/ca.pem", "cert": "/nonexistent/c.pem", "key": "/nonexistent/c.key"}
            }"#,
        )
        .unwrap();
        assert!(matches!(
            config.tls,
            Some(TlsSettings::Pinned { .. })
        ));
        assert!(matches!(
            config.into_client(),
            Err(Error::Certificate { .. })
        ));
    }
}
