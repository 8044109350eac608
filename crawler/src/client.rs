use std::{path::Path, time::Duration};

use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Url,
};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::{
    http::{FormValues, Method, Response},
    tls::TlsConfig,
    Error, Result, TransportError, TransportResult,
};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Issues GET and POST requests against a fixed base URL.
///
/// Changing the TLS or proxy settings rebuilds the underlying transport
/// right away. A rebuild that fails is remembered and returned by the next
/// [`RequestClient::execute`] instead of by the setter.
#[derive(Debug, Clone)]
pub struct RequestClient {
    base_url: String,
    timeout: Option<Duration>,
    tls: Option<TlsConfig>,
    proxy: Option<String>,
    headers: HeaderMap,
    transport: TransportResult<reqwest::Client>,
}

impl RequestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            tls: None,
            proxy: None,
            headers: HeaderMap::new(),
            transport: build_transport(None, None),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The per-request deadline; `None` waits indefinitely.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn proxy(&self) -> Option<&str> {
        self.proxy.as_deref()
    }

    pub fn tls(&self) -> Option<&TlsConfig> {
        self.tls.as_ref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Trusts only the roots in `ca_cert_path` and authenticates with the
    /// client certificate and key. Replaces any previous TLS setting.
    pub fn set_certificate(
        &mut self,
        ca_cert_path: impl AsRef<Path>,
        cert_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<&mut Self> {
        let tls = TlsConfig::load(ca_cert_path, cert_path, key_path)?;
        Ok(self.set_tls(tls))
    }

    /// Accepts any server certificate. Replaces any previous TLS setting.
    pub fn skip_certificate_verification(&mut self) -> &mut Self {
        warn!(base_url = %self.base_url, "server certificate verification disabled");
        self.set_tls(TlsConfig::SkipVerification)
    }

    pub fn set_tls(&mut self, tls: TlsConfig) -> &mut Self {
        self.tls = Some(tls);
        self.rebuild_transport()
    }

    /// Routes every request through `proxy`. The URL is only checked when
    /// the next request is made; an empty string means no proxy.
    pub fn set_proxy(&mut self, proxy: impl Into<String>) -> &mut Self {
        self.proxy = Some(proxy.into());
        self.rebuild_transport()
    }

    /// Zero disables the deadline.
    pub fn set_timeout(&mut self, seconds: u64) -> &mut Self {
        self.timeout = (seconds > 0).then(|| Duration::from_secs(seconds));
        self
    }

    /// Appends a value to the header sent with every request. Existing values
    /// for the same name are kept.
    pub fn add_header(&mut self, name: &str, value: &str) -> Result<&mut Self> {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::InvalidHeader(format!("{}: {}", name, e)))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Builds a fresh transport from the current TLS and proxy settings.
    pub fn rebuild_transport(&mut self) -> &mut Self {
        self.transport = build_transport(self.tls.as_ref(), self.proxy.as_deref());
        match &self.transport {
            Ok(_) => debug!(tls = ?self.tls, proxy = ?self.proxy, "transport rebuilt"),
            Err(e) => debug!(error = %e, "transport rebuild failed"),
        }
        self
    }

    /// Sends the request and returns the response body, whatever the status code.
    pub async fn execute(&self, method: &str, path: &str, form: &FormValues) -> Result<String> {
        self.send(method, path, form).await.map(|response| response.body)
    }

    /// Like [`RequestClient::execute`], also returning the status code.
    #[instrument(skip(self, form), fields(base_url = %self.base_url))]
    pub async fn send(&self, method: &str, path: &str, form: &FormValues) -> Result<Response> {
        let start = Instant::now();
        let parsed: Method = method.parse()?;
        let full = format!("{}{}", self.base_url, path);
        let mut url = Url::parse(&full).map_err(|source| Error::InvalidUrl { url: full, source })?;
        let body = match parsed {
            Method::Get => {
                let query = form.encode();
                url.set_query((!query.is_empty()).then_some(query.as_str()));
                None
            }
            Method::Post => Some(form.encode()),
        };
        let client = self
            .transport
            .as_ref()
            .map_err(|source| Error::Transport {
                method: method.to_string(),
                url: url.to_string(),
                source: source.clone(),
            })?;

        let mut request = client.request(parsed.into(), url.clone());
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(body);
        }
        request = request.headers(self.headers.clone());
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|source| Error::Request {
                method: method.to_string(),
                url: url.to_string(),
                source,
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|source| Error::Body {
            method: method.to_string(),
            url: url.to_string(),
            source,
        })?;
        debug!(%url, %status, elapsed = ?start.elapsed(), "request finished");
        Ok(Response { status, body })
    }
}

fn build_transport(
    tls: Option<&TlsConfig>,
    proxy: Option<&str>,
) -> TransportResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    if let Some(proxy) = proxy.filter(|proxy| !proxy.is_empty()) {
        let parsed =
            reqwest::Proxy::all(proxy).map_err(|e| TransportError::invalid_proxy(proxy, e))?;
        builder = builder.proxy(parsed);
    }
    if let Some(tls) = tls {
        builder = tls.apply(builder)?;
    }
    builder.build().map_err(TransportError::build)
}
