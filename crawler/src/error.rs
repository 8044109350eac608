#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid certificate {}: {reason}", path.display())]
    Certificate {
        path: std::path::PathBuf,
        reason: String,
    },

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("[{0}] unsupported method")]
    UnsupportedMethod(String),

    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("[{method}]({url}) failed: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: TransportError,
    },

    #[error("[{method}]({url}) failed: {source}")]
    Request {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("[{method}]({url}) failed to read body: {source}")]
    Body {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl Error {
    pub(crate) fn certificate(path: impl Into<std::path::PathBuf>, reason: impl ToString) -> Self {
        Error::Certificate {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the request was abandoned because the configured deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Request { source, .. } | Error::Body { source, .. } => source.is_timeout(),
            _ => false,
        }
    }
}

/// A failed transport rebuild, kept by the client and reported on the next request.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("invalid proxy {proxy}: {reason}")]
    InvalidProxy {
        proxy: String,
        reason: String,
        #[source]
        source: std::sync::Arc<reqwest::Error>,
    },

    #[error("failed to build client: {reason}")]
    Build {
        reason: String,
        #[source]
        source: std::sync::Arc<reqwest::Error>,
    },
}

impl TransportError {
    pub(crate) fn invalid_proxy(proxy: &str, source: reqwest::Error) -> Self {
        TransportError::InvalidProxy {
            proxy: proxy.to_string(),
            reason: cause_chain(&source),
            source: std::sync::Arc::new(source),
        }
    }

    pub(crate) fn build(source: reqwest::Error) -> Self {
        TransportError::Build {
            reason: cause_chain(&source),
            source: std::sync::Arc::new(source),
        }
    }
}

/// Joins an error with its sources; reqwest's builder errors only say "builder error" on their own.
fn cause_chain(error: &(dyn std::error::Error + 'static)) -> String {
    let mut messages: Vec<String> = Vec::new();
    let mut next = Some(error);
    while let Some(error) = next {
        let message = error.to_string();
        if messages.last() != Some(&message) {
            messages.push(message);
        }
        next = error.source();
    }
    messages.join(": ")
}

pub type StdResult<T, E> = std::result::Result<T, E>;

pub type Result<T> = std::result::Result<T, Error>;

pub type TransportResult<T> = std::result::Result<T, TransportError>;
