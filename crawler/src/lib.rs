mod error;

pub mod client;
pub mod config;
pub mod http;
pub mod tls;

pub use client::RequestClient;
pub use config::ClientConfig;
pub use error::*;
pub use http::{FormValues, Method, Response};
pub use tls::TlsConfig;
