//! Privileged downstream system
//!
//! The only place the real credential leaves the process. [`HttpDownstream`]
//! attaches it as a bearer token to calls the checkpoint has already
//! authorized.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE, USER_AGENT};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use zeroize::Zeroizing;

/// Bearer credential for the downstream system. Never printed.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Error, Debug)]
pub enum DownstreamError {
    #[error("target endpoint escapes the downstream origin: {0}")]
    InvalidTarget(String),

    #[error("downstream timed out")]
    Timeout,

    #[error("downstream unreachable: {0}")]
    Transport(String),
}

/// An authorized call, forwarded verbatim.
#[derive(Debug, Clone, Copy)]
pub struct ForwardCall<'a> {
    pub method: &'a Method,
    pub endpoint: &'a str,
    pub body: &'a Value,
}

/// Whatever the downstream answered, success or not.
#[derive(Debug, Clone)]
pub struct DownstreamResponse {
    pub status: StatusCode,
    pub body: Value,
}

pub trait Downstream: Send + Sync {
    /// Where calls go, for logs and the health check.
    fn describe(&self) -> String;

    fn forward(
        &self,
        credential: &Credential,
        call: ForwardCall<'_>,
    ) -> impl Future<Output = Result<DownstreamResponse, DownstreamError>> + Send;
}

pub struct HttpDownstream {
    client: Client,
    base_url: Url,
}

impl HttpDownstream {
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))?;
        if base_url.cannot_be_a_base() || base_url.host_str().is_none() {
            anyhow::bail!("downstream base URL must be absolute: {base_url}");
        }

        let client = Client::builder()
            .timeout(timeout)
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    ACCEPT,
                    reqwest::header::HeaderValue::from_static("application/vnd.github.v3+json"),
                );
                headers.insert(USER_AGENT, reqwest::header::HeaderValue::from_str(user_agent)?);
                headers
            })
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Join `endpoint` onto the base URL, refusing anything that lands on
    /// another origin.
    pub fn url_for(&self, endpoint: &str) -> Result<Url, DownstreamError> {
        let joined = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), endpoint);
        let url = Url::parse(&joined).map_err(|_| DownstreamError::InvalidTarget(endpoint.into()))?;
        if url.origin() != self.base_url.origin() || !url.username().is_empty() {
            return Err(DownstreamError::InvalidTarget(endpoint.into()));
        }
        Ok(url)
    }
}

impl Downstream for HttpDownstream {
    fn describe(&self) -> String {
        self.base_url.to_string()
    }

    async fn forward(
        &self,
        credential: &Credential,
        call: ForwardCall<'_>,
    ) -> Result<DownstreamResponse, DownstreamError> {
        let url = self.url_for(call.endpoint)?;
        let mut request = self
            .client
            .request(call.method.clone(), url)
            .bearer_auth(credential.expose());
        if *call.method != Method::GET {
            request = request
                .header(CONTENT_TYPE, "application/json")
                .json(call.body);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                DownstreamError::Timeout
            } else {
                DownstreamError::Transport(e.to_string())
            }
        })?;

        let status = resp.status();
        let bytes = resp.bytes().await.map_err(|e| {
            if e.is_timeout() {
                DownstreamError::Timeout
            } else {
                DownstreamError::Transport(e.to_string())
            }
        })?;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        tracing::debug!(%status, "downstream responded");
        Ok(DownstreamResponse { status, body })
    }
}
