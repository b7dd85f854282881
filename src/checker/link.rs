//! Single-attempt reachability checks
//!
//! [`LinkCheck`] is the transport capability the prober drives: given a
//! location and a timeout it performs one lightweight check and returns a
//! verdict. [`HttpLinkChecker`] is the network implementation; tests plug in
//! scripted doubles.

use async_trait::async_trait;
use reqwest::{
    header::{HeaderValue, RANGE},
    redirect, Client, Method, StatusCode,
};
use std::time::Duration;
use tokio::net::TcpStream;
use url::Url;

use crate::config::{ProbeMethod, ProbePolicy};
use crate::utils::error::ProbeError;

/// One reachability attempt against a location
#[async_trait]
pub trait LinkCheck: Send + Sync {
    /// Check `location` once
    ///
    /// Returns the deciding status code (`None` for non-HTTP handshakes) when
    /// the location counts as reachable.
    async fn check(&self, location: &str, timeout: Duration) -> Result<Option<u16>, ProbeError>;
}

/// Judge a final HTTP status under `policy`
pub fn classify_status(policy: &ProbePolicy, status: u16) -> Result<u16, ProbeError> {
    match status {
        200..=299 => Ok(status),
        301 | 302 | 303 | 307 | 308 if policy.redirects_are_reachable => Ok(status),
        _ => Err(ProbeError::Status(status)),
    }
}

/// Default port for TCP-checked streaming schemes
fn default_tcp_port(scheme: &str) -> Option<u16> {
    match scheme {
        "rtmp" => Some(1935),
        "rtmps" => Some(443),
        "rtsp" => Some(554),
        "mms" => Some(1755),
        _ => None,
    }
}

fn map_reqwest_error(err: reqwest::Error) -> ProbeError {
    if err.is_timeout() {
        ProbeError::Timeout
    } else if err.is_connect() {
        ProbeError::Connect(err.to_string())
    } else if err.is_builder() {
        ProbeError::InvalidUrl(err.to_string())
    } else {
        ProbeError::Http(err)
    }
}

/// Network-backed reachability checker
///
/// HTTP(S) locations get a HEAD (or ranged GET) request whose status is
/// judged by the [`ProbePolicy`]; streaming schemes such as RTMP get a TCP
/// handshake. Response bodies are never read.
pub struct HttpLinkChecker {
    client: Client,
    policy: ProbePolicy,
}

impl HttpLinkChecker {
    /// Create a checker for the given policy
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::Http` if the HTTP client cannot be created
    pub fn new(policy: ProbePolicy) -> Result<Self, ProbeError> {
        let redirect_policy = if policy.follow_redirects {
            redirect::Policy::limited(policy.max_redirects)
        } else {
            redirect::Policy::none()
        };

        let client = Client::builder()
            .user_agent(&policy.user_agent)
            .redirect(redirect_policy)
            .gzip(true)
            .build()?;

        Ok(Self { client, policy })
    }

    pub fn policy(&self) -> &ProbePolicy {
        &self.policy
    }

    async fn send(&self, method: Method, url: Url, timeout: Duration) -> Result<u16, ProbeError> {
        let mut request = self.client.request(method.clone(), url).timeout(timeout);
        if method == Method::GET {
            request = request.header(RANGE, HeaderValue::from_static("bytes=0-0"));
        }

        let response = request.send().await.map_err(map_reqwest_error)?;
        Ok(response.status().as_u16())
    }

    async fn check_http(&self, url: Url, timeout: Duration) -> Result<Option<u16>, ProbeError> {
        let method = match self.policy.method {
            ProbeMethod::Head => Method::HEAD,
            ProbeMethod::Get => Method::GET,
        };

        let mut status = self.send(method.clone(), url.clone(), timeout).await?;

        let head_refused = status == StatusCode::METHOD_NOT_ALLOWED.as_u16()
            || status == StatusCode::NOT_IMPLEMENTED.as_u16();
        if method == Method::HEAD && head_refused && self.policy.get_fallback {
            tracing::debug!(url = %url, status, "HEAD refused, retrying as GET");
            status = self.send(Method::GET, url, timeout).await?;
        }

        classify_status(&self.policy, status).map(Some)
    }

    async fn check_tcp(&self, url: &Url, timeout: Duration) -> Result<Option<u16>, ProbeError> {
        let host = url
            .host_str()
            .ok_or_else(|| ProbeError::InvalidUrl(format!("{url}: missing host")))?;
        let port = url
            .port()
            .or_else(|| default_tcp_port(url.scheme()))
            .ok_or_else(|| ProbeError::InvalidUrl(format!("{url}: missing port")))?;

        match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
            Ok(Ok(_stream)) => Ok(None),
            Ok(Err(e)) => Err(ProbeError::Connect(e.to_string())),
            Err(_) => Err(ProbeError::Timeout),
        }
    }
}

#[async_trait]
impl LinkCheck for HttpLinkChecker {
    async fn check(&self, location: &str, timeout: Duration) -> Result<Option<u16>, ProbeError> {
        let url = Url::parse(location.trim())
            .map_err(|e| ProbeError::InvalidUrl(format!("{location}: {e}")))?;

        let scheme = url.scheme().to_string();
        match scheme.as_str() {
            "http" | "https" => self.check_http(url, timeout).await,
            s if self.policy.is_tcp_scheme(s) => self.check_tcp(&url, timeout).await,
            _ => Err(ProbeError::UnsupportedScheme(scheme.clone())),
        }
    }
}
