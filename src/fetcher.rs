use std::error::Error as StdError;
use std::time::Duration;

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::redirect::Policy;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::{
    ACCEPT_HTML, ACCEPT_LANGUAGE, FETCH_TIMEOUT_SECS, MAX_BODY_BYTES, MAX_REDIRECTS, USER_AGENT,
};

#[derive(Debug, Error)]
pub enum FetchError {
    /// DNS, connect, TLS, timeout, redirect-limit or body read failure.
    #[error("{0}")]
    Transport(String),

    /// Certificate validation failed, and so did the single relaxed retry.
    #[error("{0}")]
    CertificateRetryFailed(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Certificate handling for a single fetch call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsPolicy {
    Verify,
    AcceptInvalid,
}

#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub final_url: String,
    pub body: String,
}

/// Retrieves raw markup for a URL. Any HTTP status counts as a successful
/// transport outcome; only transport-level failures are errors.
///
/// Both TLS policies are materialised as separate clients up front, so the
/// relaxed retry is a per-call choice and never touches shared state.
#[derive(Clone)]
pub struct DocumentFetcher {
    verified: reqwest::Client,
    relaxed: reqwest::Client,
}

impl DocumentFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Ok(Self {
            verified: build_client(TlsPolicy::Verify)?,
            relaxed: build_client(TlsPolicy::AcceptInvalid)?,
        })
    }

    /// Fetch with certificate validation on; a certificate failure is retried
    /// exactly once with validation relaxed for that call only.
    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, FetchError> {
        match self.fetch_with(url, TlsPolicy::Verify).await {
            Ok(page) => Ok(page),
            Err(e) if is_certificate_error(&e) => {
                warn!(
                    event = "FETCH_CERT_RETRY",
                    url = %url,
                    "certificate validation failed, retrying once without it: {}",
                    describe(&e)
                );
                self.fetch_with(url, TlsPolicy::AcceptInvalid)
                    .await
                    .map_err(|e| FetchError::CertificateRetryFailed(describe(&e)))
            }
            Err(e) => Err(FetchError::Transport(describe(&e))),
        }
    }

    pub async fn fetch_with(
        &self,
        url: &str,
        policy: TlsPolicy,
    ) -> Result<FetchedPage, reqwest::Error> {
        let client = match policy {
            TlsPolicy::Verify => &self.verified,
            TlsPolicy::AcceptInvalid => &self.relaxed,
        };

        let resp = client.get(url).send().await?;
        let status = resp.status().as_u16();
        let final_url = resp.url().to_string();
        let body = read_capped(resp, MAX_BODY_BYTES).await?;

        debug!(
            event = "FETCHED",
            url = %url,
            final_url = %final_url,
            status,
            bytes = body.len(),
            "fetched page"
        );

        Ok(FetchedPage { status, final_url, body })
    }
}

/// Read at most `cap` bytes of the body and decode it lossily. The
/// connection is dropped once the cap is hit.
async fn read_capped(mut resp: reqwest::Response, cap: usize) -> Result<String, reqwest::Error> {
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = resp.chunk().await? {
        let room = cap - buf.len();
        if chunk.len() >= room {
            buf.extend_from_slice(&chunk[..room]);
            debug!(event = "BODY_TRUNCATED", cap, "response body truncated");
            break;
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn build_client(policy: TlsPolicy) -> Result<reqwest::Client, FetchError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
    headers.insert(header::ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE));

    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(policy == TlsPolicy::AcceptInvalid)
        .build()
        .map_err(|e| FetchError::Client(e.to_string()))
}

/// True when any error in the source chain reports a certificate problem.
pub fn is_certificate_error(err: &(dyn StdError + 'static)) -> bool {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        let msg = e.to_string().to_lowercase();
        if msg.contains("certificate")
            || msg.contains("self signed")
            || msg.contains("self-signed")
            || msg.contains("unable to get local issuer")
        {
            return true;
        }
        current = e.source();
    }
    false
}

/// Flatten an error and its sources into one line.
fn describe(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut current = err.source();
    while let Some(e) = current {
        let msg = e.to_string();
        if !parts.iter().any(|p| p.contains(&msg)) {
            parts.push(msg);
        }
        current = e.source();
    }
    parts.join(": ")
}
