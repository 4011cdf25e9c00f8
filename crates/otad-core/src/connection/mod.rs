//! HTTP connection layer: availability probe and range-aware GET.
//!
//! Thin wrapper over a blocking `reqwest` client with bounded connect/read
//! timeouts. Opening a request retries pure connection failures with backoff;
//! HTTP-level errors are returned to the caller untouched.

mod parse;

use std::io::{self, Read};
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{CONTENT_RANGE, RANGE};
use reqwest::StatusCode;

use crate::config::OtadConfig;
use crate::retry::{run_with_retry, RetryPolicy, TransferError};

/// Handle to an open GET response. The body is a live stream and must be
/// consumed (or dropped) exactly once.
pub struct ResponseHandle {
    /// Numeric HTTP status of the response.
    pub status_code: u16,
    /// `Content-Length` of the body, if the server sent one. For a partial
    /// response this is the length of the remaining range, not the file.
    pub content_length: Option<u64>,
    /// Total file size parsed from `Content-Range: bytes a-b/total`, if the
    /// response is partial content and the header was parsable.
    pub content_range_total: Option<u64>,
    body: reqwest::blocking::Response,
}

impl ResponseHandle {
    /// True if the status is in the 2xx success range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// True if the server honored a range request (206 Partial Content).
    pub fn is_partial_content(&self) -> bool {
        self.status_code == StatusCode::PARTIAL_CONTENT.as_u16()
    }
}

impl Read for ResponseHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.body.read(buf)
    }
}

/// Stateless HTTP client wrapper used by the download task.
#[derive(Clone)]
pub struct ConnectionManager {
    client: Client,
    retry: RetryPolicy,
}

impl ConnectionManager {
    /// Create a client with bounded connect/read timeouts. `retry` applies
    /// only to connection failures when opening a request.
    pub fn new(connect_timeout: Duration, read_timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(read_timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, retry })
    }

    /// Create a client from loaded configuration.
    pub fn from_config(cfg: &OtadConfig) -> Result<Self> {
        Self::new(
            Duration::from_secs(cfg.connect_timeout_secs),
            Duration::from_secs(cfg.read_timeout_secs),
            cfg.retry_policy(),
        )
    }

    /// HEAD request; true iff the response status is in the success range.
    /// Any transport error yields false, never an error.
    pub fn probe_availability(&self, url: &str) -> bool {
        match self.client.head(url).send() {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::warn!(url, error = %e, "availability probe failed");
                false
            }
        }
    }

    /// Open a GET request, adding `Range: bytes=<start>-` when `start_byte`
    /// is non-zero. Connection failures are retried per the configured policy.
    pub fn open_range_request(
        &self,
        url: &str,
        start_byte: u64,
    ) -> Result<ResponseHandle, TransferError> {
        let response = run_with_retry(&self.retry, || {
            let mut request = self.client.get(url);
            if start_byte > 0 {
                request = request.header(RANGE, format!("bytes={}-", start_byte));
            }
            request.send().map_err(TransferError::from)
        })?;

        let status_code = response.status().as_u16();
        let content_length = response.content_length();
        let content_range_total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v| v.to_str().ok())
            .and_then(parse::content_range_total);

        tracing::debug!(
            url,
            start_byte,
            status_code,
            content_length,
            version = ?response.version(),
            "connection opened"
        );

        Ok(ResponseHandle {
            status_code,
            content_length,
            content_range_total,
            body: response,
        })
    }
}
