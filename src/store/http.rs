//! HTTP range-request implementation of [`ObjectStore`].
//!
//! Objects live under a base URL; `get_range` issues `Range: bytes=a-b`
//! requests and `head` probes the object size with a one-byte range request,
//! reading the total from `Content-Range`. A plain HEAD is not used because
//! several object gateways omit or zero `Content-Length` on HEAD responses,
//! while the `Content-Range` total on a 206 is authoritative.

use std::ops::Range;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_RANGE, RANGE};
use reqwest::{Client, ClientBuilder, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::{ObjectMeta, ObjectStore, StoreError};

/// Default HTTP connect timeout (30 seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

/// Default HTTP read timeout (5 minutes, sized for multi-megabyte chunks).
pub const READ_TIMEOUT_SECS: u64 = 300;

/// Object store over HTTP(S) range requests.
///
/// The client is created once and reused across requests, taking advantage
/// of connection pooling. Compression is requested as `identity` on every
/// call: range reads address exact bytes, and transparent transforms would
/// break that addressing.
#[derive(Debug, Clone)]
pub struct HttpStore {
    client: Client,
    base: Url,
}

impl HttpStore {
    /// Creates a store rooted at `base` with default timeouts.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new(base: Url) -> Self {
        Self::new_with_timeouts(base, CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a store rooted at `base` with explicit timeout values.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails to build with the supplied
    /// timeout configuration.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new_with_timeouts(base: Url, connect_timeout_secs: u64, read_timeout_secs: u64) -> Self {
        let client = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self {
            client,
            base: ensure_trailing_slash(base),
        }
    }

    fn object_url(&self, path: &str) -> Result<Url, StoreError> {
        self.base
            .join(path.trim_start_matches('/'))
            .map_err(|e| StoreError::backend(path, format!("invalid object path: {e}")))
    }

    async fn send_range(
        &self,
        path: &str,
        range_header: &str,
    ) -> Result<reqwest::Response, StoreError> {
        let url = self.object_url(path)?;
        self.client
            .get(url)
            .header(RANGE, range_header)
            .header(ACCEPT_ENCODING, "identity")
            .send()
            .await
            .map_err(|e| map_reqwest_error(path, e))
    }
}

#[async_trait]
impl ObjectStore for HttpStore {
    #[instrument(level = "debug", skip(self))]
    async fn head(&self, path: &str) -> Result<ObjectMeta, StoreError> {
        let resp = self.send_range(path, "bytes=0-0").await?;

        let size = match resp.status() {
            StatusCode::PARTIAL_CONTENT => content_range_total(path, resp.headers())?,
            // Server ignored the range request; the whole representation tells
            // us the size just as well.
            StatusCode::OK => resp.content_length().ok_or_else(|| {
                StoreError::backend(path, "200 response without Content-Length")
            })?,
            // A one-byte probe of an empty object is unsatisfiable, but the
            // 416 still carries the total length.
            StatusCode::RANGE_NOT_SATISFIABLE => content_range_total(path, resp.headers())?,
            status => return Err(map_status(path, status.as_u16())),
        };

        debug!(path, size, "probed object size");
        Ok(ObjectMeta { size })
    }

    #[instrument(level = "debug", skip(self), fields(start = range.start, end = range.end))]
    async fn get_range(&self, path: &str, range: Range<u64>) -> Result<Bytes, StoreError> {
        if range.start >= range.end {
            return Ok(Bytes::new());
        }

        let range_header = format!("bytes={}-{}", range.start, range.end - 1);
        let resp = self.send_range(path, &range_header).await?;

        match resp.status() {
            StatusCode::PARTIAL_CONTENT => {
                let requested = (range.end - range.start) as usize;
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| map_reqwest_error(path, e))?;
                // Servers clamp ranges past EOF; a body longer than requested
                // would mean the server answered a different range.
                if body.len() > requested {
                    return Ok(body.slice(..requested));
                }
                Ok(body)
            }
            StatusCode::OK if range.start == 0 => {
                // Range ignored but the representation starts where we asked.
                let requested = (range.end - range.start) as usize;
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| map_reqwest_error(path, e))?;
                if body.len() > requested {
                    return Ok(body.slice(..requested));
                }
                Ok(body)
            }
            StatusCode::OK => Err(StoreError::backend(
                path,
                format!("server ignored range request starting at {}", range.start),
            )),
            StatusCode::RANGE_NOT_SATISFIABLE => Err(StoreError::invalid_range(
                path,
                format!("unsatisfiable range [{}, {})", range.start, range.end),
            )),
            status => Err(map_status(path, status.as_u16())),
        }
    }
}

fn ensure_trailing_slash(mut base: Url) -> Url {
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base
}

fn map_reqwest_error(path: &str, error: reqwest::Error) -> StoreError {
    if error.is_timeout() {
        StoreError::timeout(path)
    } else {
        StoreError::network(path, error)
    }
}

/// Maps an HTTP status code onto the store error taxonomy.
fn map_status(path: &str, status: u16) -> StoreError {
    match status {
        404 | 410 => StoreError::not_found(path),
        401 | 403 => StoreError::permission_denied(path),
        408 => StoreError::timeout(path),
        status => StoreError::http(path, status),
    }
}

/// Extracts the total object size from a `Content-Range` header
/// (`bytes a-b/N` or `bytes */N`).
fn content_range_total(
    path: &str,
    headers: &reqwest::header::HeaderMap,
) -> Result<u64, StoreError> {
    let raw = headers
        .get(CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| StoreError::backend(path, "missing Content-Range header"))?;

    parse_content_range_total(raw)
        .ok_or_else(|| StoreError::backend(path, format!("malformed Content-Range: {raw}")))
}

fn parse_content_range_total(raw: &str) -> Option<u64> {
    let spec = raw.trim();
    let rest = spec
        .strip_prefix("bytes ")
        .or_else(|| spec.strip_prefix("bytes\t"))?;
    let (_, total) = rest.split_once('/')?;
    if total == "*" {
        return None;
    }
    total.trim().parse().ok()
}
