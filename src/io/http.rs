//! HTTP Range request reader for remote ZIP archives.
//!
//! Implements random-access reading from HTTP(S) servers using the Range
//! request header (RFC 7233), so listing a remote archive fetches only its
//! trailer and central directory and extracting a member fetches only that
//! member's bytes.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use reqwest::header::{ACCEPT_RANGES, CONTENT_LENGTH, LOCATION, RANGE};
use reqwest::{Client, Response, StatusCode, Url, redirect};

use super::{ByteStream, RangeReader};
use crate::error::{Error, Result};

/// Upper bound on manually followed redirect hops.
const MAX_REDIRECTS: usize = 10;

/// Request timeout applied to every HTTP call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP Range reader for remote ZIP archives.
///
/// The server must answer HEAD with a usable `Content-Length` and either
/// advertise `Accept-Ranges: bytes` or honour a probe `Range: bytes=0-0`
/// request. Redirects are resolved once, during [`connect`], by following
/// `Location` headers manually; every later read goes to the final URL.
///
/// [`connect`]: HttpRangeReader::connect
pub struct HttpRangeReader {
    client: Client,
    url: Url,
    len: u64,
    /// Cumulative payload bytes received, shared with in-flight streams.
    transferred: Arc<AtomicU64>,
}

impl HttpRangeReader {
    /// Resolve redirects, verify range support and read the source length.
    ///
    /// Failure of any of these steps means the archive cannot be explored
    /// remotely and surfaces as [`Error::SourceUnavailable`].
    pub async fn connect(url: &str) -> Result<Self> {
        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        let url = Url::parse(url)
            .map_err(|e| Error::SourceUnavailable(format!("invalid URL {url}: {e}")))?;
        let (url, head) = resolve_redirects(&client, url).await?;

        if !head.status().is_success() {
            return Err(Error::SourceUnavailable(format!(
                "HEAD {url} failed with status {}",
                head.status()
            )));
        }

        let len = head
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| {
                Error::SourceUnavailable(format!("{url}: server did not return Content-Length"))
            })?;

        let advertises_ranges = head
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains("bytes"));

        let reader = Self { client, url, len, transferred: Arc::new(AtomicU64::new(0)) };

        if !advertises_ranges {
            // No Accept-Ranges header; a successful one-byte ranged GET
            // still establishes range support.
            reader.probe_range_support().await?;
        }

        Ok(reader)
    }

    /// Cumulative payload bytes received from the server.
    pub fn transferred_bytes(&self) -> u64 {
        self.transferred.load(Ordering::Relaxed)
    }

    /// The resolved URL reads are issued against.
    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn probe_range_support(&self) -> Result<()> {
        let resp = self
            .client
            .get(self.url.clone())
            .header(RANGE, "bytes=0-0")
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("range probe failed: {e}")))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            Err(Error::SourceUnavailable(format!(
                "server does not support Range requests (probe status {})",
                resp.status()
            )))
        }
    }

    /// Issue `Range: bytes=<start>-<end-inclusive>` and require a 2xx
    /// response, preferably `206 Partial Content`.
    async fn range_get(&self, offset: u64, length: u64) -> Result<Response> {
        let range = format!("bytes={}-{}", offset, offset + length - 1);
        let resp = self.client.get(self.url.clone()).header(RANGE, &range).send().await?;

        match resp.status() {
            status if status.is_success() => Ok(resp),
            status => Err(Error::SourceUnavailable(format!(
                "range request {range} failed with status {status}"
            ))),
        }
    }
}

#[async_trait]
impl RangeReader for HttpRangeReader {
    fn len(&self) -> u64 {
        self.len
    }

    async fn read(&self, offset: u64, length: u64) -> Result<Bytes> {
        if length == 0 {
            return Ok(Bytes::new());
        }

        let resp = self.range_get(offset, length).await?;
        let partial = resp.status() == StatusCode::PARTIAL_CONTENT;
        let body = resp.bytes().await?;

        // A 200 answer carries the whole resource; only the requested
        // slice is ours to return.
        let body = match (partial, body.len() as u64) {
            (true, n) if n == length => body,
            (false, n) if n >= offset + length => {
                body.slice(offset as usize..(offset + length) as usize)
            }
            (_, n) => {
                return Err(Error::MalformedArchive(format!(
                    "range {offset}+{length} returned {n} bytes"
                )));
            }
        };

        self.transferred.fetch_add(body.len() as u64, Ordering::Relaxed);
        Ok(body)
    }

    async fn read_stream(&self, offset: u64, length: u64) -> Result<ByteStream> {
        if length == 0 {
            return Ok(futures_util::stream::empty().boxed());
        }

        let resp = self.range_get(offset, length).await?;
        let transferred = Arc::clone(&self.transferred);
        let stream = resp.bytes_stream().map(move |chunk| match chunk {
            Ok(bytes) => {
                transferred.fetch_add(bytes.len() as u64, Ordering::Relaxed);
                Ok(bytes)
            }
            Err(e) => Err(std::io::Error::other(e)),
        });
        Ok(stream.boxed())
    }
}

/// Follow 3xx responses via HEAD until the first non-redirect, resolving
/// relative `Location` values against the current URL.
async fn resolve_redirects(client: &Client, mut url: Url) -> Result<(Url, Response)> {
    for _ in 0..MAX_REDIRECTS {
        let resp = client
            .head(url.clone())
            .send()
            .await
            .map_err(|e| Error::SourceUnavailable(format!("HEAD {url}: {e}")))?;

        if !resp.status().is_redirection() {
            return Ok((url, resp));
        }

        let location = resp
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                Error::SourceUnavailable(format!("{url}: redirect without Location header"))
            })?;

        url = url
            .join(location)
            .map_err(|e| Error::SourceUnavailable(format!("invalid redirect target {location}: {e}")))?;
    }

    Err(Error::SourceUnavailable(format!("too many redirects (> {MAX_REDIRECTS})")))
}
