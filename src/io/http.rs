use async_trait::async_trait;
use jiff::Timestamp;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::ReadAt;
use crate::http_date::parse_http_date;
use anyhow::{Result, anyhow, bail};

/// Attempts per range read when the host cannot be reached.
const MAX_RETRY: u32 = 3;
/// Backoff step between attempts; the n-th retry waits n steps.
const RETRY_BACKOFF: Duration = Duration::from_millis(200);

/// HTTP Range reader for archives kept on a remote artifact host
///
/// Only connect and timeout errors are retried, a few times and briefly;
/// every other failure is returned at once.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    modified: Option<Timestamp>,
    max_retry: u32,
}

impl HttpRangeReader {
    /// Open a remote archive.
    ///
    /// Sends a HEAD request to verify Range support and learn the size and
    /// modification time. Returns `Ok(None)` when the host says the archive
    /// does not exist.
    pub async fn open(client: Client, url: String) -> Result<Option<Self>> {
        let resp = client.head(&url).send().await?;

        if matches!(resp.status(), StatusCode::NOT_FOUND | StatusCode::GONE) {
            return Ok(None);
        }

        if !resp.status().is_success() {
            bail!("HTTP request failed with status: {}", resp.status());
        }

        // Check if server supports Range requests
        let accept_ranges = resp
            .headers()
            .get("accept-ranges")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("none");

        if !accept_ranges.contains("bytes") {
            bail!("Remote server does not support Range requests");
        }

        let size = resp
            .headers()
            .get("content-length")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| anyhow!("Remote server did not return Content-Length"))?;

        let modified = resp
            .headers()
            .get("last-modified")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_http_date);

        Ok(Some(Self {
            client,
            url,
            size,
            modified,
            max_retry: MAX_RETRY,
        }))
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() || offset >= self.size {
            return Ok(0);
        }

        let end = offset + buf.len() as u64 - 1;
        let end = end.min(self.size - 1);
        let expected_size = (end - offset + 1) as usize;

        let mut received = 0;
        let mut retry_count = 0;

        while received < expected_size {
            let current_start = offset + received as u64;
            let range = format!("bytes={}-{}", current_start, end);

            let result = self
                .client
                .get(&self.url)
                .header("Range", &range)
                .send()
                .await;

            match result {
                Ok(resp) => {
                    if resp.status() != StatusCode::PARTIAL_CONTENT {
                        bail!("HTTP request failed with status: {}", resp.status());
                    }

                    let bytes = resp.bytes().await?;
                    if bytes.is_empty() {
                        bail!("Empty range response for {}", range);
                    }
                    let chunk_len = bytes.len().min(expected_size - received);
                    buf[received..received + chunk_len].copy_from_slice(&bytes[..chunk_len]);
                    received += chunk_len;
                }
                Err(e) if e.is_timeout() || e.is_connect() => {
                    retry_count += 1;
                    if retry_count >= self.max_retry {
                        bail!("Max retries exceeded");
                    }
                    tracing::warn!(
                        url = %self.url,
                        retry = retry_count,
                        max_retry = self.max_retry,
                        error = %e,
                        "Connection error, retrying"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * retry_count).await;
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(received)
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn last_modified(&self) -> Option<Timestamp> {
        self.modified
    }
}
