mod http;
mod local;

pub use http::HttpRangeReader;
pub use local::LocalFileReader;

use anyhow::{Result, bail};
use async_trait::async_trait;
use jiff::Timestamp;

/// Trait for random access reading from an archive source
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Read data at the specified offset into the buffer
    async fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Get the total size of the data source
    fn size(&self) -> u64;

    /// Modification time of the whole source, if known
    fn last_modified(&self) -> Option<Timestamp>;
}

/// Fill `buf` completely starting at `offset`, looping over short reads.
pub async fn read_exact_at<R: ReadAt + ?Sized>(reader: &R, offset: u64, buf: &mut [u8]) -> Result<()> {
    let mut filled = 0;

    while filled < buf.len() {
        let n = reader.read_at(offset + filled as u64, &mut buf[filled..]).await?;
        if n == 0 {
            bail!(
                "Unexpected end of data at offset {} (wanted {} more bytes)",
                offset + filled as u64,
                buf.len() - filled
            );
        }
        filled += n;
    }

    Ok(())
}
