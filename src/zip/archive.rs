use flate2::Crc;
use flate2::read::DeflateDecoder;
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use crate::io::{ReadAt, read_exact_at};

use super::error::ZipError;
use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

type Result<T> = std::result::Result<T, ZipError>;

/// Upper bound on the buffer reserved up front for an inflated entry.
const MAX_PREALLOCATION: usize = 4 * 1024 * 1024;

/// An opened ZIP archive with its central directory indexed by name.
///
/// Opening reads the central directory once; entry data is only read on
/// demand. Dropping the archive releases the underlying source.
pub struct ZipArchive<R: ReadAt + ?Sized> {
    parser: ZipParser<R>,
    entries: Vec<ZipFileEntry>,
    by_name: HashMap<String, usize>,
}

impl<R: ReadAt + ?Sized> ZipArchive<R> {
    /// Open an archive.
    ///
    /// # Errors
    ///
    /// [`ZipError::Malformed`] when the source is not a ZIP archive,
    /// [`ZipError::Read`] when the source itself fails.
    pub async fn open(reader: Arc<R>) -> Result<Self> {
        let parser = ZipParser::new(reader);
        let entries = parser.list_files().await?;

        let mut by_name = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            // First occurrence wins for duplicated names
            by_name.entry(entry.file_name.clone()).or_insert(i);
        }

        Ok(Self {
            parser,
            entries,
            by_name,
        })
    }

    pub fn entries(&self) -> &[ZipFileEntry] {
        &self.entries
    }

    /// Look up an entry by name.
    ///
    /// Falls back to `name/` so that a directory written with an explicit
    /// entry is found by its bare name.
    pub fn by_name(&self, name: &str) -> Option<&ZipFileEntry> {
        if let Some(&i) = self.by_name.get(name) {
            return Some(&self.entries[i]);
        }

        if name.is_empty() || name.ends_with('/') {
            return None;
        }

        self.by_name
            .get(&format!("{name}/"))
            .map(|&i| &self.entries[i])
    }

    /// Check that an entry has a readable content stream and locate its data.
    ///
    /// # Errors
    ///
    /// [`ZipError::Malformed`] or [`ZipError::Unsupported`] when the entry
    /// cannot be read; [`ZipError::Read`] when the source fails.
    pub async fn open_entry(&self, entry: &ZipFileEntry) -> Result<u64> {
        if entry.is_encrypted() {
            return Err(ZipError::malformed(format!("{} is encrypted", entry.file_name)));
        }

        if let CompressionMethod::Unknown(method) = entry.compression_method {
            return Err(ZipError::Unsupported(method));
        }

        self.parser.get_data_offset(entry).await
    }

    /// Read and decompress an entry into memory.
    ///
    /// The decompressed length and CRC-32 are checked against the central
    /// directory.
    pub async fn read_entry(&self, entry: &ZipFileEntry) -> Result<Vec<u8>> {
        let data_offset = self.open_entry(entry).await?;

        // The data range was checked against the archive size, the
        // uncompressed size is only a claim.
        let expected = usize::try_from(entry.uncompressed_size)
            .ok()
            .filter(|&n| n <= isize::MAX as usize)
            .ok_or_else(|| {
                ZipError::malformed(format!(
                    "{} claims {} uncompressed bytes",
                    entry.file_name, entry.uncompressed_size
                ))
            })?;

        let mut raw = vec![0u8; entry.compressed_size as usize];
        read_exact_at(self.parser.reader().as_ref(), data_offset, &mut raw).await?;

        let data = match entry.compression_method {
            CompressionMethod::Stored => raw,
            CompressionMethod::Deflate => {
                let mut out = Vec::with_capacity(expected.min(MAX_PREALLOCATION));
                DeflateDecoder::new(raw.as_slice())
                    .take(entry.uncompressed_size.saturating_add(1))
                    .read_to_end(&mut out)
                    .map_err(|e| {
                        ZipError::malformed(format!("cannot inflate {}: {}", entry.file_name, e))
                    })?;
                out
            }
            CompressionMethod::Unknown(method) => return Err(ZipError::Unsupported(method)),
        };

        if data.len() != expected {
            return Err(ZipError::malformed(format!(
                "{} has {} bytes, expected {}",
                entry.file_name,
                data.len(),
                entry.uncompressed_size
            )));
        }

        let mut crc = Crc::new();
        crc.update(&data);
        if crc.sum() != entry.crc32 {
            return Err(ZipError::malformed(format!(
                "CRC mismatch for {}",
                entry.file_name
            )));
        }

        Ok(data)
    }
}
