use thiserror::Error;

/// Errors raised while reading a ZIP archive.
#[derive(Debug, Error)]
pub enum ZipError {
    /// The data is not a ZIP archive, or its structures are damaged.
    #[error("Not a valid ZIP file: {0}")]
    Malformed(String),

    /// The entry uses a compression method we cannot decode.
    #[error("Unsupported compression method: {0}")]
    Unsupported(u16),

    /// The underlying source failed.
    #[error(transparent)]
    Read(#[from] anyhow::Error),
}

impl ZipError {
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        ZipError::Malformed(msg.into())
    }

    /// Whether the failure is about the archive's content rather than access to it.
    pub fn is_format_error(&self) -> bool {
        matches!(self, ZipError::Malformed(_) | ZipError::Unsupported(_))
    }
}

impl From<std::io::Error> for ZipError {
    // Cursor reads over buffered headers only fail when a structure is truncated.
    fn from(e: std::io::Error) -> Self {
        ZipError::Malformed(e.to_string())
    }
}
