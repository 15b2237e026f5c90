//! A small ZIP reader for serving entries in place.
//!
//! Works over any [`ReadAt`](crate::io::ReadAt) source, so an archive on
//! local disk and one behind an HTTP artifact host are read the same way.
//!
//! Opening an archive reads only its tail: the End of Central Directory
//! record (with the ZIP64 variant when fields are saturated) and then the
//! Central Directory itself. Entry data is fetched when an entry is read,
//! after checking its local header.
//!
//! Entries stored or compressed with DEFLATE can be read. Encrypted
//! entries, other compression methods and multi-disk archives are
//! reported as errors; callers treat such entries as having no content.

mod archive;
mod error;
mod parser;
mod structures;

pub use archive::ZipArchive;
pub use error::ZipError;
pub use structures::*;
