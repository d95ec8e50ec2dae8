//! The virtual filesystem contract: resolves and opens files by
//! logical name. An external collaborator — this crate only specifies
//! the interface [`crate::stream::Stream::open`] consumes.

use std::io::{Read, Seek};

use thiserror::Error;

/// A readable, seekable byte stream handed off to a decoder
/// constructor.
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Errors the filesystem layer can report when resolving a logical
/// filename.
#[derive(Debug, Error)]
pub enum FsError {
    /// No candidate file matched `filename` under any tried extension.
    #[error("file not found: {0}")]
    NotFound(String),
    /// A candidate file was located but could not be read.
    #[error("I/O error opening file: {0}")]
    Io(#[from] std::io::Error),
}

/// Resolves logical filenames to readable byte streams.
///
/// A real implementation may probe several candidate extensions for
/// one logical name, invoking a per-extension read handler multiple
/// times; from this crate's point of view that detail is internal to
/// the implementation behind this trait.
pub trait FileSystem: Send + Sync {
    /// Opens `filename` for reading, or reports why it couldn't.
    fn open_read(&self, filename: &str) -> Result<Box<dyn ReadSeek>, FsError>;
}
