//! Byte source abstractions.
//!
//! The ZIP parser depends on a single narrow contract, [`RangeReader`]:
//! report the total length, return an exact byte range, or return the same
//! range as a lazy stream of chunks. Local files, in-memory blobs and
//! remote HTTP(S) URLs all implement it.

mod http;
mod local;

pub use http::HttpRangeReader;
pub use local::{LocalFileReader, MemoryReader};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;

use crate::error::Result;

/// A pull-based sequence of byte chunks produced by a ranged read.
///
/// Dropping the stream releases the underlying transport resource.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Random-access reading from an immutable byte source.
///
/// Reads are independent and reorderable; implementations do not cache.
/// A read that cannot deliver the full requested range fails rather than
/// returning a short buffer.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Total bytes addressable by this source.
    fn len(&self) -> u64;

    /// Whether the source holds no bytes at all.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return exactly `length` bytes starting at `offset`.
    async fn read(&self, offset: u64, length: u64) -> Result<Bytes>;

    /// Return the same range as a stream of chunks, for large payloads
    /// that should not be buffered whole.
    async fn read_stream(&self, offset: u64, length: u64) -> Result<ByteStream>;
}

/// A tagged archive source, discriminated by runtime type.
///
/// `&str` input is treated as a URL when it carries an `http://` or
/// `https://` scheme and as a filesystem path otherwise.
#[derive(Debug, Clone)]
pub enum ZipSource {
    /// A ZIP file on the local filesystem.
    File(PathBuf),
    /// An in-memory ZIP blob of known length.
    Bytes(Vec<u8>),
    /// A remote ZIP reachable over HTTP(S) with Range support.
    Url(String),
}

impl ZipSource {
    /// Connect the source, producing a ready [`RangeReader`].
    ///
    /// For URLs this performs the redirect/capability handshake and is the
    /// point where `SourceUnavailable` failures surface.
    pub async fn into_reader(self) -> Result<Arc<dyn RangeReader>> {
        match self {
            ZipSource::File(path) => Ok(Arc::new(LocalFileReader::open(&path)?)),
            ZipSource::Bytes(data) => Ok(Arc::new(MemoryReader::new(data))),
            ZipSource::Url(url) => Ok(Arc::new(HttpRangeReader::connect(&url).await?)),
        }
    }
}

impl From<&str> for ZipSource {
    fn from(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            ZipSource::Url(value.to_string())
        } else {
            ZipSource::File(PathBuf::from(value))
        }
    }
}

impl From<String> for ZipSource {
    fn from(value: String) -> Self {
        ZipSource::from(value.as_str())
    }
}

impl From<&Path> for ZipSource {
    fn from(value: &Path) -> Self {
        ZipSource::File(value.to_path_buf())
    }
}

impl From<PathBuf> for ZipSource {
    fn from(value: PathBuf) -> Self {
        ZipSource::File(value)
    }
}

impl From<Vec<u8>> for ZipSource {
    fn from(value: Vec<u8>) -> Self {
        ZipSource::Bytes(value)
    }
}
