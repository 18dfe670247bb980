//! The opened-archive handle.
//!
//! A [`ZipArchive`] is the frozen result of parsing: an ordered entry
//! index, the source length, the ZIP64 flag and the reader the index was
//! built from. The handle is cheap to clone and safe to share; extraction
//! goes back to the source with targeted ranged reads.

use std::io::Read;
use std::sync::Arc;

use futures_util::StreamExt;
use indexmap::IndexMap;
use tokio_util::io::{ReaderStream, StreamReader};

use super::compressed::CompressedReader;
use super::parser::ZipParser;
use super::structures::{CompressionMethod, EntryKind, LFH_SIGNATURE, LFH_SIZE, ZipEntry};
use crate::error::{Error, Result};
use crate::io::{ByteStream, RangeReader, ZipSource};

struct Inner {
    reader: Arc<dyn RangeReader>,
    entries: IndexMap<String, ZipEntry>,
    len: u64,
    zip64: bool,
}

/// A read-only handle over a parsed ZIP archive.
///
/// The entry index preserves central-directory order and is immutable for
/// the lifetime of the handle.
#[derive(Clone)]
pub struct ZipArchive {
    inner: Arc<Inner>,
}

impl ZipArchive {
    /// Open an archive from a tagged source.
    pub async fn open(source: impl Into<ZipSource>) -> Result<Self> {
        let reader = source.into().into_reader().await?;
        Self::with_reader(reader).await
    }

    /// Open an archive over an already-connected reader.
    pub async fn with_reader(reader: Arc<dyn RangeReader>) -> Result<Self> {
        ZipParser::new(reader).parse().await
    }

    pub(crate) fn from_parts(
        reader: Arc<dyn RangeReader>,
        entries: IndexMap<String, ZipEntry>,
        len: u64,
        zip64: bool,
    ) -> Self {
        Self { inner: Arc::new(Inner { reader, entries, len, zip64 }) }
    }

    /// Total archive length in bytes.
    pub fn size(&self) -> u64 {
        self.inner.len
    }

    /// Whether the ZIP64 EOCD locator precedes the EOCD record.
    pub fn is_zip64(&self) -> bool {
        self.inner.zip64
    }

    /// The ordered entry index, keyed by member path.
    pub fn entries(&self) -> &IndexMap<String, ZipEntry> {
        &self.inner.entries
    }

    /// The byte source the archive was opened from.
    pub fn reader(&self) -> &Arc<dyn RangeReader> {
        &self.inner.reader
    }

    /// Exact-path lookup.
    pub fn get(&self, path: &str) -> Option<&ZipEntry> {
        self.inner.entries.get(path)
    }

    /// First `File` entry whose path ends with `suffix`, in
    /// central-directory order. Directory entries are ignored.
    pub fn find_file_by_name(&self, suffix: &str) -> Option<&ZipEntry> {
        self.inner
            .entries
            .values()
            .find(|e| e.kind() == EntryKind::File && e.path.ends_with(suffix))
    }

    /// First entry matching the predicate, in central-directory order.
    pub fn find_by(&self, predicate: impl Fn(&ZipEntry) -> bool) -> Option<&ZipEntry> {
        self.inner.entries.values().find(|e| predicate(e))
    }

    /// Resolve the Local File Header and return the absolute offset of the
    /// member's stored data.
    async fn data_offset(&self, entry: &ZipEntry) -> Result<u64> {
        let lfh = self.inner.reader.read(entry.header_offset, LFH_SIZE as u64).await?;
        if &lfh[0..4] != LFH_SIGNATURE {
            return Err(Error::MalformedArchive(format!(
                "bad local header signature at {} for {:?}",
                entry.header_offset, entry.path
            )));
        }

        let name_len = u16::from_le_bytes([lfh[26], lfh[27]]) as u64;
        let extra_len = u16::from_le_bytes([lfh[28], lfh[29]]) as u64;
        let offset = entry.header_offset + LFH_SIZE as u64 + name_len + extra_len;

        if offset + entry.compressed_size > self.inner.len {
            return Err(Error::MalformedArchive(format!(
                "data for {:?} ({offset}+{}) overruns the archive ({} bytes)",
                entry.path, entry.compressed_size, self.inner.len
            )));
        }

        Ok(offset)
    }

    /// Extract a member's full decompressed bytes.
    pub async fn extract(&self, entry: &ZipEntry) -> Result<Vec<u8>> {
        if entry.is_dir() {
            return Err(Error::InvalidOperation("cannot extract a directory"));
        }

        let offset = self.data_offset(entry).await?;
        let compressed = self.inner.reader.read(offset, entry.compressed_size).await?;

        match entry.compression {
            CompressionMethod::Stored => Ok(compressed.to_vec()),
            CompressionMethod::Deflate => {
                let mut decoder = flate2::read::DeflateDecoder::new(compressed.as_ref());
                let mut decompressed = Vec::with_capacity(entry.uncompressed_size as usize);
                decoder.read_to_end(&mut decompressed)?;
                Ok(decompressed)
            }
            CompressionMethod::Unknown(method) => Err(Error::UnsupportedCompression(method)),
        }
    }

    /// Extract a member as a pull-based stream of decompressed chunks.
    ///
    /// The ranged byte stream is piped straight through the decoder, so
    /// resident memory stays bounded by the chunk size regardless of the
    /// member size. Dropping the stream releases the transport.
    pub async fn extract_stream(&self, entry: &ZipEntry) -> Result<ByteStream> {
        if entry.is_dir() {
            return Err(Error::InvalidOperation("cannot extract a directory"));
        }

        let offset = self.data_offset(entry).await?;
        let raw = self.inner.reader.read_stream(offset, entry.compressed_size).await?;
        let decoder = CompressedReader::new(StreamReader::new(raw), entry.compression)?;
        Ok(ReaderStream::new(decoder).boxed())
    }
}

impl PartialEq for ZipArchive {
    fn eq(&self, other: &Self) -> bool {
        self.inner.len == other.inner.len
            && self.inner.zip64 == other.inner.zip64
            && self.inner.entries == other.inner.entries
    }
}

impl std::fmt::Debug for ZipArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZipArchive")
            .field("entries", &self.inner.entries.len())
            .field("len", &self.inner.len)
            .field("zip64", &self.inner.zip64)
            .finish()
    }
}
