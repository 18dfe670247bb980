use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use super::{ByteStream, RangeReader};
use crate::error::{Error, Result};

/// Chunk size used when streaming an in-memory blob.
const MEMORY_CHUNK_SIZE: usize = 64 * 1024;

/// Local file reader with random access support.
pub struct LocalFileReader {
    file: std::fs::File,
    path: PathBuf,
    len: u64,
}

impl LocalFileReader {
    /// Open a file for ranged reading.
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", path.display())))?;
        let len = file
            .metadata()
            .map_err(|e| Error::SourceUnavailable(format!("{}: {e}", path.display())))?
            .len();
        Ok(Self { file, path: path.to_path_buf(), len })
    }

    fn check_range(&self, offset: u64, length: u64) -> Result<()> {
        if offset.checked_add(length).is_none_or(|end| end > self.len) {
            return Err(Error::MalformedArchive(format!(
                "range {offset}..{} exceeds file length {}",
                offset.saturating_add(length),
                self.len
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl RangeReader for LocalFileReader {
    fn len(&self) -> u64 {
        self.len
    }

    async fn read(&self, offset: u64, length: u64) -> Result<Bytes> {
        self.check_range(offset, length)?;
        let mut buf = vec![0u8; length as usize];

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file
                .read_exact_at(&mut buf, offset)
                .map_err(|e| Error::MalformedArchive(format!("short read at {offset}: {e}")))?;
        }

        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            // No pread available; a fresh handle keeps positioned reads
            // independent of each other.
            let mut file = std::fs::File::open(&self.path)?;
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(&mut buf)
                .map_err(|e| Error::MalformedArchive(format!("short read at {offset}: {e}")))?;
        }

        Ok(Bytes::from(buf))
    }

    async fn read_stream(&self, offset: u64, length: u64) -> Result<ByteStream> {
        self.check_range(offset, length)?;
        let mut file = tokio::fs::File::open(&self.path).await?;
        file.seek(std::io::SeekFrom::Start(offset)).await?;
        Ok(ReaderStream::new(file.take(length)).boxed())
    }
}

/// In-memory blob reader; slices are zero-copy.
pub struct MemoryReader {
    data: Bytes,
}

impl MemoryReader {
    /// Wrap an owned byte buffer.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl RangeReader for MemoryReader {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    async fn read(&self, offset: u64, length: u64) -> Result<Bytes> {
        let end = offset.checked_add(length).filter(|&end| end <= self.len());
        match end {
            Some(end) => Ok(self.data.slice(offset as usize..end as usize)),
            None => Err(Error::MalformedArchive(format!(
                "range {offset}..{} exceeds blob length {}",
                offset.saturating_add(length),
                self.len()
            ))),
        }
    }

    async fn read_stream(&self, offset: u64, length: u64) -> Result<ByteStream> {
        let slice = self.read(offset, length).await?;
        let chunks: Vec<std::io::Result<Bytes>> = (0..slice.len())
            .step_by(MEMORY_CHUNK_SIZE)
            .map(|start| {
                let end = (start + MEMORY_CHUNK_SIZE).min(slice.len());
                Ok(slice.slice(start..end))
            })
            .collect();
        Ok(futures_util::stream::iter(chunks).boxed())
    }
}
