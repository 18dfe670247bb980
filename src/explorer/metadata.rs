use async_trait::async_trait;

use crate::error::Result;
use crate::zip::{ZipArchive, ZipDateTime, ZipEntry};

/// Domain metadata describing one archived file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    /// Member path; also the key back into the archive index.
    pub path: String,
    /// Display name; defaults to the last path segment.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u64,
    /// Mirror of the entry's DOS timestamp.
    pub date_time: ZipDateTime,
    /// Optional human-readable description.
    pub description: Option<String>,
}

impl FileMetadata {
    /// The base record every provider starts from.
    pub fn from_entry(entry: &ZipEntry) -> Self {
        Self {
            path: entry.path.clone(),
            name: entry.name().to_string(),
            size: entry.uncompressed_size,
            date_time: entry.date_time,
            description: None,
        }
    }
}

/// The enrichment seam of the explorer.
///
/// `load` runs once per `extract_metadata` pass, before any entry record
/// is built; `entry_metadata` is then invoked for every `File` entry.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Load provider state from the opened archive. The default does
    /// nothing.
    async fn load(&mut self, _archive: &ZipArchive) -> Result<()> {
        Ok(())
    }

    /// Build the metadata record for one entry. The default derives
    /// everything from the entry itself.
    fn entry_metadata(&self, entry: &ZipEntry) -> FileMetadata {
        FileMetadata::from_entry(entry)
    }
}

/// The no-op provider: every entry keeps its base record.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicMetadata;

#[async_trait]
impl MetadataProvider for BasicMetadata {}
