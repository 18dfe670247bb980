//! Caller-facing archive exploration.
//!
//! A [`ZipExplorer`] couples an opened [`ZipArchive`] with a
//! [`MetadataProvider`] that enriches file entries with domain metadata.
//! Opening returns the explorer already holding the parsed archive, so
//! there is no "not yet opened" state to misuse; the only lifecycle left
//! at runtime is the metadata map, populated by
//! [`extract_metadata`](ZipExplorer::extract_metadata).

mod metadata;
mod rocrate;

pub use metadata::{BasicMetadata, FileMetadata, MetadataProvider};
pub use rocrate::{
    ROCRATE_METADATA_FILENAME, RoCrate, RoCrateEntity, RoCrateExplorer, RoCrateMetadata,
};

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::io::{ByteStream, ZipSource};
use crate::zip::{EntryKind, ZipArchive, ZipEntry};

/// An explorer over one opened archive.
pub struct ZipExplorer<P: MetadataProvider = BasicMetadata> {
    archive: ZipArchive,
    provider: P,
    metadata: Option<HashMap<String, FileMetadata>>,
}

impl<P: MetadataProvider> ZipExplorer<P> {
    /// Open an archive with the provider's default value attached.
    pub async fn open(source: impl Into<ZipSource>) -> Result<Self>
    where
        P: Default,
    {
        Self::open_with(source, P::default()).await
    }

    /// Open an archive and attach the given provider.
    pub async fn open_with(source: impl Into<ZipSource>, provider: P) -> Result<Self> {
        let archive = ZipArchive::open(source).await?;
        Ok(Self::from_archive(archive, provider))
    }

    /// Compose a new explorer over an archive another explorer already
    /// opened; the handle is shared, nothing is re-fetched.
    pub fn from_archive(archive: ZipArchive, provider: P) -> Self {
        Self { archive, provider, metadata: None }
    }

    /// The opened archive handle.
    pub fn archive(&self) -> &ZipArchive {
        &self.archive
    }

    /// The attached metadata provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The archive's ordered entry index.
    pub fn entries(&self) -> &IndexMap<String, ZipEntry> {
        self.archive.entries()
    }

    /// Full decompressed bytes of a `File` entry.
    pub async fn file_contents(&self, entry: &ZipEntry) -> Result<Vec<u8>> {
        self.archive.extract(entry).await
    }

    /// Decompressed bytes of a `File` entry as a pull-based stream.
    pub async fn file_stream(&self, entry: &ZipEntry) -> Result<ByteStream> {
        self.archive.extract_stream(entry).await
    }

    /// Run the provider's load hook, then build one metadata record per
    /// `File` entry.
    ///
    /// The map is built aside and swapped in whole, so a failing pass
    /// never exposes partial state. Running the pass again rebuilds the
    /// same records.
    pub async fn extract_metadata(&mut self) -> Result<()> {
        self.provider.load(&self.archive).await?;

        let mut map = HashMap::with_capacity(self.archive.entries().len());
        for entry in self.archive.entries().values() {
            if entry.kind() == EntryKind::File {
                map.insert(entry.path.clone(), self.provider.entry_metadata(entry));
            }
        }

        self.metadata = Some(map);
        Ok(())
    }

    /// The stored metadata record for an entry.
    ///
    /// Fails with [`Error::MetadataNotExtracted`] before the first
    /// [`extract_metadata`](Self::extract_metadata) pass and
    /// [`Error::NotFound`] when the entry has no record (directories
    /// never do).
    pub fn entry_metadata(&self, entry: &ZipEntry) -> Result<&FileMetadata> {
        let map = self.metadata.as_ref().ok_or(Error::MetadataNotExtracted)?;
        map.get(&entry.path).ok_or_else(|| Error::NotFound(entry.path.clone()))
    }

    /// All stored metadata records, keyed by entry path.
    pub fn metadata(&self) -> Result<&HashMap<String, FileMetadata>> {
        self.metadata.as_ref().ok_or(Error::MetadataNotExtracted)
    }
}
