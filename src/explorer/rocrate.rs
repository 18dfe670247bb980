//! RO-Crate recognition and per-entry metadata overlay.
//!
//! An RO-Crate archive carries a JSON-LD document named
//! `ro-crate-metadata.json` at its root. The document's `@graph` holds one
//! entity per described resource, keyed by `@id`; entities whose id equals
//! a member path contribute display names and descriptions to that entry's
//! metadata record.

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::{Map, Value};

use super::metadata::{FileMetadata, MetadataProvider};
use super::ZipExplorer;
use crate::error::{Error, Result};
use crate::zip::{ZipArchive, ZipEntry};

/// Well-known name of the crate document at the archive root.
pub const ROCRATE_METADATA_FILENAME: &str = "ro-crate-metadata.json";

#[derive(Debug, Deserialize)]
struct RoCrateDocument {
    #[serde(rename = "@context", default)]
    context: Value,
    #[serde(rename = "@graph")]
    graph: Vec<Value>,
}

/// A parsed RO-Crate graph, exposed read-only.
#[derive(Debug)]
pub struct RoCrate {
    context: Value,
    entities: IndexMap<String, Map<String, Value>>,
}

impl RoCrate {
    /// Parse the raw bytes of an `ro-crate-metadata.json` document.
    ///
    /// Graph nodes without a string `@id` are skipped, matching the
    /// leniency of JSON-LD graph consumers.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let doc: RoCrateDocument = serde_json::from_slice(data)?;

        let mut entities = IndexMap::with_capacity(doc.graph.len());
        for node in doc.graph {
            if let Value::Object(props) = node
                && let Some(id) = props.get("@id").and_then(Value::as_str).map(str::to_owned)
            {
                entities.insert(id, props);
            }
        }

        Ok(Self { context: doc.context, entities })
    }

    /// The document's `@context` value.
    pub fn context(&self) -> &Value {
        &self.context
    }

    /// Look up a graph entity by `@id`.
    pub fn entity(&self, id: &str) -> Option<RoCrateEntity<'_>> {
        self.entities.get(id).map(|props| RoCrateEntity { props })
    }

    /// All graph entities in document order.
    pub fn entities(&self) -> impl Iterator<Item = RoCrateEntity<'_>> {
        self.entities.values().map(|props| RoCrateEntity { props })
    }

    /// Number of graph entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// The root dataset, reached through the metadata descriptor's
    /// `about` reference.
    pub fn root_dataset(&self) -> Option<RoCrateEntity<'_>> {
        let descriptor = self.entity(ROCRATE_METADATA_FILENAME)?;
        let about = descriptor.property("about")?;
        let id = about.get("@id")?.as_str()?;
        self.entity(id)
    }
}

/// A borrowed, immutable view of one graph entity.
#[derive(Debug, Clone, Copy)]
pub struct RoCrateEntity<'a> {
    props: &'a Map<String, Value>,
}

impl<'a> RoCrateEntity<'a> {
    pub fn id(&self) -> &'a str {
        self.props.get("@id").and_then(Value::as_str).unwrap_or("")
    }

    /// The entity's `@type` value(s).
    pub fn types(&self) -> Vec<&'a str> {
        match self.props.get("@type") {
            Some(Value::String(s)) => vec![s.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    /// A raw property value.
    pub fn property(&self, key: &str) -> Option<&'a Value> {
        self.props.get(key)
    }

    /// A property value, when it is a plain string.
    pub fn str_property(&self, key: &str) -> Option<&'a str> {
        self.props.get(key).and_then(Value::as_str)
    }

    pub fn name(&self) -> Option<&'a str> {
        self.str_property("name")
    }

    pub fn description(&self) -> Option<&'a str> {
        self.str_property("description")
    }
}

/// Metadata provider overlaying RO-Crate entity data onto file entries.
#[derive(Debug, Default)]
pub struct RoCrateMetadata {
    ro_crate: Option<RoCrate>,
}

impl RoCrateMetadata {
    /// The loaded crate, if the archive carried one.
    pub fn ro_crate(&self) -> Option<&RoCrate> {
        self.ro_crate.as_ref()
    }
}

#[async_trait]
impl MetadataProvider for RoCrateMetadata {
    /// Read and parse the crate document. A missing document is not an
    /// error; it simply leaves the crate unset. An unparsable one is.
    async fn load(&mut self, archive: &ZipArchive) -> Result<()> {
        self.ro_crate = None;

        let Some(entry) = archive.get(ROCRATE_METADATA_FILENAME) else {
            return Ok(());
        };
        if entry.is_dir() {
            return Ok(());
        }

        let bytes = archive.extract(entry).await?;
        self.ro_crate = Some(RoCrate::parse(&bytes)?);
        Ok(())
    }

    fn entry_metadata(&self, entry: &ZipEntry) -> FileMetadata {
        let mut meta = FileMetadata::from_entry(entry);

        if let Some(ro_crate) = &self.ro_crate
            && let Some(entity) = ro_crate.entity(&entry.path)
        {
            if let Some(name) = entity.name() {
                meta.name = name.to_string();
            }
            if let Some(description) = entity.description() {
                meta.description = Some(description.to_string());
            }
        }

        meta
    }
}

/// An explorer that recognises RO-Crate archives.
pub type RoCrateExplorer = ZipExplorer<RoCrateMetadata>;

impl ZipExplorer<RoCrateMetadata> {
    /// Whether the archive root holds an `ro-crate-metadata.json` file.
    pub fn has_crate(&self) -> bool {
        self.archive.get(ROCRATE_METADATA_FILENAME).is_some_and(|e| !e.is_dir())
    }

    /// The parsed crate graph.
    ///
    /// Fails with [`Error::NoCrate`] until a
    /// [`extract_metadata`](ZipExplorer::extract_metadata) pass has found
    /// and parsed the crate document.
    pub fn ro_crate(&self) -> Result<&RoCrate> {
        self.provider.ro_crate.as_ref().ok_or(Error::NoCrate)
    }
}
