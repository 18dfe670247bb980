//! # rozip
//!
//! Random-access, read-only exploration of ZIP archives and RO-Crates,
//! backed by local files, in-memory blobs or remote HTTP(S) URLs.
//!
//! For remote archives only the trailer and central directory are fetched
//! to list contents, and extracting a member issues targeted byte-range
//! requests, so a single file can be pulled out of a multi-gigabyte
//! archive without downloading the rest.
//!
//! ## Features
//!
//! - Open archives from a path, an owned byte buffer or an HTTP(S) URL
//!   (Range requests, manual redirect resolution, capability probing)
//! - ZIP64 support (archives beyond the 4 GiB / 65535-entry limits)
//! - Stored and DEFLATE members, whole-buffer or streamed extraction
//! - RO-Crate recognition: archives carrying `ro-crate-metadata.json` at
//!   the root expose the parsed crate graph and per-entry name/description
//!   enrichment
//!
//! ## Example
//!
//! ```no_run
//! use rozip::RoCrateExplorer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut explorer =
//!         RoCrateExplorer::open("https://example.com/dataset.zip").await?;
//!
//!     for entry in explorer.entries().values() {
//!         println!("{} ({} bytes)", entry.path, entry.uncompressed_size);
//!     }
//!
//!     explorer.extract_metadata().await?;
//!     if explorer.has_crate() {
//!         let root = explorer.ro_crate()?.root_dataset();
//!         println!("crate: {:?}", root.and_then(|d| d.name()));
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod error;
pub mod explorer;
pub mod io;
pub mod zip;

pub use cli::Cli;
pub use error::{Error, Result};
pub use explorer::{
    BasicMetadata, FileMetadata, MetadataProvider, ROCRATE_METADATA_FILENAME, RoCrate,
    RoCrateEntity, RoCrateExplorer, RoCrateMetadata, ZipExplorer,
};
pub use io::{ByteStream, HttpRangeReader, LocalFileReader, MemoryReader, RangeReader, ZipSource};
pub use zip::{
    CompressionMethod, EntryKind, ZipArchive, ZipDateTime, ZipEntry, ZipParser,
};
