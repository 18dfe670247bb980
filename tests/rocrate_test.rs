mod common;

use common::{ZipBuilder, rocrate_archive, rocrate_document};
use rozip::{EntryKind, Error, ROCRATE_METADATA_FILENAME, RoCrateExplorer};

#[tokio::test]
async fn crate_archive_is_recognised() {
    let explorer = RoCrateExplorer::open(rocrate_archive()).await.unwrap();

    assert!(explorer.has_crate());
    assert_eq!(explorer.entries().len(), 5);

    let entry = explorer.archive().find_file_by_name(ROCRATE_METADATA_FILENAME).unwrap();
    assert_eq!(entry.kind(), EntryKind::File);
    assert_eq!(entry.path, ROCRATE_METADATA_FILENAME);

    let contents = explorer.file_contents(entry).await.unwrap();
    assert_eq!(contents.len(), rocrate_document().len());
    assert_eq!(contents, rocrate_document());
}

#[tokio::test]
async fn crate_view_requires_a_metadata_pass() {
    let mut explorer = RoCrateExplorer::open(rocrate_archive()).await.unwrap();

    assert!(matches!(explorer.ro_crate(), Err(Error::NoCrate)));

    explorer.extract_metadata().await.unwrap();

    let ro_crate = explorer.ro_crate().unwrap();
    let root = ro_crate.root_dataset().unwrap();
    assert_eq!(root.name(), Some("Weather observations 2024"));
    assert_eq!(root.description(), Some("Hourly observations from the rooftop station"));
    assert_eq!(ro_crate.entity_count(), 4);
}

#[tokio::test]
async fn graph_entities_override_entry_metadata() {
    let mut explorer = RoCrateExplorer::open(rocrate_archive()).await.unwrap();
    explorer.extract_metadata().await.unwrap();

    // Described with name and description.
    let entry = explorer.entries().get("data/observations.csv").unwrap();
    let meta = explorer.entry_metadata(entry).unwrap();
    assert_eq!(meta.name, "Observation table");
    assert_eq!(meta.description.as_deref(), Some("One row per hourly reading"));
    assert_eq!(meta.size, entry.uncompressed_size);

    // Described with a name only.
    let entry = explorer.entries().get("README.md").unwrap();
    let meta = explorer.entry_metadata(entry).unwrap();
    assert_eq!(meta.name, "Read me first");
    assert_eq!(meta.description, None);

    // Not described at all: base values stand.
    let entry = explorer.entries().get("notes.txt").unwrap();
    let meta = explorer.entry_metadata(entry).unwrap();
    assert_eq!(meta.name, "notes.txt");
    assert_eq!(meta.description, None);
}

#[tokio::test]
async fn metadata_pass_is_idempotent_with_a_crate() {
    let mut explorer = RoCrateExplorer::open(rocrate_archive()).await.unwrap();

    explorer.extract_metadata().await.unwrap();
    let before = explorer.metadata().unwrap().clone();

    explorer.extract_metadata().await.unwrap();
    assert_eq!(&before, explorer.metadata().unwrap());
}

#[tokio::test]
async fn archives_without_a_crate_still_explore() {
    let mut builder = ZipBuilder::new();
    builder.add_stored("plain.txt", b"no crate here");
    let mut explorer = RoCrateExplorer::open(builder.build()).await.unwrap();

    assert!(!explorer.has_crate());
    assert!(matches!(explorer.ro_crate(), Err(Error::NoCrate)));

    // The metadata pass still enriches entries from their base records.
    explorer.extract_metadata().await.unwrap();
    assert!(matches!(explorer.ro_crate(), Err(Error::NoCrate)));

    let entry = explorer.entries().get("plain.txt").unwrap();
    let meta = explorer.entry_metadata(entry).unwrap();
    assert_eq!(meta.name, "plain.txt");
}

#[tokio::test]
async fn unparsable_crate_document_fails_the_pass() {
    let mut builder = ZipBuilder::new();
    builder.add_stored(ROCRATE_METADATA_FILENAME, b"this is not JSON");
    let mut explorer = RoCrateExplorer::open(builder.build()).await.unwrap();

    assert!(explorer.has_crate());
    assert!(matches!(
        explorer.extract_metadata().await,
        Err(Error::InvalidCrate(_))
    ));
    // The failed pass leaves no partial metadata behind.
    assert!(matches!(explorer.metadata(), Err(Error::MetadataNotExtracted)));
}

#[tokio::test]
async fn crate_document_in_a_subdirectory_does_not_count() {
    let mut builder = ZipBuilder::new();
    builder.add_stored("nested/ro-crate-metadata.json", &rocrate_document());
    let explorer = RoCrateExplorer::open(builder.build()).await.unwrap();

    assert!(!explorer.has_crate());
}
