//! Command-line interface for exploring local and remote archives.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;

use rozip::{
    Cli, HttpRangeReader, LocalFileReader, RoCrateExplorer, RoCrateMetadata, ZipArchive, ZipEntry,
    ZipExplorer,
};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.is_http_url() {
        let reader = Arc::new(HttpRangeReader::connect(&cli.file).await?);
        let archive = ZipArchive::with_reader(reader.clone()).await?;
        run(archive, &cli).await?;

        if !cli.is_quiet() {
            eprintln!("\nTotal bytes transferred: {}", format_size(reader.transferred_bytes()));
        }
    } else {
        let reader = Arc::new(LocalFileReader::open(Path::new(&cli.file))?);
        let archive = ZipArchive::with_reader(reader).await?;
        run(archive, &cli).await?;
    }

    Ok(())
}

async fn run(archive: ZipArchive, cli: &Cli) -> Result<()> {
    let mut explorer = ZipExplorer::from_archive(archive, RoCrateMetadata::default());

    if cli.show_crate {
        return show_crate(&mut explorer).await;
    }

    if cli.files.is_empty() || cli.list || cli.verbose {
        return list_files(&explorer, cli.verbose);
    }

    for path in &cli.files {
        let Some(entry) = explorer.archive().get(path).cloned() else {
            anyhow::bail!("{path}: not found in archive");
        };
        extract_file(&explorer, &entry, cli).await?;
    }

    Ok(())
}

/// List archive contents, either one path per line or as a table with
/// sizes, compression ratio and timestamps.
fn list_files(explorer: &RoCrateExplorer, verbose: bool) -> Result<()> {
    if verbose {
        println!("{:>10}  {:>10}  {:>5}  {:>16}  Name", "Length", "Size", "Cmpr", "Modified");
        println!("{}", "-".repeat(70));
    }

    let mut total_uncompressed = 0u64;
    let mut total_compressed = 0u64;
    let mut file_count = 0usize;

    for entry in explorer.entries().values() {
        if verbose {
            let ratio = if entry.uncompressed_size > 0 {
                format!("{:>4}%", 100 - (entry.compressed_size * 100 / entry.uncompressed_size))
            } else {
                "  0%".to_string()
            };

            println!(
                "{:>10}  {:>10}  {}  {:04}-{:02}-{:02} {:02}:{:02}  {}",
                entry.uncompressed_size,
                entry.compressed_size,
                ratio,
                entry.date_time.year(),
                entry.date_time.month(),
                entry.date_time.day(),
                entry.date_time.hour(),
                entry.date_time.minute(),
                entry.path
            );

            if !entry.is_dir() {
                total_uncompressed += entry.uncompressed_size;
                total_compressed += entry.compressed_size;
                file_count += 1;
            }
        } else {
            println!("{}", entry.path);
        }
    }

    if verbose {
        println!("{}", "-".repeat(70));
        println!("{:>10}  {:>10}  {:>28}  {} files", total_uncompressed, total_compressed, "", file_count);
    }

    Ok(())
}

/// Print the RO-Crate summary: root dataset, entity count and the entries
/// the graph describes.
async fn show_crate(explorer: &mut RoCrateExplorer) -> Result<()> {
    explorer.extract_metadata().await?;

    if !explorer.has_crate() {
        anyhow::bail!("no {} in this archive", rozip::ROCRATE_METADATA_FILENAME);
    }

    let ro_crate = explorer.ro_crate()?;
    if let Some(root) = ro_crate.root_dataset() {
        println!("Dataset: {}", root.name().unwrap_or("(unnamed)"));
        if let Some(description) = root.description() {
            println!("{description}");
        }
        println!();
    }
    println!("{} entities in graph", ro_crate.entity_count());

    for entry in explorer.entries().values() {
        if entry.is_dir() {
            continue;
        }
        let meta = explorer.entry_metadata(entry)?;
        if meta.description.is_some() || meta.name != entry.name() {
            println!(
                "  {} — {}{}",
                entry.path,
                meta.name,
                meta.description.as_deref().map(|d| format!(": {d}")).unwrap_or_default()
            );
        }
    }

    Ok(())
}

/// Stream one member to stdout or onto disk.
async fn extract_file(explorer: &RoCrateExplorer, entry: &ZipEntry, cli: &Cli) -> Result<()> {
    if cli.pipe {
        let mut stream = explorer.file_stream(entry).await?;
        let mut stdout = tokio::io::stdout();
        while let Some(chunk) = stream.next().await {
            stdout.write_all(&chunk?).await?;
        }
        stdout.flush().await?;
        return Ok(());
    }

    let output_path = match &cli.extract_dir {
        Some(dir) => PathBuf::from(dir).join(&entry.path),
        None => PathBuf::from(&entry.path),
    };

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }

    if !cli.is_quiet() {
        println!("  extracting: {}", entry.path);
    }

    let mut stream = explorer.file_stream(entry).await?;
    let mut file = tokio::fs::File::create(&output_path).await?;
    while let Some(chunk) = stream.next().await {
        file.write_all(&chunk?).await?;
    }
    file.flush().await?;

    Ok(())
}

/// Format a byte count with a binary unit suffix.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{size} bytes")
    }
}
