//! Shared test support: an in-memory ZIP writer for fixtures and a
//! minimal HTTP/1.1 server that understands HEAD and ranged GET, enough to
//! exercise the remote reader without touching the network.

#![allow(dead_code)]

use std::io::Write;

use flate2::Compression;
use flate2::write::DeflateEncoder;

/// DOS date for 2024-03-15.
pub const FIXTURE_DOS_DATE: u16 = ((2024 - 1980) << 9) | (3 << 5) | 15;
/// DOS time for 10:30:20.
pub const FIXTURE_DOS_TIME: u16 = (10 << 11) | (30 << 5) | (20 / 2);

struct CentralRecord {
    name: Vec<u8>,
    method: u16,
    crc32: u32,
    compressed_size: u64,
    uncompressed_size: u64,
    header_offset: u64,
}

/// Builds well-formed ZIP archives in memory, with optional ZIP64 records
/// and an archive comment.
pub struct ZipBuilder {
    data: Vec<u8>,
    records: Vec<CentralRecord>,
    zip64: bool,
    comment: Vec<u8>,
}

impl ZipBuilder {
    pub fn new() -> Self {
        Self { data: Vec::new(), records: Vec::new(), zip64: false, comment: Vec::new() }
    }

    /// Saturate the 32-bit central-directory fields and emit the Zip64
    /// extra field, locator and EOCD record.
    pub fn zip64(mut self) -> Self {
        self.zip64 = true;
        self
    }

    pub fn comment(mut self, comment: &str) -> Self {
        self.comment = comment.as_bytes().to_vec();
        self
    }

    pub fn add_stored(&mut self, path: &str, contents: &[u8]) -> &mut Self {
        self.add_entry(path.as_bytes().to_vec(), 0, contents, contents.to_vec())
    }

    pub fn add_deflated(&mut self, path: &str, contents: &[u8]) -> &mut Self {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(contents).unwrap();
        let compressed = encoder.finish().unwrap();
        self.add_entry(path.as_bytes().to_vec(), 8, contents, compressed)
    }

    /// Record an entry under an arbitrary (possibly non-UTF-8) name.
    pub fn add_stored_with_name_bytes(&mut self, name: Vec<u8>, contents: &[u8]) -> &mut Self {
        self.add_entry(name, 0, contents, contents.to_vec())
    }

    pub fn add_dir(&mut self, path: &str) -> &mut Self {
        let path = if path.ends_with('/') { path.to_string() } else { format!("{path}/") };
        self.add_entry(path.into_bytes(), 0, b"", Vec::new())
    }

    /// Record an entry with a compression method the reader does not
    /// support.
    pub fn add_with_method(&mut self, path: &str, method: u16, raw: &[u8]) -> &mut Self {
        self.add_entry(path.as_bytes().to_vec(), method, raw, raw.to_vec())
    }

    fn add_entry(&mut self, name: Vec<u8>, method: u16, contents: &[u8], stored: Vec<u8>) -> &mut Self {
        let header_offset = self.data.len() as u64;
        let crc32 = crc32fast::hash(contents);

        // Local file header.
        self.data.extend_from_slice(b"PK\x03\x04");
        self.push_u16(20); // version needed
        self.push_u16(0); // flags
        self.push_u16(method);
        self.push_u16(FIXTURE_DOS_TIME);
        self.push_u16(FIXTURE_DOS_DATE);
        self.push_u32(crc32);
        self.push_u32(stored.len() as u32);
        self.push_u32(contents.len() as u32);
        self.push_u16(name.len() as u16);
        self.push_u16(0); // extra field length
        self.data.extend_from_slice(&name);
        self.data.extend_from_slice(&stored);

        self.records.push(CentralRecord {
            name,
            method,
            crc32,
            compressed_size: stored.len() as u64,
            uncompressed_size: contents.len() as u64,
            header_offset,
        });
        self
    }

    pub fn build(mut self) -> Vec<u8> {
        let cd_offset = self.data.len() as u64;
        let entry_count = self.records.len() as u64;
        let records = std::mem::take(&mut self.records);

        for record in &records {
            self.data.extend_from_slice(b"PK\x01\x02");
            self.push_u16(if self.zip64 { 45 } else { 20 }); // version made by
            self.push_u16(if self.zip64 { 45 } else { 20 }); // version needed
            self.push_u16(0); // flags
            self.push_u16(record.method);
            self.push_u16(FIXTURE_DOS_TIME);
            self.push_u16(FIXTURE_DOS_DATE);
            self.push_u32(record.crc32);
            if self.zip64 {
                self.push_u32(0xFFFFFFFF);
                self.push_u32(0xFFFFFFFF);
            } else {
                self.push_u32(record.compressed_size as u32);
                self.push_u32(record.uncompressed_size as u32);
            }
            self.push_u16(record.name.len() as u16);
            self.push_u16(if self.zip64 { 28 } else { 0 }); // extra field length
            self.push_u16(0); // comment length
            self.push_u16(0); // disk number start
            self.push_u16(0); // internal attributes
            self.push_u32(0); // external attributes
            if self.zip64 {
                self.push_u32(0xFFFFFFFF);
            } else {
                self.push_u32(record.header_offset as u32);
            }
            let name = record.name.clone();
            self.data.extend_from_slice(&name);
            if self.zip64 {
                // Zip64 extended information: values in saturation order.
                self.push_u16(0x0001);
                self.push_u16(24);
                self.push_u64(record.uncompressed_size);
                self.push_u64(record.compressed_size);
                self.push_u64(record.header_offset);
            }
        }

        let cd_size = self.data.len() as u64 - cd_offset;

        if self.zip64 {
            let eocd64_offset = self.data.len() as u64;
            self.data.extend_from_slice(b"PK\x06\x06");
            self.push_u64(44); // record size, excluding sig and this field
            self.push_u16(45);
            self.push_u16(45);
            self.push_u32(0); // disk number
            self.push_u32(0); // disk with central directory
            self.push_u64(entry_count);
            self.push_u64(entry_count);
            self.push_u64(cd_size);
            self.push_u64(cd_offset);

            self.data.extend_from_slice(b"PK\x06\x07");
            self.push_u32(0); // disk with the zip64 EOCD
            self.push_u64(eocd64_offset);
            self.push_u32(1); // total disks
        }

        self.data.extend_from_slice(b"PK\x05\x06");
        self.push_u16(0); // disk number
        self.push_u16(0); // disk with central directory
        self.push_u16(entry_count as u16);
        self.push_u16(entry_count as u16);
        self.push_u32(cd_size as u32);
        self.push_u32(cd_offset as u32);
        let comment = std::mem::take(&mut self.comment);
        self.push_u16(comment.len() as u16);
        self.data.extend_from_slice(&comment);

        self.data
    }

    fn push_u16(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    fn push_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }

    fn push_u64(&mut self, v: u64) {
        self.data.extend_from_slice(&v.to_le_bytes());
    }
}

/// The RO-Crate document used by the crate fixtures.
pub fn rocrate_document() -> Vec<u8> {
    serde_json::json!({
        "@context": "https://w3id.org/ro/crate/1.1/context",
        "@graph": [
            {
                "@id": "ro-crate-metadata.json",
                "@type": "CreativeWork",
                "about": { "@id": "./" },
                "conformsTo": { "@id": "https://w3id.org/ro/crate/1.1" }
            },
            {
                "@id": "./",
                "@type": "Dataset",
                "name": "Weather observations 2024",
                "description": "Hourly observations from the rooftop station",
                "hasPart": [
                    { "@id": "data/observations.csv" },
                    { "@id": "README.md" }
                ]
            },
            {
                "@id": "data/observations.csv",
                "@type": "File",
                "name": "Observation table",
                "description": "One row per hourly reading"
            },
            {
                "@id": "README.md",
                "@type": "File",
                "name": "Read me first"
            }
        ]
    })
    .to_string()
    .into_bytes()
}

/// A five-entry RO-Crate archive: the metadata document, a directory, two
/// described files and one file the graph does not mention.
pub fn rocrate_archive() -> Vec<u8> {
    let mut builder = ZipBuilder::new();
    builder.add_deflated("ro-crate-metadata.json", &rocrate_document());
    builder.add_stored("README.md", b"# Weather observations\n");
    builder.add_dir("data");
    builder.add_deflated(
        "data/observations.csv",
        b"timestamp,temperature,humidity\n2024-03-15T10:00,11.2,0.63\n2024-03-15T11:00,12.0,0.61\n",
    );
    builder.add_stored("notes.txt", b"calibrated 2024-03-01\n");
    builder.build()
}

pub mod server {
    use std::net::SocketAddr;
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[derive(Clone)]
    pub struct ServerOptions {
        /// Include `Accept-Ranges: bytes` in HEAD responses.
        pub advertise_ranges: bool,
        /// Redirect hops to walk before reaching the archive.
        pub redirects: usize,
    }

    impl Default for ServerOptions {
        fn default() -> Self {
            Self { advertise_ranges: true, redirects: 0 }
        }
    }

    pub struct RangeServer {
        pub url: String,
        pub addr: SocketAddr,
    }

    /// Serve `data` at `/archive.zip` on an ephemeral local port.
    pub async fn serve(data: Vec<u8>) -> RangeServer {
        serve_with(data, ServerOptions::default()).await
    }

    pub async fn serve_with(data: Vec<u8>, options: ServerOptions) -> RangeServer {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let data = Arc::new(data);
        let accept_options = options.clone();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let data = Arc::clone(&data);
                let options = accept_options.clone();
                tokio::spawn(handle_connection(stream, data, options));
            }
        });

        let path = if options.redirects > 0 {
            format!("/hop/{}", options.redirects)
        } else {
            "/archive.zip".to_string()
        };
        RangeServer { url: format!("http://{addr}{path}"), addr }
    }

    async fn handle_connection(mut stream: TcpStream, data: Arc<Vec<u8>>, options: ServerOptions) {
        let mut request = Vec::new();
        let mut chunk = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&chunk[..n]),
            }
            if request.len() > 64 * 1024 {
                return;
            }
        }

        let text = String::from_utf8_lossy(&request);
        let mut lines = text.lines();
        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let method = parts.next().unwrap_or_default().to_string();
        let path = parts.next().unwrap_or("/").to_string();

        let mut range = None;
        for line in lines {
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':')
                && name.eq_ignore_ascii_case("range")
            {
                range = parse_range(value.trim());
            }
        }

        let response = build_response(&method, &path, range, &data, &options);
        stream.write_all(&response).await.ok();
        stream.shutdown().await.ok();
    }

    fn parse_range(value: &str) -> Option<(u64, u64)> {
        let spec = value.strip_prefix("bytes=")?;
        let (start, end) = spec.split_once('-')?;
        Some((start.parse().ok()?, end.parse().ok()?))
    }

    fn build_response(
        method: &str,
        path: &str,
        range: Option<(u64, u64)>,
        data: &[u8],
        options: &ServerOptions,
    ) -> Vec<u8> {
        if let Some(hop) = path.strip_prefix("/hop/") {
            let remaining: usize = hop.parse().unwrap_or(1);
            let target = if remaining <= 1 {
                "/archive.zip".to_string()
            } else {
                format!("/hop/{}", remaining - 1)
            };
            return format!(
                "HTTP/1.1 302 Found\r\nLocation: {target}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )
            .into_bytes();
        }

        if path != "/archive.zip" {
            return b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_vec();
        }

        if method == "HEAD" {
            let accept_ranges =
                if options.advertise_ranges { "Accept-Ranges: bytes\r\n" } else { "" };
            return format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\n{accept_ranges}Connection: close\r\n\r\n",
                data.len()
            )
            .into_bytes();
        }

        match range {
            Some((start, end)) => {
                let end = end.min(data.len() as u64 - 1);
                let body = &data[start as usize..=end as usize];
                let mut response = format!(
                    "HTTP/1.1 206 Partial Content\r\nContent-Length: {}\r\nContent-Range: bytes {start}-{end}/{}\r\nAccept-Ranges: bytes\r\nConnection: close\r\n\r\n",
                    body.len(),
                    data.len()
                )
                .into_bytes();
                response.extend_from_slice(body);
                response
            }
            None => {
                let mut response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    data.len()
                )
                .into_bytes();
                response.extend_from_slice(data);
                response
            }
        }
    }
}
