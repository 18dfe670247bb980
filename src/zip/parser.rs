//! Low-level ZIP archive parser.
//!
//! ZIP files are read from the end: locate the End of Central Directory
//! record in the trailing window, detect the ZIP64 locator, then fetch the
//! whole central directory with a single ranged read and decode one entry
//! record per member. Only the trailer and the central directory are ever
//! fetched to open an archive, which is what makes remote exploration over
//! Range requests cheap.

use std::io::{Cursor, Read};
use std::sync::Arc;

use byteorder::{LittleEndian, ReadBytesExt};
use indexmap::IndexMap;

use super::archive::ZipArchive;
use super::structures::*;
use crate::error::{Error, Result};
use crate::io::RangeReader;

/// Maximum ZIP comment size allowed by the format (65535 bytes).
///
/// Bounds the trailing window searched for the EOCD signature.
const MAX_COMMENT_SIZE: u64 = 65535;

/// Low-level ZIP structure parser over a [`RangeReader`].
///
/// Typically used through [`ZipArchive::open`](super::ZipArchive::open)
/// rather than directly.
pub struct ZipParser {
    reader: Arc<dyn RangeReader>,
    len: u64,
}

impl ZipParser {
    pub fn new(reader: Arc<dyn RangeReader>) -> Self {
        let len = reader.len();
        Self { reader, len }
    }

    /// Parse the archive index and freeze it into a [`ZipArchive`] handle.
    pub async fn parse(self) -> Result<ZipArchive> {
        let (eocd, eocd_offset) = self.find_eocd().await?;
        let locator = self.find_zip64_locator(eocd_offset).await?;
        let zip64 = locator.is_some();

        // Classic EOCD fields are authoritative unless saturated, in which
        // case the ZIP64 EOCD record carries the real extents.
        let (cd_offset, cd_size, entry_hint) = match &locator {
            Some(locator) if eocd.needs_zip64() => {
                let eocd64 = self.read_zip64_eocd(locator).await?;
                (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
            }
            _ => (eocd.cd_offset as u64, eocd.cd_size as u64, eocd.total_entries as u64),
        };

        if cd_offset.checked_add(cd_size).is_none_or(|end| end > eocd_offset) {
            return Err(Error::MalformedArchive(format!(
                "central directory {cd_offset}+{cd_size} overruns the EOCD at {eocd_offset}"
            )));
        }

        let cd_data = self.reader.read(cd_offset, cd_size).await?;
        let mut entries = IndexMap::with_capacity(entry_hint as usize);
        let mut cursor = Cursor::new(cd_data.as_ref());

        let mut index = 0;
        while (cursor.position() as usize) < cd_data.len() {
            let entry = parse_cdfh(&mut cursor, index)?;
            let path = entry.path.clone();
            if entries.insert(path.clone(), entry).is_some() {
                return Err(Error::MalformedArchive(format!("duplicate entry path {path:?}")));
            }
            index += 1;
        }

        Ok(ZipArchive::from_parts(self.reader, entries, self.len, zip64))
    }

    /// Find and parse the End of Central Directory record.
    ///
    /// Fast path: the archive carries no comment and the EOCD sits exactly
    /// 22 bytes from the end. Otherwise the trailing window (comment
    /// maximum plus the record itself) is scanned backwards for the
    /// signature, validating the comment length against the bytes that
    /// actually remain so payload data that happens to contain the
    /// signature is not mistaken for the record.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        const EOCD_SIZE: usize = EndOfCentralDirectory::SIZE;

        if self.len < EOCD_SIZE as u64 {
            return Err(Error::MalformedArchive(format!(
                "{} bytes is too small to hold an archive trailer",
                self.len
            )));
        }

        let offset = self.len - EOCD_SIZE as u64;
        let buf = self.reader.read(offset, EOCD_SIZE as u64).await?;
        if &buf[0..4] == EndOfCentralDirectory::SIGNATURE && &buf[20..22] == b"\x00\x00" {
            return Ok((EndOfCentralDirectory::from_bytes(&buf)?, offset));
        }

        let search_size = (MAX_COMMENT_SIZE + EOCD_SIZE as u64).min(self.len);
        let search_start = self.len - search_size;
        let buf = self.reader.read(search_start, search_size).await?;

        for i in (0..=buf.len() - EOCD_SIZE).rev() {
            if &buf[i..i + 4] == EndOfCentralDirectory::SIGNATURE {
                let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
                if comment_len == buf.len() - i - EOCD_SIZE {
                    let eocd = EndOfCentralDirectory::from_bytes(&buf[i..i + EOCD_SIZE])?;
                    return Ok((eocd, search_start + i as u64));
                }
            }
        }

        Err(Error::MalformedArchive(
            "end of central directory record not found in trailing window".into(),
        ))
    }

    /// Probe the 20 bytes immediately preceding the EOCD for the ZIP64
    /// locator. Presence of its signature is what defines a ZIP64 archive.
    async fn find_zip64_locator(&self, eocd_offset: u64) -> Result<Option<Zip64EocdLocator>> {
        let Some(locator_offset) = eocd_offset.checked_sub(Zip64EocdLocator::SIZE as u64) else {
            return Ok(None);
        };

        let buf = self.reader.read(locator_offset, Zip64EocdLocator::SIZE as u64).await?;
        if &buf[0..4] != Zip64EocdLocator::SIGNATURE {
            return Ok(None);
        }

        Zip64EocdLocator::from_bytes(&buf).map(Some)
    }

    async fn read_zip64_eocd(&self, locator: &Zip64EocdLocator) -> Result<Zip64Eocd> {
        let buf = self.reader.read(locator.eocd64_offset, Zip64Eocd::MIN_SIZE as u64).await?;
        Zip64Eocd::from_bytes(&buf)
    }
}

/// Decode one Central Directory File Header at the cursor.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>, index: usize) -> Result<ZipEntry> {
    let data_len = cursor.get_ref().len();
    let start = cursor.position() as usize;

    if data_len - start < CDFH_MIN_SIZE {
        return Err(Error::MalformedArchive(format!(
            "truncated central directory entry {index} at offset {start}"
        )));
    }

    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(Error::MalformedArchive(format!(
            "bad signature {sig:02x?} decoding central directory entry {index}"
        )));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let _flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()? as usize;
    let extra_field_length = cursor.read_u16::<LittleEndian>()? as usize;
    let file_comment_length = cursor.read_u16::<LittleEndian>()? as usize;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut header_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let variable = file_name_length + extra_field_length + file_comment_length;
    if data_len < start + CDFH_MIN_SIZE + variable {
        return Err(Error::MalformedArchive(format!(
            "inconsistent lengths in central directory entry {index}"
        )));
    }

    let mut name = vec![0u8; file_name_length];
    cursor.read_exact(&mut name)?;
    let path = String::from_utf8(name).map_err(|_| {
        Error::MalformedArchive(format!("entry {index} name is not valid UTF-8"))
    })?;

    // Zip64 extended information: 64-bit values are present sequentially
    // for exactly the header fields saturated at 0xFFFFFFFF.
    let extra_end = cursor.position() + extra_field_length as u64;
    while cursor.position() + 4 <= extra_end {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()? as u64;
        let field_end = cursor.position() + field_size;
        if field_end > extra_end {
            return Err(Error::MalformedArchive(format!(
                "extra field {header_id:#06x} overruns central directory entry {index}"
            )));
        }

        if header_id == ZIP64_EXTRA_FIELD_ID {
            if uncompressed_size == ZIP64_FIELD_SATURATED && cursor.position() + 8 <= field_end {
                uncompressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if compressed_size == ZIP64_FIELD_SATURATED && cursor.position() + 8 <= field_end {
                compressed_size = cursor.read_u64::<LittleEndian>()?;
            }
            if header_offset == ZIP64_FIELD_SATURATED && cursor.position() + 8 <= field_end {
                header_offset = cursor.read_u64::<LittleEndian>()?;
            }
        }

        cursor.set_position(field_end);
    }
    cursor.set_position(extra_end);

    cursor.set_position(cursor.position() + file_comment_length as u64);

    Ok(ZipEntry {
        path,
        header_offset,
        compression: CompressionMethod::from_u16(compression_method),
        compressed_size,
        uncompressed_size,
        crc32,
        date_time: ZipDateTime::new(last_mod_date, last_mod_time),
    })
}
