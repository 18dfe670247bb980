use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Error, Result};

/// ZIP compression methods supported for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl CompressionMethod {
    pub fn from_u16(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            _ => CompressionMethod::Unknown(value),
        }
    }

    pub fn as_u16(&self) -> u16 {
        match self {
            CompressionMethod::Stored => 0,
            CompressionMethod::Deflate => 8,
            CompressionMethod::Unknown(v) => *v,
        }
    }
}

/// End of Central Directory (EOCD) - 22 bytes minimum
pub struct EndOfCentralDirectory {
    pub disk_number: u16,
    pub disk_with_cd: u16,
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::MalformedArchive(
                "invalid end of central directory record".into(),
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_number: cursor.read_u16::<LittleEndian>()?,
            disk_with_cd: cursor.read_u16::<LittleEndian>()?,
            disk_entries: cursor.read_u16::<LittleEndian>()?,
            total_entries: cursor.read_u16::<LittleEndian>()?,
            cd_size: cursor.read_u32::<LittleEndian>()?,
            cd_offset: cursor.read_u32::<LittleEndian>()?,
            comment_len: cursor.read_u16::<LittleEndian>()?,
        })
    }

    /// Whether any field is saturated and must be refined from the ZIP64
    /// EOCD record.
    pub fn needs_zip64(&self) -> bool {
        self.disk_entries == 0xFFFF
            || self.total_entries == 0xFFFF
            || self.cd_size == 0xFFFFFFFF
            || self.cd_offset == 0xFFFFFFFF
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
pub struct Zip64EocdLocator {
    pub disk_with_eocd64: u32,
    pub eocd64_offset: u64,
    pub total_disks: u32,
}

impl Zip64EocdLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::MalformedArchive(
                "invalid ZIP64 end of central directory locator".into(),
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            disk_with_eocd64: cursor.read_u32::<LittleEndian>()?,
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
            total_disks: cursor.read_u32::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory - 56 bytes minimum
pub struct Zip64Eocd {
    pub eocd64_size: u64,
    pub version_made_by: u16,
    pub version_needed: u16,
    pub disk_number: u32,
    pub disk_with_cd: u32,
    pub disk_entries: u64,
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64Eocd {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::MalformedArchive(
                "invalid ZIP64 end of central directory record".into(),
            ));
        }

        let mut cursor = Cursor::new(&data[4..]);

        Ok(Self {
            eocd64_size: cursor.read_u64::<LittleEndian>()?,
            version_made_by: cursor.read_u16::<LittleEndian>()?,
            version_needed: cursor.read_u16::<LittleEndian>()?,
            disk_number: cursor.read_u32::<LittleEndian>()?,
            disk_with_cd: cursor.read_u32::<LittleEndian>()?,
            disk_entries: cursor.read_u64::<LittleEndian>()?,
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";
pub const CDFH_MIN_SIZE: usize = 46;

/// Local File Header - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// Extra field ID of the Zip64 extended information record.
pub const ZIP64_EXTRA_FIELD_ID: u16 = 0x0001;

/// Value of a 32-bit header field that defers to the Zip64 extra field.
pub const ZIP64_FIELD_SATURATED: u64 = 0xFFFFFFFF;

/// DOS-encoded modification timestamp carried by every ZIP entry.
///
/// Bit fields, LSB to MSB: seconds/2 (5), minutes (6), hours (5) in `time`;
/// day (5), month (4), year since 1980 (7) in `date`. Decoded as a local
/// calendar moment without timezone adjustment.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ZipDateTime {
    pub(crate) date: u16,
    pub(crate) time: u16,
}

impl ZipDateTime {
    pub fn new(date: u16, time: u16) -> Self {
        Self { date, time }
    }

    pub fn year(&self) -> i32 {
        (((self.date >> 9) & 0x7F) + 1980).into()
    }

    pub fn month(&self) -> u32 {
        ((self.date >> 5) & 0x0F).into()
    }

    pub fn day(&self) -> u32 {
        (self.date & 0x1F).into()
    }

    pub fn hour(&self) -> u32 {
        ((self.time >> 11) & 0x1F).into()
    }

    pub fn minute(&self) -> u32 {
        ((self.time >> 5) & 0x3F).into()
    }

    pub fn second(&self) -> u32 {
        ((self.time & 0x1F) << 1).into()
    }

    /// Calendar moment, or `None` when the encoded fields are out of range
    /// (month 0 archives exist in the wild).
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        NaiveDate::from_ymd_opt(self.year(), self.month(), self.day())?
            .and_hms_opt(self.hour(), self.minute(), self.second())
    }
}

impl std::fmt::Display for ZipDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}:{:02}",
            self.year(),
            self.month(),
            self.day(),
            self.hour(),
            self.minute(),
            self.second()
        )
    }
}

/// Whether an entry names a file or a directory.
///
/// Distinguished solely by a trailing `/` on the stored path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// One parsed central-directory record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    /// Decoded member path; unique within the archive.
    pub path: String,
    /// Absolute offset of the Local File Header.
    pub header_offset: u64,
    pub compression: CompressionMethod,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    /// CRC-32 recorded in the central directory; not verified at extract.
    pub crc32: u32,
    pub date_time: ZipDateTime,
}

impl ZipEntry {
    pub fn kind(&self) -> EntryKind {
        if self.path.ends_with('/') {
            EntryKind::Directory
        } else {
            EntryKind::File
        }
    }

    pub fn is_dir(&self) -> bool {
        self.kind() == EntryKind::Directory
    }

    /// True iff the stored payload differs in size from the output.
    pub fn is_compressed(&self) -> bool {
        self.compressed_size != self.uncompressed_size
    }

    /// The last path segment, used as the default display name.
    pub fn name(&self) -> &str {
        self.path.trim_end_matches('/').rsplit('/').next().unwrap_or(&self.path)
    }
}
