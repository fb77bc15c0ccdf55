//! Entry descriptors: the value object a caller fills in to describe one
//! archive member, and the writer's own finalized record for it.

use chrono::{DateTime, Local};

use crate::error::{Result, ZipError};

/// Compression method for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// No compression; bytes are stored verbatim.
    Stored = 0,
    /// RFC 1951 DEFLATE.
    Deflated = 8,
}

impl Method {
    pub(crate) fn wire_value(self) -> u16 {
        self as u16
    }

    /// "Version needed to extract" for this method (§4.2).
    pub(crate) fn version_needed(self) -> u16 {
        match self {
            Method::Stored => 10,
            Method::Deflated => 20,
        }
    }
}

/// A caller-supplied description of one archive member, built up with the
/// chainable setters below and handed to [`crate::ZipWriter::begin_entry`].
///
/// `EntryOptions` is never mutated by the writer; the writer derives its own
/// [`FinalizedEntry`] once the entry's data has been fully written.
#[derive(Debug, Clone)]
pub struct EntryOptions {
    pub(crate) name: String,
    pub(crate) mtime: Option<DateTime<Local>>,
    pub(crate) method: Option<Method>,
    pub(crate) declared_size: Option<u32>,
    pub(crate) declared_crc32: Option<u32>,
    pub(crate) local_extra: Vec<u8>,
    pub(crate) central_extra: Vec<u8>,
    pub(crate) comment: String,
    pub(crate) internal_attributes: u16,
    pub(crate) external_attributes: u32,
}

impl EntryOptions {
    /// Start describing an entry with the given archive-relative name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            mtime: None,
            method: None,
            declared_size: None,
            declared_crc32: None,
            local_extra: Vec::new(),
            central_extra: Vec::new(),
            comment: String::new(),
            internal_attributes: 0,
            external_attributes: 0,
        }
    }

    /// Override the writer's default compression method for this entry.
    pub fn method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the entry's modification time. Defaults to "now" if unset.
    pub fn mtime(mut self, mtime: DateTime<Local>) -> Self {
        self.mtime = Some(mtime);
        self
    }

    /// Declare the uncompressed size and CRC-32 up front. Mandatory for
    /// [`Method::Stored`] entries; ignored (and recomputed) for
    /// [`Method::Deflated`] entries.
    pub fn size_and_crc32(mut self, size: u32, crc32: u32) -> Self {
        self.declared_size = Some(size);
        self.declared_crc32 = Some(crc32);
        self
    }

    /// Bytes stored in the local file header's extra field.
    pub fn local_extra(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.local_extra = bytes.into();
        self
    }

    /// Bytes stored in the central directory header's extra field.
    pub fn central_extra(mut self, bytes: impl Into<Vec<u8>>) -> Self {
        self.central_extra = bytes.into();
        self
    }

    /// Entry comment, stored only in the central directory header.
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// 16-bit internal file attributes (central directory only).
    pub fn internal_attributes(mut self, value: u16) -> Self {
        self.internal_attributes = value;
        self
    }

    /// 32-bit external file attributes, e.g. Unix permission bits shifted
    /// into the high 16 bits (central directory only).
    pub fn external_attributes(mut self, value: u32) -> Self {
        self.external_attributes = value;
        self
    }

    pub(crate) fn validate_field_lengths(
        &self,
        encoded_name_len: usize,
        encoded_comment_len: usize,
    ) -> Result<()> {
        if encoded_name_len == 0 {
            return Err(ZipError::InvalidEntry("entry name is empty".to_string()));
        }
        if encoded_name_len > u16::MAX as usize {
            return Err(ZipError::InvalidEntry(format!(
                "entry name encodes to {} bytes, exceeds 65535",
                encoded_name_len
            )));
        }
        if self.local_extra.len() > u16::MAX as usize {
            return Err(ZipError::InvalidEntry(format!(
                "local extra field is {} bytes, exceeds 65535",
                self.local_extra.len()
            )));
        }
        if self.central_extra.len() > u16::MAX as usize {
            return Err(ZipError::InvalidEntry(format!(
                "central extra field is {} bytes, exceeds 65535",
                self.central_extra.len()
            )));
        }
        if encoded_comment_len > u16::MAX as usize {
            return Err(ZipError::InvalidEntry(format!(
                "comment encodes to {} bytes, exceeds 65535",
                encoded_comment_len
            )));
        }
        Ok(())
    }
}

/// The writer's own record of a closed entry, used to emit its central
/// directory header. Distinct from [`EntryOptions`] so the caller's
/// description is never mutated (see SPEC_FULL.md §9).
#[derive(Debug, Clone)]
pub(crate) struct FinalizedEntry {
    pub(crate) name: Vec<u8>,
    pub(crate) dos_time: u16,
    pub(crate) dos_date: u16,
    pub(crate) method: Method,
    pub(crate) general_purpose_flag: u16,
    pub(crate) crc32: u32,
    pub(crate) compressed_size: u32,
    pub(crate) uncompressed_size: u32,
    pub(crate) local_extra: Vec<u8>,
    pub(crate) central_extra: Vec<u8>,
    pub(crate) comment: Vec<u8>,
    pub(crate) internal_attributes: u16,
    pub(crate) external_attributes: u32,
    pub(crate) local_header_offset: u64,
}
