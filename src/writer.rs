//! Streaming ZIP writer that compresses data on-the-fly without buffering
//! the archive or temp files.
//!
//! This eliminates:
//! - Temp file disk I/O
//! - Full-archive buffering
//! - Intermediate storage
//!
//! The writer never seeks its sink; `written` is the single authoritative
//! byte counter used for every header offset it records.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use crc32fast::Hasher as Crc32;
use encoding_rs::Encoding;
use flate2::{Compress, Compression, FlushCompress, Status};

use crate::dostime::to_dos_time;
use crate::entry::{EntryOptions, FinalizedEntry, Method};
use crate::error::{Result, ZipError};

const LOCAL_FILE_HEADER_SIGNATURE: u32 = 0x04034b50;
const DATA_DESCRIPTOR_SIGNATURE: u32 = 0x08074b50;
const CENTRAL_FILE_HEADER_SIGNATURE: u32 = 0x02014b50;
const END_OF_CENTRAL_DIRECTORY_SIGNATURE: u32 = 0x06054b50;

/// "Version made by" written into every central directory header.
const VERSION_MADE_BY: u16 = 20;

/// Deflate chunk buffer size; arbitrary, just bounds per-call allocation.
const DEFLATE_CHUNK: usize = 32 * 1024;

/// Wraps a byte sink and counts every byte written to it. This count is the
/// writer's sole source of truth for file offsets (the sink is never
/// seeked, per SPEC_FULL.md §5).
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

/// State for the entry currently being written; cleared on `close_entry`.
struct OpenEntry {
    name: Vec<u8>,
    comment: Vec<u8>,
    local_extra: Vec<u8>,
    central_extra: Vec<u8>,
    internal_attributes: u16,
    external_attributes: u32,
    method: Method,
    dos_time: u16,
    dos_date: u16,
    general_purpose_flag: u16,
    local_header_offset: u64,
    data_start: u64,
    declared_size: Option<u32>,
    declared_crc32: Option<u32>,
    crc: Crc32,
    deflate: Option<Compress>,
}

/// A single-threaded, streaming PKZIP archive writer.
///
/// Entries are opened with [`begin_entry`](ZipWriter::begin_entry), fed
/// payload bytes with [`write`](ZipWriter::write) (possibly across many
/// calls), and implicitly closed when the next entry begins or
/// [`finish`](ZipWriter::finish) is called. No entry bytes are buffered in
/// memory beyond what the deflate collaborator needs for one chunk; the
/// central directory index, however, is built up in memory for the
/// lifetime of the writer.
///
/// ```no_run
/// use zipcraft::{EntryOptions, Method, ZipWriter};
///
/// # fn main() -> zipcraft::Result<()> {
/// let mut writer = ZipWriter::create("out.zip")?;
///
/// writer.begin_entry(EntryOptions::new("hello.txt"))?;
/// writer.write(b"Hello, World!")?;
///
/// writer.begin_entry(EntryOptions::new("raw.bin").method(Method::Stored).size_and_crc32(0, 0))?;
///
/// writer.finish()?;
/// # Ok(())
/// # }
/// ```
pub struct ZipWriter<W: Write> {
    sink: CountingWriter<W>,
    entries: Vec<FinalizedEntry>,
    current: Option<OpenEntry>,
    comment: String,
    encoding: &'static Encoding,
    default_method: Method,
    default_level: u32,
}

impl ZipWriter<File> {
    /// Create a ZIP writer that truncates-or-creates the file at `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(File::create(path)?))
    }
}

impl<W: Write> ZipWriter<W> {
    /// Wrap an existing byte sink with default compression (DEFLATE, level 6).
    pub fn new(sink: W) -> Self {
        Self {
            sink: CountingWriter { inner: sink, written: 0 },
            entries: Vec::new(),
            current: None,
            comment: String::new(),
            encoding: encoding_rs::UTF_8,
            default_method: Method::Deflated,
            default_level: 6,
        }
    }

    /// Set the archive-level comment, written verbatim into the
    /// end-of-central-directory record. May be called any time before
    /// [`finish`](Self::finish).
    pub fn set_comment(&mut self, comment: impl Into<String>) {
        self.comment = comment.into();
    }

    /// Choose the text encoding applied to all subsequent entry names,
    /// local/central extra consumers, and comments. `label` is looked up
    /// the way HTML documents name charsets (e.g. `"UTF-8"`, `"SHIFT_JIS"`,
    /// `"windows-1252"`).
    pub fn set_encoding(&mut self, label: &str) -> Result<()> {
        self.encoding = Encoding::for_label(label.as_bytes())
            .ok_or_else(|| ZipError::UnsupportedEncoding(label.to_string()))?;
        Ok(())
    }

    /// Set the compression method assigned to subsequent entries that
    /// don't specify their own.
    pub fn set_default_method(&mut self, method: Method) {
        self.default_method = method;
    }

    /// Set the DEFLATE level (0-9) assigned to subsequent entries that
    /// don't specify their own. Has no effect on STORED entries.
    pub fn set_default_level(&mut self, level: u32) {
        self.default_level = level.min(9);
    }

    /// Finalize any in-flight entry, then begin a new one.
    pub fn begin_entry(&mut self, options: EntryOptions) -> Result<()> {
        self.close_entry()?;

        let method = options.method.unwrap_or(self.default_method);
        let mtime = options.mtime.unwrap_or_else(chrono::Local::now);

        let (name_bytes, _, _) = self.encoding.encode(&options.name);
        let (comment_bytes, _, _) = self.encoding.encode(&options.comment);
        options.validate_field_lengths(name_bytes.len(), comment_bytes.len())?;

        if method == Method::Stored
            && (options.declared_size.is_none() || options.declared_crc32.is_none())
        {
            return Err(ZipError::MissingStoredMetadata);
        }

        let (dos_time, dos_date) = to_dos_time(mtime);
        let general_purpose_flag = if method == Method::Deflated { 0x0008 } else { 0x0000 };
        let local_header_offset = self.sink.written;

        self.sink.write_all(&LOCAL_FILE_HEADER_SIGNATURE.to_le_bytes())?;
        self.sink.write_all(&method.version_needed().to_le_bytes())?;
        self.sink.write_all(&general_purpose_flag.to_le_bytes())?;
        self.sink.write_all(&method.wire_value().to_le_bytes())?;
        self.sink.write_all(&dos_time.to_le_bytes())?;
        self.sink.write_all(&dos_date.to_le_bytes())?;

        match method {
            Method::Deflated => {
                self.sink.write_all(&0u32.to_le_bytes())?; // crc-32 placeholder
                self.sink.write_all(&0u32.to_le_bytes())?; // compressed size placeholder
                self.sink.write_all(&0u32.to_le_bytes())?; // uncompressed size placeholder
            }
            Method::Stored => {
                let size = options.declared_size.unwrap();
                let crc32 = options.declared_crc32.unwrap();
                self.sink.write_all(&crc32.to_le_bytes())?;
                self.sink.write_all(&size.to_le_bytes())?; // compressed size == uncompressed size
                self.sink.write_all(&size.to_le_bytes())?;
            }
        }

        self.sink.write_all(&(name_bytes.len() as u16).to_le_bytes())?;
        self.sink
            .write_all(&(options.local_extra.len() as u16).to_le_bytes())?;
        self.sink.write_all(&name_bytes)?;
        self.sink.write_all(&options.local_extra)?;

        let data_start = self.sink.written;

        let deflate = match method {
            Method::Deflated => Some(Compress::new(Compression::new(self.default_level), false)),
            Method::Stored => None,
        };

        self.current = Some(OpenEntry {
            name: name_bytes.into_owned(),
            comment: comment_bytes.into_owned(),
            local_extra: options.local_extra,
            central_extra: options.central_extra,
            internal_attributes: options.internal_attributes,
            external_attributes: options.external_attributes,
            method,
            dos_time,
            dos_date,
            general_purpose_flag,
            local_header_offset,
            data_start,
            declared_size: options.declared_size,
            declared_crc32: options.declared_crc32,
            crc: Crc32::new(),
            deflate,
        });

        Ok(())
    }

    /// Append payload bytes to the currently open entry. May be called
    /// any number of times; the entry's CRC-32 and (for DEFLATE) compressed
    /// stream accumulate across calls.
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        let entry = self.current.as_mut().ok_or(ZipError::NoOpenEntry)?;
        entry.crc.update(data);

        match entry.method {
            Method::Stored => {
                self.sink.write_all(data)?;
            }
            Method::Deflated => {
                let deflate = entry.deflate.as_mut().expect("deflated entry has a compressor");
                feed_deflate(&mut self.sink, deflate, data)?;
            }
        }

        Ok(())
    }

    /// Finalize the currently open entry, if any. A no-op if no entry is
    /// open. Called implicitly by [`begin_entry`](Self::begin_entry) and
    /// [`finish`](Self::finish).
    pub fn close_entry(&mut self) -> Result<()> {
        let Some(mut open) = self.current.take() else {
            return Ok(());
        };

        let (crc32, compressed_size, uncompressed_size) = match open.method {
            Method::Deflated => {
                let deflate = open.deflate.as_mut().expect("deflated entry has a compressor");
                finish_deflate(&mut self.sink, deflate)?;

                let crc32 = open.crc.clone().finalize();
                let compressed_size = deflate.total_out() as u32;
                let uncompressed_size = deflate.total_in() as u32;

                self.sink
                    .write_all(&DATA_DESCRIPTOR_SIGNATURE.to_le_bytes())?;
                self.sink.write_all(&crc32.to_le_bytes())?;
                self.sink.write_all(&compressed_size.to_le_bytes())?;
                self.sink.write_all(&uncompressed_size.to_le_bytes())?;

                (crc32, compressed_size, uncompressed_size)
            }
            Method::Stored => {
                let actual_crc32 = open.crc.clone().finalize();
                let actual_len = self.sink.written - open.data_start;
                let declared_crc32 = open.declared_crc32.expect("validated at begin_entry");
                let declared_size = open.declared_size.expect("validated at begin_entry");

                if actual_crc32 != declared_crc32 {
                    return Err(ZipError::StoredCrcMismatch {
                        declared: declared_crc32,
                        actual: actual_crc32,
                    });
                }
                if actual_len != declared_size as u64 {
                    return Err(ZipError::StoredSizeMismatch {
                        declared: declared_size,
                        actual: actual_len,
                    });
                }

                (actual_crc32, declared_size, declared_size)
            }
        };

        self.entries.push(FinalizedEntry {
            name: open.name,
            dos_time: open.dos_time,
            dos_date: open.dos_date,
            method: open.method,
            general_purpose_flag: open.general_purpose_flag,
            crc32,
            compressed_size,
            uncompressed_size,
            local_extra: open.local_extra,
            central_extra: open.central_extra,
            comment: open.comment,
            internal_attributes: open.internal_attributes,
            external_attributes: open.external_attributes,
            local_header_offset: open.local_header_offset,
        });

        Ok(())
    }

    /// Close any open entry, emit the central directory and
    /// end-of-central-directory record, and hand back the underlying sink.
    ///
    /// Consuming `self` here is what enforces the writer's `Open -> Closed`
    /// lifecycle (SPEC_FULL.md §3): once `finish` runs, the writer no
    /// longer exists, so no further operation can be attempted on it — the
    /// compiler rejects that instead of a runtime check having to.
    pub fn finish(mut self) -> Result<W> {
        self.close_entry()?;

        let cd_offset = self.sink.written;
        for entry in &self.entries {
            self.sink
                .write_all(&CENTRAL_FILE_HEADER_SIGNATURE.to_le_bytes())?;
            self.sink.write_all(&VERSION_MADE_BY.to_le_bytes())?;
            self.sink
                .write_all(&entry.method.version_needed().to_le_bytes())?;
            self.sink
                .write_all(&entry.general_purpose_flag.to_le_bytes())?;
            self.sink.write_all(&entry.method.wire_value().to_le_bytes())?;
            self.sink.write_all(&entry.dos_time.to_le_bytes())?;
            self.sink.write_all(&entry.dos_date.to_le_bytes())?;
            self.sink.write_all(&entry.crc32.to_le_bytes())?;
            self.sink.write_all(&entry.compressed_size.to_le_bytes())?;
            self.sink.write_all(&entry.uncompressed_size.to_le_bytes())?;
            self.sink
                .write_all(&(entry.name.len() as u16).to_le_bytes())?;
            self.sink
                .write_all(&(entry.central_extra.len() as u16).to_le_bytes())?;
            self.sink
                .write_all(&(entry.comment.len() as u16).to_le_bytes())?;
            self.sink.write_all(&0u16.to_le_bytes())?; // disk number start
            self.sink
                .write_all(&entry.internal_attributes.to_le_bytes())?;
            self.sink
                .write_all(&entry.external_attributes.to_le_bytes())?;
            self.sink
                .write_all(&(entry.local_header_offset as u32).to_le_bytes())?;
            self.sink.write_all(&entry.name)?;
            self.sink.write_all(&entry.central_extra)?;
            self.sink.write_all(&entry.comment)?;
        }
        let cd_length = self.sink.written - cd_offset;

        self.sink
            .write_all(&END_OF_CENTRAL_DIRECTORY_SIGNATURE.to_le_bytes())?;
        self.sink.write_all(&0u16.to_le_bytes())?; // disk number
        self.sink.write_all(&0u16.to_le_bytes())?; // disk where central dir starts
        self.sink
            .write_all(&(self.entries.len() as u16).to_le_bytes())?; // entries on this disk
        self.sink
            .write_all(&(self.entries.len() as u16).to_le_bytes())?; // total entries
        self.sink.write_all(&(cd_length as u32).to_le_bytes())?;
        self.sink.write_all(&(cd_offset as u32).to_le_bytes())?;

        let (comment_bytes, _, _) = self.encoding.encode(&self.comment);
        self.sink
            .write_all(&(comment_bytes.len() as u16).to_le_bytes())?;
        self.sink.write_all(&comment_bytes)?;

        self.sink.flush()?;
        self.entries.clear();

        Ok(self.sink.inner)
    }
}

/// Push `input` through the deflate collaborator, writing every produced
/// compressed byte straight to the sink. No full-entry buffering: output
/// is drained in fixed-size chunks as it's produced.
fn feed_deflate<W: Write>(
    sink: &mut CountingWriter<W>,
    compress: &mut Compress,
    mut input: &[u8],
) -> Result<()> {
    let mut buf = [0u8; DEFLATE_CHUNK];

    while !input.is_empty() {
        let before_in = compress.total_in();
        let before_out = compress.total_out();

        let status = compress
            .compress(input, &mut buf, FlushCompress::None)
            .map_err(|e| ZipError::CompressorFailure(e.to_string()))?;

        let consumed = (compress.total_in() - before_in) as usize;
        let produced = (compress.total_out() - before_out) as usize;

        if produced > 0 {
            sink.write_all(&buf[..produced])?;
        }
        input = &input[consumed..];

        if consumed == 0 && produced == 0 && status != Status::StreamEnd {
            return Err(ZipError::CompressorFailure(
                "deflate stream made no progress".to_string(),
            ));
        }
    }

    Ok(())
}

/// Drain the deflate collaborator's remaining buffered output after its
/// last input chunk.
fn finish_deflate<W: Write>(sink: &mut CountingWriter<W>, compress: &mut Compress) -> Result<()> {
    let mut buf = [0u8; DEFLATE_CHUNK];

    loop {
        let before_out = compress.total_out();
        let status = compress
            .compress(&[], &mut buf, FlushCompress::Finish)
            .map_err(|e| ZipError::CompressorFailure(e.to_string()))?;
        let produced = (compress.total_out() - before_out) as usize;

        if produced > 0 {
            sink.write_all(&buf[..produced])?;
        }
        if status == Status::StreamEnd {
            break;
        }
    }

    Ok(())
}
