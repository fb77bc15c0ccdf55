//! Error types for zipcraft

use std::io;

/// Result type for zipcraft operations
pub type Result<T> = std::result::Result<T, ZipError>;

/// Error types that can occur while writing a ZIP archive
#[derive(Debug)]
pub enum ZipError {
    /// The byte sink reported an I/O failure.
    Io(io::Error),
    /// The deflate collaborator failed to compress or flush its input.
    CompressorFailure(String),
    /// A caller-supplied entry was structurally invalid (empty name, or a
    /// name/extra-field/comment whose encoded length exceeds the 16-bit
    /// wire limit of 65535 bytes).
    InvalidEntry(String),
    /// A STORED entry was opened without a declared size and CRC-32.
    MissingStoredMetadata,
    /// A STORED entry's actual CRC-32 did not match its declared CRC-32.
    StoredCrcMismatch { declared: u32, actual: u32 },
    /// A STORED entry's actual byte count did not match its declared size.
    StoredSizeMismatch { declared: u32, actual: u64 },
    /// The configured text encoding label is not recognized.
    UnsupportedEncoding(String),
    /// `write` or `close_entry` was called with no entry open.
    NoOpenEntry,
}

impl std::fmt::Display for ZipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ZipError::Io(e) => write!(f, "I/O error: {}", e),
            ZipError::CompressorFailure(msg) => write!(f, "deflate compressor failed: {}", msg),
            ZipError::InvalidEntry(msg) => write!(f, "invalid entry: {}", msg),
            ZipError::MissingStoredMetadata => write!(
                f,
                "stored entry requires a declared size and CRC-32 before data is written"
            ),
            ZipError::StoredCrcMismatch { declared, actual } => write!(
                f,
                "stored entry CRC mismatch: declared 0x{:08x}, actual 0x{:08x}",
                declared, actual
            ),
            ZipError::StoredSizeMismatch { declared, actual } => write!(
                f,
                "stored entry size mismatch: declared {} bytes, wrote {} bytes",
                declared, actual
            ),
            ZipError::UnsupportedEncoding(label) => {
                write!(f, "unsupported text encoding: {}", label)
            }
            ZipError::NoOpenEntry => {
                write!(f, "no entry is open; call begin_entry before writing data")
            }
        }
    }
}

impl std::error::Error for ZipError {}

impl From<io::Error> for ZipError {
    fn from(err: io::Error) -> Self {
        ZipError::Io(err)
    }
}
