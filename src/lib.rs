//! # zipcraft: streaming PKZIP writer
//!
//! `zipcraft` serializes a sequence of named byte payloads into the PKZIP
//! archive container format. It writes entry bytes straight to a caller-
//! supplied sink as they arrive — store or deflate — while keeping only the
//! central-directory index in memory, so archive size is bounded by the
//! sink, not by process memory.
//!
//! ## Quick start
//!
//! ```no_run
//! use zipcraft::{EntryOptions, ZipWriter};
//!
//! # fn main() -> zipcraft::Result<()> {
//! let mut writer = ZipWriter::create("out.zip")?;
//!
//! writer.begin_entry(EntryOptions::new("hello.txt"))?;
//! writer.write(b"Hello, World!")?;
//!
//! writer.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! Reading ZIP archives, ZIP64, encryption, and split volumes are out of
//! scope; see the crate's design notes for the full rationale.

mod dostime;
pub mod entry;
pub mod error;
pub mod writer;

pub use entry::{EntryOptions, Method};
pub use error::{Result, ZipError};
pub use writer::ZipWriter;
