//! SQL dump file handling.
//!
//! Dumps may be plain SQL or gzip-compressed. Compression is detected from
//! the file's magic bytes, not its extension, so `site.sql` that is actually
//! gzipped still loads.

use std::fs::File;
use std::io::{BufReader, Read};

use camino::Utf8Path;
use flate2::read::MultiGzDecoder;

use crate::error::RsdrupalError;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression of a dump file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Compression {
    /// Plain SQL text.
    None,
    /// gzip stream (possibly multi-member).
    Gzip,
}

/// Detects the compression of the file at `path` by reading its first bytes.
///
/// Files shorter than the magic number are treated as plain.
pub fn detect_compression(path: &Utf8Path) -> Result<Compression, RsdrupalError> {
    let file = File::open(path)
        .map_err(|e| RsdrupalError::io(format!("failed to open dump file: {}", path), e))?;
    let mut magic = Vec::with_capacity(GZIP_MAGIC.len());
    file.take(GZIP_MAGIC.len() as u64)
        .read_to_end(&mut magic)
        .map_err(|e| RsdrupalError::io(format!("failed to read dump file: {}", path), e))?;

    if magic == GZIP_MAGIC {
        Ok(Compression::Gzip)
    } else {
        Ok(Compression::None)
    }
}

/// Opens a dump file as a stream of SQL text, decompressing if needed.
pub fn open_dump(
    path: &Utf8Path,
    compression: Compression,
) -> Result<Box<dyn Read + Send>, RsdrupalError> {
    let file = File::open(path)
        .map_err(|e| RsdrupalError::io(format!("failed to open dump file: {}", path), e))?;
    let reader = BufReader::new(file);
    Ok(match compression {
        Compression::None => Box::new(reader),
        Compression::Gzip => Box::new(MultiGzDecoder::new(reader)),
    })
}
