//! Transparent decompression of input files.
//!
//! Detection checks the file extension first and falls back to the stream's
//! magic bytes, so a gzip file without a `.gz` suffix is still read correctly.
//! Without any compression feature enabled, [`open_reader`] returns a plain
//! buffered reader.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// A decompressing wrapper for one input format.
pub trait InputCodec: Send + Sync {
    /// Human-readable codec name.
    fn name(&self) -> &str;

    /// Lowercase extensions with leading dot.
    fn extensions(&self) -> &[&str];

    /// Signature at the start of a compressed stream.
    fn magic_bytes(&self) -> Option<&[u8]>;

    /// Wrap `reader` with a decoder.
    fn wrap(&self, reader: Box<dyn Read + Send>) -> Box<dyn Read + Send>;
}

#[cfg(feature = "compression-gzip")]
struct GzipCodec;

#[cfg(feature = "compression-gzip")]
impl InputCodec for GzipCodec {
    fn name(&self) -> &str {
        "gzip"
    }

    fn extensions(&self) -> &[&str] {
        &[".gz", ".gzip"]
    }

    fn magic_bytes(&self) -> Option<&[u8]> {
        Some(&[0x1f, 0x8b])
    }

    fn wrap(&self, reader: Box<dyn Read + Send>) -> Box<dyn Read + Send> {
        // Multi-member: concatenated gzip parts decode as one stream.
        Box::new(flate2::read::MultiGzDecoder::new(reader))
    }
}

static CODECS: &[&dyn InputCodec] = &[
    #[cfg(feature = "compression-gzip")]
    &GzipCodec,
];

fn detect_from_extension(path: &Path) -> Option<&'static dyn InputCodec> {
    let name = path.to_string_lossy().to_lowercase();
    CODECS
        .iter()
        .copied()
        .find(|c| c.extensions().iter().any(|ext| name.ends_with(ext)))
}

fn detect_from_magic<R: BufRead>(reader: &mut R) -> Option<&'static dyn InputCodec> {
    let buf = reader.fill_buf().ok()?;
    if buf.is_empty() {
        return None;
    }
    CODECS
        .iter()
        .copied()
        .find(|c| c.magic_bytes().is_some_and(|m| buf.starts_with(m)))
}

/// Open `path` for line reading, decompressing when a codec matches.
///
/// # Errors
/// Returns an error if the file cannot be opened.
pub fn open_reader(path: impl AsRef<Path>) -> Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;

    if let Some(codec) = detect_from_extension(path) {
        tracing::debug!(path = %path.display(), codec = codec.name(), "decompressing input");
        return Ok(Box::new(BufReader::new(codec.wrap(Box::new(file)))));
    }

    let mut reader = BufReader::new(file);
    if let Some(codec) = detect_from_magic(&mut reader) {
        tracing::debug!(
            path = %path.display(),
            codec = codec.name(),
            "decompressing input (magic bytes)"
        );
        return Ok(Box::new(BufReader::new(codec.wrap(Box::new(reader)))));
    }
    Ok(Box::new(reader))
}
