//! In-memory module archives.

use bytes::Bytes;
use std::fmt;
use std::io::{Cursor, Read};

/// Canonical file name of a module manifest.
pub const MOD_FILE_NAME: &str = "go.mod";

/// A zip archive held in memory.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Blob(Bytes);

impl Blob {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read the module manifest out of the archive.
    ///
    /// Only entries whose base name is exactly `go.mod` match. When several
    /// match, the one closest to the archive root wins. Returns `None` if the
    /// archive carries no manifest.
    pub fn mod_file(&self) -> crate::Result<Option<String>> {
        let mut archive = zip::ZipArchive::new(Cursor::new(self.as_bytes()))?;

        let mut best: Option<(usize, usize)> = None;
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i)?;
            if entry.is_dir() || base_name(entry.name()) != MOD_FILE_NAME {
                continue;
            }
            let depth = entry.name().matches('/').count();
            if best.is_none_or(|(_, d)| depth < d) {
                best = Some((i, depth));
            }
        }

        let Some((index, _)) = best else {
            return Ok(None);
        };
        let mut entry = archive.by_index(index)?;
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        Ok(Some(text))
    }

    /// Names of every entry, in archive order.
    pub fn entry_names(&self) -> crate::Result<Vec<String>> {
        let archive = zip::ZipArchive::new(Cursor::new(self.as_bytes()))?;
        Ok(archive.file_names().map(str::to_string).collect())
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Self(Bytes::from(bytes))
    }
}

impl From<Bytes> for Blob {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blob({} bytes)", self.0.len())
    }
}

/// Last path element of a `/`-separated entry name.
pub(crate) fn base_name(name: &str) -> &str {
    let trimmed = name.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((_, base)) => base,
        None => trimmed,
    }
}

/// Build an archive from `(name, contents)` pairs. Names ending in `/` become
/// directory entries.
pub fn build_archive<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a [u8])>,
) -> crate::Result<Blob> {
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, contents) in entries {
        if name.ends_with('/') {
            writer.add_directory(name, options)?;
        } else {
            writer.start_file(name, options)?;
            writer.write_all(contents)?;
        }
    }
    let cursor = writer.finish()?;
    Ok(Blob::from(cursor.into_inner()))
}
