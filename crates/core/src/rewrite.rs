//! Normalization of raw VCS archives into module layout.
//!
//! Hosts serve archives with a single host-specific top-level directory
//! (`bar-2.0.0/`, `bar-fbec762f837d/`). The module protocol needs every entry
//! under `{source}@{version}/` instead, without vendored dependencies and
//! without nested modules.

use crate::coordinate::ModuleCoordinate;
use crate::zipfile::{Blob, MOD_FILE_NAME, base_name};
use std::collections::HashSet;
use std::io::Cursor;

/// VCS housekeeping files dropped from the archive root.
const ROOT_HOUSEKEEPING: &[&str] = &[".hg_archival.txt", ".gitattributes"];

/// Rewrite a raw archive for `coordinate`.
///
/// Must only be applied once: an archive already in module layout is
/// rejected.
pub fn rewrite(coordinate: &ModuleCoordinate, raw: &Blob) -> crate::Result<Blob> {
    let mut archive = zip::ZipArchive::new(Cursor::new(raw.as_bytes()))?;
    let target_prefix = coordinate.zip_prefix();

    let mut prefix: Option<String> = None;
    let mut submodules: HashSet<String> = HashSet::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name();

        if name.starts_with(&target_prefix) {
            return Err(crate::Error::MalformedArchive(format!(
                "entry {name:?} is already in module layout"
            )));
        }

        let top = match name.find('/') {
            Some(idx) => &name[..=idx],
            None => {
                return Err(crate::Error::MalformedArchive(format!(
                    "entry {name:?} has no top-level directory"
                )));
            }
        };
        match &prefix {
            None => prefix = Some(top.to_string()),
            Some(p) if p == top => {}
            Some(p) => {
                return Err(crate::Error::MalformedArchive(format!(
                    "multiple top-level directories: {p:?} and {top:?}"
                )));
            }
        }

        if !entry.is_dir() && base_name(name) == MOD_FILE_NAME {
            let rel = &name[top.len()..];
            let dir = rel.strip_suffix(MOD_FILE_NAME).unwrap_or_default();
            submodules.insert(dir.to_string());
        }
    }

    let Some(prefix) = prefix else {
        return write_entries(&mut archive, &[], "", &target_prefix);
    };

    let mut keep = Vec::new();
    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        if entry.is_dir() {
            continue;
        }
        let rel = &entry.name()[prefix.len()..];

        if ROOT_HOUSEKEEPING.contains(&rel) {
            continue;
        }
        if in_vendor_tree(rel) {
            continue;
        }
        if in_submodule(rel, &submodules) {
            continue;
        }

        let base = base_name(rel);
        if base.eq_ignore_ascii_case(MOD_FILE_NAME) && base != MOD_FILE_NAME {
            return Err(crate::Error::ModFileCasing(entry.name().to_string()));
        }
        keep.push(i);
    }

    write_entries(&mut archive, &keep, &prefix, &target_prefix)
}

/// Whether a `vendor` directory appears anywhere above the final element.
fn in_vendor_tree(rel: &str) -> bool {
    let mut components: Vec<&str> = rel.split('/').collect();
    components.pop();
    components.contains(&"vendor")
}

/// Whether `rel` lives under a nested module root. The archive root itself
/// (recorded as `""`) never excludes anything.
fn in_submodule(rel: &str, submodules: &HashSet<String>) -> bool {
    submodules
        .iter()
        .any(|dir| !dir.is_empty() && rel.starts_with(dir.as_str()))
}

fn write_entries(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    keep: &[usize],
    prefix: &str,
    target_prefix: &str,
) -> crate::Result<Blob> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for &i in keep {
        let entry = archive.by_index_raw(i)?;
        let renamed = format!("{target_prefix}{}", &entry.name()[prefix.len()..]);
        writer.raw_copy_file_rename(entry, renamed)?;
    }
    let cursor = writer.finish()?;
    Ok(Blob::from(cursor.into_inner()))
}
