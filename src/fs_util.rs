//! Symlink-safe filesystem walking shared by the scanners.
//!
//! The walk uses `symlink_metadata()` so a module tree can never lead the
//! harness outside its root through a linked directory.

use std::path::{Path, PathBuf};

pub(crate) const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
pub(crate) const UTF16_LE_BOM: &[u8] = &[0xFF, 0xFE];
pub(crate) const UTF16_BE_BOM: &[u8] = &[0xFE, 0xFF];

/// Returns `true` if the path is a regular file (not a symlink).
#[must_use]
pub(crate) fn is_regular_file(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_file())
        .unwrap_or(false)
}

/// Returns `true` if the path is a regular directory (not a symlink).
#[must_use]
pub(crate) fn is_regular_dir(path: &Path) -> bool {
    path.symlink_metadata()
        .map(|m| m.file_type().is_dir())
        .unwrap_or(false)
}

/// Recursively collect regular files under `root` accepted by `keep`.
///
/// Directories whose name matches an entry of `excluded_dirs`
/// (ASCII case-insensitive) are not entered. Results are sorted.
#[must_use]
pub(crate) fn collect_files<F>(root: &Path, excluded_dirs: &[String], keep: F) -> Vec<PathBuf>
where
    F: Fn(&Path) -> bool,
{
    let mut files = Vec::new();
    collect_recursive(root, excluded_dirs, &keep, &mut files);
    files.sort();
    files
}

fn collect_recursive<F>(current: &Path, excluded_dirs: &[String], keep: &F, out: &mut Vec<PathBuf>)
where
    F: Fn(&Path) -> bool,
{
    let entries = match std::fs::read_dir(current) {
        Ok(e) => e,
        Err(_) => return,
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if is_regular_dir(&path) {
            let excluded = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|name| excluded_dirs.iter().any(|d| d.eq_ignore_ascii_case(name)));
            if !excluded {
                collect_recursive(&path, excluded_dirs, keep, out);
            }
        } else if is_regular_file(&path) && keep(&path) {
            out.push(path);
        }
    }
}

/// Lowercased extension of `path`, if any.
#[must_use]
pub(crate) fn extension_lower(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Find a direct child directory of `parent` by name, ignoring ASCII case.
#[must_use]
pub(crate) fn find_child_dir(parent: &Path, name: &str) -> Option<PathBuf> {
    std::fs::read_dir(parent)
        .ok()?
        .flatten()
        .map(|e| e.path())
        .find(|p| {
            is_regular_dir(p)
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
}

/// Decode raw file content as text.
///
/// A UTF-16 byte-order mark (either endianness) selects UTF-16 decoding and
/// a UTF-8 byte-order mark is dropped. Everything else is read as UTF-8.
/// Undecodable sequences become U+FFFD.
#[must_use]
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(UTF16_LE_BOM) {
        decode_utf16(rest, u16::from_le_bytes)
    } else if let Some(rest) = bytes.strip_prefix(UTF16_BE_BOM) {
        decode_utf16(rest, u16::from_be_bytes)
    } else {
        let rest = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        String::from_utf8_lossy(rest).into_owned()
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

/// Read a file as text, honouring byte-order marks.
///
/// # Errors
///
/// Returns the underlying IO error if the file cannot be read.
pub(crate) fn read_text(path: &Path) -> std::io::Result<String> {
    std::fs::read(path).map(|bytes| decode_text(&bytes))
}
