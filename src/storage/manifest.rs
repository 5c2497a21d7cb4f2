//! The manifest: one file name per line, sorted, for downstream downloaders

use crate::state::ItemId;
use crate::storage::write_atomic;
use std::fs;
use std::io;
use std::path::Path;

/// Renders identifiers as manifest text
///
/// Input order does not matter; lines come out sorted and deduplicated.
pub fn render_manifest<'a, I>(items: I, extension: &str) -> String
where
    I: IntoIterator<Item = &'a ItemId>,
{
    let mut names: Vec<String> = items
        .into_iter()
        .map(|item| item.file_name(extension))
        .collect();
    names.sort();
    names.dedup();

    let mut content = String::with_capacity(names.len() * (12 + extension.len() + 1));
    for name in names {
        content.push_str(&name);
        content.push('\n');
    }
    content
}

/// Writes the manifest atomically
pub fn write_manifest<'a, I>(path: &Path, items: I, extension: &str) -> io::Result<()>
where
    I: IntoIterator<Item = &'a ItemId>,
{
    write_atomic(path, render_manifest(items, extension).as_bytes())
}

/// Reads a manifest back into identifiers, stripping the extension
pub fn read_manifest(path: &Path, extension: &str) -> io::Result<Vec<ItemId>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| ItemId::new(line.strip_suffix(extension).unwrap_or(line)))
        .collect())
}
