//! Source snippet lookup for suggestions.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

/// 1-based line number to line text (trailing whitespace trimmed).
pub type SourceLines = HashMap<u32, String>;

/// Locate the source file for an `SF:` path: `<dir>/<basename>` first, then
/// the path exactly as recorded.
#[must_use]
pub fn resolve(source_dir: &Path, sf_path: &str) -> Option<PathBuf> {
    let recorded = Path::new(sf_path);
    let in_dir = recorded.file_name().map(|name| source_dir.join(name));

    in_dir
        .into_iter()
        .chain(std::iter::once(recorded.to_path_buf()))
        .find(|candidate| candidate.exists())
}

/// Read a source file into a line map. An unreadable file yields an empty
/// map; snippets are optional and never fail the analysis.
#[must_use]
pub fn read_source_lines(path: &Path) -> SourceLines {
    match std::fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes)
            .lines()
            .zip(1..)
            .map(|(text, number)| (number, text.trim_end().to_string()))
            .collect(),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "could not read source file");
            SourceLines::new()
        }
    }
}

/// Resolve and read the source for `sf_path`, if a source dir was given and
/// the file can be found.
#[must_use]
pub fn load(source_dir: Option<&Path>, sf_path: &str) -> Option<SourceLines> {
    let path = resolve(source_dir?, sf_path)?;
    Some(read_source_lines(&path))
}
