//! Download archive: identifiers that were fetched outside the queue.

use std::collections::HashSet;
use std::io;
use std::path::Path;

/// Parse archive text: one identifier per line, blank lines and `#` comments
/// ignored. Lines with several fields keep the last one (`<extractor> <id>`).
pub fn parse_archive(text: &str) -> HashSet<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter_map(|l| l.split_whitespace().last())
        .map(str::to_string)
        .collect()
}

/// Read an archive file. A missing file is an empty archive.
pub fn load_archive(path: &Path) -> io::Result<HashSet<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(parse_archive(&text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(HashSet::new()),
        Err(e) => Err(e),
    }
}

/// Read a list of source locators with the same line rules as the archive,
/// keeping file order and whole lines.
pub fn parse_sources(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .filter(|l| seen.insert(l.to_string()))
        .map(str::to_string)
        .collect()
}
