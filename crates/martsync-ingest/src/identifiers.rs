//! Reading identifier lists
//!
//! One identifier per line. Surrounding whitespace is trimmed, blank lines
//! and `#` comments are skipped, and repeated identifiers are kept only at
//! their first position.

use std::collections::HashSet;
use std::io::BufRead;
use std::path::Path;

/// Parse identifiers from any line-oriented reader
pub fn parse_identifiers<R: BufRead>(reader: R) -> std::io::Result<Vec<String>> {
    let mut seen = HashSet::new();
    let mut ids = Vec::new();

    for line in reader.lines() {
        let line = line?;
        let id = line.trim();
        if id.is_empty() || id.starts_with('#') {
            continue;
        }
        if seen.insert(id.to_string()) {
            ids.push(id.to_string());
        }
    }

    Ok(ids)
}

/// Read identifiers from a file, or from stdin when `path` is `-`
pub fn read_identifiers(path: &Path) -> std::io::Result<Vec<String>> {
    if path == Path::new("-") {
        parse_identifiers(std::io::stdin().lock())
    } else {
        let file = std::fs::File::open(path)?;
        parse_identifiers(std::io::BufReader::new(file))
    }
}
