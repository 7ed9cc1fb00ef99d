//! Filesystem paths derived from asset names.
//!
//! Each `/`-separated segment of a name is slugged independently: runs of
//! characters outside `[A-Za-z0-9.-]` collapse to a single `-`. Segments
//! that are empty or consist of `.`/`..` become `-`, and a leading `.state`
//! segment becomes `-state`, so a name can never address a path outside the
//! asset directory or inside the metadata directory. Distinct names may share a
//! slug; the persistence layer detects that through the name recorded in
//! the metadata file.

use std::path::{Path, PathBuf};

/// Directory (relative to the asset root) that holds metadata files.
pub const STATE_DIR: &str = ".state";

fn is_slug_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

/// Slugs a single path segment.
pub fn slug_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    let mut in_run = false;
    for c in segment.chars() {
        if is_slug_char(c) {
            out.push(c);
            in_run = false;
        } else if !in_run {
            out.push('-');
            in_run = true;
        }
    }
    if out.is_empty() || out == "." || out == ".." {
        return "-".to_string();
    }
    out
}

/// Relative path of an asset's raw data file.
pub fn data_path(name: &str) -> PathBuf {
    name.split('/')
        .enumerate()
        .map(|(i, segment)| match slug_segment(segment) {
            // The metadata directory is reserved.
            s if i == 0 && s == STATE_DIR => "-state".to_string(),
            s => s,
        })
        .collect()
}

/// Relative path of an asset's metadata file.
pub fn state_path(name: &str) -> PathBuf {
    Path::new(STATE_DIR).join(data_path(name))
}
