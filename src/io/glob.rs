// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Functions to glob input files.

use std::path::{Path, PathBuf};

use glob::glob;
use thiserror::Error;

/// Given a glob pattern, get all of the matches from the filesystem, sorted.
pub(crate) fn get_all_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let mut entries = vec![];
    for entry in glob(g)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => return Err(GlobError::GlobCrate(e)),
        }
    }
    entries.sort();
    Ok(entries)
}

/// Expand each of the supplied input paths. Paths that exist are used as-is;
/// anything else is treated as a glob pattern, which must match at least one
/// file.
pub(crate) fn expand_input_paths<P: AsRef<Path>>(inputs: &[P]) -> Result<Vec<PathBuf>, GlobError> {
    let mut paths = vec![];
    for input in inputs {
        let input = input.as_ref();
        if input.exists() {
            paths.push(input.to_path_buf());
            continue;
        }
        let pattern = input.display().to_string();
        let matches = get_all_matches_from_glob(&pattern)?;
        if matches.is_empty() {
            return Err(GlobError::NoMatches { glob: pattern });
        }
        paths.extend(matches);
    }
    Ok(paths)
}

#[derive(Error, Debug)]
/// Error type associated with glob helper functions.
pub enum GlobError {
    #[error("No glob matches were found for {glob}")]
    NoMatches { glob: String },

    #[error(transparent)]
    GlobCrate(#[from] glob::GlobError),

    #[error(transparent)]
    PatternError(#[from] glob::PatternError),
}
