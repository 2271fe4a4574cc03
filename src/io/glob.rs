// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Functions to glob files.

use std::path::PathBuf;

use glob::glob;
use thiserror::Error;

/// Given a glob pattern, get all of the matches from the filesystem.
pub(crate) fn get_all_matches_from_glob(g: &str) -> Result<Vec<PathBuf>, GlobError> {
    let mut entries = vec![];
    for entry in glob(g)? {
        match entry {
            Ok(e) => entries.push(e),
            Err(e) => return Err(GlobError::GlobCrate(e)),
        }
    }
    Ok(entries)
}

/// Expand every pattern, keeping the order of the patterns. A pattern that
/// matches nothing is an error, so that typos don't silently drop inputs.
pub(crate) fn expand_globs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>, GlobError> {
    let mut files = vec![];
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let matches = get_all_matches_from_glob(pattern)?;
        if matches.is_empty() {
            return Err(GlobError::NoMatches {
                glob: pattern.to_string(),
            });
        }
        files.extend(matches);
    }
    Ok(files)
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
