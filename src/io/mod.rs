// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! File stuff (input/output, reading/writing, globs), for image cubes and
//! observables.

mod error;
mod fits;
mod glob;
mod json;
mod oifits;

pub use error::{BundleFileError, FileWriteError, FitsError, OifitsError};
pub use fits::{read_cube, CubeData, ImageCube};
pub use json::{read_json, write_json};
pub use oifits::{read_oifits, write_oifits};
pub(crate) use self::glob::{expand_globs, GlobError};

use std::path::Path;

use itertools::Itertools;
use log::trace;
use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter, EnumString};

use crate::{bundle::ObservableBundle, cli::Warn};

lazy_static::lazy_static! {
    pub(crate) static ref BUNDLE_FILE_TYPES_COMMA_SEPARATED: String =
        BundleFileType::iter().map(|t| format!(".{t}")).join(", ");
}

/// The formats observables can be saved in, by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum BundleFileType {
    #[strum(serialize = "oifits")]
    Oifits,

    #[strum(serialize = "fits")]
    Fits,

    #[strum(serialize = "json")]
    Json,
}

impl BundleFileType {
    pub fn from_path(file: &Path) -> Result<BundleFileType, BundleFileError> {
        file.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
            .ok_or_else(|| BundleFileError::UnsupportedExt {
                file: file.to_path_buf(),
                valid: BUNDLE_FILE_TYPES_COMMA_SEPARATED.clone(),
            })
    }
}

/// Save observables; the format is chosen by the file extension.
pub fn save_bundle<P: AsRef<Path>>(
    bundle: &ObservableBundle,
    file: P,
) -> Result<(), BundleFileError> {
    let file = file.as_ref();
    match BundleFileType::from_path(file)? {
        BundleFileType::Oifits | BundleFileType::Fits => write_oifits(bundle, file)?,
        BundleFileType::Json => write_json(bundle, file)?,
    }
    Ok(())
}

/// Load observables; the format is chosen by the file extension.
pub fn load_bundle<P: AsRef<Path>>(file: P) -> Result<ObservableBundle, BundleFileError> {
    let file = file.as_ref();
    match BundleFileType::from_path(file)? {
        BundleFileType::Oifits | BundleFileType::Fits => Ok(read_oifits(file)?),
        BundleFileType::Json => read_json(file),
    }
}

/// Test whether a file can be written to, creating its parent directories if
/// necessary. A file that would be overwritten is reported as a warning.
pub(crate) fn can_write_to_file(file: &Path) -> Result<(), FileWriteError> {
    trace!("Testing whether we can write to {}", file.display());

    let file_exists = file.exists();
    match std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .append(true)
        .open(file)
        .map_err(|e| e.kind())
    {
        // File is writable.
        Ok(_) => {
            // If the file in question didn't already exist, `OpenOptions::new`
            // creates it as part of its work. We don't want to keep the 0-sized
            // file; remove it if it didn't exist before.
            if file_exists {
                format!("Will overwrite the existing file '{}'", file.display()).warn();
            } else {
                std::fs::remove_file(file)?;
            }
        }

        // File doesn't exist. Attempt to make the directories leading up to the
        // file; if this fails, then we can't write the file anyway.
        Err(std::io::ErrorKind::NotFound) => {
            if let Some(p) = file.parent() {
                match std::fs::DirBuilder::new()
                    .recursive(true)
                    .create(p)
                    .map_err(|e| e.kind())
                {
                    Ok(()) => (),
                    Err(std::io::ErrorKind::PermissionDenied) => {
                        return Err(FileWriteError::NewDirectory(p.to_path_buf()))
                    }
                    Err(e) => return Err(FileWriteError::IO(e.into())),
                }
            }
        }

        Err(std::io::ErrorKind::PermissionDenied) => {
            return Err(FileWriteError::FileNotWritable {
                file: file.display().to_string(),
            })
        }

        Err(e) => {
            return Err(FileWriteError::IO(e.into()));
        }
    }

    Ok(())
}
