// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with reading and writing files.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::mask::MaskError;

#[derive(Error, Debug)]
pub enum FitsError {
    /// Error when opening a fits file.
    #[error(
        "{source_file}:{source_line}:{source_column}: Couldn't open {fits_filename}: {fits_error}"
    )]
    Open {
        fits_error: Box<fitsio::errors::Error>,
        fits_filename: Box<Path>,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// Error describing a key that couldn't be found in a fits header.
    #[error("{source_file}:{source_line}:{source_column}: {fits_filename} HDU {hdu_num}: Couldn't find key {key}")]
    MissingKey {
        key: Box<str>,
        fits_filename: Box<Path>,
        hdu_num: usize,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// Error describing a HDU that couldn't be used as an image (e.g. `HduInfo::ImageInfo`).
    #[error("{source_file}:{source_line}:{source_column}: {fits_filename} HDU {hdu_num}: Tried to use as an image, but not an image")]
    NotImage {
        fits_filename: Box<Path>,
        hdu_num: usize,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// An image without two to four axes.
    #[error("{source_file}:{source_line}:{source_column}: {fits_filename} HDU {hdu_num}: Expected an image with 2, 3 or 4 axes, but its shape is {shape:?}")]
    BadImageShape {
        shape: Vec<usize>,
        fits_filename: Box<Path>,
        hdu_num: usize,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// A generic error associated with the fitsio crate.
    #[error(
        "{source_file}:{source_line}:{source_column}: {fits_filename} HDU '{hdu_description}': {fits_error}"
    )]
    Fitsio {
        fits_error: Box<fitsio::errors::Error>,
        fits_filename: Box<Path>,
        hdu_description: Box<str>,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },

    /// An error when parsing a fits key.
    #[error("{source_file}:{source_line}:{source_column}: {fits_filename} HDU {hdu_num}: Couldn't parse {key}")]
    Parse {
        key: Box<str>,
        fits_filename: Box<Path>,
        hdu_num: usize,
        source_file: &'static str,
        source_line: u32,
        source_column: u32,
    },
}

#[derive(Error, Debug)]
pub enum OifitsError {
    #[error("Based on the {reference}, expected {thing} to have {expected} elements, but it had {actual} instead")]
    BadShape {
        thing: &'static str,
        reference: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("{file} doesn't look like an OIFITS file written by this software: {reason}")]
    Unrecognised { file: PathBuf, reason: String },

    #[error("Couldn't rebuild the mask stored in {file}: {err}")]
    Mask { file: PathBuf, err: MaskError },

    #[error(transparent)]
    Fits(#[from] FitsError),

    #[error(transparent)]
    Fitsio(#[from] fitsio::errors::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum BundleFileError {
    #[error("Observables file '{file}' doesn't have a recognised extension; valid extensions are: {valid}")]
    UnsupportedExt { file: PathBuf, valid: String },

    #[error("Couldn't decode JSON observables from {file}: {err}")]
    Json {
        file: PathBuf,
        err: serde_json::Error,
    },

    #[error(transparent)]
    Oifits(#[from] OifitsError),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum FileWriteError {
    #[error("Cannot write to the specified file '{file}'. Do you have write permissions set?")]
    FileNotWritable { file: String },

    #[error("Cannot write to the specified directory '{0}'. Do you have write permissions set?")]
    NewDirectory(PathBuf),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
