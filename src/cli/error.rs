// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all amipipe-related errors. This should be the *only* error
//! enum that is publicly visible from the command-line interface.

use thiserror::Error;

use super::{calibrate::CalibrateArgsError, extract::ExtractArgsError};
use crate::{
    bispectrum::ExtractError,
    calibrate::CalibrationError,
    io::{BundleFileError, FileWriteError, FitsError, GlobError, OifitsError},
    mask::MaskError,
};

/// The *only* publicly visible error from amipipe. Each error message should
/// point to some help, unless it's "generic".
#[derive(Error, Debug)]
pub enum AmiPipeError {
    /// An error related to extract.
    #[error("{0}\n\nSee for more info: amipipe extract --help")]
    Extract(String),

    /// An error related to calibrate.
    #[error("{0}\n\nSee for more info: amipipe calibrate --help")]
    Calibrate(String),

    /// An error related to instruments, masks or filters.
    #[error("{0}\n\nThe known instruments, masks and filters are listed by: amipipe masks")]
    Mask(String),

    /// An error related to reading image cubes.
    #[error("{0}\n\nImage cubes are read from the primary HDU, or else the 'SCI' HDU, or else the first extension")]
    Cube(String),

    /// An error related to reading or writing observables.
    #[error("{0}\n\nObservables are read and written as OIFITS (.oifits, .fits) or JSON (.json)")]
    Observables(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files are TOML or JSON, and use the long names of the CLI arguments as keys")]
    ArgFile(String),

    /// A cfitsio error. Because these are usually quite spartan, some
    /// suggestions are provided here.
    #[error("cfitsio error: {0}\n\nIf you don't know what this means, try turning up verbosity (-v or -vv) and maybe disabling progress bars.")]
    Cfitsio(String),

    /// A generic error that can't be clarified further with documentation, e.g.
    /// IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

// Binary sub-command errors.

impl From<ExtractArgsError> for AmiPipeError {
    fn from(e: ExtractArgsError) -> Self {
        let s = e.to_string();
        match e {
            ExtractArgsError::NoInputs
            | ExtractArgsError::OutputCountMismatch { .. }
            | ExtractArgsError::BadPeakMethod { .. } => Self::Extract(s),
        }
    }
}

impl From<CalibrateArgsError> for AmiPipeError {
    fn from(e: CalibrateArgsError) -> Self {
        let s = e.to_string();
        match e {
            CalibrateArgsError::TooFewBundles(_) => Self::Calibrate(s),
        }
    }
}

// Library code errors.

impl From<ExtractError> for AmiPipeError {
    fn from(e: ExtractError) -> Self {
        let s = e.to_string();
        match e {
            ExtractError::DataShape(_)
            | ExtractError::DegenerateNormalization { .. }
            | ExtractError::InsufficientData(_)
            | ExtractError::InvalidParameter(_) => Self::Extract(s),
            ExtractError::Mask(e) => Self::from(e),
            ExtractError::ThreadPool(_) => Self::Generic(s),
        }
    }
}

impl From<CalibrationError> for AmiPipeError {
    fn from(e: CalibrationError) -> Self {
        Self::Calibrate(e.to_string())
    }
}

impl From<MaskError> for AmiPipeError {
    fn from(e: MaskError) -> Self {
        Self::Mask(e.to_string())
    }
}

impl From<FitsError> for AmiPipeError {
    fn from(e: FitsError) -> Self {
        let s = e.to_string();
        match e {
            FitsError::Open { .. }
            | FitsError::MissingKey { .. }
            | FitsError::NotImage { .. }
            | FitsError::BadImageShape { .. }
            | FitsError::Parse { .. } => Self::Cube(s),
            FitsError::Fitsio { .. } => Self::Cfitsio(s),
        }
    }
}

impl From<OifitsError> for AmiPipeError {
    fn from(e: OifitsError) -> Self {
        let s = e.to_string();
        match e {
            OifitsError::BadShape { .. } | OifitsError::Unrecognised { .. } => {
                Self::Observables(s)
            }
            OifitsError::Mask { .. } => Self::Mask(s),
            OifitsError::Fits(_) | OifitsError::Fitsio(_) => Self::Cfitsio(s),
            OifitsError::IO(e) => Self::from(e),
        }
    }
}

impl From<BundleFileError> for AmiPipeError {
    fn from(e: BundleFileError) -> Self {
        let s = e.to_string();
        match e {
            BundleFileError::UnsupportedExt { .. } | BundleFileError::Json { .. } => {
                Self::Observables(s)
            }
            BundleFileError::Oifits(e) => Self::from(e),
            BundleFileError::IO(e) => Self::from(e),
        }
    }
}

impl From<FileWriteError> for AmiPipeError {
    fn from(e: FileWriteError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<GlobError> for AmiPipeError {
    fn from(e: GlobError) -> Self {
        Self::Generic(e.to_string())
    }
}

impl From<std::io::Error> for AmiPipeError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
