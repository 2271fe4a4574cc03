// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with extracting observables from a cube.

use thiserror::Error;

use crate::{mask::MaskError, uv::GeometryError};

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("{0}")]
    DataShape(String),

    #[error("Frame {frame} has a total flux of {flux}; the visibilities can't be normalised")]
    DegenerateNormalization { frame: usize, flux: f64 },

    #[error("{0}")]
    InsufficientData(String),

    #[error("Invalid extraction parameter: {0}")]
    InvalidParameter(String),

    #[error(transparent)]
    Mask(#[from] MaskError),

    #[error("Couldn't build the worker thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl From<GeometryError> for ExtractError {
    fn from(e: GeometryError) -> Self {
        match e {
            GeometryError::BeyondNyquist { .. } | GeometryError::FrameTooSmall { .. } => {
                ExtractError::DataShape(e.to_string())
            }
            GeometryError::BadParameter { .. } | GeometryError::BadChannel { .. } => {
                ExtractError::InvalidParameter(e.to_string())
            }
        }
    }
}
