// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with building mask geometry.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MaskError {
    #[error("Unknown instrument '{name}'; supported instruments are: {valid}")]
    UnknownInstrument { name: String, valid: String },

    #[error("Instrument {instrument} has no mask '{mask}'; available masks are: {valid}")]
    UnknownMask {
        instrument: String,
        mask: String,
        valid: String,
    },

    #[error("Instrument {instrument} has no filter '{filter}'; available filters are: {valid}")]
    UnknownFilter {
        instrument: String,
        filter: String,
        valid: String,
    },

    #[error("A mask needs at least 3 apertures to form a closure triangle, but {0} were given")]
    TooFewApertures(usize),

    #[error("Apertures {0} and {1} have identical coordinates")]
    DuplicateAperture(usize, usize),

    #[error("The {what} must be finite and positive, but got {value}")]
    BadOption { what: &'static str, value: f64 },
}
