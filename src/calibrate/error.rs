// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with calibrating observables.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("At least one calibrator is needed")]
    NoCalibrators,

    #[error("{0} is already calibrated")]
    AlreadyCalibrated(String),

    #[error("Calibrator {calibrator} is incompatible with the target: its {what} is {got}, but the target's is {expected}")]
    Incompatible {
        calibrator: String,
        what: &'static str,
        expected: String,
        got: String,
    },
}
