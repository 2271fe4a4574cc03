// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::{Deserialize, Serialize};

use super::ExtractError;
use crate::{
    constants::{DEFAULT_CUTOFF, DEFAULT_FW_SPLODGE, DEFAULT_N_WL},
    mask::{Instrument, MaskOptions},
    peak::PeakMethod,
};

/// Everything that controls an extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractParams {
    pub peakmethod: PeakMethod,
    pub instrument: Instrument,
    pub maskname: String,
    pub filtname: String,

    /// Overrides the target name in the cube's header.
    pub targetname: Option<String>,

    /// The splodge search-window radius as a fraction of D/λ.
    pub fw_splodge: f64,

    /// Peak-to-noise ratio below which a splodge is flagged.
    pub cutoff: f64,

    /// The number of spectral channels the filter is split into.
    pub n_wl: usize,

    /// The channel of a single-channel cube. Defaults to the first.
    pub i_wl: Option<usize>,

    /// Subtract the noise bias from the power spectrum (and the flux).
    pub unbias_v2: bool,

    /// Take each frame's closure phases from every closing triple of pixels
    /// within the splodges, not only from their peaks.
    pub bs_multi_tri: bool,

    pub scaling_uv: f64,

    /// \[degrees\]
    pub theta_detector: f64,

    /// \[metres\]
    pub hole_diam: Option<f64>,

    /// Reject frames whose mean V² deviates from the median by this many
    /// (robust) standard deviations.
    pub clip: Option<f64>,

    /// FWHM of a super-Gaussian window applied to frames \[pixels\].
    pub window: Option<f64>,

    /// \[milliarcseconds per pixel\]. Defaults to the instrument's.
    pub pixel_scale: Option<f64>,

    /// Defaults to one per CPU core.
    pub num_workers: Option<usize>,
}

impl Default for ExtractParams {
    fn default() -> Self {
        Self {
            peakmethod: PeakMethod::default(),
            instrument: Instrument::Niriss,
            maskname: "g7".to_string(),
            filtname: "F480M".to_string(),
            targetname: None,
            fw_splodge: DEFAULT_FW_SPLODGE,
            cutoff: DEFAULT_CUTOFF,
            n_wl: DEFAULT_N_WL,
            i_wl: None,
            unbias_v2: true,
            bs_multi_tri: false,
            scaling_uv: 1.0,
            theta_detector: 0.0,
            hole_diam: None,
            clip: None,
            window: None,
            pixel_scale: None,
            num_workers: None,
        }
    }
}

impl ExtractParams {
    pub fn mask_options(&self) -> MaskOptions {
        MaskOptions {
            theta_detector: self.theta_detector,
            scaling_uv: self.scaling_uv,
            hole_diam: self.hole_diam,
        }
    }

    /// Check that the numbers make sense. Mask options are checked when the
    /// mask is built.
    pub fn validate(&self) -> Result<(), ExtractError> {
        fn positive(what: &str, value: f64) -> Result<(), ExtractError> {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(ExtractError::InvalidParameter(format!(
                    "{what} must be finite and positive, but got {value}"
                )))
            }
        }

        positive("fw_splodge", self.fw_splodge)?;
        if !(self.cutoff.is_finite() && self.cutoff >= 0.0) {
            return Err(ExtractError::InvalidParameter(format!(
                "cutoff must be finite and non-negative, but got {}",
                self.cutoff
            )));
        }
        if self.n_wl == 0 {
            return Err(ExtractError::InvalidParameter(
                "n_wl must be at least 1".to_string(),
            ));
        }
        if let Some(i_wl) = self.i_wl {
            if i_wl >= self.n_wl {
                return Err(ExtractError::InvalidParameter(format!(
                    "i_wl ({i_wl}) must be smaller than n_wl ({})",
                    self.n_wl
                )));
            }
        }
        // An infinite clip level keeps every frame.
        if let Some(clip) = self.clip {
            if clip.is_nan() || clip <= 0.0 {
                return Err(ExtractError::InvalidParameter(format!(
                    "clip must be positive, but got {clip}"
                )));
            }
        }
        if let Some(window) = self.window {
            positive("window", window)?;
        }
        if let Some(pixel_scale) = self.pixel_scale {
            positive("pixel_scale", pixel_scale)?;
        }
        if self.num_workers == Some(0) {
            return Err(ExtractError::InvalidParameter(
                "num_workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
