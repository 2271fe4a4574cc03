// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Interferometric observables from aperture-masking image cubes.

Frames observed through a non-redundant mask are Fourier transformed, the
fringe ("splodge") of every baseline is measured, and squared visibilities and
bispectra are averaged over the cube. Targets are calibrated with observations
of point-like calibrators, and observables are saved as OIFITS or JSON.
 */

pub mod bispectrum;
pub mod bundle;
pub mod calibrate;
mod cli;
pub mod constants;
pub mod frame;
pub mod instrument;
pub mod io;
pub mod mask;
pub(crate) mod math;
pub mod peak;
pub mod uv;

#[cfg(test)]
mod tests;

use crossbeam_utils::atomic::AtomicCell;

/// Should we draw progress bars? Off by default, so that library users (and
/// tests) don't get them; the binary turns them on.
pub(crate) static PROGRESS_BARS: AtomicCell<bool> = AtomicCell::new(false);

// Re-exports.
pub use bispectrum::{
    extract_bispectrum, extract_bispectrum_spectral, ExtractError, ExtractParams, Extractor,
};
pub use bundle::{ObservableBundle, ObservationInfo};
pub use calibrate::{calibrate, CalibrationError};
pub use cli::{AmiPipe, AmiPipeError};
pub use instrument::{Header, InstrumentProfile};
pub use io::{load_bundle, read_cube, read_oifits, save_bundle, write_oifits};
pub use mask::{Instrument, Mask, MaskError, MaskOptions};
pub use math::wrap_phase;
pub use peak::PeakMethod;
