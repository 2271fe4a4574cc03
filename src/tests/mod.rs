// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests: a small mask whose splodges land exactly on
//! Fourier pixels, synthetic frames observed through it, and FITS cubes of
//! catalogue masks.

use std::path::Path;

use fitsio::{
    images::{ImageDescription, ImageType},
    FitsFile,
};
use ndarray::{Array2, Array3, ArrayD, Dimension};
use num_complex::Complex64;

use crate::{
    bispectrum::{ExtractParams, Extractor},
    bundle::ObservableBundle,
    constants::{MAS_TO_RAD, TAU},
    mask::{get_filter, get_pixel_scale, FilterDefinition, Instrument, Mask, MaskOptions},
};

/// The side length of synthetic frames.
pub(crate) const TEST_N: usize = 64;

/// Aperture coordinates \[metres\]. With [`test_pixel_scale_mas`], a
/// baseline of `b` metres lands on Fourier pixel `b`. The baselines (and
/// their reflections) are at least 6 pixels apart, and at least 9 pixels from
/// the origin, so with [`test_envelope`] no splodge leaks into another.
pub(crate) const TEST_HOLES: [[f64; 2]; 4] = [[0.0, 0.0], [9.0, 1.0], [2.0, 12.0], [-8.0, 5.0]];

/// \[metres\]; the splodge support is then 3 pixels.
pub(crate) const TEST_HOLE_DIAMETER: f64 = 3.0;

pub(crate) const TEST_FILTER: &str = "F430M";

pub(crate) fn test_mask() -> Mask {
    Mask::from_apertures(
        Instrument::Simulated,
        "test4",
        &TEST_HOLES,
        TEST_HOLE_DIAMETER,
        &MaskOptions::default(),
    )
    .unwrap()
}

pub(crate) fn test_filter() -> FilterDefinition {
    *get_filter(Instrument::Simulated, TEST_FILTER).unwrap()
}

pub(crate) fn test_pixel_scale_mas() -> f64 {
    test_filter().wavelength / TEST_N as f64 / MAS_TO_RAD
}

/// The envelope of synthetic frames: a raised cosine that is periodic and
/// even over the frame. Its transform is real and only nonzero within one
/// pixel of the origin, so every splodge is a 3x3 blob that doesn't overlap
/// any other.
pub(crate) fn test_envelope(x: f64, y: f64) -> f64 {
    let n = TEST_N as f64;
    0.25 * (1.0 + (TAU * x / n).cos()) * (1.0 + (TAU * y / n).cos())
}

/// A frame observed through `mask` of an object whose visibility amplitude
/// on each baseline is `amplitudes`, with an atmospheric phase on each
/// aperture. Fringe spatial frequencies are the integer-rounded baseline
/// vectors, so only [`test_mask`] gives exact results.
pub(crate) fn synthetic_frame(
    mask: &Mask,
    flux: f64,
    amplitudes: &[f64],
    aperture_phases: &[f64],
) -> Array2<f64> {
    let n = TEST_N;
    let centre = (n / 2) as f64;
    let num_holes = mask.num_apertures() as f64;
    Array2::from_shape_fn((n, n), |(row, col)| {
        let y = row as f64 - centre;
        let x = col as f64 - centre;
        let envelope = test_envelope(x, y);
        let fringes: f64 = mask
            .baselines
            .iter()
            .zip(amplitudes)
            .map(|(bl, &amp)| {
                let (i, j) = bl.apertures;
                let [kx, ky] = [bl.vector[0].round(), bl.vector[1].round()];
                let phase =
                    TAU * (kx * x + ky * y) / n as f64 + aperture_phases[i] - aperture_phases[j];
                2.0 * amp * phase.cos()
            })
            .sum();
        flux * envelope * (num_holes + fringes)
    })
}

/// A cube of point-source frames with varying flux and aperture phases.
pub(crate) fn point_source_cube(mask: &Mask, num_frames: usize) -> Array3<f64> {
    let amplitudes = vec![1.0; mask.num_baselines()];
    let mut cube = Array3::zeros((num_frames, TEST_N, TEST_N));
    for (i_frame, mut frame) in cube.outer_iter_mut().enumerate() {
        let phases: Vec<f64> = (0..mask.num_apertures())
            .map(|i| ((i_frame * 7 + i * 13) % 17) as f64 * 0.37)
            .collect();
        let flux = 1.0 + 0.1 * i_frame as f64;
        frame.assign(&synthetic_frame(mask, flux, &amplitudes, &phases));
    }
    cube
}

/// Observables of a point source seen through [`test_mask`].
pub(crate) fn point_source_bundle(num_frames: usize) -> ObservableBundle {
    let mask = test_mask();
    let params = ExtractParams {
        instrument: Instrument::Simulated,
        pixel_scale: Some(test_pixel_scale_mas()),
        targetname: Some("point".to_string()),
        ..Default::default()
    };
    Extractor::with_mask(mask.clone(), test_filter(), &params)
        .unwrap()
        .extract(point_source_cube(&mask, num_frames).view(), None)
        .unwrap()
}

/// Frames of a point source seen through the NIRISS g7 mask in F480M at
/// NIRISS's pixel scale. The fringes aren't on integer Fourier pixels, so
/// these are only good for exercising the plumbing.
pub(crate) fn niriss_point_source_cube(num_frames: usize) -> Array3<f64> {
    let mask = Mask::new(Instrument::Niriss, "g7", &MaskOptions::default()).unwrap();
    let wavelength = get_filter(Instrument::Niriss, "F480M").unwrap().wavelength;
    let theta = get_pixel_scale(Instrument::Niriss).unwrap() * MAS_TO_RAD;
    let n = TEST_N as f64;
    // Aperture positions in Fourier pixels.
    let positions: Vec<[f64; 2]> = mask
        .apertures
        .iter()
        .map(|[x, y]| [x * theta * n / wavelength, y * theta * n / wavelength])
        .collect();
    let centre = n / 2.0;

    Array3::from_shape_fn((num_frames, TEST_N, TEST_N), |(i_frame, row, col)| {
        let y = row as f64 - centre;
        let x = col as f64 - centre;
        let envelope = test_envelope(x, y);
        let field: Complex64 = positions
            .iter()
            .enumerate()
            .map(|(i, [px, py])| {
                let piston = ((i_frame * 5 + i * 11) % 13) as f64 * 0.29;
                Complex64::from_polar(1.0, TAU * (px * x + py * y) / n + piston)
            })
            .sum();
        (1.0 + 0.05 * i_frame as f64) * envelope * field.norm_sqr()
    })
}

/// Write an array as the primary image of a new FITS file, with some header
/// cards.
pub(crate) fn write_fits_cube<D: Dimension>(
    file: &Path,
    data: &ndarray::Array<f64, D>,
    cards: &[(&str, &str)],
) {
    let data: ArrayD<f64> = data.as_standard_layout().into_owned().into_dyn();
    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: data.shape(),
    };
    let mut fptr = FitsFile::create(file)
        .with_custom_primary(&description)
        .open()
        .unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    hdu.write_image(&mut fptr, data.as_slice().unwrap()).unwrap();
    for (key, value) in cards {
        hdu.write_key(&mut fptr, key, *value).unwrap();
    }
}
