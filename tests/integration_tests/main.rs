// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod cli;
mod no_stderr;
mod pipeline;

use std::{path::Path, process::Output, str::from_utf8};

use assert_cmd::{output::OutputError, Command};
use fitsio::{
    images::{ImageDescription, ImageType},
    FitsFile,
};
use ndarray::prelude::*;
use num_complex::Complex64;

use ami_pipeline::{
    constants::{MAS_TO_RAD, TAU},
    mask::{get_filter, get_pixel_scale},
    Instrument, Mask, MaskOptions,
};

fn amipipe() -> Command {
    Command::cargo_bin("amipipe").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// The side length of test frames.
const N: usize = 64;

/// Write a cube of a point source seen through the NIRISS g7 mask (F480M, at
/// NIRISS's pixel scale). `visibility` scales the fringe contrast, so that
/// cubes of resolved "targets" can be made too.
fn write_niriss_cube(file: &Path, num_frames: usize, visibility: f64, target: &str) {
    let mask = Mask::new(Instrument::Niriss, "g7", &MaskOptions::default()).unwrap();
    let wavelength = get_filter(Instrument::Niriss, "F480M").unwrap().wavelength;
    let theta = get_pixel_scale(Instrument::Niriss).unwrap() * MAS_TO_RAD;
    let positions: Vec<[f64; 2]> = mask
        .apertures
        .iter()
        .map(|[x, y]| {
            [
                x * theta * N as f64 / wavelength,
                y * theta * N as f64 / wavelength,
            ]
        })
        .collect();
    let num_holes = positions.len() as f64;
    let centre = (N / 2) as f64;

    let cube = Array3::from_shape_fn((num_frames, N, N), |(i_frame, row, col)| {
        let y = row as f64 - centre;
        let x = col as f64 - centre;
        let envelope = (-(x * x + y * y) / 200.0).exp();
        let field: Complex64 = positions
            .iter()
            .enumerate()
            .map(|(i, [px, py])| {
                let piston = ((i_frame * 3 + i * 7) % 11) as f64 * 0.31;
                Complex64::from_polar(1.0, TAU * (px * x + py * y) / N as f64 + piston)
            })
            .sum();
        // Scale the interference term; the incoherent part is the number of
        // holes.
        let fringes = field.norm_sqr() - num_holes;
        envelope * (num_holes + visibility * fringes)
    });

    let description = ImageDescription {
        data_type: ImageType::Double,
        dimensions: &[num_frames, N, N],
    };
    let mut fptr = FitsFile::create(file)
        .with_custom_primary(&description)
        .open()
        .unwrap();
    let hdu = fptr.primary_hdu().unwrap();
    hdu.write_image(&mut fptr, cube.as_slice().unwrap())
        .unwrap();
    hdu.write_key(&mut fptr, "TARGPROP", target).unwrap();
    hdu.write_key(&mut fptr, "TELESCOP", "JWST").unwrap();
    hdu.write_key(&mut fptr, "FILTER", "F480M").unwrap();
    hdu.write_key(&mut fptr, "DATE-OBS", "2022-07-01").unwrap();
    hdu.write_key(&mut fptr, "TIME-OBS", "06:00:00.000").unwrap();
}
