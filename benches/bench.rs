// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use criterion::*;
use ndarray::prelude::*;

use ami_pipeline::{
    constants::{MAS_TO_RAD, TAU},
    frame::FrameTransform,
    mask::{get_filter, get_pixel_scale},
    ExtractParams, Extractor, Instrument, Mask, MaskOptions, PeakMethod,
};

const N: usize = 128;

/// Noiseless frames of a point source seen through NIRISS's g7 mask.
fn niriss_cube(num_frames: usize) -> Array3<f64> {
    let mask = Mask::new(Instrument::Niriss, "g7", &MaskOptions::default()).unwrap();
    let wavelength = get_filter(Instrument::Niriss, "F480M").unwrap().wavelength;
    let theta = get_pixel_scale(Instrument::Niriss).unwrap() * MAS_TO_RAD;
    let scale = theta * N as f64 / wavelength;
    let centre = (N / 2) as f64;

    Array3::from_shape_fn((num_frames, N, N), |(i_frame, row, col)| {
        let y = row as f64 - centre;
        let x = col as f64 - centre;
        let envelope = (-(x * x + y * y) / 800.0).exp();
        let fringes: f64 = mask
            .baselines
            .iter()
            .map(|bl| {
                let phase = TAU * scale * (bl.vector[0] * x + bl.vector[1] * y) / N as f64;
                (phase + i_frame as f64 * 0.1).cos()
            })
            .sum();
        envelope * (7.0 + 2.0 * fringes)
    })
}

fn transform(c: &mut Criterion) {
    let cube = niriss_cube(1);
    let plain = FrameTransform::new(N, N, None);
    let windowed = FrameTransform::new(N, N, Some(80.0));

    c.bench_function("transform 128x128 frame", |b| {
        b.iter(|| plain.transform(cube.index_axis(Axis(0), 0)))
    });
    c.bench_function("transform 128x128 frame with window", |b| {
        b.iter(|| windowed.transform(cube.index_axis(Axis(0), 0)))
    });
}

fn extraction(c: &mut Criterion) {
    let cube = niriss_cube(16);
    let mut group = c.benchmark_group("extract 16 frames");
    for method in [PeakMethod::Fft, PeakMethod::Square, PeakMethod::Gauss] {
        let extractor = Extractor::new(&ExtractParams {
            peakmethod: method,
            num_workers: Some(1),
            ..Default::default()
        })
        .unwrap();
        group.bench_function(method.to_string(), |b| {
            b.iter(|| extractor.extract(cube.view(), None).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, transform, extraction);
criterion_main!(benches);
