// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashSet;

use approx::assert_abs_diff_eq;

use super::*;
use crate::math::n_choose_k;

#[test]
fn test_catalogue_counts() {
    let masks = list_masks();
    assert!(!masks.is_empty());
    for (instrument, name, n_holes) in masks {
        let mask = Mask::new(instrument, name, &MaskOptions::default()).unwrap();
        assert_eq!(mask.num_apertures(), n_holes);
        assert_eq!(
            mask.num_baselines(),
            n_choose_k(n_holes, 2),
            "{instrument} {name}"
        );
        assert_eq!(
            mask.num_triangles(),
            n_choose_k(n_holes, 3),
            "{instrument} {name}"
        );
    }
}

#[test]
fn test_triangles_reference_distinct_consistent_baselines() {
    let mask = Mask::new(Instrument::Vampires, "g18", &MaskOptions::default()).unwrap();
    for tri in &mask.triangles {
        let [i, j, k] = tri.apertures;
        assert!(i < j && j < k);
        let unique: HashSet<usize> = tri.baselines.iter().copied().collect();
        assert_eq!(unique.len(), 3);
        assert_eq!(mask.baselines[tri.baselines[0]].apertures, (i, j));
        assert_eq!(mask.baselines[tri.baselines[1]].apertures, (j, k));
        assert_eq!(mask.baselines[tri.baselines[2]].apertures, (i, k));

        // The signed baselines close.
        let mut sum = [0.0, 0.0];
        for (&bl, &sign) in tri.baselines.iter().zip(tri.signs.iter()) {
            sum[0] += f64::from(sign) * mask.baselines[bl].vector[0];
            sum[1] += f64::from(sign) * mask.baselines[bl].vector[1];
        }
        assert_abs_diff_eq!(sum[0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(sum[1], 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_baseline_index() {
    let n = 7;
    let mask = Mask::new(Instrument::Niriss, "g7", &MaskOptions::default()).unwrap();
    for (index, bl) in mask.baselines.iter().enumerate() {
        let (i, j) = bl.apertures;
        assert_eq!(baseline_index(n, i, j), index);
    }
}

#[test]
fn test_deterministic() {
    let options = MaskOptions {
        theta_detector: 12.5,
        scaling_uv: 0.98,
        hole_diam: Some(0.82),
    };
    let a = Mask::new(Instrument::Sphere, "g7", &options).unwrap();
    let b = Mask::new(Instrument::Sphere, "G7", &options).unwrap();
    assert_eq!(a, b);
    for (x, y) in a.apertures.iter().zip(b.apertures.iter()) {
        assert_eq!(x[0].to_bits(), y[0].to_bits());
        assert_eq!(x[1].to_bits(), y[1].to_bits());
    }
    assert_abs_diff_eq!(a.hole_diameter, 0.82);
}

#[test]
fn test_rotation_and_scaling() {
    let options = MaskOptions {
        theta_detector: 90.0,
        scaling_uv: 2.0,
        hole_diam: None,
    };
    let plain = Mask::new(Instrument::Niriss, "g7", &MaskOptions::default()).unwrap();
    let rotated = Mask::new(Instrument::Niriss, "g7", &options).unwrap();
    for (p, r) in plain.apertures.iter().zip(rotated.apertures.iter()) {
        // (x, y) -> (-y, x), then doubled.
        assert_abs_diff_eq!(r[0], -2.0 * p[1], epsilon = 1e-12);
        assert_abs_diff_eq!(r[1], 2.0 * p[0], epsilon = 1e-12);
    }
    assert_abs_diff_eq!(
        rotated.max_baseline(),
        2.0 * plain.max_baseline(),
        epsilon = 1e-12
    );
}

#[test]
fn test_unknown_names() {
    assert!(matches!(
        parse_instrument("HUBBLE"),
        Err(MaskError::UnknownInstrument { .. })
    ));
    assert_eq!(parse_instrument("niriss").unwrap(), Instrument::Niriss);
    assert_eq!(parse_instrument("Sphere-IFS").unwrap(), Instrument::SphereIfs);

    let result = Mask::new(Instrument::Niriss, "g9", &MaskOptions::default());
    assert!(matches!(result, Err(MaskError::UnknownMask { .. })));

    let result = get_filter(Instrument::Niriss, "K1");
    assert!(matches!(result, Err(MaskError::UnknownFilter { .. })));
    let filter = get_filter(Instrument::Sphere, "k1").unwrap();
    assert_abs_diff_eq!(filter.wavelength, 2.110e-6);
}

#[test]
fn test_bad_options() {
    let options = MaskOptions {
        scaling_uv: 0.0,
        ..Default::default()
    };
    assert!(matches!(
        Mask::new(Instrument::Niriss, "g7", &options),
        Err(MaskError::BadOption { .. })
    ));

    let options = MaskOptions {
        hole_diam: Some(-1.0),
        ..Default::default()
    };
    assert!(matches!(
        Mask::new(Instrument::Niriss, "g7", &options),
        Err(MaskError::BadOption { .. })
    ));

    let result = Mask::from_apertures(
        Instrument::Simulated,
        "pair",
        &[[0.0, 0.0], [1.0, 0.0]],
        0.5,
        &MaskOptions::default(),
    );
    assert_eq!(result.unwrap_err(), MaskError::TooFewApertures(2));

    let result = Mask::from_apertures(
        Instrument::Simulated,
        "dup",
        &[[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]],
        0.5,
        &MaskOptions::default(),
    );
    assert_eq!(result.unwrap_err(), MaskError::DuplicateAperture(0, 2));
}

#[test]
fn test_pixel_scales() {
    for instrument in [Instrument::Niriss, Instrument::Sphere, Instrument::Vampires] {
        let scale = get_pixel_scale(instrument);
        assert!(scale.is_some());
        assert!(scale.unwrap() > 0.0);
    }
    assert!(get_pixel_scale(Instrument::Simulated).is_none());
}
