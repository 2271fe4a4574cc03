// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Cubes in, calibrated observables out.

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use ami_pipeline::{load_bundle, Instrument};

use crate::{amipipe, write_niriss_cube};

#[test]
fn test_resolved_target_is_calibrated() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let target = tmp_dir.path().join("disc.fits");
    let cal = tmp_dir.path().join("star.fits");
    // Every fringe of the "disc" has half the contrast of the star's.
    write_niriss_cube(&target, 4, 0.5, "DISC");
    write_niriss_cube(&cal, 4, 1.0, "STAR");

    #[rustfmt::skip]
    let cmd = amipipe()
        .args([
            "extract",
            &format!("{}/*.fits", tmp_dir.path().display()),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());

    let target_obs = tmp_dir.path().join("disc.oifits");
    let cal_obs = tmp_dir.path().join("star.oifits");
    let output = tmp_dir.path().join("calibrated.oifits");
    #[rustfmt::skip]
    let cmd = amipipe()
        .args([
            "calibrate",
            &target_obs.display().to_string(),
            &cal_obs.display().to_string(),
            "-o", &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());

    let calibrated = load_bundle(&output).unwrap();
    assert!(calibrated.calibrated);
    assert_eq!(calibrated.info.instrument, Instrument::Niriss);
    assert_eq!(calibrated.info.target, "DISC");
    assert_eq!(calibrated.info.date_obs.as_deref(), Some("2022-07-01T06:00:00.000"));
    assert_eq!(calibrated.calibrators.len(), 1);
    assert_eq!(calibrated.calibrators[0].target, "STAR");
    assert_eq!(calibrated.num_frames, 4);

    let unflagged: Vec<f64> = calibrated
        .vis2
        .iter()
        .zip(calibrated.baseline_flags.iter())
        .filter(|(_, &f)| !f)
        .map(|(&v2, _)| v2)
        .collect();
    assert!(unflagged.len() > 15, "{} baselines unflagged", unflagged.len());
    for v2 in unflagged {
        assert_abs_diff_eq!(v2, 0.25, epsilon = 0.02);
    }
    for (&cp, &flag) in calibrated
        .closure_phase
        .iter()
        .zip(calibrated.triangle_flags.iter())
    {
        if !flag {
            assert_abs_diff_eq!(cp, 0.0, epsilon = 0.05);
        }
    }
}
