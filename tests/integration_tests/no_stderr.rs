// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests to ensure there is no stderr output for successful commands.

use tempfile::TempDir;

use crate::{amipipe, get_cmd_output, write_niriss_cube};

#[test]
fn test_extract_and_calibrate_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let target = tmp_dir.path().join("target.fits");
    let cal = tmp_dir.path().join("cal.fits");
    write_niriss_cube(&target, 2, 0.8, "TARGET");
    write_niriss_cube(&cal, 2, 1.0, "CAL");
    let target_obs = tmp_dir.path().join("target.json");
    let cal_obs = tmp_dir.path().join("cal.json");

    #[rustfmt::skip]
    let cmd = amipipe()
        .args([
            "extract",
            &target.display().to_string(),
            &cal.display().to_string(),
            "--outputs", &target_obs.display().to_string(), &cal_obs.display().to_string(),
        ])
        .ok();
    assert!(
        cmd.is_ok(),
        "extract failed on simple test data: {}",
        cmd.err().unwrap()
    );
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");

    #[rustfmt::skip]
    let cmd = amipipe()
        .args([
            "calibrate",
            &target_obs.display().to_string(),
            &cal_obs.display().to_string(),
        ])
        .ok();
    assert!(
        cmd.is_ok(),
        "calibrate failed on simple test data: {}",
        cmd.err().unwrap()
    );
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
    assert!(tmp_dir.path().join("target_calibrated.oifits").exists());
}
