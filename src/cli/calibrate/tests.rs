// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{fs::File, io::Write, path::Path};

use approx::assert_abs_diff_eq;
use clap::Parser;
use indoc::formatdoc;
use tempfile::TempDir;

use super::*;
use crate::tests::point_source_bundle;

/// Save the same point-source observables under each name.
fn save_point_sources(dir: &Path, names: &[&str]) -> Vec<String> {
    let bundle = point_source_bundle(2);
    names
        .iter()
        .map(|name| {
            let file = dir.join(name);
            save_bundle(&bundle, &file).unwrap();
            file.display().to_string()
        })
        .collect()
}

#[test]
fn test_needs_a_calibrator() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let files = save_point_sources(tmp_dir.path(), &["target.json"]);

    let result = CalibrateArgs::parse_from(["calibrate", &files[0]]).run(false);
    match result {
        Err(AmiPipeError::Calibrate(s)) => assert!(s.contains("1 observables file"), "{s}"),
        Err(e) => panic!("Unexpected error: {e}"),
        Ok(()) => panic!("Expected an error"),
    }

    let result = CalibrateArgs::parse_from(["calibrate"]).run(false);
    assert!(matches!(result, Err(AmiPipeError::Calibrate(_))));
}

#[test]
fn test_bundles_are_positional() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let files = save_point_sources(tmp_dir.path(), &["target.json", "cal.json"]);

    let args = CalibrateArgs::try_parse_from(["calibrate", &files[0], &files[1]]).unwrap();
    assert_eq!(args.bundles, files);
    let job = args.parse().unwrap();
    assert_eq!(job.target, PathBuf::from(&files[0]));
    assert_eq!(job.calibrators, vec![PathBuf::from(&files[1])]);
    assert_eq!(job.output, tmp_dir.path().join("target_calibrated.oifits"));
}

#[test]
fn test_calibrate_with_default_output() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let files = save_point_sources(tmp_dir.path(), &["target.json", "cal1.json", "cal2.oifits"]);
    let output = tmp_dir.path().join("target_calibrated.oifits");

    CalibrateArgs::parse_from(["calibrate", &files[0], &files[1], &files[2]])
        .run(true)
        .unwrap();
    assert!(!output.exists());

    CalibrateArgs::parse_from(["calibrate", &files[0], &files[1], &files[2]])
        .run(false)
        .unwrap();
    let calibrated = load_bundle(&output).unwrap();
    assert!(calibrated.calibrated);
    assert_eq!(calibrated.calibrators.len(), 2);
    for &v2 in &calibrated.vis2 {
        assert_abs_diff_eq!(v2, 1.0, epsilon = 1e-10);
    }
    for &cp in &calibrated.closure_phase {
        assert_abs_diff_eq!(cp, 0.0, epsilon = 1e-10);
    }

    // Calibrated observables can't be calibrated again.
    let output = output.display().to_string();
    let result = CalibrateArgs::parse_from(["calibrate", &output, &files[1]]).run(false);
    assert!(matches!(result, Err(AmiPipeError::Calibrate(_))));
}

#[test]
fn test_calibrate_from_arg_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    save_point_sources(tmp_dir.path(), &["ab_dor.json", "cal_a.json", "cal_b.json"]);
    let output = tmp_dir.path().join("out").join("ab_dor.json");
    let dir = tmp_dir.path().display();

    let arg_file = tmp_dir.path().join("calibrate.toml");
    let mut f = File::create(&arg_file).unwrap();
    f.write_all(
        formatdoc! {r#"
            bundles = ["{dir}/ab_dor.json", "{dir}/cal_*.json"]
            output = "{}"
        "#, output.display()}
        .as_bytes(),
    )
    .unwrap();
    drop(f);

    let args = CalibrateArgs {
        args_file: Some(arg_file),
        ..Default::default()
    }
    .merge()
    .unwrap();
    let job = args.clone().parse().unwrap();
    assert_eq!(job.target, tmp_dir.path().join("ab_dor.json"));
    assert_eq!(
        job.calibrators,
        vec![
            tmp_dir.path().join("cal_a.json"),
            tmp_dir.path().join("cal_b.json")
        ]
    );

    args.run(false).unwrap();
    let calibrated = load_bundle(&output).unwrap();
    assert!(calibrated.calibrated);
    assert_eq!(calibrated.frame_vis2.nrows(), 2);
}
