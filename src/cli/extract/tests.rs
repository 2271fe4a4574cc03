// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::{fs::File, io::Write, path::PathBuf};

use approx::assert_abs_diff_eq;
use clap::Parser;
use indoc::indoc;
use ndarray::{stack, Axis};
use tempfile::TempDir;

use super::*;
use crate::{
    io::load_bundle,
    mask::Instrument,
    tests::{niriss_point_source_cube, write_fits_cube},
};

/// Write a small NIRISS cube into `dir`.
fn niriss_cube(dir: &Path, name: &str) -> String {
    let file = dir.join(name);
    write_fits_cube(
        &file,
        &niriss_point_source_cube(3),
        &[("TARGPROP", "AB-DOR"), ("EXPSTART", "59761.25")],
    );
    file.display().to_string()
}

#[test]
fn test_arg_file_is_overridden_by_cli() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let arg_file = tmp_dir.path().join("extract.toml");
    let mut f = File::create(&arg_file).unwrap();
    f.write_all(
        indoc! {r#"
            data = ["ab_dor.fits"]
            instrument = "SPHERE"
            mask = "g7"
            filter = "K1"
            cutoff = 2.5
            fw_splodge = 0.5
            no_unbias = true
        "#}
        .as_bytes(),
    )
    .unwrap();
    drop(f);

    let arg_file_string = arg_file.display().to_string();
    #[rustfmt::skip]
    let args = ExtractArgs::parse_from([
        "extract",
        "--args-file", &arg_file_string,
        "--cutoff", "4",
        "--peak-method", "gauss",
    ])
    .merge()
    .unwrap();
    assert!(args.args_file.is_none());
    assert_eq!(args.data, vec!["ab_dor.fits".to_string()]);
    assert_eq!(args.instrument.as_deref(), Some("SPHERE"));
    assert_eq!(args.filter.as_deref(), Some("K1"));
    assert_eq!(args.cutoff, Some(4.0));
    assert_eq!(args.fw_splodge, Some(0.5));
    assert_eq!(args.peak_method.as_deref(), Some("gauss"));
    assert!(args.no_unbias);
}

#[test]
fn test_json_arg_file() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let arg_file = tmp_dir.path().join("extract.json");
    let mut f = File::create(&arg_file).unwrap();
    f.write_all(
        indoc! {r#"
            {
                "data": ["a.fits", "b.fits"],
                "outputs": ["a.json", "b.json"],
                "n_wl": 2,
                "clip": 3.0
            }
        "#}
        .as_bytes(),
    )
    .unwrap();
    drop(f);

    let args = ExtractArgs {
        args_file: Some(arg_file),
        ..Default::default()
    }
    .merge()
    .unwrap();
    assert_eq!(args.data.len(), 2);
    assert_eq!(
        args.outputs,
        Some(vec![PathBuf::from("a.json"), PathBuf::from("b.json")])
    );
    assert_eq!(args.n_wl, Some(2));
    assert_eq!(args.clip, Some(3.0));
    assert!(!args.no_unbias);
}

#[test]
fn test_bad_arg_files() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");

    let yaml = tmp_dir.path().join("extract.yaml");
    File::create(&yaml).unwrap();
    let result = ExtractArgs {
        args_file: Some(yaml),
        ..Default::default()
    }
    .merge();
    assert!(matches!(result, Err(AmiPipeError::ArgFile(_))));

    let toml = tmp_dir.path().join("extract.toml");
    let mut f = File::create(&toml).unwrap();
    f.write_all(b"cutoff = \"three\"\n").unwrap();
    drop(f);
    let result = ExtractArgs {
        args_file: Some(toml),
        ..Default::default()
    }
    .merge();
    assert!(matches!(result, Err(AmiPipeError::ArgFile(_))));
}

#[test]
fn test_bad_names_are_caught_before_reading() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cube = niriss_cube(tmp_dir.path(), "cube.fits");

    let result = ExtractArgs::parse_from(["extract", &cube, "--instrument", "hubble"]).parse();
    assert!(matches!(result, Err(AmiPipeError::Mask(_))));

    let result = ExtractArgs::parse_from(["extract", &cube, "--mask", "g99"]).parse();
    assert!(matches!(result, Err(AmiPipeError::Mask(_))));

    let result = ExtractArgs::parse_from(["extract", &cube, "--peak-method", "biggest"]).parse();
    match result {
        Err(AmiPipeError::Extract(s)) => assert!(s.contains("fft, gauss, square"), "{s}"),
        Err(e) => panic!("Unexpected error: {e}"),
        Ok(_) => panic!("Expected an error"),
    }

    // A simulated instrument has no pixel scale of its own.
    let result = ExtractArgs::parse_from(["extract", &cube, "-i", "simulated"]).parse();
    assert!(matches!(result, Err(AmiPipeError::Extract(_))));
}

#[test]
fn test_inputs_and_outputs_must_pair_up() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cube = niriss_cube(tmp_dir.path(), "cube.fits");

    let result = ExtractArgs::parse_from(["extract"]).parse();
    assert!(matches!(result, Err(AmiPipeError::Extract(_))));

    #[rustfmt::skip]
    let result = ExtractArgs::parse_from([
        "extract", &cube,
        "-o", "a.oifits", "b.oifits",
    ])
    .parse();
    assert!(matches!(result, Err(AmiPipeError::Extract(_))));

    let result = ExtractArgs::parse_from(["extract", &cube, "-o", "a.csv"]).parse();
    assert!(matches!(result, Err(AmiPipeError::Observables(_))));

    let missing = tmp_dir.path().join("nothing_*.fits").display().to_string();
    let result = ExtractArgs::parse_from(["extract", &missing]).parse();
    assert!(matches!(result, Err(AmiPipeError::Generic(_))));
}

#[test]
fn test_cubes_are_positional() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let a = niriss_cube(tmp_dir.path(), "a.fits");
    let b = niriss_cube(tmp_dir.path(), "b.fits");

    let args =
        ExtractArgs::try_parse_from(["extract", &a, &b, "--cutoff", "2", "--multi-tri"]).unwrap();
    assert_eq!(args.data, vec![a.clone(), b.clone()]);
    assert_eq!(args.cutoff, Some(2.0));
    assert!(args.multi_tri);

    let job = args.parse().unwrap();
    assert!(job.extractor.params().bs_multi_tri);
    assert_eq!(
        job.files,
        vec![
            (PathBuf::from(&a), tmp_dir.path().join("a.oifits")),
            (PathBuf::from(&b), tmp_dir.path().join("b.oifits")),
        ]
    );
}

#[test]
fn test_dry_run_doesnt_write() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cube = niriss_cube(tmp_dir.path(), "ab_dor.fits");
    let output = tmp_dir.path().join("ab_dor.oifits");

    let args = ExtractArgs::parse_from(["extract", &cube]);
    let job = args.clone().parse().unwrap();
    assert_eq!(job.files, vec![(PathBuf::from(&cube), output.clone())]);
    assert_eq!(job.extractor.params().instrument, Instrument::Niriss);
    assert!(job.extractor.params().unbias_v2);
    assert!(!job.extractor.params().bs_multi_tri);

    args.run(true).unwrap();
    assert!(!output.exists());
}

#[test]
fn test_extract_cube() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cube = niriss_cube(tmp_dir.path(), "ab_dor.fits");
    let output = tmp_dir.path().join("ab_dor.json");
    let output_string = output.display().to_string();

    #[rustfmt::skip]
    ExtractArgs::parse_from([
        "extract", &cube,
        "-o", &output_string,
        "--peak-method", "square",
    ])
    .run(false)
    .unwrap();

    let bundle = load_bundle(&output).unwrap();
    assert_eq!(bundle.num_baselines(), 21);
    assert_eq!(bundle.num_triangles(), 35);
    assert_eq!(bundle.num_frames, 3);
    assert_eq!(bundle.info.target, "AB-DOR");
    assert_eq!(bundle.info.source_file.as_deref(), Some(cube.as_str()));
    assert_abs_diff_eq!(bundle.info.mjd.unwrap(), 59761.25);
    assert_eq!(bundle.info.filter, "F480M");
    assert_eq!(
        bundle.params.map(|p| p.peakmethod),
        Some(PeakMethod::Square)
    );
}

#[test]
fn test_extract_spectral_cube() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let single = niriss_point_source_cube(2);
    let spectral = stack![Axis(0), single, single];
    let cube = tmp_dir.path().join("ifs.fits");
    write_fits_cube(&cube, &spectral, &[]);
    let cube = cube.display().to_string();

    ExtractArgs::parse_from(["extract", &cube, "--target", "HD 37093"])
        .run(false)
        .unwrap();

    let ch0 = load_bundle(tmp_dir.path().join("ifs_ch0.oifits")).unwrap();
    let ch1 = load_bundle(tmp_dir.path().join("ifs_ch1.oifits")).unwrap();
    assert_eq!(ch0.info.target, "HD 37093");
    assert!(ch0.info.wavelength < ch1.info.wavelength);
    assert_eq!(ch1.num_frames, 2);
    assert!(!tmp_dir.path().join("ifs.oifits").exists());
}

#[test]
fn test_channel_filename() {
    assert_eq!(
        channel_filename(Path::new("out/ab_dor.oifits"), 3),
        PathBuf::from("out/ab_dor_ch3.oifits")
    );
    assert_eq!(
        channel_filename(Path::new("ab_dor.json"), 0),
        PathBuf::from("ab_dor_ch0.json")
    );
}
