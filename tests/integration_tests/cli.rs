// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests of the command-line interface itself.

use tempfile::TempDir;

use crate::{amipipe, get_cmd_output, write_niriss_cube};

#[test]
fn test_help_lists_subcommands() {
    let cmd = amipipe().arg("--help").ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    for sub in ["extract", "calibrate", "masks"] {
        assert!(stdout.contains(sub), "'{sub}' missing from help:\n{stdout}");
    }

    let cmd = amipipe().args(["extract", "--help"]).ok();
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("--peak-method"), "{stdout}");
    assert!(stdout.contains("--args-file"), "{stdout}");
}

#[test]
fn test_masks() {
    let cmd = amipipe().args(["masks", "--no-progress-bars"]).ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, stderr) = get_cmd_output(cmd);
    assert!(stdout.contains("NIRISS"), "{stdout}");
    assert!(stdout.contains("SPHERE-IFS"), "{stdout}");
    assert!(
        stdout.contains("Mask g7: 7 holes, 21 baselines, 35 triangles"),
        "{stdout}"
    );
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");

    // Subcommands can be abbreviated.
    let cmd = amipipe().args(["mas", "vampires"]).ok();
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("VAMPIRES"), "{stdout}");
    assert!(!stdout.contains("NIRISS"), "{stdout}");
}

#[test]
fn test_errors_go_to_stderr() {
    let cmd = amipipe().args(["masks", "miri"]).ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: Unknown instrument 'miri'"), "{stderr}");
    assert!(stderr.contains("amipipe masks"), "{stderr}");

    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let missing = tmp_dir.path().join("missing.fits");
    let cmd = amipipe()
        .args(["extract", &missing.display().to_string()])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("No glob matches"), "{stderr}");
}

#[test]
fn test_dry_run_and_save_toml() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let cube = tmp_dir.path().join("ab_dor.fits");
    write_niriss_cube(&cube, 2, 1.0, "AB-DOR");
    let toml = tmp_dir.path().join("args.toml");

    #[rustfmt::skip]
    let cmd = amipipe()
        .args([
            "extract", &cube.display().to_string(),
            "--cutoff", "2.5",
            "--dry-run",
            "--save-toml", &toml.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Dry run"), "{stdout}");
    assert!(!tmp_dir.path().join("ab_dor.oifits").exists());

    let saved = std::fs::read_to_string(&toml).unwrap();
    assert!(saved.contains("cutoff = 2.5"), "{saved}");
    assert!(saved.contains("ab_dor.fits"), "{saved}");

    // The saved arguments reproduce the run.
    let cmd = amipipe()
        .args(["extract", "--args-file", &toml.display().to_string()])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());
    assert!(tmp_dir.path().join("ab_dor.oifits").exists());
}
