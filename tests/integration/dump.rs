// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Running the binary without `--networked` preloads data and writes it out.

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use super::*;
use visdata_server::{
    client::read_dump_file,
    constants::{DEFAULT_CLIENT_ID, SPECTRUM_DUMP_FILENAME, VIS_DUMP_FILENAME},
    wire::{ResponseBody, ResponseType},
};

#[test]
fn test_dump_mode_writes_both_products() {
    let tmp = TempDir::new().unwrap();
    let paths = observation(&tmp);
    let cmd = visdata_server()
        .args([
            paths[0].to_str().unwrap(),
            paths[1].to_str().unwrap(),
            "--dump-dir",
            tmp.path().to_str().unwrap(),
            "--no-progress-bars",
        ])
        .ok();
    assert!(cmd.is_ok(), "{:?}", cmd.err());

    let spectrum = read_dump_file(&tmp.path().join(SPECTRUM_DUMP_FILENAME)).unwrap();
    assert_eq!(spectrum.len(), 1);
    assert_eq!(spectrum[0].response_type(), ResponseType::CurrentSpectrum);
    assert_eq!(spectrum[0].header.client_id, DEFAULT_CLIENT_ID);
    match &spectrum[0].body {
        ResponseBody::Spectrum { spectrum, options } => {
            // Ten seconds into one of the three scans.
            assert!(
                [1010.0, 1070.0, 4610.0].contains(&spectrum.ut_seconds),
                "{}",
                spectrum.ut_seconds
            );
            assert_eq!(spectrum.num_windows(), 2);
            assert_eq!(options.len(), 1);
            assert_eq!(options[0].num_windows(), 2);
        }
        body => panic!("unexpected body {body:?}"),
    }

    let vis = read_dump_file(&tmp.path().join(VIS_DUMP_FILENAME)).unwrap();
    assert_eq!(vis.len(), 1);
    assert_eq!(vis[0].response_type(), ResponseType::CurrentVisdata);
    match &vis[0].body {
        ResponseBody::Vis { vis, .. } => {
            assert_eq!(vis.num_cycles(), 10);
            assert_abs_diff_eq!(vis.mjd_low, mjd(995.0), epsilon = 1e-9);
            assert_abs_diff_eq!(vis.mjd_high, mjd(4635.0), epsilon = 1e-9);
        }
        body => panic!("unexpected body {body:?}"),
    }
}

#[test]
fn test_globs_are_expanded() {
    let tmp = TempDir::new().unwrap();
    observation(&tmp);
    let glob = tmp.path().join("*.cyc");
    let cmd = visdata_server()
        .args([
            glob.to_str().unwrap(),
            "--dump-dir",
            tmp.path().to_str().unwrap(),
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok());
    let (stdout, _) = get_cmd_output(cmd.unwrap());
    assert!(stdout.contains("2023-06-01_0016.cyc"), "{stdout}");
    assert!(stdout.contains("2023-06-01_0117.cyc"), "{stdout}");
    // Nothing is written on a dry run.
    assert!(!tmp.path().join(SPECTRUM_DUMP_FILENAME).exists());
    assert!(!tmp.path().join(VIS_DUMP_FILENAME).exists());
}

#[test]
fn test_no_inputs_is_an_error() {
    let cmd = visdata_server().arg("--no-progress-bars").ok();
    let output = cmd.unwrap_err().as_output().unwrap().clone();
    assert!(!output.status.success());
    let (_, stderr) = get_cmd_output(output);
    assert!(stderr.contains("Error:"), "{stderr}");
    assert!(stderr.contains("No input cycle files"), "{stderr}");
}

#[test]
fn test_missing_files_are_an_error() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.cyc");
    let cmd = visdata_server()
        .args([missing.to_str().unwrap(), "--dry-run"])
        .ok();
    assert!(cmd.is_err());
}

#[test]
fn test_save_toml_round_trips() {
    let tmp = TempDir::new().unwrap();
    let paths = observation(&tmp);
    let toml = tmp.path().join("args.toml");
    let cmd = visdata_server()
        .args([
            paths[0].to_str().unwrap(),
            "--port",
            "9123",
            "--dry-run",
            "--save-toml",
            toml.to_str().unwrap(),
        ])
        .ok();
    assert!(cmd.is_ok());
    let contents = std::fs::read_to_string(&toml).unwrap();
    assert!(contents.contains("port = 9123"), "{contents}");

    // The saved arguments drive a dump on their own.
    let cmd = visdata_server()
        .args([
            "--args-file",
            toml.to_str().unwrap(),
            "--dump-dir",
            tmp.path().to_str().unwrap(),
        ])
        .ok();
    assert!(cmd.is_ok());
    assert!(tmp.path().join(SPECTRUM_DUMP_FILENAME).exists());
}
