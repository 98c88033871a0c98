// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use tempfile::TempDir;

use super::*;
use crate::{
    data::{baseline_code, Pol, TsysState},
    io::write::CycleFileWriter,
    tests::{
        online_tsys, synthetic_cycle, synthetic_header, write_cycle, write_synthetic_file,
        BASE_MJD, CYCLE_TIME, NUM_ANTENNAS,
    },
};

fn mjd(ut_seconds: f64) -> f64 {
    BASE_MJD + ut_seconds / SECONDS_PER_DAY
}

/// Two files and three scans of 10 s cycles.
fn two_files(tmp: &TempDir) -> Vec<PathBuf> {
    let a = tmp.path().join("a.cyc");
    let b = tmp.path().join("b.cyc");
    write_synthetic_file(&a, &[1000.0, 1100.0], 3);
    write_synthetic_file(&b, &[2000.0], 4);
    vec![a, b]
}

fn spectrum_request(mjd: f64) -> ReadRequest<'static> {
    ReadRequest {
        intents: ReadIntents {
            spectrum: true,
            ..Default::default()
        },
        mjd: Some(mjd),
        ..Default::default()
    }
}

fn vis_request() -> ReadRequest<'static> {
    ReadRequest {
        intents: ReadIntents {
            vis_products: true,
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn test_scan_metadata() {
    let tmp = TempDir::new().unwrap();
    let paths = two_files(&tmp);
    let request = ReadRequest {
        intents: ReadIntents {
            scan_metadata: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let products = read_data(&paths, None, &request, &mut vec![]).unwrap();
    let index = products.index.unwrap();
    assert_eq!(index.num_scans(), 3);
    assert_eq!(index.cycle_mjds().len(), 10);

    let reference = DataIndex::build(&paths).unwrap();
    assert_eq!(index.time_range(), reference.time_range());
    assert_eq!(index.cycle_mjds(), reference.cycle_mjds());
    assert!(products.spectrum.is_none());
    assert!(products.vis.is_none());
}

#[test]
fn test_grab_spectrum() {
    let tmp = TempDir::new().unwrap();
    let paths = two_files(&tmp);
    let index = DataIndex::build(&paths).unwrap();
    let mut options = vec![];

    // 3 s past a cycle is close enough.
    let products =
        read_data(&paths, Some(&index), &spectrum_request(mjd(1113.0)), &mut options).unwrap();
    let spectrum = products.spectrum.unwrap();
    assert!(!products.spectrum_cached);
    assert_abs_diff_eq!(spectrum.ut_seconds, 1110.0);
    assert_abs_diff_eq!(spectrum.mjd, mjd(1110.0), epsilon = 1e-9);
    assert_eq!(spectrum.num_windows(), 2);
    assert!(spectrum.ampphase.iter().all(|w| w.len() == 4));
    let first = spectrum.first().unwrap();
    assert_eq!(first.window, 1);
    assert_eq!(first.pol, Pol::XX);
    assert_eq!(first.obsdate(), spectrum.header.obsdate);

    // The header is shared with the index.
    assert!(Arc::ptr_eq(&spectrum.header, &index.files[0].scans[1].header));

    // Options for the scan's IF configuration were created.
    assert_eq!(options.len(), 1);
    assert!(options[0].matches_header(&spectrum.header));
    assert_eq!(spectrum.options, options);
}

#[test]
fn test_spectrum_outside_range() {
    let tmp = TempDir::new().unwrap();
    let paths = two_files(&tmp);
    let index = DataIndex::build(&paths).unwrap();
    let range = index.time_range().unwrap();

    let result = read_data(
        &paths,
        Some(&index),
        &spectrum_request(range.latest_mjd + 1.0),
        &mut vec![],
    );
    assert!(matches!(
        result,
        Err(PipelineError::OutsideMJDRange { .. })
    ));

    // Within the range of the data, but between scans.
    let result = read_data(&paths, Some(&index), &spectrum_request(mjd(1060.0)), &mut vec![]);
    assert!(matches!(result, Err(PipelineError::NoCycleFound { .. })));
}

#[test]
fn test_vis_products() {
    let tmp = TempDir::new().unwrap();
    let paths = two_files(&tmp);
    let index = DataIndex::build(&paths).unwrap();

    let products = read_data(&paths, Some(&index), &vis_request(), &mut vec![]).unwrap();
    let vis = products.vis.unwrap();
    assert_eq!(vis.num_cycles(), 10);
    assert!(vis.cycles.windows(2).all(|w| w[0].mjd < w[1].mjd));
    assert_abs_diff_eq!(vis.mjd_low, mjd(995.0), epsilon = 1e-9);
    assert_abs_diff_eq!(vis.mjd_high, mjd(2035.0), epsilon = 1e-9);

    let cycle = &vis.cycles[0];
    assert_eq!(cycle.quantities.len(), 2);
    assert!(cycle.quantities.iter().all(|w| w.len() == 4));
    assert!(cycle.site.is_some());
    assert_eq!(cycle.syscal.len(), 2 * NUM_ANTENNAS);
    assert!(cycle.syscal.iter().all(|c| c.applied == TsysState::Online));

    // Only the cycles of the second file.
    let request = ReadRequest {
        mjd_range: Some((mjd(1500.0), mjd(3000.0))),
        ..vis_request()
    };
    let vis = read_data(&paths, Some(&index), &request, &mut vec![])
        .unwrap()
        .vis
        .unwrap();
    assert_eq!(vis.num_cycles(), 4);
    assert_abs_diff_eq!(vis.mjd_low, mjd(1500.0));
}

#[test]
fn test_cycles_with_extra_autocorrelation_bins_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("bins.cyc");
    let header = synthetic_header(1000.0);
    let mut writer = CycleFileWriter::create(&path).unwrap();
    writer.write_header(&header).unwrap();
    for i in 0..3 {
        let ut = 1000.0 + i as f64 * CYCLE_TIME;
        let mut cycle = synthetic_cycle(&header, ut);
        if i == 1 {
            let mut third = cycle
                .points
                .iter()
                .find(|p| p.window == 1 && p.ant1 == 2 && p.ant2 == 2 && p.bin == 2)
                .unwrap()
                .clone();
            third.bin = 3;
            cycle.points.push(third);
        }
        write_cycle(&mut writer, &header, &cycle);
    }
    writer.finish().unwrap();
    let paths = vec![path];

    // The index doesn't calibrate anything, so it sees every cycle.
    let index = DataIndex::build(&paths).unwrap();
    assert_eq!(index.cycle_mjds().len(), 3);

    for apply_computed in [false, true] {
        let mut options = vec![];
        let mut vis_options = vec![AmpPhaseOptions {
            systemp_apply_computed: apply_computed,
            ..AmpPhaseOptions::for_header(&AmpPhaseOptions::default(), &header)
        }];
        let vis = read_data(&paths, Some(&index), &vis_request(), &mut vis_options)
            .unwrap()
            .vis
            .unwrap();
        assert_eq!(vis.num_cycles(), 2);
        assert_abs_diff_eq!(vis.cycles[0].mjd, mjd(1000.0), epsilon = 1e-9);
        assert_abs_diff_eq!(vis.cycles[1].mjd, mjd(1020.0), epsilon = 1e-9);

        // Neighbouring cycles are still available as spectra.
        let spectrum = read_data(&paths, Some(&index), &spectrum_request(mjd(1022.0)), &mut options)
            .unwrap()
            .spectrum
            .unwrap();
        assert_abs_diff_eq!(spectrum.ut_seconds, 1020.0);
    }
}

#[test]
fn test_caches_are_searched_first() {
    let tmp = TempDir::new().unwrap();
    let paths = two_files(&tmp);
    let index = DataIndex::build(&paths).unwrap();
    let mut options = vec![];
    let request = ReadRequest {
        intents: ReadIntents {
            spectrum: true,
            vis_products: true,
            ..Default::default()
        },
        mjd: Some(mjd(2010.0)),
        ..Default::default()
    };
    let products = read_data(&paths, Some(&index), &request, &mut options).unwrap();

    let mut caches = Caches::default();
    let spectrum = caches
        .spectrum
        .insert(&options, products.spectrum.unwrap());
    let vis = caches.vis.insert(&options, products.vis.unwrap());

    // No files are needed now.
    let request = ReadRequest {
        caches: Some(&caches),
        ..request
    };
    let products = read_data(&[], Some(&index), &request, &mut options).unwrap();
    assert!(products.spectrum_cached);
    assert!(products.vis_cached);
    assert!(Arc::ptr_eq(&products.spectrum.unwrap(), &spectrum));
    assert!(Arc::ptr_eq(&products.vis.unwrap(), &vis));

    // Different options miss.
    let mut other = options.clone();
    other[0].phase_in_degrees = false;
    let products = read_data(&paths, Some(&index), &request, &mut other).unwrap();
    assert!(!products.spectrum_cached);
    assert!(!products.vis_cached);
    assert!(!products.spectrum.unwrap().options[0].phase_in_degrees);
}

#[test]
fn test_tsys_reversal() {
    let tmp = TempDir::new().unwrap();
    let paths = two_files(&tmp);
    let index = DataIndex::build(&paths).unwrap();
    let ant = 2;
    let code = baseline_code(ant, ant);

    let amplitude = |options: &mut Vec<AmpPhaseOptions>| {
        let vis = read_data(&paths, Some(&index), &vis_request(), options)
            .unwrap()
            .vis
            .unwrap();
        vis.cycles[0].get(1, Pol::XY).unwrap().baseline(code).unwrap().bins[0].amplitude
    };

    let online = amplitude(&mut vec![]);
    let mut options = vec![AmpPhaseOptions {
        systemp_reverse_online: true,
        systemp_apply_computed: false,
        ..Default::default()
    }];
    let reversed = amplitude(&mut options);
    assert_relative_eq!(
        online / reversed,
        (online_tsys(ant, 0) * online_tsys(ant, 1)).sqrt(),
        max_relative = 1e-3
    );
}

#[test]
fn test_closure_phases_of_a_point_source() {
    let tmp = TempDir::new().unwrap();
    let paths = two_files(&tmp);
    let index = DataIndex::build(&paths).unwrap();
    let vis = read_data(&paths, Some(&index), &vis_request(), &mut vec![])
        .unwrap()
        .vis
        .unwrap();

    for cycle in &vis.cycles {
        for vq in cycle.quantities.iter().flatten() {
            if vq.pol.parallel_feed().is_none() {
                continue;
            }
            assert!(!vq.closures.is_empty());
            for closure in &vq.closures {
                assert!(closure.antennas.contains(&1));
                assert!(closure.phase.iter().all(|p| p.abs() < 5.0), "{closure:?}");
            }
        }
    }
}

#[test]
fn test_unreadable_files_are_skipped() {
    let tmp = TempDir::new().unwrap();
    let mut paths = two_files(&tmp);
    let junk = tmp.path().join("junk.cyc");
    std::fs::write(&junk, b"not a cycle file").unwrap();
    paths.insert(0, junk);
    paths.push(tmp.path().join("missing.cyc"));

    let vis = read_data(&paths, None, &vis_request(), &mut vec![])
        .unwrap()
        .vis
        .unwrap();
    assert_eq!(vis.num_cycles(), 10);
}
