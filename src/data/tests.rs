// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;
use num_complex::Complex;

use super::*;

fn stokes() -> Vec<String> {
    ["XX", "YY", "XY", "YX"].iter().map(|s| s.to_string()).collect()
}

fn header_with_chains(chains: &[usize]) -> ScanHeader {
    let windows = chains
        .iter()
        .map(|&c| IfWindow::new(2100.0, 2048.0, 2049, 1, c, stokes()))
        .collect();
    ScanHeader::new(
        "2023-06-01".to_string(),
        3600.0,
        "Point".to_string(),
        "C".to_string(),
        10.0,
        vec![],
        windows,
        vec![],
    )
}

#[test]
fn test_window_names() {
    let header = header_with_chains(&[1, 2, 1, 1, 2]);
    let names: Vec<_> = header.windows.iter().map(|w| w.names.clone()).collect();
    assert_eq!(names[0], ["f1", "f1", "f1"]);
    assert_eq!(names[1], ["f2", "f2", "f2"]);
    assert_eq!(names[2], ["f3", "z1", "z1-1"]);
    assert_eq!(names[3], ["f4", "z2", "z1-2"]);
    assert_eq!(names[4], ["f5", "z3", "z2-1"]);

    assert_eq!(header.windows[0].kind, WindowKind::Continuum);
    assert_eq!(header.windows[3].kind, WindowKind::Zoom);
    assert_eq!(header.windows[3].chain_index, 2);
    assert_eq!(header.window(5).map(|w| w.chain), Some(2));
    assert!(header.window(6).is_none());
}

#[test]
fn test_stokes_slots() {
    let header = header_with_chains(&[1]);
    let w = &header.windows[0];
    assert_eq!(w.stokes_slot(Pol::XX), Some(0));
    assert_eq!(w.stokes_slot(Pol::YX), Some(3));
    assert_eq!(w.stokes_pol(2), Some(Pol::XY));
    assert_eq!(w.stokes_pol(7), None);
}

#[test]
fn test_baseline_codes() {
    assert_eq!(baseline_code(1, 2), 258);
    assert_eq!(baseline_code(2, 1), 258);
    assert_eq!(baseline_code(3, 3), 771);
    assert_eq!(split_baseline_code(258), (1, 2));
}

#[test]
fn test_normalise_reversed_point() {
    let header = header_with_chains(&[1]);
    let mut window = header.windows[0].clone();
    window.num_channels = 2;

    let vis: Vec<Complex<f32>> = (0..8).map(|i| Complex::new(i as f32, 1.0)).collect();
    let mut point = VisPoint {
        u_m: 1.0,
        v_m: 2.0,
        w_m: 3.0,
        ant1: 4,
        ant2: 2,
        flag: 0,
        bin: 1,
        window: 1,
        source: 1,
        vis,
        weight: (0..8).map(|i| i as f32).collect(),
    };
    point.normalise(&window);
    assert_eq!((point.ant1, point.ant2), (2, 4));
    assert_eq!(point.baseline_code(), 2 * 256 + 4);
    assert_abs_diff_eq!(point.u_m, -1.0);
    // XX of channel 0 is conjugated in place.
    assert_eq!(point.vis[0], Complex::new(0.0, -1.0));
    // XY and YX of channel 1 are exchanged.
    assert_eq!(point.vis[6], Complex::new(7.0, -1.0));
    assert_eq!(point.vis[7], Complex::new(6.0, -1.0));
    assert_abs_diff_eq!(point.weight[6], 7.0);
}

#[test]
fn test_cycle_baseline_index() {
    let mk = |a1, a2| VisPoint {
        u_m: 0.0,
        v_m: 0.0,
        w_m: 0.0,
        ant1: a1,
        ant2: a2,
        flag: 0,
        bin: 1,
        window: 1,
        source: 1,
        vis: vec![],
        weight: vec![],
    };
    let cycle = CycleData::new(10.0, vec![mk(2, 3), mk(1, 2), mk(1, 1), mk(1, 2)], Syscal::default());
    assert_eq!(cycle.num_baselines(), 3);
    assert_eq!(cycle.baseline_index(baseline_code(1, 1)), Some(1));
    assert_eq!(cycle.baseline_index(baseline_code(1, 2)), Some(2));
    assert_eq!(cycle.baseline_index(baseline_code(2, 3)), Some(3));
    assert_eq!(cycle.baseline_index(baseline_code(3, 3)), None);
    assert_eq!(cycle.antennas().into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
}

#[test]
fn test_obsdate_mjd() {
    let header = header_with_chains(&[1]);
    // 2023-06-01 is MJD 60096.
    assert_abs_diff_eq!(header.base_mjd().unwrap(), 60096.0, epsilon = 1e-9);
    assert_abs_diff_eq!(
        header.mjd_at(43200.0).unwrap(),
        60096.5,
        epsilon = 1e-9
    );

    let bad = ScanHeader {
        obsdate: "yesterday".to_string(),
        ..header_with_chains(&[1])
    };
    assert!(matches!(bad.base_mjd(), Err(DataError::BadObsDate(_))));
}

#[test]
fn test_syscal_state_and_slice() {
    let mut syscal = Syscal::default();
    let mut cell = SyscalCell::new(1, 1);
    cell.tsys = [30.0, 40.0];
    cell.applied = TsysState::Online;
    syscal.insert(cell);
    syscal.insert(SyscalCell::new(2, 1));

    assert_eq!(syscal.tsys_state(), TsysState::Online);
    assert_eq!(syscal.cell(1, 1).and_then(|c| c.applied_tsys(Feed::Y)), Some(40.0));

    let slice = syscal.slice(1, Some(Feed::Y));
    assert_eq!(slice.antennas.len(), 1);
    assert_abs_diff_eq!(slice.antennas[0].pol.as_ref().unwrap().tsys, 40.0);

    let slice = syscal.slice(1, None);
    assert!(slice.antennas[0].pol.is_none());

    assert_eq!(TsysState::from_flags(true, true), None);
    assert_eq!(TsysState::from_flags(false, true), Some(TsysState::Computed));
}
