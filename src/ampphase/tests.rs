// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use approx::assert_abs_diff_eq;

use super::*;
use crate::{
    data::baseline_code,
    options::Modifier,
    tests::{antenna_delay_ns, gain_phase, synthetic_cycle, synthetic_header, NUM_ANTENNAS, NUM_CHANNELS},
};

fn setup() -> (Arc<ScanHeader>, CycleData) {
    let header = Arc::new(synthetic_header(3600.0));
    let cycle = synthetic_cycle(&header, 3610.0);
    (header, cycle)
}

#[test]
fn test_frequency_grid() {
    let header = synthetic_header(0.0);
    let freqs = channel_frequencies_ghz(&header.windows[0]);
    assert_eq!(freqs.len(), NUM_CHANNELS);
    // 2048 MHz over 32 channel widths.
    assert_abs_diff_eq!(freqs[16], 5.5, epsilon = 1e-12);
    assert_abs_diff_eq!(freqs[1] - freqs[0], 0.064, epsilon = 1e-12);

    // Lower sideband runs downwards.
    let freqs = channel_frequencies_ghz(&header.windows[1]);
    assert_abs_diff_eq!(freqs[16], 9.0, epsilon = 1e-12);
    assert!(freqs[1] < freqs[0]);
}

#[test]
fn test_single_channel_window() {
    let mut header = synthetic_header(0.0);
    header.windows[0].num_channels = 1;
    let freqs = channel_frequencies_ghz(&header.windows[0]);
    assert_eq!(freqs, [5.5]);
}

#[test]
fn test_shape() {
    let (header, cycle) = setup();
    let mut options = vec![];
    let ap = compute_ampphase(&header, &cycle, 1, Pol::XX, &mut options).unwrap();

    // Options were created for this configuration.
    assert_eq!(options.len(), 1);
    assert!(options[0].matches(&ap.options));
    assert!(Arc::ptr_eq(&ap.header, &header));
    assert_eq!(ap.obsdate(), header.obsdate);
    assert_eq!(ap.ut_seconds, 3610.0);
    assert_eq!(ap.window, 1);
    assert_eq!(ap.num_channels(), NUM_CHANNELS);
    assert_eq!(ap.channels[5], 5.0);
    assert_eq!(ap.num_baselines(), NUM_ANTENNAS * (NUM_ANTENNAS + 1) / 2);

    for baseline in &ap.baselines {
        let (a1, a2) = baseline.antennas();
        assert!(a1 <= a2);
        let expected_bins: &[usize] = if a1 == a2 { &[1, 2] } else { &[1] };
        let bins: Vec<usize> = baseline.bins.iter().map(|b| b.bin).collect();
        assert_eq!(bins, expected_bins);
        for bin in &baseline.bins {
            assert_eq!(bin.raw.len(), NUM_CHANNELS);
            assert_eq!(bin.unflagged.num_channels(), NUM_CHANNELS);
            assert!(!bin.flagged_bad);
        }
    }

    // XX syscal includes the X column.
    let pol = ap.syscal.antennas[0].pol.as_ref().unwrap();
    assert_eq!(pol.tsys, crate::tests::online_tsys(1, 0));
}

#[test]
fn test_phases_in_range() {
    let (header, cycle) = setup();
    for degrees in [true, false] {
        let mut options = vec![AmpPhaseOptions {
            phase_in_degrees: degrees,
            ..Default::default()
        }];
        let ap = compute_ampphase(&header, &cycle, 2, Pol::YY, &mut options).unwrap();
        let limit = if degrees { 180.0 } else { std::f32::consts::PI };
        for bin in ap.baselines.iter().flat_map(|b| b.bins.iter()) {
            assert!(bin.phase.iter().all(|p| p.abs() <= limit));
        }
        assert!(ap.extents.phase.0 >= -limit && ap.extents.phase.1 <= limit);
        assert!(ap.extents.amplitude.0 > 0.0);
    }
}

#[test]
fn test_cross_hand_has_no_pol_syscal() {
    let (header, cycle) = setup();
    let ap = compute_ampphase(&header, &cycle, 1, Pol::XY, &mut vec![]).unwrap();
    assert!(ap.syscal.feed.is_none());
    assert!(ap.syscal.antennas.iter().all(|a| a.pol.is_none()));
}

#[test]
fn test_modifiers_remove_delays_and_phases() {
    let (header, cycle) = setup();
    let mut options = vec![AmpPhaseOptions::for_header(
        &AmpPhaseOptions {
            phase_in_degrees: true,
            ..Default::default()
        },
        &header,
    )];
    let mjd = header.mjd_at(cycle.ut_seconds).unwrap();
    let mut modifier = Modifier::new(mjd - 1.0, mjd + 1.0);
    modifier.delay_ns = Some(
        (1..=NUM_ANTENNAS)
            .map(|a| [antenna_delay_ns(a), antenna_delay_ns(a), 0.0])
            .collect(),
    );
    modifier.phase_rad = Some(
        (1..=NUM_ANTENNAS)
            .map(|a| [-gain_phase(a), -gain_phase(a), 0.0])
            .collect(),
    );
    options[0].add_modifier(1, modifier).unwrap();

    let ap = compute_ampphase(&header, &cycle, 1, Pol::XX, &mut options).unwrap();
    for baseline in ap.baselines.iter().filter(|b| !b.is_autocorrelation()) {
        for phase in &baseline.bins[0].phase {
            assert_abs_diff_eq!(*phase, 0.0, epsilon = 1e-2);
        }
    }

    // Without the modifier, the phases wander.
    let ap = compute_ampphase(&header, &cycle, 1, Pol::XX, &mut vec![]).unwrap();
    let bl = ap.baseline(baseline_code(1, 4)).unwrap();
    assert!(bl.bins[0].phase.iter().any(|p| p.abs() > 1.0));
}

#[test]
fn test_inactive_modifier_is_ignored() {
    let (header, cycle) = setup();
    let mut options = vec![AmpPhaseOptions::for_header(&AmpPhaseOptions::default(), &header)];
    let mjd = header.mjd_at(cycle.ut_seconds).unwrap();
    let mut modifier = Modifier::new(mjd + 1.0, mjd + 2.0);
    modifier.phase_rad = Some(vec![[1.0, 1.0, 1.0]; NUM_ANTENNAS]);
    options[0].add_modifier(1, modifier).unwrap();

    let with = compute_ampphase(&header, &cycle, 1, Pol::XX, &mut options).unwrap();
    let without = compute_ampphase(&header, &cycle, 1, Pol::XX, &mut vec![]).unwrap();
    assert_eq!(with.baselines, without.baselines);
}

#[test]
fn test_nan_channels_are_excluded() {
    let (header, mut cycle) = setup();
    let code = baseline_code(2, 3);
    let point = cycle
        .points
        .iter_mut()
        .find(|p| p.baseline_code() == code && p.window == 1)
        .unwrap();
    // Blank two channels of XX, then every value.
    point.vis[0] = Complex::new(f32::NAN, 0.0);
    point.vis[4] = Complex::new(f32::NAN, f32::NAN);
    let ap = compute_ampphase(&header, &cycle, 1, Pol::XX, &mut vec![]).unwrap();
    let bin = &ap.baseline(code).unwrap().bins[0];
    assert_eq!(bin.raw.len(), NUM_CHANNELS);
    assert_eq!(bin.unflagged.num_channels(), NUM_CHANNELS - 2);
    assert_eq!(bin.unflagged.channel[0], 2.0);
    let extents_with_data = ap.extents;

    let point = cycle
        .points
        .iter_mut()
        .find(|p| p.baseline_code() == code && p.window == 1)
        .unwrap();
    point.vis.iter_mut().for_each(|v| *v = Complex::new(f32::NAN, f32::NAN));
    let ap = compute_ampphase(&header, &cycle, 1, Pol::XX, &mut vec![]).unwrap();
    let baseline = ap.baseline(code).unwrap();
    assert_eq!(baseline.bins[0].unflagged.num_channels(), 0);
    assert_eq!(baseline.extents, Extents::default());
    assert!(ap.extents.amplitude.0.is_finite() && ap.extents.amplitude.1.is_finite());
    assert!(ap.extents.amplitude.1 <= extents_with_data.amplitude.1);
}

#[test]
fn test_flagged_points() {
    let (header, mut cycle) = setup();
    cycle.points[0].flag = 1;
    let ap = compute_ampphase(&header, &cycle, 1, Pol::XX, &mut vec![]).unwrap();
    let code = cycle.points[0].baseline_code();
    let bin = ap.baseline(code).unwrap().bin(cycle.points[0].bin).unwrap();
    assert!(bin.flagged_bad);
}

#[test]
fn test_errors() {
    let (header, cycle) = setup();
    let result = compute_ampphase(&header, &cycle, 3, Pol::XX, &mut vec![]);
    assert!(matches!(
        result,
        Err(AmpPhaseError::UnknownIF {
            window: 3,
            num_windows: 2
        })
    ));

    let mut header = (*header).clone();
    header.windows[0].stokes.truncate(2);
    header.windows[0].num_stokes = 2;
    let result = compute_ampphase(&Arc::new(header), &cycle, 1, Pol::YX, &mut vec![]);
    assert!(matches!(
        result,
        Err(AmpPhaseError::UnknownPolarization {
            window: 1,
            pol: Pol::YX
        })
    ));
}
