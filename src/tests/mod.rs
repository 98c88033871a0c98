// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Synthetic cycle data for tests.
//!
//! The sky is a single point source at the phase centre. Each antenna has a
//! gain phase and a delay, so cross-correlation phases vary between baselines
//! but closure phases are zero. Autocorrelations carry noise-diode OFF (bin
//! 1) and ON (bin 2) samples.

use std::path::Path;

use num_complex::Complex;

use crate::{
    constants::TAU,
    data::{
        Antenna, CycleData, IfWindow, ScanHeader, SiteRecord, Source, Syscal, SyscalCell,
        TsysState, VisPoint,
    },
    io::write::CycleFileWriter,
};

pub(crate) const OBSDATE: &str = "2023-06-01";
/// The MJD of midnight on [OBSDATE].
pub(crate) const BASE_MJD: f64 = 60096.0;
pub(crate) const CYCLE_TIME: f64 = 10.0;
pub(crate) const NUM_CHANNELS: usize = 33;
pub(crate) const NUM_ANTENNAS: usize = 4;
pub(crate) const FLUX_JY: f32 = 5.0;
/// Total power in the noise-diode OFF bin.
pub(crate) const AUTO_OFF: f32 = 10.0;
/// Noise-diode power added in the ON bin.
pub(crate) const AUTO_DIODE: f32 = 1.0;
pub(crate) const CALJY: f32 = 2.0;

/// The online system temperature of an antenna's feed.
pub(crate) fn online_tsys(antenna: usize, feed: usize) -> f32 {
    20.0 + 2.0 * antenna as f32 + 5.0 * feed as f32
}

/// The gain phase of an antenna \[radians\].
pub(crate) fn gain_phase(antenna: usize) -> f64 {
    0.3 * antenna as f64 - 0.5
}

/// The instrumental delay of an antenna \[ns\].
pub(crate) fn antenna_delay_ns(antenna: usize) -> f64 {
    0.1 * antenna as f64
}

pub(crate) fn stokes() -> Vec<String> {
    ["XX", "YY", "XY", "YX"].iter().map(|s| s.to_string()).collect()
}

/// A scan header with two continuum windows.
pub(crate) fn synthetic_header(ut_seconds: f64) -> ScanHeader {
    let windows = vec![
        IfWindow::new(5500.0, 2048.0, NUM_CHANNELS, 1, 1, stokes()),
        IfWindow::new(9000.0, 2048.0, NUM_CHANNELS, -1, 2, stokes()),
    ];
    let antennas = (1..=NUM_ANTENNAS)
        .map(|n| Antenna {
            number: n,
            station: format!("W{}", 100 + n),
            xyz_m: [n as f64 * 30.0, 0.0, 0.0],
        })
        .collect();
    ScanHeader::new(
        OBSDATE.to_string(),
        ut_seconds,
        "Point".to_string(),
        "C".to_string(),
        CYCLE_TIME,
        vec![Source {
            name: "1934-638".to_string(),
            ra_deg: 294.85,
            dec_deg: -63.71,
        }],
        windows,
        antennas,
    )
}

fn channel_freq_ghz(window: &IfWindow, chan: usize) -> f64 {
    let half = window.num_channels / 2;
    let width = window.sideband as f64 * window.bandwidth_mhz / (2 * half) as f64;
    (window.centre_freq_mhz - half as f64 * width + chan as f64 * width) / 1000.0
}

/// The points and SYSCAL of one cycle. Cross-correlations are scaled by the
/// online system temperatures, which are marked as applied.
pub(crate) fn synthetic_cycle(header: &ScanHeader, ut_seconds: f64) -> CycleData {
    let mut points = vec![];
    let mut syscal = Syscal::default();

    for window in &header.windows {
        let ns = window.num_stokes;
        for a1 in 1..=NUM_ANTENNAS {
            for a2 in a1..=NUM_ANTENNAS {
                let bins: &[usize] = if a1 == a2 { &[1, 2] } else { &[1] };
                for &bin in bins {
                    let mut vis = vec![Complex::new(0.0, 0.0); window.num_values()];
                    for chan in 0..window.num_channels {
                        let f = channel_freq_ghz(window, chan);
                        for (slot, (p1, p2)) in [(0, 0), (1, 1), (0, 1), (1, 0)].into_iter().enumerate() {
                            let scale = (online_tsys(a1, p1) * online_tsys(a2, p2)).sqrt();
                            let value = if a1 == a2 {
                                let power = AUTO_OFF + if bin == 2 { AUTO_DIODE } else { 0.0 };
                                if p1 == p2 {
                                    Complex::new(power, 0.0)
                                } else {
                                    Complex::new(0.1 * power, 0.0)
                                }
                            } else {
                                let phase = gain_phase(a1) - gain_phase(a2)
                                    - TAU * f * (antenna_delay_ns(a1) - antenna_delay_ns(a2));
                                let amp = if p1 == p2 { FLUX_JY } else { 0.05 * FLUX_JY };
                                Complex::from_polar(amp, phase as f32)
                            };
                            vis[slot + chan * ns] = value * scale;
                        }
                    }
                    points.push(VisPoint {
                        u_m: (a2 - a1) as f32 * 30.0,
                        v_m: 0.0,
                        w_m: 0.0,
                        ant1: a1,
                        ant2: a2,
                        flag: 0,
                        bin,
                        window: window.label,
                        source: 1,
                        vis,
                        weight: vec![1.0; window.num_values()],
                    });
                }
            }
        }

        for ant in 1..=NUM_ANTENNAS {
            let mut cell = SyscalCell::new(window.label, ant);
            cell.tsys = [online_tsys(ant, 0), online_tsys(ant, 1)];
            cell.applied = TsysState::Online;
            cell.caljy = [CALJY, CALJY];
            cell.gtp = [AUTO_OFF, AUTO_OFF];
            cell.sdo = [AUTO_DIODE, AUTO_DIODE];
            cell.parangle_deg = 12.5;
            syscal.insert(cell);
        }
    }
    syscal.site = Some(SiteRecord {
        temperature_c: 18.5,
        pressure_mbar: 970.0,
        humidity_percent: 40.0,
        wind_speed_kmh: 12.0,
        wind_direction_deg: 270.0,
        rain_gauge_mm: 0.0,
        weather_valid: true,
        seemon_phase_deg: 45.0,
        seemon_rms_um: 150.0,
        seemon_valid: true,
    });

    CycleData::new(ut_seconds, points, syscal)
}

/// Write a scan of `num_cycles` cycles starting at `ut_start`.
pub(crate) fn write_scan<W: std::io::Write>(
    writer: &mut CycleFileWriter<W>,
    ut_start: f64,
    num_cycles: usize,
) {
    let header = synthetic_header(ut_start);
    writer.write_header(&header).unwrap();
    for i in 0..num_cycles {
        let ut = ut_start + i as f64 * CYCLE_TIME;
        write_cycle(writer, &header, &synthetic_cycle(&header, ut));
    }
}

pub(crate) fn write_cycle<W: std::io::Write>(
    writer: &mut CycleFileWriter<W>,
    header: &ScanHeader,
    cycle: &CycleData,
) {
    for point in &cycle.points {
        let window = header.window(point.window).unwrap();
        writer.write_point(cycle.ut_seconds, point, window).unwrap();
    }
    for cell in cycle.syscal.cells() {
        writer.write_syscal(cell).unwrap();
    }
    if let Some(site) = &cycle.syscal.site {
        writer.write_site(site).unwrap();
    }
    writer.end_cycle(cycle.ut_seconds).unwrap();
}

/// Write a file holding scans starting at each of `scan_starts`, each with
/// `num_cycles` cycles.
pub(crate) fn write_synthetic_file(path: &Path, scan_starts: &[f64], num_cycles: usize) {
    let mut writer = CycleFileWriter::create(path).unwrap();
    for &start in scan_starts {
        write_scan(&mut writer, start, num_cycles);
    }
    writer.finish().unwrap();
}
