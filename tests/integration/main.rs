// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

mod dump;
mod live;

use std::{f64::consts::TAU, path::Path, path::PathBuf, process::Output, str::from_utf8};

use assert_cmd::Command;
use num_complex::Complex;
use tempfile::TempDir;

use visdata_server::{
    data::{
        Antenna, CycleData, IfWindow, ScanHeader, SiteRecord, Source, Syscal, SyscalCell,
        TsysState, VisPoint,
    },
    CycleFileWriter,
};

pub(crate) const BASE_MJD: f64 = 60096.0;
pub(crate) const CYCLE_TIME: f64 = 10.0;
pub(crate) const NUM_ANTENNAS: usize = 3;
/// The first window has a full-resolution channel count, so the default tv
/// channels are 513 to 1537.
pub(crate) const WIDE_CHANNELS: usize = 2049;
pub(crate) const NARROW_CHANNELS: usize = 33;
const FLUX_JY: f32 = 3.0;
const AUTO_OFF: f32 = 8.0;
const AUTO_DIODE: f32 = 0.8;

/// Run the binary.
fn visdata_server() -> Command {
    Command::cargo_bin("visdata-server").unwrap()
}

fn get_cmd_output(result: Output) -> (String, String) {
    let stdout = from_utf8(&result.stdout).unwrap_or("<not utf-8>").to_string();
    let stderr = from_utf8(&result.stderr).unwrap_or("<not utf-8>").to_string();
    (stdout, stderr)
}

pub(crate) fn mjd(ut_seconds: f64) -> f64 {
    BASE_MJD + ut_seconds / 86400.0
}

pub(crate) fn online_tsys(antenna: usize, feed: usize) -> f32 {
    30.0 + 3.0 * antenna as f32 + 4.0 * feed as f32
}

fn gain_phase(antenna: usize) -> f64 {
    0.7 - 0.4 * antenna as f64
}

fn antenna_delay_ns(antenna: usize) -> f64 {
    0.05 * antenna as f64
}

fn header(ut_seconds: f64) -> ScanHeader {
    let stokes: Vec<String> = ["XX", "YY", "XY", "YX"].iter().map(|s| s.to_string()).collect();
    let windows = vec![
        IfWindow::new(5500.0, 2048.0, WIDE_CHANNELS, 1, 1, stokes.clone()),
        IfWindow::new(9000.0, 2048.0, NARROW_CHANNELS, 1, 2, stokes),
    ];
    let antennas = (1..=NUM_ANTENNAS)
        .map(|n| Antenna {
            number: n,
            station: format!("N{n}"),
            xyz_m: [0.0, n as f64 * 45.0, 0.0],
        })
        .collect();
    ScanHeader::new(
        "2023-06-01".to_string(),
        ut_seconds,
        "Dwell".to_string(),
        "C".to_string(),
        CYCLE_TIME,
        vec![Source {
            name: "0823-500".to_string(),
            ra_deg: 126.36,
            dec_deg: -50.18,
        }],
        windows,
        antennas,
    )
}

fn frequency_ghz(window: &IfWindow, chan: usize) -> f64 {
    let half = window.num_channels / 2;
    let width = window.bandwidth_mhz / (2 * half) as f64;
    (window.centre_freq_mhz + (chan as f64 - half as f64) * width) / 1000.0
}

/// A point source at the phase centre, seen through per-antenna gains and
/// delays. Everything is scaled by the online system temperatures.
fn cycle(header: &ScanHeader, ut_seconds: f64) -> CycleData {
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
                        let f = frequency_ghz(window, chan);
                        for (slot, (p1, p2)) in [(0, 0), (1, 1), (0, 1), (1, 0)].into_iter().enumerate() {
                            let scale = (online_tsys(a1, p1) * online_tsys(a2, p2)).sqrt();
                            let value = if a1 == a2 {
                                let power = AUTO_OFF + if bin == 2 { AUTO_DIODE } else { 0.0 };
                                let power = if p1 == p2 { power } else { 0.2 * power };
                                Complex::new(power, 0.0)
                            } else {
                                let phase = gain_phase(a1) - gain_phase(a2)
                                    - TAU * f * (antenna_delay_ns(a1) - antenna_delay_ns(a2));
                                Complex::from_polar(FLUX_JY, phase as f32)
                            };
                            vis[slot + chan * ns] = value * scale;
                        }
                    }
                    points.push(VisPoint {
                        u_m: 0.0,
                        v_m: (a2 - a1) as f32 * 45.0,
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
            cell.caljy = [1.5, 1.5];
            cell.gtp = [AUTO_OFF, AUTO_OFF];
            cell.sdo = [AUTO_DIODE, AUTO_DIODE];
            syscal.insert(cell);
        }
    }
    syscal.site = Some(SiteRecord {
        temperature_c: 12.0,
        pressure_mbar: 960.0,
        humidity_percent: 65.0,
        wind_speed_kmh: 5.0,
        wind_direction_deg: 90.0,
        rain_gauge_mm: 0.2,
        weather_valid: true,
        seemon_phase_deg: 10.0,
        seemon_rms_um: 80.0,
        seemon_valid: false,
    });
    CycleData::new(ut_seconds, points, syscal)
}

/// Write a file with a scan starting at each of `scan_starts`.
fn write_file(path: &Path, scan_starts: &[f64], num_cycles: usize) {
    let mut writer = CycleFileWriter::create(path).unwrap();
    for &start in scan_starts {
        let header = header(start);
        writer.write_header(&header).unwrap();
        for i in 0..num_cycles {
            let ut = start + i as f64 * CYCLE_TIME;
            let cycle = cycle(&header, ut);
            for point in &cycle.points {
                let window = header.window(point.window).unwrap();
                writer.write_point(ut, point, window).unwrap();
            }
            for cell in cycle.syscal.cells() {
                writer.write_syscal(cell).unwrap();
            }
            if let Some(site) = &cycle.syscal.site {
                writer.write_site(site).unwrap();
            }
            writer.end_cycle(ut).unwrap();
        }
    }
    writer.finish().unwrap();
}

/// Two files holding three scans; the second file starts an hour after the
/// first.
pub(crate) fn observation(tmp: &TempDir) -> Vec<PathBuf> {
    let a = tmp.path().join("2023-06-01_0016.cyc");
    let b = tmp.path().join("2023-06-01_0117.cyc");
    write_file(&a, &[1000.0, 1060.0], 3);
    write_file(&b, &[4600.0], 4);
    vec![a, b]
}
