// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Whole sessions between a client and an in-process server.

use approx::{assert_abs_diff_eq, assert_relative_eq};
use tempfile::TempDir;

use super::*;
use visdata_server::{
    client::{ServerConnection, SpectrumStatus},
    data::{baseline_code, Pol},
    index::DataIndex,
    options::{AverageKind, AveragingMethod, Statistic, TvChannels},
    server::{Preloaded, Server, ServerConfig, ServerHandle},
    wire::{ResponseType, ServerType},
    AmpPhaseOptions,
};

struct Session {
    _tmp: TempDir,
    paths: Vec<PathBuf>,
    handle: ServerHandle,
}

impl Session {
    fn start() -> Session {
        let tmp = TempDir::new().unwrap();
        let paths = observation(&tmp);
        let preloaded = Preloaded::load(paths.clone()).unwrap();
        let config = ServerConfig {
            port: 0,
            networked: false,
            server_type: ServerType::Simulator,
        };
        let handle = Server::bind(preloaded, &config).unwrap().spawn().unwrap();
        Session {
            _tmp: tmp,
            paths,
            handle,
        }
    }

    fn connect(&self) -> ServerConnection {
        let mut conn = ServerConnection::connect(self.handle.addr()).unwrap();
        assert_eq!(conn.identify().unwrap(), ServerType::Simulator);
        conn
    }
}

#[test]
fn test_time_range_spans_all_files() {
    let session = Session::start();
    let mut conn = session.connect();

    let range = conn.time_range().unwrap();
    assert_abs_diff_eq!(range.cycle_time_days, CYCLE_TIME / 86400.0, epsilon = 1e-12);
    assert_abs_diff_eq!(range.earliest_mjd, mjd(995.0), epsilon = 1e-9);
    assert_abs_diff_eq!(range.latest_mjd, mjd(4635.0), epsilon = 1e-9);

    let cycles = conn.cycle_times().unwrap();
    assert_eq!(cycles.len(), 10);
    assert!(cycles.windows(2).all(|w| w[0] < w[1]));
    assert_abs_diff_eq!(cycles[0], mjd(1000.0), epsilon = 1e-9);
    assert_abs_diff_eq!(cycles[9], mjd(4630.0), epsilon = 1e-9);

    let index = DataIndex::build(&session.paths).unwrap();
    assert_eq!(index.num_scans(), 3);
    assert_eq!(cycles, index.cycle_mjds());
}

#[test]
fn test_preloaded_products() {
    let session = Session::start();
    let mut conn = session.connect();

    let (spectrum, options) = conn.current_spectrum().unwrap();
    assert!([1010.0, 1070.0, 4610.0].contains(&spectrum.ut_seconds));
    assert_eq!(spectrum.num_windows(), 2);
    assert!(spectrum.ampphase.iter().all(|w| w.len() == 4));
    let first = spectrum.first().unwrap();
    assert_eq!(first.window, 1);
    assert_eq!(first.pol, Pol::XX);
    assert_eq!(first.obsdate(), "2023-06-01");

    // One options set for the single IF configuration, with default tv
    // channels for each window.
    assert_eq!(options.len(), 1);
    let wide = options[0].window(1).unwrap();
    assert_eq!(wide.num_channels, WIDE_CHANNELS);
    assert_eq!(wide.tvchannels, Some(TvChannels::new(513, 1537)));
    assert_eq!(
        options[0].window(2).unwrap().tvchannels,
        Some(TvChannels::new(9, 17))
    );

    let (vis, _) = conn.current_vis().unwrap();
    assert_eq!(vis.num_cycles(), 10);
    assert!(vis.cycles.iter().all(|c| c.quantities.len() == 2));
}

#[test]
fn test_option_change_recomputes() {
    let session = Session::start();
    let mut conn = session.connect();
    let (default_vis, mut options) = conn.current_vis().unwrap();

    {
        let window = options[0].window_mut(1).unwrap();
        window.tvchannels = Some(TvChannels::new(600, 1500));
        window.delay_averaging = 4;
        window.averaging = Some(AveragingMethod::new(Statistic::Mean, AverageKind::Vector));
    }
    conn.compute_vis(Some(options.clone())).unwrap();
    conn.wait_for(ResponseType::VisdataComputed).unwrap();

    let (vis, returned) = conn.computed_vis().unwrap();
    assert_eq!(returned[0], options[0]);
    assert_eq!(vis.options[0], options[0]);
    assert_eq!(vis.num_cycles(), default_vis.num_cycles());
    let window = vis.options[0].window(1).unwrap();
    assert_eq!(window.tvchannels, Some(TvChannels::new(600, 1500)));
    assert_eq!(window.delay_averaging, 4);
    assert_eq!(
        window.averaging.unwrap().bits(),
        AveragingMethod::MEAN | AveragingMethod::VECTOR
    );
    for cycle in &vis.cycles {
        let vq = cycle.get(1, Pol::XX).unwrap();
        assert_eq!(vq.options.window(1).unwrap().delay_averaging, 4);
    }

    // The computation is cached, so a second client asking for the same
    // options is answered without a new read.
    let mut other = session.connect();
    other.compute_vis(Some(options.clone())).unwrap();
    other.wait_for(ResponseType::VisdataComputed).unwrap();
    let (again, _) = other.computed_vis().unwrap();
    assert_eq!(again.options, vis.options);
    assert_eq!(again.num_cycles(), vis.num_cycles());
    let code = baseline_code(1, 2);
    let amplitude = |b: &visdata_server::VisBundle| {
        b.cycles[0].get(1, Pol::XX).unwrap().baseline(code).unwrap().bins[0].amplitude
    };
    assert_abs_diff_eq!(amplitude(&again), amplitude(&vis));
}

#[test]
fn test_grabbing_spectra() {
    let session = Session::start();
    let mut conn = session.connect();

    let status = conn.request_spectrum(BASE_MJD + 2.0, vec![]).unwrap();
    assert_eq!(status, SpectrumStatus::OutsideRange);

    // Two seconds after the last cycle of the first file.
    let status = conn.request_spectrum(mjd(1082.0), vec![]).unwrap();
    assert_eq!(status, SpectrumStatus::Loading);
    conn.wait_for(ResponseType::SpectrumLoaded).unwrap();
    let (spectrum, _) = conn.loaded_spectrum().unwrap();
    assert_abs_diff_eq!(spectrum.ut_seconds, 1080.0);
    assert_abs_diff_eq!(spectrum.mjd, mjd(1080.0), epsilon = 1e-9);
}

#[test]
fn test_tsys_reversal() {
    let session = Session::start();
    let mut conn = session.connect();
    let ant = 3;
    let code = baseline_code(ant, ant);
    let amplitude = |vis: &visdata_server::VisBundle| {
        vis.cycles[0].get(1, Pol::XY).unwrap().baseline(code).unwrap().bins[0].amplitude
    };

    let (default_vis, options) = conn.current_vis().unwrap();
    let online = amplitude(&default_vis);

    let reversed_options: Vec<AmpPhaseOptions> = options
        .into_iter()
        .map(|o| AmpPhaseOptions {
            systemp_reverse_online: true,
            systemp_apply_computed: false,
            ..o
        })
        .collect();
    conn.compute_vis(Some(reversed_options)).unwrap();
    conn.wait_for(ResponseType::VisdataComputed).unwrap();
    let (vis, _) = conn.computed_vis().unwrap();
    let reversed = amplitude(&vis);

    assert_relative_eq!(
        online / reversed,
        (online_tsys(ant, 0) * online_tsys(ant, 1)).sqrt(),
        max_relative = 1e-3
    );
}

#[test]
fn test_closure_phases_of_a_point_source() {
    let session = Session::start();
    let mut conn = session.connect();
    let (vis, options) = conn.current_vis().unwrap();
    assert!(options[0].phase_in_degrees);

    for cycle in &vis.cycles {
        for vq in cycle.quantities.iter().flatten() {
            if vq.pol.parallel_feed().is_none() {
                continue;
            }
            // One triangle through the reference antenna.
            assert_eq!(vq.closures.len(), 1);
            let closure = &vq.closures[0];
            assert_eq!(closure.antennas, [1, 2, 3]);
            assert!(closure.phase.iter().all(|p| p.abs() < 5.0), "{closure:?}");
        }
    }
}

#[test]
fn test_departed_clients_leave_defaults_alone() {
    let session = Session::start();
    let mut conn = session.connect();
    let (_, mut options) = conn.current_vis().unwrap();
    options[0].phase_in_degrees = false;
    conn.compute_vis(Some(options)).unwrap();
    conn.close();

    let mut other = session.connect();
    let (vis, options) = other.current_vis().unwrap();
    assert!(options[0].phase_in_degrees);
    assert!(vis.options[0].phase_in_degrees);
    session.handle.shutdown();
}
