// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! System-calibration (SYSCAL) information attached to a cycle.

use indexmap::IndexMap;

use super::Feed;

/// The antenna is not on source.
pub const FLAG_NOT_ON_SOURCE: u32 = 1 << 0;
/// The X feed of the antenna is bad.
pub const FLAG_X_BAD: u32 = 1 << 1;
/// The Y feed of the antenna is bad.
pub const FLAG_Y_BAD: u32 = 1 << 2;

/// Which system-temperature table is currently applied to the visibilities.
/// Only one may be applied at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TsysState {
    #[default]
    None,
    Online,
    Computed,
}

impl TsysState {
    pub fn online_applied(self) -> bool {
        self == TsysState::Online
    }

    pub fn computed_applied(self) -> bool {
        self == TsysState::Computed
    }

    /// Rebuild the state from a pair of applied flags. Both being set is
    /// invalid.
    pub fn from_flags(online_applied: bool, computed_applied: bool) -> Option<TsysState> {
        match (online_applied, computed_applied) {
            (false, false) => Some(TsysState::None),
            (true, false) => Some(TsysState::Online),
            (false, true) => Some(TsysState::Computed),
            (true, true) => None,
        }
    }
}

/// SYSCAL values for one (window, antenna). Per-pol arrays are indexed by
/// [Feed::index].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SyscalCell {
    pub window: usize,
    pub antenna: usize,
    /// The system temperatures measured by the correlator \[K\].
    pub tsys: [f32; 2],
    /// The system temperatures computed from the noise-diode bins \[K\].
    pub computed_tsys: [f32; 2],
    pub applied: TsysState,
    pub xyphase_deg: f32,
    pub xyamp_jy: f32,
    pub parangle_deg: f32,
    pub tracking_error_max_arcsec: f32,
    pub tracking_error_rms_arcsec: f32,
    pub flagging: u32,
    pub gtp: [f32; 2],
    pub sdo: [f32; 2],
    pub caljy: [f32; 2],
    pub computed_gtp: [f32; 2],
    pub computed_sdo: [f32; 2],
}

impl SyscalCell {
    pub fn new(window: usize, antenna: usize) -> SyscalCell {
        SyscalCell {
            window,
            antenna,
            ..Default::default()
        }
    }

    /// The Tsys value currently applied for a feed, if any.
    pub fn applied_tsys(&self, feed: Feed) -> Option<f32> {
        match self.applied {
            TsysState::None => None,
            TsysState::Online => Some(self.tsys[feed.index()]),
            TsysState::Computed => Some(self.computed_tsys[feed.index()]),
        }
    }
}

/// Weather and seeing-monitor values for the site.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SiteRecord {
    /// \[C\]
    pub temperature_c: f32,
    /// \[mbar\]
    pub pressure_mbar: f32,
    /// \[%\]
    pub humidity_percent: f32,
    /// \[km/h\]
    pub wind_speed_kmh: f32,
    /// \[degrees\]
    pub wind_direction_deg: f32,
    /// \[mm\]
    pub rain_gauge_mm: f32,
    pub weather_valid: bool,
    /// \[degrees\]
    pub seemon_phase_deg: f32,
    /// \[microns\]
    pub seemon_rms_um: f32,
    pub seemon_valid: bool,
}

/// The SYSCAL block of a cycle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Syscal {
    cells: IndexMap<(usize, usize), SyscalCell>,
    pub site: Option<SiteRecord>,
}

impl Syscal {
    /// Insert a cell, replacing any existing cell for the same (window,
    /// antenna).
    pub fn insert(&mut self, cell: SyscalCell) {
        self.cells.insert((cell.window, cell.antenna), cell);
    }

    pub fn cell(&self, window: usize, antenna: usize) -> Option<&SyscalCell> {
        self.cells.get(&(window, antenna))
    }

    pub fn cell_mut(&mut self, window: usize, antenna: usize) -> Option<&mut SyscalCell> {
        self.cells.get_mut(&(window, antenna))
    }

    pub fn cells(&self) -> impl Iterator<Item = &SyscalCell> {
        self.cells.values()
    }

    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut SyscalCell> {
        self.cells.values_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The applied state of the block. Cells are always transformed together,
    /// so the first cell speaks for all of them.
    pub fn tsys_state(&self) -> TsysState {
        self.cells
            .values()
            .next()
            .map(|c| c.applied)
            .unwrap_or_default()
    }

    /// Extract the values for one window. When a parallel-hand feed is
    /// supplied, its per-pol values are included.
    pub fn slice(&self, window: usize, feed: Option<Feed>) -> SyscalSlice {
        let antennas = self
            .cells
            .values()
            .filter(|c| c.window == window)
            .map(|c| SyscalAntenna {
                antenna: c.antenna,
                xyphase_deg: c.xyphase_deg,
                xyamp_jy: c.xyamp_jy,
                parangle_deg: c.parangle_deg,
                tracking_error_max_arcsec: c.tracking_error_max_arcsec,
                tracking_error_rms_arcsec: c.tracking_error_rms_arcsec,
                flagging: c.flagging,
                pol: feed.map(|f| {
                    let i = f.index();
                    SyscalPol {
                        tsys: c.tsys[i],
                        computed_tsys: c.computed_tsys[i],
                        applied: c.applied,
                        gtp: c.gtp[i],
                        sdo: c.sdo[i],
                        caljy: c.caljy[i],
                        computed_gtp: c.computed_gtp[i],
                        computed_sdo: c.computed_sdo[i],
                    }
                }),
            })
            .collect();
        SyscalSlice {
            window,
            feed,
            antennas,
        }
    }
}

/// The per-pol part of a [SyscalAntenna].
#[derive(Debug, Clone, PartialEq)]
pub struct SyscalPol {
    pub tsys: f32,
    pub computed_tsys: f32,
    pub applied: TsysState,
    pub gtp: f32,
    pub sdo: f32,
    pub caljy: f32,
    pub computed_gtp: f32,
    pub computed_sdo: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SyscalAntenna {
    pub antenna: usize,
    pub xyphase_deg: f32,
    pub xyamp_jy: f32,
    pub parangle_deg: f32,
    pub tracking_error_max_arcsec: f32,
    pub tracking_error_rms_arcsec: f32,
    pub flagging: u32,
    pub pol: Option<SyscalPol>,
}

/// The SYSCAL values relevant to one (window, pol).
#[derive(Debug, Clone, PartialEq)]
pub struct SyscalSlice {
    pub window: usize,
    pub feed: Option<Feed>,
    pub antennas: Vec<SyscalAntenna>,
}
