// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The bundles handed to clients.

use std::sync::Arc;

use crate::{
    ampphase::AmpPhase,
    averaging::VisQuantities,
    data::{Pol, ScanHeader, SiteRecord, SyscalCell},
    options::AmpPhaseOptions,
};

/// Spectra of every window and polarisation product of a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumBundle {
    pub header: Arc<ScanHeader>,
    pub ut_seconds: f64,
    pub mjd: f64,
    /// Indexed by window (in header order), then polarisation product (in
    /// the window's Stokes order).
    pub ampphase: Vec<Vec<AmpPhase>>,
    pub options: Vec<AmpPhaseOptions>,
}

impl SpectrumBundle {
    pub fn num_windows(&self) -> usize {
        self.ampphase.len()
    }

    /// Get the spectra of a window (by label) and polarisation product.
    pub fn get(&self, window: usize, pol: Pol) -> Option<&AmpPhase> {
        self.ampphase
            .iter()
            .flatten()
            .find(|ap| ap.window == window && ap.pol == pol)
    }

    pub fn first(&self) -> Option<&AmpPhase> {
        self.ampphase.first().and_then(|w| w.first())
    }
}

/// Averaged quantities of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct VisCycle {
    pub header: Arc<ScanHeader>,
    pub ut_seconds: f64,
    pub mjd: f64,
    /// Indexed like [SpectrumBundle::ampphase].
    pub quantities: Vec<Vec<VisQuantities>>,
    /// Weather information.
    pub site: Option<SiteRecord>,
    pub syscal: Vec<SyscalCell>,
}

impl VisCycle {
    pub fn get(&self, window: usize, pol: Pol) -> Option<&VisQuantities> {
        self.quantities
            .iter()
            .flatten()
            .find(|vq| vq.window == window && vq.pol == pol)
    }
}

/// Averaged quantities of many cycles, ordered by time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VisBundle {
    pub cycles: Vec<VisCycle>,
    pub mjd_low: f64,
    pub mjd_high: f64,
    pub options: Vec<AmpPhaseOptions>,
}

impl VisBundle {
    pub fn num_cycles(&self) -> usize {
        self.cycles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cycles.is_empty()
    }
}
