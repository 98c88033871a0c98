// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! In-memory representation of scans and cycles.
//!
//! A [ScanHeader] describes the instrument configuration of a scan. It is
//! shared (via `Arc`) between the index and everything derived from its
//! cycles. A [CycleData] holds one integration's visibilities, weights and
//! system-calibration (SYSCAL) information.

mod cycle;
mod error;
mod scan;
mod syscal;
#[cfg(test)]
mod tests;

pub use cycle::{baseline_code, split_baseline_code, CycleData, VisPoint};
pub use error::DataError;
pub use scan::{Antenna, IfWindow, ScanHeader, Source, WindowKind};
pub use syscal::{
    SiteRecord, Syscal, SyscalAntenna, SyscalCell, SyscalPol, SyscalSlice, TsysState,
    FLAG_NOT_ON_SOURCE, FLAG_X_BAD, FLAG_Y_BAD,
};

use strum_macros::{Display, EnumIter, EnumString};

/// One of the two orthogonal linear feeds on an antenna.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Feed {
    X,
    Y,
}

impl Feed {
    /// The column of this feed in per-pol arrays.
    pub fn index(self) -> usize {
        match self {
            Feed::X => 0,
            Feed::Y => 1,
        }
    }
}

/// A correlation product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
pub enum Pol {
    #[strum(serialize = "XX")]
    XX,
    #[strum(serialize = "YY")]
    YY,
    #[strum(serialize = "XY")]
    XY,
    #[strum(serialize = "YX")]
    YX,
}

impl Pol {
    /// The physical feeds of the first and second antenna.
    pub fn feeds(self) -> (Feed, Feed) {
        match self {
            Pol::XX => (Feed::X, Feed::X),
            Pol::YY => (Feed::Y, Feed::Y),
            Pol::XY => (Feed::X, Feed::Y),
            Pol::YX => (Feed::Y, Feed::X),
        }
    }

    /// The code used for this product on the wire.
    pub fn code(self) -> i32 {
        match self {
            Pol::XX => 1,
            Pol::YY => 2,
            Pol::XY => 3,
            Pol::YX => 4,
        }
    }

    pub fn from_code(code: i32) -> Option<Pol> {
        match code {
            1 => Some(Pol::XX),
            2 => Some(Pol::YY),
            3 => Some(Pol::XY),
            4 => Some(Pol::YX),
            _ => None,
        }
    }

    /// The single feed of a parallel-hand product.
    pub fn parallel_feed(self) -> Option<Feed> {
        match self {
            Pol::XX => Some(Feed::X),
            Pol::YY => Some(Feed::Y),
            Pol::XY | Pol::YX => None,
        }
    }
}
