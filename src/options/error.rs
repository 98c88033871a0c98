// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum OptionsError {
    #[error("Window {window} is not configured; these options have {num_windows} windows")]
    UnknownWindow { window: usize, num_windows: usize },

    #[error("Window slot 0 is reserved and cannot hold per-window settings")]
    ReservedWindow,

    #[error("Averaging method bits {0} must select exactly one of MEAN/MEDIAN and one of VECTOR/SCALAR")]
    BadAveragingBits(i32),

    #[error("Modifier index {index} is out of range; window {window} has {len} modifiers")]
    ModifierIndex {
        window: usize,
        index: usize,
        len: usize,
    },
}
