// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from computing amplitudes and phases.

use thiserror::Error;

use crate::data::{DataError, Pol};

#[derive(Error, Debug)]
pub enum AmpPhaseError {
    #[error("Window {window} isn't in the scan header (which has {num_windows} windows)")]
    UnknownIF { window: usize, num_windows: usize },

    #[error("Window {window} doesn't have the {pol} polarisation product")]
    UnknownPolarization { window: usize, pol: Pol },

    #[error(transparent)]
    Data(#[from] DataError),
}
