// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from indexing cycle files.

use thiserror::Error;

use crate::pipeline::PipelineError;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("No cycles were found in any of the {num_files} input file(s)")]
    NoData { num_files: usize },

    #[error(transparent)]
    Read(#[from] PipelineError),
}
