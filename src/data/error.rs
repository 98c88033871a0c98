// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Couldn't parse observation date '{0}'; expected YYYY-MM-DD")]
    BadObsDate(String),

    #[error("Observation date '{date}' has an out-of-range {field}")]
    ObsDateOutOfRange { date: String, field: &'static str },
}
