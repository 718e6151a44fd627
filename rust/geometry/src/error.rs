// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building B-rep geometry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Invalid curve: {0}")]
    InvalidCurve(String),

    #[error("Invalid surface: {0}")]
    InvalidSurface(String),

    #[error("Degenerate placement: {0}")]
    DegenerateFrame(String),

    #[error("{kind} index {index} is out of range")]
    IndexOutOfRange { kind: &'static str, index: usize },
}
