// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for STEP reading
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while reading an exchange file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error at byte {position}: {message}")]
    Parse { position: usize, message: String },

    #[error("Invalid exchange file header: {0}")]
    Header(String),

    #[error("Unsupported schema: {0}")]
    UnsupportedSchema(String),

    #[error("Entity #{0} not found")]
    EntityNotFound(u32),

    #[error("Entity #{id} is malformed: {message}")]
    Malformed { id: u32, message: String },

    #[error("DATA section contains no instances")]
    Empty,
}

impl Error {
    pub fn parse(position: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            position,
            message: message.into(),
        }
    }
}
