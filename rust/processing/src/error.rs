// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the processing pipeline
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Geometry error: {0}")]
    Geometry(#[from] reveal_lite_geometry::Error),

    #[error("Core value error: {0}")]
    Core(#[from] reveal_lite_core::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
