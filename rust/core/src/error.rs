// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use thiserror::Error;

/// Result type for core value operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised when constructing core value types from external data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Vertex/normal length mismatch: {positions} position floats, {normals} normal floats")]
    VertexNormalMismatch { positions: usize, normals: usize },

    #[error("Vertex buffer length {0} is not a multiple of 3")]
    RaggedVertexBuffer(usize),

    #[error("Index buffer length {0} is not a multiple of 3")]
    RaggedIndexBuffer(usize),

    #[error("Triangle index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("Merged mesh would have {vertex_count} vertices, more than 32-bit indices can address")]
    IndexOverflow { vertex_count: usize },
}
