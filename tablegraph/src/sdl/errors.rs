// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

/// Errors which can occur while analysing a tenant schema document.
#[derive(Error, Debug)]
pub enum SdlError {
    /// Document does not parse as a valid type-definition document.
    #[error("malformed schema document: {0}")]
    Malformed(String),

    /// Schema source for this tenant could not be read.
    #[error("could not read schema source: {0}")]
    Source(#[from] std::io::Error),
}
