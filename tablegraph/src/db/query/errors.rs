// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

/// Validation errors for queries against a compiled contract.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Request references an entity which is not part of the compiled contract.
    #[error("unknown entity '{0}'")]
    UnknownEntity(String),

    /// Request references a field which is not declared on the entity.
    #[error("unknown field '{field}' on entity '{entity}'")]
    UnknownField { entity: String, field: String },

    /// Request argument is out of range or of the wrong shape.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
