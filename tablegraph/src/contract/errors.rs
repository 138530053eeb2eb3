// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

/// Errors which can occur while deriving a query contract from an entity list.
#[derive(Error, Debug)]
pub enum ContractError {
    /// Two entities collide under case-folding, their derived operation names would clash.
    #[error("entities '{0}' and '{1}' produce colliding query field names")]
    AmbiguousEntityName(String, String),

    /// An entity uses the reserved root query type name.
    #[error("entity name '{0}' is reserved")]
    ReservedEntityName(String),
}
