// SPDX-License-Identifier: AGPL-3.0-or-later

//! Derivation of the query contract from a list of entity types.
//!
//! The contract is the complete query surface a tenant gets for free: four root operations per
//! entity plus one filter input type per entity. All synthesized names are pure functions of the
//! entity names, so re-running the synthesis on the same input yields byte-identical output.
pub mod errors;
mod names;
mod synthesize;

pub use names::{check_entity_names, EntityNames, WHERE_INPUT_SUFFIX};
pub use synthesize::{derive_filter_inputs, derive_query_type};
