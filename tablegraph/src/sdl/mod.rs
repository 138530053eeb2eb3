// SPDX-License-Identifier: AGPL-3.0-or-later

//! Analysis of tenant schema documents.
//!
//! A tenant declares its entity types in a plain SDL document. This module parses such a
//! document, removes any author-supplied root `Query` type and extracts the entity types in
//! declaration order, which is all the contract synthesizer needs to derive the query surface.
mod analyze;
mod entity;
pub mod errors;

pub use analyze::{list_entities, strip_root_query};
pub use entity::{EntityField, EntityType, FieldKind, ScalarKind};
