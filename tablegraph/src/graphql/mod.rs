// SPDX-License-Identifier: AGPL-3.0-or-later

//! Executable GraphQL schemas synthesized from compiled contracts.
//!
//! For every (tenant, chain) pair one dynamic schema is built at runtime: root query fields,
//! entity objects and filter inputs all derive from the tenant's entity types, no resolver is
//! ever written by hand. The schema manager memoizes built schemas and executes incoming
//! requests against them.
pub mod constants;
mod resolvers;
mod schema;
#[cfg(test)]
mod tests;
mod utils;

pub use schema::{build_contract_schema, GraphQLSchemaManager, GraphQLSharedData};
