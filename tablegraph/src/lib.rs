// SPDX-License-Identifier: AGPL-3.0-or-later

//! # tablegraph
//!
//! Node exposing per-tenant, per-chain relational tables as a derived GraphQL API.
//!
//! Tenants declare their entity types in a plain SDL document. From that document the node
//! derives a complete query surface (collection, single-item, count and field lookups plus
//! relation traversal), compiles incoming requests into parameterized SQL against
//! `"<tenant>"."<entity>_<chain>"` tables and caches results with a fixed time-to-live.
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]

mod bus;
mod cache;
mod config;
mod context;
mod contract;
mod db;
mod graphql;
mod http;
mod listener;
mod logs;
mod manager;
mod node;
mod schema;
mod sdl;

pub use crate::config::Configuration;
pub use node::Node;
