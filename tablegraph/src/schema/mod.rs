// SPDX-License-Identifier: AGPL-3.0-or-later

//! Compiled query contracts and their process-scoped registry.
pub mod errors;
mod provider;

pub use provider::{Contract, ContractProvider};
