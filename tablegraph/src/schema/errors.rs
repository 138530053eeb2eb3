// SPDX-License-Identifier: AGPL-3.0-or-later

use thiserror::Error;

use crate::contract::errors::ContractError;
use crate::sdl::errors::SdlError;

/// Errors which can occur while providing a compiled contract for a (tenant, chain) pair.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// No schema document exists for this tenant.
    #[error("unknown tenant '{0}'")]
    UnknownTenant(String),

    /// Schema document failed to parse, fatal for this tenant and chain.
    #[error(transparent)]
    Sdl(#[from] SdlError),

    /// Entity list could not be turned into an unambiguous contract.
    #[error(transparent)]
    Contract(#[from] ContractError),

    /// Derived schema could not be registered with the GraphQL engine.
    #[error("could not build executable schema: {0}")]
    Schema(String),
}
