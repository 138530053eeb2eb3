// SPDX-License-Identifier: AGPL-3.0-or-later

use std::ops::Deref;
use std::sync::Arc;

use crate::cache::ResultCache;
use crate::config::Configuration;
use crate::db::SqlStore;
use crate::schema::ContractProvider;

/// Inner data shared across all services.
#[derive(Debug)]
pub struct Data {
    /// Node configuration.
    pub config: Configuration,

    /// Storage executor with database connection pool.
    pub store: SqlStore,

    /// Compiler and loader for tenant contracts.
    pub provider: ContractProvider,

    /// Read-through result cache.
    pub cache: ResultCache,
}

impl Data {
    pub fn new(
        store: SqlStore,
        config: Configuration,
        provider: ContractProvider,
        cache: ResultCache,
    ) -> Self {
        Self {
            config,
            store,
            provider,
            cache,
        }
    }
}

/// Data shared across all services.
#[derive(Debug, Clone)]
pub struct Context(pub Arc<Data>);

impl Context {
    /// Returns a new instance of `Context`.
    pub fn new(
        store: SqlStore,
        config: Configuration,
        provider: ContractProvider,
        cache: ResultCache,
    ) -> Self {
        Self(Arc::new(Data::new(store, config, provider, cache)))
    }
}

impl Deref for Context {
    type Target = Data;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}
