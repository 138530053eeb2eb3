// SPDX-License-Identifier: AGPL-3.0-or-later

use anyhow::Result;

use crate::bus::ServiceMessage;
use crate::cache::ResultCache;
use crate::config::Configuration;
use crate::context::Context;
use crate::db::{connection_pool, Pool, SqlStore};
use crate::http::http_service;
use crate::listener::listener_service;
use crate::manager::ServiceManager;
use crate::schema::ContractProvider;

/// Capacity of the internal broadcast channel used to communicate between services.
const SERVICE_BUS_CAPACITY: usize = 1024;

/// Returns the database connection pool for the configured database.
async fn initialize_db(config: &Configuration) -> Result<Pool> {
    let pool = connection_pool(&config.database_url, config.database_max_connections).await?;

    Ok(pool)
}

/// Main runtime managing the tablegraph node process.
#[allow(missing_debug_implementations)]
pub struct Node {
    pool: Pool,
    manager: ServiceManager<Context, ServiceMessage>,
}

impl Node {
    /// Start a tablegraph node with your configuration. This method can be used to run the
    /// node within other applications.
    pub async fn start(config: Configuration) -> Self {
        // Initialize database and get connection pool
        let pool = initialize_db(&config)
            .await
            .expect("Could not initialize database");

        // Prepare storage, contract provider and result cache using the configuration
        let store = SqlStore::new(pool.clone());
        let provider = ContractProvider::new(config.schema_base_path.clone());
        let cache = ResultCache::new(
            config.cache_local_capacity,
            config.cache_shared_capacity,
            config.cache_ttl(),
        );

        // Create service manager with shared data between services
        let context = Context::new(store, config, provider, cache);
        let mut manager =
            ServiceManager::<Context, ServiceMessage>::new(SERVICE_BUS_CAPACITY, context);

        // Start HTTP server with GraphQL API, webhooks and event stream
        manager.add("http", http_service);

        // Start database listener feeding the event stream
        manager.add("listener", listener_service);

        Self { pool, manager }
    }

    /// This future resolves when at least one system service stopped.
    ///
    /// It can be used to exit the application as a stopped service usually means that
    /// something went wrong.
    pub async fn on_exit(&self) {
        self.manager.on_exit().await;
    }

    /// Close all running concurrent tasks and wait until they are fully shut down.
    pub async fn shutdown(self) {
        // Wait until all tasks are shut down
        self.manager.shutdown().await;

        // Close connection pool
        self.pool.close().await;
    }
}
