// SPDX-License-Identifier: AGPL-3.0-or-later

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::cache::RESULT_TTL;

/// Configuration object holding all important variables throughout the application.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// URL / connection string to the PostgreSQL database holding the tenant tables.
    pub database_url: String,

    /// Maximum number of connections that the database pool should maintain.
    ///
    /// Be mindful of the connection limits for the database as well as other applications
    /// which may want to connect to the same database.
    pub database_max_connections: u32,

    /// HTTP port, serving the GraphQL API (for example hosted under
    /// http://localhost:3000/graphql), the deployment webhooks and the event stream. Defaults
    /// to 3000.
    pub http_port: u16,

    /// Directory holding one sub-directory per tenant with its `schema.graphql` document.
    pub schema_base_path: PathBuf,

    /// Directory the `/logs` route reads NDJSON log files from.
    pub log_dir: PathBuf,

    /// Seconds a cached query result stays valid. This is the only staleness bound, cached
    /// results are never invalidated by writes.
    pub cache_ttl: u64,

    /// Entry capacity of the fast local cache tier.
    pub cache_local_capacity: usize,

    /// Entry capacity of the larger shared cache tier.
    pub cache_shared_capacity: usize,
}

impl Configuration {
    /// Time-to-live of cached query results.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost:5432/tablegraph".into(),
            database_max_connections: 32,
            http_port: 3000,
            schema_base_path: "./subgraphs".into(),
            log_dir: "./tmp".into(),
            cache_ttl: RESULT_TTL.as_secs(),
            cache_local_capacity: 1024,
            cache_shared_capacity: 16_384,
        }
    }
}
