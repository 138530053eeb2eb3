// SPDX-License-Identifier: AGPL-3.0-or-later

//! Persistent storage layer for a tablegraph node.
//!
//! Tenant tables live in a PostgreSQL database, one schema per tenant and one table per entity
//! and chain. The only interface resolvers see is the [`Executor`] trait which accepts a
//! parameterized statement and returns rows as ordered mappings.
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;

pub mod query;
pub mod sql;
mod store;

pub use store::{Executor, Row, SqlStore, StorageError};

/// Re-export of the connection pool type.
pub type Pool = sqlx::PgPool;

/// Creates a connection pool for the configured database.
pub async fn connection_pool(url: &str, max_connections: u32) -> Result<Pool> {
    let pool: Pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(url)
        .await?;

    Ok(pool)
}
