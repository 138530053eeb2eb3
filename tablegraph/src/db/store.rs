// SPDX-License-Identifier: AGPL-3.0-or-later

use async_trait::async_trait;
use serde_json::{Map, Number, Value};
use sqlx::postgres::PgRow;
use sqlx::{Column, Row as _, TypeInfo};

use crate::db::sql::{BindArgument, Statement};
use crate::db::Pool;

/// One result row, column order preserved.
pub type Row = Map<String, Value>;

/// Errors returned by the storage executor.
///
/// Execution failures propagate to the caller unmodified, they are never retried and their
/// results are never cached.
#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// Error returned from the database.
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Boundary to the SQL execution engine.
///
/// Resolvers only ever talk to this trait, which keeps them testable without a live database
/// and leaves the concrete engine to the process wiring.
#[async_trait]
pub trait Executor: Send + Sync {
    /// Executes a statement and returns all result rows in order.
    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>, StorageError>;
}

/// SQL based storage executor backed by a PostgreSQL connection pool.
#[derive(Clone, Debug)]
pub struct SqlStore {
    pub(crate) pool: Pool,
}

impl SqlStore {
    /// Create a new `SqlStore` using the provided db `Pool`.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Executor for SqlStore {
    async fn fetch_all(&self, statement: &Statement) -> Result<Vec<Row>, StorageError> {
        let mut query = sqlx::query(&statement.sql);
        for binding in &statement.bindings {
            query = match binding {
                BindArgument::String(value) => query.bind(value),
                BindArgument::Integer(value) => query.bind(value),
                BindArgument::Float(value) => query.bind(value),
                BindArgument::Boolean(value) => query.bind(value),
            };
        }

        let rows = query.fetch_all(&self.pool).await?;
        Ok(rows.iter().map(row_to_map).collect())
    }
}

/// Converts a database row into an ordered JSON mapping.
///
/// Column types without a JSON representation we can decode (timestamps, custom types, ..)
/// come back as `null` rather than failing the whole row.
fn row_to_map(row: &PgRow) -> Row {
    let mut map = Map::new();

    for (index, column) in row.columns().iter().enumerate() {
        let value = match column.type_info().name() {
            "INT2" => row
                .try_get::<Option<i16>, _>(index)
                .ok()
                .flatten()
                .map(|value| Value::from(value as i64)),
            "INT4" => row
                .try_get::<Option<i32>, _>(index)
                .ok()
                .flatten()
                .map(|value| Value::from(value as i64)),
            "INT8" => row
                .try_get::<Option<i64>, _>(index)
                .ok()
                .flatten()
                .map(Value::from),
            "FLOAT4" => row
                .try_get::<Option<f32>, _>(index)
                .ok()
                .flatten()
                .and_then(|value| Number::from_f64(value as f64).map(Value::Number)),
            "FLOAT8" => row
                .try_get::<Option<f64>, _>(index)
                .ok()
                .flatten()
                .and_then(|value| Number::from_f64(value).map(Value::Number)),
            "BOOL" => row
                .try_get::<Option<bool>, _>(index)
                .ok()
                .flatten()
                .map(Value::Bool),
            "JSON" | "JSONB" => row.try_get::<Option<Value>, _>(index).ok().flatten(),
            _ => row
                .try_get::<Option<String>, _>(index)
                .ok()
                .flatten()
                .map(Value::String),
        };

        map.insert(column.name().to_string(), value.unwrap_or(Value::Null));
    }

    map
}
