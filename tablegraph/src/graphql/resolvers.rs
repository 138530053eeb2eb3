// SPDX-License-Identifier: AGPL-3.0-or-later

use std::sync::Arc;

use async_graphql::dynamic::{FieldValue, ResolverContext};
use async_graphql::{Error, Value};
use log::debug;
use serde_json::Value as JsonValue;

use crate::cache::{QueryCacheKey, ResultCache};
use crate::contract::EntityNames;
use crate::db::query::errors::QueryError;
use crate::db::sql::{
    build_by_id_query, build_collection_query, build_count_query, build_filter_field_query,
    table_name, BindArgument,
};
use crate::db::{Executor, Row};
use crate::graphql::constants;
use crate::graphql::utils::{gql_scalar, parse_collection_arguments, unknown_field_error};
use crate::schema::Contract;
use crate::sdl::{EntityType, FieldKind};

/// Shorthand for the shared handles every resolver needs.
struct Resolver<'a> {
    executor: &'a Arc<dyn Executor>,
    cache: &'a ResultCache,
    contract: &'a Arc<Contract>,
}

impl<'a> Resolver<'a> {
    /// Pulls the shared handles out of the schema data.
    ///
    /// We unwrap internally here as all of them are registered when the schema is built.
    fn from_context(ctx: &'a ResolverContext) -> Self {
        Self {
            executor: ctx.data_unchecked::<Arc<dyn Executor>>(),
            cache: ctx.data_unchecked::<ResultCache>(),
            contract: ctx.data_unchecked::<Arc<Contract>>(),
        }
    }

    fn entity(&self, name: &str) -> Result<&EntityType, Error> {
        self.contract
            .entity(name)
            .ok_or_else(|| Error::new(QueryError::UnknownEntity(name.to_string()).to_string()))
    }

    fn table(&self, entity: &str) -> String {
        table_name(&self.contract.tenant, entity, &self.contract.chain)
    }

    /// Runs a single-row statement with a read-through cache under the given key.
    ///
    /// Only found rows are cached, an absent row is reported to the caller each time.
    async fn cached_single_row(
        &self,
        key: &str,
        statement: crate::db::sql::Statement,
    ) -> Result<Option<Row>, Error> {
        if let Some(cached) = self.cache.get(key).await {
            if let Ok(row) = serde_json::from_str::<Row>(&cached) {
                return Ok(Some(row));
            }
        }

        let mut rows = self
            .executor
            .fetch_all(&statement)
            .await
            .map_err(|err| Error::new(err.to_string()))?;

        match rows.into_iter().next() {
            Some(row) => {
                if let Ok(serialized) = serde_json::to_string(&row) {
                    self.cache.set(key, serialized).await;
                }
                Ok(Some(row))
            }
            None => Ok(None),
        }
    }
}

/// Resolves a paged, ordered and filtered collection of entity rows.
pub async fn resolve_collection(
    ctx: ResolverContext<'_>,
    entity_name: String,
) -> Result<Option<FieldValue<'static>>, Error> {
    let resolver = Resolver::from_context(&ctx);
    let entity = resolver.entity(&entity_name)?;
    let names = EntityNames::derive(&entity.name);

    let (pagination, order, filter) = parse_collection_arguments(&ctx, entity)?;

    let key = QueryCacheKey::collection(
        &resolver.contract.tenant,
        &names.plural,
        &resolver.contract.chain,
        &pagination,
        &order,
        &filter,
    );

    if let Some(cached) = resolver.cache.get(&key).await {
        if let Ok(rows) = serde_json::from_str::<Vec<Row>>(&cached) {
            debug!("Cache hit for {}", key);
            return Ok(Some(rows_value(rows)));
        }
    }

    let statement =
        build_collection_query(&resolver.table(&entity.name), &pagination, &order, &filter);
    let rows = resolver
        .executor
        .fetch_all(&statement)
        .await
        .map_err(|err| Error::new(err.to_string()))?;

    if let Ok(serialized) = serde_json::to_string(&rows) {
        resolver.cache.set(&key, serialized).await;
    }

    Ok(Some(rows_value(rows)))
}

/// Resolves a single entity row by primary key.
pub async fn resolve_single(
    ctx: ResolverContext<'_>,
    entity_name: String,
) -> Result<Option<FieldValue<'static>>, Error> {
    let resolver = Resolver::from_context(&ctx);
    let entity = resolver.entity(&entity_name)?;
    let names = EntityNames::derive(&entity.name);

    let id = ctx.args.try_get(constants::ID_ARG)?.i64()?;
    let key = QueryCacheKey::single(
        &resolver.contract.tenant,
        &resolver.contract.chain,
        &names.singular,
        &id.to_string(),
    );

    let statement = build_by_id_query(&resolver.table(&entity.name), BindArgument::Integer(id));
    match resolver.cached_single_row(&key, statement).await? {
        Some(row) => Ok(Some(FieldValue::owned_any(row))),
        None => Ok(FieldValue::NONE),
    }
}

/// Resolves the total row count of an entity table.
pub async fn resolve_count(
    ctx: ResolverContext<'_>,
    entity_name: String,
) -> Result<Option<FieldValue<'static>>, Error> {
    let resolver = Resolver::from_context(&ctx);
    let entity = resolver.entity(&entity_name)?;
    let names = EntityNames::derive(&entity.name);

    let key = QueryCacheKey::count(
        &resolver.contract.tenant,
        &resolver.contract.chain,
        &names.singular,
    );

    if let Some(cached) = resolver.cache.get(&key).await {
        if let Ok(count) = cached.parse::<i64>() {
            return Ok(Some(FieldValue::value(Value::from(count))));
        }
    }

    let statement = build_count_query(&resolver.table(&entity.name));
    let rows = resolver
        .executor
        .fetch_all(&statement)
        .await
        .map_err(|err| Error::new(err.to_string()))?;

    let count = rows
        .first()
        .and_then(|row| row.get("count"))
        .and_then(JsonValue::as_i64)
        .ok_or_else(|| Error::new("count query returned no result"))?;

    resolver.cache.set(&key, count.to_string()).await;

    Ok(Some(FieldValue::value(Value::from(count))))
}

/// Resolves a single entity row by an arbitrary declared column.
pub async fn resolve_by_field(
    ctx: ResolverContext<'_>,
    entity_name: String,
) -> Result<Option<FieldValue<'static>>, Error> {
    let resolver = Resolver::from_context(&ctx);
    let entity = resolver.entity(&entity_name)?;
    let names = EntityNames::derive(&entity.name);

    let field = ctx.args.try_get(constants::FIELD_ARG)?.string()?.to_string();
    let value = ctx.args.try_get(constants::VALUE_ARG)?.string()?.to_string();

    // The field name becomes a SQL identifier, it has to be declared on the entity
    if entity.scalar_field(&field).is_none() {
        return Err(unknown_field_error(entity, &field));
    }

    let key = QueryCacheKey::by_field(
        &resolver.contract.tenant,
        &resolver.contract.chain,
        &names.singular,
        &field,
        &value,
    );

    let statement = build_filter_field_query(&resolver.table(&entity.name), &field, &value);
    match resolver.cached_single_row(&key, statement).await? {
        Some(row) => Ok(Some(FieldValue::owned_any(row))),
        None => Ok(FieldValue::NONE),
    }
}

/// Resolves one declared field of an entity row.
///
/// Scalar fields read straight from the parent row. Relation fields locate the foreign key by
/// checking `<field>Id`, `<field>_id` and finally the raw column value, then issue a cached
/// single-row lookup against the target entity's table. Rows without any key variant resolve
/// to an absent value without touching storage.
pub async fn resolve_entity_field(
    ctx: ResolverContext<'_>,
    entity_name: String,
) -> Result<Option<FieldValue<'static>>, Error> {
    let resolver = Resolver::from_context(&ctx);
    let entity = resolver.entity(&entity_name)?;

    let parent = ctx
        .parent_value
        .downcast_ref::<Row>()
        .expect("Parent value passed up by the query resolver is a row");
    let field_name = ctx.field().name();

    let field = match entity.field(field_name) {
        Some(field) => field,
        None => return Ok(FieldValue::NONE),
    };

    match &field.kind {
        // Relation fields targeting another declared entity resolve to the related row
        FieldKind::Relation(target)
            if !field.list
                && target != &entity.name
                && resolver.contract.entity(target).is_some() =>
        {
            let foreign_key = match foreign_key(parent, field_name) {
                Some(value) => value,
                None => return Ok(FieldValue::NONE),
            };

            let target_names = EntityNames::derive(target);
            let (binding, key_part) = match foreign_key {
                JsonValue::Number(number) => match number.as_i64() {
                    Some(id) => (BindArgument::Integer(id), id.to_string()),
                    None => return Ok(FieldValue::NONE),
                },
                JsonValue::String(id) => (BindArgument::String(id.clone()), id.clone()),
                _ => return Ok(FieldValue::NONE),
            };

            let key = QueryCacheKey::single(
                &resolver.contract.tenant,
                &resolver.contract.chain,
                &target_names.singular,
                &key_part,
            );
            let statement = build_by_id_query(&resolver.table(target), binding);

            match resolver.cached_single_row(&key, statement).await? {
                Some(row) => Ok(Some(FieldValue::owned_any(row))),
                None => Ok(FieldValue::NONE),
            }
        }
        // Everything else (scalars, self-relations, relation lists) reads the raw column
        _ => match parent.get(field_name) {
            Some(JsonValue::Null) | None => Ok(FieldValue::NONE),
            Some(value) => Ok(Some(FieldValue::value(gql_scalar(value)))),
        },
    }
}

/// Locates the foreign key of a relation field on a parent row.
fn foreign_key<'a>(parent: &'a Row, field: &str) -> Option<&'a JsonValue> {
    let non_null = |key: String| parent.get(&key).filter(|value| !value.is_null());

    non_null(format!("{}Id", field))
        .or_else(|| non_null(format!("{}_id", field)))
        .or_else(|| {
            parent
                .get(field)
                .filter(|value| value.is_string() || value.is_number())
        })
}

/// Wraps result rows for the GraphQL engine, one owned value per row.
fn rows_value(rows: Vec<Row>) -> FieldValue<'static> {
    FieldValue::list(rows.into_iter().map(FieldValue::owned_any))
}
