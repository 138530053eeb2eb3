// SPDX-License-Identifier: AGPL-3.0-or-later

//! Build and manage executable GraphQL schemas for compiled contracts.
use std::collections::HashMap;
use std::sync::Arc;

use async_graphql::dynamic::{
    Field, FieldFuture, InputObject, InputValue, Object, Schema, TypeRef,
};
use async_graphql::{Request, Response};
use log::{debug, info};
use tokio::sync::Mutex;

use crate::cache::ResultCache;
use crate::contract::{EntityNames, WHERE_INPUT_SUFFIX};
use crate::db::Executor;
use crate::graphql::constants;
use crate::graphql::resolvers::{
    resolve_by_field, resolve_collection, resolve_count, resolve_entity_field, resolve_single,
};
use crate::graphql::utils::field_type_ref;
use crate::schema::errors::ProviderError;
use crate::schema::{Contract, ContractProvider};

/// Compiled executable schemas by (tenant, chain) pair.
type SchemaRegistry = Arc<Mutex<HashMap<(String, String), Schema>>>;

/// Shared handles injected into every built schema.
#[derive(Clone)]
pub struct GraphQLSharedData {
    /// Storage executor answering the synthesized statements.
    pub executor: Arc<dyn Executor>,

    /// Read-through result cache.
    pub cache: ResultCache,

    /// Compiler and loader for tenant contracts.
    pub provider: ContractProvider,
}

impl std::fmt::Debug for GraphQLSharedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphQLSharedData")
            .field("provider", &self.provider)
            .finish()
    }
}

/// Builds the executable GraphQL schema for one compiled contract.
///
/// Per entity this registers the entity object, its filter input type and the four root query
/// fields. Shared handles and the contract itself travel as schema data, resolvers never hold
/// global state.
pub fn build_contract_schema(
    contract: &Arc<Contract>,
    shared: &GraphQLSharedData,
) -> Result<Schema, ProviderError> {
    let mut builder = Schema::build("Query", None, None);
    let mut query = Object::new("Query");

    for entity in &contract.entities {
        let names = EntityNames::derive(&entity.name);

        // Entity object with one resolver per declared field
        let mut object = Object::new(&entity.name);
        for field in &entity.fields {
            let entity_name = entity.name.clone();
            object = object.field(Field::new(
                &field.name,
                field_type_ref(field),
                move |ctx| {
                    let entity_name = entity_name.clone();
                    FieldFuture::new(async move { resolve_entity_field(ctx, entity_name).await })
                },
            ));
        }
        builder = builder
            .register(object)
            .register(where_input(entity, contract));

        // Collection query
        let entity_name = entity.name.clone();
        query = query.field(
            Field::new(
                &names.plural,
                TypeRef::named_nn_list_nn(&entity.name),
                move |ctx| {
                    let entity_name = entity_name.clone();
                    FieldFuture::new(async move { resolve_collection(ctx, entity_name).await })
                },
            )
            .argument(InputValue::new(
                constants::LIMIT_ARG,
                TypeRef::named(TypeRef::INT),
            ))
            .argument(InputValue::new(
                constants::OFFSET_ARG,
                TypeRef::named(TypeRef::INT),
            ))
            .argument(InputValue::new(
                constants::ORDER_BY_ARG,
                TypeRef::named(TypeRef::STRING),
            ))
            .argument(InputValue::new(
                constants::ORDER_DIRECTION_ARG,
                TypeRef::named(TypeRef::STRING),
            ))
            .argument(InputValue::new(
                constants::WHERE_ARG,
                TypeRef::named(&names.where_input),
            ))
            .description(format!(
                "Query a filtered, ordered page of `{}` rows.",
                entity.name
            )),
        );

        // Lookup by primary key
        let entity_name = entity.name.clone();
        query = query.field(
            Field::new(&names.singular, TypeRef::named(&entity.name), move |ctx| {
                let entity_name = entity_name.clone();
                FieldFuture::new(async move { resolve_single(ctx, entity_name).await })
            })
            .argument(InputValue::new(
                constants::ID_ARG,
                TypeRef::named_nn(TypeRef::INT),
            ))
            .description(format!("Query a single `{}` row by id.", entity.name)),
        );

        // Count
        let entity_name = entity.name.clone();
        query = query.field(
            Field::new(&names.count, TypeRef::named_nn(TypeRef::INT), move |ctx| {
                let entity_name = entity_name.clone();
                FieldFuture::new(async move { resolve_count(ctx, entity_name).await })
            })
            .description(format!("Count all `{}` rows.", entity.name)),
        );

        // Lookup by declared column
        let entity_name = entity.name.clone();
        query = query.field(
            Field::new(&names.by, TypeRef::named(&entity.name), move |ctx| {
                let entity_name = entity_name.clone();
                FieldFuture::new(async move { resolve_by_field(ctx, entity_name).await })
            })
            .argument(InputValue::new(
                constants::FIELD_ARG,
                TypeRef::named_nn(TypeRef::STRING),
            ))
            .argument(InputValue::new(
                constants::VALUE_ARG,
                TypeRef::named_nn(TypeRef::STRING),
            ))
            .description(format!(
                "Query a single `{}` row by a declared column.",
                entity.name
            )),
        );
    }

    builder
        .register(query)
        .data(shared.executor.clone())
        .data(shared.cache.clone())
        .data(Arc::clone(contract))
        .finish()
        .map_err(|err| ProviderError::Schema(err.to_string()))
}

/// Builds the filter input object for one entity.
///
/// Scalar fields receive an equality key plus one key per comparison operator, relation fields
/// targeting another declared entity become a nested filter reference. The layout mirrors the
/// SDL emitted by the contract synthesizer.
fn where_input(entity: &crate::sdl::EntityType, contract: &Contract) -> InputObject {
    let names = EntityNames::derive(&entity.name);
    let mut input = InputObject::new(&names.where_input);

    for field in &entity.fields {
        if let Some(scalar) = field.scalar_kind() {
            let type_name = scalar.sdl_name();

            input = input
                .field(InputValue::new(&field.name, TypeRef::named(type_name)))
                .field(InputValue::new(
                    format!("{}_in", field.name),
                    TypeRef::named_nn_list(type_name),
                ))
                .field(InputValue::new(
                    format!("{}_not_in", field.name),
                    TypeRef::named_nn_list(type_name),
                ));

            for suffix in ["_gt", "_gte", "_lt", "_lte"] {
                input = input.field(InputValue::new(
                    format!("{}{}", field.name, suffix),
                    TypeRef::named(type_name),
                ));
            }
        } else if let Some(target) = field.relation_target() {
            if contract.entity(target).is_some() {
                input = input.field(InputValue::new(
                    &field.name,
                    TypeRef::named(format!("{}{}", target, WHERE_INPUT_SUFFIX)),
                ));
            }
        }
    }

    input
}

/// Builds executable schemas lazily and runs incoming queries against them.
///
/// Schemas are memoized per (tenant, chain). Compilation is deterministic, so two requests
/// racing on the same uncompiled pair may both build the schema and the later insert simply
/// wins. When a tenant is invalidated (redeployed or deleted) all its memoized schemas are
/// dropped and the next request recompiles from source.
#[derive(Clone)]
pub struct GraphQLSchemaManager {
    /// Memoized executable schemas.
    schemas: SchemaRegistry,

    /// Commonly shared handles for all built schemas.
    shared: GraphQLSharedData,
}

impl GraphQLSchemaManager {
    /// Returns a new instance of `GraphQLSchemaManager`.
    pub fn new(executor: Arc<dyn Executor>, cache: ResultCache, provider: ContractProvider) -> Self {
        let manager = Self {
            schemas: Arc::new(Mutex::new(HashMap::new())),
            shared: GraphQLSharedData {
                executor,
                cache,
                provider,
            },
        };

        manager.spawn_invalidation_task();
        manager
    }

    /// Subscribes to the contract provider for invalidated tenants.
    fn spawn_invalidation_task(&self) {
        let schemas = self.schemas.clone();
        let mut on_invalidated = self.shared.provider.on_invalidated();

        tokio::task::spawn(async move {
            while let Ok(tenant) = on_invalidated.recv().await {
                info!("Tenant {} invalidated, dropping compiled schemas", tenant);
                schemas
                    .lock()
                    .await
                    .retain(|(schema_tenant, _), _| schema_tenant != &tenant);
            }
        });
    }

    /// Returns the executable schema for a (tenant, chain) pair, building it on first use.
    async fn schema(&self, tenant: &str, chain: &str) -> Result<Schema, ProviderError> {
        let key = (tenant.to_string(), chain.to_string());

        if let Some(schema) = self.schemas.lock().await.get(&key) {
            return Ok(schema.clone());
        }

        // Compile outside the lock. Racing requests build identical schemas, last insert wins.
        let contract = Arc::new(self.shared.provider.contract(tenant, chain)?);
        let schema = build_contract_schema(&contract, &self.shared)?;
        debug!("Built schema for tenant {} on chain {}", tenant, chain);

        self.schemas.lock().await.insert(key, schema.clone());

        Ok(schema)
    }

    /// Executes an incoming GraphQL request against the schema of a (tenant, chain) pair.
    pub async fn execute(
        &self,
        tenant: &str,
        chain: &str,
        request: impl Into<Request>,
    ) -> Result<Response, ProviderError> {
        let schema = self.schema(tenant, chain).await?;
        Ok(schema.execute(request).await)
    }
}

impl std::fmt::Debug for GraphQLSchemaManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // `schemas` does not implement `Debug` but we can at least print the shared handles
        f.debug_struct("GraphQLSchemaManager")
            .field("shared", &self.shared)
            .finish()
    }
}
