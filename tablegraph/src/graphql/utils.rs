// SPDX-License-Identifier: AGPL-3.0-or-later

use async_graphql::dynamic::{ResolverContext, TypeRef};
use async_graphql::{Error, Value};

use crate::db::query::errors::QueryError;
use crate::db::query::{
    parse_filter_args, Direction, Filter, Order, Pagination, DEFAULT_PAGE_SIZE,
};
use crate::graphql::constants;
use crate::sdl::{EntityField, EntityType, FieldKind, ScalarKind};

/// Returns the GraphQL type reference for a declared entity field.
pub fn field_type_ref(field: &EntityField) -> TypeRef {
    let name = match &field.kind {
        FieldKind::Scalar(ScalarKind::String) => TypeRef::STRING.to_string(),
        FieldKind::Scalar(ScalarKind::Int) => TypeRef::INT.to_string(),
        FieldKind::Scalar(ScalarKind::Float) => TypeRef::FLOAT.to_string(),
        FieldKind::Scalar(ScalarKind::Boolean) => TypeRef::BOOLEAN.to_string(),
        FieldKind::Scalar(ScalarKind::Id) => TypeRef::ID.to_string(),
        FieldKind::Relation(target) => target.clone(),
    };

    match (field.list, field.nullable) {
        (true, true) => TypeRef::named_nn_list(name),
        (true, false) => TypeRef::named_nn_list_nn(name),
        (false, true) => TypeRef::named(name),
        (false, false) => TypeRef::named_nn(name),
    }
}

/// Populates pagination, ordering and filter settings from the arguments of a collection query.
///
/// Filter keys naming unknown fields are silently dropped, an unknown ordering field is a
/// client error since it would end up as a SQL identifier.
pub fn parse_collection_arguments(
    ctx: &ResolverContext,
    entity: &EntityType,
) -> Result<(Pagination, Order, Filter), Error> {
    let limit = match ctx.args.get(constants::LIMIT_ARG) {
        Some(value) if !value.is_null() => page_argument(constants::LIMIT_ARG, &value)?,
        _ => DEFAULT_PAGE_SIZE,
    };
    let offset = match ctx.args.get(constants::OFFSET_ARG) {
        Some(value) if !value.is_null() => page_argument(constants::OFFSET_ARG, &value)?,
        _ => 0,
    };
    let pagination = Pagination::new(limit, offset);

    let order_field = match ctx.args.get(constants::ORDER_BY_ARG) {
        Some(value) if !value.is_null() => Some(value.string()?.to_string()),
        _ => None,
    };
    if let Some(field) = &order_field {
        if entity.scalar_field(field).is_none() {
            return Err(unknown_field_error(entity, field));
        }
    }
    let direction = match ctx.args.get(constants::ORDER_DIRECTION_ARG) {
        Some(value) if !value.is_null() => Direction::parse(Some(value.string()?)),
        _ => Direction::Ascending,
    };
    let order = Order {
        field: order_field,
        direction,
    };

    let filter = match ctx.args.get(constants::WHERE_ARG) {
        Some(value) if !value.is_null() => {
            let map = value.object()?;
            let mut entries: Vec<(String, serde_json::Value)> = Vec::new();
            for (name, value) in map.iter() {
                entries.push((name.to_string(), value.deserialize()?));
            }
            parse_filter_args(
                entries.iter().map(|(key, value)| (key.as_str(), value)),
                entity,
            )
        }
        _ => Filter::new(),
    };

    Ok((pagination, order, filter))
}

/// Parses a pagination argument into a non-negative row count.
fn page_argument(name: &str, value: &async_graphql::dynamic::ValueAccessor) -> Result<u64, Error> {
    value.u64().map_err(|_| {
        Error::new(
            QueryError::InvalidArgument(format!("'{}' must be a non-negative integer", name))
                .to_string(),
        )
    })
}

/// Returns the client error for a request naming an undeclared field.
pub fn unknown_field_error(entity: &EntityType, field: &str) -> Error {
    Error::new(
        QueryError::UnknownField {
            entity: entity.name.clone(),
            field: field.to_string(),
        }
        .to_string(),
    )
}

/// Converts a JSON row value into a GraphQL value.
pub fn gql_scalar(value: &serde_json::Value) -> Value {
    Value::from_json(value.clone()).unwrap_or(Value::Null)
}
