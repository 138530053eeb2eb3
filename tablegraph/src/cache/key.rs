// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::db::query::{Filter, Order, Pagination};

/// Helper for generating result cache keys.
///
/// Keys are byte-stable for identical logical queries: the `where` component serializes the
/// filter in argument-declaration order and all other components are rendered from their
/// resolved (defaulted) values.
pub struct QueryCacheKey;

impl QueryCacheKey {
    /// Key for a paged, ordered and filtered collection query.
    pub fn collection(
        tenant: &str,
        plural: &str,
        chain: &str,
        pagination: &Pagination,
        order: &Order,
        filter: &Filter,
    ) -> String {
        format!(
            "{}_{}_{}:limit:{}:offset:{}:orderBy:{}:orderDirection:{}:where:{}",
            tenant,
            plural,
            chain,
            pagination.limit,
            pagination.offset,
            order.field.as_deref().unwrap_or("none"),
            order.direction.as_token(),
            filter.canonical_json(),
        )
    }

    /// Key for a primary-key lookup.
    pub fn single(tenant: &str, chain: &str, singular: &str, id: &str) -> String {
        format!("{}_{}:{}:{}", tenant, chain, singular, id)
    }

    /// Key for an entity count.
    pub fn count(tenant: &str, chain: &str, singular: &str) -> String {
        format!("{}_{}:{}:count", tenant, chain, singular)
    }

    /// Key for a field lookup.
    pub fn by_field(tenant: &str, chain: &str, singular: &str, field: &str, value: &str) -> String {
        format!("{}_{}:{}:{}:{}", tenant, chain, singular, field, value)
    }
}
