// SPDX-License-Identifier: AGPL-3.0-or-later

//! Fixed argument names of the derived query surface.

/// Argument selecting the page size of a collection query.
pub const LIMIT_ARG: &str = "limit";

/// Argument skipping rows before the page starts.
pub const OFFSET_ARG: &str = "offset";

/// Argument naming the field a collection is ordered by.
pub const ORDER_BY_ARG: &str = "orderBy";

/// Argument selecting the ordering direction.
pub const ORDER_DIRECTION_ARG: &str = "orderDirection";

/// Argument carrying the filter input of a collection query.
pub const WHERE_ARG: &str = "where";

/// Argument carrying the primary key of a single-item lookup.
pub const ID_ARG: &str = "id";

/// Argument naming the column of a field lookup.
pub const FIELD_ARG: &str = "field";

/// Argument carrying the value of a field lookup.
pub const VALUE_ARG: &str = "value";
