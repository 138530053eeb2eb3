// SPDX-License-Identifier: AGPL-3.0-or-later

//! Translation of resolved query settings into parameterized SQL statements.
//!
//! Identifiers (tenant, table, column) are always double-quote-delimited and never come from
//! request values directly, they are either derived from the compiled contract or validated
//! against it. Literal values are the only bind point and travel as positional parameters.
use std::fmt::Write;

use crate::db::query::{Filter, FilterValue, Literal, Operator, Order, Pagination};

/// Values to bind to a SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum BindArgument {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl From<&Literal> for BindArgument {
    fn from(literal: &Literal) -> Self {
        match literal {
            Literal::String(value) => BindArgument::String(value.clone()),
            Literal::Integer(value) => BindArgument::Integer(*value),
            Literal::Float(value) => BindArgument::Float(*value),
            Literal::Boolean(value) => BindArgument::Boolean(*value),
        }
    }
}

/// A SQL statement template together with its positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub bindings: Vec<BindArgument>,
}

impl Statement {
    pub fn new(sql: String, bindings: Vec<BindArgument>) -> Self {
        Self { sql, bindings }
    }
}

/// Returns the qualified table identifier for an entity of a tenant on a chain.
///
/// Tables follow the `"<tenant>"."<entity_lowercase>_<chain>"` convention.
pub fn table_name(tenant: &str, entity: &str, chain: &str) -> String {
    format!(
        "{}.{}",
        quote_identifier(tenant),
        quote_identifier(&format!("{}_{}", entity.to_lowercase(), chain))
    )
}

/// Double-quote-delimits an identifier, doubling any embedded quote.
pub fn quote_identifier(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

/// Translates a filter into SQL predicate fragments, one per setting, in setting order.
///
/// Values are appended to `bindings` and referenced as positional `$n` parameters. Predicates
/// are meant to be joined with `AND`, an empty filter yields no fragments at all.
pub fn translate_filter(filter: &Filter, bindings: &mut Vec<BindArgument>) -> Vec<String> {
    let mut predicates = Vec::with_capacity(filter.len());

    for setting in filter.iter() {
        let column = quote_identifier(&setting.field);

        match (&setting.operator, &setting.value) {
            (Operator::In, FilterValue::Set(literals))
            | (Operator::NotIn, FilterValue::Set(literals)) => {
                let placeholders: Vec<String> = literals
                    .iter()
                    .map(|literal| {
                        bindings.push(literal.into());
                        format!("${}", bindings.len())
                    })
                    .collect();
                let keyword = match setting.operator {
                    Operator::NotIn => "NOT IN",
                    _ => "IN",
                };
                predicates.push(format!("{} {} ({})", column, keyword, placeholders.join(", ")));
            }
            (operator, FilterValue::Single(literal)) => {
                // Operators which reach this point always carry a comparison token
                if let Some(comparison) = operator.sql_comparison() {
                    bindings.push(literal.into());
                    predicates.push(format!("{} {} ${}", column, comparison, bindings.len()));
                }
            }
            _ => (),
        }
    }

    predicates
}

/// Builds the paged, ordered and filtered collection statement for one table.
pub fn build_collection_query(
    table: &str,
    pagination: &Pagination,
    order: &Order,
    filter: &Filter,
) -> Statement {
    let mut bindings = Vec::new();
    let mut sql = format!("SELECT * FROM {}", table);

    let predicates = translate_filter(filter, &mut bindings);
    if !predicates.is_empty() {
        let _ = write!(sql, " WHERE {}", predicates.join(" AND "));
    }

    if let Some(field) = &order.field {
        let _ = write!(
            sql,
            " ORDER BY {} {}",
            quote_identifier(field),
            order.direction.as_sql()
        );
    }

    let _ = write!(sql, " LIMIT {} OFFSET {}", pagination.limit, pagination.offset);

    Statement::new(sql, bindings)
}

/// Builds the primary-key lookup statement for one table.
pub fn build_by_id_query(table: &str, id: BindArgument) -> Statement {
    Statement::new(
        format!("SELECT * FROM {} WHERE \"id\" = $1 LIMIT 1", table),
        vec![id],
    )
}

/// Builds the row-count statement for one table.
pub fn build_count_query(table: &str) -> Statement {
    Statement::new(format!("SELECT COUNT(*) AS \"count\" FROM {}", table), Vec::new())
}

/// Builds the single-row lookup statement for an arbitrary (pre-validated) column.
pub fn build_filter_field_query(table: &str, field: &str, value: &str) -> Statement {
    Statement::new(
        format!(
            "SELECT * FROM {} WHERE {} = $1 LIMIT 1",
            table,
            quote_identifier(field)
        ),
        vec![BindArgument::String(value.to_string())],
    )
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::db::query::{parse_filter_args, Direction, Filter, Order, Pagination};
    use crate::sdl::list_entities;

    use super::{
        build_by_id_query, build_collection_query, build_count_query, build_filter_field_query,
        table_name, translate_filter, BindArgument,
    };

    fn post_filter(args: serde_json::Value) -> Filter {
        let entities =
            list_entities("type Post { id: ID\nage: Int\nname: String }").unwrap();
        let map = match args {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected object"),
        };
        let entries: Vec<(String, serde_json::Value)> = map.into_iter().collect();
        parse_filter_args(
            entries.iter().map(|(key, value)| (key.as_str(), value)),
            &entities[0],
        )
    }

    #[test]
    fn table_naming_convention() {
        assert_eq!(table_name("acme", "Post", "1"), r#""acme"."post_1""#);
    }

    #[test]
    fn translates_filters_in_argument_order() {
        let filter = post_filter(json!({ "age_gt": 18, "name": "bob" }));
        let mut bindings = Vec::new();

        let predicates = translate_filter(&filter, &mut bindings);

        assert_eq!(predicates, vec![r#""age" > $1"#, r#""name" = $2"#]);
        assert_eq!(
            bindings,
            vec![
                BindArgument::Integer(18),
                BindArgument::String("bob".to_string())
            ]
        );
    }

    #[test]
    fn translates_set_operators() {
        let filter = post_filter(json!({ "age_in": [1, 2], "name_not_in": ["a"] }));
        let mut bindings = Vec::new();

        let predicates = translate_filter(&filter, &mut bindings);

        assert_eq!(
            predicates,
            vec![r#""age" IN ($1, $2)"#, r#""name" NOT IN ($3)"#]
        );
        assert_eq!(bindings.len(), 3);
    }

    #[test]
    fn collection_query_without_filter_has_no_where_clause() {
        let statement = build_collection_query(
            &table_name("acme", "Post", "1"),
            &Pagination::new(5, 10),
            &Order::default(),
            &Filter::new(),
        );

        assert_eq!(
            statement.sql,
            r#"SELECT * FROM "acme"."post_1" LIMIT 5 OFFSET 10"#
        );
        assert!(statement.bindings.is_empty());
    }

    #[test]
    fn collection_query_with_filter_and_order() {
        let statement = build_collection_query(
            &table_name("acme", "Post", "1"),
            &Pagination::default(),
            &Order::new("age", Direction::Descending),
            &post_filter(json!({ "name": "bob" })),
        );

        assert_eq!(
            statement.sql,
            r#"SELECT * FROM "acme"."post_1" WHERE "name" = $1 ORDER BY "age" DESC LIMIT 10 OFFSET 0"#
        );
    }

    #[test]
    fn lookup_and_count_statements() {
        let table = table_name("acme", "Post", "1");

        let by_id = build_by_id_query(&table, BindArgument::Integer(7));
        assert_eq!(
            by_id.sql,
            r#"SELECT * FROM "acme"."post_1" WHERE "id" = $1 LIMIT 1"#
        );

        let count = build_count_query(&table);
        assert_eq!(count.sql, r#"SELECT COUNT(*) AS "count" FROM "acme"."post_1""#);

        let by_field = build_filter_field_query(&table, "title", "hello");
        assert_eq!(
            by_field.sql,
            r#"SELECT * FROM "acme"."post_1" WHERE "title" = $1 LIMIT 1"#
        );
        assert_eq!(
            by_field.bindings,
            vec![BindArgument::String("hello".to_string())]
        );
    }
}
