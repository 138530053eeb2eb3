// SPDX-License-Identifier: AGPL-3.0-or-later

use std::slice::Iter;

use serde_json::{Map, Value};

use crate::sdl::EntityType;

/// Comparison operators which can be applied to a scalar field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Exact equality against a single value.
    Eq,

    /// Membership in a set of values.
    In,

    /// Exclusion from a set of values.
    NotIn,

    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Splits a filter argument key into field name and operator.
    ///
    /// Suffixes are matched in priority order so that `_not_in` wins over `_in`. A key without
    /// a recognized suffix (or with nothing in front of it) is a bare equality key.
    pub fn parse_key(key: &str) -> (&str, Operator) {
        const SUFFIXES: [(&str, Operator); 6] = [
            ("_not_in", Operator::NotIn),
            ("_in", Operator::In),
            ("_gte", Operator::Gte),
            ("_gt", Operator::Gt),
            ("_lte", Operator::Lte),
            ("_lt", Operator::Lt),
        ];

        for (suffix, operator) in SUFFIXES {
            match key.strip_suffix(suffix) {
                Some(field) if !field.is_empty() => return (field, operator),
                _ => continue,
            }
        }

        (key, Operator::Eq)
    }

    /// Returns the argument-key suffix of this operator, empty for equality.
    pub fn suffix(&self) -> &'static str {
        match self {
            Operator::Eq => "",
            Operator::In => "_in",
            Operator::NotIn => "_not_in",
            Operator::Gt => "_gt",
            Operator::Gte => "_gte",
            Operator::Lt => "_lt",
            Operator::Lte => "_lte",
        }
    }

    /// Returns the SQL comparison token for single-value operators.
    pub fn sql_comparison(&self) -> Option<&'static str> {
        match self {
            Operator::Eq => Some("="),
            Operator::Gt => Some(">"),
            Operator::Gte => Some(">="),
            Operator::Lt => Some("<"),
            Operator::Lte => Some("<="),
            Operator::In | Operator::NotIn => None,
        }
    }
}

/// A single literal filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Literal {
    /// Converts a JSON argument value into a literal, `None` for objects, arrays and nulls.
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(value) => Some(Literal::String(value.clone())),
            Value::Number(number) => match number.as_i64() {
                Some(value) => Some(Literal::Integer(value)),
                None => number.as_f64().map(Literal::Float),
            },
            Value::Bool(value) => Some(Literal::Boolean(*value)),
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            Literal::String(value) => Value::String(value.clone()),
            Literal::Integer(value) => Value::from(*value),
            Literal::Float(value) => Value::from(*value),
            Literal::Boolean(value) => Value::Bool(*value),
        }
    }
}

/// Value side of one filter setting.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    /// Single literal for equality and interval comparisons.
    Single(Literal),

    /// Set of literals for `_in` / `_not_in`.
    Set(Vec<Literal>),
}

/// An item representing a single filter setting.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSetting {
    /// Field this filter is applied on.
    pub field: String,

    /// Comparison operator.
    pub operator: Operator,

    /// Literal value(s) to compare against.
    pub value: FilterValue,
}

/// Collection of filter settings in argument-declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter(Vec<FilterSetting>);

impl Filter {
    /// Returns a new, empty `Filter` instance.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Adds another setting to the end of the filter.
    pub fn push(&mut self, setting: FilterSetting) {
        self.0.push(setting);
    }

    /// Returns the total number of filter settings.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when no settings were applied.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over all filter settings.
    pub fn iter(&self) -> Iter<FilterSetting> {
        self.0.iter()
    }

    /// Stable JSON rendering of the filter in setting order.
    ///
    /// This is the `where` component of collection cache keys, two logically identical filters
    /// must serialize to identical bytes.
    pub fn canonical_json(&self) -> String {
        let mut map = Map::new();
        for setting in &self.0 {
            let key = format!("{}{}", setting.field, setting.operator.suffix());
            let value = match &setting.value {
                FilterValue::Single(literal) => literal.to_json(),
                FilterValue::Set(literals) => {
                    Value::Array(literals.iter().map(Literal::to_json).collect())
                }
            };
            map.insert(key, value);
        }

        Value::Object(map).to_string()
    }
}

/// Parses a `where` argument map into a filter against the given entity.
///
/// Settings are kept in argument-declaration order. Keys naming fields which are not declared
/// scalar fields of the entity are silently ignored, as are set operators without a non-empty
/// list value and bare equality keys with non-string values.
pub fn parse_filter_args<'a>(
    args: impl Iterator<Item = (&'a str, &'a Value)>,
    entity: &EntityType,
) -> Filter {
    let mut filter = Filter::new();

    for (key, value) in args {
        let (field, operator) = Operator::parse_key(key);

        if entity.scalar_field(field).is_none() {
            continue;
        }

        let filter_value = match operator {
            Operator::In | Operator::NotIn => match value {
                Value::Array(items) => {
                    let literals: Vec<Literal> =
                        items.iter().filter_map(Literal::from_json).collect();
                    if literals.is_empty() {
                        continue;
                    }
                    FilterValue::Set(literals)
                }
                _ => continue,
            },
            Operator::Eq => match value {
                // Bare keys only ever match against string values
                Value::String(value) => {
                    FilterValue::Single(Literal::String(value.clone()))
                }
                _ => continue,
            },
            _ => match Literal::from_json(value) {
                Some(literal) => FilterValue::Single(literal),
                None => continue,
            },
        };

        filter.push(FilterSetting {
            field: field.to_string(),
            operator,
            value: filter_value,
        });
    }

    filter
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::{json, Value};

    use crate::sdl::list_entities;

    use super::{parse_filter_args, Literal, Operator};

    fn parse(filter: Value) -> super::Filter {
        let entities =
            list_entities("type Post { id: ID\nage: Int\nname: String\nauthor: Author }\ntype Author { id: ID }")
                .unwrap();
        let map = match filter {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        };
        let entries: Vec<(String, Value)> = map.into_iter().collect();
        parse_filter_args(
            entries.iter().map(|(key, value)| (key.as_str(), value)),
            &entities[0],
        )
    }

    #[rstest]
    #[case("age_not_in", Operator::NotIn)]
    #[case("age_in", Operator::In)]
    #[case("age_gt", Operator::Gt)]
    #[case("age_gte", Operator::Gte)]
    #[case("age_lt", Operator::Lt)]
    #[case("age_lte", Operator::Lte)]
    #[case("age", Operator::Eq)]
    fn parses_operator_suffixes(#[case] key: &str, #[case] expected: Operator) {
        let (field, operator) = Operator::parse_key(key);
        assert_eq!(operator, expected);
        assert_eq!(field, "age");
    }

    #[test]
    fn suffix_only_keys_are_bare_keys() {
        assert_eq!(Operator::parse_key("_in"), ("_in", Operator::Eq));
    }

    #[test]
    fn keeps_argument_declaration_order() {
        let filter = parse(json!({ "age_gt": 18, "name": "bob" }));

        let fields: Vec<&str> = filter.iter().map(|item| item.field.as_str()).collect();
        assert_eq!(fields, vec!["age", "name"]);
    }

    #[test]
    fn ignores_unknown_fields() {
        let filter = parse(json!({ "nope_gt": 1, "name": "bob" }));

        assert_eq!(filter.len(), 1);
    }

    #[test]
    fn bare_keys_only_accept_strings() {
        let filter = parse(json!({ "age": 5, "name": "bob" }));

        assert_eq!(filter.len(), 1);
        assert_eq!(filter.iter().next().unwrap().field, "name");
    }

    #[test]
    fn set_operators_need_non_empty_lists() {
        assert!(parse(json!({ "age_in": [] })).is_empty());
        assert!(parse(json!({ "age_in": 5 })).is_empty());
        assert_eq!(parse(json!({ "age_in": [1, 2] })).len(), 1);
    }

    #[test]
    fn relation_fields_never_receive_operators() {
        assert!(parse(json!({ "author": "x", "author_gt": 1 })).is_empty());
    }

    #[test]
    fn canonical_json_is_stable() {
        let first = parse(json!({ "age_gt": 18, "name": "bob" }));
        let second = parse(json!({ "age_gt": 18, "name": "bob" }));

        assert_eq!(first.canonical_json(), second.canonical_json());
        assert_eq!(
            first.canonical_json(),
            r#"{"age_gt":18,"name":"bob"}"#
        );
    }

    #[test]
    fn converts_literals() {
        assert_eq!(
            Literal::from_json(&json!("a")),
            Some(Literal::String("a".to_string()))
        );
        assert_eq!(Literal::from_json(&json!(1)), Some(Literal::Integer(1)));
        assert_eq!(Literal::from_json(&json!(1.5)), Some(Literal::Float(1.5)));
        assert_eq!(Literal::from_json(&json!(null)), None);
        assert_eq!(Literal::from_json(&json!({})), None);
    }
}
