// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::Write;

use crate::contract::errors::ContractError;
use crate::contract::names::{check_entity_names, EntityNames};
use crate::db::query::DEFAULT_PAGE_SIZE;
use crate::sdl::EntityType;

/// Comparison operator suffixes attached to every scalar field of a filter input, in the order
/// they appear inside the generated input type.
const FILTER_SUFFIXES: [&str; 6] = ["_in", "_not_in", "_gt", "_gte", "_lt", "_lte"];

/// Emits the derived root query type for a list of entities.
///
/// Every entity contributes four operations: a paged and filtered collection, a lookup by
/// primary key, a count and a lookup by arbitrary field. The output only depends on the entity
/// names, running this twice on the same input yields byte-identical SDL.
pub fn derive_query_type(entities: &[EntityType]) -> Result<String, ContractError> {
    check_entity_names(entities)?;

    let mut sdl = String::from("type Query {\n");
    for entity in entities {
        let names = EntityNames::derive(&entity.name);

        let _ = writeln!(
            sdl,
            "  {}(limit: Int = {}, offset: Int = 0, orderBy: String, orderDirection: String, where: {}): [{}!]!",
            names.plural, DEFAULT_PAGE_SIZE, names.where_input, names.type_name
        );
        let _ = writeln!(sdl, "  {}(id: Int!): {}", names.singular, names.type_name);
        let _ = writeln!(sdl, "  {}: Int!", names.count);
        let _ = writeln!(
            sdl,
            "  {}(field: String!, value: String!): {}",
            names.by, names.type_name
        );
    }
    sdl.push_str("}\n");

    Ok(sdl)
}

/// Emits one filter input type per entity.
///
/// Scalar fields receive an equality key plus one key per comparison operator, relation fields
/// targeting another declared entity are referenced as that entity's nested filter input. Field
/// ordering mirrors the entity declaration order.
pub fn derive_filter_inputs(entities: &[EntityType]) -> Result<String, ContractError> {
    check_entity_names(entities)?;

    let mut blocks: Vec<String> = Vec::with_capacity(entities.len());
    for entity in entities {
        let names = EntityNames::derive(&entity.name);
        let mut sdl = format!("input {} {{\n", names.where_input);

        for field in &entity.fields {
            if let Some(scalar) = field.scalar_kind() {
                let type_name = scalar.sdl_name();
                let _ = writeln!(sdl, "  {}: {}", field.name, type_name);
                for suffix in FILTER_SUFFIXES {
                    match suffix {
                        "_in" | "_not_in" => {
                            let _ = writeln!(sdl, "  {}{}: [{}!]", field.name, suffix, type_name);
                        }
                        _ => {
                            let _ = writeln!(sdl, "  {}{}: {}", field.name, suffix, type_name);
                        }
                    }
                }
            } else if let Some(target) = field.relation_target() {
                // Nested filter references are only emitted for declared entities
                if entities.iter().any(|entity| entity.name == target) {
                    let _ = writeln!(
                        sdl,
                        "  {}: {}{}",
                        field.name,
                        target,
                        super::names::WHERE_INPUT_SUFFIX
                    );
                }
            }
        }

        sdl.push_str("}\n");
        blocks.push(sdl);
    }

    Ok(blocks.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::{derive_filter_inputs, derive_query_type};
    use crate::sdl::list_entities;

    const POST_SCHEMA: &str = r#"
        type Post {
          id: ID
          title: String
          authorId: Int
          author: Author
        }

        type Author {
          id: ID
          name: String
        }
    "#;

    #[test]
    fn derives_four_operations_per_entity() {
        let entities = list_entities(POST_SCHEMA).unwrap();
        let sdl = derive_query_type(&entities).unwrap();

        assert!(sdl.contains(
            "posts(limit: Int = 10, offset: Int = 0, orderBy: String, orderDirection: String, \
             where: PostWhereInput): [Post!]!"
        ));
        assert!(sdl.contains("post(id: Int!): Post"));
        assert!(sdl.contains("postCount: Int!"));
        assert!(sdl.contains("postBy(field: String!, value: String!): Post"));
        assert!(sdl.contains("authors(limit: Int = 10"));
    }

    #[test]
    fn synthesis_is_deterministic() {
        let entities = list_entities(POST_SCHEMA).unwrap();

        assert_eq!(
            derive_query_type(&entities).unwrap(),
            derive_query_type(&entities).unwrap()
        );
        assert_eq!(
            derive_filter_inputs(&entities).unwrap(),
            derive_filter_inputs(&entities).unwrap()
        );
    }

    #[test]
    fn filter_inputs_enumerate_scalar_operators() {
        let entities = list_entities(POST_SCHEMA).unwrap();
        let sdl = derive_filter_inputs(&entities).unwrap();

        assert!(sdl.contains("input PostWhereInput {"));
        assert!(sdl.contains("  title: String\n"));
        assert!(sdl.contains("  title_in: [String!]\n"));
        assert!(sdl.contains("  title_not_in: [String!]\n"));
        assert!(sdl.contains("  authorId_gt: Int\n"));
        assert!(sdl.contains("  authorId_lte: Int\n"));
        // Relation fields are nested references, never operator keys
        assert!(sdl.contains("  author: AuthorWhereInput\n"));
        assert!(!sdl.contains("author_gt"));
    }

    #[test]
    fn colliding_entities_are_rejected() {
        let entities = list_entities("type Post { id: ID }\ntype POST { id: ID }").unwrap();

        assert!(derive_query_type(&entities).is_err());
        assert!(derive_filter_inputs(&entities).is_err());
    }
}
