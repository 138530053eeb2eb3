// SPDX-License-Identifier: AGPL-3.0-or-later

use crate::contract::errors::ContractError;
use crate::sdl::EntityType;

/// Suffix of derived count fields.
pub const COUNT_SUFFIX: &str = "Count";

/// Suffix of derived field-lookup fields.
pub const BY_SUFFIX: &str = "By";

/// Suffix of derived filter input types.
pub const WHERE_INPUT_SUFFIX: &str = "WhereInput";

/// All names derived for one entity.
///
/// Pluralization is a naive `+s` on the lowercased type name, with no irregular-plural handling.
/// An entity named "Status" therefore gets the collection field "statuss". This matches what
/// deployed clients already query and must not be "fixed".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityNames {
    /// Declared type name, e.g. `Post`.
    pub type_name: String,

    /// Lowercased singular used for lookups, e.g. `post`.
    pub singular: String,

    /// Collection field name, e.g. `posts`.
    pub plural: String,

    /// Count field name, e.g. `postCount`.
    pub count: String,

    /// Field-lookup field name, e.g. `postBy`.
    pub by: String,

    /// Filter input type name, e.g. `PostWhereInput`.
    pub where_input: String,
}

impl EntityNames {
    /// Derives all operation and type names for an entity.
    pub fn derive(type_name: &str) -> Self {
        let singular = type_name.to_lowercase();

        Self {
            type_name: type_name.to_string(),
            plural: format!("{}s", singular),
            count: format!("{}{}", singular, COUNT_SUFFIX),
            by: format!("{}{}", singular, BY_SUFFIX),
            where_input: format!("{}{}", type_name, WHERE_INPUT_SUFFIX),
            singular,
        }
    }
}

/// Validates that derived names are unambiguous across the whole entity list.
///
/// Operation names are case-folded functions of the entity name, so "Post" and "POST" would
/// produce the same query fields. Such documents are rejected rather than silently shadowed.
pub fn check_entity_names(entities: &[EntityType]) -> Result<(), ContractError> {
    for (index, entity) in entities.iter().enumerate() {
        let folded = entity.name.to_lowercase();

        if folded == "query" {
            return Err(ContractError::ReservedEntityName(entity.name.clone()));
        }

        for other in &entities[index + 1..] {
            if other.name.to_lowercase() == folded {
                return Err(ContractError::AmbiguousEntityName(
                    entity.name.clone(),
                    other.name.clone(),
                ));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{check_entity_names, EntityNames};
    use crate::sdl::EntityType;

    fn entity(name: &str) -> EntityType {
        EntityType {
            name: name.to_string(),
            fields: Vec::new(),
        }
    }

    #[test]
    fn derives_all_names() {
        let names = EntityNames::derive("Post");

        assert_eq!(names.singular, "post");
        assert_eq!(names.plural, "posts");
        assert_eq!(names.count, "postCount");
        assert_eq!(names.by, "postBy");
        assert_eq!(names.where_input, "PostWhereInput");
    }

    #[test]
    fn pluralization_is_naive_suffix() {
        // No irregular-plural handling, on purpose
        assert_eq!(EntityNames::derive("Status").plural, "statuss");
    }

    #[test]
    fn detects_case_fold_collisions() {
        let result = check_entity_names(&[entity("Post"), entity("POST")]);
        assert!(result.is_err());

        let result = check_entity_names(&[entity("Post"), entity("Author")]);
        assert!(result.is_ok());
    }

    #[test]
    fn rejects_reserved_name() {
        assert!(check_entity_names(&[entity("query")]).is_err());
    }
}
