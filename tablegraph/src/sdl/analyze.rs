// SPDX-License-Identifier: AGPL-3.0-or-later

use std::fmt::Write;

use async_graphql::parser::parse_schema;
use async_graphql::parser::types::{
    BaseType, ServiceDocument, Type, TypeDefinition, TypeKind, TypeSystemDefinition,
};

use crate::sdl::errors::SdlError;
use crate::sdl::{EntityField, EntityType, FieldKind, ScalarKind};

/// Reserved name of the root query type, never treated as an entity.
pub const ROOT_QUERY_TYPE: &str = "Query";

fn parse(sdl: &str) -> Result<ServiceDocument, SdlError> {
    parse_schema(sdl).map_err(|err| SdlError::Malformed(err.to_string()))
}

/// Removes any author-supplied root `Query` type from a schema document and re-serializes the
/// remaining type definitions.
///
/// Serialization is deterministic, so applying this twice yields the same bytes as applying it
/// once. Descriptions and directives are not carried over as they play no role in the derived
/// contract.
pub fn strip_root_query(sdl: &str) -> Result<String, SdlError> {
    let document = parse(sdl)?;

    let mut output = String::new();
    for definition in &document.definitions {
        let type_definition = match definition {
            TypeSystemDefinition::Type(type_definition) => &type_definition.node,
            // Schema and directive declarations have no bearing on the entity list
            _ => continue,
        };

        if matches!(type_definition.kind, TypeKind::Object(_))
            && type_definition.name.node.as_str() == ROOT_QUERY_TYPE
        {
            continue;
        }

        if !output.is_empty() {
            output.push('\n');
        }
        write_definition(&mut output, type_definition);
    }

    Ok(output)
}

/// Extracts all entity types from a schema document in declaration order.
///
/// Non-object declarations (scalars, inputs, enums) and the root `Query` type are skipped. The
/// declaration order is preserved since it determines the ordering of synthesized fields.
pub fn list_entities(sdl: &str) -> Result<Vec<EntityType>, SdlError> {
    let document = parse(sdl)?;
    let mut entities = Vec::new();

    for definition in &document.definitions {
        let type_definition = match definition {
            TypeSystemDefinition::Type(type_definition) => &type_definition.node,
            _ => continue,
        };

        let object = match &type_definition.kind {
            TypeKind::Object(object) => object,
            _ => continue,
        };

        let name = type_definition.name.node.to_string();
        if name == ROOT_QUERY_TYPE {
            continue;
        }

        let mut fields: Vec<EntityField> = Vec::with_capacity(object.fields.len());
        for field in &object.fields {
            let field_name = field.node.name.node.to_string();
            if fields.iter().any(|existing| existing.name == field_name) {
                return Err(SdlError::Malformed(format!(
                    "duplicate field '{}' on type '{}'",
                    field_name, name
                )));
            }
            fields.push(entity_field(field_name, &field.node.ty.node));
        }

        entities.push(EntityType { name, fields });
    }

    Ok(entities)
}

/// Converts a parsed field type into our entity field representation.
fn entity_field(name: String, ty: &Type) -> EntityField {
    let mut list = false;
    let mut base = ty;
    let nullable = ty.nullable;

    // Unwrap (possibly nested) list types down to the named item type
    let type_name = loop {
        match &base.base {
            BaseType::Named(named) => break named.to_string(),
            BaseType::List(inner) => {
                list = true;
                base = inner;
            }
        }
    };

    let kind = match ScalarKind::from_name(&type_name) {
        Some(scalar) => FieldKind::Scalar(scalar),
        None => FieldKind::Relation(type_name),
    };

    EntityField {
        name,
        kind,
        nullable,
        list,
    }
}

/// Writes one type definition back out as SDL.
fn write_definition(output: &mut String, definition: &TypeDefinition) {
    let name = definition.name.node.as_str();

    match &definition.kind {
        TypeKind::Scalar => {
            let _ = writeln!(output, "scalar {}", name);
        }
        TypeKind::Object(object) => {
            let _ = write!(output, "type {}", name);
            write_implements(output, &object.implements);
            let _ = writeln!(output, " {{");
            for field in &object.fields {
                let _ = writeln!(output, "  {}: {}", field.node.name.node, field.node.ty.node);
            }
            let _ = writeln!(output, "}}");
        }
        TypeKind::Interface(interface) => {
            let _ = write!(output, "interface {}", name);
            write_implements(output, &interface.implements);
            let _ = writeln!(output, " {{");
            for field in &interface.fields {
                let _ = writeln!(output, "  {}: {}", field.node.name.node, field.node.ty.node);
            }
            let _ = writeln!(output, "}}");
        }
        TypeKind::Union(union_type) => {
            let members: Vec<&str> = union_type
                .members
                .iter()
                .map(|member| member.node.as_str())
                .collect();
            let _ = writeln!(output, "union {} = {}", name, members.join(" | "));
        }
        TypeKind::Enum(enum_type) => {
            let _ = writeln!(output, "enum {} {{", name);
            for value in &enum_type.values {
                let _ = writeln!(output, "  {}", value.node.value.node);
            }
            let _ = writeln!(output, "}}");
        }
        TypeKind::InputObject(input) => {
            let _ = writeln!(output, "input {} {{", name);
            for field in &input.fields {
                match &field.node.default_value {
                    Some(default) => {
                        let _ = writeln!(
                            output,
                            "  {}: {} = {}",
                            field.node.name.node, field.node.ty.node, default.node
                        );
                    }
                    None => {
                        let _ = writeln!(
                            output,
                            "  {}: {}",
                            field.node.name.node, field.node.ty.node
                        );
                    }
                }
            }
            let _ = writeln!(output, "}}");
        }
    }
}

fn write_implements(output: &mut String, implements: &[async_graphql::Positioned<async_graphql::Name>]) {
    if implements.is_empty() {
        return;
    }

    let names: Vec<&str> = implements.iter().map(|name| name.node.as_str()).collect();
    let _ = write!(output, " implements {}", names.join(" & "));
}
