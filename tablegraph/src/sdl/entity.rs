// SPDX-License-Identifier: AGPL-3.0-or-later

/// Scalar kinds which can receive comparison operators in derived filter inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Boolean,
    Id,
}

impl ScalarKind {
    /// Maps an SDL type name onto a scalar kind, `None` for everything else.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "String" => Some(ScalarKind::String),
            "Int" => Some(ScalarKind::Int),
            "Float" => Some(ScalarKind::Float),
            "Boolean" => Some(ScalarKind::Boolean),
            "ID" => Some(ScalarKind::Id),
            _ => None,
        }
    }

    /// Returns the SDL spelling of this scalar kind.
    pub fn sdl_name(&self) -> &'static str {
        match self {
            ScalarKind::String => "String",
            ScalarKind::Int => "Int",
            ScalarKind::Float => "Float",
            ScalarKind::Boolean => "Boolean",
            ScalarKind::Id => "ID",
        }
    }
}

/// What a field points at: a scalar value or another declared entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Relation(String),
}

/// A single field declared on an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityField {
    pub name: String,
    pub kind: FieldKind,
    pub nullable: bool,
    pub list: bool,
}

impl EntityField {
    /// Returns the scalar kind when this is a non-list scalar field.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.kind {
            FieldKind::Scalar(kind) if !self.list => Some(kind),
            _ => None,
        }
    }

    /// Returns the target entity name when this is a relation field.
    pub fn relation_target(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Relation(target) => Some(target),
            FieldKind::Scalar(_) => None,
        }
    }
}

/// An object type declared by a tenant, mapping 1:1 to a physical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityType {
    pub name: String,
    pub fields: Vec<EntityField>,
}

impl EntityType {
    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&EntityField> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Looks up a declared non-list scalar field by name.
    pub fn scalar_field(&self, name: &str) -> Option<&EntityField> {
        self.field(name).filter(|field| field.scalar_kind().is_some())
    }
}
