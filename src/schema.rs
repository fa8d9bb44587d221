//! Schema model
//!
//! Plain values describing registered records and their fields. Built once by
//! the [`SchemaRegistry`](crate::registry::SchemaRegistry), read-only after.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::types::TypeRef;

/// Kind of a registered field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldKind {
    Scalar,
    Identifier,
    Embedded,
    Association,
    Collection,
}

impl FieldKind {
    /// Kinds that carry a related type and can be walked through
    pub fn is_structural(&self) -> bool {
        matches!(self, Self::Embedded | Self::Association | Self::Collection)
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Scalar => "SCALAR",
            Self::Identifier => "IDENTIFIER",
            Self::Embedded => "EMBEDDED",
            Self::Association => "ASSOCIATION",
            Self::Collection => "COLLECTION",
        };
        write!(f, "{}", s)
    }
}

/// What a collection holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElementKind {
    Scalar,
    AssociationEntity,
    Embeddable,
    Unknown,
}

/// Container interface of a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerShape {
    List,
    Set,
    Map,
    GenericCollection,
    Unknown,
}

impl ContainerShape {
    /// Recognise a container by raw type name, qualified or simple
    pub fn from_container_name(raw: &str) -> Option<Self> {
        match raw.strip_prefix("java.util.").unwrap_or(raw) {
            "List" => Some(Self::List),
            "Set" => Some(Self::Set),
            "Map" => Some(Self::Map),
            "Collection" => Some(Self::GenericCollection),
            _ => None,
        }
    }

    /// Canonical container used when rebuilding a collection type
    pub fn container_name(&self) -> &'static str {
        match self {
            Self::List => "java.util.List",
            Self::Set => "java.util.Set",
            Self::Map => "java.util.Map",
            Self::GenericCollection | Self::Unknown => "java.util.Collection",
        }
    }
}

/// Shape and metadata of a collection-valued field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    pub element_kind: ElementKind,
    pub container_shape: ContainerShape,
    /// Back-reference field on the element type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_field_name: Option<String>,
    /// `None` or empty means default ordering
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering_expression: Option<String>,
}

impl CollectionInfo {
    pub fn new(element_kind: ElementKind, container_shape: ContainerShape) -> Self {
        Self {
            element_kind,
            container_shape,
            inverse_field_name: None,
            ordering_expression: None,
        }
    }

    pub fn with_inverse(mut self, inverse: Option<String>) -> Self {
        self.inverse_field_name = inverse;
        self
    }

    pub fn with_ordering(mut self, ordering: Option<String>) -> Self {
        self.ordering_expression = ordering;
        self
    }
}

/// A registered field
///
/// `related_type` is present exactly for structural kinds, `collection`
/// exactly for [`FieldKind::Collection`]. The constructors keep both in step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Type as declared on the record
    pub declared_type: TypeRef,
    /// Type navigated into: the embeddable, the associated entity, or the element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_type: Option<String>,
    /// Part of the record's identity (plain or embedded identifier)
    #[serde(default)]
    pub is_identifier: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_identifier_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionInfo>,
}

impl FieldDescriptor {
    fn base(name: impl Into<String>, kind: FieldKind, declared_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            kind,
            declared_type,
            related_type: None,
            is_identifier: false,
            mapped_identifier_field: None,
            collection: None,
        }
    }

    pub fn scalar(name: impl Into<String>, declared_type: TypeRef) -> Self {
        Self::base(name, FieldKind::Scalar, declared_type)
    }

    pub fn identifier(name: impl Into<String>, declared_type: TypeRef) -> Self {
        let mut field = Self::base(name, FieldKind::Identifier, declared_type);
        field.is_identifier = true;
        field
    }

    pub fn embedded(name: impl Into<String>, declared_type: TypeRef) -> Self {
        let related = declared_type.raw_name();
        let mut field = Self::base(name, FieldKind::Embedded, declared_type);
        field.related_type = Some(related);
        field
    }

    /// Composite key: navigable like an embedded field, counted as identifier
    pub fn embedded_identifier(name: impl Into<String>, declared_type: TypeRef) -> Self {
        let mut field = Self::embedded(name, declared_type);
        field.is_identifier = true;
        field
    }

    pub fn association(name: impl Into<String>, declared_type: TypeRef) -> Self {
        let related = declared_type.raw_name();
        let mut field = Self::base(name, FieldKind::Association, declared_type);
        field.related_type = Some(related);
        field
    }

    pub fn collection(
        name: impl Into<String>,
        declared_type: TypeRef,
        element_type: &TypeRef,
        info: CollectionInfo,
    ) -> Self {
        let mut field = Self::base(name, FieldKind::Collection, declared_type);
        field.related_type = Some(element_type.canonical_name());
        field.collection = Some(info);
        field
    }

    pub fn with_mapped_identifier(mut self, mapped: Option<String>) -> Self {
        self.mapped_identifier_field = mapped;
        self
    }

    /// Whether a path may continue past this field
    pub fn is_navigable(&self) -> bool {
        self.related_type.is_some()
    }

    pub fn is_collection(&self) -> bool {
        self.kind == FieldKind::Collection
    }

    /// Element type of a collection field
    pub fn element_type(&self) -> Option<TypeRef> {
        if self.is_collection() {
            self.related_type.as_deref().map(TypeRef::parse)
        } else {
            None
        }
    }
}

/// Whether a record can be a projection source or only nested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordRole {
    Entity,
    Embeddable,
}

/// Ordered field table of one record type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSchema {
    pub type_name: String,
    pub role: RecordRole,
    fields: Vec<FieldDescriptor>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl RecordSchema {
    pub fn new(type_name: impl Into<String>, role: RecordRole) -> Self {
        Self {
            type_name: type_name.into(),
            role,
            fields: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Append a field. Returns `false` and keeps the existing entry if the name
    /// is already present.
    pub fn insert(&mut self, field: FieldDescriptor) -> bool {
        if self.index.contains_key(&field.name) {
            return false;
        }
        self.index.insert(field.name.clone(), self.fields.len());
        self.fields.push(field);
        true
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.index.get(name).map(|&i| &self.fields[i])
    }

    /// Fields in declaration order, most-derived type first
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn identifier_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.is_identifier)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
