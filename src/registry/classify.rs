//! Field Classification
//!
//! Decides what a declared field becomes in the registered schema. The
//! decision consumes two facts:
//! - the field's own declaration flags (identifier, embedded, collection)
//! - the category of the type it names (scalar, entity root, embeddable)
//!
//! Rules are checked top to bottom and the first hit wins, so the table is
//! total and each row can be tested on its own.

use serde::{Deserialize, Serialize};

use crate::declared::DeclaredField;
use crate::schema::ElementKind;

// =============================================================================
// Type Category
// =============================================================================

/// What the registry knows about a referenced type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    /// Built-in, configured or declared leaf type
    Scalar,
    EntityRoot,
    Embeddable,
    /// Declared nowhere, or declared as neither root nor embeddable
    Other,
}

// =============================================================================
// Field Class
// =============================================================================

/// Outcome of classifying one declared field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    Identifier,
    /// Composite key held in an embeddable
    EmbeddedIdentifier,
    Embedded,
    /// Declared embedded but the target is not embeddable
    NotEmbeddable { identifier: bool },
    Collection,
    Association,
    Scalar,
}

impl FieldClass {
    pub fn is_error(&self) -> bool {
        matches!(self, Self::NotEmbeddable { .. })
    }
}

/// Classify a field against the category of its declared type.
///
/// | # | condition                         | class                    |
/// |---|-----------------------------------|--------------------------|
/// | 1 | identifier                        | Identifier               |
/// | 2 | embedded identifier, embeddable   | EmbeddedIdentifier       |
/// | 3 | embedded identifier, otherwise    | NotEmbeddable (id)       |
/// | 4 | embedded, embeddable              | Embedded                 |
/// | 5 | embedded, otherwise               | NotEmbeddable            |
/// | 6 | collection                        | Collection               |
/// | 7 | scalar type                       | Scalar                   |
/// | 8 | entity root type                  | Association              |
/// | 9 | embeddable type                   | Embedded                 |
/// | 10| anything else                     | Scalar                   |
pub fn classify_field(field: &DeclaredField, target: TypeCategory) -> FieldClass {
    if field.is_identifier {
        return FieldClass::Identifier;
    }

    if field.is_embedded_identifier {
        return match target {
            TypeCategory::Embeddable => FieldClass::EmbeddedIdentifier,
            _ => FieldClass::NotEmbeddable { identifier: true },
        };
    }

    if field.is_embedded {
        return match target {
            TypeCategory::Embeddable => FieldClass::Embedded,
            _ => FieldClass::NotEmbeddable { identifier: false },
        };
    }

    if field.is_collection {
        return FieldClass::Collection;
    }

    match target {
        TypeCategory::Scalar | TypeCategory::Other => FieldClass::Scalar,
        TypeCategory::EntityRoot => FieldClass::Association,
        TypeCategory::Embeddable => FieldClass::Embedded,
    }
}

/// Element kind of a collection from its element type's category
pub fn classify_element(element: TypeCategory) -> ElementKind {
    match element {
        TypeCategory::Scalar => ElementKind::Scalar,
        TypeCategory::EntityRoot => ElementKind::AssociationEntity,
        TypeCategory::Embeddable => ElementKind::Embeddable,
        TypeCategory::Other => ElementKind::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field() -> DeclaredField {
        DeclaredField::new("f", "com.acme.T")
    }

    #[test]
    fn test_identifier_wins_over_everything() {
        let mut f = field();
        f.is_identifier = true;
        f.is_embedded = true;
        f.is_collection = true;
        assert_eq!(classify_field(&f, TypeCategory::Embeddable), FieldClass::Identifier);
    }

    #[test]
    fn test_embedded_identifier() {
        let f = DeclaredField::embedded_id("id", "com.acme.OrderKey");
        assert_eq!(classify_field(&f, TypeCategory::Embeddable), FieldClass::EmbeddedIdentifier);
        assert_eq!(
            classify_field(&f, TypeCategory::EntityRoot),
            FieldClass::NotEmbeddable { identifier: true }
        );
    }

    #[test]
    fn test_embedded_requires_embeddable() {
        let f = DeclaredField::embedded("address", "com.acme.Address");
        assert_eq!(classify_field(&f, TypeCategory::Embeddable), FieldClass::Embedded);
        assert_eq!(
            classify_field(&f, TypeCategory::Scalar),
            FieldClass::NotEmbeddable { identifier: false }
        );
        assert!(classify_field(&f, TypeCategory::Other).is_error());
    }

    #[test]
    fn test_collection_before_type_category() {
        let f = DeclaredField::collection("orders", "java.util.List", "com.acme.Order");
        assert_eq!(classify_field(&f, TypeCategory::Other), FieldClass::Collection);
    }

    #[test]
    fn test_plain_fields_by_category() {
        let f = field();
        assert_eq!(classify_field(&f, TypeCategory::Scalar), FieldClass::Scalar);
        assert_eq!(classify_field(&f, TypeCategory::EntityRoot), FieldClass::Association);
        assert_eq!(classify_field(&f, TypeCategory::Embeddable), FieldClass::Embedded);
        assert_eq!(classify_field(&f, TypeCategory::Other), FieldClass::Scalar);
    }

    #[test]
    fn test_element_kinds() {
        assert_eq!(classify_element(TypeCategory::Scalar), ElementKind::Scalar);
        assert_eq!(classify_element(TypeCategory::EntityRoot), ElementKind::AssociationEntity);
        assert_eq!(classify_element(TypeCategory::Embeddable), ElementKind::Embeddable);
        assert_eq!(classify_element(TypeCategory::Other), ElementKind::Unknown);
    }
}
