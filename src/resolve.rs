//! Path Resolver
//!
//! Walks a dotted path (`orders.customer.name`) from a root record through the
//! registry. Every segment but the last must name a navigable field; the last
//! segment gives the resolved type.

use serde::Serialize;
use thiserror::Error;

use crate::diagnostics::DiagnosticCode;
use crate::naming::PATH_DELIMITER;
use crate::registry::SchemaRegistry;
use crate::schema::{CollectionInfo, ElementKind, FieldDescriptor, FieldKind, RecordSchema};
use crate::types::TypeRef;

/// Why a path could not be resolved
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("Unknown record {0}")]
    UnknownRecord(String),

    #[error("Field '{segment}' not found in {record} (path: {path})")]
    UnknownField {
        segment: String,
        record: String,
        path: String,
    },

    #[error("Cannot navigate through scalar field '{segment}' in {record} (path: {path})")]
    CannotNavigateThroughScalar {
        segment: String,
        record: String,
        path: String,
    },

    #[error("Invalid path '{0}': empty path or segment")]
    EmptyPath(String),
}

impl PathError {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::UnknownRecord(_) => DiagnosticCode::UnknownRecord,
            Self::UnknownField { .. } => DiagnosticCode::UnknownField,
            Self::CannotNavigateThroughScalar { .. } => DiagnosticCode::CannotNavigateThroughScalar,
            Self::EmptyPath(_) => DiagnosticCode::InvalidPath,
        }
    }
}

/// Type at the end of a resolved path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedType {
    /// `java.util.List<a.B>` for a collection, the declared type otherwise
    pub type_ref: TypeRef,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionInfo>,
    /// Record declaring the final field
    pub owner: String,
    /// A non-final segment is a collection
    pub crosses_collection: bool,
}

impl ResolvedType {
    pub fn is_collection(&self) -> bool {
        self.kind == FieldKind::Collection
    }

    /// Element type when the final field is a collection
    pub fn element_type(&self) -> Option<&TypeRef> {
        if self.is_collection() {
            self.type_ref.element_type()
        } else {
            None
        }
    }
}

/// Resolves paths against a populated registry
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    registry: &'a SchemaRegistry,
}

impl<'a> PathResolver<'a> {
    pub fn new(registry: &'a SchemaRegistry) -> Self {
        Self { registry }
    }

    /// Resolve `path` starting at `root`
    pub fn resolve(&self, root: &str, path: &str) -> Result<ResolvedType, PathError> {
        let segments = split_path(path)?;
        let mut current: &RecordSchema = self
            .registry
            .lookup(root)
            .ok_or_else(|| PathError::UnknownRecord(root.to_string()))?;
        let mut crosses_collection = false;

        let (last, intermediate) = match segments.split_last() {
            Some(parts) => parts,
            None => return Err(PathError::EmptyPath(path.to_string())),
        };

        for (i, segment) in intermediate.iter().enumerate() {
            let field = field_of(current, segment, path)?;

            let related = match (&field.kind, &field.related_type) {
                (FieldKind::Scalar | FieldKind::Identifier, _) | (_, None) => None,
                (_, Some(related)) if self.holds_scalars(field, related) => None,
                (kind, Some(related)) => {
                    crosses_collection |= *kind == FieldKind::Collection;
                    Some(related)
                }
            };
            let Some(related) = related else {
                return Err(PathError::CannotNavigateThroughScalar {
                    segment: segment.to_string(),
                    record: current.type_name.clone(),
                    path: path.to_string(),
                });
            };

            current = match self.registry.lookup(related) {
                Some(next) => next,
                None => {
                    // Walked into a type the registry does not describe
                    return Err(PathError::UnknownField {
                        segment: segments[i + 1].to_string(),
                        record: related.clone(),
                        path: path.to_string(),
                    });
                }
            };
        }

        let field = field_of(current, last, path)?;
        let (type_ref, collection) = match (&field.collection, field.element_type()) {
            (Some(info), Some(element)) => (
                TypeRef::collection_of(info.container_shape, element),
                Some(info.clone()),
            ),
            _ => (field.declared_type.clone(), None),
        };

        Ok(ResolvedType {
            type_ref,
            kind: field.kind,
            collection,
            owner: current.type_name.clone(),
            crosses_collection,
        })
    }

    /// Whether a non-final segment of `path` is a collection. Only the
    /// intermediate segments are walked; the final segment never counts and
    /// need not exist. The walk stops at the first segment it cannot follow.
    pub fn crosses_collection(&self, root: &str, path: &str) -> bool {
        let Ok(segments) = split_path(path) else {
            return false;
        };
        let Some((_, intermediate)) = segments.split_last() else {
            return false;
        };
        let Some(mut current) = self.registry.lookup(root) else {
            return false;
        };

        for segment in intermediate {
            let Some(field) = current.field(segment) else {
                return false;
            };
            if field.kind == FieldKind::Collection {
                return true;
            }
            match field.related_type.as_deref().and_then(|r| self.registry.lookup(r)) {
                Some(next) if field.kind.is_structural() => current = next,
                _ => return false,
            }
        }
        false
    }

    /// A collection of scalars, or a field whose related type is a scalar
    fn holds_scalars(&self, field: &FieldDescriptor, related: &str) -> bool {
        let scalar_elements = field
            .collection
            .as_ref()
            .is_some_and(|info| info.element_kind == ElementKind::Scalar);
        scalar_elements || self.registry.scalars().contains_name(related)
    }
}

fn split_path(path: &str) -> Result<Vec<&str>, PathError> {
    let segments: Vec<&str> = path.trim().split(PATH_DELIMITER).map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(PathError::EmptyPath(path.to_string()));
    }
    Ok(segments)
}

fn field_of<'r>(
    record: &'r RecordSchema,
    segment: &str,
    path: &str,
) -> Result<&'r FieldDescriptor, PathError> {
    record.field(segment).ok_or_else(|| PathError::UnknownField {
        segment: segment.to_string(),
        record: record.type_name.clone(),
        path: path.to_string(),
    })
}
