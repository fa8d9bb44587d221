//! Declaration feed
//!
//! The plain records, projections and candidate methods handed over by a
//! discovery front end. The engine never looks at source constructs; it only
//! reads these values, either built in code or loaded from JSON documents.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{MetamodelError, Result};

// =============================================================================
// Records
// =============================================================================

/// A record type as declared in source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredRecord {
    pub type_name: String,
    #[serde(default)]
    pub is_entity_root: bool,
    #[serde(default)]
    pub is_embeddable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub super_type_name: Option<String>,
    /// Several identifier fields form one declared composite key
    #[serde(default)]
    pub has_composite_identifier: bool,
    #[serde(default)]
    pub fields: Vec<DeclaredField>,
}

impl DeclaredRecord {
    pub fn entity(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            is_entity_root: true,
            is_embeddable: false,
            super_type_name: None,
            has_composite_identifier: false,
            fields: Vec::new(),
        }
    }

    pub fn embeddable(type_name: impl Into<String>) -> Self {
        Self {
            is_entity_root: false,
            is_embeddable: true,
            ..Self::entity(type_name)
        }
    }

    /// Neither entity nor embeddable: a mapped superclass or plain base type
    pub fn base(type_name: impl Into<String>) -> Self {
        Self {
            is_entity_root: false,
            ..Self::entity(type_name)
        }
    }

    pub fn extends(mut self, super_type: impl Into<String>) -> Self {
        self.super_type_name = Some(super_type.into());
        self
    }

    pub fn composite_identifier(mut self) -> Self {
        self.has_composite_identifier = true;
        self
    }

    pub fn with_field(mut self, field: DeclaredField) -> Self {
        self.fields.push(field);
        self
    }
}

/// A field as declared on a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredField {
    pub name: String,
    #[serde(default)]
    pub is_transient: bool,
    #[serde(default)]
    pub is_identifier: bool,
    #[serde(default)]
    pub is_embedded_identifier: bool,
    #[serde(default)]
    pub is_embedded: bool,
    #[serde(default)]
    pub is_collection: bool,
    pub declared_type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generic_element_type_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse_field_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering_expression: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapped_identifier_field: Option<String>,
}

impl DeclaredField {
    pub fn new(name: impl Into<String>, declared_type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_transient: false,
            is_identifier: false,
            is_embedded_identifier: false,
            is_embedded: false,
            is_collection: false,
            declared_type_name: declared_type_name.into(),
            generic_element_type_name: None,
            inverse_field_name: None,
            ordering_expression: None,
            mapped_identifier_field: None,
        }
    }

    pub fn id(name: impl Into<String>, declared_type_name: impl Into<String>) -> Self {
        Self {
            is_identifier: true,
            ..Self::new(name, declared_type_name)
        }
    }

    pub fn embedded(name: impl Into<String>, declared_type_name: impl Into<String>) -> Self {
        Self {
            is_embedded: true,
            ..Self::new(name, declared_type_name)
        }
    }

    pub fn embedded_id(name: impl Into<String>, declared_type_name: impl Into<String>) -> Self {
        Self {
            is_embedded_identifier: true,
            ..Self::new(name, declared_type_name)
        }
    }

    /// `container` is the raw container (`java.util.List`), `element` its argument
    pub fn collection(name: impl Into<String>, container: &str, element: impl Into<String>) -> Self {
        let element = element.into();
        Self {
            is_collection: true,
            generic_element_type_name: Some(element.clone()),
            ..Self::new(name, format!("{}<{}>", container, element))
        }
    }

    pub fn transient(mut self) -> Self {
        self.is_transient = true;
        self
    }

    pub fn inverse(mut self, field: impl Into<String>) -> Self {
        self.inverse_field_name = Some(field.into());
        self
    }

    pub fn ordered_by(mut self, expression: impl Into<String>) -> Self {
        self.ordering_expression = Some(expression.into());
        self
    }

    pub fn maps_identifier(mut self, field: impl Into<String>) -> Self {
        self.mapped_identifier_field = Some(field.into());
        self
    }
}

// =============================================================================
// Projections
// =============================================================================

/// A projection (DTO) declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredProjection {
    pub dto_name: String,
    pub source_record_name: String,
    #[serde(default)]
    pub providers: Vec<DeclaredProvider>,
    #[serde(default)]
    pub direct_fields: Vec<DeclaredDirectField>,
    #[serde(default)]
    pub computed_fields: Vec<DeclaredComputedField>,
}

impl DeclaredProjection {
    pub fn new(dto_name: impl Into<String>, source_record_name: impl Into<String>) -> Self {
        Self {
            dto_name: dto_name.into(),
            source_record_name: source_record_name.into(),
            providers: Vec::new(),
            direct_fields: Vec::new(),
            computed_fields: Vec::new(),
        }
    }

    pub fn provider(mut self, type_name: impl Into<String>) -> Self {
        self.providers.push(DeclaredProvider {
            type_name: type_name.into(),
            bean_id: None,
        });
        self
    }

    pub fn bean_provider(mut self, type_name: impl Into<String>, bean_id: impl Into<String>) -> Self {
        self.providers.push(DeclaredProvider {
            type_name: type_name.into(),
            bean_id: Some(bean_id.into()),
        });
        self
    }

    pub fn direct(
        mut self,
        target_field_name: impl Into<String>,
        source_path: impl Into<String>,
        declared_target_type_name: impl Into<String>,
    ) -> Self {
        self.direct_fields.push(DeclaredDirectField {
            target_field_name: target_field_name.into(),
            source_path: source_path.into(),
            declared_target_type_name: declared_target_type_name.into(),
        });
        self
    }

    pub fn computed(mut self, field: DeclaredComputedField) -> Self {
        self.computed_fields.push(field);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredProvider {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bean_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredDirectField {
    pub target_field_name: String,
    pub source_path: String,
    pub declared_target_type_name: String,
}

/// A computed field; dependency order is parameter order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredComputedField {
    pub target_field_name: String,
    #[serde(default)]
    pub dependency_paths: Vec<String>,
    #[serde(default)]
    pub reducer_names: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_method_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explicit_method_name: Option<String>,
    pub declared_return_type_name: String,
}

impl DeclaredComputedField {
    pub fn new<I, S>(
        target_field_name: impl Into<String>,
        declared_return_type_name: impl Into<String>,
        dependency_paths: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_field_name: target_field_name.into(),
            dependency_paths: dependency_paths.into_iter().map(Into::into).collect(),
            reducer_names: Vec::new(),
            explicit_method_type: None,
            explicit_method_name: None,
            declared_return_type_name: declared_return_type_name.into(),
        }
    }

    pub fn reducers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reducer_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn method_type(mut self, owner: impl Into<String>) -> Self {
        self.explicit_method_type = Some(owner.into());
        self
    }

    pub fn method_name(mut self, name: impl Into<String>) -> Self {
        self.explicit_method_name = Some(name.into());
        self
    }
}

// =============================================================================
// Candidate Methods
// =============================================================================

/// A method directly declared on a provider type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMethod {
    pub owner_type_name: String,
    pub method_name: String,
    pub return_type_name: String,
    #[serde(default)]
    pub parameter_type_names: Vec<String>,
}

impl CandidateMethod {
    pub fn new<I, S>(
        owner_type_name: impl Into<String>,
        method_name: impl Into<String>,
        return_type_name: impl Into<String>,
        parameter_type_names: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            owner_type_name: owner_type_name.into(),
            method_name: method_name.into(),
            return_type_name: return_type_name.into(),
            parameter_type_names: parameter_type_names.into_iter().map(Into::into).collect(),
        }
    }
}

/// Source of candidate methods, queried per provider type
pub trait MethodIntrospector {
    /// Methods declared directly on `owner`, in declaration order.
    /// `None` when the type is unknown to the introspector.
    fn declared_methods(&self, owner: &str) -> Option<&[CandidateMethod]>;
}

/// In-memory [`MethodIntrospector`] grouped by owner type
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodCatalog {
    by_owner: BTreeMap<String, Vec<CandidateMethod>>,
}

impl MethodCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, method: CandidateMethod) {
        self.by_owner
            .entry(method.owner_type_name.clone())
            .or_default()
            .push(method);
    }

    pub fn owners(&self) -> impl Iterator<Item = &str> {
        self.by_owner.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_owner.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_owner.is_empty()
    }
}

impl FromIterator<CandidateMethod> for MethodCatalog {
    fn from_iter<T: IntoIterator<Item = CandidateMethod>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for method in iter {
            catalog.add(method);
        }
        catalog
    }
}

impl MethodIntrospector for MethodCatalog {
    fn declared_methods(&self, owner: &str) -> Option<&[CandidateMethod]> {
        self.by_owner.get(owner).map(Vec::as_slice)
    }
}

// =============================================================================
// Declaration Set
// =============================================================================

/// Everything a discovery pass produced for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclarationSet {
    /// Extra leaf types (enums, converter-mapped types)
    #[serde(default)]
    pub scalar_types: Vec<String>,
    #[serde(default)]
    pub records: Vec<DeclaredRecord>,
    #[serde(default)]
    pub projections: Vec<DeclaredProjection>,
    #[serde(default)]
    pub methods: Vec<CandidateMethod>,
}

impl DeclarationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load one JSON declaration document
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(MetamodelError::NotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| MetamodelError::InvalidDeclarations {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load and merge every `*.json` document under `dir`, in path order
    pub fn load_from_directory(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            return Err(MetamodelError::NotFound(dir.to_path_buf()));
        }

        let mut set = Self::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() || path.extension().map_or(true, |e| e != "json") {
                continue;
            }
            debug!(path = %path.display(), "loading declarations");
            set.merge(Self::load_from_file(path)?);
        }
        Ok(set)
    }

    /// File or directory, whichever `path` is
    pub fn load(path: &Path) -> Result<Self> {
        if path.is_dir() {
            Self::load_from_directory(path)
        } else {
            Self::load_from_file(path)
        }
    }

    /// Append another set's declarations after this one's
    pub fn merge(&mut self, other: DeclarationSet) {
        self.scalar_types.extend(other.scalar_types);
        self.records.extend(other.records);
        self.projections.extend(other.projections);
        self.methods.extend(other.methods);
    }

    pub fn with_scalar(mut self, name: impl Into<String>) -> Self {
        self.scalar_types.push(name.into());
        self
    }

    pub fn with_record(mut self, record: DeclaredRecord) -> Self {
        self.records.push(record);
        self
    }

    pub fn with_projection(mut self, projection: DeclaredProjection) -> Self {
        self.projections.push(projection);
        self
    }

    pub fn with_method(mut self, method: CandidateMethod) -> Self {
        self.methods.push(method);
        self
    }

    pub fn method_catalog(&self) -> MethodCatalog {
        self.methods.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const USER_DOC: &str = r#"{
        "records": [
            {
                "typeName": "com.acme.User",
                "isEntityRoot": true,
                "fields": [
                    { "name": "id", "isIdentifier": true, "declaredTypeName": "java.lang.Long" },
                    { "name": "firstName", "declaredTypeName": "java.lang.String" }
                ]
            }
        ],
        "projections": [
            {
                "dtoName": "com.acme.UserDto",
                "sourceRecordName": "com.acme.User",
                "providers": [{ "typeName": "com.acme.UserComputations" }],
                "directFields": [
                    { "targetFieldName": "name", "sourcePath": "firstName", "declaredTargetTypeName": "String" }
                ]
            }
        ]
    }"#;

    const METHODS_DOC: &str = r#"{
        "methods": [
            {
                "ownerTypeName": "com.acme.UserComputations",
                "methodName": "toName",
                "returnTypeName": "String",
                "parameterTypeNames": ["String"]
            }
        ]
    }"#;

    #[test]
    fn test_parse_defaults() {
        let set = DeclarationSet::from_json_str(USER_DOC).unwrap();
        assert_eq!(set.records.len(), 1);
        let record = &set.records[0];
        assert!(record.is_entity_root);
        assert!(!record.is_embeddable);
        assert!(!record.fields[1].is_transient);
        assert_eq!(set.projections[0].providers[0].bean_id, None);
        assert!(set.projections[0].computed_fields.is_empty());
    }

    #[test]
    fn test_load_directory_sorted_and_merged() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b_methods.json"), METHODS_DOC).unwrap();
        fs::write(dir.path().join("a_user.json"), USER_DOC).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let set = DeclarationSet::load_from_directory(dir.path()).unwrap();
        assert_eq!(set.records.len(), 1);
        assert_eq!(set.methods.len(), 1);

        let catalog = set.method_catalog();
        let methods = catalog.declared_methods("com.acme.UserComputations").unwrap();
        assert_eq!(methods[0].method_name, "toName");
        assert!(catalog.declared_methods("com.acme.Missing").is_none());
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.json");
        assert!(matches!(
            DeclarationSet::load_from_file(&missing),
            Err(MetamodelError::NotFound(_))
        ));

        let broken = dir.path().join("broken.json");
        fs::write(&broken, "{ not json").unwrap();
        assert!(matches!(
            DeclarationSet::load_from_file(&broken),
            Err(MetamodelError::InvalidDeclarations { .. })
        ));
    }

    #[test]
    fn test_builders() {
        let field = DeclaredField::collection("orders", "java.util.List", "com.acme.Order").inverse("user");
        assert!(field.is_collection);
        assert_eq!(field.declared_type_name, "java.util.List<com.acme.Order>");
        assert_eq!(field.generic_element_type_name.as_deref(), Some("com.acme.Order"));

        let computed = DeclaredComputedField::new("total", "java.math.BigDecimal", ["orders.amount"]).reducers(["SUM"]);
        assert_eq!(computed.reducer_names, vec!["SUM".to_string()]);
    }
}
