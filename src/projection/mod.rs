//! Projection Validator
//!
//! Checks every declared projection against a populated
//! [`SchemaRegistry`](crate::registry::SchemaRegistry):
//!
//! 1. the source record must be registered
//! 2. each direct mapping must resolve and be type compatible
//! 3. each computed field must resolve its dependencies, pair a reducer with
//!    every collection-crossing dependency, and bind a provider method
//!
//! Each declaration is checked on its own: a failing field is reported and
//! left out of the metadata, and its siblings carry on.

pub mod metadata;
pub mod methods;

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::compatibility::CompatibilityChecker;
use crate::config::ValidationConfig;
use crate::declared::{DeclaredComputedField, DeclaredDirectField, DeclaredProjection, MethodIntrospector};
use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::naming::{computed_method_name, last_segment};
use crate::registry::SchemaRegistry;
use crate::resolve::{PathError, PathResolver, ResolvedType};
use crate::schema::{CollectionInfo, ContainerShape, ElementKind};
use crate::types::TypeRef;

pub use metadata::{
    ComputedField, DirectMapping, MethodRef, ProjectionMetadata, ProjectionMetadataGraph, ProviderRef,
    ReducerBinding,
};
pub use methods::{ExpectedParameter, MethodFailure, MethodQuery, MethodResolver};

/// Source record of every declared projection, first declaration wins
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectionIndex {
    sources: BTreeMap<String, String>,
}

impl ProjectionIndex {
    pub fn new<'p, I>(projections: I) -> Self
    where
        I: IntoIterator<Item = &'p DeclaredProjection>,
    {
        let mut sources = BTreeMap::new();
        for projection in projections {
            sources
                .entry(projection.dto_name.clone())
                .or_insert_with(|| projection.source_record_name.clone());
        }
        Self { sources }
    }

    pub fn source_of(&self, dto_name: &str) -> Option<&str> {
        self.sources.get(dto_name).map(String::as_str)
    }
}

/// Validates projections against a registry and a method introspector
pub struct ProjectionValidator<'a> {
    registry: &'a SchemaRegistry,
    introspector: &'a dyn MethodIntrospector,
    config: &'a ValidationConfig,
    checker: CompatibilityChecker,
}

impl<'a> ProjectionValidator<'a> {
    pub fn new(
        registry: &'a SchemaRegistry,
        introspector: &'a dyn MethodIntrospector,
        config: &'a ValidationConfig,
    ) -> Self {
        Self {
            registry,
            introspector,
            config,
            checker: config.checker(),
        }
    }

    fn resolver(&self) -> PathResolver<'a> {
        self.registry.resolver()
    }

    /// Validate all projections in declaration order
    pub fn validate_all(&self, projections: &[DeclaredProjection]) -> (ProjectionMetadataGraph, Diagnostics) {
        info!(projections = projections.len(), "validating projections");

        let index = ProjectionIndex::new(projections);
        let mut graph = ProjectionMetadataGraph::new();
        let mut diagnostics = Diagnostics::new();
        let mut seen = BTreeSet::new();

        for projection in projections {
            if !seen.insert(projection.dto_name.as_str()) {
                diagnostics.push(DiagnosticItem::new(
                    &projection.dto_name,
                    DiagnosticCode::DuplicateProjection,
                    format!(
                        "Projection {} is declared more than once; the first declaration is used",
                        projection.dto_name
                    ),
                ));
                continue;
            }

            let (metadata, diags) = self.validate(projection, &index);
            diagnostics.merge(diags);
            if let Some(metadata) = metadata {
                graph.insert(metadata);
            }
        }

        info!(
            validated = graph.len(),
            errors = diagnostics.error_count(),
            warnings = diagnostics.warning_count(),
            "validation complete"
        );
        (graph, diagnostics)
    }

    /// Validate one projection. Metadata is `None` only when the source
    /// record is unknown.
    pub fn validate(
        &self,
        projection: &DeclaredProjection,
        index: &ProjectionIndex,
    ) -> (Option<ProjectionMetadata>, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let dto = projection.dto_name.as_str();
        let source = projection.source_record_name.as_str();

        if self.registry.record(source).is_none() {
            diagnostics.report(
                dto,
                DiagnosticCode::UnknownRecord,
                format!("Unknown record {} for projection {}", source, dto),
            );
            return (None, diagnostics);
        }

        let mut metadata = ProjectionMetadata::new(dto, source);
        metadata.providers = projection
            .providers
            .iter()
            .map(|p| ProviderRef {
                type_name: p.type_name.clone(),
                bean_id: p.bean_id.clone(),
            })
            .collect();

        for field in &projection.direct_fields {
            if let Some(mapping) = self.validate_direct(projection, field, index, &mut diagnostics) {
                debug!(projection = %dto, field = %mapping.target_field, "direct mapping accepted");
                metadata.direct_mappings.push(mapping);
            }
        }

        for field in &projection.computed_fields {
            if let Some(computed) = self.validate_computed(projection, field, &mut diagnostics) {
                debug!(
                    projection = %dto,
                    field = %computed.target_field,
                    method = %computed.method.name,
                    "computed field bound"
                );
                metadata.computed_fields.push(computed);
            }
        }

        (Some(metadata), diagnostics)
    }

    // =========================================================================
    // Direct mappings
    // =========================================================================

    fn validate_direct(
        &self,
        projection: &DeclaredProjection,
        field: &DeclaredDirectField,
        index: &ProjectionIndex,
        diagnostics: &mut Diagnostics,
    ) -> Option<DirectMapping> {
        let dto = projection.dto_name.as_str();
        let declared = TypeRef::parse(&field.declared_target_type_name);

        let resolved = match self.resolver().resolve(&projection.source_record_name, &field.source_path) {
            Ok(resolved) => resolved,
            Err(err) => {
                diagnostics.push(path_diagnostic(dto, &field.target_field_name, err));
                return None;
            }
        };

        let target_shape = declared.container_shape();
        let target_type = match target_shape {
            Some(_) => declared
                .element_type()
                .cloned()
                .unwrap_or_else(|| TypeRef::named("java.lang.Object")),
            None => declared.clone(),
        };

        let nested_projection = index
            .source_of(&target_type.raw_name())
            .map(|nested_source| (target_type.raw_name(), nested_source));

        let compatible = match nested_projection {
            Some((_, nested_source)) => nested_source_matches(nested_source, target_shape, &resolved),
            None => self.checker.is_assignable(&declared, &resolved.type_ref),
        };

        if !compatible {
            let message = match nested_projection {
                Some((ref nested, nested_source)) => format!(
                    "Field '{}' uses projection {} over {}, but path '{}' resolves to {}",
                    field.target_field_name, nested, nested_source, field.source_path, resolved.type_ref
                ),
                None => format!(
                    "Type mismatch for field '{}': declared {}, but path '{}' resolves to {}",
                    field.target_field_name, declared, field.source_path, resolved.type_ref
                ),
            };
            diagnostics.push(
                DiagnosticItem::new(dto, DiagnosticCode::ProjectedTypeMismatch, message)
                    .on(&field.target_field_name),
            );
            return None;
        }

        // Shape and element kind describe the declared target; inverse and
        // ordering come from the source collection.
        let collection = target_shape.map(|shape| {
            let element_kind = if self.registry.scalars().contains(&target_type) {
                ElementKind::Scalar
            } else {
                ElementKind::Unknown
            };
            let source = resolved.collection.as_ref();
            CollectionInfo::new(element_kind, shape)
                .with_inverse(source.and_then(|c| c.inverse_field_name.clone()))
                .with_ordering(source.and_then(|c| c.ordering_expression.clone()))
        });

        Some(DirectMapping {
            target_field: field.target_field_name.clone(),
            source_path: field.source_path.clone(),
            target_type,
            collection,
            nested_projection: nested_projection.map(|(nested, _)| nested),
        })
    }

    // =========================================================================
    // Computed fields
    // =========================================================================

    fn validate_computed(
        &self,
        projection: &DeclaredProjection,
        field: &DeclaredComputedField,
        diagnostics: &mut Diagnostics,
    ) -> Option<ComputedField> {
        let dto = projection.dto_name.as_str();
        let target = field.target_field_name.as_str();
        let providers: Vec<String> = match &field.explicit_method_type {
            Some(owner) => vec![owner.clone()],
            None => projection.providers.iter().map(|p| p.type_name.clone()).collect(),
        };

        if field.dependency_paths.is_empty() {
            diagnostics.push(provider_context(
                DiagnosticItem::new(
                    dto,
                    DiagnosticCode::NoDependenciesDeclared,
                    format!("Computed field '{}' declares no dependencies", target),
                )
                .on(target),
                &providers,
            ));
            return None;
        }

        let mut resolved = Vec::with_capacity(field.dependency_paths.len());
        for path in &field.dependency_paths {
            match self.resolver().resolve(&projection.source_record_name, path) {
                Ok(r) => resolved.push(r),
                Err(err) => {
                    diagnostics.push(provider_context(path_diagnostic(dto, target, err), &providers));
                    return None;
                }
            }
        }

        let reducers = self.bind_reducers(dto, field, &resolved, &providers, diagnostics)?;

        let return_type = TypeRef::parse(&field.declared_return_type_name);
        let query = MethodQuery {
            name: field
                .explicit_method_name
                .clone()
                .unwrap_or_else(|| computed_method_name(&self.config.method_prefix, target)),
            return_type: return_type.clone(),
            parameters: field
                .dependency_paths
                .iter()
                .zip(&resolved)
                .map(|(path, r)| ExpectedParameter {
                    type_ref: r.type_ref.clone(),
                    name: last_segment(path).to_string(),
                })
                .collect(),
        };

        let resolver = MethodResolver::new(self.introspector, self.checker);
        match resolver.resolve(dto, target, &query, &providers, diagnostics) {
            Ok(method) => Some(ComputedField {
                target_field: target.to_string(),
                return_type,
                dependencies: field.dependency_paths.clone(),
                reducers,
                method,
            }),
            Err(failure) => {
                diagnostics.push(
                    provider_context(
                        DiagnosticItem::new(dto, failure.code(), failure.to_string()).on(target),
                        &providers,
                    )
                    .with_context(format!("Expected computing method: {}", query.expected_signature())),
                );
                None
            }
        }
    }

    /// Pair reducers, left to right, with the collection-crossing dependencies
    fn bind_reducers(
        &self,
        dto: &str,
        field: &DeclaredComputedField,
        resolved: &[ResolvedType],
        providers: &[String],
        diagnostics: &mut Diagnostics,
    ) -> Option<Vec<ReducerBinding>> {
        let target = field.target_field_name.as_str();
        let crossing: Vec<usize> = resolved
            .iter()
            .enumerate()
            .filter(|(_, r)| r.crosses_collection)
            .map(|(i, _)| i)
            .collect();

        if field.reducer_names.len() != crossing.len() {
            let paths: Vec<&str> = crossing
                .iter()
                .map(|&i| field.dependency_paths[i].as_str())
                .collect();
            diagnostics.push(provider_context(
                DiagnosticItem::new(
                    dto,
                    DiagnosticCode::ReducerCountMismatch,
                    format!(
                        "reducers count ({}) must match collection dependency count ({}). Collection dependencies: [{}]",
                        field.reducer_names.len(),
                        crossing.len(),
                        paths.join(", ")
                    ),
                )
                .on(target),
                providers,
            ));
            return None;
        }

        let unknown: Vec<&String> = field
            .reducer_names
            .iter()
            .filter(|r| !self.config.is_reducer_allowed(r))
            .collect();
        for reducer in &unknown {
            diagnostics.push(
                provider_context(
                    DiagnosticItem::new(
                        dto,
                        DiagnosticCode::UnknownReducer,
                        format!("Unknown reducer '{}' on computed field '{}'", reducer, target),
                    )
                    .on(target),
                    providers,
                )
                .with_context(format!("Allowed reducers: {}", self.config.allowed_reducers.join(", "))),
            );
        }
        if !unknown.is_empty() {
            return None;
        }

        Some(
            crossing
                .into_iter()
                .zip(&field.reducer_names)
                .map(|(dependency_index, reducer)| ReducerBinding {
                    dependency_index,
                    reducer: reducer.clone(),
                })
                .collect(),
        )
    }
}

/// Nested projection source vs the resolved value, container shapes included
fn nested_source_matches(nested_source: &str, target_shape: Option<ContainerShape>, resolved: &ResolvedType) -> bool {
    let found_shape = resolved.collection.as_ref().map(|c| c.container_shape);
    let shapes_agree = match (target_shape, found_shape) {
        (None, None) => true,
        (Some(ContainerShape::GenericCollection), Some(_)) => true,
        (Some(target), Some(found)) => target == found,
        _ => false,
    };

    let found_type = resolved.element_type().unwrap_or(&resolved.type_ref);
    shapes_agree && found_type.raw_name() == nested_source
}

fn path_diagnostic(dto: &str, element: &str, err: PathError) -> DiagnosticItem {
    DiagnosticItem::new(dto, err.code(), err.to_string()).on(element)
}

/// `Source:` and `Providers:` lines carried by every computed-field failure
fn provider_context(item: DiagnosticItem, providers: &[String]) -> DiagnosticItem {
    let providers_line = if providers.is_empty() {
        "<undefined provider>".to_string()
    } else {
        providers.join(", ")
    };
    let source = item.subject.clone();
    item.with_context(format!("Source: {}", source))
        .with_context(format!("Providers: {}", providers_line))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::declared::{CandidateMethod, DeclaredField, DeclaredRecord, MethodCatalog};
    use crate::types::ScalarCatalogue;

    fn registry() -> SchemaRegistry {
        let mut registry = SchemaRegistry::new(
            vec![
                DeclaredRecord::entity("app.User")
                    .with_field(DeclaredField::id("id", "long"))
                    .with_field(DeclaredField::new("firstName", "String"))
                    .with_field(DeclaredField::new("age", "int"))
                    .with_field(DeclaredField::embedded("address", "app.Address"))
                    .with_field(DeclaredField::collection("orders", "java.util.List", "app.Order"))
                    .with_field(DeclaredField::collection("tags", "java.util.Set", "String")),
                DeclaredRecord::embeddable("app.Address").with_field(DeclaredField::new("city", "String")),
                DeclaredRecord::entity("app.Order")
                    .with_field(DeclaredField::id("id", "long"))
                    .with_field(DeclaredField::new("amount", "java.math.BigDecimal")),
            ],
            ScalarCatalogue::builtin(),
        );
        registry.register_roots(["app.User"]);
        registry
    }

    fn run(projections: &[DeclaredProjection], catalog: &MethodCatalog) -> (ProjectionMetadataGraph, Diagnostics) {
        let registry = registry();
        let config = ValidationConfig::default();
        ProjectionValidator::new(&registry, catalog, &config).validate_all(projections)
    }

    #[test]
    fn test_direct_mappings() {
        let projection = DeclaredProjection::new("app.UserDto", "app.User")
            .direct("name", "firstName", "String")
            .direct("age", "age", "long")
            .direct("city", "address.city", "java.lang.String")
            .direct("narrow", "id", "int");

        let (graph, diags) = run(&[projection], &MethodCatalog::new());
        let dto = graph.get("app.UserDto").unwrap();
        assert_eq!(dto.direct_mappings.len(), 3);
        assert_eq!(diags.with_code(DiagnosticCode::ProjectedTypeMismatch).count(), 1);
        assert_eq!(diags.all()[0].element.as_deref(), Some("narrow"));
    }

    #[test]
    fn test_unknown_source_record() {
        let (graph, diags) = run(&[DeclaredProjection::new("app.Dto", "app.Nope")], &MethodCatalog::new());
        assert!(graph.is_empty());
        assert!(diags.contains(DiagnosticCode::UnknownRecord));
    }

    #[test]
    fn test_nested_projection_collection() {
        let projections = [
            DeclaredProjection::new("app.UserDto", "app.User")
                .direct("orders", "orders", "java.util.List<app.OrderDto>")
                .direct("wrongShape", "orders", "java.util.Set<app.OrderDto>"),
            DeclaredProjection::new("app.OrderDto", "app.Order").direct("amount", "amount", "java.math.BigDecimal"),
        ];

        let (graph, diags) = run(&projections, &MethodCatalog::new());
        let mapping = graph.get("app.UserDto").unwrap().direct_mapping("orders").unwrap();
        assert_eq!(mapping.nested_projection.as_deref(), Some("app.OrderDto"));
        assert_eq!(mapping.target_type, TypeRef::named("app.OrderDto"));
        let info = mapping.collection.as_ref().unwrap();
        assert_eq!(info.container_shape, ContainerShape::List);
        assert_eq!(info.element_kind, ElementKind::Unknown);
        assert_eq!(diags.with_code(DiagnosticCode::ProjectedTypeMismatch).count(), 1);
    }

    #[test]
    fn test_collection_target_element_kind() {
        let projection = DeclaredProjection::new("app.UserDto", "app.User")
            .direct("tags", "tags", "java.util.Set<String>")
            .direct("tagSet", "tags", "java.util.Set<java.lang.String>");

        let (graph, diags) = run(&[projection], &MethodCatalog::new());
        assert!(diags.is_empty(), "{}", diags);
        let dto = graph.get("app.UserDto").unwrap();

        let tags = dto.direct_mapping("tags").unwrap().collection.as_ref().unwrap();
        assert_eq!(tags.element_kind, ElementKind::Scalar);
        assert_eq!(tags.container_shape, ContainerShape::Set);
        assert_eq!(dto.direct_mapping("tagSet").unwrap().collection.as_ref(), Some(tags));
    }

    #[test]
    fn test_every_computed_failure_names_providers() {
        let projection = DeclaredProjection::new("app.UserDto", "app.User")
            .provider("app.Calc")
            .provider("app.Fallback")
            .computed(DeclaredComputedField::new("broken", "int", ["firstName.length"]))
            .computed(DeclaredComputedField::new("total", "int", ["orders.amount"]))
            .computed(DeclaredComputedField::new("avg", "int", ["orders.amount"]).reducers(["MEDIAN"]))
            .computed(DeclaredComputedField::new("empty", "int", Vec::<String>::new()))
            .computed(DeclaredComputedField::new("pinned", "int", ["orders"]).method_type("app.Pinned"));

        let (_, diags) = run(&[projection], &MethodCatalog::new());
        let context_of = |code: DiagnosticCode| diags.with_code(code).next().unwrap().context.clone();

        let expected = vec!["Source: app.UserDto".to_string(), "Providers: app.Calc, app.Fallback".to_string()];
        assert_eq!(context_of(DiagnosticCode::CannotNavigateThroughScalar), expected);
        assert_eq!(context_of(DiagnosticCode::ReducerCountMismatch), expected);
        assert_eq!(context_of(DiagnosticCode::NoDependenciesDeclared), expected);
        assert_eq!(context_of(DiagnosticCode::UnknownReducer)[..2], expected[..]);
        assert_eq!(context_of(DiagnosticCode::NoMatchingComputationMethod)[1], "Providers: app.Pinned");
    }

    #[test]
    fn test_computed_reducer_binding() {
        let catalog: MethodCatalog = [CandidateMethod::new(
            "app.Calc",
            "toScore",
            "java.math.BigDecimal",
            ["int", "java.math.BigDecimal"],
        )]
        .into_iter()
        .collect();
        let projection = DeclaredProjection::new("app.UserDto", "app.User")
            .provider("app.Calc")
            .computed(DeclaredComputedField::new("score", "java.math.BigDecimal", ["age", "orders.amount"]).reducers(["SUM"]));

        let (graph, diags) = run(&[projection], &catalog);
        assert!(diags.is_empty(), "{}", diags);
        let computed = graph.get("app.UserDto").unwrap().computed_field("score").unwrap();
        assert_eq!(computed.reducers, vec![ReducerBinding { dependency_index: 1, reducer: "SUM".to_string() }]);
        assert_eq!(computed.method.name, "toScore");
    }

    #[test]
    fn test_unknown_reducer() {
        let projection = DeclaredProjection::new("app.UserDto", "app.User")
            .computed(DeclaredComputedField::new("score", "int", ["orders.amount"]).reducers(["MEDIAN"]));
        let (_, diags) = run(&[projection], &MethodCatalog::new());
        assert_eq!(diags.error_count(), 1);
        assert!(diags.contains(DiagnosticCode::UnknownReducer));
    }

    #[test]
    fn test_method_failure_context() {
        let projection = DeclaredProjection::new("app.UserDto", "app.User")
            .computed(DeclaredComputedField::new("label", "String", ["firstName", "address.city"]));
        let (graph, diags) = run(&[projection], &MethodCatalog::new());

        assert!(graph.get("app.UserDto").unwrap().computed_fields.is_empty());
        let item = diags.with_code(DiagnosticCode::NoMatchingComputationMethod).next().unwrap();
        assert_eq!(
            item.context,
            vec![
                "Source: app.UserDto".to_string(),
                "Providers: <undefined provider>".to_string(),
                "Expected computing method: public java.lang.String toLabel(java.lang.String firstName, java.lang.String city);"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_explicit_method_type_and_name() {
        let catalog: MethodCatalog = [
            CandidateMethod::new("app.Provider", "toLabel", "String", ["String"]),
            CandidateMethod::new("app.Other", "label", "String", ["String"]),
        ]
        .into_iter()
        .collect();
        let projection = DeclaredProjection::new("app.UserDto", "app.User")
            .provider("app.Provider")
            .computed(
                DeclaredComputedField::new("label", "String", ["firstName"])
                    .method_type("app.Other")
                    .method_name("label"),
            );

        let (graph, diags) = run(&[projection], &catalog);
        assert!(diags.is_empty());
        let method = &graph.get("app.UserDto").unwrap().computed_fields[0].method;
        assert_eq!(method, &MethodRef { owner: "app.Other".to_string(), name: "label".to_string() });
    }

    #[test]
    fn test_duplicate_projection() {
        let projections = [
            DeclaredProjection::new("app.UserDto", "app.User").direct("name", "firstName", "String"),
            DeclaredProjection::new("app.UserDto", "app.Order"),
        ];
        let (graph, diags) = run(&projections, &MethodCatalog::new());
        assert_eq!(graph.get("app.UserDto").unwrap().source_record, "app.User");
        assert!(diags.contains(DiagnosticCode::DuplicateProjection));
    }
}
