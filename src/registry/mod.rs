//! Schema Registry
//!
//! Builds the field tables of every record reachable from the requested
//! projection roots. Registration is insert-only: a type registered once is
//! never rebuilt, so calling [`SchemaRegistry::register_roots`] again with the
//! same names is a no-op.
//!
//! Two disjoint tables are kept, one for entity roots (possible projection
//! sources) and one for embeddables (only reachable through a field).

pub mod classify;

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::SchemaConfig;
use crate::declared::{DeclarationSet, DeclaredField, DeclaredRecord};
use crate::diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics};
use crate::resolve::PathResolver;
use crate::schema::{CollectionInfo, ContainerShape, ElementKind, FieldDescriptor, RecordRole, RecordSchema};
use crate::types::{ScalarCatalogue, TypeRef};

pub use classify::{classify_element, classify_field, FieldClass, TypeCategory};

/// Registered record and embeddable schemas
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    /// Every declared record, keyed by type name; first declaration wins
    declared: BTreeMap<String, DeclaredRecord>,
    scalars: ScalarCatalogue,
    universal_base_type: String,
    records: BTreeMap<String, RecordSchema>,
    embeddables: BTreeMap<String, RecordSchema>,
}

/// Serialisable view of the registered tables
#[derive(Debug, Serialize)]
pub struct RegistrySnapshot<'a> {
    pub records: Vec<&'a RecordSchema>,
    pub embeddables: Vec<&'a RecordSchema>,
}

impl SchemaRegistry {
    /// Create an empty registry over the given declarations
    pub fn new<I>(declared: I, scalars: ScalarCatalogue) -> Self
    where
        I: IntoIterator<Item = DeclaredRecord>,
    {
        let mut registry = Self {
            declared: BTreeMap::new(),
            scalars,
            universal_base_type: "java.lang.Object".to_string(),
            records: BTreeMap::new(),
            embeddables: BTreeMap::new(),
        };
        for record in declared {
            registry.declare(record);
        }
        registry
    }

    /// Registry for a declaration set, with configured and declared scalars
    pub fn from_declarations(set: &DeclarationSet, config: &SchemaConfig) -> Self {
        let mut scalars = config.scalar_catalogue();
        scalars.extend(&set.scalar_types);
        Self::new(set.records.iter().cloned(), scalars)
            .with_universal_base_type(config.universal_base_type.clone())
    }

    pub fn with_universal_base_type(mut self, base: impl Into<String>) -> Self {
        self.universal_base_type = base.into();
        self
    }

    /// Make more record declarations available to later registration passes.
    /// A name that is already declared keeps its first declaration.
    pub fn declare(&mut self, record: DeclaredRecord) -> bool {
        if self.declared.contains_key(&record.type_name) {
            debug!(record = %record.type_name, "duplicate record declaration ignored");
            return false;
        }
        self.declared.insert(record.type_name.clone(), record);
        true
    }

    /// Register each named root and everything reachable from it.
    ///
    /// Names that are not declared entity roots are skipped; projections over
    /// them fail later with an unknown-record diagnostic.
    pub fn register_roots<I, S>(&mut self, roots: I) -> Diagnostics
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let Self {
            declared,
            scalars,
            universal_base_type,
            records,
            embeddables,
        } = self;

        let mut pass = RegistrationPass {
            declared: &*declared,
            scalars: &*scalars,
            universal_base_type: universal_base_type.as_str(),
            records,
            embeddables,
            pending: roots.into_iter().map(|r| r.as_ref().to_string()).collect(),
            in_progress: BTreeSet::new(),
            diagnostics: Diagnostics::new(),
        };

        info!(roots = pass.pending.len(), "registering roots");
        pass.drain();
        info!(
            records = pass.records.len(),
            embeddables = pass.embeddables.len(),
            "registration complete"
        );
        pass.diagnostics
    }

    /// Record schema by type name, roots first, then embeddables
    pub fn lookup(&self, type_name: &str) -> Option<&RecordSchema> {
        self.records
            .get(type_name)
            .or_else(|| self.embeddables.get(type_name))
    }

    /// Registered entity root
    pub fn record(&self, type_name: &str) -> Option<&RecordSchema> {
        self.records.get(type_name)
    }

    pub fn embeddable(&self, type_name: &str) -> Option<&RecordSchema> {
        self.embeddables.get(type_name)
    }

    pub fn is_root(&self, type_name: &str) -> bool {
        self.records.contains_key(type_name)
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordSchema> {
        self.records.values()
    }

    pub fn embeddables(&self) -> impl Iterator<Item = &RecordSchema> {
        self.embeddables.values()
    }

    pub fn scalars(&self) -> &ScalarCatalogue {
        &self.scalars
    }

    pub fn len(&self) -> usize {
        self.records.len() + self.embeddables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.embeddables.is_empty()
    }

    pub fn resolver(&self) -> PathResolver<'_> {
        PathResolver::new(self)
    }

    pub fn snapshot(&self) -> RegistrySnapshot<'_> {
        RegistrySnapshot {
            records: self.records.values().collect(),
            embeddables: self.embeddables.values().collect(),
        }
    }
}

// =============================================================================
// Registration Pass
// =============================================================================

/// State of one `register_roots` call
struct RegistrationPass<'a> {
    declared: &'a BTreeMap<String, DeclaredRecord>,
    scalars: &'a ScalarCatalogue,
    universal_base_type: &'a str,
    records: &'a mut BTreeMap<String, RecordSchema>,
    embeddables: &'a mut BTreeMap<String, RecordSchema>,
    pending: VecDeque<String>,
    /// Embeddables whose fields are being built right now
    in_progress: BTreeSet<String>,
    diagnostics: Diagnostics,
}

impl<'a> RegistrationPass<'a> {
    fn drain(&mut self) {
        while let Some(name) = self.pending.pop_front() {
            if self.records.contains_key(&name) {
                continue;
            }

            let declared = self.declared;
            let Some(record) = declared.get(&name) else {
                debug!(record = %name, "root is not declared, skipping");
                continue;
            };
            if !record.is_entity_root {
                debug!(record = %name, "root is not an entity, skipping");
                continue;
            }

            let (schema, composite) = self.build(record, RecordRole::Entity);
            self.check_identifiers(&schema, composite);
            debug!(record = %name, fields = schema.len(), "registered entity");
            self.records.insert(name, schema);
        }
    }

    fn register_embeddable(&mut self, name: &str) {
        if self.embeddables.contains_key(name) || self.in_progress.contains(name) {
            return;
        }

        let declared = self.declared;
        let Some(record) = declared.get(name) else {
            return;
        };

        self.in_progress.insert(name.to_string());
        let (schema, _) = self.build(record, RecordRole::Embeddable);
        self.in_progress.remove(name);

        debug!(embeddable = %name, fields = schema.len(), "registered embeddable");
        self.embeddables.insert(name.to_string(), schema);
    }

    /// Build the field table, walking the superclass chain. Returns the schema
    /// and whether any type in the chain declares a composite identifier.
    fn build(&mut self, record: &'a DeclaredRecord, role: RecordRole) -> (RecordSchema, bool) {
        let mut schema = RecordSchema::new(&record.type_name, role);
        let mut composite = false;

        for (owner, field) in self.hierarchy_fields(record) {
            composite |= owner.has_composite_identifier;
            if schema.field(&field.name).is_some() {
                continue;
            }
            let descriptor = self.describe(owner, field);
            schema.insert(descriptor);
        }

        (schema, composite || record.has_composite_identifier)
    }

    /// Non-transient fields from the record up to the universal base type,
    /// most-derived first. Stops on an undeclared supertype or a cycle.
    fn hierarchy_fields(&self, record: &'a DeclaredRecord) -> Vec<(&'a DeclaredRecord, &'a DeclaredField)> {
        let declared = self.declared;
        let base = self.universal_base_type;
        let mut visited = BTreeSet::new();
        let mut out = Vec::new();
        let mut current = Some(record);

        while let Some(decl) = current {
            if !visited.insert(decl.type_name.as_str()) {
                break;
            }
            out.extend(
                decl.fields
                    .iter()
                    .filter(|f| !f.is_transient)
                    .map(|f| (decl, f)),
            );
            current = decl
                .super_type_name
                .as_deref()
                .filter(|s| *s != base)
                .and_then(|s| declared.get(s));
        }

        out
    }

    fn category(&self, type_name: &str) -> TypeCategory {
        if self.scalars.contains_name(type_name) {
            return TypeCategory::Scalar;
        }
        match self.declared.get(type_name) {
            Some(r) if r.is_entity_root => TypeCategory::EntityRoot,
            Some(r) if r.is_embeddable => TypeCategory::Embeddable,
            _ => TypeCategory::Other,
        }
    }

    fn describe(&mut self, owner: &DeclaredRecord, field: &DeclaredField) -> FieldDescriptor {
        let declared_type = TypeRef::parse(&field.declared_type_name);
        let target = declared_type.raw_name();

        let descriptor = match classify_field(field, self.category(&target)) {
            FieldClass::Identifier => FieldDescriptor::identifier(&field.name, declared_type),
            FieldClass::EmbeddedIdentifier => {
                self.register_embeddable(&target);
                FieldDescriptor::embedded_identifier(&field.name, declared_type)
            }
            FieldClass::Embedded => {
                self.register_embeddable(&target);
                FieldDescriptor::embedded(&field.name, declared_type)
            }
            FieldClass::NotEmbeddable { identifier } => {
                self.diagnostics.push(
                    DiagnosticItem::new(
                        &owner.type_name,
                        DiagnosticCode::NotEmbeddable,
                        format!(
                            "Field '{}' is declared embedded but {} is not an embeddable type",
                            field.name, target
                        ),
                    )
                    .on(&field.name),
                );
                if identifier {
                    FieldDescriptor::identifier(&field.name, declared_type)
                } else {
                    FieldDescriptor::scalar(&field.name, declared_type)
                }
            }
            FieldClass::Collection => self.describe_collection(field, declared_type),
            FieldClass::Association => {
                self.pending.push_back(target);
                FieldDescriptor::association(&field.name, declared_type)
            }
            FieldClass::Scalar => FieldDescriptor::scalar(&field.name, declared_type),
        };

        descriptor.with_mapped_identifier(field.mapped_identifier_field.clone())
    }

    fn describe_collection(&mut self, field: &DeclaredField, declared_type: TypeRef) -> FieldDescriptor {
        let element = field
            .generic_element_type_name
            .as_deref()
            .map(TypeRef::parse)
            .or_else(|| declared_type.element_type().cloned())
            .unwrap_or_else(|| TypeRef::named(self.universal_base_type));

        let shape = ContainerShape::from_container_name(&declared_type.raw_name())
            .unwrap_or(ContainerShape::Unknown);

        let element_name = element.raw_name();
        let kind = classify_element(self.category(&element_name));
        match kind {
            ElementKind::AssociationEntity => self.pending.push_back(element_name),
            ElementKind::Embeddable => self.register_embeddable(&element_name),
            _ => {}
        }

        let ordering = field
            .ordering_expression
            .clone()
            .filter(|o| !o.trim().is_empty());
        let info = CollectionInfo::new(kind, shape)
            .with_inverse(field.inverse_field_name.clone())
            .with_ordering(ordering);

        FieldDescriptor::collection(&field.name, declared_type, &element, info)
    }

    fn check_identifiers(&mut self, schema: &RecordSchema, composite: bool) {
        let ids: Vec<String> = schema.identifier_fields().map(|f| f.name.clone()).collect();
        if ids.is_empty() {
            warn!(record = %schema.type_name, "no identifier field");
            self.diagnostics.missing_identifier(&schema.type_name);
        } else if ids.len() > 1 && !composite {
            warn!(record = %schema.type_name, count = ids.len(), "ambiguous identifier");
            self.diagnostics.ambiguous_identifier(&schema.type_name, &ids);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind;

    fn declarations() -> Vec<DeclaredRecord> {
        vec![
            DeclaredRecord::base("com.acme.Auditable")
                .with_field(DeclaredField::new("createdBy", "String"))
                .with_field(DeclaredField::new("name", "int")),
            DeclaredRecord::entity("com.acme.User")
                .extends("com.acme.Auditable")
                .with_field(DeclaredField::id("id", "java.lang.Long"))
                .with_field(DeclaredField::new("name", "String"))
                .with_field(DeclaredField::new("cache", "String").transient())
                .with_field(DeclaredField::embedded("address", "com.acme.Address"))
                .with_field(DeclaredField::collection("orders", "java.util.List", "com.acme.Order").inverse("user"))
                .with_field(DeclaredField::collection("tags", "java.util.Set", "String").ordered_by("")),
            DeclaredRecord::embeddable("com.acme.Address")
                .with_field(DeclaredField::new("city", "String"))
                .with_field(DeclaredField::embedded("geo", "com.acme.Geo")),
            DeclaredRecord::embeddable("com.acme.Geo")
                .with_field(DeclaredField::new("lat", "double"))
                .with_field(DeclaredField::embedded("origin", "com.acme.Address")),
            DeclaredRecord::entity("com.acme.Order")
                .with_field(DeclaredField::id("id", "long"))
                .with_field(DeclaredField::new("amount", "java.math.BigDecimal"))
                .with_field(DeclaredField::new("user", "com.acme.User")),
        ]
    }

    fn registry() -> SchemaRegistry {
        SchemaRegistry::new(declarations(), ScalarCatalogue::builtin())
    }

    #[test]
    fn test_register_walks_hierarchy_and_shadows() {
        let mut registry = registry();
        let diags = registry.register_roots(["com.acme.User"]);
        assert!(!diags.has_errors());

        let user = registry.record("com.acme.User").unwrap();
        let names: Vec<_> = user.field_names().collect();
        assert_eq!(names, vec!["id", "name", "address", "orders", "tags", "createdBy"]);
        assert_eq!(user.field("name").unwrap().declared_type.canonical_name(), "java.lang.String");
        assert!(user.field("cache").is_none());
    }

    #[test]
    fn test_associations_expand_transitively() {
        let mut registry = registry();
        registry.register_roots(["com.acme.User"]);

        assert!(registry.is_root("com.acme.Order"));
        let order = registry.record("com.acme.Order").unwrap();
        assert_eq!(order.field("user").unwrap().kind, FieldKind::Association);

        let orders = registry.record("com.acme.User").unwrap().field("orders").unwrap();
        let info = orders.collection.as_ref().unwrap();
        assert_eq!(info.element_kind, ElementKind::AssociationEntity);
        assert_eq!(info.container_shape, ContainerShape::List);
        assert_eq!(info.inverse_field_name.as_deref(), Some("user"));

        let tags = registry.record("com.acme.User").unwrap().field("tags").unwrap();
        let info = tags.collection.as_ref().unwrap();
        assert_eq!(info.element_kind, ElementKind::Scalar);
        assert_eq!(info.ordering_expression, None);
    }

    #[test]
    fn test_mapped_identifier_is_carried() {
        let mut registry = SchemaRegistry::new(
            vec![
                DeclaredRecord::entity("com.acme.Profile")
                    .with_field(DeclaredField::id("userId", "long"))
                    .with_field(DeclaredField::new("user", "com.acme.Account").maps_identifier("userId")),
                DeclaredRecord::entity("com.acme.Account").with_field(DeclaredField::id("id", "long")),
            ],
            ScalarCatalogue::builtin(),
        );
        let diags = registry.register_roots(["com.acme.Profile"]);
        assert!(diags.is_empty(), "{}", diags);

        let profile = registry.record("com.acme.Profile").unwrap();
        let user = profile.field("user").unwrap();
        assert_eq!(user.kind, FieldKind::Association);
        assert_eq!(user.mapped_identifier_field.as_deref(), Some("userId"));
        assert_eq!(profile.field("userId").unwrap().mapped_identifier_field, None);
        assert!(registry.is_root("com.acme.Account"));
    }

    #[test]
    fn test_embeddable_cycle_terminates() {
        let mut registry = registry();
        registry.register_roots(["com.acme.User"]);

        assert!(registry.embeddable("com.acme.Address").is_some());
        assert!(registry.embeddable("com.acme.Geo").is_some());
        let origin = registry.embeddable("com.acme.Geo").unwrap().field("origin").unwrap();
        assert_eq!(origin.kind, FieldKind::Embedded);
        assert_eq!(origin.related_type.as_deref(), Some("com.acme.Address"));
    }

    #[test]
    fn test_registration_is_idempotent() {
        let mut registry = registry();
        registry.register_roots(["com.acme.User"]);
        let before: Vec<RecordSchema> = registry.records().cloned().collect();
        let count = registry.len();

        let diags = registry.register_roots(["com.acme.User", "com.acme.User"]);
        assert!(diags.is_empty());
        assert_eq!(registry.len(), count);
        assert_eq!(registry.records().cloned().collect::<Vec<_>>(), before);
    }

    #[test]
    fn test_unknown_and_non_entity_roots_are_skipped() {
        let mut registry = registry();
        let diags = registry.register_roots(["com.acme.Missing", "com.acme.Address"]);
        assert!(diags.is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_identifier_diagnostics() {
        let mut registry = SchemaRegistry::new(
            vec![
                DeclaredRecord::entity("com.acme.NoId").with_field(DeclaredField::new("x", "int")),
                DeclaredRecord::entity("com.acme.TwoIds")
                    .with_field(DeclaredField::id("a", "int"))
                    .with_field(DeclaredField::id("b", "int")),
                DeclaredRecord::entity("com.acme.Composite")
                    .composite_identifier()
                    .with_field(DeclaredField::id("a", "int"))
                    .with_field(DeclaredField::id("b", "int")),
            ],
            ScalarCatalogue::builtin(),
        );
        let diags = registry.register_roots(["com.acme.NoId", "com.acme.TwoIds", "com.acme.Composite"]);

        assert_eq!(diags.with_code(DiagnosticCode::MissingIdentifier).count(), 1);
        assert_eq!(diags.with_code(DiagnosticCode::AmbiguousIdentifier).count(), 1);
        assert!(!diags.has_errors());
    }

    #[test]
    fn test_not_embeddable_is_reported() {
        let mut registry = SchemaRegistry::new(
            vec![
                DeclaredRecord::entity("com.acme.Invoice")
                    .with_field(DeclaredField::embedded_id("id", "com.acme.Plain"))
                    .with_field(DeclaredField::embedded("total", "java.math.BigDecimal")),
                DeclaredRecord::base("com.acme.Plain"),
            ],
            ScalarCatalogue::builtin(),
        );
        let diags = registry.register_roots(["com.acme.Invoice"]);

        assert_eq!(diags.with_code(DiagnosticCode::NotEmbeddable).count(), 2);
        let invoice = registry.record("com.acme.Invoice").unwrap();
        assert_eq!(invoice.field("id").unwrap().kind, FieldKind::Identifier);
        assert_eq!(invoice.field("total").unwrap().kind, FieldKind::Scalar);
    }

    #[test]
    fn test_superclass_cycle_terminates() {
        let mut registry = SchemaRegistry::new(
            vec![
                DeclaredRecord::entity("com.acme.A")
                    .extends("com.acme.B")
                    .with_field(DeclaredField::id("id", "long")),
                DeclaredRecord::base("com.acme.B")
                    .extends("com.acme.A")
                    .with_field(DeclaredField::new("b", "int")),
            ],
            ScalarCatalogue::builtin(),
        );
        registry.register_roots(["com.acme.A"]);
        assert_eq!(registry.record("com.acme.A").unwrap().len(), 2);
    }
}
