//! Projection Metamodel
//!
//! Static resolution and compatibility checking for declarative projections
//! (DTOs) over entity and embeddable records. No data is touched: the engine
//! reads record and projection declarations, resolves every mapped path, and
//! checks types, reducers and computation methods.
//!
//! ## Pipeline
//!
//! ```text
//! DeclarationSet ──► SchemaRegistry ──► PathResolver ──► ProjectionValidator ──► ProjectionMetadataGraph
//!  (records,          (records +          (dotted paths)     (mappings, computed       (+ Diagnostics)
//!   projections,       embeddables)                            fields, methods)
//!   methods)
//! ```
//!
//! ## Example
//!
//! ```
//! use projection_metamodel::{
//!     CandidateMethod, DeclarationSet, DeclaredComputedField, DeclaredField, DeclaredProjection,
//!     DeclaredRecord, MetamodelEngine,
//! };
//!
//! let set = DeclarationSet::new()
//!     .with_record(
//!         DeclaredRecord::entity("app.User")
//!             .with_field(DeclaredField::id("id", "long"))
//!             .with_field(DeclaredField::new("firstName", "String"))
//!             .with_field(DeclaredField::new("lastName", "String")),
//!     )
//!     .with_projection(
//!         DeclaredProjection::new("app.UserDto", "app.User")
//!             .provider("app.UserComputations")
//!             .computed(DeclaredComputedField::new("fullName", "String", ["firstName", "lastName"])),
//!     )
//!     .with_method(CandidateMethod::new(
//!         "app.UserComputations",
//!         "toFullName",
//!         "String",
//!         ["String", "String"],
//!     ));
//!
//! let run = MetamodelEngine::default().run(&set);
//! assert!(run.diagnostics.is_empty());
//! let computed = run.graph.get("app.UserDto").unwrap().computed_field("fullName").unwrap();
//! assert_eq!(computed.method.name, "toFullName");
//! ```

pub mod compatibility;
pub mod config;
pub mod declared;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod naming;
pub mod projection;
pub mod registry;
pub mod resolve;
pub mod schema;
pub mod types;

pub use compatibility::{classify, is_assignable, Assignability, CompatibilityChecker, ReturnTypePolicy};
pub use config::{MetamodelConfig, OutputFormat};
pub use declared::{
    CandidateMethod, DeclarationSet, DeclaredComputedField, DeclaredDirectField, DeclaredField,
    DeclaredProjection, DeclaredProvider, DeclaredRecord, MethodCatalog, MethodIntrospector,
};
pub use diagnostics::{DiagnosticCode, DiagnosticItem, Diagnostics, Severity};
pub use engine::{MetamodelEngine, MetamodelRun};
pub use error::{MetamodelError, Result};
pub use fingerprint::Fingerprint;
pub use projection::{
    ComputedField, DirectMapping, MethodRef, ProjectionMetadata, ProjectionMetadataGraph,
    ProjectionValidator, ProviderRef, ReducerBinding,
};
pub use registry::SchemaRegistry;
pub use resolve::{PathError, PathResolver, ResolvedType};
pub use schema::{CollectionInfo, ContainerShape, ElementKind, FieldDescriptor, FieldKind, RecordSchema};
pub use types::{PrimitiveKind, ScalarCatalogue, TypeRef};
