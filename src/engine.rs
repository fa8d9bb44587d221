//! Two-phase run
//!
//! Phase one registers the source record of every projection (and everything
//! reachable from it). Phase two validates the projections. Registration is
//! always complete before any projection is looked at.

use tracing::info;

use crate::config::MetamodelConfig;
use crate::declared::{DeclarationSet, MethodIntrospector};
use crate::diagnostics::Diagnostics;
use crate::fingerprint::Fingerprint;
use crate::projection::{ProjectionMetadataGraph, ProjectionValidator};
use crate::registry::SchemaRegistry;
use crate::error::Result;

/// Everything a run produced
#[derive(Debug)]
pub struct MetamodelRun {
    pub registry: SchemaRegistry,
    pub graph: ProjectionMetadataGraph,
    /// Registration diagnostics followed by validation diagnostics
    pub diagnostics: Diagnostics,
}

impl MetamodelRun {
    /// No errors, and no warnings either when `fail_on_warnings` is set
    pub fn is_success(&self, fail_on_warnings: bool) -> bool {
        !self.diagnostics.has_errors() && !(fail_on_warnings && self.diagnostics.has_warnings())
    }

    pub fn fingerprint(&self) -> Result<Fingerprint> {
        self.graph.fingerprint()
    }
}

/// Runs registration and validation over a declaration set
#[derive(Debug, Clone, Default)]
pub struct MetamodelEngine {
    config: MetamodelConfig,
}

impl MetamodelEngine {
    pub fn new(config: MetamodelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MetamodelConfig {
        &self.config
    }

    /// Phase one only: register every projection source
    pub fn register(&self, set: &DeclarationSet) -> (SchemaRegistry, Diagnostics) {
        let mut registry = SchemaRegistry::from_declarations(set, &self.config.schema);
        let diagnostics = registry.register_roots(set.projections.iter().map(|p| &p.source_record_name));
        (registry, diagnostics)
    }

    /// Both phases, with candidate methods taken from the declaration set
    pub fn run(&self, set: &DeclarationSet) -> MetamodelRun {
        let catalog = set.method_catalog();
        self.run_with(set, &catalog)
    }

    /// Both phases, with a caller-supplied method introspector
    pub fn run_with(&self, set: &DeclarationSet, introspector: &dyn MethodIntrospector) -> MetamodelRun {
        info!(
            records = set.records.len(),
            projections = set.projections.len(),
            "starting metamodel run"
        );

        let (registry, mut diagnostics) = self.register(set);

        let validator = ProjectionValidator::new(&registry, introspector, &self.config.validation);
        let (graph, validation) = validator.validate_all(&set.projections);
        diagnostics.merge(validation);

        MetamodelRun {
            registry,
            graph,
            diagnostics,
        }
    }
}
