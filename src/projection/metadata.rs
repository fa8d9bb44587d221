//! Projection Metadata Graph
//!
//! The validated output of a run: one entry per projection that resolved its
//! source root, holding the direct mappings and computed fields that passed
//! validation. Failed declarations are left out, so the graph may be partial;
//! the diagnostics say why.

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::schema::CollectionInfo;
use crate::types::TypeRef;

/// Provider type named by a projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRef {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bean_id: Option<String>,
}

/// Target field copied from a source path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectMapping {
    pub target_field: String,
    pub source_path: String,
    /// Element type when the projected value is a collection
    pub target_type: TypeRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection: Option<CollectionInfo>,
    /// Projection used for the value, when the target type is itself a projection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_projection: Option<String>,
}

/// Reducer applied to one collection-crossing dependency
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReducerBinding {
    pub dependency_index: usize,
    pub reducer: String,
}

/// A resolved computation method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRef {
    pub owner: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputedField {
    pub target_field: String,
    pub return_type: TypeRef,
    /// Parameter order
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reducers: Vec<ReducerBinding>,
    pub method: MethodRef,
}

/// Validated metadata of one projection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectionMetadata {
    pub dto_name: String,
    pub source_record: String,
    pub direct_mappings: Vec<DirectMapping>,
    pub computed_fields: Vec<ComputedField>,
    pub providers: Vec<ProviderRef>,
}

impl ProjectionMetadata {
    pub fn new(dto_name: impl Into<String>, source_record: impl Into<String>) -> Self {
        Self {
            dto_name: dto_name.into(),
            source_record: source_record.into(),
            direct_mappings: Vec::new(),
            computed_fields: Vec::new(),
            providers: Vec::new(),
        }
    }

    pub fn direct_mapping(&self, target_field: &str) -> Option<&DirectMapping> {
        self.direct_mappings.iter().find(|m| m.target_field == target_field)
    }

    pub fn computed_field(&self, target_field: &str) -> Option<&ComputedField> {
        self.computed_fields.iter().find(|c| c.target_field == target_field)
    }

    /// Projections referenced by direct mappings, in mapping order
    pub fn nested_projections(&self) -> impl Iterator<Item = &str> {
        self.direct_mappings
            .iter()
            .filter_map(|m| m.nested_projection.as_deref())
    }
}

/// All validated projections, keyed by DTO name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectionMetadataGraph {
    projections: BTreeMap<String, ProjectionMetadata>,
}

impl ProjectionMetadataGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a projection; an existing entry with the same name is kept
    pub fn insert(&mut self, metadata: ProjectionMetadata) -> bool {
        if self.projections.contains_key(&metadata.dto_name) {
            return false;
        }
        self.projections.insert(metadata.dto_name.clone(), metadata);
        true
    }

    pub fn get(&self, dto_name: &str) -> Option<&ProjectionMetadata> {
        self.projections.get(dto_name)
    }

    pub fn contains(&self, dto_name: &str) -> bool {
        self.projections.contains_key(dto_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProjectionMetadata> {
        self.projections.values()
    }

    pub fn len(&self) -> usize {
        self.projections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projections.is_empty()
    }

    /// Edge `a -> b` when projection `a` maps a field through projection `b`.
    /// Edge weights are the target field names.
    pub fn nesting_graph(&self) -> DiGraph<String, String> {
        let mut graph = DiGraph::with_capacity(self.projections.len(), self.projections.len());
        let mut index: HashMap<&str, NodeIndex> = HashMap::new();

        for name in self.projections.keys() {
            index.insert(name.as_str(), graph.add_node(name.clone()));
        }

        for projection in self.projections.values() {
            let from = index[projection.dto_name.as_str()];
            for mapping in &projection.direct_mappings {
                let Some(nested) = mapping.nested_projection.as_deref() else {
                    continue;
                };
                if let Some(&to) = index.get(nested) {
                    graph.add_edge(from, to, mapping.target_field.clone());
                }
            }
        }

        graph
    }

    /// Emission groups, nested projections before the projections using
    /// them. Mutually nested projections share a group.
    pub fn nesting_order(&self) -> Vec<Vec<String>> {
        let graph = self.nesting_graph();
        kosaraju_scc(&graph)
            .into_iter()
            .map(|component: Vec<NodeIndex>| {
                let mut names: Vec<String> = component
                    .into_iter()
                    .filter_map(|idx| graph.node_weight(idx))
                    .cloned()
                    .collect();
                names.sort();
                names
            })
            .collect()
    }

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }

    pub fn fingerprint(&self) -> Result<Fingerprint> {
        Fingerprint::of(self)
    }
}

impl<'a> IntoIterator for &'a ProjectionMetadataGraph {
    type Item = &'a ProjectionMetadata;
    type IntoIter = std::collections::btree_map::Values<'a, String, ProjectionMetadata>;

    fn into_iter(self) -> Self::IntoIter {
        self.projections.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nested(dto: &str, source: &str, targets: &[&str]) -> ProjectionMetadata {
        let mut metadata = ProjectionMetadata::new(dto, source);
        for (i, target) in targets.iter().enumerate() {
            metadata.direct_mappings.push(DirectMapping {
                target_field: format!("f{}", i),
                source_path: format!("p{}", i),
                target_type: TypeRef::parse(target),
                collection: None,
                nested_projection: Some(target.to_string()),
            });
        }
        metadata
    }

    #[test]
    fn test_nesting_order_puts_nested_first() {
        let mut graph = ProjectionMetadataGraph::new();
        graph.insert(nested("app.UserDto", "app.User", &["app.AddressDto", "app.OrderDto"]));
        graph.insert(nested("app.AddressDto", "app.Address", &[]));
        graph.insert(nested("app.OrderDto", "app.Order", &["app.AddressDto"]));

        let order: Vec<String> = graph.nesting_order().into_iter().flatten().collect();
        let pos = |n: &str| order.iter().position(|x| x == n).unwrap();
        assert!(pos("app.AddressDto") < pos("app.OrderDto"));
        assert!(pos("app.OrderDto") < pos("app.UserDto"));
        assert_eq!(graph.nesting_graph().edge_count(), 3);
    }

    #[test]
    fn test_nesting_cycle_is_one_group() {
        let mut graph = ProjectionMetadataGraph::new();
        graph.insert(nested("app.A", "app.X", &["app.B"]));
        graph.insert(nested("app.B", "app.Y", &["app.A"]));

        let groups = graph.nesting_order();
        assert_eq!(groups, vec![vec!["app.A".to_string(), "app.B".to_string()]]);
    }

    #[test]
    fn test_insert_keeps_first() {
        let mut graph = ProjectionMetadataGraph::new();
        assert!(graph.insert(ProjectionMetadata::new("app.UserDto", "app.User")));
        assert!(!graph.insert(ProjectionMetadata::new("app.UserDto", "app.Other")));
        assert_eq!(graph.get("app.UserDto").unwrap().source_record, "app.User");
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let mut a = ProjectionMetadataGraph::new();
        a.insert(ProjectionMetadata::new("app.B", "app.Y"));
        a.insert(ProjectionMetadata::new("app.A", "app.X"));
        let mut b = ProjectionMetadataGraph::new();
        b.insert(ProjectionMetadata::new("app.A", "app.X"));
        b.insert(ProjectionMetadata::new("app.B", "app.Y"));

        assert_eq!(a.fingerprint().unwrap(), b.fingerprint().unwrap());
        assert!(a.to_json(false).unwrap().contains("\"sourceRecord\":\"app.X\""));
    }
}
