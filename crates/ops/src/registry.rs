//! The process-wide node registry.
//!
//! Built once at startup via [`RegistryBuilder`], immutable afterwards, and
//! shared read-only by every session. Each entry pairs an [`Operation`]
//! with its explicitly declared input/output/widget schemas.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::schema::{InputSpec, OutputSpec, ValueKind, WidgetSpec};
use crate::Operation;

/// One registered node type: the operation plus its declared schemas.
#[derive(Clone)]
pub struct RegistryEntry {
    pub type_name: String,
    /// Coarse grouping shown in the editor palette ("source",
    /// "transform", "sink", "process", ...).
    pub classification: String,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
    pub widgets: Vec<WidgetSpec>,
    pub operation: Arc<dyn Operation>,
}

impl RegistryEntry {
    pub fn new(
        type_name: impl Into<String>,
        classification: impl Into<String>,
        operation: Arc<dyn Operation>,
    ) -> Self {
        Self {
            type_name: type_name.into(),
            classification: classification.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            widgets: Vec::new(),
            operation,
        }
    }

    pub fn with_input(mut self, spec: InputSpec) -> Self {
        self.inputs.push(spec);
        self
    }

    pub fn with_output(mut self, name: impl Into<String>, kind: ValueKind) -> Self {
        self.outputs.push(OutputSpec::new(name, kind));
        self
    }

    pub fn with_widget(mut self, spec: WidgetSpec) -> Self {
        self.widgets.push(spec);
        self
    }

    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|o| o.name == name)
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("type_name", &self.type_name)
            .field("classification", &self.classification)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("widgets", &self.widgets)
            .finish_non_exhaustive()
    }
}

/// What the catalog read endpoint exposes for one node type — the entry
/// minus the operation itself.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    pub inputs: Vec<InputSpec>,
    pub outputs: Vec<OutputSpec>,
    pub widgets: Vec<WidgetSpec>,
    pub classification: String,
}

/// Immutable map from node-type name to [`RegistryEntry`].
#[derive(Debug, Default)]
pub struct NodeRegistry {
    entries: HashMap<String, RegistryEntry>,
}

impl NodeRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn get(&self, type_name: &str) -> Option<&RegistryEntry> {
        self.entries.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.entries.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Catalog document for the read endpoint, sorted by type name so the
    /// palette is stable across requests.
    pub fn catalog(&self) -> Vec<CatalogEntry> {
        let mut entries: Vec<CatalogEntry> = self
            .entries
            .values()
            .map(|e| CatalogEntry {
                name: e.type_name.clone(),
                inputs: e.inputs.clone(),
                outputs: e.outputs.clone(),
                widgets: e.widgets.clone(),
                classification: e.classification.clone(),
            })
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }
}

/// Builder used at startup; registering the same type name twice replaces
/// the earlier entry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: HashMap<String, RegistryEntry>,
}

impl RegistryBuilder {
    pub fn register(mut self, entry: RegistryEntry) -> Self {
        self.entries.insert(entry.type_name.clone(), entry);
        self
    }

    pub fn build(self) -> NodeRegistry {
        NodeRegistry {
            entries: self.entries,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockOperation;
    use serde_json::json;

    fn sample_entry(name: &str) -> RegistryEntry {
        RegistryEntry::new(name, "transform", Arc::new(MockOperation::returning(name, vec![])))
            .with_input(InputSpec::new("text", ValueKind::Text))
            .with_output("text", ValueKind::Text)
            .with_widget(WidgetSpec::new("label", ValueKind::Text).with_default(json!("")))
    }

    #[test]
    fn lookup_by_type_name() {
        let registry = NodeRegistry::builder()
            .register(sample_entry("upper"))
            .register(sample_entry("lower"))
            .build();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("upper"));
        assert!(registry.get("missing").is_none());

        let entry = registry.get("lower").unwrap();
        assert!(entry.input("text").is_some());
        assert!(entry.input("nope").is_none());
        assert!(entry.output("text").is_some());
    }

    #[test]
    fn catalog_is_sorted_and_omits_the_operation() {
        let registry = NodeRegistry::builder()
            .register(sample_entry("zeta"))
            .register(sample_entry("alpha"))
            .build();

        let catalog = registry.catalog();
        let names: Vec<&str> = catalog.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        let v = serde_json::to_value(&catalog).unwrap();
        assert_eq!(v[0]["classification"], "transform");
        assert!(v[0].get("operation").is_none());
    }

    #[test]
    fn re_registering_replaces() {
        let registry = NodeRegistry::builder()
            .register(sample_entry("dup"))
            .register(RegistryEntry::new(
                "dup",
                "sink",
                Arc::new(MockOperation::returning("dup", vec![])),
            ))
            .build();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("dup").unwrap().classification, "sink");
    }
}
