//! Entity counts extracted from a parsed model.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Model;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModelSummary {
    pub heading: String,
    pub nodes: usize,
    pub elements: usize,
    pub element_types: BTreeMap<String, usize>,
    pub node_sets: usize,
    pub element_sets: usize,
    pub materials: usize,
    pub sections: usize,
    pub boundaries: usize,
    pub steps: usize,
    pub has_static: bool,
    pub has_buckle: bool,
    pub has_nlgeom: bool,
    pub max_node_index: Option<i64>,
}

impl ModelSummary {
    pub fn from_model(model: &Model) -> Self {
        let mut element_types = BTreeMap::<String, usize>::new();
        for element in &model.elements {
            let kind = element.element_type.as_deref().unwrap_or("UNTYPED");
            *element_types.entry(kind.to_string()).or_insert(0) += 1;
        }

        Self {
            heading: model.heading.lines().next().unwrap_or("").to_string(),
            nodes: model.nodes.len(),
            elements: model.elements.len(),
            element_types,
            node_sets: model.node_sets.len(),
            element_sets: model.element_sets.len(),
            materials: model.materials.len(),
            sections: model.solid_sections.len()
                + model.shell_sections.len()
                + model.beam_sections.len(),
            boundaries: model.boundaries.len()
                + model.steps.iter().map(|s| s.boundaries.len()).sum::<usize>(),
            steps: model.steps.len(),
            has_static: model.steps.iter().any(|s| s.is_static()),
            has_buckle: model.steps.iter().any(|s| s.is_buckling()),
            has_nlgeom: model.steps.iter().any(|s| s.nlgeom),
            max_node_index: model.nodes.iter().map(|n| n.index).max(),
        }
    }
}
