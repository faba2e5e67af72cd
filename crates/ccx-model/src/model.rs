//! Typed deck model. Every entity list keeps source order.

use serde::{Deserialize, Serialize};

use crate::step::Step;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub heading: String,
    pub nodes: Vec<Node>,
    pub elements: Vec<Element>,
    pub node_sets: Vec<Set>,
    pub element_sets: Vec<Set>,
    pub surfaces: Vec<Surface>,
    pub initial_conditions: Vec<InitialCondition>,
    pub materials: Vec<Material>,
    pub solid_sections: Vec<SolidSection>,
    pub shell_sections: Vec<ShellSection>,
    pub beam_sections: Vec<BeamSection>,
    pub boundaries: Vec<Boundary>,
    pub springs: Vec<Spring>,
    pub rigid_bodies: Vec<RigidBody>,
    pub distributing_couplings: Vec<DistributingCoupling>,
    pub steps: Vec<Step>,
    pub time_points: Option<TimePoints>,
}

impl Model {
    pub fn node(&self, index: i64) -> Option<&Node> {
        self.nodes.iter().find(|n| n.index == index)
    }

    pub fn material(&self, name: &str) -> Option<&Material> {
        self.materials
            .iter()
            .find(|m| m.name.as_deref() == Some(name))
    }

    pub fn node_set(&self, name: &str) -> Option<&Set> {
        self.node_sets.iter().find(|s| s.name == name)
    }

    pub fn element_set(&self, name: &str) -> Option<&Set> {
        self.element_sets.iter().find(|s| s.name == name)
    }

    /// Material that `*ELASTIC`, `*DENSITY`, `*EXPANSION` and `*PLASTIC`
    /// attach to: the most recent one, or a new anonymous one.
    pub(crate) fn current_material(&mut self) -> &mut Material {
        if self.materials.is_empty() {
            self.materials.push(Material::default());
        }
        let last = self.materials.len() - 1;
        &mut self.materials[last]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub index: i64,
    pub node_set: Option<String>,
    pub coord: [f64; 3],
}

/// Node references are not checked against the node list, and the node
/// count is not checked against the element type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub index: i64,
    pub element_type: Option<String>,
    pub element_set: Option<String>,
    pub nodes: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SetMember {
    Index(i64),
    Name(String),
}

/// `*NSET` or `*ELSET`. With `generate`, members are `start, end, step`
/// and are kept unexpanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Set {
    pub name: String,
    pub generate: bool,
    pub members: Vec<SetMember>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceKind {
    Element,
    Node,
}

impl SurfaceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SurfaceKind::Element => "ELEMENT",
            SurfaceKind::Node => "NODE",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceEntry {
    pub target: String,
    pub face: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Surface {
    pub name: String,
    pub kind: SurfaceKind,
    pub entries: Vec<SurfaceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionEntry {
    pub target: String,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitialCondition {
    pub kind: String,
    pub entries: Vec<ConditionEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Elastic {
    pub modulus: f64,
    pub poisson: f64,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expansion {
    pub value: f64,
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlasticPoint {
    pub stress: f64,
    pub strain: f64,
    pub temperature: Option<f64>,
}

/// Hardening curve, at most [`Plastic::CAPACITY`] points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plastic {
    pub hardening: Option<String>,
    pub points: Vec<PlasticPoint>,
}

impl Plastic {
    pub const CAPACITY: usize = 10;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    pub name: Option<String>,
    pub density: Option<f64>,
    pub elastic: Vec<Elastic>,
    pub expansions: Vec<Expansion>,
    pub expansion_type: Option<String>,
    pub expansion_zero: Option<f64>,
    pub plastic: Option<Plastic>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolidSection {
    pub element_set: String,
    pub material: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShellLayer {
    pub thickness: f64,
    pub material: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShellSection {
    pub element_set: String,
    pub material: Option<String>,
    pub offset: Option<f64>,
    pub nodal_thickness: bool,
    pub composite: bool,
    pub thickness: Option<f64>,
    pub layers: Vec<ShellLayer>,
}

impl ShellSection {
    pub const MAX_LAYERS: usize = 12;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeamSection {
    pub section: String,
    pub element_set: String,
    pub material: String,
    pub offset1: Option<f64>,
    pub offset2: Option<f64>,
    pub dimensions: Vec<f64>,
    pub direction: [f64; 3],
}

/// One `target, first[, last[, value]]` line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Boundary {
    pub target: String,
    pub first: i64,
    pub last: Option<i64>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Spring {
    pub element_set: String,
    pub freedoms: Vec<i64>,
    pub constant: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RigidBody {
    pub node_set: Option<String>,
    pub element_set: Option<String>,
    pub ref_node: Option<i64>,
    pub rot_node: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CouplingEntry {
    pub target: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributingCoupling {
    pub element_set: String,
    pub entries: Vec<CouplingEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimePoints {
    pub name: String,
    pub generate: bool,
    pub times: Vec<f64>,
}
