//! Typed CalculiX/Abaqus deck model: ordered directive dispatch, entity
//! parsers and a deterministic serializer.

pub mod dispatch;
pub mod model;
mod parse;
pub mod step;
mod summary;
mod write;

pub use dispatch::{BlockErrors, Directive, ModelDirective};
pub use model::{
    BeamSection, Boundary, ConditionEntry, CouplingEntry, DistributingCoupling, Elastic, Element,
    Expansion, InitialCondition, Material, Model, Node, Plastic, PlasticPoint, RigidBody, Set,
    SetMember, ShellLayer, ShellSection, SolidSection, Spring, Surface, SurfaceEntry, SurfaceKind,
    TimePoints,
};
pub use step::{
    Buckle, Cload, Dload, OutputKind, OutputRequest, StaticAnalysis, StaticTime, Step,
    StepDirective, Temperature, Totals,
};
pub use summary::ModelSummary;
pub use write::SET_MEMBERS_PER_LINE;
