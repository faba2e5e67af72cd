//! Ordered, first-match-wins dispatch of directive blocks.

use ccx_inp::{Block, InpError, LineNormalizer, ParseFailure, segment};
use tracing::{debug, info};

use crate::model::Model;
use crate::parse;
use crate::step;

/// Errors a directive parser found in one block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockErrors(pub Vec<InpError>);

impl From<InpError> for BlockErrors {
    fn from(err: InpError) -> Self {
        BlockErrors(vec![err])
    }
}

impl From<Vec<InpError>> for BlockErrors {
    fn from(errors: Vec<InpError>) -> Self {
        BlockErrors(errors)
    }
}

/// Ok when nothing was collected.
pub(crate) fn collected(errors: Vec<InpError>) -> Result<(), BlockErrors> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BlockErrors(errors))
    }
}

/// A table of directives tried in declaration order against a block.
pub trait Directive: Copy + std::fmt::Debug + 'static {
    type Target;

    const ORDER: &'static [Self];

    fn keyword(self) -> &'static str;

    fn apply(self, target: &mut Self::Target, block: &Block) -> Result<(), BlockErrors>;

    fn matching(keyword: &str) -> Option<Self> {
        Self::ORDER.iter().copied().find(|d| d.keyword() == keyword)
    }
}

/// Applies the first directive whose keyword equals the block keyword.
/// Failures come back as one error anchored at the block's first line.
pub fn dispatch<D: Directive>(target: &mut D::Target, block: &Block) -> Result<D, InpError> {
    let Some(directive) = D::matching(block.keyword()) else {
        return Err(InpError::UnknownDirective {
            line: block.line_number(),
            keyword: block.keyword().to_string(),
            preview: block.preview(),
        });
    };
    directive
        .apply(target, block)
        .map(|()| directive)
        .map_err(|BlockErrors(causes)| InpError::Block {
            line: block.line_number(),
            keyword: directive.keyword().to_string(),
            preview: block.preview(),
            causes,
        })
}

/// Dispatches every block, collecting one error per rejected block.
pub fn dispatch_all<D: Directive>(target: &mut D::Target, blocks: &[Block]) -> Vec<InpError> {
    let mut errors = Vec::new();
    for block in blocks {
        match dispatch::<D>(target, block) {
            Ok(directive) => debug!(line = block.line_number(), ?directive, "parsed block"),
            Err(err) => {
                debug!(line = block.line_number(), keyword = block.keyword(), "block rejected");
                errors.push(err);
            }
        }
    }
    errors
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelDirective {
    Node,
    Heading,
    Element,
    NodeSet,
    ElementSet,
    Density,
    Expansion,
    Elastic,
    Boundary,
    Material,
    Surface,
    BeamSection,
    SolidSection,
    ShellSection,
    Step,
    Plastic,
    TimePoints,
    Spring,
    RigidBody,
    DistributingCoupling,
    InitialConditions,
}

impl Directive for ModelDirective {
    type Target = Model;

    const ORDER: &'static [Self] = &[
        Self::Node,
        Self::Heading,
        Self::Element,
        Self::NodeSet,
        Self::ElementSet,
        Self::Density,
        Self::Expansion,
        Self::Elastic,
        Self::Boundary,
        Self::Material,
        Self::Surface,
        Self::BeamSection,
        Self::SolidSection,
        Self::ShellSection,
        Self::Step,
        Self::Plastic,
        Self::TimePoints,
        Self::Spring,
        Self::RigidBody,
        Self::DistributingCoupling,
        Self::InitialConditions,
    ];

    fn keyword(self) -> &'static str {
        match self {
            Self::Node => "NODE",
            Self::Heading => "HEADING",
            Self::Element => "ELEMENT",
            Self::NodeSet => "NSET",
            Self::ElementSet => "ELSET",
            Self::Density => "DENSITY",
            Self::Expansion => "EXPANSION",
            Self::Elastic => "ELASTIC",
            Self::Boundary => "BOUNDARY",
            Self::Material => "MATERIAL",
            Self::Surface => "SURFACE",
            Self::BeamSection => "BEAM SECTION",
            Self::SolidSection => "SOLID SECTION",
            Self::ShellSection => "SHELL SECTION",
            Self::Step => "STEP",
            Self::Plastic => "PLASTIC",
            Self::TimePoints => "TIME POINTS",
            Self::Spring => "SPRING",
            Self::RigidBody => "RIGID BODY",
            Self::DistributingCoupling => "DISTRIBUTING COUPLING",
            Self::InitialConditions => "INITIAL CONDITIONS",
        }
    }

    fn apply(self, model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
        match self {
            Self::Node => parse::node(model, block),
            Self::Heading => parse::heading(model, block),
            Self::Element => parse::element(model, block),
            Self::NodeSet => parse::set(model, block, parse::SetKind::Node),
            Self::ElementSet => parse::set(model, block, parse::SetKind::Element),
            Self::Density => parse::density(model, block),
            Self::Expansion => parse::expansion(model, block),
            Self::Elastic => parse::elastic(model, block),
            Self::Boundary => {
                let parsed = parse::boundary(block)?;
                model.boundaries.extend(parsed);
                Ok(())
            }
            Self::Material => parse::material(model, block),
            Self::Surface => parse::surface(model, block),
            Self::BeamSection => parse::beam_section(model, block),
            Self::SolidSection => parse::solid_section(model, block),
            Self::ShellSection => parse::shell_section(model, block),
            Self::Step => step::parse_step(model, block),
            Self::Plastic => parse::plastic(model, block),
            Self::TimePoints => parse::time_points(model, block),
            Self::Spring => parse::spring(model, block),
            Self::RigidBody => parse::rigid_body(model, block),
            Self::DistributingCoupling => parse::distributing_coupling(model, block),
            Self::InitialConditions => parse::initial_conditions(model, block),
        }
    }
}

impl Model {
    /// Parses a deck. Fails with every error found, in source order.
    pub fn parse(raw: &[u8]) -> Result<Model, ParseFailure> {
        let (model, errors) = Self::parse_with_diagnostics(raw);
        if errors.is_empty() {
            Ok(model)
        } else {
            Err(ParseFailure { errors })
        }
    }

    pub fn parse_str(raw: &str) -> Result<Model, ParseFailure> {
        Self::parse(raw.as_bytes())
    }

    /// Parses a deck and returns the model built alongside the errors.
    /// When errors are present the model is advisory only.
    pub fn parse_with_diagnostics(raw: &[u8]) -> (Model, Vec<InpError>) {
        let lines = LineNormalizer::DECK.normalize(raw);
        let segmented = segment(&lines);

        let mut model = Model::default();
        let mut errors = segmented.errors;
        errors.extend(dispatch_all::<ModelDirective>(&mut model, &segmented.blocks));
        errors.sort_by_key(InpError::line);

        info!(
            nodes = model.nodes.len(),
            elements = model.elements.len(),
            steps = model.steps.len(),
            errors = errors.len(),
            "parsed deck"
        );
        (model, errors)
    }
}
