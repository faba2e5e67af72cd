//! Analysis steps: the `*STEP` … `*END STEP` region and its sub-directives.

use ccx_inp::{
    Block, InpError, Parameter, Parameters, fields, matches_keyword, parse_header, split_blocks,
    tokens,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dispatch::{BlockErrors, Directive, dispatch_all};
use crate::model::{Boundary, Model};
use crate::parse::{self, each_line};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub nlgeom: bool,
    pub increments: Option<i64>,
    pub static_analysis: Option<StaticAnalysis>,
    pub buckle: Option<Buckle>,
    pub boundaries: Vec<Boundary>,
    pub node_files: Vec<OutputRequest>,
    pub element_files: Vec<OutputRequest>,
    pub node_prints: Vec<OutputRequest>,
    pub element_prints: Vec<OutputRequest>,
    pub cloads: Vec<Cload>,
    pub dloads: Vec<Dload>,
    pub temperatures: Vec<Temperature>,
}

impl Step {
    pub fn is_static(&self) -> bool {
        self.static_analysis.is_some()
    }

    pub fn is_buckling(&self) -> bool {
        self.buckle.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticAnalysis {
    pub direct: bool,
    pub time: Option<StaticTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticTime {
    pub initial_increment: f64,
    pub period: f64,
    pub minimum_increment: Option<f64>,
    pub maximum_increment: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Buckle {
    pub modes: i64,
    pub accuracy: Option<f64>,
    pub lanczos_vectors: Option<i64>,
    pub max_iterations: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Totals {
    Yes,
    Only,
    No,
}

impl Totals {
    pub fn as_str(self) -> &'static str {
        match self {
            Totals::Yes => "YES",
            Totals::Only => "ONLY",
            Totals::No => "NO",
        }
    }
}

/// One `*NODE FILE`, `*EL FILE`, `*NODE PRINT` or `*EL PRINT` request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputRequest {
    pub set: Option<String>,
    pub frequency: Option<i64>,
    pub output: Option<String>,
    pub time_points: Option<String>,
    pub totals: Option<Totals>,
    pub contact_elements: bool,
    pub global: Option<bool>,
    pub variables: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cload {
    pub target: String,
    pub direction: i64,
    pub value: f64,
}

/// Free-form `*DLOAD` line such as `EALL, GRAV, 9.81, 0., 0., -1.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dload {
    pub values: Vec<String>,
}

/// `*TEMPERATURE` line; header parameters are kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub parameters: Vec<Parameter>,
    pub target: String,
    pub value: f64,
    pub gradient2: Option<f64>,
    pub gradient1: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    NodeFile,
    ElementFile,
    NodePrint,
    ElementPrint,
}

impl OutputKind {
    pub const ALL: [OutputKind; 4] = [
        OutputKind::NodeFile,
        OutputKind::ElementFile,
        OutputKind::NodePrint,
        OutputKind::ElementPrint,
    ];

    pub fn keyword(self) -> &'static str {
        match self {
            OutputKind::NodeFile => "NODE FILE",
            OutputKind::ElementFile => "EL FILE",
            OutputKind::NodePrint => "NODE PRINT",
            OutputKind::ElementPrint => "EL PRINT",
        }
    }

    /// Parameter naming the target set.
    pub fn set_parameter(self) -> &'static str {
        match self {
            OutputKind::NodeFile | OutputKind::NodePrint => "NSET",
            OutputKind::ElementFile | OutputKind::ElementPrint => "ELSET",
        }
    }

    pub fn requests(self, step: &Step) -> &[OutputRequest] {
        match self {
            OutputKind::NodeFile => &step.node_files,
            OutputKind::ElementFile => &step.element_files,
            OutputKind::NodePrint => &step.node_prints,
            OutputKind::ElementPrint => &step.element_prints,
        }
    }

    fn requests_mut(self, step: &mut Step) -> &mut Vec<OutputRequest> {
        match self {
            OutputKind::NodeFile => &mut step.node_files,
            OutputKind::ElementFile => &mut step.element_files,
            OutputKind::NodePrint => &mut step.node_prints,
            OutputKind::ElementPrint => &mut step.element_prints,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirective {
    Buckle,
    Static,
    Output(OutputKind),
    Cload,
    Dload,
    Boundary,
    Temperature,
}

impl Directive for StepDirective {
    type Target = Step;

    const ORDER: &'static [Self] = &[
        Self::Buckle,
        Self::Static,
        Self::Output(OutputKind::NodeFile),
        Self::Output(OutputKind::ElementFile),
        Self::Output(OutputKind::NodePrint),
        Self::Output(OutputKind::ElementPrint),
        Self::Cload,
        Self::Dload,
        Self::Boundary,
        Self::Temperature,
    ];

    fn keyword(self) -> &'static str {
        match self {
            Self::Buckle => "BUCKLE",
            Self::Static => "STATIC",
            Self::Output(kind) => kind.keyword(),
            Self::Cload => "CLOAD",
            Self::Dload => "DLOAD",
            Self::Boundary => "BOUNDARY",
            Self::Temperature => "TEMPERATURE",
        }
    }

    fn apply(self, step: &mut Step, block: &Block) -> Result<(), BlockErrors> {
        match self {
            Self::Buckle => buckle(step, block),
            Self::Static => static_analysis(step, block),
            Self::Output(kind) => output_request(step, block, kind),
            Self::Cload => cload(step, block),
            Self::Dload => dload(step, block),
            Self::Boundary => {
                let parsed = parse::boundary(block)?;
                step.boundaries.extend(parsed);
                Ok(())
            }
            Self::Temperature => temperature(step, block),
        }
    }
}

fn step_header(params: &mut Parameters) -> Result<Step, InpError> {
    let nlgeom = match params.take("NLGEOM") {
        None => false,
        Some(Parameter { value: None, .. }) => true,
        Some(Parameter { value: Some(v), .. }) => match v.as_str() {
            "YES" => true,
            "NO" => false,
            other => return Err(params.field_error(format!("invalid NLGEOM value `{other}`"))),
        },
    };
    let increments = params.take_integer("INC")?;
    Ok(Step {
        nlgeom,
        increments,
        ..Step::default()
    })
}

/// Parses a folded step region and appends the step to the model. Inner
/// blocks that fail are reported together; the ones that parse are kept.
pub fn parse_step(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let lines = block.lines();
    let closed = lines.last().is_some_and(|l| matches_keyword(&l.text, "END STEP"));
    if lines.len() < 2 || !closed {
        return Err(block
            .header()
            .error("*STEP region is not closed by *END STEP")
            .into());
    }

    let mut params = parse_header(block.header())?.parameters;
    let mut step = step_header(&mut params)?;
    params.finish()?;

    let (inner, mut errors) = split_blocks(&lines[1..lines.len() - 1]);
    errors.extend(dispatch_all::<StepDirective>(&mut step, &inner));
    debug!(
        line = block.line_number(),
        sub_blocks = inner.len(),
        errors = errors.len(),
        "parsed step"
    );

    model.steps.push(step);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(BlockErrors(errors))
    }
}

fn buckle(step: &mut Step, block: &Block) -> Result<(), BlockErrors> {
    parse_header(block.header())?.parameters.finish()?;
    let [line] = block.data() else {
        return Err(block.header().error("*BUCKLE takes exactly one data line").into());
    };
    let f = fields(&line.text);
    if f.is_empty() || f.len() > 4 || f[0].is_empty() {
        return Err(line
            .error("expected modes[, accuracy[, lanczos vectors[, max iterations]]]")
            .into());
    }
    let optional_int = |i: usize| -> Result<Option<i64>, InpError> {
        match f.get(i) {
            Some(raw) if !raw.is_empty() => line.integer(raw).map(Some),
            _ => Ok(None),
        }
    };
    let accuracy = match f.get(1) {
        Some(raw) if !raw.is_empty() => Some(line.real(raw)?),
        _ => None,
    };
    step.buckle = Some(Buckle {
        modes: line.integer(f[0])?,
        accuracy,
        lanczos_vectors: optional_int(2)?,
        max_iterations: optional_int(3)?,
    });
    Ok(())
}

fn static_analysis(step: &mut Step, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let direct = params.take_flag("DIRECT")?;
    params.finish()?;

    let time = match block.data() {
        [] => None,
        [line] => {
            let f = fields(&line.text);
            if !(2..=4).contains(&f.len()) || f[0].is_empty() || f[1].is_empty() {
                return Err(line
                    .error("expected initial increment, period[, minimum[, maximum]]")
                    .into());
            }
            let optional = |i: usize| -> Result<Option<f64>, InpError> {
                match f.get(i) {
                    Some(raw) if !raw.is_empty() => line.real(raw).map(Some),
                    _ => Ok(None),
                }
            };
            Some(StaticTime {
                initial_increment: line.real(f[0])?,
                period: line.real(f[1])?,
                minimum_increment: optional(2)?,
                maximum_increment: optional(3)?,
            })
        }
        [_, extra, ..] => return Err(extra.error("*STATIC takes at most one data line").into()),
    };
    step.static_analysis = Some(StaticAnalysis { direct, time });
    Ok(())
}

fn output_request(step: &mut Step, block: &Block, kind: OutputKind) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let totals = match params.take_value("TOTALS")?.as_deref() {
        None => None,
        Some("YES") => Some(Totals::Yes),
        Some("ONLY") => Some(Totals::Only),
        Some("NO") => Some(Totals::No),
        Some(other) => {
            return Err(params
                .field_error(format!("invalid TOTALS value `{other}`"))
                .into());
        }
    };
    let global = match params.take_value("GLOBAL")?.as_deref() {
        None => None,
        Some("YES") => Some(true),
        Some("NO") => Some(false),
        Some(other) => {
            return Err(params
                .field_error(format!("invalid GLOBAL value `{other}`"))
                .into());
        }
    };
    let contact_elements =
        params.take_flag("CONTACT ELEMENTS")? | params.take_flag("CONTACT ELEMENT")?;
    let request = OutputRequest {
        set: params.take_value(kind.set_parameter())?,
        frequency: params.take_integer("FREQUENCY")?,
        output: params.take_value("OUTPUT")?,
        time_points: params.take_value("TIME POINTS")?,
        totals,
        contact_elements,
        global,
        variables: block
            .data()
            .iter()
            .flat_map(|l| tokens(&l.text))
            .map(str::to_string)
            .collect(),
    };
    params.finish()?;
    kind.requests_mut(step).push(request);
    Ok(())
}

fn cload(step: &mut Step, block: &Block) -> Result<(), BlockErrors> {
    parse_header(block.header())?.parameters.finish()?;
    let loads = each_line(block, |line| {
        let t = tokens(&line.text);
        if t.len() != 3 {
            return Err(line.error(format!(
                "expected 3 fields (target, direction, value), found {}",
                t.len()
            )));
        }
        let direction = line.integer(t[1])?;
        if !(1..=6).contains(&direction) {
            return Err(line.error(format!("load direction {direction} is outside 1..6")));
        }
        Ok(Cload {
            target: t[0].to_string(),
            direction,
            value: line.real(t[2])?,
        })
    })?;
    step.cloads.extend(loads);
    Ok(())
}

fn dload(step: &mut Step, block: &Block) -> Result<(), BlockErrors> {
    parse_header(block.header())?.parameters.finish()?;
    if block.data().is_empty() {
        return Err(block.header().error("*DLOAD without load lines").into());
    }
    let loads = each_line(block, |line| {
        let values = fields(&line.text);
        if values.iter().all(|v| v.is_empty()) {
            return Err(line.error("*DLOAD line without values"));
        }
        Ok(Dload {
            values: values.into_iter().map(str::to_string).collect(),
        })
    })?;
    step.dloads.extend(loads);
    Ok(())
}

fn temperature(step: &mut Step, block: &Block) -> Result<(), BlockErrors> {
    let parameters = parse_header(block.header())?.parameters.into_remaining();
    let entries = each_line(block, |line| {
        let f = fields(&line.text);
        if !(2..=4).contains(&f.len()) || f[0].is_empty() {
            return Err(line.error("expected target, value[, gradient2[, gradient1]]"));
        }
        let optional = |i: usize| -> Result<Option<f64>, InpError> {
            match f.get(i) {
                Some(raw) if !raw.is_empty() => line.real(raw).map(Some),
                _ => Ok(None),
            }
        };
        Ok(Temperature {
            parameters: parameters.clone(),
            target: f[0].to_string(),
            value: line.real(f[1])?,
            gradient2: optional(2)?,
            gradient1: optional(3)?,
        })
    })?;
    step.temperatures.extend(entries);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn steps(src: &str) -> Vec<Step> {
        Model::parse_str(src).expect("deck should parse").steps
    }

    #[test]
    fn static_step_with_loads_and_prints() {
        let src = "*STEP, NLGEOM, INC=200\n*STATIC, DIRECT\n0.1, 1.\n*CLOAD\nN1, 3, 80.33333\nLOAD,3,-3.3112583E+00\n\
                   *DLOAD\nEALL, GRAV, 9.81, 0., 0., -1.\n*NODE PRINT, NSET=FIX, TOTALS=ONLY, TIME POINTS=T1\nRF\n\
                   *EL FILE\nS, E\n*BOUNDARY\nFIX, 1, 3\n*END STEP\n";
        let s = &steps(src)[0];
        assert!(s.nlgeom);
        assert_eq!(s.increments, Some(200));
        let stat = s.static_analysis.as_ref().expect("static");
        assert!(stat.direct);
        assert_eq!(stat.time.as_ref().map(|t| t.period), Some(1.0));
        assert_eq!(s.cloads.len(), 2);
        assert_eq!(s.cloads[1].value, -3.3112583);
        assert_eq!(s.dloads[0].values.len(), 6);
        assert_eq!(s.node_prints[0].set.as_deref(), Some("FIX"));
        assert_eq!(s.node_prints[0].totals, Some(Totals::Only));
        assert_eq!(s.node_prints[0].variables, vec!["RF".to_string()]);
        assert_eq!(s.element_files[0].variables, vec!["S".to_string(), "E".to_string()]);
        assert_eq!(s.boundaries[0].last, Some(3));
    }

    #[test]
    fn nlgeom_values() {
        let parsed = steps("*STEP, NLGEOM=NO\n*END STEP\n*STEP, NLGEOM=YES\n*END STEP\n*STEP\n*END STEP\n");
        let flags: Vec<bool> = parsed.iter().map(|s| s.nlgeom).collect();
        assert_eq!(flags, vec![false, true, false]);
    }

    #[test]
    fn buckle_step() {
        let s = &steps("*STEP\n*BUCKLE\n10, 0.01\n*NODE FILE\nU\n*END STEP\n")[0];
        let b = s.buckle.as_ref().expect("buckle");
        assert_eq!(b.modes, 10);
        assert_eq!(b.accuracy, Some(0.01));
        assert!(s.is_buckling());
        assert!(!s.is_static());
    }

    #[test]
    fn temperature_keeps_parameters() {
        let s = &steps("*STEP\n*TEMPERATURE, OP=NEW, AMPLITUDE=A1\nNALL, 100., 1.5\n*END STEP\n")[0];
        let t = &s.temperatures[0];
        assert_eq!(t.parameters.len(), 2);
        assert_eq!(t.parameters[0].render(), "OP=NEW");
        assert_eq!(t.gradient2, Some(1.5));
        assert_eq!(t.gradient1, None);
    }

    #[test]
    fn sub_block_errors_are_aggregated_under_the_step() {
        let src = "*STEP\n*STATIC\n*CLOAD\nN1,3\n*MODAL DAMPING\n1,2\n*NODE PRINT, NSET=N\nU\n*END STEP\n";
        let (model, errors) = Model::parse_with_diagnostics(src.as_bytes());
        assert_eq!(errors.len(), 1);
        let InpError::Block { keyword, causes, .. } = &errors[0] else {
            panic!("expected a step block error, got {:?}", errors[0]);
        };
        assert_eq!(keyword, "STEP");
        assert_eq!(causes.len(), 2);
        assert_eq!(errors[0].leaves().len(), 2);
        let step = &model.steps[0];
        assert!(step.is_static());
        assert_eq!(step.node_prints.len(), 1);
        assert!(step.cloads.is_empty());
    }

    #[test]
    fn dload_line_of_bare_commas_is_rejected() {
        let src = "*STEP\n*STATIC\n*DLOAD\nE1, P1, 1.\n , ,\n*END STEP\n";
        let (model, errors) = Model::parse_with_diagnostics(src.as_bytes());
        let leaves: Vec<&InpError> = errors.iter().flat_map(|e| e.leaves()).collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].line(), 5);
        assert!(leaves[0].to_string().contains("without values"));
        assert!(model.steps[0].dloads.is_empty());
    }

    #[test]
    fn contact_element_flag_accepts_both_spellings() {
        let parsed = steps(
            "*STEP\n*EL FILE, CONTACT ELEMENTS\nS\n*NODE FILE, CONTACT ELEMENT\nU\n*END STEP\n",
        );
        assert!(parsed[0].element_files[0].contact_elements);
        assert!(parsed[0].node_files[0].contact_elements);
    }

    #[test]
    fn cload_direction_is_checked() {
        let (_, errors) = Model::parse_with_diagnostics(b"*STEP\n*CLOAD\n1, 7, 1.\n*END STEP\n");
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("outside 1..6"));
    }
}
