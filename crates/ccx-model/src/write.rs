//! Renders a [`Model`] back to deck text. Output is a fixed point of
//! parse followed by render.

use std::fmt::{self, Display, Formatter, Write};

use ccx_inp::format_scientific;

use crate::model::{
    BeamSection, Boundary, Element, Material, Model, Node, Set, SetMember, ShellSection,
};
use crate::parse::ELEMENT_ENTRIES_PER_LINE;
use crate::step::{OutputKind, OutputRequest, Step, Temperature};

/// Set members written per data line.
pub const SET_MEMBERS_PER_LINE: usize = 8;

fn coord(value: f64) -> String {
    format_scientific(value, 12, true)
}

fn real(value: f64) -> String {
    format_scientific(value, 8, false)
}

fn precise(value: f64) -> String {
    format_scientific(value, 12, false)
}

/// Fields joined with `, `, trailing absent fields dropped, inner ones blank.
fn optional_fields(fields: &[Option<String>]) -> String {
    let used = fields.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    fields[..used]
        .iter()
        .map(|f| f.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Model {
    pub fn to_inp(&self) -> String {
        DeckText(self).to_string().to_uppercase()
    }
}

struct DeckText<'a>(&'a Model);

impl Display for DeckText<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let m = self.0;
        if !m.heading.is_empty() {
            writeln!(f, "*HEADING\n{}", m.heading)?;
        }
        write_nodes(f, &m.nodes)?;
        write_elements(f, &m.elements)?;
        for set in &m.node_sets {
            write_set(f, "NSET", set)?;
        }
        for set in &m.element_sets {
            write_set(f, "ELSET", set)?;
        }
        for surface in &m.surfaces {
            writeln!(
                f,
                "*SURFACE, NAME={}, TYPE={}",
                surface.name,
                surface.kind.as_str()
            )?;
            for entry in &surface.entries {
                match &entry.face {
                    Some(face) => writeln!(f, "{}, {}", entry.target, face)?,
                    None => writeln!(f, "{}", entry.target)?,
                }
            }
        }
        for condition in &m.initial_conditions {
            writeln!(f, "*INITIAL CONDITIONS, TYPE={}", condition.kind)?;
            for entry in &condition.entries {
                let values: Vec<String> = entry.values.iter().map(|v| real(*v)).collect();
                writeln!(f, "{}, {}", entry.target, values.join(", "))?;
            }
        }
        for section in &m.solid_sections {
            writeln!(
                f,
                "*SOLID SECTION, ELSET={}, MATERIAL={}",
                section.element_set, section.material
            )?;
        }
        for section in &m.shell_sections {
            write_shell_section(f, section)?;
        }
        for section in &m.beam_sections {
            write_beam_section(f, section)?;
        }
        for spring in &m.springs {
            writeln!(f, "*SPRING, ELSET={}", spring.element_set)?;
            if !spring.freedoms.is_empty() {
                let freedoms: Vec<String> = spring.freedoms.iter().map(i64::to_string).collect();
                writeln!(f, "{}", freedoms.join(", "))?;
            }
            writeln!(f, "{}", real(spring.constant))?;
        }
        if let Some(tp) = &m.time_points {
            write!(f, "*TIME POINTS, NAME={}", tp.name)?;
            if tp.generate {
                write!(f, ", GENERATE")?;
            }
            writeln!(f)?;
            for chunk in tp.times.chunks(SET_MEMBERS_PER_LINE) {
                let values: Vec<String> = chunk.iter().map(|v| real(*v)).collect();
                writeln!(f, "{}", values.join(", "))?;
            }
        }
        write_boundaries(f, &m.boundaries)?;
        for body in &m.rigid_bodies {
            write!(f, "*RIGID BODY")?;
            if let Some(nset) = &body.node_set {
                write!(f, ", NSET={nset}")?;
            }
            if let Some(elset) = &body.element_set {
                write!(f, ", ELSET={elset}")?;
            }
            if let Some(node) = body.ref_node {
                write!(f, ", REF NODE={node}")?;
            }
            if let Some(node) = body.rot_node {
                write!(f, ", ROT NODE={node}")?;
            }
            writeln!(f)?;
        }
        for coupling in &m.distributing_couplings {
            writeln!(f, "*DISTRIBUTING COUPLING, ELSET={}", coupling.element_set)?;
            for entry in &coupling.entries {
                writeln!(f, "{}, {}", entry.target, real(entry.weight))?;
            }
        }
        for material in &m.materials {
            write_material(f, material)?;
        }
        for step in &m.steps {
            write_step(f, step)?;
        }
        Ok(())
    }
}

/// One `*NODE` header per run of nodes sharing a node set.
fn write_nodes(f: &mut impl Write, nodes: &[Node]) -> fmt::Result {
    for run in nodes.chunk_by(|a, b| a.node_set == b.node_set) {
        write!(f, "*NODE")?;
        if let Some(set) = &run[0].node_set {
            write!(f, ", NSET={set}")?;
        }
        writeln!(f)?;
        for node in run {
            writeln!(
                f,
                "{:>5}, {}, {}, {}",
                node.index,
                coord(node.coord[0]),
                coord(node.coord[1]),
                coord(node.coord[2])
            )?;
        }
    }
    Ok(())
}

/// One `*ELEMENT` header per run sharing type and element set. Lines hold
/// at most 16 entries; a full line ending in `,` continues.
fn write_elements(f: &mut impl Write, elements: &[Element]) -> fmt::Result {
    let same_group =
        |a: &Element, b: &Element| a.element_type == b.element_type && a.element_set == b.element_set;
    for run in elements.chunk_by(same_group) {
        write!(f, "*ELEMENT")?;
        if let Some(kind) = &run[0].element_type {
            write!(f, ", TYPE={kind}")?;
        }
        if let Some(set) = &run[0].element_set {
            write!(f, ", ELSET={set}")?;
        }
        writeln!(f)?;
        for element in run {
            let entries: Vec<String> = std::iter::once(element.index)
                .chain(element.nodes.iter().copied())
                .map(|v| v.to_string())
                .collect();
            let chunks: Vec<&[String]> = entries.chunks(ELEMENT_ENTRIES_PER_LINE).collect();
            for (i, chunk) in chunks.iter().enumerate() {
                let tail = if i + 1 < chunks.len() { "," } else { "" };
                writeln!(f, "{}{tail}", chunk.join(", "))?;
            }
        }
    }
    Ok(())
}

fn write_set(f: &mut impl Write, directive: &str, set: &Set) -> fmt::Result {
    write!(f, "*{directive}, {directive}={}", set.name)?;
    if set.generate {
        write!(f, ", GENERATE")?;
    }
    writeln!(f)?;
    for chunk in set.members.chunks(SET_MEMBERS_PER_LINE) {
        let members: Vec<String> = chunk
            .iter()
            .map(|m| match m {
                SetMember::Index(i) => i.to_string(),
                SetMember::Name(n) => n.clone(),
            })
            .collect();
        writeln!(f, "{}", members.join(", "))?;
    }
    Ok(())
}

fn write_shell_section(f: &mut impl Write, section: &ShellSection) -> fmt::Result {
    write!(f, "*SHELL SECTION, ELSET={}", section.element_set)?;
    if let Some(material) = &section.material {
        write!(f, ", MATERIAL={material}")?;
    }
    if let Some(offset) = section.offset {
        write!(f, ", OFFSET={}", real(offset))?;
    }
    if section.nodal_thickness {
        write!(f, ", NODAL THICKNESS")?;
    }
    if section.composite {
        writeln!(f, ", COMPOSITE")?;
        for layer in &section.layers {
            writeln!(f, "{}, , {}", real(layer.thickness), layer.material)?;
        }
    } else {
        writeln!(f)?;
        if let Some(thickness) = section.thickness {
            writeln!(f, "{}", real(thickness))?;
        }
    }
    Ok(())
}

fn write_beam_section(f: &mut impl Write, section: &BeamSection) -> fmt::Result {
    write!(
        f,
        "*BEAM SECTION, SECTION={}, ELSET={}, MATERIAL={}",
        section.section, section.element_set, section.material
    )?;
    if let Some(offset) = section.offset1 {
        write!(f, ", OFFSET1={}", precise(offset))?;
    }
    if let Some(offset) = section.offset2 {
        write!(f, ", OFFSET2={}", precise(offset))?;
    }
    writeln!(f)?;
    let dims: Vec<String> = section.dimensions.iter().map(|v| real(*v)).collect();
    writeln!(f, "{}", dims.join(", "))?;
    let dir: Vec<String> = section.direction.iter().map(|v| real(*v)).collect();
    writeln!(f, "{}", dir.join(", "))
}

fn write_boundaries(f: &mut impl Write, boundaries: &[Boundary]) -> fmt::Result {
    if boundaries.is_empty() {
        return Ok(());
    }
    writeln!(f, "*BOUNDARY")?;
    for b in boundaries {
        let line = optional_fields(&[
            Some(b.target.clone()),
            Some(b.first.to_string()),
            b.last.map(|v| v.to_string()),
            b.value.map(real),
        ]);
        writeln!(f, "{line}")?;
    }
    Ok(())
}

fn write_material(f: &mut impl Write, material: &Material) -> fmt::Result {
    if let Some(name) = &material.name {
        writeln!(f, "*MATERIAL, NAME={name}")?;
    }
    if !material.elastic.is_empty() {
        writeln!(f, "*ELASTIC")?;
        for e in &material.elastic {
            let line = optional_fields(&[
                Some(real(e.modulus)),
                Some(real(e.poisson)),
                e.temperature.map(real),
            ]);
            writeln!(f, "{line}")?;
        }
    }
    if let Some(plastic) = &material.plastic {
        write!(f, "*PLASTIC")?;
        if let Some(hardening) = &plastic.hardening {
            write!(f, ", HARDENING={hardening}")?;
        }
        writeln!(f)?;
        for p in &plastic.points {
            let line = optional_fields(&[
                Some(real(p.stress)),
                Some(real(p.strain)),
                p.temperature.map(real),
            ]);
            writeln!(f, "{line}")?;
        }
    }
    if !material.expansions.is_empty() {
        write!(f, "*EXPANSION")?;
        if let Some(kind) = &material.expansion_type {
            write!(f, ", TYPE={kind}")?;
        }
        if let Some(zero) = material.expansion_zero {
            write!(f, ", ZERO={}", real(zero))?;
        }
        writeln!(f)?;
        for e in &material.expansions {
            let line = optional_fields(&[Some(real(e.value)), e.temperature.map(real)]);
            writeln!(f, "{line}")?;
        }
    }
    if let Some(density) = material.density {
        writeln!(f, "*DENSITY\n{}", real(density))?;
    }
    Ok(())
}

fn write_step(f: &mut impl Write, step: &Step) -> fmt::Result {
    write!(f, "*STEP")?;
    if step.nlgeom {
        write!(f, ", NLGEOM")?;
    }
    if let Some(inc) = step.increments {
        write!(f, ", INC={inc}")?;
    }
    writeln!(f)?;

    if let Some(analysis) = &step.static_analysis {
        write!(f, "*STATIC")?;
        if analysis.direct {
            write!(f, ", DIRECT")?;
        }
        writeln!(f)?;
        if let Some(t) = &analysis.time {
            let line = optional_fields(&[
                Some(real(t.initial_increment)),
                Some(real(t.period)),
                t.minimum_increment.map(real),
                t.maximum_increment.map(real),
            ]);
            writeln!(f, "{line}")?;
        }
    }
    if let Some(buckle) = &step.buckle {
        let line = optional_fields(&[
            Some(buckle.modes.to_string()),
            buckle.accuracy.map(precise),
            buckle.lanczos_vectors.map(|v| v.to_string()),
            buckle.max_iterations.map(|v| v.to_string()),
        ]);
        writeln!(f, "*BUCKLE\n{line}")?;
    }
    if !step.cloads.is_empty() {
        writeln!(f, "*CLOAD")?;
        for load in &step.cloads {
            writeln!(f, "{}, {}, {}", load.target, load.direction, real(load.value))?;
        }
    }
    if !step.dloads.is_empty() {
        writeln!(f, "*DLOAD")?;
        for load in &step.dloads {
            writeln!(f, "{}", load.values.join(", "))?;
        }
    }
    write_temperatures(f, &step.temperatures)?;
    write_boundaries(f, &step.boundaries)?;
    for kind in OutputKind::ALL {
        for request in kind.requests(step) {
            write_output_request(f, kind, request)?;
        }
    }
    writeln!(f, "*END STEP")
}

/// Consecutive temperatures with equal parameters share a header.
fn write_temperatures(f: &mut impl Write, temperatures: &[Temperature]) -> fmt::Result {
    for run in temperatures.chunk_by(|a, b| a.parameters == b.parameters) {
        write!(f, "*TEMPERATURE")?;
        for p in &run[0].parameters {
            write!(f, ", {}", p.render())?;
        }
        writeln!(f)?;
        for t in run {
            let line = optional_fields(&[
                Some(t.target.clone()),
                Some(real(t.value)),
                t.gradient2.map(real),
                t.gradient1.map(real),
            ]);
            writeln!(f, "{line}")?;
        }
    }
    Ok(())
}

fn write_output_request(f: &mut impl Write, kind: OutputKind, request: &OutputRequest) -> fmt::Result {
    write!(f, "*{}", kind.keyword())?;
    if let Some(set) = &request.set {
        write!(f, ", {}={set}", kind.set_parameter())?;
    }
    if let Some(frequency) = request.frequency {
        write!(f, ", FREQUENCY={frequency}")?;
    }
    if let Some(output) = &request.output {
        write!(f, ", OUTPUT={output}")?;
    }
    if let Some(totals) = request.totals {
        write!(f, ", TOTALS={}", totals.as_str())?;
    }
    if let Some(tp) = &request.time_points {
        write!(f, ", TIME POINTS={tp}")?;
    }
    if request.contact_elements {
        write!(f, ", CONTACT ELEMENT")?;
    }
    if let Some(global) = request.global {
        write!(f, ", GLOBAL={}", if global { "YES" } else { "NO" })?;
    }
    writeln!(f)?;
    if !request.variables.is_empty() {
        writeln!(f, "{}", request.variables.join(", "))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(src: &str) -> (String, String) {
        let first = Model::parse_str(src).expect("source parses").to_inp();
        let second = Model::parse_str(&first)
            .unwrap_or_else(|e| panic!("rendered deck should parse:\n{first}\n{e}"))
            .to_inp();
        (first, second)
    }

    #[test]
    fn node_headers_follow_set_changes() {
        let src = "*NODE, NSET=A\n1,0,0,0\n2,1,0,0\n*NODE\n3,0,1,0\n*NODE, NSET=A\n4,0,0,1\n";
        let (text, again) = round_trip(src);
        assert_eq!(text.matches("*NODE").count(), 3);
        assert!(text.starts_with("*NODE, NSET=A\n    1, +0.000000000000E+00, "));
        assert_eq!(text, again);
    }

    #[test]
    fn grouped_nodes_keep_a_single_header() {
        let (text, again) = round_trip("*NODE, NSET=A\n1,0,0,0\n*NODE, NSET=A\n2,1,0,0\n");
        assert_eq!(text.matches("*NODE").count(), 1);
        assert_eq!(text, again);
    }

    #[test]
    fn long_elements_wrap_with_trailing_comma() {
        let nodes: Vec<String> = (1..=20).map(|i| i.to_string()).collect();
        let src = format!(
            "*ELEMENT, TYPE=C3D20\n1, {},\n{}\n",
            nodes[..15].join(", "),
            nodes[15..].join(", ")
        );
        let (text, again) = round_trip(&src);
        assert!(text.contains("1, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15,\n16, 17, 18, 19, 20\n"));
        assert_eq!(text, again);
    }

    #[test]
    fn optional_fields_keep_inner_blanks() {
        assert_eq!(
            optional_fields(&[Some("A".into()), None, Some("B".into()), None]),
            "A, , B"
        );
    }

    #[test]
    fn step_round_trip() {
        let src = "*STEP, NLGEOM, INC=50\n*STATIC\n0.1, 1., , 0.5\n*CLOAD\nLOAD, 3, -1.\n\
                   *TEMPERATURE, OP=NEW\nNALL, 20.\nN1, 30., , 2.\n*TEMPERATURE\nN2, 5.\n\
                   *NODE PRINT, NSET=FIX, TOTALS=ONLY, GLOBAL=NO\nRF\n*EL FILE, FREQUENCY=2\nS\n*END STEP\n";
        let (text, again) = round_trip(src);
        assert!(text.contains("*STEP, NLGEOM, INC=50\n"));
        assert!(text.contains("1.00000000E-01, 1.00000000E+00, , 5.00000000E-01\n"));
        assert_eq!(text.matches("*TEMPERATURE").count(), 2);
        assert!(text.contains("N1, 3.00000000E+01, , 2.00000000E+00\n"));
        assert!(text.ends_with("*END STEP\n"));
        assert_eq!(text, again);
    }

    #[test]
    fn contact_element_flag_is_written_singular() {
        let (text, again) = round_trip("*STEP\n*EL FILE, CONTACT ELEMENTS\nS\n*END STEP\n");
        assert!(text.contains("*EL FILE, CONTACT ELEMENT\n"));
        assert!(!text.contains("CONTACT ELEMENTS"));
        assert_eq!(text, again);
    }

    #[test]
    fn empty_model_renders_nothing() {
        assert_eq!(Model::default().to_inp(), "");
    }
}
