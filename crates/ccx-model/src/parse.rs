//! Model-level directive parsers. Each parser builds its entities locally
//! and commits them to the model only when the whole block is valid.

use std::ops::RangeInclusive;

use ccx_inp::{Block, InpError, Line, fields, parse_header, parse_integer, tokens};

use crate::dispatch::{BlockErrors, collected};
use crate::model::{
    BeamSection, Boundary, ConditionEntry, CouplingEntry, DistributingCoupling, Elastic, Element,
    Expansion, InitialCondition, Material, Model, Node, Plastic, PlasticPoint, RigidBody, Set,
    SetMember, ShellLayer, ShellSection, SolidSection, Spring, Surface, SurfaceEntry, SurfaceKind,
    TimePoints,
};

/// Maximum entries on one `*ELEMENT` data line before a continuation.
pub const ELEMENT_ENTRIES_PER_LINE: usize = 16;

/// Parses every data line, collecting one error per bad line.
pub(crate) fn each_line<T>(
    block: &Block,
    mut parse: impl FnMut(&Line) -> Result<T, InpError>,
) -> Result<Vec<T>, BlockErrors> {
    let mut out = Vec::with_capacity(block.data().len());
    let mut errors = Vec::new();
    for line in block.data() {
        match parse(line) {
            Ok(value) => out.push(value),
            Err(err) => errors.push(err),
        }
    }
    collected(errors)?;
    Ok(out)
}

pub(crate) fn no_data(block: &Block) -> Result<(), InpError> {
    match block.data().first() {
        None => Ok(()),
        Some(line) => Err(line.error(format!("*{} takes no data lines", block.keyword()))),
    }
}

fn expect_count(
    line: &Line,
    found: usize,
    range: RangeInclusive<usize>,
    what: &str,
) -> Result<(), InpError> {
    if range.contains(&found) {
        return Ok(());
    }
    let expected = if range.start() == range.end() {
        range.start().to_string()
    } else {
        format!("{} to {}", range.start(), range.end())
    };
    Err(line.error(format!("expected {expected} fields ({what}), found {found}")))
}

fn optional_real(line: &Line, field: Option<&&str>) -> Result<Option<f64>, InpError> {
    match field {
        Some(raw) if !raw.is_empty() => line.real(raw).map(Some),
        _ => Ok(None),
    }
}

pub fn heading(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    parse_header(block.header())?.parameters.finish()?;
    let text = block
        .data()
        .iter()
        .map(|l| l.text.as_str())
        .collect::<Vec<_>>()
        .join("\n");
    if model.heading.is_empty() {
        model.heading = text;
    } else if !text.is_empty() {
        model.heading.push('\n');
        model.heading.push_str(&text);
    }
    Ok(())
}

pub fn node(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let node_set = params.take_value("NSET")?;
    params.finish()?;

    let nodes = each_line(block, |line| {
        let t = tokens(&line.text);
        expect_count(line, t.len(), 4..=4, "index, x, y, z")?;
        Ok(Node {
            index: line.integer(t[0])?,
            node_set: node_set.clone(),
            coord: [line.real(t[1])?, line.real(t[2])?, line.real(t[3])?],
        })
    })?;
    model.nodes.extend(nodes);
    Ok(())
}

pub fn element(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let element_type = params.take_value("TYPE")?;
    let element_set = params.take_value("ELSET")?;
    params.finish()?;

    let mut elements = Vec::new();
    let mut errors = Vec::new();
    let mut pending: Vec<i64> = Vec::new();
    let mut broken = false;

    for line in block.data() {
        let entries = tokens(&line.text);
        match entries.iter().map(|t| line.integer(t)).collect::<Result<Vec<_>, _>>() {
            Ok(values) => pending.extend(values),
            Err(err) => {
                errors.push(err);
                broken = true;
            }
        }
        if line.text.ends_with(',') && entries.len() == ELEMENT_ENTRIES_PER_LINE {
            continue;
        }
        if !broken {
            match pending.split_first() {
                Some((&index, nodes)) => elements.push(Element {
                    index,
                    element_type: element_type.clone(),
                    element_set: element_set.clone(),
                    nodes: nodes.to_vec(),
                }),
                None => errors.push(line.error("element line without an index")),
            }
        }
        pending.clear();
        broken = false;
    }
    if let Some(last) = block.data().last()
        && (broken || !pending.is_empty())
    {
        errors.push(last.error("element continues past the end of the block"));
    }

    collected(errors)?;
    model.elements.extend(elements);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKind {
    Node,
    Element,
}

impl SetKind {
    pub fn parameter(self) -> &'static str {
        match self {
            SetKind::Node => "NSET",
            SetKind::Element => "ELSET",
        }
    }
}

/// Shared by `*NSET` and `*ELSET`.
pub fn set(model: &mut Model, block: &Block, kind: SetKind) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let name = params.require_value(kind.parameter())?;
    let generate = params.take_flag("GENERATE")?;
    params.finish()?;

    let rows = each_line(block, |line| {
        tokens(&line.text)
            .into_iter()
            .map(|t| match parse_integer(t) {
                Some(index) => Ok(SetMember::Index(index)),
                None if generate => Err(line.error(format!("GENERATE range needs integers, found `{t}`"))),
                None => Ok(SetMember::Name(t.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let set = Set {
        name,
        generate,
        members: rows.into_iter().flatten().collect(),
    };
    match kind {
        SetKind::Node => model.node_sets.push(set),
        SetKind::Element => model.element_sets.push(set),
    }
    Ok(())
}

pub fn material(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let name = params.require_value("NAME")?;
    params.finish()?;
    no_data(block)?;
    model.materials.push(Material {
        name: Some(name),
        ..Material::default()
    });
    Ok(())
}

pub fn density(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    parse_header(block.header())?.parameters.finish()?;
    let [line] = block.data() else {
        return Err(block.header().error("*DENSITY takes exactly one data line").into());
    };
    let t = tokens(&line.text);
    expect_count(line, t.len(), 1..=1, "density")?;
    let value = line.real(t[0])?;
    model.current_material().density = Some(value);
    Ok(())
}

pub fn elastic(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    if let Some(kind) = params.take_value("TYPE")?
        && kind != "ISO"
    {
        return Err(params
            .field_error(format!("unsupported elastic TYPE={kind}"))
            .into());
    }
    params.finish()?;

    let rows = each_line(block, |line| {
        let t = tokens(&line.text);
        expect_count(line, t.len(), 2..=3, "modulus, poisson[, temperature]")?;
        Ok(Elastic {
            modulus: line.real(t[0])?,
            poisson: line.real(t[1])?,
            temperature: t.get(2).map(|raw| line.real(raw)).transpose()?,
        })
    })?;
    model.current_material().elastic.extend(rows);
    Ok(())
}

pub fn expansion(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let kind = params.take_value("TYPE")?;
    let zero = params.take_real("ZERO")?;
    params.finish()?;

    let rows = each_line(block, |line| {
        let t = tokens(&line.text);
        expect_count(line, t.len(), 1..=2, "value[, temperature]")?;
        Ok(Expansion {
            value: line.real(t[0])?,
            temperature: t.get(1).map(|raw| line.real(raw)).transpose()?,
        })
    })?;

    let material = model.current_material();
    if kind.is_some() {
        material.expansion_type = kind;
    }
    if zero.is_some() {
        material.expansion_zero = zero;
    }
    material.expansions.extend(rows);
    Ok(())
}

pub fn plastic(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let hardening = params.take_value("HARDENING")?;
    params.finish()?;

    if let Some(extra) = block.data().get(Plastic::CAPACITY) {
        return Err(extra
            .error(format!(
                "hardening curve holds at most {} points",
                Plastic::CAPACITY
            ))
            .into());
    }
    let points = each_line(block, |line| {
        let t = tokens(&line.text);
        expect_count(line, t.len(), 2..=3, "stress, plastic strain[, temperature]")?;
        Ok(PlasticPoint {
            stress: line.real(t[0])?,
            strain: line.real(t[1])?,
            temperature: t.get(2).map(|raw| line.real(raw)).transpose()?,
        })
    })?;
    model.current_material().plastic = Some(Plastic { hardening, points });
    Ok(())
}

/// `*BOUNDARY` at model or step level.
pub fn boundary(block: &Block) -> Result<Vec<Boundary>, BlockErrors> {
    parse_header(block.header())?.parameters.finish()?;
    each_line(block, |line| {
        let f = fields(&line.text);
        expect_count(line, f.len(), 2..=4, "target, first[, last[, value]]")?;
        if f[0].is_empty() {
            return Err(line.error("boundary without a target"));
        }
        let last = match f.get(2) {
            Some(raw) if !raw.is_empty() => Some(line.integer(raw)?),
            _ => None,
        };
        Ok(Boundary {
            target: f[0].to_string(),
            first: line.integer(f[1])?,
            last,
            value: optional_real(line, f.get(3))?,
        })
    })
}

pub fn surface(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let name = params.require_value("NAME")?;
    let kind = match params.take_value("TYPE")?.as_deref() {
        None | Some("ELEMENT") => SurfaceKind::Element,
        Some("NODE") => SurfaceKind::Node,
        Some(other) => {
            return Err(params
                .field_error(format!("unknown surface TYPE={other}"))
                .into());
        }
    };
    params.finish()?;

    let entries = each_line(block, |line| {
        let f = fields(&line.text);
        expect_count(line, f.len(), 1..=2, "target[, face]")?;
        Ok(SurfaceEntry {
            target: f[0].to_string(),
            face: f.get(1).filter(|s| !s.is_empty()).map(|s| s.to_string()),
        })
    })?;
    model.surfaces.push(Surface {
        name,
        kind,
        entries,
    });
    Ok(())
}

pub fn solid_section(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let element_set = params.require_value("ELSET")?;
    let material = params.require_value("MATERIAL")?;
    params.finish()?;
    no_data(block)?;
    model.solid_sections.push(SolidSection {
        element_set,
        material,
    });
    Ok(())
}

pub fn shell_section(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let mut section = ShellSection {
        element_set: params.require_value("ELSET")?,
        material: params.take_value("MATERIAL")?,
        offset: params.take_real("OFFSET")?,
        nodal_thickness: params.take_flag("NODAL THICKNESS")?,
        composite: params.take_flag("COMPOSITE")?,
        ..ShellSection::default()
    };
    if !section.composite && section.material.is_none() {
        return Err(params
            .field_error("missing required parameter MATERIAL".to_string())
            .into());
    }
    params.finish()?;

    if section.composite {
        if let Some(extra) = block.data().get(ShellSection::MAX_LAYERS) {
            return Err(extra
                .error(format!(
                    "composite shell holds at most {} layers",
                    ShellSection::MAX_LAYERS
                ))
                .into());
        }
        section.layers = each_line(block, |line| {
            let f = fields(&line.text);
            expect_count(line, f.len(), 3..=3, "thickness, , material")?;
            if f[2].is_empty() {
                return Err(line.error("composite layer without a material"));
            }
            Ok(ShellLayer {
                thickness: line.real(f[0])?,
                material: f[2].to_string(),
            })
        })?;
    } else {
        match block.data() {
            [] => {}
            [line] => {
                let t = tokens(&line.text);
                expect_count(line, t.len(), 1..=1, "thickness")?;
                section.thickness = Some(line.real(t[0])?);
            }
            [_, extra, ..] => return Err(extra.error("*SHELL SECTION takes one thickness line").into()),
        }
    }
    model.shell_sections.push(section);
    Ok(())
}

pub fn beam_section(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let section = params.require_value("SECTION")?;
    let element_set = params.require_value("ELSET")?;
    let material = params.require_value("MATERIAL")?;
    let offset1 = params.take_real("OFFSET1")?;
    let offset2 = params.take_real("OFFSET2")?;
    params.finish()?;

    let [dims, dir] = block.data() else {
        return Err(block
            .header()
            .error("*BEAM SECTION takes exactly two data lines")
            .into());
    };
    let dimensions = tokens(&dims.text)
        .into_iter()
        .map(|t| dims.real(t))
        .collect::<Result<Vec<_>, _>>()?;
    if dimensions.is_empty() {
        return Err(dims.error("beam section without dimensions").into());
    }
    let d = tokens(&dir.text);
    expect_count(dir, d.len(), 3..=3, "direction x, y, z")?;
    let direction = [dir.real(d[0])?, dir.real(d[1])?, dir.real(d[2])?];

    model.beam_sections.push(BeamSection {
        section,
        element_set,
        material,
        offset1,
        offset2,
        dimensions,
        direction,
    });
    Ok(())
}

pub fn time_points(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let name = params.require_value("NAME")?;
    let generate = params.take_flag("GENERATE")?;
    params.finish()?;
    if let Some(existing) = &model.time_points {
        return Err(block
            .header()
            .error(format!(
                "second *TIME POINTS definition; `{}` is already defined",
                existing.name
            ))
            .into());
    }

    let rows = each_line(block, |line| {
        tokens(&line.text)
            .into_iter()
            .map(|t| line.real(t))
            .collect::<Result<Vec<_>, _>>()
    })?;
    model.time_points = Some(TimePoints {
        name,
        generate,
        times: rows.into_iter().flatten().collect(),
    });
    Ok(())
}

pub fn spring(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let element_set = params.require_value("ELSET")?;
    params.finish()?;

    let (freedom_line, constant_line) = match block.data() {
        [constant] => (None, constant),
        [freedoms, constant] => (Some(freedoms), constant),
        _ => {
            return Err(block
                .header()
                .error("*SPRING takes an optional freedom line and a constant line")
                .into());
        }
    };
    let freedoms = match freedom_line {
        Some(line) => {
            let t = tokens(&line.text);
            expect_count(line, t.len(), 1..=2, "first[, second] degree of freedom")?;
            t.iter().map(|raw| line.integer(raw)).collect::<Result<Vec<_>, _>>()?
        }
        None => Vec::new(),
    };
    let t = tokens(&constant_line.text);
    expect_count(constant_line, t.len(), 1..=1, "spring constant")?;
    let constant = constant_line.real(t[0])?;

    model.springs.push(Spring {
        element_set,
        freedoms,
        constant,
    });
    Ok(())
}

pub fn rigid_body(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let body = RigidBody {
        node_set: params.take_value("NSET")?,
        element_set: params.take_value("ELSET")?,
        ref_node: params.take_integer("REF NODE")?,
        rot_node: params.take_integer("ROT NODE")?,
    };
    if body.node_set.is_some() == body.element_set.is_some() {
        return Err(params
            .field_error("*RIGID BODY needs exactly one of NSET or ELSET".to_string())
            .into());
    }
    params.finish()?;
    no_data(block)?;
    model.rigid_bodies.push(body);
    Ok(())
}

pub fn distributing_coupling(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let element_set = params.require_value("ELSET")?;
    params.finish()?;
    if block.data().is_empty() {
        return Err(block
            .header()
            .error("*DISTRIBUTING COUPLING needs at least one node line")
            .into());
    }

    let entries = each_line(block, |line| {
        let f = fields(&line.text);
        expect_count(line, f.len(), 2..=2, "node or node set, weight")?;
        Ok(CouplingEntry {
            target: f[0].to_string(),
            weight: line.real(f[1])?,
        })
    })?;
    model.distributing_couplings.push(DistributingCoupling {
        element_set,
        entries,
    });
    Ok(())
}

pub fn initial_conditions(model: &mut Model, block: &Block) -> Result<(), BlockErrors> {
    let mut params = parse_header(block.header())?.parameters;
    let kind = params.require_value("TYPE")?;
    params.finish()?;

    let entries = each_line(block, |line| {
        let f = fields(&line.text);
        if f.len() < 2 || f[0].is_empty() {
            return Err(line.error("expected target followed by at least one value"));
        }
        Ok(ConditionEntry {
            target: f[0].to_string(),
            values: f[1..]
                .iter()
                .map(|raw| line.real(raw))
                .collect::<Result<Vec<_>, _>>()?,
        })
    })?;
    model.initial_conditions.push(InitialCondition { kind, entries });
    Ok(())
}
