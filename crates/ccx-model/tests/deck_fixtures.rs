//! Round-trip and content checks against the deck fixtures.

use ccx_inp::InpError;
use ccx_model::{Model, ModelSummary, SetMember, Totals};
use std::fs;
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("../../tests/fixtures/inp");
    path.push(name);
    path
}

fn load(name: &str) -> Model {
    let bytes = fs::read(fixture_path(name)).expect("fixture should exist");
    Model::parse(&bytes).unwrap_or_else(|e| panic!("{name} should parse:\n{e}"))
}

fn assert_fixed_point(name: &str) {
    let model = load(name);
    let first = model.to_inp();
    let reparsed = Model::parse_str(&first)
        .unwrap_or_else(|e| panic!("rendered {name} should parse:\n{first}\n{e}"));
    assert_eq!(reparsed, model, "{name}: model changed across a round trip");
    assert_eq!(reparsed.to_inp(), first, "{name}: rendering is not a fixed point");
}

#[test]
fn every_fixture_is_a_round_trip_fixed_point() {
    for name in ["beam_buckle.inp", "shell_static.inp", "solid_plastic.inp"] {
        assert_fixed_point(name);
    }
}

/// Decks that are valid but padded with blanks, bare commas or long lists.
#[test]
fn irregular_data_lines_reach_a_fixed_point() {
    let decks = [
        ("heading", "*HEADING\nfirst line\n  second ,  line \n*NODE\n1, 0, 0, 0\n"),
        ("nset", "*NSET, NSET=A\n1, 2,\n , ,\n  3 ,\n*NSET, NSET=B\nA, 4\n"),
        ("elset", "*ELSET, ELSET=E, GENERATE\n 1 , 9 , 2 ,\n*ELSET, ELSET=F\n,\nE\n"),
        (
            "time points",
            "*TIME POINTS, NAME=T1\n0., .1, .2, .3,\n.4, .5, .6, .7, .8, .9,\n , \n1.\n",
        ),
        (
            "initial conditions",
            "*INITIAL CONDITIONS, TYPE=TEMPERATURE\n NALL ,  20.,\nN1, 25. , ,\n",
        ),
        (
            "dload",
            "*STEP\n*STATIC\n*DLOAD\n E1 , P1 ,  1. ,\nEALL, GRAV, 9.81, , , -1.\n*END STEP\n",
        ),
        (
            "temperature",
            "*STEP\n*TEMPERATURE, OP=NEW\nNALL , 20. , ,\nN1, 30., , 2.,\n*END STEP\n",
        ),
    ];

    for (case, src) in decks {
        let model = Model::parse_str(src).unwrap_or_else(|e| panic!("{case} should parse:\n{e}"));
        let first = model.to_inp();
        let reparsed = Model::parse_str(&first)
            .unwrap_or_else(|e| panic!("rendered {case} should parse:\n{first}\n{e}"));
        assert_eq!(reparsed, model, "{case}: model changed across a round trip");
        assert_eq!(reparsed.to_inp(), first, "{case}: rendering is not a fixed point");
    }
}

#[test]
fn long_time_point_list_spans_several_lines() {
    let values: Vec<String> = (0..20).map(|i| format!("{}.", i)).collect();
    let src = format!("*TIME POINTS, NAME=T1\n{}\n", values.join(", "));
    let model = Model::parse_str(&src).expect("time points should parse");
    let text = model.to_inp();
    let data_lines = text.lines().skip(1).count();
    assert!(data_lines > 1, "expected wrapped output:\n{text}");
    assert_eq!(
        Model::parse_str(&text).expect("rendered deck should parse").to_inp(),
        text
    );
}

#[test]
fn beam_buckle_fixture() {
    let model = load("beam_buckle.inp");
    assert_eq!(model.heading, "CANTILEVER COLUMN, EULER BUCKLING");
    assert_eq!(model.nodes.len(), 5);
    assert_eq!(model.elements.len(), 2);
    assert_eq!(model.elements[1].nodes, vec![3, 4, 5]);

    let steel = model.material("STEEL").expect("STEEL material");
    assert_eq!(steel.elastic[0].modulus, 2.1e11);
    assert_eq!(steel.density, Some(7850.0));

    let beam = &model.beam_sections[0];
    assert_eq!(beam.section, "RECT");
    assert_eq!(beam.dimensions, vec![0.05, 0.08]);
    assert_eq!(beam.direction, [1.0, 0.0, 0.0]);

    let step = &model.steps[0];
    let buckle = step.buckle.as_ref().expect("buckling step");
    assert_eq!(buckle.modes, 4);
    assert_eq!(buckle.accuracy, Some(1e-6));
    assert_eq!(step.cloads[0].direction, 3);
    assert_eq!(step.node_files[0].variables, vec!["U"]);
    assert_eq!(step.element_prints[0].set.as_deref(), Some("COLUMN"));
}

#[test]
fn shell_static_fixture() {
    let model = load("shell_static.inp");
    let generated = model.element_set("ALLEL").expect("ALLEL set");
    assert!(generated.generate);
    assert_eq!(
        model.node_set("LOADED").expect("LOADED set").members,
        vec![SetMember::Name("PLATE".to_string())]
    );
    assert_eq!(model.surfaces[0].entries[0].face.as_deref(), Some("SPOS"));
    assert_eq!(model.shell_sections[0].thickness, Some(0.01));
    assert_eq!(model.shell_sections[0].offset, Some(0.5));
    assert_eq!(model.materials[0].expansion_zero, Some(20.0));
    assert_eq!(model.initial_conditions[0].kind, "TEMPERATURE");

    let tp = model.time_points.as_ref().expect("time points");
    assert_eq!(tp.times, vec![0.0, 1.0, 0.25]);

    let step = &model.steps[0];
    assert!(step.nlgeom);
    assert_eq!(step.increments, Some(200));
    let time = step
        .static_analysis
        .as_ref()
        .and_then(|s| s.time.as_ref())
        .expect("static time");
    assert_eq!(time.minimum_increment, Some(1e-5));
    assert_eq!(time.maximum_increment, Some(0.5));
    assert_eq!(step.dloads[0].values, vec!["PLATE", "P", "1000."]);
    assert_eq!(step.temperatures[0].value, 80.0);
    assert_eq!(step.node_prints[0].totals, Some(Totals::Yes));
    assert_eq!(step.node_files[0].time_points.as_deref(), Some("TP"));
    assert_eq!(step.element_files[0].global, Some(false));
}

#[test]
fn solid_plastic_fixture() {
    let model = load("solid_plastic.inp");
    assert_eq!(model.elements.len(), 1);
    assert_eq!(model.elements[0].nodes, (1..=20).collect::<Vec<i64>>());

    let plastic = model.materials[0].plastic.as_ref().expect("plastic curve");
    assert_eq!(plastic.hardening.as_deref(), Some("ISOTROPIC"));
    assert_eq!(plastic.points.len(), 3);
    assert_eq!(plastic.points[2].strain, 0.2);

    let summary = ModelSummary::from_model(&model);
    assert_eq!(summary.element_types.get("C3D20"), Some(&1));
    assert!(summary.has_nlgeom);
    assert_eq!(summary.boundaries, 2);

    let step = &model.steps[0];
    assert!(step.static_analysis.as_ref().is_some_and(|s| s.direct));
    assert_eq!(step.boundaries[0].value, Some(0.05));
    assert_eq!(step.element_prints[0].variables, vec!["S", "PEEQ"]);
}

#[test]
fn fortran_exponent_matches_plain_exponent() {
    let d = Model::parse_str("*MATERIAL, NAME=M\n*ELASTIC\n2.9D+07, 0.3\n").expect("D exponent");
    let e = Model::parse_str("*MATERIAL, NAME=M\n*ELASTIC\n2.9E+07, 0.3\n").expect("E exponent");
    assert_eq!(d.materials[0].elastic[0].modulus, 2.9e7);
    assert_eq!(d, e);
}

#[test]
fn one_bad_node_line_leaves_other_blocks_intact() {
    let src = "\
*NODE, NSET=NALL
1, 0, 0, 0
2, 1, 0
3, 2, 0, 0
*ELEMENT, TYPE=T3D2, ELSET=BARS
1, 1, 3
*MATERIAL, NAME=STEEL
*ELASTIC
2.1E+11, 0.3
";
    let (model, errors) = Model::parse_with_diagnostics(src.as_bytes());
    let leaves: Vec<&InpError> = errors.iter().flat_map(|e| e.leaves()).collect();
    assert_eq!(leaves.len(), 1);
    assert!(matches!(leaves[0], InpError::Field { line: 3, .. }));
    assert!(model.nodes.is_empty());
    assert_eq!(model.elements.len(), 1);
    assert_eq!(model.materials[0].elastic.len(), 1);
    assert!(Model::parse_str(src).is_err());
}

#[test]
fn consecutive_steps_are_kept_in_order() {
    let src = "\
*NODE
1, 0, 0, 0
*STEP
*STATIC
*CLOAD
1, 1, 5.
*END STEP
*STEP
*BUCKLE
2
*END STEP
";
    let model = Model::parse_str(src).expect("two steps");
    assert_eq!(model.steps.len(), 2);
    assert!(model.steps[0].is_static());
    assert!(model.steps[1].is_buckling());
    let text = model.to_inp();
    assert_eq!(text.matches("*END STEP").count(), 2);
}
