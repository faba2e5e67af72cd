use std::path::Path;
use std::process::ExitCode;

use ccx_io::{
    DatReport, IoError, StaadModel, StaadOptions, read_model, read_report, save_snapshot,
    support_totals, write_new_file,
};
use ccx_model::{Model, ModelSummary};
use clap::{Arg, ArgAction, ArgMatches, Command};
use tracing::debug;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    const VERSION: &str = concat!("v", env!("CARGO_PKG_VERSION"));

    Command::new("ccx-cli")
        .version(VERSION)
        .propagate_version(true)
        .about("Read, normalize and convert CalculiX input decks and .dat reports.")
        .disable_help_subcommand(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log parsing progress to stderr (overridden by RUST_LOG)."),
        )
        .subcommand(
            Command::new("analyze")
                .about("Summarize the entities defined by a deck")
                .arg(json_flag())
                .arg(input("The .inp deck to summarize.")),
        )
        .subcommand(
            Command::new("format")
                .about("Print the deck in canonical form")
                .arg(input("The .inp deck to normalize.")),
        )
        .subcommand(
            Command::new("check")
                .about("Verify that the deck survives a parse/write round trip unchanged")
                .arg(input("The .inp deck to check.")),
        )
        .subcommand(
            Command::new("dat")
                .about("Summarize a .dat results report")
                .arg(json_flag())
                .arg(input("The .dat report to scan.")),
        )
        .subcommand(
            Command::new("staad")
                .about("Convert the deck geometry to STAAD.Pro text")
                .arg(output("Write to this file instead of stdout; it must not exist yet."))
                .arg(input("The .inp deck to convert.")),
        )
        .subcommand(
            Command::new("snapshot")
                .about("Save a parsed deck (.inp) or report (.dat) as JSON")
                .arg(input("The .inp deck or .dat report to parse."))
                .arg(
                    Arg::new("target")
                        .required(true)
                        .help("Where to write the JSON snapshot."),
                ),
        )
}

fn input(help: &'static str) -> Arg {
    Arg::new("filename").required(true).help(help)
}

fn output(help: &'static str) -> Arg {
    Arg::new("output").short('o').long("output").help(help)
}

fn json_flag() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print JSON instead of plain text.")
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn filename(matches: &ArgMatches) -> &str {
    matches
        .get_one::<String>("filename")
        .map(String::as_str)
        .unwrap_or_default()
}

fn print_summary(summary: &ModelSummary) {
    println!("heading: {}", summary.heading);
    println!("nodes: {}", summary.nodes);
    println!("elements: {}", summary.elements);
    for (kind, count) in &summary.element_types {
        println!("  {kind}: {count}");
    }
    println!("node_sets: {}", summary.node_sets);
    println!("element_sets: {}", summary.element_sets);
    println!("materials: {}", summary.materials);
    println!("sections: {}", summary.sections);
    println!("boundaries: {}", summary.boundaries);
    println!("steps: {}", summary.steps);
    println!("has_static: {}", summary.has_static);
    println!("has_buckle: {}", summary.has_buckle);
    println!("has_nlgeom: {}", summary.has_nlgeom);
    if let Some(max) = summary.max_node_index {
        println!("max_node_index: {max}");
    }
}

fn report_lines(report: &DatReport) -> Vec<String> {
    let mut lines = vec![format!("max_time: {:e}", report.max_time())];
    if !report.buckling_factors.is_empty() {
        let factors: Vec<String> = report
            .buckling_factors
            .iter()
            .map(|f| format!("{f:e}"))
            .collect();
        lines.push(format!("buckling_factors: {}", factors.join(", ")));
    }
    lines.push(format!("displacements: {}", report.displacements.len()));
    lines.push(format!("eigen_modes: {}", report.eigen_modes.len()));
    lines.push(format!("forces: {}", report.forces.len()));
    lines.push(format!("total_forces: {}", report.total_forces.len()));
    lines.push(format!("temperatures: {}", report.temperatures.len()));
    lines.push(format!("plastic_strains: {}", report.plastic_strains.len()));
    lines.push(format!("stresses: {}", report.stresses.len()));
    if let Some((record, mises)) = report.peak_stress() {
        let tensor = record.tensor();
        let principal = tensor.principal();
        lines.push(format!(
            "peak_von_mises: {mises:e} (element {}, point {}, time {:e})",
            record.element, record.integration_point, record.time
        ));
        lines.push(format!(
            "  principal: {:e}, {:e}, {:e}",
            principal.max, principal.mid, principal.min
        ));
        lines.push(format!("  hydrostatic: {:e}", tensor.hydrostatic()));
    }
    for total in support_totals(report) {
        lines.push(format!(
            "support {} at {:e}: {:e}, {:e}, {:e} ({} nodes)",
            total.set, total.time, total.load[0], total.load[1], total.load[2], total.nodes
        ));
    }
    lines
}

/// Serializes, re-parses and re-serializes; the two texts must match.
fn round_trip(model: &Model) -> Result<Option<(String, String)>, IoError> {
    let first = model.to_inp();
    let second = Model::parse_str(&first)?.to_inp();
    if first == second {
        Ok(None)
    } else {
        Ok(Some((first, second)))
    }
}

fn first_difference(a: &str, b: &str) -> usize {
    a.lines()
        .zip(b.lines())
        .position(|(x, y)| x != y)
        .unwrap_or_else(|| a.lines().count().min(b.lines().count()))
        + 1
}

fn run(matches: &ArgMatches) -> Result<ExitCode, IoError> {
    match matches.subcommand() {
        Some(("analyze", submatches)) => {
            let model = read_model(filename(submatches))?;
            let summary = ModelSummary::from_model(&model);
            if submatches.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Some(("format", submatches)) => {
            let model = read_model(filename(submatches))?;
            print!("{}", model.to_inp());
        }
        Some(("check", submatches)) => {
            let model = read_model(filename(submatches))?;
            if let Some((first, second)) = round_trip(&model)? {
                eprintln!(
                    "round trip is not stable: first difference at output line {}",
                    first_difference(&first, &second)
                );
                return Ok(ExitCode::from(1));
            }
            println!("ok");
        }
        Some(("dat", submatches)) => {
            let report = read_report(filename(submatches))?;
            if submatches.get_flag("json") {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for line in report_lines(&report) {
                    println!("{line}");
                }
            }
        }
        Some(("staad", submatches)) => {
            let model = read_model(filename(submatches))?;
            let staad = StaadModel::from_model(&model);
            if staad.skipped > 0 {
                tracing::warn!(skipped = staad.skipped, "elements left out of the STAAD model");
            }
            let text = staad.render(&StaadOptions::default());
            match submatches.get_one::<String>("output") {
                Some(path) => write_new_file(path, text.as_bytes())?,
                None => print!("{text}"),
            }
        }
        Some(("snapshot", submatches)) => {
            let source = filename(submatches);
            let target = submatches
                .get_one::<String>("target")
                .map(String::as_str)
                .unwrap_or_default();
            let is_report = Path::new(source)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("dat"));
            if is_report {
                save_snapshot(target, &read_report(source)?)?;
            } else {
                save_snapshot(target, &read_model(source)?)?;
            }
        }
        Some(_) => {
            println!("No valid subcommand was used");
            return Ok(ExitCode::from(2));
        }
        None => {
            println!("usage: ccx-cli [COMMAND] ...");
            println!("Try '--help' for more information.");
            return Ok(ExitCode::from(2));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    let matches = cli().get_matches();
    init_logging(matches.get_flag("verbose"));
    debug!(command = ?matches.subcommand_name(), "starting");

    match run(&matches) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn verbose_is_accepted_after_the_subcommand() {
        let matches = cli()
            .try_get_matches_from(["ccx-cli", "dat", "job.dat", "--verbose", "--json"])
            .expect("arguments should parse");
        assert!(matches.get_flag("verbose"));
        let (name, sub) = matches.subcommand().expect("subcommand");
        assert_eq!(name, "dat");
        assert!(sub.get_flag("json"));
        assert_eq!(filename(sub), "job.dat");
    }

    #[test]
    fn round_trip_detects_stable_output() {
        let model = Model::parse_str("*NODE, NSET=NALL\n1, 0, 0, 0\n").expect("deck should parse");
        assert!(round_trip(&model).expect("reparse").is_none());
    }

    #[test]
    fn report_summary_lists_peak_stress_invariants() {
        let report = DatReport::parse_str(
            "\n stresses (elem, integ.pnt.,sxx,syy,szz,sxy,sxz,syz) for set EALL and time  0.1000000E+01\n\n\
             1 1 3.0E+00 3.0E+00 3.0E+00 0.0E+00 0.0E+00 0.0E+00\n",
        )
        .expect("report should scan");
        let lines = report_lines(&report);
        assert!(lines.contains(&"stresses: 1".to_string()));
        assert!(lines.iter().any(|l| l.starts_with("peak_von_mises: 0e0 (element 1, point 1")));
        assert!(lines.contains(&"  hydrostatic: 3e0".to_string()));
    }

    #[test]
    fn first_difference_is_one_based() {
        assert_eq!(first_difference("A\nB\nC", "A\nX\nC"), 2);
        assert_eq!(first_difference("A", "A\nB"), 2);
    }
}
