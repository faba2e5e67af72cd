//! Scanner for the CalculiX `.dat` results report.
//!
//! The report is a sequence of sections, each opened by a header such as
//! `displacements (vx,vy,vz) for set NALL and time  0.1000000E+01`, followed
//! by a separator line and data rows up to the next blank line. Section kinds
//! are scanned one after another over the same line buffer; every line a
//! scan claims is marked consumed, and whatever is left at the end is
//! reported as residue.

use ccx_inp::{Line, LineNormalizer, parse_integer, parse_real};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{DatError, DatFailure};
use crate::postprocess::TensorComponents;

/// Unclaimed lines beyond this count are not reported individually.
pub const RESIDUE_LIMIT: usize = 5;

const KNOT_MARKER: &str = "KNOT1";
const KNOT_LINES: usize = 4;
const BUCKLING_BANNER: &str = "B U C K L I N G   F A C T O R   O U T P U T";
const BUCKLING_BANNER_LINES: usize = 5;
const EIGEN_HEADER: &str = "E I G E N V A L U E    N U M B E R";
const DISPLACEMENTS: &str = "displacements (vx,vy,vz)";
const FORCES: &str = "forces (fx,fy,fz)";
const TOTAL_FORCE: &str = "total force (fx,fy,fz)";
const TEMPERATURES: &str = "temperatures";
const PLASTIC_STRAIN: &str = "equivalent plastic strain (elem, integ.pnt.,pe)for set";
const STRESSES: &str = "stresses (elem, integ.pnt.,sxx,syy,szz,sxy,sxz,syz)";

/// Three-component nodal vector (displacement or force). Total-force
/// records carry no node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRecord {
    pub set: String,
    pub time: f64,
    pub node: Option<i64>,
    pub values: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarRecord {
    pub set: String,
    pub time: f64,
    pub node: i64,
    pub value: f64,
}

/// Equivalent plastic strain at one integration point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlasticStrainRecord {
    pub set: String,
    pub time: f64,
    pub element: i64,
    pub integration_point: i64,
    pub value: f64,
}

/// Stress at one integration point, `sxx, syy, szz, sxy, sxz, syz`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressRecord {
    pub set: String,
    pub time: f64,
    pub element: i64,
    pub integration_point: i64,
    pub values: [f64; 6],
    /// Internal section name CalculiX appends for expanded shells and beams.
    pub section: Option<String>,
}

impl StressRecord {
    pub fn tensor(&self) -> TensorComponents {
        TensorComponents::from_report(self.values)
    }

    pub fn von_mises(&self) -> f64 {
        self.tensor().mises()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EigenMode {
    pub mode: i64,
    pub displacements: Vec<VectorRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatReport {
    pub buckling_factors: Vec<f64>,
    pub temperatures: Vec<ScalarRecord>,
    pub displacements: Vec<VectorRecord>,
    pub eigen_modes: Vec<EigenMode>,
    pub stresses: Vec<StressRecord>,
    pub forces: Vec<VectorRecord>,
    pub total_forces: Vec<VectorRecord>,
    pub plastic_strains: Vec<PlasticStrainRecord>,
}

impl DatReport {
    /// Scans a report; any error fails the whole document.
    pub fn parse(raw: &[u8]) -> Result<DatReport, DatFailure> {
        let (report, errors) = Self::parse_with_diagnostics(raw);
        if errors.is_empty() {
            Ok(report)
        } else {
            Err(DatFailure { errors })
        }
    }

    pub fn parse_str(raw: &str) -> Result<DatReport, DatFailure> {
        Self::parse(raw.as_bytes())
    }

    /// Scans a report and returns whatever was recognized together with
    /// every error, ordered by line.
    pub fn parse_with_diagnostics(raw: &[u8]) -> (DatReport, Vec<DatError>) {
        let mut scan = ScanBuffer::new(LineNormalizer::REPORT.normalize(raw));
        let mut report = DatReport::default();

        scan.discard_knots();
        report.buckling_factors = scan.buckling_factors();
        report.eigen_modes = scan.eigen_modes();
        report.displacements = scan.sections(DISPLACEMENTS, nodal_vector_row);
        report.forces = scan.sections(FORCES, nodal_vector_row);
        report.total_forces = scan.sections(TOTAL_FORCE, total_vector_row);
        report.temperatures = scan.sections(TEMPERATURES, scalar_row);
        report.plastic_strains = scan.sections(PLASTIC_STRAIN, plastic_row);
        report.stresses = scan.sections(STRESSES, stress_row);

        let mut errors = scan.finish();
        errors.sort_by_key(DatError::line);
        info!(
            displacements = report.displacements.len(),
            forces = report.forces.len(),
            stresses = report.stresses.len(),
            modes = report.eigen_modes.len(),
            errors = errors.len(),
            "scanned report"
        );
        (report, errors)
    }

    /// Largest time stamp over every record, `0.0` for an empty report.
    pub fn max_time(&self) -> f64 {
        let vectors = self
            .displacements
            .iter()
            .chain(&self.forces)
            .chain(&self.total_forces)
            .chain(self.eigen_modes.iter().flat_map(|m| &m.displacements))
            .map(|r| r.time);
        vectors
            .chain(self.temperatures.iter().map(|r| r.time))
            .chain(self.stresses.iter().map(|r| r.time))
            .chain(self.plastic_strains.iter().map(|r| r.time))
            .fold(0.0, f64::max)
    }

    /// The stress record with the largest von Mises value.
    pub fn peak_stress(&self) -> Option<(&StressRecord, f64)> {
        self.stresses
            .iter()
            .map(|r| (r, r.von_mises()))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    pub fn is_empty(&self) -> bool {
        self.buckling_factors.is_empty()
            && self.temperatures.is_empty()
            && self.displacements.is_empty()
            && self.eigen_modes.is_empty()
            && self.stresses.is_empty()
            && self.forces.is_empty()
            && self.total_forces.is_empty()
            && self.plastic_strains.is_empty()
    }
}

/// Set name and time read from a section header.
#[derive(Debug, Clone, PartialEq)]
struct SectionHeader {
    set: String,
    time: f64,
}

impl SectionHeader {
    fn parse(line: &Line) -> Result<Self, DatError> {
        let words: Vec<&str> = line.text.split_whitespace().collect();
        let set = words
            .iter()
            .position(|w| *w == "set")
            .and_then(|p| words.get(p + 1))
            .ok_or_else(|| header_error(line, "missing set name"))?;
        let time = words
            .last()
            .and_then(|w| parse_real(w))
            .ok_or_else(|| header_error(line, "missing or invalid time"))?;
        Ok(Self {
            set: set.to_string(),
            time,
        })
    }
}

fn header_error(line: &Line, message: &str) -> DatError {
    DatError::Header {
        line: line.number,
        message: message.to_string(),
        text: line.text.clone(),
    }
}

type RowResult<T> = Result<T, String>;

/// The normalized report plus a consumed flag per line.
struct ScanBuffer {
    lines: Vec<Line>,
    consumed: Vec<bool>,
    errors: Vec<DatError>,
}

impl ScanBuffer {
    fn new(lines: Vec<Line>) -> Self {
        let consumed = vec![false; lines.len()];
        Self {
            lines,
            consumed,
            errors: Vec::new(),
        }
    }

    fn is_open(&self, index: usize) -> bool {
        !self.consumed[index] && !self.lines[index].is_blank()
    }

    fn consume(&mut self, index: usize) {
        if let Some(flag) = self.consumed.get_mut(index) {
            *flag = true;
        }
    }

    fn find(&self, from: usize, matches: impl Fn(&str) -> bool) -> Option<usize> {
        (from..self.lines.len()).find(|&i| self.is_open(i) && matches(&self.lines[i].text))
    }

    /// Consumes the open rows starting at `start` up to the next blank (or
    /// already claimed) line and returns their indices.
    fn take_rows(&mut self, start: usize) -> std::ops::Range<usize> {
        let end = (start..self.lines.len())
            .find(|&i| !self.is_open(i))
            .unwrap_or(self.lines.len());
        for i in start..end {
            self.consume(i);
        }
        start..end
    }

    fn discard_knots(&mut self) {
        let mut from = 0;
        while let Some(at) = self.find(from, |t| t.contains(KNOT_MARKER)) {
            debug!(line = self.lines[at].number, "discarding rigid body knot output");
            for i in at..(at + KNOT_LINES).min(self.lines.len()) {
                self.consume(i);
            }
            from = at + KNOT_LINES;
        }
    }

    fn buckling_factors(&mut self) -> Vec<f64> {
        let mut factors = Vec::new();
        let mut from = 0;
        while let Some(at) = self.find(from, |t| t == BUCKLING_BANNER) {
            for i in at..(at + BUCKLING_BANNER_LINES).min(self.lines.len()) {
                self.consume(i);
            }
            let rows = self.take_rows(at + BUCKLING_BANNER_LINES);
            for i in rows.clone() {
                let factor = {
                    let words: Vec<&str> = self.lines[i].text.split_whitespace().collect();
                    match words.as_slice() {
                        [_, factor] => parse_real(factor)
                            .ok_or_else(|| format!("invalid buckling factor `{factor}`")),
                        _ => Err(format!("expected 2 columns, found {}", words.len())),
                    }
                };
                match factor {
                    Ok(value) => factors.push(value),
                    Err(message) => self.row_error(i, message),
                }
            }
            from = rows.end.max(at + 1);
        }
        factors
    }

    fn eigen_modes(&mut self) -> Vec<EigenMode> {
        let mut modes = Vec::new();
        let mut from = 0;
        while let Some(at) = self.find(from, |t| t.starts_with(EIGEN_HEADER)) {
            self.consume(at);
            from = at + 1;
            let line = &self.lines[at];
            let Some(mode) = parse_integer(&line.text[EIGEN_HEADER.len()..]) else {
                self.errors.push(header_error(line, "invalid eigenmode number"));
                continue;
            };
            let next = (at + 1..self.lines.len()).find(|&i| !self.lines[i].is_blank());
            let Some(section) = next.filter(|&i| {
                !self.consumed[i] && self.lines[i].text.contains(DISPLACEMENTS)
            }) else {
                self.errors.push(header_error(
                    line,
                    "eigenmode is not followed by a displacement section",
                ));
                continue;
            };
            let (displacements, end) = self.section(section, &mut nodal_vector_row);
            debug!(mode, records = displacements.len(), "eigenmode");
            modes.push(EigenMode {
                mode,
                displacements,
            });
            from = end;
        }
        modes
    }

    /// Reads every open section whose header contains `key`.
    fn sections<T>(
        &mut self,
        key: &str,
        mut row: impl FnMut(&SectionHeader, &[&str]) -> RowResult<T>,
    ) -> Vec<T> {
        let mut records = Vec::new();
        let mut from = 0;
        while let Some(at) = self.find(from, |t| t.contains(key)) {
            let (mut found, end) = self.section(at, &mut row);
            debug!(key, line = self.lines[at].number, records = found.len(), "section");
            records.append(&mut found);
            from = end;
        }
        records
    }

    /// Consumes the header at `at`, its separator line and the data rows
    /// below it. Returns the parsed rows and the index after the section.
    fn section<T>(
        &mut self,
        at: usize,
        row: &mut impl FnMut(&SectionHeader, &[&str]) -> RowResult<T>,
    ) -> (Vec<T>, usize) {
        self.consume(at);
        self.consume(at + 1);
        let header = SectionHeader::parse(&self.lines[at]);
        let rows = self.take_rows(at + 2);
        let end = rows.end.max(at + 1);

        let header = match header {
            Ok(header) => header,
            Err(err) => {
                self.errors.push(err);
                return (Vec::new(), end);
            }
        };

        let mut records = Vec::with_capacity(rows.len());
        for i in rows {
            let parsed = {
                let words: Vec<&str> = self.lines[i].text.split_whitespace().collect();
                row(&header, &words)
            };
            match parsed {
                Ok(record) => records.push(record),
                Err(message) => self.row_error(i, message),
            }
        }
        (records, end)
    }

    fn row_error(&mut self, index: usize, message: String) {
        let line = &self.lines[index];
        self.errors.push(DatError::Row {
            line: line.number,
            message,
            text: line.text.clone(),
        });
    }

    /// Turns the remaining open lines into residue errors.
    fn finish(mut self) -> Vec<DatError> {
        let residue: Vec<usize> = (0..self.lines.len()).filter(|&i| self.is_open(i)).collect();
        if residue.len() > RESIDUE_LIMIT {
            warn!(
                unclaimed = residue.len(),
                reported = RESIDUE_LIMIT,
                "report has unrecognized lines"
            );
        }
        for i in residue.into_iter().take(RESIDUE_LIMIT) {
            let line = &self.lines[i];
            self.errors.push(DatError::Residue {
                line: line.number,
                text: line.text.clone(),
            });
        }
        self.errors
    }
}

fn integer_at(words: &[&str], index: usize) -> RowResult<i64> {
    let word = words
        .get(index)
        .ok_or_else(|| format!("missing column {}", index + 1))?;
    parse_integer(word).ok_or_else(|| format!("invalid integer `{word}`"))
}

fn real_at(words: &[&str], index: usize) -> RowResult<f64> {
    let word = words
        .get(index)
        .ok_or_else(|| format!("missing column {}", index + 1))?;
    parse_real(word).ok_or_else(|| format!("invalid real `{word}`"))
}

fn vector_row(header: &SectionHeader, words: &[&str], with_node: bool) -> RowResult<VectorRecord> {
    let offset = usize::from(with_node);
    let node = if with_node {
        Some(integer_at(words, 0)?)
    } else {
        None
    };
    Ok(VectorRecord {
        set: header.set.clone(),
        time: header.time,
        node,
        values: [
            real_at(words, offset)?,
            real_at(words, offset + 1)?,
            real_at(words, offset + 2)?,
        ],
    })
}

fn nodal_vector_row(header: &SectionHeader, words: &[&str]) -> RowResult<VectorRecord> {
    vector_row(header, words, true)
}

fn total_vector_row(header: &SectionHeader, words: &[&str]) -> RowResult<VectorRecord> {
    vector_row(header, words, false)
}

fn scalar_row(header: &SectionHeader, words: &[&str]) -> RowResult<ScalarRecord> {
    Ok(ScalarRecord {
        set: header.set.clone(),
        time: header.time,
        node: integer_at(words, 0)?,
        value: real_at(words, 1)?,
    })
}

fn plastic_row(header: &SectionHeader, words: &[&str]) -> RowResult<PlasticStrainRecord> {
    Ok(PlasticStrainRecord {
        set: header.set.clone(),
        time: header.time,
        element: integer_at(words, 0)?,
        integration_point: integer_at(words, 1)?,
        value: real_at(words, 2)?,
    })
}

fn stress_row(header: &SectionHeader, words: &[&str]) -> RowResult<StressRecord> {
    let mut values = [0.0; 6];
    for (k, value) in values.iter_mut().enumerate() {
        *value = real_at(words, k + 2)?;
    }
    Ok(StressRecord {
        set: header.set.clone(),
        time: header.time,
        element: integer_at(words, 0)?,
        integration_point: integer_at(words, 1)?,
        values,
        section: words.get(8).map(|s| s.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * b.abs().max(1.0)
    }

    #[test]
    fn reads_force_section_for_support_set() {
        let src = "\n forces (fx,fy,fz) for set FIX and time  0.4000000E-01\n\n       204  3.485854E+00  1.025290E+01  3.092803E+01\n";
        let report = DatReport::parse_str(src).expect("report should scan");
        assert_eq!(report.forces.len(), 1);
        let force = &report.forces[0];
        assert_eq!(force.set, "FIX");
        assert!(close(force.time, 0.04));
        assert_eq!(force.node, Some(204));
        assert!(close(force.values[0], 3.485854));
        assert!(close(force.values[1], 10.2529));
        assert!(close(force.values[2], 30.92803));
    }

    #[test]
    fn repeated_sections_keep_their_own_times() {
        let src = "
 displacements (vx,vy,vz) for set NALL and time  0.5000000E+00

         1  1.000000E-03  0.000000E+00  0.000000E+00
         2  2.000000E-03  0.000000E+00  0.000000E+00

 displacements (vx,vy,vz) for set NALL and time  0.1000000E+01

         1  2.000000E-03  0.000000E+00  0.000000E+00
         2  4.000000E-03  0.000000E+00  0.000000E+00
";
        let report = DatReport::parse_str(src).expect("report should scan");
        let times: Vec<f64> = report.displacements.iter().map(|r| r.time).collect();
        assert_eq!(times, vec![0.5, 0.5, 1.0, 1.0]);
        assert!(close(report.max_time(), 1.0));
    }

    #[test]
    fn total_force_rows_have_no_node() {
        let src = "
 total force (fx,fy,fz) for set SUPALL and time  0.2500000E+00

       -2.370143E-09  1.371588E+04  1.044280E-11
";
        let report = DatReport::parse_str(src).expect("report should scan");
        assert_eq!(report.total_forces.len(), 1);
        assert_eq!(report.total_forces[0].node, None);
        assert!(close(report.total_forces[0].values[1], 13715.88));
        assert!(report.forces.is_empty());
    }

    #[test]
    fn buckling_banner_and_factors() {
        let src = "
     B U C K L I N G   F A C T O R   O U T P U T

 MODE NO       BUCKLING
                FACTOR

      1   0.4185108E+03
      2   0.4196190E+03
";
        let report = DatReport::parse_str(src).expect("report should scan");
        assert_eq!(report.buckling_factors.len(), 2);
        assert!(close(report.buckling_factors[0], 418.5108));
    }

    #[test]
    fn eigen_displacements_are_grouped_by_mode() {
        let src = "
     E I G E N V A L U E    N U M B E R     1

 displacements (vx,vy,vz) for set NSUMMARY and time  0.0000000E+00

         1  1.000000E+00  0.000000E+00  0.000000E+00

     E I G E N V A L U E    N U M B E R     2

 displacements (vx,vy,vz) for set NSUMMARY and time  0.0000000E+00

         1  0.000000E+00  1.000000E+00  0.000000E+00
";
        let report = DatReport::parse_str(src).expect("report should scan");
        assert!(report.displacements.is_empty());
        assert_eq!(report.eigen_modes.len(), 2);
        assert_eq!(report.eigen_modes[1].mode, 2);
        assert_eq!(report.eigen_modes[1].displacements[0].values[1], 1.0);
    }

    #[test]
    fn stress_rows_carry_optional_section_name() {
        let src = "
 stresses (elem, integ.pnt.,sxx,syy,szz,sxy,sxz,syz) for set EALL and time  0.1000000E+01

         9   1  1.000000E+02  0.000000E+00  0.000000E+00  0.000000E+00  0.000000E+00  0.000000E+00
         1   1 -4.365744E+02 -1.138162E+02 -1.460370E+02 -9.350144E+00 -7.660134E-01  2.364488E+01 _shell_0000000001
";
        let report = DatReport::parse_str(src).expect("report should scan");
        assert_eq!(report.stresses.len(), 2);
        assert_eq!(report.stresses[0].section, None);
        assert_eq!(
            report.stresses[1].section.as_deref(),
            Some("_shell_0000000001")
        );
        assert!(close(report.stresses[0].von_mises(), 100.0));
        let (peak, _) = report.peak_stress().expect("peak stress");
        assert_eq!(peak.element, 1);
    }

    #[test]
    fn plastic_strain_and_temperatures() {
        let src = "
 equivalent plastic strain (elem, integ.pnt.,pe)for set ELSUMMARY and time  0.1000000E+00

         1   1  2.500000E-03

 temperatures for set NALL and time  0.1000000E+01

         1  2.008333E+01
";
        let report = DatReport::parse_str(src).expect("report should scan");
        assert_eq!(report.plastic_strains[0].set, "ELSUMMARY");
        assert_eq!(report.plastic_strains[0].integration_point, 1);
        assert!(close(report.temperatures[0].value, 20.08333));
        assert!(close(report.max_time(), 1.0));
    }

    #[test]
    fn knot_output_is_discarded() {
        let src = "
 KNOT1
 tra      7991  0.2840E-06  0.3126E-06 -0.5253E-08
 rot     93633 -0.1991E-05 -0.4091E-05 -0.7867E-06
 exp     93634 -0.1501E-07
";
        let report = DatReport::parse_str(src).expect("knot lines are not residue");
        assert!(report.is_empty());
    }

    #[test]
    fn malformed_row_is_reported_and_scan_continues() {
        let src = "
 forces (fx,fy,fz) for set FIX and time  0.1000000E+01

         1  1.0E+00  oops  0.0E+00
         2  1.0E+00  2.0E+00  3.0E+00
";
        let (report, errors) = DatReport::parse_with_diagnostics(src.as_bytes());
        assert_eq!(report.forces.len(), 1);
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], DatError::Row { line: 4, .. }));
    }

    #[test]
    fn residue_is_capped() {
        let src: String = (0..8).map(|i| format!("garbage {i}\n")).collect();
        let failure = DatReport::parse_str(&src).expect_err("residue should fail");
        assert_eq!(failure.errors.len(), RESIDUE_LIMIT);
        assert!(matches!(failure.errors[0], DatError::Residue { line: 1, .. }));
    }

    #[test]
    fn header_without_time_is_an_error() {
        let src = "
 temperatures for set NALL and time  later

         1  2.0E+01
";
        let failure = DatReport::parse_str(src).expect_err("bad header");
        assert_eq!(failure.errors.len(), 1);
        assert!(matches!(failure.errors[0], DatError::Header { line: 2, .. }));
    }
}
