//! STAAD.Pro text export of a deck's geometry.
//!
//! Only coordinates and connectivity survive the projection: two-node
//! elements become members, three/four/six/eight-node elements become
//! shell plates, anything else is skipped.

use ccx_inp::format_scientific;
use ccx_model::Model;
use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::debug;

const SHELL_NODE_COUNTS: [usize; 4] = [3, 4, 6, 8];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Joint {
    pub index: i64,
    pub coord: [f64; 3],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub index: i64,
    pub nodes: [i64; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plate {
    pub index: i64,
    pub nodes: Vec<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StaadModel {
    pub joints: Vec<Joint>,
    pub members: Vec<Member>,
    pub plates: Vec<Plate>,
    /// Elements whose node count has no STAAD counterpart.
    pub skipped: usize,
}

/// Knobs for the job information block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaadOptions {
    pub engineer_date: NaiveDate,
}

impl Default for StaadOptions {
    fn default() -> Self {
        Self {
            engineer_date: Local::now().date_naive(),
        }
    }
}

impl StaadModel {
    pub fn from_model(model: &Model) -> Self {
        let mut staad = StaadModel {
            joints: model
                .nodes
                .iter()
                .map(|n| Joint {
                    index: n.index,
                    coord: n.coord,
                })
                .collect(),
            ..Default::default()
        };

        for element in &model.elements {
            match element.nodes.as_slice() {
                [a, b] => staad.members.push(Member {
                    index: element.index,
                    nodes: [*a, *b],
                }),
                nodes if SHELL_NODE_COUNTS.contains(&nodes.len()) => staad.plates.push(Plate {
                    index: element.index,
                    nodes: nodes.to_vec(),
                }),
                nodes => {
                    debug!(
                        element = element.index,
                        nodes = nodes.len(),
                        "element has no STAAD counterpart"
                    );
                    staad.skipped += 1;
                }
            }
        }

        staad.joints.sort_by_key(|j| j.index);
        staad.members.sort_by_key(|m| m.index);
        staad.plates.sort_by_key(|p| p.index);
        staad
    }

    pub fn render(&self, options: &StaadOptions) -> String {
        let mut lines = vec![
            "STAAD SPACE".to_string(),
            "START JOB INFORMATION".to_string(),
            format!("ENGINEER DATE {}", options.engineer_date.format("%d-%b-%y")),
            "END JOB INFORMATION".to_string(),
            "INPUT WIDTH 79".to_string(),
            "UNIT METER NEWTON".to_string(),
            "JOINT COORDINATES".to_string(),
        ];
        lines.extend(self.joints.iter().map(|j| {
            let [x, y, z] = j.coord.map(|v| format_scientific(v, 10, false));
            format!("{} {x} {y} {z};", j.index)
        }));

        if !self.members.is_empty() {
            lines.push("MEMBER INCIDENCES".to_string());
            lines.extend(
                self.members
                    .iter()
                    .map(|m| format!("{} {} {};", m.index, m.nodes[0], m.nodes[1])),
            );
        }

        if !self.plates.is_empty() {
            lines.push("ELEMENT INCIDENCES SHELL".to_string());
            lines.extend(self.plates.iter().map(|p| {
                let nodes: Vec<String> = p.nodes.iter().map(i64::to_string).collect();
                format!("{} {};", p.index, nodes.join(" "))
            }));
        }

        lines.push("FINISH".to_string());
        let mut text = lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> StaadOptions {
        StaadOptions {
            engineer_date: NaiveDate::from_ymd_opt(2017, 3, 7).expect("valid date"),
        }
    }

    #[test]
    fn projects_members_and_plates_sorted_by_index() {
        let src = "
*NODE
2, 1.75, 2.3, 0
1, 0, 3, 0
3, 0, 0, 0
4, 1, 1, 0
*ELEMENT, TYPE=T3D2, ELSET=BARS
9, 2, 1
*ELEMENT, TYPE=S3, ELSET=PLATES
5, 1, 2, 3
4, 1, 3, 4
*ELEMENT, TYPE=C3D4
11, 1, 2, 3, 4
";
        let model = Model::parse_str(src).expect("deck should parse");
        let staad = StaadModel::from_model(&model);
        assert_eq!(staad.joints[0].index, 1);
        assert_eq!(staad.members, vec![Member { index: 9, nodes: [2, 1] }]);
        assert_eq!(staad.plates.len(), 3);
        assert_eq!(staad.plates[0].index, 4);
        assert_eq!(staad.skipped, 0);

        let text = staad.render(&options());
        assert!(text.starts_with("STAAD SPACE\nSTART JOB INFORMATION\nENGINEER DATE 07-Mar-17\n"));
        assert!(text.contains("JOINT COORDINATES\n1 0.0000000000E+00 3.0000000000E+00 0.0000000000E+00;\n"));
        assert!(text.contains("MEMBER INCIDENCES\n9 2 1;\n"));
        assert!(text.contains("ELEMENT INCIDENCES SHELL\n4 1 3 4;\n5 1 2 3;\n"));
        assert!(text.ends_with("FINISH\n"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let model = Model::parse_str("*NODE\n1, 0, 0, 0\n*ELEMENT, TYPE=MASS\n1, 1\n")
            .expect("deck should parse");
        let staad = StaadModel::from_model(&model);
        assert_eq!(staad.skipped, 1);
        let text = staad.render(&options());
        assert!(!text.contains("MEMBER INCIDENCES"));
        assert!(!text.contains("ELEMENT INCIDENCES SHELL"));
    }
}
