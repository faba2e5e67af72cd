//! Reaction totals per support set.

use serde::{Deserialize, Serialize};

use crate::dat::DatReport;

/// Sum of the nodal force vectors printed for one set at one time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportTotal {
    pub set: String,
    pub time: f64,
    pub nodes: usize,
    pub load: [f64; 3],
}

/// Groups the report's force records by (set, time) in order of first
/// appearance and sums each group.
pub fn support_totals(report: &DatReport) -> Vec<SupportTotal> {
    let mut totals: Vec<SupportTotal> = Vec::new();
    for force in &report.forces {
        let index = match totals
            .iter()
            .position(|t| t.set == force.set && t.time == force.time)
        {
            Some(index) => index,
            None => {
                totals.push(SupportTotal {
                    set: force.set.clone(),
                    time: force.time,
                    nodes: 0,
                    load: [0.0; 3],
                });
                totals.len() - 1
            }
        };
        let total = &mut totals[index];
        total.nodes += 1;
        for (sum, value) in total.load.iter_mut().zip(force.values) {
            *sum += value;
        }
    }
    totals
}
