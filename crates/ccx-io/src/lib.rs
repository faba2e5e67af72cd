//! File-level support around the deck model.
//!
//! - **DAT report** scanner ([`DatReport`]) with fail-soft diagnostics
//! - **Postprocessing** of stress records (von Mises, principal values)
//! - **Support totals**: summed reaction forces per set and time
//! - **STAAD export** of nodes, members and plates
//! - **JSON snapshots** of models and reports
//! - File helpers that read decks/reports and refuse to overwrite outputs

pub mod dat;
pub mod error;
mod files;
pub mod postprocess;
mod snapshot;
pub mod staad;
mod support;

pub use dat::{
    DatReport, EigenMode, PlasticStrainRecord, RESIDUE_LIMIT, ScalarRecord, StressRecord,
    VectorRecord,
};
pub use error::{DatError, DatFailure, IoError, Result};
pub use files::{read_model, read_report, write_new_file};
pub use postprocess::{PrincipalValues, TensorComponents};
pub use snapshot::{load_snapshot, save_snapshot};
pub use staad::{StaadModel, StaadOptions};
pub use support::{SupportTotal, support_totals};
