//! JSON snapshots of parsed decks and reports.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::Result;

pub fn save_snapshot<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    debug!(path = %path.display(), bytes = bytes.len(), "writing snapshot");
    fs::write(path, bytes)?;
    Ok(())
}

pub fn load_snapshot<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let bytes = fs::read(path)?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dat::DatReport;
    use crate::error::IoError;
    use ccx_model::Model;

    #[test]
    fn model_snapshot_roundtrip_preserves_model() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nested").join("model.json");
        let model = Model::parse_str(
            "*NODE, NSET=NALL\n1, 0, 0, 0\n2, 1, 0, 0\n*ELEMENT, TYPE=T3D2, ELSET=EALL\n1, 1, 2\n",
        )
        .expect("deck should parse");

        save_snapshot(&path, &model).expect("save should succeed");
        let loaded: Model = load_snapshot(&path).expect("load should succeed");
        assert_eq!(loaded, model);
    }

    #[test]
    fn report_snapshot_roundtrip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("report.json");
        let report = DatReport::parse_str(
            "\n forces (fx,fy,fz) for set FIX and time  0.1000000E+01\n\n 1  1.0E+00  2.0E+00  3.0E+00\n",
        )
        .expect("report should scan");

        save_snapshot(&path, &report).expect("save should succeed");
        let loaded: DatReport = load_snapshot(&path).expect("load should succeed");
        assert_eq!(loaded, report);
    }

    #[test]
    fn load_snapshot_fails_for_missing_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = load_snapshot::<DatReport>(dir.path().join("missing.json"))
            .expect_err("missing file should fail");
        assert!(matches!(err, IoError::Io(_)));
    }

    #[test]
    fn load_snapshot_fails_for_invalid_payload() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("bad.json");
        fs::write(&path, "{invalid json").expect("write invalid payload");
        let err = load_snapshot::<Model>(&path).expect_err("invalid JSON should fail");
        assert!(matches!(err, IoError::Json(_)));
    }
}
