//! Provenance sidecars written next to every saved artifact.
//!
//! The sidecar is the output path with `.json` appended (the original
//! extension stays in place). A crash between artifact and sidecar writes
//! leaves the artifact without its sidecar; re-runs tolerate that, and a
//! missing sidecar never triggers an overwrite by itself.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

const SIDECAR_SCHEMA: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/schemas/sidecar.schema.json"
));

/// Provenance block present in every sidecar.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Provenance {
    pub version: String,
    pub step: String,
    pub step_description: String,
    pub output_file: String,
    pub generated_at: String,
}

/// Profiling block, present only when output profiling ran for the save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct Performance {
    pub duration: String,
    pub timestamp: String,
    pub file_size_bytes: u64,
}

/// Sidecar path for an output: the full file name plus `.json`.
pub fn sidecar_path(output_path: &Path) -> PathBuf {
    let mut name = output_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".json");
    output_path.with_file_name(name)
}

/// Assemble the sidecar record.
///
/// Custom metadata is merged at the top level; the reserved `Pipeline` and
/// `Performance` keys always win, so custom fields under those names are
/// silently dropped.
pub fn sidecar_record(
    provenance: &Provenance,
    performance: Option<&Performance>,
    custom: Option<&Map<String, Value>>,
) -> Result<Map<String, Value>> {
    let mut record = custom.cloned().unwrap_or_default();
    record.remove("Pipeline");
    record.remove("Performance");
    record.insert(
        "Pipeline".to_string(),
        serde_json::to_value(provenance).context("serialize provenance block")?,
    );
    if let Some(performance) = performance {
        record.insert(
            "Performance".to_string(),
            serde_json::to_value(performance).context("serialize performance block")?,
        );
    }
    Ok(record)
}

/// Write the sidecar for `output_path` and return its path.
pub fn write_sidecar(
    output_path: &Path,
    provenance: &Provenance,
    performance: Option<&Performance>,
    custom: Option<&Map<String, Value>>,
) -> Result<PathBuf> {
    let path = sidecar_path(output_path);
    let record = sidecar_record(provenance, performance, custom)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create sidecar dir {}", parent.display()))?;
    }
    let mut buf = serde_json::to_string_pretty(&record)?;
    buf.push('\n');
    fs::write(&path, buf).with_context(|| format!("write sidecar {}", path.display()))?;
    debug!(sidecar = %path.display(), "wrote sidecar");
    Ok(path)
}

/// Load a sidecar record and validate it against the shipped schema.
pub fn load_sidecar(path: &Path) -> Result<Value> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read sidecar {}", path.display()))?;
    let record: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse sidecar {}", path.display()))?;
    validate_record(&record)
        .with_context(|| format!("validate sidecar {}", path.display()))?;
    Ok(record)
}

fn validate_record(record: &Value) -> Result<()> {
    let schema: Value =
        serde_json::from_str(SIDECAR_SCHEMA).context("parse embedded sidecar schema")?;
    let compiled = validator_for(&schema).map_err(|err| anyhow!("invalid schema: {}", err))?;
    if !compiled.is_valid(record) {
        let messages = compiled
            .iter_errors(record)
            .map(|err| err.to_string())
            .collect::<Vec<_>>();
        return Err(anyhow!(
            "sidecar schema validation failed: {}",
            messages.join("; ")
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provenance() -> Provenance {
        Provenance {
            version: "0.1.0".to_string(),
            step: "00".to_string(),
            step_description: "Convert raw data".to_string(),
            output_file: "00_summary_plot.png".to_string(),
            generated_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn sidecar_path_appends_json_to_full_name() {
        assert_eq!(
            sidecar_path(Path::new("/out/00_summary_plot.png")),
            Path::new("/out/00_summary_plot.png.json")
        );
        assert_eq!(
            sidecar_path(Path::new("/out/00_summary")),
            Path::new("/out/00_summary.json")
        );
    }

    #[test]
    fn record_carries_pipeline_block_keys() {
        let record = sidecar_record(&provenance(), None, None).expect("record");
        let pipeline = record.get("Pipeline").expect("Pipeline block");
        assert_eq!(pipeline["Step"], "00");
        assert_eq!(pipeline["OutputFile"], "00_summary_plot.png");
        assert_eq!(pipeline["GeneratedAt"], "2026-01-01T00:00:00+00:00");
        assert!(record.get("Performance").is_none());
    }

    #[test]
    fn custom_metadata_merges_at_top_level() {
        let mut custom = Map::new();
        custom.insert("Description".to_string(), Value::String("demo".to_string()));
        let record = sidecar_record(&provenance(), None, Some(&custom)).expect("record");
        assert_eq!(record["Description"], "demo");
    }

    #[test]
    fn reserved_block_names_win_over_custom_metadata() {
        let mut custom = Map::new();
        custom.insert("Pipeline".to_string(), Value::String("bogus".to_string()));
        custom.insert("Performance".to_string(), Value::String("bogus".to_string()));
        let record = sidecar_record(&provenance(), None, Some(&custom)).expect("record");
        assert!(record["Pipeline"].is_object());
        assert!(record.get("Performance").is_none());
    }

    #[test]
    fn written_sidecar_round_trips_through_schema_validation() {
        let temp = tempfile::tempdir().expect("tempdir");
        let output = temp.path().join("00_summary_plot.png");

        let performance = Performance {
            duration: "0.123s".to_string(),
            timestamp: "2026-01-01T00:00:01+00:00".to_string(),
            file_size_bytes: 42,
        };
        let path = write_sidecar(&output, &provenance(), Some(&performance), None)
            .expect("write sidecar");
        assert!(path.ends_with("00_summary_plot.png.json"));

        let record = load_sidecar(&path).expect("load sidecar");
        assert_eq!(record["Performance"]["FileSizeBytes"], 42);
        assert_eq!(record["Performance"]["Duration"], "0.123s");
    }

    #[test]
    fn load_rejects_records_without_pipeline_block() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("bad.json");
        fs::write(&path, "{\"Other\": true}\n").expect("write");

        let err = load_sidecar(&path).unwrap_err();
        assert!(format!("{err:#}").contains("schema validation failed"));
    }
}
