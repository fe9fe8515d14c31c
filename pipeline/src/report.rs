//! Report of recorded derivatives, rebuilt from sidecar provenance.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::warn;

use crate::io::config::PipelineConfig;
use crate::io::sidecar::load_sidecar;

const REPORT_TEMPLATE: &str = include_str!("templates/report.md");

/// One recorded output, read back from its sidecar.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReportEntry {
    pub step: String,
    pub step_description: String,
    pub output_file: String,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize)]
struct ReportGroup {
    step: String,
    description: String,
    entries: Vec<ReportEntry>,
}

/// Collect sidecar records under `output_root`.
///
/// A file counts as a sidecar when it ends in `.json` and sits next to the
/// artifact it describes (the path without the `.json`). Unreadable or
/// schema-invalid records are reported as warnings and skipped.
pub fn collect_entries(output_root: &Path) -> Result<Vec<ReportEntry>> {
    let mut sidecars = Vec::new();
    visit_json_files(output_root, &mut sidecars)?;
    sidecars.sort();

    let mut entries = Vec::new();
    for path in sidecars {
        let artifact = path.with_extension("");
        if !artifact.is_file() {
            continue;
        }
        let record = match load_sidecar(&path) {
            Ok(record) => record,
            Err(err) => {
                warn!(sidecar = %path.display(), "ignoring unreadable sidecar: {err:#}");
                continue;
            }
        };
        let pipeline = &record["Pipeline"];
        entries.push(ReportEntry {
            step: string_field(pipeline, "Step"),
            step_description: string_field(pipeline, "StepDescription"),
            output_file: string_field(pipeline, "OutputFile"),
            generated_at: string_field(pipeline, "GeneratedAt"),
        });
    }
    Ok(entries)
}

fn string_field(value: &serde_json::Value, key: &str) -> String {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string()
}

fn visit_json_files(dir: &Path, found: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    let entries =
        fs::read_dir(dir).with_context(|| format!("read directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("read directory {}", dir.display()))?;
        let path = entry.path();
        if path.is_dir() {
            visit_json_files(&path, found)?;
        } else if path.extension().is_some_and(|ext| ext == "json") {
            found.push(path);
        }
    }
    Ok(())
}

/// Render the derivatives report as markdown.
pub fn render_report(output_root: &Path, entries: &[ReportEntry]) -> Result<String> {
    let mut groups: Vec<ReportGroup> = Vec::new();
    for entry in entries {
        match groups.iter().position(|g| g.step == entry.step) {
            Some(index) => groups[index].entries.push(entry.clone()),
            None => groups.push(ReportGroup {
                step: entry.step.clone(),
                description: entry.step_description.clone(),
                entries: vec![entry.clone()],
            }),
        }
    }
    groups.sort_by(|a, b| a.step.cmp(&b.step));

    let mut env = Environment::new();
    env.add_template("report", REPORT_TEMPLATE)
        .expect("report template should be valid");
    let template = env.get_template("report")?;
    let rendered = template.render(context! {
        generated_at => Utc::now().to_rfc3339(),
        output_root => output_root.display().to_string(),
        groups => groups,
    })?;
    Ok(rendered)
}

/// Build the report; with `store` set, also write it into the output root.
pub fn generate_report(config: &PipelineConfig, store: bool) -> Result<String> {
    let root = config.output_root();
    let entries = collect_entries(root)?;
    let rendered = render_report(root, &entries)?;
    if store {
        let path = root.join("pipeline_report.md");
        fs::create_dir_all(root).with_context(|| format!("create {}", root.display()))?;
        fs::write(&path, &rendered).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::sidecar::{Provenance, write_sidecar};

    fn write_recorded_output(root: &Path, step: &str, file: &str) {
        let artifact = root.join(file);
        fs::create_dir_all(artifact.parent().expect("parent")).expect("mkdir");
        fs::write(&artifact, "data").expect("write artifact");
        let provenance = Provenance {
            version: "0.1.0".to_string(),
            step: step.to_string(),
            step_description: format!("step {step}"),
            output_file: file.to_string(),
            generated_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        write_sidecar(&artifact, &provenance, None, None).expect("write sidecar");
    }

    #[test]
    fn collects_entries_grouped_by_sidecars_on_disk() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_recorded_output(temp.path(), "00", "00_raw_table.csv");
        write_recorded_output(temp.path(), "01", "01_summary_plot.png");
        // A plain JSON artifact without a sibling file is not a sidecar.
        fs::write(temp.path().join("01_stats_data.json"), "{}").expect("write");

        let entries = collect_entries(temp.path()).expect("collect");
        let files: Vec<&str> = entries.iter().map(|e| e.output_file.as_str()).collect();
        assert_eq!(files, vec!["00_raw_table.csv", "01_summary_plot.png"]);
    }

    #[test]
    fn invalid_sidecars_are_skipped_not_fatal() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_recorded_output(temp.path(), "00", "00_raw_table.csv");
        fs::write(temp.path().join("00_bad.bin"), "data").expect("write artifact");
        fs::write(temp.path().join("00_bad.bin.json"), "{\"nope\": 1}").expect("write sidecar");

        let entries = collect_entries(temp.path()).expect("collect");
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn rendered_report_lists_outputs_per_step() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_recorded_output(temp.path(), "01", "01_summary_plot.png");
        write_recorded_output(temp.path(), "00", "00_raw_table.csv");

        let entries = collect_entries(temp.path()).expect("collect");
        let rendered = render_report(temp.path(), &entries).expect("render");
        let step00 = rendered.find("## Step 00").expect("step 00 heading");
        let step01 = rendered.find("## Step 01").expect("step 01 heading");
        assert!(step00 < step01, "steps sorted by id");
        assert!(rendered.contains("- 00_raw_table.csv (generated 2026-01-01T00:00:00+00:00)"));
    }

    #[test]
    fn empty_root_renders_placeholder() {
        let temp = tempfile::tempdir().expect("tempdir");
        let rendered = render_report(temp.path(), &[]).expect("render");
        assert!(rendered.contains("No recorded outputs found."));
    }

    #[test]
    fn store_writes_report_into_output_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        write_recorded_output(temp.path(), "00", "00_raw_table.csv");
        let config = PipelineConfig {
            derivatives_root: temp.path().to_path_buf(),
            ..PipelineConfig::default()
        };

        generate_report(&config, true).expect("report");
        let stored = fs::read_to_string(temp.path().join("pipeline_report.md")).expect("read");
        assert!(stored.contains("00_raw_table.csv"));
    }
}
