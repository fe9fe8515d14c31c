//! Pipeline configuration loaded from a TOML file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::selection::SelectionSpec;
use crate::io::overwrite::OverwriteMode;

/// Pipeline configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values; unknown keys are
/// ignored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Root directory for processed-data derivatives.
    pub derivatives_root: PathBuf,

    /// Root for generated outputs. Defaults to `derivatives_root` when unset.
    pub output_root: Option<PathBuf>,

    /// How existing output files are treated on re-runs.
    pub overwrite_mode: OverwriteMode,

    /// Answer interactive questions with their default instead of prompting.
    pub assume_defaults: bool,

    /// Record save duration and artifact size in sidecars.
    pub output_profiling: bool,

    /// Write a provenance sidecar next to every saved artifact.
    pub sidecar_auto_generate: bool,

    /// Default datatype directory segment for structured output paths.
    pub datatype: String,

    /// Subjects to include in processing. Empty means all.
    pub subjects: Vec<String>,

    /// Sessions to include in processing. Empty means all.
    pub sessions: Vec<String>,

    /// Tasks to include in processing. Empty means all.
    pub tasks: Vec<String>,

    /// Version identifier recorded in sidecars. Defaults to the crate version.
    pub pipeline_version: Option<String>,

    /// Outputs to generate; absent means every default-enabled output.
    pub outputs_to_generate: Option<SelectionSpec>,

    /// Outputs to skip; takes precedence over `outputs_to_generate`.
    pub outputs_to_skip: Option<SelectionSpec>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            derivatives_root: PathBuf::from("derivatives"),
            output_root: None,
            overwrite_mode: OverwriteMode::Never,
            assume_defaults: false,
            output_profiling: false,
            sidecar_auto_generate: true,
            datatype: "eeg".to_string(),
            subjects: Vec::new(),
            sessions: Vec::new(),
            tasks: Vec::new(),
            pipeline_version: None,
            outputs_to_generate: None,
            outputs_to_skip: None,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<()> {
        if self.derivatives_root.as_os_str().is_empty() {
            return Err(anyhow!("derivatives_root must not be empty"));
        }
        if self.datatype.trim().is_empty() {
            return Err(anyhow!("datatype must not be empty"));
        }
        Ok(())
    }

    /// Effective root for generated outputs.
    pub fn output_root(&self) -> &Path {
        self.output_root.as_deref().unwrap_or(&self.derivatives_root)
    }

    /// Version identifier recorded in sidecars.
    pub fn version(&self) -> String {
        self.pipeline_version
            .clone()
            .unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `PipelineConfig::default()`.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    if !path.exists() {
        let config = PipelineConfig::default();
        config.validate()?;
        return Ok(config);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let config: PipelineConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    config.validate()?;
    Ok(config)
}
