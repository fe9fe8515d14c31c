//! Per-step facade for saving outputs with consistent paths, provenance
//! sidecars, and overwrite handling.
//!
//! One manager exists per step invocation. Declaratively registered names
//! consult the selection engine before anything else runs; ad hoc names
//! (not backed by a declaration) bypass selection and always attempt the
//! write. A skipped save is a normal outcome, distinct from a failed one.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::core::paths::{PathRequest, StructuredFields, build_output_path};
use crate::core::registry::OutputRegistry;
use crate::core::selection;
use crate::io::config::PipelineConfig;
use crate::io::overwrite::{Confirm, MissingSourceError, WriteDecision, should_write};
use crate::io::sidecar::{Performance, Provenance, write_sidecar};

/// Optional parameters of one save call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SaveRequest<'a> {
    /// Filename suffix; each typed save method has its own default.
    pub suffix: Option<&'a str>,
    /// File extension including the dot; typed methods default it.
    pub extension: Option<&'a str>,
    /// Structured naming fields; their presence switches the path layout.
    pub structured: Option<&'a StructuredFields>,
    /// Overrides the computed directory, never the filename.
    pub custom_dir: Option<&'a Path>,
    /// Source file for `ifnewer` comparison.
    pub source_file: Option<&'a Path>,
    /// Custom metadata merged into the sidecar top level.
    pub metadata: Option<&'a Map<String, Value>>,
}

impl<'a> SaveRequest<'a> {
    fn with_defaults(&self, suffix: &'a str, extension: &'a str) -> Self {
        Self {
            suffix: Some(self.suffix.unwrap_or(suffix)),
            extension: Some(self.extension.unwrap_or(extension)),
            ..*self
        }
    }
}

/// Why a save call did not write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The output was not selected for this run.
    NotSelected,
    /// Target exists and `overwrite_mode` is `never`.
    Exists,
    /// Target is at least as new as the source (`ifnewer`).
    UpToDate,
    /// The operator (or the non-interactive fallback) declined.
    Declined,
    /// `ifnewer` was requested without a usable source file.
    MissingSource,
}

/// Result of one save call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved {
        path: PathBuf,
        sidecar: Option<PathBuf>,
    },
    Skipped {
        path: PathBuf,
        reason: SkipReason,
    },
}

impl SaveOutcome {
    pub fn path(&self) -> &Path {
        match self {
            SaveOutcome::Saved { path, .. } | SaveOutcome::Skipped { path, .. } => path,
        }
    }

    pub fn saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }
}

/// A small row/column table for tabular outputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Serialization format for [`OutputManager::save_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Csv,
    Tsv,
}

/// Serialization format for [`OutputManager::save_array`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayFormat {
    /// One value per line.
    Text,
    /// A JSON array.
    Json,
}

/// Facade handed to a step while it executes.
pub struct OutputManager<'a> {
    config: &'a PipelineConfig,
    registry: &'a OutputRegistry,
    confirm: &'a dyn Confirm,
    step_id: String,
    step_description: String,
    version: String,
}

impl<'a> OutputManager<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        registry: &'a OutputRegistry,
        confirm: &'a dyn Confirm,
        step_id: &str,
        step_description: &str,
    ) -> Self {
        Self {
            config,
            registry,
            confirm,
            step_id: step_id.to_string(),
            step_description: step_description.to_string(),
            version: config.version(),
        }
    }

    pub fn step_id(&self) -> &str {
        &self.step_id
    }

    /// Whether a declared output is selected for this run.
    ///
    /// Steps call this before expensive computation so skipped outputs cost
    /// nothing. Names without a declaration always run.
    pub fn should_generate(&self, name: &str) -> bool {
        match self.registry.find(&self.step_id, name) {
            Some(declaration) => selection::should_generate(
                &self.step_id,
                name,
                declaration.enabled_by_default,
                self.config.outputs_to_generate.as_ref(),
                self.config.outputs_to_skip.as_ref(),
            ),
            None => true,
        }
    }

    /// Path an output would be written to, without touching the filesystem.
    pub fn output_path(&self, name: &str, request: &SaveRequest<'_>) -> PathBuf {
        build_output_path(&PathRequest {
            step_id: &self.step_id,
            name,
            suffix: request.suffix,
            extension: request.extension,
            structured: request.structured,
            custom_dir: request.custom_dir,
            output_root: self.config.output_root(),
            default_datatype: &self.config.datatype,
        })
    }

    /// Save an output through a caller-supplied write closure.
    ///
    /// All typed save methods delegate here. The closure only runs on a
    /// "go" decision from selection and the overwrite arbiter.
    pub fn save_with<F>(&self, name: &str, request: &SaveRequest<'_>, write: F) -> Result<SaveOutcome>
    where
        F: FnOnce(&Path) -> Result<()>,
    {
        let path = self.output_path(name, request);

        if self.registry.find(&self.step_id, name).is_some() && !self.should_generate(name) {
            debug!(step = %self.step_id, output = name, "output not selected, skipping");
            return Ok(SaveOutcome::Skipped {
                path,
                reason: SkipReason::NotSelected,
            });
        }

        let decision = match should_write(
            &path,
            self.config.overwrite_mode,
            request.source_file,
            self.confirm,
        ) {
            Ok(decision) => decision,
            Err(err) if err.downcast_ref::<MissingSourceError>().is_some() => {
                warn!(step = %self.step_id, output = name, "{err:#}; skipping output");
                return Ok(SaveOutcome::Skipped {
                    path,
                    reason: SkipReason::MissingSource,
                });
            }
            Err(err) => return Err(err),
        };
        let reason = match decision {
            WriteDecision::Proceed => None,
            WriteDecision::SkipExisting => Some(SkipReason::Exists),
            WriteDecision::SkipUpToDate => Some(SkipReason::UpToDate),
            WriteDecision::SkipDeclined => Some(SkipReason::Declined),
        };
        if let Some(reason) = reason {
            info!(step = %self.step_id, output = %path.display(), ?reason, "skipping existing output");
            return Ok(SaveOutcome::Skipped { path, reason });
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create output dir {}", parent.display()))?;
        }

        let started = Instant::now();
        write(&path).with_context(|| format!("write output {}", path.display()))?;
        let elapsed = started.elapsed();
        info!(step = %self.step_id, output = %path.display(), "saved output");

        let sidecar = if self.config.sidecar_auto_generate {
            Some(self.write_sidecar_for(&path, request, elapsed)?)
        } else {
            None
        };

        Ok(SaveOutcome::Saved { path, sidecar })
    }

    fn write_sidecar_for(
        &self,
        path: &Path,
        request: &SaveRequest<'_>,
        elapsed: std::time::Duration,
    ) -> Result<PathBuf> {
        let provenance = Provenance {
            version: self.version.clone(),
            step: self.step_id.clone(),
            step_description: self.step_description.clone(),
            output_file: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            generated_at: Utc::now().to_rfc3339(),
        };
        let performance = if self.config.output_profiling {
            let size = fs::metadata(path)
                .with_context(|| format!("measure output {}", path.display()))?
                .len();
            Some(Performance {
                duration: format!("{:.3}s", elapsed.as_secs_f64()),
                timestamp: Utc::now().to_rfc3339(),
                file_size_bytes: size,
            })
        } else {
            None
        };
        write_sidecar(path, &provenance, performance.as_ref(), request.metadata)
    }

    /// Save an already-encoded figure image. Default suffix `plot`, `.png`.
    pub fn save_figure(
        &self,
        name: &str,
        image: &[u8],
        request: &SaveRequest<'_>,
    ) -> Result<SaveOutcome> {
        let request = request.with_defaults("plot", ".png");
        self.save_with(name, &request, |path| {
            fs::write(path, image).map_err(Into::into)
        })
    }

    /// Save a table as CSV or TSV. Default suffix `table`.
    pub fn save_table(
        &self,
        name: &str,
        table: &Table,
        format: TableFormat,
        request: &SaveRequest<'_>,
    ) -> Result<SaveOutcome> {
        let (extension, delimiter) = match format {
            TableFormat::Csv => (".csv", ','),
            TableFormat::Tsv => (".tsv", '\t'),
        };
        let request = request.with_defaults("table", extension);
        self.save_with(name, &request, |path| {
            fs::write(path, render_table(table, delimiter)).map_err(Into::into)
        })
    }

    /// Save a numeric array. Default suffix `array`.
    pub fn save_array(
        &self,
        name: &str,
        values: &[f64],
        format: ArrayFormat,
        request: &SaveRequest<'_>,
    ) -> Result<SaveOutcome> {
        let extension = match format {
            ArrayFormat::Text => ".txt",
            ArrayFormat::Json => ".json",
        };
        let request = request.with_defaults("array", extension);
        self.save_with(name, &request, |path| {
            let contents = match format {
                ArrayFormat::Text => {
                    let mut buf = values
                        .iter()
                        .map(f64::to_string)
                        .collect::<Vec<_>>()
                        .join("\n");
                    buf.push('\n');
                    buf
                }
                ArrayFormat::Json => {
                    let mut buf = serde_json::to_string_pretty(values)?;
                    buf.push('\n');
                    buf
                }
            };
            fs::write(path, contents).map_err(Into::into)
        })
    }

    /// Save any serializable value as pretty-printed JSON. Default suffix `data`.
    pub fn save_json<T: Serialize>(
        &self,
        name: &str,
        value: &T,
        request: &SaveRequest<'_>,
    ) -> Result<SaveOutcome> {
        let request = request.with_defaults("data", ".json");
        self.save_with(name, &request, |path| {
            let mut buf = serde_json::to_string_pretty(value)?;
            buf.push('\n');
            fs::write(path, buf).map_err(Into::into)
        })
    }

    /// Save text content. Default suffix `log`, `.txt`.
    pub fn save_text(
        &self,
        name: &str,
        text: &str,
        request: &SaveRequest<'_>,
    ) -> Result<SaveOutcome> {
        let request = request.with_defaults("log", ".txt");
        self.save_with(name, &request, |path| {
            fs::write(path, text).map_err(Into::into)
        })
    }
}

fn render_table(table: &Table, delimiter: char) -> String {
    let mut buf = String::new();
    if !table.columns.is_empty() {
        render_row(&mut buf, &table.columns, delimiter);
    }
    for row in &table.rows {
        render_row(&mut buf, row, delimiter);
    }
    buf
}

fn render_row(buf: &mut String, fields: &[String], delimiter: char) {
    let rendered: Vec<String> = fields.iter().map(|f| quote_field(f, delimiter)).collect();
    buf.push_str(&rendered.join(&delimiter.to_string()));
    buf.push('\n');
}

fn quote_field(field: &str, delimiter: char) -> String {
    if field.contains(delimiter) || field.contains('"') || field.contains('\n') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
