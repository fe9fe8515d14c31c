//! Test-only helpers for constructing configurations and steps.

use std::path::Path;

use anyhow::Result;
use serde_json::Value;

use crate::core::registry::OutputDeclaration;
use crate::io::config::PipelineConfig;
use crate::io::output::{OutputManager, SaveRequest};
use crate::step::Step;

/// Config rooted in a test directory, everything else at defaults.
pub fn config_in(root: &Path) -> PipelineConfig {
    PipelineConfig {
        derivatives_root: root.to_path_buf(),
        ..PipelineConfig::default()
    }
}

/// Declaration with a deterministic description.
pub fn declaration(name: &str, enabled_by_default: bool) -> OutputDeclaration {
    OutputDeclaration::new(name, &format!("{name} description"), enabled_by_default)
}

/// Step that writes one text file per declared output that is selected.
///
/// The written content is the string payload flowing through the pipeline
/// (or `"content"` when the payload is not a string), so overwrite tests
/// can tell apart first and second runs.
pub struct TextOutputsStep {
    id: String,
    declarations: Vec<OutputDeclaration>,
}

impl TextOutputsStep {
    pub fn boxed(id: &str, outputs: &[(&str, bool)]) -> Box<dyn Step> {
        Box::new(Self {
            id: id.to_string(),
            declarations: outputs
                .iter()
                .map(|(name, enabled)| declaration(name, *enabled))
                .collect(),
        })
    }
}

impl Step for TextOutputsStep {
    fn short_id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        "text outputs step"
    }

    fn outputs(&self) -> Vec<OutputDeclaration> {
        self.declarations.clone()
    }

    fn run(&self, data: Value, outputs: &OutputManager<'_>) -> Result<Value> {
        let content = data.as_str().unwrap_or("content").to_string();
        for declared in &self.declarations {
            if !outputs.should_generate(&declared.name) {
                continue;
            }
            outputs.save_text(&declared.name, &content, &SaveRequest::default())?;
        }
        Ok(data)
    }
}
