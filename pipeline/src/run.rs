//! Sequential execution of pipeline steps.

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::warn;

use crate::core::registry::OutputRegistry;
use crate::core::selection::unmatched_literal_patterns;
use crate::io::config::PipelineConfig;
use crate::io::output::OutputManager;
use crate::io::overwrite::Confirm;
use crate::step::Step;

/// An ordered set of steps with their collected output registry.
///
/// Construction is the single registration phase: every step's declarations
/// land in the registry here, and duplicate output names (or duplicate step
/// ids) fail before anything runs. The registry is read-only afterwards.
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
    registry: OutputRegistry,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn Step>>) -> Result<Self> {
        let mut registry = OutputRegistry::new();
        for (index, step) in steps.iter().enumerate() {
            if steps[..index].iter().any(|s| s.short_id() == step.short_id()) {
                return Err(anyhow!("duplicate step id '{}'", step.short_id()));
            }
            registry.register_all(step.short_id(), step.outputs())?;
        }
        Ok(Self { steps, registry })
    }

    pub fn steps(&self) -> &[Box<dyn Step>] {
        &self.steps
    }

    pub fn registry(&self) -> &OutputRegistry {
        &self.registry
    }

    /// Run all steps in order, passing the data payload from one to the next.
    ///
    /// A step error aborts the run; skipped outputs inside a step do not.
    pub fn run(
        &self,
        config: &PipelineConfig,
        confirm: &dyn Confirm,
        data: Value,
    ) -> Result<Value> {
        self.warn_unmatched_patterns(config);

        let mut data = data;
        for (pos, step) in self.steps.iter().enumerate() {
            let banner = format!(" Step {}: {} ", pos + 1, step.short_id());
            println!("{banner:-^80}");
            println!("{}", step.description());

            let manager = OutputManager::new(
                config,
                &self.registry,
                confirm,
                step.short_id(),
                step.description(),
            );
            data = step.run(data, &manager).with_context(|| {
                format!("step {} ({}) failed", step.short_id(), step.description())
            })?;
        }
        Ok(data)
    }

    /// Warn about literal generate/skip patterns naming no registered output.
    ///
    /// Pattern lists are expected to occasionally miss across pipeline
    /// versions, so this is a notice, never an error.
    fn warn_unmatched_patterns(&self, config: &PipelineConfig) {
        let specs = [
            ("outputs_to_generate", config.outputs_to_generate.as_ref()),
            ("outputs_to_skip", config.outputs_to_skip.as_ref()),
        ];
        for (kind, spec) in specs {
            let Some(spec) = spec else { continue };
            for (scope, pattern) in unmatched_literal_patterns(&self.registry, spec) {
                warn!(kind, scope, pattern, "pattern matches no registered output");
            }
        }
    }
}

/// Select a subset of steps by short-id prefix, in specifier order.
///
/// Each specifier must resolve to exactly one step; unknown and ambiguous
/// specifiers are errors.
pub fn filter_steps(
    steps: Vec<Box<dyn Step>>,
    specifiers: &[String],
) -> Result<Vec<Box<dyn Step>>> {
    if specifiers.is_empty() {
        return Ok(steps);
    }

    let mut steps: Vec<Option<Box<dyn Step>>> = steps.into_iter().map(Some).collect();
    let mut selected = Vec::new();
    for specifier in specifiers {
        let matching: Vec<usize> = steps
            .iter()
            .enumerate()
            .filter_map(|(index, step)| {
                step.as_ref()
                    .filter(|s| s.short_id().starts_with(specifier.as_str()))
                    .map(|_| index)
            })
            .collect();
        match matching.as_slice() {
            [] => return Err(anyhow!("step '{specifier}' not found")),
            [index] => selected.push(steps[*index].take().expect("step still present")),
            _ => return Err(anyhow!("step '{specifier}' is ambiguous")),
        }
    }
    Ok(selected)
}
