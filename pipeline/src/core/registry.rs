//! Registry of declared step outputs.
//!
//! The registry is an explicit value owned by the pipeline driver, built once
//! from every step's declarations before the first step runs, and read-only
//! afterwards. There is no process-global state; tests construct fresh
//! registries per case.

use anyhow::{Result, anyhow};

/// A named, optional artifact a step may produce.
///
/// Declarations are created once per step type and never change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDeclaration {
    /// Output name, unique within the owning step.
    pub name: String,
    /// Human description shown by `list-outputs`.
    pub description: String,
    /// Whether the output is generated when no selection spec is supplied.
    pub enabled_by_default: bool,
    /// Reserved grouping label. Carried through but without semantics yet.
    pub group: Option<String>,
}

impl OutputDeclaration {
    pub fn new(name: &str, description: &str, enabled_by_default: bool) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            enabled_by_default,
            group: None,
        }
    }
}

/// Declarations of one step, in registration order.
#[derive(Debug, Clone, Default)]
pub struct StepOutputs {
    pub step_id: String,
    pub declarations: Vec<OutputDeclaration>,
}

/// Append-only table of output declarations, keyed by owning step.
#[derive(Debug, Clone, Default)]
pub struct OutputRegistry {
    steps: Vec<StepOutputs>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one declaration for `step_id`.
    ///
    /// Duplicate names under the same step are an error; the same name under
    /// a different step is fine (disambiguated by step scope everywhere).
    pub fn register(&mut self, step_id: &str, declaration: OutputDeclaration) -> Result<()> {
        let index = match self.steps.iter().position(|s| s.step_id == step_id) {
            Some(index) => index,
            None => {
                self.steps.push(StepOutputs {
                    step_id: step_id.to_string(),
                    declarations: Vec::new(),
                });
                self.steps.len() - 1
            }
        };
        let entry = &mut self.steps[index];
        if entry.declarations.iter().any(|d| d.name == declaration.name) {
            return Err(anyhow!(
                "duplicate output '{}' registered for step '{}'",
                declaration.name,
                step_id
            ));
        }
        entry.declarations.push(declaration);
        Ok(())
    }

    /// Register a batch of declarations for `step_id`, in order.
    pub fn register_all(
        &mut self,
        step_id: &str,
        declarations: Vec<OutputDeclaration>,
    ) -> Result<()> {
        for declaration in declarations {
            self.register(step_id, declaration)?;
        }
        Ok(())
    }

    /// Declarations for one step, in registration order. Empty for unknown steps.
    pub fn declarations_for(&self, step_id: &str) -> &[OutputDeclaration] {
        self.steps
            .iter()
            .find(|s| s.step_id == step_id)
            .map(|s| s.declarations.as_slice())
            .unwrap_or(&[])
    }

    /// Look up one declaration by owning step and name.
    pub fn find(&self, step_id: &str, name: &str) -> Option<&OutputDeclaration> {
        self.declarations_for(step_id)
            .iter()
            .find(|d| d.name == name)
    }

    /// All per-step declaration groups, in step registration order.
    pub fn steps(&self) -> &[StepOutputs] {
        &self.steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_preserves_declaration_order() {
        let mut registry = OutputRegistry::new();
        registry
            .register("00", OutputDeclaration::new("b_second", "B", true))
            .expect("register");
        registry
            .register("00", OutputDeclaration::new("a_first", "A", false))
            .expect("register");

        let names: Vec<&str> = registry
            .declarations_for("00")
            .iter()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["b_second", "a_first"]);
    }

    #[test]
    fn duplicate_name_in_same_step_errors() {
        let mut registry = OutputRegistry::new();
        registry
            .register("00", OutputDeclaration::new("plot", "first", true))
            .expect("register");
        let err = registry
            .register("00", OutputDeclaration::new("plot", "second", true))
            .unwrap_err();
        assert!(err.to_string().contains("duplicate output 'plot'"));
    }

    #[test]
    fn same_name_under_different_steps_is_allowed() {
        let mut registry = OutputRegistry::new();
        registry
            .register("00", OutputDeclaration::new("plot", "step 00 plot", true))
            .expect("register");
        registry
            .register("01", OutputDeclaration::new("plot", "step 01 plot", false))
            .expect("register");

        assert!(registry.find("00", "plot").expect("decl").enabled_by_default);
        assert!(!registry.find("01", "plot").expect("decl").enabled_by_default);
    }

    #[test]
    fn unknown_step_has_no_declarations() {
        let registry = OutputRegistry::new();
        assert!(registry.declarations_for("99").is_empty());
        assert!(registry.find("99", "plot").is_none());
    }
}
