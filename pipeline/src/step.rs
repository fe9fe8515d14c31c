//! The unit of pipeline processing.

use anyhow::Result;
use serde_json::Value;

use crate::core::registry::OutputDeclaration;
use crate::io::output::OutputManager;

/// One unit of pipeline processing.
///
/// Steps are registered explicitly with [`crate::run::Pipeline::new`]; there
/// is no file-system discovery. `outputs()` is the single definition site
/// for a step's optional artifacts — the driver collects every declaration
/// into the output registry before the first step runs.
pub trait Step {
    /// Short order-prefix id (e.g. `"00"`), unique within a pipeline.
    fn short_id(&self) -> &str;

    /// Human description shown in banners and sidecars.
    fn description(&self) -> &str;

    /// Declared optional outputs of this step, in definition order.
    fn outputs(&self) -> Vec<OutputDeclaration> {
        Vec::new()
    }

    /// Execute the step, transforming the data payload.
    fn run(&self, data: Value, outputs: &OutputManager<'_>) -> Result<Value>;
}
