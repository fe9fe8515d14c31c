//! Demonstration pipeline: two steps wired into the embeddable CLI.
//!
//! Shows the intended consumer shape: steps implement [`Step`], declare
//! their outputs once, and hand everything to `pipeline::cli::run_cli`.

use anyhow::Result;
use clap::Parser;
use serde_json::{Value, json};

use pipeline::cli::{Cli, run_cli};
use pipeline::core::naming::guess_short_id;
use pipeline::core::registry::OutputDeclaration;
use pipeline::io::output::{ArrayFormat, OutputManager, SaveRequest, Table, TableFormat};
use pipeline::step::Step;

/// Produce a small raw-data table and a conversion note.
struct Conversion {
    short_id: String,
}

impl Conversion {
    fn new() -> Self {
        Self {
            short_id: guess_short_id("00_conversion"),
        }
    }
}

impl Step for Conversion {
    fn short_id(&self) -> &str {
        &self.short_id
    }

    fn description(&self) -> &str {
        "Convert raw recordings into a tabular form"
    }

    fn outputs(&self) -> Vec<OutputDeclaration> {
        vec![
            OutputDeclaration::new("raw_table", "Raw data table", true),
            OutputDeclaration::new("notes", "Conversion notes", true),
        ]
    }

    fn run(&self, _data: Value, outputs: &OutputManager<'_>) -> Result<Value> {
        let table = Table {
            columns: vec!["subject".to_string(), "value".to_string()],
            rows: vec![
                vec!["01".to_string(), "0.42".to_string()],
                vec!["02".to_string(), "0.58".to_string()],
            ],
        };
        outputs.save_table("raw_table", &table, TableFormat::Csv, &SaveRequest::default())?;
        outputs.save_text(
            "notes",
            "Converted 2 recordings without errors.\n",
            &SaveRequest::default(),
        )?;
        Ok(json!({ "rows": table.rows.len() }))
    }
}

/// Summarize the converted table.
struct Analysis {
    short_id: String,
}

impl Analysis {
    fn new() -> Self {
        Self {
            short_id: guess_short_id("01_analysis"),
        }
    }
}

impl Step for Analysis {
    fn short_id(&self) -> &str {
        &self.short_id
    }

    fn description(&self) -> &str {
        "Compute summary statistics over the converted data"
    }

    fn outputs(&self) -> Vec<OutputDeclaration> {
        vec![
            OutputDeclaration::new("summary_stats", "Statistical summary", true),
            OutputDeclaration::new("values_array", "Per-sample values (large)", false),
        ]
    }

    fn run(&self, data: Value, outputs: &OutputManager<'_>) -> Result<Value> {
        let rows = data["rows"].as_u64().unwrap_or(0);
        let values = [0.42, 0.58];

        outputs.save_json(
            "summary_stats",
            &json!({
                "rows": rows,
                "mean": values.iter().sum::<f64>() / values.len() as f64,
            }),
            &SaveRequest::default(),
        )?;

        // Skip the expensive dump entirely unless it was asked for.
        if outputs.should_generate("values_array") {
            outputs.save_array(
                "values_array",
                &values,
                ArrayFormat::Text,
                &SaveRequest::default(),
            )?;
        }

        Ok(data)
    }
}

fn steps() -> Vec<Box<dyn Step>> {
    vec![Box::new(Conversion::new()), Box::new(Analysis::new())]
}

fn main() {
    pipeline::logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    run_cli(cli, steps())
}
