//! Embeddable command-line interface.
//!
//! Steps are statically registered in Rust, so the binary lives with the
//! pipeline definition: a consumer parses [`Cli`] and hands its step set to
//! [`run_cli`].

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use serde_json::Value;

use crate::core::selection::parse_pattern_arg;
use crate::io::config::load_config;
use crate::io::overwrite::{AutoConfirm, Confirm, StdinConfirm};
use crate::report::generate_report;
use crate::run::{Pipeline, filter_steps};
use crate::step::Step;

#[derive(Debug, Parser)]
#[command(name = "pipeline", version, about = "Sequential processing-pipeline controller")]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, default_value = "pipeline.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the pipeline, optionally restricted to the given steps.
    Run {
        /// Steps to run, by short-id prefix (e.g. `00 02`). Empty runs all.
        steps: Vec<String>,

        /// Comma-separated outputs to generate. Supports wildcards
        /// (`plot*`) and step scoping (`01:plot,02:*`). Replaces the
        /// configured value wholesale.
        #[arg(long, value_name = "PATTERNS")]
        outputs: Option<String>,

        /// Comma-separated outputs to skip; same syntax as `--outputs`,
        /// takes precedence over it.
        #[arg(long, value_name = "PATTERNS")]
        skip_outputs: Option<String>,

        /// Answer overwrite questions with the default answer instead of
        /// prompting.
        #[arg(long)]
        ignore_questions: bool,
    },
    /// List the steps of this pipeline.
    ListSteps,
    /// List every registered output with its default-enabled marker.
    ListOutputs,
    /// Summarize recorded derivatives from their sidecars.
    Report {
        /// Also write the report into the output root.
        #[arg(long)]
        store: bool,
    },
}

/// Execute one CLI invocation against the given step set.
pub fn run_cli(cli: Cli, steps: Vec<Box<dyn Step>>) -> Result<()> {
    let mut config = load_config(&cli.config)?;

    match cli.command {
        Command::Run {
            steps: specifiers,
            outputs,
            skip_outputs,
            ignore_questions,
        } => {
            if let Some(raw) = outputs {
                config.outputs_to_generate = Some(parse_pattern_arg(&raw));
            }
            if let Some(raw) = skip_outputs {
                config.outputs_to_skip = Some(parse_pattern_arg(&raw));
            }
            if ignore_questions {
                config.assume_defaults = true;
            }

            let steps = filter_steps(steps, &specifiers)?;
            let pipeline = Pipeline::new(steps)?;
            let confirm: Box<dyn Confirm> = if config.assume_defaults {
                Box::new(AutoConfirm(false))
            } else {
                Box::new(StdinConfirm)
            };
            pipeline.run(&config, confirm.as_ref(), Value::Null)?;
            Ok(())
        }
        Command::ListSteps => {
            for step in &steps {
                println!("{} - {}", step.short_id(), step.description());
            }
            Ok(())
        }
        Command::ListOutputs => {
            // Registration errors (duplicate names) are the only fatal case
            // here; selection misconfiguration never is.
            let pipeline = Pipeline::new(steps)?;
            list_outputs(&pipeline);
            Ok(())
        }
        Command::Report { store } => {
            let rendered = generate_report(&config, store)?;
            println!("{rendered}");
            Ok(())
        }
    }
}

fn list_outputs(pipeline: &Pipeline) {
    for step in pipeline.steps() {
        println!();
        println!("{} - {}", step.short_id(), step.description());
        let declarations = pipeline.registry().declarations_for(step.short_id());
        if declarations.is_empty() {
            println!("  No registered outputs");
            continue;
        }
        println!("  Outputs:");
        for declaration in declarations {
            let marker = if declaration.enabled_by_default { "✓" } else { "○" };
            let note = if declaration.enabled_by_default {
                ""
            } else {
                " (disabled by default)"
            };
            println!(
                "    {marker} {} - {}{note}",
                declaration.name, declaration.description
            );
        }
    }
}
