//! # Validate Subcommand
//!
//! `jsv validate <schema> <instance>...` compiles the schema (or loads a
//! template with `--template`) and evaluates every instance against it.
//! The process exits with status 2 when any instance is invalid.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::Args;
use jsv_compiler::Mode;
use jsv_core::{Json, Template};
use jsv_evaluator::{standard, Evaluator, SimpleOutput, StandardOutput, TraceOutput};
use tracing::info;

use crate::compile::{compile_schema, SourceArgs};
use crate::input::{read_document, read_instances};
use crate::settings::Settings;

/// Arguments for the validate subcommand.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// The schema followed by the instances to validate. With `--template`,
    /// instances only. A `.jsonl` instance file holds one instance per line.
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Validate against a template printed by `jsv compile` instead of a
    /// schema.
    #[arg(long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// Compile for boolean validity only. Errors are reported up to the
    /// first failure.
    #[arg(long)]
    pub fast: bool,

    /// Print every instruction as it is entered and left.
    #[arg(long)]
    pub trace: bool,

    /// Print results in the JSON Schema standard output format, one
    /// document per line: `flag` with `--fast`, `basic` otherwise.
    #[arg(long, conflicts_with = "trace")]
    pub json: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Load a template previously printed by `jsv compile`.
///
/// # Errors
///
/// Fails when the file cannot be read or is not a template.
pub fn read_template(path: &Path) -> anyhow::Result<Template> {
    let document = read_document(path)?;
    Template::from_json(&document)
        .with_context(|| format!("failed to load template {}", path.display()))
}

/// Run `jsv validate`. Returns whether every instance was valid.
///
/// # Errors
///
/// Fails when an input cannot be loaded, the schema does not compile, or
/// evaluation hits the depth limit.
pub fn run(args: &ValidateArgs, settings: &Settings, out: &mut impl Write) -> anyhow::Result<bool> {
    let (template, instances) = match &args.template {
        Some(path) => (read_template(path)?, args.paths.as_slice()),
        None => {
            let Some((schema, instances)) = args.paths.split_first() else {
                bail!("missing schema");
            };
            if instances.is_empty() {
                bail!("no instances to validate against {}", schema.display());
            }
            let mode = if args.fast {
                Mode::FastValidation
            } else {
                Mode::Exhaustive
            };
            (compile_schema(schema, mode, &args.source, settings)?, instances)
        }
    };

    let evaluator = settings.evaluator();
    let mut all_valid = true;
    for path in instances {
        let documents = read_instances(path)?;
        let numbered = documents.len() > 1;
        for (index, instance) in documents.iter().enumerate() {
            let label = if numbered {
                format!("{} ({})", path.display(), index + 1)
            } else {
                path.display().to_string()
            };
            let valid = report(&evaluator, &template, instance, &label, args, out)?;
            info!(instance = %label, valid, "evaluated instance");
            all_valid &= valid;
        }
    }
    Ok(all_valid)
}

fn report(
    evaluator: &Evaluator,
    template: &Template,
    instance: &Json,
    label: &str,
    args: &ValidateArgs,
    out: &mut impl Write,
) -> anyhow::Result<bool> {
    if args.json {
        let format = if args.fast {
            StandardOutput::Flag
        } else {
            StandardOutput::Basic
        };
        let document = standard(evaluator, template, instance, format)
            .with_context(|| format!("failed to evaluate {label}"))?;
        serde_json::to_writer(&mut *out, &document)?;
        writeln!(out)?;
        return Ok(document.get("valid") == Some(&Json::Bool(true)));
    }

    let mut output = SimpleOutput::new(instance);
    let mut trace = TraceOutput::new();
    let valid = evaluator
        .evaluate_with_callback(template, instance, &mut |event| {
            output.record(event);
            if args.trace {
                trace.record(event);
            }
        })
        .with_context(|| format!("failed to evaluate {label}"))?;

    if args.trace {
        write!(out, "{trace}")?;
    }
    if valid {
        writeln!(out, "ok: {label}")?;
    } else {
        let mut stacktrace = String::new();
        output.stacktrace(&mut stacktrace, "  ")?;
        writeln!(out, "fail: {label}")?;
        write!(out, "{stacktrace}")?;
    }
    Ok(valid)
}
