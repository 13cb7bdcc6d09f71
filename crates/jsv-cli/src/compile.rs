//! # Compile Subcommand
//!
//! `jsv compile <schema>` prints the compiled template as JSON. The output
//! can be fed back to `jsv validate --template`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use jsv_compiler::{compile, CompileOptions, Mode};
use jsv_core::Template;
use tracing::info;

use crate::input::read_document;
use crate::resolver::DirectoryResolver;
use crate::settings::Settings;

/// Where referenced schemas come from and how to read schemas without a
/// declared dialect.
#[derive(Args, Debug, Clone, Default)]
pub struct SourceArgs {
    /// Directory or file of schemas to resolve references against.
    /// May be repeated.
    #[arg(long = "resolve", short = 'r', value_name = "PATH")]
    pub resolve: Vec<PathBuf>,

    /// Dialect assumed for schemas that declare no `$schema`.
    #[arg(long, value_name = "URI")]
    pub default_dialect: Option<String>,
}

/// Arguments for the compile subcommand.
#[derive(Args, Debug)]
pub struct CompileArgs {
    /// Schema to compile (JSON or YAML).
    pub schema: PathBuf,

    /// Compile for boolean validity only.
    #[arg(long, conflicts_with = "exhaustive")]
    pub fast: bool,

    /// Compile so that every error and annotation is observable (default).
    #[arg(long)]
    pub exhaustive: bool,

    /// Print the template on a single line.
    #[arg(long)]
    pub minify: bool,

    #[command(flatten)]
    pub source: SourceArgs,
}

impl CompileArgs {
    pub fn mode(&self) -> Mode {
        if self.fast {
            Mode::FastValidation
        } else {
            Mode::Exhaustive
        }
    }
}

/// Read, bundle and compile the schema at `path`.
///
/// # Errors
///
/// Fails when the schema or a `--resolve` path cannot be loaded, or when
/// compilation fails.
pub fn compile_schema(
    path: &Path,
    mode: Mode,
    source: &SourceArgs,
    settings: &Settings,
) -> anyhow::Result<Template> {
    let schema = read_document(path)?;
    let resolver = DirectoryResolver::from_paths(&source.resolve)?;
    let mut options = CompileOptions::new(mode).with_tweaks(settings.tweaks);
    if let Some(dialect) = &source.default_dialect {
        options = options.with_default_dialect(dialect.clone());
    }
    let template = compile(&schema, &resolver, &options)
        .with_context(|| format!("failed to compile {}", path.display()))?;
    info!(
        schema = %path.display(),
        ?mode,
        instructions = template.size(),
        "compiled schema"
    );
    Ok(template)
}

/// Run `jsv compile`.
///
/// # Errors
///
/// See [`compile_schema`]; also fails when writing to `out` fails.
pub fn run(args: &CompileArgs, settings: &Settings, out: &mut impl Write) -> anyhow::Result<()> {
    let template = compile_schema(&args.schema, args.mode(), &args.source, settings)?;
    let document = template.to_json()?;
    if args.minify {
        serde_json::to_writer(&mut *out, &document)?;
    } else {
        serde_json::to_writer_pretty(&mut *out, &document)?;
    }
    writeln!(out)?;
    Ok(())
}
