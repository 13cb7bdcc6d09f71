//! # Frame Subcommand
//!
//! `jsv frame <schema>` prints the location and reference tables the
//! compiler would work from. Useful when a reference does not resolve the
//! way you expect.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use jsv_compiler::{default_walker, Frame};

use crate::compile::SourceArgs;
use crate::input::read_document;
use crate::resolver::DirectoryResolver;

/// Arguments for the frame subcommand.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Schema to frame (JSON or YAML).
    pub schema: PathBuf,

    #[command(flatten)]
    pub source: SourceArgs,
}

/// Run `jsv frame`.
///
/// # Errors
///
/// Fails when the schema cannot be loaded, its dialect cannot be
/// determined, or writing to `out` fails.
pub fn run(args: &FrameArgs, out: &mut impl Write) -> anyhow::Result<()> {
    let schema = read_document(&args.schema)?;
    let resolver = DirectoryResolver::from_paths(&args.source.resolve)?;
    let frame = Frame::build(
        &schema,
        default_walker,
        &resolver,
        args.source.default_dialect.as_deref(),
        None,
    )
    .with_context(|| format!("failed to frame {}", args.schema.display()))?;
    serde_json::to_writer_pretty(&mut *out, &frame.to_json())?;
    writeln!(out)?;
    Ok(())
}
