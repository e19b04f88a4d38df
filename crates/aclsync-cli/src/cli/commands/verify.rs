//! `aclsync verify` - check a bundle on disk without any network access.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use aclsync_core::{Format, Pipeline, Settings, Verification};

use super::EXIT_SUCCESS;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Bundle file
    #[arg(long)]
    pub bundle: PathBuf,

    /// Treat the file as zip regardless of its name
    #[arg(long)]
    pub zip: bool,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

pub fn run(args: VerifyArgs, settings: &Settings) -> Result<i32> {
    let bytes = std::fs::read(&args.bundle)
        .with_context(|| format!("failed to read bundle: {}", args.bundle.display()))?;
    let format = if args.zip {
        Format::Zip
    } else {
        Format::for_uri(&args.bundle.to_string_lossy())
    };

    let bundle = Pipeline::from_settings(settings)?
        .open(&bytes, format, Verification::Required)
        .with_context(|| format!("bundle {} rejected", args.bundle.display()))?;

    if !args.quiet {
        println!(
            "OK {} signed by {} ({} bytes, {})",
            bundle.payload_name,
            bundle.identity,
            bundle.payload.len(),
            format
        );
    }
    Ok(EXIT_SUCCESS)
}
