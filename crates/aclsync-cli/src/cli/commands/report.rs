//! `aclsync report` - publish a signed diff report.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use aclsync_core::{Pipeline, Settings, Signer};

use super::EXIT_SUCCESS;

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Destination for the report bundle
    #[arg(long)]
    pub url: String,

    /// File with the diff text to embed
    #[arg(long)]
    pub diff: PathBuf,
}

pub async fn run(args: ReportArgs, settings: &Settings) -> Result<i32> {
    let diff = std::fs::read_to_string(&args.diff)
        .with_context(|| format!("failed to read diff file: {}", args.diff.display()))?;
    let template = settings.template()?;
    let signer = Signer::load(&settings.key_file, settings.signing_identity()?)?;

    let report = Pipeline::from_settings(settings)?
        .publish_report(&args.url, &template, &diff, &signer)
        .await
        .with_context(|| format!("failed to publish report to {}", args.url))?;

    eprintln!("published {} at {}", report.name, args.url);
    Ok(EXIT_SUCCESS)
}
