//! `aclsync fetch` - download an ACL bundle and extract its payload.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use aclsync_core::{Pipeline, Settings, Verification};

use super::EXIT_SUCCESS;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Bundle location (s3://bucket/key, http(s)://..., file://path)
    #[arg(long)]
    pub url: String,

    /// Write the ACL here instead of stdout
    #[arg(long, short)]
    pub out: Option<PathBuf>,

    /// Skip signature verification
    #[arg(long)]
    pub no_verify: bool,
}

pub async fn run(args: FetchArgs, settings: &Settings) -> Result<i32> {
    let pipeline = Pipeline::from_settings(settings)?;
    let verification = Verification::from_no_verify(args.no_verify || settings.no_verify);
    let bundle = pipeline
        .fetch(&args.url, verification)
        .await
        .with_context(|| format!("failed to fetch {}", args.url))?;

    match &args.out {
        Some(path) => std::fs::write(path, &bundle.payload)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bundle.payload)?;
            stdout.flush()?;
        }
    }
    Ok(EXIT_SUCCESS)
}
