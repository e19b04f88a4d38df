//! `aclsync store` - sign an ACL file and upload it as a bundle.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use aclsync_core::{Pipeline, Settings, Signer};

use super::EXIT_SUCCESS;

#[derive(Args, Debug)]
pub struct StoreArgs {
    /// Destination (a `.zip` suffix selects zip, anything else tar.gz)
    #[arg(long)]
    pub url: String,

    /// ACL file to sign and upload
    #[arg(long)]
    pub acl: PathBuf,

    /// Entry name inside the bundle; `.acl` is appended when missing
    #[arg(long)]
    pub name: Option<String>,
}

pub async fn run(args: StoreArgs, settings: &Settings) -> Result<i32> {
    let payload = std::fs::read(&args.acl)
        .with_context(|| format!("failed to read ACL file: {}", args.acl.display()))?;
    let name = entry_name(&args)?;

    let signer = Signer::load(&settings.key_file, settings.signing_identity()?)?;
    let pipeline = Pipeline::from_settings(settings)?;
    pipeline
        .store_acl(&args.url, &name, payload, &signer)
        .await
        .with_context(|| format!("failed to store {}", args.url))?;

    eprintln!("stored {name} at {}", args.url);
    Ok(EXIT_SUCCESS)
}

fn entry_name(args: &StoreArgs) -> Result<String> {
    if let Some(name) = &args.name {
        return Ok(name.clone());
    }
    args.acl
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("cannot derive entry name from {}", args.acl.display()))
}
