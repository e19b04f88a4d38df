use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use super::commands::fetch::FetchArgs;
use super::commands::report::ReportArgs;
use super::commands::store::StoreArgs;
use super::commands::verify::VerifyArgs;

#[derive(Parser, Debug)]
#[command(
    name = "aclsync",
    version,
    about = "Fetch, verify, sign and publish ACL bundles over S3, HTTP(S) and local files"
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub cmd: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download, unpack and verify an ACL bundle
    Fetch(FetchArgs),
    /// Sign an ACL file and upload it as a bundle
    Store(StoreArgs),
    /// Render a diff report, sign it and upload it
    Report(ReportArgs),
    /// Check a local bundle file offline
    Verify(VerifyArgs),
}

/// Options shared by every command. Unset values fall back to the settings file.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Settings file (YAML)
    #[arg(long, global = true, env = "ACLSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory with <identity>.pub verification keys
    #[arg(long = "keys", global = true, env = "ACLSYNC_KEYS")]
    pub keys_dir: Option<PathBuf>,

    /// PKCS#8 private key used for signing
    #[arg(long = "key", global = true, env = "ACLSYNC_KEY")]
    pub key_file: Option<PathBuf>,

    /// Signer identity written into produced bundles
    #[arg(long, global = true, env = "ACLSYNC_IDENTITY")]
    pub identity: Option<String>,

    /// AWS credentials file (default: environment)
    #[arg(long, global = true, env = "ACLSYNC_CREDENTIALS")]
    pub credentials: Option<PathBuf>,

    /// Profile within the credentials file
    #[arg(long, global = true, env = "ACLSYNC_PROFILE")]
    pub profile: Option<String>,

    /// S3 region
    #[arg(long, global = true, env = "ACLSYNC_REGION")]
    pub region: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Also write logs to this file
    #[arg(long, global = true, env = "ACLSYNC_LOG_FILE")]
    pub log_file: Option<PathBuf>,
}
