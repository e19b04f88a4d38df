pub mod fetch;
pub mod report;
pub mod store;
pub mod verify;

use anyhow::{Context, Result};
use tracing::debug;

use aclsync_core::{load_settings, AuthError, BundleError, Settings, TransportError};

use super::args::{Cli, Command, GlobalArgs};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONFIG: i32 = 1;
pub const EXIT_AUTH: i32 = 4;

pub async fn dispatch(cli: Cli) -> Result<i32> {
    let settings = resolve_settings(&cli.global)?;
    match cli.cmd {
        Command::Fetch(args) => fetch::run(args, &settings).await,
        Command::Store(args) => store::run(args, &settings).await,
        Command::Report(args) => report::run(args, &settings).await,
        Command::Verify(args) => verify::run(args, &settings),
    }
}

/// Defaults < settings file < flags and environment.
pub fn resolve_settings(global: &GlobalArgs) -> Result<Settings> {
    let mut settings = match &global.config {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };

    if let Some(dir) = &global.keys_dir {
        settings.keys_dir = dir.clone();
    }
    if let Some(key) = &global.key_file {
        settings.key_file = key.clone();
    }
    if let Some(identity) = &global.identity {
        settings.identity = identity.clone();
    }
    if let Some(credentials) = &global.credentials {
        settings.credentials = Some(credentials.clone());
    }
    if let Some(profile) = &global.profile {
        settings.profile = profile.clone();
    }
    if let Some(region) = &global.region {
        settings.region = Some(region.clone());
    }

    settings.validate().context("invalid settings")?;
    debug!(?settings, "resolved settings");
    Ok(settings)
}

/// Map an error chain to the process exit code.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<aclsync_core::Error>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<TransportError>() {
            return e.exit_code();
        }
        if let Some(e) = cause.downcast_ref::<BundleError>() {
            return e.exit_code();
        }
        if cause.downcast_ref::<AuthError>().is_some() {
            return EXIT_AUTH;
        }
    }
    EXIT_CONFIG
}
