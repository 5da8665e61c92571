//! Implementation of `fwsdk setup`.

use std::path::Path;

use anyhow::{Context, Result};

use fwsdk::core::catalog::Catalog;
use fwsdk::core::host::HostProfile;
use fwsdk::errors::SetupError;
use fwsdk::install::download::HttpTransport;
use fwsdk::install::env::{EnvMap, PersistTarget};
use fwsdk::install::{self, InstallOptions, Installer};
use fwsdk::util::logging;

use crate::cli::SetupArgs;

/// Debug log recorded alongside every setup run.
const LOG_FILE: &str = "fwsdk-setup.log";

pub fn execute(args: SetupArgs, verbose: bool) -> Result<()> {
    let _guard = logging::init(verbose, Some(Path::new(LOG_FILE)))?;

    let host = HostProfile::detect()?;
    tracing::debug!("host: {} ({})", host.os, host.arch);

    let catalog_path = args
        .config
        .clone()
        .unwrap_or_else(install::default_catalog_path);
    let catalog = Catalog::load(&catalog_path)
        .with_context(|| format!("failed to load tool catalog {}", catalog_path.display()))?;

    let version = resolve_version(&args, &catalog)?;

    let opts = InstallOptions {
        platform: args.platform,
        version,
        force: args.force,
    };

    let installer = Installer::new(
        &catalog,
        &host,
        opts,
        HttpTransport::new()?,
        install::default_dest_root()?,
        PersistTarget::for_host(&host)?,
    );

    let report = installer.run(&EnvMap::from_process())?;
    if !report.all_satisfied() {
        tracing::info!("setup finished. Open a new shell to pick up the environment.");
    }
    Ok(())
}

/// Pick the toolchain version for the selected platform and check it
/// against the versions the catalog actually carries.
fn resolve_version(args: &SetupArgs, catalog: &Catalog) -> Result<String> {
    let version = args
        .selected_version()
        .unwrap_or_else(|| args.platform.default_version());

    let allowed = catalog.toolchain_versions(args.platform.as_str());
    if args.selected_version().is_some() && !allowed.contains(&version) {
        return Err(SetupError::Configuration(format!(
            "unknown {} toolchain version `{}` (allowed: [{}])",
            args.platform,
            version,
            allowed.join(", ")
        ))
        .into());
    }

    Ok(version.to_string())
}
