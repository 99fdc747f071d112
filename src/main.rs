//! groups-sync CLI
//!
//! Entry point for the `groups-sync` command-line tool.

use std::error::Error as _;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use groups_config::MergedConfig;
use groups_sync::auth::{ambient_token_source, DIRECTORY_SCOPES, SCOPE_CLOUD_PLATFORM};
use groups_sync::config::DEFAULT_CONFIG_FILE;
use groups_sync::{
    snapshot, AdminDirectoryClient, ApiClient, DelegatedCredentials, GroupsSettingsClient,
    Reconciler, RunConfig, SecretManagerClient, SecretStore, ServiceAccountKey,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "groups-sync")]
#[command(about = "Reconcile Google Groups with a tree of groups.yaml files", version)]
struct Cli {
    /// The config file in yaml format
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Push changes to the directory (default is a dry run)
    #[arg(long)]
    confirm: bool,

    /// Print the existing groups as groups.yaml and exit; implies a dry run
    #[arg(long)]
    print: bool,

    /// Log extra information
    #[arg(long, short = 'v')]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(&cli) {
        error!("{}", e);
        let mut source = e.source();
        while let Some(cause) = source {
            error!("  caused by: {}", cause);
            source = cause.source();
        }
        process::exit(1);
    }
}

fn run(cli: &Cli) -> groups_sync::Result<()> {
    let mut confirm = cli.confirm;
    if cli.print {
        info!(confirm, "print: disabling confirm, will print existing group information");
        confirm = false;
    }
    if !confirm {
        warn!("dry-run mode, changes will not be pushed");
    }

    let config = RunConfig::load(&cli.config)?;
    config.log_summary(confirm);

    // Configuration problems surface before anything remote is touched.
    let restrictions = config.load_restrictions()?;
    info!(restrictions = restrictions.len(), "loaded restrictions");
    let merged = MergedConfig::build(&config.groups_path, &restrictions)?;

    let ambient = ambient_token_source(&[SCOPE_CLOUD_PLATFORM])?;
    let secrets = SecretManagerClient::new(ApiClient::new(ambient)?);
    let key_bytes = secrets.access_secret_version(&config.secret_version)?;
    let key = ServiceAccountKey::from_json(&key_bytes)?;

    let credentials = DelegatedCredentials::new(key, &config.bot_id, DIRECTORY_SCOPES)?;
    let api = ApiClient::new(Arc::new(credentials))?;
    let directory = Arc::new(AdminDirectoryClient::new(api.clone()));
    let settings = Arc::new(GroupsSettingsClient::new(api));

    if cli.print {
        let file = snapshot::collect(directory.as_ref(), settings.as_ref())?;
        print!("{}", snapshot::render(&file)?);
        return Ok(());
    }

    let reconciler = Reconciler::new(directory, settings, confirm);
    let summary = reconciler.reconcile_groups(merged.groups())?;
    info!(dry_run = reconciler.is_dry_run(), changes = summary.changes(), "{}", summary);

    Ok(())
}
