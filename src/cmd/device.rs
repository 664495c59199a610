use crate::cmd::progress;
use crate::cmd::prompts;
use crate::config::ConfigManager;
use crate::devices::{BatchDriver, BatchMode, Lookup};
use crate::error::{Dx365Error, Result};
use crate::graph::GraphClient;
use crate::graph::intune::{self, ManagedDevice};
use crate::report::{self, APP_HEADERS, AppRow, DEVICE_HEADERS, DeviceRow, REPORT_HEADERS};
use crate::report::{export, input};
use crate::session::Session;
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Write the results to a CSV file
    #[arg(long)]
    export: bool,

    /// Directory for exported reports (defaults to <Documents>/dx365)
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["name", "file"])))]
pub struct LookupArgs {
    /// Single device name (asset tag)
    #[arg(short, long)]
    name: Option<String>,

    /// CSV file with an "Asset Tag" column; the report is always exported
    #[arg(short, long)]
    file: Option<PathBuf>,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug)]
#[command(group(clap::ArgGroup::new("source").required(true).args(["name", "file"])))]
pub struct DeleteArgs {
    /// Single device name (asset tag)
    #[arg(short, long)]
    name: Option<String>,

    /// CSV file with an "Asset Tag" column; the report is always exported
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Look everything up and report what would be deleted
    #[arg(long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    yes: bool,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    /// User principal name (e.g., alice@contoso.com)
    upn: String,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug)]
pub struct NoncompliantArgs {
    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug)]
pub struct StaleArgs {
    /// Days since last check-in
    #[arg(short, long, default_value = "90", value_parser = clap::value_parser!(u32).range(1..))]
    days: u32,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Args, Debug)]
pub struct AppsArgs {
    /// Exact Intune device name
    name: String,

    #[command(flatten)]
    export: ExportArgs,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Single(String),
    File(PathBuf),
}

impl InputSource {
    fn from_args(name: Option<String>, file: Option<PathBuf>) -> Result<Self> {
        match (name, file) {
            (_, Some(path)) => Ok(InputSource::File(path)),
            (Some(name), None) => Ok(InputSource::Single(name)),
            (None, None) => Err(Dx365Error::InvalidConfig(
                "Provide --name or --file".into(),
            )),
        }
    }

    /// Device names in input order; blanks are preserved
    pub fn names(&self) -> Result<Vec<String>> {
        match self {
            InputSource::Single(name) => Ok(vec![name.clone()]),
            InputSource::File(path) => input::read_asset_tags(path),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Lookup,
    Delete,
}

/// Everything a lookup or deletion run needs, resolved from the command line
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub mode: RunMode,
    pub input: InputSource,
    /// Export directory, when the report should be written to CSV
    pub output: Option<PathBuf>,
    pub dry_run: bool,
}

impl RunConfig {
    pub fn batch_mode(&self) -> BatchMode {
        match self.mode {
            RunMode::Lookup => BatchMode::Lookup,
            RunMode::Delete => BatchMode::Delete {
                dry_run: self.dry_run,
            },
        }
    }

    fn title(&self) -> &'static str {
        match (self.mode, self.dry_run) {
            (RunMode::Lookup, _) => "Device Lookup",
            (RunMode::Delete, true) => "Device Deletion (dry run)",
            (RunMode::Delete, false) => "Device Deletion",
        }
    }
}

fn resolve_output(
    config: &ConfigManager,
    export: &ExportArgs,
    always: bool,
) -> Result<Option<PathBuf>> {
    if export.export || always {
        Ok(Some(config.export_dir(export.output_dir.as_deref())?))
    } else {
        Ok(None)
    }
}

pub async fn lookup(args: LookupArgs) -> Result<()> {
    let config = ConfigManager::load()?;
    let from_file = args.file.is_some();

    let run = RunConfig {
        mode: RunMode::Lookup,
        input: InputSource::from_args(args.name, args.file)?,
        output: resolve_output(&config, &args.export, from_file)?,
        dry_run: false,
    };
    let names = run.input.names()?;

    execute(&config, &run, &names).await
}

pub async fn delete(args: DeleteArgs) -> Result<()> {
    let config = ConfigManager::load()?;
    let from_file = args.file.is_some();

    let run = RunConfig {
        mode: RunMode::Delete,
        input: InputSource::from_args(args.name, args.file)?,
        output: resolve_output(&config, &args.export, from_file)?,
        dry_run: args.dry_run,
    };
    let names = run.input.names()?;

    if !run.dry_run && !args.yes {
        let count = names.iter().filter(|n| !n.trim().is_empty()).count();
        println!(
            "\n{} Matching records will be removed from Active Directory, Intune and Autopilot",
            "!".yellow().bold()
        );
        if !prompts::confirm(&format!("Delete {} device(s)?", count), false)? {
            println!("{} Cancelled", "✗".red());
            return Ok(());
        }
    }

    execute(&config, &run, &names).await
}

/// Run a lookup or deletion batch against a fresh session
async fn execute(config: &ConfigManager, run: &RunConfig, names: &[String]) -> Result<()> {
    if names.is_empty() {
        prompts::warning("Input contains no device names");
        return Ok(());
    }

    let session = Session::open(config).await?;
    println!("→ Tenant: {}", session.tenant().name.cyan().bold());
    println!("→ Directory: {}", session.directory_host().cyan());

    if run.dry_run {
        println!("\n{}", "DRY RUN - No changes will be made".yellow().bold());
    }

    let bar = progress::create_progress_bar(names.len() as u64, "Processing");
    let report = BatchDriver::new(session.backends(), run.batch_mode())
        .run_batch(names, &bar)
        .await;
    bar.finish_and_clear();

    if let Err(e) = session.close().await {
        tracing::debug!(error = %e, "LDAP unbind failed");
    }

    report::print_batch_report(run.title(), &report);

    if let Some(dir) = &run.output {
        let path = export::export_csv(
            dir,
            run.batch_mode().report_prefix(),
            REPORT_HEADERS,
            report.rows(),
        )?;
        prompts::success(&format!("Report saved to {}", path.display()));
    }

    Ok(())
}

async fn graph_client(config: &ConfigManager) -> Result<GraphClient> {
    let tenant = config.get_active_tenant()?.ok_or_else(|| {
        Dx365Error::ConfigError("No active tenant. Run 'dx365 tenant switch <name>' first.".into())
    })?;
    println!("→ Tenant: {}", tenant.name.cyan().bold());
    GraphClient::from_config(config, &tenant.name).await
}

fn export_rows<T: serde::Serialize>(
    output: Option<&Path>,
    prefix: &str,
    headers: &[&str],
    rows: &[T],
) -> Result<()> {
    if let Some(dir) = output {
        let path = export::export_csv(dir, prefix, headers, rows)?;
        prompts::success(&format!("Exported to {}", path.display()));
    }
    Ok(())
}

fn show_devices(
    title: &str,
    devices: &[ManagedDevice],
    output: Option<&Path>,
    prefix: &str,
) -> Result<()> {
    let rows: Vec<DeviceRow> = devices.iter().map(DeviceRow::from).collect();
    report::print_devices(title, &rows);
    export_rows(output, prefix, DEVICE_HEADERS, &rows)
}

pub async fn user(args: UserArgs) -> Result<()> {
    let config = ConfigManager::load()?;
    let output = resolve_output(&config, &args.export, false)?;
    let client = graph_client(&config).await?;

    let spinner = progress::create_spinner(&format!("Fetching devices for {}...", args.upn));
    let devices = intune::list_devices_for_user(&client, &args.upn).await;
    progress::finish_spinner(&spinner, &devices);
    let devices = devices?;

    show_devices(
        &format!("Devices for {}", args.upn),
        &devices,
        output.as_deref(),
        "UserDevices",
    )
}

pub async fn noncompliant(args: NoncompliantArgs) -> Result<()> {
    let config = ConfigManager::load()?;
    let output = resolve_output(&config, &args.export, false)?;
    let client = graph_client(&config).await?;

    let spinner = progress::create_spinner("Fetching noncompliant devices...");
    let devices = intune::list_noncompliant_devices(&client).await;
    progress::finish_spinner(&spinner, &devices);
    let devices = devices?;

    show_devices(
        "Noncompliant Devices",
        &devices,
        output.as_deref(),
        "Noncompliant",
    )
}

pub async fn stale(args: StaleArgs) -> Result<()> {
    let config = ConfigManager::load()?;
    let output = resolve_output(&config, &args.export, false)?;
    let client = graph_client(&config).await?;

    let spinner = progress::create_spinner("Fetching managed devices...");
    let devices = intune::list_managed_devices(&client).await;
    progress::finish_spinner(&spinner, &devices);

    let stale = intune::stale_devices(devices?, args.days, chrono::Utc::now());
    show_devices(
        &format!("Devices not synced in {} days", args.days),
        &stale,
        output.as_deref(),
        "StaleDevices",
    )
}

pub async fn apps(args: AppsArgs) -> Result<()> {
    let config = ConfigManager::load()?;
    let output = resolve_output(&config, &args.export, false)?;
    let client = graph_client(&config).await?;

    let device = match Lookup::from(intune::find_devices_by_name(&client, &args.name).await?) {
        Lookup::One(device) => device,
        Lookup::None => return Err(Dx365Error::DeviceNotFound(args.name)),
        Lookup::Many(devices) => {
            let candidates: Vec<String> = devices
                .iter()
                .map(|d| format!("{} ({})", d.display_name(), d.id))
                .collect();
            return Err(Dx365Error::AmbiguousDevice(args.name, candidates.join(", ")));
        }
    };

    let spinner = progress::create_spinner(&format!("Fetching apps for {}...", args.name));
    let apps = intune::list_detected_apps(&client, &device.id).await;
    progress::finish_spinner(&spinner, &apps);

    let rows: Vec<AppRow> = apps?.iter().map(AppRow::from).collect();
    report::print_apps(device.display_name(), &rows);
    export_rows(output.as_deref(), "Apps", APP_HEADERS, &rows)
}
