use clap::{Parser, Subcommand};
use colored::Colorize;
use dx365::{cmd, error};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "dx365",
    about = "Find and clean up devices across Active Directory, Intune and Autopilot",
    version,
    long_about = "Device inventory CLI for hybrid Microsoft 365 estates\n\n\
                  Correlates a device name across on-premises Active Directory, Intune\n\
                  and Windows Autopilot, and removes stale records from all three."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authenticate to Microsoft Graph API
    Login(cmd::login::LoginArgs),

    /// Logout and clear cached credentials
    Logout(cmd::login::LogoutArgs),

    /// Manage tenant configurations
    #[command(subcommand)]
    Tenant(TenantCommands),

    /// Configure the on-premises directory connection
    #[command(subcommand)]
    Directory(DirectoryCommands),

    /// Look up, delete and list devices
    #[command(subcommand)]
    Device(DeviceCommands),
}

#[derive(Subcommand, Debug)]
enum TenantCommands {
    /// Add a new tenant configuration
    Add(cmd::tenant::TenantAddArgs),

    /// List all configured tenants
    List(cmd::tenant::TenantListArgs),

    /// Switch the active tenant
    Switch(cmd::tenant::TenantSwitchArgs),

    /// Remove a tenant configuration
    Remove(cmd::tenant::TenantRemoveArgs),
}

#[derive(Subcommand, Debug)]
enum DirectoryCommands {
    /// Store LDAP connection settings
    Set(cmd::directory::DirectorySetArgs),

    /// Show the stored LDAP connection settings
    Show,

    /// Bind with the stored settings
    Test(cmd::directory::DirectoryTestArgs),
}

#[derive(Subcommand, Debug)]
enum DeviceCommands {
    /// Look up devices in Active Directory, Intune and Autopilot
    Lookup(cmd::device::LookupArgs),

    /// Delete devices from Active Directory, Intune and Autopilot
    Delete(cmd::device::DeleteArgs),

    /// List Intune devices whose primary user is the given UPN
    User(cmd::device::UserArgs),

    /// List noncompliant Intune devices
    Noncompliant(cmd::device::NoncompliantArgs),

    /// List Intune devices that have not synced recently
    Stale(cmd::device::StaleArgs),

    /// List applications detected on a device
    Apps(cmd::device::AppsArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> error::Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("dx365=debug")
            .init();
    } else if let Ok(filter) = EnvFilter::try_from_default_env() {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    match cli.command {
        Commands::Login(args) => cmd::login::login(args).await?,
        Commands::Logout(args) => cmd::login::logout(args).await?,
        Commands::Tenant(tenant_cmd) => match tenant_cmd {
            TenantCommands::Add(args) => cmd::tenant::add(args).await?,
            TenantCommands::List(args) => cmd::tenant::list(args).await?,
            TenantCommands::Switch(args) => cmd::tenant::switch(args).await?,
            TenantCommands::Remove(args) => cmd::tenant::remove(args).await?,
        },
        Commands::Directory(directory_cmd) => match directory_cmd {
            DirectoryCommands::Set(args) => cmd::directory::set(args).await?,
            DirectoryCommands::Show => cmd::directory::show().await?,
            DirectoryCommands::Test(args) => cmd::directory::test(args).await?,
        },
        Commands::Device(device_cmd) => match device_cmd {
            DeviceCommands::Lookup(args) => cmd::device::lookup(args).await?,
            DeviceCommands::Delete(args) => cmd::device::delete(args).await?,
            DeviceCommands::User(args) => cmd::device::user(args).await?,
            DeviceCommands::Noncompliant(args) => cmd::device::noncompliant(args).await?,
            DeviceCommands::Stale(args) => cmd::device::stale(args).await?,
            DeviceCommands::Apps(args) => cmd::device::apps(args).await?,
        },
    }

    Ok(())
}
