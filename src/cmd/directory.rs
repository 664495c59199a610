use crate::cmd::progress;
use crate::cmd::prompts;
use crate::config::{ConfigManager, DirectoryConfig, LDAP_PASSWORD_ENV};
use crate::directory::LdapDirectory;
use crate::error::Result;
use clap::Args;
use colored::Colorize;

const LDAP_PORT: u16 = 389;
const LDAPS_PORT: u16 = 636;

#[derive(Args, Debug)]
pub struct DirectorySetArgs {
    /// Domain controller host name
    #[arg(long)]
    host: String,

    /// Search base (e.g., DC=corp,DC=example,DC=com)
    #[arg(long)]
    base_dn: String,

    /// Account used to bind (DN or user@domain)
    #[arg(long)]
    bind_dn: String,

    /// Port (defaults to 389, or 636 with --ssl)
    #[arg(long)]
    port: Option<u16>,

    /// Connect over LDAPS
    #[arg(long, conflicts_with = "starttls")]
    ssl: bool,

    /// Upgrade the connection with StartTLS
    #[arg(long)]
    starttls: bool,

    /// Connection timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Prompt for the bind password and store it in config.toml
    #[arg(long)]
    store_password: bool,
}

#[derive(Args, Debug)]
pub struct DirectoryTestArgs {
    /// Also search for this computer name
    #[arg(long)]
    name: Option<String>,
}

fn directory_from_args(args: &DirectorySetArgs, password: Option<String>) -> DirectoryConfig {
    let default_port = if args.ssl { LDAPS_PORT } else { LDAP_PORT };

    DirectoryConfig {
        host: args.host.trim().to_string(),
        port: args.port.unwrap_or(default_port),
        base_dn: args.base_dn.trim().to_string(),
        bind_dn: args.bind_dn.trim().to_string(),
        bind_password: password,
        use_ssl: args.ssl,
        use_starttls: args.starttls,
        connection_timeout_secs: args.timeout,
    }
}

pub async fn set(args: DirectorySetArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;

    let password = if args.store_password {
        Some(prompts::password("Bind password")?)
    } else {
        None
    };

    let directory = directory_from_args(&args, password);
    config_manager.set_directory_config(directory.clone())?;

    prompts::success(&format!("Directory settings saved for {}", directory.url()));
    if directory.bind_password.is_none() {
        prompts::info(&format!(
            "Set {} before running lookups, or re-run with --store-password",
            LDAP_PASSWORD_ENV
        ));
    }

    Ok(())
}

pub async fn show() -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let directory = config_manager.directory_config()?;

    prompts::section_header("On-premises directory");
    prompts::show_value("URL", Some(&directory.url()));
    prompts::show_value("Base DN", Some(&directory.base_dn));
    prompts::show_value("Bind DN", Some(&directory.bind_dn));
    prompts::show_value("StartTLS", Some(if directory.use_starttls { "yes" } else { "no" }));
    prompts::show_value(
        "Timeout",
        Some(&format!("{}s", directory.connection_timeout_secs)),
    );

    let password_source = if std::env::var(LDAP_PASSWORD_ENV).is_ok_and(|p| !p.is_empty()) {
        Some(LDAP_PASSWORD_ENV)
    } else if directory.bind_password.is_some() {
        Some("config.toml")
    } else {
        None
    };
    prompts::show_value("Password from", password_source);

    Ok(())
}

/// Bind with the stored settings, optionally running one search
pub async fn test(args: DirectoryTestArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let directory_config = config_manager.directory_config()?;

    let spinner = progress::create_spinner(&format!("Binding to {}...", directory_config.url()));
    let directory = match LdapDirectory::connect(&directory_config).await {
        Ok(directory) => {
            progress::finish_spinner_success(&spinner, "Bind succeeded");
            directory
        }
        Err(e) => {
            progress::finish_spinner_error(&spinner, "Bind failed");
            return Err(e);
        }
    };

    if let Some(name) = args.name {
        let computers = directory.find_computers(&name).await?;
        if computers.is_empty() {
            prompts::warning(&format!("No computer matching '{}'", name));
        }
        for computer in &computers {
            println!(
                "  {} {}",
                computer.name.bold(),
                computer.distinguished_name.dimmed()
            );
        }
    }

    directory.unbind().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(ssl: bool, port: Option<u16>) -> DirectorySetArgs {
        DirectorySetArgs {
            host: " dc01.corp.example.com ".into(),
            base_dn: "DC=corp,DC=example,DC=com".into(),
            bind_dn: "svc-dx365@corp.example.com".into(),
            port,
            ssl,
            starttls: false,
            timeout: 30,
            store_password: false,
        }
    }

    #[test]
    fn test_default_ports() {
        assert_eq!(directory_from_args(&args(false, None), None).port, 389);
        assert_eq!(directory_from_args(&args(true, None), None).port, 636);
        assert_eq!(directory_from_args(&args(true, Some(3269)), None).port, 3269);
    }

    #[test]
    fn test_host_is_trimmed() {
        let directory = directory_from_args(&args(true, None), Some("pw".into()));
        assert_eq!(directory.url(), "ldaps://dc01.corp.example.com:636");
        assert_eq!(directory.bind_password.as_deref(), Some("pw"));
        assert!(directory.validate().is_ok());
    }
}
