use crate::config::{AuthType, ConfigManager, TenantConfig};
use crate::error::{Dx365Error, Result};
use crate::graph::auth::{GraphAuth, REQUIRED_SCOPES};
use clap::Args;
use colored::Colorize;

/// First `n` characters, safe on non-ASCII input
fn preview(s: &str, n: usize) -> String {
    s.chars().take(n).collect()
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Tenant name; checked in tenants.toml, then tenants.env, then {name}.env
    #[arg(index = 1)]
    name: Option<String>,

    /// Tenant name (alias for the positional argument)
    #[arg(short, long)]
    tenant: Option<String>,

    /// Directory (tenant) ID of the Entra ID tenant
    #[arg(long)]
    tenant_id: Option<String>,

    /// Application (client) ID of the app registration
    #[arg(long)]
    client_id: Option<String>,

    /// Client secret (for unattended runs)
    #[arg(long)]
    client_secret: Option<String>,

    /// Use the client credentials flow instead of device code
    #[arg(long)]
    client_credentials: bool,

    /// Tenant description
    #[arg(long)]
    description: Option<String>,
}

#[derive(Args, Debug)]
pub struct LogoutArgs {
    /// Tenant name
    #[arg(short, long)]
    tenant: Option<String>,

    /// Log out of every configured tenant
    #[arg(long)]
    all: bool,
}

fn quick_setup_tenant(args: &LoginArgs, tenant_id: &str, client_id: &str) -> TenantConfig {
    let name = args.name.clone().or_else(|| args.tenant.clone()).unwrap_or_else(|| {
        let generated = tenant_id.split('-').next().unwrap_or("tenant").to_string();
        println!("{} Tenant saved as: {}", "→".cyan(), generated.bold());
        generated
    });

    let auth_type = if args.client_credentials || args.client_secret.is_some() {
        AuthType::ClientCredentials
    } else {
        AuthType::DeviceCode
    };

    TenantConfig {
        name,
        tenant_id: tenant_id.to_string(),
        client_id: client_id.to_string(),
        client_secret: args.client_secret.clone(),
        auth_type,
        description: args.description.clone(),
    }
}

pub async fn login(args: LoginArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let auth = GraphAuth::new(config_manager.clone());

    let tenant_config = if let (Some(tenant_id), Some(client_id)) =
        (&args.tenant_id, &args.client_id)
    {
        let tenant = quick_setup_tenant(&args, tenant_id, client_id);
        config_manager.add_tenant(tenant.clone())?;
        println!("{} Tenant '{}' saved", "✓".green(), tenant.name);
        tenant
    } else if let Some(name) = args.name.as_ref().or(args.tenant.as_ref()) {
        let tenant = config_manager.get_tenant_or_env(name).map_err(|_| {
            Dx365Error::ConfigError(format!(
                "Tenant '{}' not found. Add it with 'dx365 tenant add' or create {}.env in {}",
                name,
                name.to_lowercase(),
                config_manager.config_dir().display()
            ))
        })?;
        println!("{} Tenant: {}", "✓".green(), tenant.name.bold());
        println!("  Tenant ID: {}...", preview(&tenant.tenant_id, 8));
        println!("  Client ID: {}...", preview(&tenant.client_id, 8));
        tenant
    } else {
        return Err(Dx365Error::InvalidConfig(
            "Usage:\n  \
            dx365 login NAME                                  # Use a configured tenant\n  \
            dx365 login [NAME] --tenant-id ID --client-id ID  # Quick setup"
                .into(),
        ));
    };

    match tenant_config.auth_type {
        AuthType::DeviceCode => auth.login_device_code(&tenant_config).await?,
        AuthType::ClientCredentials => auth.login_client_credentials(&tenant_config).await?,
    };

    config_manager.set_active_tenant(&tenant_config.name)?;
    tracing::info!(tenant = %tenant_config.name, "Logged in");

    if tenant_config.auth_type == AuthType::ClientCredentials {
        println!(
            "  {} {}",
            "Application permissions needed:".dimmed(),
            REQUIRED_SCOPES.join(", ")
        );
    }

    println!(
        "\n{} Active tenant: {}",
        "→".cyan(),
        tenant_config.name.bold()
    );
    Ok(())
}

pub async fn logout(args: LogoutArgs) -> Result<()> {
    let config_manager = ConfigManager::new()?;
    let auth = GraphAuth::new(config_manager.clone());

    if args.all {
        for tenant in config_manager.load_tenants()? {
            auth.logout(&tenant.name)?;
        }
        println!("{} Logged out of all tenants", "✓".green());
        return Ok(());
    }

    let tenant_name = match args.tenant {
        Some(name) => Some(name),
        None => config_manager.load_config()?.current_tenant,
    };

    match tenant_name {
        Some(name) => auth.logout(&name),
        None => {
            println!("{} No active tenant", "!".yellow());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(tenant: Option<&str>, secret: Option<&str>, client_credentials: bool) -> LoginArgs {
        LoginArgs {
            name: None,
            tenant: tenant.map(str::to_string),
            tenant_id: Some("8a1f0c2e-1111-2222-3333-444455556666".into()),
            client_id: Some("c1d2".into()),
            client_secret: secret.map(str::to_string),
            client_credentials,
            description: None,
        }
    }

    #[test]
    fn test_quick_setup_generates_name_from_tenant_id() {
        let a = args(None, None, false);
        let tenant = quick_setup_tenant(&a, "8a1f0c2e-1111-2222-3333-444455556666", "c1d2");
        assert_eq!(tenant.name, "8a1f0c2e");
        assert_eq!(tenant.auth_type, AuthType::DeviceCode);
    }

    #[test]
    fn test_quick_setup_secret_implies_client_credentials() {
        let a = args(Some("contoso"), Some("s3cret"), false);
        let tenant = quick_setup_tenant(&a, "8a1f0c2e", "c1d2");
        assert_eq!(tenant.name, "contoso");
        assert_eq!(tenant.auth_type, AuthType::ClientCredentials);
        assert_eq!(tenant.client_secret.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_preview_is_char_safe() {
        assert_eq!(preview("ééééééééé", 3), "ééé");
        assert_eq!(preview("ab", 8), "ab");
    }
}
