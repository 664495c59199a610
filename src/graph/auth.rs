use crate::config::{ConfigManager, TenantConfig, TokenCache};
use crate::error::{Dx365Error, Result};
use colored::Colorize;
use oauth2::{
    AuthUrl, ClientId, ClientSecret, DeviceAuthorizationUrl, EmptyExtraDeviceAuthorizationFields,
    Scope, TokenResponse, TokenUrl, basic::BasicClient, reqwest::async_http_client,
};
use std::time::Duration;

const MICROSOFT_AUTHORITY: &str = "https://login.microsoftonline.com";
const GRAPH_SCOPE: &str = "https://graph.microsoft.com/.default";

/// Graph permissions the app registration needs for lookup and cleanup
pub const REQUIRED_SCOPES: &[&str] = &[
    "DeviceManagementManagedDevices.ReadWrite.All",
    "DeviceManagementServiceConfig.ReadWrite.All",
    "DeviceManagementApps.Read.All",
];

pub struct GraphAuth {
    config_manager: ConfigManager,
}

fn endpoint(tenant_id: &str, leaf: &str) -> String {
    format!("{}/{}/oauth2/v2.0/{}", MICROSOFT_AUTHORITY, tenant_id, leaf)
}

fn expiry_from(expires_in: Option<Duration>) -> chrono::DateTime<chrono::Utc> {
    let lifetime = expires_in.unwrap_or(Duration::from_secs(3600));
    chrono::Utc::now()
        + chrono::Duration::from_std(lifetime).unwrap_or_else(|_| chrono::Duration::hours(1))
}

fn oauth_client(tenant_config: &TenantConfig, secret: Option<ClientSecret>) -> Result<BasicClient> {
    let tenant_id = &tenant_config.tenant_id;

    let auth_url = AuthUrl::new(endpoint(tenant_id, "authorize"))
        .map_err(|e| Dx365Error::AuthError(format!("Invalid auth URL: {}", e)))?;
    let token_url = TokenUrl::new(endpoint(tenant_id, "token"))
        .map_err(|e| Dx365Error::AuthError(format!("Invalid token URL: {}", e)))?;

    Ok(BasicClient::new(
        ClientId::new(tenant_config.client_id.clone()),
        secret,
        auth_url,
        Some(token_url),
    ))
}

impl GraphAuth {
    pub fn new(config_manager: ConfigManager) -> Self {
        Self { config_manager }
    }

    /// Authenticate using device code flow (interactive)
    pub async fn login_device_code(&self, tenant_config: &TenantConfig) -> Result<TokenCache> {
        println!(
            "{} Starting device code authentication for tenant '{}'...",
            "→".cyan(),
            tenant_config.name
        );

        let device_auth_url =
            DeviceAuthorizationUrl::new(endpoint(&tenant_config.tenant_id, "devicecode"))
                .map_err(|e| Dx365Error::AuthError(format!("Invalid device auth URL: {}", e)))?;

        let client = oauth_client(tenant_config, None)?.set_device_authorization_url(device_auth_url);

        let details: oauth2::DeviceAuthorizationResponse<EmptyExtraDeviceAuthorizationFields> =
            client
                .exchange_device_code()
                .map_err(|e| Dx365Error::AuthError(format!("Device code exchange failed: {}", e)))?
                .add_scope(Scope::new(GRAPH_SCOPE.to_string()))
                .request_async(async_http_client)
                .await
                .map_err(|e| {
                    Dx365Error::AuthError(format!("Device authorization request failed: {}", e))
                })?;

        println!("\n  Visit: {}", details.verification_uri().as_str().bold());
        println!("  Code:  {}\n", details.user_code().secret().bold());

        let token = client
            .exchange_device_access_token(&details)
            .request_async(async_http_client, tokio::time::sleep, None)
            .await
            .map_err(|e| Dx365Error::AuthError(format!("Token exchange failed: {}", e)))?;

        let token_cache = TokenCache {
            access_token: token.access_token().secret().clone(),
            refresh_token: token.refresh_token().map(|t| t.secret().clone()),
            expires_at: expiry_from(token.expires_in()),
            tenant_id: tenant_config.tenant_id.clone(),
        };

        self.config_manager
            .save_token(&tenant_config.name, &token_cache)?;

        println!("{} Authentication successful", "✓".green());
        tracing::debug!(
            path = ?self.config_manager.token_cache_file(&tenant_config.name),
            "Token cached"
        );

        Ok(token_cache)
    }

    /// Authenticate using client credentials flow (non-interactive)
    pub async fn login_client_credentials(
        &self,
        tenant_config: &TenantConfig,
    ) -> Result<TokenCache> {
        let client_secret = tenant_config.client_secret.as_ref().ok_or_else(|| {
            Dx365Error::AuthError("Client secret required for client credentials flow".into())
        })?;

        println!(
            "{} Authenticating with client credentials for tenant '{}'...",
            "→".cyan(),
            tenant_config.name
        );

        let client = oauth_client(tenant_config, Some(ClientSecret::new(client_secret.clone())))?;

        let token = client
            .exchange_client_credentials()
            .add_scope(Scope::new(GRAPH_SCOPE.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| {
                Dx365Error::AuthError(format!("Client credentials exchange failed: {}", e))
            })?;

        let token_cache = TokenCache {
            access_token: token.access_token().secret().clone(),
            refresh_token: None,
            expires_at: expiry_from(token.expires_in()),
            tenant_id: tenant_config.tenant_id.clone(),
        };

        self.config_manager
            .save_token(&tenant_config.name, &token_cache)?;

        println!("{} Authentication successful", "✓".green());

        Ok(token_cache)
    }

    /// Cached access token for the tenant; expired or missing tokens need a new login
    pub async fn get_access_token(&self, tenant_name: &str) -> Result<String> {
        match self.config_manager.load_token(tenant_name) {
            Ok(token) => Ok(token.access_token),
            Err(Dx365Error::AuthError(_)) => Err(Dx365Error::TokenNotFound),
            Err(e) => Err(e),
        }
    }

    /// Logout (delete token cache)
    pub fn logout(&self, tenant_name: &str) -> Result<()> {
        self.config_manager.delete_token(tenant_name)?;
        println!("{} Logged out from tenant '{}'", "✓".green(), tenant_name);
        Ok(())
    }
}
