use crate::error::{Dx365Error, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable that overrides the stored LDAP bind password
pub const LDAP_PASSWORD_ENV: &str = "DX365_LDAP_PASSWORD";

/// Main configuration structure
#[derive(Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub default_tenant: Option<String>,

    #[serde(default)]
    pub log_level: String,

    #[serde(default)]
    pub current_tenant: Option<String>,

    /// Where CSV reports are written; defaults to `<Documents>/dx365`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,

    /// On-premises Active Directory connection
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<DirectoryConfig>,
}

/// LDAP connection settings for the on-premises directory
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DirectoryConfig {
    pub host: String,

    #[serde(default = "default_ldap_port")]
    pub port: u16,

    /// Search base, e.g. `DC=corp,DC=example,DC=com`
    pub base_dn: String,

    pub bind_dn: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_password: Option<String>,

    #[serde(default)]
    pub use_ssl: bool,

    #[serde(default)]
    pub use_starttls: bool,

    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,
}

fn pick_password(from_env: Option<String>, stored: Option<&str>) -> Option<String> {
    from_env
        .filter(|p| !p.is_empty())
        .or_else(|| stored.filter(|p| !p.is_empty()).map(String::from))
}

fn default_ldap_port() -> u16 {
    389
}

fn default_connection_timeout() -> u64 {
    30
}

impl DirectoryConfig {
    pub fn url(&self) -> String {
        if self.use_ssl {
            format!("ldaps://{}:{}", self.host, self.port)
        } else {
            format!("ldap://{}:{}", self.host, self.port)
        }
    }

    /// Bind password, preferring the environment over the config file
    pub fn resolve_password(&self) -> Option<String> {
        pick_password(std::env::var(LDAP_PASSWORD_ENV).ok(), self.bind_password.as_deref())
    }

    /// Bind password for `connect`. An empty simple bind is an anonymous
    /// bind on most servers, so a missing password is a config error.
    pub fn require_password(&self) -> Result<String> {
        self.resolve_password().ok_or_else(|| {
            Dx365Error::InvalidConfig(format!(
                "no LDAP bind password; set {} or use --store-password",
                LDAP_PASSWORD_ENV
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.host.trim().is_empty() {
            return Err(Dx365Error::InvalidConfig("directory host is empty".into()));
        }
        if self.base_dn.trim().is_empty() {
            return Err(Dx365Error::InvalidConfig(
                "directory base_dn is empty".into(),
            ));
        }
        if self.use_ssl && self.use_starttls {
            return Err(Dx365Error::InvalidConfig(
                "use_ssl and use_starttls are mutually exclusive".into(),
            ));
        }
        Ok(())
    }
}

/// Tenant-specific configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TenantConfig {
    pub name: String,
    pub tenant_id: String,
    pub client_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    #[serde(default)]
    pub auth_type: AuthType,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    #[default]
    DeviceCode,
    ClientCredentials,
}

/// Token cache structure
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenCache {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub tenant_id: String,
}

/// Configuration manager
#[derive(Clone)]
pub struct ConfigManager {
    config_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self> {
        let project_dirs = ProjectDirs::from("com", "dx365", "dx365").ok_or_else(|| {
            Dx365Error::ConfigError("Failed to determine config directory".into())
        })?;

        Self::with_dir(project_dirs.config_dir())
    }

    /// Use an explicit configuration directory
    pub fn with_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let config_dir = dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        Ok(Self { config_dir })
    }

    pub fn load() -> Result<Self> {
        Self::new()
    }

    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    pub fn tenants_file(&self) -> PathBuf {
        self.config_dir.join("tenants.toml")
    }

    pub fn token_cache_file(&self, tenant_name: &str) -> PathBuf {
        self.config_dir
            .join("cache")
            .join(format!("{}.token", tenant_name))
    }

    /// Load main config
    pub fn load_config(&self) -> Result<Config> {
        let config_path = self.config_file();

        if !config_path.exists() {
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save main config
    pub fn save_config(&self, config: &Config) -> Result<()> {
        let config_path = self.config_file();
        let contents = toml::to_string_pretty(config)
            .map_err(|e| Dx365Error::ConfigError(format!("Failed to serialize config: {}", e)))?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Directory settings, required by lookup and delete
    pub fn directory_config(&self) -> Result<DirectoryConfig> {
        let directory = self.load_config()?.directory.ok_or_else(|| {
            Dx365Error::ConfigError(
                "No on-premises directory configured. Run 'dx365 directory set' first".into(),
            )
        })?;
        directory.validate()?;
        Ok(directory)
    }

    pub fn set_directory_config(&self, directory: DirectoryConfig) -> Result<()> {
        directory.validate()?;
        let mut config = self.load_config()?;
        config.directory = Some(directory);
        self.save_config(&config)
    }

    /// Report output directory: explicit override, then config, then `<Documents>/dx365`
    pub fn export_dir(&self, override_dir: Option<&Path>) -> Result<PathBuf> {
        if let Some(dir) = override_dir {
            return Ok(dir.to_path_buf());
        }

        if let Some(dir) = self.load_config()?.export_dir {
            return Ok(dir);
        }

        let user_dirs = UserDirs::new().ok_or_else(|| {
            Dx365Error::ConfigError("Failed to determine user profile directory".into())
        })?;
        let base = user_dirs
            .document_dir()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| user_dirs.home_dir().to_path_buf());

        Ok(base.join("dx365"))
    }

    /// Load all tenants
    pub fn load_tenants(&self) -> Result<Vec<TenantConfig>> {
        let tenants_path = self.tenants_file();

        if !tenants_path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(tenants_path)?;

        #[derive(Deserialize)]
        struct TenantsFile {
            tenants: Vec<TenantConfig>,
        }

        let file: TenantsFile = toml::from_str(&contents)?;
        Ok(file.tenants)
    }

    /// Save all tenants
    pub fn save_tenants(&self, tenants: &[TenantConfig]) -> Result<()> {
        let tenants_path = self.tenants_file();

        #[derive(Serialize)]
        struct TenantsFile<'a> {
            tenants: &'a [TenantConfig],
        }

        let file = TenantsFile { tenants };
        let contents = toml::to_string_pretty(&file)
            .map_err(|e| Dx365Error::ConfigError(format!("Failed to serialize tenants: {}", e)))?;
        fs::write(tenants_path, contents)?;
        Ok(())
    }

    /// Add or update tenant
    pub fn add_tenant(&self, tenant: TenantConfig) -> Result<()> {
        let mut tenants = self.load_tenants()?;
        tenants.retain(|t| t.name != tenant.name);
        tenants.push(tenant);
        self.save_tenants(&tenants)?;
        Ok(())
    }

    /// Get tenant by name
    pub fn get_tenant(&self, name: &str) -> Result<TenantConfig> {
        let tenants = self.load_tenants()?;
        tenants
            .into_iter()
            .find(|t| t.name == name)
            .ok_or_else(|| Dx365Error::TenantNotFound(name.to_string()))
    }

    /// Get active tenant
    pub fn get_active_tenant(&self) -> Result<Option<TenantConfig>> {
        let config = self.load_config()?;

        match config.current_tenant.or(config.default_tenant) {
            Some(tenant_name) => Ok(Some(self.get_tenant(&tenant_name)?)),
            None => Ok(None),
        }
    }

    /// Save token cache
    pub fn save_token(&self, tenant_name: &str, token: &TokenCache) -> Result<()> {
        let cache_dir = self.config_dir.join("cache");
        if !cache_dir.exists() {
            fs::create_dir_all(&cache_dir)?;
        }

        let token_path = self.token_cache_file(tenant_name);
        let contents = serde_json::to_string_pretty(token)?;
        fs::write(token_path, contents)?;
        Ok(())
    }

    /// Load token cache
    pub fn load_token(&self, tenant_name: &str) -> Result<TokenCache> {
        let token_path = self.token_cache_file(tenant_name);

        if !token_path.exists() {
            return Err(Dx365Error::TokenNotFound);
        }

        let contents = fs::read_to_string(token_path)?;
        let token: TokenCache = serde_json::from_str(&contents)?;

        if token.expires_at < chrono::Utc::now() {
            return Err(Dx365Error::AuthError("Token expired".into()));
        }

        Ok(token)
    }

    /// Delete token cache
    pub fn delete_token(&self, tenant_name: &str) -> Result<()> {
        let token_path = self.token_cache_file(tenant_name);

        if token_path.exists() {
            fs::remove_file(token_path)?;
        }

        Ok(())
    }

    /// Set the active tenant
    pub fn set_active_tenant(&self, tenant_name: &str) -> Result<()> {
        let _tenant = self.get_tenant(tenant_name)?;

        let mut config = self.load_config()?;
        config.current_tenant = Some(tenant_name.to_string());
        self.save_config(&config)?;

        Ok(())
    }

    /// Remove a tenant by name
    pub fn remove_tenant(&self, tenant_name: &str) -> Result<()> {
        let (removed, tenants): (Vec<TenantConfig>, Vec<TenantConfig>) = self
            .load_tenants()?
            .into_iter()
            .partition(|t| t.name.eq_ignore_ascii_case(tenant_name));
        let removed: Vec<String> = removed.into_iter().map(|t| t.name).collect();

        if removed.is_empty() {
            return Err(Dx365Error::TenantNotFound(tenant_name.to_string()));
        }

        self.save_tenants(&tenants)?;

        for name in &removed {
            let _ = self.delete_token(name);
        }

        let mut config = self.load_config()?;
        if config
            .current_tenant
            .as_deref()
            .is_some_and(|current| current.eq_ignore_ascii_case(tenant_name))
        {
            config.current_tenant = None;
            self.save_config(&config)?;
        }

        Ok(())
    }

    /// Load tenant from .env file in config directory
    ///
    /// Supports format:
    /// ```text
    /// # Client: CONTOSO
    /// TENANT_ID=xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx
    /// CLIENT_ID=xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx
    /// CLIENT_SECRET=your-secret-here
    /// ```
    pub fn load_env_file(&self, name: &str) -> Result<Option<TenantConfig>> {
        let env_path = self.config_dir.join(format!("{}.env", name.to_lowercase()));
        let fallback_path = self.config_dir.join(".env");

        let path = if env_path.exists() {
            env_path
        } else if fallback_path.exists() {
            fallback_path
        } else {
            return Ok(None);
        };

        let contents = fs::read_to_string(&path)?;
        let env_vars = parse_env_lines(&contents);

        Ok(vars_to_tenant(name, &env_vars).map(|mut tenant| {
            tenant.name = name.to_string();
            tenant
        }))
    }

    /// Load all tenants from a multi-tenant `tenants.env` file
    ///
    /// Format:
    /// ```text
    /// [CONTOSO]
    /// NAME=Contoso Ltd
    /// TENANT_ID=xxx
    /// CLIENT_ID=xxx
    /// CLIENT_SECRET=xxx
    /// ```
    pub fn load_tenants_env(&self) -> Result<Vec<TenantConfig>> {
        let env_path = self.config_dir.join("tenants.env");

        if !env_path.exists() {
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&env_path)?;
        Ok(parse_tenants_env(&contents))
    }

    /// Get tenant by name, checking env files after tenants.toml
    pub fn get_tenant_or_env(&self, name: &str) -> Result<TenantConfig> {
        if let Ok(tenant) = self.get_tenant(name) {
            return Ok(tenant);
        }

        let env_tenants = self.load_tenants_env()?;
        if let Some(tenant) = env_tenants
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
        {
            self.add_tenant(tenant.clone())?;
            return Ok(tenant);
        }

        if let Some(tenant) = self.load_env_file(name)? {
            self.add_tenant(tenant.clone())?;
            return Ok(tenant);
        }

        Err(Dx365Error::TenantNotFound(name.to_string()))
    }
}

fn strip_quotes(value: &str) -> String {
    if value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
    {
        value[1..value.len() - 1].to_string()
    } else {
        value.to_string()
    }
}

/// Parse KEY=VALUE lines, skipping comments and blanks. Keys are upper-cased.
fn parse_env_lines(contents: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(pos) = line.find('=') {
            let key = line[..pos].trim().to_uppercase();
            vars.insert(key, strip_quotes(line[pos + 1..].trim()));
        }
    }

    vars
}

fn parse_tenants_env(contents: &str) -> Vec<TenantConfig> {
    let mut tenants = Vec::new();
    let mut current_section: Option<String> = None;
    let mut section_body = String::new();

    for line in contents.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') && trimmed.len() > 2 {
            if let Some(abbrev) = current_section.take() {
                tenants.extend(vars_to_tenant(&abbrev, &parse_env_lines(&section_body)));
            }
            current_section = Some(trimmed[1..trimmed.len() - 1].to_string());
            section_body.clear();
            continue;
        }
        section_body.push_str(line);
        section_body.push('\n');
    }

    // Last section has no closing header
    if let Some(abbrev) = current_section {
        tenants.extend(vars_to_tenant(&abbrev, &parse_env_lines(&section_body)));
    }

    tenants
}

fn vars_to_tenant(abbrev: &str, vars: &HashMap<String, String>) -> Option<TenantConfig> {
    let tenant_id = vars.get("TENANT_ID")?;
    let client_id = vars.get("CLIENT_ID")?;
    let client_secret = vars.get("CLIENT_SECRET");

    Some(TenantConfig {
        name: abbrev.to_uppercase(),
        tenant_id: tenant_id.clone(),
        client_id: client_id.clone(),
        client_secret: client_secret.cloned(),
        auth_type: if client_secret.is_some() {
            AuthType::ClientCredentials
        } else {
            AuthType::DeviceCode
        },
        description: vars.get("NAME").or_else(|| vars.get("DESCRIPTION")).cloned(),
    })
}
