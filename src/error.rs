use thiserror::Error;

#[derive(Error, Debug)]
pub enum Dx365Error {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Graph API error: {0}")]
    GraphApiError(String),

    #[error("Directory error: {0}")]
    DirectoryError(String),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("LDAP error: {0}")]
    LdapError(#[from] ldap3::LdapError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Interactive prompt error: {0}")]
    DialoguerError(#[from] dialoguer::Error),

    #[error("Token not found. Please run 'dx365 login' first")]
    TokenNotFound,

    #[error("Tenant '{0}' not found")]
    TenantNotFound(String),

    #[error("Device '{0}' not found")]
    DeviceNotFound(String),

    #[error("Device name '{0}' matches more than one record: {1}")]
    AmbiguousDevice(String, String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Dx365Error>;

/// Parse Graph API error response and provide helpful context
pub fn enhance_graph_error(error_response: &str) -> String {
    if let Ok(error_json) = serde_json::from_str::<serde_json::Value>(error_response) {
        if let Some(error_obj) = error_json.get("error") {
            let code = error_obj
                .get("code")
                .and_then(|c| c.as_str())
                .unwrap_or("Unknown");
            let message = error_obj
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("No message");

            let hint = match code {
                "Unauthorized" | "InvalidAuthenticationToken" => {
                    "\nHint: Your authentication token may have expired. Try running 'dx365 login' again."
                }
                "Forbidden" | "Authorization_RequestDenied" | "InsufficientPrivileges" => {
                    "\nHint: Check that the app registration has DeviceManagementManagedDevices and DeviceManagementServiceConfig permissions with admin consent."
                }
                "BadRequest" => {
                    if message.contains("Invalid filter clause") {
                        "\nHint: The device name or serial number contains characters the filter could not parse."
                    } else {
                        "\nHint: The request format may be incorrect."
                    }
                }
                "NotFound" | "ResourceNotFound" | "Request_ResourceNotFound" => {
                    "\nHint: The device record no longer exists. It may have been removed already."
                }
                "TooManyRequests" => {
                    "\nHint: API rate limit exceeded. Wait a moment and try again."
                }
                _ => "",
            };

            return format!("{}: {}{}", code, message, hint);
        }
    }

    error_response.to_string()
}
