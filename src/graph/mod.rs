pub mod auth;
pub mod autopilot;
pub mod intune;

use crate::config::ConfigManager;
use crate::error::{Dx365Error, Result};
use reqwest::{Client, Method, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;

pub const GRAPH_API_BASE: &str = "https://graph.microsoft.com/v1.0";
pub const GRAPH_API_BETA: &str = "https://graph.microsoft.com/beta";

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 1000;
const MAX_BACKOFF_MS: u64 = 30000;
const JITTER_FACTOR: f64 = 0.3; // +/- 30% jitter

/// How many times a request is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: INITIAL_BACKOFF_MS,
            max_backoff_ms: MAX_BACKOFF_MS,
        }
    }
}

impl RetryPolicy {
    /// Every request hits the service exactly once
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Exponential backoff with jitter for the given zero-based attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base_backoff = self
            .initial_backoff_ms
            .saturating_mul(2u64.saturating_pow(attempt));
        let capped_backoff = base_backoff.min(self.max_backoff_ms);

        let jitter_range = (capped_backoff as f64 * JITTER_FACTOR) as u64;
        let jitter = if jitter_range > 0 {
            use std::hash::{Hash, Hasher};
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            std::time::SystemTime::now().hash(&mut hasher);
            (hasher.finish() % (jitter_range * 2)) as i64 - jitter_range as i64
        } else {
            0
        };

        let floor = self.initial_backoff_ms.min(100) as i64;
        let final_backoff = (capped_backoff as i64 + jitter).max(floor) as u64;
        Duration::from_millis(final_backoff)
    }
}

/// Graph API client with retry support
#[derive(Clone)]
pub struct GraphClient {
    client: Client,
    access_token: String,
    base_url: String,
    beta_url: String,
    retry: RetryPolicy,
}

impl GraphClient {
    pub fn new(access_token: String) -> Self {
        Self {
            client: Client::new(),
            access_token,
            base_url: GRAPH_API_BASE.to_string(),
            beta_url: GRAPH_API_BETA.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Point the client at another Graph root (national clouds, mock servers)
    pub fn with_root(mut self, root: &str) -> Self {
        let root = root.trim_end_matches('/');
        self.base_url = format!("{}/v1.0", root);
        self.beta_url = format!("{}/beta", root);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Create a GraphClient from ConfigManager and tenant name
    pub async fn from_config(config: &ConfigManager, tenant_name: &str) -> Result<Self> {
        let graph_auth = auth::GraphAuth::new(config.clone());
        let access_token = graph_auth.get_access_token(tenant_name).await?;

        Ok(Self::new(access_token))
    }

    /// Make a GET request to Graph API
    pub async fn get<T: for<'de> Deserialize<'de>>(&self, endpoint: &str) -> Result<T> {
        let url = join_url(&self.base_url, endpoint);
        let resp = self.execute(Method::GET, &url).await?;
        Ok(resp.json::<T>().await?)
    }

    /// Make a DELETE request to Graph API
    pub async fn delete(&self, endpoint: &str) -> Result<()> {
        let url = join_url(&self.base_url, endpoint);
        self.execute(Method::DELETE, &url).await?;
        Ok(())
    }

    /// Send one request under the retry policy.
    ///
    /// 429 honours `Retry-After`; 5xx and connection failures back off
    /// exponentially. Any other non-success status is returned as
    /// `GraphApiError` without retrying.
    async fn execute(&self, method: Method, url: &str) -> Result<Response> {
        let max_attempts = self.retry.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let has_next = attempt + 1 < max_attempts;

            tracing::debug!(%method, url, attempt = attempt + 1, "Graph request");

            let response = self
                .client
                .request(method.clone(), url)
                .bearer_auth(&self.access_token)
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status == StatusCode::TOO_MANY_REQUESTS && has_next {
                        let retry_after = resp
                            .headers()
                            .get("Retry-After")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .map(Duration::from_secs)
                            .unwrap_or_else(|| self.retry.backoff(attempt));

                        tracing::warn!(
                            "Rate limited (429). Retrying in {:?}... (attempt {}/{})",
                            retry_after,
                            attempt + 1,
                            max_attempts
                        );
                        tokio::time::sleep(retry_after).await;
                        continue;
                    }

                    if status.is_server_error() && has_next {
                        let wait_time = self.retry.backoff(attempt);
                        tracing::warn!(
                            "Server error ({}). Retrying in {:?}... (attempt {}/{})",
                            status,
                            wait_time,
                            attempt + 1,
                            max_attempts
                        );
                        tokio::time::sleep(wait_time).await;
                        continue;
                    }

                    if !status.is_success() {
                        let error_text = resp.text().await.unwrap_or_default();
                        let enhanced_error = crate::error::enhance_graph_error(&error_text);
                        return Err(Dx365Error::GraphApiError(format!(
                            "HTTP {}: {}",
                            status, enhanced_error
                        )));
                    }

                    return Ok(resp);
                }
                Err(e) => {
                    if has_next {
                        let wait_time = self.retry.backoff(attempt);
                        tracing::warn!(
                            "Connection error: {}. Retrying in {:?}... (attempt {}/{})",
                            e,
                            wait_time,
                            attempt + 1,
                            max_attempts
                        );
                        tokio::time::sleep(wait_time).await;
                        continue;
                    }
                    return Err(e.into());
                }
            }
        }

        Err(Dx365Error::GraphApiError(format!(
            "{} {} failed after {} attempts",
            method, url, max_attempts
        )))
    }
}

fn join_url(base_url: &str, endpoint: &str) -> String {
    format!("{}/{}", base_url, endpoint.trim_start_matches('/'))
}

// ============================================================================
// OData helpers
// ============================================================================

/// Quote a string literal for an OData `$filter` expression
pub fn odata_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Build `<collection>?$filter=<expr>` with the expression percent-encoded
pub fn filter_endpoint(collection: &str, filter: &str) -> String {
    format!("{}?$filter={}", collection, urlencoding::encode(filter))
}

// ============================================================================
// Pagination Helpers
// ============================================================================

/// Generic paginated response from Graph API
///
/// Use this for standard OData paginated responses with `value` array and `@odata.nextLink`
#[derive(Debug, Deserialize)]
pub struct PaginatedResponse<T> {
    pub value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    pub next_link: Option<String>,
    #[serde(rename = "@odata.count")]
    pub count: Option<i64>,
}

impl GraphClient {
    /// Fetch all pages of a paginated Graph API endpoint
    ///
    /// Automatically follows `@odata.nextLink` until all pages are retrieved.
    ///
    /// # Example
    /// ```ignore
    /// let devices: Vec<ManagedDevice> = client.get_all_pages("deviceManagement/managedDevices").await?;
    /// ```
    pub async fn get_all_pages<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
    ) -> Result<Vec<T>> {
        let url = join_url(&self.base_url, endpoint);
        self.follow_pages(url).await
    }

    /// Fetch all pages from a beta endpoint
    pub async fn get_all_pages_beta<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
    ) -> Result<Vec<T>> {
        let url = join_url(&self.beta_url, endpoint);
        self.follow_pages(url).await
    }

    async fn follow_pages<T: for<'de> Deserialize<'de>>(&self, first_url: String) -> Result<Vec<T>> {
        let mut all_items: Vec<T> = Vec::new();
        let mut current_url = first_url;

        loop {
            let response: PaginatedResponse<T> =
                self.execute(Method::GET, &current_url).await?.json().await?;
            all_items.extend(response.value);

            match response.next_link {
                Some(next) => current_url = next,
                None => break,
            }
        }

        Ok(all_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_odata_string_escapes_quotes() {
        assert_eq!(odata_string("P12345"), "'P12345'");
        assert_eq!(odata_string("O'Brien-PC"), "'O''Brien-PC'");
    }

    #[test]
    fn test_filter_endpoint_encodes_expression() {
        let endpoint = filter_endpoint(
            "deviceManagement/managedDevices",
            &format!("deviceName eq {}", odata_string("LAB #1")),
        );
        assert_eq!(
            endpoint,
            "deviceManagement/managedDevices?$filter=deviceName%20eq%20%27LAB%20%231%27"
        );
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = RetryPolicy::default();
        let wait = policy.backoff(10);
        let max_with_jitter = (MAX_BACKOFF_MS as f64 * (1.0 + JITTER_FACTOR)) as u128;
        assert!(wait.as_millis() <= max_with_jitter);
        assert!(wait.as_millis() >= 100);
    }

    #[test]
    fn test_with_root_rewrites_bases() {
        let client = GraphClient::new("token".into()).with_root("http://127.0.0.1:9000/");
        assert_eq!(client.base_url, "http://127.0.0.1:9000/v1.0");
        assert_eq!(client.beta_url, "http://127.0.0.1:9000/beta");
        assert_eq!(
            join_url(&client.base_url, "/deviceManagement/managedDevices"),
            "http://127.0.0.1:9000/v1.0/deviceManagement/managedDevices"
        );
    }

    #[test]
    fn test_single_attempt_policy() {
        assert_eq!(RetryPolicy::single_attempt().max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, DEFAULT_MAX_ATTEMPTS);
    }
}
