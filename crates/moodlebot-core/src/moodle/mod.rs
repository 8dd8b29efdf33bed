//! Authenticated client for the Moodle web-service REST API.
//!
//! Moodle exposes its web services as named functions behind a single
//! `server.php` endpoint: every call is a form-encoded POST carrying a
//! `wstoken`, a `wsfunction` name, and the function's parameters flattened
//! into `group[index][field]` keys. The admin token is obtained once from
//! `login/token.php` and cached for the lifetime of the client; there is no
//! expiry or refresh — a token revoked server-side makes every later call
//! fail until the process restarts.

pub mod error;

pub use error::MoodleError;

use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::config::MoodleConfig;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Client for one Moodle site, holding the cached admin token.
///
/// Cheap to share behind an `Arc`; the token cache is serialized with a
/// mutex so concurrent first calls produce a single credential exchange.
pub struct MoodleClient {
    http: reqwest::Client,
    config: MoodleConfig,
    token: Mutex<Option<String>>,
}

impl MoodleClient {
    pub fn new(config: MoodleConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent("moodlebot/0.1")
            .build()?;

        Ok(Self {
            http,
            config,
            token: Mutex::new(None),
        })
    }

    /// Build one key/value pair in Moodle's flattened array convention,
    /// e.g. `entry("users", 0, "email", "a@b.c")` → `("users[0][email]", "a@b.c")`.
    pub fn entry(
        group: &str,
        index: usize,
        field: &str,
        value: impl ToString,
    ) -> (String, String) {
        (format!("{group}[{index}][{field}]"), value.to_string())
    }

    /// Return the cached admin token, or perform the credential exchange
    /// against `login/token.php` if none is cached yet.
    ///
    /// Failures are never cached: the next call retries the exchange.
    pub async fn admin_token(&self) -> Result<String, MoodleError> {
        let mut cache = self.token.lock().await;
        if let Some(token) = cache.as_deref() {
            return Ok(token.to_string());
        }

        let params = [
            ("username", self.config.admin_username.as_str()),
            ("password", self.config.admin_password.as_str()),
            ("service", self.config.service_shortname.as_str()),
            ("moodlewsrestformat", "json"),
        ];

        let response = self
            .http
            .post(self.config.token_url())
            .form(&params)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| MoodleError::TokenUnavailable(e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| MoodleError::TokenUnavailable(e.to_string()))?;

        match body.get("token").and_then(Value::as_str) {
            Some(token) => {
                info!("Admin token obtained");
                *cache = Some(token.to_string());
                Ok(token.to_string())
            }
            None => {
                // token.php reports bad credentials as {"error": ..., "errorcode": ...}
                let detail = body
                    .get("error")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .unwrap_or_else(|| body.to_string());
                error!(%detail, "Token exchange failed");
                Err(MoodleError::TokenUnavailable(detail))
            }
        }
    }

    /// Invoke a named web-service function with the given parameters and
    /// return the decoded response body.
    ///
    /// If no token can be obtained, the target function is never contacted.
    /// A body carrying Moodle's `exception` payload is converted into
    /// [`MoodleError::Ws`]; everything else is passed through untouched.
    pub async fn call(
        &self,
        wsfunction: &str,
        params: &[(String, String)],
    ) -> Result<Value, MoodleError> {
        let token = self.admin_token().await?;

        let mut payload: Vec<(String, String)> = vec![
            ("wstoken".into(), token),
            ("wsfunction".into(), wsfunction.into()),
            ("moodlewsrestformat".into(), "json".into()),
        ];
        payload.extend_from_slice(params);

        debug!(wsfunction, params = params.len(), "Calling Moodle web service");

        let response = self
            .http
            .post(self.config.rest_url())
            .form(&payload)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                error!(wsfunction, %e, "Web service call failed");
                MoodleError::Transport {
                    function: wsfunction.to_string(),
                    source: e,
                }
            })?;

        let body: Value = response.json().await.map_err(|e| MoodleError::Transport {
            function: wsfunction.to_string(),
            source: e,
        })?;

        if body.get("exception").is_some() {
            let field = |key: &str| {
                body.get(key)
                    .and_then(Value::as_str)
                    .unwrap_or("unknown")
                    .to_string()
            };
            let err = MoodleError::Ws {
                function: wsfunction.to_string(),
                errorcode: field("errorcode"),
                message: field("message"),
            };
            error!(wsfunction, %err, "Web service returned an exception");
            return Err(err);
        }

        Ok(body)
    }
}
