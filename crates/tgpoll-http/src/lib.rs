//! HTTP transport for the bot API (reqwest).
//!
//! Every call is a form-encoded POST to `https://api.<host>/bot<token>/<method>`;
//! the `{ok, result}` envelope is unwrapped here.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use tgpoll_core::{
    config::Config,
    errors::Error,
    ports::{Params, Transport},
    Result,
};

/// Headroom on top of the long-poll timeout before the HTTP client gives up.
const REQUEST_SLACK: Duration = Duration::from_secs(15);

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    result: Option<serde_json::Value>,
    description: Option<String>,
    error_code: Option<i64>,
}

#[derive(Clone, Debug)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(api_host: &str, api_token: &str, request_timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client build failed: {e}")))?;
        Ok(Self {
            base_url: base_url(api_host, api_token),
            http,
        })
    }

    /// Client whose request timeout outlasts the configured long-poll timeout.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        Self::new(
            &cfg.api_host,
            &cfg.api_token,
            cfg.polling_timeout + REQUEST_SLACK,
        )
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }
}

fn base_url(api_host: &str, api_token: &str) -> String {
    format!("https://api.{api_host}/bot{api_token}")
}

/// `ok: false` becomes `None`; the error detail only goes to the log.
fn unwrap_envelope(method: &str, resp: ApiResponse) -> Option<serde_json::Value> {
    if resp.ok {
        return resp.result;
    }
    tracing::debug!(
        method,
        error_code = ?resp.error_code,
        description = resp.description.as_deref().unwrap_or(""),
        "api call not ok"
    );
    None
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(&self, method: &str, params: Params) -> Result<Option<serde_json::Value>> {
        tracing::debug!(">> {method}");

        let resp = self
            .http
            .post(self.method_url(method))
            .form(&params)
            .send()
            .await
            .map_err(|e| Error::Transport(format!("{method} request error: {e}")))?;

        let body: ApiResponse = resp
            .json()
            .await
            .map_err(|e| Error::Transport(format!("{method} response error: {e}")))?;

        tracing::debug!(ok = body.ok, "<< {method}");
        Ok(unwrap_envelope(method, body))
    }
}
