//! HTTP resolver - リモート unlock サービスへの GET
//!
//! `GET {endpoint}?url=<percent-encoded url>` → JSON
//! `{status, link | final_link | extracted_link | best_download_link, message,
//!   best_button_name, all_available_buttons}`

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::HttpSettings;
use crate::domain::{ResolveOutcome, Selection, UnlockError};
use crate::ports::Resolver;

#[derive(Debug, Deserialize)]
struct ResolverReply {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    link: Option<String>,
    #[serde(default)]
    best_download_link: Option<String>,
    #[serde(default)]
    final_link: Option<String>,
    #[serde(default)]
    extracted_link: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    best_button_name: Option<String>,
    #[serde(default)]
    all_available_buttons: Vec<serde_json::Value>,
}

impl ResolverReply {
    fn into_outcome(self) -> ResolveOutcome {
        let link = self
            .link
            .or(self.best_download_link)
            .or(self.final_link)
            .or(self.extracted_link);
        let ok = self.status.as_deref() == Some("success");

        match link {
            Some(url) if ok => ResolveOutcome::success(url).with_selection(Selection {
                best_button_name: self.best_button_name,
                all_available_buttons: self.all_available_buttons,
            }),
            _ => ResolveOutcome::failure(
                self.message
                    .unwrap_or_else(|| "resolver returned no link".to_string()),
            ),
        }
    }
}

pub struct HttpResolver {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpResolver {
    pub fn new(endpoint: impl Into<String>, http: &HttpSettings) -> Result<Self, UnlockError> {
        let client = reqwest::Client::builder()
            .user_agent(http.user_agent.clone())
            .timeout(http.request_timeout())
            .build()?;
        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    fn request_url(&self, url: &str) -> String {
        let sep = if self.endpoint.contains('?') { '&' } else { '?' };
        format!("{}{sep}url={}", self.endpoint, urlencoding::encode(url))
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve(&self, url: &str) -> Result<ResolveOutcome, UnlockError> {
        let response = self.client.get(self.request_url(url)).send().await?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(endpoint = %self.endpoint, status = status.as_u16(), "resolver answered non-2xx");
            return Err(UnlockError::Remote(format!("HTTP {}", status.as_u16())));
        }

        let reply: ResolverReply = response.json().await?;
        Ok(reply.into_outcome())
    }
}
