//! Client for the external fetch-and-render service.
//!
//! The service owns everything network-shaped: issuing the HTTP request,
//! rendering JavaScript in a browser, running page actions (wait for a
//! selector, click), evaluating the extraction selectors and the
//! readiness probe. This crate only speaks its JSON API and hands the
//! extracted raw rows to the core.
//!
//! Transport failures (429, 5xx including 521 origin-down, timeouts) are
//! retried here with a bounded backoff. Page readiness is a different
//! concern with its own retry loop in the pipeline driver; for that loop
//! the request carries a dedup-bypass flag so the service will re-run an
//! already-seen URL instead of serving a cached response.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use retry_utils::{retry_transport, FailureClass, RetryPolicy};
use scrape_core::{FieldSpec, RawRow};

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("render service error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("rate limit exceeded")]
    RateLimit,
}

/// Ordered page interaction executed by the service before extraction
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum PageAction {
    #[serde(rename_all = "camelCase")]
    WaitForSelector {
        selector: String,
        timeout: u64,
        on_error: OnActionError,
    },
    #[serde(rename_all = "camelCase")]
    Click {
        selector: String,
        on_error: OnActionError,
    },
}

impl PageAction {
    /// Wait for an element to attach; the page is still harvested if it
    /// never shows up
    pub fn wait_for(selector: &str, timeout: u64) -> Self {
        PageAction::WaitForSelector {
            selector: selector.to_string(),
            timeout,
            on_error: OnActionError::Return,
        }
    }

    pub fn click(selector: &str) -> Self {
        PageAction::Click {
            selector: selector.to_string(),
            on_error: OnActionError::Return,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OnActionError {
    /// Continue with the page as-is
    Return,
    /// Fail the whole request
    Abort,
}

/// Named selector evaluated by the service, relative to the row root
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldQuery {
    pub name: String,
    pub selector: String,
}

/// Declarative extraction request: a row selector plus named field
/// selectors. Without a root the document itself is the single row.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExtractQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub fields: Vec<FieldQuery>,
}

impl ExtractQuery {
    /// Build the wire query from a stage's field table
    pub fn from_specs(root: Option<&str>, specs: &[FieldSpec]) -> Self {
        Self {
            root: root.map(|s| s.to_string()),
            fields: specs
                .iter()
                .map(|spec| FieldQuery {
                    name: spec.name.to_string(),
                    selector: spec.selector.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderRequest {
    pub url: String,

    /// Render JavaScript in a browser before extraction
    pub browser_html: bool,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<PageAction>,

    pub extract: ExtractQuery,

    /// Selector whose presence means the page finished rendering the data
    /// we came for
    #[serde(skip_serializing_if = "Option::is_none")]
    pub readiness_probe: Option<String>,

    /// Re-run the URL even if the service has already seen it. Required
    /// for readiness re-fetches, which repeat an identical request on
    /// purpose.
    pub bypass_dedup: bool,
}

impl RenderRequest {
    pub fn new(url: String, extract: ExtractQuery) -> Self {
        Self {
            url,
            browser_html: true,
            actions: Vec::new(),
            extract,
            readiness_probe: None,
            bypass_dedup: false,
        }
    }

    pub fn with_actions(mut self, actions: Vec<PageAction>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_readiness_probe(mut self, selector: &str) -> Self {
        self.readiness_probe = Some(selector.to_string());
        self
    }

    pub fn bypassing_dedup(mut self) -> Self {
        self.bypass_dedup = true;
        self
    }
}

/// Rendered result: one raw-text row per root match, the probe verdict
/// and the service's raw action log for diagnostics
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RenderedPage {
    pub url: String,
    pub status: u16,
    pub rows: Vec<RawRow>,
    #[serde(default)]
    pub probe_matched: bool,
    #[serde(default)]
    pub action_log: Vec<serde_json::Value>,
}

/// Configuration for the render service client
#[derive(Debug, Clone)]
pub struct RenderClientConfig {
    pub api_url: String,
    pub api_key: String,
    pub request_timeout_seconds: u64,
    pub retry_policy: RetryPolicy,
}

impl Default for RenderClientConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.renderfetch.dev/v1/render".to_string(),
            api_key: "".to_string(),
            request_timeout_seconds: 120,
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// Seam between the pipeline driver and the real service, so the retry
/// loop can be exercised against a scripted fake
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, request: &RenderRequest) -> Result<RenderedPage, RenderError>;
}

pub struct RenderClient {
    http_client: Client,
    config: RenderClientConfig,
}

impl RenderClient {
    pub fn new(config: RenderClientConfig) -> Result<Self, RenderError> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Render a page, retrying transport-level failures per the
    /// configured policy
    pub async fn render(&self, request: &RenderRequest) -> Result<RenderedPage, RenderError> {
        retry_transport(
            || self.render_once(request),
            &self.config.retry_policy,
            classify_failure,
        )
        .await
    }

    async fn render_once(&self, request: &RenderRequest) -> Result<RenderedPage, RenderError> {
        debug!(
            "🌐 Render request for {} (bypass_dedup: {})",
            request.url, request.bypass_dedup
        );

        let response = self
            .http_client
            .post(&self.config.api_url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("accept", "application/json")
            .json(request)
            .send()
            .await?;

        if response.status() == 429 {
            return Err(RenderError::RateLimit);
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            warn!("Render service error for {}: HTTP {}", request.url, status);
            return Err(RenderError::Api { status, message });
        }

        let page: RenderedPage = response.json().await?;
        debug!(
            "📄 Rendered {} rows from {} (probe matched: {})",
            page.rows.len(),
            page.url,
            page.probe_matched
        );
        Ok(page)
    }
}

#[async_trait]
impl PageFetcher for RenderClient {
    async fn fetch(&self, request: &RenderRequest) -> Result<RenderedPage, RenderError> {
        self.render(request).await
    }
}

fn classify_failure(error: &RenderError) -> FailureClass {
    match error {
        RenderError::RateLimit => FailureClass::RateLimit,
        // 521 is the origin being down behind the service; both it and
        // plain 5xx are temporary
        RenderError::Api { status, .. } if *status >= 500 => FailureClass::OriginError,
        RenderError::Api { .. } => FailureClass::Fatal,
        RenderError::Http(e) if e.is_timeout() => FailureClass::Timeout,
        RenderError::Http(_) => FailureClass::Fatal,
    }
}
