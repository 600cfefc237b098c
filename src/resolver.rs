use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ResolverConfig;

/// Status value the API reports on a successful extraction.
pub const SUCCESS_STATUS: &str = "✅ Success";
/// Error text used when the API answered but carried no usable record.
pub const EXTRACTION_FAILED: &str = "Failed to extract information";

const UNKNOWN: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    pub title: String,
    pub size: String,
    pub direct_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveResult {
    Resolved(ResolvedFile),
    Failed { error: String },
}

impl ResolveResult {
    fn failed(error: impl Into<String>) -> Self {
        ResolveResult::Failed {
            error: error.into(),
        }
    }
}

/// Turns a share link into a directly downloadable file.
#[async_trait]
pub trait Resolve: Send + Sync {
    async fn resolve(&self, link: &str) -> ResolveResult;
}

// Only the first record is ever read, so the envelope stays loosely typed
// and the rest of the list is never inspected.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<Value>,
    #[serde(rename = "📋 Extracted Info", default)]
    extracted: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct ExtractedInfo {
    #[serde(rename = "📄 Title", default)]
    title: Option<Value>,
    #[serde(rename = "📦 Size", default)]
    size: Option<Value>,
    #[serde(rename = "🔗 Direct Download Link", default)]
    direct_link: Option<Value>,
}

fn field_text(value: Option<Value>, fallback: &str) -> String {
    match value {
        None | Some(Value::Null) => fallback.to_string(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    }
}

/// Map a decoded API body onto a [`ResolveResult`].
pub fn interpret(body: &str) -> ResolveResult {
    let envelope: Envelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(e) => return ResolveResult::failed(e.to_string()),
    };

    let succeeded = matches!(&envelope.status, Some(Value::String(s)) if s == SUCCESS_STATUS);
    if !succeeded {
        return ResolveResult::failed(EXTRACTION_FAILED);
    }

    let first = match envelope.extracted {
        Some(Value::Array(records)) => records.into_iter().next(),
        _ => None,
    };

    match first.and_then(|record| serde_json::from_value::<ExtractedInfo>(record).ok()) {
        Some(info) => ResolveResult::Resolved(ResolvedFile {
            title: field_text(info.title, UNKNOWN),
            size: field_text(info.size, UNKNOWN),
            direct_link: field_text(info.direct_link, ""),
        }),
        None => ResolveResult::failed(EXTRACTION_FAILED),
    }
}

/// Error message with its source chain, so timeouts and refused
/// connections say so instead of only naming the URL.
pub fn error_text(err: reqwest::Error) -> String {
    format!("{:#}", anyhow::Error::new(err))
}

/// Client for the third-party link resolution API.
pub struct ResolverClient {
    client: reqwest::Client,
    endpoint: String,
}

impl ResolverClient {
    pub fn new(config: &ResolverConfig) -> anyhow::Result<Self> {
        Self::with_timeout(config.endpoint.clone(), config.timeout())
    }

    pub fn with_timeout(endpoint: String, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint })
    }

    pub(crate) async fn fetch(&self, link: &str) -> reqwest::Result<String> {
        self.client
            .get(&self.endpoint)
            .query(&[("link", link)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

#[async_trait]
impl Resolve for ResolverClient {
    async fn resolve(&self, link: &str) -> ResolveResult {
        debug!("Resolving {} via {}", link, self.endpoint);

        let result = match self.fetch(link).await {
            Ok(body) => interpret(&body),
            Err(e) => ResolveResult::failed(error_text(e)),
        };

        if let ResolveResult::Failed { error } = &result {
            warn!("Resolver failed for {}: {}", link, error);
        }
        result
    }
}
