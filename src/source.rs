use crate::metadata::{MetadataPayload, MetadataResponse};
use crate::PreviewError;
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client, Response};
use std::time::Duration;
use tracing::{debug, error, instrument};
use url::Url;

pub const DEFAULT_METADATA_ENDPOINT: &str =
    "https://open-apis.hax.cloud/api/services/website/metadata";
pub const DEFAULT_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONTENT_SIZE: usize = 10 * 1024 * 1024;

/// Something that can describe a link as a [`MetadataPayload`].
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_metadata(&self, link: &Url) -> Result<MetadataPayload, PreviewError>;
}

#[derive(Debug, Clone)]
pub struct SourceConfig {
    pub endpoint: String,
    /// Prepended verbatim to the request URL, e.g. `https://corsproxy.io/?url=`.
    pub proxy_prefix: Option<String>,
    pub user_agent: String,
    pub timeout: Duration,
    /// Largest response body, in bytes, a source will buffer.
    pub max_content_size: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_METADATA_ENDPOINT.to_string(),
            proxy_prefix: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
        }
    }
}

pub(crate) fn build_client(config: &SourceConfig) -> Result<Client, PreviewError> {
    Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.as_str())
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| {
            error!(error = %e, "Failed to create HTTP client");
            PreviewError::ConfigError(format!("Failed to initialize HTTP client: {e}"))
        })
}

/// Buffers a response body, giving up as soon as it grows past `limit` bytes.
pub(crate) async fn read_body(mut response: Response, limit: usize) -> Result<Vec<u8>, PreviewError> {
    if let Some(declared) = response.content_length() {
        let size = usize::try_from(declared).unwrap_or(usize::MAX);
        if size > limit {
            return Err(PreviewError::ContentTooLarge { size, limit });
        }
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        let size = body.len() + chunk.len();
        if size > limit {
            return Err(PreviewError::ContentTooLarge { size, limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Asks the metadata service about a link: `GET <endpoint>?q=<link>`.
#[derive(Clone)]
pub struct ServiceSource {
    client: Client,
    endpoint: Url,
    proxy_prefix: Option<String>,
    max_content_size: usize,
}

impl ServiceSource {
    pub fn new(config: SourceConfig) -> Result<Self, PreviewError> {
        let client = build_client(&config)?;
        Self::with_client(client, config)
    }

    pub fn with_client(client: Client, config: SourceConfig) -> Result<Self, PreviewError> {
        let endpoint = Url::parse(&config.endpoint).map_err(|e| {
            PreviewError::ConfigError(format!("Invalid metadata endpoint {}: {e}", config.endpoint))
        })?;
        debug!(endpoint = %endpoint, proxied = config.proxy_prefix.is_some(), "Metadata source initialized");

        Ok(Self {
            client,
            endpoint,
            proxy_prefix: config.proxy_prefix,
            max_content_size: config.max_content_size,
        })
    }

    pub fn request_url(&self, link: &Url) -> Result<Url, PreviewError> {
        let mut request = self.endpoint.clone();
        request.query_pairs_mut().append_pair("q", link.as_str());

        match &self.proxy_prefix {
            Some(prefix) => Ok(Url::parse(&format!("{prefix}{request}"))?),
            None => Ok(request),
        }
    }
}

#[async_trait]
impl MetadataSource for ServiceSource {
    #[instrument(level = "debug", skip(self, link), fields(link = %link), err)]
    async fn fetch_metadata(&self, link: &Url) -> Result<MetadataPayload, PreviewError> {
        let request = self.request_url(link)?;
        debug!(request = %request, "Requesting link metadata");

        let response = self
            .client
            .get(request)
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send metadata request");
                PreviewError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::from_status(
                status.as_u16(),
                format!("metadata service answered {status} for {link}"),
            ));
        }

        let body = read_body(response, self.max_content_size)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to read metadata response body");
                e
            })?;

        let parsed: MetadataResponse = serde_json::from_slice(&body)
            .map_err(|e| PreviewError::ParseError(e.to_string()))?;

        debug!(content_length = body.len(), "Metadata response decoded");
        Ok(parsed.into_payload())
    }
}
