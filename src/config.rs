use crate::html::HtmlSource;
use crate::resolver::MetadataResolver;
use crate::source::{ServiceSource, SourceConfig};
use crate::validation::LinkPolicy;
use crate::{PreviewCard, PreviewError};
use std::env;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

/// Where link metadata comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SourceKind {
    /// The remote metadata service.
    #[default]
    Service,
    /// The linked page itself.
    Html,
}

impl FromStr for SourceKind {
    type Err = PreviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "service" => Ok(SourceKind::Service),
            "html" => Ok(SourceKind::Html),
            other => Err(PreviewError::ConfigError(format!(
                "Unknown metadata source '{other}', expected 'service' or 'html'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CardConfig {
    pub source: SourceConfig,
    pub source_kind: SourceKind,
    pub policy: LinkPolicy,
    pub initial_link: Option<String>,
}

impl CardConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads `LINK_PREVIEW_*` variables on top of the defaults.
    pub fn from_env() -> Result<Self, PreviewError> {
        let mut config = Self::default();

        if let Ok(endpoint) = env::var("LINK_PREVIEW_ENDPOINT") {
            config.source.endpoint = endpoint;
        }
        if let Ok(proxy) = env::var("LINK_PREVIEW_PROXY") {
            config.source.proxy_prefix = Some(proxy).filter(|p| !p.is_empty());
        }
        if let Ok(user_agent) = env::var("LINK_PREVIEW_USER_AGENT") {
            config.source.user_agent = user_agent;
        }
        if let Ok(timeout) = env::var("LINK_PREVIEW_TIMEOUT_SECS") {
            let secs = timeout.parse::<u64>().map_err(|e| {
                PreviewError::ConfigError(format!("Invalid LINK_PREVIEW_TIMEOUT_SECS: {e}"))
            })?;
            config.source.timeout = Duration::from_secs(secs);
        }
        if let Ok(limit) = env::var("LINK_PREVIEW_MAX_CONTENT_SIZE") {
            config.source.max_content_size = limit.parse::<usize>().map_err(|e| {
                PreviewError::ConfigError(format!("Invalid LINK_PREVIEW_MAX_CONTENT_SIZE: {e}"))
            })?;
        }
        if let Ok(kind) = env::var("LINK_PREVIEW_SOURCE") {
            config.source_kind = kind.parse()?;
        }
        if let Ok(link) = env::var("LINK_PREVIEW_LINK") {
            config.initial_link = Some(link);
        }

        debug!(?config, "Loaded card configuration from environment");
        Ok(config)
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.source.endpoint = endpoint.into();
        self
    }

    pub fn with_proxy_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.source.proxy_prefix = Some(prefix.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.source.timeout = timeout;
        self
    }

    pub fn with_max_content_size(mut self, limit: usize) -> Self {
        self.source.max_content_size = limit;
        self
    }

    pub fn with_source_kind(mut self, kind: SourceKind) -> Self {
        self.source_kind = kind;
        self
    }

    pub fn with_policy(mut self, policy: LinkPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_initial_link(mut self, link: impl Into<String>) -> Self {
        self.initial_link = Some(link.into());
        self
    }

    pub fn build_resolver(&self) -> Result<MetadataResolver, PreviewError> {
        Ok(match self.source_kind {
            SourceKind::Service => MetadataResolver::new(ServiceSource::new(self.source.clone())?),
            SourceKind::Html => MetadataResolver::new(HtmlSource::new(self.source.clone())?),
        })
    }

    /// Builds the card and, if configured, starts resolving the initial link.
    /// Must be called from within a Tokio runtime when an initial link is set.
    pub fn build_card(&self) -> Result<PreviewCard, PreviewError> {
        let card = PreviewCard::with_policy(self.build_resolver()?, self.policy.clone());
        if let Some(link) = &self.initial_link {
            card.submit(link)?;
        }
        Ok(card)
    }
}
