use crate::metadata::MetadataPayload;
use crate::source::{
    build_client, read_body, MetadataSource, SourceConfig, DEFAULT_MAX_CONTENT_SIZE,
};
use crate::PreviewError;
use async_trait::async_trait;
use reqwest::{header::ACCEPT, Client};
use scraper::{Html, Selector};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};
use url::Url;

/// Reads metadata straight from the linked page instead of asking a service.
///
/// Produces the same [`MetadataPayload`] shape the metadata service returns,
/// so the resolver's fallback chain is shared between both sources.
#[derive(Clone)]
pub struct HtmlSource {
    client: Client,
    extractor: HtmlExtractor,
    max_content_size: usize,
}

impl HtmlSource {
    pub fn new(config: SourceConfig) -> Result<Self, PreviewError> {
        let source = Self::with_client(build_client(&config)?);
        Ok(source.with_max_content_size(config.max_content_size))
    }

    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            extractor: HtmlExtractor::new(),
            max_content_size: DEFAULT_MAX_CONTENT_SIZE,
        }
    }

    pub fn with_max_content_size(mut self, limit: usize) -> Self {
        self.max_content_size = limit;
        self
    }
}

#[async_trait]
impl MetadataSource for HtmlSource {
    #[instrument(level = "debug", skip(self, link), fields(link = %link), err)]
    async fn fetch_metadata(&self, link: &Url) -> Result<MetadataPayload, PreviewError> {
        let response = self
            .client
            .get(link.clone())
            .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch page");
                PreviewError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::from_status(
                status.as_u16(),
                format!("page answered {status}"),
            ));
        }

        let body = read_body(response, self.max_content_size).await?;
        debug!(content_length = body.len(), "Fetched page");
        self.extractor.extract(&String::from_utf8_lossy(&body))
    }
}

/// Pulls the metadata-service field set out of an HTML document.
#[derive(Clone, Default)]
pub struct HtmlExtractor;

impl HtmlExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, html: &str) -> Result<MetadataPayload, PreviewError> {
        let document = Html::parse_document(html);

        Ok(MetadataPayload {
            og_title: self.meta_content(&document, "meta[property='og:title']")?,
            title: self.text_of(&document, "head > title")?,
            og_description: self.meta_content(&document, "meta[property='og:description']")?,
            description: self.meta_content(&document, "meta[name='description']")?,
            og_image: self
                .meta_content(&document, "meta[property='og:image']")?
                .or(self.meta_content(&document, "meta[itemprop='image']")?),
            ld_json: self.structured_data(&document)?,
        })
    }

    fn selector(css: &str) -> Result<Selector, PreviewError> {
        Selector::parse(css)
            .map_err(|e| PreviewError::ExtractError(format!("Invalid selector {css}: {e:?}")))
    }

    fn meta_content(&self, document: &Html, css: &str) -> Result<Option<String>, PreviewError> {
        let selector = Self::selector(css)?;
        Ok(document
            .select(&selector)
            .next()
            .and_then(|el| el.value().attr("content"))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from))
    }

    fn text_of(&self, document: &Html, css: &str) -> Result<Option<String>, PreviewError> {
        let selector = Self::selector(css)?;
        Ok(document
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string()))
    }

    // Every JSON-LD block that parses, as one array; unparseable blocks are skipped.
    fn structured_data(&self, document: &Html) -> Result<Option<Value>, PreviewError> {
        let selector = Self::selector("script[type='application/ld+json']")?;
        let blocks: Vec<Value> = document
            .select(&selector)
            .filter_map(|el| {
                let raw = el.text().collect::<String>();
                serde_json::from_str::<Value>(raw.trim())
                    .map_err(|e| warn!(error = %e, "Skipping malformed ld+json block"))
                    .ok()
            })
            .collect();

        Ok(match blocks.len() {
            0 => None,
            1 => blocks.into_iter().next(),
            _ => Some(Value::Array(blocks)),
        })
    }
}
