mod card;
mod config;
mod error;
mod html;
#[cfg(feature = "logging")]
mod logging;
mod metadata;
mod render;
mod resolver;
mod source;
mod state;
mod utils;
mod validation;

pub use card::PreviewCard;
pub use config::{CardConfig, SourceKind};
pub use error::PreviewError;
pub use html::{HtmlExtractor, HtmlSource};
#[cfg(feature = "logging")]
pub use logging::{log_preview_card, setup_logging, LogConfig};
pub use metadata::{MetadataPayload, MetadataResponse};
pub use render::{render_card, Labels};
pub use resolver::{MetadataResolver, ResolutionOutcome};
pub use source::{
    MetadataSource, ServiceSource, SourceConfig, DEFAULT_MAX_CONTENT_SIZE,
    DEFAULT_METADATA_ENDPOINT, DEFAULT_TIMEOUT, DEFAULT_USER_AGENT,
};
pub use state::{reduce, CardEvent, CardState, RequestId, ResolutionState, ValidationNotice};
pub use validation::{LinkPolicy, REQUIRED_PREFIX};

pub const NO_TITLE_PLACEHOLDER: &str = "Error: No title found";
pub const NO_DESCRIPTION_PLACEHOLDER: &str = "Error: No description found";

/// Resolved preview of a link. `None` means the source had nothing for that field.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PreviewResult {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl PreviewResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.image_url.is_none()
    }

    pub fn title_or_placeholder(&self) -> &str {
        self.title.as_deref().unwrap_or(NO_TITLE_PLACEHOLDER)
    }

    pub fn description_or_placeholder(&self) -> &str {
        self.description
            .as_deref()
            .unwrap_or(NO_DESCRIPTION_PLACEHOLDER)
    }
}
