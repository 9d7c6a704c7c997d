use crate::source::MetadataSource;
use crate::{PreviewError, PreviewResult};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use url::Url;

/// What a single resolution produced.
///
/// `Failed` still carries a renderable (empty) result; the error is kept so
/// callers can tell a dead service apart from a page with sparse metadata.
#[derive(Debug)]
pub enum ResolutionOutcome {
    Resolved(PreviewResult),
    Failed {
        result: PreviewResult,
        error: PreviewError,
    },
}

impl ResolutionOutcome {
    pub fn result(&self) -> &PreviewResult {
        match self {
            ResolutionOutcome::Resolved(result) => result,
            ResolutionOutcome::Failed { result, .. } => result,
        }
    }

    pub fn into_result(self) -> PreviewResult {
        match self {
            ResolutionOutcome::Resolved(result) => result,
            ResolutionOutcome::Failed { result, .. } => result,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ResolutionOutcome::Failed { .. })
    }
}

/// Turns a link into a [`PreviewResult`] with one request to its source.
#[derive(Clone)]
pub struct MetadataResolver {
    source: Arc<dyn MetadataSource>,
}

impl MetadataResolver {
    pub fn new<S: MetadataSource + 'static>(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn from_shared(source: Arc<dyn MetadataSource>) -> Self {
        Self { source }
    }

    /// Never fails: any fetch or decode problem degrades to an empty result.
    pub async fn resolve(&self, link: &Url) -> PreviewResult {
        self.resolve_outcome(link).await.into_result()
    }

    #[instrument(level = "debug", skip(self, link), fields(link = %link))]
    pub async fn resolve_outcome(&self, link: &Url) -> ResolutionOutcome {
        match self.source.fetch_metadata(link).await {
            Ok(payload) => {
                if payload.is_empty() {
                    debug!("Metadata source returned no fields");
                }
                ResolutionOutcome::Resolved(payload.resolve(Some(link)))
            }
            Err(error) => {
                warn!(error = %error, "Metadata unavailable, falling back to empty preview");
                error.log();
                ResolutionOutcome::Failed {
                    result: PreviewResult::empty(),
                    error,
                }
            }
        }
    }
}
