use crate::state::{CardState, ResolutionState};
use crate::utils::{truncate_str, wrap_text};
use crate::PreviewError;
use serde::Deserialize;
use std::fmt::Write;

const CARD_WIDTH: usize = 72;
const CONTENT_WIDTH: usize = CARD_WIDTH - 4;

/// User-facing strings of the card. Defaults are English.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub title: String,
    pub loading: String,
    pub no_title: String,
    pub no_description: String,
    pub no_image: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            title: "Title".to_string(),
            loading: "Loading...".to_string(),
            no_title: crate::NO_TITLE_PLACEHOLDER.to_string(),
            no_description: crate::NO_DESCRIPTION_PLACEHOLDER.to_string(),
            no_image: "No image".to_string(),
        }
    }
}

impl Labels {
    /// Loads a locale bundle such as `{"title": "Título"}`; missing keys keep their defaults.
    pub fn from_json(bundle: &str) -> Result<Self, PreviewError> {
        serde_json::from_str(bundle)
            .map_err(|e| PreviewError::ConfigError(format!("Invalid locale bundle: {e}")))
    }

    pub fn image_alt(&self, title: &str) -> String {
        format!("{}: {}", self.title, title)
    }
}

/// Draws a snapshot of the card as boxed text.
pub fn render_card(state: &CardState, labels: &Labels) -> String {
    let horizontal = "═".repeat(CARD_WIDTH - 2);
    let mut out = String::new();
    let _ = writeln!(out, "╔{horizontal}╗");

    let mut line = |text: &str| {
        for wrapped in wrap_text(text, CONTENT_WIDTH) {
            let _ = writeln!(out, "  {}", truncate_str(&wrapped, CONTENT_WIDTH));
        }
    };

    if let Some(link) = &state.link {
        line(link.as_str());
    }

    if state.is_busy() {
        line(&labels.loading);
    }

    let show_result = match state.status {
        ResolutionState::Idle => false,
        ResolutionState::Loading => !state.result.is_empty(),
        ResolutionState::Resolved | ResolutionState::Failed => true,
    };

    if show_result {
        let result = &state.result;
        let title = result.title.as_deref().unwrap_or(&labels.no_title);
        line(title);
        line(result.description.as_deref().unwrap_or(&labels.no_description));
        match &result.image_url {
            Some(image) => line(&format!("[{}] {}", labels.image_alt(title), image)),
            None => line(&format!("[{}]", labels.no_image)),
        }
    }

    if let Some(notice) = &state.notice {
        line(&format!("! {}", notice.message));
    }

    let _ = write!(out, "╚{horizontal}╝");
    out
}
