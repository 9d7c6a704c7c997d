use crate::utils::wrap_text;
use crate::{PreviewError, PreviewResult};
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt as subscriber_fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug)]
pub struct LogConfig {
    pub log_dir: PathBuf,
    pub log_level: String,
    pub console_output: bool,
    pub file_output: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            log_dir: "logs".into(),
            log_level: "info".into(),
            console_output: true,
            file_output: false,
        }
    }
}

pub fn log_preview_card(result: &PreviewResult, link: &str) {
    const CARD_WIDTH: usize = 80;
    const CONTENT_WIDTH: usize = CARD_WIDTH - 2;

    let wrap = |text: &str, width: usize| wrap_text(text, width).join("\n  ");

    let link_wrapped = wrap(link, CONTENT_WIDTH - 6);
    let title_wrapped = wrap(result.title.as_deref().unwrap_or("N/A"), CONTENT_WIDTH - 7);
    let desc_wrapped = wrap(result.description.as_deref().unwrap_or("N/A"), CONTENT_WIDTH - 6);
    let image_wrapped = wrap(result.image_url.as_deref().unwrap_or("N/A"), CONTENT_WIDTH - 7);

    let horizontal_line = "═".repeat(CARD_WIDTH - 2);

    info!(
        "\n╔{}╗\n\
         Link: {}\n\
         Title: {}\n\
         Desc: {}\n\
         Image: {}\n\
         ╚{}╝",
        horizontal_line,
        link_wrapped,
        title_wrapped,
        desc_wrapped,
        image_wrapped,
        horizontal_line,
    );
}

pub fn setup_logging(config: LogConfig) -> Result<(), PreviewError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let mut layers = Vec::new();

    if config.console_output {
        let console_layer = subscriber_fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .pretty();
        layers.push(console_layer.boxed());
    }

    if config.file_output {
        std::fs::create_dir_all(&config.log_dir).map_err(|e| {
            PreviewError::ConfigError(format!(
                "Failed to create log directory {}: {e}",
                config.log_dir.display()
            ))
        })?;

        let file_appender =
            RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "link-preview-card.log");

        let file_layer = subscriber_fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_writer(file_appender);

        layers.push(file_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .map_err(|e| PreviewError::ConfigError(format!("Failed to set global subscriber: {e}")))?;

    debug!("Logging system initialized with config: {:?}", config);
    Ok(())
}
