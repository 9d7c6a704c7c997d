//! Interactive preview card: type a link, get its preview.
//!
//! Run with:
//! ```
//! cargo run --example preview_card -- https://www.rust-lang.org
//! ```

use clap::Parser;
use colored::Colorize;
use link_preview_card::{
    log_preview_card, render_card, setup_logging, CardConfig, Labels, LogConfig, SourceKind,
};
use std::error::Error;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(about = "Preview links from the terminal")]
struct Args {
    /// Link to preview on start
    link: Option<String>,

    /// Metadata source: `service` or `html`
    #[arg(long, default_value = "service")]
    source: String,

    /// Locale bundle with card labels, e.g. locales/link-preview-card.es.json
    #[arg(long)]
    locale: Option<PathBuf>,

    /// Log level for the tracing subscriber
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    setup_logging(LogConfig {
        log_level: args.log_level.clone(),
        ..Default::default()
    })?;

    let labels = match &args.locale {
        Some(path) => Labels::from_json(&tokio::fs::read_to_string(path).await?)?,
        None => Labels::default(),
    };

    let mut config = CardConfig::from_env()?.with_source_kind(args.source.parse::<SourceKind>()?);
    if let Some(link) = args.link {
        config = config.with_initial_link(link);
    }
    let card = config.build_card()?;

    println!("{}", "Link Preview Card".bold().green());
    println!("{}", "Enter an https: link, or an empty line to quit.".green());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if card.snapshot().is_busy() {
            println!("{}", labels.loading.yellow());
        }
        let state = card.settled().await;
        println!("{}", render_card(&state, &labels));
        if let Some(link) = &state.link {
            log_preview_card(&state.result, link.as_str());
        }

        print!("{} ", "link>".bold().blue());
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(input) = lines.next_line().await? else {
            break;
        };
        if input.trim().is_empty() {
            break;
        }

        if let Err(e) = card.submit(&input) {
            eprintln!("{}: {}", "Error".bold().red(), e);
            card.dismiss_notice();
        }
    }

    Ok(())
}
