//! Headless walkthrough of the block editor: loads a document, replays a scripted editing
//! session through the drag-and-drop controller and the mention engine, and prints the markup
//! after each step.
//!
//! ```bash
//! block-editor-story -v
//! block-editor-story --config story.json --input page.html --view
//! ```

mod config;
mod session;

use std::path::PathBuf;

use anyhow::Context as _;
use block_editor_core::{DocumentValue, parse_document};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::StoryConfig;
use crate::session::{SAMPLE, Session};

#[derive(Parser, Debug)]
#[command(name = "block-editor-story")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file with `editor`, `mention` and `snippets` sections
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Markup document to start from instead of the built-in sample
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Print the rendered view tree after the session
    #[arg(long)]
    view: bool,

    /// Print the final document as JSON
    #[arg(long)]
    json: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = match &args.config {
        Some(path) => StoryConfig::load_from(path)?,
        None => StoryConfig::default(),
    };
    let markup = match &args.input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => SAMPLE.to_string(),
    };
    let doc = parse_document(&markup).context("parsing input markup")?;

    let mut session = Session::new(config, doc)?;
    for step in session.run()? {
        println!("== {} ==\n{}", step.label, step.markup);
    }
    if args.view {
        println!("== view ==\n{}", session.view().to_html());
    }
    if args.json {
        let value = DocumentValue::from_document(session.editor().doc().clone());
        println!("{}", value.to_json_pretty()?);
    }
    Ok(())
}
