//! markcard - Main Entry Point
//!
//! Reads Markdown from a file or stdin and prints normalized markup, block
//! HTML, or the highlighted card body.
//!
//! ```text
//! markcard [-o markup|html|card|page] [FILE]
//! ```

use clap::{Parser, ValueEnum};
use log::{error, info};
use markcard::config::load_config;
use markcard::error::Result;
use markcard::markdown::syntax::PrefixedTokenizer;
use markcard::markdown::{
    get_highlighter, highlight_html, parse_markup, render_card_document, render_card_html,
    render_document, serialize_document, ImageRegistry,
};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;

/// Application name constant.
const APP_NAME: &str = "markcard";

/// What to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Output {
    /// Normalized markup (parse, then serialize)
    Markup,
    /// Block HTML of the structured document, highlighted
    Html,
    /// Card body rendered from markup, highlighted
    Card,
    /// Card body wrapped in a standalone page with the token stylesheet
    Page,
}

#[derive(Debug, Parser)]
#[command(name = APP_NAME)]
#[command(about = "Convert Markdown into normalized markup or highlighted card HTML")]
#[command(version)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = Output::Card)]
    output: Output,

    /// Input file; reads stdin when omitted or `-`
    #[arg(value_hint = clap::ValueHint::FilePath)]
    input: Option<PathBuf>,
}

fn read_input(path: Option<&PathBuf>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => Ok(std::fs::read_to_string(path)?),
        _ => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let settings = load_config();
    let source = read_input(cli.input.as_ref())?;
    let mut registry =
        ImageRegistry::with_limits(settings.externalize_threshold, settings.preview_chars);

    let rendered = match cli.output {
        Output::Markup => serialize_document(&parse_markup(&source), &mut registry),
        Output::Html => {
            let html = render_document(&parse_markup(&source), &registry);
            let tokenizer = PrefixedTokenizer {
                highlighter: get_highlighter(),
                class_prefix: &settings.highlight_class_prefix,
            };
            highlight_html(&html, &registry, &tokenizer)
        }
        Output::Card => render_card_html(&source, &registry, &settings),
        Output::Page => render_card_document(&source, &registry, &settings)?,
    };

    println!("{}", rendered.trim_end());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting {}", APP_NAME);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
