//! CLI binary for fayda-card.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `CardConfig` and prints the decoded record.

use anyhow::{Context, Result};
use clap::Parser;
use fayda_card::generate::read_pdf;
use fayda_card::{
    extract_identity, generate_card_async, CardConfig, CardError, IdentityRecord, TemplateLayout,
};
use serde_json::json;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Generate a card into data/processed/
  fayda-card fayda.pdf

  # Tag the output file with a requester id and pick the directory
  fayda-card fayda.pdf --requester 12345 --output-dir cards/

  # Use your own template image and coordinates
  fayda-card fayda.pdf --template template.png --layout layout.json

  # Only decode the QR record, write nothing
  fayda-card --extract-only --json fayda.pdf

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH     Path to libpdfium (or the directory containing it)
  FAYDA_OUTPUT_DIR    Default for --output-dir
  FAYDA_TEMPLATE      Default for --template
  FAYDA_LAYOUT        Default for --layout
  FAYDA_FONT          Default for --font
  RUST_LOG            Overrides the log filter set by -v / -q
"#;

/// Generate an ID card image from a FAYDA national-ID PDF.
#[derive(Parser, Debug)]
#[command(
    name = "fayda-card",
    version,
    about = "Generate an ID card image from a FAYDA national-ID PDF",
    long_about = "Rasterises the first page of a FAYDA PDF, decodes the QR code on it, \
and draws the decoded identity record, the holder's photo and the QR code onto a card template.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Path to the FAYDA PDF.
    input: PathBuf,

    /// Identifier embedded in the output file name.
    #[arg(long, env = "FAYDA_REQUESTER", default_value = "cli")]
    requester: String,

    /// Directory the card PNG is written to.
    #[arg(short, long, env = "FAYDA_OUTPUT_DIR", default_value = "data/processed")]
    output_dir: PathBuf,

    /// Rendering DPI (72–400). Search regions assume 200.
    #[arg(long, env = "FAYDA_DPI", default_value_t = 200,
          value_parser = clap::value_parser!(u32).range(72..=400))]
    dpi: u32,

    /// Card template image. A default template is drawn when absent.
    #[arg(long, env = "FAYDA_TEMPLATE")]
    template: Option<PathBuf>,

    /// JSON file with template coordinates (missing keys use the FAYDA v1 layout).
    #[arg(long, env = "FAYDA_LAYOUT")]
    layout: Option<PathBuf>,

    /// TrueType/OpenType font for the card text.
    #[arg(long, env = "FAYDA_FONT")]
    font: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "FAYDA_PASSWORD")]
    password: Option<String>,

    /// Decode and print the identity record only; no card is written.
    #[arg(long)]
    extract_only: bool,

    /// Output structured JSON instead of text.
    #[arg(long, env = "FAYDA_JSON")]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FAYDA_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FAYDA_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || cli.json {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli)?;

    match run(&cli, config).await {
        Ok(()) => Ok(()),
        Err(e) => {
            if let Some(card_err) = e.downcast_ref::<CardError>() {
                eprintln!("{} {}", red("✘"), bold(&card_err.user_message()));
            }
            Err(e)
        }
    }
}

async fn run(cli: &Cli, config: CardConfig) -> Result<()> {
    let pdf = read_pdf(&cli.input)?;

    // ── Extract-only mode ────────────────────────────────────────────────
    if cli.extract_only {
        let (record, region) = tokio::task::block_in_place(|| extract_identity(&pdf, &config))?;

        if cli.json {
            let value = json!({ "record": record, "code_region": region });
            println!(
                "{}",
                serde_json::to_string_pretty(&value).context("Failed to serialise record")?
            );
        } else {
            print_record(&record);
            if !cli.quiet {
                eprintln!("{}", dim(&format!("QR found in {region}")));
            }
        }
        return Ok(());
    }

    // ── Generate card ────────────────────────────────────────────────────
    let output = generate_card_async(pdf, cli.requester.clone(), config).await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    print_record(&output.record);
    println!("{}", output.artifact.path.display());

    if !cli.quiet {
        for issue in &output.artifact.issues {
            eprintln!("  {} {}", yellow("⚠"), issue);
        }
        eprintln!(
            "{}  {}x{}  {}ms  →  {}",
            if output.artifact.is_complete() {
                green("✔")
            } else {
                yellow("⚠")
            },
            output.artifact.width,
            output.artifact.height,
            output.stats.total_duration_ms,
            bold(&output.artifact.path.display().to_string()),
        );
    }
    Ok(())
}

/// Map CLI args to `CardConfig`.
fn build_config(cli: &Cli) -> Result<CardConfig> {
    let mut layout = match cli.layout {
        Some(ref path) => TemplateLayout::from_json_file(path)
            .with_context(|| format!("Failed to load layout from {:?}", path))?,
        None => TemplateLayout::fayda_v1(),
    };
    if let Some(ref template) = cli.template {
        layout.template_path = Some(template.clone());
    }

    let mut builder = CardConfig::builder()
        .dpi(cli.dpi)
        .output_dir(&cli.output_dir)
        .layout(layout);

    if let Some(ref font) = cli.font {
        builder = builder.font_path(font);
    }
    if let Some(ref password) = cli.password {
        builder = builder.password(password);
    }

    builder.build().context("Invalid configuration")
}

fn print_record(record: &IdentityRecord) {
    for (field, value) in record.entries() {
        println!("{:<12} {}", format!("{field}:"), value);
    }
}
