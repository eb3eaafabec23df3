//! Convert an existing HTML file with the configured PDF renderer.
//!
//! Usage: html_to_pdf <input.html> <output.pdf> [--config FILE]

use clap::Parser;
use common::Config;
use std::path::PathBuf;
use tracing::{error, info};

use newsprint::export::{convert_html_file, PdfStatus};
use newsprint::pdf::Wkhtmltopdf;

#[derive(Parser, Debug)]
#[command(name = "html_to_pdf", about = "Render an HTML file to PDF with wkhtmltopdf")]
struct Args {
    input: PathBuf,
    output: PathBuf,

    /// Config file providing the [pdf] section; built-in defaults otherwise
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let pdf_config = match args.config {
        Some(path) => match Config::from_file(&path).await {
            Ok(cfg) => cfg.pdf,
            Err(e) => {
                error!("failed to load {}: {:#}", path.display(), e);
                return;
            }
        },
        None => Default::default(),
    };

    if !args.input.exists() {
        error!(path = %args.input.display(), "input HTML file not found");
        return;
    }

    let renderer = Wkhtmltopdf::from_config(&pdf_config);
    match convert_html_file(&renderer, &args.input, &args.output).await {
        PdfStatus::Created => info!("wrote {}", args.output.display()),
        status => error!(?status, "conversion did not produce a PDF"),
    }
}
