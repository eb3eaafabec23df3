/*
newsprint - main.rs
Exports the day's flagged articles and their summaries to an HTML file and a PDF.
The process always exits successfully; failures are reported through the log.
*/

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Parser;
use common::{init_db_pool, Config};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use newsprint::export::{self, ExportContext, ExportOutcome, PdfStatus};
use newsprint::pdf::Wkhtmltopdf;

#[derive(Parser, Debug)]
#[command(name = "newsprint", about = "Export today's flagged articles and summaries to PDF")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Export this day instead of today (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    date: Option<NaiveDate>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Parse CLI args
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    if let Err(e) = run(args).await {
        error!("An error occurred: {:#}", e);
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config).await?;

    let db_path_abs = match tokio::fs::canonicalize(&config.database.path).await {
        Ok(p) => p.to_string_lossy().to_string(),
        Err(_) => config.database.path.clone(),
    };
    info!(db_path = %db_path_abs, "resolved DB path");
    let pool = init_db_pool(&db_path_abs).await?;

    let day = args.date.unwrap_or_else(|| Local::now().date_naive());
    info!(%day, "exporting daily digest");

    let renderer = Arc::new(Wkhtmltopdf::from_config(&config.pdf));
    let ctx = ExportContext::new(pool, config, renderer);

    match export::convert_to_pdf(&ctx, day).await {
        ExportOutcome::Exported(report) => {
            let pdf = match report.pdf {
                PdfStatus::Created => "created".to_string(),
                PdfStatus::NotCreated => "missing".to_string(),
                PdfStatus::Failed(reason) => format!("failed ({})", reason),
            };
            info!(
                pages = report.pages,
                html = %report.html_path.display(),
                pdf_path = %report.pdf_path.display(),
                "export finished, PDF {}",
                pdf
            );
        }
        other => info!(outcome = ?other, "export finished without output"),
    }

    ctx.pool.close().await;
    Ok(())
}

/// Merge `config.default.toml` with the `--config` file, or `config.toml` when none is given.
async fn load_config(config: Option<PathBuf>) -> Result<Config> {
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = config {
        if !p.exists() {
            anyhow::bail!("Config file not found: {}", p.display());
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() { Some(p) } else { None }
    };

    let config = Config::load_with_defaults(
        default_path.exists().then(|| default_path.as_path()),
        override_path.as_deref(),
    )
    .await?;
    info!(default = ?default_path, override_file = ?override_path, "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_flag_overrides_today() {
        let args = Args::try_parse_from(["newsprint", "--date", "2026-10-18"]).expect("parse args");
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2026, 10, 18));

        let args = Args::try_parse_from(["newsprint"]).expect("parse args");
        assert!(args.date.is_none());
        assert_eq!(args.log_level, "info");

        assert!(Args::try_parse_from(["newsprint", "--date", "18/10/2026"]).is_err());
    }

    #[tokio::test]
    async fn missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope.toml");

        let err = load_config(Some(missing)).await.expect_err("missing config");
        assert!(err.to_string().contains("Config file not found"));
    }

    #[tokio::test]
    async fn run_reports_config_errors_instead_of_panicking() {
        let dir = tempfile::tempdir().expect("tempdir");
        let args = Args {
            config: Some(dir.path().join("nope.toml")),
            date: None,
            log_level: "info".to_string(),
        };

        // main() only logs this error, so the process still exits 0
        assert!(run(args).await.is_err());
    }

    #[tokio::test]
    async fn explicit_config_file_is_loaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("site.toml");
        std::fs::write(&path, "[database]\npath = \"site.db\"\nutc_offset_minutes = 540\n")
            .expect("write config");

        let config = load_config(Some(path)).await.expect("load config");
        assert_eq!(config.database.path, "site.db");
        assert_eq!(config.database.utc_offset_minutes, 540);
    }
}
