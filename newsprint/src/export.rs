//! The export run: select today's articles, render them and hand the HTML to the PDF renderer.
//!
//! [`run`] propagates errors; [`convert_to_pdf`] is the entry point callers use and never fails.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use common::Config;
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::digest;
use crate::pdf::PdfRenderer;
use crate::render::{self, PostRenderer};
use crate::store;

/// Everything an export run needs.
pub struct ExportContext {
    pub pool: SqlitePool,
    pub config: Config,
    pub pdf: Arc<dyn PdfRenderer>,
}

impl ExportContext {
    pub fn new(pool: SqlitePool, config: Config, pdf: Arc<dyn PdfRenderer>) -> Self {
        Self { pool, config, pdf }
    }
}

/// Result of the conversion step.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfStatus {
    Created,
    /// The renderer reported success but nothing is at the output path.
    /// `Wkhtmltopdf` already fails in that case; this covers other `PdfRenderer`s.
    NotCreated,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportReport {
    pub html_path: PathBuf,
    pub pdf_path: PathBuf,
    /// Number of article pages in the HTML document
    pub pages: usize,
    pub pdf: PdfStatus,
}

/// How a run ended. Every variant except `Exported` means no files were written by this run.
#[derive(Debug, Clone, PartialEq)]
pub enum ExportOutcome {
    NoArticles,
    NoSummaries,
    HtmlMissing(PathBuf),
    Exported(ExportReport),
    Failed(String),
}

/// Export the digest for `day`, logging instead of returning errors.
pub async fn convert_to_pdf(ctx: &ExportContext, day: NaiveDate) -> ExportOutcome {
    match run(ctx, day).await {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("An error occurred: {:#}", e);
            ExportOutcome::Failed(format!("{:#}", e))
        }
    }
}

/// Export the digest for `day`. Conversion failures are folded into the report,
/// anything before that is returned as an error.
pub async fn run(ctx: &ExportContext, day: NaiveDate) -> Result<ExportOutcome> {
    let cfg = &ctx.config;

    let articles =
        store::fetch_flagged_articles(&ctx.pool, &cfg.database, day, cfg.selection.limit).await?;
    if articles.is_empty() {
        info!(%day, "No original articles found for today.");
        return Ok(ExportOutcome::NoArticles);
    }

    let ids: Vec<i64> = articles.iter().map(|a| a.news_id).collect();
    let summaries = store::fetch_summaries(&ctx.pool, &cfg.database, &ids).await?;
    if summaries.is_empty() {
        info!(%day, "No summarized articles found for today.");
        return Ok(ExportOutcome::NoSummaries);
    }

    let entries = digest::combine(&articles, summaries, &digest::crawled_date(day));
    info!(
        articles = articles.len(),
        entries = entries.len(),
        "export: combined articles with summaries"
    );

    let renderer = PostRenderer::from_dir(&cfg.paths.templates_path(), &cfg.paths.template)?;
    let pages = render::render_pages(&renderer, &entries, &cfg.paths.static_url);
    if pages.is_empty() {
        warn!("export: no article pages rendered, writing an empty document");
    }

    let html_path = cfg.paths.html_path();
    write_html(&html_path, &render::join_pages(&pages)).await?;

    if tokio::fs::metadata(&html_path).await.is_err() {
        error!(path = %html_path.display(), "HTML file was not created.");
        return Ok(ExportOutcome::HtmlMissing(html_path));
    }

    let pdf_path = cfg.paths.pdf_path();
    let pdf = convert_html_file(ctx.pdf.as_ref(), &html_path, &pdf_path).await;

    Ok(ExportOutcome::Exported(ExportReport {
        html_path,
        pdf_path,
        pages: pages.len(),
        pdf,
    }))
}

async fn write_html(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    tokio::fs::write(path, html)
        .await
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = html.len(), "export: HTML written");
    Ok(())
}

/// Convert `html` into `pdf`, logging the result. Never fails.
pub async fn convert_html_file(renderer: &dyn PdfRenderer, html: &Path, pdf: &Path) -> PdfStatus {
    match render_pdf(renderer, html, pdf).await {
        Ok(()) => {
            if tokio::fs::metadata(pdf).await.is_ok() {
                info!(path = %pdf.display(), "PDF file was created successfully.");
                PdfStatus::Created
            } else {
                warn!(path = %pdf.display(), "PDF file was not created.");
                PdfStatus::NotCreated
            }
        }
        Err(e) => {
            error!("PDF conversion failed: {:#}", e);
            PdfStatus::Failed(format!("{:#}", e))
        }
    }
}

async fn render_pdf(renderer: &dyn PdfRenderer, html: &Path, pdf: &Path) -> Result<()> {
    if let Some(parent) = pdf.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create output directory {}", parent.display()))?;
    }
    renderer.convert(html, pdf).await
}
