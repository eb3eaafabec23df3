use anyhow::{Context, Result};
use common::PdfConfig;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Converts an HTML file on disk into a PDF file.
#[async_trait::async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn convert(&self, html: &Path, pdf: &Path) -> Result<()>;
}

/// Command-line switches passed to wkhtmltopdf.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfOptions {
    pub quiet: bool,
    pub enable_local_file_access: bool,
    pub no_stop_slow_scripts: bool,
    pub margin_top: String,
    pub margin_bottom: String,
    pub margin_left: String,
    pub margin_right: String,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self::from_config(&PdfConfig::default())
    }
}

impl PdfOptions {
    pub fn from_config(config: &PdfConfig) -> Self {
        Self {
            quiet: true,
            enable_local_file_access: true,
            no_stop_slow_scripts: true,
            margin_top: config.margin_top.clone(),
            margin_bottom: config.margin_bottom.clone(),
            margin_left: config.margin_left.clone(),
            margin_right: config.margin_right.clone(),
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.quiet {
            args.push("--quiet".to_string());
        }
        if self.enable_local_file_access {
            args.push("--enable-local-file-access".to_string());
        }
        if self.no_stop_slow_scripts {
            args.push("--no-stop-slow-scripts".to_string());
        }
        for (flag, value) in [
            ("--margin-top", &self.margin_top),
            ("--margin-bottom", &self.margin_bottom),
            ("--margin-left", &self.margin_left),
            ("--margin-right", &self.margin_right),
        ] {
            args.push(flag.to_string());
            args.push(value.clone());
        }
        args
    }
}

/// Runs the external wkhtmltopdf binary.
#[derive(Debug, Clone)]
pub struct Wkhtmltopdf {
    binary: PathBuf,
    options: PdfOptions,
    timeout: Option<Duration>,
}

impl Wkhtmltopdf {
    pub fn new(binary: impl Into<PathBuf>, options: PdfOptions) -> Self {
        Self {
            binary: binary.into(),
            options,
            timeout: None,
        }
    }

    pub fn from_config(config: &PdfConfig) -> Self {
        Self::new(&config.wkhtmltopdf, PdfOptions::from_config(config))
            .with_timeout(config.timeout_seconds.map(Duration::from_secs))
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full argument list for one conversion: switches, then input and output paths.
    pub fn command_args(&self, html: &Path, pdf: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = self.options.to_args().into_iter().map(OsString::from).collect();
        args.push(html.as_os_str().to_owned());
        args.push(pdf.as_os_str().to_owned());
        args
    }
}

#[async_trait::async_trait]
impl PdfRenderer for Wkhtmltopdf {
    async fn convert(&self, html: &Path, pdf: &Path) -> Result<()> {
        let args = self.command_args(html, pdf);
        debug!(binary = %self.binary.display(), ?args, "pdf: spawning renderer");

        let mut command = tokio::process::Command::new(&self.binary);
        command.args(&args).kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, command.output())
                .await
                .with_context(|| format!("{} timed out after {:?}", self.binary.display(), limit))?,
            None => command.output().await,
        }
        .with_context(|| format!("failed to run {}", self.binary.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            );
        }

        let size = tokio::fs::metadata(pdf)
            .await
            .with_context(|| format!("renderer produced no file at {}", pdf.display()))?
            .len();
        if size == 0 {
            anyhow::bail!("renderer produced an empty file at {}", pdf.display());
        }

        info!(bytes = size, path = %pdf.display(), "pdf: conversion finished");
        Ok(())
    }
}
