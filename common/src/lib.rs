/*!
common/src/lib.rs

Shared configuration types and DB helper functions for newsprint.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader merging a default config file with an optional override
- A helper to open the content database read-only
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Database configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the sqlite database file written by the content system (e.g. "db.sqlite3")
    pub path: String,
    /// Table holding the ingested news articles
    #[serde(default = "default_articles_table")]
    pub articles_table: String,
    /// Table holding the three-sentence summaries, keyed by article id
    #[serde(default = "default_summaries_table")]
    pub summaries_table: String,
    /// Offset from UTC, in minutes, of the zone whose calendar day selects articles.
    /// Set it when `created_dt` holds UTC timestamps (e.g. 540 for KST).
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

fn default_articles_table() -> String {
    "newApp_news".to_string()
}

fn default_summaries_table() -> String {
    "newApp_summarizenews".to_string()
}

/// Which articles make it into the daily digest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    /// Maximum number of flagged articles picked for one day
    pub limit: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { limit: 5 }
    }
}

/// Template and output locations. Relative paths are resolved against `base_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub base_dir: String,
    pub templates_dir: String,
    /// Template name relative to `templates_dir`
    pub template: String,
    /// Prefix used for the stylesheet link in the generated document
    pub static_url: String,
    pub html_file: String,
    pub pdf_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: ".".to_string(),
            templates_dir: "templates".to_string(),
            template: "newApp/post.html".to_string(),
            static_url: "/static/".to_string(),
            html_file: "newApp/static/temp_post.html".to_string(),
            pdf_file: "newApp/static/output.pdf".to_string(),
        }
    }
}

impl PathsConfig {
    fn resolve(&self, p: &str) -> PathBuf {
        let path = Path::new(p);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            Path::new(&self.base_dir).join(path)
        }
    }

    pub fn templates_path(&self) -> PathBuf {
        self.resolve(&self.templates_dir)
    }

    pub fn html_path(&self) -> PathBuf {
        self.resolve(&self.html_file)
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.resolve(&self.pdf_file)
    }
}

/// External HTML-to-PDF renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PdfConfig {
    /// wkhtmltopdf executable (bare name is looked up on PATH)
    pub wkhtmltopdf: String,
    pub margin_top: String,
    pub margin_bottom: String,
    pub margin_left: String,
    pub margin_right: String,
    pub timeout_seconds: Option<u64>,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            wkhtmltopdf: "wkhtmltopdf".to_string(),
            margin_top: "20mm".to_string(),
            margin_bottom: "20mm".to_string(),
            margin_left: "10mm".to_string(),
            margin_right: "10mm".to_string(),
            timeout_seconds: None,
        }
    }
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub pdf: PdfConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path).await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value = toml::from_str(&data)
                    .context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Table names are spliced into SQL text, so only plain identifiers are accepted.
    pub fn validate(&self) -> Result<()> {
        for table in [&self.database.articles_table, &self.database.summaries_table] {
            if !is_identifier(table) {
                anyhow::bail!("invalid table name in [database]: {:?}", table);
            }
        }
        if self.database.utc_offset_minutes.abs() > 14 * 60 {
            anyhow::bail!(
                "[database] utc_offset_minutes out of range: {}",
                self.database.utc_offset_minutes
            );
        }
        if self.selection.limit == 0 {
            anyhow::bail!("[selection] limit must be at least 1");
        }
        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Open the content database read-only.
///
/// The database belongs to the ingestion system, so a missing file is an error rather than
/// something to create. A single connection is enough for the sequential export.
///
/// Example:
///   let pool = init_db_pool("db.sqlite3").await?;
pub async fn init_db_pool(path: &str) -> Result<SqlitePool> {
    tokio::fs::metadata(path)
        .await
        .with_context(|| format!("Database file not found: {}", path))?;

    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path))?
        .read_only(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Failed to connect to sqlite database at path: {}", path))?;

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_string_uses_defaults() {
        let toml = r#"
            [database]
            path = "db.sqlite3"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.database.articles_table, "newApp_news");
        assert_eq!(cfg.database.summaries_table, "newApp_summarizenews");
        assert_eq!(cfg.database.utc_offset_minutes, 0);
        assert_eq!(cfg.selection.limit, 5);
        assert_eq!(cfg.paths.template, "newApp/post.html");
        assert_eq!(cfg.pdf.margin_top, "20mm");
        assert_eq!(cfg.pdf.margin_left, "10mm");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn paths_resolve_against_base_dir() {
        let paths = PathsConfig {
            base_dir: "/srv/site".to_string(),
            pdf_file: "/tmp/out.pdf".to_string(),
            ..PathsConfig::default()
        };
        assert_eq!(paths.html_path(), PathBuf::from("/srv/site/newApp/static/temp_post.html"));
        assert_eq!(paths.templates_path(), PathBuf::from("/srv/site/templates"));
        assert_eq!(paths.pdf_path(), PathBuf::from("/tmp/out.pdf"));
    }

    #[test]
    fn validate_rejects_bad_table_names_and_zero_limit() {
        let mut cfg: Config = toml::from_str("[database]\npath = \"x.db\"").expect("parse");
        cfg.database.articles_table = "news; DROP TABLE news".to_string();
        assert!(cfg.validate().is_err());

        cfg.database.articles_table = "news".to_string();
        cfg.selection.limit = 0;
        assert!(cfg.validate().is_err());

        cfg.selection.limit = 5;
        cfg.database.utc_offset_minutes = 540;
        assert!(cfg.validate().is_ok());
        cfg.database.utc_offset_minutes = 15 * 60;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn merge_toml_override_wins_and_keeps_siblings() {
        let mut base: toml::Value = toml::from_str(
            "[pdf]\nwkhtmltopdf = \"wkhtmltopdf\"\nmargin_top = \"20mm\"",
        )
        .expect("base");
        let over: toml::Value = toml::from_str("[pdf]\nwkhtmltopdf = \"/usr/local/bin/wkhtmltopdf\"")
            .expect("override");
        merge_toml(&mut base, over);

        let pdf = base.get("pdf").expect("pdf table");
        assert_eq!(pdf.get("wkhtmltopdf").and_then(|v| v.as_str()), Some("/usr/local/bin/wkhtmltopdf"));
        assert_eq!(pdf.get("margin_top").and_then(|v| v.as_str()), Some("20mm"));
    }

    #[tokio::test]
    async fn load_with_defaults_merges_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");
        std::fs::write(&default_path, "[database]\npath = \"default.db\"\n\n[selection]\nlimit = 5\n")
            .expect("write default");
        std::fs::write(&override_path, "[database]\npath = \"site.db\"\n").expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load");
        assert_eq!(cfg.database.path, "site.db");
        assert_eq!(cfg.selection.limit, 5);
    }

    #[tokio::test]
    async fn db_pool_requires_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("missing.db");
        assert!(init_db_pool(&missing.to_string_lossy()).await.is_err());

        let db_path = dir.path().join("content.db");
        std::fs::File::create(&db_path).expect("create db file");
        let pool = init_db_pool(&db_path.to_string_lossy()).await.expect("init pool");
        // Simple sanity: acquire a connection
        let conn = pool.acquire().await.expect("acquire conn");
        drop(conn);
    }
}
