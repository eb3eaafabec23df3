use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use common::DatabaseConfig;
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

/// A news article as written by the ingestion system.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Article {
    pub news_id: i64,
    pub title: String,
    /// Publication date as scraped from the source, free-form text
    pub date: Option<String>,
    pub image: Option<String>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub crucial: bool,
    pub created_dt: NaiveDateTime,
}

/// Three-sentence summary produced for an article.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Summary {
    pub news_id: i64,
    pub first_sentence: Option<String>,
    pub second_sentence: Option<String>,
    pub third_sentence: Option<String>,
}

/// Fetch up to `limit` articles flagged as crucial and created on `day`.
///
/// `created_dt` is shifted by `tables.utc_offset_minutes` before its calendar date is
/// compared, so UTC timestamps can be matched against a local day.
pub async fn fetch_flagged_articles(
    pool: &SqlitePool,
    tables: &DatabaseConfig,
    day: NaiveDate,
    limit: u32,
) -> Result<Vec<Article>> {
    let sql = format!(
        r#"
        SELECT news_id, title, date, image, link, description, crucial, created_dt
        FROM {}
        WHERE date(created_dt, ?) = ? AND crucial = 1
        ORDER BY news_id
        LIMIT ?
        "#,
        tables.articles_table
    );

    let articles = sqlx::query_as::<_, Article>(&sql)
        .bind(format!("{:+} minutes", tables.utc_offset_minutes))
        .bind(day)
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await
        .with_context(|| format!("failed to fetch flagged articles for {}", day))?;

    debug!(count = articles.len(), %day, "store: flagged articles fetched");
    Ok(articles)
}

/// Fetch every summary whose article id is in `ids`.
pub async fn fetch_summaries(
    pool: &SqlitePool,
    tables: &DatabaseConfig,
    ids: &[i64],
) -> Result<Vec<Summary>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
        "SELECT news_id, first_sentence, second_sentence, third_sentence FROM {} WHERE news_id IN (",
        tables.summaries_table
    ));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(*id);
    }
    separated.push_unseparated(")");

    let summaries = qb
        .build_query_as::<Summary>()
        .fetch_all(pool)
        .await
        .context("failed to fetch article summaries")?;

    debug!(count = summaries.len(), "store: summaries fetched");
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_db() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("Failed to create in-memory sqlite pool");

        sqlx::query(
            r#"
            CREATE TABLE newApp_news (
                news_id INTEGER PRIMARY KEY AUTOINCREMENT,
                title VARCHAR(255) NOT NULL,
                date VARCHAR(64),
                image VARCHAR(500),
                link VARCHAR(500),
                description TEXT,
                crucial BOOLEAN NOT NULL DEFAULT 0,
                created_dt DATETIME NOT NULL
            );
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();

        // Timestamps as the content system writes them: UTC, microseconds
        for (title, created) in [
            ("late evening utc", "2026-10-17 20:30:00.123456"),
            ("midday utc", "2026-10-18 03:00:00.000000"),
            ("next day kst", "2026-10-18 16:00:00.000000"),
        ] {
            sqlx::query("INSERT INTO newApp_news (title, crucial, created_dt) VALUES (?, 1, ?)")
                .bind(title)
                .bind(created)
                .execute(&pool)
                .await
                .unwrap();
        }

        pool
    }

    fn tables(utc_offset_minutes: i32) -> DatabaseConfig {
        DatabaseConfig {
            path: "unused.db".to_string(),
            articles_table: "newApp_news".to_string(),
            summaries_table: "newApp_summarizenews".to_string(),
            utc_offset_minutes,
        }
    }

    fn titles(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.title.as_str()).collect()
    }

    #[tokio::test]
    async fn test_day_matches_stored_date_without_offset() {
        let pool = setup_test_db().await;
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        let articles = fetch_flagged_articles(&pool, &tables(0), day, 5).await.unwrap();
        assert_eq!(titles(&articles), vec!["midday utc", "next day kst"]);
    }

    #[tokio::test]
    async fn test_day_is_taken_in_configured_zone() {
        let pool = setup_test_db().await;
        let day = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();

        // KST: 20:30 UTC on the 17th is 05:30 on the 18th, 16:00 UTC on the 18th is the 19th
        let articles = fetch_flagged_articles(&pool, &tables(540), day, 5).await.unwrap();
        assert_eq!(titles(&articles), vec!["late evening utc", "midday utc"]);
    }

    #[tokio::test]
    async fn test_empty_id_list_skips_query() {
        let pool = setup_test_db().await;
        // No summaries table exists, so reaching the database would fail
        let summaries = fetch_summaries(&pool, &tables(0), &[]).await.unwrap();
        assert!(summaries.is_empty());
    }
}
