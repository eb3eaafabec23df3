use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;

use crate::store::{Article, Summary};

/// Summary sentences exposed to the template as `article.summary.*`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SummarySentences {
    pub first_sentence: String,
    pub second_sentence: String,
    pub third_sentence: String,
}

/// One article joined with its summary, shaped for template rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestEntry {
    pub title: String,
    pub date: String,
    pub image: String,
    pub link: String,
    pub description: String,
    pub summary: SummarySentences,
    pub crawled_date: String,
}

/// Run date in the compact form the template prints, e.g. `20261018`.
pub fn crawled_date(day: NaiveDate) -> String {
    day.format("%Y%m%d").to_string()
}

/// Pair each article with its summary, keeping article order.
/// Articles without a summary are dropped.
pub fn combine(articles: &[Article], summaries: Vec<Summary>, crawled_date: &str) -> Vec<DigestEntry> {
    let mut by_id: HashMap<i64, Summary> = summaries
        .into_iter()
        .map(|s| (s.news_id, s))
        .collect();

    articles
        .iter()
        .filter_map(|article| {
            let summary = by_id.remove(&article.news_id)?;
            Some(DigestEntry {
                title: article.title.clone(),
                date: article.date.clone().unwrap_or_default(),
                image: article.image.clone().unwrap_or_default(),
                link: article.link.clone().unwrap_or_default(),
                description: article.description.clone().unwrap_or_default(),
                summary: SummarySentences {
                    first_sentence: summary.first_sentence.unwrap_or_default(),
                    second_sentence: summary.second_sentence.unwrap_or_default(),
                    third_sentence: summary.third_sentence.unwrap_or_default(),
                },
                crawled_date: crawled_date.to_string(),
            })
        })
        .collect()
}
