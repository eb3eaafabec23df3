use anyhow::{Context as _, Result};
use scraper::{Html, Selector};
use std::path::Path;
use tera::{Context, Tera};
use tracing::{debug, warn};

use crate::digest::DigestEntry;

/// Separator placed between two article documents in the combined file.
pub const PAGE_BREAK: &str = r#"<div style="page-break-after: always;"></div>"#;

/// Icon font referenced by the article template.
pub const ICON_FONT_URL: &str = "https://use.fontawesome.com/releases/v6.3.0/css/all.css";

/// Renders digest entries through the article template.
pub struct PostRenderer {
    tera: Tera,
    template_name: String,
}

impl PostRenderer {
    /// Load `template_name` from `templates_dir`. The directory path is used as-is, never as a glob.
    pub fn from_dir(templates_dir: &Path, template_name: &str) -> Result<Self> {
        let path = templates_dir.join(template_name);
        if !path.is_file() {
            anyhow::bail!(
                "template {} not found in {}",
                template_name,
                templates_dir.display()
            );
        }

        let mut tera = Tera::default();
        tera.add_template_file(&path, Some(template_name))
            .with_context(|| format!("failed to load template {}", path.display()))?;

        Ok(Self {
            tera,
            template_name: template_name.to_string(),
        })
    }

    /// Build a renderer from template source held in memory.
    pub fn from_raw(template_name: &str, source: &str) -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_template(template_name, source)
            .with_context(|| format!("failed to parse template {}", template_name))?;
        Ok(Self {
            tera,
            template_name: template_name.to_string(),
        })
    }

    /// Render the template for a single entry. The template sees it as the only item of `articles`.
    pub fn render_entry(&self, entry: &DigestEntry) -> Result<String> {
        let mut context = Context::new();
        context.insert("articles", std::slice::from_ref(entry));
        self.tera
            .render(&self.template_name, &context)
            .with_context(|| format!("failed to render {} for {:?}", self.template_name, entry.title))
    }
}

/// The part of a rendered article kept for the PDF.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    /// Outer HTML of the first `.main-content` element
    pub main_content: String,
    /// Text of the first `<style>` element, empty when there is none
    pub inline_styles: String,
}

/// Pull the main-content subtree and inline styles out of rendered markup.
/// Returns `None` when no element carries the `main-content` class.
pub fn extract_fragment(html: &str) -> Option<Fragment> {
    let document = Html::parse_document(html);

    let main_selector = Selector::parse(".main-content").ok()?;
    let main_content = document.select(&main_selector).next()?.html();

    let inline_styles = Selector::parse("style")
        .ok()
        .and_then(|selector| {
            document
                .select(&selector)
                .next()
                .map(|style| style.text().collect::<String>())
        })
        .unwrap_or_default();

    Some(Fragment {
        main_content,
        inline_styles,
    })
}

/// Wrap a fragment into a standalone page with the print layout rules.
pub fn wrap_document(fragment: &Fragment, static_url: &str) -> String {
    format!(
        r#"
<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>Main Content</title>
    <link rel="stylesheet" href="{static_url}css/styles.css">
    <link rel="stylesheet" href="{icon_font}">
    <style>
        {inline_styles}
        body {{
            font-family: 'Roboto', sans-serif;
            display: flex;
            justify-content: center;
            align-items: center;
            margin: 0;
            padding: 0;
        }}
        .main-content {{
            transform: scale(0.7);
            transform-origin: center top;
            width: 70%;
            margin: auto;
            padding-top: 50px;
        }}
        .section-heading {{
            margin-top: 50px;
            text-align: center;
            display: block;
        }}
        .post-image {{
            margin-top: 20px;
            width: 100%;
            border-radius: 15px;
            display: block;
            margin-left: auto;
            margin-right: auto;
        }}
        .article-link {{
            margin-top: 10px;
            text-align: center;
            font-size: 0.7em;
            color: gray;
        }}
        .article-summary {{
            margin-top: 20px;
            padding: 20px;
            background-color: #fff;
            border-radius: 15px;
            box-shadow: 0 0 10px rgba(0, 0, 0, 0.1);
            line-height: 1.6;
        }}
        .article-summary p {{
            margin: 10px 0;
        }}
        .mb-4 {{
            margin-bottom: 2rem;
        }}
    </style>
</head>
<body>
    <div class="main-content">
        {main_content}
    </div>
</body>
</html>
"#,
        static_url = static_url,
        icon_font = ICON_FONT_URL,
        inline_styles = fragment.inline_styles,
        main_content = fragment.main_content,
    )
}

/// Concatenate article documents with a page break between each pair.
pub fn join_pages(pages: &[String]) -> String {
    pages.join(PAGE_BREAK)
}

/// Render, extract and wrap every entry. Entries that fail to render or
/// lack a main-content element are logged and left out.
pub fn render_pages(renderer: &PostRenderer, entries: &[DigestEntry], static_url: &str) -> Vec<String> {
    let mut pages = Vec::with_capacity(entries.len());

    for entry in entries {
        let rendered = match renderer.render_entry(entry) {
            Ok(html) => html,
            Err(e) => {
                warn!("render: skipping {:?}: {:#}", entry.title, e);
                continue;
            }
        };

        match extract_fragment(&rendered) {
            Some(fragment) => {
                debug!(title = %entry.title, "render: main content extracted");
                pages.push(wrap_document(&fragment, static_url));
            }
            None => {
                warn!(title = %entry.title, "No main-content found in HTML.");
            }
        }
    }

    pages
}
