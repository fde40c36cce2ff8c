// src/parsers/euler.rs

//! Project Euler archive parsing: news page, recent problems, single
//! problem pages and the RSS feed.

use chrono::{NaiveDate, Utc};
use feed_rs::parser;
use scraper::{ElementRef, Html};

use crate::error::{AppError, Result};
use crate::models::{NewsEntry, PlatformId, ProblemInfo, RecentProblem};
use crate::parsers::{element_text, selector};
use crate::utils::{clean_text, leading_number};

const PLATFORM: PlatformId = PlatformId::ProjectEuler;

/// Date layouts used under news headlines.
const NEWS_DATE_FORMATS: [&str; 3] = ["%A, %d %B %Y", "%d %B %Y", "%d %b %Y"];

fn parse_news_date(text: &str) -> Option<chrono::DateTime<Utc>> {
    let text = text.trim();
    NEWS_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Parse the news page. Each `h3` headline starts an entry; the sibling
/// elements up to the next headline form its body. A small heading directly
/// under the headline is read as the publication date.
pub fn parse_news_page(html: &str) -> Result<Vec<NewsEntry>> {
    let document = Html::parse_document(html);
    let container_sel = selector(PLATFORM, "#news_page, #content")?;
    let Some(container) = document.select(&container_sel).next() else {
        return Err(AppError::parse(PLATFORM, "news page without content"));
    };

    let headline_sel = selector(PLATFORM, "h3")?;
    let mut entries = Vec::new();
    for headline in container.select(&headline_sel) {
        let title = element_text(&headline);
        if title.is_empty() {
            continue;
        }

        let mut published = None;
        let mut body = Vec::new();
        for sibling in headline.next_siblings().filter_map(ElementRef::wrap) {
            let name = sibling.value().name();
            if name == "h3" {
                break;
            }
            let text = element_text(&sibling);
            if body.is_empty() && published.is_none() && matches!(name, "h4" | "h5") {
                if let Some(date) = parse_news_date(&text) {
                    published = Some(date);
                    continue;
                }
            }
            if !text.is_empty() {
                body.push(text);
            }
        }

        entries.push(NewsEntry {
            title,
            body: body.join("\n"),
            published,
            link: None,
        });
    }

    Ok(entries)
}

/// Parse the "recent problems" table, newest first as listed.
pub fn parse_recent_page(html: &str) -> Result<Vec<RecentProblem>> {
    let document = Html::parse_document(html);
    let table_sel = selector(PLATFORM, "table#problems_table")?;
    let Some(table) = document.select(&table_sel).next() else {
        return Err(AppError::parse(PLATFORM, "recent page without problems table"));
    };

    let row_sel = selector(PLATFORM, "tr")?;
    let cell_sel = selector(PLATFORM, "td")?;

    let mut problems = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<String> = row.select(&cell_sel).map(|td| element_text(&td)).collect();
        // Header rows use th.
        let [id, title, rest @ ..] = cells.as_slice() else {
            continue;
        };
        let Some(id) = leading_number(id).filter(|id| *id > 0) else {
            continue;
        };
        problems.push(RecentProblem {
            id,
            title: title.clone(),
            solved_by: rest.last().and_then(|s| leading_number(s)),
        });
    }

    Ok(problems)
}

/// Parse a problem page (`problem={id}`).
pub fn parse_problem_page(id: u32, html: &str) -> Result<ProblemInfo> {
    let document = Html::parse_document(html);

    let title_sel = selector(PLATFORM, "h2")?;
    let content_sel = selector(PLATFORM, "div.problem_content")?;

    let title = document
        .select(&title_sel)
        .next()
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty());
    let content = document.select(&content_sel).next();

    let (Some(title), Some(content)) = (title, content) else {
        return Err(AppError::parse(PLATFORM, format!("problem {id} page without content")));
    };

    // Keep paragraph breaks.
    let paragraph_sel = selector(PLATFORM, "p")?;
    let paragraphs: Vec<String> = content
        .select(&paragraph_sel)
        .map(|p| element_text(&p))
        .filter(|p| !p.is_empty())
        .collect();
    let text = if paragraphs.is_empty() {
        element_text(&content)
    } else {
        paragraphs.join("\n")
    };

    Ok(ProblemInfo { id, title, text })
}

/// Parse the RSS feed into news entries, in feed order.
pub fn parse_rss(body: &[u8]) -> Result<Vec<NewsEntry>> {
    let feed = parser::parse(body)
        .map_err(|e| AppError::parse(PLATFORM, format!("invalid feed: {e}")))?;

    Ok(feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let title = clean_text(&entry.title?.content);
            let body = entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body))
                .map(|html| element_text(&Html::parse_fragment(&html).root_element()))
                .unwrap_or_default();
            Some(NewsEntry {
                title,
                body,
                published: entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.with_timezone(&Utc)),
                link: entry.links.first().map(|l| l.href.clone()),
            })
        })
        .collect())
}
