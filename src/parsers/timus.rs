// src/parsers/timus.rs

//! Timus Online Judge page parsing.
//!
//! Author pages carry the name in `h2.author_name` and a statistics table of
//! `td.author_stats_name` / `td.author_stats_value` pairs. Search results are
//! a `table.ranklist` whose header row names the columns.

use scraper::{ElementRef, Html};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{AccountHandle, PlatformId, SearchHit, UserInfo};
use crate::parsers::{element_text, selector};
use crate::utils::{leading_number, query_param};

const PLATFORM: PlatformId = PlatformId::Timus;

/// Phrases Timus uses on the page served for an unknown author id.
const AUTHOR_MISSING: [&str; 2] = ["author not found", "no such author"];

/// Phrases Timus uses when a search matches nobody.
const SEARCH_EMPTY: [&str; 2] = ["nothing found", "no authors found"];

/// Parse an author page (`author.aspx?id={id}`).
///
/// The "no such author" page yields a `NotFound` profile rather than an
/// error.
pub fn parse_user_page(id: &AccountHandle, html: &str) -> Result<UserInfo> {
    let document = Html::parse_document(html);

    let name_sel = selector(PLATFORM, "h2.author_name")?;
    let Some(name) = document
        .select(&name_sel)
        .next()
        .map(|el| element_text(&el))
        .filter(|name| !name.is_empty())
    else {
        let text = element_text(&document.root_element()).to_lowercase();
        if AUTHOR_MISSING.iter().any(|phrase| text.contains(phrase)) {
            return Ok(UserInfo::not_found(PLATFORM, id.clone()));
        }
        return Err(AppError::parse(PLATFORM, "author page without author name"));
    };

    let mut info = UserInfo::new(PLATFORM, id.clone(), name);

    let row_sel = selector(PLATFORM, "tr")?;
    let label_sel = selector(PLATFORM, "td.author_stats_name")?;
    let value_sel = selector(PLATFORM, "td.author_stats_value")?;

    for row in document.select(&row_sel) {
        let (Some(label), Some(value)) = (
            row.select(&label_sel).next(),
            row.select(&value_sel).next(),
        ) else {
            continue;
        };
        let label = element_text(&label).to_lowercase();
        let value = element_text(&value);

        if label.starts_with("problems solved") {
            info.solved = leading_number(&value);
        } else if label.starts_with("rating") {
            info.rating = leading_number(&value).and_then(|n| i32::try_from(n).ok());
        }
    }

    Ok(info)
}

/// Parse a search results page (`search.aspx?Str={query}`).
///
/// Rows keep the order Timus lists them in.
pub fn parse_search_page(html: &str) -> Result<Vec<SearchHit>> {
    let document = Html::parse_document(html);
    let table_sel = selector(PLATFORM, "table.ranklist")?;

    let Some(table) = document.select(&table_sel).next() else {
        let text = element_text(&document.root_element()).to_lowercase();
        if SEARCH_EMPTY.iter().any(|phrase| text.contains(phrase)) {
            return Ok(Vec::new());
        }
        return Err(AppError::parse(PLATFORM, "search page without result table"));
    };

    let columns = Columns::from_table(&table)?;

    // Relative links only need a base to resolve against.
    let base = Url::parse("https://timus.online/")?;
    let row_sel = selector(PLATFORM, "tr.content")?;
    let cell_sel = selector(PLATFORM, "td")?;
    let link_sel = selector(PLATFORM, "a[href*=\"author.aspx\"]")?;

    let mut hits = Vec::new();
    for row in table.select(&row_sel) {
        let Some(link) = row.select(&link_sel).next() else {
            continue;
        };
        let Some(handle) = link
            .value()
            .attr("href")
            .and_then(|href| query_param(&base, href, "id"))
        else {
            continue;
        };

        let cells: Vec<String> = row.select(&cell_sel).map(|td| element_text(&td)).collect();
        let cell = |index: Option<usize>| index.and_then(|i| cells.get(i)).map(String::as_str);

        hits.push(SearchHit {
            handle,
            display_name: element_text(&link),
            rating: cell(columns.rating)
                .and_then(leading_number)
                .and_then(|n| i32::try_from(n).ok()),
            solved: cell(columns.solved).and_then(leading_number),
        });
    }

    Ok(hits)
}

/// Column positions read from the ranklist header.
#[derive(Debug, Default)]
struct Columns {
    rating: Option<usize>,
    solved: Option<usize>,
}

impl Columns {
    fn from_table(table: &ElementRef<'_>) -> Result<Self> {
        let header_sel = selector(PLATFORM, "tr.header td, tr.header th, tr:first-child th")?;
        let mut columns = Columns::default();

        for (i, cell) in table.select(&header_sel).enumerate() {
            let label = element_text(&cell).to_lowercase();
            if label.contains("solved") {
                columns.solved.get_or_insert(i);
            } else if label.contains("rating") {
                columns.rating.get_or_insert(i);
            }
        }
        Ok(columns)
    }
}
