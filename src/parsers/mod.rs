//! Payload parsers.
//!
//! Pure functions turning raw HTML, JSON or RSS returned by the platform
//! clients into normalized records. No network access, no shared state:
//! the same bytes always produce the same result, so every parser is
//! tested against fixed fixtures.
//!
//! An empty result set is a valid empty result. `AppError::Parse` is
//! reserved for payloads that do not look like the page or document the
//! parser expects (site redesign, maintenance page, CAPTCHA wall).

pub mod codechef;
pub mod codeforces;
pub mod euler;
pub mod timus;

use scraper::{ElementRef, Selector};

use crate::error::{AppError, Result};
use crate::models::PlatformId;
use crate::utils::clean_text;

/// Parse a CSS selector, reporting failures against `platform`.
pub(crate) fn selector(platform: PlatformId, s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::parse(platform, format!("selector '{s}': {e:?}")))
}

/// Whitespace-normalized text content of an element.
pub(crate) fn element_text(element: &ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<String>())
}
