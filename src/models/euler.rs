// src/models/euler.rs

//! Project Euler archive records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A news post from the archive's news page or RSS feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsEntry {
    pub title: String,

    /// Plain-text body
    #[serde(default)]
    pub body: String,

    #[serde(default)]
    pub published: Option<DateTime<Utc>>,

    #[serde(default)]
    pub link: Option<String>,
}

/// A row of the "recent problems" table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentProblem {
    pub id: u32,
    pub title: String,

    #[serde(default)]
    pub solved_by: Option<u32>,
}

/// A single problem page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemInfo {
    pub id: u32,
    pub title: String,

    /// Problem statement as plain text
    #[serde(default)]
    pub text: String,
}
