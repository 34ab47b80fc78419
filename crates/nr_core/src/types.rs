use serde::{Deserialize, Serialize};
use std::fmt;

/// One article pulled out of a listing page.
///
/// `title` and `url` are always non-empty and `url` is absolute; the optional
/// text fields serialize as empty strings rather than being dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRecord {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

/// A fetch strategy in the escalation chain, cheapest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Direct,
    Challenge,
    Browser,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Direct => "direct",
            Tier::Challenge => "challenge",
            Tier::Browser => "browser",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a pipeline run produced, and where it came from.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapeReport {
    pub records: Vec<ArticleRecord>,
    pub layout: Option<String>,
    pub tier: Option<Tier>,
}

impl ScrapeReport {
    pub fn empty() -> Self {
        Self::default()
    }
}
