//! Wire types shared by the proxy endpoint and the browser client.
//!
//! Field names follow the provider's camelCase JSON so upstream bodies can be
//! validated against these types and forwarded as-is.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub published_at: DateTime<Utc>,
    pub source: Source,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsResponse {
    pub total_articles: u64,
    pub articles: Vec<Article>,
}

/// Provider categories. `General` is the sentinel for "no category filter".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    General,
    World,
    Nation,
    Business,
    Technology,
    Entertainment,
    Sports,
    Science,
    Health,
}

impl Category {
    pub const ALL: [Category; 9] = [
        Category::General,
        Category::World,
        Category::Nation,
        Category::Business,
        Category::Technology,
        Category::Entertainment,
        Category::Sports,
        Category::Science,
        Category::Health,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::General => "general",
            Category::World => "world",
            Category::Nation => "nation",
            Category::Business => "business",
            Category::Technology => "technology",
            Category::Entertainment => "entertainment",
            Category::Sports => "sports",
            Category::Science => "science",
            Category::Health => "health",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::General => "General",
            Category::World => "World",
            Category::Nation => "Nation",
            Category::Business => "Business",
            Category::Technology => "Technology",
            Category::Entertainment => "Entertainment",
            Category::Sports => "Sports",
            Category::Science => "Science",
            Category::Health => "Health",
        }
    }

    /// Whether this category narrows results (everything but the sentinel).
    pub fn is_filter(&self) -> bool {
        *self != Category::General
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// Normalized news filters.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewsQuery {
    pub q: Option<String>,
    pub category: Category,
}

impl NewsQuery {
    /// Build filters from raw values. Blank search text counts as no search.
    pub fn new(q: Option<&str>, category: Category) -> Self {
        Self {
            q: q.filter(|q| !q.is_empty()).map(str::to_string),
            category,
        }
    }

    pub fn is_search(&self) -> bool {
        self.q.is_some()
    }

    /// Filter parameters as they go on the wire. The sentinel category is
    /// left out.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(q) = &self.q {
            params.push(("q", q.clone()));
        }
        if self.category.is_filter() {
            params.push(("category", self.category.as_str().to_string()));
        }
        params
    }
}

/// Display format for article timestamps, e.g. `Jan 2, 2024, 03:04 PM`.
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%b %-d, %Y, %I:%M %p").to_string()
}
