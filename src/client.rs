//! Browser-side state machine for searching and filtering news.
//!
//! [`BrowserState`] owns the UI state and decides when a request has to be
//! issued; [`NewsBrowser`] pairs it with a [`NewsSource`] and awaits each
//! request it asks for. Every request carries a sequence number so that a
//! response overtaken by a newer request is dropped instead of clobbering
//! the newer result.

use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::fetcher::Fetcher;
use crate::models::{format_date, Article, Category, NewsQuery, NewsResponse};

/// Message shown when the news request itself fails.
pub const FETCH_FAILED: &str = "Failed to fetch news";

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Failed to fetch news")]
    Status(StatusCode),
    #[error("Failed to fetch news: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Failed to read news: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Anything the browser can ask for articles.
#[allow(async_fn_in_trait)]
pub trait NewsSource {
    async fn fetch_news(&self, query: &NewsQuery) -> Result<NewsResponse, ClientError>;
}

/// Calls the proxy in-process, skipping the HTTP hop.
impl NewsSource for Fetcher {
    async fn fetch_news(&self, query: &NewsQuery) -> Result<NewsResponse, ClientError> {
        Ok(self.fetch_or_fallback(query).await.into_news()?)
    }
}

/// Calls a running `/api/news` endpoint over HTTP.
pub struct HttpSource {
    client: Client,
    endpoint: String,
}

impl HttpSource {
    pub fn new(server: &str) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("MerpatiNews/1.0 (Terminal Client)")
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/api/news", server.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl NewsSource for HttpSource {
    async fn fetch_news(&self, query: &NewsQuery) -> Result<NewsResponse, ClientError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&query.params())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

/// A request the state machine wants issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: NewsQuery,
}

#[derive(Debug, Default)]
pub struct BrowserState {
    search_query: String,
    search_input: String,
    category: Category,
    articles: Vec<Article>,
    loading: bool,
    error: Option<String>,
    latest: u64,
}

impl BrowserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with filters already committed, e.g. taken from a page URL.
    pub fn with_filters(q: &str, category: Category) -> Self {
        Self {
            search_query: q.to_string(),
            search_input: q.to_string(),
            category,
            ..Self::default()
        }
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn search_input(&self) -> &str {
        &self.search_input
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn articles(&self) -> &[Article] {
        &self.articles
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Filters of the next request.
    pub fn query(&self) -> NewsQuery {
        NewsQuery::new(Some(&self.search_query), self.category)
    }

    pub fn mount(&mut self) -> FetchTicket {
        self.begin()
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.search_input = input.into();
    }

    /// Commit the draft. Only a changed query triggers a request.
    pub fn submit(&mut self) -> Option<FetchTicket> {
        if self.search_input == self.search_query {
            return None;
        }
        self.search_query = self.search_input.clone();
        Some(self.begin())
    }

    /// Switch category. Only a changed category triggers a request.
    pub fn select_category(&mut self, category: Category) -> Option<FetchTicket> {
        if category == self.category {
            return None;
        }
        self.category = category;
        Some(self.begin())
    }

    /// Re-issue the current request unchanged.
    pub fn retry(&mut self) -> FetchTicket {
        self.begin()
    }

    fn begin(&mut self) -> FetchTicket {
        self.loading = true;
        self.error = None;
        self.latest += 1;
        FetchTicket {
            seq: self.latest,
            query: self.query(),
        }
    }

    /// Apply the outcome of request `seq`. Returns false when the response
    /// is stale and was dropped.
    pub fn complete(&mut self, seq: u64, result: Result<NewsResponse, ClientError>) -> bool {
        if seq != self.latest {
            debug!(seq, latest = self.latest, "Discarding stale news response");
            return false;
        }

        match result {
            Ok(response) => {
                self.articles = response.articles;
                self.error = None;
            }
            Err(e) => {
                self.articles.clear();
                self.error = Some(e.to_string());
            }
        }
        self.loading = false;
        true
    }

    /// Result line shown above the grid, e.g. `3 articles found for "rust" in Technology`.
    pub fn summary(&self) -> String {
        let mut summary = format!("{} articles found", self.articles.len());
        if !self.search_query.is_empty() {
            summary.push_str(&format!(" for \"{}\"", self.search_query));
        }
        if self.category.is_filter() {
            summary.push_str(&format!(" in {}", self.category.label()));
        }
        summary
    }

    pub fn view(&self) -> View<'_> {
        if self.loading {
            View::Loading
        } else if let Some(message) = &self.error {
            View::Error { message }
        } else if self.articles.is_empty() {
            View::Empty {
                summary: self.summary(),
            }
        } else {
            View::Articles {
                summary: self.summary(),
                articles: &self.articles,
            }
        }
    }
}

/// What the page shows for a given state. Exactly one of these at a time.
#[derive(Debug, PartialEq)]
pub enum View<'a> {
    Loading,
    Error { message: &'a str },
    Empty { summary: String },
    Articles { summary: String, articles: &'a [Article] },
}

impl fmt::Display for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Loading => writeln!(f, "Loading news..."),
            View::Error { message } => {
                writeln!(f, "Error loading news")?;
                writeln!(f, "{}", message)?;
                writeln!(f, "Type /retry to try again.")
            }
            View::Empty { summary } => {
                writeln!(f, "{}", summary)?;
                writeln!(f)?;
                writeln!(f, "No articles found")?;
                writeln!(f, "Try adjusting your search terms or category filter")
            }
            View::Articles { summary, articles } => {
                writeln!(f, "{}", summary)?;
                for (i, article) in articles.iter().enumerate() {
                    writeln!(f)?;
                    writeln!(f, "{:>2}. {}", i + 1, article.title)?;
                    writeln!(
                        f,
                        "    {} | {}",
                        article.source.name,
                        format_date(&article.published_at)
                    )?;
                    if let Some(description) = &article.description {
                        writeln!(f, "    {}", description)?;
                    }
                    writeln!(f, "    {}", article.url)?;
                }
                Ok(())
            }
        }
    }
}

/// Drives a [`BrowserState`] against a [`NewsSource`], awaiting every
/// request the state asks for.
pub struct NewsBrowser<S> {
    source: S,
    state: BrowserState,
}

impl<S: NewsSource> NewsBrowser<S> {
    pub fn new(source: S) -> Self {
        Self::with_state(source, BrowserState::new())
    }

    pub fn with_state(source: S, state: BrowserState) -> Self {
        Self { source, state }
    }

    pub fn state(&self) -> &BrowserState {
        &self.state
    }

    pub fn into_state(self) -> BrowserState {
        self.state
    }

    pub async fn mount(&mut self) {
        let ticket = self.state.mount();
        self.dispatch(ticket).await;
    }

    pub async fn search(&mut self, input: &str) {
        self.state.set_input(input);
        if let Some(ticket) = self.state.submit() {
            self.dispatch(ticket).await;
        }
    }

    pub async fn select_category(&mut self, category: Category) {
        if let Some(ticket) = self.state.select_category(category) {
            self.dispatch(ticket).await;
        }
    }

    pub async fn retry(&mut self) {
        let ticket = self.state.retry();
        self.dispatch(ticket).await;
    }

    async fn dispatch(&mut self, ticket: FetchTicket) {
        let result = self.source.fetch_news(&ticket.query).await;
        self.state.complete(ticket.seq, result);
    }
}
