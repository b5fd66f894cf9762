use std::sync::Arc;

use askama::Template;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::{Datelike, Utc};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::warn;

use crate::client::{BrowserState, NewsBrowser, View, FETCH_FAILED};
use crate::fetcher::{Fetcher, NewsFeed};
use crate::models::{format_date, Article, Category, NewsQuery};

/// Response header telling callers whether `/api/news` served provider
/// data (`live`) or the canned articles (`fallback`).
pub const NEWS_SOURCE_HEADER: &str = "x-news-source";

pub struct AppState {
    pub fetcher: Fetcher,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/articles", get(articles))
        .route("/api/news", get(news))
        .route("/health", get(health))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// Template structs
#[derive(Template)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub q: String,
    pub category: &'static str,
    pub categories: Vec<CategoryOption>,
    pub articles_url: String,
    /// Shown client-side when the `/articles` request itself fails
    pub message: &'static str,
    pub retry_url: String,
    pub year: i32,
}

pub struct CategoryOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Template)]
#[template(path = "articles.html")]
pub struct ArticlesTemplate {
    pub loading: bool,
    pub error: Option<String>,
    pub summary: String,
    pub articles: Vec<ArticleCard>,
    pub retry_url: String,
}

pub struct ArticleCard {
    pub title: String,
    pub description: Option<String>,
    pub url: String,
    pub image: Option<String>,
    pub source_name: String,
    pub published: String,
}

impl From<&Article> for ArticleCard {
    fn from(article: &Article) -> Self {
        Self {
            title: article.title.clone(),
            description: article.description.clone().filter(|d| !d.is_empty()),
            url: article.url.clone(),
            image: article.image.clone().filter(|i| !i.is_empty()),
            source_name: article.source.name.clone(),
            published: format_date(&article.published_at),
        }
    }
}

impl ArticlesTemplate {
    fn from_view(view: View<'_>, retry_url: String) -> Self {
        let mut template = Self {
            loading: false,
            error: None,
            summary: String::new(),
            articles: Vec::new(),
            retry_url,
        };

        match view {
            View::Loading => template.loading = true,
            View::Error { message } => template.error = Some(message.to_string()),
            View::Empty { summary } => template.summary = summary,
            View::Articles { summary, articles } => {
                template.summary = summary;
                template.articles = articles.iter().map(ArticleCard::from).collect();
            }
        }

        template
    }
}

// Wrapper for HTML responses
struct HtmlTemplate<T>(T);

impl<T: Template> IntoResponse for HtmlTemplate<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(html) => Html(html).into_response(),
            Err(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to render template: {}", err),
            )
                .into_response(),
        }
    }
}

impl IntoResponse for NewsFeed {
    fn into_response(self) -> Response {
        let headers = [(NEWS_SOURCE_HEADER, self.source_label())];
        match self {
            NewsFeed::Live(body) => (headers, Json(body)).into_response(),
            NewsFeed::Fallback(response) => (headers, Json(response)).into_response(),
        }
    }
}

/// Raw filter parameters. Both are free-form strings so that extraction
/// itself never rejects a request.
#[derive(Debug, Default, Deserialize)]
pub struct NewsParams {
    pub q: Option<String>,
    pub category: Option<String>,
}

impl NewsParams {
    /// Normalize into a [`NewsQuery`]. Unknown categories mean no filter.
    pub fn into_query(self) -> NewsQuery {
        let category = match self.category.as_deref().filter(|c| !c.is_empty()) {
            None => Category::General,
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!("Ignoring category filter: {}", e);
                Category::General
            }),
        };
        NewsQuery::new(self.q.as_deref(), category)
    }
}

fn params_of(query: Option<Query<NewsParams>>) -> NewsQuery {
    query.map(|Query(params)| params).unwrap_or_default().into_query()
}

fn articles_url(query: &NewsQuery) -> String {
    let params = query.params();
    if params.is_empty() {
        return "/articles".to_string();
    }
    match serde_urlencoded::to_string(&params) {
        Ok(encoded) => format!("/articles?{}", encoded),
        Err(_) => "/articles".to_string(),
    }
}

// Route handlers
pub async fn index(query: Option<Query<NewsParams>>) -> impl IntoResponse {
    let query = params_of(query);

    let categories = Category::ALL
        .into_iter()
        .map(|category| CategoryOption {
            value: category.as_str(),
            label: category.label(),
            selected: category == query.category,
        })
        .collect();

    let url = articles_url(&query);
    HtmlTemplate(IndexTemplate {
        q: query.q.clone().unwrap_or_default(),
        category: query.category.as_str(),
        categories,
        articles_url: url.clone(),
        message: FETCH_FAILED,
        retry_url: url,
        year: Utc::now().year(),
    })
}

/// Article grid fragment, produced by running the browser state machine
/// against the in-process fetcher.
pub async fn articles(
    State(state): State<Arc<AppState>>,
    query: Option<Query<NewsParams>>,
) -> impl IntoResponse {
    let query = params_of(query);
    let initial = BrowserState::with_filters(query.q.as_deref().unwrap_or_default(), query.category);

    let mut browser = NewsBrowser::with_state(state.fetcher.clone(), initial);
    browser.mount().await;

    let state = browser.into_state();
    HtmlTemplate(ArticlesTemplate::from_view(state.view(), articles_url(&query)))
}

/// Proxy endpoint. Always answers 200; provider trouble is masked by the
/// fallback payload.
pub async fn news(
    State(state): State<Arc<AppState>>,
    query: Option<Query<NewsParams>>,
) -> impl IntoResponse {
    let query = params_of(query);
    state.fetcher.fetch_or_fallback(&query).await
}

pub async fn health() -> impl IntoResponse {
    Html("OK")
}
