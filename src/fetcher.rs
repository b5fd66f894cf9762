use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use reqwest::header::ACCEPT;
use reqwest::{Client, Request, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::fallback;
use crate::models::{NewsQuery, NewsResponse};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("GNEWS_API_KEY is missing")]
    MissingCredential,
    #[error("provider returned {0}")]
    Status(StatusCode),
    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider payload rejected: {0}")]
    Payload(#[from] serde_json::Error),
}

/// Result of a proxied lookup. `Live` carries the provider body untouched.
#[derive(Debug, Clone)]
pub enum NewsFeed {
    Live(Value),
    Fallback(NewsResponse),
}

impl NewsFeed {
    pub fn is_fallback(&self) -> bool {
        matches!(self, NewsFeed::Fallback(_))
    }

    pub fn source_label(&self) -> &'static str {
        match self {
            NewsFeed::Live(_) => "live",
            NewsFeed::Fallback(_) => "fallback",
        }
    }

    pub fn into_news(self) -> Result<NewsResponse, serde_json::Error> {
        match self {
            NewsFeed::Live(value) => serde_json::from_value(value),
            NewsFeed::Fallback(response) => Ok(response),
        }
    }
}

#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    config: Arc<Config>,
}

impl Fetcher {
    pub fn new(config: Arc<Config>) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .user_agent("MerpatiNews/1.0 (News Proxy)")
            .build()?;

        Ok(Self { client, config })
    }

    /// Provider path for a query: searches go to `search`, everything else
    /// to `top-headlines`.
    pub fn endpoint(query: &NewsQuery) -> &'static str {
        if query.is_search() {
            "search"
        } else {
            "top-headlines"
        }
    }

    pub fn build_request(&self, query: &NewsQuery) -> Result<Request, FetchError> {
        let token = self
            .config
            .api_key
            .as_deref()
            .ok_or(FetchError::MissingCredential)?;
        let upstream = &self.config.upstream;

        let url = format!(
            "{}/{}",
            upstream.base_url.trim_end_matches('/'),
            Self::endpoint(query)
        );

        let mut params = vec![
            ("token", token.to_string()),
            ("lang", upstream.lang.clone()),
            ("country", upstream.country.clone()),
            ("max", upstream.max.to_string()),
        ];
        params.extend(query.params());

        let request = self
            .client
            .get(url)
            .header(ACCEPT, "application/json")
            .query(&params)
            .build()?;

        Ok(request)
    }

    /// Query the provider and return its body once it has been checked
    /// against the `NewsResponse` shape.
    pub async fn fetch(&self, query: &NewsQuery) -> Result<Value, FetchError> {
        let request = self.build_request(query)?;
        info!(
            endpoint = Self::endpoint(query),
            category = %query.category,
            "Fetching news from provider"
        );

        let response = self.client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let bytes = response.bytes().await?;
        let body: Value = serde_json::from_slice(&bytes)?;
        NewsResponse::deserialize(&body)?;

        Ok(body)
    }

    /// Like [`Fetcher::fetch`], but every failure is replaced by the
    /// fallback payload.
    pub async fn fetch_or_fallback(&self, query: &NewsQuery) -> NewsFeed {
        match self.fetch(query).await {
            Ok(body) => NewsFeed::Live(body),
            Err(FetchError::MissingCredential) => {
                warn!("GNEWS_API_KEY is missing, serving fallback articles");
                NewsFeed::Fallback(fallback::payload(Utc::now()))
            }
            Err(e) => {
                error!("News API error, serving fallback articles: {}", e);
                NewsFeed::Fallback(fallback::payload(Utc::now()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Category;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_fetcher(base_url: &str, api_key: Option<&str>) -> Fetcher {
        let mut config = Config::default().with_api_key(api_key.map(str::to_string));
        config.upstream.base_url = base_url.to_string();
        Fetcher::new(Arc::new(config)).unwrap()
    }

    fn query_pairs(request: &Request) -> HashMap<String, String> {
        request.url().query_pairs().into_owned().collect()
    }

    fn provider_body() -> Value {
        serde_json::json!({
            "totalArticles": 1,
            "articles": [{
                "title": "Live article",
                "description": "From the provider",
                "content": "Body",
                "url": "https://live.example.com/1",
                "image": null,
                "publishedAt": "2024-12-09T12:00:00Z",
                "source": { "name": "Live", "url": "https://live.example.com" }
            }]
        })
    }

    mod build_request_tests {
        use super::*;

        #[test]
        fn test_search_endpoint_when_query_present() {
            let fetcher = create_fetcher("https://gnews.io/api/v4", Some("key"));
            let query = NewsQuery::new(Some("technology"), Category::General);

            let request = fetcher.build_request(&query).unwrap();

            assert_eq!(request.url().path(), "/api/v4/search");
            assert_eq!(query_pairs(&request).get("q").map(String::as_str), Some("technology"));
        }

        #[test]
        fn test_top_headlines_without_query() {
            let fetcher = create_fetcher("https://gnews.io/api/v4", Some("key"));
            let query = NewsQuery::new(None, Category::Sports);

            let request = fetcher.build_request(&query).unwrap();
            let pairs = query_pairs(&request);

            assert_eq!(request.url().path(), "/api/v4/top-headlines");
            assert_eq!(pairs.get("category").map(String::as_str), Some("sports"));
            assert!(!pairs.contains_key("q"));
        }

        #[test]
        fn test_fixed_parameters() {
            let fetcher = create_fetcher("https://gnews.io/api/v4", Some("secret"));
            let request = fetcher.build_request(&NewsQuery::default()).unwrap();
            let pairs = query_pairs(&request);

            assert_eq!(pairs.get("token").map(String::as_str), Some("secret"));
            assert_eq!(pairs.get("lang").map(String::as_str), Some("en"));
            assert_eq!(pairs.get("country").map(String::as_str), Some("us"));
            assert_eq!(pairs.get("max").map(String::as_str), Some("12"));
            assert_eq!(
                request.headers().get(ACCEPT).unwrap(),
                "application/json"
            );
        }

        #[test]
        fn test_general_category_is_omitted() {
            let fetcher = create_fetcher("https://gnews.io/api/v4", Some("key"));
            let request = fetcher
                .build_request(&NewsQuery::new(None, Category::General))
                .unwrap();

            assert!(!query_pairs(&request).contains_key("category"));
        }

        #[test]
        fn test_query_is_forwarded_verbatim() {
            let fetcher = create_fetcher("https://gnews.io/api/v4", Some("key"));
            let query = NewsQuery::new(Some("rust & \"wasm\" ünïcode"), Category::Technology);

            let request = fetcher.build_request(&query).unwrap();
            let pairs = query_pairs(&request);

            assert_eq!(
                pairs.get("q").map(String::as_str),
                Some("rust & \"wasm\" ünïcode")
            );
            assert_eq!(pairs.get("category").map(String::as_str), Some("technology"));
        }

        #[test]
        fn test_trailing_slash_in_base_url() {
            let fetcher = create_fetcher("https://gnews.io/api/v4/", Some("key"));
            let request = fetcher.build_request(&NewsQuery::default()).unwrap();

            assert_eq!(request.url().path(), "/api/v4/top-headlines");
        }

        #[test]
        fn test_missing_credential() {
            let fetcher = create_fetcher("https://gnews.io/api/v4", None);
            let result = fetcher.build_request(&NewsQuery::default());

            assert!(matches!(result, Err(FetchError::MissingCredential)));
        }
    }

    mod fetch_tests {
        use super::*;

        #[tokio::test]
        async fn test_success_passes_body_through() {
            let server = MockServer::start().await;
            let mut body = provider_body();
            body["information"] = serde_json::json!({ "realTimeArticles": false });

            Mock::given(method("GET"))
                .and(path("/search"))
                .and(query_param("q", "technology"))
                .respond_with(ResponseTemplate::new(200).set_body_json(&body))
                .expect(1)
                .mount(&server)
                .await;

            let fetcher = create_fetcher(&server.uri(), Some("key"));
            let feed = fetcher
                .fetch_or_fallback(&NewsQuery::new(Some("technology"), Category::General))
                .await;

            match feed {
                NewsFeed::Live(value) => assert_eq!(value, body),
                other => panic!("expected live feed, got {:?}", other),
            }
        }

        #[tokio::test]
        async fn test_non_success_status_is_an_error() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/top-headlines"))
                .respond_with(ResponseTemplate::new(403))
                .mount(&server)
                .await;

            let fetcher = create_fetcher(&server.uri(), Some("bad-key"));
            let result = fetcher.fetch(&NewsQuery::default()).await;

            assert!(matches!(result, Err(FetchError::Status(StatusCode::FORBIDDEN))));
        }

        #[tokio::test]
        async fn test_non_success_status_falls_back() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(500))
                .mount(&server)
                .await;

            let fetcher = create_fetcher(&server.uri(), Some("key"));
            let feed = fetcher.fetch_or_fallback(&NewsQuery::default()).await;

            assert!(feed.is_fallback());
            assert_eq!(feed.into_news().unwrap().articles.len(), 3);
        }

        #[tokio::test]
        async fn test_malformed_body_falls_back() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
                .mount(&server)
                .await;

            let fetcher = create_fetcher(&server.uri(), Some("key"));
            let result = fetcher.fetch(&NewsQuery::default()).await;
            assert!(matches!(result, Err(FetchError::Payload(_))));

            let feed = fetcher.fetch_or_fallback(&NewsQuery::default()).await;
            assert!(feed.is_fallback());
        }

        #[tokio::test]
        async fn test_null_content_is_still_live() {
            let server = MockServer::start().await;
            let mut body = provider_body();
            body["articles"][0]["content"] = Value::Null;

            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_json(&body))
                .mount(&server)
                .await;

            let fetcher = create_fetcher(&server.uri(), Some("key"));
            let feed = fetcher.fetch_or_fallback(&NewsQuery::default()).await;

            assert!(!feed.is_fallback());
            let news = feed.into_news().unwrap();
            assert!(news.articles[0].content.is_none());
        }

        #[tokio::test]
        async fn test_wrong_shape_falls_back() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(serde_json::json!({ "articles": "nope" })),
                )
                .mount(&server)
                .await;

            let fetcher = create_fetcher(&server.uri(), Some("key"));
            let feed = fetcher.fetch_or_fallback(&NewsQuery::default()).await;

            assert!(feed.is_fallback());
        }

        #[tokio::test]
        async fn test_missing_credential_skips_network() {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .respond_with(ResponseTemplate::new(200).set_body_json(provider_body()))
                .expect(0)
                .mount(&server)
                .await;

            let fetcher = create_fetcher(&server.uri(), None);
            let feed = fetcher.fetch_or_fallback(&NewsQuery::default()).await;

            assert!(feed.is_fallback());
            assert_eq!(feed.source_label(), "fallback");
        }

        #[tokio::test]
        async fn test_unreachable_provider_falls_back() {
            // Nothing listens on port 9 on the loopback interface
            let fetcher = create_fetcher("http://127.0.0.1:9", Some("key"));
            let feed = fetcher.fetch_or_fallback(&NewsQuery::default()).await;

            assert!(feed.is_fallback());
        }
    }

    #[test]
    fn test_live_feed_into_news() {
        let feed = NewsFeed::Live(provider_body());
        assert_eq!(feed.source_label(), "live");

        let news = feed.into_news().unwrap();
        assert_eq!(news.articles[0].title, "Live article");
    }
}
