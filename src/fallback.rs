//! Canned articles served whenever the provider cannot be used.

use chrono::{DateTime, Duration, Utc};

use crate::models::{Article, NewsResponse, Source};

const PLACEHOLDER_CONTENT: &str = "Full article content would be here...";

/// Build the fallback payload with timestamps relative to `now`.
pub fn payload(now: DateTime<Utc>) -> NewsResponse {
    let articles = vec![
        Article {
            title: "Breaking: Major Technology Breakthrough Announced".to_string(),
            description: Some(
                "Scientists have made a significant discovery that could revolutionize the tech \
                 industry. This breakthrough promises to change how we interact with technology \
                 in our daily lives."
                    .to_string(),
            ),
            content: Some(PLACEHOLDER_CONTENT.to_string()),
            url: "https://example.com/article1".to_string(),
            image: Some("https://source.unsplash.com/400x200/?technology".to_string()),
            published_at: now,
            source: Source {
                name: "Tech News Daily".to_string(),
                url: "https://technewsdaily.com".to_string(),
            },
        },
        Article {
            title: "Global Climate Summit Reaches Historic Agreement".to_string(),
            description: Some(
                "World leaders have come together to sign a groundbreaking climate agreement \
                 that sets ambitious targets for carbon reduction over the next decade."
                    .to_string(),
            ),
            content: Some(PLACEHOLDER_CONTENT.to_string()),
            url: "https://example.com/article2".to_string(),
            image: Some("https://source.unsplash.com/400x200/?climate".to_string()),
            published_at: now - Duration::hours(1),
            source: Source {
                name: "Global News Network".to_string(),
                url: "https://globalnews.com".to_string(),
            },
        },
        Article {
            title: "Sports Championship Finals Draw Record Viewership".to_string(),
            description: Some(
                "The championship finals have broken all previous viewership records, with \
                 millions of fans tuning in from around the world to watch the historic match."
                    .to_string(),
            ),
            content: Some(PLACEHOLDER_CONTENT.to_string()),
            url: "https://example.com/article3".to_string(),
            image: Some("https://source.unsplash.com/400x200/?sports".to_string()),
            published_at: now - Duration::hours(2),
            source: Source {
                name: "Sports Central".to_string(),
                url: "https://sportscentral.com".to_string(),
            },
        },
    ];

    NewsResponse {
        total_articles: articles.len() as u64,
        articles,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_has_three_complete_articles() {
        let response = payload(Utc::now());

        assert_eq!(response.total_articles, 3);
        assert_eq!(response.articles.len(), 3);
        for article in &response.articles {
            assert!(!article.title.is_empty());
            assert!(article.description.as_deref().is_some_and(|d| !d.is_empty()));
            assert!(!article.url.is_empty());
            assert!(!article.source.name.is_empty());
        }
    }

    #[test]
    fn test_timestamps_step_back_an_hour() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let response = payload(now);

        assert_eq!(response.articles[0].published_at, now);
        assert_eq!(
            response.articles[1].published_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 11, 0, 0).unwrap()
        );
        assert_eq!(
            response.articles[2].published_at,
            Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_serialized_shape() {
        let value = serde_json::to_value(payload(Utc::now())).unwrap();

        assert_eq!(value["totalArticles"], 3);
        assert_eq!(value["articles"].as_array().unwrap().len(), 3);
        assert_eq!(value["articles"][2]["source"]["name"], "Sports Central");
        assert!(value["articles"][0]["publishedAt"].is_string());
    }
}
