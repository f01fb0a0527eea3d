//! Supply chain news from NewsAPI and the fixed product trend feed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use guardian_core::config::NewsConfig;
use guardian_core::domain::market::{NewsArticle, ProductTrend};
use guardian_core::domain::weather::DataOrigin;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{ensure_success, ExternalError};

const SERVICE: &str = "newsapi";
const PAGE_SIZE: &str = "10";

pub const DEFAULT_KEYWORDS: &[&str] = &["supply chain", "port strike", "shipping delay", "logistics"];

#[async_trait]
pub trait NewsSource: Send + Sync {
    fn origin(&self) -> DataOrigin;

    async fn supply_chain_news(&self, keywords: &[&str]) -> Vec<NewsArticle>;

    async fn product_trends(&self, category: &str) -> Vec<ProductTrend>;
}

pub fn news_source(config: &NewsConfig) -> Arc<dyn NewsSource> {
    match &config.api_key {
        Some(key) if !key.expose_secret().trim().is_empty() => {
            info!(event_name = "external.news.mode", mode = "live", "news client configured");
            Arc::new(NewsApiClient::new(config.base_url.clone(), key.clone(), config.timeout_secs))
        }
        _ => {
            warn!(
                event_name = "external.news.mode",
                mode = "mock",
                "NEWS_API_KEY not set; using mock news data"
            );
            Arc::new(MockNews)
        }
    }
}

const MOCK_HEADLINES: &[(&str, &str, &str)] = &[
    (
        "Cyclone approaching Indian west coast, Mumbai and Kochi ports suspend operations",
        "Port authorities halted container handling as the storm intensified over the Arabian Sea.",
        "Maritime Daily",
    ),
    (
        "Port workers strike spreads across Southeast Asian terminals",
        "Unions at several terminals walked out, stranding outbound cargo for a second week.",
        "Freight Wire",
    ),
    (
        "West African port congestion causes cocoa shipping delays",
        "Vessels are queuing outside Tema and Abidjan as cocoa exports back up.",
        "Commodity Watch",
    ),
    (
        "Vanilla prices ease after strong Madagascar harvest",
        "Spot prices for cured vanilla beans fell for the third consecutive month.",
        "Spice Market Report",
    ),
];

/// Offline news and trend data.
#[derive(Clone, Copy, Debug, Default)]
pub struct MockNews;

impl MockNews {
    pub fn articles(&self, now: DateTime<Utc>) -> Vec<NewsArticle> {
        MOCK_HEADLINES
            .iter()
            .zip(0_i64..)
            .map(|((title, description, source), age)| NewsArticle {
                title: (*title).to_string(),
                description: (*description).to_string(),
                source: (*source).to_string(),
                published_at: now - chrono::Duration::days(age),
                url: String::new(),
            })
            .collect()
    }

    pub fn trends(&self) -> Vec<ProductTrend> {
        vec![
            ProductTrend {
                product: "Monk Fruit Sweetener".to_string(),
                trend_score: 92,
                growth_rate: "+45%".to_string(),
                reasoning: "Sugar-free baking demand keeps climbing".to_string(),
            },
            ProductTrend {
                product: "Coconut Sugar".to_string(),
                trend_score: 87,
                growth_rate: "+38%".to_string(),
                reasoning: "Shoppers switching to lower-glycemic sweeteners".to_string(),
            },
            ProductTrend {
                product: "Vanilla Bean Paste".to_string(),
                trend_score: 84,
                growth_rate: "+32%".to_string(),
                reasoning: "Premium home baking is driving specialty flavorings".to_string(),
            },
        ]
    }
}

#[async_trait]
impl NewsSource for MockNews {
    fn origin(&self) -> DataOrigin {
        DataOrigin::Mock
    }

    async fn supply_chain_news(&self, _keywords: &[&str]) -> Vec<NewsArticle> {
        self.articles(Utc::now())
    }

    async fn product_trends(&self, _category: &str) -> Vec<ProductTrend> {
        self.trends()
    }
}

pub struct NewsApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl NewsApiClient {
    pub fn new(base_url: String, api_key: SecretString, timeout_secs: u64) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self { client, base_url: base_url.trim_end_matches('/').to_string(), api_key }
    }

    pub async fn fetch_articles(&self, keywords: &[&str]) -> Result<Vec<NewsArticle>, ExternalError> {
        let keywords = if keywords.is_empty() { DEFAULT_KEYWORDS } else { keywords };
        let query = keywords.join(" OR ");
        let response = self
            .client
            .get(format!("{}/everything", self.base_url))
            .query(&[
                ("q", query.as_str()),
                ("language", "en"),
                ("sortBy", "publishedAt"),
                ("pageSize", PAGE_SIZE),
                ("apiKey", self.api_key.expose_secret()),
            ])
            .send()
            .await
            .map_err(ExternalError::request(SERVICE))?;
        let payload: EverythingPayload = ensure_success(SERVICE, response)
            .await?
            .json()
            .await
            .map_err(ExternalError::decode(SERVICE))?;

        if payload.status != "ok" {
            return Err(ExternalError::Decode {
                service: SERVICE,
                message: format!("unexpected status `{}`", payload.status),
            });
        }

        Ok(payload
            .articles
            .into_iter()
            .map(|article| NewsArticle {
                title: article.title.unwrap_or_default(),
                description: article.description.unwrap_or_default(),
                source: article.source.name.unwrap_or_else(|| "unknown".to_string()),
                published_at: article
                    .published_at
                    .as_deref()
                    .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or_else(Utc::now),
                url: article.url.unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl NewsSource for NewsApiClient {
    fn origin(&self) -> DataOrigin {
        DataOrigin::Live
    }

    async fn supply_chain_news(&self, keywords: &[&str]) -> Vec<NewsArticle> {
        match self.fetch_articles(keywords).await {
            Ok(articles) => articles,
            Err(error) => {
                warn!(
                    event_name = "external.news.fallback",
                    error = %error,
                    "news request failed; using mock articles"
                );
                MockNews.articles(Utc::now())
            }
        }
    }

    // No live trend feed exists.
    async fn product_trends(&self, _category: &str) -> Vec<ProductTrend> {
        MockNews.trends()
    }
}

#[derive(Debug, Deserialize)]
struct EverythingPayload {
    status: String,
    #[serde(default)]
    articles: Vec<ArticlePayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ArticlePayload {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<String>,
    source: SourcePayload,
}

#[derive(Debug, Deserialize)]
struct SourcePayload {
    name: Option<String>,
}
