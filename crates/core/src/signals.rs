//! Market signal rules: event severity, product suggestions, competitor profile.

use crate::domain::alert::Severity;
use crate::domain::market::{
    CompetitorProfile, NewsArticle, ProductSuggestion, ProductTrend, SuggestionAction,
    SupplyChainEvent,
};
use crate::domain::product::Product;

const HIGH_SEVERITY_TERMS: &[&str] = &["cyclone", "hurricane", "strike", "shutdown"];
const MEDIUM_SEVERITY_TERMS: &[&str] = &["delay", "warning", "congestion"];
const SUGGEST_SCORE: u32 = 85;
const HIGH_PRIORITY_SCORE: u32 = 90;

pub fn event_severity(title: &str) -> Severity {
    let title = title.to_lowercase();
    if HIGH_SEVERITY_TERMS.iter().any(|term| title.contains(term)) {
        Severity::High
    } else if MEDIUM_SEVERITY_TERMS.iter().any(|term| title.contains(term)) {
        Severity::Medium
    } else {
        Severity::Low
    }
}

pub fn classify_events(articles: Vec<NewsArticle>) -> Vec<SupplyChainEvent> {
    articles
        .into_iter()
        .map(|article| SupplyChainEvent {
            severity: event_severity(&article.title),
            title: article.title,
            description: article.description,
            source: article.source,
            published_at: article.published_at,
        })
        .collect()
}

/// A trend is new unless one of its words already appears in a stocked product name.
pub fn is_new_line(trend: &ProductTrend, products: &[Product]) -> bool {
    let words: Vec<String> =
        trend.product.split_whitespace().map(|word| word.to_lowercase()).collect();
    !products.iter().any(|product| {
        let name = product.name.to_lowercase();
        words.iter().any(|word| name.contains(word.as_str()))
    })
}

pub fn suggest_products(
    trends: &[ProductTrend],
    products: &[Product],
    category: &str,
) -> Vec<ProductSuggestion> {
    trends
        .iter()
        .filter_map(|trend| {
            let is_new = is_new_line(trend, products);
            if !is_new && trend.trend_score <= SUGGEST_SCORE {
                return None;
            }

            Some(ProductSuggestion {
                product_name: trend.product.clone(),
                category: category.to_string(),
                trend_score: trend.trend_score,
                growth_rate: trend.growth_rate.clone(),
                reasoning: trend.reasoning.clone(),
                recommendation: if is_new {
                    SuggestionAction::AddToInventory
                } else {
                    SuggestionAction::IncreaseStock
                },
                priority: if trend.trend_score > HIGH_PRIORITY_SCORE {
                    Severity::High
                } else {
                    Severity::Medium
                },
            })
        })
        .collect()
}

pub fn competitor_profile(category: &str) -> CompetitorProfile {
    CompetitorProfile {
        category: category.to_string(),
        market_competition: Severity::High,
        supply_availability: Severity::Medium,
        price_trend: "Stable".to_string(),
        key_competitors: vec![
            "Golden Mill Co".to_string(),
            "PantryWorks".to_string(),
            "Artisan Supply Group".to_string(),
        ],
        risks: vec![
            "Crowded private-label baking segment".to_string(),
            "Vanilla and cocoa harvest volatility".to_string(),
            "Price pressure from bulk importers".to_string(),
        ],
        opportunities: vec![
            "Rising demand for plant-based baking".to_string(),
            "Premium organic ingredients growth".to_string(),
            "Direct-to-bakery subscription channels".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{classify_events, event_severity, is_new_line, suggest_products};
    use crate::domain::alert::Severity;
    use crate::domain::market::{NewsArticle, ProductTrend, SuggestionAction};
    use crate::domain::product::{Product, ProductId};

    fn product(name: &str) -> Product {
        Product {
            id: ProductId(1),
            sku: "SKU".to_string(),
            name: name.to_string(),
            category: "Baking".to_string(),
            current_stock: 10,
            avg_daily_sale: Decimal::ONE,
            price: Decimal::ONE,
            reorder_threshold: 10,
            warehouse_location: "Warehouse A".to_string(),
            supplier_location: "Mumbai, India".to_string(),
            lead_time_days: 7,
            last_updated: Utc::now(),
        }
    }

    fn trend(name: &str, score: u32) -> ProductTrend {
        ProductTrend {
            product: name.to_string(),
            trend_score: score,
            growth_rate: "+10%".to_string(),
            reasoning: "demand".to_string(),
        }
    }

    #[test]
    fn event_severity_prefers_high_terms() {
        assert_eq!(event_severity("Cyclone warning for west coast"), Severity::High);
        assert_eq!(event_severity("Port congestion eases"), Severity::Medium);
        assert_eq!(event_severity("Quarterly demand report"), Severity::Low);
    }

    #[test]
    fn classified_events_keep_article_fields() {
        let events = classify_events(vec![NewsArticle {
            title: "Dock workers strike".to_string(),
            description: "Ports closed".to_string(),
            source: "Maritime News".to_string(),
            published_at: Utc::now(),
            url: "https://example.invalid/a".to_string(),
        }]);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].severity, Severity::High);
        assert_eq!(events[0].source, "Maritime News");
    }

    #[test]
    fn overlapping_names_are_not_new_lines() {
        let stocked = [product("Cane Sugar")];
        assert!(!is_new_line(&trend("Coconut Sugar", 87), &stocked));
        assert!(is_new_line(&trend("Oat Milk Powder", 92), &stocked));
    }

    #[test]
    fn suggestions_follow_novelty_and_score_rules() {
        let stocked = [product("Cane Sugar"), product("Vanilla Extract")];
        let trends = [
            trend("Oat Milk Powder", 92),
            trend("Coconut Sugar", 87),
            trend("Vanilla Bean Paste", 84),
            trend("Rye Flakes", 60),
        ];

        let suggestions = suggest_products(&trends, &stocked, "Baking");
        let names: Vec<&str> = suggestions.iter().map(|s| s.product_name.as_str()).collect();
        assert_eq!(names, vec!["Oat Milk Powder", "Coconut Sugar", "Rye Flakes"]);

        assert_eq!(suggestions[0].priority, Severity::High);
        assert_eq!(suggestions[0].recommendation, SuggestionAction::AddToInventory);
        assert_eq!(suggestions[1].recommendation, SuggestionAction::IncreaseStock);
        assert_eq!(suggestions[1].priority, Severity::Medium);
    }
}
