use std::time::{SystemTime, UNIX_EPOCH};

use sqlx::sqlite::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::models::CheckRow;
use crate::error::Result;
use crate::types::{AnalysisResult, Category, CheckSummary, NormalizedRecord, Recommendation, StoredCheck};

/// History filter. Unrecognized values are dropped, not rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HistoryFilter {
    pub category: Option<Category>,
    pub recommendation: Option<Recommendation>,
}

impl HistoryFilter {
    pub fn from_params(category: Option<&str>, recommendation: Option<&str>) -> Self {
        Self {
            category: category.and_then(Category::parse),
            recommendation: recommendation.and_then(Recommendation::parse),
        }
    }
}

/// Append-only store of completed checks. No update or delete path.
#[derive(Clone)]
pub struct CheckStore {
    pool: SqlitePool,
}

impl CheckStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the SQLite file and apply migrations.
    pub async fn open(db_path: &str) -> Result<Self> {
        let pool = SqlitePool::connect(&format!("sqlite:{db_path}?mode=rwc")).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database ready at {db_path}");
        Ok(Self::new(pool))
    }

    #[cfg(test)]
    /// Single-connection in-memory store; each connection would otherwise
    /// get its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self::new(pool))
    }

    pub async fn create(
        &self,
        record: &NormalizedRecord,
        analysis: &AnalysisResult,
        currency: &str,
    ) -> Result<StoredCheck> {
        let check = StoredCheck {
            id: Uuid::new_v4().to_string(),
            category: record.category,
            source: record.source.clone(),
            source_url: record.source_url.clone(),
            title: record.title.clone(),
            current_price: record.price,
            currency: currency.to_string(),
            raw_input_excerpt: record.raw_input_excerpt.clone(),
            analysis: analysis.clone(),
            created_at: now_ms(),
        };
        let reasons = serde_json::to_string(&check.analysis.reasons)?;

        sqlx::query(
            r#"
            INSERT INTO price_checks (
                id, category, source_url, source_name, title, current_price, currency,
                raw_input, fair_price_low, fair_price_high, surge_score, recommendation,
                confidence_score, insight_summary, best_time_to_buy, reasons, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&check.id)
        .bind(check.category.as_str())
        .bind(&check.source_url)
        .bind(&check.source)
        .bind(&check.title)
        .bind(check.current_price)
        .bind(&check.currency)
        .bind(&check.raw_input_excerpt)
        .bind(check.analysis.fair_price_low)
        .bind(check.analysis.fair_price_high)
        .bind(check.analysis.surge_score)
        .bind(check.analysis.recommendation.as_str())
        .bind(check.analysis.confidence_score)
        .bind(&check.analysis.insight_summary)
        .bind(&check.analysis.best_time_to_buy)
        .bind(&reasons)
        .bind(check.created_at)
        .execute(&self.pool)
        .await?;

        Ok(check)
    }

    /// Newest first.
    pub async fn find_many(
        &self,
        filter: HistoryFilter,
        skip: i64,
        take: i64,
    ) -> Result<Vec<CheckSummary>> {
        let rows = sqlx::query_as::<_, CheckRow>(
            r#"
            SELECT * FROM price_checks
            WHERE (?1 IS NULL OR category = ?1)
              AND (?2 IS NULL OR recommendation = ?2)
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.recommendation.map(|r| r.as_str()))
        .bind(take)
        .bind(skip)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(CheckRow::into_summary).collect())
    }

    pub async fn count(&self, filter: HistoryFilter) -> Result<i64> {
        let n: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM price_checks
            WHERE (?1 IS NULL OR category = ?1)
              AND (?2 IS NULL OR recommendation = ?2)
            "#,
        )
        .bind(filter.category.map(|c| c.as_str()))
        .bind(filter.recommendation.map(|r| r.as_str()))
        .fetch_one(&self.pool)
        .await?;
        Ok(n)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<StoredCheck>> {
        let row = sqlx::query_as::<_, CheckRow>("SELECT * FROM price_checks WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(StoredCheck::from))
    }
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::oracle::unconfigured_placeholder;

    pub(crate) fn record(category: Category, price: f64) -> NormalizedRecord {
        NormalizedRecord {
            category,
            source: "Amazon".to_string(),
            title: format!("Item {price}"),
            price,
            source_url: Some("https://www.amazon.in/dp/1".to_string()),
            raw_input_excerpt: Some("https://www.amazon.in/dp/1".to_string()),
        }
    }

    pub(crate) async fn seeded_store(n: usize) -> CheckStore {
        let store = CheckStore::in_memory().await.unwrap();
        for i in 0..n {
            let price = 100.0 + i as f64;
            store
                .create(&record(Category::Product, price), &unconfigured_placeholder(price), "INR")
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn create_then_find_by_id() {
        let store = CheckStore::in_memory().await.unwrap();
        let mut analysis = unconfigured_placeholder(500.0);
        analysis.reasons = vec!["a".to_string(), "b".to_string()];
        let created = store
            .create(&record(Category::Hotel, 500.0), &analysis, "INR")
            .await
            .unwrap();

        let found = store.find_by_id(&created.id).await.unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.analysis.reasons, vec!["a".to_string(), "b".to_string()]);
        assert!(store.find_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn paging_is_newest_first() {
        let store = seeded_store(12).await;
        let all = HistoryFilter::default();
        assert_eq!(store.count(all).await.unwrap(), 12);

        let page2 = store.find_many(all, 5, 5).await.unwrap();
        assert_eq!(page2.len(), 5);
        assert_eq!(page2[0].current_price, 106.0);

        let page3 = store.find_many(all, 10, 5).await.unwrap();
        assert_eq!(page3.len(), 2);
        assert_eq!(page3[1].current_price, 100.0);
    }

    #[tokio::test]
    async fn filters_by_category_and_recommendation() {
        let store = seeded_store(3).await;
        let mut wait = unconfigured_placeholder(900.0);
        wait.recommendation = Recommendation::Wait;
        store.create(&record(Category::Flight, 900.0), &wait, "INR").await.unwrap();

        let flights = HistoryFilter::from_params(Some("flight"), None);
        assert_eq!(store.count(flights).await.unwrap(), 1);
        let items = store.find_many(flights, 0, 10).await.unwrap();
        assert_eq!(items[0].category, Category::Flight);

        let waiting = HistoryFilter::from_params(None, Some("wait"));
        assert_eq!(store.count(waiting).await.unwrap(), 1);

        let neutral_products = HistoryFilter::from_params(Some("product"), Some("neutral"));
        assert_eq!(store.count(neutral_products).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn unrecognized_filter_values_are_ignored() {
        let store = seeded_store(2).await;
        let filter = HistoryFilter::from_params(Some("boat"), Some("panic"));
        assert_eq!(filter, HistoryFilter::default());
        assert_eq!(store.count(filter).await.unwrap(), 2);
    }
}
