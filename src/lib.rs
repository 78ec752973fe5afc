pub mod convert;
pub mod date_util;
pub mod error;
pub mod goals;
pub mod model;
pub mod period;
pub mod report;
pub mod scanner;
pub mod storage;

pub use convert::{Promotion, SyncReport};
pub use error::{Error, Result};
pub use goals::{GoalProgress, QuarterGoals};
pub use model::{
    ActivityKind, Contract, Customer, Goal, GoalMetric, PipelineRecord, Plan, Possibility,
    Project, Quarter, Rating, Stage, Visit,
};
pub use period::{Bucket, PeriodKind};
pub use report::{DistributionSlice, Performance, StatRow, Summary, Weights};
pub use scanner::Scanner;
pub use storage::Database;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use storage::repository;

/// Main entry point for the sales warehouse. Wraps an explicitly opened
/// database handle; every aggregate is recomputed from stored records on
/// read, so there is no materialized state to go stale.
pub struct SalesDW {
    db: Database,
}

impl SalesDW {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    fn today() -> NaiveDate {
        chrono::Local::now().date_naive()
    }

    // ── Record CRUD ────────────────────────────────────────────────

    /// Insert a record into a collection; returns the assigned id.
    pub async fn add_record<T: Serialize>(
        &self,
        collection: &'static str,
        record: &T,
    ) -> Result<i64> {
        let body = serde_json::to_value(record)?;
        self.db
            .writer()
            .call(move |conn| repository::add(conn, collection, &body))
            .await
            .map_err(convert::flatten_call_error)
    }

    pub async fn get_record(&self, collection: &'static str, id: i64) -> Result<Option<Value>> {
        self.db
            .reader()
            .call(move |conn| repository::get(conn, collection, id))
            .await
            .map_err(convert::flatten_call_error)
    }

    /// Full-record replace by id.
    pub async fn put_record<T: Serialize>(
        &self,
        collection: &'static str,
        id: i64,
        record: &T,
    ) -> Result<()> {
        let body = serde_json::to_value(record)?;
        self.db
            .writer()
            .call(move |conn| repository::put(conn, collection, id, &body))
            .await
            .map_err(convert::flatten_call_error)
    }

    pub async fn remove_record(&self, collection: &'static str, id: i64) -> Result<bool> {
        self.db
            .writer()
            .call(move |conn| repository::remove(conn, collection, id))
            .await
            .map_err(convert::flatten_call_error)
    }

    pub async fn count(&self, collection: &'static str) -> Result<i64> {
        self.db
            .reader()
            .call(move |conn| repository::count(conn, collection))
            .await
            .map_err(convert::flatten_call_error)
    }

    // ── Pipeline saves & conversion ────────────────────────────────

    /// Save a lead/prospect/target, firing the auto-convert rule.
    pub async fn save_pipeline_record(
        &self,
        collection: &'static str,
        record: PipelineRecord,
    ) -> Result<(i64, Option<Promotion>)> {
        convert::save_pipeline_record(&self.db, collection, record).await
    }

    /// Explicit pipeline-to-customer conversion by source id.
    pub async fn convert_to_customer(
        &self,
        collection: &'static str,
        id: i64,
    ) -> Result<Promotion> {
        convert::convert_to_customer(&self.db, collection, id).await
    }

    /// Bulk-promote every qualifying pipeline record.
    pub async fn sync_customers(&self) -> Result<SyncReport> {
        convert::sync_customers(&self.db).await
    }

    // ── Reports ────────────────────────────────────────────────────

    /// KPI summary for a period relative to today.
    pub async fn report_summary(&self, kind: PeriodKind) -> Summary {
        report::summary(&self.db, kind, Self::today()).await
    }

    pub async fn weekly_stats(&self) -> Vec<StatRow> {
        report::stats_series(&self.db, PeriodKind::Weekly, Self::today()).await
    }

    pub async fn monthly_stats(&self) -> Vec<StatRow> {
        report::stats_series(&self.db, PeriodKind::Monthly, Self::today()).await
    }

    pub async fn quarterly_stats(&self) -> Vec<StatRow> {
        report::stats_series(&self.db, PeriodKind::Quarterly, Self::today()).await
    }

    pub async fn yearly_stats(&self) -> Vec<StatRow> {
        report::stats_series(&self.db, PeriodKind::Yearly, Self::today()).await
    }

    pub async fn customer_distribution(&self) -> Vec<DistributionSlice> {
        report::customer_distribution(&self.db).await
    }

    // ── Goals ──────────────────────────────────────────────────────

    pub async fn goals_by_quarter(&self) -> BTreeMap<Quarter, QuarterGoals> {
        goals::goals_by_quarter(&self.db, Self::today()).await
    }

    pub async fn annual_goals(&self) -> QuarterGoals {
        goals::annual_goals(&self.db, Self::today()).await
    }

    // ── Performance ────────────────────────────────────────────────

    pub async fn performance(&self, kind: PeriodKind) -> Result<Performance> {
        let summary = self.report_summary(kind).await;
        let weights = report::load_weights(&self.db).await?;
        report::performance(&summary, &weights)
    }

    pub async fn save_weights(&self, weights: &Weights) -> Result<()> {
        report::save_weights(&self.db, weights).await
    }

    pub async fn weights(&self) -> Result<Weights> {
        report::load_weights(&self.db).await
    }

    // ── Maintenance ────────────────────────────────────────────────

    /// Per-collection record counts for the status overview.
    pub async fn status(&self) -> Result<Vec<(String, i64)>> {
        let mut out = Vec::new();
        for collection in model::collections::ALL {
            out.push((collection.to_string(), self.count(collection).await?));
        }
        Ok(out)
    }

    /// Clear every collection. Returns the number of records removed.
    pub async fn reset(&self) -> Result<usize> {
        self.db
            .writer()
            .call(|conn| {
                let mut removed = 0;
                for collection in model::collections::ALL {
                    removed += repository::clear(conn, collection)?;
                }
                Ok(removed)
            })
            .await
            .map_err(convert::flatten_call_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::collections;
    use serde_json::json;

    #[tokio::test]
    async fn test_crud_through_facade() {
        let dw = SalesDW::new(Database::open_memory().await.unwrap());

        let id = dw
            .add_record(collections::VISITS, &json!({"customer": "甲", "date": "2025-06-02"}))
            .await
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(dw.count(collections::VISITS).await.unwrap(), 1);

        dw.put_record(collections::VISITS, id, &json!({"customer": "乙"}))
            .await
            .unwrap();
        let stored = dw.get_record(collections::VISITS, id).await.unwrap().unwrap();
        assert_eq!(stored["customer"], "乙");

        assert!(dw.remove_record(collections::VISITS, id).await.unwrap());
        assert_eq!(dw.count(collections::VISITS).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_status_and_reset() {
        let dw = SalesDW::new(Database::open_memory().await.unwrap());
        dw.add_record(collections::LEADS, &json!({"name": "a"})).await.unwrap();
        dw.add_record(collections::GOALS, &json!({"quarter": "Q1", "type": "leads", "target": 1}))
            .await
            .unwrap();

        let status = dw.status().await.unwrap();
        let total: i64 = status.iter().map(|(_, n)| n).sum();
        assert_eq!(total, 2);

        assert_eq!(dw.reset().await.unwrap(), 2);
        let status = dw.status().await.unwrap();
        assert!(status.iter().all(|(_, n)| *n == 0));
    }
}
