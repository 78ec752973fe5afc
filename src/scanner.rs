use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::{collections, Contract, Goal, PipelineRecord, Plan, Project, Visit};
use crate::storage::{repository, Database};

/// Reads full collections out of the store for aggregation. Every read is
/// independently guarded: a failed or corrupt collection degrades to an
/// empty sequence (logged) so the rest of the report still renders.
pub struct Scanner<'a> {
    db: &'a Database,
}

impl<'a> Scanner<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Raw pass-through read. Storage failure yields an empty vec.
    pub async fn load_values(&self, collection: &'static str) -> Vec<Value> {
        let result = self
            .db
            .reader()
            .call(move |conn| repository::get_all(conn, collection))
            .await;
        match result {
            Ok(values) => values,
            Err(e) => {
                log::warn!("failed to read collection {collection}: {e}; treating as empty");
                Vec::new()
            }
        }
    }

    /// Typed read. A record that fails to decode is skipped (logged), not
    /// fatal to the collection.
    pub async fn load<T: DeserializeOwned>(&self, collection: &'static str) -> Vec<T> {
        self.load_values(collection)
            .await
            .into_iter()
            .filter_map(|v| match serde_json::from_value::<T>(v) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::warn!("skipping undecodable record in {collection}: {e}");
                    None
                }
            })
            .collect()
    }

    /// Unfiltered record count. Failure degrades to zero.
    pub async fn count(&self, collection: &'static str) -> u64 {
        let result = self
            .db
            .reader()
            .call(move |conn| repository::count(conn, collection))
            .await;
        match result {
            Ok(n) => n as u64,
            Err(e) => {
                log::warn!("failed to count collection {collection}: {e}; treating as zero");
                0
            }
        }
    }

    pub async fn leads(&self) -> Vec<PipelineRecord> {
        self.load(collections::LEADS).await
    }

    pub async fn prospects(&self) -> Vec<PipelineRecord> {
        self.load(collections::PROSPECTS).await
    }

    pub async fn plans(&self) -> Vec<Plan> {
        self.load(collections::PLANS).await
    }

    pub async fn projects(&self) -> Vec<Project> {
        self.load(collections::PROJECTS).await
    }

    pub async fn visits(&self) -> Vec<Visit> {
        self.load(collections::VISITS).await
    }

    pub async fn contracts(&self) -> Vec<Contract> {
        self.load(collections::CONTRACTS).await
    }

    pub async fn goals(&self) -> Vec<Goal> {
        self.load(collections::GOALS).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_load_typed() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                repository::add(
                    conn,
                    collections::LEADS,
                    &json!({"name": "线索一", "date": "2025-03-01"}),
                )?;
                Ok::<(), crate::error::Error>(())
            })
            .await
            .unwrap();

        let scanner = Scanner::new(&db);
        let leads = scanner.leads().await;
        assert_eq!(leads.len(), 1);
        assert_eq!(leads[0].name, "线索一");
        assert_eq!(scanner.count(collections::LEADS).await, 1);
    }

    #[tokio::test]
    async fn test_missing_collection_is_empty_not_error() {
        let db = Database::open_memory().await.unwrap();
        let scanner = Scanner::new(&db);
        assert!(scanner.visits().await.is_empty());
        assert_eq!(scanner.count(collections::VISITS).await, 0);
    }

    #[tokio::test]
    async fn test_corrupt_record_is_skipped() {
        let db = Database::open_memory().await.unwrap();
        db.writer()
            .call(|conn| {
                repository::add(conn, collections::GOALS, &json!({"quarter": "Q1", "type": "leads", "target": 10}))?;
                // A body that decodes as JSON but not as a Goal
                repository::add(conn, collections::GOALS, &json!({"quarter": 7}))?;
                Ok::<(), crate::error::Error>(())
            })
            .await
            .unwrap();

        let scanner = Scanner::new(&db);
        let goals = scanner.goals().await;
        assert_eq!(goals.len(), 1);
    }
}
