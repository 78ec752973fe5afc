use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::period::{resolve, PeriodKind};
use crate::report::bucketize;
use crate::scanner::Scanner;
use crate::storage::Database;
use crate::model::{GoalMetric, Quarter};

/// Progress toward one metric's quarterly goal. Targets come from stored
/// goal rows; actuals are recomputed from the activity logs on every read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GoalProgress {
    pub actual: f64,
    pub target: f64,
}

pub type QuarterGoals = BTreeMap<GoalMetric, GoalProgress>;

const PROFIT_OF_CONTRACTS: f64 = 0.3;
const PAYMENT_OF_CONTRACTS: f64 = 0.7;

/// Per-quarter goal progress for the year containing `reference`.
pub async fn goals_by_quarter(
    db: &Database,
    reference: NaiveDate,
) -> BTreeMap<Quarter, QuarterGoals> {
    let buckets = resolve(PeriodKind::Quarterly, reference);
    let scanner = Scanner::new(db);

    let leads = scanner.leads().await;
    let prospects = scanner.prospects().await;
    let visits = scanner.visits().await;
    let plans = scanner.plans().await;
    let projects = scanner.projects().await;
    let contracts = scanner.contracts().await;
    let goal_rows = scanner.goals().await;

    let lead_counts = bucketize::bucketize(&buckets, &leads);
    let prospect_counts = bucketize::bucketize(&buckets, &prospects);
    let visit_counts = bucketize::visit_counts(&buckets, &visits, &plans, &projects);
    let contract_sums = bucketize::contract_amounts(&buckets, &contracts);

    // Stored targets, duplicates summed per (quarter, metric).
    let mut targets: BTreeMap<(Quarter, GoalMetric), f64> = BTreeMap::new();
    for g in &goal_rows {
        *targets.entry((g.quarter, g.metric)).or_default() += g.target;
    }

    let mut out = BTreeMap::new();
    for (i, quarter) in Quarter::ALL.into_iter().enumerate() {
        let contract_total = contract_sums[i];
        let actual_for = |metric: GoalMetric| -> f64 {
            match metric {
                GoalMetric::Leads => lead_counts[i] as f64,
                GoalMetric::Visits => visit_counts[i] as f64,
                GoalMetric::Prospects => prospect_counts[i] as f64,
                GoalMetric::Contracts => contract_total,
                GoalMetric::Profit => contract_total * PROFIT_OF_CONTRACTS,
                GoalMetric::Payment => contract_total * PAYMENT_OF_CONTRACTS,
            }
        };

        let mut progress = QuarterGoals::new();
        for metric in GoalMetric::ALL {
            progress.insert(
                metric,
                GoalProgress {
                    actual: actual_for(metric),
                    target: targets.get(&(quarter, metric)).copied().unwrap_or(0.0),
                },
            );
        }
        out.insert(quarter, progress);
    }
    out
}

/// Elementwise sum of the four quarters' progress per metric.
pub async fn annual_goals(db: &Database, reference: NaiveDate) -> QuarterGoals {
    let quarters = goals_by_quarter(db, reference).await;
    let mut out = QuarterGoals::new();
    for metric in GoalMetric::ALL {
        let mut total = GoalProgress::default();
        for progress in quarters.values() {
            if let Some(p) = progress.get(&metric) {
                total.actual += p.actual;
                total.target += p.target;
            }
        }
        out.insert(metric, total);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::collections;
    use crate::storage::repository;
    use serde_json::json;

    async fn seed(db: &Database, collection: &'static str, bodies: Vec<serde_json::Value>) {
        db.writer()
            .call(move |conn| {
                for body in &bodies {
                    repository::add(conn, collection, body)?;
                }
                Ok::<(), crate::error::Error>(())
            })
            .await
            .unwrap();
    }

    fn reference() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).unwrap()
    }

    #[tokio::test]
    async fn test_actuals_recomputed_from_logs_not_stored_field() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::GOALS,
            // Stored actual of 99 must be ignored
            vec![json!({"quarter": "Q1", "type": "leads", "target": 20, "actual": 99})],
        )
        .await;
        seed(
            &db,
            collections::LEADS,
            vec![
                json!({"name": "a", "date": "2025-02-01"}),
                json!({"name": "b", "date": "2025-03-15"}),
            ],
        )
        .await;

        let goals = goals_by_quarter(&db, reference()).await;
        let q1 = &goals[&Quarter::Q1];
        assert_eq!(q1[&GoalMetric::Leads].actual, 2.0);
        assert_eq!(q1[&GoalMetric::Leads].target, 20.0);
    }

    #[tokio::test]
    async fn test_duplicate_goal_rows_sum_targets() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::GOALS,
            vec![
                json!({"quarter": "Q2", "type": "visits", "target": 10}),
                json!({"quarter": "Q2", "type": "visits", "target": 5}),
            ],
        )
        .await;

        let goals = goals_by_quarter(&db, reference()).await;
        assert_eq!(goals[&Quarter::Q2][&GoalMetric::Visits].target, 15.0);
    }

    #[tokio::test]
    async fn test_profit_and_payment_synthesized_from_contracts() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::CONTRACTS,
            vec![
                json!({"customer": "x", "amount": 100000.0, "date": "2025-08-01"}),
                json!({"customer": "y", "amount": 50000.0, "date": "2025-09-10"}),
            ],
        )
        .await;

        let goals = goals_by_quarter(&db, reference()).await;
        let q3 = &goals[&Quarter::Q3];
        assert_eq!(q3[&GoalMetric::Contracts].actual, 150000.0);
        assert_eq!(q3[&GoalMetric::Profit].actual, 45000.0);
        assert_eq!(q3[&GoalMetric::Payment].actual, 105000.0);
        // Q1 saw no contracts
        assert_eq!(goals[&Quarter::Q1][&GoalMetric::Contracts].actual, 0.0);
    }

    #[tokio::test]
    async fn test_annual_is_elementwise_sum() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::GOALS,
            vec![
                json!({"quarter": "Q1", "type": "leads", "target": 10}),
                json!({"quarter": "Q3", "type": "leads", "target": 30}),
            ],
        )
        .await;
        seed(
            &db,
            collections::LEADS,
            vec![
                json!({"name": "a", "date": "2025-01-05"}),
                json!({"name": "b", "date": "2025-10-05"}),
            ],
        )
        .await;

        let annual = annual_goals(&db, reference()).await;
        assert_eq!(annual[&GoalMetric::Leads].target, 40.0);
        assert_eq!(annual[&GoalMetric::Leads].actual, 2.0);
    }
}
