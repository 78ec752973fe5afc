pub mod bucketize;
pub mod performance;
pub mod types;

pub use performance::{load_weights, performance, save_weights};
pub use types::{CompletionRatios, DistributionSlice, Performance, StatRow, Summary, Weights};

use chrono::NaiveDate;

use crate::date_util::parse_record_date;
use crate::model::collections;
use crate::period::{resolve, PeriodKind};
use crate::scanner::Scanner;
use crate::storage::Database;

/// Compute the KPI summary for a period relative to a reference date.
///
/// Count metrics are period-bucketed with a fallback: a period whose
/// bucketed sum is zero reports the lifetime total instead. Value metrics
/// (potential and contract) are not period-filtered; the contract total
/// covers dated contracts only.
pub async fn summary(db: &Database, kind: PeriodKind, reference: NaiveDate) -> Summary {
    let buckets = resolve(kind, reference);
    let scanner = Scanner::new(db);

    let leads = scanner.leads().await;
    let prospects = scanner.prospects().await;
    let visits = scanner.visits().await;
    let plans = scanner.plans().await;
    let projects = scanner.projects().await;
    let contracts = scanner.contracts().await;
    let customers_count = scanner.count(collections::CUSTOMERS).await;

    let new_leads = sum_with_lifetime_fallback(
        bucketize::bucketize(&buckets, &leads).iter().sum(),
        leads.len() as u64,
    );
    let new_prospects = sum_with_lifetime_fallback(
        bucketize::bucketize(&buckets, &prospects).iter().sum(),
        prospects.len() as u64,
    );

    let lifetime_phone = lifetime_activity_total(&visits, &plans, &projects, false);
    let phone_calls = sum_with_lifetime_fallback(
        bucketize::phone_counts(&buckets, &visits, &plans, &projects)
            .iter()
            .sum(),
        lifetime_phone,
    );

    let lifetime_visits = lifetime_activity_total(&visits, &plans, &projects, true);
    let visit_count = sum_with_lifetime_fallback(
        bucketize::visit_counts(&buckets, &visits, &plans, &projects)
            .iter()
            .sum(),
        lifetime_visits,
    );

    let denominator = new_leads + new_prospects;
    let conversion_rate = if denominator == 0 {
        0
    } else {
        (100.0 * customers_count as f64 / denominator as f64).round() as u64
    };

    let potential_value = amount_total(&leads) + amount_total(&prospects);
    // Undated contracts count nowhere, in buckets or here.
    let contract_value: f64 = contracts
        .iter()
        .filter(|c| c.date.as_deref().and_then(parse_record_date).is_some())
        .map(|c| c.amount.unwrap_or(0.0))
        .sum();

    Summary {
        new_leads,
        new_prospects,
        phone_calls,
        visits: visit_count,
        conversion_rate,
        potential_value,
        contract_value,
    }
}

/// The fallback is on zero, not on absence: a period with in-range records
/// always reports the bucketed sum.
fn sum_with_lifetime_fallback(bucketed: u64, lifetime: u64) -> u64 {
    if bucketed == 0 {
        lifetime
    } else {
        bucketed
    }
}

fn amount_total(records: &[crate::model::PipelineRecord]) -> f64 {
    records.iter().map(|r| r.amount.unwrap_or(0.0)).sum()
}

/// Unfiltered composite activity total, mirroring the per-bucket
/// composite rules without the date filter.
fn lifetime_activity_total(
    visits: &[crate::model::Visit],
    plans: &[crate::model::Plan],
    projects: &[crate::model::Project],
    visit_kind: bool,
) -> u64 {
    use crate::model::ActivityKind;
    let kind = if visit_kind {
        ActivityKind::Visit
    } else {
        ActivityKind::PhoneCall
    };
    let log = if visit_kind { visits.len() as u64 } else { 0 };
    let from_plans = plans
        .iter()
        .filter(|p| p.activity() == kind && p.completed)
        .count() as u64;
    let from_projects = projects.iter().filter(|p| p.activity() == kind).count() as u64;
    log + from_plans + from_projects
}

/// Per-bucket stats series for the period charts.
pub async fn stats_series(db: &Database, kind: PeriodKind, reference: NaiveDate) -> Vec<StatRow> {
    let buckets = resolve(kind, reference);
    let scanner = Scanner::new(db);

    let leads = scanner.leads().await;
    let prospects = scanner.prospects().await;
    let visits = scanner.visits().await;
    let plans = scanner.plans().await;
    let projects = scanner.projects().await;

    let lead_counts = bucketize::bucketize(&buckets, &leads);
    let prospect_counts = bucketize::bucketize(&buckets, &prospects);
    let phone = bucketize::phone_counts(&buckets, &visits, &plans, &projects);
    let visit = bucketize::visit_counts(&buckets, &visits, &plans, &projects);

    buckets
        .iter()
        .enumerate()
        .map(|(i, b)| StatRow {
            name: b.label.clone(),
            new_leads: lead_counts[i],
            new_prospects: prospect_counts[i],
            phone_calls: phone[i],
            visits: visit[i],
        })
        .collect()
}

/// Rounded percentage split across leads, prospects, and customers.
/// Empty when there is nothing to distribute.
pub async fn customer_distribution(db: &Database) -> Vec<DistributionSlice> {
    let scanner = Scanner::new(db);
    let leads = scanner.count(collections::LEADS).await;
    let prospects = scanner.count(collections::PROSPECTS).await;
    let customers = scanner.count(collections::CUSTOMERS).await;

    let total = leads + prospects + customers;
    if total == 0 {
        return Vec::new();
    }

    let pct = |n: u64| (100.0 * n as f64 / total as f64).round() as u64;
    vec![
        DistributionSlice {
            name: "线索".to_string(),
            value: pct(leads),
        },
        DistributionSlice {
            name: "潜在客户".to_string(),
            value: pct(prospects),
        },
        DistributionSlice {
            name: "客户".to_string(),
            value: pct(customers),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
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

    fn monday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 2).unwrap()
    }

    #[tokio::test]
    async fn test_summary_counts_and_conversion() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::LEADS,
            vec![
                json!({"name": "a", "date": "2025-06-02", "amount": 1000}),
                json!({"name": "b", "date": "2025-06-03", "amount": 2000}),
            ],
        )
        .await;
        seed(
            &db,
            collections::PROSPECTS,
            vec![json!({"name": "c", "date": "2025-06-04", "amount": 500})],
        )
        .await;
        seed(&db, collections::CUSTOMERS, vec![json!({"name": "d"})]).await;

        let s = summary(&db, PeriodKind::Weekly, monday()).await;
        assert_eq!(s.new_leads, 2);
        assert_eq!(s.new_prospects, 1);
        // 1 customer / 3 inflow → 33%
        assert_eq!(s.conversion_rate, 33);
        assert_eq!(s.potential_value, 3500.0);
    }

    #[tokio::test]
    async fn test_summary_fallback_on_zero_not_absent() {
        let db = Database::open_memory().await.unwrap();
        // All leads are outside the current week
        seed(
            &db,
            collections::LEADS,
            vec![
                json!({"name": "old1", "date": "2020-01-01"}),
                json!({"name": "old2", "date": "2020-01-02"}),
            ],
        )
        .await;

        let s = summary(&db, PeriodKind::Weekly, monday()).await;
        // Bucketed sum is zero → lifetime total
        assert_eq!(s.new_leads, 2);
    }

    #[tokio::test]
    async fn test_value_metrics_unfiltered_asymmetry() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::CONTRACTS,
            vec![
                json!({"customer": "x", "amount": 100.0, "date": "2020-01-01"}),
                json!({"customer": "y", "amount": 50.0, "date": "2025-06-02"}),
            ],
        )
        .await;

        let s = summary(&db, PeriodKind::Weekly, monday()).await;
        // contract_value covers all time, not just the week: the bucketed
        // sum for this week would be 50, the summary reports 150.
        assert_eq!(s.contract_value, 150.0);

        let buckets = crate::period::resolve(PeriodKind::Weekly, monday());
        let scanner = crate::scanner::Scanner::new(&db);
        let contracts = scanner.contracts().await;
        let bucketed: f64 = bucketize::contract_amounts(&buckets, &contracts)
            .iter()
            .sum();
        assert_eq!(bucketed, 50.0);
        assert_ne!(bucketed, s.contract_value);
    }

    #[tokio::test]
    async fn test_undated_contract_never_counts_in_buckets() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::CONTRACTS,
            vec![json!({"customer": "x", "amount": 9999.0})],
        )
        .await;

        let buckets = crate::period::resolve(PeriodKind::Weekly, monday());
        let scanner = crate::scanner::Scanner::new(&db);
        let contracts = scanner.contracts().await;
        let bucketed: f64 = bucketize::contract_amounts(&buckets, &contracts)
            .iter()
            .sum();
        assert_eq!(bucketed, 0.0);
    }

    #[tokio::test]
    async fn test_undated_contract_excluded_from_contract_value() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::CONTRACTS,
            vec![json!({"customer": "x", "amount": 9999.0})],
        )
        .await;

        let s = summary(&db, PeriodKind::Weekly, monday()).await;
        assert_eq!(s.contract_value, 0.0);

        // A dated contract still counts regardless of period
        seed(
            &db,
            collections::CONTRACTS,
            vec![json!({"customer": "y", "amount": 100.0, "date": "2020-05-01"})],
        )
        .await;
        let s = summary(&db, PeriodKind::Weekly, monday()).await;
        assert_eq!(s.contract_value, 100.0);
    }

    #[tokio::test]
    async fn test_stats_series_weekly_positions() {
        let db = Database::open_memory().await.unwrap();
        // Monday / Wednesday / Friday of the week of 2025-06-02
        seed(
            &db,
            collections::LEADS,
            vec![
                json!({"name": "a", "date": "2025-06-02"}),
                json!({"name": "b", "date": "2025-06-04"}),
                json!({"name": "c", "date": "2025-06-06"}),
            ],
        )
        .await;

        let rows = stats_series(&db, PeriodKind::Weekly, monday()).await;
        assert_eq!(rows.len(), 7);
        let lead_counts: Vec<u64> = rows.iter().map(|r| r.new_leads).collect();
        assert_eq!(lead_counts, vec![1, 0, 1, 0, 1, 0, 0]);
        assert_eq!(lead_counts.iter().sum::<u64>(), 3);
        assert_eq!(rows[0].name, "周一");
    }

    #[tokio::test]
    async fn test_stats_series_plan_plus_visit_log() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::PLANS,
            vec![json!({"task": "t", "type": "拜访", "completed": true, "date": "2025-06-02"})],
        )
        .await;
        seed(
            &db,
            collections::VISITS,
            vec![json!({"customer": "甲", "date": "2025-06-02"})],
        )
        .await;

        let rows = stats_series(&db, PeriodKind::Weekly, monday()).await;
        assert_eq!(rows[0].visits, 2);
    }

    #[tokio::test]
    async fn test_summary_idempotent_without_writes() {
        let db = Database::open_memory().await.unwrap();
        seed(
            &db,
            collections::LEADS,
            vec![json!({"name": "a", "date": "2025-06-02", "amount": 10})],
        )
        .await;

        let first = summary(&db, PeriodKind::Weekly, monday()).await;
        let second = summary(&db, PeriodKind::Weekly, monday()).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_distribution_rounding_and_empty() {
        let db = Database::open_memory().await.unwrap();
        assert!(customer_distribution(&db).await.is_empty());

        seed(&db, collections::LEADS, vec![json!({"name": "a"}), json!({"name": "b"})]).await;
        seed(&db, collections::CUSTOMERS, vec![json!({"name": "c"})]).await;

        let slices = customer_distribution(&db).await;
        assert_eq!(slices.len(), 3);
        assert_eq!(slices[0], DistributionSlice { name: "线索".into(), value: 67 });
        assert_eq!(slices[1].value, 0);
        assert_eq!(slices[2].value, 33);
    }

    #[test]
    fn test_stat_row_serializes_chart_keys() {
        let row = StatRow {
            name: "周一".into(),
            new_leads: 1,
            new_prospects: 2,
            phone_calls: 3,
            visits: 4,
        };
        let v = serde_json::to_value(&row).unwrap();
        assert_eq!(v["新增线索"], 1);
        assert_eq!(v["新增潜在客户"], 2);
        assert_eq!(v["电话联系"], 3);
        assert_eq!(v["拜访数量"], 4);
    }
}
