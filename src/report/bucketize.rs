use chrono::NaiveDateTime;

use crate::date_util::parse_record_date;
use crate::model::{ActivityKind, Contract, Dated, Plan, Project, Visit};
use crate::period::Bucket;

fn record_datetime<T: Dated>(record: &T) -> Option<NaiveDateTime> {
    record.raw_date().and_then(parse_record_date)
}

/// Count records per bucket. A record with an absent or unparsable date is
/// silently excluded; buckets are non-overlapping by construction, so each
/// qualifying record lands in at most one bucket.
pub fn bucketize<T: Dated>(buckets: &[Bucket], records: &[T]) -> Vec<u64> {
    let mut counts = vec![0u64; buckets.len()];
    for record in records {
        let Some(d) = record_datetime(record) else {
            continue;
        };
        if let Some(i) = buckets.iter().position(|b| b.contains(d)) {
            counts[i] += 1;
        }
    }
    counts
}

/// Composite visit count per bucket: dedicated visit-log rows, completed
/// plans classified as visits, and projects classified as visits (projects
/// carry no completed flag and count unconditionally).
pub fn visit_counts(
    buckets: &[Bucket],
    visits: &[Visit],
    plans: &[Plan],
    projects: &[Project],
) -> Vec<u64> {
    activity_counts(buckets, visits, plans, projects, ActivityKind::Visit)
}

/// Composite phone-call count per bucket, same shape as `visit_counts`
/// with the phone synonym set.
pub fn phone_counts(
    buckets: &[Bucket],
    visits: &[Visit],
    plans: &[Plan],
    projects: &[Project],
) -> Vec<u64> {
    activity_counts(buckets, visits, plans, projects, ActivityKind::PhoneCall)
}

fn activity_counts(
    buckets: &[Bucket],
    visits: &[Visit],
    plans: &[Plan],
    projects: &[Project],
    kind: ActivityKind,
) -> Vec<u64> {
    let mut counts = if kind == ActivityKind::Visit {
        // The visit log is a dedicated table, additive to plan/project counts.
        bucketize(buckets, visits)
    } else {
        vec![0u64; buckets.len()]
    };

    for plan in plans {
        if plan.activity() != kind || !plan.completed {
            continue;
        }
        let Some(d) = record_datetime(plan) else {
            continue;
        };
        if let Some(i) = buckets.iter().position(|b| b.contains(d)) {
            counts[i] += 1;
        }
    }

    for project in projects {
        if project.activity() != kind {
            continue;
        }
        let Some(d) = record_datetime(project) else {
            continue;
        };
        if let Some(i) = buckets.iter().position(|b| b.contains(d)) {
            counts[i] += 1;
        }
    }

    counts
}

/// Sum of contract amounts per bucket. A contract without a date is in no
/// bucket — never double-counted, never folded into an "undated" total.
/// Unparsable amounts coerce to zero.
pub fn contract_amounts(buckets: &[Bucket], contracts: &[Contract]) -> Vec<f64> {
    let mut sums = vec![0.0f64; buckets.len()];
    for contract in contracts {
        let Some(d) = record_datetime(contract) else {
            continue;
        };
        if let Some(i) = buckets.iter().position(|b| b.contains(d)) {
            sums[i] += contract.amount.unwrap_or(0.0);
        }
    }
    sums
}
