use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};

use crate::date_util::{day_end, day_start, iso_week_monday, last_day_of_month};

/// Top-level reporting granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodKind {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl PeriodKind {
    /// Parse a period keyword. Unrecognized input is not an error —
    /// callers fall back to weekly.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "monthly" | "month" => PeriodKind::Monthly,
            "quarterly" | "quarter" => PeriodKind::Quarterly,
            "yearly" | "year" => PeriodKind::Yearly,
            _ => PeriodKind::Weekly,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PeriodKind::Weekly => "weekly",
            PeriodKind::Monthly => "monthly",
            PeriodKind::Quarterly => "quarterly",
            PeriodKind::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A labeled date sub-range used to group records. Both bounds are
/// inclusive; day bounds run 00:00:00.000 through 23:59:59.999.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub label: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Bucket {
    pub fn contains(&self, d: NaiveDateTime) -> bool {
        self.start <= d && d <= self.end
    }
}

const WEEKDAY_LABELS: [&str; 7] = ["周一", "周二", "周三", "周四", "周五", "周六", "周日"];

/// Resolve a period into its ordered sequence of buckets relative to a
/// reference date.
pub fn resolve(kind: PeriodKind, reference: NaiveDate) -> Vec<Bucket> {
    match kind {
        PeriodKind::Weekly => weekly_buckets(reference),
        PeriodKind::Monthly => monthly_buckets(reference),
        PeriodKind::Quarterly => quarterly_buckets(reference.year()),
        PeriodKind::Yearly => yearly_buckets(reference.year()),
    }
}

/// Seven buckets, one per weekday of the ISO week containing `reference`.
fn weekly_buckets(reference: NaiveDate) -> Vec<Bucket> {
    let monday = iso_week_monday(reference);
    (0..7)
        .map(|i| {
            let d = monday + Duration::days(i);
            Bucket {
                label: WEEKDAY_LABELS[i as usize].to_string(),
                start: day_start(d),
                end: day_end(d),
            }
        })
        .collect()
}

/// One bucket per week-of-month: step 7 days from the Monday on/before the
/// 1st; the final bucket is clipped to the month's last day.
fn monthly_buckets(reference: NaiveDate) -> Vec<Bucket> {
    let first = NaiveDate::from_ymd_opt(reference.year(), reference.month(), 1).unwrap();
    let last = last_day_of_month(reference.year(), reference.month());

    let mut buckets = Vec::new();
    let mut week_start = iso_week_monday(first);
    let mut n = 1;
    while week_start <= last {
        let week_end = week_start + Duration::days(6);
        buckets.push(Bucket {
            label: format!("第{n}周"),
            start: day_start(week_start),
            end: day_end(week_end.min(last)),
        });
        week_start += Duration::days(7);
        n += 1;
    }
    buckets
}

/// Q1 through Q4 of the given year.
fn quarterly_buckets(year: i32) -> Vec<Bucket> {
    (1..=4u32)
        .map(|q| {
            let start_month = (q - 1) * 3 + 1;
            let end_month = q * 3;
            Bucket {
                label: format!("Q{q}"),
                start: day_start(NaiveDate::from_ymd_opt(year, start_month, 1).unwrap()),
                end: day_end(last_day_of_month(year, end_month)),
            }
        })
        .collect()
}

/// The given year and the three preceding years, oldest first.
fn yearly_buckets(year: i32) -> Vec<Bucket> {
    (year - 3..=year)
        .map(|y| Bucket {
            label: format!("{y}"),
            start: day_start(NaiveDate::from_ymd_opt(y, 1, 1).unwrap()),
            end: day_end(NaiveDate::from_ymd_opt(y, 12, 31).unwrap()),
        })
        .collect()
}
