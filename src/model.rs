use serde::{Deserialize, Deserializer, Serialize};

/// Collection names in the record store.
pub mod collections {
    pub const LEADS: &str = "leads";
    pub const PROSPECTS: &str = "prospects";
    pub const TARGETS: &str = "targets";
    pub const CUSTOMERS: &str = "customers";
    pub const PLANS: &str = "plans";
    pub const PROJECTS: &str = "projects";
    pub const VISITS: &str = "visits";
    pub const CONTRACTS: &str = "contracts";
    pub const GOALS: &str = "goals";

    /// All collections, in the order `status` and `reset` walk them.
    pub const ALL: [&str; 9] = [
        LEADS, PROSPECTS, TARGETS, CUSTOMERS, PLANS, PROJECTS, VISITS, CONTRACTS, GOALS,
    ];
}

/// Sales-process phase of a pipeline record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Stage {
    #[serde(rename = "初步接触")]
    InitialContact,
    #[serde(rename = "需求调研")]
    NeedsResearch,
    #[serde(rename = "方案设计")]
    SolutionDesign,
    #[serde(rename = "商务谈判")]
    Negotiation,
    #[serde(other)]
    Unknown,
}

/// Closing-likelihood classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Possibility {
    #[serde(rename = "高")]
    High,
    #[serde(rename = "中")]
    Medium,
    #[serde(rename = "低")]
    Low,
    #[serde(other)]
    Unknown,
}

/// Customer rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rating {
    A,
    B,
    C,
    D,
    #[serde(other)]
    Unknown,
}

/// Reporting quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn number(&self) -> u8 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

/// Goal metric types tracked per quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalMetric {
    Leads,
    Visits,
    Prospects,
    Contracts,
    Profit,
    Payment,
}

impl GoalMetric {
    pub const ALL: [GoalMetric; 6] = [
        GoalMetric::Leads,
        GoalMetric::Visits,
        GoalMetric::Prospects,
        GoalMetric::Contracts,
        GoalMetric::Profit,
        GoalMetric::Payment,
    ];
}

/// Activity classification for plans and projects. Legacy rows carry
/// free-form kind strings in several spellings; classification happens
/// once at read time, new rows store the canonical strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Visit,
    PhoneCall,
    Other,
}

impl ActivityKind {
    /// Classify a raw kind string. Absent kind (legacy rows) is Other.
    pub fn classify(raw: Option<&str>) -> ActivityKind {
        let Some(s) = raw else {
            return ActivityKind::Other;
        };
        let lower = s.to_lowercase();
        if s.contains("拜访") || lower.contains("visit") {
            ActivityKind::Visit
        } else if s.contains("电话") || lower.contains("call") || lower.contains("phone") {
            ActivityKind::PhoneCall
        } else {
            ActivityKind::Other
        }
    }
}

/// Any record type that participates in date bucketing.
pub trait Dated {
    /// The raw date string, if the record has one. Unparsable or absent
    /// dates exclude the record from every bucket.
    fn raw_date(&self) -> Option<&str>;
}

// ── Records ────────────────────────────────────────────────────────

/// Lead / Prospect / Target share one shape; they live in separate
/// collections and differ only in pipeline position.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub need: Option<String>,
    pub stage: Option<Stage>,
    pub advantage: Option<String>,
    pub disadvantage: Option<String>,
    pub possibility: Option<Possibility>,
    #[serde(deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    pub date: Option<String>,
    // Carried into the Customer row on conversion.
    pub contact: Option<String>,
    pub industry: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Customer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    pub contact: Option<String>,
    #[serde(rename = "type")]
    pub customer_type: Option<String>,
    pub industry: Option<String>,
    pub rating: Option<Rating>,
    pub tags: Vec<String>,
    pub join_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Plan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub task: Option<String>,
    pub customer: Option<String>,
    pub date: Option<String>,
    pub quarter: Option<String>,
    pub week: Option<u32>,
    pub year: Option<i32>,
    pub completed: bool,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl Plan {
    pub fn activity(&self) -> ActivityKind {
        ActivityKind::classify(self.kind.as_deref())
    }
}

/// Ad-hoc transaction/event. Unlike plans there is no completed flag —
/// a matching kind counts unconditionally.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Project {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

impl Project {
    pub fn activity(&self) -> ActivityKind {
        ActivityKind::classify(self.kind.as_deref())
    }
}

/// Dedicated visit-log row, additive to plan/project visit counts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Visit {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub customer: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Contract {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub customer: Option<String>,
    #[serde(deserialize_with = "lenient_amount")]
    pub amount: Option<f64>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Goal {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub quarter: Quarter,
    #[serde(rename = "type")]
    pub metric: GoalMetric,
    #[serde(deserialize_with = "lenient_number")]
    pub target: f64,
    /// Stored by the UI but ignored by the aggregator — actuals are
    /// recomputed from the activity logs on every read.
    #[serde(deserialize_with = "lenient_number")]
    pub actual: f64,
}

impl Default for Goal {
    fn default() -> Self {
        Goal {
            id: None,
            quarter: Quarter::Q1,
            metric: GoalMetric::Leads,
            target: 0.0,
            actual: 0.0,
        }
    }
}

impl Dated for PipelineRecord {
    fn raw_date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

impl Dated for Customer {
    fn raw_date(&self) -> Option<&str> {
        self.join_date.as_deref()
    }
}

impl Dated for Plan {
    fn raw_date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

impl Dated for Project {
    fn raw_date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

impl Dated for Visit {
    fn raw_date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

impl Dated for Contract {
    fn raw_date(&self) -> Option<&str> {
        self.date.as_deref()
    }
}

// ── Lenient numeric coercion ───────────────────────────────────────

/// Amounts arrive as numbers, numeric strings, null, or garbage.
/// Garbage coerces to None; downstream sums treat None as 0.
fn lenient_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_number))
}

fn lenient_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(coerce_number).unwrap_or(0.0))
}

fn coerce_number(v: &serde_json::Value) -> Option<f64> {
    match v {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_visit_synonyms() {
        assert_eq!(ActivityKind::classify(Some("拜访")), ActivityKind::Visit);
        assert_eq!(ActivityKind::classify(Some("客户拜访")), ActivityKind::Visit);
        assert_eq!(ActivityKind::classify(Some("Site Visit")), ActivityKind::Visit);
    }

    #[test]
    fn test_classify_phone_synonyms() {
        assert_eq!(ActivityKind::classify(Some("电话")), ActivityKind::PhoneCall);
        assert_eq!(
            ActivityKind::classify(Some("电话联系")),
            ActivityKind::PhoneCall
        );
        assert_eq!(ActivityKind::classify(Some("Cold Call")), ActivityKind::PhoneCall);
        assert_eq!(ActivityKind::classify(Some("PHONE")), ActivityKind::PhoneCall);
    }

    #[test]
    fn test_classify_legacy_and_other() {
        assert_eq!(ActivityKind::classify(None), ActivityKind::Other);
        assert_eq!(ActivityKind::classify(Some("会议")), ActivityKind::Other);
    }

    #[test]
    fn test_pipeline_record_decodes_sparse_json() {
        let r: PipelineRecord = serde_json::from_str(
            r#"{"id": 3, "name": "华东制造", "stage": "商务谈判", "amount": "120000.5"}"#,
        )
        .unwrap();
        assert_eq!(r.id, Some(3));
        assert_eq!(r.stage, Some(Stage::Negotiation));
        assert_eq!(r.amount, Some(120000.5));
        assert_eq!(r.possibility, None);
        assert!(r.tags.is_empty());
    }

    #[test]
    fn test_unknown_stage_tolerated() {
        let r: PipelineRecord =
            serde_json::from_str(r#"{"name": "x", "stage": "老字段"}"#).unwrap();
        assert_eq!(r.stage, Some(Stage::Unknown));
    }

    #[test]
    fn test_amount_garbage_coerces_to_none() {
        let r: Contract =
            serde_json::from_str(r#"{"customer": "a", "amount": "abc", "date": "2025-01-01"}"#)
                .unwrap();
        assert_eq!(r.amount, None);
    }

    #[test]
    fn test_plan_legacy_without_kind() {
        let p: Plan = serde_json::from_str(r#"{"task": "回访", "completed": true}"#).unwrap();
        assert_eq!(p.activity(), ActivityKind::Other);
        assert!(p.completed);
    }

    #[test]
    fn test_goal_decodes_string_target() {
        let g: Goal =
            serde_json::from_str(r#"{"quarter": "Q2", "type": "contracts", "target": "500000"}"#)
                .unwrap();
        assert_eq!(g.quarter, Quarter::Q2);
        assert_eq!(g.metric, GoalMetric::Contracts);
        assert_eq!(g.target, 500000.0);
        assert_eq!(g.actual, 0.0);
    }

    #[test]
    fn test_customer_round_trip_camel_case() {
        let c = Customer {
            id: Some(1),
            name: "远景能源".into(),
            join_date: Some("2025-02-01".into()),
            ..Default::default()
        };
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["joinDate"], "2025-02-01");
        let back: Customer = serde_json::from_value(json).unwrap();
        assert_eq!(back.name, "远景能源");
    }
}
