use serde::{Deserialize, Serialize};

/// Period summary for the dashboard KPI cards.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub new_leads: u64,
    pub new_prospects: u64,
    pub phone_calls: u64,
    pub visits: u64,
    /// Lifetime conversions over the period's pipeline inflow, percent,
    /// rounded. Zero when the denominator is zero.
    pub conversion_rate: u64,
    /// Unfiltered sum over all lead and prospect amounts.
    pub potential_value: f64,
    /// Sum over all dated contract amounts, not period-filtered.
    pub contract_value: f64,
}

/// One row of a period stats series, keyed the way the chart layer
/// consumes it.
#[derive(Debug, Clone, Serialize)]
pub struct StatRow {
    pub name: String,
    #[serde(rename = "新增线索")]
    pub new_leads: u64,
    #[serde(rename = "新增潜在客户")]
    pub new_prospects: u64,
    #[serde(rename = "电话联系")]
    pub phone_calls: u64,
    #[serde(rename = "拜访数量")]
    pub visits: u64,
}

/// A slice of the customer distribution pie: rounded percentage of the
/// lead/prospect/customer total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistributionSlice {
    pub name: String,
    pub value: u64,
}

/// Weighted performance-score configuration. Components must sum to 1.0
/// within ±0.01.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Weights {
    pub leads: f64,
    pub prospects: f64,
    pub phone_calls: f64,
    pub visits: f64,
    pub contracts: f64,
    pub profit: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Weights {
            leads: 0.2,
            prospects: 0.2,
            phone_calls: 0.2,
            visits: 0.2,
            contracts: 0.1,
            profit: 0.1,
        }
    }
}

/// Per-metric completion ratios feeding the weighted score.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRatios {
    pub leads: f64,
    pub prospects: f64,
    pub phone_calls: f64,
    pub visits: f64,
    pub contracts: f64,
    pub profit: f64,
}

/// Weighted performance score and letter grade.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub score: u32,
    pub grade: &'static str,
    pub ratios: CompletionRatios,
}
