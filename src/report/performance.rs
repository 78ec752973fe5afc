use crate::error::{Error, Result};
use crate::report::types::{CompletionRatios, Performance, Summary, Weights};
use crate::storage::{repository, Database};

const WEIGHTS_CONFIG_KEY: &str = "performance_weights";

// Minimum targets per metric. A quiet period still gets scored against
// these floors instead of a near-zero self-derived target.
const FLOOR_LEADS: f64 = 10.0;
const FLOOR_PROSPECTS: f64 = 5.0;
const FLOOR_PHONE_CALLS: f64 = 20.0;
const FLOOR_VISITS: f64 = 10.0;
const FLOOR_CONTRACTS: f64 = 500_000.0;
const PROFIT_OF_CONTRACTS: f64 = 0.3;

impl Weights {
    /// Components must sum to 1.0 within ±0.01.
    pub fn validate(&self) -> Result<()> {
        let sum = self.leads
            + self.prospects
            + self.phone_calls
            + self.visits
            + self.contracts
            + self.profit;
        if (sum - 1.0).abs() > 0.01 {
            return Err(Error::Validation(format!(
                "权重之和必须为 1.0（当前 {sum:.2}）"
            )));
        }
        Ok(())
    }
}

/// Persist the weight vector, rejecting invalid vectors before any write.
pub async fn save_weights(db: &Database, weights: &Weights) -> Result<()> {
    weights.validate()?;
    let json = serde_json::to_string(weights)?;
    db.writer()
        .call(move |conn| repository::set_config(conn, WEIGHTS_CONFIG_KEY, &json))
        .await?;
    Ok(())
}

/// Load the stored weight vector, defaulting when none has been saved.
pub async fn load_weights(db: &Database) -> Result<Weights> {
    let stored = db
        .reader()
        .call(|conn| repository::get_config(conn, WEIGHTS_CONFIG_KEY))
        .await?;
    match stored {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(Weights::default()),
    }
}

/// Compute the weighted performance score and grade for a period summary.
/// Targets are derived as max(actual × 1.2, floor); the profit target
/// floor is 30% of the contracts target.
pub fn performance(summary: &Summary, weights: &Weights) -> Result<Performance> {
    weights.validate()?;

    let leads = summary.new_leads as f64;
    let prospects = summary.new_prospects as f64;
    let phone_calls = summary.phone_calls as f64;
    let visits = summary.visits as f64;
    let contracts = summary.contract_value;
    let profit = contracts * PROFIT_OF_CONTRACTS;

    let contracts_target = target(contracts, FLOOR_CONTRACTS);
    let ratios = CompletionRatios {
        leads: ratio(leads, target(leads, FLOOR_LEADS)),
        prospects: ratio(prospects, target(prospects, FLOOR_PROSPECTS)),
        phone_calls: ratio(phone_calls, target(phone_calls, FLOOR_PHONE_CALLS)),
        visits: ratio(visits, target(visits, FLOOR_VISITS)),
        contracts: ratio(contracts, contracts_target),
        profit: ratio(profit, target(profit, PROFIT_OF_CONTRACTS * contracts_target)),
    };

    let weighted = weights.leads * ratios.leads
        + weights.prospects * ratios.prospects
        + weights.phone_calls * ratios.phone_calls
        + weights.visits * ratios.visits
        + weights.contracts * ratios.contracts
        + weights.profit * ratios.profit;
    let score = (weighted * 100.0).round() as u32;

    Ok(Performance {
        score,
        grade: grade_for(score),
        ratios,
    })
}

fn target(actual: f64, floor: f64) -> f64 {
    (actual * 1.2).max(floor)
}

fn ratio(actual: f64, target: f64) -> f64 {
    if target <= 0.0 {
        return 0.0;
    }
    (actual / target).min(1.0)
}

fn grade_for(score: u32) -> &'static str {
    match score {
        90.. => "A+",
        85..=89 => "A",
        80..=84 => "A-",
        75..=79 => "B+",
        70..=74 => "B",
        65..=69 => "B-",
        60..=64 => "C+",
        50..=59 => "C",
        _ => "D",
    }
}
