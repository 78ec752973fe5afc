use clap::{Parser, Subcommand};

use salesdw::model::collections;
use salesdw::{Database, PeriodKind, SalesDW, Weights};

#[derive(Parser)]
#[command(name = "salesdw", about = "Personal sales warehouse CLI")]
struct Cli {
    /// Database path (default: ~/.salesdw/salesdw.db)
    #[arg(long)]
    db: Option<String>,

    /// Increase logging verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// KPI summary for a period (weekly/monthly/quarterly/yearly)
    Report {
        #[arg(long, default_value = "weekly")]
        period: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Per-bucket stats series for a period
    Stats {
        #[arg(long, default_value = "weekly")]
        period: String,
        #[arg(long)]
        json: bool,
    },
    /// Quarterly goal progress
    Goals {
        /// Roll the four quarters into annual totals
        #[arg(long)]
        annual: bool,
        #[arg(long)]
        json: bool,
    },
    /// Lead/prospect/customer distribution
    Distribution {
        #[arg(long)]
        json: bool,
    },
    /// Weighted performance score for a period
    Performance {
        #[arg(long, default_value = "weekly")]
        period: String,
        #[arg(long)]
        json: bool,
    },
    /// Promote every qualifying pipeline record to a customer
    SyncCustomers,
    /// Add records
    Add {
        #[command(subcommand)]
        target: AddTarget,
    },
    /// Manage performance weights
    Weights {
        #[command(subcommand)]
        action: WeightsAction,
    },
    /// Per-collection record counts
    Status,
    /// Delete every record in every collection
    Reset {
        /// Confirm the wipe
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum AddTarget {
    /// Add a lead
    Lead {
        name: String,
        #[arg(long)]
        amount: Option<f64>,
        /// Record date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Add a visit-log entry
    Visit {
        customer: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Add a contract
    Contract {
        customer: String,
        amount: f64,
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Subcommand)]
enum WeightsAction {
    /// Show the current weight vector
    Show,
    /// Set the weight vector (components must sum to 1.0)
    Set {
        #[arg(long)]
        leads: f64,
        #[arg(long)]
        prospects: f64,
        #[arg(long)]
        phone_calls: f64,
        #[arg(long)]
        visits: f64,
        #[arg(long)]
        contracts: f64,
        #[arg(long)]
        profit: f64,
    },
}

fn today() -> String {
    chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    let db = match &cli.db {
        Some(path) => Database::open_at(path).await,
        None => Database::open().await,
    };
    let db = match db {
        Ok(db) => db,
        Err(e) => {
            eprintln!("failed to open database: {e}");
            std::process::exit(1);
        }
    };
    let dw = SalesDW::new(db);

    if let Err(e) = run(&dw, cli.command).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(dw: &SalesDW, command: Commands) -> salesdw::Result<()> {
    match command {
        Commands::Report { period, json } => {
            let summary = dw.report_summary(PeriodKind::parse(&period)).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("新增线索      {}", summary.new_leads);
                println!("新增潜在客户  {}", summary.new_prospects);
                println!("电话联系      {}", summary.phone_calls);
                println!("拜访数量      {}", summary.visits);
                println!("转化率        {}%", summary.conversion_rate);
                println!("潜在价值      {:.2}", summary.potential_value);
                println!("合同金额      {:.2}", summary.contract_value);
            }
        }
        Commands::Stats { period, json } => {
            let kind = PeriodKind::parse(&period);
            let rows = match kind {
                PeriodKind::Weekly => dw.weekly_stats().await,
                PeriodKind::Monthly => dw.monthly_stats().await,
                PeriodKind::Quarterly => dw.quarterly_stats().await,
                PeriodKind::Yearly => dw.yearly_stats().await,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("{:<8} 线索  潜在  电话  拜访", "");
                for row in rows {
                    println!(
                        "{:<8} {:>4}  {:>4}  {:>4}  {:>4}",
                        row.name, row.new_leads, row.new_prospects, row.phone_calls, row.visits
                    );
                }
            }
        }
        Commands::Goals { annual, json } => {
            if annual {
                let totals = dw.annual_goals().await;
                if json {
                    println!("{}", serde_json::to_string_pretty(&totals)?);
                } else {
                    for (metric, p) in totals {
                        println!("{metric:?}: {:.0} / {:.0}", p.actual, p.target);
                    }
                }
            } else {
                let quarters = dw.goals_by_quarter().await;
                if json {
                    println!("{}", serde_json::to_string_pretty(&quarters)?);
                } else {
                    for (quarter, progress) in quarters {
                        println!("{quarter}");
                        for (metric, p) in progress {
                            println!("  {metric:?}: {:.0} / {:.0}", p.actual, p.target);
                        }
                    }
                }
            }
        }
        Commands::Distribution { json } => {
            let slices = dw.customer_distribution().await;
            if json {
                println!("{}", serde_json::to_string_pretty(&slices)?);
            } else if slices.is_empty() {
                println!("no records");
            } else {
                for slice in slices {
                    println!("{}: {}%", slice.name, slice.value);
                }
            }
        }
        Commands::Performance { period, json } => {
            let perf = dw.performance(PeriodKind::parse(&period)).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&perf)?);
            } else {
                println!("score: {}  grade: {}", perf.score, perf.grade);
            }
        }
        Commands::SyncCustomers => {
            let report = dw.sync_customers().await?;
            println!(
                "scanned {}, promoted {}, already customers {}",
                report.scanned, report.promoted, report.skipped_existing
            );
        }
        Commands::Add { target } => match target {
            AddTarget::Lead { name, amount, date } => {
                let record = salesdw::PipelineRecord {
                    name,
                    amount,
                    date: Some(date.unwrap_or_else(today)),
                    ..Default::default()
                };
                let (id, promotion) = dw.save_pipeline_record(collections::LEADS, record).await?;
                println!("added lead #{id}");
                if promotion.is_some() {
                    println!("promoted to customer");
                }
            }
            AddTarget::Visit { customer, date } => {
                let record = salesdw::Visit {
                    id: None,
                    customer: Some(customer),
                    date: Some(date.unwrap_or_else(today)),
                };
                let id = dw.add_record(collections::VISITS, &record).await?;
                println!("added visit #{id}");
            }
            AddTarget::Contract { customer, amount, date } => {
                let record = salesdw::Contract {
                    id: None,
                    customer: Some(customer),
                    amount: Some(amount),
                    date: Some(date.unwrap_or_else(today)),
                };
                let id = dw.add_record(collections::CONTRACTS, &record).await?;
                println!("added contract #{id}");
            }
        },
        Commands::Weights { action } => match action {
            WeightsAction::Show => {
                let weights = dw.weights().await?;
                println!("{}", serde_json::to_string_pretty(&weights)?);
            }
            WeightsAction::Set {
                leads,
                prospects,
                phone_calls,
                visits,
                contracts,
                profit,
            } => {
                let weights = Weights {
                    leads,
                    prospects,
                    phone_calls,
                    visits,
                    contracts,
                    profit,
                };
                dw.save_weights(&weights).await?;
                println!("weights saved");
            }
        },
        Commands::Status => {
            for (collection, count) in dw.status().await? {
                println!("{collection:<12} {count}");
            }
        }
        Commands::Reset { yes } => {
            if !yes {
                eprintln!("refusing to wipe without --yes");
                std::process::exit(2);
            }
            let removed = dw.reset().await?;
            println!("removed {removed} records");
        }
    }
    Ok(())
}
