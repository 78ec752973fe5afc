use rusqlite::Connection;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::model::{collections, Customer, PipelineRecord, Possibility, Stage};
use crate::storage::{repository, Database};

/// Outcome of a promotion attempt. Promotion is idempotent: a qualifying
/// record whose name already exists as a customer is skipped, never
/// duplicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Promotion {
    Created { customer_id: i64 },
    AlreadyCustomer { customer_id: i64 },
}

impl Promotion {
    pub fn customer_id(&self) -> i64 {
        match self {
            Promotion::Created { customer_id } | Promotion::AlreadyCustomer { customer_id } => {
                *customer_id
            }
        }
    }
}

/// Report from a bulk pipeline-to-customer sync.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub scanned: u64,
    pub promoted: u64,
    pub skipped_existing: u64,
}

/// True if the collection participates in the pipeline.
fn is_pipeline_collection(collection: &str) -> bool {
    matches!(
        collection,
        collections::LEADS | collections::PROSPECTS | collections::TARGETS
    )
}

/// A record qualifies for automatic conversion when it reaches the
/// negotiation stage; target records additionally qualify on high
/// closing likelihood alone.
pub fn qualifies_for_conversion(collection: &str, record: &PipelineRecord) -> bool {
    if record.stage == Some(Stage::Negotiation) {
        return true;
    }
    collection == collections::TARGETS && record.possibility == Some(Possibility::High)
}

/// Explicit pipeline-to-customer conversion by source id. Copies
/// name/contact/industry/tags into a new customer row with today's join
/// date; the source record is untouched (copy, not move).
pub async fn convert_to_customer(
    db: &Database,
    collection: &'static str,
    id: i64,
) -> Result<Promotion> {
    if !is_pipeline_collection(collection) {
        return Err(Error::Validation(format!(
            "集合 {collection} 不支持转换为客户"
        )));
    }

    db.writer()
        .call(move |conn| {
            let Some(value) = repository::get(conn, collection, id)? else {
                return Err(Error::NotFound(format!("未找到记录: {collection}#{id}")));
            };
            let record: PipelineRecord =
                serde_json::from_value(value).map_err(|e| Error::Serde {
                    collection: collection.to_string(),
                    message: e.to_string(),
                })?;
            promote(conn, &record)
        })
        .await
        .map_err(flatten_call_error)
}

/// Save (add or full-replace) a pipeline record, firing the auto-convert
/// rule afterwards. Returns the record id and the promotion outcome, if
/// any.
pub async fn save_pipeline_record(
    db: &Database,
    collection: &'static str,
    record: PipelineRecord,
) -> Result<(i64, Option<Promotion>)> {
    if !is_pipeline_collection(collection) {
        return Err(Error::Validation(format!(
            "集合 {collection} 不是销售管道集合"
        )));
    }

    db.writer()
        .call(move |conn| {
            let body = serde_json::to_value(&record)?;
            let id = match record.id {
                Some(id) => {
                    repository::put(conn, collection, id, &body)?;
                    id
                }
                None => repository::add(conn, collection, &body)?,
            };

            let promotion = if qualifies_for_conversion(collection, &record) {
                Some(promote(conn, &record)?)
            } else {
                None
            };
            Ok((id, promotion))
        })
        .await
        .map_err(flatten_call_error)
}

/// Bulk sync: scan every pipeline collection and promote all qualifying
/// records.
pub async fn sync_customers(db: &Database) -> Result<SyncReport> {
    db.writer()
        .call(|conn| {
            let mut report = SyncReport::default();
            for collection in [collections::LEADS, collections::PROSPECTS, collections::TARGETS]
            {
                for value in repository::get_all(conn, collection)? {
                    let record: PipelineRecord = match serde_json::from_value(value) {
                        Ok(r) => r,
                        Err(e) => {
                            log::warn!("skipping undecodable record in {collection}: {e}");
                            continue;
                        }
                    };
                    report.scanned += 1;
                    if !qualifies_for_conversion(collection, &record) {
                        continue;
                    }
                    match promote(conn, &record)? {
                        Promotion::Created { .. } => report.promoted += 1,
                        Promotion::AlreadyCustomer { .. } => report.skipped_existing += 1,
                    }
                }
            }
            Ok(report)
        })
        .await
        .map_err(flatten_call_error)
}

/// The single promotion path: an existence check by customer name gates
/// the insert, executed on the writer connection so check and insert
/// cannot interleave with another promotion.
fn promote(conn: &Connection, source: &PipelineRecord) -> Result<Promotion> {
    if let Some(existing) = find_customer_by_name(conn, &source.name)? {
        return Ok(Promotion::AlreadyCustomer {
            customer_id: existing,
        });
    }

    let customer = Customer {
        id: None,
        name: source.name.clone(),
        contact: source.contact.clone(),
        customer_type: None,
        industry: source.industry.clone(),
        rating: None,
        tags: source.tags.clone(),
        join_date: Some(chrono::Local::now().date_naive().format("%Y-%m-%d").to_string()),
    };
    let body = serde_json::to_value(&customer)?;
    let customer_id = repository::add(conn, collections::CUSTOMERS, &body)?;
    log::info!("promoted {} to customer #{customer_id}", source.name);
    Ok(Promotion::Created { customer_id })
}

fn find_customer_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
    for value in repository::get_all(conn, collections::CUSTOMERS)? {
        if value.get("name").and_then(|n| n.as_str()) == Some(name) {
            return Ok(value.get("id").and_then(|i| i.as_i64()));
        }
    }
    Ok(None)
}

/// `tokio_rusqlite` wraps closure errors; unwrap ours back out so callers
/// can match on the domain variants (NotFound in particular).
pub(crate) fn flatten_call_error(e: tokio_rusqlite::Error<Error>) -> Error {
    match e {
        tokio_rusqlite::Error::Error(inner) => inner,
        other => Error::Database(other.to_string()),
    }
}
