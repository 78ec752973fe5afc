use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;

use crate::error::{Error, Result};

// ── Records ────────────────────────────────────────────────────────

/// Read every record body in a collection, ordered by id.
pub fn get_all(conn: &Connection, collection: &str) -> Result<Vec<Value>> {
    let mut stmt =
        conn.prepare("SELECT body FROM records WHERE collection = ?1 ORDER BY id")?;
    let rows = stmt.query_map(params![collection], |row| row.get::<_, String>(0))?;

    let mut out = Vec::new();
    for body in rows {
        let body = body?;
        out.push(decode_body(collection, &body)?);
    }
    Ok(out)
}

/// Read one record by id.
pub fn get(conn: &Connection, collection: &str, id: i64) -> Result<Option<Value>> {
    let body: Option<String> = conn
        .query_row(
            "SELECT body FROM records WHERE collection = ?1 AND id = ?2",
            params![collection, id],
            |row| row.get(0),
        )
        .optional()?;
    body.map(|b| decode_body(collection, &b)).transpose()
}

/// Insert a record with the collection's next autoincrement id.
/// The assigned id is written into the stored body and returned.
pub fn add(conn: &Connection, collection: &str, record: &Value) -> Result<i64> {
    let id: i64 = conn.query_row(
        "SELECT COALESCE(MAX(id), 0) + 1 FROM records WHERE collection = ?1",
        params![collection],
        |row| row.get(0),
    )?;

    let mut body = record.clone();
    if let Some(obj) = body.as_object_mut() {
        obj.insert("id".into(), Value::from(id));
    }
    conn.execute(
        "INSERT INTO records (collection, id, body) VALUES (?1, ?2, ?3)",
        params![collection, id, body.to_string()],
    )?;
    Ok(id)
}

/// Full-record replace by id. No partial updates.
pub fn put(conn: &Connection, collection: &str, id: i64, record: &Value) -> Result<()> {
    let mut body = record.clone();
    if let Some(obj) = body.as_object_mut() {
        obj.insert("id".into(), Value::from(id));
    }
    let changed = conn.execute(
        "UPDATE records SET body = ?3, updated_at = datetime('now')
         WHERE collection = ?1 AND id = ?2",
        params![collection, id, body.to_string()],
    )?;
    if changed == 0 {
        return Err(Error::NotFound(format!(
            "未找到记录: {collection}#{id}"
        )));
    }
    Ok(())
}

/// Delete by id. Returns whether a row was removed.
pub fn remove(conn: &Connection, collection: &str, id: i64) -> Result<bool> {
    let count = conn.execute(
        "DELETE FROM records WHERE collection = ?1 AND id = ?2",
        params![collection, id],
    )?;
    Ok(count > 0)
}

/// Unfiltered record count for a collection.
pub fn count(conn: &Connection, collection: &str) -> Result<i64> {
    Ok(conn.query_row(
        "SELECT COUNT(*) FROM records WHERE collection = ?1",
        params![collection],
        |row| row.get(0),
    )?)
}

/// Remove every record in a collection. Returns the number removed.
pub fn clear(conn: &Connection, collection: &str) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM records WHERE collection = ?1",
        params![collection],
    )?)
}

fn decode_body(collection: &str, body: &str) -> Result<Value> {
    serde_json::from_str(body).map_err(|e| Error::Serde {
        collection: collection.to_string(),
        message: e.to_string(),
    })
}

// ── Config ─────────────────────────────────────────────────────────

pub fn get_config(conn: &Connection, key: &str) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT value FROM app_config WHERE key = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()?)
}

pub fn set_config(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO app_config (key, value, updated_at)
         VALUES (?1, ?2, datetime('now'))",
        params![key, value],
    )?;
    Ok(())
}
