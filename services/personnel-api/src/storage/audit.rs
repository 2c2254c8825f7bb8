use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::database::{json_column, Database, SqlFilter};
use super::error::StorageError;

pub const DEFAULT_AUDIT_LIMIT: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: String,
    pub actor_id: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub details: Value,
    pub created_at: String,
    pub signature: String,
}

#[derive(Clone, Debug, Default)]
pub struct AuditFilter {
    pub actor_id: Option<String>,
    pub entity_type: Option<String>,
    pub action: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub limit: Option<usize>,
}

pub struct AuditStore {
    db: Database,
}

impl AuditStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn write(&self, entry: &AuditLogEntry) -> Result<(), StorageError> {
        self.db.with_conn(|conn| insert_entry(conn, entry))
    }

    pub fn get(&self, log_id: &str) -> Result<Option<AuditLogEntry>, StorageError> {
        self.db.with_conn(|conn| {
            let entry = conn
                .query_row(
                    r#"
                    SELECT id, actor_id, action, entity_type, entity_id, details, created_at, signature
                    FROM audit_logs
                    WHERE id = ?1
                    "#,
                    params![log_id],
                    map_entry,
                )
                .optional()?;
            Ok(entry)
        })
    }

    pub fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditLogEntry>, StorageError> {
        let mut sql_filter = SqlFilter::new();
        if let Some(actor_id) = &filter.actor_id {
            sql_filter.push("actor_id = ?", actor_id.clone());
        }
        if let Some(entity_type) = &filter.entity_type {
            sql_filter.push("entity_type = ?", entity_type.clone());
        }
        if let Some(action) = &filter.action {
            sql_filter.push("action = ?", action.clone());
        }
        if let Some(start) = &filter.start_time {
            sql_filter.push("created_at >= ?", start.clone());
        }
        if let Some(end) = &filter.end_time {
            sql_filter.push("created_at <= ?", end.clone());
        }

        let limit = filter.limit.unwrap_or(DEFAULT_AUDIT_LIMIT);
        let sql = format!(
            "SELECT id, actor_id, action, entity_type, entity_id, details, created_at, signature FROM audit_logs{} ORDER BY created_at DESC, rowid DESC LIMIT {}",
            sql_filter.where_clause(),
            limit
        );

        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(sql_filter.params(), map_entry)?;

            let mut results = Vec::new();
            for row in rows {
                results.push(row?);
            }
            Ok(results)
        })
    }
}

/// Inserts an entry on the given connection so that callers holding an open
/// transaction commit the audit row together with the change it describes.
pub(crate) fn insert_entry(conn: &Connection, entry: &AuditLogEntry) -> Result<(), StorageError> {
    let details = serde_json::to_string(&entry.details)?;
    conn.execute(
        r#"
        INSERT INTO audit_logs (
            id, actor_id, action, entity_type, entity_id, details, created_at, signature
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
        params![
            entry.id,
            entry.actor_id,
            entry.action,
            entry.entity_type,
            entry.entity_id,
            details,
            entry.created_at,
            entry.signature
        ],
    )?;

    debug!(log_id = %entry.id, action = %entry.action, "stored audit log entry");
    Ok(())
}

fn map_entry(row: &Row<'_>) -> rusqlite::Result<AuditLogEntry> {
    Ok(AuditLogEntry {
        id: row.get(0)?,
        actor_id: row.get(1)?,
        action: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: row.get(4)?,
        details: json_column(row, 5)?,
        created_at: row.get(6)?,
        signature: row.get(7)?,
    })
}
