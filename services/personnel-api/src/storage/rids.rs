use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::info;

use crate::models::RidsStatus;
use crate::rids::RidsSection;

use super::database::{json_column, parsed_column, Database};
use super::error::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RidsRecord {
    pub account_id: String,
    pub sections: Map<String, Value>,
    pub status: RidsStatus,
    pub submitted_at: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub remarks: Option<String>,
    pub updated_at: String,
}

impl RidsRecord {
    fn empty(account_id: &str) -> Self {
        Self {
            account_id: account_id.to_string(),
            sections: Map::new(),
            status: RidsStatus::Draft,
            submitted_at: None,
            reviewed_by: None,
            reviewed_at: None,
            remarks: None,
            updated_at: Utc::now().to_rfc3339(),
        }
    }
}

pub struct RidsStore {
    db: Database,
}

impl RidsStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the sheet, or an unsaved empty draft when none exists yet.
    pub fn get_or_empty(&self, account_id: &str) -> Result<RidsRecord, StorageError> {
        Ok(self
            .db
            .with_conn(|conn| fetch(conn, account_id))?
            .unwrap_or_else(|| RidsRecord::empty(account_id)))
    }

    pub fn save_section(
        &self,
        account_id: &str,
        section: RidsSection,
        payload: Value,
    ) -> Result<RidsRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;
            let mut record = fetch(&tx, account_id)?.unwrap_or_else(|| RidsRecord::empty(account_id));
            if !record.status.is_editable() {
                return Err(StorageError::Conflict(format!(
                    "RIDS is {} and cannot be edited",
                    record.status
                )));
            }

            record.sections.insert(section.as_str().to_string(), payload);
            record.updated_at = now.clone();
            let sections = serde_json::to_string(&record.sections)?;

            tx.execute(
                r#"
                INSERT INTO rids_records (account_id, sections, status, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(account_id) DO UPDATE SET sections = excluded.sections, updated_at = excluded.updated_at
                "#,
                params![account_id, sections, record.status.as_str(), now],
            )?;
            tx.commit()?;
            Ok(record)
        })
    }

    /// Moves the sheet from `from` to `to`, stamping submit or review columns.
    pub fn transition(
        &self,
        account_id: &str,
        from: &[RidsStatus],
        to: RidsStatus,
        reviewer_id: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<RidsRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        let record = self.db.with_conn(|conn| {
            let current = fetch(conn, account_id)?
                .ok_or_else(|| StorageError::not_found("RIDS record", account_id))?;
            if !from.contains(&current.status) {
                return Err(StorageError::Conflict(format!(
                    "RIDS is {} and cannot become {}",
                    current.status, to
                )));
            }

            match to {
                RidsStatus::Submitted => {
                    conn.execute(
                        r#"
                        UPDATE rids_records
                        SET status = ?2, submitted_at = ?3, updated_at = ?3
                        WHERE account_id = ?1
                        "#,
                        params![account_id, to.as_str(), now],
                    )?;
                }
                _ => {
                    conn.execute(
                        r#"
                        UPDATE rids_records
                        SET status = ?2, reviewed_by = ?3, reviewed_at = ?4, remarks = ?5, updated_at = ?4
                        WHERE account_id = ?1
                        "#,
                        params![account_id, to.as_str(), reviewer_id, now, remarks],
                    )?;
                }
            }

            fetch(conn, account_id)?.ok_or_else(|| StorageError::not_found("RIDS record", account_id))
        })?;

        info!(account_id, status = %record.status, "RIDS status changed");
        Ok(record)
    }
}

fn fetch(conn: &Connection, account_id: &str) -> Result<Option<RidsRecord>, StorageError> {
    let record = conn
        .query_row(
            r#"
            SELECT account_id, sections, status, submitted_at, reviewed_by, reviewed_at, remarks, updated_at
            FROM rids_records
            WHERE account_id = ?1
            "#,
            params![account_id],
            map_rids,
        )
        .optional()?;
    Ok(record)
}

fn map_rids(row: &Row<'_>) -> rusqlite::Result<RidsRecord> {
    let sections = match json_column(row, 1)? {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Ok(RidsRecord {
        account_id: row.get(0)?,
        sections,
        status: parsed_column(row, 2)?,
        submitted_at: row.get(3)?,
        reviewed_by: row.get(4)?,
        reviewed_at: row.get(5)?,
        remarks: row.get(6)?,
        updated_at: row.get(7)?,
    })
}
