use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::listing::{ListSpec, Page, SortKey};
use crate::models::DocumentStatus;

use super::database::{parsed_column, Database, SqlFilter};
use super::error::StorageError;

pub const DOCUMENT_SORT_KEYS: &[SortKey] = &[
    ("created_at", "d.created_at"),
    ("doc_type", "d.doc_type"),
    ("status", "d.status"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub account_id: String,
    pub doc_type: String,
    pub file_name: String,
    pub storage_path: String,
    pub status: DocumentStatus,
    pub notes: Option<String>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub account_id: Option<String>,
    /// Restricts to documents owned by reservists of this company.
    pub company_id: Option<String>,
    pub status: Option<DocumentStatus>,
    pub doc_type: Option<String>,
}

pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, document: &DocumentRecord) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO documents (
                    id, account_id, doc_type, file_name, storage_path, status, notes,
                    reviewed_by, reviewed_at, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    document.id,
                    document.account_id,
                    document.doc_type,
                    document.file_name,
                    document.storage_path,
                    document.status.as_str(),
                    document.notes,
                    document.reviewed_by,
                    document.reviewed_at,
                    document.created_at
                ],
            )?;
            Ok(())
        })?;

        info!(document_id = %document.id, account_id = %document.account_id, "recorded document");
        Ok(())
    }

    pub fn get(&self, document_id: &str) -> Result<Option<DocumentRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    r#"
                    SELECT d.id, d.account_id, d.doc_type, d.file_name, d.storage_path, d.status,
                           d.notes, d.reviewed_by, d.reviewed_at, d.created_at
                    FROM documents d
                    WHERE d.id = ?1
                    "#,
                    params![document_id],
                    map_document,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn list(
        &self,
        filter: &DocumentFilter,
        spec: &ListSpec,
    ) -> Result<Page<DocumentRecord>, StorageError> {
        let mut sql_filter = SqlFilter::new();
        if let Some(account_id) = &filter.account_id {
            sql_filter.push("d.account_id = ?", account_id.clone());
        }
        if let Some(company_id) = &filter.company_id {
            sql_filter.push("r.company_id = ?", company_id.clone());
        }
        if let Some(status) = filter.status {
            sql_filter.push("d.status = ?", status);
        }
        if let Some(doc_type) = &filter.doc_type {
            sql_filter.push("d.doc_type = ?", doc_type.clone());
        }
        if let Some(search) = &spec.search {
            sql_filter.push_search(&["d.file_name", "d.doc_type"], search);
        }

        let from = "FROM documents d LEFT JOIN reservist_details r ON r.account_id = d.account_id";
        let where_clause = sql_filter.where_clause();

        self.db.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) {from}{where_clause}"),
                sql_filter.params(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT d.id, d.account_id, d.doc_type, d.file_name, d.storage_path, d.status, d.notes, d.reviewed_by, d.reviewed_at, d.created_at {from}{where_clause}{}{}",
                spec.order_clause("d.id"),
                spec.limit_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(sql_filter.params(), map_document)?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(Page::new(items, spec, total as u64))
        })
    }

    /// Moves a pending document to `status`. Returns `Conflict` when the
    /// document was already reviewed.
    pub fn review(
        &self,
        document_id: &str,
        status: DocumentStatus,
        reviewer_id: &str,
        notes: Option<&str>,
    ) -> Result<DocumentRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                r#"
                UPDATE documents
                SET status = ?2, reviewed_by = ?3, reviewed_at = ?4, notes = COALESCE(?5, notes)
                WHERE id = ?1 AND status = 'pending'
                "#,
                params![document_id, status.as_str(), reviewer_id, now, notes],
            )?)
        })?;

        let document = self
            .get(document_id)?
            .ok_or_else(|| StorageError::not_found("document", document_id))?;

        if updated == 0 {
            return Err(StorageError::Conflict(format!(
                "document already {}",
                document.status
            )));
        }

        info!(document_id, reviewer_id, status = %status, "reviewed document");
        Ok(document)
    }

    pub fn delete(&self, document_id: &str) -> Result<(), StorageError> {
        let deleted = self.db.with_conn(|conn| {
            Ok(conn.execute("DELETE FROM documents WHERE id = ?1", params![document_id])?)
        })?;
        if deleted == 0 {
            return Err(StorageError::not_found("document", document_id));
        }
        Ok(())
    }

    pub fn count_verified(&self, account_id: &str) -> Result<u32, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM documents WHERE account_id = ?1 AND status = 'verified'",
                params![account_id],
                |row| row.get(0),
            )?)
        })
    }

    pub fn count_pending(&self, company_id: Option<&str>) -> Result<i64, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row(
                r#"
                SELECT COUNT(*)
                FROM documents d
                LEFT JOIN reservist_details r ON r.account_id = d.account_id
                WHERE d.status = 'pending' AND (?1 IS NULL OR r.company_id = ?1)
                "#,
                params![company_id],
                |row| row.get(0),
            )?)
        })
    }
}

fn map_document(row: &Row<'_>) -> rusqlite::Result<DocumentRecord> {
    Ok(DocumentRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        doc_type: row.get(2)?,
        file_name: row.get(3)?,
        storage_path: row.get(4)?,
        status: parsed_column(row, 5)?,
        notes: row.get(6)?,
        reviewed_by: row.get(7)?,
        reviewed_at: row.get(8)?,
        created_at: row.get(9)?,
    })
}
