use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::listing::{ListSpec, Page, SortKey};

use super::database::{Database, SqlFilter};
use super::error::StorageError;

pub const COMPANY_SORT_KEYS: &[SortKey] = &[
    ("code", "code"),
    ("name", "name"),
    ("created_at", "created_at"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub id: String,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Rows that reference a company and block its deletion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyDependents {
    pub staff: i64,
    pub reservists: i64,
    pub training_sessions: i64,
    pub announcements: i64,
}

impl CompanyDependents {
    pub fn is_empty(&self) -> bool {
        self.staff == 0 && self.reservists == 0 && self.training_sessions == 0 && self.announcements == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompanyUpdate {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

pub struct CompanyStore {
    db: Database,
}

impl CompanyStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, company: &CompanyRecord) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO companies (id, code, name, description, is_active, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    company.id,
                    company.code,
                    company.name,
                    company.description,
                    company.is_active,
                    company.created_at,
                    company.updated_at
                ],
            )
            .map_err(|err| StorageError::from_constraint(err, "company code already exists"))?;
            Ok(())
        })?;

        info!(company_id = %company.id, code = %company.code, "created company");
        Ok(())
    }

    pub fn get(&self, company_id: &str) -> Result<Option<CompanyRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    r#"
                    SELECT id, code, name, description, is_active, created_at, updated_at
                    FROM companies
                    WHERE id = ?1
                    "#,
                    params![company_id],
                    map_company,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn exists(&self, company_id: &str) -> Result<bool, StorageError> {
        Ok(self.get(company_id)?.is_some())
    }

    pub fn list(
        &self,
        is_active: Option<bool>,
        spec: &ListSpec,
    ) -> Result<Page<CompanyRecord>, StorageError> {
        let mut filter = SqlFilter::new();
        if let Some(active) = is_active {
            filter.push("is_active = ?", active);
        }
        if let Some(search) = &spec.search {
            filter.push_search(&["code", "name"], search);
        }
        let where_clause = filter.where_clause();

        self.db.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM companies{where_clause}"),
                filter.params(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT id, code, name, description, is_active, created_at, updated_at FROM companies{where_clause}{}{}",
                spec.order_clause("id"),
                spec.limit_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(filter.params(), map_company)?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(Page::new(items, spec, total as u64))
        })
    }

    pub fn update(
        &self,
        company_id: &str,
        update: &CompanyUpdate,
    ) -> Result<CompanyRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE companies
                SET code = COALESCE(?2, code),
                    name = COALESCE(?3, name),
                    description = COALESCE(?4, description),
                    is_active = COALESCE(?5, is_active),
                    updated_at = ?6
                WHERE id = ?1
                "#,
                params![
                    company_id,
                    update.code,
                    update.name,
                    update.description,
                    update.is_active,
                    now
                ],
            )
            .map_err(|err| StorageError::from_constraint(err, "company code already exists"))
        })?;

        if updated == 0 {
            return Err(StorageError::not_found("company", company_id));
        }

        self.get(company_id)?
            .ok_or_else(|| StorageError::not_found("company", company_id))
    }

    pub fn dependents(&self, company_id: &str) -> Result<CompanyDependents, StorageError> {
        self.db.with_conn(|conn| count_dependents(conn, company_id))
    }

    /// Deletes the company unless something still references it. The check
    /// and the delete run under one lock so nothing can be assigned between them.
    pub fn delete(&self, company_id: &str) -> Result<(), CompanyDeleteError> {
        self.db
            .with_conn(|conn| {
                let dependents = count_dependents(conn, company_id)?;
                if !dependents.is_empty() {
                    return Ok(Err(CompanyDeleteError::HasDependents(dependents)));
                }

                let deleted = conn.execute("DELETE FROM companies WHERE id = ?1", params![company_id])?;
                if deleted == 0 {
                    return Err(StorageError::not_found("company", company_id));
                }
                Ok(Ok(()))
            })
            .map_err(CompanyDeleteError::Storage)??;

        info!(company_id, "deleted company");
        Ok(())
    }

    pub fn count(&self) -> Result<i64, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM companies WHERE is_active = 1",
                [],
                |row| row.get(0),
            )?)
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompanyDeleteError {
    #[error("company still has dependents")]
    HasDependents(CompanyDependents),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

fn count_dependents(conn: &Connection, company_id: &str) -> Result<CompanyDependents, StorageError> {
    let count = |sql: &str| -> Result<i64, StorageError> {
        Ok(conn.query_row(sql, params![company_id], |row| row.get(0))?)
    };

    Ok(CompanyDependents {
        staff: count("SELECT COUNT(*) FROM staff_details WHERE company_id = ?1")?,
        reservists: count("SELECT COUNT(*) FROM reservist_details WHERE company_id = ?1")?,
        training_sessions: count("SELECT COUNT(*) FROM training_sessions WHERE company_id = ?1")?,
        announcements: count("SELECT COUNT(*) FROM announcements WHERE company_id = ?1")?,
    })
}

fn map_company(row: &Row<'_>) -> rusqlite::Result<CompanyRecord> {
    Ok(CompanyRecord {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        is_active: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
