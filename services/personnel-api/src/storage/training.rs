use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::listing::{ListSpec, Page, SortKey};
use crate::models::{RegistrationStatus, SessionStatus};

use super::audit::{insert_entry, AuditLogEntry};
use super::database::{parsed_column, Database, SqlFilter};
use super::error::StorageError;

pub const SESSION_SORT_KEYS: &[SortKey] = &[
    ("start_at", "start_at"),
    ("title", "title"),
    ("created_at", "created_at"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub company_id: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub capacity: Option<u32>,
    pub hours: f64,
    pub status: SessionStatus,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRecord {
    pub id: String,
    pub session_id: String,
    pub account_id: String,
    pub first_name: String,
    pub last_name: String,
    pub status: RegistrationStatus,
    pub registered_at: String,
}

/// Which sessions a caller may see.
#[derive(Debug, Clone, Default)]
pub enum SessionScope {
    #[default]
    All,
    /// Sessions owned by exactly this company.
    Company(String),
    /// Battalion-wide sessions plus those of the given company, if any.
    Audience(Option<String>),
}

#[derive(Debug, Clone, Default)]
pub struct SessionFilter {
    pub scope: SessionScope,
    pub status: Option<SessionStatus>,
    pub starting_after: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub capacity: Option<u32>,
    pub hours: Option<f64>,
    pub status: Option<SessionStatus>,
}

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("session is {0}")]
    SessionClosed(SessionStatus),
    #[error("session is full ({0} seats)")]
    SessionFull(u32),
    #[error("already registered")]
    AlreadyRegistered,
    #[error("not registered")]
    NotRegistered,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<rusqlite::Error> for RegistrationError {
    fn from(err: rusqlite::Error) -> Self {
        RegistrationError::Storage(StorageError::DatabaseError(err))
    }
}

/// Attended sessions for one reservist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceSummary {
    pub sessions: u32,
    pub hours: f64,
}

const SESSION_COLUMNS: &str = "id, title, description, location, company_id, start_at, end_at, capacity, hours, status, created_by, created_at, updated_at";

pub struct TrainingStore {
    db: Database,
}

impl TrainingStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create_session(&self, session: &SessionRecord) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO training_sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
                ),
                params![
                    session.id,
                    session.title,
                    session.description,
                    session.location,
                    session.company_id,
                    session.start_at,
                    session.end_at,
                    session.capacity,
                    session.hours,
                    session.status.as_str(),
                    session.created_by,
                    session.created_at,
                    session.updated_at
                ],
            )
            .map_err(|err| StorageError::from_constraint(err, "unknown company"))?;
            Ok(())
        })?;

        info!(session_id = %session.id, title = %session.title, "created training session");
        Ok(())
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<SessionRecord>, StorageError> {
        self.db.with_conn(|conn| fetch_session(conn, session_id))
    }

    pub fn list_sessions(
        &self,
        filter: &SessionFilter,
        spec: &ListSpec,
    ) -> Result<Page<SessionRecord>, StorageError> {
        let mut sql_filter = SqlFilter::new();
        match &filter.scope {
            SessionScope::All => {}
            SessionScope::Company(company_id) => {
                sql_filter.push("company_id = ?", company_id.clone());
            }
            SessionScope::Audience(Some(company_id)) => {
                sql_filter.push("(company_id IS NULL OR company_id = ?)", company_id.clone());
            }
            SessionScope::Audience(None) => sql_filter.push_raw("company_id IS NULL"),
        }
        if let Some(status) = filter.status {
            sql_filter.push("status = ?", status);
        }
        if let Some(after) = filter.starting_after {
            sql_filter.push("start_at >= ?", sql_timestamp(after));
        }
        if let Some(search) = &spec.search {
            sql_filter.push_search(&["title", "location"], search);
        }
        let where_clause = sql_filter.where_clause();

        self.db.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM training_sessions{where_clause}"),
                sql_filter.params(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM training_sessions{where_clause}{}{}",
                spec.order_clause("id"),
                spec.limit_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(sql_filter.params(), map_session)?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(Page::new(items, spec, total as u64))
        })
    }

    pub fn update_session(
        &self,
        session_id: &str,
        update: &SessionUpdate,
    ) -> Result<SessionRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                r#"
                UPDATE training_sessions
                SET title = COALESCE(?2, title),
                    description = COALESCE(?3, description),
                    location = COALESCE(?4, location),
                    start_at = COALESCE(?5, start_at),
                    end_at = COALESCE(?6, end_at),
                    capacity = COALESCE(?7, capacity),
                    hours = COALESCE(?8, hours),
                    status = COALESCE(?9, status),
                    updated_at = ?10
                WHERE id = ?1
                "#,
                params![
                    session_id,
                    update.title,
                    update.description,
                    update.location,
                    update.start_at,
                    update.end_at,
                    update.capacity,
                    update.hours,
                    update.status.map(|s| s.as_str()),
                    now
                ],
            )?)
        })?;

        if updated == 0 {
            return Err(StorageError::not_found("training session", session_id));
        }

        self.get_session(session_id)?
            .ok_or_else(|| StorageError::not_found("training session", session_id))
    }

    /// Deletes a session that has not been completed.
    pub fn delete_session(&self, session_id: &str) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            let session = fetch_session(conn, session_id)?
                .ok_or_else(|| StorageError::not_found("training session", session_id))?;
            if session.status == SessionStatus::Completed {
                return Err(StorageError::Conflict(
                    "completed training sessions cannot be deleted".into(),
                ));
            }
            conn.execute(
                "DELETE FROM training_sessions WHERE id = ?1",
                params![session_id],
            )?;
            Ok(())
        })?;

        info!(session_id, "deleted training session");
        Ok(())
    }

    /// Registers `account_id`, reviving a cancelled registration if present.
    /// `audit` is written in the same transaction as the seat.
    pub fn register(
        &self,
        session_id: &str,
        account_id: &str,
        audit: &AuditLogEntry,
    ) -> Result<RegistrationRecord, RegistrationError> {
        let registration_id = self
            .db
            .with_conn(|conn| Ok(register_locked(conn, session_id, account_id, audit)))
            .map_err(RegistrationError::Storage)??;

        info!(session_id, account_id, "registered for training");
        self.get_registration(session_id, account_id)?
            .filter(|r| r.id == registration_id)
            .ok_or_else(|| RegistrationError::NotRegistered)
    }

    pub fn cancel_registration(
        &self,
        session_id: &str,
        account_id: &str,
    ) -> Result<(), RegistrationError> {
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                r#"
                UPDATE training_registrations
                SET status = 'cancelled'
                WHERE session_id = ?1 AND account_id = ?2 AND status = 'registered'
                "#,
                params![session_id, account_id],
            )?)
        })?;
        if updated == 0 {
            return Err(RegistrationError::NotRegistered);
        }
        info!(session_id, account_id, "cancelled training registration");
        Ok(())
    }

    pub fn get_registration(
        &self,
        session_id: &str,
        account_id: &str,
    ) -> Result<Option<RegistrationRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    r#"
                    SELECT tr.id, tr.session_id, tr.account_id, p.first_name, p.last_name, tr.status, tr.registered_at
                    FROM training_registrations tr
                    JOIN profiles p ON p.account_id = tr.account_id
                    WHERE tr.session_id = ?1 AND tr.account_id = ?2
                    "#,
                    params![session_id, account_id],
                    map_registration,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn list_registrations(
        &self,
        session_id: &str,
    ) -> Result<Vec<RegistrationRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT tr.id, tr.session_id, tr.account_id, p.first_name, p.last_name, tr.status, tr.registered_at
                FROM training_registrations tr
                JOIN profiles p ON p.account_id = tr.account_id
                WHERE tr.session_id = ?1
                ORDER BY p.last_name, p.first_name
                "#,
            )?;
            let rows = stmt.query_map(params![session_id], map_registration)?;

            let mut registrations = Vec::new();
            for row in rows {
                registrations.push(row?);
            }
            Ok(registrations)
        })
    }

    pub fn set_attendance(
        &self,
        session_id: &str,
        account_id: &str,
        status: RegistrationStatus,
    ) -> Result<RegistrationRecord, RegistrationError> {
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                r#"
                UPDATE training_registrations
                SET status = ?3
                WHERE session_id = ?1 AND account_id = ?2 AND status != 'cancelled'
                "#,
                params![session_id, account_id, status.as_str()],
            )?)
        })?;
        if updated == 0 {
            return Err(RegistrationError::NotRegistered);
        }

        self.get_registration(session_id, account_id)?
            .ok_or(RegistrationError::NotRegistered)
    }

    pub fn attendance_summary(&self, account_id: &str) -> Result<AttendanceSummary, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row(
                r#"
                SELECT COUNT(*), COALESCE(SUM(s.hours), 0)
                FROM training_registrations tr
                JOIN training_sessions s ON s.id = tr.session_id
                WHERE tr.account_id = ?1 AND tr.status = 'attended'
                "#,
                params![account_id],
                |row| {
                    Ok(AttendanceSummary {
                        sessions: row.get(0)?,
                        hours: row.get(1)?,
                    })
                },
            )?)
        })
    }

    pub fn count_upcoming(&self, scope: &SessionScope) -> Result<i64, StorageError> {
        let filter = SessionFilter {
            scope: scope.clone(),
            status: Some(SessionStatus::Scheduled),
            starting_after: Some(Utc::now()),
        };
        let spec = ListSpec {
            search: None,
            sort_column: "start_at",
            descending: false,
            page: 1,
            per_page: 1,
        };
        Ok(self.list_sessions(&filter, &spec)?.total as i64)
    }
}

fn register_locked(
    conn: &mut Connection,
    session_id: &str,
    account_id: &str,
    audit: &AuditLogEntry,
) -> Result<String, RegistrationError> {
    let tx = conn.transaction()?;

    let session = fetch_session(&tx, session_id)?
        .ok_or_else(|| StorageError::not_found("training session", session_id))?;
    if !session.status.is_open() {
        return Err(RegistrationError::SessionClosed(session.status));
    }

    let existing: Option<(String, String)> = tx
        .query_row(
            "SELECT id, status FROM training_registrations WHERE session_id = ?1 AND account_id = ?2",
            params![session_id, account_id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    if let Some((_, status)) = &existing {
        if status != RegistrationStatus::Cancelled.as_str() {
            return Err(RegistrationError::AlreadyRegistered);
        }
    }

    if let Some(capacity) = session.capacity {
        let taken: u32 = tx.query_row(
            r#"
            SELECT COUNT(*) FROM training_registrations
            WHERE session_id = ?1 AND status IN ('registered', 'attended')
            "#,
            params![session_id],
            |row| row.get(0),
        )?;
        if taken >= capacity {
            return Err(RegistrationError::SessionFull(capacity));
        }
    }

    let now = Utc::now().to_rfc3339();
    let registration_id = match existing {
        Some((id, _)) => {
            tx.execute(
                "UPDATE training_registrations SET status = 'registered', registered_at = ?2 WHERE id = ?1",
                params![id, now],
            )?;
            id
        }
        None => {
            let id = Uuid::new_v4().to_string();
            tx.execute(
                r#"
                INSERT INTO training_registrations (id, session_id, account_id, status, registered_at)
                VALUES (?1, ?2, ?3, 'registered', ?4)
                "#,
                params![id, session_id, account_id, now],
            )?;
            id
        }
    };

    insert_entry(&tx, audit)?;
    tx.commit()?;
    Ok(registration_id)
}

fn fetch_session(conn: &Connection, session_id: &str) -> Result<Option<SessionRecord>, StorageError> {
    let record = conn
        .query_row(
            &format!("SELECT {SESSION_COLUMNS} FROM training_sessions WHERE id = ?1"),
            params![session_id],
            map_session,
        )
        .optional()?;
    Ok(record)
}

/// Timestamps are bound in the same text form rusqlite writes for `DateTime<Utc>`.
fn sql_timestamp(value: DateTime<Utc>) -> String {
    value.format("%F %T%.f%:z").to_string()
}

fn map_session(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        location: row.get(3)?,
        company_id: row.get(4)?,
        start_at: row.get(5)?,
        end_at: row.get(6)?,
        capacity: row.get(7)?,
        hours: row.get(8)?,
        status: parsed_column(row, 9)?,
        created_by: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

fn map_registration(row: &Row<'_>) -> rusqlite::Result<RegistrationRecord> {
    Ok(RegistrationRecord {
        id: row.get(0)?,
        session_id: row.get(1)?,
        account_id: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        status: parsed_column(row, 5)?,
        registered_at: row.get(6)?,
    })
}
