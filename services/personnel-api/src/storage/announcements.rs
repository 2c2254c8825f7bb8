use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::listing::{ListSpec, Page, SortKey};
use crate::models::Priority;

use super::audit::{insert_entry, AuditLogEntry};
use super::database::{parsed_column, Database, SqlFilter};
use super::error::StorageError;

/// Feed order: most pressing first, then most recently published.
const PRIORITY_RANK: &str = "CASE priority WHEN 'urgent' THEN 3 WHEN 'high' THEN 2 WHEN 'normal' THEN 1 ELSE 0 END";

pub const ANNOUNCEMENT_SORT_KEYS: &[SortKey] = &[
    ("priority", PRIORITY_RANK),
    ("published_at", "published_at"),
    ("created_at", "created_at"),
    ("title", "title"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnouncementRecord {
    pub id: String,
    pub title: String,
    pub body: String,
    pub priority: Priority,
    pub company_id: Option<String>,
    pub is_published: bool,
    pub published_at: Option<String>,
    pub created_by: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default)]
pub struct AnnouncementFilter {
    /// Readers see only published announcements for their audience.
    pub audience: Option<Option<String>>,
    /// Restricts to announcements targeting exactly this company.
    pub company_id: Option<String>,
    pub published: Option<bool>,
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Default)]
pub struct AnnouncementUpdate {
    pub title: Option<String>,
    pub body: Option<String>,
    pub priority: Option<Priority>,
}

pub struct AnnouncementStore {
    db: Database,
}

impl AnnouncementStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, announcement: &AnnouncementRecord) -> Result<(), StorageError> {
        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO announcements (
                    id, title, body, priority, company_id, is_published, published_at,
                    created_by, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    announcement.id,
                    announcement.title,
                    announcement.body,
                    announcement.priority.as_str(),
                    announcement.company_id,
                    announcement.is_published,
                    announcement.published_at,
                    announcement.created_by,
                    announcement.created_at,
                    announcement.updated_at
                ],
            )
            .map_err(|err| StorageError::from_constraint(err, "unknown company"))?;
            Ok(())
        })?;

        info!(announcement_id = %announcement.id, "created announcement");
        Ok(())
    }

    pub fn get(&self, announcement_id: &str) -> Result<Option<AnnouncementRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    r#"
                    SELECT id, title, body, priority, company_id, is_published, published_at,
                           created_by, created_at, updated_at
                    FROM announcements
                    WHERE id = ?1
                    "#,
                    params![announcement_id],
                    map_announcement,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn list(
        &self,
        filter: &AnnouncementFilter,
        spec: &ListSpec,
    ) -> Result<Page<AnnouncementRecord>, StorageError> {
        let mut sql_filter = SqlFilter::new();
        match &filter.audience {
            None => {}
            Some(Some(company_id)) => {
                sql_filter.push_raw("is_published = 1");
                sql_filter.push("(company_id IS NULL OR company_id = ?)", company_id.clone());
            }
            Some(None) => {
                sql_filter.push_raw("is_published = 1");
                sql_filter.push_raw("company_id IS NULL");
            }
        }
        if let Some(company_id) = &filter.company_id {
            sql_filter.push("company_id = ?", company_id.clone());
        }
        if let Some(published) = filter.published {
            sql_filter.push("is_published = ?", published);
        }
        if let Some(priority) = filter.priority {
            sql_filter.push("priority = ?", priority);
        }
        if let Some(search) = &spec.search {
            sql_filter.push_search(&["title", "body"], search);
        }
        let where_clause = sql_filter.where_clause();

        self.db.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM announcements{where_clause}"),
                sql_filter.params(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT id, title, body, priority, company_id, is_published, published_at, created_by, created_at, updated_at FROM announcements{where_clause}{}{}",
                spec.order_clause("published_at DESC, created_at DESC, id"),
                spec.limit_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(sql_filter.params(), map_announcement)?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(Page::new(items, spec, total as u64))
        })
    }

    pub fn update(
        &self,
        announcement_id: &str,
        update: &AnnouncementUpdate,
    ) -> Result<AnnouncementRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                r#"
                UPDATE announcements
                SET title = COALESCE(?2, title),
                    body = COALESCE(?3, body),
                    priority = COALESCE(?4, priority),
                    updated_at = ?5
                WHERE id = ?1
                "#,
                params![
                    announcement_id,
                    update.title,
                    update.body,
                    update.priority.map(|p| p.as_str()),
                    now
                ],
            )?)
        })?;

        if updated == 0 {
            return Err(StorageError::not_found("announcement", announcement_id));
        }

        self.get(announcement_id)?
            .ok_or_else(|| StorageError::not_found("announcement", announcement_id))
    }

    pub fn delete(&self, announcement_id: &str) -> Result<(), StorageError> {
        let deleted = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM announcements WHERE id = ?1",
                params![announcement_id],
            )?)
        })?;
        if deleted == 0 {
            return Err(StorageError::not_found("announcement", announcement_id));
        }
        info!(announcement_id, "deleted announcement");
        Ok(())
    }

    /// Marks the announcement published, fans out one notification per
    /// recipient and appends `audit`, all in one transaction.
    pub fn publish(
        &self,
        announcement_id: &str,
        recipients: &[String],
        audit: &AuditLogEntry,
    ) -> Result<AnnouncementRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;

            let (title, is_published): (String, bool) = tx
                .query_row(
                    "SELECT title, is_published FROM announcements WHERE id = ?1",
                    params![announcement_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| StorageError::not_found("announcement", announcement_id))?;

            if is_published {
                return Err(StorageError::Conflict("announcement already published".into()));
            }

            tx.execute(
                "UPDATE announcements SET is_published = 1, published_at = ?2, updated_at = ?2 WHERE id = ?1",
                params![announcement_id, now],
            )?;

            {
                let mut stmt = tx.prepare(
                    r#"
                    INSERT INTO notifications (id, account_id, kind, title, message, is_read, created_at)
                    VALUES (?1, ?2, 'announcement', ?3, ?4, 0, ?5)
                    "#,
                )?;
                let message = format!("New announcement: {title}");
                for account_id in recipients {
                    stmt.execute(params![
                        Uuid::new_v4().to_string(),
                        account_id,
                        title,
                        message,
                        now
                    ])?;
                }
            }

            insert_entry(&tx, audit)?;
            tx.commit()?;
            Ok(())
        })?;

        info!(
            announcement_id,
            recipients = recipients.len(),
            "published announcement"
        );

        self.get(announcement_id)?
            .ok_or_else(|| StorageError::not_found("announcement", announcement_id))
    }
}

fn map_announcement(row: &Row<'_>) -> rusqlite::Result<AnnouncementRecord> {
    Ok(AnnouncementRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        body: row.get(2)?,
        priority: parsed_column(row, 3)?,
        company_id: row.get(4)?,
        is_published: row.get(5)?,
        published_at: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}
