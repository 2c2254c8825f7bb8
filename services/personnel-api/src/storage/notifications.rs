use chrono::Utc;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::database::Database;
use super::error::StorageError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub account_id: String,
    pub kind: String,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

pub struct NotificationStore {
    db: Database,
}

impl NotificationStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn notify(
        &self,
        account_id: &str,
        kind: &str,
        title: &str,
        message: &str,
    ) -> Result<NotificationRecord, StorageError> {
        let record = NotificationRecord {
            id: Uuid::new_v4().to_string(),
            account_id: account_id.to_string(),
            kind: kind.to_string(),
            title: title.to_string(),
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now().to_rfc3339(),
        };

        self.db.with_conn(|conn| {
            conn.execute(
                r#"
                INSERT INTO notifications (id, account_id, kind, title, message, is_read, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
                "#,
                params![
                    record.id,
                    record.account_id,
                    record.kind,
                    record.title,
                    record.message,
                    record.created_at
                ],
            )?;
            Ok(())
        })?;

        Ok(record)
    }

    pub fn list(
        &self,
        account_id: &str,
        unread_only: bool,
        limit: u32,
    ) -> Result<Vec<NotificationRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT id, account_id, kind, title, message, is_read, created_at
                FROM notifications
                WHERE account_id = ?1 AND (?2 = 0 OR is_read = 0)
                ORDER BY created_at DESC, rowid DESC
                LIMIT ?3
                "#,
            )?;
            let rows = stmt.query_map(params![account_id, unread_only, limit], map_notification)?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(items)
        })
    }

    /// Marks one notification read. Only the owner's notifications match.
    pub fn mark_read(&self, account_id: &str, notification_id: &str) -> Result<(), StorageError> {
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE id = ?1 AND account_id = ?2",
                params![notification_id, account_id],
            )?)
        })?;
        if updated == 0 {
            return Err(StorageError::not_found("notification", notification_id));
        }
        Ok(())
    }

    pub fn mark_all_read(&self, account_id: &str) -> Result<usize, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE notifications SET is_read = 1 WHERE account_id = ?1 AND is_read = 0",
                params![account_id],
            )?)
        })
    }

    pub fn count_unread(&self, account_id: &str) -> Result<i64, StorageError> {
        self.db.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT COUNT(*) FROM notifications WHERE account_id = ?1 AND is_read = 0",
                params![account_id],
                |row| row.get(0),
            )?)
        })
    }
}

fn map_notification(row: &Row<'_>) -> rusqlite::Result<NotificationRecord> {
    Ok(NotificationRecord {
        id: row.get(0)?,
        account_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::fixtures;

    #[test]
    fn owner_marks_read() {
        let db = Database::open_in_memory().unwrap();
        fixtures::reservist(&db, "r1", None);
        fixtures::reservist(&db, "r2", None);
        let store = NotificationStore::new(db);

        let first = store.notify("r1", "document", "Verified", "ok").unwrap();
        store.notify("r1", "training", "Registered", "ok").unwrap();

        assert!(matches!(
            store.mark_read("r2", &first.id),
            Err(StorageError::NotFound { .. })
        ));
        store.mark_read("r1", &first.id).unwrap();

        let unread = store.list("r1", true, 50).unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, "training");
        assert_eq!(store.list("r1", false, 50).unwrap().len(), 2);

        assert_eq!(store.mark_all_read("r1").unwrap(), 1);
        assert_eq!(store.count_unread("r1").unwrap(), 0);
    }
}
