use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::types::{Type, Value};
use rusqlite::{Connection, Row};
use tracing::info;

use super::error::StorageError;
use super::schema::init_database;
use super::PERSONNEL_DB_FILENAME;

/// Shared handle to the personnel database. Cloning is cheap; every store
/// holds one and serializes access through the same connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(data_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join(PERSONNEL_DB_FILENAME);
        let is_new = !db_path.exists();
        let conn = Connection::open(&db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::initialize(conn, is_new)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize(conn, true)
    }

    fn initialize(conn: Connection, is_new: bool) -> Result<Self, StorageError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        init_database(&conn)?;
        if is_new {
            info!("initialized personnel database");
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|_| StorageError::ConnectionPoisoned)?;
        f(&mut conn)
    }
}

/// Accumulates `WHERE` conditions with numbered parameters.
#[derive(Debug, Default)]
pub struct SqlFilter {
    conditions: Vec<String>,
    values: Vec<Value>,
}

impl SqlFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// `condition` must contain exactly one `?`, which is bound to `value`.
    pub fn push(&mut self, condition: &str, value: impl Into<Value>) {
        self.values.push(value.into());
        let placeholder = format!("?{}", self.values.len());
        self.conditions.push(condition.replacen('?', &placeholder, 1));
    }

    pub fn push_raw(&mut self, condition: &str) {
        self.conditions.push(condition.to_string());
    }

    /// Case-insensitive substring match across `columns`.
    pub fn push_search(&mut self, columns: &[&str], term: &str) {
        if columns.is_empty() {
            return;
        }
        self.values.push(Value::Text(like_pattern(term)));
        let n = self.values.len();
        let clause = columns
            .iter()
            .map(|column| format!("{column} LIKE ?{n} ESCAPE '\\'"))
            .collect::<Vec<_>>()
            .join(" OR ");
        self.conditions.push(format!("({clause})"));
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn params(&self) -> rusqlite::ParamsFromIter<std::slice::Iter<'_, Value>> {
        rusqlite::params_from_iter(self.values.iter())
    }
}

fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Reads a column holding a parseable string (role, status enums).
pub(crate) fn parsed_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

/// Reads a column holding serialized JSON.
pub(crate) fn json_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<serde_json::Value> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_numbers_parameters_in_order() {
        let mut filter = SqlFilter::new();
        filter.push("status = ?", "active".to_string());
        filter.push_search(&["email", "last_name"], "doe");
        filter.push("company_id = ?", "alpha".to_string());

        assert_eq!(
            filter.where_clause(),
            " WHERE status = ?1 AND (email LIKE ?2 ESCAPE '\\' OR last_name LIKE ?2 ESCAPE '\\') AND company_id = ?3"
        );
    }

    #[test]
    fn empty_filter_has_no_where_clause() {
        assert_eq!(SqlFilter::new().where_clause(), "");
    }

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(like_pattern(" 50%_off "), "%50\\%\\_off%");
    }

    #[test]
    fn in_memory_database_applies_schema() {
        let db = Database::open_in_memory().expect("open");
        let tables: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                    [],
                    |row| row.get(0),
                )?)
            })
            .expect("query");
        assert_eq!(tables, 12);
    }
}
