use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::listing::{ListSpec, Page, SortKey};
use crate::models::{AccountStatus, MobilizationStatus};

use super::database::{parsed_column, Database, SqlFilter};
use super::error::StorageError;

pub const RESERVIST_SORT_KEYS: &[SortKey] = &[
    ("last_name", "p.last_name"),
    ("rank", "r.rank"),
    ("service_number", "r.service_number"),
    ("date_of_rank", "r.date_of_rank"),
];

pub const STAFF_SORT_KEYS: &[SortKey] = &[
    ("last_name", "p.last_name"),
    ("position", "s.position"),
    ("email", "a.email"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservistRecord {
    pub account_id: String,
    pub email: String,
    pub account_status: AccountStatus,
    pub first_name: String,
    pub last_name: String,
    pub company_id: Option<String>,
    pub service_number: String,
    pub rank: String,
    pub date_of_rank: Option<NaiveDate>,
    pub branch: Option<String>,
    pub mobilization_status: MobilizationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaffRecord {
    pub account_id: String,
    pub email: String,
    pub account_status: AccountStatus,
    pub first_name: String,
    pub last_name: String,
    pub company_id: Option<String>,
    pub position: Option<String>,
    pub employee_no: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ReservistFilter {
    pub company_id: Option<String>,
    pub rank: Option<String>,
    pub mobilization_status: Option<MobilizationStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ReservistUpdate {
    pub company_id: Option<String>,
    pub rank: Option<String>,
    pub date_of_rank: Option<NaiveDate>,
    pub branch: Option<String>,
    pub mobilization_status: Option<MobilizationStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct StaffUpdate {
    pub company_id: Option<String>,
    pub position: Option<String>,
    pub employee_no: Option<String>,
}

const RESERVIST_SELECT: &str = r#"
    SELECT a.id, a.email, a.status, p.first_name, p.last_name, r.company_id,
           r.service_number, r.rank, r.date_of_rank, r.branch, r.mobilization_status
    FROM reservist_details r
    JOIN accounts a ON a.id = r.account_id
    JOIN profiles p ON p.account_id = r.account_id
"#;

const STAFF_SELECT: &str = r#"
    SELECT a.id, a.email, a.status, p.first_name, p.last_name, s.company_id,
           s.position, s.employee_no
    FROM staff_details s
    JOIN accounts a ON a.id = s.account_id
    JOIN profiles p ON p.account_id = s.account_id
"#;

pub struct PersonnelStore {
    db: Database,
}

impl PersonnelStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn get_reservist(&self, account_id: &str) -> Result<Option<ReservistRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    &format!("{RESERVIST_SELECT} WHERE r.account_id = ?1"),
                    params![account_id],
                    map_reservist,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn list_reservists(
        &self,
        filter: &ReservistFilter,
        spec: &ListSpec,
    ) -> Result<Page<ReservistRecord>, StorageError> {
        let mut sql_filter = SqlFilter::new();
        if let Some(company_id) = &filter.company_id {
            sql_filter.push("r.company_id = ?", company_id.clone());
        }
        if let Some(rank) = &filter.rank {
            sql_filter.push("r.rank = ?", rank.clone());
        }
        if let Some(status) = filter.mobilization_status {
            sql_filter.push("r.mobilization_status = ?", status);
        }
        if let Some(search) = &spec.search {
            sql_filter.push_search(
                &["p.first_name", "p.last_name", "r.service_number"],
                search,
            );
        }
        let where_clause = sql_filter.where_clause();

        self.db.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM reservist_details r JOIN profiles p ON p.account_id = r.account_id{where_clause}"
                ),
                sql_filter.params(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "{RESERVIST_SELECT}{where_clause}{}{}",
                spec.order_clause("r.account_id"),
                spec.limit_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(sql_filter.params(), map_reservist)?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(Page::new(items, spec, total as u64))
        })
    }

    pub fn update_reservist(
        &self,
        account_id: &str,
        update: &ReservistUpdate,
    ) -> Result<ReservistRecord, StorageError> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE reservist_details
                SET company_id = COALESCE(?2, company_id),
                    rank = COALESCE(?3, rank),
                    date_of_rank = COALESCE(?4, date_of_rank),
                    branch = COALESCE(?5, branch),
                    mobilization_status = COALESCE(?6, mobilization_status)
                WHERE account_id = ?1
                "#,
                params![
                    account_id,
                    update.company_id,
                    update.rank,
                    update.date_of_rank,
                    update.branch,
                    update.mobilization_status.map(|s| s.as_str())
                ],
            )
            .map_err(|err| StorageError::from_constraint(err, "unknown company"))
        })?;

        if updated == 0 {
            return Err(StorageError::not_found("reservist", account_id));
        }

        self.get_reservist(account_id)?
            .ok_or_else(|| StorageError::not_found("reservist", account_id))
    }

    /// Reservist counts keyed by mobilization status, optionally per company.
    pub fn mobilization_breakdown(
        &self,
        company_id: Option<&str>,
    ) -> Result<Vec<(MobilizationStatus, i64)>, StorageError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                r#"
                SELECT mobilization_status, COUNT(*)
                FROM reservist_details
                WHERE (?1 IS NULL OR company_id = ?1)
                GROUP BY mobilization_status
                ORDER BY mobilization_status
                "#,
            )?;
            let rows = stmt.query_map(params![company_id], |row| {
                Ok((parsed_column(row, 0)?, row.get(1)?))
            })?;

            let mut counts = Vec::new();
            for row in rows {
                counts.push(row?);
            }
            Ok(counts)
        })
    }

    pub fn get_staff(&self, account_id: &str) -> Result<Option<StaffRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    &format!("{STAFF_SELECT} WHERE s.account_id = ?1"),
                    params![account_id],
                    map_staff,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn list_staff(
        &self,
        company_id: Option<&str>,
        spec: &ListSpec,
    ) -> Result<Page<StaffRecord>, StorageError> {
        let mut sql_filter = SqlFilter::new();
        if let Some(company_id) = company_id {
            sql_filter.push("s.company_id = ?", company_id.to_string());
        }
        if let Some(search) = &spec.search {
            sql_filter.push_search(&["p.first_name", "p.last_name", "a.email"], search);
        }
        let where_clause = sql_filter.where_clause();

        self.db.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM staff_details s JOIN accounts a ON a.id = s.account_id JOIN profiles p ON p.account_id = s.account_id{where_clause}"
                ),
                sql_filter.params(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "{STAFF_SELECT}{where_clause}{}{}",
                spec.order_clause("s.account_id"),
                spec.limit_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(sql_filter.params(), map_staff)?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(Page::new(items, spec, total as u64))
        })
    }

    pub fn update_staff(
        &self,
        account_id: &str,
        update: &StaffUpdate,
    ) -> Result<StaffRecord, StorageError> {
        let updated = self.db.with_conn(|conn| {
            conn.execute(
                r#"
                UPDATE staff_details
                SET company_id = COALESCE(?2, company_id),
                    position = COALESCE(?3, position),
                    employee_no = COALESCE(?4, employee_no)
                WHERE account_id = ?1
                "#,
                params![
                    account_id,
                    update.company_id,
                    update.position,
                    update.employee_no
                ],
            )
            .map_err(|err| StorageError::from_constraint(err, "unknown company"))
        })?;

        if updated == 0 {
            return Err(StorageError::not_found("staff member", account_id));
        }

        self.get_staff(account_id)?
            .ok_or_else(|| StorageError::not_found("staff member", account_id))
    }
}

fn map_reservist(row: &Row<'_>) -> rusqlite::Result<ReservistRecord> {
    Ok(ReservistRecord {
        account_id: row.get(0)?,
        email: row.get(1)?,
        account_status: parsed_column(row, 2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        company_id: row.get(5)?,
        service_number: row.get(6)?,
        rank: row.get(7)?,
        date_of_rank: row.get(8)?,
        branch: row.get(9)?,
        mobilization_status: parsed_column(row, 10)?,
    })
}

fn map_staff(row: &Row<'_>) -> rusqlite::Result<StaffRecord> {
    Ok(StaffRecord {
        account_id: row.get(0)?,
        email: row.get(1)?,
        account_status: parsed_column(row, 2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        company_id: row.get(5)?,
        position: row.get(6)?,
        employee_no: row.get(7)?,
    })
}
