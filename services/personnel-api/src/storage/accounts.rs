use chrono::{NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::Role;
use crate::listing::{ListSpec, Page, SortKey};
use crate::models::{AccountStatus, MobilizationStatus};

use super::database::{parsed_column, Database, SqlFilter};
use super::error::StorageError;

pub const ACCOUNT_SORT_KEYS: &[SortKey] = &[
    ("email", "a.email"),
    ("created_at", "a.created_at"),
    ("last_name", "p.last_name"),
];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub account_id: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub status: AccountStatus,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaffDetails {
    pub company_id: Option<String>,
    pub position: Option<String>,
    pub employee_no: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservistDetails {
    pub company_id: Option<String>,
    pub service_number: String,
    pub rank: String,
    pub date_of_rank: Option<NaiveDate>,
    pub branch: Option<String>,
    pub mobilization_status: MobilizationStatus,
}

/// Everything written when an account is provisioned.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub staff: Option<StaffDetails>,
    pub reservist: Option<ReservistDetails>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountFilter {
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
}

pub struct AccountStore {
    db: Database,
}

impl AccountStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn create(&self, account: &NewAccount) -> Result<AccountRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        self.db.with_conn(|conn| {
            let tx = conn.transaction()?;

            tx.execute(
                r#"
                INSERT INTO accounts (id, email, role, status, created_at, updated_at)
                VALUES (?1, ?2, ?3, 'active', ?4, ?4)
                "#,
                params![account.id, account.email, account.role.as_str(), now],
            )
            .map_err(|err| {
                StorageError::from_constraint(err, "account id or email already registered")
            })?;

            tx.execute(
                r#"
                INSERT INTO profiles (account_id, first_name, last_name, middle_name, phone, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    account.id,
                    account.first_name,
                    account.last_name,
                    account.middle_name,
                    account.phone,
                    now
                ],
            )?;

            if let Some(staff) = &account.staff {
                tx.execute(
                    r#"
                    INSERT INTO staff_details (account_id, company_id, position, employee_no)
                    VALUES (?1, ?2, ?3, ?4)
                    "#,
                    params![
                        account.id,
                        staff.company_id,
                        staff.position,
                        staff.employee_no
                    ],
                )
                .map_err(|err| StorageError::from_constraint(err, "unknown company"))?;
            }

            if let Some(reservist) = &account.reservist {
                tx.execute(
                    r#"
                    INSERT INTO reservist_details (
                        account_id, company_id, service_number, rank, date_of_rank, branch, mobilization_status
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                    params![
                        account.id,
                        reservist.company_id,
                        reservist.service_number,
                        reservist.rank,
                        reservist.date_of_rank,
                        reservist.branch,
                        reservist.mobilization_status.as_str()
                    ],
                )
                .map_err(|err| {
                    StorageError::from_constraint(
                        err,
                        "service number already registered or unknown company",
                    )
                })?;
            }

            tx.commit()?;
            Ok(())
        })?;

        info!(account_id = %account.id, role = %account.role, "provisioned account");

        self.get(&account.id)?
            .ok_or_else(|| StorageError::not_found("account", account.id.clone()))
    }

    pub fn get(&self, account_id: &str) -> Result<Option<AccountRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    r#"
                    SELECT id, email, role, status, created_at, updated_at
                    FROM accounts
                    WHERE id = ?1
                    "#,
                    params![account_id],
                    map_account,
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn get_profile(&self, account_id: &str) -> Result<Option<ProfileRecord>, StorageError> {
        self.db.with_conn(|conn| {
            let record = conn
                .query_row(
                    r#"
                    SELECT account_id, first_name, last_name, middle_name, phone, updated_at
                    FROM profiles
                    WHERE account_id = ?1
                    "#,
                    params![account_id],
                    |row| {
                        Ok(ProfileRecord {
                            account_id: row.get(0)?,
                            first_name: row.get(1)?,
                            last_name: row.get(2)?,
                            middle_name: row.get(3)?,
                            phone: row.get(4)?,
                            updated_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
    }

    pub fn update_profile(
        &self,
        account_id: &str,
        update: &ProfileUpdate,
    ) -> Result<ProfileRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                r#"
                UPDATE profiles
                SET first_name = COALESCE(?2, first_name),
                    last_name = COALESCE(?3, last_name),
                    middle_name = COALESCE(?4, middle_name),
                    phone = COALESCE(?5, phone),
                    updated_at = ?6
                WHERE account_id = ?1
                "#,
                params![
                    account_id,
                    update.first_name,
                    update.last_name,
                    update.middle_name,
                    update.phone,
                    now
                ],
            )?)
        })?;

        if updated == 0 {
            return Err(StorageError::not_found("profile", account_id));
        }

        self.get_profile(account_id)?
            .ok_or_else(|| StorageError::not_found("profile", account_id))
    }

    pub fn set_status(
        &self,
        account_id: &str,
        status: AccountStatus,
    ) -> Result<AccountRecord, StorageError> {
        let now = Utc::now().to_rfc3339();
        let updated = self.db.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE accounts SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![account_id, status.as_str(), now],
            )?)
        })?;

        if updated == 0 {
            return Err(StorageError::not_found("account", account_id));
        }

        info!(account_id, status = %status, "changed account status");
        self.get(account_id)?
            .ok_or_else(|| StorageError::not_found("account", account_id))
    }

    /// Company assignment from staff or reservist details, if any.
    pub fn company_of(&self, account_id: &str) -> Result<Option<String>, StorageError> {
        self.db.with_conn(|conn| {
            let company: Option<Option<String>> = conn
                .query_row(
                    r#"
                    SELECT company_id FROM staff_details WHERE account_id = ?1
                    UNION ALL
                    SELECT company_id FROM reservist_details WHERE account_id = ?1
                    LIMIT 1
                    "#,
                    params![account_id],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(company.flatten())
        })
    }

    pub fn list(
        &self,
        filter: &AccountFilter,
        spec: &ListSpec,
    ) -> Result<Page<AccountSummary>, StorageError> {
        let mut sql_filter = SqlFilter::new();
        if let Some(role) = filter.role {
            sql_filter.push("a.role = ?", role.as_str().to_string());
        }
        if let Some(status) = filter.status {
            sql_filter.push("a.status = ?", status);
        }
        if let Some(search) = &spec.search {
            sql_filter.push_search(&["a.email", "p.first_name", "p.last_name"], search);
        }

        let from = "FROM accounts a LEFT JOIN profiles p ON p.account_id = a.id";
        let where_clause = sql_filter.where_clause();

        self.db.with_conn(|conn| {
            let total: i64 = conn.query_row(
                &format!("SELECT COUNT(*) {from}{where_clause}"),
                sql_filter.params(),
                |row| row.get(0),
            )?;

            let sql = format!(
                "SELECT a.id, a.email, a.role, a.status, p.first_name, p.last_name, a.created_at {from}{where_clause}{}{}",
                spec.order_clause("a.id"),
                spec.limit_clause()
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(sql_filter.params(), |row| {
                Ok(AccountSummary {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    role: parsed_column(row, 2)?,
                    status: parsed_column(row, 3)?,
                    first_name: row.get(4)?,
                    last_name: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?;

            let mut items = Vec::new();
            for row in rows {
                items.push(row?);
            }
            Ok(Page::new(items, spec, total as u64))
        })
    }

    /// Active account ids in an announcement audience. `None` means everyone.
    pub fn active_audience(&self, company_id: Option<&str>) -> Result<Vec<String>, StorageError> {
        self.db.with_conn(|conn| {
            let mut ids = Vec::new();
            match company_id {
                None => {
                    let mut stmt =
                        conn.prepare("SELECT id FROM accounts WHERE status = 'active' ORDER BY id")?;
                    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
                    for row in rows {
                        ids.push(row?);
                    }
                }
                Some(company_id) => {
                    let mut stmt = conn.prepare(
                        r#"
                        SELECT a.id FROM accounts a
                        JOIN staff_details s ON s.account_id = a.id
                        WHERE a.status = 'active' AND s.company_id = ?1
                        UNION
                        SELECT a.id FROM accounts a
                        JOIN reservist_details r ON r.account_id = a.id
                        WHERE a.status = 'active' AND r.company_id = ?1
                        ORDER BY 1
                        "#,
                    )?;
                    let rows = stmt.query_map(params![company_id], |row| row.get::<_, String>(0))?;
                    for row in rows {
                        ids.push(row?);
                    }
                }
            }
            Ok(ids)
        })
    }

    /// Seeds a super_admin on first start. Existing accounts are left alone.
    pub fn ensure_super_admin(&self, account_id: &str, email: &str) -> Result<bool, StorageError> {
        if self.get(account_id)?.is_some() {
            return Ok(false);
        }
        self.create(&NewAccount {
            id: account_id.to_string(),
            email: email.to_string(),
            role: Role::SuperAdmin,
            first_name: "Battalion".to_string(),
            last_name: "Administrator".to_string(),
            middle_name: None,
            phone: None,
            staff: None,
            reservist: None,
        })?;
        Ok(true)
    }
}

fn map_account(row: &Row<'_>) -> rusqlite::Result<AccountRecord> {
    Ok(AccountRecord {
        id: row.get(0)?,
        email: row.get(1)?,
        role: parsed_column(row, 2)?,
        status: parsed_column(row, 3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::listing::ListParams;

    fn reservist(id: &str, email: &str, service_number: &str) -> NewAccount {
        NewAccount {
            id: id.to_string(),
            email: email.to_string(),
            role: Role::Reservist,
            first_name: "Juan".to_string(),
            last_name: format!("Cruz-{id}"),
            middle_name: None,
            phone: None,
            staff: None,
            reservist: Some(ReservistDetails {
                company_id: None,
                service_number: service_number.to_string(),
                rank: "PVT".to_string(),
                date_of_rank: None,
                branch: None,
                mobilization_status: MobilizationStatus::Ready,
            }),
        }
    }

    #[test]
    fn create_and_fetch_account_with_profile() {
        let store = AccountStore::new(Database::open_in_memory().unwrap());
        let created = store
            .create(&reservist("r1", "r1@unit.mil", "SN-001"))
            .expect("create");
        assert_eq!(created.role, Role::Reservist);
        assert_eq!(created.status, AccountStatus::Active);

        let profile = store.get_profile("r1").unwrap().expect("profile");
        assert_eq!(profile.first_name, "Juan");
    }

    #[test]
    fn duplicate_email_is_a_conflict() {
        let store = AccountStore::new(Database::open_in_memory().unwrap());
        store.create(&reservist("r1", "dup@unit.mil", "SN-001")).unwrap();
        let err = store
            .create(&reservist("r2", "dup@unit.mil", "SN-002"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(store.get("r2").unwrap().is_none());
    }

    #[test]
    fn list_filters_by_search_and_sorts() {
        let store = AccountStore::new(Database::open_in_memory().unwrap());
        store.create(&reservist("r1", "alpha@unit.mil", "SN-001")).unwrap();
        store.create(&reservist("r2", "bravo@unit.mil", "SN-002")).unwrap();
        store.ensure_super_admin("root", "root@unit.mil").unwrap();

        let spec = ListParams {
            search: Some("unit.mil".into()),
            sort: Some("email".into()),
            order: Some("desc".into()),
            ..ListParams::default()
        }
        .resolve(ACCOUNT_SORT_KEYS)
        .unwrap();
        let page = store
            .list(
                &AccountFilter {
                    role: Some(Role::Reservist),
                    status: None,
                },
                &spec,
            )
            .unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].email, "bravo@unit.mil");
        assert_eq!(page.items[1].email, "alpha@unit.mil");
    }

    #[test]
    fn partial_profile_update_keeps_other_fields() {
        let store = AccountStore::new(Database::open_in_memory().unwrap());
        store.create(&reservist("r1", "r1@unit.mil", "SN-001")).unwrap();

        let profile = store
            .update_profile(
                "r1",
                &ProfileUpdate {
                    phone: Some("+63 900 000 0000".into()),
                    ..ProfileUpdate::default()
                },
            )
            .unwrap();
        assert_eq!(profile.first_name, "Juan");
        assert_eq!(profile.phone.as_deref(), Some("+63 900 000 0000"));
    }

    #[test]
    fn bootstrap_is_idempotent() {
        let store = AccountStore::new(Database::open_in_memory().unwrap());
        assert!(store.ensure_super_admin("root", "root@unit.mil").unwrap());
        assert!(!store.ensure_super_admin("root", "root@unit.mil").unwrap());
    }
}
