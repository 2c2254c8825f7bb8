use rusqlite::Connection;

use super::error::StorageError;

pub const ACCOUNTS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    role TEXT NOT NULL CHECK (role IN ('super_admin', 'admin', 'staff', 'reservist')),
    status TEXT NOT NULL DEFAULT 'active',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS profiles (
    account_id TEXT PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    middle_name TEXT,
    phone TEXT,
    updated_at TEXT NOT NULL
);
"#;

pub const COMPANIES_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    description TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

pub const PERSONNEL_TABLES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS staff_details (
    account_id TEXT PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
    company_id TEXT REFERENCES companies(id),
    position TEXT,
    employee_no TEXT
);

CREATE TABLE IF NOT EXISTS reservist_details (
    account_id TEXT PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
    company_id TEXT REFERENCES companies(id),
    service_number TEXT NOT NULL UNIQUE,
    rank TEXT NOT NULL,
    date_of_rank TEXT,
    branch TEXT,
    mobilization_status TEXT NOT NULL DEFAULT 'ready'
);
"#;

pub const DOCUMENTS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    doc_type TEXT NOT NULL,
    file_name TEXT NOT NULL,
    storage_path TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    notes TEXT,
    reviewed_by TEXT REFERENCES accounts(id),
    reviewed_at TEXT,
    created_at TEXT NOT NULL
);
"#;

pub const TRAINING_TABLES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS training_sessions (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    description TEXT,
    location TEXT,
    company_id TEXT REFERENCES companies(id),
    start_at TEXT NOT NULL,
    end_at TEXT NOT NULL,
    capacity INTEGER,
    hours REAL NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'scheduled',
    created_by TEXT NOT NULL REFERENCES accounts(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS training_registrations (
    id TEXT PRIMARY KEY,
    session_id TEXT NOT NULL REFERENCES training_sessions(id) ON DELETE CASCADE,
    account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    status TEXT NOT NULL DEFAULT 'registered',
    registered_at TEXT NOT NULL,
    UNIQUE(session_id, account_id)
);
"#;

pub const ANNOUNCEMENTS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS announcements (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    body TEXT NOT NULL,
    priority TEXT NOT NULL DEFAULT 'normal',
    company_id TEXT REFERENCES companies(id),
    is_published INTEGER NOT NULL DEFAULT 0,
    published_at TEXT,
    created_by TEXT NOT NULL REFERENCES accounts(id),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notifications (
    id TEXT PRIMARY KEY,
    account_id TEXT NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    kind TEXT NOT NULL,
    title TEXT NOT NULL,
    message TEXT NOT NULL,
    is_read INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
"#;

pub const RIDS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS rids_records (
    account_id TEXT PRIMARY KEY REFERENCES accounts(id) ON DELETE CASCADE,
    sections TEXT NOT NULL DEFAULT '{}',
    status TEXT NOT NULL DEFAULT 'draft',
    submitted_at TEXT,
    reviewed_by TEXT REFERENCES accounts(id),
    reviewed_at TEXT,
    remarks TEXT,
    updated_at TEXT NOT NULL
);
"#;

pub const AUDIT_LOGS_TABLE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS audit_logs (
    id TEXT PRIMARY KEY,
    actor_id TEXT NOT NULL,
    action TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id TEXT,
    details TEXT NOT NULL,
    created_at TEXT NOT NULL,
    signature TEXT NOT NULL
);
"#;

pub const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS idx_reservist_company ON reservist_details(company_id);
CREATE INDEX IF NOT EXISTS idx_staff_company ON staff_details(company_id);
CREATE INDEX IF NOT EXISTS idx_documents_account ON documents(account_id, status);
CREATE INDEX IF NOT EXISTS idx_training_start ON training_sessions(start_at);
CREATE INDEX IF NOT EXISTS idx_registrations_account ON training_registrations(account_id);
CREATE INDEX IF NOT EXISTS idx_notifications_account ON notifications(account_id, is_read);
CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_logs(created_at);
"#;

pub fn init_database(conn: &Connection) -> Result<(), StorageError> {
    conn.execute_batch(ACCOUNTS_TABLE_SCHEMA)?;
    conn.execute_batch(COMPANIES_TABLE_SCHEMA)?;
    conn.execute_batch(PERSONNEL_TABLES_SCHEMA)?;
    conn.execute_batch(DOCUMENTS_TABLE_SCHEMA)?;
    conn.execute_batch(TRAINING_TABLES_SCHEMA)?;
    conn.execute_batch(ANNOUNCEMENTS_TABLE_SCHEMA)?;
    conn.execute_batch(RIDS_TABLE_SCHEMA)?;
    conn.execute_batch(AUDIT_LOGS_TABLE_SCHEMA)?;
    conn.execute_batch(INDEXES)?;
    Ok(())
}
