use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::error::{AppError, AppResult};

pub struct Database {
    pub conn: Mutex<Connection>,
}

impl Database {
    pub fn new(db_path: &Path) -> AppResult<Self> {
        if let Some(dir) = db_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(db_path)?;
        tracing::debug!(path = %db_path.display(), "opened database");

        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Database {
            conn: Mutex::new(conn),
        })
    }

    pub fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| AppError::LockPoisoned)
    }

    pub fn initialize(&self) -> AppResult<()> {
        let conn = self.lock()?;

        conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            -- Branches (points of sale)
            CREATE TABLE IF NOT EXISTS branches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                address TEXT,
                manager TEXT,
                phone TEXT
            );

            -- Employees
            CREATE TABLE IF NOT EXISTS employees (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                position TEXT,
                phone TEXT,
                branch_id INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (branch_id) REFERENCES branches(id)
            );

            -- Application accounts
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                role TEXT NOT NULL DEFAULT 'employee',
                employee_id INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (employee_id) REFERENCES employees(id)
            );

            -- Daily sales entries
            CREATE TABLE IF NOT EXISTS sales (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                revenue REAL NOT NULL,
                transaction_count INTEGER NOT NULL DEFAULT 0,
                average_check REAL NOT NULL DEFAULT 0,
                employee_id INTEGER,
                branch_id INTEGER,
                author_id INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (employee_id) REFERENCES employees(id),
                FOREIGN KEY (branch_id) REFERENCES branches(id),
                FOREIGN KEY (author_id) REFERENCES users(id)
            );

            -- Sales plans, one per branch per month
            CREATE TABLE IF NOT EXISTS plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                branch_id INTEGER NOT NULL,
                year INTEGER NOT NULL,
                month INTEGER NOT NULL,
                daily_target REAL NOT NULL,
                monthly_target REAL NOT NULL,
                UNIQUE (branch_id, year, month),
                FOREIGN KEY (branch_id) REFERENCES branches(id)
            );
            ",
        )?;

        // Pass the guard's connection through to avoid re-locking
        Self::migrate_conn(&conn)?;

        Ok(())
    }

    fn migrate_conn(conn: &Connection) -> AppResult<()> {
        ensure_column(conn, "sales", "notes", "ALTER TABLE sales ADD COLUMN notes TEXT")?;
        ensure_column(
            conn,
            "employees",
            "position",
            "ALTER TABLE employees ADD COLUMN position TEXT",
        )?;
        ensure_column(conn, "branches", "phone", "ALTER TABLE branches ADD COLUMN phone TEXT")?;

        Ok(())
    }
}

fn ensure_column(conn: &Connection, table: &str, column: &str, ddl: &str) -> AppResult<()> {
    let columns: Vec<String> = conn
        .prepare(&format!("PRAGMA table_info({})", table))?
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|r| r.ok())
        .collect();

    if !columns.iter().any(|c| c == column) {
        tracing::info!(table, column, "migrating: adding missing column");
        conn.execute(ddl, [])?;
    }

    Ok(())
}
