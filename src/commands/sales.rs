use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{average_check, CreateSale, Sale, Session, UpdateSale};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row};

const SALE_SELECT: &str = "SELECT s.id, s.date, s.revenue, s.transaction_count, s.average_check,
            s.employee_id, e.name, s.branch_id, b.name, s.notes, s.author_id, u.username
     FROM sales s
     LEFT JOIN employees e ON s.employee_id = e.id
     LEFT JOIN branches b ON s.branch_id = b.id
     LEFT JOIN users u ON s.author_id = u.id";

fn map_sale(row: &Row) -> rusqlite::Result<Sale> {
    Ok(Sale {
        id: row.get(0)?,
        date: row.get(1)?,
        revenue: row.get(2)?,
        transaction_count: row.get(3)?,
        average_check: row.get(4)?,
        employee_id: row.get(5)?,
        employee_name: row.get(6)?,
        branch_id: row.get(7)?,
        branch_name: row.get(8)?,
        notes: row.get(9)?,
        author_id: row.get(10)?,
        author_name: row.get(11)?,
    })
}

fn query_sales(conn: &Connection, filter: &str, params: &[&dyn rusqlite::ToSql]) -> AppResult<Vec<Sale>> {
    let mut stmt = conn.prepare(&format!(
        "{} {} ORDER BY s.date DESC, s.id DESC",
        SALE_SELECT, filter
    ))?;

    let sales = stmt
        .query_map(params, map_sale)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(sales)
}

fn find_sale(conn: &Connection, id: i64) -> AppResult<Sale> {
    conn.query_row(&format!("{} WHERE s.id = ?1", SALE_SELECT), [id], map_sale)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("sale {}", id)))
}

/// Normalizes an ISO date, rejecting anything that is not `YYYY-MM-DD`.
fn normalize_date(value: &str) -> AppResult<String> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", value)))?;
    Ok(date.format("%Y-%m-%d").to_string())
}

fn validate_amounts(revenue: f64, transaction_count: i64) -> AppResult<()> {
    if !revenue.is_finite() || revenue < 0.0 {
        return Err(AppError::Validation("Revenue must be a non-negative amount".to_string()));
    }
    if transaction_count < 0 {
        return Err(AppError::Validation(
            "Transaction count cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn ensure_can_modify(conn: &Connection, session: &Session, id: i64) -> AppResult<()> {
    if session.is_admin() {
        return Ok(());
    }

    let author: Option<i64> = conn
        .query_row("SELECT author_id FROM sales WHERE id = ?1", [id], |row| row.get(0))
        .optional()?;

    match author {
        None => Err(AppError::NotFound(format!("sale {}", id))),
        Some(author) if author == session.user_id => Ok(()),
        Some(_) => Err(AppError::Forbidden(
            "Only the author or an administrator can change this sale".to_string(),
        )),
    }
}

pub fn list_sales(db: &Database) -> AppResult<Vec<Sale>> {
    let conn = db.lock()?;
    query_sales(&conn, "", rusqlite::params![])
}

pub fn list_sales_for_branch(db: &Database, branch_id: i64) -> AppResult<Vec<Sale>> {
    let conn = db.lock()?;
    query_sales(&conn, "WHERE s.branch_id = ?1", rusqlite::params![branch_id])
}

pub fn list_my_sales(db: &Database, session: &Session) -> AppResult<Vec<Sale>> {
    let conn = db.lock()?;
    query_sales(&conn, "WHERE s.author_id = ?1", rusqlite::params![session.user_id])
}

pub fn create_sale(db: &Database, session: &Session, sale: CreateSale) -> AppResult<Sale> {
    let date = normalize_date(&sale.date)?;
    validate_amounts(sale.revenue, sale.transaction_count)?;

    // Employees default to their own record when none is given
    let employee_id = sale.employee_id.or(session.employee_id);
    let check = average_check(sale.revenue, sale.transaction_count);

    let conn = db.lock()?;

    conn.execute(
        "INSERT INTO sales (date, revenue, transaction_count, average_check, employee_id, branch_id, notes, author_id)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        rusqlite::params![
            date,
            sale.revenue,
            sale.transaction_count,
            check,
            employee_id,
            sale.branch_id,
            sale.notes,
            session.user_id
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(sale_id = id, %date, revenue = sale.revenue, "sale recorded");

    find_sale(&conn, id)
}

pub fn update_sale(db: &Database, session: &Session, sale: UpdateSale) -> AppResult<Sale> {
    let date = normalize_date(&sale.date)?;
    validate_amounts(sale.revenue, sale.transaction_count)?;

    let conn = db.lock()?;
    ensure_can_modify(&conn, session, sale.id)?;

    conn.execute(
        "UPDATE sales SET date = ?1, revenue = ?2, transaction_count = ?3, average_check = ?4,
             employee_id = ?5, branch_id = ?6, notes = ?7
         WHERE id = ?8",
        rusqlite::params![
            date,
            sale.revenue,
            sale.transaction_count,
            average_check(sale.revenue, sale.transaction_count),
            sale.employee_id,
            sale.branch_id,
            sale.notes,
            sale.id
        ],
    )?;

    find_sale(&conn, sale.id)
}

pub fn delete_sale(db: &Database, session: &Session, id: i64) -> AppResult<()> {
    let conn = db.lock()?;
    ensure_can_modify(&conn, session, id)?;

    let removed = conn.execute("DELETE FROM sales WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(AppError::NotFound(format!("sale {}", id)));
    }

    tracing::info!(sale_id = id, "sale deleted");

    Ok(())
}
