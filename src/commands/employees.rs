use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{CreateEmployee, Employee, Session, UpdateEmployee};
use rusqlite::{Connection, OptionalExtension, Row};

const EMPLOYEE_SELECT: &str = "SELECT e.id, e.name, e.position, e.phone, e.branch_id, b.name, e.created_at
     FROM employees e
     LEFT JOIN branches b ON e.branch_id = b.id";

fn map_employee(row: &Row) -> rusqlite::Result<Employee> {
    Ok(Employee {
        id: row.get(0)?,
        name: row.get(1)?,
        position: row.get(2)?,
        phone: row.get(3)?,
        branch_id: row.get(4)?,
        branch_name: row.get(5)?,
        created_at: row.get(6)?,
    })
}

fn find_employee(conn: &Connection, id: i64) -> AppResult<Employee> {
    conn.query_row(
        &format!("{} WHERE e.id = ?1", EMPLOYEE_SELECT),
        [id],
        map_employee,
    )
    .optional()?
    .ok_or_else(|| AppError::NotFound(format!("employee {}", id)))
}

fn check_branch(conn: &Connection, branch_id: Option<i64>) -> AppResult<()> {
    if let Some(id) = branch_id {
        if super::branches::find_branch(conn, id)?.is_none() {
            return Err(AppError::NotFound(format!("branch {}", id)));
        }
    }
    Ok(())
}

pub fn list_employees(db: &Database) -> AppResult<Vec<Employee>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!("{} ORDER BY e.name", EMPLOYEE_SELECT))?;

    let employees = stmt
        .query_map([], map_employee)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(employees)
}

pub fn create_employee(
    db: &Database,
    session: &Session,
    employee: CreateEmployee,
) -> AppResult<Employee> {
    session.require_admin()?;

    if employee.name.trim().is_empty() {
        return Err(AppError::Validation("Employee name cannot be empty".to_string()));
    }

    let conn = db.lock()?;
    check_branch(&conn, employee.branch_id)?;

    conn.execute(
        "INSERT INTO employees (name, position, phone, branch_id) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![
            employee.name.trim(),
            employee.position,
            employee.phone,
            employee.branch_id
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(employee_id = id, "employee created");

    find_employee(&conn, id)
}

pub fn update_employee(
    db: &Database,
    session: &Session,
    employee: UpdateEmployee,
) -> AppResult<Employee> {
    session.require_admin()?;

    if employee.name.trim().is_empty() {
        return Err(AppError::Validation("Employee name cannot be empty".to_string()));
    }

    let conn = db.lock()?;
    check_branch(&conn, employee.branch_id)?;

    let changed = conn.execute(
        "UPDATE employees SET name = ?1, position = ?2, phone = ?3, branch_id = ?4 WHERE id = ?5",
        rusqlite::params![
            employee.name.trim(),
            employee.position,
            employee.phone,
            employee.branch_id,
            employee.id
        ],
    )?;

    if changed == 0 {
        return Err(AppError::NotFound(format!("employee {}", employee.id)));
    }

    find_employee(&conn, employee.id)
}

pub fn delete_employee(db: &Database, session: &Session, id: i64) -> AppResult<()> {
    session.require_admin()?;

    let conn = db.lock()?;

    // Check if employee has recorded sales
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sales WHERE employee_id = ?1",
        [id],
        |row| row.get(0),
    )?;

    if count > 0 {
        return Err(AppError::Validation(
            "Cannot delete employee with recorded sales".to_string(),
        ));
    }

    conn.execute("UPDATE users SET employee_id = NULL WHERE employee_id = ?1", [id])?;

    let removed = conn.execute("DELETE FROM employees WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(AppError::NotFound(format!("employee {}", id)));
    }

    Ok(())
}
