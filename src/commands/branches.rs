use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{Branch, CreateBranch, Session, UpdateBranch};
use rusqlite::{Connection, OptionalExtension, Row};

const BRANCH_COLUMNS: &str = "id, name, address, manager, phone";

fn map_branch(row: &Row) -> rusqlite::Result<Branch> {
    Ok(Branch {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        manager: row.get(3)?,
        phone: row.get(4)?,
    })
}

pub(crate) fn find_branch(conn: &Connection, id: i64) -> AppResult<Option<Branch>> {
    let branch = conn
        .query_row(
            &format!("SELECT {} FROM branches WHERE id = ?1", BRANCH_COLUMNS),
            [id],
            map_branch,
        )
        .optional()?;
    Ok(branch)
}

fn validate_name(name: &str) -> AppResult<()> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Branch name cannot be empty".to_string()));
    }
    Ok(())
}

pub fn list_branches(db: &Database) -> AppResult<Vec<Branch>> {
    let conn = db.lock()?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM branches ORDER BY name",
        BRANCH_COLUMNS
    ))?;

    let branches = stmt
        .query_map([], map_branch)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(branches)
}

pub fn get_branch(db: &Database, id: i64) -> AppResult<Branch> {
    let conn = db.lock()?;
    find_branch(&conn, id)?.ok_or_else(|| AppError::NotFound(format!("branch {}", id)))
}

pub fn create_branch(db: &Database, session: &Session, branch: CreateBranch) -> AppResult<Branch> {
    session.require_admin()?;
    validate_name(&branch.name)?;

    let conn = db.lock()?;

    conn.execute(
        "INSERT INTO branches (name, address, manager, phone) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![branch.name.trim(), branch.address, branch.manager, branch.phone],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(branch_id = id, name = %branch.name, "branch created");

    find_branch(&conn, id)?.ok_or_else(|| AppError::NotFound(format!("branch {}", id)))
}

pub fn update_branch(db: &Database, session: &Session, branch: UpdateBranch) -> AppResult<Branch> {
    session.require_admin()?;
    validate_name(&branch.name)?;

    let conn = db.lock()?;

    let changed = conn.execute(
        "UPDATE branches SET name = ?1, address = ?2, manager = ?3, phone = ?4 WHERE id = ?5",
        rusqlite::params![
            branch.name.trim(),
            branch.address,
            branch.manager,
            branch.phone,
            branch.id
        ],
    )?;

    if changed == 0 {
        return Err(AppError::NotFound(format!("branch {}", branch.id)));
    }

    find_branch(&conn, branch.id)?.ok_or_else(|| AppError::NotFound(format!("branch {}", branch.id)))
}

pub fn delete_branch(db: &Database, session: &Session, id: i64) -> AppResult<()> {
    session.require_admin()?;

    let mut conn = db.lock()?;
    let tx = conn.transaction()?;

    // Plans belong to exactly one branch; sales and employees just lose the link
    tx.execute("DELETE FROM plans WHERE branch_id = ?1", [id])?;
    tx.execute("UPDATE sales SET branch_id = NULL WHERE branch_id = ?1", [id])?;
    tx.execute("UPDATE employees SET branch_id = NULL WHERE branch_id = ?1", [id])?;

    let removed = tx.execute("DELETE FROM branches WHERE id = ?1", [id])?;
    if removed == 0 {
        return Err(AppError::NotFound(format!("branch {}", id)));
    }

    tx.commit()?;
    tracing::info!(branch_id = id, "branch deleted");

    Ok(())
}
