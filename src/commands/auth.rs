use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{RegisterUser, Role, Session, User};
use rusqlite::{OptionalExtension, Row};

#[cfg(not(test))]
const BCRYPT_COST: u32 = 12;
// Minimum cost keeps the test suite fast
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

fn hash_password(password: &str) -> AppResult<String> {
    Ok(bcrypt::hash(password, BCRYPT_COST)?)
}

fn map_user(row: &Row) -> rusqlite::Result<(User, String)> {
    let role: String = row.get(2)?;
    let role = Role::parse(&role).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok((
        User {
            id: row.get(0)?,
            username: row.get(1)?,
            role,
            employee_id: row.get(3)?,
            created_at: row.get(4)?,
        },
        row.get(5)?,
    ))
}

/// Creates an account. The very first account becomes the administrator.
pub fn register(db: &Database, user: RegisterUser) -> AppResult<User> {
    let username = user.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::Validation("Username cannot be empty".to_string()));
    }
    if user.password.len() < 4 {
        return Err(AppError::Validation(
            "Password must be at least 4 characters".to_string(),
        ));
    }

    let conn = db.lock()?;

    let taken: i64 = conn.query_row(
        "SELECT COUNT(*) FROM users WHERE username = ?1",
        [&username],
        |row| row.get(0),
    )?;
    if taken > 0 {
        return Err(AppError::Validation(format!(
            "Username '{}' is already taken",
            username
        )));
    }

    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    let role = if existing == 0 { Role::Admin } else { Role::Employee };

    let password_hash = hash_password(&user.password)?;

    conn.execute(
        "INSERT INTO users (username, password_hash, role) VALUES (?1, ?2, ?3)",
        rusqlite::params![username, password_hash, role.as_str()],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(user_id = id, role = role.as_str(), "user registered");

    let (user, _) = conn.query_row(
        "SELECT id, username, role, employee_id, created_at, password_hash FROM users WHERE id = ?1",
        [id],
        map_user,
    )?;

    Ok(user)
}

pub fn login(db: &Database, username: &str, password: &str) -> AppResult<Session> {
    let conn = db.lock()?;

    let found = conn
        .query_row(
            "SELECT id, username, role, employee_id, created_at, password_hash FROM users WHERE username = ?1",
            [username.trim()],
            map_user,
        )
        .optional()?;

    let (user, stored_hash) =
        found.ok_or_else(|| AppError::Auth("Invalid username or password".to_string()))?;

    let verified = bcrypt::verify(password, &stored_hash).unwrap_or(false);
    if !verified {
        tracing::warn!(username = %user.username, "rejected login");
        return Err(AppError::Auth("Invalid username or password".to_string()));
    }

    Ok(Session {
        user_id: user.id,
        username: user.username,
        role: user.role,
        employee_id: user.employee_id,
    })
}

pub fn list_users(db: &Database, session: &Session) -> AppResult<Vec<User>> {
    session.require_admin()?;

    let conn = db.lock()?;
    let mut stmt = conn.prepare(
        "SELECT id, username, role, employee_id, created_at, password_hash FROM users ORDER BY username",
    )?;

    let users = stmt
        .query_map([], map_user)?
        .map(|r| r.map(|(user, _)| user))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(users)
}

pub fn set_user_role(db: &Database, session: &Session, user_id: i64, role: Role) -> AppResult<()> {
    session.require_admin()?;

    if user_id == session.user_id && role != Role::Admin {
        return Err(AppError::Validation(
            "Administrators cannot demote themselves".to_string(),
        ));
    }

    let conn = db.lock()?;
    let changed = conn.execute(
        "UPDATE users SET role = ?1 WHERE id = ?2",
        rusqlite::params![role.as_str(), user_id],
    )?;

    if changed == 0 {
        return Err(AppError::NotFound(format!("user {}", user_id)));
    }

    tracing::info!(user_id, role = role.as_str(), "role changed");
    Ok(())
}

/// Associates an account with the employee record its sales are attributed to.
pub fn link_employee(
    db: &Database,
    session: &Session,
    user_id: i64,
    employee_id: Option<i64>,
) -> AppResult<()> {
    session.require_admin()?;

    let conn = db.lock()?;

    if let Some(id) = employee_id {
        let exists: i64 =
            conn.query_row("SELECT COUNT(*) FROM employees WHERE id = ?1", [id], |row| {
                row.get(0)
            })?;
        if exists == 0 {
            return Err(AppError::NotFound(format!("employee {}", id)));
        }
    }

    let changed = conn.execute(
        "UPDATE users SET employee_id = ?1 WHERE id = ?2",
        rusqlite::params![employee_id, user_id],
    )?;

    if changed == 0 {
        return Err(AppError::NotFound(format!("user {}", user_id)));
    }

    Ok(())
}
