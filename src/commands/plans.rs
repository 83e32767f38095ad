use crate::db::Database;
use crate::error::{AppError, AppResult};
use crate::models::{CreatePlan, Plan, SavedPlan, Session, UpdatePlan};
use rusqlite::{Connection, OptionalExtension, Row};

const PLAN_SELECT: &str = "SELECT p.id, p.branch_id, b.name, p.year, p.month, p.daily_target, p.monthly_target
     FROM plans p
     LEFT JOIN branches b ON p.branch_id = b.id";

/// Relative gap between `daily * 30` and the monthly figure that earns a warning.
const TARGET_MISMATCH_TOLERANCE: f64 = 0.01;

fn map_plan(row: &Row) -> rusqlite::Result<Plan> {
    Ok(Plan {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        branch_name: row.get(2)?,
        year: row.get(3)?,
        month: row.get(4)?,
        daily_target: row.get(5)?,
        monthly_target: row.get(6)?,
    })
}

fn find_plan(conn: &Connection, id: i64) -> AppResult<Plan> {
    conn.query_row(&format!("{} WHERE p.id = ?1", PLAN_SELECT), [id], map_plan)
        .optional()?
        .ok_or_else(|| AppError::NotFound(format!("plan {}", id)))
}

fn validate_plan(
    conn: &Connection,
    branch_id: i64,
    year: i32,
    month: u32,
    daily_target: f64,
    monthly_target: f64,
) -> AppResult<()> {
    if !(1..=12).contains(&month) {
        return Err(AppError::Validation(format!("Month must be 1-12, got {}", month)));
    }
    if !(1900..=9999).contains(&year) {
        return Err(AppError::Validation(format!("Year {} is out of range", year)));
    }
    if !daily_target.is_finite() || daily_target < 0.0 {
        return Err(AppError::Validation("Daily target cannot be negative".to_string()));
    }
    if !monthly_target.is_finite() || monthly_target < 0.0 {
        return Err(AppError::Validation("Monthly target cannot be negative".to_string()));
    }
    if super::branches::find_branch(conn, branch_id)?.is_none() {
        return Err(AppError::NotFound(format!("branch {}", branch_id)));
    }
    Ok(())
}

fn ensure_unique(
    conn: &Connection,
    branch_id: i64,
    year: i32,
    month: u32,
    except_id: Option<i64>,
) -> AppResult<()> {
    let clash: Option<i64> = conn
        .query_row(
            "SELECT id FROM plans WHERE branch_id = ?1 AND year = ?2 AND month = ?3",
            rusqlite::params![branch_id, year, month],
            |row| row.get(0),
        )
        .optional()?;

    match clash {
        Some(id) if Some(id) != except_id => Err(AppError::Validation(format!(
            "Branch {} already has a plan for {}-{:02}",
            branch_id, year, month
        ))),
        _ => Ok(()),
    }
}

/// Soft check that the daily and monthly figures roughly agree. Never blocks a save.
pub fn target_mismatch_warning(daily_target: f64, monthly_target: f64) -> Option<String> {
    let implied = daily_target * 30.0;
    let gap = (implied - monthly_target).abs();

    if gap > monthly_target * TARGET_MISMATCH_TOLERANCE {
        Some(format!(
            "Daily target x 30 = {:.2} does not match monthly target {:.2}",
            implied, monthly_target
        ))
    } else {
        None
    }
}

fn saved(plan: Plan) -> SavedPlan {
    let warning = target_mismatch_warning(plan.daily_target, plan.monthly_target);
    if let Some(message) = &warning {
        tracing::warn!(plan_id = plan.id, branch_id = plan.branch_id, "{}", message);
    }
    SavedPlan { plan, warning }
}

pub fn list_plans(db: &Database, branch_id: Option<i64>) -> AppResult<Vec<Plan>> {
    let conn = db.lock()?;

    let plans = match branch_id {
        Some(id) => {
            let mut stmt = conn.prepare(&format!(
                "{} WHERE p.branch_id = ?1 ORDER BY p.year DESC, p.month DESC",
                PLAN_SELECT
            ))?;
            let rows = stmt
                .query_map([id], map_plan)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "{} ORDER BY p.year DESC, p.month DESC, b.name",
                PLAN_SELECT
            ))?;
            let rows = stmt
                .query_map([], map_plan)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };

    Ok(plans)
}

pub fn create_plan(db: &Database, session: &Session, plan: CreatePlan) -> AppResult<SavedPlan> {
    session.require_admin()?;

    let conn = db.lock()?;
    validate_plan(
        &conn,
        plan.branch_id,
        plan.year,
        plan.month,
        plan.daily_target,
        plan.monthly_target,
    )?;
    ensure_unique(&conn, plan.branch_id, plan.year, plan.month, None)?;

    conn.execute(
        "INSERT INTO plans (branch_id, year, month, daily_target, monthly_target) VALUES (?1, ?2, ?3, ?4, ?5)",
        rusqlite::params![
            plan.branch_id,
            plan.year,
            plan.month,
            plan.daily_target,
            plan.monthly_target
        ],
    )?;

    let id = conn.last_insert_rowid();
    tracing::info!(plan_id = id, branch_id = plan.branch_id, year = plan.year, month = plan.month, "plan created");

    Ok(saved(find_plan(&conn, id)?))
}

pub fn update_plan(db: &Database, session: &Session, plan: UpdatePlan) -> AppResult<SavedPlan> {
    session.require_admin()?;

    let conn = db.lock()?;
    validate_plan(
        &conn,
        plan.branch_id,
        plan.year,
        plan.month,
        plan.daily_target,
        plan.monthly_target,
    )?;
    ensure_unique(&conn, plan.branch_id, plan.year, plan.month, Some(plan.id))?;

    let changed = conn.execute(
        "UPDATE plans SET branch_id = ?1, year = ?2, month = ?3, daily_target = ?4, monthly_target = ?5 WHERE id = ?6",
        rusqlite::params![
            plan.branch_id,
            plan.year,
            plan.month,
            plan.daily_target,
            plan.monthly_target,
            plan.id
        ],
    )?;

    if changed == 0 {
        return Err(AppError::NotFound(format!("plan {}", plan.id)));
    }

    Ok(saved(find_plan(&conn, plan.id)?))
}

pub fn delete_plan(db: &Database, session: &Session, id: i64) -> AppResult<()> {
    session.require_admin()?;

    let conn = db.lock()?;
    let removed = conn.execute("DELETE FROM plans WHERE id = ?1", [id])?;

    if removed == 0 {
        return Err(AppError::NotFound(format!("plan {}", id)));
    }

    Ok(())
}
