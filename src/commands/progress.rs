use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{branches, plans, sales};
use crate::analytics::{
    aggregate_daily, project, resolve_plan, BranchScope, Clock, GridPolicy, Projection,
};
use crate::db::Database;
use crate::error::AppResult;
use crate::models::Session;

pub const ALL_BRANCHES_LABEL: &str = "All branches";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressView {
    pub scope: BranchScope,
    pub scope_label: String,
    pub as_of: NaiveDate,
    pub projection: Projection,
}

/// One full pass over fresh store data: sales are aggregated per day, the
/// month's plan is resolved for the scope, and progress is projected.
pub fn load_progress(
    db: &Database,
    session: &Session,
    scope: BranchScope,
    clock: &dyn Clock,
    policy: GridPolicy,
) -> AppResult<ProgressView> {
    session.require_admin()?;

    let today = clock.today();

    let (scope_label, scoped_sales) = match scope {
        BranchScope::All => (ALL_BRANCHES_LABEL.to_string(), sales::list_sales(db)?),
        BranchScope::Branch(id) => {
            let branch = branches::get_branch(db, id)?;
            (branch.name, sales::list_sales_for_branch(db, id)?)
        }
    };

    let daily = aggregate_daily(&scoped_sales)?;
    let plan_rows = plans::list_plans(db, scope.branch_id())?;
    let plan = resolve_plan(&plan_rows, scope, today);
    let projection = project(&daily, &plan, today, policy);

    tracing::info!(
        scope = %scope_label,
        %today,
        sales = scoped_sales.len(),
        days = daily.len(),
        completion = projection.plan_completion_percent,
        forecast = projection.forecast_percent,
        "progress refreshed"
    );

    Ok(ProgressView {
        scope,
        scope_label,
        as_of: today,
        projection,
    })
}

/// Holds the last successfully loaded view. A failed refresh leaves it in place.
#[derive(Debug, Default)]
pub struct ProgressBoard {
    current: Option<ProgressView>,
}

impl ProgressBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&ProgressView> {
        self.current.as_ref()
    }

    pub fn refresh(
        &mut self,
        db: &Database,
        session: &Session,
        scope: BranchScope,
        clock: &dyn Clock,
        policy: GridPolicy,
    ) -> Result<&ProgressView, String> {
        match load_progress(db, session, scope, clock, policy) {
            Ok(view) => Ok(&*self.current.insert(view)),
            Err(e) => {
                tracing::warn!(error = %e, ?scope, "progress refresh failed; keeping previous view");
                Err(e.into())
            }
        }
    }
}
