//! Month-to-date plan progress: daily aggregation, plan resolution and the
//! month-end projection built from them.

pub mod aggregate;
pub mod clock;
pub mod plan;
pub mod projection;

use serde::{Deserialize, Serialize};

pub use aggregate::{aggregate_daily, DailyAggregate};
pub use clock::{Clock, FixedClock, SystemClock};
pub use plan::{days_in_month, resolve_plan, EffectivePlan};
pub use projection::{project, GridPolicy, Projection, ProjectionStatus, SeriesPoint};

/// Which branches a progress view covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BranchScope {
    All,
    Branch(i64),
}

impl BranchScope {
    pub fn branch_id(&self) -> Option<i64> {
        match self {
            BranchScope::All => None,
            BranchScope::Branch(id) => Some(*id),
        }
    }

    /// Parses `"all"` or a numeric branch id.
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Some(BranchScope::All);
        }
        value.parse().ok().map(BranchScope::Branch)
    }
}
