use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::BranchScope;
use crate::models::Plan;

/// Targets in force for one month and scope, as seen from a given day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EffectivePlan {
    pub daily_target: f64,
    pub monthly_target: f64,
    pub days_elapsed_in_month: u32,
    pub days_in_month: u32,
}

/// Number of days in `month` of `year`: the first of the following month minus one day.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };

    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(30)
}

/// Resolves the targets for the month containing `today`.
///
/// A single branch takes the first matching plan row (or zeros). All branches
/// sums every plan row for that month.
pub fn resolve_plan(plans: &[Plan], scope: BranchScope, today: NaiveDate) -> EffectivePlan {
    let (year, month) = (today.year(), today.month());
    let in_month = |plan: &&Plan| plan.year == year && plan.month == month;

    let (daily_target, monthly_target) = match scope {
        BranchScope::Branch(branch_id) => plans
            .iter()
            .filter(in_month)
            .find(|plan| plan.branch_id == branch_id)
            .map(|plan| (plan.daily_target, plan.monthly_target))
            .unwrap_or((0.0, 0.0)),
        BranchScope::All => plans
            .iter()
            .filter(in_month)
            .fold((0.0, 0.0), |(daily, monthly), plan| {
                (daily + plan.daily_target, monthly + plan.monthly_target)
            }),
    };

    tracing::debug!(?scope, year, month, daily_target, monthly_target, "resolved plan");

    EffectivePlan {
        daily_target,
        monthly_target,
        days_elapsed_in_month: today.day(),
        days_in_month: days_in_month(year, month),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(id: i64, branch_id: i64, year: i32, month: u32, daily: f64, monthly: f64) -> Plan {
        Plan {
            id,
            branch_id,
            branch_name: None,
            year,
            month,
            daily_target: daily,
            monthly_target: monthly,
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn month_lengths() {
        assert_eq!(days_in_month(2023, 1), 31);
        assert_eq!(days_in_month(2023, 4), 30);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2023, 12), 31);
    }

    #[test]
    fn single_branch_uses_its_own_row() {
        let plans = vec![
            plan(1, 1, 2024, 5, 900.0, 27000.0),
            plan(2, 1, 2024, 6, 1000.0, 30000.0),
            plan(3, 2, 2024, 6, 500.0, 15000.0),
        ];

        let effective = resolve_plan(&plans, BranchScope::Branch(1), date(2024, 6, 12));

        assert_eq!(effective.daily_target, 1000.0);
        assert_eq!(effective.monthly_target, 30000.0);
        assert_eq!(effective.days_elapsed_in_month, 12);
        assert_eq!(effective.days_in_month, 30);
    }

    #[test]
    fn single_branch_without_plan_is_zero() {
        let plans = vec![plan(1, 1, 2024, 5, 900.0, 27000.0)];

        let effective = resolve_plan(&plans, BranchScope::Branch(1), date(2024, 6, 1));

        assert_eq!(effective.daily_target, 0.0);
        assert_eq!(effective.monthly_target, 0.0);
    }

    #[test]
    fn all_branches_sums_the_month() {
        let plans = vec![
            plan(1, 1, 2024, 6, 1000.0, 30000.0),
            plan(2, 2, 2024, 6, 500.0, 15000.0),
            plan(3, 2, 2024, 7, 700.0, 21000.0),
            plan(4, 3, 2023, 6, 10.0, 300.0),
        ];

        let effective = resolve_plan(&plans, BranchScope::All, date(2024, 6, 20));

        assert_eq!(effective.daily_target, 1500.0);
        assert_eq!(effective.monthly_target, 45000.0);
    }

    #[test]
    fn all_branches_without_plans_is_zero() {
        let effective = resolve_plan(&[], BranchScope::All, date(2024, 12, 31));

        assert_eq!(effective.monthly_target, 0.0);
        assert_eq!(effective.days_elapsed_in_month, 31);
        assert_eq!(effective.days_in_month, 31);
    }
}
