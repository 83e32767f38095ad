use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::aggregate::DailyAggregate;
use super::plan::EffectivePlan;

/// Number of day slots in the chart grid under [`GridPolicy::Fixed30`].
pub const FIXED_GRID_DAYS: u32 = 30;

/// How many day slots the month grid has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridPolicy {
    /// Always 30 consecutive days from the 1st. Day 31 is never plotted but
    /// still counts in the statistics; in February the last slots run into
    /// March and are excluded from statistics.
    #[default]
    Fixed30,
    /// One slot per day of the actual month.
    CalendarMonth,
}

impl GridPolicy {
    pub fn slots(&self, days_in_month: u32) -> u32 {
        match self {
            GridPolicy::Fixed30 => FIXED_GRID_DAYS,
            GridPolicy::CalendarMonth => days_in_month,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectionStatus {
    Ready,
    /// No sales, or no monthly target to measure against.
    NoData,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub day: u32,
    pub date: NaiveDate,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub status: ProjectionStatus,
    pub daily_target: f64,
    pub monthly_target: f64,
    pub days_elapsed: u32,
    pub days_remaining: u32,
    /// The daily target repeated once per grid slot.
    pub daily_target_line: Vec<f64>,
    /// Actual revenue for slots `1..=days_elapsed`.
    pub elapsed_series: Vec<SeriesPoint>,
    pub today_marker: Option<SeriesPoint>,
    pub current_revenue: f64,
    pub plan_completion_percent: f64,
    pub forecast_percent: f64,
    pub forecast_revenue: f64,
    pub avg_daily_revenue: f64,
    pub avg_check: f64,
    pub total_transactions: i64,
}

impl Projection {
    pub fn no_data() -> Self {
        Self {
            status: ProjectionStatus::NoData,
            daily_target: 0.0,
            monthly_target: 0.0,
            days_elapsed: 0,
            days_remaining: 0,
            daily_target_line: Vec::new(),
            elapsed_series: Vec::new(),
            today_marker: None,
            current_revenue: 0.0,
            plan_completion_percent: 0.0,
            forecast_percent: 0.0,
            forecast_revenue: 0.0,
            avg_daily_revenue: 0.0,
            avg_check: 0.0,
            total_transactions: 0,
        }
    }

    pub fn has_data(&self) -> bool {
        self.status == ProjectionStatus::Ready
    }
}

/// A dense grid slot; days without sales carry zeros.
#[derive(Debug, Clone, PartialEq)]
pub struct GridDay {
    pub slot: u32,
    pub aggregate: DailyAggregate,
}

/// Lays the month out as consecutive days from the 1st and left-joins the aggregates onto it.
pub fn build_grid(aggregates: &[DailyAggregate], today: NaiveDate, slots: u32) -> Vec<GridDay> {
    let by_date: HashMap<NaiveDate, &DailyAggregate> =
        aggregates.iter().map(|a| (a.date, a)).collect();
    let first = today.with_day(1).unwrap_or(today);

    first
        .iter_days()
        .take(slots as usize)
        .zip(1..)
        .map(|(date, slot)| GridDay {
            slot,
            aggregate: by_date
                .get(&date)
                .map(|a| (*a).clone())
                .unwrap_or_else(|| DailyAggregate::empty(date)),
        })
        .collect()
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Measures month-to-date progress against the plan and extrapolates a month-end figure.
///
/// The forecast assumes every remaining slot earns the mean daily revenue of
/// the elapsed ones. With nothing elapsed or nothing remaining the forecast is
/// the current figure.
pub fn project(
    aggregates: &[DailyAggregate],
    plan: &EffectivePlan,
    today: NaiveDate,
    policy: GridPolicy,
) -> Projection {
    if aggregates.is_empty() || plan.monthly_target == 0.0 {
        return Projection::no_data();
    }

    let slots = policy.slots(plan.days_in_month);
    let grid = build_grid(aggregates, today, slots);

    let days_elapsed = plan.days_elapsed_in_month.min(slots);
    let days_remaining = slots - days_elapsed;
    let elapsed = &grid[..days_elapsed as usize];

    // Statistics follow the calendar month, not the grid: the 31st counts
    // even though a 30-slot grid never plots it, and February's spill-over
    // slots never count
    let month_to_date = build_grid(aggregates, today, today.day());
    let current: Vec<&DailyAggregate> = month_to_date
        .iter()
        .map(|day| &day.aggregate)
        .filter(|a| a.date.year() == today.year() && a.date.month() == today.month())
        .collect();

    let current_revenue: f64 = current.iter().map(|a| a.revenue).sum();
    let plan_completion_percent = current_revenue / plan.monthly_target * 100.0;
    let avg_daily_revenue = mean(current.iter().map(|a| a.revenue));

    let (forecast_revenue, forecast_percent) = if days_elapsed > 0 && days_remaining > 0 {
        let forecast = current_revenue + avg_daily_revenue * days_remaining as f64;
        (forecast, forecast / plan.monthly_target * 100.0)
    } else {
        (current_revenue, plan_completion_percent)
    };

    let elapsed_series: Vec<SeriesPoint> = elapsed
        .iter()
        .map(|day| SeriesPoint {
            day: day.slot,
            date: day.aggregate.date,
            revenue: day.aggregate.revenue,
        })
        .collect();

    let today_marker = if (1..=slots).contains(&plan.days_elapsed_in_month) {
        elapsed_series.last().cloned()
    } else {
        None
    };

    tracing::debug!(
        slots,
        days_elapsed,
        days_remaining,
        current_revenue,
        forecast_revenue,
        "projected month"
    );

    Projection {
        status: ProjectionStatus::Ready,
        daily_target: plan.daily_target,
        monthly_target: plan.monthly_target,
        days_elapsed,
        days_remaining,
        daily_target_line: vec![plan.daily_target; slots as usize],
        elapsed_series,
        today_marker,
        current_revenue,
        plan_completion_percent,
        forecast_percent,
        forecast_revenue,
        avg_daily_revenue,
        avg_check: mean(current.iter().map(|a| a.average_check)),
        total_transactions: current.iter().map(|a| a.transaction_count).sum(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::plan::days_in_month;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn agg(d: NaiveDate, revenue: f64, transactions: i64, check: f64) -> DailyAggregate {
        DailyAggregate {
            date: d,
            revenue,
            transaction_count: transactions,
            average_check: check,
        }
    }

    fn plan_for(today: NaiveDate, daily: f64, monthly: f64) -> EffectivePlan {
        EffectivePlan {
            daily_target: daily,
            monthly_target: monthly,
            days_elapsed_in_month: today.day(),
            days_in_month: days_in_month(today.year(), today.month()),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn no_sales_is_no_data() {
        let today = date(2024, 6, 10);
        let projection = project(&[], &plan_for(today, 1000.0, 30000.0), today, GridPolicy::Fixed30);

        assert_eq!(projection, Projection::no_data());
        assert!(!projection.has_data());
    }

    #[test]
    fn zero_target_short_circuits_to_zero() {
        let today = date(2024, 6, 10);
        let sales = vec![agg(date(2024, 6, 2), 5000.0, 10, 500.0)];

        let projection = project(&sales, &plan_for(today, 0.0, 0.0), today, GridPolicy::Fixed30);

        assert_eq!(projection.status, ProjectionStatus::NoData);
        assert_eq!(projection.plan_completion_percent, 0.0);
        assert_eq!(projection.forecast_percent, 0.0);
        assert_eq!(projection.forecast_revenue, 0.0);
        assert_eq!(projection.avg_daily_revenue, 0.0);
        assert_eq!(projection.avg_check, 0.0);
        assert_eq!(projection.total_transactions, 0);
        assert!(projection.daily_target_line.is_empty());
    }

    #[test]
    fn steady_ten_days_forecasts_120_percent() {
        let today = date(2024, 6, 10);
        let sales: Vec<DailyAggregate> = (1..=10)
            .map(|d| agg(date(2024, 6, d), 1200.0, 12, 100.0))
            .collect();

        let projection = project(&sales, &plan_for(today, 1000.0, 30000.0), today, GridPolicy::Fixed30);

        assert_eq!(projection.days_elapsed, 10);
        assert_eq!(projection.days_remaining, 20);
        assert!(close(projection.current_revenue, 12000.0));
        assert!(close(projection.plan_completion_percent, 40.0));
        assert!(close(projection.avg_daily_revenue, 1200.0));
        assert!(close(projection.forecast_revenue, 36000.0));
        assert!(close(projection.forecast_percent, 120.0));
        assert_eq!(projection.total_transactions, 120);
        assert!(close(projection.avg_check, 100.0));
    }

    #[test]
    fn first_day_of_month() {
        let today = date(2024, 6, 1);
        let sales = vec![agg(today, 500.0, 5, 100.0)];

        let projection = project(&sales, &plan_for(today, 333.0, 10000.0), today, GridPolicy::Fixed30);

        assert!(close(projection.plan_completion_percent, 5.0));
        assert_eq!(projection.days_remaining, 29);
        assert!(close(projection.forecast_revenue, 15000.0));
        assert!(close(projection.forecast_percent, 150.0));
        assert_eq!(
            projection.today_marker,
            Some(SeriesPoint { day: 1, date: today, revenue: 500.0 })
        );
    }

    #[test]
    fn missing_days_are_zero_filled() {
        let today = date(2024, 6, 5);
        let sales = vec![
            agg(date(2024, 6, 1), 100.0, 1, 100.0),
            agg(date(2024, 6, 4), 300.0, 3, 100.0),
        ];

        let projection = project(&sales, &plan_for(today, 100.0, 3000.0), today, GridPolicy::Fixed30);

        let revenues: Vec<f64> = projection.elapsed_series.iter().map(|p| p.revenue).collect();
        assert_eq!(revenues, vec![100.0, 0.0, 0.0, 300.0, 0.0]);
        // Zero days pull the mean down: 400 / 5
        assert!(close(projection.avg_daily_revenue, 80.0));
        assert!(close(projection.avg_check, 40.0));
    }

    #[test]
    fn grid_is_always_thirty_slots() {
        let today = date(2024, 7, 15);
        let sales = vec![agg(date(2024, 7, 3), 10.0, 1, 10.0)];

        let projection = project(&sales, &plan_for(today, 50.0, 1500.0), today, GridPolicy::Fixed30);

        assert_eq!(projection.daily_target_line.len(), 30);
        assert!(projection.daily_target_line.iter().all(|t| *t == 50.0));
        assert_eq!(projection.days_remaining, 15);
    }

    #[test]
    fn thirty_first_is_counted_but_not_plotted_on_the_fixed_grid() {
        let today = date(2024, 7, 31);
        let sales = vec![
            agg(date(2024, 7, 30), 100.0, 1, 100.0),
            agg(date(2024, 7, 31), 900.0, 9, 100.0),
        ];

        let projection = project(&sales, &plan_for(today, 50.0, 1000.0), today, GridPolicy::Fixed30);

        assert_eq!(projection.days_elapsed, 30);
        assert_eq!(projection.days_remaining, 0);
        assert!(projection.today_marker.is_none());
        assert_eq!(projection.elapsed_series.len(), 30);
        assert!(projection.elapsed_series.iter().all(|p| p.date.day() <= 30));
        // Not plotted, but still counted
        assert!(close(projection.current_revenue, 1000.0));
        assert!(close(projection.plan_completion_percent, 100.0));
        assert_eq!(projection.total_transactions, 10);
        // Nothing left to extrapolate
        assert!(close(projection.forecast_revenue, projection.current_revenue));
        assert!(close(projection.forecast_percent, projection.plan_completion_percent));
    }

    #[test]
    fn calendar_grid_includes_the_thirty_first() {
        let today = date(2024, 7, 31);
        let sales = vec![
            agg(date(2024, 7, 30), 100.0, 1, 100.0),
            agg(date(2024, 7, 31), 900.0, 9, 100.0),
        ];

        let projection = project(&sales, &plan_for(today, 50.0, 1000.0), today, GridPolicy::CalendarMonth);

        assert_eq!(projection.daily_target_line.len(), 31);
        assert!(close(projection.current_revenue, 1000.0));
        assert!(close(projection.plan_completion_percent, 100.0));
        assert_eq!(projection.today_marker.map(|p| p.day), Some(31));
    }

    #[test]
    fn february_grid_spills_into_march_without_counting_it() {
        let grid = build_grid(&[], date(2023, 2, 14), FIXED_GRID_DAYS);

        assert_eq!(grid.len(), 30);
        assert_eq!(grid[27].aggregate.date, date(2023, 2, 28));
        assert_eq!(grid[28].aggregate.date, date(2023, 3, 1));
        assert_eq!(grid[29].slot, 30);

        let today = date(2023, 2, 28);
        let sales = vec![
            agg(date(2023, 2, 28), 280.0, 2, 140.0),
            agg(date(2023, 3, 1), 999.0, 9, 111.0),
        ];
        let projection = project(&sales, &plan_for(today, 10.0, 2800.0), today, GridPolicy::Fixed30);

        assert_eq!(projection.days_remaining, 2);
        assert!(close(projection.current_revenue, 280.0));
        assert!(close(projection.plan_completion_percent, 10.0));
        assert!(projection.elapsed_series.iter().all(|p| p.date.month() == 2));
    }

    #[test]
    fn other_months_do_not_leak_in() {
        let today = date(2024, 6, 10);
        let sales = vec![
            agg(date(2024, 5, 5), 7000.0, 70, 100.0),
            agg(date(2023, 6, 5), 7000.0, 70, 100.0),
            agg(date(2024, 6, 5), 500.0, 5, 100.0),
        ];

        let projection = project(&sales, &plan_for(today, 100.0, 3000.0), today, GridPolicy::Fixed30);

        assert!(close(projection.current_revenue, 500.0));
        assert_eq!(projection.total_transactions, 5);
    }

    #[test]
    fn only_other_month_sales_still_projects_zero() {
        let today = date(2024, 6, 10);
        let sales = vec![agg(date(2024, 5, 5), 7000.0, 70, 100.0)];

        let projection = project(&sales, &plan_for(today, 100.0, 3000.0), today, GridPolicy::Fixed30);

        assert!(projection.has_data());
        assert_eq!(projection.current_revenue, 0.0);
        assert_eq!(projection.forecast_revenue, 0.0);
        assert_eq!(projection.elapsed_series.len(), 10);
    }

    #[test]
    fn percentages_are_never_negative() {
        let today = date(2024, 9, 17);
        let revenues = [0.0, 15.5, 0.0, 9000.0, 3.25];
        let sales: Vec<DailyAggregate> = revenues
            .iter()
            .enumerate()
            .map(|(i, r)| agg(date(2024, 9, i as u32 + 1), *r, 1, *r))
            .collect();

        for target in [1.0, 250.0, 1_000_000.0] {
            let projection = project(&sales, &plan_for(today, 0.0, target), today, GridPolicy::Fixed30);
            assert!(projection.plan_completion_percent >= 0.0);
            assert!(projection.forecast_percent >= 0.0);
            assert!(projection.forecast_percent >= projection.plan_completion_percent);
        }
    }
}
