//! Turns a [`ProgressView`] into chart rows, labelled statistics and a plain-text report.

use serde::{Deserialize, Serialize};

use crate::analytics::Projection;
use crate::commands::progress::ProgressView;

pub const NO_DATA_MESSAGE: &str = "No sales or no plan for the current month";

const BAR_WIDTH: usize = 40;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartRow {
    pub day: u32,
    pub target: f64,
    /// `None` for days that have not happened yet.
    pub actual: Option<f64>,
    pub is_today: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistic {
    pub label: &'static str,
    pub value: String,
}

/// `12345.6` -> `12 345.60 ₽`
pub fn format_currency(value: f64, symbol: &str) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, fraction) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(' ');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{} {}", sign, grouped, fraction, symbol)
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value)
}

/// One row per grid slot, target line first, actuals only up to today.
pub fn chart_rows(projection: &Projection) -> Vec<ChartRow> {
    let today = projection.today_marker.as_ref().map(|p| p.day);

    projection
        .daily_target_line
        .iter()
        .zip(1u32..)
        .map(|(target, day)| ChartRow {
            day,
            target: *target,
            actual: projection
                .elapsed_series
                .get(day as usize - 1)
                .map(|p| p.revenue),
            is_today: today == Some(day),
        })
        .collect()
}

pub fn statistics(projection: &Projection, currency_symbol: &str) -> Vec<Statistic> {
    vec![
        Statistic {
            label: "Plan completion",
            value: format_percent(projection.plan_completion_percent),
        },
        Statistic {
            label: "Forecast completion",
            value: format_percent(projection.forecast_percent),
        },
        Statistic {
            label: "Forecast revenue",
            value: format_currency(projection.forecast_revenue, currency_symbol),
        },
        Statistic {
            label: "Average daily revenue",
            value: format_currency(projection.avg_daily_revenue, currency_symbol),
        },
        Statistic {
            label: "Average check",
            value: format_currency(projection.avg_check, currency_symbol),
        },
        Statistic {
            label: "Transactions",
            value: projection.total_transactions.to_string(),
        },
    ]
}

fn bar(value: f64, scale: f64) -> String {
    if scale <= 0.0 {
        return String::new();
    }
    let len = ((value / scale) * BAR_WIDTH as f64).round().clamp(0.0, BAR_WIDTH as f64);
    "#".repeat(len as usize)
}

pub fn render_text(view: &ProgressView, currency_symbol: &str) -> String {
    let mut out = format!(
        "Plan progress: {} ({})\n",
        view.scope_label,
        view.as_of.format("%B %Y")
    );

    let projection = &view.projection;
    if !projection.has_data() {
        out.push_str(NO_DATA_MESSAGE);
        out.push('\n');
        return out;
    }

    let rows = chart_rows(projection);
    let scale = rows
        .iter()
        .map(|r| r.actual.unwrap_or(0.0).max(r.target))
        .fold(0.0, f64::max);

    out.push_str(&format!(
        "Daily target: {}\n",
        format_currency(projection.daily_target, currency_symbol)
    ));
    for row in &rows {
        let marker = if row.is_today { '>' } else { ' ' };
        match row.actual {
            Some(actual) => out.push_str(&format!(
                "{}{:>2} {:<width$} {}\n",
                marker,
                row.day,
                bar(actual, scale),
                format_currency(actual, currency_symbol),
                width = BAR_WIDTH
            )),
            None => out.push_str(&format!("{}{:>2}\n", marker, row.day)),
        }
    }

    out.push('\n');
    for stat in statistics(projection, currency_symbol) {
        out.push_str(&format!("{:<22} {}\n", stat.label, stat.value));
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::{project, BranchScope, DailyAggregate, EffectivePlan, GridPolicy};
    use chrono::NaiveDate;

    fn view(projection: Projection) -> ProgressView {
        ProgressView {
            scope: BranchScope::All,
            scope_label: "All branches".to_string(),
            as_of: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            projection,
        }
    }

    fn sample() -> Projection {
        let today = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let sales = vec![
            DailyAggregate {
                date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                revenue: 1500.0,
                transaction_count: 10,
                average_check: 150.0,
            },
            DailyAggregate {
                date: today,
                revenue: 900.0,
                transaction_count: 6,
                average_check: 150.0,
            },
        ];
        let plan = EffectivePlan {
            daily_target: 1000.0,
            monthly_target: 30000.0,
            days_elapsed_in_month: 3,
            days_in_month: 30,
        };
        project(&sales, &plan, today, GridPolicy::Fixed30)
    }

    #[test]
    fn currency_grouping() {
        assert_eq!(format_currency(0.0, "₽"), "0.00 ₽");
        assert_eq!(format_currency(999.999, "$"), "1 000.00 $");
        assert_eq!(format_currency(1234567.5, "₽"), "1 234 567.50 ₽");
        assert_eq!(format_currency(-42.1, "₽"), "-42.10 ₽");
    }

    #[test]
    fn percent_one_decimal() {
        assert_eq!(format_percent(120.0), "120.0%");
        assert_eq!(format_percent(5.04), "5.0%");
    }

    #[test]
    fn rows_cover_the_whole_grid() {
        let rows = chart_rows(&sample());

        assert_eq!(rows.len(), 30);
        assert_eq!(rows[0].actual, Some(1500.0));
        assert_eq!(rows[1].actual, Some(0.0));
        assert_eq!(rows[2].actual, Some(900.0));
        assert!(rows[2].is_today);
        assert_eq!(rows[3].actual, None);
        assert!(rows.iter().all(|r| r.target == 1000.0));
        assert_eq!(rows.iter().filter(|r| r.is_today).count(), 1);
    }

    #[test]
    fn six_statistics() {
        let stats = statistics(&sample(), "₽");

        assert_eq!(stats.len(), 6);
        assert_eq!(stats[0].value, "8.0%");
        assert_eq!(stats[3].value, "800.00 ₽");
        assert_eq!(stats[5].value, "16");
    }

    #[test]
    fn placeholder_when_empty() {
        let text = render_text(&view(Projection::no_data()), "₽");

        assert!(text.contains(NO_DATA_MESSAGE));
        assert!(text.starts_with("Plan progress: All branches (June 2024)"));
    }

    #[test]
    fn report_marks_today() {
        let text = render_text(&view(sample()), "₽");

        assert!(text.contains("> 3"));
        assert!(text.contains("Forecast revenue"));
        assert!(text.contains("24 000.00 ₽"));
    }
}
