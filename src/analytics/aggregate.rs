use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::models::Sale;

/// One calendar day of sales, collapsed from every entry dated that day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    pub revenue: f64,
    pub transaction_count: i64,
    pub average_check: f64,
}

impl DailyAggregate {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            revenue: 0.0,
            transaction_count: 0,
            average_check: 0.0,
        }
    }
}

/// Anything that can be folded into a [`DailyAggregate`].
pub trait DailyEntry {
    fn entry_date(&self) -> AppResult<NaiveDate>;
    fn revenue(&self) -> f64;
    fn transaction_count(&self) -> i64;
    fn average_check(&self) -> f64;
}

impl DailyEntry for Sale {
    fn entry_date(&self) -> AppResult<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, "%Y-%m-%d").map_err(|_| AppError::MalformedDate {
            sale_id: self.id,
            value: self.date.clone(),
        })
    }

    fn revenue(&self) -> f64 {
        self.revenue
    }

    fn transaction_count(&self) -> i64 {
        self.transaction_count
    }

    fn average_check(&self) -> f64 {
        self.average_check
    }
}

impl DailyEntry for DailyAggregate {
    fn entry_date(&self) -> AppResult<NaiveDate> {
        Ok(self.date)
    }

    fn revenue(&self) -> f64 {
        self.revenue
    }

    fn transaction_count(&self) -> i64 {
        self.transaction_count
    }

    fn average_check(&self) -> f64 {
        self.average_check
    }
}

#[derive(Default)]
struct DayTotals {
    revenue: f64,
    transaction_count: i64,
    check_sum: f64,
    entries: usize,
}

/// Groups entries by calendar date, ascending.
///
/// Revenue and transaction counts are summed. The day's average check is the
/// plain mean of the entries' stored average checks, not `revenue / transactions`
/// over the summed totals.
///
/// A single unparseable date fails the whole batch with
/// [`AppError::MalformedDate`]; nothing is skipped silently.
pub fn aggregate_daily<E: DailyEntry>(entries: &[E]) -> AppResult<Vec<DailyAggregate>> {
    let mut days: BTreeMap<NaiveDate, DayTotals> = BTreeMap::new();

    for entry in entries {
        let totals = days.entry(entry.entry_date()?).or_default();
        totals.revenue += entry.revenue();
        totals.transaction_count += entry.transaction_count();
        totals.check_sum += entry.average_check();
        totals.entries += 1;
    }

    Ok(days
        .into_iter()
        .map(|(date, totals)| DailyAggregate {
            date,
            revenue: totals.revenue,
            transaction_count: totals.transaction_count,
            average_check: totals.check_sum / totals.entries as f64,
        })
        .collect())
}
