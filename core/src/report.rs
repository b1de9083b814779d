//! Read-only views computed from the stored daily records.
//!
//! Nothing here writes to the store; every function can be called any
//! number of times and returns the same answer until the journal changes.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{Days, NaiveDate};

use crate::error::TrackerError;

use crate::journal::Journal;
use crate::models::{
    Dashboard, DashboardStats, DayTotals, GoalProgress, GoalSettings, PieSeries, ProteinSource,
    WeeklySeries, round_half_up, round1,
};
use crate::store::KeyValueStore;

pub const WEEK_DAYS: u32 = 7;
pub const DEFAULT_TOP_SOURCES: usize = 5;
/// The streak walk never looks further back than this.
pub const MAX_STREAK_DAYS: u32 = 365;
/// Longest history table `history` will build.
pub const MAX_HISTORY_DAYS: u32 = 3650;

/// The day `offset` days before `reference`, if the calendar has one.
fn days_before(reference: NaiveDate, offset: u32) -> Option<NaiveDate> {
    reference.checked_sub_days(Days::new(u64::from(offset)))
}

/// Share of `goal` reached, capped at 100 and rounded to one decimal.
/// A goal that is not a positive number counts as nothing reached.
pub fn percent_of(total: f64, goal: f64) -> f64 {
    if !goal.is_finite() || goal <= 0.0 {
        return 0.0;
    }
    round1((100.0 * total / goal).min(100.0))
}

/// Protein/fiber totals for the seven days ending at `reference`, oldest
/// first. Days without a record contribute zeros.
pub fn weekly_series<S: KeyValueStore>(
    journal: &Journal<S>,
    reference: NaiveDate,
) -> Result<WeeklySeries> {
    let mut series = WeeklySeries {
        labels: Vec::with_capacity(7),
        protein: Vec::with_capacity(7),
        fiber: Vec::with_capacity(7),
    };

    for offset in (0..WEEK_DAYS).rev() {
        let date = days_before(reference, offset).ok_or_else(|| {
            TrackerError::InvalidDate(format!("no week ends on {reference}"))
        })?;
        series.labels.push(date.format("%a").to_string());
        match journal.record(date)? {
            Some(record) => {
                series.protein.push(record.total_protein);
                series.fiber.push(record.total_fiber);
            }
            None => {
                series.protein.push(0.0);
                series.fiber.push(0.0);
            }
        }
    }

    Ok(series)
}

/// How far `reference`'s totals are toward `goals`, capped at 100 %.
pub fn today_progress<S: KeyValueStore>(
    journal: &Journal<S>,
    reference: NaiveDate,
    goals: &GoalSettings,
) -> Result<GoalProgress> {
    let Some(record) = journal.record(reference)? else {
        return Ok(GoalProgress {
            protein_percent: 0.0,
            fiber_percent: 0.0,
        });
    };
    Ok(GoalProgress {
        protein_percent: percent_of(record.total_protein, goals.protein),
        fiber_percent: percent_of(record.total_fiber, goals.fiber),
    })
}

/// Foods ranked by protein contributed over the whole history.
///
/// Names are matched exactly. Equal totals keep the order in which the food
/// was first seen (dates ascending, entries in logged order).
pub fn top_protein_sources<S: KeyValueStore>(
    journal: &Journal<S>,
    limit: usize,
) -> Result<Vec<ProteinSource>> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in journal.records()? {
        for entry in &record.entries {
            let name = &entry.food.name;
            if let Some(&i) = index.get(name) {
                totals[i].1 += entry.food.protein;
            } else {
                index.insert(name.clone(), totals.len());
                totals.push((name.clone(), entry.food.protein));
            }
        }
    }

    if totals.is_empty() {
        return Ok(vec![ProteinSource::no_data()]);
    }

    // `sort_by` is stable, so ties stay in first-seen order.
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));
    totals.truncate(limit);

    Ok(totals
        .into_iter()
        .map(|(name, total)| ProteinSource {
            name,
            total_protein: round1(total),
        })
        .collect())
}

/// Consecutive days, counting back from `reference`, with at least one entry.
pub fn streak<S: KeyValueStore>(journal: &Journal<S>, reference: NaiveDate) -> Result<u32> {
    let mut streak = 0;
    for offset in 0..MAX_STREAK_DAYS {
        let Some(date) = days_before(reference, offset) else {
            break;
        };
        match journal.record(date)? {
            Some(record) if !record.is_empty() => streak += 1,
            _ => break,
        }
    }
    Ok(streak)
}

#[allow(clippy::cast_precision_loss)]
fn average_of_logged_days(values: &[f64]) -> i64 {
    let logged: Vec<f64> = values.iter().copied().filter(|v| *v > 0.0).collect();
    if logged.is_empty() {
        return 0;
    }
    let avg = logged.iter().sum::<f64>() / logged.len() as f64;
    round_half_up(avg) as i64
}

/// Weekly averages (over days with something logged) and the streak.
pub fn stats<S: KeyValueStore>(
    journal: &Journal<S>,
    reference: NaiveDate,
) -> Result<DashboardStats> {
    let weekly = weekly_series(journal, reference)?;
    Ok(DashboardStats {
        avg_protein: average_of_logged_days(&weekly.protein),
        avg_fiber: average_of_logged_days(&weekly.fiber),
        streak: streak(journal, reference)?,
    })
}

/// Everything the dashboard charts need, in one pass.
pub fn dashboard<S: KeyValueStore>(
    journal: &Journal<S>,
    reference: NaiveDate,
    goals: &GoalSettings,
) -> Result<Dashboard> {
    let weekly = weekly_series(journal, reference)?;
    let progress = today_progress(journal, reference, goals)?;
    let top_sources = top_protein_sources(journal, DEFAULT_TOP_SOURCES)?;
    let top_foods_chart = PieSeries::from_sources(&top_sources);
    let stats = stats(journal, reference)?;

    Ok(Dashboard {
        date: reference.format("%Y-%m-%d").to_string(),
        goals: *goals,
        weekly,
        progress,
        top_sources,
        top_foods_chart,
        stats,
    })
}

/// Per-day totals for the `days` days ending at `reference`, newest first.
/// At most [`MAX_HISTORY_DAYS`] rows; the walk also stops at the start of
/// the calendar.
pub fn history<S: KeyValueStore>(
    journal: &Journal<S>,
    reference: NaiveDate,
    days: u32,
) -> Result<Vec<DayTotals>> {
    let days = days.min(MAX_HISTORY_DAYS);
    let mut rows = Vec::with_capacity(days as usize);
    for offset in 0..days {
        let Some(date) = days_before(reference, offset) else {
            break;
        };
        let record = journal.load(date)?;
        rows.push(DayTotals {
            date: record.date.clone(),
            entry_count: record.entries.len(),
            total_protein: record.total_protein,
            total_fiber: record.total_fiber,
        });
    }
    Ok(rows)
}
