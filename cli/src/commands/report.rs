use anyhow::Result;
use chrono::Local;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutrilog_core::models::Dashboard;
use nutrilog_core::report::{dashboard, history};
use nutrilog_core::store::KeyValueStore;
use nutrilog_core::tracker::Tracker;

use super::helpers::{parse_date, plural_days, truncate};

fn print_weekly(dash: &Dashboard) {
    #[derive(Tabled)]
    struct DayRow {
        #[tabled(rename = "Day")]
        label: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Fiber")]
        fiber: String,
    }

    let w = &dash.weekly;
    let rows: Vec<DayRow> = w
        .labels
        .iter()
        .zip(w.protein.iter().zip(&w.fiber))
        .map(|(label, (p, f))| DayRow {
            label: label.clone(),
            protein: format!("{p:.1}g"),
            fiber: format!("{f:.1}g"),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_report<S: KeyValueStore>(
    tracker: &Tracker<S>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let goals = tracker.goals()?;
    let dash = dashboard(tracker.journal(), date, &goals)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&dash)?);
        return Ok(());
    }

    println!("=== Week ending {} ===\n", dash.date);
    print_weekly(&dash);

    println!("\nGoal progress");
    println!(
        "  Protein: {:.1}% of {:.0}g",
        dash.progress.protein_percent, dash.goals.protein
    );
    println!(
        "  Fiber:   {:.1}% of {:.0}g",
        dash.progress.fiber_percent, dash.goals.fiber
    );

    println!("\nTop protein sources");
    for (i, source) in dash.top_sources.iter().enumerate() {
        if source.is_placeholder() {
            println!("  {}", source.name);
        } else {
            println!(
                "  {}. {} ({:.1}g)",
                i + 1,
                truncate(&source.name, 40),
                source.total_protein
            );
        }
    }

    let stats = &dash.stats;
    println!("\nAverage protein: {}g", stats.avg_protein);
    println!("Average fiber:   {}g", stats.avg_fiber);
    println!("Streak:          {}", plural_days(stats.streak));

    Ok(())
}

pub(crate) fn cmd_history<S: KeyValueStore>(
    tracker: &Tracker<S>,
    days: u32,
    json: bool,
) -> Result<()> {
    #[derive(Tabled)]
    struct HistoryRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Entries")]
        entries: usize,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Fiber")]
        fiber: String,
    }

    let today = Local::now().date_naive();
    let totals = history(tracker.journal(), today, days)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&totals)?);
        return Ok(());
    }

    if totals.iter().all(|t| t.entry_count == 0) {
        eprintln!("No entries in the last {}", plural_days(days));
        process::exit(2);
    }

    let rows: Vec<HistoryRow> = totals
        .iter()
        .map(|t| HistoryRow {
            date: t.date.clone(),
            entries: t.entry_count,
            protein: format!("{:.1}g", t.total_protein),
            fiber: format!("{:.1}g", t.total_fiber),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    Ok(())
}
