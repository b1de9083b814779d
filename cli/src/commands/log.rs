use anyhow::Result;

use nutrilog_core::report::percent_of;
use nutrilog_core::store::KeyValueStore;
use nutrilog_core::tracker::Tracker;

use super::helpers::{confirm, parse_date, position_to_index, print_entry_table};

pub(crate) fn cmd_today<S: KeyValueStore>(
    tracker: &Tracker<S>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let record = tracker.day(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("=== {} ===\n", record.date);
    if record.is_empty() {
        println!("  Nothing logged yet.\n");
    } else {
        print_entry_table(&record.entries);
        println!();
    }

    let goals = tracker.goals()?;
    println!(
        "  Protein: {:.1} / {:.0}g ({:.1}%)",
        record.total_protein,
        goals.protein,
        percent_of(record.total_protein, goals.protein)
    );
    println!(
        "  Fiber:   {:.1} / {:.0}g ({:.1}%)",
        record.total_fiber,
        goals.fiber,
        percent_of(record.total_fiber, goals.fiber)
    );

    Ok(())
}

pub(crate) fn cmd_remove<S: KeyValueStore>(
    tracker: &Tracker<S>,
    position: i64,
    date: Option<String>,
    yes: bool,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let index = position_to_index(position)?;

    if !yes {
        let record = tracker.day(date)?;
        if let Some(entry) = record.entries.get(index) {
            let question = format!("Remove {} from {}?", entry.food.name, record.date);
            if !confirm(&question)? {
                eprintln!("Cancelled");
                return Ok(());
            }
        }
        // Out of range falls through so the tracker reports it.
    }

    let record = tracker.remove(date, index)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!(
            "Removed entry {position}. {} now has {} entries ({:.1}g protein, {:.1}g fiber)",
            record.date,
            record.entries.len(),
            record.total_protein,
            record.total_fiber
        );
    }

    Ok(())
}

pub(crate) fn cmd_clear<S: KeyValueStore>(
    tracker: &Tracker<S>,
    date: Option<String>,
    yes: bool,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;

    if !yes && !confirm(&format!("Clear all entries for {date}?"))? {
        eprintln!("Cancelled");
        return Ok(());
    }

    let record = tracker.clear(date)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
    } else {
        println!("Cleared {}", record.date);
    }

    Ok(())
}
