use anyhow::{Result, bail};
use std::process;

use crate::usda::UsdaClient;
use nutrilog_core::store::KeyValueStore;
use nutrilog_core::tracker::Tracker;

use super::helpers::{parse_date, print_candidate_table, prompt_choice};
use super::run_search;

pub(crate) async fn cmd_search<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    client: &UsdaClient,
    query: &str,
    json: bool,
) -> Result<()> {
    let results = run_search(tracker, client, query).await?;

    if results.is_empty() {
        if json {
            println!("[]");
        } else {
            eprintln!("No results found for '{query}'");
        }
        process::exit(2);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_candidate_table(&results);
    }

    Ok(())
}

/// Search, pick a candidate, and log it.
pub(crate) async fn cmd_add<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    client: &UsdaClient,
    query: &str,
    pick: Option<usize>,
    date: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let results = run_search(tracker, client, query).await?;

    if results.is_empty() {
        bail!("No food found for '{query}'");
    }

    let index = match pick {
        Some(0) => bail!("--pick is 1-based"),
        Some(n) => n - 1,
        None if results.len() == 1 => 0,
        None => {
            print_candidate_table(&results);
            prompt_choice(results.len())?
        }
    };

    let entry = tracker.add_candidate(date, index)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let record = tracker.day(date)?;
        println!(
            "Logged {} ({:.1}g protein, {:.1}g fiber) on {}",
            entry.food.name, entry.food.protein, entry.food.fiber, record.date
        );
        println!(
            "Day total: {:.1}g protein, {:.1}g fiber",
            record.total_protein, record.total_fiber
        );
    }

    Ok(())
}
