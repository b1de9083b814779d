use anyhow::{Result, bail};

use nutrilog_core::models::GoalSettings;
use nutrilog_core::store::KeyValueStore;
use nutrilog_core::tracker::Tracker;

fn print_goals(goals: &GoalSettings) {
    println!("Daily protein goal: {:.0}g", goals.protein);
    println!("Daily fiber goal:   {:.0}g", goals.fiber);
}

pub(crate) fn cmd_goals_show<S: KeyValueStore>(tracker: &Tracker<S>, json: bool) -> Result<()> {
    let goals = tracker.goals()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&goals)?);
    } else {
        print_goals(&goals);
    }
    Ok(())
}

/// Update one or both goals; a goal left out keeps its current value.
pub(crate) fn cmd_goals_set<S: KeyValueStore>(
    tracker: &Tracker<S>,
    protein: Option<f64>,
    fiber: Option<f64>,
    json: bool,
) -> Result<()> {
    if protein.is_none() && fiber.is_none() {
        bail!("Nothing to set. Pass --protein and/or --fiber");
    }

    let current = tracker.goals()?;
    let goals = tracker.set_goals(GoalSettings {
        protein: protein.unwrap_or(current.protein),
        fiber: fiber.unwrap_or(current.fiber),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&goals)?);
    } else {
        println!("Goals saved.");
        print_goals(&goals);
    }
    Ok(())
}
