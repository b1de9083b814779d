mod goals;
mod helpers;
mod log;
mod report;
mod search;

use anyhow::Result;

use crate::usda::UsdaClient;
use nutrilog_core::models::FoodCandidate;
use nutrilog_core::store::KeyValueStore;
use nutrilog_core::tracker::Tracker;

pub(crate) use goals::{cmd_goals_set, cmd_goals_show};
pub(crate) use log::{cmd_clear, cmd_remove, cmd_today};
pub(crate) use report::{cmd_history, cmd_report};
pub(crate) use search::{cmd_add, cmd_search};

/// Run one search through the tracker so its state follows the request.
/// The original error is returned to the caller untouched.
async fn run_search<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    client: &UsdaClient,
    query: &str,
) -> Result<Vec<FoodCandidate>> {
    let ticket = tracker.begin_search(query)?;
    let outcome = client.search_async(query).await;
    tracker.complete_search(ticket, &outcome);
    outcome
}
