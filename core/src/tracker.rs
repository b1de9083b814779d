use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::error::TrackerError;
use crate::journal::Journal;
use crate::models::{DailyRecord, FoodCandidate, GoalSettings, LoggedEntry};
use crate::store::KeyValueStore;
use crate::usda::validate_query;

/// Shown in place of results whatever the underlying cause; the cause itself
/// goes to the log.
pub const SEARCH_FAILED_MESSAGE: &str =
    "Error searching for foods. Please check your API key and try again.";

/// Identifies one search request. Later requests get larger tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SearchTicket(u64);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SearchState {
    Idle,
    Loading { query: String },
    Results { candidates: Vec<FoodCandidate> },
    Failed { message: String },
}

/// Application state shared by a front end: the journal plus the outcome of
/// the most recent search.
///
/// Searches follow a latest-request-wins policy. Each call to
/// [`Tracker::begin_search`] issues a new ticket, and
/// [`Tracker::complete_search`] ignores outcomes for any ticket other than
/// the newest, so a slow earlier response can never replace newer results.
pub struct Tracker<S> {
    journal: Journal<S>,
    search: SearchState,
    issued: u64,
}

impl<S: KeyValueStore> Tracker<S> {
    pub fn new(store: S) -> Self {
        Self {
            journal: Journal::new(store),
            search: SearchState::Idle,
            issued: 0,
        }
    }

    pub fn journal(&self) -> &Journal<S> {
        &self.journal
    }

    pub fn search_state(&self) -> &SearchState {
        &self.search
    }

    /// Start a search for `query`. A blank query is rejected and leaves the
    /// current state alone.
    pub fn begin_search(&mut self, query: &str) -> Result<SearchTicket, TrackerError> {
        let query = validate_query(query)?;
        self.issued += 1;
        self.search = SearchState::Loading {
            query: query.to_string(),
        };
        Ok(SearchTicket(self.issued))
    }

    /// Record the outcome of the request behind `ticket`. Returns `false`
    /// when a newer search has been started since, in which case the outcome
    /// is dropped. The outcome is borrowed so the caller can still hand the
    /// original error back to whoever asked.
    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        outcome: &Result<Vec<FoodCandidate>>,
    ) -> bool {
        if ticket.0 != self.issued {
            tracing::debug!(
                ticket = ticket.0,
                latest = self.issued,
                "discarding stale search outcome"
            );
            return false;
        }
        self.search = match outcome {
            Ok(candidates) => SearchState::Results {
                candidates: candidates.clone(),
            },
            Err(e) => {
                tracing::warn!(error = %format!("{e:#}"), "food search failed");
                SearchState::Failed {
                    message: SEARCH_FAILED_MESSAGE.to_string(),
                }
            }
        };
        true
    }

    /// Candidates from the latest completed search, or an empty slice.
    pub fn candidates(&self) -> &[FoodCandidate] {
        match &self.search {
            SearchState::Results { candidates } => candidates,
            _ => &[],
        }
    }

    /// Log the `index`-th candidate of the current results on `date`.
    pub fn add_candidate(&self, date: NaiveDate, index: usize) -> Result<LoggedEntry> {
        let candidate = self
            .candidates()
            .get(index)
            .cloned()
            .ok_or(TrackerError::NoSuchCandidate(index))?;
        self.journal.append(date, candidate)
    }

    pub fn add(&self, date: NaiveDate, candidate: FoodCandidate) -> Result<LoggedEntry> {
        self.journal.append(date, candidate)
    }

    pub fn day(&self, date: NaiveDate) -> Result<DailyRecord> {
        self.journal.load(date)
    }

    pub fn remove(&self, date: NaiveDate, index: usize) -> Result<DailyRecord> {
        self.journal.remove(date, index)
    }

    pub fn clear(&self, date: NaiveDate) -> Result<DailyRecord> {
        self.journal.clear(date)
    }

    pub fn goals(&self) -> Result<GoalSettings> {
        self.journal.goals()
    }

    pub fn set_goals(&self, goals: GoalSettings) -> Result<GoalSettings> {
        self.journal.set_goals(goals)
    }
}
