use thiserror::Error;

/// Failures a caller is expected to branch on.
///
/// These travel inside `anyhow::Error`; front ends recover them with
/// `downcast_ref::<TrackerError>()` to decide how to present them.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("Please enter a search term")]
    BlankQuery,

    #[error("Food search failed: {0}")]
    SearchFailed(String),

    #[error("No entry at position {index} (day has {len} entries)")]
    EntryOutOfRange { index: usize, len: usize },

    #[error("No search result at position {0}")]
    NoSuchCandidate(usize),

    #[error("Invalid goal: {0}")]
    InvalidGoal(String),

    #[error("Invalid nutrient amount: {0}")]
    InvalidNutrient(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),
}

impl TrackerError {
    /// True for errors caused by what the user typed rather than by the
    /// environment.
    #[must_use]
    pub fn is_user_input(&self) -> bool {
        !matches!(self, Self::SearchFailed(_))
    }
}
