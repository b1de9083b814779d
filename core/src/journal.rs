use std::sync::atomic::{AtomicI64, Ordering};

use anyhow::{Context, Result};
use chrono::{NaiveDate, SecondsFormat, Utc};
use serde::de::DeserializeOwned;

use crate::error::TrackerError;
use crate::models::{
    DailyRecord, FoodCandidate, GOALS_KEY, GoalSettings, KEY_PREFIX, LoggedEntry, date_from_key,
    record_key,
};
use crate::store::KeyValueStore;

/// Hands out entry ids derived from the wall clock (milliseconds), bumped
/// when two entries land in the same millisecond so ids never repeat within
/// a process.
#[derive(Debug, Default)]
struct EntryIds {
    last: AtomicI64,
}

impl EntryIds {
    fn next(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let candidate = now.max(prev + 1);
            match self.last.compare_exchange_weak(
                prev,
                candidate,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return candidate,
                Err(actual) => prev = actual,
            }
        }
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The daily entry store: one JSON record per calendar date plus the goal
/// settings singleton, on top of any [`KeyValueStore`].
pub struct Journal<S> {
    store: S,
    ids: EntryIds,
}

impl<S: KeyValueStore> Journal<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            ids: EntryIds::default(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decode the value under `key`. Missing keys and payloads that don't
    /// decode both come back as `None`; only backend failures are errors.
    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "ignoring malformed stored value");
                Ok(None)
            }
        }
    }

    /// The stored record for `date`, if there is a readable one.
    pub fn record(&self, date: NaiveDate) -> Result<Option<DailyRecord>> {
        let Some(mut record) = self.read_json::<DailyRecord>(&record_key(date))? else {
            return Ok(None);
        };
        // The key is authoritative for the date, and totals are always derived.
        record.date = date.format("%Y-%m-%d").to_string();
        record.recompute_totals();
        Ok(Some(record))
    }

    /// The record for `date`, or an empty one when nothing usable is stored.
    pub fn load(&self, date: NaiveDate) -> Result<DailyRecord> {
        Ok(self
            .record(date)?
            .unwrap_or_else(|| DailyRecord::empty(date)))
    }

    /// One full-record overwrite; totals are re-derived first.
    fn save(&self, date: NaiveDate, record: &mut DailyRecord) -> Result<()> {
        record.recompute_totals();
        record.timestamp = now_iso();
        let json = serde_json::to_string(record).context("Failed to encode daily record")?;
        self.store.put(&record_key(date), &json)
    }

    /// Add `candidate` to the end of the day. Nutrient amounts are checked
    /// before anything is read or written.
    pub fn append(&self, date: NaiveDate, candidate: FoodCandidate) -> Result<LoggedEntry> {
        candidate.validate()?;
        let mut record = self.load(date)?;
        let entry = LoggedEntry {
            food: candidate,
            entry_id: self.ids.next(),
            timestamp: now_iso(),
        };
        record.entries.push(entry.clone());
        self.save(date, &mut record)?;
        tracing::debug!(
            date = %record.date,
            entry_id = entry.entry_id,
            name = %entry.food.name,
            "logged entry"
        );
        Ok(entry)
    }

    /// Remove the entry at `index`. An out-of-range index is rejected before
    /// anything is written.
    pub fn remove(&self, date: NaiveDate, index: usize) -> Result<DailyRecord> {
        let mut record = self.load(date)?;
        let len = record.entries.len();
        if index >= len {
            return Err(TrackerError::EntryOutOfRange { index, len }.into());
        }
        let removed = record.entries.remove(index);
        self.save(date, &mut record)?;
        tracing::debug!(date = %record.date, entry_id = removed.entry_id, "removed entry");
        Ok(record)
    }

    pub fn clear(&self, date: NaiveDate) -> Result<DailyRecord> {
        let mut record = DailyRecord::empty(date);
        self.save(date, &mut record)?;
        tracing::debug!(date = %record.date, "cleared day");
        Ok(record)
    }

    /// Every readable daily record, oldest date first.
    pub fn records(&self) -> Result<Vec<DailyRecord>> {
        let mut records = Vec::new();
        for key in self.store.keys_with_prefix(KEY_PREFIX)? {
            let Some(date) = date_from_key(&key) else {
                continue;
            };
            if let Some(record) = self.record(date)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    // --- Goals ---

    pub fn goals(&self) -> Result<GoalSettings> {
        let goals = self.read_json::<GoalSettings>(GOALS_KEY)?;
        Ok(goals.unwrap_or_default())
    }

    pub fn set_goals(&self, goals: GoalSettings) -> Result<GoalSettings> {
        goals.validate()?;
        let json = serde_json::to_string(&goals).context("Failed to encode goals")?;
        self.store.put(GOALS_KEY, &json)?;
        Ok(goals)
    }

    /// Persist the default goals if none are stored yet.
    pub fn ensure_goals(&self) -> Result<GoalSettings> {
        if self.store.get(GOALS_KEY)?.is_none() {
            return self.set_goals(GoalSettings::default());
        }
        self.goals()
    }
}
