use anyhow::Result;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Prefix shared by every persisted key.
pub const KEY_PREFIX: &str = "nutrition-";

/// Fixed key of the goal settings singleton.
pub const GOALS_KEY: &str = "nutrition-goals";

/// Serving label attached to every search candidate. USDA reports nutrients
/// per 100 g for most data types, but not all of them; values are passed
/// through as-is.
pub const DEFAULT_SERVING: &str = "100g";

pub const DEFAULT_PROTEIN_GOAL: f64 = 150.0;
pub const DEFAULT_FIBER_GOAL: f64 = 30.0;

/// Upper bound on the grams of one nutrient in a single logged entry.
pub const MAX_NUTRIENT_GRAMS: f64 = 10_000.0;

/// Calendar years accepted from users and storage keys.
pub const MIN_YEAR: i32 = 1;
pub const MAX_YEAR: i32 = 9999;

/// Round to one decimal place, halves rounding up.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0 + 0.5).floor() / 10.0
}

/// Round to a whole number, halves rounding up.
#[must_use]
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Storage key for the record of `date`, e.g. `nutrition-2024-06-15`.
#[must_use]
pub fn record_key(date: NaiveDate) -> String {
    format!("{KEY_PREFIX}{}", date.format("%Y-%m-%d"))
}

/// Parse a `YYYY-MM-DD` date, rejecting years outside
/// [`MIN_YEAR`]..=[`MAX_YEAR`].
pub fn parse_day(s: &str) -> Result<NaiveDate, TrackerError> {
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| TrackerError::InvalidDate(format!("'{s}' is not a YYYY-MM-DD date")))?;
    check_day(date)
}

/// Reject dates whose year falls outside [`MIN_YEAR`]..=[`MAX_YEAR`].
pub fn check_day(date: NaiveDate) -> Result<NaiveDate, TrackerError> {
    if (MIN_YEAR..=MAX_YEAR).contains(&date.year()) {
        Ok(date)
    } else {
        Err(TrackerError::InvalidDate(format!(
            "{date} (years {MIN_YEAR} to {MAX_YEAR} only)"
        )))
    }
}

/// Inverse of [`record_key`]. Keys under the prefix that don't carry a date
/// (the goals key) yield `None`.
#[must_use]
pub fn date_from_key(key: &str) -> Option<NaiveDate> {
    let suffix = key.strip_prefix(KEY_PREFIX)?;
    parse_day(suffix).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GoalSettings {
    pub protein: f64,
    pub fiber: f64,
}

impl Default for GoalSettings {
    fn default() -> Self {
        Self {
            protein: DEFAULT_PROTEIN_GOAL,
            fiber: DEFAULT_FIBER_GOAL,
        }
    }
}

impl GoalSettings {
    pub fn validate(&self) -> Result<()> {
        validate_goal("protein", self.protein)?;
        validate_goal("fiber", self.fiber)?;
        Ok(())
    }
}

fn validate_goal(nutrient: &str, grams: f64) -> Result<()> {
    if !grams.is_finite() || grams <= 0.0 {
        return Err(TrackerError::InvalidGoal(format!(
            "{nutrient} goal must be greater than 0 (got {grams})"
        ))
        .into());
    }
    Ok(())
}

/// A normalized search result that has not been logged yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodCandidate {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub protein: f64,
    #[serde(default)]
    pub fiber: f64,
    #[serde(default = "default_serving")]
    pub serving_size: String,
    #[serde(default)]
    pub brand_name: Option<String>,
}

fn default_serving() -> String {
    DEFAULT_SERVING.to_string()
}

impl FoodCandidate {
    /// Nutrient amounts must be finite and within 0..=[`MAX_NUTRIENT_GRAMS`].
    pub fn validate(&self) -> Result<()> {
        validate_nutrient("protein", self.protein)?;
        validate_nutrient("fiber", self.fiber)?;
        Ok(())
    }
}

fn validate_nutrient(nutrient: &str, grams: f64) -> Result<()> {
    if !grams.is_finite() || !(0.0..=MAX_NUTRIENT_GRAMS).contains(&grams) {
        return Err(TrackerError::InvalidNutrient(format!(
            "{nutrient} must be between 0 and {MAX_NUTRIENT_GRAMS}g (got {grams})"
        ))
        .into());
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggedEntry {
    #[serde(flatten)]
    pub food: FoodCandidate,
    #[serde(default)]
    pub entry_id: i64,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: String,
    #[serde(default)]
    pub entries: Vec<LoggedEntry>,
    #[serde(default)]
    pub total_protein: f64,
    #[serde(default)]
    pub total_fiber: f64,
    #[serde(default)]
    pub timestamp: String,
}

impl DailyRecord {
    #[must_use]
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date: date.format("%Y-%m-%d").to_string(),
            entries: Vec::new(),
            total_protein: 0.0,
            total_fiber: 0.0,
            timestamp: String::new(),
        }
    }

    /// Re-derive the totals from `entries`.
    pub fn recompute_totals(&mut self) {
        self.total_protein = round1(self.entries.iter().map(|e| e.food.protein).sum());
        self.total_fiber = round1(self.entries.iter().map(|e| e.food.fiber).sum());
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// --- Report types ---

/// Seven trailing days, oldest first, in the shape a line chart consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySeries {
    pub labels: Vec<String>,
    pub protein: Vec<f64>,
    pub fiber: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub protein_percent: f64,
    pub fiber_percent: f64,
}

pub const NO_DATA_LABEL: &str = "No data yet";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinSource {
    pub name: String,
    pub total_protein: f64,
}

impl ProteinSource {
    /// Placeholder returned when nothing has ever been logged.
    #[must_use]
    pub fn no_data() -> Self {
        Self {
            name: NO_DATA_LABEL.to_string(),
            total_protein: 0.0,
        }
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.name == NO_DATA_LABEL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub avg_protein: i64,
    pub avg_fiber: i64,
    pub streak: u32,
}

/// Labels and values for a pie chart.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PieSeries {
    pub labels: Vec<String>,
    pub data: Vec<f64>,
}

impl PieSeries {
    /// Real totals are rounded to whole grams; the placeholder slice gets a
    /// value of 1 so the chart still draws.
    #[must_use]
    pub fn from_sources(sources: &[ProteinSource]) -> Self {
        let labels = sources.iter().map(|s| s.name.clone()).collect();
        let data = sources
            .iter()
            .map(|s| {
                if s.is_placeholder() {
                    1.0
                } else {
                    round_half_up(s.total_protein)
                }
            })
            .collect();
        Self { labels, data }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub date: String,
    pub goals: GoalSettings,
    pub weekly: WeeklySeries,
    pub progress: GoalProgress,
    pub top_sources: Vec<ProteinSource>,
    pub top_foods_chart: PieSeries,
    pub stats: DashboardStats,
}

/// Per-day totals for history listings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayTotals {
    pub date: String,
    pub entry_count: usize,
    pub total_protein: f64,
    pub total_fiber: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(name: &str, protein: f64, fiber: f64) -> FoodCandidate {
        FoodCandidate {
            id: 1,
            name: name.to_string(),
            protein,
            fiber,
            serving_size: DEFAULT_SERVING.to_string(),
            brand_name: None,
        }
    }

    #[test]
    fn test_round1_half_up() {
        assert!((round1(23.456) - 23.5).abs() < f64::EPSILON);
        assert!((round1(2.04) - 2.0).abs() < f64::EPSILON);
        assert!((round1(0.05) - 0.1).abs() < f64::EPSILON);
        assert!((round1(0.0) - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_round_half_up() {
        assert!((round_half_up(2.5) - 3.0).abs() < f64::EPSILON);
        assert!((round_half_up(2.49) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_key_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 5).unwrap();
        let key = record_key(date);
        assert_eq!(key, "nutrition-2024-06-05");
        assert_eq!(date_from_key(&key), Some(date));
    }

    #[test]
    fn test_goals_key_is_not_a_date() {
        assert!(date_from_key(GOALS_KEY).is_none());
        assert!(date_from_key("other-2024-06-05").is_none());
    }

    #[test]
    fn test_goal_validation() {
        assert!(GoalSettings::default().validate().is_ok());
        let zero = GoalSettings {
            protein: 0.0,
            fiber: 30.0,
        };
        assert!(zero.validate().is_err());
        let negative = GoalSettings {
            protein: 150.0,
            fiber: -1.0,
        };
        assert!(negative.validate().is_err());
        let nan = GoalSettings {
            protein: f64::NAN,
            fiber: 30.0,
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_candidate_nutrient_bounds() {
        assert!(candidate("Eggs", 12.0, 0.0).validate().is_ok());
        assert!(candidate("Whey", MAX_NUTRIENT_GRAMS, 0.0).validate().is_ok());

        for (protein, fiber) in [
            (1e308, 0.0),
            (f64::INFINITY, 0.0),
            (f64::NAN, 0.0),
            (-1.0, 0.0),
            (10.0, MAX_NUTRIENT_GRAMS + 1.0),
        ] {
            let err = candidate("Bad", protein, fiber).validate().unwrap_err();
            assert!(matches!(
                err.downcast_ref::<TrackerError>(),
                Some(TrackerError::InvalidNutrient(_))
            ));
        }
    }

    #[test]
    fn test_parse_day_year_range() {
        assert_eq!(
            parse_day("2024-06-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
        );
        assert!(parse_day("0001-01-01").is_ok());
        assert!(parse_day("9999-12-31").is_ok());
        assert!(matches!(
            parse_day("-262143-01-03"),
            Err(TrackerError::InvalidDate(_))
        ));
        assert!(parse_day("0000-12-31").is_err());
        assert!(parse_day("2024-13-01").is_err());
        assert!(date_from_key("nutrition--262143-01-03").is_none());
    }

    #[test]
    fn test_entry_without_id_or_timestamp_still_decodes() {
        let json = r#"{
            "date": "2024-06-15",
            "entries": [
                {"id": 1, "name": "Eggs", "protein": 12.0, "fiber": 0.0, "entryId": 5, "timestamp": "t"},
                {"id": 2, "name": "Lentils", "protein": 9.0, "fiber": 8.0}
            ]
        }"#;
        let record: DailyRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.entries.len(), 2);
        assert_eq!(record.entries[1].entry_id, 0);
        assert!(record.entries[1].timestamp.is_empty());
    }

    #[test]
    fn test_placeholder_is_matched_by_name() {
        assert!(ProteinSource::no_data().is_placeholder());
        let real = ProteinSource {
            name: "Eggs".to_string(),
            total_protein: 0.0,
        };
        assert!(!real.is_placeholder());
    }

    #[test]
    fn test_recompute_totals() {
        let mut record = DailyRecord::empty(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        for (i, (p, f)) in [(10.04, 1.01), (20.03, 2.02), (0.0, 0.0)].iter().enumerate() {
            record.entries.push(LoggedEntry {
                food: candidate("x", *p, *f),
                entry_id: i as i64,
                timestamp: String::new(),
            });
        }
        record.recompute_totals();
        assert!((record.total_protein - 30.1).abs() < f64::EPSILON);
        assert!((record.total_fiber - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_record_json_uses_camel_case() {
        let mut record = DailyRecord::empty(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap());
        record.entries.push(LoggedEntry {
            food: FoodCandidate {
                brand_name: Some("Acme".to_string()),
                ..candidate("Tofu", 8.0, 1.2)
            },
            entry_id: 1_718_000_000_000,
            timestamp: "2024-06-15T12:00:00Z".to_string(),
        });
        record.recompute_totals();

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["totalProtein"], 8.0);
        assert_eq!(json["entries"][0]["entryId"], 1_718_000_000_000_i64);
        assert_eq!(json["entries"][0]["servingSize"], "100g");
        assert_eq!(json["entries"][0]["brandName"], "Acme");
        assert_eq!(json["entries"][0]["name"], "Tofu");
    }

    #[test]
    fn test_record_decodes_browser_payload() {
        let raw = r#"{
            "date": "2024-06-15",
            "entries": [
                {"id": 123, "name": "Lentils", "protein": 9, "fiber": 7.9,
                 "servingSize": "100g", "brandName": null,
                 "timestamp": "2024-06-15T08:00:00.000Z", "entryId": 1718438400000}
            ],
            "totalProtein": 9,
            "totalFiber": 7.9,
            "timestamp": "2024-06-15T08:00:00.000Z"
        }"#;
        let record: DailyRecord = serde_json::from_str(raw).unwrap();
        assert_eq!(record.entries.len(), 1);
        assert_eq!(record.entries[0].food.id, 123);
        assert!(record.entries[0].food.brand_name.is_none());
        assert!((record.entries[0].food.fiber - 7.9).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pie_series_placeholder() {
        let pie = PieSeries::from_sources(&[ProteinSource::no_data()]);
        assert_eq!(pie.labels, vec![NO_DATA_LABEL.to_string()]);
        assert_eq!(pie.data, vec![1.0]);
    }

    #[test]
    fn test_pie_series_rounds_totals() {
        let pie = PieSeries::from_sources(&[
            ProteinSource {
                name: "Chicken".to_string(),
                total_protein: 49.5,
            },
            ProteinSource {
                name: "Tofu".to_string(),
                total_protein: 10.2,
            },
        ]);
        assert_eq!(pie.data, vec![50.0, 10.0]);
    }
}
