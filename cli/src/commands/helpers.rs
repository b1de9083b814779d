use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use std::io::{self, BufRead, Write};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use nutrilog_core::models::{FoodCandidate, LoggedEntry, check_day, parse_day};

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    let today = Local::now().date_naive();
    let date = match date_str.as_deref() {
        None | Some("today") => today,
        Some("yesterday") => today - chrono::Duration::days(1),
        Some("tomorrow") => today + chrono::Duration::days(1),
        Some(s) => {
            return parse_day(s).with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
            });
        }
    };
    Ok(check_day(date)?)
}

fn read_line() -> Result<String> {
    io::stderr().flush()?;
    let stdin = io::stdin();
    let line = stdin.lock().lines().next().context("No input")??;
    Ok(line)
}

/// Ask for a 1-based choice on stderr; returns the 0-based index.
pub(crate) fn prompt_choice(count: usize) -> Result<usize> {
    eprint!("\nSelect a food (1-{count}): ");
    parse_choice(&read_line()?, count)
}

fn parse_choice(line: &str, count: usize) -> Result<usize> {
    let n: usize = line.trim().parse().context("Invalid number")?;
    if n < 1 || n > count {
        bail!("Selection out of range");
    }
    Ok(n - 1)
}

/// Yes/no prompt on stderr. Anything but y/yes is a no.
pub(crate) fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    Ok(is_yes(&read_line()?))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Convert a 1-based position typed by the user to an index.
pub(crate) fn position_to_index(position: i64) -> Result<usize> {
    if position < 1 {
        bail!("Position must be 1 or greater");
    }
    usize::try_from(position - 1).context("Position too large")
}

pub(crate) fn print_candidate_table(foods: &[FoodCandidate]) {
    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "FDC ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Brand")]
        brand: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Fiber")]
        fiber: String,
        #[tabled(rename = "Serving")]
        serving: String,
    }

    let rows: Vec<FoodRow> = foods
        .iter()
        .enumerate()
        .map(|(i, f)| FoodRow {
            idx: i + 1,
            id: f.id,
            name: truncate(&f.name, 40),
            brand: f
                .brand_name
                .as_deref()
                .map(|b| truncate(b, 20))
                .unwrap_or_default(),
            protein: format!("{:.1}g", f.protein),
            fiber: format!("{:.1}g", f.fiber),
            serving: f.serving_size.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn print_entry_table(entries: &[LoggedEntry]) {
    #[derive(Tabled)]
    struct EntryRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Food")]
        name: String,
        #[tabled(rename = "Serving")]
        serving: String,
        #[tabled(rename = "Protein")]
        protein: String,
        #[tabled(rename = "Fiber")]
        fiber: String,
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .enumerate()
        .map(|(i, e)| EntryRow {
            idx: i + 1,
            name: truncate(&e.food.name, 40),
            serving: e.food.serving_size.clone(),
            protein: format!("{:.1}g", e.food.protein),
            fiber: format!("{:.1}g", e.food.fiber),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

/// Shorten `s` to at most `max` characters, marking the cut with "...".
pub(crate) fn truncate(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let head: String = chars.by_ref().take(max).collect();
    if chars.next().is_none() {
        return head;
    }
    let kept = max.saturating_sub(3);
    head.chars().take(kept).chain("...".chars()).collect()
}

pub(crate) fn plural_days(n: u32) -> String {
    if n == 1 {
        "1 day".to_string()
    } else {
        format!("{n} days")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_none() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(None).unwrap(), today);
    }

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date(Some("today".to_string())).unwrap(), today);
        assert_eq!(
            parse_date(Some("yesterday".to_string())).unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date(Some("tomorrow".to_string())).unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date(Some("2024-01-15".to_string())).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date(Some("nope".to_string())).is_err());
        assert!(parse_date(Some("2024-02-30".to_string())).is_err());
    }

    #[test]
    fn test_parse_date_outside_supported_years() {
        assert!(parse_date(Some("-262143-01-03".to_string())).is_err());
        assert!(parse_date(Some("0000-06-01".to_string())).is_err());
        assert!(parse_date(Some("+10000-01-01".to_string())).is_err());
        assert!(parse_date(Some("9999-12-31".to_string())).is_ok());
    }

    #[test]
    fn test_parse_choice() {
        assert_eq!(parse_choice("1\n", 3).unwrap(), 0);
        assert_eq!(parse_choice(" 3 ", 3).unwrap(), 2);
        assert!(parse_choice("0", 3).is_err());
        assert!(parse_choice("4", 3).is_err());
        assert!(parse_choice("two", 3).is_err());
    }

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES\n"));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[test]
    fn test_position_to_index() {
        assert_eq!(position_to_index(1).unwrap(), 0);
        assert_eq!(position_to_index(4).unwrap(), 3);
        assert!(position_to_index(0).is_err());
        assert!(position_to_index(-2).is_err());
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
        assert_eq!(truncate("日清カップヌードル", 8), "日清カップ...");
    }

    #[test]
    fn test_truncate_exact_fit_and_tiny_width() {
        assert_eq!(truncate("Oatmeal", 7), "Oatmeal");
        assert_eq!(truncate("Oatmeal", 2), "...");
    }

    #[test]
    fn test_plural_days() {
        assert_eq!(plural_days(0), "0 days");
        assert_eq!(plural_days(1), "1 day");
        assert_eq!(plural_days(5), "5 days");
    }
}
