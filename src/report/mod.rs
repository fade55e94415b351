//! Contribution-calendar style view of the ledger.
//!
//! ```text
//!      Mar             Apr             May
//!        -   -   -   1   -   -   -   -   -   -   -   -   -   -
//! Mon    -   -   2   -   -   -   -   -   -   -   -   -   -   -
//!        -   -   -   -   -   -   -   -   1   -   -   -   -   -
//! ```
//!
//! Columns are weeks, rows are weekdays starting on Sunday. Completions are bucketed by how many
//! whole days ago they happened, measured from "now" rather than from the end of the window.

use std::{collections::BTreeMap, fmt::Display};

use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone};

use crate::{catalog::Kata, error::KataError, utils::time::days_ago};

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const LABEL_WIDTH: usize = 5;
const MONTH_WIDTH: usize = 16;

/// Requested report window, before it's extended to whole weeks.
#[derive(Debug, Clone)]
pub struct Boundary<Tz: TimeZone> {
    pub since: DateTime<Tz>,
    pub until: DateTime<Tz>,
}

impl<Tz: TimeZone> Boundary<Tz> {
    /// Window of `days` days ending at `until`. Fails when the start would fall
    /// outside chrono's date range.
    pub fn lookback(until: DateTime<Tz>, days: u32) -> Result<Self, KataError> {
        let since = until
            .clone()
            .checked_sub_signed(Duration::days(days as i64))
            .ok_or(KataError::ReportWindow(days))?;
        Ok(Self { since, until })
    }

    /// First and last day of the window, widened to a Sunday and a Saturday respectively.
    pub fn snapped(&self) -> (NaiveDate, NaiveDate) {
        let since = self.since.date_naive();
        let until = self.until.date_naive();
        let first = since - Duration::days(since.weekday().num_days_from_sunday() as i64);
        let last = until + Duration::days(6 - until.weekday().num_days_from_sunday() as i64);
        (first, last)
    }
}

/// Counts completions by whole days before `now`.
pub fn bucket_completions<Tz: TimeZone>(katas: &[Kata], now: &DateTime<Tz>) -> BTreeMap<i64, usize> {
    let mut buckets = BTreeMap::new();
    for moment in katas.iter().flat_map(|k| k.completions.iter()) {
        *buckets.entry(days_ago(moment, now)).or_insert(0) += 1;
    }
    buckets
}

/// Abbreviated names of every month between `first` and `last`, inclusive.
pub fn months_between(first: NaiveDate, last: NaiveDate) -> Vec<&'static str> {
    let mut months = vec![];
    let (mut year, mut month) = (first.year(), first.month0());
    while (year, month) <= (last.year(), last.month0()) {
        months.push(MONTHS[month as usize]);
        month += 1;
        if month == 12 {
            month = 0;
            year += 1;
        }
    }
    months
}

/// Aggregated calendar, ready to be printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarGrid {
    #[cfg(test)]
    first: NaiveDate,
    months: Vec<&'static str>,
    /// Seven rows, Sunday first. Each entry is one week.
    rows: Vec<Vec<usize>>,
}

impl CalendarGrid {
    pub fn new<Tz: TimeZone>(katas: &[Kata], boundary: &Boundary<Tz>, now: &DateTime<Tz>) -> Self {
        let buckets = bucket_completions(katas, now);
        let (first, last) = boundary.snapped();
        let today = now.date_naive();

        // A cell stands for its date at the current time of day, so its distance from now is a
        // whole number of days.
        let rows = (0..7)
            .map(|weekday| {
                (first + Duration::days(weekday))
                    .iter_days()
                    .step_by(7)
                    .take_while(|date| *date <= last)
                    .map(|date| {
                        let ago = (today - date).num_days();
                        buckets.get(&ago).copied().unwrap_or(0)
                    })
                    .collect()
            })
            .collect();

        Self {
            #[cfg(test)]
            first,
            months: months_between(first, last),
            rows,
        }
    }
}

#[cfg(test)]
impl CalendarGrid {
    pub fn first_day(&self) -> NaiveDate {
        self.first
    }

    pub fn weeks(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    pub fn months(&self) -> &[&'static str] {
        &self.months
    }

    /// Every day of the grid with its completion count, in chronological order.
    pub fn days(&self) -> impl Iterator<Item = (NaiveDate, usize)> + '_ {
        (0..self.weeks()).flat_map(move |week| {
            (0..7).map(move |weekday| {
                let date = self.first + Duration::days((week * 7 + weekday) as i64);
                (date, self.rows[weekday][week])
            })
        })
    }
}

fn weekday_label(weekday: usize) -> &'static str {
    match weekday {
        1 => "Mon",
        3 => "Wed",
        5 => "Fri",
        _ => "",
    }
}

impl Display for CalendarGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut header = " ".repeat(LABEL_WIDTH);
        for month in &self.months {
            header.push_str(&format!("{month:<MONTH_WIDTH$}"));
        }
        writeln!(f, "{}", header.trim_end())?;

        for (weekday, row) in self.rows.iter().enumerate() {
            write!(f, "{:<LABEL_WIDTH$}", weekday_label(weekday))?;
            for count in row {
                if *count == 0 {
                    write!(f, "  - ")?;
                } else {
                    write!(f, " {count:>2} ")?;
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
