//! Billing period resolution.
//!
//! A billing period covers one calendar month in the reference timezone,
//! from the first second of the month to the last.

use std::fmt;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;

/// Timezone the billing provider uses for invoice dates.
pub const REFERENCE_TIMEZONE: Tz = chrono_tz::Europe::Paris;

const MIN_YEAR: i32 = 2000;
const MAX_YEAR: i32 = 2999;

/// One calendar month, resolved to its first and last instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingPeriod {
    year: i32,
    month: u32,
    start: DateTime<Tz>,
    end: DateTime<Tz>,
}

impl BillingPeriod {
    /// Create the period for the given year and month.
    ///
    /// # Errors
    /// Returns an error if the year or month is out of range.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            bail!("Invalid year {year}: expected a value between {MIN_YEAR} and {MAX_YEAR}");
        }
        if !(1..=12).contains(&month) {
            bail!("Invalid month {month}: expected a value between 1 and 12");
        }

        let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
        let start = month_start(year, month)?;
        let end = month_start(next_year, next_month)? - TimeDelta::seconds(1);

        Ok(Self {
            year,
            month,
            start,
            end,
        })
    }

    /// Parse the period from year and month strings, for example `"2024"` and `"03"`.
    ///
    /// # Errors
    /// Returns an error if either value is not a number or is out of range.
    pub fn parse(year: &str, month: &str) -> Result<Self> {
        let year_number = year
            .trim()
            .parse::<i32>()
            .with_context(|| format!("Invalid year: '{year}'"))?;
        let month_number = month
            .trim()
            .parse::<u32>()
            .with_context(|| format!("Invalid month: '{month}'"))?;
        Self::new(year_number, month_number)
    }

    /// The period containing the current instant in the reference timezone.
    ///
    /// # Errors
    /// Returns an error only if the current date is outside the supported year range.
    pub fn current() -> Result<Self> {
        let now = Utc::now().with_timezone(&REFERENCE_TIMEZONE);
        Self::new(now.year(), now.month())
    }

    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First instant of the month.
    #[must_use]
    pub const fn start(&self) -> &DateTime<Tz> {
        &self.start
    }

    /// Last second of the month: the start of the next month minus one second.
    #[must_use]
    pub const fn end(&self) -> &DateTime<Tz> {
        &self.end
    }

    /// Range query values for the API as `(date.from, date.to)`.
    #[must_use]
    pub fn api_range(&self) -> (String, String) {
        (
            self.start().to_rfc3339_opts(SecondsFormat::Secs, false),
            self.end().to_rfc3339_opts(SecondsFormat::Secs, false),
        )
    }

    /// Directory name for the year, e.g. `2024`.
    #[must_use]
    pub fn year_dir(&self) -> String {
        self.year.to_string()
    }

    /// Zero-padded directory name for the month, e.g. `03`.
    #[must_use]
    pub fn month_dir(&self) -> String {
        format!("{:02}", self.month)
    }
}

impl fmt::Display for BillingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year(), self.month())
    }
}

/// Midnight on the first day of the month in the reference timezone.
fn month_start(year: i32, month: u32) -> Result<DateTime<Tz>> {
    let midnight = NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .with_context(|| format!("Invalid date: {year}-{month:02}-01"))?;

    REFERENCE_TIMEZONE
        .from_local_datetime(&midnight)
        .single()
        .with_context(|| format!("Ambiguous local time for {midnight} in {REFERENCE_TIMEZONE}"))
}
