use chrono::{Days, Local, NaiveDate};

/// Calendar date format used everywhere a date is written as text.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// A simple clock abstraction for deterministic dates in services and tests.
///
/// Scheduling works on calendar days, so the clock hands out `NaiveDate`s in
/// the local time zone rather than timestamps.
#[derive(Debug, Clone, Copy, Default)]
pub enum Clock {
    #[default]
    Default,
    Fixed(NaiveDate),
}

impl Clock {
    /// Returns a clock fixed at the given day.
    #[must_use]
    pub fn fixed(on: NaiveDate) -> Self {
        Self::Fixed(on)
    }

    /// Returns the current calendar day according to the clock.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        match self {
            Clock::Default => Local::now().date_naive(),
            Clock::Fixed(day) => *day,
        }
    }

    /// If this is a fixed clock, move it forward by `days`.
    ///
    /// Has no effect on `Clock::Default`, or when the result would overflow.
    pub fn advance(&mut self, days: u64) {
        if let Clock::Fixed(day) = self {
            if let Some(next) = day.checked_add_days(Days::new(days)) {
                *day = next;
            }
        }
    }
}

/// Formats a calendar date as `YYYY-MM-DD`.
#[must_use]
pub fn format_date(day: NaiveDate) -> String {
    day.format(DATE_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` calendar date.
///
/// # Errors
///
/// Returns `chrono::ParseError` if the text is not a valid ISO calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
}

/// Returns a deterministic day for tests and doc examples (2024-01-01).
///
/// # Panics
///
/// Panics if the fixed date cannot be represented.
#[must_use]
pub fn fixed_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("fixed date should be valid")
}

/// Returns a `Clock` fixed at the deterministic test day.
#[must_use]
pub fn fixed_clock() -> Clock {
    Clock::fixed(fixed_today())
}
