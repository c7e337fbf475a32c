use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ScheduleError {
    #[error("spacing schedule must contain at least one offset")]
    Empty,
    #[error("offset {position} must be at least one day")]
    ZeroOffset { position: usize },
    #[error("offset {position} ({offset}) must be greater than the previous offset ({previous})")]
    NotAscending {
        position: usize,
        previous: u32,
        offset: u32,
    },
    #[error("review date {offset} days after {study_date} is out of range")]
    DateOverflow { study_date: NaiveDate, offset: u32 },
    #[error("unknown spacing schedule preset: {0}")]
    UnknownPreset(String),
}

//
// ─── OFFSET TABLES ─────────────────────────────────────────────────────────────
//

/// Dense schedule: 27 reviews over roughly a year, gaps growing by one day each step.
pub const DENSE_OFFSETS: [u32; 27] = [
    1, 3, 6, 10, 15, 21, 28, 36, 45, 55, 66, 78, 91, 105, 120, 136, 153, 171, 190, 210, 231, 253,
    276, 300, 325, 351, 378,
];

/// Sparse schedule: 10 reviews over two years, gaps roughly doubling.
pub const SPARSE_OFFSETS: [u32; 10] = [1, 3, 7, 14, 30, 60, 90, 180, 365, 730];

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// Turns a study date into the ordered list of days it should be revisited.
///
/// Implementations are pure: the same study date always yields the same
/// review dates. The default `review_dates` adds each offset to the study date
/// in order, so an ascending offset table yields ascending dates.
pub trait IntervalPolicy: Send + Sync {
    /// Short label used in logs and configuration.
    fn name(&self) -> &str;

    /// Ascending day offsets from the study date.
    fn offsets(&self) -> &[u32];

    fn review_count(&self) -> usize {
        self.offsets().len()
    }

    /// Review dates for a session studied on `study_date`.
    ///
    /// # Errors
    ///
    /// Returns `ScheduleError::DateOverflow` if an offset lands past the end of
    /// the representable calendar.
    fn review_dates(&self, study_date: NaiveDate) -> Result<Vec<NaiveDate>, ScheduleError> {
        self.offsets()
            .iter()
            .map(|&offset| {
                study_date
                    .checked_add_days(Days::new(u64::from(offset)))
                    .ok_or(ScheduleError::DateOverflow { study_date, offset })
            })
            .collect()
    }
}

/// Named presets for the built-in spacing schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulePreset {
    Dense,
    #[default]
    Sparse,
}

impl SchedulePreset {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SchedulePreset::Dense => "dense",
            SchedulePreset::Sparse => "sparse",
        }
    }

    #[must_use]
    pub fn offsets(self) -> &'static [u32] {
        match self {
            SchedulePreset::Dense => &DENSE_OFFSETS,
            SchedulePreset::Sparse => &SPARSE_OFFSETS,
        }
    }
}

impl fmt::Display for SchedulePreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SchedulePreset {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dense" => Ok(Self::Dense),
            "sparse" => Ok(Self::Sparse),
            other => Err(ScheduleError::UnknownPreset(other.to_owned())),
        }
    }
}

/// A fixed table of day offsets.
///
/// # Examples
///
/// ```
/// # use study_core::schedule::{IntervalPolicy, SpacingSchedule};
/// let schedule = SpacingSchedule::sparse();
/// let studied = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// let dates = schedule.review_dates(studied)?;
///
/// assert_eq!(dates.len(), 10);
/// assert_eq!(dates[0].to_string(), "2024-01-02");
/// # Ok::<(), study_core::schedule::ScheduleError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpacingSchedule {
    name: String,
    offsets: Vec<u32>,
}

impl SpacingSchedule {
    #[must_use]
    pub fn dense() -> Self {
        Self::preset(SchedulePreset::Dense)
    }

    #[must_use]
    pub fn sparse() -> Self {
        Self::preset(SchedulePreset::Sparse)
    }

    #[must_use]
    pub fn preset(preset: SchedulePreset) -> Self {
        Self {
            name: preset.as_str().to_owned(),
            offsets: preset.offsets().to_vec(),
        }
    }

    /// Build a schedule from caller-supplied offsets.
    ///
    /// # Errors
    ///
    /// - `Empty` if no offsets are given
    /// - `ZeroOffset` if an offset is zero (a review on the study day itself)
    /// - `NotAscending` if an offset does not exceed its predecessor
    pub fn custom(name: impl Into<String>, offsets: Vec<u32>) -> Result<Self, ScheduleError> {
        if offsets.is_empty() {
            return Err(ScheduleError::Empty);
        }

        let mut previous = 0;
        for (idx, &offset) in offsets.iter().enumerate() {
            if offset == 0 {
                return Err(ScheduleError::ZeroOffset { position: idx + 1 });
            }
            if idx > 0 && offset <= previous {
                return Err(ScheduleError::NotAscending {
                    position: idx + 1,
                    previous,
                    offset,
                });
            }
            previous = offset;
        }

        Ok(Self {
            name: name.into(),
            offsets,
        })
    }
}

impl Default for SpacingSchedule {
    fn default() -> Self {
        Self::preset(SchedulePreset::default())
    }
}

impl IntervalPolicy for SpacingSchedule {
    fn name(&self) -> &str {
        &self.name
    }

    fn offsets(&self) -> &[u32] {
        &self.offsets
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
