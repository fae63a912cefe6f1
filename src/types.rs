//! Core value types shared across the engine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PreflightError;

/// Largest inclusive span a single batch may cover.
pub const MAX_DAYS_RANGE: i64 = 366;

/// Which shift a document belongs to. Selects the template root and naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftKind {
    Day,
    Night,
}

impl ShiftKind {
    pub const ALL: [ShiftKind; 2] = [ShiftKind::Day, ShiftKind::Night];

    pub fn as_str(self) -> &'static str {
        match self {
            ShiftKind::Day => "day",
            ShiftKind::Night => "night",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ShiftKind::Day => "Day",
            ShiftKind::Night => "Night",
        }
    }
}

impl fmt::Display for ShiftKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ShiftKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(ShiftKind::Day),
            "night" => Ok(ShiftKind::Night),
            other => Err(format!("shift must be 'day' or 'night', got '{}'", other)),
        }
    }
}

/// Inclusive calendar date range. Only constructible in a valid state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

/// Unchecked wire form; deserialization goes through [`DateRange::new`].
#[derive(Deserialize)]
struct RawDateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = PreflightError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Validate bounds and span, rejecting `start > end` and spans above
    /// [`MAX_DAYS_RANGE`].
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PreflightError> {
        if end < start {
            return Err(PreflightError::InvertedRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        let requested = (end - start).num_days() + 1;
        if requested > MAX_DAYS_RANGE {
            return Err(PreflightError::RangeTooLarge {
                requested,
                max: MAX_DAYS_RANGE,
            });
        }
        Ok(Self { start, end })
    }

    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both ends.
    pub fn len(&self) -> usize {
        ((self.end - self.start).num_days() + 1) as usize
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Every date in the range, ascending, no gaps.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        self.start.iter_days().take(self.len())
    }
}

/// Identifier of a template, e.g. "Monday", "THIRD Thursday", "Friday Night".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateId(String);

impl TemplateId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One unit of work: a date, a shift, and the template that prints it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateAssignment {
    pub date: NaiveDate,
    pub shift: ShiftKind,
    pub template_id: TemplateId,
}
