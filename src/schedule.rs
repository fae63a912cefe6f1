//! Date/Template Resolver
//!
//! Pure mapping from a calendar date and shift to the template that prints it.
//! Names are English regardless of the system locale, since template files and
//! the date fields inside them are named in English.

use chrono::{Datelike, NaiveDate, Weekday};

use crate::types::{DateRange, ShiftKind, TemplateAssignment, TemplateId};

/// Template used for the day shift on the third Thursday of every month.
pub const THIRD_THURSDAY_TEMPLATE: &str = "THIRD Thursday";

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

pub fn english_day_name(date: NaiveDate) -> &'static str {
    DAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

pub fn english_month_name(date: NaiveDate) -> &'static str {
    MONTH_NAMES[date.month0() as usize]
}

/// Look up a month by its full English name or three-letter abbreviation.
pub fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    MONTH_NAMES
        .iter()
        .position(|m| {
            let m = m.to_ascii_lowercase();
            m == lower || (lower.len() == 3 && m.starts_with(&lower))
        })
        .map(|i| i as u32 + 1)
}

/// Whether `date` is the 3rd Thursday of its month (1-indexed from the 1st).
///
/// The n-th occurrence of a weekday always falls on day `7n-6 ..= 7n`, so the
/// third one is on the 15th through the 21st.
pub fn is_third_thursday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Thu && (15..=21).contains(&date.day())
}

/// Template for a date and shift.
///
/// Day shift: the weekday name, overridden to [`THIRD_THURSDAY_TEMPLATE`] on the
/// third Thursday. Night shift: "<Weekday> Night"; the night folder carries no
/// rotation variant. Never fails and never touches the filesystem.
pub fn resolve_template(date: NaiveDate, shift: ShiftKind) -> TemplateId {
    let day_name = english_day_name(date);
    match shift {
        ShiftKind::Day if is_third_thursday(date) => TemplateId::new(THIRD_THURSDAY_TEMPLATE),
        ShiftKind::Day => TemplateId::new(day_name),
        ShiftKind::Night => TemplateId::new(format!("{} Night", day_name)),
    }
}

/// Expand a range into units of work: for each date ascending, one assignment
/// per requested shift in the order given.
pub fn assignments(range: &DateRange, shifts: &[ShiftKind]) -> Vec<TemplateAssignment> {
    range
        .days()
        .flat_map(|date| {
            shifts.iter().map(move |&shift| TemplateAssignment {
                date,
                shift,
                template_id: resolve_template(date, shift),
            })
        })
        .collect()
}
