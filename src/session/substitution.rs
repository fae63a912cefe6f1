//! Date substitution: finds date fields in document text and computes the
//! literal edits that rewrite them to a target date.
//!
//! Planning is pure; the session applies the resulting edits through the host
//! one `replace_in_story` call at a time.

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::host::Story;
use crate::schedule::{english_day_name, english_month_name, month_from_name};

const NBSP: &str = "\u{00A0}";

/// Which stories substitution may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubstitutionScope {
    #[default]
    AllStories,
    HeadersFootersOnly,
}

impl SubstitutionScope {
    pub fn from_headers_footers_only(only: bool) -> Self {
        if only {
            SubstitutionScope::HeadersFootersOnly
        } else {
            SubstitutionScope::AllStories
        }
    }

    fn includes(self, story: &Story) -> bool {
        match self {
            SubstitutionScope::AllStories => true,
            SubstitutionScope::HeadersFootersOnly => story.kind.is_header_or_footer(),
        }
    }
}

/// One literal replace call against one story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryEdit {
    pub story: usize,
    pub find: String,
    pub replace: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionPlan {
    /// Non-breaking space normalisation, applied first
    pub normalise: Vec<StoryEdit>,
    pub edits: Vec<StoryEdit>,
    /// Number of date fields found
    pub matches: usize,
}

impl SubstitutionPlan {
    pub fn is_empty(&self) -> bool {
        self.matches == 0
    }
}

type Render = fn(&Captures, NaiveDate) -> Option<String>;

struct DatePattern {
    name: &'static str,
    regex: Regex,
    render: Render,
}

struct PatternSet {
    /// Tried in order; the first one that matches anywhere wins
    day_name_group: Vec<DatePattern>,
    /// Runs only if nothing in `day_name_group` matched
    fallback: DatePattern,
    /// Independent of the textual group
    numeric: Vec<DatePattern>,
}

const FULL_DAYS: &str = "Monday|Tuesday|Wednesday|Thursday|Friday|Saturday|Sunday";
const ABBR_DAYS: &str = "Mon|Tue|Wed|Thu|Fri|Sat|Sun";
const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Oct|Nov|Dec";

fn compile(pattern: &str) -> Regex {
    match Regex::new(pattern) {
        Ok(regex) => regex,
        // Patterns are compile-time constants covered by the tests below.
        Err(e) => unreachable!("invalid date pattern {}: {}", pattern, e),
    }
}

fn patterns() -> &'static PatternSet {
    static PATTERNS: OnceLock<PatternSet> = OnceLock::new();
    PATTERNS.get_or_init(|| PatternSet {
        day_name_group: vec![
            DatePattern {
                name: "day, month d, yyyy",
                regex: compile(&format!(
                    r"(?i)\b(?P<dow>{FULL_DAYS}), (?P<month>{MONTHS}) (?P<day>\d{{1,2}}), (?P<year>\d{{4}})\b"
                )),
                render: render_long_form,
            },
            DatePattern {
                name: "dow, month d, yyyy",
                regex: compile(&format!(
                    r"(?i)\b(?P<dow>{ABBR_DAYS}), (?P<month>{MONTHS}) (?P<day>\d{{1,2}}), (?P<year>\d{{4}})\b"
                )),
                render: render_long_form,
            },
            DatePattern {
                name: "day month d, yyyy",
                regex: compile(&format!(
                    r"(?i)\b(?P<dow>{FULL_DAYS}) (?P<month>{MONTHS}) (?P<day>\d{{1,2}}), (?P<year>\d{{4}})\b"
                )),
                render: render_long_form,
            },
        ],
        fallback: DatePattern {
            name: "month d, yyyy",
            regex: compile(&format!(
                r"(?i)\b(?P<month>{MONTHS}) (?P<day>\d{{1,2}}), (?P<year>\d{{4}})\b"
            )),
            render: render_long_form,
        },
        numeric: vec![
            DatePattern {
                name: "mm/dd/yyyy",
                regex: compile(r"\b(?P<m>\d{1,2})(?P<sep>/)(?P<d>\d{1,2})/(?P<year>\d{4})\b"),
                render: render_numeric,
            },
            DatePattern {
                name: "mm-dd-yyyy",
                regex: compile(r"\b(?P<m>\d{1,2})(?P<sep>-)(?P<d>\d{1,2})-(?P<year>\d{4})\b"),
                render: render_numeric,
            },
            DatePattern {
                name: "yyyy-mm-dd",
                regex: compile(r"\b(?P<year>\d{4})-(?P<m>\d{2})-(?P<d>\d{2})\b"),
                render: render_iso,
            },
        ],
    })
}

/// Match the letter case of `original`: all-upper, all-lower, or as given.
fn match_case(original: &str, word: &str) -> String {
    let has_letters = original.chars().any(|c| c.is_alphabetic());
    if has_letters && original.chars().all(|c| !c.is_lowercase()) {
        word.to_uppercase()
    } else if has_letters && original.chars().all(|c| !c.is_uppercase()) {
        word.to_lowercase()
    } else {
        word.to_string()
    }
}

/// Render `value` with the same field width as `original` (two digits stay two).
fn match_width(original: &str, value: u32) -> String {
    if original.len() >= 2 {
        format!("{:02}", value)
    } else {
        value.to_string()
    }
}

fn abbreviate(name: &str) -> &str {
    name.get(..3).unwrap_or(name)
}

fn render_long_form(caps: &Captures, target: NaiveDate) -> Option<String> {
    let month_text = caps.name("month")?.as_str();
    let day_text = caps.name("day")?.as_str();
    let original_day: u32 = day_text.parse().ok()?;
    month_from_name(month_text)?;
    if !(1..=31).contains(&original_day) {
        return None;
    }

    let month_name = english_month_name(target);
    // "May" is both the full and the short form.
    let abbreviated = month_text.len() == 3 && !month_text.eq_ignore_ascii_case("may");
    let month = if abbreviated {
        abbreviate(month_name)
    } else {
        month_name
    };
    let date_part = format!(
        "{} {}, {}",
        match_case(month_text, month),
        match_width(day_text, target.day()),
        target.year()
    );

    match caps.name("dow") {
        Some(dow) => {
            let dow_text = dow.as_str();
            let day_name = english_day_name(target);
            let day_name = if dow_text.len() == 3 {
                abbreviate(day_name)
            } else {
                day_name
            };
            let comma = caps.get(0)?.as_str()[dow.end() - dow.start()..].starts_with(',');
            let separator = if comma { ", " } else { " " };
            Some(format!(
                "{}{}{}",
                match_case(dow_text, day_name),
                separator,
                date_part
            ))
        }
        None => Some(date_part),
    }
}

fn render_numeric(caps: &Captures, target: NaiveDate) -> Option<String> {
    let month_text = caps.name("m")?.as_str();
    let day_text = caps.name("d")?.as_str();
    let sep = caps.name("sep")?.as_str();
    if !plausible(month_text, day_text) {
        return None;
    }
    Some(format!(
        "{m}{sep}{d}{sep}{y}",
        m = match_width(month_text, target.month()),
        d = match_width(day_text, target.day()),
        y = target.year()
    ))
}

fn render_iso(caps: &Captures, target: NaiveDate) -> Option<String> {
    if !plausible(caps.name("m")?.as_str(), caps.name("d")?.as_str()) {
        return None;
    }
    Some(target.format("%Y-%m-%d").to_string())
}

fn plausible(month: &str, day: &str) -> bool {
    matches!((month.parse::<u32>(), day.parse::<u32>()), (Ok(m), Ok(d)) if (1..=12).contains(&m) && (1..=31).contains(&d))
}

/// Replace every non-breaking space with a plain space.
pub fn normalise_spaces(text: &str) -> String {
    text.replace(NBSP, " ")
}

/// Collect the distinct edits one pattern produces across `stories`.
fn collect(pattern: &DatePattern, stories: &[(usize, String)], target: NaiveDate) -> (Vec<StoryEdit>, usize) {
    let mut edits: Vec<StoryEdit> = Vec::new();
    let mut matches = 0;
    for (id, text) in stories {
        for caps in pattern.regex.captures_iter(text) {
            let Some(replacement) = (pattern.render)(&caps, target) else {
                continue;
            };
            matches += 1;
            let found = &caps[0];
            if found == replacement {
                continue;
            }
            let duplicate = edits
                .iter()
                .any(|e| e.story == *id && e.find == found);
            if !duplicate {
                edits.push(StoryEdit {
                    story: *id,
                    find: found.to_string(),
                    replace: replacement,
                });
            }
        }
    }
    if matches > 0 {
        tracing::trace!(pattern = pattern.name, matches, "Date pattern matched");
    }
    (edits, matches)
}

/// Plan the edits that rewrite every recognised date in `stories` to `target`.
pub fn plan(stories: &[Story], target: NaiveDate, scope: SubstitutionScope) -> SubstitutionPlan {
    let in_scope: Vec<&Story> = stories.iter().filter(|s| scope.includes(s)).collect();

    let normalise = in_scope
        .iter()
        .filter(|s| s.text.contains(NBSP))
        .map(|s| StoryEdit {
            story: s.id,
            find: NBSP.to_string(),
            replace: " ".to_string(),
        })
        .collect();

    let texts: Vec<(usize, String)> = in_scope
        .iter()
        .map(|s| (s.id, normalise_spaces(&s.text)))
        .collect();

    let set = patterns();
    let mut edits = Vec::new();
    let mut matches = 0;

    let mut textual_matched = false;
    for pattern in &set.day_name_group {
        let (found, count) = collect(pattern, &texts, target);
        if count > 0 {
            edits.extend(found);
            matches += count;
            textual_matched = true;
            break;
        }
    }
    if !textual_matched {
        let (found, count) = collect(&set.fallback, &texts, target);
        edits.extend(found);
        matches += count;
    }
    for pattern in &set.numeric {
        let (found, count) = collect(pattern, &texts, target);
        edits.extend(found);
        matches += count;
    }

    // Longer finds first so a short literal never rewrites part of a longer one.
    edits.sort_by(|a, b| b.find.len().cmp(&a.find.len()));

    SubstitutionPlan {
        normalise,
        edits,
        matches,
    }
}
