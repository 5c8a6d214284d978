//! Priority and trust rules. Every function here is total and side-effect free.

use super::domain::Level;
use chrono::{DateTime, Utc};

/// Life-safety phrases; any hit makes a report high priority.
pub const HIGH_PRIORITY_KEYWORDS: [&str; 12] = [
    "spark",
    "fire",
    "short circuit",
    "blast",
    "gas leak",
    "exposed wire",
    "danger",
    "accident",
    "transformer",
    "electric shock",
    "sewer overflow",
    "open manhole",
];

/// Generic fault phrases, consulted only when no high keyword matched.
pub const MEDIUM_PRIORITY_KEYWORDS: [&str; 10] = [
    "overflow",
    "blocked",
    "jam",
    "not working",
    "broken",
    "garbage",
    "dustbin",
    "pothole",
    "leak",
    "bad smell",
];

const HIGH_SUPPORT_THRESHOLD: u32 = 5;
const MEDIUM_SUPPORT_THRESHOLD: u32 = 3;
const HIGH_AGE_DAYS: i64 = 6;
const MEDIUM_AGE_DAYS: i64 = 3;

pub fn priority_from_keywords(text: &str) -> Level {
    let text = text.to_lowercase();
    if HIGH_PRIORITY_KEYWORDS
        .iter()
        .any(|keyword| text.contains(keyword))
    {
        Level::High
    } else if MEDIUM_PRIORITY_KEYWORDS
        .iter()
        .any(|keyword| text.contains(keyword))
    {
        Level::Medium
    } else {
        Level::Low
    }
}

pub fn priority_from_count(count: u32) -> Level {
    level_for_supporters(count)
}

/// Escalates with whole days elapsed since `created_at`. A timestamp ahead of
/// `now` counts as zero days old.
pub fn priority_from_time(created_at: DateTime<Utc>, now: DateTime<Utc>) -> Level {
    let age_days = (now - created_at).num_days().max(0);
    if age_days >= HIGH_AGE_DAYS {
        Level::High
    } else if age_days >= MEDIUM_AGE_DAYS {
        Level::Medium
    } else {
        Level::Low
    }
}

pub fn trust_from_supporters(count: u32) -> Level {
    level_for_supporters(count)
}

/// Returns the more urgent of two levels.
pub fn merge_priority(a: Level, b: Level) -> Level {
    a.max(b)
}

fn level_for_supporters(count: u32) -> Level {
    if count >= HIGH_SUPPORT_THRESHOLD {
        Level::High
    } else if count >= MEDIUM_SUPPORT_THRESHOLD {
        Level::Medium
    } else {
        Level::Low
    }
}
