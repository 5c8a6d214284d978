//! Coarse per-area aggregation used by the admin health views.

use super::domain::{Issue, IssueStatus};
use serde::Serialize;
use std::collections::HashMap;

/// Buckets scoring below this are reported as critical.
pub const CRITICAL_HEALTH_THRESHOLD: u8 = 40;
const GREEN_HEALTH_THRESHOLD: u8 = 70;

/// Bucket key for a coordinate pair, e.g. `28.61_77.2`. Each coordinate is
/// rounded to two decimals and written in its shortest form, keeping at least
/// one decimal (`28.0`, `-0.0`).
pub fn bucket_key(lat: f64, lon: f64) -> String {
    format!("{}_{}", two_decimals(lat), two_decimals(lon))
}

fn two_decimals(value: f64) -> String {
    let mut formatted = format!("{value:.2}");
    if formatted.ends_with('0') {
        formatted.pop();
    }
    formatted
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthColor {
    Green,
    Yellow,
    Red,
}

impl HealthColor {
    pub const fn for_score(score: u8) -> Self {
        if score >= GREEN_HEALTH_THRESHOLD {
            Self::Green
        } else if score >= CRITICAL_HEALTH_THRESHOLD {
            Self::Yellow
        } else {
            Self::Red
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalArea {
    pub area: String,
    pub health_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AreaHealth {
    pub area: String,
    pub health_score: u8,
    pub color: HealthColor,
    pub total_issues: usize,
    pub resolved_issues: usize,
}

#[derive(Debug, Default, Clone, Copy)]
struct AreaTally {
    total: usize,
    resolved: usize,
}

impl AreaTally {
    /// Percentage of resolved issues, floored.
    fn health_score(self) -> u8 {
        if self.total == 0 {
            return 0;
        }
        (self.resolved * 100 / self.total) as u8
    }
}

/// Groups issues by bucket, keeping buckets in first-seen order.
fn tally<'a, I>(issues: I) -> Vec<(String, AreaTally)>
where
    I: IntoIterator<Item = &'a Issue>,
{
    let mut positions: HashMap<String, usize> = HashMap::new();
    let mut buckets: Vec<(String, AreaTally)> = Vec::new();

    for issue in issues {
        let key = bucket_key(issue.lat, issue.lon);
        let index = match positions.get(&key) {
            Some(index) => *index,
            None => {
                positions.insert(key.clone(), buckets.len());
                buckets.push((key, AreaTally::default()));
                buckets.len() - 1
            }
        };

        let entry = &mut buckets[index].1;
        entry.total += 1;
        if issue.status == IssueStatus::Resolved {
            entry.resolved += 1;
        }
    }

    buckets
}

pub(crate) fn critical_areas<'a, I>(issues: I) -> Vec<CriticalArea>
where
    I: IntoIterator<Item = &'a Issue>,
{
    tally(issues)
        .into_iter()
        .filter_map(|(area, tally)| {
            let health_score = tally.health_score();
            (health_score < CRITICAL_HEALTH_THRESHOLD).then_some(CriticalArea { area, health_score })
        })
        .collect()
}

pub(crate) fn area_health<'a, I>(issues: I) -> Vec<AreaHealth>
where
    I: IntoIterator<Item = &'a Issue>,
{
    tally(issues)
        .into_iter()
        .map(|(area, tally)| {
            let health_score = tally.health_score();
            AreaHealth {
                area,
                health_score,
                color: HealthColor::for_score(health_score),
                total_issues: tally.total,
                resolved_issues: tally.resolved,
            }
        })
        .collect()
}
