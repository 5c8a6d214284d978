//! CSV inputs: classifier lexicons and batches of recorded reports.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

use super::classifier::Lexicon;
use super::domain::{Category, UnknownCategory};

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read CSV input: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid CSV data: {0}")]
    Csv(#[from] csv::Error),
    #[error("lexicon row {row}: {source}")]
    Category {
        row: usize,
        #[source]
        source: UnknownCategory,
    },
    #[error("report row {row}: unparseable reported_at '{value}'")]
    Timestamp { row: usize, value: String },
    #[error("report row {row}: resolves '{value}' must name an earlier row")]
    ResolveTarget { row: usize, value: String },
    #[error("lexicon contains no cues")]
    EmptyLexicon,
}

#[derive(Debug, Deserialize)]
struct LexiconRow {
    label: String,
    keyword: String,
}

/// Loads `label,keyword` rows into a [`Lexicon`]. Labels must name a
/// classifiable category.
pub fn lexicon_from_reader<R: Read>(reader: R) -> Result<Lexicon, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut lexicon = Lexicon::default();

    for (index, record) in csv_reader.deserialize::<LexiconRow>().enumerate() {
        let row = record?;
        let category = row
            .label
            .parse::<Category>()
            .and_then(|category| match category {
                Category::Unclassified => Err(UnknownCategory(row.label.clone())),
                other => Ok(other),
            })
            .map_err(|source| ImportError::Category {
                row: index + 1,
                source,
            })?;
        lexicon.insert(category, &row.keyword);
    }

    if lexicon.is_empty() {
        return Err(ImportError::EmptyLexicon);
    }
    Ok(lexicon)
}

pub fn lexicon_from_path<P: AsRef<Path>>(path: P) -> Result<Lexicon, ImportError> {
    let file = std::fs::File::open(path)?;
    lexicon_from_reader(file)
}

/// A previously collected report awaiting replay through the service.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedReport {
    pub text: String,
    pub location: String,
    pub reported_at: Option<DateTime<Utc>>,
    /// 1-based row whose issue this row resolves instead of filing a report.
    pub resolves: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ReportRow {
    text: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    location: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    reported_at: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    resolves: Option<String>,
}

/// Reads `text,location[,reported_at[,resolves]]` rows. Missing locations
/// default to `0,0`; `reported_at` accepts RFC 3339 or `YYYY-MM-DD`. A
/// `resolves` value names an earlier row whose issue an admin resolves at that
/// point; such rows file no report.
pub fn reports_from_reader<R: Read>(reader: R) -> Result<Vec<RecordedReport>, ImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut reports = Vec::new();

    for (index, record) in csv_reader.deserialize::<ReportRow>().enumerate() {
        let row = record?;
        let row_number = index + 1;
        let reported_at = match row.reported_at {
            Some(value) => Some(parse_timestamp(&value).ok_or(ImportError::Timestamp {
                row: row_number,
                value,
            })?),
            None => None,
        };
        let resolves = match row.resolves {
            Some(value) => Some(
                value
                    .parse::<usize>()
                    .ok()
                    .filter(|target| (1..row_number).contains(target))
                    .ok_or(ImportError::ResolveTarget {
                        row: row_number,
                        value,
                    })?,
            ),
            None => None,
        };

        reports.push(RecordedReport {
            text: row.text,
            location: row.location.unwrap_or_else(|| "0,0".to_string()),
            reported_at,
            resolves,
        });
    }

    Ok(reports)
}

pub fn reports_from_path<P: AsRef<Path>>(path: P) -> Result<Vec<RecordedReport>, ImportError> {
    let file = std::fs::File::open(path)?;
    reports_from_reader(file)
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let trimmed = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
