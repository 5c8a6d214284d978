use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Civic problem categories the classifier can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Waste,
    Water,
    Air,
    Transport,
    Energy,
    Sanitation,
    Noise,
    Unclassified,
}

impl Category {
    /// Classifiable categories in declaration order; `Unclassified` is excluded.
    pub const fn ordered() -> [Self; 7] {
        [
            Self::Waste,
            Self::Water,
            Self::Air,
            Self::Transport,
            Self::Energy,
            Self::Sanitation,
            Self::Noise,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Waste => "waste",
            Self::Water => "water",
            Self::Air => "air",
            Self::Transport => "transport",
            Self::Energy => "energy",
            Self::Sanitation => "sanitation",
            Self::Noise => "noise",
            Self::Unclassified => "unclassified",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ordered()
            .into_iter()
            .chain([Self::Unclassified])
            .find(|category| category.label() == normalized)
            .ok_or_else(|| UnknownCategory(value.trim().to_string()))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown issue category '{0}'")]
pub struct UnknownCategory(pub String);

/// Three-step scale shared by priority and trust. Variant order is the
/// escalation order, so `Ord` gives `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueStatus {
    Open,
    Resolved,
}

/// Store-assigned identifier; serialised as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(pub u64);

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reported civic problem as tracked by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub category: Category,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "count")]
    pub supporters: u32,
    pub priority: Level,
    pub trust_level: Level,
    pub status: IssueStatus,
    pub created_at: DateTime<Utc>,
}

impl Issue {
    pub fn is_open(&self) -> bool {
        self.status == IssueStatus::Open
    }
}

/// Report coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self, LocationError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(LocationError::NonFinite);
        }
        Ok(Self { lat, lon })
    }
}

impl FromStr for Coordinates {
    type Err = LocationError;

    /// Parses the `"lat,lon"` form submitted by reporting clients.
    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let (lat, lon) = raw
            .split_once(',')
            .ok_or_else(|| LocationError::Malformed(raw.to_string()))?;
        if lon.contains(',') {
            return Err(LocationError::Malformed(raw.to_string()));
        }

        let parse = |part: &str| {
            part.trim()
                .parse::<f64>()
                .map_err(|_| LocationError::Malformed(raw.to_string()))
        };

        Self::new(parse(lat)?, parse(lon)?)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location '{0}' must look like \"lat,lon\"")]
    Malformed(String),
    #[error("location coordinates must be finite numbers")]
    NonFinite,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_location_with_whitespace() {
        let coords: Coordinates = " 28.61 , 77.20 ".parse().expect("valid location");
        assert_eq!(coords, Coordinates { lat: 28.61, lon: 77.20 });
    }

    #[test]
    fn rejects_malformed_locations() {
        assert!(matches!(
            "28.61".parse::<Coordinates>(),
            Err(LocationError::Malformed(_))
        ));
        assert!(matches!(
            "1,2,3".parse::<Coordinates>(),
            Err(LocationError::Malformed(_))
        ));
        assert!(matches!(
            "north,77.2".parse::<Coordinates>(),
            Err(LocationError::Malformed(_))
        ));
        assert_eq!(
            "NaN,77.2".parse::<Coordinates>(),
            Err(LocationError::NonFinite)
        );
    }

    #[test]
    fn category_labels_round_trip() {
        for category in Category::ordered() {
            assert_eq!(category.label().parse::<Category>(), Ok(category));
        }
        assert_eq!(" Water ".parse::<Category>(), Ok(Category::Water));
        assert!("potholes".parse::<Category>().is_err());
    }

    #[test]
    fn levels_are_ordered_by_escalation() {
        assert!(Level::Low < Level::Medium);
        assert!(Level::Medium < Level::High);
    }

    #[test]
    fn issue_serializes_with_wire_field_names() {
        let issue = Issue {
            id: IssueId(7),
            category: Category::Energy,
            lat: 28.61,
            lon: 77.2,
            supporters: 2,
            priority: Level::High,
            trust_level: Level::Low,
            status: IssueStatus::Open,
            created_at: DateTime::parse_from_rfc3339("2025-01-02T03:04:05Z")
                .expect("valid timestamp")
                .with_timezone(&Utc),
        };

        let value = serde_json::to_value(&issue).expect("serializes");
        assert_eq!(value["id"], 7);
        assert_eq!(value["count"], 2);
        assert_eq!(value["category"], "energy");
        assert_eq!(value["priority"], "high");
        assert_eq!(value["status"], "open");
    }
}
