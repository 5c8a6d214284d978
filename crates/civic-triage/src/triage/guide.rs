use std::fmt;
use std::str::FromStr;

use super::domain::Category;

/// Language used for the suggested next actions sent back to reporters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    /// Romanised Hindi-English mix used by the original citizen app.
    #[default]
    Hinglish,
    English,
}

impl Locale {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Hinglish => "hinglish",
            Self::English => "en",
        }
    }
}

impl FromStr for Locale {
    type Err = UnknownLocale;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "hinglish" | "hi" | "hi-latn" => Ok(Self::Hinglish),
            "en" | "english" | "en-in" => Ok(Self::English),
            other => Err(UnknownLocale(other.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported locale '{0}' (expected hinglish or en)")]
pub struct UnknownLocale(pub String);

/// Per-category next steps for the person filing a report.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionGuide {
    locale: Locale,
}

impl ActionGuide {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn actions(&self, category: Category) -> &'static [&'static str] {
        actions_for(category, self.locale)
    }
}

/// Unclassified reports get no guidance.
pub fn actions_for(category: Category, locale: Locale) -> &'static [&'static str] {
    match (locale, category) {
        (Locale::Hinglish, Category::Waste) => &[
            "Dry aur wet waste alag rakhein.",
            "Complaint ke saath photo upload karein.",
            "48 ghante me safai na ho to re-report karein.",
        ],
        (Locale::Hinglish, Category::Water) => &[
            "Leak ya problem ki clear photo upload karein.",
            "Main valve check karein.",
            "Emergency me tanker request karein.",
        ],
        (Locale::Hinglish, Category::Air) => &[
            "Pollution source ki exact location mention karein.",
            "Mask use karein aur polluted area se door rahein.",
        ],
        (Locale::Hinglish, Category::Transport) => &[
            "Problem wali jagah ka landmark likhein.",
            "Peak time mention karein.",
        ],
        (Locale::Hinglish, Category::Energy) => &[
            "Spark ya exposed wire se turant door rahein.",
            "Pole ya meter number mention karein.",
        ],
        (Locale::Hinglish, Category::Sanitation) => &[
            "Blocked drain ki photo upload karein.",
            "Bachon ko us area se door rakhein.",
        ],
        (Locale::Hinglish, Category::Noise) => &[
            "Noise ka time aur source clearly likhein.",
            "Night disturbance ho to urgent mark karein.",
        ],
        (Locale::English, Category::Waste) => &[
            "Keep dry and wet waste separate.",
            "Attach a photo with the complaint.",
            "Report again if the spot is not cleaned within 48 hours.",
        ],
        (Locale::English, Category::Water) => &[
            "Upload a clear photo of the leak or problem.",
            "Check the main valve.",
            "Request a tanker in an emergency.",
        ],
        (Locale::English, Category::Air) => &[
            "Mention the exact location of the pollution source.",
            "Wear a mask and stay away from the polluted area.",
        ],
        (Locale::English, Category::Transport) => &[
            "Note a landmark near the problem spot.",
            "Mention the peak hours when it happens.",
        ],
        (Locale::English, Category::Energy) => &[
            "Stay away from sparks or exposed wires.",
            "Mention the pole or meter number.",
        ],
        (Locale::English, Category::Sanitation) => &[
            "Upload a photo of the blocked drain.",
            "Keep children away from the area.",
        ],
        (Locale::English, Category::Noise) => &[
            "Write down the time and source of the noise.",
            "Mark it urgent if it disturbs you at night.",
        ],
        (_, Category::Unclassified) => &[],
    }
}
