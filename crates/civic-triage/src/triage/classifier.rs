use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::domain::Category;

/// Fallback authority for text the classifier cannot place.
pub const GENERAL_HELPLINE: &str = "General Helpline 311";

/// Classifier output: the category plus the authority responsible for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: Category,
    pub authority: String,
}

impl Classification {
    pub fn for_category(category: Category) -> Self {
        Self {
            category,
            authority: authority_for(category).to_string(),
        }
    }
}

/// Maps free report text to a category. Implementations must be
/// deterministic so duplicate detection by category stays meaningful.
pub trait IssueClassifier: Send + Sync {
    fn classify(&self, text: &str) -> Classification;
}

pub const fn authority_for(category: Category) -> &'static str {
    match category {
        Category::Waste => "MCD",
        Category::Water => "Delhi Jal Board",
        Category::Air => "DPCC / CPCB",
        Category::Transport => "Delhi Traffic Police / DTC",
        Category::Energy => "BSES / Tata Power",
        Category::Sanitation => "MCD Sanitation",
        Category::Noise => "Delhi Police",
        Category::Unclassified => GENERAL_HELPLINE,
    }
}

/// Cue phrases per category, matched case-insensitively as substrings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lexicon {
    cues: BTreeMap<Category, Vec<String>>,
}

impl Lexicon {
    pub fn builtin() -> Self {
        let mut lexicon = Self::default();
        for (category, cues) in BUILTIN_CUES {
            for cue in *cues {
                lexicon.insert(*category, cue);
            }
        }
        lexicon
    }

    /// Adds a cue; blank and repeated cues are ignored.
    pub fn insert(&mut self, category: Category, cue: &str) {
        let cue = cue.trim().to_lowercase();
        if cue.is_empty() {
            return;
        }
        let cues = self.cues.entry(category).or_default();
        if !cues.contains(&cue) {
            cues.push(cue);
        }
    }

    pub fn cues(&self, category: Category) -> &[String] {
        self.cues.get(&category).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.values().all(Vec::is_empty)
    }

    pub fn len(&self) -> usize {
        self.cues.values().map(Vec::len).sum()
    }
}

const BUILTIN_CUES: &[(Category, &[&str])] = &[
    (
        Category::Waste,
        &[
            "garbage", "trash", "dustbin", "litter", "waste", "dump", "rubbish", "kachra",
        ],
    ),
    (
        Category::Water,
        &[
            "water", "pipeline", "pipe burst", "leak", "tap", "tanker", "supply", "paani",
        ],
    ),
    (
        Category::Air,
        &[
            "smoke", "pollution", "dust", "burning", "smog", "fumes", "haze", "air quality",
        ],
    ),
    (
        Category::Transport,
        &[
            "traffic", "pothole", "bus", "signal", "road", "jam", "parking", "metro",
        ],
    ),
    (
        Category::Energy,
        &[
            "electric", "power", "transformer", "spark", "wire", "streetlight", "outage",
            "meter", "short circuit", "bijli",
        ],
    ),
    (
        Category::Sanitation,
        &[
            "drain", "sewer", "sewage", "manhole", "toilet", "bad smell", "gutter", "nala",
        ],
    ),
    (
        Category::Noise,
        &[
            "noise", "loud", "music", "speaker", "honking", "construction at night",
        ],
    ),
];

/// Deterministic cue-counting classifier. The category with the most
/// matched cues wins; ties go to the earlier category in
/// [`Category::ordered`]; no match yields [`Category::Unclassified`].
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    lexicon: Lexicon,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        Self::new(Lexicon::builtin())
    }
}

impl KeywordClassifier {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    fn best_category(&self, text: &str) -> Category {
        let text = text.to_lowercase();
        let mut best = (Category::Unclassified, 0usize);

        for category in Category::ordered() {
            let hits = self
                .lexicon
                .cues(category)
                .iter()
                .filter(|cue| text.contains(cue.as_str()))
                .count();
            if hits > best.1 {
                best = (category, hits);
            }
        }

        best.0
    }
}

impl IssueClassifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Classification {
        let category = self.best_category(text);
        debug!(%category, "classified report text");
        Classification::for_category(category)
    }
}
