use serde::{Deserialize, Serialize};

/// Canonical form of an entity name: trimmed, lower-cased, whitespace runs
/// collapsed to a single space.
pub fn normalize_name(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| word.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Keyword match type as it participates in the target composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Exact,
    Phrase,
    Broad,
    TargetingExpression,
    Unknown,
}

impl MatchType {
    /// Classify raw report text ("Negative Phrase", "broad", "TARGETING_EXPRESSION_PREDEFINED", ...).
    pub fn parse(raw: &str) -> Self {
        let upper = raw.to_uppercase();
        if upper.contains("EXACT") {
            Self::Exact
        } else if upper.contains("PHRASE") {
            Self::Phrase
        } else if upper.contains("BROAD") {
            Self::Broad
        } else if upper.contains("TARGET") {
            Self::TargetingExpression
        } else {
            Self::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exact => "EXACT",
            Self::Phrase => "PHRASE",
            Self::Broad => "BROAD",
            Self::TargetingExpression => "TARGETING_EXPRESSION",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Negative targeting is signalled only by the word "negative" in the match type text.
pub fn is_negative_match_type(raw: &str) -> bool {
    raw.to_lowercase().contains("negative")
}
