use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// How an event type id declared in a binary is matched against the id stored in a record.
///
/// Store ids are UUIDs, declared ids are free-form strings, so both sides are compared
/// case-insensitively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdMatching {
    /// Declared id equals the stored id (ignoring ASCII case and surrounding whitespace)
    #[default]
    Exact,
    /// Declared id contains the stored id (ignoring ASCII case)
    Contains,
}

impl IdMatching {
    pub fn matches(&self, declared: &str, stored: &str) -> bool {
        let declared = declared.trim();
        let stored = stored.trim();
        if stored.is_empty() {
            return false;
        }
        match self {
            IdMatching::Exact => declared.eq_ignore_ascii_case(stored),
            IdMatching::Contains => declared
                .to_ascii_lowercase()
                .contains(&stored.to_ascii_lowercase()),
        }
    }
}

impl fmt::Display for IdMatching {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdMatching::Exact => write!(f, "exact"),
            IdMatching::Contains => write!(f, "contains"),
        }
    }
}

impl FromStr for IdMatching {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exact" => Ok(IdMatching::Exact),
            "contains" => Ok(IdMatching::Contains),
            other => Err(Error::UnknownMatching(other.to_string())),
        }
    }
}
