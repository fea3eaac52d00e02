//! Routing tags embedded in event names.
//!
//! Organizers prefix event names with a bracketed city code (`[ATX] Board
//! Game Night`) so announcements can ping the right regional audience. The
//! set is closed; an event without a recognized code is "unclassified",
//! which is an expected outcome rather than malformed input.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

static TAG_RE: OnceLock<Regex> = OnceLock::new();

fn tag_re() -> &'static Regex {
    TAG_RE.get_or_init(|| Regex::new(r"\[([A-Z]+)\]").expect("tag regex is valid"))
}

/// Regional routing tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tag {
    /// Dallas
    Dtx,
    /// Houston
    Htx,
    /// Austin
    Atx,
    /// San Antonio
    Satx,
}

impl Tag {
    /// Get the bracketed-code spelling.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Dtx => "DTX",
            Self::Htx => "HTX",
            Self::Atx => "ATX",
            Self::Satx => "SATX",
        }
    }

    /// Extract the first recognized tag from free-form event text.
    ///
    /// Returns `None` for text without any recognized bracketed code.
    #[must_use]
    pub fn extract(text: &str) -> Option<Self> {
        tag_re()
            .captures_iter(text)
            .find_map(|cap| cap[1].parse().ok())
    }
}

impl std::fmt::Display for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Tag {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DTX" => Ok(Self::Dtx),
            "HTX" => Ok(Self::Htx),
            "ATX" => Ok(Self::Atx),
            "SATX" => Ok(Self::Satx),
            _ => Err(()),
        }
    }
}
