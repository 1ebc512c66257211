use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Kind of enforcement action, derived from the PDF link's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionType {
    EnforcementNotice,
    MonetaryPenalty,
    Undertaking,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::EnforcementNotice => "enforcement-notice",
            ActionType::MonetaryPenalty => "monetary-penalty",
            ActionType::Undertaking => "undertaking",
        }
    }

    /// Map a path slug from the regulator's media URLs (e.g. `mpns`).
    pub fn from_slug(slug: &str) -> Option<Self> {
        match slug {
            "enforcement-notices" => Some(ActionType::EnforcementNotice),
            "mpns" => Some(ActionType::MonetaryPenalty),
            "undertakings" => Some(ActionType::Undertaking),
            _ => None,
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "enforcement-notice" => Ok(ActionType::EnforcementNotice),
            "monetary-penalty" => Ok(ActionType::MonetaryPenalty),
            "undertaking" => Ok(ActionType::Undertaking),
            other => Err(format!("unknown action type '{other}'")),
        }
    }
}

/// One enforcement action, keyed by the URL of its detail page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnforcementRecord {
    pub url: String,
    pub pdf_id: Option<String>,
    pub pdf_url: Option<String>,
    pub action_type: Option<ActionType>,
    pub date: Option<NaiveDate>,
    /// Organisation name, taken from the page heading.
    pub title: Option<String>,
    pub description: String,
    pub abbreviated_description: String,
    pub penalty_amount: Option<String>,
    /// Only ever flips false -> true, after a confirmed post.
    pub tweet_sent: bool,
}

impl EnforcementRecord {
    /// Carry delivery status over from a previously stored copy.
    pub fn preserve_delivery(&mut self, existing: Option<&EnforcementRecord>) {
        if existing.is_some_and(|prev| prev.tweet_sent) {
            self.tweet_sent = true;
        }
    }
}
