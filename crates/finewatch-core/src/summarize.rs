//! Abbreviation pipeline for enforcement descriptions.
//!
//! Produces the short text used both in posts and on the summary image:
//!
//! 1. Cruft removal: `"Acme Ltd has been fined £500,000 for ..."` becomes
//!    `"fined for ..."`. Only fires when the trigger phrase starts within the
//!    first [`CRUFT_SEARCH_WINDOW`] characters.
//! 2. Alias substitution: three independent passes (organisation, service,
//!    regulation), each replacing the first occurrence of the first matching
//!    variant.
//! 3. Capitalization of the first character.
//!
//! Cruft removal must run first because its trigger is anchored near the
//! start of the text.

use std::sync::LazyLock;

use regex::Regex;

/// Number of leading characters searched for a cruft phrase.
pub const CRUFT_SEARCH_WINDOW: usize = 100;

/// Trigger phrase and the bare verb that replaces everything up to it.
const CRUFT_PHRASES: [(&str, &str); 2] = [
    ("has been fined", "fined"),
    ("has been prosecuted", "prosecuted"),
];

/// A penalty amount directly after "fined"; it is shown separately.
static LEADING_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*£\d+(?:,\d+)*").expect("valid leading amount regex"));

/// Ordered long-name variants collapsed to a single short alias.
#[derive(Debug, Clone, PartialEq)]
pub struct AliasRule {
    variants: Vec<String>,
    alias: String,
}

impl AliasRule {
    pub fn new<I, S>(variants: I, alias: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            variants: variants.into_iter().map(Into::into).collect(),
            alias: alias.into(),
        }
    }

    /// Same variants, different target (e.g. a social-media handle).
    pub fn with_alias(&self, alias: impl Into<String>) -> Self {
        Self {
            variants: self.variants.clone(),
            alias: alias.into(),
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Replace the first occurrence of the first variant found in `text`.
    ///
    /// Variants are tried in order and at most one replacement is made. An
    /// alphabetic alias takes the case of the variant's first letter, so
    /// "The Information Commissioner" at a sentence start becomes "The ICO".
    pub fn apply(&self, text: &str) -> String {
        for variant in &self.variants {
            if let Some(pos) = text.find(variant.as_str()) {
                let alias = match_leading_case(variant, &self.alias);
                let mut out = String::with_capacity(text.len());
                out.push_str(&text[..pos]);
                out.push_str(&alias);
                out.push_str(&text[pos + variant.len()..]);
                return out;
            }
        }
        text.to_string()
    }
}

fn match_leading_case(variant: &str, alias: &str) -> String {
    let (Some(v), Some(a)) = (variant.chars().next(), alias.chars().next()) else {
        return alias.to_string();
    };
    if !a.is_alphabetic() || v.is_uppercase() == a.is_uppercase() {
        return alias.to_string();
    }
    let rest = &alias[a.len_utf8()..];
    if v.is_uppercase() {
        a.to_uppercase().chain(rest.chars()).collect()
    } else {
        a.to_lowercase().chain(rest.chars()).collect()
    }
}

/// The alias tables applied by the [`Summarizer`].
#[derive(Debug, Clone, PartialEq)]
pub struct Abbreviations {
    pub organisation: AliasRule,
    pub service: AliasRule,
    pub regulation: AliasRule,
}

impl Default for Abbreviations {
    fn default() -> Self {
        Self {
            organisation: AliasRule::new(
                [
                    "the Information Commissioner's Office (ICO)",
                    "the Information Commissioner’s Office (ICO)",
                    "The Information Commissioner's Office (ICO)",
                    "The Information Commissioner’s Office (ICO)",
                    "the Information Commissioner's Office",
                    "the Information Commissioner’s Office",
                    "The Information Commissioner's Office",
                    "The Information Commissioner’s Office",
                    "the Information Commissioner",
                    "The Information Commissioner",
                ],
                "the ICO",
            ),
            service: AliasRule::new(
                [
                    "Telephone Preference Service (TPS)",
                    "Telephone Preference Service",
                ],
                "TPS",
            ),
            regulation: AliasRule::new(
                [
                    "Privacy and Electronic Communications Regulations 2003 (PECR)",
                    "Privacy and Electronic Communications Regulations (PECR)",
                    "Privacy and Electronic Communications Regulations 2003",
                    "Privacy and Electronic Communications Regulations",
                ],
                "PECR",
            ),
        }
    }
}

/// Turns a full description into its abbreviated form.
#[derive(Debug, Clone, Default)]
pub struct Summarizer {
    abbreviations: Abbreviations,
}

impl Summarizer {
    pub fn new(abbreviations: Abbreviations) -> Self {
        Self { abbreviations }
    }

    pub fn summarize(&self, description: &str) -> String {
        let text = remove_cruft(description);
        let text = self.abbreviations.organisation.apply(&text);
        let text = self.abbreviations.service.apply(&text);
        let text = self.abbreviations.regulation.apply(&text);
        capitalize_first(&text)
    }
}

/// Strip the "<organisation> has been fined" lead-in.
pub fn remove_cruft(text: &str) -> String {
    let window_end = text
        .char_indices()
        .nth(CRUFT_SEARCH_WINDOW)
        .map_or(text.len(), |(i, _)| i);

    let found = CRUFT_PHRASES
        .iter()
        .filter_map(|&(phrase, verb)| {
            text.find(phrase)
                .filter(|&pos| pos < window_end)
                .map(|pos| (pos, phrase, verb))
        })
        .min_by_key(|&(pos, _, _)| pos);

    let Some((pos, phrase, verb)) = found else {
        return text.to_string();
    };

    let mut rest = &text[pos + phrase.len()..];
    if verb == "fined" {
        if let Some(m) = LEADING_AMOUNT.find(rest) {
            rest = &rest[m.end()..];
        }
    }
    format!("{verb}{rest}")
}

/// Uppercase the first character, leaving the rest untouched.
pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
