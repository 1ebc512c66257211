//! Field extraction from enforcement detail pages.
//!
//! Each extractor handles one field and owns its absence/ambiguity policy:
//! the PDF link and description are strict (errors abort the run), the rest
//! degrade to `None` with a warning.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::AppError;
use crate::models::{ActionType, EnforcementRecord};
use crate::site::Site;
use crate::summarize::Summarizer;

static PDF_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="resultlist"] a[href*="/media/action-weve-taken"][href*=".pdf"]"#)
        .expect("valid pdf link selector")
});
static HEADING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("valid heading selector"));
static CONTENT_PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div[class*="article-content"] > p"#).expect("valid paragraph selector")
});
static DEFINITION_TERM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("dt").expect("valid dt selector"));

static PDF_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(\d+)/").expect("valid pdf id regex"));
static ACTION_SLUG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/action-weve-taken/(.+?)/").expect("valid action slug regex"));
static PENALTY_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"£\d+(?:,\d+)*").expect("valid penalty amount regex"));

/// Date format on detail pages, e.g. "21 December 2017".
const DATE_FORMAT: &str = "%d %B %Y";

/// Composes the field extractors into one record per detail page.
#[derive(Debug, Clone, Default)]
pub struct RecordBuilder {
    site: Site,
    summarizer: Summarizer,
}

impl RecordBuilder {
    pub fn new(site: Site, summarizer: Summarizer) -> Self {
        Self { site, summarizer }
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    /// Build the record for the detail page at `url` from its HTML.
    ///
    /// Fails with [`AppError::ExtractionAmbiguity`] on more than one PDF link
    /// and with [`AppError::ExtractionError`] when there is no description.
    pub fn build(&self, url: &str, html: &str) -> Result<EnforcementRecord, AppError> {
        let document = Html::parse_document(html);

        let pdf_url = extract_pdf_url(&document, url, &self.site)?;
        let description = extract_description(&document, url)?;
        let abbreviated_description = self.summarizer.summarize(&description);
        let penalty_amount = extract_penalty_amount(&description, url);

        Ok(EnforcementRecord {
            url: url.to_string(),
            pdf_id: extract_pdf_id(pdf_url.as_deref()),
            action_type: extract_action_type(pdf_url.as_deref()),
            pdf_url,
            date: extract_date(&document, url),
            title: extract_title(&document, url),
            description,
            abbreviated_description,
            penalty_amount,
            tweet_sent: false,
        })
    }
}

/// The single PDF linked from the results region, made absolute.
pub fn extract_pdf_url(
    document: &Html,
    url: &str,
    site: &Site,
) -> Result<Option<String>, AppError> {
    let hrefs: Vec<&str> = document
        .select(&PDF_LINK)
        .filter_map(|a| a.value().attr("href"))
        .collect();

    match hrefs.as_slice() {
        [] => {
            tracing::info!(%url, "No PDF found on page");
            Ok(None)
        }
        [href] => Ok(Some(site.expand_href(href))),
        many => Err(AppError::ExtractionAmbiguity {
            url: url.to_string(),
            field: "pdf link",
            count: many.len(),
        }),
    }
}

/// First slash-delimited run of digits in the PDF link.
pub fn extract_pdf_id(pdf_url: Option<&str>) -> Option<String> {
    let caps = PDF_ID.captures(pdf_url?)?;
    Some(caps[1].to_string())
}

pub fn extract_action_type(pdf_url: Option<&str>) -> Option<ActionType> {
    let caps = ACTION_SLUG.captures(pdf_url?)?;
    ActionType::from_slug(&caps[1])
}

/// Text of the page's only `h1`.
pub fn extract_title(document: &Html, url: &str) -> Option<String> {
    let headings: Vec<ElementRef<'_>> = document.select(&HEADING).collect();
    match headings.as_slice() {
        [h1] => Some(element_text(h1)),
        other => {
            tracing::warn!(%url, count = other.len(), "Title missing or ambiguous");
            None
        }
    }
}

/// First paragraph of the article content.
pub fn extract_description(document: &Html, url: &str) -> Result<String, AppError> {
    document
        .select(&CONTENT_PARAGRAPH)
        .next()
        .map(|p| element_text(&p))
        .ok_or_else(|| AppError::ExtractionError {
            url: url.to_string(),
            message: "no paragraph in article content".to_string(),
        })
}

/// Value of the `dd` following the page's single "Date" term.
pub fn extract_date(document: &Html, url: &str) -> Option<NaiveDate> {
    let values: Vec<String> = document
        .select(&DEFINITION_TERM)
        .filter(|dt| dt.text().any(|t| t.contains("Date")))
        .filter_map(|dt| {
            dt.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name() == "dd")
        })
        .map(|dd| element_text(&dd))
        .collect();

    let [value] = values.as_slice() else {
        tracing::warn!(%url, count = values.len(), "Date missing or ambiguous");
        return None;
    };

    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!(%url, value = %value, error = %e, "Unparseable date");
            None
        }
    }
}

/// The description's only `£` amount, verbatim.
pub fn extract_penalty_amount(description: &str, url: &str) -> Option<String> {
    let amounts: Vec<&str> = PENALTY_AMOUNT
        .find_iter(description)
        .map(|m| m.as_str())
        .collect();

    match amounts.as_slice() {
        [amount] => Some(amount.to_string()),
        [] => None,
        many => {
            tracing::warn!(%url, candidates = ?many, "Multiple penalty amounts, leaving unset");
            None
        }
    }
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
