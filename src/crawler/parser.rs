//! Result page parser
//!
//! Converts one fetched result page into structured records by pairing five
//! structurally-located field groups index by index. Parsing is pure: the
//! same page content and expected count always yield the same records.

use crate::config::SelectorConfig;
use crate::corpus::Record;
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

/// Parser construction errors
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid selector for {field}: '{selector}'")]
    Selector {
        field: &'static str,
        selector: String,
    },
}

/// A disagreement between the page's reported count and the entries the
/// parser could structurally locate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMismatch {
    /// The count the page banner reported
    pub expected: u64,
    /// How many elements each field group actually matched, in record field order
    pub located: [usize; 5],
}

/// Outcome of parsing one result page
#[derive(Debug, Clone)]
pub struct ParsedResults {
    /// Best-effort records, paired index by index across the field groups
    pub records: Vec<Record>,
    /// Present when any field group disagreed with the expected count
    pub mismatch: Option<ShapeMismatch>,
}

/// Extracts records from result pages using the configured field selectors
pub struct ResultParser {
    name: Selector,
    address: Selector,
    status: Selector,
    registration_date: Selector,
    entity_type: Selector,
}

impl ResultParser {
    /// Compiles the configured field selectors
    pub fn new(selectors: &SelectorConfig) -> Result<Self, ParseError> {
        let compile = |field: &'static str, source: &str| {
            Selector::parse(source).map_err(|_| ParseError::Selector {
                field,
                selector: source.to_string(),
            })
        };

        Ok(Self {
            name: compile("name", &selectors.name)?,
            address: compile("address", &selectors.address)?,
            status: compile("status", &selectors.status)?,
            registration_date: compile("registration-date", &selectors.registration_date)?,
            entity_type: compile("entity-type", &selectors.entity_type)?,
        })
    }

    /// Parses one result page expecting `expected` records
    ///
    /// Any disagreement between `expected` and the structurally located
    /// entries is reported through `mismatch` rather than silently truncated;
    /// the records themselves are the best-effort pairing up to the shortest
    /// field group.
    pub fn parse(&self, page_content: &str, expected: u64) -> ParsedResults {
        let document = Html::parse_document(page_content);

        let names = collect_texts(&document, &self.name);
        let addresses = collect_texts(&document, &self.address);
        let statuses = collect_texts(&document, &self.status);
        let dates = collect_texts(&document, &self.registration_date);
        let types = collect_texts(&document, &self.entity_type);

        let located = [
            names.len(),
            addresses.len(),
            statuses.len(),
            dates.len(),
            types.len(),
        ];

        let expected_len = usize::try_from(expected).unwrap_or(usize::MAX);
        let mismatch = if located.iter().any(|&len| len != expected_len) {
            Some(ShapeMismatch { expected, located })
        } else {
            None
        };

        let usable = located.iter().copied().min().unwrap_or(0).min(expected_len);

        let mut records = Vec::with_capacity(usable);
        for i in 0..usable {
            records.push(Record {
                name: names[i].clone(),
                // The address group renders across multiple lines on the page
                address: addresses[i].replace('\n', ""),
                status: statuses[i].clone(),
                registration_date: dates[i].clone(),
                entity_type: types[i].clone(),
            });
        }

        ParsedResults { records, mismatch }
    }
}

/// Collects the trimmed text of every element a selector matches, in document order
fn collect_texts(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .map(|element: ElementRef| element.text().collect::<String>().trim().to_string())
        .collect()
}
