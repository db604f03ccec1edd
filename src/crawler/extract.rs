//! Detail page field extraction
//!
//! Each field has an ordered list of [`FieldRule`]s. The first rule that yields
//! non-empty text wins, which covers the layout variants the site serves for
//! the same kind of posting. A field no rule matches is an empty string.

use crate::crawler::frontier::FrontierEntry;
use crate::crawler::JobRecord;
use crate::url::{extract_posting_id, PostingId};
use crate::SourcetapError;
use chrono::Utc;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use url::Url;

/// Fields read from a detail page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Title,
    Company,
    Location,
    PostedDate,
    ExpiresDate,
    Salary,
    Description,
}

impl Field {
    pub fn all() -> [Field; 7] {
        [
            Self::Title,
            Self::Company,
            Self::Location,
            Self::PostedDate,
            Self::ExpiresDate,
            Self::Salary,
            Self::Description,
        ]
    }

    /// Description keeps its line structure; every other field is single-line
    fn collapses_whitespace(&self) -> bool {
        !matches!(self, Self::Description)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "title",
            Self::Company => "company",
            Self::Location => "location",
            Self::PostedDate => "posted_date",
            Self::ExpiresDate => "expires_date",
            Self::Salary => "salary",
            Self::Description => "description",
        };
        f.write_str(name)
    }
}

/// One way of locating a field's text on a page
#[derive(Debug, Clone)]
pub enum FieldRule {
    /// Concatenated text of every element matching `selector`
    Text { selector: Selector },

    /// In the first matching element containing `label`, the text after the
    /// label up to (not including) `terminator`
    LabeledText {
        selector: Selector,
        label: String,
        terminator: String,
    },

    /// In a matching element, the text of the first `child` element that
    /// follows a text node containing `label`
    LabeledChild {
        selector: Selector,
        label: String,
        child: Selector,
    },

    /// Inside a matching container, the `dd` text of the pair whose `dt`
    /// mentions `label`
    DefinitionPair {
        container: Selector,
        term: Selector,
        definition: Selector,
        label: String,
    },
}

fn parse_selector(css: &str) -> Result<Selector, SourcetapError> {
    Selector::parse(css).map_err(|e| SourcetapError::InvalidSelector {
        selector: css.to_string(),
        message: format!("{:?}", e),
    })
}

impl FieldRule {
    pub fn text(css: &str) -> Result<Self, SourcetapError> {
        Ok(Self::Text {
            selector: parse_selector(css)?,
        })
    }

    pub fn labeled_text(css: &str, label: &str, terminator: &str) -> Result<Self, SourcetapError> {
        Ok(Self::LabeledText {
            selector: parse_selector(css)?,
            label: label.to_string(),
            terminator: terminator.to_string(),
        })
    }

    pub fn labeled_child(css: &str, label: &str, child_css: &str) -> Result<Self, SourcetapError> {
        Ok(Self::LabeledChild {
            selector: parse_selector(css)?,
            label: label.to_string(),
            child: parse_selector(child_css)?,
        })
    }

    pub fn definition(container_css: &str, label: &str) -> Result<Self, SourcetapError> {
        Ok(Self::DefinitionPair {
            container: parse_selector(container_css)?,
            term: parse_selector("dt")?,
            definition: parse_selector("dd")?,
            label: label.to_string(),
        })
    }

    /// Applies the rule; None when nothing non-empty was found
    pub fn apply(&self, document: &Html) -> Option<String> {
        let found = match self {
            Self::Text { selector } => {
                let text: String = document.select(selector).map(element_text).collect();
                Some(text)
            }
            Self::LabeledText {
                selector,
                label,
                terminator,
            } => document
                .select(selector)
                .map(element_text)
                .find(|text| text.contains(label.as_str()))
                .and_then(|text| text_between(&text, label, terminator)),
            Self::LabeledChild {
                selector,
                label,
                child,
            } => document
                .select(selector)
                .find_map(|element| labeled_child_text(element, label, child)),
            Self::DefinitionPair {
                container,
                term,
                definition,
                label,
            } => document.select(container).find_map(|element| {
                let term_text: String = element.select(term).map(element_text).collect();
                if !term_text.contains(label.as_str()) {
                    return None;
                }
                let value: String = element.select(definition).map(element_text).collect();
                Some(value)
            }),
        };

        found
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
    }
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect()
}

/// `label` then `.+?` then `terminator`, trimmed
fn text_between(text: &str, label: &str, terminator: &str) -> Option<String> {
    let start = text.find(label)? + label.len();
    let after = text[start..].trim_start();
    let first_len = after.chars().next()?.len_utf8();
    let end = after[first_len..].find(terminator)? + first_len;
    let value = after[..end].trim();
    (!value.is_empty()).then(|| value.to_string())
}

fn labeled_child_text(element: ElementRef<'_>, label: &str, child: &Selector) -> Option<String> {
    let mut seen_label = false;
    for node in element.children() {
        if let Some(text) = node.value().as_text() {
            if text.contains(label) {
                seen_label = true;
            }
            continue;
        }
        if !seen_label {
            continue;
        }
        if let Some(candidate) = ElementRef::wrap(node) {
            if child.matches(&candidate) {
                return Some(element_text(candidate));
            }
        }
    }
    None
}

/// Ordered fallback rules for every field
#[derive(Debug, Clone, Default)]
pub struct ExtractionRules {
    fields: Vec<(Field, Vec<FieldRule>)>,
}

impl ExtractionRules {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `rules` to the fallback list of `field`
    pub fn with_rules(mut self, field: Field, rules: Vec<FieldRule>) -> Self {
        match self.fields.iter_mut().find(|(f, _)| *f == field) {
            Some((_, existing)) => existing.extend(rules),
            None => self.fields.push((field, rules)),
        }
        self
    }

    /// Rules for the layouts served by seeker.worksourcewa.com
    pub fn worksource() -> Result<Self, SourcetapError> {
        Ok(Self::new()
            .with_rules(
                Field::Title,
                vec![
                    FieldRule::text("h1.margin-bottom")?,
                    FieldRule::text("h1.job-view-header")?,
                ],
            )
            .with_rules(
                Field::Company,
                vec![
                    FieldRule::text("h4 .capital-letter")?,
                    FieldRule::text("span.job-view-employer")?,
                ],
            )
            .with_rules(
                Field::Location,
                vec![
                    FieldRule::text("h4 small.wrappable")?,
                    FieldRule::text("span.job-view-location")?,
                ],
            )
            .with_rules(
                Field::PostedDate,
                vec![
                    FieldRule::labeled_text("p", "Posted:", "-")?,
                    FieldRule::text("span.job-view-posting-date")?,
                ],
            )
            .with_rules(
                Field::ExpiresDate,
                vec![FieldRule::labeled_child(
                    "p, span, div, li, td",
                    "Expires:",
                    "strong",
                )?],
            )
            .with_rules(
                Field::Salary,
                vec![
                    FieldRule::text("p.job-view-salary")?,
                    FieldRule::definition("dl span", "Salary")?,
                ],
            )
            .with_rules(
                Field::Description,
                vec![
                    FieldRule::text("span#TrackingJobBody")?,
                    FieldRule::text("div.JobViewJobBody")?,
                    FieldRule::text("div.job-view-description")?,
                    FieldRule::text("div.directJobBody")?,
                    FieldRule::text("#jobViewFrame")?,
                ],
            ))
    }

    pub fn rules_for(&self, field: Field) -> &[FieldRule] {
        self.fields
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, rules)| rules.as_slice())
            .unwrap_or(&[])
    }

    /// First non-empty match for `field`, or an empty string
    pub fn extract(&self, document: &Html, field: Field) -> String {
        let value = self
            .rules_for(field)
            .iter()
            .find_map(|rule| rule.apply(document))
            .unwrap_or_default();

        if field.collapses_whitespace() {
            value.split_whitespace().collect::<Vec<_>>().join(" ")
        } else {
            value
        }
    }
}

/// Builds a [`JobRecord`] from a fetched detail page
///
/// The canonical posting id is the one in `final_url`; when that URL carries
/// no id the listing id from `entry` is used.
pub fn parse_detail(
    body: &str,
    final_url: &Url,
    entry: &FrontierEntry,
    rules: &ExtractionRules,
) -> JobRecord {
    let document = Html::parse_document(body);
    let posting_id: PostingId =
        extract_posting_id(final_url.as_str()).unwrap_or_else(|| entry.posting_id.clone());

    let record = JobRecord {
        posting_id,
        title: rules.extract(&document, Field::Title),
        company: rules.extract(&document, Field::Company),
        location: rules.extract(&document, Field::Location),
        posted_date: rules.extract(&document, Field::PostedDate),
        expires_date: rules.extract(&document, Field::ExpiresDate),
        salary: rules.extract(&document, Field::Salary),
        url: final_url.to_string(),
        description: rules.extract(&document, Field::Description),
        discovered_on_page: entry.discovered_on_page,
        scraped_at: Utc::now(),
    };

    let missing: Vec<String> = Field::all()
        .iter()
        .filter(|field| field_value(&record, **field).is_empty())
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        tracing::debug!(
            "Posting {} has no match for: {}",
            record.posting_id,
            missing.join(", ")
        );
    }

    record
}

fn field_value(record: &JobRecord, field: Field) -> &str {
    match field {
        Field::Title => &record.title,
        Field::Company => &record.company,
        Field::Location => &record.location,
        Field::PostedDate => &record.posted_date,
        Field::ExpiresDate => &record.expires_date,
        Field::Salary => &record.salary,
        Field::Description => &record.description,
    }
}
