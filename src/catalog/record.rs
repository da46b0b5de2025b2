//! Springer metadata API response types.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// One page of an API response
#[derive(Debug, Clone, Deserialize)]
pub struct RecordPage {
    /// Result counters (the API returns a one-element list)
    #[serde(default)]
    pub result: Vec<ResultSummary>,

    /// Records on this page
    #[serde(default)]
    pub records: Vec<CatalogRecord>,
}

impl RecordPage {
    /// Total number of records matching the query
    pub fn total(&self) -> usize {
        self.result.first().map(|r| r.total).unwrap_or(0)
    }
}

/// Counters describing the position of a page within the result set.
///
/// The API reports these as strings; numbers are accepted too.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSummary {
    #[serde(default, deserialize_with = "count")]
    pub total: usize,
    #[serde(default, deserialize_with = "count")]
    pub start: usize,
    #[serde(default, deserialize_with = "count")]
    pub page_length: usize,
    #[serde(default, deserialize_with = "count")]
    pub records_displayed: usize,
}

/// A single book record
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogRecord {
    /// Prefixed identifier, e.g. `doi:10.1007/978-1-349-11550-1`
    #[serde(default)]
    pub identifier: String,
    pub title: Option<String>,
    pub doi: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<Value>,
    pub publication_date: Option<String>,
    pub publisher: Option<String>,
    pub print_isbn: Option<String>,
    pub electronic_isbn: Option<String>,
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub creators: Vec<Creator>,
    #[serde(default)]
    pub book_editors: Vec<BookEditor>,
    #[serde(default)]
    pub url: Vec<UrlEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Creator {
    pub creator: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookEditor {
    #[serde(rename = "bookEditor")]
    pub book_editor: String,
}

/// A content URL; only entries with a `format` are downloadable files
#[derive(Debug, Clone, Deserialize)]
pub struct UrlEntry {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub platform: String,
    pub value: String,
}

impl CatalogRecord {
    /// Bare DOI of this record, without the `doi:` prefix
    pub fn doi(&self) -> Option<String> {
        self.doi
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                self.identifier
                    .strip_prefix("doi:")
                    .map(|s| s.to_string())
            })
            .filter(|s| !s.is_empty())
    }

    /// Abstract text; structured abstracts contribute their paragraph
    pub fn description(&self) -> Option<String> {
        match self.abstract_text.as_ref()? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Object(map) => match map.get("p") {
                Some(Value::String(p)) => Some(p.clone()),
                Some(Value::Array(parts)) => {
                    let text: Vec<&str> = parts.iter().filter_map(Value::as_str).collect();
                    (!text.is_empty()).then(|| text.join("\n"))
                }
                _ => None,
            },
            _ => None,
        }
    }
}

/// Normalized metadata extracted from a record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookMetadata {
    pub language: Option<String>,
    pub description: Option<String>,
    pub publication_date: Option<String>,
    pub subjects: Vec<String>,
    /// Creators joined by `|`
    pub authors: Option<String>,
    /// Book editors joined by `|`
    pub editors: Option<String>,
    /// `(format, href)` pairs
    pub links: Vec<(String, String)>,
}

impl BookMetadata {
    pub fn from_record(record: &CatalogRecord) -> Self {
        Self {
            language: record.language.clone(),
            description: record.description(),
            publication_date: record.publication_date.clone(),
            subjects: record.subjects.clone(),
            authors: join_contributors(record.creators.iter().map(|c| c.creator.as_str())),
            editors: join_contributors(
                record.book_editors.iter().map(|e| e.book_editor.as_str()),
            ),
            links: record
                .url
                .iter()
                .filter(|u| !u.format.is_empty())
                .map(|u| (u.format.clone(), u.value.clone()))
                .collect(),
        }
    }
}

fn join_contributors<'a>(names: impl Iterator<Item = &'a str>) -> Option<String> {
    let joined = names.collect::<Vec<_>>().join("|");
    (!joined.is_empty()).then_some(joined)
}

fn count<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(usize),
        Text(String),
    }

    match Count::deserialize(deserializer)? {
        Count::Number(n) => Ok(n),
        Count::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
