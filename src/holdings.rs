//! KBART holdings file reader.
//!
//! KBART files are tab-separated with a header row naming the columns.
//! Rows are decoded one at a time as the caller iterates.

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Columns defined by the KBART recommended practice
#[cfg(test)]
pub(crate) const KBART_FIELDS: &[&str] = &[
    "publication_title",
    "print_identifier",
    "online_identifier",
    "date_first_issue_online",
    "num_first_vol_online",
    "num_first_issue_online",
    "date_last_issue_online",
    "num_last_vol_online",
    "num_last_issue_online",
    "title_url",
    "first_author",
    "title_id",
    "embargo_info",
    "coverage_depth",
    "coverage_notes",
    "publisher_name",
    "publication_type",
    "date_monograph_published_print",
    "date_monograph_published_online",
    "monograph_volume",
    "monograph_edition",
    "first_editor",
    "parent_publication_title_id",
    "preceding_publication_title_id",
    "access_type",
];

/// Columns ingestion cannot do without
pub const REQUIRED_FIELDS: &[&str] = &[
    "publication_title",
    "print_identifier",
    "online_identifier",
    "title_id",
    "publisher_name",
];

/// One holdings row
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HoldingsRow {
    pub publication_title: String,
    pub print_identifier: String,
    pub online_identifier: String,
    pub title_url: String,
    pub first_author: String,
    pub title_id: String,
    pub publisher_name: String,
    pub date_monograph_published_online: String,
    pub first_editor: String,
    pub parent_publication_title_id: String,
}

impl HoldingsRow {
    /// Empty cells are absent values
    pub fn field(value: &str) -> Option<String> {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

/// Reader over a KBART file
pub struct HoldingsReader {
    path: PathBuf,
    reader: csv::Reader<File>,
}

impl HoldingsReader {
    /// Open a holdings file
    pub fn open(path: &Path) -> Result<Self> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .quoting(false)
            .flexible(true)
            .trim(csv::Trim::Headers)
            .from_path(path)
            .with_context(|| format!("Failed to open holdings file: {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            reader,
        })
    }

    /// Required columns absent from the header row
    pub fn missing_columns(&mut self) -> Result<Vec<&'static str>> {
        let headers = self
            .reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", self.path.display()))?;

        Ok(REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|field| !headers.iter().any(|h| h == *field))
            .collect())
    }

    /// Rows in file order; a row that cannot be decoded yields an error
    /// without ending the sequence. Rows shorter than the header are
    /// padded with empty cells.
    pub fn rows(mut self) -> Result<impl Iterator<Item = Result<HoldingsRow>>> {
        let headers = self
            .reader
            .headers()
            .with_context(|| format!("Failed to read header of {}", self.path.display()))?
            .clone();

        Ok(self.reader.into_records().map(move |record| {
            let mut record = record.context("Failed to read holdings row")?;
            while record.len() < headers.len() {
                record.push_field("");
            }
            record
                .deserialize::<HoldingsRow>(Some(&headers))
                .context("Failed to decode holdings row")
        }))
    }
}
