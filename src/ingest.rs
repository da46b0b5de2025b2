//! Catalog ingestion.
//!
//! Books come either from a KBART holdings file (each row enriched with a
//! catalog lookup) or from a date query against the catalog. Books already
//! in the store are skipped. A record that cannot be ingested is logged
//! and counted; the run carries on with the next one.

use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use tracing::{debug, info, instrument, warn};

use crate::catalog::{BookMetadata, CatalogError, CatalogRecord, CatalogSource};
use crate::domain::Book;
use crate::holdings::{HoldingsReader, HoldingsRow};
use crate::store::BookStore;

/// Source tag attached to subjects taken from the catalog
pub const SUBJECT_SOURCE: &str = "springer";

/// Tally of one ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Books written to the store
    pub saved: usize,
    /// Books skipped because they were already stored
    pub existing: usize,
    /// Identifiers the catalog had no record for
    pub not_found: usize,
    /// Records skipped because of any other error
    pub failed: usize,
}

impl IngestReport {
    /// Records looked at
    pub fn seen(&self) -> usize {
        self.saved + self.existing + self.not_found + self.failed
    }

    fn tally(&mut self, id: &str, outcome: Result<Outcome>) {
        match outcome {
            Ok(Outcome::Saved) => self.saved += 1,
            Ok(Outcome::Existing) => {
                debug!(book_id = %id, "Book already stored, skipping");
                self.existing += 1;
            }
            Err(e) if is_not_found(&e) => {
                warn!(book_id = %id, "No catalog record, skipping");
                self.not_found += 1;
            }
            Err(e) => {
                let error = format!("{:#}", e);
                warn!(book_id = %id, %error, "Failed to ingest book, skipping");
                self.failed += 1;
            }
        }
    }
}

enum Outcome {
    Saved,
    Existing,
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<CatalogError>()
        .is_some_and(CatalogError::is_not_found)
}

/// Feeds catalog records into the store
pub struct Ingestor<'a, S> {
    store: &'a BookStore,
    source: &'a S,
}

impl<'a, S: CatalogSource> Ingestor<'a, S> {
    /// Create a new ingestor
    pub fn new(store: &'a BookStore, source: &'a S) -> Self {
        Self { store, source }
    }

    /// Ingest every row of a KBART holdings file
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn ingest_holdings(&self, path: &Path) -> Result<IngestReport> {
        let mut reader = HoldingsReader::open(path)?;
        let missing = reader.missing_columns()?;
        if !missing.is_empty() {
            bail!(
                "Holdings file {} is missing required columns: {}",
                path.display(),
                missing.join(", ")
            );
        }

        let mut report = IngestReport::default();
        for (index, row) in reader.rows()?.enumerate() {
            let line = index + 2;
            let row = match row {
                Ok(row) => row,
                Err(e) => {
                    let error = format!("{:#}", e);
                    warn!(line, %error, "Unreadable holdings row, skipping");
                    report.failed += 1;
                    continue;
                }
            };
            let Some(book_id) = HoldingsRow::field(&row.title_id) else {
                warn!(line, "Holdings row has no title_id, skipping");
                report.failed += 1;
                continue;
            };

            let outcome = self.ingest_row(&book_id, &row).await;
            report.tally(&book_id, outcome);
        }

        info!(
            saved = report.saved,
            existing = report.existing,
            not_found = report.not_found,
            failed = report.failed,
            "Holdings ingestion finished"
        );
        Ok(report)
    }

    /// Ingest every record published online on or after `since`
    #[instrument(skip(self))]
    pub async fn ingest_since(&self, since: NaiveDate) -> Result<IngestReport> {
        let mut pager = self.source.fetch_since(since);
        let mut report = IngestReport::default();

        while let Some(record) = pager
            .next_record()
            .await
            .with_context(|| format!("Catalog query failed: {}", pager.query()))?
        {
            let Some(book_id) = record.doi() else {
                warn!(identifier = %record.identifier, "Catalog record has no DOI, skipping");
                report.failed += 1;
                continue;
            };

            let outcome = self.ingest_record(&book_id, &record);
            report.tally(&book_id, outcome);
        }

        info!(
            saved = report.saved,
            existing = report.existing,
            failed = report.failed,
            "Catalog ingestion finished"
        );
        Ok(report)
    }

    async fn ingest_row(&self, book_id: &str, row: &HoldingsRow) -> Result<Outcome> {
        if self.store.contains(book_id)? {
            return Ok(Outcome::Existing);
        }

        let record = self.source.fetch_by_identifier(book_id).await?;
        let book = book_from_holdings(book_id, row, &BookMetadata::from_record(&record));
        self.store.save(&book)?;
        Ok(Outcome::Saved)
    }

    fn ingest_record(&self, book_id: &str, record: &CatalogRecord) -> Result<Outcome> {
        if self.store.contains(book_id)? {
            return Ok(Outcome::Existing);
        }

        let book = book_from_record(book_id, record)?;
        self.store.save(&book)?;
        Ok(Outcome::Saved)
    }
}

/// Holdings columns take precedence; the catalog fills in the rest
pub fn book_from_holdings(book_id: &str, row: &HoldingsRow, metadata: &BookMetadata) -> Book {
    let mut book = Book::new(book_id, row.publication_title.trim());
    book.print_isbn = HoldingsRow::field(&row.print_identifier);
    book.ebook_isbn = HoldingsRow::field(&row.online_identifier);
    book.publisher = HoldingsRow::field(&row.publisher_name);
    book.series_id = HoldingsRow::field(&row.parent_publication_title_id);
    book.published = metadata
        .publication_date
        .clone()
        .or_else(|| HoldingsRow::field(&row.date_monograph_published_online));
    book.authors = metadata
        .authors
        .clone()
        .or_else(|| HoldingsRow::field(&row.first_author));
    book.editors = metadata
        .editors
        .clone()
        .or_else(|| HoldingsRow::field(&row.first_editor));
    apply_metadata(book, metadata)
}

/// Book built from a catalog record alone
pub fn book_from_record(book_id: &str, record: &CatalogRecord) -> Result<Book> {
    let title = record
        .title
        .as_deref()
        .filter(|t| !t.is_empty())
        .with_context(|| format!("Catalog record {} has no title", book_id))?;

    let metadata = BookMetadata::from_record(record);
    let mut book = Book::new(book_id, title);
    book.print_isbn = record.print_isbn.clone();
    book.ebook_isbn = record.electronic_isbn.clone();
    book.publisher = record.publisher.clone();
    book.published = metadata.publication_date.clone();
    book.authors = metadata.authors.clone();
    book.editors = metadata.editors.clone();
    Ok(apply_metadata(book, &metadata))
}

fn apply_metadata(mut book: Book, metadata: &BookMetadata) -> Book {
    book.language = metadata.language.clone();
    book.description = metadata.description.clone();
    for (format, href) in &metadata.links {
        book = book.with_link(format.as_str(), href.as_str());
    }
    for subject in &metadata.subjects {
        book = book.with_subject(subject.as_str(), SUBJECT_SOURCE);
    }
    book
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::record::{BookEditor, Creator, UrlEntry};
    use crate::catalog::{RecordPage, ResultSummary};
    use crate::holdings::KBART_FIELDS;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Catalog fixture keyed by bare DOI
    #[derive(Default)]
    struct FakeCatalog {
        records: HashMap<String, CatalogRecord>,
        broken: Vec<String>,
        lookups: Mutex<Vec<String>>,
    }

    impl FakeCatalog {
        fn with(mut self, record: CatalogRecord) -> Self {
            let doi = record.doi().unwrap();
            self.records.insert(doi, record);
            self
        }
    }

    #[async_trait]
    impl CatalogSource for FakeCatalog {
        async fn fetch_by_identifier(&self, id: &str) -> Result<CatalogRecord, CatalogError> {
            self.lookups.lock().unwrap().push(id.to_string());
            if self.broken.iter().any(|b| b == id) {
                return Err(CatalogError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            self.records
                .get(id)
                .cloned()
                .ok_or_else(|| CatalogError::NotFound(id.to_string()))
        }

        async fn fetch_page(&self, _query: &str, start: usize) -> Result<RecordPage, CatalogError> {
            let mut all: Vec<CatalogRecord> = self.records.values().cloned().collect();
            all.sort_by(|a, b| a.identifier.cmp(&b.identifier));
            let records: Vec<CatalogRecord> = all.into_iter().skip(start - 1).take(2).collect();
            Ok(RecordPage {
                result: vec![ResultSummary {
                    total: self.records.len(),
                    start,
                    page_length: 2,
                    records_displayed: records.len(),
                }],
                records,
            })
        }
    }

    fn record(doi: &str, title: &str) -> CatalogRecord {
        CatalogRecord {
            identifier: format!("doi:{}", doi),
            title: Some(title.to_string()),
            language: Some("en".to_string()),
            electronic_isbn: Some("978-3-000-00000-0".to_string()),
            subjects: vec!["Physics".to_string(), "Optics".to_string()],
            creators: vec![
                Creator {
                    creator: "Fultz, Brent".to_string(),
                },
                Creator {
                    creator: "Howe, James".to_string(),
                },
            ],
            book_editors: vec![BookEditor {
                book_editor: "Smith, Ann".to_string(),
            }],
            url: vec![
                UrlEntry {
                    format: "pdf".to_string(),
                    platform: String::new(),
                    value: format!("http://link.springer.com/content/pdf/{}.pdf", doi),
                },
                UrlEntry {
                    format: String::new(),
                    platform: "web".to_string(),
                    value: format!("http://link.springer.com/{}", doi),
                },
            ],
            ..Default::default()
        }
    }

    fn kbart_row(title: &str, title_id: &str) -> String {
        KBART_FIELDS
            .iter()
            .map(|field| match *field {
                "publication_title" => title.to_string(),
                "print_identifier" => "978-0-000-00000-1".to_string(),
                "online_identifier" => "978-0-000-00000-2".to_string(),
                "title_id" => title_id.to_string(),
                "publisher_name" => "Springer".to_string(),
                "parent_publication_title_id" => "series-7".to_string(),
                _ => String::new(),
            })
            .collect::<Vec<_>>()
            .join("\t")
    }

    fn write_kbart(dir: &TempDir, rows: &[String]) -> std::path::PathBuf {
        let path = dir.path().join("holdings.txt");
        let mut content = KBART_FIELDS.join("\t");
        for row in rows {
            content.push('\n');
            content.push_str(row);
        }
        content.push('\n');
        std::fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_ingest_holdings_saves_enriched_book() {
        let temp = TempDir::new().unwrap();
        let path = write_kbart(&temp, &[kbart_row("Microscopy", "10.1007/a")]);
        let store = BookStore::open_in_memory().unwrap();
        let catalog = FakeCatalog::default().with(record("10.1007/a", "Ignored Title"));

        let report = Ingestor::new(&store, &catalog)
            .ingest_holdings(&path)
            .await
            .unwrap();
        assert_eq!(report.saved, 1);

        let book = store.get_book("10.1007/a").unwrap().unwrap();
        assert_eq!(book.title, "Microscopy");
        assert_eq!(book.ebook_isbn.as_deref(), Some("978-0-000-00000-2"));
        assert_eq!(book.series_id.as_deref(), Some("series-7"));
        assert_eq!(book.language.as_deref(), Some("en"));
        assert_eq!(book.authors.as_deref(), Some("Fultz, Brent|Howe, James"));
        assert_eq!(book.editors.as_deref(), Some("Smith, Ann"));
        assert_eq!(book.links.len(), 1);
        assert_eq!(book.links[0].pub_type, "pdf");

        let subjects: Vec<(&str, &str)> = book
            .subjects
            .iter()
            .map(|s| (s.subject.as_str(), s.source.as_str()))
            .collect();
        assert_eq!(subjects, vec![("Physics", "springer"), ("Optics", "springer")]);
    }

    #[tokio::test]
    async fn test_ingest_holdings_skips_existing_and_continues() {
        let temp = TempDir::new().unwrap();
        let path = write_kbart(
            &temp,
            &[
                kbart_row("Stored", "10.1007/stored"),
                kbart_row("Unknown", "10.1007/unknown"),
                kbart_row("Broken", "10.1007/broken"),
                kbart_row("New", "10.1007/new"),
            ],
        );
        let store = BookStore::open_in_memory().unwrap();
        store.save(&Book::new("10.1007/stored", "Stored")).unwrap();

        let mut catalog = FakeCatalog::default().with(record("10.1007/new", "New"));
        catalog.broken.push("10.1007/broken".to_string());

        let report = Ingestor::new(&store, &catalog)
            .ingest_holdings(&path)
            .await
            .unwrap();
        assert_eq!(
            report,
            IngestReport {
                saved: 1,
                existing: 1,
                not_found: 1,
                failed: 1,
            }
        );
        assert_eq!(report.seen(), 4);

        // Stored books are never looked up
        let lookups = catalog.lookups.lock().unwrap().clone();
        assert!(!lookups.contains(&"10.1007/stored".to_string()));
        assert!(store.contains("10.1007/new").unwrap());
        assert!(!store.contains("10.1007/unknown").unwrap());
    }

    #[tokio::test]
    async fn test_ingest_holdings_rejects_missing_columns() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("holdings.txt");
        std::fs::write(&path, "publication_title\nA\n").unwrap();
        let store = BookStore::open_in_memory().unwrap();
        let catalog = FakeCatalog::default();

        let err = Ingestor::new(&store, &catalog)
            .ingest_holdings(&path)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("title_id"));
    }

    #[tokio::test]
    async fn test_ingest_since_pages_through_catalog() {
        let store = BookStore::open_in_memory().unwrap();
        store.save(&Book::new("10.1007/b", "Already here")).unwrap();

        let catalog = FakeCatalog::default()
            .with(record("10.1007/a", "A"))
            .with(record("10.1007/b", "B"))
            .with(record("10.1007/c", "C"));

        let since = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let report = Ingestor::new(&store, &catalog)
            .ingest_since(since)
            .await
            .unwrap();

        assert_eq!(report.saved, 2);
        assert_eq!(report.existing, 1);
        assert_eq!(store.count_books().unwrap(), 3);

        let book = store.get_book("10.1007/c").unwrap().unwrap();
        assert_eq!(book.title, "C");
        assert_eq!(book.ebook_isbn.as_deref(), Some("978-3-000-00000-0"));
        assert_eq!(book.editors.as_deref(), Some("Smith, Ann"));
    }

    #[test]
    fn test_book_from_record_requires_title() {
        let mut untitled = record("10.1007/x", "");
        untitled.title = None;
        assert!(book_from_record("10.1007/x", &untitled).is_err());
    }

    #[test]
    fn test_holdings_contributors_fall_back_to_row() {
        let row = HoldingsRow {
            publication_title: "Optics".to_string(),
            first_author: "Born".to_string(),
            first_editor: "Wolf".to_string(),
            ..Default::default()
        };
        let book = book_from_holdings("10.1/o", &row, &BookMetadata::default());
        assert_eq!(book.authors.as_deref(), Some("Born"));
        assert_eq!(book.editors.as_deref(), Some("Wolf"));
        assert!(book.subjects.is_empty());
    }
}
