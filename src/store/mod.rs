//! SQLite-backed record store.
//!
//! One [`BookStore`] owns one connection for the duration of a run. Books
//! own their links (deleted with the book); subjects are shared and are
//! only ever reached through find-or-create on `(subject, source)`.
//!
//! # Schema
//!
//! ```text
//! book ──< link
//!   │
//!   └──< book_subject >── subject   (UNIQUE subject, source)
//! ```

pub mod cursor;

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::domain::{Book, Link, Subject};

pub use cursor::BookCursor;

const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS book (
    book_id     TEXT PRIMARY KEY,
    title       TEXT NOT NULL,
    print_isbn  TEXT,
    ebook_isbn  TEXT,
    publisher   TEXT,
    series_id   TEXT,
    language    TEXT,
    description TEXT,
    published   TEXT,
    authors     TEXT,
    editors     TEXT,
    modified    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS subject (
    subject_id INTEGER PRIMARY KEY,
    subject    TEXT NOT NULL,
    source     TEXT NOT NULL,
    UNIQUE (subject, source)
);

CREATE TABLE IF NOT EXISTS book_subject (
    book_id    TEXT NOT NULL REFERENCES book (book_id) ON DELETE CASCADE,
    subject_id INTEGER NOT NULL REFERENCES subject (subject_id),
    PRIMARY KEY (book_id, subject_id)
);

CREATE TABLE IF NOT EXISTS link (
    id       INTEGER PRIMARY KEY,
    rel      TEXT NOT NULL DEFAULT 'http://opds-spec.org/acquisition',
    pub_type TEXT NOT NULL,
    href     TEXT NOT NULL,
    book_id  TEXT NOT NULL REFERENCES book (book_id) ON DELETE CASCADE
);
";

const BOOK_COLS: &str = "book_id, title, print_isbn, ebook_isbn, publisher, series_id, \
     language, description, published, authors, editors, modified";

/// Handle to the relational store
pub struct BookStore {
    conn: Connection,
}

impl BookStore {
    /// Open (or create) a store at the given path
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create database directory: {}", parent.display())
                })?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        Self::from_connection(conn)
    }

    /// Open a private in-memory store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to initialize database schema")?;
        Ok(Self { conn })
    }

    /// Number of stored books
    pub fn count_books(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM book", [], |row| row.get(0))
            .context("Failed to count books")?;
        Ok(count as usize)
    }

    /// Ordered, single-pass read of every stored book.
    ///
    /// The set of ids is fixed when the cursor is created; each book is
    /// loaded with its subjects and links when the cursor reaches it.
    pub fn books(&self) -> Result<BookCursor<'_>> {
        let mut stmt = self
            .conn
            .prepare("SELECT book_id FROM book ORDER BY book_id")
            .context("Failed to prepare book listing")?;
        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to list book ids")?;

        Ok(BookCursor::new(self, ids))
    }

    /// Check whether a book is already stored
    pub fn contains(&self, book_id: &str) -> Result<bool> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM book WHERE book_id = ?1",
                params![book_id],
                |_| Ok(()),
            )
            .optional()
            .with_context(|| format!("Failed to look up book: {}", book_id))?;
        Ok(found.is_some())
    }

    /// Load a book with its subjects and links
    pub fn get_book(&self, book_id: &str) -> Result<Option<Book>> {
        let sql = format!("SELECT {} FROM book WHERE book_id = ?1", BOOK_COLS);
        let book = self
            .conn
            .query_row(&sql, params![book_id], row_to_book)
            .optional()
            .with_context(|| format!("Failed to load book: {}", book_id))?;

        let Some(mut book) = book else {
            return Ok(None);
        };

        book.subjects = self.subjects_for(book_id)?;
        book.links = self.links_for(book_id)?;
        Ok(Some(book))
    }

    fn subjects_for(&self, book_id: &str) -> Result<Vec<Subject>> {
        let mut stmt = self.conn.prepare(
            "SELECT s.subject_id, s.subject, s.source
             FROM subject s JOIN book_subject bs ON bs.subject_id = s.subject_id
             WHERE bs.book_id = ?1
             ORDER BY bs.rowid",
        )?;
        let subjects = stmt
            .query_map(params![book_id], |row| {
                Ok(Subject {
                    subject_id: Some(row.get(0)?),
                    subject: row.get(1)?,
                    source: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to load subjects for {}", book_id))?;
        Ok(subjects)
    }

    fn links_for(&self, book_id: &str) -> Result<Vec<Link>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, rel, pub_type, href, book_id FROM link WHERE book_id = ?1 ORDER BY id")?;
        let links = stmt
            .query_map(params![book_id], |row| {
                Ok(Link {
                    id: Some(row.get(0)?),
                    rel: row.get(1)?,
                    pub_type: row.get(2)?,
                    href: row.get(3)?,
                    book_id: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("Failed to load links for {}", book_id))?;
        Ok(links)
    }

    /// Find or create a subject by `(subject, source)`
    pub fn upsert_subject(&self, subject: &str, source: &str) -> Result<Subject> {
        find_or_create_subject(&self.conn, subject, source)
            .with_context(|| format!("Failed to upsert subject '{}' ({})", subject, source))
    }

    /// Insert or replace a book, its links and its subject associations.
    ///
    /// Runs in one transaction and stamps `modified` with the current time.
    pub fn save(&self, book: &Book) -> Result<()> {
        let tx = self
            .conn
            .unchecked_transaction()
            .context("Failed to begin transaction")?;
        let modified = Utc::now().to_rfc3339();

        tx.execute(
            "INSERT INTO book (book_id, title, print_isbn, ebook_isbn, publisher, series_id,
                               language, description, published, authors, editors, modified)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT (book_id) DO UPDATE SET
                title = excluded.title,
                print_isbn = excluded.print_isbn,
                ebook_isbn = excluded.ebook_isbn,
                publisher = excluded.publisher,
                series_id = excluded.series_id,
                language = excluded.language,
                description = excluded.description,
                published = excluded.published,
                authors = excluded.authors,
                editors = excluded.editors,
                modified = excluded.modified",
            params![
                book.book_id,
                book.title,
                book.print_isbn,
                book.ebook_isbn,
                book.publisher,
                book.series_id,
                book.language,
                book.description,
                book.published,
                book.authors,
                book.editors,
                modified,
            ],
        )
        .with_context(|| format!("Failed to write book: {}", book.book_id))?;

        tx.execute("DELETE FROM link WHERE book_id = ?1", params![book.book_id])?;
        for link in &book.links {
            tx.execute(
                "INSERT INTO link (rel, pub_type, href, book_id) VALUES (?1, ?2, ?3, ?4)",
                params![link.rel, link.pub_type, link.href, book.book_id],
            )
            .with_context(|| format!("Failed to write link for {}", book.book_id))?;
        }

        tx.execute(
            "DELETE FROM book_subject WHERE book_id = ?1",
            params![book.book_id],
        )?;
        for subject in &book.subjects {
            let stored = find_or_create_subject(&tx, &subject.subject, &subject.source)?;
            tx.execute(
                "INSERT OR IGNORE INTO book_subject (book_id, subject_id) VALUES (?1, ?2)",
                params![book.book_id, stored.subject_id],
            )?;
        }

        tx.commit()
            .with_context(|| format!("Failed to commit book: {}", book.book_id))?;
        debug!(book_id = %book.book_id, links = book.links.len(), subjects = book.subjects.len(), "Saved book");

        Ok(())
    }

    /// Delete a book; its links and subject associations go with it
    pub fn delete_book(&self, book_id: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM book WHERE book_id = ?1", params![book_id])
            .with_context(|| format!("Failed to delete book: {}", book_id))?;
        Ok(deleted > 0)
    }

    /// Number of distinct subjects
    pub fn count_subjects(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM subject", [], |row| row.get(0))
            .context("Failed to count subjects")?;
        Ok(count as usize)
    }
}

fn find_or_create_subject(conn: &Connection, subject: &str, source: &str) -> Result<Subject> {
    conn.execute(
        "INSERT OR IGNORE INTO subject (subject, source) VALUES (?1, ?2)",
        params![subject, source],
    )?;
    let subject_id: i64 = conn.query_row(
        "SELECT subject_id FROM subject WHERE subject = ?1 AND source = ?2",
        params![subject, source],
        |row| row.get(0),
    )?;

    Ok(Subject {
        subject_id: Some(subject_id),
        subject: subject.to_string(),
        source: source.to_string(),
    })
}

fn row_to_book(row: &Row<'_>) -> rusqlite::Result<Book> {
    let modified: String = row.get(11)?;
    let modified = DateTime::parse_from_rfc3339(&modified)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(11, Type::Text, Box::new(e)))?;

    Ok(Book {
        book_id: row.get(0)?,
        title: row.get(1)?,
        print_isbn: row.get(2)?,
        ebook_isbn: row.get(3)?,
        publisher: row.get(4)?,
        series_id: row.get(5)?,
        language: row.get(6)?,
        description: row.get(7)?,
        published: row.get(8)?,
        authors: row.get(9)?,
        editors: row.get(10)?,
        modified,
        links: Vec::new(),
        subjects: Vec::new(),
    })
}
