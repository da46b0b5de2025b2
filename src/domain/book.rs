//! Stored e-book records.
//!
//! A [`Book`] owns its acquisition [`Link`]s and references shared
//! [`Subject`]s. Books are written during ingestion and only read when the
//! feed is generated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default relation stored on acquisition links
pub const ACQUISITION_REL: &str = "http://opds-spec.org/acquisition";

/// An e-book as persisted in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    /// Natural key (a DOI such as `10.1007/978-1-349-11550-1`)
    pub book_id: String,

    /// Title of the book
    pub title: String,

    /// Print ISBN
    pub print_isbn: Option<String>,

    /// Electronic ISBN (used to address cover images)
    pub ebook_isbn: Option<String>,

    /// Publisher name
    pub publisher: Option<String>,

    /// Identifier of the parent series, if any
    pub series_id: Option<String>,

    /// Language code as supplied by the catalog
    pub language: Option<String>,

    /// Abstract or description
    pub description: Option<String>,

    /// Publication date as supplied by the catalog
    pub published: Option<String>,

    /// Last time the record was written
    pub modified: DateTime<Utc>,

    /// Authors joined by `|`
    pub authors: Option<String>,

    /// Editors joined by `|`
    pub editors: Option<String>,

    /// Acquisition links, in insertion order
    #[serde(default)]
    pub links: Vec<Link>,

    /// Subjects associated with this book
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

impl Book {
    /// Create a book with only its required fields set
    pub fn new(book_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            book_id: book_id.into(),
            title: title.into(),
            print_isbn: None,
            ebook_isbn: None,
            publisher: None,
            series_id: None,
            language: None,
            description: None,
            published: None,
            modified: Utc::now(),
            authors: None,
            editors: None,
            links: Vec::new(),
            subjects: Vec::new(),
        }
    }

    /// Add an acquisition link owned by this book
    pub fn with_link(mut self, pub_type: impl Into<String>, href: impl Into<String>) -> Self {
        let link = Link::new(self.book_id.clone(), pub_type, href);
        self.links.push(link);
        self
    }

    /// Associate a subject
    pub fn with_subject(mut self, subject: impl Into<String>, source: impl Into<String>) -> Self {
        self.subjects.push(Subject::new(subject, source));
        self
    }

    /// Set the `|`-joined author list
    pub fn with_authors(mut self, authors: impl Into<String>) -> Self {
        self.authors = Some(authors.into());
        self
    }

    /// Set the `|`-joined editor list
    pub fn with_editors(mut self, editors: impl Into<String>) -> Self {
        self.editors = Some(editors.into());
        self
    }

    /// Set the electronic ISBN
    pub fn with_ebook_isbn(mut self, isbn: impl Into<String>) -> Self {
        self.ebook_isbn = Some(isbn.into());
        self
    }
}

/// A subject heading, shared between books.
///
/// `(subject, source)` is unique in the store; `subject_id` is `None`
/// until the subject has been persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub subject_id: Option<i64>,
    pub subject: String,
    pub source: String,
}

impl Subject {
    /// Create an unsaved subject
    pub fn new(subject: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            subject_id: None,
            subject: subject.into(),
            source: source.into(),
        }
    }
}

/// An acquisition link owned by a book
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Row id, `None` until persisted
    pub id: Option<i64>,

    /// Relation as stored
    pub rel: String,

    /// Format hint from the catalog (`"pdf"`, `"epub"`, ...)
    pub pub_type: String,

    /// Target URL of the content
    pub href: String,

    /// Owning book
    pub book_id: String,
}

impl Link {
    /// Create an unsaved link with the default acquisition relation
    pub fn new(
        book_id: impl Into<String>,
        pub_type: impl Into<String>,
        href: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            rel: ACQUISITION_REL.to_string(),
            pub_type: pub_type.into(),
            href: href.into(),
            book_id: book_id.into(),
        }
    }

    /// Classify the format hint of this link
    pub fn format(&self) -> LinkFormat {
        LinkFormat::from_hint(&self.pub_type)
    }
}

/// Media classification of an acquisition link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkFormat {
    Pdf,
    Epub,
}

impl LinkFormat {
    /// Any hint containing `pdf` (case-sensitive) is a PDF; everything else
    /// is served as an EPUB archive.
    pub fn from_hint(hint: &str) -> Self {
        if hint.contains("pdf") {
            LinkFormat::Pdf
        } else {
            LinkFormat::Epub
        }
    }

    /// IANA media type
    pub fn media_type(self) -> &'static str {
        match self {
            LinkFormat::Pdf => "application/pdf",
            LinkFormat::Epub => "application/epub+zip",
        }
    }
}
