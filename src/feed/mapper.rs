//! Book → OPDS publication mapping.
//!
//! Pure and infallible: optional data that is missing just leaves the
//! corresponding key out of the publication.

use chrono::SecondsFormat;

use super::opds::{
    AcquisitionLink, Contributor, ImageLink, Publication, PublicationMetadata, SubjectEntry,
};
use crate::domain::Book;

/// Scheme prefixed to the book id to form the publication identifier
pub const IDENTIFIER_SCHEME: &str = "urn:doi:";

/// schema.org type of every publication
pub const SCHEMA_TYPE: &str = "http://schema.org/EBook";

/// Genre scheme of the leading Nonfiction subject
pub const FICTION_SCHEME: &str = "http://librarysimplified.org/terms/fiction/";

/// Relation of every acquisition link
pub const OPEN_ACCESS_REL: &str = "http://opds-spec.org/acquisition/open-access";

/// Institutional login that redirects to the content URL
pub const AUTH_BROKER_URL: &str =
    "https://sp.springer.com/saml/login?idp=urn%3Amace%3Aincommon%3Acolumbia.edu&targetUrl=";

/// Cover image sizes published for every book
pub const COVER_SIZES: [&str; 3] = ["height_648", "width_125", "width_95"];

const COVER_BASE_URL: &str = "https://covers.springernature.com/books";
const CONTRIBUTOR_SEPARATOR: char = '|';

/// Map one stored book to a feed publication
pub fn publication(book: &Book) -> Publication {
    Publication {
        metadata: metadata(book),
        images: images(book),
        links: acquisition_links(book),
    }
}

fn metadata(book: &Book) -> PublicationMetadata {
    PublicationMetadata {
        identifier: format!("{}{}", IDENTIFIER_SCHEME, book.book_id),
        modified: book.modified.to_rfc3339_opts(SecondsFormat::Secs, true),
        title: book.title.clone(),
        language: book.language.clone(),
        schema_type: SCHEMA_TYPE.to_string(),
        publisher: book.publisher.clone(),
        published: book.published.clone(),
        description: book.description.clone(),
        subject: subjects(book),
        author: contributors(book.authors.as_deref()),
        editor: contributors(book.editors.as_deref()),
    }
}

/// The Nonfiction genre always comes first, then the book's own subjects
fn subjects(book: &Book) -> Vec<SubjectEntry> {
    let nonfiction = SubjectEntry {
        scheme: Some(FICTION_SCHEME.to_string()),
        code: Some("Nonfiction".to_string()),
        name: "Nonfiction".to_string(),
    };

    std::iter::once(nonfiction)
        .chain(book.subjects.iter().map(|s| SubjectEntry {
            scheme: None,
            code: None,
            name: s.subject.clone(),
        }))
        .collect()
}

fn contributors(joined: Option<&str>) -> Option<Vec<Contributor>> {
    let joined = joined.filter(|s| !s.is_empty())?;
    Some(
        joined
            .split(CONTRIBUTOR_SEPARATOR)
            .map(|name| Contributor {
                name: name.to_string(),
            })
            .collect(),
    )
}

fn images(book: &Book) -> Vec<ImageLink> {
    let isbn = book.ebook_isbn.as_deref().unwrap_or_default();

    COVER_SIZES
        .iter()
        .map(|size| ImageLink {
            href: format!("{}/jpg_{}_pixels/{}.jpg", COVER_BASE_URL, size, isbn),
            media_type: "image/jpeg".to_string(),
            width: size
                .strip_prefix("width_")
                .and_then(|px| px.parse().ok()),
        })
        .collect()
}

fn acquisition_links(book: &Book) -> Vec<AcquisitionLink> {
    book.links
        .iter()
        .map(|link| AcquisitionLink {
            rel: OPEN_ACCESS_REL.to_string(),
            media_type: link.format().media_type().to_string(),
            href: format!("{}{}", AUTH_BROKER_URL, link.href),
        })
        .collect()
}
