//! Feed Generation Integration Tests
//!
//! End-to-end export: books saved to an on-disk store, paginated, and
//! written as JSON pages by the file sink.

use std::num::NonZeroUsize;

use opdsfeed::feed::{generate_feed, FeedOptions, FileSink, PageAddress};
use opdsfeed::{Book, BookStore};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;

fn sample_books() -> Vec<Book> {
    vec![
        Book::new("10.1007/978-0-387-00001-1", "Algebra")
            .with_ebook_isbn("978-0-387-00001-8")
            .with_authors("Lang, Serge")
            .with_link("pdf", "http://link.springer.com/content/pdf/algebra.pdf")
            .with_subject("Mathematics", "springer"),
        Book::new("10.1007/978-0-387-00002-2", "Analysis")
            .with_editors("Rudin, Walter|Royden, Halsey")
            .with_link("epub", "http://link.springer.com/download/epub/analysis.epub"),
        Book::new("10.1007/978-0-387-00003-3", "Topology")
            .with_subject("Mathematics", "springer")
            .with_subject("Geometry", "springer"),
    ]
}

fn store_in(temp: &TempDir) -> BookStore {
    let store = BookStore::open(&temp.path().join("db/books.db")).unwrap();
    for book in sample_books() {
        store.save(&book).unwrap();
    }
    store
}

fn options(page_size: usize) -> FeedOptions {
    FeedOptions::new(
        "Springer Test Feed",
        NonZeroUsize::new(page_size).unwrap(),
        PageAddress::new("https://example.org/feed/springer_{page}.json"),
    )
}

fn read_page(sink: &FileSink, page: usize) -> Value {
    let content = std::fs::read_to_string(sink.page_path(page)).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[tokio::test]
async fn test_three_books_two_per_page() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    let sink = FileSink::new(temp.path().join("feed"), "springer");

    let summary = generate_feed(&store, &sink, &options(2)).await.unwrap();
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.publications, 3);
    assert!(!sink.page_path(3).exists());

    let first = read_page(&sink, 1);
    assert_eq!(
        first["metadata"],
        json!({
            "title": "Springer Test Feed",
            "itemsPerPage": 2,
            "currentPage": 1,
            "numberOfItems": 3
        })
    );
    assert_eq!(
        first["links"],
        json!([
            {
                "rel": ["self", "first"],
                "href": "https://example.org/feed/springer_1.json",
                "type": "application/opds+json"
            },
            {
                "rel": ["next", "last"],
                "href": "https://example.org/feed/springer_2.json",
                "type": "application/opds+json"
            }
        ])
    );

    let second = read_page(&sink, 2);
    assert_eq!(second["metadata"]["itemsPerPage"], 1);
    assert_eq!(second["metadata"]["currentPage"], 2);
    assert_eq!(second["links"][0]["rel"], json!(["self", "last"]));
    assert_eq!(second["links"][1]["rel"], json!(["prev", "first"]));
    assert_eq!(second["links"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_publications_follow_book_order() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    let sink = FileSink::new(temp.path().join("feed"), "springer");

    generate_feed(&store, &sink, &options(10)).await.unwrap();

    let page = read_page(&sink, 1);
    let identifiers: Vec<&str> = page["publications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["metadata"]["identifier"].as_str().unwrap())
        .collect();
    assert_eq!(
        identifiers,
        vec![
            "urn:doi:10.1007/978-0-387-00001-1",
            "urn:doi:10.1007/978-0-387-00002-2",
            "urn:doi:10.1007/978-0-387-00003-3",
        ]
    );

    // Single page feed
    assert_eq!(
        page["links"],
        json!([{
            "rel": ["self", "last"],
            "href": "https://example.org/feed/springer_1.json",
            "type": "application/opds+json"
        }])
    );
}

#[tokio::test]
async fn test_publication_shape() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    let sink = FileSink::new(temp.path().join("feed"), "springer");

    generate_feed(&store, &sink, &options(10)).await.unwrap();

    let page = read_page(&sink, 1);
    let algebra = &page["publications"][0];
    assert_eq!(algebra["metadata"]["@type"], "http://schema.org/EBook");
    assert_eq!(algebra["metadata"]["author"], json!([{"name": "Lang, Serge"}]));
    assert!(algebra["metadata"].get("editor").is_none());
    assert_eq!(
        algebra["metadata"]["subject"],
        json!([
            {
                "scheme": "http://librarysimplified.org/terms/fiction/",
                "code": "Nonfiction",
                "name": "Nonfiction"
            },
            {"name": "Mathematics"}
        ])
    );
    assert_eq!(algebra["images"].as_array().unwrap().len(), 3);
    assert_eq!(algebra["links"][0]["type"], "application/pdf");

    let analysis = &page["publications"][1];
    assert!(analysis["metadata"].get("author").is_none());
    assert_eq!(
        analysis["metadata"]["editor"],
        json!([{"name": "Rudin, Walter"}, {"name": "Royden, Halsey"}])
    );
    assert_eq!(analysis["links"][0]["type"], "application/epub+zip");

    let topology = &page["publications"][2];
    assert_eq!(topology["metadata"]["subject"].as_array().unwrap().len(), 3);
    assert_eq!(topology["links"], json!([]));
}

#[tokio::test]
async fn test_rerun_overwrites_pages() {
    let temp = TempDir::new().unwrap();
    let store = store_in(&temp);
    let sink = FileSink::new(temp.path().join("feed"), "springer");

    generate_feed(&store, &sink, &options(2)).await.unwrap();
    store.delete_book("10.1007/978-0-387-00003-3").unwrap();
    generate_feed(&store, &sink, &options(2)).await.unwrap();

    let page = read_page(&sink, 1);
    assert_eq!(page["metadata"]["numberOfItems"], 2);
    assert_eq!(page["links"][0]["rel"], json!(["self", "last"]));
}
