//! Domain types for opdsfeed.
//!
//! Books, their subjects and their acquisition links as kept in the store.

pub mod book;

pub use book::{Book, Link, LinkFormat, Subject, ACQUISITION_REL};
