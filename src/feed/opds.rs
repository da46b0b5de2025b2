//! OPDS 2.0 JSON wire types.
//!
//! Everything the feed emits is built from these structs and serialized
//! only when a page is handed to a sink.

use serde::{Deserialize, Serialize};

use super::navigation::RelValue;

/// Media type of a feed page
pub const FEED_MEDIA_TYPE: &str = "application/opds+json";

/// One page of the feed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub metadata: FeedMetadata,
    pub links: Vec<NavLink>,
    pub publications: Vec<Publication>,
}

impl FeedPage {
    /// 1-based page number
    pub fn page_number(&self) -> usize {
        self.metadata.current_page
    }

    /// Navigation link carrying the given relation, if any
    #[cfg(test)]
    pub(crate) fn link_with(&self, rel: super::navigation::Relation) -> Option<&NavLink> {
        self.links.iter().find(|l| l.rel.contains(rel))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedMetadata {
    pub title: String,
    /// Publications on this page
    pub items_per_page: usize,
    pub current_page: usize,
    /// Publications across the whole feed
    pub number_of_items: usize,
}

/// Page-to-page navigation link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavLink {
    pub rel: RelValue,
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
}

/// A single feed entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Publication {
    pub metadata: PublicationMetadata,
    pub images: Vec<ImageLink>,
    pub links: Vec<AcquisitionLink>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationMetadata {
    pub identifier: String,
    pub modified: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(rename = "@type")]
    pub schema_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub subject: Vec<SubjectEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Vec<Contributor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor: Option<Vec<Contributor>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contributor {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageLink {
    pub href: String,
    #[serde(rename = "type")]
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcquisitionLink {
    pub rel: String,
    #[serde(rename = "type")]
    pub media_type: String,
    pub href: String,
}
