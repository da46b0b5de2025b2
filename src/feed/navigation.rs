//! Page navigation links.
//!
//! Every page carries up to five links: self, first, last, next and prev.
//! When two of them point at the same page they are folded into one link
//! whose `rel` is a list, e.g. page 2's first page is also its previous
//! page, so it gets a single `["prev", "first"]` link.
//!
//! The slot rules run in a fixed order and a later rule replaces what an
//! earlier one assigned. On a one-page feed this leaves only
//! `self = ["self", "last"]`; the `first` relation is not merged in.

use serde::{Deserialize, Serialize};

use super::opds::{NavLink, FEED_MEDIA_TYPE};

/// Placeholder replaced by the page number in an address template
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// A navigation relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// The page itself
    #[serde(rename = "self")]
    Current,
    First,
    Last,
    Prev,
    Next,
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relation::Current => write!(f, "self"),
            Relation::First => write!(f, "first"),
            Relation::Last => write!(f, "last"),
            Relation::Prev => write!(f, "prev"),
            Relation::Next => write!(f, "next"),
        }
    }
}

/// `rel` of a link: one label, or several sharing the link
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelValue {
    One(Relation),
    Many(Vec<Relation>),
}

impl RelValue {
    fn many(relations: &[Relation]) -> Self {
        RelValue::Many(relations.to_vec())
    }

    /// Whether this value carries the relation
    pub fn contains(&self, relation: Relation) -> bool {
        match self {
            RelValue::One(r) => *r == relation,
            RelValue::Many(rs) => rs.contains(&relation),
        }
    }
}

/// Relation assigned to each of the five slots of a page (`None` = no link)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavSlots {
    pub current: Option<RelValue>,
    pub first: Option<RelValue>,
    pub last: Option<RelValue>,
    pub prev: Option<RelValue>,
    pub next: Option<RelValue>,
}

impl NavSlots {
    /// Slots for page `page` (1-based) of `total_pages`
    pub fn for_page(page: usize, total_pages: usize) -> Self {
        use Relation::*;

        let mut slots = Self {
            current: Some(RelValue::One(Current)),
            first: Some(RelValue::One(First)),
            last: Some(RelValue::One(Last)),
            prev: Some(RelValue::One(Prev)),
            next: Some(RelValue::One(Next)),
        };

        if page == 1 {
            slots.current = Some(RelValue::many(&[Current, First]));
            slots.first = None;
            slots.prev = None;
        }
        if page == 2 {
            slots.first = Some(RelValue::many(&[Prev, First]));
            slots.prev = None;
        }
        if page + 1 == total_pages {
            slots.last = Some(RelValue::many(&[Next, Last]));
            slots.next = None;
        }
        if page == total_pages {
            slots.current = Some(RelValue::many(&[Current, Last]));
            slots.next = None;
            slots.last = None;
        }

        slots
    }
}

/// Builds page URLs from a template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageAddress {
    template: String,
}

impl PageAddress {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// URL of a page. Templates without `{page}` get a `page` query parameter.
    pub fn href(&self, page: usize) -> String {
        if self.template.contains(PAGE_PLACEHOLDER) {
            self.template.replace(PAGE_PLACEHOLDER, &page.to_string())
        } else {
            let separator = if self.template.contains('?') { '&' } else { '?' };
            format!("{}{}page={}", self.template, separator, page)
        }
    }
}

/// Navigation links of a page, in emission order: self, first, last, next, prev
pub fn navigation_links(page: usize, total_pages: usize, address: &PageAddress) -> Vec<NavLink> {
    let slots = NavSlots::for_page(page, total_pages);

    [
        (slots.current, page),
        (slots.first, 1),
        (slots.last, total_pages),
        (slots.next, page + 1),
        (slots.prev, page.saturating_sub(1)),
    ]
    .into_iter()
    .filter_map(|(rel, target)| {
        rel.map(|rel| NavLink {
            rel,
            href: address.href(target),
            media_type: FEED_MEDIA_TYPE.to_string(),
        })
    })
    .collect()
}
