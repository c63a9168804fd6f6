//! Which pages get discussion tools
//!
//! Talk namespaces always do. Other pages opt in with the `newsectionlink` page property
//! (`__NEWSECTIONLINK__`), and talk pages can turn off the new topic tool with
//! `nonewsectionlink`.
//!
//! Page properties live in the wiki's database, behind [`PagePropLookup`]. A page view asks
//! about the same page several times, so lookups are memoized in a [`PagePropCache`] owned by
//! the [`RequestContext`]. The cache dies with the request: properties can change with any
//! edit, so nothing is kept across requests.

use std::cell::RefCell;
use std::collections::HashMap;

pub const NEW_SECTION_LINK: &str = "newsectionlink";
pub const NO_NEW_SECTION_LINK: &str = "nonewsectionlink";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageIdentity {
    /// Namespace id; talk namespaces are the odd, non-negative ones.
    pub namespace: i32,
    pub title: String,
}

impl PageIdentity {
    pub fn new(namespace: i32, title: impl Into<String>) -> Self {
        Self {
            namespace,
            title: title.into(),
        }
    }

    pub fn is_talk_page(&self) -> bool {
        self.namespace >= 0 && self.namespace % 2 == 1
    }
}

pub trait PagePropLookup {
    fn has_page_prop(&self, title: &str, property: &str) -> bool;
}

#[derive(Debug, Default)]
pub struct PagePropCache {
    entries: HashMap<(String, String), bool>,
}

impl PagePropCache {
    pub fn get_or_lookup(
        &mut self,
        lookup: &dyn PagePropLookup,
        title: &str,
        property: &str,
    ) -> bool {
        *self
            .entries
            .entry((title.to_string(), property.to_string()))
            .or_insert_with(|| lookup.has_page_prop(title, property))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// State scoped to one request.
pub struct RequestContext<'a> {
    lookup: &'a dyn PagePropLookup,
    cache: RefCell<PagePropCache>,
}

impl<'a> RequestContext<'a> {
    pub fn new(lookup: &'a dyn PagePropLookup) -> Self {
        Self {
            lookup,
            cache: RefCell::new(PagePropCache::default()),
        }
    }

    pub fn has_page_prop(&self, page: &PageIdentity, property: &str) -> bool {
        self.cache
            .borrow_mut()
            .get_or_lookup(self.lookup, &page.title, property)
    }
}

pub fn is_available_for_title(page: &PageIdentity, ctx: &RequestContext<'_>) -> bool {
    page.is_talk_page() || ctx.has_page_prop(page, NEW_SECTION_LINK)
}

pub fn is_new_topic_tool_available(page: &PageIdentity, ctx: &RequestContext<'_>) -> bool {
    if ctx.has_page_prop(page, NEW_SECTION_LINK) {
        return true;
    }
    page.is_talk_page() && !ctx.has_page_prop(page, NO_NEW_SECTION_LINK)
}
