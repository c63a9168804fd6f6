//! Thread items
//!
//! Headings and comments share one [`ThreadItem`] struct with an [`ItemKind`] payload. A
//! [`ThreadItemSet`] owns all items of one parse in discovery order; tree structure is kept as
//! indices (`replies` down, `parent` up), so there are no reference cycles and the flat order is
//! always available. [`ItemRef`] is the borrowed view used to navigate and query the tree.

use crate::dom::range::DomRange;
use crate::dom::{has_typeof, tree_root, NodeExt};
use crate::error::ParserResult;
use crate::timestamp::TimestampWarning;
use crate::title::normalize_parsoid_resource_name;
use chrono::{DateTime, Utc};
use markup5ever_rcdom::Handle;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::ops::Deref;

/// `heading_level` of the synthetic heading standing for the lead section.
pub const PLACEHOLDER_HEADING_LEVEL: u32 = 99;

static TRANSCLUSION_ABOUT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^#mwt\d+$").expect("static regex"));

#[derive(Debug, Clone)]
pub enum ItemKind {
    Heading {
        /// 1-6, or [`PLACEHOLDER_HEADING_LEVEL`].
        heading_level: u32,
        placeholder: bool,
    },
    Comment {
        timestamp: DateTime<Utc>,
        author: String,
        /// One range per signature; more than one when signatures on a line were merged.
        signature_ranges: Vec<DomRange>,
    },
}

/// Recoverable anomalies recorded on an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ItemWarning {
    DifferentIndentation,
    SkipsIndentation,
    Unconnected,
    Timestamp(TimestampWarning),
    Other(String),
}

impl ItemWarning {
    pub fn message(&self) -> &str {
        match self {
            ItemWarning::DifferentIndentation => {
                "Comment starts and ends with different indentation"
            }
            ItemWarning::SkipsIndentation => "Comment skips indentation level",
            ItemWarning::Unconnected => "Comment could not be connected to a thread",
            ItemWarning::Timestamp(warning) => warning.message(),
            ItemWarning::Other(message) => message,
        }
    }
}

impl fmt::Display for ItemWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl From<String> for ItemWarning {
    fn from(message: String) -> Self {
        let known = [
            ItemWarning::DifferentIndentation,
            ItemWarning::SkipsIndentation,
            ItemWarning::Unconnected,
            ItemWarning::Timestamp(TimestampWarning::AmbiguousTime),
            ItemWarning::Timestamp(TimestampWarning::ImpossibleAbbreviation),
        ];
        known
            .into_iter()
            .find(|warning| warning.message() == message)
            .unwrap_or(ItemWarning::Other(message))
    }
}

impl From<ItemWarning> for String {
    fn from(warning: ItemWarning) -> Self {
        warning.message().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct ThreadItem {
    pub kind: ItemKind,
    pub range: DomRange,
    /// 0 for headings, indentation depth plus one for comments.
    pub level: usize,
    /// Unique within one parse.
    pub id: String,
    /// Stable across revisions; `None` for headings without comments.
    pub name: Option<String>,
    pub replies: Vec<usize>,
    pub parent: Option<usize>,
    pub warnings: Vec<ItemWarning>,
}

impl ThreadItem {
    pub fn heading(range: DomRange, heading_level: u32, placeholder: bool) -> Self {
        Self::new(
            ItemKind::Heading {
                heading_level,
                placeholder,
            },
            range,
            0,
        )
    }

    pub fn comment(
        range: DomRange,
        level: usize,
        timestamp: DateTime<Utc>,
        author: String,
        signature_ranges: Vec<DomRange>,
    ) -> Self {
        Self::new(
            ItemKind::Comment {
                timestamp,
                author,
                signature_ranges,
            },
            range,
            level,
        )
    }

    fn new(kind: ItemKind, range: DomRange, level: usize) -> Self {
        Self {
            kind,
            range,
            level,
            id: String::new(),
            name: None,
            replies: Vec::new(),
            parent: None,
            warnings: Vec::new(),
        }
    }

    /// `"heading"` or `"comment"`.
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            ItemKind::Heading { .. } => "heading",
            ItemKind::Comment { .. } => "comment",
        }
    }

    pub fn is_heading(&self) -> bool {
        matches!(self.kind, ItemKind::Heading { .. })
    }

    pub fn is_comment(&self) -> bool {
        matches!(self.kind, ItemKind::Comment { .. })
    }

    pub fn is_placeholder_heading(&self) -> bool {
        matches!(self.kind, ItemKind::Heading { placeholder: true, .. })
    }

    pub fn heading_level(&self) -> Option<u32> {
        match self.kind {
            ItemKind::Heading { heading_level, .. } => Some(heading_level),
            ItemKind::Comment { .. } => None,
        }
    }

    pub fn author(&self) -> Option<&str> {
        match &self.kind {
            ItemKind::Comment { author, .. } => Some(author),
            ItemKind::Heading { .. } => None,
        }
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        match &self.kind {
            ItemKind::Comment { timestamp, .. } => Some(*timestamp),
            ItemKind::Heading { .. } => None,
        }
    }

    pub fn signature_ranges(&self) -> &[DomRange] {
        match &self.kind {
            ItemKind::Comment {
                signature_ranges, ..
            } => signature_ranges,
            ItemKind::Heading { .. } => &[],
        }
    }

    pub(crate) fn push_warning(&mut self, warning: ItemWarning) {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
    }
}

/// Where an item's content comes from when it is rendered by a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscludedFrom {
    /// Written on this page.
    No,
    /// Transcluded from a single page.
    Page(String),
    /// Transcluded, but the source can't be pinned to one page.
    Unknown,
}

impl Serialize for TranscludedFrom {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TranscludedFrom::No => serializer.serialize_bool(false),
            TranscludedFrom::Page(page) => serializer.serialize_str(page),
            TranscludedFrom::Unknown => serializer.serialize_bool(true),
        }
    }
}

impl<'de> Deserialize<'de> for TranscludedFrom {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Page(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Flag(false) => TranscludedFrom::No,
            Raw::Flag(true) => TranscludedFrom::Unknown,
            Raw::Page(page) => TranscludedFrom::Page(page),
        })
    }
}

/// All items of one parse, in discovery order, plus the heading roots.
#[derive(Debug, Clone)]
pub struct ThreadItemSet {
    items: Vec<ThreadItem>,
    threads: Vec<usize>,
    container: Handle,
    // Dropping the top of an rcdom tree empties every node below it; holding it keeps the
    // ranges valid for as long as the set lives.
    _root: Handle,
}

impl ThreadItemSet {
    pub(crate) fn new(items: Vec<ThreadItem>, threads: Vec<usize>, container: Handle) -> Self {
        let root = tree_root(&container);
        Self {
            items,
            threads,
            container,
            _root: root,
        }
    }

    pub fn container(&self) -> &Handle {
        &self.container
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ItemRef<'_>> {
        (index < self.items.len()).then_some(ItemRef { set: self, index })
    }

    /// Every item in discovery order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = ItemRef<'_>> + ExactSizeIterator + '_ {
        (0..self.items.len()).map(move |index| ItemRef { set: self, index })
    }

    /// Heading roots of the thread trees.
    pub fn threads(&self) -> Vec<ItemRef<'_>> {
        self.threads
            .iter()
            .map(|&index| ItemRef { set: self, index })
            .collect()
    }

    pub fn comments(&self) -> Vec<ItemRef<'_>> {
        self.iter().filter(|item| item.is_comment()).collect()
    }

    pub fn headings(&self) -> Vec<ItemRef<'_>> {
        self.iter().filter(|item| item.is_heading()).collect()
    }

    pub fn find_by_name(&self, name: &str) -> Option<ItemRef<'_>> {
        self.iter().find(|item| item.name.as_deref() == Some(name))
    }

    pub fn find_by_id(&self, id: &str) -> Option<ItemRef<'_>> {
        self.iter().find(|item| item.id == id)
    }
}

/// Borrowed view of one item within its set.
#[derive(Clone, Copy)]
pub struct ItemRef<'a> {
    set: &'a ThreadItemSet,
    index: usize,
}

impl<'a> Deref for ItemRef<'a> {
    type Target = ThreadItem;

    fn deref(&self) -> &ThreadItem {
        &self.set.items[self.index]
    }
}

impl fmt::Debug for ItemRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemRef")
            .field("index", &self.index)
            .field("id", &self.id)
            .field("type", &self.type_name())
            .finish()
    }
}

impl<'a> ItemRef<'a> {
    /// Position in discovery order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn set(&self) -> &'a ThreadItemSet {
        self.set
    }

    pub fn item(&self) -> &'a ThreadItem {
        &self.set.items[self.index]
    }

    pub fn replies(&self) -> Vec<ItemRef<'a>> {
        self.item()
            .replies
            .iter()
            .map(|&index| ItemRef {
                set: self.set,
                index,
            })
            .collect()
    }

    pub fn parent(&self) -> Option<ItemRef<'a>> {
        self.item().parent.map(|index| ItemRef {
            set: self.set,
            index,
        })
    }

    /// The heading at the root of this item's thread. Unconnected comments have none.
    pub fn heading(&self) -> Option<ItemRef<'a>> {
        let mut current = *self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current.is_heading().then_some(current)
    }

    /// Descendants in pre-order, not including this item.
    pub fn thread_items_below(&self) -> Vec<ItemRef<'a>> {
        let mut out = Vec::new();
        let mut stack: Vec<ItemRef<'a>> = self.replies().into_iter().rev().collect();
        while let Some(item) = stack.pop() {
            stack.extend(item.replies().into_iter().rev());
            out.push(item);
        }
        out
    }

    /// Sorted, de-duplicated authors of all replies below this item.
    pub fn authors_below(&self) -> Vec<String> {
        let authors: BTreeSet<String> = self
            .thread_items_below()
            .iter()
            .filter_map(|item| item.author().map(str::to_string))
            .collect();
        authors.into_iter().collect()
    }

    /// The comment below this item with the earliest timestamp (first one wins on ties).
    pub fn oldest_reply(&self) -> Option<ItemRef<'a>> {
        let mut oldest: Option<ItemRef<'a>> = None;
        for item in self.thread_items_below() {
            let Some(timestamp) = item.timestamp() else {
                continue;
            };
            if oldest
                .and_then(|o| o.timestamp())
                .map_or(true, |best| timestamp < best)
            {
                oldest = Some(item);
            }
        }
        oldest
    }

    /// Only the wrapper of the whole item counts: a template used inside a comment (a ping, a
    /// signature template) does not make the comment transcluded.
    pub fn transcluded_from(&self) -> TranscludedFrom {
        let node = self
            .range
            .fully_covered_wrapper(&self.set.container)
            .unwrap_or_else(|| self.range.end.node.clone());
        let Some(element) = transclusion_element(&node) else {
            return TranscludedFrom::No;
        };

        let data: Option<serde_json::Value> = element
            .attr("data-mw")
            .and_then(|raw| serde_json::from_str(&raw).ok());
        let href = data.as_ref().and_then(|data| {
            let parts = data.get("parts")?.as_array()?;
            match parts.as_slice() {
                [only] => only.get("template")?.get("target")?.get("href")?.as_str(),
                _ => None,
            }
        });
        match href {
            Some(href) => TranscludedFrom::Page(normalize_parsoid_resource_name(href)),
            None => TranscludedFrom::Unknown,
        }
    }

    pub fn text(&self) -> String {
        self.range.text()
    }

    pub fn html(&self) -> ParserResult<String> {
        self.range.html()
    }

    /// The item's range, optionally cut before the last signature.
    pub fn body_range(&self, strip_signature: bool) -> DomRange {
        match self.signature_ranges().last() {
            Some(signature) if strip_signature => {
                DomRange::new(self.range.start.clone(), signature.start.clone())
            }
            _ => self.range.clone(),
        }
    }

    pub fn body_text(&self, strip_signature: bool) -> String {
        self.body_range(strip_signature).text()
    }

    pub fn body_html(&self, strip_signature: bool) -> ParserResult<String> {
        self.body_range(strip_signature).html()
    }
}

/// The transclusion wrapper rendering `node`: the closest ancestor in an `about` group whose
/// leading element is typed `mw:Transclusion`.
fn transclusion_element(node: &Handle) -> Option<Handle> {
    let mut current = Some(node.clone());
    while let Some(mut candidate) = current {
        if let Some(about) = candidate
            .attr("about")
            .filter(|about| TRANSCLUSION_ABOUT.is_match(about))
        {
            while let Some(previous) = candidate.previous_sibling().filter(|previous| {
                previous.is_element() && previous.attr("about").as_deref() == Some(about.as_str())
            }) {
                candidate = previous;
            }
            if has_typeof(&candidate, "mw:Transclusion") {
                return Some(candidate);
            }
        }
        current = candidate.parent_node();
    }
    None
}
