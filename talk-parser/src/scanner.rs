//! Comment scanning
//!
//! Walks the container in document order and turns it into a flat list of thread items:
//!
//!     - every `h1`-`h6` opens a heading item covering the heading's contents;
//!     - every timestamp with a signature before it closes a comment, which starts at the first
//!       interesting leaf after the previous item and ends at the timestamp;
//!     - a timestamp without a signature is dropped silently.
//!
//! Signatures found on the same line (same list item or paragraph) as the previous comment's
//! end are merged into that comment. Comments before the first heading get a placeholder
//! heading prepended, standing for the page's lead section.
//!
//! Levels are indentation depth plus one, measured at both the start and the end of the
//! comment; when they disagree the smaller one wins and the item gets a warning.

use crate::dom::range::{BoundaryPoint, DomRange};
use crate::dom::walk::{next_interesting_leaf, FilterResult, TreeWalker};
use crate::dom::{indent_level, NodeExt};
use crate::error::{ParserError, ParserResult};
use crate::item::{ItemKind, ItemWarning, ThreadItem, PLACEHOLDER_HEADING_LEVEL};
use crate::locale::ParserOptions;
use crate::signature::SignatureFinder;
use crate::timestamp::{TimestampMatch, TimestampPattern};
use crate::title::TitleResolver;
use markup5ever_rcdom::Handle;

const HEADINGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

/// A text node with a timestamp in it.
#[derive(Debug, Clone)]
pub struct TimestampHit {
    pub node: Handle,
    pub found: TimestampMatch,
}

pub struct CommentScanner<'a> {
    pattern: &'a TimestampPattern,
    resolver: &'a TitleResolver,
    options: &'a ParserOptions,
}

impl<'a> CommentScanner<'a> {
    pub fn new(
        pattern: &'a TimestampPattern,
        resolver: &'a TitleResolver,
        options: &'a ParserOptions,
    ) -> Self {
        Self {
            pattern,
            resolver,
            options,
        }
    }

    fn filter(&self, text_only: bool) -> impl FnMut(&Handle) -> FilterResult + 'a {
        let options: &'a ParserOptions = self.options;
        let skip_ids = &options.skip_ids;
        move |node: &Handle| {
            if node.is_element()
                && node
                    .attr("id")
                    .is_some_and(|id| skip_ids.iter().any(|skip| *skip == id))
            {
                return FilterResult::Reject;
            }
            if node.is_text() || (!text_only && node.is_element()) {
                FilterResult::Accept
            } else {
                FilterResult::Skip
            }
        }
    }

    /// First timestamp of every text node below `root`, in document order.
    pub fn find_timestamps(&self, root: &Handle) -> Vec<TimestampHit> {
        let mut hits = Vec::new();
        for node in TreeWalker::new(root.clone(), self.filter(true)) {
            let text = stitched_text(&node);
            if let Some(mut found) = self.pattern.find(&text) {
                let length = node.node_length();
                found.start = found.start.min(length);
                found.end = found.end.min(length);
                hits.push(TimestampHit { node, found });
            }
        }
        hits
    }

    /// The flat list of headings and comments below `root`, unthreaded.
    pub fn scan(&self, root: &Handle) -> ParserResult<Vec<ThreadItem>> {
        let timestamps = self.find_timestamps(root);
        let finder = SignatureFinder::new(self.resolver, self.options.signature_scan_limit);

        let mut items: Vec<ThreadItem> = Vec::new();
        // Index of the item being accumulated; `None` while in the lead section.
        let mut current: Option<usize> = None;
        let mut next_timestamp = 0;

        for node in TreeWalker::new(root.clone(), self.filter(false)) {
            if let Some(level) = heading_level(&node) {
                items.push(ThreadItem::heading(DomRange::contents_of(&node), level, false));
                current = Some(items.len() - 1);
                continue;
            }
            let Some(hit) = timestamps.get(next_timestamp) else {
                continue;
            };
            if !node.same_node(&hit.node) {
                continue;
            }
            next_timestamp += 1;

            let previous_end = match current {
                Some(index) => items[index].range.end.node.clone(),
                None => root.clone(),
            };
            let signature = finder.find(&node, Some(&previous_end));
            let Some(author) = signature.username.clone() else {
                tracing::debug!(
                    text = %node.text_content(),
                    "ignoring timestamp without a signature"
                );
                continue;
            };

            // With nothing left after the previous comment's end, the walk stays where it is.
            let start_node =
                next_interesting_leaf(&previous_end, root).unwrap_or_else(|| previous_end.clone());
            let last_signature_node = signature.timestamp_node().clone();
            let end = if last_signature_node.same_node(&node) {
                BoundaryPoint::new(node.clone(), hit.found.end)
            } else {
                BoundaryPoint::after(&last_signature_node).ok_or_else(detached)?
            };
            let start = BoundaryPoint::before(&start_node).ok_or_else(detached)?;
            let signature_start =
                BoundaryPoint::before(signature.first_node()).ok_or_else(detached)?;
            let range = DomRange::new(start, end.clone());
            let signature_range = DomRange::new(signature_start, end);

            let start_level = indent_level(&start_node, root) + 1;
            let end_level = indent_level(&node, root) + 1;
            let level = start_level.min(end_level);

            // Several signatures on one line, e.g. a note added later by the same user, make
            // one comment rather than several.
            if let Some(index) = current.filter(|&index| items[index].is_comment()) {
                let previous = &mut items[index];
                if line_container(&node).same_node(&line_container(&previous.range.end.node)) {
                    tracing::debug!(author = %author, "merging signature into previous comment");
                    previous.range.end = range.end;
                    previous.level = previous.level.min(level);
                    if let ItemKind::Comment {
                        signature_ranges, ..
                    } = &mut previous.kind
                    {
                        signature_ranges.push(signature_range);
                    }
                    continue;
                }
            }

            let Some(timestamp) = self.pattern.resolve(&hit.found.fields) else {
                tracing::debug!(
                    fields = ?hit.found.fields,
                    "ignoring timestamp that is not a calendar date"
                );
                continue;
            };

            let mut item = ThreadItem::comment(
                range,
                level,
                timestamp.instant,
                author,
                vec![signature_range],
            );
            if start_level != end_level {
                item.push_warning(ItemWarning::DifferentIndentation);
            }
            if let Some(warning) = timestamp.warning {
                item.push_warning(ItemWarning::Timestamp(warning));
            }
            items.push(item);
            current = Some(items.len() - 1);
        }

        if items.first().is_some_and(|first| !first.is_heading()) {
            let lead = DomRange::collapsed(BoundaryPoint::new(root.clone(), 0));
            items.insert(0, ThreadItem::heading(lead, PLACEHOLDER_HEADING_LEVEL, true));
        }
        Ok(items)
    }
}

fn detached() -> ParserError {
    ParserError::UnresolvableBoundary("signature node is detached".to_string())
}

fn heading_level(node: &Handle) -> Option<u32> {
    if !node.has_tag(HEADINGS) {
        return None;
    }
    node.tag_name()?.get(1..)?.parse().ok()
}

/// The block a signature sits in, for merging signatures on one line.
fn line_container(node: &Handle) -> Handle {
    node.closest_element(&["li", "dd", "p"])
        .or_else(|| node.parent_node())
        .unwrap_or_else(|| node.clone())
}

/// Text of `node`, continued across Parsoid `mw:Entity` spans and the text that follows them.
/// Editing tools sometimes turn the spaces inside a timezone name into `&nbsp;` entities.
fn stitched_text(node: &Handle) -> String {
    let mut text = String::new();
    let mut current = Some(node.clone());
    while let Some(part) = current.take() {
        text.push_str(&part.text_content());
        let entity = part
            .next_sibling()
            .filter(|next| next.is_element() && next.attr("typeof").as_deref() == Some("mw:Entity"));
        if let Some(entity) = entity {
            if let Some(first) = entity.first_child() {
                text.push_str(&first.text_content());
            }
            current = entity.next_sibling().filter(|after| after.is_text());
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_container;
    use crate::locale::{LocaleData, TimezoneAbbreviation};

    fn scan(html: &str) -> (Handle, Vec<ThreadItem>) {
        let locale = LocaleData::english();
        let options = ParserOptions::default();
        let pattern = TimestampPattern::new(&locale).unwrap();
        let resolver = TitleResolver::new(&options).unwrap();
        let root = parse_container(html, None).unwrap();
        let items = CommentScanner::new(&pattern, &resolver, &options)
            .scan(&root)
            .unwrap();
        (root, items)
    }

    fn sig(user: &str, time: &str) -> String {
        format!(r#"<a href="./User:{user}">{user}</a> {time}, 1 May 2021 (UTC)"#)
    }

    #[test]
    fn headings_and_comments_in_order() {
        let html = format!(
            "<h2>Topic</h2><p>First. {}</p><dl><dd>Reply. {}</dd></dl>",
            sig("Alice", "10:00"),
            sig("Bob", "11:00")
        );
        let (_root, items) = scan(&html);
        let shape: Vec<(&str, usize, Option<&str>)> = items
            .iter()
            .map(|i| (i.type_name(), i.level, i.author()))
            .collect();
        assert_eq!(
            shape,
            vec![
                ("heading", 0, None),
                ("comment", 1, Some("Alice")),
                ("comment", 2, Some("Bob")),
            ]
        );
        assert_eq!(items[0].heading_level(), Some(2));
        assert_eq!(items[1].range.text(), "First. Alice 10:00, 1 May 2021 (UTC)");
    }

    #[test]
    fn lead_section_gets_placeholder_heading() {
        let html = format!("<p>Lead comment. {}</p><h2>Later</h2>", sig("Alice", "10:00"));
        let (root, items) = scan(&html);
        assert!(items[0].is_placeholder_heading());
        assert_eq!(items[0].heading_level(), Some(PLACEHOLDER_HEADING_LEVEL));
        assert!(items[0].range.is_collapsed());
        assert!(items[0].range.start.node.same_node(&root));
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn no_comments_no_placeholder() {
        let (_root, items) = scan("<p>Nothing to see</p><h2>Heading</h2>");
        assert_eq!(items.len(), 1);
        assert!(!items[0].is_placeholder_heading());
    }

    #[test]
    fn table_of_contents_is_skipped() {
        let html = format!(
            r#"<div id="toc"><h2>Contents</h2></div><h2>Real</h2><p>Hi {}</p>"#,
            sig("Alice", "10:00")
        );
        let (_root, items) = scan(&html);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].range.text(), "Real");
    }

    #[test]
    fn signatures_on_one_line_merge() {
        let html = format!(
            "<h2>T</h2><p>Comment. {} <small>Addendum. {}</small></p>",
            sig("Alice", "10:00"),
            sig("Alice", "10:05")
        );
        let (_root, items) = scan(&html);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1].signature_ranges().len(), 2);
        assert_eq!(
            items[1].timestamp().unwrap().to_rfc3339(),
            "2021-05-01T10:00:00+00:00"
        );
    }

    #[test]
    fn diff_linked_signatures_merge_at_the_end_of_the_page() {
        let diff_sig = |user: &str, revision: u32, time: &str| {
            format!(
                r#"<a href="./User:{user}">{user}</a> <a href="./Special:Diff/{revision}">{time}, 1 May 2021 (UTC)</a>"#
            )
        };
        let html = format!(
            "<h2>T</h2><p>x {} y {}</p>",
            diff_sig("A", 1, "10:00"),
            diff_sig("A", 2, "10:05")
        );
        let (root, items) = scan(&html);
        assert_eq!(items.len(), 2);
        let comment = &items[1];
        assert_eq!(comment.author(), Some("A"));
        assert_eq!(comment.signature_ranges().len(), 2);
        let paragraph = root.elements_by_tag("p").remove(0);
        assert!(comment.range.end.node.same_node(&paragraph));
        assert_eq!(comment.range.end.offset, paragraph.node_length());
    }

    #[test]
    fn different_indentation_uses_smaller_level() {
        let html = format!(
            "<h2>T</h2><p>Starts here</p><dl><dd>ends indented {}</dd></dl>",
            sig("Alice", "10:00")
        );
        let (_root, items) = scan(&html);
        assert_eq!(items[1].level, 1);
        assert_eq!(items[1].warnings, vec![ItemWarning::DifferentIndentation]);
    }

    #[test]
    fn entity_spans_are_stitched() {
        let locale = LocaleData::english().with_timezone(
            "UTC",
            vec![TimezoneAbbreviation::new("U\u{a0}T\u{a0}C", "UTC")],
        );
        let options = ParserOptions::default();
        let pattern = TimestampPattern::new(&locale).unwrap();
        let resolver = TitleResolver::new(&options).unwrap();
        let root = parse_container(
            "<p>10:00, 1 May 2021 (U<span typeof=\"mw:Entity\">\u{a0}</span>T\u{a0}C)</p>",
            None,
        )
        .unwrap();
        let hits = CommentScanner::new(&pattern, &resolver, &options).find_timestamps(&root);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].found.start, 0);
        assert_eq!(hits[0].found.end, hits[0].node.node_length());
    }
}
