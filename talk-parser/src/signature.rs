//! Signature detection
//!
//! A signature is the run of sibling nodes just before a timestamp that contains a link to
//! the author's user page, user talk page or contributions. We walk backwards from the
//! timestamp, collecting siblings until the scanned text exceeds the configured limit or we
//! reach the end of the previous item. Links nested in formatting elements count too, so a
//! signature wrapped in `<span>`s is still found.
//!
//! The first user link fixes the username; later links to the same user extend the
//! signature, links to anyone else are ignored (but do not stop the walk). Trailing nodes
//! beyond the farthest matching link are dropped.

use crate::dom::NodeExt;
use crate::title::TitleResolver;
use markup5ever_rcdom::Handle;

#[derive(Debug, Clone)]
pub struct Signature {
    /// Sibling nodes, nearest to the timestamp first. The first entry holds the timestamp.
    pub nodes: Vec<Handle>,
    /// `None` when no user link was found, i.e. the timestamp is a false positive.
    pub username: Option<String>,
}

impl Signature {
    /// Node holding the timestamp (the text node, or a link wrapping it).
    pub fn timestamp_node(&self) -> &Handle {
        &self.nodes[0]
    }

    /// Farthest node of the signature.
    pub fn first_node(&self) -> &Handle {
        self.nodes.last().unwrap_or(&self.nodes[0])
    }
}

pub struct SignatureFinder<'a> {
    resolver: &'a TitleResolver,
    scan_limit: usize,
}

impl<'a> SignatureFinder<'a> {
    pub fn new(resolver: &'a TitleResolver, scan_limit: usize) -> Self {
        Self {
            resolver,
            scan_limit,
        }
    }

    /// Look for a signature ending at `timestamp`, not reaching past `until`.
    pub fn find(&self, timestamp: &Handle, until: Option<&Handle>) -> Signature {
        let mut anchor = timestamp.clone();
        // Timestamps linking to the diff that added the comment.
        if anchor.previous_sibling().is_none() && anchor.next_sibling().is_none() {
            if let Some(parent) = anchor.parent_node().filter(|p| p.has_tag(&["a"])) {
                anchor = parent;
            }
        }

        let mut nodes = vec![anchor.clone()];
        let mut username: Option<String> = None;
        let mut length = 0;
        let mut last_link_node = anchor.clone();

        let mut current = anchor.previous_sibling();
        while let Some(node) = current {
            if length >= self.scan_limit || until.is_some_and(|u| u.same_node(&node)) {
                break;
            }
            current = node.previous_sibling();
            nodes.push(node.clone());
            length += node.text_content().chars().count();
            if !node.is_element() {
                continue;
            }

            let links = if node.has_tag(&["a"]) {
                vec![node.clone()]
            } else {
                node.elements_by_tag("a")
            };
            let matched = links.iter().any(|link| {
                let Some(found) = link
                    .attr("href")
                    .and_then(|href| self.resolver.username_from_link(&href))
                else {
                    return false;
                };
                let expected = username.get_or_insert_with(|| found.clone());
                *expected == found
            });
            if matched {
                last_link_node = node;
            }
        }

        while nodes.len() > 1 && !nodes[nodes.len() - 1].same_node(&last_link_node) {
            nodes.pop();
        }
        Signature { nodes, username }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_container;
    use crate::locale::ParserOptions;

    fn paragraph(html: &str) -> Handle {
        let container = parse_container(html, None).unwrap();
        let p = container.first_child().unwrap();
        // rcdom's Drop empties descendants' child lists; keep the container alive.
        std::mem::forget(container);
        p
    }

    fn find(p: &Handle, limit: usize) -> Signature {
        let resolver = TitleResolver::new(&ParserOptions::default()).unwrap();
        let timestamp = p.last_child().unwrap();
        SignatureFinder::new(&resolver, limit).find(&timestamp, None)
    }

    #[test]
    fn finds_plain_signature() {
        let p = paragraph(
            r#"<p>Hello. <a href="./User:Alice">Alice</a> (<a href="./User_talk:Alice">talk</a>) 12:00, 1 May 2021 (UTC)</p>"#,
        );
        let signature = find(&p, 100);
        assert_eq!(signature.username.as_deref(), Some("Alice"));
        // timestamp text, "(", talk link... up to the user link
        assert_eq!(signature.nodes.len(), 4);
        assert_eq!(signature.first_node().text_content(), "Alice");
    }

    #[test]
    fn nested_links_and_vanity_links() {
        let p = paragraph(
            r#"<p>Text <span><a href="./User:Bob">Bob</a> <a href="./Wikipedia:Project">WP</a></span> <a href="./User:Carol">Carol</a> 12:00, 1 May 2021 (UTC)</p>"#,
        );
        let signature = find(&p, 100);
        // Carol's link is nearest and fixes the username; Bob's span does not extend it.
        assert_eq!(signature.username.as_deref(), Some("Carol"));
        assert_eq!(signature.first_node().text_content(), "Carol");
    }

    #[test]
    fn unsigned_timestamp_has_no_username() {
        let p = paragraph("<p>Copied from elsewhere: 12:00, 1 May 2021 (UTC)</p>");
        let signature = find(&p, 100);
        assert_eq!(signature.username, None);
        assert_eq!(signature.nodes.len(), 1);
    }

    #[test]
    fn respects_scan_limit() {
        let p = paragraph(
            r#"<p><a href="./User:Dana">Dana</a>a long stretch of text that pushes the link out of reach <b>x</b> 12:00, 1 May 2021 (UTC)</p>"#,
        );
        assert_eq!(find(&p, 10).username, None);
        assert_eq!(find(&p, 200).username.as_deref(), Some("Dana"));
    }

    #[test]
    fn timestamp_linked_to_diff() {
        let p = paragraph(
            r#"<p><a href="./User:Erin">Erin</a> <a href="./Special:Diff/123">12:00, 1 May 2021 (UTC)</a></p>"#,
        );
        let link = p.last_child().unwrap();
        let text = link.first_child().unwrap();
        let resolver = TitleResolver::new(&ParserOptions::default()).unwrap();
        let signature = SignatureFinder::new(&resolver, 100).find(&text, None);
        assert!(signature.timestamp_node().same_node(&link));
        assert_eq!(signature.username.as_deref(), Some("Erin"));
    }
}
