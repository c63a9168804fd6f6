//! Annotation pass
//!
//! Marks every thread item in the page so that the client side (and a later view, through
//! [`ThreadItemSet::from_records`]) can find it again without scanning:
//!
//!     <span id="dt-c-3" data-mw-comment-start="dt-c-3"></span>
//!     ...comment content and signature...
//!     <span data-mw-comment-end="dt-c-3"></span>
//!     <span class="dt-init-replylink-buttons" data-mw-comment='{record}'><!--__DTREPLYBUTTONS__--></span>
//!
//! Headings carry their record on the heading element itself, plus a
//! `<!--__DTSUBSCRIBE__name-->` placeholder when they can be subscribed to. Placeholders are
//! swapped for real buttons per request by [`crate::postprocess`].
//!
//! Marker insertion splits text nodes and adds siblings, which would shift boundaries computed
//! before the pass. Items are therefore processed last-discovered first, and within an item
//! the end marker goes in before the start marker: every insertion only ever happens after
//! the boundaries still waiting to be used.
//!
//! [`ThreadItemSet::from_records`]: talk_parser::item::ThreadItemSet::from_records

use crate::error::ToolsResult;
use markup5ever_rcdom::Handle;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use talk_parser::dom::range::{insert_node, BoundaryPoint, DomRange};
use talk_parser::dom::{
    create_comment, create_element, find_container, inner_html, outer_html, parse_html,
    NodeExt, COMMENT_DATA_ATTR, COMMENT_END_ATTR, COMMENT_START_ATTR, REPLY_BUTTONS_CLASS,
};
use talk_parser::{CommentParser, ItemRef, ThreadItemRecord};

pub const REPLY_BUTTONS_PLACEHOLDER: &str = "__DTREPLYBUTTONS__";
pub const SUBSCRIBE_PLACEHOLDER: &str = "__DTSUBSCRIBE__";

/// Characters escaped in item names embedded in HTML comments.
pub(crate) const NAME_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

type Guard = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Default guard: the page already carries start markers.
pub fn is_annotated(html: &str) -> bool {
    html.contains(COMMENT_START_ATTR)
}

pub struct Annotator {
    parser: CommentParser,
    container_id: Option<String>,
    already_processed: Guard,
}

impl Annotator {
    pub fn new(parser: CommentParser) -> Self {
        Self {
            parser,
            container_id: None,
            already_processed: Box::new(is_annotated),
        }
    }

    /// Annotate inside the element with this id and return the whole document, instead of
    /// treating the input as the contents of `body`.
    pub fn with_container_id(mut self, id: impl Into<String>) -> Self {
        self.container_id = Some(id.into());
        self
    }

    /// Replace the check deciding that a page has been annotated before.
    pub fn with_guard(mut self, guard: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.already_processed = Box::new(guard);
        self
    }

    pub fn parser(&self) -> &CommentParser {
        &self.parser
    }

    /// Annotate `html`, falling back to the input unchanged when anything goes wrong: a page
    /// without discussion tools is better than a half-annotated one.
    pub fn annotate(&self, html: &str) -> String {
        match self.try_annotate(html) {
            Ok(annotated) => annotated,
            Err(error) => {
                let correlation_id = uuid::Uuid::new_v4();
                tracing::error!(
                    correlation_id = %correlation_id,
                    error = %error,
                    "annotation failed, serving the page unannotated"
                );
                html.to_string()
            }
        }
    }

    pub fn try_annotate(&self, html: &str) -> ToolsResult<String> {
        if (self.already_processed)(html) {
            tracing::debug!("page already annotated, leaving it alone");
            return Ok(html.to_string());
        }

        let dom = parse_html(html);
        let container = find_container(&dom, self.container_id.as_deref())?;
        let set = self.parser.parse(container.clone())?;
        // Offset paths in the records refer to the unmarked page.
        let records = set.to_records()?;

        for (item, record) in set.iter().rev().zip(records.iter().rev()) {
            annotate_item(item, record, &container)?;
        }
        tracing::debug!(items = set.len(), "annotated page");

        Ok(match self.container_id {
            Some(_) => outer_html(&dom.document)?,
            None => inner_html(&container)?,
        })
    }
}

fn annotate_item(item: ItemRef<'_>, record: &ThreadItemRecord, container: &Handle) -> ToolsResult<()> {
    let range = if item.is_placeholder_heading() {
        let anchor = create_element("span", &[]);
        container.insert_child(0, anchor.clone());
        DomRange::collapsed(BoundaryPoint::new(anchor, 0))
    } else {
        item.range.widen_out_of_childless()
    };

    let end_marker = create_element("span", &[(COMMENT_END_ATTR, item.id.as_str())]);
    insert_node(&range.end, end_marker.clone())?;
    let start_marker = create_element(
        "span",
        &[("id", item.id.as_str()), (COMMENT_START_ATTR, item.id.as_str())],
    );
    insert_node(&range.start, start_marker)?;

    let json = record.to_json()?;
    if item.is_heading() {
        let heading = &range.end.node;
        heading.set_attr(COMMENT_DATA_ATTR, &json);
        if let Some(name) = &item.name {
            let escaped = utf8_percent_encode(name, NAME_ESCAPES).to_string();
            heading.append_child(create_comment(&format!("{}{}", SUBSCRIBE_PLACEHOLDER, escaped)));
        }
    } else {
        let buttons = create_element(
            "span",
            &[("class", REPLY_BUTTONS_CLASS), (COMMENT_DATA_ATTR, json.as_str())],
        );
        buttons.append_child(create_comment(REPLY_BUTTONS_PLACEHOLDER));
        end_marker.insert_after(buttons);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotator() -> Annotator {
        Annotator::new(CommentParser::english().unwrap())
    }

    const PAGE: &str = r#"<h2>Topic</h2><p>Hi <a href="./User:Alice">Alice</a> 10:00, 1 May 2021 (UTC)</p>"#;

    #[test]
    fn marks_headings_and_comments() {
        let html = annotator().try_annotate(PAGE).unwrap();
        assert!(html.starts_with(
            r#"<h2 data-mw-comment="{&quot;type&quot;:&quot;heading&quot;,&quot;id&quot;:&quot;dt-h-0&quot;"#
        ));
        assert!(html.contains(
            r#"<span id="dt-h-0" data-mw-comment-start="dt-h-0"></span>Topic<span data-mw-comment-end="dt-h-0"></span><!--__DTSUBSCRIBE__h-Alice-20210501100000--></h2>"#
        ));
        assert!(html.contains(
            r#"<p><span id="dt-c-1" data-mw-comment-start="dt-c-1"></span>Hi <a href="./User:Alice">Alice</a> 10:00, 1 May 2021 (UTC)<span data-mw-comment-end="dt-c-1"></span><span class="dt-init-replylink-buttons""#
        ));
        assert!(html.contains("<!--__DTREPLYBUTTONS__--></span></p>"));
    }

    #[test]
    fn placeholder_heading_gets_an_anchor_span() {
        let page = r#"<p>Lead <a href="./User:Alice">Alice</a> 10:00, 1 May 2021 (UTC)</p>"#;
        let html = annotator().try_annotate(page).unwrap();
        assert!(html.starts_with(
            r#"<span data-mw-comment="{&quot;type&quot;:&quot;heading&quot;,&quot;id&quot;:&quot;dt-h-0&quot;"#
        ));
        assert!(html.contains(
            r#"><span id="dt-h-0" data-mw-comment-start="dt-h-0"></span><span data-mw-comment-end="dt-h-0"></span></span><p>"#
        ));
        assert!(!html.contains(SUBSCRIBE_PLACEHOLDER));
    }

    #[test]
    fn guard_passes_annotated_pages_through() {
        let annotator = annotator();
        let once = annotator.annotate(PAGE);
        assert_eq!(annotator.annotate(&once), once);

        let never = Annotator::new(CommentParser::english().unwrap()).with_guard(|_| true);
        assert_eq!(never.annotate(PAGE), PAGE);
    }

    #[test]
    fn missing_container_falls_back_to_input() {
        let annotator = annotator().with_container_id("mw-content-text");
        assert!(annotator.try_annotate(PAGE).is_err());
        assert_eq!(annotator.annotate(PAGE), PAGE);
    }

    #[test]
    fn names_are_escaped_in_placeholders() {
        assert_eq!(
            utf8_percent_encode("h-Zoë_Q-20210501100000", NAME_ESCAPES).to_string(),
            "h-Zo%C3%AB_Q-20210501100000"
        );
    }
}
