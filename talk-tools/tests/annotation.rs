//! Annotating verified fixtures and reading them back
//!
//! The records embedded by the annotation pass, together with the markers, must be enough to
//! rebuild the thread tree of the page without scanning it again.

use talk_parser::dom::parse_container;
use talk_parser::testing::Fixtures;
use talk_parser::{collect_records, CommentParser, ThreadItemSet};
use talk_tools::postprocess::{postprocess_reply_buttons, postprocess_subscriptions};
use talk_tools::subscriptions::{InMemorySubscriptionStore, SubscriptionStore};
use talk_tools::{Annotator, Labels};

/// Fixtures and the container each one is parsed in.
const PAGES: &[(usize, Option<&str>)] = &[
    (1, None),
    (2, Some("mw-content-text")),
    (3, None),
    (4, None),
    (5, None),
    (6, None),
    (7, None),
];

fn annotator(container: Option<&str>) -> Annotator {
    let annotator = Annotator::new(CommentParser::english().unwrap());
    match container {
        Some(id) => annotator.with_container_id(id),
        None => annotator,
    }
}

fn rebuild(annotated: &str, container: Option<&str>) -> ThreadItemSet {
    let container = parse_container(annotated, container).unwrap();
    let records = collect_records(&container).unwrap();
    ThreadItemSet::from_records(records, container).unwrap()
}

type Shape = (String, usize, Option<String>, Option<String>, Vec<String>);

fn shape(set: &ThreadItemSet) -> Vec<(String, Shape)> {
    set.iter()
        .map(|item| {
            let replies = item.replies().iter().map(|reply| reply.id.clone()).collect();
            (
                item.id.clone(),
                (
                    item.type_name().to_string(),
                    item.level,
                    item.author().map(str::to_string),
                    item.timestamp().map(|t| t.to_rfc3339()),
                    replies,
                ),
            )
        })
        .collect()
}

#[test]
fn records_rebuild_the_thread_tree() {
    for &(number, container) in PAGES {
        let loader = match container {
            Some(id) => Fixtures::page(number).in_container(id),
            None => Fixtures::page(number),
        };
        let original = loader.parse();
        let annotated = annotator(container).try_annotate(&loader.source()).unwrap();
        let rebuilt = rebuild(&annotated, container);
        assert_eq!(shape(&rebuilt), shape(&original), "page #{}", number);
    }
}

#[test]
fn rebuilt_ranges_cover_the_comment_text() {
    let source = Fixtures::page(1).source();
    let rebuilt = rebuild(&annotator(None).try_annotate(&source).unwrap(), None);
    let bob = rebuilt.find_by_name("c-Bob-20210501100000-0").unwrap();
    assert_eq!(
        bob.text().trim(),
        "B. Bob (talk) 10:00, 1 May 2021 (UTC)"
    );
    assert_eq!(bob.parent().unwrap().id, "dt-h-0");
    assert!(bob.signature_ranges().is_empty());
}

#[test]
fn annotation_is_idempotent() {
    for &(number, container) in PAGES {
        let annotator = annotator(container);
        let once = annotator.annotate(&Fixtures::page(number).source());
        assert_eq!(annotator.annotate(&once), once, "page #{}", number);
    }
}

#[test]
fn every_item_gets_markers() {
    let source = Fixtures::page(3).source();
    let annotated = annotator(None).try_annotate(&source).unwrap();
    for id in ["dt-h-0", "dt-c-1", "dt-c-2", "dt-c-3"] {
        assert!(annotated.contains(&format!(r#"data-mw-comment-start="{}""#, id)), "{}", id);
        assert!(annotated.contains(&format!(r#"data-mw-comment-end="{}""#, id)), "{}", id);
    }
    assert_eq!(annotated.matches("<!--__DTREPLYBUTTONS__-->").count(), 3);
    assert_eq!(annotated.matches("<!--__DTSUBSCRIBE__").count(), 1);
}

#[test]
fn annotated_page_postprocesses_for_a_reader() {
    let source = Fixtures::page(1).source();
    let annotated = annotator(None).annotate(&source);

    let mut store = InMemorySubscriptionStore::new();
    let now = chrono::Utc::now();
    store
        .add("Carol", "Talk:Example", "h-Bob-20210501100000", now)
        .unwrap();

    let labels = Labels::default();
    let html = postprocess_reply_buttons(&annotated, &labels).unwrap();
    let html = postprocess_subscriptions(&html, &labels, &store, Some("Carol")).unwrap();
    assert_eq!(html.matches(">reply</a>").count(), 3);
    assert!(html.contains(
        r#"data-mw-subscribe-name="h-Bob-20210501100000" data-mw-subscribed="1">unsubscribe</a>"#
    ));
    assert!(!html.contains("__DT"));
    assert_eq!(store.items_for_user("Carol", None).unwrap().len(), 1);
}

#[test]
fn rebuilt_shape_of_a_basic_thread() {
    let source = Fixtures::page(1).source();
    let rebuilt = rebuild(&annotator(None).try_annotate(&source).unwrap(), None);
    insta::assert_debug_snapshot!(shape(&rebuilt), @r#"
    [
        (
            "dt-h-0",
            (
                "heading",
                0,
                None,
                None,
                [
                    "dt-c-1",
                ],
            ),
        ),
        (
            "dt-c-1",
            (
                "comment",
                1,
                Some(
                    "Bob",
                ),
                Some(
                    "2021-05-01T10:00:00+00:00",
                ),
                [
                    "dt-c-2",
                ],
            ),
        ),
        (
            "dt-c-2",
            (
                "comment",
                2,
                Some(
                    "Carol",
                ),
                Some(
                    "2021-05-01T11:00:00+00:00",
                ),
                [
                    "dt-c-3",
                ],
            ),
        ),
        (
            "dt-c-3",
            (
                "comment",
                3,
                Some(
                    "Dave",
                ),
                Some(
                    "2021-05-01T12:00:00+00:00",
                ),
                [],
            ),
        ),
    ]
    "#);
}
