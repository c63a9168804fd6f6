//! Reply threading
//!
//! Turns the scanner's flat list into trees rooted at headings. The rule is greedy: a comment
//! at level `n` replies to the most recent item at level `n - 1`. A table holds the latest item
//! seen at each level; it is cut back whenever a shallower item appears.
//!
//! Wikitext indentation is often sloppy, so two cases are tolerated rather than rejected:
//!
//!     skipped levels     The latest item is repeated over the missing levels, as if it was
//!                        indented that deep; the comment gets a warning and still attaches.
//!     no parent          A comment whose `n - 1` slot is empty (only possible when the list
//!                        does not start with a heading) stays out of the tree and is only
//!                        reported through its warning.
//!
//! Names and ids are assigned here too, in discovery order.

use crate::item::{ItemWarning, ThreadItem, ThreadItemSet};
use chrono::{DateTime, Utc};
use markup5ever_rcdom::Handle;
use std::collections::HashSet;

pub struct ThreadBuilder;

impl ThreadBuilder {
    pub fn build(mut items: Vec<ThreadItem>, container: Handle) -> ThreadItemSet {
        assign_identity(&mut items);

        let mut threads = Vec::new();
        let mut latest: Vec<Option<usize>> = Vec::new();
        for index in 0..items.len() {
            let level = items[index].level;
            if latest.len() < level {
                items[index].push_warning(ItemWarning::SkipsIndentation);
                while latest.len() < level {
                    let deepest = latest.last().copied().flatten();
                    latest.push(deepest);
                }
            }

            if items[index].is_heading() {
                threads.push(index);
            } else if let Some(parent) = level.checked_sub(1).and_then(|l| latest[l]) {
                items[index].parent = Some(parent);
                items[parent].replies.push(index);
            } else {
                tracing::warn!(id = %items[index].id, "comment could not be connected to a thread");
                items[index].push_warning(ItemWarning::Unconnected);
            }

            latest.truncate(level);
            latest.push(Some(index));
        }

        name_headings(&mut items);
        ThreadItemSet::new(items, threads, container)
    }
}

/// `YYYYMMDDHHMMSS`, the sortable form used in names.
pub fn timestamp_key(timestamp: &DateTime<Utc>) -> String {
    timestamp.format("%Y%m%d%H%M%S").to_string()
}

fn author_key(author: &str) -> String {
    author.replace(' ', "_")
}

fn assign_identity(items: &mut [ThreadItem]) {
    let mut used: HashSet<String> = HashSet::new();
    for (index, item) in items.iter_mut().enumerate() {
        let (Some(author), Some(timestamp)) = (item.author(), item.timestamp()) else {
            item.id = format!("dt-h-{}", index);
            continue;
        };
        // Several comments by one user within a minute get sequence numbers.
        let base = format!("c-{}-{}", author_key(author), timestamp_key(&timestamp));
        let mut sequence = 0;
        while used.contains(&format!("{}-{}", base, sequence)) {
            sequence += 1;
        }
        let name = format!("{}-{}", base, sequence);
        used.insert(name.clone());
        item.name = Some(name);
        item.id = format!("dt-c-{}", index);
    }
}

/// Headings are named after the oldest comment below them, which stays put when the heading
/// text is edited. The lead section placeholder and empty sections have no name.
fn name_headings(items: &mut [ThreadItem]) {
    for index in 0..items.len() {
        if !items[index].is_heading() || items[index].is_placeholder_heading() {
            continue;
        }
        let mut oldest: Option<(DateTime<Utc>, String)> = None;
        let mut stack = items[index].replies.clone();
        while let Some(below) = stack.pop() {
            stack.extend(items[below].replies.iter().copied());
            let (Some(author), Some(timestamp)) = (items[below].author(), items[below].timestamp())
            else {
                continue;
            };
            let older = oldest
                .as_ref()
                .map_or(true, |(best, _)| timestamp < *best);
            if older {
                oldest = Some((timestamp, author.to_string()));
            }
        }
        items[index].name = oldest.map(|(timestamp, author)| {
            format!("h-{}-{}", author_key(&author), timestamp_key(&timestamp))
        });
    }
}
