//! New comment events
//!
//! After an edit, the comments it added are found by comparing the thread items of the old and
//! new revision by name. Comment names come from author and timestamp, so a comment keeps its
//! name however much the text around it changes, and a new name means a new comment.
//!
//! Each event is keyed by the name of the heading the comment sits under. That is the key
//! subscriptions use, so [`locate_subscribed_users`] can fan an event out to readers.

use crate::error::ToolsResult;
use crate::subscriptions::{SubscriptionState, SubscriptionStore};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use talk_parser::{ThreadItemSet, TranscludedFrom};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCommentEvent {
    /// Subscription key; `None` for comments in the lead section.
    pub heading_name: Option<String>,
    /// Heading text, empty for the lead section.
    pub section_title: String,
    pub comment_id: String,
    pub comment_name: String,
    pub author: String,
    /// Comment text without the signature.
    pub content: String,
    pub revision_id: u64,
}

/// Comments by `author` present in `new` but not in `old`.
///
/// Comments outside any thread and comments rendered from another page are skipped: neither
/// was posted to this topic.
pub fn generate_new_comment_events(
    old: &ThreadItemSet,
    new: &ThreadItemSet,
    author: &str,
    revision_id: u64,
) -> Vec<NewCommentEvent> {
    let known: HashSet<&str> = old
        .comments()
        .into_iter()
        .filter_map(|item| item.item().name.as_deref())
        .collect();

    let mut events = Vec::new();
    for comment in new.comments() {
        let Some(name) = comment.item().name.as_deref() else {
            continue;
        };
        if comment.author() != Some(author) || known.contains(name) {
            continue;
        }
        let Some(heading) = comment.heading() else {
            tracing::debug!(comment = %name, "new comment is not in any thread");
            continue;
        };
        if comment.transcluded_from() != TranscludedFrom::No {
            tracing::debug!(comment = %name, "new comment is transcluded");
            continue;
        }

        let section_title = if heading.is_placeholder_heading() {
            String::new()
        } else {
            heading.text().trim().to_string()
        };
        events.push(NewCommentEvent {
            heading_name: heading.item().name.clone(),
            section_title,
            comment_id: comment.id.clone(),
            comment_name: name.to_string(),
            author: author.to_string(),
            content: comment.body_text(true).trim().to_string(),
            revision_id,
        });
    }
    events
}

/// Users to notify about `event`: explicit subscribers to its topic, except the author.
///
/// Auto-subscriptions are not notified until the user confirms them. Every subscription to
/// the topic gets its notified timestamp bumped.
pub fn locate_subscribed_users(
    store: &mut dyn SubscriptionStore,
    event: &NewCommentEvent,
    now: DateTime<Utc>,
) -> ToolsResult<Vec<String>> {
    let Some(topic) = event.heading_name.as_deref() else {
        return Ok(Vec::new());
    };
    let users: Vec<String> = store
        .items_for_topic(topic, &[SubscriptionState::Subscribed])?
        .into_iter()
        .map(|item| item.user)
        .filter(|user| *user != event.author)
        .collect();
    let updated = store.update_notified(topic, now)?;
    tracing::debug!(topic = %topic, users = users.len(), updated, "located subscribers");
    Ok(users)
}
