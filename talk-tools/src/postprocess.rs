//! Per-request placeholder substitution
//!
//! The annotated page is cacheable and identical for every reader; what differs per reader
//! (button labels in their language, which topics they follow) is filled in here by plain text
//! substitution over the placeholders left by [`crate::annotate`]. Subscription state must be
//! fetched up front: one store query per page, not per heading.

use crate::annotate::{REPLY_BUTTONS_PLACEHOLDER, SUBSCRIBE_PLACEHOLDER};
use crate::error::ToolsResult;
use crate::subscriptions::{SubscriptionState, SubscriptionStore};
use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::{Captures, NoExpand, Regex};
use std::collections::HashSet;
use talk_parser::dom::{create_element, create_text, outer_html, NodeExt};
use talk_parser::ParserResult;

static REPLY_BUTTONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("<!--{}-->", regex::escape(REPLY_BUTTONS_PLACEHOLDER)))
        .expect("static regex")
});

static SUBSCRIBE_BUTTON: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("<!--{}(.*?)-->", regex::escape(SUBSCRIBE_PLACEHOLDER)))
        .expect("static regex")
});

/// Interface messages, already in the reader's language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Labels {
    pub reply: String,
    pub subscribe: String,
    pub unsubscribe: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            reply: "reply".to_string(),
            subscribe: "subscribe".to_string(),
            unsubscribe: "unsubscribe".to_string(),
        }
    }
}

fn reply_button_html(label: &str) -> ParserResult<String> {
    let bracket = |text: &str| {
        let span = create_element("span", &[("class", "dt-init-replylink-bracket")]);
        span.append_child(create_text(text));
        outer_html(&span)
    };
    let link = create_element(
        "a",
        &[
            ("class", "dt-init-replylink-reply"),
            ("role", "button"),
            ("tabindex", "0"),
        ],
    );
    link.append_child(create_text(label));
    Ok(format!("{}{}{}", bracket("[")?, outer_html(&link)?, bracket("]")?))
}

fn subscribe_button_html(name: &str, subscribed: bool, labels: &Labels) -> ParserResult<String> {
    let wrapper = create_element("span", &[("class", "dt-init-section-subscribe")]);
    let link = create_element(
        "a",
        &[
            ("class", "dt-init-section-subscribe-link"),
            ("role", "button"),
            ("tabindex", "0"),
            ("data-mw-subscribe-name", name),
            ("data-mw-subscribed", if subscribed { "1" } else { "0" }),
        ],
    );
    let label = if subscribed {
        &labels.unsubscribe
    } else {
        &labels.subscribe
    };
    link.append_child(create_text(label));
    wrapper.append_child(link);
    outer_html(&wrapper)
}

/// Replace every reply placeholder with a reply button.
pub fn postprocess_reply_buttons(html: &str, labels: &Labels) -> ToolsResult<String> {
    let button = reply_button_html(&labels.reply)?;
    Ok(REPLY_BUTTONS
        .replace_all(html, NoExpand(&button))
        .into_owned())
}

/// Heading names referenced by subscribe placeholders, in page order.
pub fn subscribable_names(html: &str) -> Vec<String> {
    SUBSCRIBE_BUTTON
        .captures_iter(html)
        .map(|caps| decode_name(&caps[1]))
        .collect()
}

fn decode_name(escaped: &str) -> String {
    percent_decode_str(escaped).decode_utf8_lossy().into_owned()
}

/// Replace subscribe placeholders with buttons reflecting `user`'s subscriptions. Anonymous
/// readers cannot subscribe, so for them the placeholders are simply removed.
pub fn postprocess_subscriptions(
    html: &str,
    labels: &Labels,
    store: &dyn SubscriptionStore,
    user: Option<&str>,
) -> ToolsResult<String> {
    let Some(user) = user else {
        return Ok(SUBSCRIBE_BUTTON.replace_all(html, "").into_owned());
    };

    let names = subscribable_names(html);
    if names.is_empty() {
        return Ok(html.to_string());
    }
    let subscribed: HashSet<String> = store
        .items_for_user(user, Some(&names))?
        .into_iter()
        .filter(|item| item.state == SubscriptionState::Subscribed)
        .map(|item| item.item_name)
        .collect();
    tracing::debug!(
        user = %user,
        headings = names.len(),
        subscribed = subscribed.len(),
        "rendering subscribe buttons"
    );

    let mut failure = None;
    let output = SUBSCRIBE_BUTTON.replace_all(html, |caps: &Captures| {
        let name = decode_name(&caps[1]);
        match subscribe_button_html(&name, subscribed.contains(&name), labels) {
            Ok(button) => button,
            Err(error) => {
                failure.get_or_insert(error);
                String::new()
            }
        }
    });
    match failure {
        Some(error) => Err(error.into()),
        None => Ok(output.into_owned()),
    }
}
