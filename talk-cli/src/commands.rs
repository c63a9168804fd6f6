//! CLI commands
//!
//! Each command takes page sources and the loaded configuration and returns the text to print,
//! so `main` only deals with arguments and exit codes.

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};
use talk_config::TalkConfig;
use talk_parser::treeviz::to_treeviz_str;
use talk_parser::{CommentParser, ItemRef, ThreadItemSet};
use talk_tools::events::generate_new_comment_events;
use talk_tools::postprocess::{postprocess_reply_buttons, postprocess_subscriptions};
use talk_tools::subscriptions::InMemorySubscriptionStore;
use talk_tools::{Annotator, Labels};

/// Output formats of `talk threads`.
pub const THREAD_FORMATS: &[&str] = &["tree", "json", "records", "diagnostics"];

fn parser(config: &TalkConfig) -> Result<CommentParser> {
    CommentParser::new(&config.locale, config.parser.clone())
        .context("Invalid locale configuration")
}

fn parse(source: &str, config: &TalkConfig) -> Result<ThreadItemSet> {
    let set = parser(config)?.parse_html(source, config.render.container_id())?;
    Ok(set)
}

fn item_json(item: ItemRef<'_>) -> Value {
    let mut value = json!({
        "type": item.type_name(),
        "id": item.id,
        "level": item.level,
    });
    if let Some(name) = &item.item().name {
        value["name"] = json!(name);
    }
    if item.is_heading() {
        value["title"] = json!(item.text().trim());
        value["placeholderHeading"] = json!(item.is_placeholder_heading());
    } else {
        value["author"] = json!(item.author());
        value["timestamp"] = json!(item.timestamp().map(|t| t.to_rfc3339()));
        value["text"] = json!(item.body_text(true).trim());
    }
    value["replies"] = Value::Array(item.replies().into_iter().map(item_json).collect());
    value
}

/// Parse a page and render its threads in one of [`THREAD_FORMATS`].
pub fn threads(source: &str, config: &TalkConfig, format: &str) -> Result<String> {
    let set = parse(source, config)?;
    tracing::info!(items = set.len(), threads = set.threads().len(), "parsed page");

    match format {
        "tree" => Ok(to_treeviz_str(&set)),
        "json" => {
            let threads: Vec<Value> = set.threads().into_iter().map(item_json).collect();
            Ok(serde_json::to_string_pretty(&threads)?)
        }
        "records" => Ok(serde_json::to_string_pretty(&set.to_records()?)?),
        "diagnostics" => Ok(set
            .diagnostics()
            .iter()
            .map(|diagnostic| format!("{}\n", diagnostic))
            .collect()),
        other => bail!(
            "Format '{}' not supported (available: {})",
            other,
            THREAD_FORMATS.join(", ")
        ),
    }
}

/// Annotate a page, optionally filling in the buttons an anonymous reader would see.
pub fn annotate(source: &str, config: &TalkConfig, postprocess: bool) -> Result<String> {
    let mut annotator = Annotator::new(parser(config)?);
    if let Some(id) = config.render.container_id() {
        annotator = annotator.with_container_id(id);
    }
    let html = annotator.annotate(source);
    if !postprocess {
        return Ok(html);
    }

    let labels = Labels {
        reply: config.render.reply_label.clone(),
        subscribe: config.render.subscribe_label.clone(),
        unsubscribe: config.render.unsubscribe_label.clone(),
    };
    let html = postprocess_reply_buttons(&html, &labels)?;
    let store = InMemorySubscriptionStore::new();
    Ok(postprocess_subscriptions(&html, &labels, &store, None)?)
}

/// Comments `author` added between two revisions of a page, as JSON events.
pub fn new_comments(
    old: &str,
    new: &str,
    config: &TalkConfig,
    author: &str,
    revision_id: u64,
) -> Result<String> {
    let old = parse(old, config).context("Failed to parse the old revision")?;
    let new = parse(new, config).context("Failed to parse the new revision")?;
    let events = generate_new_comment_events(&old, &new, author, revision_id);
    tracing::info!(author = %author, events = events.len(), "compared revisions");
    Ok(serde_json::to_string_pretty(&events)?)
}
