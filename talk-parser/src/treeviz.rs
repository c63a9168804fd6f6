//! Treeviz formatter for thread trees
//!
//! One line per item, nesting drawn with box characters, labels truncated to 30 characters.
//! Handy for eyeballing how a page was threaded and for snapshot tests.
//!
//!     ⧉ 2 threads
//!     ├─ § Lead section
//!     │ └─ ¶ Alice 2021-05-01 10:00: Hi all…
//!     └─ § Proposal
//!       ├─ ¶ Bob 2021-05-02 09:15: I think we sh…
//!       │ └─ ¶ Carol 2021-05-02 11:00: Agreed.
//!       └─ ⚠ Dan 2021-05-03 08:00: Late reply
//!
//! Icons
//!     Page: ⧉
//!     Heading: §
//!     Comment: ¶
//!     Comment with warnings: ⚠
//!     Unconnected comments (listed after the threads): ✂

use crate::item::{ItemRef, ThreadItemSet};
use std::collections::HashMap;

fn truncate(s: &str, max_chars: usize) -> String {
    let s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() > max_chars {
        let mut truncated = s.chars().take(max_chars).collect::<String>();
        truncated.push('…');
        truncated
    } else {
        s
    }
}

fn label(item: &ItemRef<'_>) -> String {
    if item.is_placeholder_heading() {
        return "Lead section".to_string();
    }
    match (item.author(), item.timestamp()) {
        (Some(author), Some(timestamp)) => format!(
            "{} {}: {}",
            author,
            timestamp.format("%Y-%m-%d %H:%M"),
            truncate(&item.body_text(true), 30)
        ),
        _ => truncate(&item.text(), 30),
    }
}

fn icon(item: &ItemRef<'_>) -> &'static str {
    if item.is_heading() {
        "§"
    } else if item.warnings.is_empty() {
        "¶"
    } else {
        "⚠"
    }
}

fn format_item(
    item: ItemRef<'_>,
    prefix: &str,
    is_last: bool,
    show_ids: bool,
    output: &mut String,
) {
    let connector = if is_last { "└─" } else { "├─" };
    let id = if show_ids {
        format!(" #{}", item.id)
    } else {
        String::new()
    };
    output.push_str(&format!(
        "{}{} {} {}{}\n",
        prefix,
        connector,
        icon(&item),
        label(&item),
        id
    ));

    let replies = item.replies();
    let child_prefix = format!("{}{}", prefix, if is_last { "  " } else { "│ " });
    let count = replies.len();
    for (i, reply) in replies.into_iter().enumerate() {
        format_item(reply, &child_prefix, i == count - 1, show_ids, output);
    }
}

pub fn to_treeviz_str(set: &ThreadItemSet) -> String {
    to_treeviz_str_with_params(set, &HashMap::new())
}

pub fn to_treeviz_str_with_params(set: &ThreadItemSet, params: &HashMap<String, String>) -> String {
    let show_ids = params
        .get("show-ids")
        .map(|v| v != "false")
        .unwrap_or(false);

    let threads = set.threads();
    let unconnected: Vec<ItemRef<'_>> = set
        .comments()
        .into_iter()
        .filter(|item| item.parent().is_none())
        .collect();

    let noun = if threads.len() == 1 { "thread" } else { "threads" };
    let mut output = format!("⧉ {} {}\n", threads.len(), noun);
    let total = threads.len() + usize::from(!unconnected.is_empty());
    for (i, thread) in threads.into_iter().enumerate() {
        format_item(thread, "", i == total - 1, show_ids, &mut output);
    }
    if !unconnected.is_empty() {
        output.push_str(&format!("└─ ✂ {} unconnected\n", unconnected.len()));
        let count = unconnected.len();
        for (i, item) in unconnected.into_iter().enumerate() {
            format_item(item, "  ", i == count - 1, show_ids, &mut output);
        }
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_and_collapses_whitespace() {
        assert_eq!(truncate("a\n  b", 30), "a b");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
