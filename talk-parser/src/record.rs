//! Compact item records
//!
//! The annotation pass embeds one JSON record per item in the rendered page so a later view can
//! rebuild the thread tree without scanning again. Records reference other items by id only;
//! DOM positions are never serialized as node references. On the way back in, ranges are
//! rebuilt from the marker elements the annotation pass inserted:
//!
//!     start marker    <span id="ID" data-mw-comment-start="ID">   range starts right after it
//!     end marker      <span data-mw-comment-end="ID">             range ends inside it
//!
//! Readers must tolerate records written by older and newer versions: unknown fields are
//! ignored and missing fields take their defaults.

use crate::dom::range::{offset_path, BoundaryPoint, DomRange};
use crate::dom::{descendants, NodeExt, COMMENT_DATA_ATTR, COMMENT_END_ATTR, COMMENT_START_ATTR};
use crate::error::{ParserError, ParserResult};
use crate::item::{ItemKind, ItemRef, ItemWarning, ThreadItem, ThreadItemSet};
use chrono::{DateTime, SecondsFormat, Utc};
use markup5ever_rcdom::Handle;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThreadItemRecord {
    #[serde(rename = "type")]
    pub item_type: String,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub level: usize,
    /// Start and end as offset paths relative to the container, taken before annotation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signature_ranges: Vec<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heading_level: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder_heading: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ItemWarning>,
    pub replies: Vec<String>,
}

fn path_pair(container: &Handle, range: &DomRange) -> ParserResult<(String, String)> {
    Ok((
        offset_path(container, &range.start)?,
        offset_path(container, &range.end)?,
    ))
}

impl ThreadItemRecord {
    pub fn from_item(item: ItemRef<'_>) -> ParserResult<Self> {
        let container = item.set().container();
        let mut record = ThreadItemRecord {
            item_type: item.type_name().to_string(),
            id: item.id.clone(),
            name: item.name.clone(),
            level: item.level,
            range: Some(path_pair(container, &item.range)?),
            warnings: item.warnings.clone(),
            replies: item.replies().iter().map(|reply| reply.id.clone()).collect(),
            ..Default::default()
        };
        match &item.kind {
            ItemKind::Heading {
                heading_level,
                placeholder,
            } => {
                record.heading_level = Some(*heading_level);
                record.placeholder_heading = placeholder.then_some(true);
            }
            ItemKind::Comment {
                timestamp,
                author,
                signature_ranges,
            } => {
                record.timestamp = Some(timestamp.to_rfc3339_opts(SecondsFormat::Millis, true));
                record.author = Some(author.clone());
                record.signature_ranges = signature_ranges
                    .iter()
                    .map(|range| path_pair(container, range))
                    .collect::<ParserResult<_>>()?;
            }
        }
        Ok(record)
    }

    pub fn to_json(&self) -> ParserResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> ParserResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    fn parsed_timestamp(&self) -> ParserResult<DateTime<Utc>> {
        let raw = self
            .timestamp
            .as_deref()
            .ok_or_else(|| ParserError::InvalidRecord(format!("{} has no timestamp", self.id)))?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| ParserError::InvalidRecord(format!("{}: {}", self.id, e)))
    }
}

impl ThreadItemSet {
    /// Records for every item, in discovery order.
    pub fn to_records(&self) -> ParserResult<Vec<ThreadItemRecord>> {
        self.iter().map(ThreadItemRecord::from_item).collect()
    }

    /// Rebuild a set from records and an annotated container.
    ///
    /// Ranges come from the markers in `container`. Signature ranges are not reconstructed: the
    /// markers only delimit whole items, so rebuilt comments carry an empty list.
    pub fn from_records(records: Vec<ThreadItemRecord>, container: Handle) -> ParserResult<Self> {
        let markers = Markers::collect(&container);
        let index_by_id: HashMap<&str, usize> = records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.id.as_str(), index))
            .collect();

        let mut items = Vec::with_capacity(records.len());
        for record in &records {
            let range = markers.range(&record.id)?;
            let mut item = match record.item_type.as_str() {
                "heading" => ThreadItem::heading(
                    range,
                    record.heading_level.unwrap_or(2),
                    record.placeholder_heading.unwrap_or(false),
                ),
                "comment" => ThreadItem::comment(
                    range,
                    record.level,
                    record.parsed_timestamp()?,
                    record.author.clone().unwrap_or_default(),
                    Vec::new(),
                ),
                other => {
                    return Err(ParserError::InvalidRecord(format!(
                        "unknown item type `{}`",
                        other
                    )))
                }
            };
            item.id = record.id.clone();
            item.name = record.name.clone();
            item.warnings = record.warnings.clone();
            items.push(item);
        }

        for (index, record) in records.iter().enumerate() {
            for reply_id in &record.replies {
                let reply = *index_by_id.get(reply_id.as_str()).ok_or_else(|| {
                    ParserError::InvalidRecord(format!("unknown reply id `{}`", reply_id))
                })?;
                items[index].replies.push(reply);
                items[reply].parent = Some(index);
            }
        }

        let threads = items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_heading())
            .map(|(index, _)| index)
            .collect();
        Ok(ThreadItemSet::new(items, threads, container))
    }
}

/// Every record embedded below `container`, in document order.
pub fn collect_records(container: &Handle) -> ParserResult<Vec<ThreadItemRecord>> {
    descendants(container)
        .iter()
        .filter_map(|node| node.attr(COMMENT_DATA_ATTR))
        .map(|json| ThreadItemRecord::from_json(&json))
        .collect()
}

struct Markers {
    starts: HashMap<String, Handle>,
    ends: HashMap<String, Handle>,
}

impl Markers {
    fn collect(container: &Handle) -> Self {
        let mut starts = HashMap::new();
        let mut ends = HashMap::new();
        for node in descendants(container) {
            if node.has_attr(COMMENT_START_ATTR) {
                if let Some(id) = node.attr("id") {
                    starts.insert(id, node.clone());
                }
            }
            if let Some(id) = node.attr(COMMENT_END_ATTR) {
                ends.insert(id, node);
            }
        }
        Self { starts, ends }
    }

    fn range(&self, id: &str) -> ParserResult<DomRange> {
        let missing = |which: &str| {
            ParserError::UnresolvableBoundary(format!("no {} marker for `{}`", which, id))
        };
        let start = self.starts.get(id).ok_or_else(|| missing("start"))?;
        let end = self.ends.get(id).ok_or_else(|| missing("end"))?;
        let start = BoundaryPoint::after(start).ok_or_else(|| missing("attached start"))?;
        Ok(DomRange::new(start, BoundaryPoint::new(end.clone(), 0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tolerates_unknown_and_missing_fields() {
        let json = r#"{"type":"comment","id":"dt-c-1","level":2,"author":"Alice",
            "timestamp":"2021-05-01T10:00:00.000Z","replies":[],"futureField":{"x":1}}"#;
        let record = ThreadItemRecord::from_json(json).unwrap();
        assert_eq!(record.level, 2);
        assert_eq!(record.name, None);
        assert!(record.signature_ranges.is_empty());
        assert_eq!(
            record.parsed_timestamp().unwrap().to_rfc3339(),
            "2021-05-01T10:00:00+00:00"
        );
    }

    #[test]
    fn omits_fields_that_do_not_apply() {
        let record = ThreadItemRecord {
            item_type: "heading".to_string(),
            id: "dt-h-0".to_string(),
            heading_level: Some(2),
            ..Default::default()
        };
        assert_eq!(
            record.to_json().unwrap(),
            r#"{"type":"heading","id":"dt-h-0","level":0,"headingLevel":2,"replies":[]}"#
        );
    }
}
