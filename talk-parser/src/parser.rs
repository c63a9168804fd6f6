//! Parser entry point
//!
//! [`CommentParser`] bundles what is built once per wiki (the timestamp pattern for its locale
//! and the title resolver for its link layout) and runs the scan and threading passes over any
//! number of pages.

use crate::dom::parse_container;
use crate::error::ParserResult;
use crate::item::ThreadItemSet;
use crate::locale::{LocaleData, ParserOptions};
use crate::scanner::CommentScanner;
use crate::threading::ThreadBuilder;
use crate::timestamp::TimestampPattern;
use crate::title::TitleResolver;
use markup5ever_rcdom::Handle;

pub struct CommentParser {
    pattern: TimestampPattern,
    resolver: TitleResolver,
    options: ParserOptions,
}

impl CommentParser {
    /// Fails on locale data the timestamp pattern cannot be built from.
    pub fn new(locale: &LocaleData, options: ParserOptions) -> ParserResult<Self> {
        Ok(Self {
            pattern: TimestampPattern::new(locale)?,
            resolver: TitleResolver::new(&options)?,
            options,
        })
    }

    pub fn english() -> ParserResult<Self> {
        Self::new(&LocaleData::english(), ParserOptions::default())
    }

    pub fn options(&self) -> &ParserOptions {
        &self.options
    }

    pub fn timestamp_pattern(&self) -> &TimestampPattern {
        &self.pattern
    }

    pub fn title_resolver(&self) -> &TitleResolver {
        &self.resolver
    }

    pub fn scanner(&self) -> CommentScanner<'_> {
        CommentScanner::new(&self.pattern, &self.resolver, &self.options)
    }

    /// Scan `container` and thread the result. The set keeps the container's tree alive.
    pub fn parse(&self, container: Handle) -> ParserResult<ThreadItemSet> {
        let items = self.scanner().scan(&container)?;
        tracing::debug!(items = items.len(), "scanned container");
        Ok(ThreadBuilder::build(items, container))
    }

    /// Parse a whole HTML page, using the element with `container_id` (or `body`) as root.
    pub fn parse_html(&self, html: &str, container_id: Option<&str>) -> ParserResult<ThreadItemSet> {
        self.parse(parse_container(html, container_id)?)
    }
}
