//! # talk-parser
//!
//! Finds signed comments and section headings in the rendered HTML of a wiki talk page and
//! threads them into reply trees.
//!
//! Pipeline
//!
//!     html ──parse_container──▶ container
//!          ──CommentScanner───▶ flat items (headings, comments, levels, warnings)
//!          ──ThreadBuilder────▶ ThreadItemSet (names, ids, replies, parents)
//!
//! The scanner leans on three helpers built once per wiki: [`timestamp::TimestampPattern`]
//! (locale-specific timestamp regex and field parser), [`title::TitleResolver`] (link target to
//! page title) and [`signature::SignatureFinder`] (backwards walk from a timestamp to the
//! author's user link). [`parser::CommentParser`] wires them together.
//!
//! The parser never mutates the document. Annotating the page with markers and buttons is the
//! job of `talk-tools`, which consumes the [`record`] format defined here.
//!
//! For the fixture conventions used by the tests, see the [testing module](testing).

#![allow(rustdoc::invalid_html_tags)]

pub mod diagnostics;
pub mod dom;
pub mod error;
pub mod item;
pub mod locale;
pub mod parser;
pub mod record;
pub mod scanner;
pub mod signature;
pub mod testing;
pub mod threading;
pub mod timestamp;
pub mod title;
pub mod treeviz;

pub use error::{ParserError, ParserResult};
pub use item::{ItemKind, ItemRef, ItemWarning, ThreadItem, ThreadItemSet, TranscludedFrom};
pub use locale::{LocaleData, ParserOptions, TimezoneAbbreviation};
pub use parser::CommentParser;
pub use record::{collect_records, ThreadItemRecord};
