//! # talk-tools
//!
//! Everything built on top of parsed talk pages that the parser itself should not know about:
//!
//!     annotate        mark items in the page with markers, records and button placeholders
//!     postprocess     fill placeholders per request (labels, subscription state)
//!     subscriptions   topic subscriptions and the store they live in
//!     events          new comments between two revisions, and who to notify about them
//!     eligibility     which pages get discussion tools at all
//!
//! Like the parser this is a pure library: no printing, no environment access. Storage and
//! page properties are collaborators passed in through traits.

pub mod annotate;
pub mod eligibility;
pub mod error;
pub mod events;
pub mod postprocess;
pub mod subscriptions;

pub use annotate::Annotator;
pub use error::{ToolsError, ToolsResult};
pub use postprocess::Labels;
