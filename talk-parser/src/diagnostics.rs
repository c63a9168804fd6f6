//! Diagnostics for parsed talk pages
//!
//! Item warnings never stop a parse, but tooling wants to show them: which comment skipped an
//! indentation level, which reply could not be attached, which timestamp looks hand-typed.
//! [`ThreadItemSet::diagnostics`] flattens them into [`Diagnostic`]s keyed by item id, with a
//! stable code per kind of anomaly.
//!
//! ## Codes
//!
//!     different-indentation    start and end of a comment sit at different list depths
//!     skips-indentation        a reply is indented more than one level below its parent
//!     unconnected              a comment could not be attached to any thread
//!     ambiguous-time           timestamp falls in a DST gap and was moved forward
//!     impossible-abbreviation  timezone abbreviation not in effect at that time
//!     merged-signatures        several signatures were merged into one comment (hint)

use crate::item::{ItemRef, ItemWarning, ThreadItemSet};
use crate::timestamp::TimestampWarning;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for DiagnosticSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticSeverity::Error => write!(f, "error"),
            DiagnosticSeverity::Warning => write!(f, "warning"),
            DiagnosticSeverity::Information => write!(f, "info"),
            DiagnosticSeverity::Hint => write!(f, "hint"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    /// Id of the item the diagnostic is about.
    pub item_id: String,
    pub severity: DiagnosticSeverity,
    pub message: String,
    pub code: Option<String>,
    pub source: String,
}

impl Diagnostic {
    pub fn new(item_id: impl Into<String>, severity: DiagnosticSeverity, message: String) -> Self {
        Self {
            item_id: item_id.into(),
            severity,
            message,
            code: None,
            source: "talk-parser".to_string(),
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {} at {}",
            self.severity, self.source, self.message, self.item_id
        )?;
        if let Some(code) = &self.code {
            write!(f, " ({})", code)?;
        }
        Ok(())
    }
}

fn warning_code(warning: &ItemWarning) -> Option<&'static str> {
    match warning {
        ItemWarning::DifferentIndentation => Some("different-indentation"),
        ItemWarning::SkipsIndentation => Some("skips-indentation"),
        ItemWarning::Unconnected => Some("unconnected"),
        ItemWarning::Timestamp(TimestampWarning::AmbiguousTime) => Some("ambiguous-time"),
        ItemWarning::Timestamp(TimestampWarning::ImpossibleAbbreviation) => {
            Some("impossible-abbreviation")
        }
        ItemWarning::Other(_) => None,
    }
}

/// Diagnostics for one item.
pub fn item_diagnostics(item: ItemRef<'_>) -> Vec<Diagnostic> {
    let mut diagnostics: Vec<Diagnostic> = item
        .warnings
        .iter()
        .map(|warning| {
            let diagnostic = Diagnostic::new(
                item.id.clone(),
                DiagnosticSeverity::Warning,
                warning.message().to_string(),
            );
            match warning_code(warning) {
                Some(code) => diagnostic.with_code(code),
                None => diagnostic,
            }
        })
        .collect();

    let signatures = item.signature_ranges().len();
    if signatures > 1 {
        diagnostics.push(
            Diagnostic::new(
                item.id.clone(),
                DiagnosticSeverity::Hint,
                format!("{} signatures merged into one comment", signatures),
            )
            .with_code("merged-signatures"),
        );
    }
    diagnostics
}

impl ThreadItemSet {
    /// All diagnostics, in discovery order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.iter().flat_map(item_diagnostics).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_severity_source_and_code() {
        let diagnostic = Diagnostic::new(
            "dt-c-3",
            DiagnosticSeverity::Warning,
            "Comment skips indentation level".to_string(),
        )
        .with_code("skips-indentation");
        assert_eq!(
            diagnostic.to_string(),
            "warning [talk-parser]: Comment skips indentation level at dt-c-3 (skips-indentation)"
        );
    }

    #[test]
    fn unknown_warnings_have_no_code() {
        assert_eq!(warning_code(&ItemWarning::Other("odd".to_string())), None);
        assert_eq!(
            warning_code(&ItemWarning::Timestamp(TimestampWarning::AmbiguousTime)),
            Some("ambiguous-time")
        );
    }
}
