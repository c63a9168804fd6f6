//! Locale data and parser options
//!
//! Everything wiki-specific is injected here rather than hard-coded: the date format, the
//! month and weekday names, digit glyphs, the local timezone with its abbreviations, and the
//! namespace names used to recognise signature links. `talk-config` deserializes both structs
//! from TOML; tests build synthetic locales directly.

use serde::{Deserialize, Serialize};

/// Maps a timezone abbreviation as rendered on the page to the canonical tz abbreviation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimezoneAbbreviation {
    pub local: String,
    pub canonical: String,
}

impl TimezoneAbbreviation {
    pub fn new(local: impl Into<String>, canonical: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            canonical: canonical.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocaleData {
    /// Date format in the wiki's format-code mini-language, e.g. `H:i, j F Y`.
    pub date_format: String,
    /// Ten localized digit glyphs, `None` for ASCII digits.
    pub digits: Option<String>,
    /// IANA timezone name of the wiki, e.g. `America/New_York`.
    pub timezone: String,
    /// Abbreviations accepted inside the trailing parentheses, in match priority order.
    pub timezone_abbreviations: Vec<TimezoneAbbreviation>,
    pub months: Vec<String>,
    pub months_genitive: Vec<String>,
    pub months_short: Vec<String>,
    pub weekdays: Vec<String>,
    pub weekdays_short: Vec<String>,
}

fn strings(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl LocaleData {
    /// English month and day names, `H:i, j F Y` timestamps in UTC.
    pub fn english() -> Self {
        let months = strings(&[
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ]);
        Self {
            date_format: "H:i, j F Y".to_string(),
            digits: None,
            timezone: "UTC".to_string(),
            timezone_abbreviations: vec![TimezoneAbbreviation::new("UTC", "UTC")],
            months_genitive: months.clone(),
            months,
            months_short: strings(&[
                "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
            ]),
            weekdays: strings(&[
                "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
            ]),
            weekdays_short: strings(&["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"]),
        }
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn with_timezone(
        mut self,
        timezone: impl Into<String>,
        abbreviations: Vec<TimezoneAbbreviation>,
    ) -> Self {
        self.timezone = timezone.into();
        self.timezone_abbreviations = abbreviations;
        self
    }

    pub fn with_digits(mut self, digits: impl Into<String>) -> Self {
        self.digits = Some(digits.into());
        self
    }

    /// Canonical abbreviation for a rendered one.
    pub fn canonical_abbreviation(&self, local: &str) -> Option<&str> {
        self.timezone_abbreviations
            .iter()
            .find(|abbr| abbr.local == local)
            .map(|abbr| abbr.canonical.as_str())
    }
}

impl Default for LocaleData {
    fn default() -> Self {
        Self::english()
    }
}

/// Namespace names (and aliases) signature links are recognised by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespaceNames {
    pub user: Vec<String>,
    pub user_talk: Vec<String>,
    pub special: Vec<String>,
}

impl Default for NamespaceNames {
    fn default() -> Self {
        Self {
            user: strings(&["User"]),
            user_talk: strings(&["User talk"]),
            special: strings(&["Special"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserOptions {
    /// Characters of preceding text scanned for signature links.
    pub signature_scan_limit: usize,
    /// Name of the special page listing a user's contributions.
    pub contributions_page_name: String,
    /// Article path pattern with `$1` standing for the title.
    pub article_path: String,
    /// Script path accepting a `title=` query parameter.
    pub script_path: String,
    pub namespaces: NamespaceNames,
    /// Upper-case the first letter of titles.
    pub capital_links: bool,
    /// Element ids whose subtrees are never scanned.
    pub skip_ids: Vec<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            signature_scan_limit: 100,
            contributions_page_name: "Contributions".to_string(),
            article_path: "/wiki/$1".to_string(),
            script_path: "/w/index.php".to_string(),
            namespaces: NamespaceNames::default(),
            capital_links: true,
            skip_ids: strings(&["toc"]),
        }
    }
}
