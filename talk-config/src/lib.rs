//! Shared configuration loader for the talk toolchain.
//!
//! `defaults/talk.default.toml` is embedded into every binary so the documented defaults and
//! the runtime behavior cannot drift apart. Applications layer wiki-specific files on top of
//! those defaults via [`Loader`] before deserializing into [`TalkConfig`].
//!
//! The `locale` and `parser` tables deserialize straight into the parser's own
//! [`LocaleData`] and [`ParserOptions`], so any field those types gain is configurable
//! without touching this crate.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;
use talk_parser::{LocaleData, ParserOptions};

const DEFAULT_TOML: &str = include_str!("../defaults/talk.default.toml");

/// Top-level configuration consumed by talk applications.
#[derive(Debug, Clone, Deserialize)]
pub struct TalkConfig {
    pub locale: LocaleData,
    pub parser: ParserOptions,
    pub render: RenderConfig,
}

/// How annotated pages are located and labelled.
#[derive(Debug, Clone, Deserialize)]
pub struct RenderConfig {
    pub container_id: String,
    pub reply_label: String,
    pub subscribe_label: String,
    pub unsubscribe_label: String,
}

impl RenderConfig {
    /// The container id, or `None` when the whole body is the container.
    pub fn container_id(&self) -> Option<&str> {
        Some(self.container_id.as_str()).filter(|id| !id.is_empty())
    }
}

/// Helper for layering user overrides over the built-in defaults.
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start a loader seeded with the embedded defaults.
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file. Missing files trigger an error.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer an optional configuration file (ignored if the file is absent).
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Apply a single key/value override, e.g. `render.container_id` from a CLI flag.
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    /// Finalize the builder and deserialize the resulting configuration.
    pub fn build(self) -> Result<TalkConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for callers that only need the defaults.
pub fn load_defaults() -> Result<TalkConfig, ConfigError> {
    Loader::new().build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_the_built_in_locale() {
        let config = load_defaults().expect("defaults to deserialize");
        assert_eq!(config.locale, LocaleData::english());
        assert_eq!(config.parser, ParserOptions::default());
        assert_eq!(config.render.container_id(), None);
        assert_eq!(config.render.reply_label, "reply");
    }

    #[test]
    fn supports_overrides() {
        let config = Loader::new()
            .set_override("render.container_id", "mw-content-text")
            .expect("override to apply")
            .set_override("parser.signature_scan_limit", 50_i64)
            .expect("override to apply")
            .build()
            .expect("config to build");
        assert_eq!(config.render.container_id(), Some("mw-content-text"));
        assert_eq!(config.parser.signature_scan_limit, 50);
    }

    #[test]
    fn layers_a_wiki_file_over_the_defaults() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp file");
        writeln!(
            file,
            r#"
[locale]
date_format = "H:i, j. F Y"
timezone = "Europe/Berlin"
timezone_abbreviations = [
  {{ local = "MEZ", canonical = "CET" }},
  {{ local = "MESZ", canonical = "CEST" }},
]

[render]
reply_label = "Antworten"
"#
        )
        .expect("write config");

        let config = Loader::new().with_file(file.path()).build().expect("config to build");
        assert_eq!(config.locale.date_format, "H:i, j. F Y");
        assert_eq!(config.locale.canonical_abbreviation("MESZ"), Some("CEST"));
        assert_eq!(config.locale.months[4], "May");
        assert_eq!(config.render.reply_label, "Antworten");
        assert_eq!(config.render.subscribe_label, "subscribe");
    }

    #[test]
    fn missing_optional_file_is_ignored() {
        let config = Loader::new()
            .with_optional_file("/nonexistent/talk.toml")
            .build()
            .expect("config to build");
        assert_eq!(config.locale.timezone, "UTC");
        assert!(Loader::new().with_file("/nonexistent/talk.toml").build().is_err());
    }
}
