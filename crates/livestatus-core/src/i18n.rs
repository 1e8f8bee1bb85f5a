//! Localized templates.
//!
//! Each language has one strongly-typed [`Messages`] bundle. Templates are
//! plain strings with `%name%` placeholders; formatting is literal string
//! replacement, not a template language.

use std::collections::HashMap;

use serde::Deserialize;

/// Language used when a destination asks for one that was not loaded.
pub const DEFAULT_LANG: &str = "en";

// ─── Bundle ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Messages {
  pub event: EventTemplates,
  pub embed: EmbedTemplates,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EventTemplates {
  pub title:       String,
  pub description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmbedTemplates {
  pub online:  EmbedTemplate,
  pub offline: EmbedTemplate,
  /// Shared by both embeds. Empty means no footer.
  pub footer:  String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EmbedTemplate {
  pub title:       String,
  pub description: String,
  pub button:      ButtonTemplate,
  pub fields:      Vec<FieldTemplate>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ButtonTemplate {
  pub emoji: String,
  pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldTemplate {
  pub name:   String,
  pub value:  String,
  pub inline: bool,
}

// ─── Variables ───────────────────────────────────────────────────────────────

/// Placeholder values, applied in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Variables(Vec<(&'static str, String)>);

impl Variables {
  pub fn new() -> Self { Self::default() }

  /// Bind `%name%` to `value`.
  pub fn with(mut self, name: &'static str, value: impl Into<String>) -> Self {
    self.0.push((name, value.into()));
    self
  }

  pub fn format(&self, template: &str) -> String {
    self.0.iter().fold(template.to_owned(), |acc, (name, value)| {
      acc.replace(&format!("%{name}%"), value)
    })
  }
}

// ─── Localizer ───────────────────────────────────────────────────────────────

/// All loaded bundles, resolved once at startup.
#[derive(Debug, Clone, Default)]
pub struct Localizer {
  bundles: HashMap<String, Messages>,
  empty:   Messages,
}

impl Localizer {
  pub fn new(bundles: HashMap<String, Messages>) -> Self {
    Self { bundles, empty: Messages::default() }
  }

  /// Bundle for `lang`, falling back to [`DEFAULT_LANG`], then to an empty
  /// bundle.
  pub fn messages(&self, lang: &str) -> &Messages {
    self
      .bundles
      .get(lang)
      .or_else(|| self.bundles.get(DEFAULT_LANG))
      .unwrap_or(&self.empty)
  }

  pub fn languages(&self) -> impl Iterator<Item = &str> {
    self.bundles.keys().map(String::as_str)
  }
}
