//! Loads localisation bundles: one `<lang>.toml` per language.

use std::{collections::HashMap, path::Path};

use anyhow::Context as _;
use livestatus_core::i18n::{Localizer, Messages};
use tracing::info;

/// Read every `*.toml` file in `dir` into a [`Localizer`], keyed by file stem.
pub fn load_dir(dir: &Path) -> anyhow::Result<Localizer> {
  let mut bundles = HashMap::new();
  let entries = std::fs::read_dir(dir)
    .with_context(|| format!("reading i18n directory {}", dir.display()))?;

  for entry in entries {
    let path = entry?.path();
    if path.extension().is_none_or(|ext| ext != "toml") {
      continue;
    }
    let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
      continue;
    };
    let messages: Messages = config::Config::builder()
      .add_source(config::File::from(path.as_path()))
      .build()
      .and_then(|c| c.try_deserialize())
      .with_context(|| format!("parsing {}", path.display()))?;
    bundles.insert(lang.to_owned(), messages);
  }

  let localizer = Localizer::new(bundles);
  info!(languages = ?localizer.languages().collect::<Vec<_>>(), "i18n bundles loaded");
  Ok(localizer)
}

#[cfg(test)]
mod tests {
  use livestatus_core::i18n::Variables;

  use super::*;

  #[test]
  fn loads_bundles_by_file_stem() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
      dir.path().join("fr.toml"),
      "[event]\ntitle = \"%streamer% est en live\"\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let localizer = load_dir(dir.path()).unwrap();
    let vars = Variables::new().with("streamer", "alice");
    assert_eq!(vars.format(&localizer.messages("fr").event.title), "alice est en live");
    assert_eq!(localizer.languages().count(), 1);
  }

  #[test]
  fn shipped_bundles_parse() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("i18n");
    let localizer = load_dir(&dir).unwrap();
    let en = localizer.messages("en");
    assert!(!en.event.title.is_empty());
    assert!(!en.embed.online.fields.is_empty());
    assert!(!en.embed.footer.contains("/live"));
    assert_eq!(localizer.messages("fr").embed.footer, "Statut du live de %streamer%");
  }
}
