//! Writing-system side files.
//!
//! Each writing system used by a project has a `<tag>.ldml` file in the
//! store directory. When a run normalizes a tag, the file for the old tag is
//! copied to the new name with the tag replaced inside, and the old file is
//! kept as `<old>.ldml.bak`. Problems here never fail a run: the document has
//! already been replaced, so they are reported and left for the user.

use crate::config::with_suffix;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const LDML_EXTENSION: &str = "ldml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MigrationOutcome {
    Migrated { from: PathBuf, to: PathBuf },
    /// No side file for the old tag.
    Missing,
    /// A file for the new tag already exists; nothing was touched.
    TargetExists { path: PathBuf },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LdmlMigration {
    pub old_tag: String,
    pub new_tag: String,
    pub outcome: MigrationOutcome,
}

pub fn ldml_path(store: &Path, tag: &str) -> PathBuf {
    store.join(format!("{tag}.{LDML_EXTENSION}"))
}

/// Migrate the side file of every normalized tag.
pub fn migrate_ldml(store: &Path, normalizations: &BTreeMap<String, String>) -> Vec<LdmlMigration> {
    if normalizations.is_empty() {
        return Vec::new();
    }
    if !store.is_dir() {
        tracing::debug!(store = %store.display(), "no writing-system store");
        return Vec::new();
    }

    normalizations
        .iter()
        .filter(|(old, new)| old != new)
        .map(|(old, new)| {
            let outcome = match migrate_one(store, old, new) {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::warn!(old, new, error = %err, "writing-system side file not migrated");
                    MigrationOutcome::Failed { error: err.to_string() }
                }
            };
            if let MigrationOutcome::TargetExists { path } = &outcome {
                tracing::warn!(old, new, path = %path.display(), "side file for normalized tag already exists");
            }
            LdmlMigration {
                old_tag: old.clone(),
                new_tag: new.clone(),
                outcome,
            }
        })
        .collect()
}

fn migrate_one(store: &Path, old: &str, new: &str) -> io::Result<MigrationOutcome> {
    let from = ldml_path(store, old);
    if !from.is_file() {
        return Ok(MigrationOutcome::Missing);
    }
    let to = ldml_path(store, new);
    if to.exists() {
        return Ok(MigrationOutcome::TargetExists { path: to });
    }

    let text = fs::read_to_string(&from)?;
    let tmp = with_suffix(&to, "tmp");
    fs::write(&tmp, replace_tag(&text, old, new))?;
    fs::rename(&tmp, &to)?;
    fs::rename(&from, with_suffix(&from, "bak"))?;

    tracing::info!(old, new, "migrated writing-system side file");
    Ok(MigrationOutcome::Migrated { from, to })
}

/// Replace the tag wherever it appears as a whole attribute value, and the
/// language subtag of the `identity` block.
pub fn replace_tag(text: &str, old: &str, new: &str) -> String {
    let mut out = text.replace(&format!("\"{old}\""), &format!("\"{new}\""));
    let old_lang = old.split('-').next().unwrap_or(old);
    let new_lang = new.split('-').next().unwrap_or(new);
    if old_lang != new_lang {
        out = out.replace(
            &format!("<language type=\"{old_lang}\""),
            &format!("<language type=\"{new_lang}\""),
        );
    }
    out
}
