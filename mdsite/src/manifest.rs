//! Code for reading the publishing manifest: a JSON array of pages to generate.

use anyhow::{anyhow, Context, Result};
use camino::{Utf8Component, Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use serde_json::Value;
use std::{fs::read_to_string, path::Path};

#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    pub entries: Box<[Entry]>,
}

#[derive(Debug, Deserialize)]
pub struct Entry {
    // Path to the Markdown source file
    pub source: Box<Path>,
    // Path of the generated page, relative to the output directory
    pub url_path: Utf8PathBuf,
    pub title: Box<str>,
    #[serde(default, rename = "type")]
    pub kind: EntryKind,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "Value")]
pub enum EntryKind {
    Blog,
    #[default]
    Plain,
}

// Only the string "blog" marks a blog post; any other value is a plain page
impl From<Value> for EntryKind {
    fn from(kind: Value) -> Self {
        match kind.as_str() {
            Some("blog") => Self::Blog,
            _ => Self::Plain,
        }
    }
}

impl Manifest {
    /// Reads a manifest file.
    ///
    /// # Errors
    /// This function returns an error if:
    /// - the file cannot be read
    /// - the file is not a JSON array of entries with `source`, `url_path` and `title` fields
    /// - an entry's `url_path` would point outside of the output directory
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = read_to_string(path)
            .with_context(|| format!("failed to read manifest from {path:?}"))?;

        Self::from_json(&text).with_context(|| format!("manifest at {path:?} is invalid"))
    }

    /// Parses a manifest from JSON text.
    ///
    /// # Errors
    /// This function returns an error if the text is not a valid manifest (see [`Manifest::from_path`]).
    pub fn from_json(text: &str) -> Result<Self> {
        let manifest: Self =
            serde_json::from_str(text).context("manifest is not a JSON array of entries")?;

        for entry in &manifest.entries {
            check_url_path(&entry.url_path)
                .with_context(|| format!("`url_path` of entry for {:?} is invalid", entry.source))?;
        }

        Ok(manifest)
    }
}

fn check_url_path(url_path: &Utf8Path) -> Result<()> {
    if url_path.as_str().is_empty() {
        return Err(anyhow!("no output path provided"));
    }

    if !url_path.is_relative()
        || url_path
            .components()
            .any(|part| matches!(part, Utf8Component::ParentDir | Utf8Component::Normal("..")))
    {
        return Err(anyhow!(
            "output path is not a normalized relative file path ({url_path})"
        ));
    }

    Ok(())
}
