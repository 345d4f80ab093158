//! Conversion of every page listed in the manifest.

use crate::{
    blog::wrap_blog,
    manifest::{Entry, EntryKind, Manifest},
    Config, PageBuilder, Renderer,
};
use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use same_file::is_same_file;
use std::{
    fs::{create_dir_all, read_to_string, write},
    path::{Path, PathBuf},
};

/// Everything needed to generate the site: where pages come from, where they go and how they look.
///
/// A `Site` is immutable once built; each conversion pass shares it by reference.
pub struct Site {
    manifest_path: Box<Path>,
    output_dir: Box<Path>,
    renderer: Renderer,
    page_builder: PageBuilder,
}

impl Site {
    #[must_use]
    pub fn new(manifest_path: &Path, output_dir: &Path, page_builder: PageBuilder) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            output_dir: output_dir.into(),
            renderer: Renderer::new(),
            page_builder,
        }
    }

    /// Builds a site from configuration, loading the custom page template if one is set.
    ///
    /// # Errors
    /// This function returns an error if the custom page template cannot be read or is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let page_builder = match &config.template {
            Some(path) => read_to_string(path)
                .with_context(|| format!("failed to read page template from {path:?}"))
                .and_then(|text| PageBuilder::from_template(&text))
                .context("failed to process page template")?,
            None => PageBuilder::new(),
        };

        Ok(Self::new(&config.manifest, &config.output_dir, page_builder))
    }

    #[must_use]
    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Reads the manifest and converts every entry in order, returning the number of pages written.
    ///
    /// The pass stops at the first failing entry; pages written before the failure are kept.
    ///
    /// # Errors
    /// This function returns an error if:
    /// - the manifest cannot be read or parsed
    /// - the output directory cannot be created
    /// - any entry fails to convert (see [`Site::convert_entry`])
    pub fn convert_all(&self) -> Result<usize> {
        let manifest = Manifest::from_path(&self.manifest_path)?;

        create_dir_all(&self.output_dir).with_context(|| {
            format!("failed to create output directory at {:?}", self.output_dir)
        })?;

        for entry in &manifest.entries {
            self.convert_entry(entry)
                .with_context(|| format!("failed to convert {:?}", entry.source))?;
        }

        Ok(manifest.entries.len())
    }

    /// Converts one manifest entry to an HTML page, returning the path of the written page.
    ///
    /// # Errors
    /// This function returns an error if:
    /// - the source file cannot be read
    /// - the output path is the source file itself
    /// - the page cannot be written
    pub fn convert_entry(&self, entry: &Entry) -> Result<PathBuf> {
        let markdown = read_to_string(&entry.source)
            .with_context(|| format!("failed to read source file at {:?}", entry.source))?;

        let output_path = self.output_path(entry);

        if is_same_file(&entry.source, &output_path).unwrap_or(false) {
            return Err(anyhow!(
                "output path {output_path:?} would overwrite the source file"
            ));
        }

        debug!("rendering {:?} ({:?})", entry.source, entry.kind);
        let html = self.render_page(entry, &markdown);

        if let Some(parent) = output_path.parent() {
            create_dir_all(parent)
                .with_context(|| format!("failed to create output directory at {parent:?}"))?;
        }
        write(&output_path, html)
            .with_context(|| format!("failed to write HTML to {output_path:?}"))?;

        info!(
            "converted {} to {}",
            entry.source.display(),
            output_path.display()
        );

        Ok(output_path)
    }

    /// Builds the complete page for an entry from its Markdown text.
    #[must_use]
    pub fn render_page(&self, entry: &Entry, markdown: &str) -> String {
        let body = match entry.kind {
            EntryKind::Blog => self.renderer.render(&wrap_blog(&entry.title, markdown)),
            EntryKind::Plain => self.renderer.render(markdown),
        };

        self.page_builder.build_page(&entry.title, &body)
    }

    #[must_use]
    pub fn output_path(&self, entry: &Entry) -> PathBuf {
        self.output_dir.join(entry.url_path.as_std_path())
    }
}
