//! Code for building complete HTML pages from rendered Markdown fragments.

use aho_corasick::AhoCorasick;
use anyhow::{anyhow, Context, Result};

/// Built-in page: MathJax, the highlight.js theme and the clipboard handler used by math spans.
const DEFAULT_TEMPLATE: &str = include_str!("page.html");

const TITLE_PLACEHOLDER: &str = "{{title}}";
const CONTENT_PLACEHOLDER: &str = "{{content}}";

pub struct PageBuilder {
    template: Box<str>,
    placeholders: AhoCorasick,
}

impl PageBuilder {
    /// Initializes the webpage HTML builder with the built-in page template.
    ///
    /// # Panics
    /// This function panics if the placeholder matcher cannot be built, which would be a bug.
    #[must_use]
    pub fn new() -> Self {
        Self::from_template(DEFAULT_TEMPLATE).expect("built-in page template should be valid")
    }

    /// Initializes the webpage HTML builder with a custom template.
    /// The template receives the page title at every `{{title}}` and the page body at every `{{content}}`.
    ///
    /// # Errors
    /// This function returns an error if:
    /// - the template has no `{{content}}` placeholder
    /// - the placeholder matcher cannot be built
    pub fn from_template(template: &str) -> Result<Self> {
        if !template.contains(CONTENT_PLACEHOLDER) {
            return Err(anyhow!(
                "page template has no {CONTENT_PLACEHOLDER} placeholder"
            ));
        }

        let placeholders = AhoCorasick::new([TITLE_PLACEHOLDER, CONTENT_PLACEHOLDER])
            .context("failed to build template placeholder matcher")?;

        Ok(Self {
            template: template.into(),
            placeholders,
        })
    }

    /// Outputs a string containing a complete HTML document.
    ///
    /// Substitution is literal and happens in one pass over the template,
    /// so placeholder text inside `title` or `body` is left alone.
    /// Neither value is escaped: both are trusted to be valid HTML.
    #[must_use]
    pub fn build_page(&self, title: &str, body: &str) -> String {
        self.placeholders
            .replace_all(&self.template, &[title, body])
    }
}
