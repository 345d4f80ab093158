//! Utility for highlighting fenced code blocks by converting them to classed HTML.

use log::error;
use std::borrow::Cow;
use syntect::{
    html::{ClassStyle, ClassedHTMLGenerator},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
    Error,
};

/// Language tags accepted on fenced code blocks, with the `syntect` grammar used for each.
/// The default syntax set has no TypeScript grammar, so TypeScript is highlighted as JavaScript.
const LANGUAGES: &[(&str, &str)] = &[
    ("python", "Python"),
    ("py", "Python"),
    ("javascript", "JavaScript"),
    ("js", "JavaScript"),
    ("typescript", "JavaScript"),
    ("ts", "JavaScript"),
];

// Scope atoms become `hljs-keyword`, `hljs-string`, `hljs-comment`, ...
// which the highlight.js theme stylesheet linked from every page already styles.
const CLASS_STYLE: ClassStyle = ClassStyle::SpacedPrefixed { prefix: "hljs-" };

pub struct SyntaxHighlighter {
    syntaxes: SyntaxSet,
}

impl SyntaxHighlighter {
    /// Initializes a utility to add syntax highlighting to code.
    /// The current implementation uses the `syntect` crate.
    #[must_use]
    pub fn new() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }

    /// Adds syntax highlighting to a string of code, outputting HTML with `<span class="hljs-…">` elements.
    ///
    /// The input is returned unchanged (as `Cow::Borrowed`) if
    /// - no language is specified
    /// - the language is not in the fixed list of supported languages
    /// - `syntect` fails to highlight the code; the failure is logged
    pub fn highlight<'c>(&self, code: &'c str, language: Option<&str>) -> Cow<'c, str> {
        let Some((lang, syntax)) = language.and_then(|lang| Some((lang, self.find_syntax(lang)?)))
        else {
            return Cow::Borrowed(code);
        };

        match self.classed_html(code, syntax) {
            Ok(html) => Cow::Owned(html),
            Err(e) => {
                error!("failed to highlight {lang} code block: {e}");
                Cow::Borrowed(code)
            }
        }
    }

    fn find_syntax(&self, language: &str) -> Option<&SyntaxReference> {
        LANGUAGES
            .iter()
            .find(|(tag, _)| tag.eq_ignore_ascii_case(language))
            .and_then(|(_, name)| self.syntaxes.find_syntax_by_name(name))
    }

    fn classed_html(&self, code: &str, syntax: &SyntaxReference) -> Result<String, Error> {
        let mut generator =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, CLASS_STYLE);

        for line in LinesWithEndings::from(code) {
            generator.parse_html_for_line_which_includes_newline(line)?;
        }

        Ok(generator.finalize())
    }
}

#[cfg(test)]
mod test {
    use super::{SyntaxHighlighter, LANGUAGES};
    use std::borrow::Cow;

    #[test]
    fn supported_languages() {
        let highlighter = SyntaxHighlighter::new();

        for (tag, _) in LANGUAGES {
            assert!(
                highlighter.find_syntax(tag).is_some(),
                "every supported language should have a grammar (\"{tag}\")"
            );
        }
    }

    #[test]
    fn syntax_highlighting() {
        let highlighter = SyntaxHighlighter::new();
        let code = "def add(a, b):\n    return a + b  # sum\n";

        let html = highlighter.highlight(code, Some("python"));
        assert!(
            matches!(html, Cow::Owned(_)),
            "known languages should be highlighted"
        );
        assert!(html.contains("<span class=\"hljs-"));
        assert!(html.contains("hljs-keyword"));
        assert!(html.contains("hljs-comment"));

        assert!(
            matches!(
                highlighter.highlight("let x = 1;\n", Some("JS")),
                Cow::Owned(_)
            ),
            "language tags should be matched case-insensitively"
        );
    }

    #[test]
    fn unsupported_languages() {
        let highlighter = SyntaxHighlighter::new();
        let code = "fn main() { println!(\"<hi>\"); }\n";

        assert!(
            matches!(highlighter.highlight(code, Some("unknownlang")), Cow::Borrowed(c) if c == code),
            "unknown languages should be passed through unchanged"
        );
        assert!(
            matches!(highlighter.highlight(code, Some("rust")), Cow::Borrowed(c) if c == code),
            "grammars outside the supported list should not be used"
        );
        assert!(
            matches!(highlighter.highlight(code, None), Cow::Borrowed(c) if c == code),
            "code without a language should be passed through unchanged"
        );
    }
}
