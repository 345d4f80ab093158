//! Math notation in Markdown text.
//!
//! `$$…$$` spans become display math and `$…$` spans become inline math.
//! Both are emitted as `<span>` elements holding TeX for client-side typesetting with MathJax,
//! plus a clipboard icon that copies the original source when clicked.

use regex::Regex;
use std::{borrow::Cow, ops::Range, sync::LazyLock};

static BLOCK_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$\$([\s\S]*?)\$\$").expect("block math pattern is valid"));

static INLINE_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\$((?:\\\$|[^$])+)\$").expect("inline math pattern is valid"));

const CLIPBOARD_ICON: &str = r#"<svg class="copy-icon" viewBox="0 0 24 24"><path fill="currentColor" d="M19,21H8V7H19M19,5H8A2,2 0 0,0 6,7V21A2,2 0 0,0 8,23H19A2,2 0 0,0 21,21V7A2,2 0 0,0 19,5M16,1H4A2,2 0 0,0 2,3V17H4V3H16V1Z"/></svg>"#;

// Private-use code points never produced by Markdown syntax
const PLACEHOLDER_OPEN: char = '\u{E000}';
const PLACEHOLDER_CLOSE: char = '\u{E001}';

/// A span of math markup recognized in Markdown text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MathToken<'a> {
    /// The matched source, delimiters included.
    pub raw: Cow<'a, str>,
    /// The TeX between the delimiters.
    pub text: Cow<'a, str>,
    /// `true` for `$$…$$`, `false` for `$…$`.
    pub display: bool,
}

impl<'a> MathToken<'a> {
    /// Recognizes a math span at the very start of `src`.
    ///
    /// The display form is tried first; it matches up to the nearest closing `$$` and may span lines.
    /// The inline form needs at least one character between its delimiters,
    /// where every character is either an escaped dollar sign (`\$`) or anything other than `$`.
    /// If neither form matches, no token is produced and the `$` is ordinary text.
    #[must_use]
    pub fn parse(src: &'a str) -> Option<Self> {
        let (captures, display) = match BLOCK_RULE.captures(src) {
            Some(captures) => (captures, true),
            None => (INLINE_RULE.captures(src)?, false),
        };

        Some(Self {
            raw: captures.get(0)?.as_str().into(),
            text: captures.get(1)?.as_str().into(),
            display,
        })
    }

    /// Removes byte ranges of `raw` (sorted, non-overlapping) from the token.
    /// The delimiters are never part of a cut.
    fn without(self, cuts: &[Range<usize>]) -> Self {
        if cuts.is_empty() {
            return self;
        }

        let mut raw = String::with_capacity(self.raw.len());
        let mut kept = 0;
        for cut in cuts {
            raw.push_str(&self.raw[kept..cut.start]);
            kept = cut.end;
        }
        raw.push_str(&self.raw[kept..]);

        let delimiter = if self.display { 2 } else { 1 };
        let text = raw[delimiter..raw.len() - delimiter].to_owned();

        Self {
            raw: raw.into(),
            text: text.into(),
            display: self.display,
        }
    }

    /// Renders the token as a clickable `<span>` for MathJax.
    /// Double quotes are escaped in the `data-latex` attribute; the typeset body is left verbatim.
    #[must_use]
    pub fn to_html(&self) -> String {
        let latex = self.text.replace('"', "&quot;");
        let text = &self.text;

        if self.display {
            format!(
                r#"<span class="math-container math-block" onclick="copyMathToClipboard(this)" data-latex="$${latex}$$">\[{text}\]{CLIPBOARD_ICON}</span>"#
            )
        } else {
            format!(
                r#"<span class="math-container math-inline" onclick="copyMathToClipboard(this)" data-latex="${latex}$">\({text}\){CLIPBOARD_ICON}</span>"#
            )
        }
    }
}

/// Byte ranges of a Markdown document where math may occur.
#[derive(Default)]
pub(crate) struct Prose {
    /// Ranges of running text, excluding code, raw HTML and link destinations
    pub(crate) text: Vec<Range<usize>>,
    /// Ranges of blocks holding inline content (paragraphs, headings, list items, table cells)
    pub(crate) blocks: Vec<Range<usize>>,
    /// Container markup at the start of continuation lines, such as `> ` in block quotes
    pub(crate) prefixes: Vec<Range<usize>>,
}

impl Prose {
    /// A span qualifies as math if it opens in running text and stays within one block.
    fn admits(&self, span: &Range<usize>) -> bool {
        self.text.iter().any(|text| text.contains(&span.start))
            && self
                .blocks
                .iter()
                .any(|block| block.start <= span.start && span.end <= block.end)
    }

    /// Container prefixes inside a span, relative to its start.
    fn prefixes_within(&self, span: &Range<usize>) -> Vec<Range<usize>> {
        self.prefixes
            .iter()
            .filter(|prefix| span.start <= prefix.start && prefix.end <= span.end)
            .map(|prefix| prefix.start - span.start..prefix.end - span.start)
            .collect()
    }
}

/// A Markdown document with its math spans swapped out for placeholders.
///
/// The placeholders pass through Markdown parsing as plain text,
/// so the math source is never interpreted as emphasis, escapes, etc.
pub(crate) struct MathSpans<'a> {
    source: Cow<'a, str>,
    tokens: Vec<MathToken<'a>>,
}

impl<'a> MathSpans<'a> {
    pub(crate) fn extract(src: &'a str, prose: &Prose) -> Self {
        let mut source = String::new();
        let mut tokens = Vec::new();
        let mut copied = 0;
        let mut pos = 0;

        while let Some(offset) = src[pos..].find(['\\', '$']) {
            let at = pos + offset;

            // A backslash escapes the next character, so `\$` never opens math
            if src.as_bytes()[at] == b'\\' {
                pos = at + 1 + src[at + 1..].chars().next().map_or(0, char::len_utf8);
                continue;
            }

            let token = MathToken::parse(&src[at..]).and_then(|token| {
                let span = at..at + token.raw.len();
                prose
                    .admits(&span)
                    .then(|| (span.end, token.without(&prose.prefixes_within(&span))))
            });

            match token {
                Some((end, token)) => {
                    source.push_str(&src[copied..at]);
                    source.push(PLACEHOLDER_OPEN);
                    source.push_str(&tokens.len().to_string());
                    source.push(PLACEHOLDER_CLOSE);

                    pos = end;
                    copied = pos;
                    tokens.push(token);
                }
                None => pos = at + 1,
            }
        }

        let source = if tokens.is_empty() {
            Cow::Borrowed(src)
        } else {
            source.push_str(&src[copied..]);
            Cow::Owned(source)
        };

        Self { source, tokens }
    }

    /// The document with placeholders in place of math.
    pub(crate) fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&MathToken<'a>> {
        self.tokens.get(index)
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Piece<'t> {
    Text(&'t str),
    Math(usize),
}

pub(crate) fn has_placeholder(text: &str) -> bool {
    text.contains(PLACEHOLDER_OPEN)
}

/// Splits rendered text into literal runs and math placeholders.
pub(crate) fn pieces(text: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find(PLACEHOLDER_OPEN) {
        let after = &rest[open + PLACEHOLDER_OPEN.len_utf8()..];

        match after
            .split_once(PLACEHOLDER_CLOSE)
            .and_then(|(digits, tail)| Some((digits.parse::<usize>().ok()?, tail)))
        {
            Some((index, tail)) => {
                if open > 0 {
                    pieces.push(Piece::Text(&rest[..open]));
                }
                pieces.push(Piece::Math(index));
                rest = tail;
            }
            None => {
                let end = open + PLACEHOLDER_OPEN.len_utf8();
                pieces.push(Piece::Text(&rest[..end]));
                rest = &rest[end..];
            }
        }
    }

    if !rest.is_empty() {
        pieces.push(Piece::Text(rest));
    }

    pieces
}

#[cfg(test)]
mod test {
    use super::{pieces, MathSpans, MathToken, Piece, Prose};

    fn whole(src: &str) -> Prose {
        Prose {
            text: vec![0..src.len()],
            blocks: vec![0..src.len()],
            prefixes: Vec::new(),
        }
    }

    #[test]
    fn display_math() {
        let token = MathToken::parse("$$x^2$$ and more").expect("display math should match");
        assert_eq!(
            token,
            MathToken {
                raw: "$$x^2$$".into(),
                text: "x^2".into(),
                display: true
            }
        );
        assert_eq!(
            MathToken::parse("$$a\nb$$").map(|t| t.text).as_deref(),
            Some("a\nb"),
            "display math may span lines"
        );
        assert_eq!(
            MathToken::parse("$$a$$ b $$c$$").map(|t| t.raw).as_deref(),
            Some("$$a$$"),
            "display math should end at the nearest closing delimiter"
        );
        assert_eq!(
            MathToken::parse("$$$$").map(|t| (t.text.into_owned(), t.display)),
            Some((String::new(), true)),
            "empty display math is still a token"
        );
    }

    #[test]
    fn inline_math() {
        let token = MathToken::parse("$x^2$, then").expect("inline math should match");
        assert_eq!(
            token,
            MathToken {
                raw: "$x^2$".into(),
                text: "x^2".into(),
                display: false
            }
        );
        assert_eq!(
            MathToken::parse(r"$a\$b$").map(|t| t.text).as_deref(),
            Some(r"a\$b"),
            "escaped dollar signs should stay inside inline math"
        );
    }

    #[test]
    fn no_math() {
        assert_eq!(MathToken::parse("$"), None);
        assert_eq!(MathToken::parse("$$"), None);
        assert_eq!(MathToken::parse("$5 and no more"), None);
        assert_eq!(MathToken::parse("$$x"), None);
    }

    #[test]
    fn math_html() {
        let block = MathToken::parse("$$x^2$$").expect("display math should match");
        let html = block.to_html();
        assert!(html.starts_with(r#"<span class="math-container math-block" onclick="copyMathToClipboard(this)" data-latex="$$x^2$$">\[x^2\]<svg class="copy-icon""#));
        assert!(html.ends_with("</svg></span>"));

        let inline = MathToken::parse("$x^2$").expect("inline math should match");
        assert!(inline.to_html().starts_with(r#"<span class="math-container math-inline" onclick="copyMathToClipboard(this)" data-latex="$x^2$">\(x^2\)<svg"#));

        let quoted = MathToken::parse(r#"$\text{"hi"}$"#).expect("inline math should match");
        assert!(
            quoted
                .to_html()
                .contains(r#"data-latex="$\text{&quot;hi&quot;}$">\(\text{"hi"}\)"#),
            "quotes should be escaped only in the attribute"
        );
    }

    #[test]
    fn extraction() {
        let src = r"cost \$5, area $\pi r^2$ and $$e$$";
        let spans = MathSpans::extract(src, &whole(src));

        assert_eq!(
            spans.source(),
            "cost \\$5, area \u{E000}0\u{E001} and \u{E000}1\u{E001}"
        );
        assert_eq!(spans.get(0).map(|t| &*t.text), Some(r"\pi r^2"));
        assert_eq!(spans.get(1).map(|t| t.display), Some(true));
        assert_eq!(spans.get(2), None);
    }

    #[test]
    fn extraction_outside_prose() {
        let src = "`$a$` and $b$";
        let prose = Prose {
            text: vec![5..src.len()],
            blocks: vec![0..src.len()],
            prefixes: Vec::new(),
        };
        let spans = MathSpans::extract(src, &prose);

        assert_eq!(spans.source(), "`$a$` and \u{E000}0\u{E001}");
        assert_eq!(spans.get(0).map(|t| &*t.text), Some("b"));

        let src = "$a\n\nb$";
        let prose = Prose {
            text: vec![0..2, 4..6],
            blocks: vec![0..3, 4..6],
            prefixes: Vec::new(),
        };
        assert!(
            MathSpans::extract(src, &prose).is_empty(),
            "math should not cross blocks"
        );
    }

    #[test]
    fn extraction_without_prefixes() {
        let src = "> $a\n> b$ and $$c\n> d\n> e$$";
        let prose = Prose {
            text: vec![2..4, 7..17, 20..21, 24..src.len()],
            blocks: vec![2..src.len()],
            prefixes: vec![5..7, 18..20, 22..24],
        };
        let spans = MathSpans::extract(src, &prose);

        let inline = spans.get(0).expect("inline math should be extracted");
        assert_eq!(inline.raw, "$a\nb$");
        assert_eq!(inline.text, "a\nb", "quote markers should be removed from math");

        let display = spans.get(1).expect("display math should be extracted");
        assert_eq!(display.text, "c\nd\ne");
        assert_eq!(spans.source(), "> \u{E000}0\u{E001} and \u{E000}1\u{E001}");
    }

    #[test]
    fn placeholder_pieces() {
        assert_eq!(
            pieces("a \u{E000}0\u{E001} b\u{E000}12\u{E001}"),
            [Piece::Text("a "), Piece::Math(0), Piece::Text(" b"), Piece::Math(12)]
        );
        assert_eq!(pieces("plain"), [Piece::Text("plain")]);
        assert_eq!(
            pieces("\u{E000}x"),
            [Piece::Text("\u{E000}"), Piece::Text("x")],
            "malformed placeholders should stay literal"
        );
    }
}
