//! Conversion of Markdown documents to HTML fragments.

use crate::{
    autolink::UrlLinker,
    footnote::collect_footnotes,
    math::{has_placeholder, pieces, MathSpans, Piece, Prose},
    SyntaxHighlighter,
};
use pulldown_cmark::{
    html::push_html, CodeBlockKind, CowStr, Event, LinkType, Options, Parser, Tag, TagEnd,
    TextMergeStream,
};
use std::borrow::Cow;

/// Renderer configuration: Markdown extensions plus the highlighter for fenced code.
///
/// The renderer is immutable once built, so one instance can serve every conversion.
pub struct Renderer {
    options: Options,
    highlighter: SyntaxHighlighter,
    linker: UrlLinker,
}

impl Renderer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            // GitHub-flavored Markdown
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_FOOTNOTES,
            highlighter: SyntaxHighlighter::new(),
            linker: UrlLinker::new(),
        }
    }

    /// Converts a Markdown document to an HTML fragment.
    ///
    /// Line breaks inside paragraphs are kept as `<br />`,
    /// `$…$` and `$$…$$` spans become math markup,
    /// bare URLs become links,
    /// fenced code blocks are syntax-highlighted,
    /// and footnotes are gathered into a section at the end.
    /// Rendering never fails: any text is valid Markdown.
    #[must_use]
    pub fn render(&self, markdown: &str) -> String {
        let math = MathSpans::extract(markdown, &self.prose(markdown));

        // Track code block parsing state to support syntax highlighting
        let mut code_language: Option<CowStr<'_>> = None;
        let mut is_in_code_block = false;
        // Text inside links and images is never linked again
        let mut link_depth = 0_usize;

        let mut events = Vec::new();

        for event in TextMergeStream::new(Parser::new_ext(math.source(), self.options)) {
            match event {
                Event::Start(Tag::CodeBlock(ref kind)) => {
                    is_in_code_block = true;
                    code_language = match kind {
                        CodeBlockKind::Indented => None,
                        CodeBlockKind::Fenced(info) => {
                            info.split_whitespace().next().map(|lang| lang.to_owned().into())
                        }
                    };
                    events.push(event);
                }
                Event::End(TagEnd::CodeBlock) => {
                    is_in_code_block = false;
                    code_language = None;
                    events.push(event);
                }
                Event::Text(text) if is_in_code_block => {
                    let highlighted =
                        match self.highlighter.highlight(&text, code_language.as_deref()) {
                            Cow::Owned(html) => Some(html),
                            Cow::Borrowed(_) => None,
                        };
                    events.push(match highlighted {
                        Some(html) => Event::InlineHtml(html.into()),
                        None => Event::Text(text),
                    });
                }
                Event::Start(Tag::Link { .. } | Tag::Image { .. }) => {
                    link_depth += 1;
                    events.push(event);
                }
                Event::End(TagEnd::Link | TagEnd::Image) => {
                    link_depth = link_depth.saturating_sub(1);
                    events.push(event);
                }
                Event::Text(text) => self.push_text(text, &math, link_depth == 0, &mut events),
                Event::SoftBreak => events.push(Event::HardBreak),
                _ => events.push(event),
            }
        }

        let mut html = String::with_capacity(markdown.len() * 3 / 2);
        push_html(&mut html, collect_footnotes(events.into_iter()).into_iter());
        html
    }

    /// Pushes a run of prose, expanding math placeholders and linking bare URLs outside of links.
    fn push_text<'a>(
        &self,
        text: CowStr<'a>,
        math: &MathSpans<'_>,
        link_urls: bool,
        events: &mut Vec<Event<'a>>,
    ) {
        let push_run = |run: CowStr<'a>, events: &mut Vec<Event<'a>>| {
            if link_urls {
                self.linker.push_text(run, events);
            } else {
                events.push(Event::Text(run));
            }
        };

        if math.is_empty() || !has_placeholder(&text) {
            push_run(text, events);
            return;
        }

        for piece in pieces(&text) {
            match piece {
                Piece::Math(index) => match math.get(index) {
                    Some(token) => events.push(Event::InlineHtml(token.to_html().into())),
                    None => events.push(Event::Text(index.to_string().into())),
                },
                Piece::Text(run) => push_run(run.to_owned().into(), &mut *events),
            }
        }
    }

    /// Finds where math may occur: running text outside of code and autolinks, within a single block.
    /// Also records the container markup (block quote markers, list indentation)
    /// that starts each continuation line of a nested block.
    fn prose(&self, markdown: &str) -> Prose {
        let mut prose = Prose::default();
        let mut is_in_code_block = false;
        let mut is_in_autolink = false;
        let mut container_depth = 0_usize;
        // End of the latest line break, until the next inline content
        let mut line_start: Option<usize> = None;

        for (event, range) in Parser::new_ext(markdown, self.options).into_offset_iter() {
            if let Some(start) = line_start.take() {
                if container_depth > 0 && start < range.start {
                    prose.prefixes.push(start..range.start);
                }
            }

            match event {
                Event::Start(Tag::Paragraph | Tag::Heading { .. } | Tag::TableCell) => {
                    prose.blocks.push(range);
                }
                Event::Start(Tag::Item) => {
                    container_depth += 1;
                    prose.blocks.push(range);
                }
                Event::Start(Tag::BlockQuote(_) | Tag::FootnoteDefinition(_)) => {
                    container_depth += 1;
                }
                Event::End(TagEnd::BlockQuote(_) | TagEnd::FootnoteDefinition | TagEnd::Item) => {
                    container_depth = container_depth.saturating_sub(1);
                }
                Event::Start(Tag::CodeBlock(_)) => is_in_code_block = true,
                Event::End(TagEnd::CodeBlock) => is_in_code_block = false,
                Event::Start(Tag::Link {
                    link_type: LinkType::Autolink | LinkType::Email,
                    ..
                }) => is_in_autolink = true,
                Event::End(TagEnd::Link) => is_in_autolink = false,
                Event::Text(_) if !is_in_code_block && !is_in_autolink => prose.text.push(range),
                Event::SoftBreak | Event::HardBreak => line_start = Some(range.end),
                _ => {}
            }
        }

        prose
    }
}
