//! Footnotes collected into a references section at the end of a document.
//!
//! References are numbered in order of first appearance.
//! Definitions are lifted out of the text and listed under the document body,
//! each with a link back to its first reference.

use foldhash::{HashMap, HashMapExt};
use pulldown_cmark::{Event, Tag, TagEnd};

#[derive(Default)]
struct Footnote<'a> {
    number: usize,
    references: usize,
    definition: Option<Vec<Event<'a>>>,
}

/// Rewrites footnote references and definitions in an event stream.
pub(crate) fn collect_footnotes<'a, I>(events: I) -> Vec<Event<'a>>
where
    I: Iterator<Item = Event<'a>>,
{
    let mut output = Vec::new();
    let mut footnotes: HashMap<String, Footnote<'a>> = HashMap::new();
    let mut numbered = 0;
    // Label and events of the definition currently being read
    let mut definition: Option<(String, Vec<Event<'a>>)> = None;

    for event in events {
        let event = match event {
            Event::Start(Tag::FootnoteDefinition(label)) => {
                debug_assert!(definition.is_none());
                definition = Some((label_key(&label), Vec::new()));
                continue;
            }
            Event::End(TagEnd::FootnoteDefinition) => {
                if let Some((label, events)) = definition.take() {
                    footnotes.entry(label).or_default().definition = Some(events);
                }
                continue;
            }
            Event::FootnoteReference(label) => {
                let footnote = footnotes.entry(label_key(&label)).or_default();
                if footnote.number == 0 {
                    numbered += 1;
                    footnote.number = numbered;
                }
                footnote.references += 1;

                Event::InlineHtml(reference_html(footnote.number, footnote.references).into())
            }
            event => event,
        };

        match &mut definition {
            Some((_, events)) => events.push(event),
            None => output.push(event),
        }
    }

    let mut referenced: Vec<_> = footnotes
        .into_values()
        .filter(|f| f.number > 0)
        .filter_map(|f| Some((f.number, f.definition?)))
        .collect();

    if referenced.is_empty() {
        return output;
    }

    referenced.sort_unstable_by_key(|(number, _)| *number);

    output.push(Event::Html(
        "<section class=\"footnotes\" data-footnotes>\n<h2 id=\"footnote-label\" class=\"sr-only\">Footnotes</h2>\n<ol>\n"
            .into(),
    ));

    for (number, mut events) in referenced {
        output.push(Event::Html(format!("<li id=\"footnote-{number}\">\n").into()));

        let backref = Event::InlineHtml(
            format!(
                " <a href=\"#footnote-ref-{number}\" data-footnote-backref aria-label=\"Back to reference {number}\">\u{21a9}</a>"
            )
            .into(),
        );
        // The back-link goes at the end of the last paragraph, or after the content if there is none
        match events
            .iter()
            .rposition(|event| matches!(event, Event::End(TagEnd::Paragraph)))
        {
            Some(index) => events.insert(index, backref),
            None => events.push(backref),
        }

        output.extend(events);
        output.push(Event::Html("</li>\n".into()));
    }

    output.push(Event::Html("</ol>\n</section>\n".into()));

    output
}

/// Labels match case-insensitively, with runs of whitespace treated as one space.
fn label_key(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn reference_html(number: usize, occurrence: usize) -> String {
    let id = if occurrence > 1 {
        format!("footnote-ref-{number}-{occurrence}")
    } else {
        format!("footnote-ref-{number}")
    };

    format!(
        "<sup><a id=\"{id}\" href=\"#footnote-{number}\" data-footnote-ref aria-describedby=\"footnote-label\">{number}</a></sup>"
    )
}
