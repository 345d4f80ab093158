//! Links for bare URLs and email addresses in running text, as GitHub-flavored Markdown makes them.

use linkify::{LinkFinder, LinkKind};
use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};
use std::ops::Range;

pub(crate) struct UrlLinker {
    finder: LinkFinder,
}

impl UrlLinker {
    pub(crate) fn new() -> Self {
        let mut finder = LinkFinder::new();
        // Needed to find `www.` links; other scheme-less matches are filtered out below
        finder.url_must_have_scheme(false);
        Self { finder }
    }

    /// Pushes `text` as text events, wrapping every bare link in a link tag.
    pub(crate) fn push_text<'a>(&self, text: CowStr<'a>, events: &mut Vec<Event<'a>>) {
        let links: Vec<(Range<usize>, LinkType, String)> = self
            .finder
            .links(&text)
            .filter_map(|link| {
                let (link_type, destination) = destination(link.as_str(), link.kind())?;
                Some((link.start()..link.end(), link_type, destination))
            })
            .collect();

        if links.is_empty() {
            events.push(Event::Text(text));
            return;
        }

        let mut copied = 0;
        for (range, link_type, destination) in links {
            if copied < range.start {
                events.push(Event::Text(text[copied..range.start].to_owned().into()));
            }
            events.push(Event::Start(Tag::Link {
                link_type,
                dest_url: destination.into(),
                title: CowStr::Borrowed(""),
                id: CowStr::Borrowed(""),
            }));
            events.push(Event::Text(text[range.clone()].to_owned().into()));
            events.push(Event::End(TagEnd::Link));
            copied = range.end;
        }

        if copied < text.len() {
            events.push(Event::Text(text[copied..].to_owned().into()));
        }
    }
}

/// Link target for a match: URLs with an `http(s)` scheme, `www.` domains and email addresses.
fn destination(link: &str, kind: &LinkKind) -> Option<(LinkType, String)> {
    match kind {
        LinkKind::Email => Some((LinkType::Email, link.to_owned())),
        LinkKind::Url if has_prefix(link, "http://") || has_prefix(link, "https://") => {
            Some((LinkType::Autolink, link.to_owned()))
        }
        LinkKind::Url if has_prefix(link, "www.") => {
            Some((LinkType::Autolink, format!("http://{link}")))
        }
        _ => None,
    }
}

fn has_prefix(text: &str, prefix: &str) -> bool {
    text.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
