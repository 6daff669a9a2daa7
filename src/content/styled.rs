//! Flatten post markup into styled terminal text

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

use super::markup::Node;

/// Styles applied while flattening post markup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentStyles {
    /// Plain text
    pub text: Style,
    /// `>greentext` quotes
    pub quote: Style,
    /// External hyperlinks
    pub link: Style,
}

impl Default for ContentStyles {
    fn default() -> Self {
        Self {
            text: Style::default(),
            quote: Style::default().fg(Color::Green),
            link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
        }
    }
}

/// Flatten the direct children of a post body into styled text.
///
/// Only the top level is inspected; anything nested collapses into the
/// plain text of its outer element.
pub fn flatten(nodes: &[Node], styles: &ContentStyles) -> Text<'static> {
    let mut fragments: Vec<(String, Style)> = Vec::with_capacity(nodes.len());

    for node in nodes {
        let fragment = match node {
            Node::Text(text) => (text.clone(), styles.text),
            Node::LineBreak => ("\n".to_string(), styles.text),
            Node::Anchor(el) if el.class().is_none() => {
                let label = el.text();
                let label = if label.is_empty() {
                    el.attr("href").unwrap_or_default().to_string()
                } else {
                    label
                };
                (label, styles.link)
            }
            Node::Span(el) if el.has_class("quote") => (el.text(), styles.quote),
            Node::Anchor(el) | Node::Span(el) | Node::Element(el) => (el.text(), styles.text),
        };
        fragments.push(fragment);
    }

    into_text(fragments)
}

/// Split fragments into lines on embedded newlines
fn into_text(fragments: Vec<(String, Style)>) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();

    for (content, style) in fragments {
        for (i, piece) in content.split('\n').enumerate() {
            if i > 0 {
                lines.push(Line::from(std::mem::take(&mut current)));
            }
            if !piece.is_empty() {
                current.push(Span::styled(piece.to_string(), style));
            }
        }
    }
    lines.push(Line::from(current));

    Text::from(lines)
}

/// Plain text of a styled body, one line per row
pub fn to_plain(text: &Text<'_>) -> String {
    text.lines
        .iter()
        .map(|line| {
            line.spans
                .iter()
                .map(|span| span.content.as_ref())
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}
