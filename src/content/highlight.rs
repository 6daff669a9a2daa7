//! Syntax highlighting for `[code]` blocks.
//!
//! Three regex passes run in a fixed order: punctuation, keywords, then
//! single-quoted strings. Passes mark byte ranges of the source instead of
//! splicing markup into it, so a later pass can never match inside a span
//! injected by an earlier one.

use std::sync::LazyLock;

use regex_lite::Regex;

use super::markup::{Element, Node};

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[{}()\[\];,.:<>=+\-*/%&|!?^~]+").expect("valid punctuation pattern")
});

static KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"\b(?:if|else|elif|for|foreach|while|do|switch|case|default|break|continue|return|",
        r"goto|function|fn|func|def|lambda|let|var|const|static|mut|class|struct|enum|union|",
        r"interface|trait|impl|typedef|namespace|package|import|from|using|include|use|pub|",
        r"public|private|protected|try|catch|except|finally|throw|throws|raise|new|delete|",
        r"void|int|char|float|double|long|short|unsigned|bool|auto|true|false|null|nil|None|",
        r"self|this|match|loop|in|and|or|not)\b"
    ))
    .expect("valid keyword pattern")
});

static STRINGS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'(?:[^'\\\n]|\\.)*'").expect("valid string pattern"));

/// Token class assigned by a highlighting pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Operator and bracket runs
    Punctuation,
    /// Language keyword
    Keyword,
    /// Single-quoted string literal
    Str,
}

impl TokenKind {
    /// CSS class of the injected span
    pub const fn class(self) -> &'static str {
        match self {
            Self::Punctuation => "punctuation",
            Self::Keyword => "keyword",
            Self::Str => "string",
        }
    }
}

/// A run of source text with a single token class
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Source text
    pub text: String,
    /// Token class, `None` for plain text
    pub kind: Option<TokenKind>,
}

/// Source text with one token class per byte
struct Marked {
    source: String,
    kinds: Vec<Option<TokenKind>>,
}

impl Marked {
    fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            kinds: vec![None; source.len()],
        }
    }

    fn is_plain(&self, start: usize, end: usize) -> bool {
        self.kinds[start..end].iter().all(Option::is_none)
    }

    fn mark(&mut self, start: usize, end: usize, kind: TokenKind) {
        self.kinds[start..end].fill(Some(kind));
    }

    fn ranges(&self, re: &Regex) -> Vec<(usize, usize)> {
        re.find_iter(&self.source)
            .map(|m| (m.start(), m.end()))
            .collect()
    }

    fn into_segments(self) -> Vec<Segment> {
        let mut segments = Vec::new();
        let mut start = 0;

        // Kinds only change on match boundaries, which are char boundaries
        for i in 1..=self.kinds.len() {
            if i == self.kinds.len() || self.kinds[i] != self.kinds[start] {
                segments.push(Segment {
                    text: self.source[start..i].to_string(),
                    kind: self.kinds[start],
                });
                start = i;
            }
        }

        segments
    }
}

/// Run all passes over `source`
pub fn highlight(source: &str) -> Vec<Segment> {
    let mut marked = Marked::new(source);
    wrap_punctuation(&mut marked);
    wrap_keywords(&mut marked);
    wrap_strings(&mut marked);
    marked.into_segments()
}

/// Mark punctuation runs.
///
/// Precondition: runs first; no range has been marked yet.
fn wrap_punctuation(marked: &mut Marked) {
    mark_plain(marked, &PUNCTUATION, TokenKind::Punctuation);
}

/// Mark keywords.
///
/// Precondition: only unmarked text may match; a keyword overlapping an
/// existing mark is skipped.
fn wrap_keywords(marked: &mut Marked) {
    mark_plain(marked, &KEYWORDS, TokenKind::Keyword);
}

/// Mark single-quoted string literals.
///
/// Precondition: runs last. A literal replaces any punctuation or keyword
/// marks inside it, so the output never nests one span in another.
fn wrap_strings(marked: &mut Marked) {
    for (start, end) in marked.ranges(&STRINGS) {
        marked.mark(start, end, TokenKind::Str);
    }
}

fn mark_plain(marked: &mut Marked, re: &Regex, kind: TokenKind) {
    for (start, end) in marked.ranges(re) {
        if marked.is_plain(start, end) {
            marked.mark(start, end, kind);
        }
    }
}

/// Highlight `source` into markup nodes, newlines as `<br>`
pub fn highlight_nodes(source: &str) -> Vec<Node> {
    let mut nodes = Vec::new();

    for segment in highlight(source) {
        match segment.kind {
            Some(kind) => nodes.push(Node::Span(Element::with_class(
                "span",
                kind.class(),
                vec![Node::Text(segment.text)],
            ))),
            None => {
                for (i, line) in segment.text.split('\n').enumerate() {
                    if i > 0 {
                        nodes.push(Node::LineBreak);
                    }
                    if !line.is_empty() {
                        nodes.push(Node::Text(line.to_string()));
                    }
                }
            }
        }
    }

    nodes
}

/// Whether `el` is a `[code]` container
pub fn is_code_block(el: &Element) -> bool {
    el.tag == "pre" && el.has_class("prettyprint")
}

/// Replace the children of a code container with highlighted markup
pub fn highlight_element(el: &mut Element) {
    let source = el.text();
    el.children = highlight_nodes(&source);
}
