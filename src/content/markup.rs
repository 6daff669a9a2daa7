//! Owned document tree for post markup.
//!
//! Post comments arrive as HTML fragments. They are parsed with `scraper`
//! and converted into a small closed set of node kinds so every later pass
//! (and the flattener) has to handle each kind explicitly.

use anyhow::{Result, bail};
use scraper::{ElementRef, Html};

/// Deepest element nesting accepted from the server
const MAX_DEPTH: usize = 32;

/// Elements serialized without a closing tag
const VOID_TAGS: &[&str] = &["wbr", "img", "hr", "input", "meta", "link"];

/// A node of post markup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Literal text (entity-decoded)
    Text(String),
    /// `<br>`
    LineBreak,
    /// `<a>`
    Anchor(Element),
    /// `<span>`
    Span(Element),
    /// Any other element
    Element(Element),
}

/// An element with attributes and children
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    /// Attributes in source order
    pub attrs: Vec<(String, String)>,
    /// Child nodes
    pub children: Vec<Node>,
}

impl Element {
    /// Create an element without attributes
    pub fn new(tag: &str, children: Vec<Node>) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children,
        }
    }

    /// Create an element with a single class
    pub fn with_class(tag: &str, class: &str, children: Vec<Node>) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: vec![("class".to_string(), class.to_string())],
            children,
        }
    }

    /// Attribute value by name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The `class` attribute, if present and non-empty
    pub fn class(&self) -> Option<&str> {
        self.attr("class").filter(|c| !c.trim().is_empty())
    }

    /// Whether the class list contains `class`
    pub fn has_class(&self, class: &str) -> bool {
        self.class()
            .is_some_and(|c| c.split_whitespace().any(|name| name == class))
    }

    /// Add a class to the class list
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        match self.attrs.iter_mut().find(|(k, _)| k == "class") {
            Some((_, value)) if !value.trim().is_empty() => {
                value.push(' ');
                value.push_str(class);
            }
            Some((_, value)) => *value = class.to_string(),
            None => self.attrs.push(("class".to_string(), class.to_string())),
        }
    }

    /// Concatenated text of all descendants, `<br>` as newline
    pub fn text(&self) -> String {
        let mut out = String::new();
        push_text(&self.children, &mut out);
        out
    }
}

impl Node {
    /// Element payload of any element-backed node
    pub const fn element(&self) -> Option<&Element> {
        match self {
            Self::Anchor(el) | Self::Span(el) | Self::Element(el) => Some(el),
            Self::Text(_) | Self::LineBreak => None,
        }
    }

    /// Mutable element payload of any element-backed node
    pub fn element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Anchor(el) | Self::Span(el) | Self::Element(el) => Some(el),
            Self::Text(_) | Self::LineBreak => None,
        }
    }

    /// Text content of this node
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::LineBreak => "\n".to_string(),
            Self::Anchor(el) | Self::Span(el) | Self::Element(el) => el.text(),
        }
    }

    fn from_element(element: Element) -> Self {
        match element.tag.as_str() {
            "br" => Self::LineBreak,
            "a" => Self::Anchor(element),
            "span" => Self::Span(element),
            _ => Self::Element(element),
        }
    }
}

/// A parsed post body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    /// Top-level nodes of the body
    pub nodes: Vec<Node>,
}

impl Document {
    /// Parse an HTML fragment
    pub fn parse(html: &str) -> Result<Self> {
        let fragment = Html::parse_fragment(html);
        let nodes = convert_children(fragment.root_element(), 0)?;
        Ok(Self { nodes })
    }

    /// Serialize back to HTML
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        write_nodes(&self.nodes, &mut out);
        out
    }

    /// Plain text of the whole document, `<br>` as newline
    pub fn text(&self) -> String {
        let mut out = String::new();
        push_text(&self.nodes, &mut out);
        out
    }

    /// Visit every element in document order
    pub fn for_each_element_mut(&mut self, f: &mut impl FnMut(&mut Element)) {
        visit_mut(&mut self.nodes, f);
    }
}

fn convert_children(element: ElementRef<'_>, depth: usize) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    for child in element.children() {
        match child.value() {
            scraper::Node::Text(text) => nodes.push(Node::Text(String::from(&**text))),
            scraper::Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    nodes.push(convert_element(child, depth + 1)?);
                }
            }
            // Comments, doctypes and processing instructions carry no content
            _ => {}
        }
    }
    Ok(nodes)
}

fn convert_element(element: ElementRef<'_>, depth: usize) -> Result<Node> {
    if depth > MAX_DEPTH {
        bail!("markup nested deeper than {MAX_DEPTH} levels");
    }

    let value = element.value();
    let element = Element {
        tag: value.name().to_ascii_lowercase(),
        attrs: value
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        children: convert_children(element, depth)?,
    };
    Ok(Node::from_element(element))
}

fn visit_mut(nodes: &mut [Node], f: &mut impl FnMut(&mut Element)) {
    for node in nodes {
        if let Some(el) = node.element_mut() {
            f(el);
            visit_mut(&mut el.children, f);
        }
    }
}

fn push_text(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(text),
            Node::LineBreak => out.push('\n'),
            Node::Anchor(el) | Node::Span(el) | Node::Element(el) => push_text(&el.children, out),
        }
    }
}

fn write_nodes(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Text(text) => out.push_str(&html_escape::encode_text(text)),
            Node::LineBreak => out.push_str("<br>"),
            Node::Anchor(el) | Node::Span(el) | Node::Element(el) => write_element(el, out),
        }
    }
}

fn write_element(el: &Element, out: &mut String) {
    out.push('<');
    out.push_str(&el.tag);
    for (name, value) in &el.attrs {
        out.push(' ');
        out.push_str(name);
        out.push_str("=\"");
        out.push_str(&html_escape::encode_double_quoted_attribute(value));
        out.push('"');
    }
    out.push('>');

    if VOID_TAGS.contains(&el.tag.as_str()) {
        return;
    }

    write_nodes(&el.children, out);
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}

/// Merge adjacent text nodes (recursively)
pub fn merge_text(nodes: &mut Vec<Node>) {
    let mut merged: Vec<Node> = Vec::with_capacity(nodes.len());
    for mut node in nodes.drain(..) {
        if let Some(el) = node.element_mut() {
            merge_text(&mut el.children);
        }
        if let Node::Text(next) = &node
            && let Some(Node::Text(prev)) = merged.last_mut()
        {
            prev.push_str(next);
            continue;
        }
        merged.push(node);
    }
    *nodes = merged;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_node_kinds() {
        let doc = Document::parse(
            r#"hi<br><a href="https://example.com">link</a><span class="quote">&gt;q</span><b>bold</b>"#,
        )
        .unwrap();

        assert_eq!(doc.nodes.len(), 5);
        assert_eq!(doc.nodes[0], Node::Text("hi".to_string()));
        assert_eq!(doc.nodes[1], Node::LineBreak);
        assert!(matches!(&doc.nodes[2], Node::Anchor(a) if a.attr("href") == Some("https://example.com")));
        assert!(matches!(&doc.nodes[3], Node::Span(s) if s.has_class("quote") && s.text() == ">q"));
        assert!(matches!(&doc.nodes[4], Node::Element(e) if e.tag == "b"));
    }

    #[test]
    fn test_serialize_escapes() {
        let doc = Document::parse(r#"<span class="quote">&gt;implying</span> a &amp; b"#).unwrap();
        assert_eq!(
            doc.to_html(),
            r#"<span class="quote">&gt;implying</span> a &amp; b"#
        );
        assert_eq!(doc.text(), ">implying a & b");
    }

    #[test]
    fn test_void_elements() {
        let doc = Document::parse("long<wbr>word").unwrap();
        assert_eq!(doc.to_html(), "long<wbr>word");
    }

    #[test]
    fn test_too_deep() {
        let html = "<div>".repeat(MAX_DEPTH + 1);
        assert!(Document::parse(&html).is_err());
    }

    #[test]
    fn test_add_class() {
        let mut el = Element::with_class("a", "quotelink", Vec::new());
        el.add_class("op");
        el.add_class("op");
        assert_eq!(el.class(), Some("quotelink op"));

        let mut bare = Element::new("a", Vec::new());
        bare.add_class("op");
        assert_eq!(bare.class(), Some("op"));
    }

    #[test]
    fn test_merge_text() {
        let mut nodes = vec![
            Node::Text("a".to_string()),
            Node::Text("b".to_string()),
            Node::LineBreak,
            Node::Text("c".to_string()),
        ];
        merge_text(&mut nodes);
        assert_eq!(
            nodes,
            vec![
                Node::Text("ab".to_string()),
                Node::LineBreak,
                Node::Text("c".to_string())
            ]
        );
    }
}
