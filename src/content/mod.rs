//! Post content normalization.
//!
//! [`ContentProvider::process_posts`] turns the raw comment markup of one
//! thread into normalized markup plus a styled body, and computes which
//! posts in the batch reply to each other:
//!
//! 1. parse each comment ([`markup::Document`])
//! 2. drop `<wbr>` soft breaks
//! 3. resolve `>>N` reply links across the whole batch, marking links to the OP
//! 4. highlight `[code]` blocks on boards that support them
//! 5. flatten the top-level nodes into [`ratatui::text::Text`]
//!
//! The pipeline is all-or-nothing: if any post fails to parse, the input
//! batch is returned unchanged.

pub mod highlight;
pub mod markup;
pub mod styled;

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::models::{Board, Post};

use markup::{Document, Element, Node};
pub use styled::ContentStyles;

/// Suffix appended to links that point at the thread's root post
pub const OP_MARKER: &str = " (OP)";

/// Normalizes thread content for display
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContentProvider {
    styles: ContentStyles,
}

impl ContentProvider {
    /// Create a provider that styles output with `styles`
    pub const fn new(styles: ContentStyles) -> Self {
        Self { styles }
    }

    /// Normalize the posts of one thread.
    ///
    /// Returns new posts with `content`, `body` and `replies` filled in.
    /// On any parse failure the input is returned unmodified.
    pub fn process_posts(&self, posts: &[Post], board: &Board) -> Vec<Post> {
        match self.try_process(posts, board) {
            Ok(processed) => processed,
            Err(e) => {
                tracing::warn!("Failed to normalize posts on /{}/: {e:#}", board.id);
                posts.to_vec()
            }
        }
    }

    fn try_process(&self, posts: &[Post], board: &Board) -> Result<Vec<Post>> {
        let mut documents = posts
            .iter()
            .map(|post| match post.content_raw.as_deref() {
                Some(raw) => Document::parse(raw)
                    .with_context(|| format!("Failed to parse post {}", post.id)),
                None => Ok(Document::default()),
            })
            .collect::<Result<Vec<_>>>()?;

        for doc in &mut documents {
            strip_soft_breaks(&mut doc.nodes);
        }

        let root_id = posts
            .iter()
            .find(|p| p.is_root)
            .or_else(|| posts.first())
            .map(|p| p.id);

        let references = collect_references(posts, &documents);

        if let Some(root_id) = root_id {
            for doc in &mut documents {
                annotate_references(doc, root_id);
            }
        }

        if board.supports_code() {
            for doc in &mut documents {
                highlight_code(doc);
            }
        }

        Ok(posts
            .iter()
            .zip(documents)
            .map(|(post, doc)| {
                let mut processed = post.clone();
                processed.body = styled::flatten(&doc.nodes, &self.styles);
                processed.content = post.content_raw.as_ref().map(|_| doc.to_html());
                processed.replies = references.get(&post.id).cloned().unwrap_or_default();
                processed
            })
            .collect())
    }
}

/// Strip markup and return plain text; unparseable input is returned as is
pub fn plain_text(html: &str) -> String {
    match Document::parse(html) {
        Ok(mut doc) => {
            strip_soft_breaks(&mut doc.nodes);
            doc.text()
        }
        Err(_) => html.to_string(),
    }
}

/// Remove `<wbr>` elements, which would otherwise split link text
fn strip_soft_breaks(nodes: &mut Vec<Node>) {
    remove_soft_breaks(nodes);
    markup::merge_text(nodes);
}

fn remove_soft_breaks(nodes: &mut Vec<Node>) {
    nodes.retain(|node| !matches!(node, Node::Element(el) if el.tag == "wbr"));
    for node in nodes {
        if let Some(el) = node.element_mut() {
            remove_soft_breaks(&mut el.children);
        }
    }
}

/// Post number targeted by a reply link.
///
/// Reply links carry the `quotelink` class or point inside the board:
/// `#p<N>` or `/<board>/thread/<no>#p<N>`. External URLs never count.
pub fn reply_target(anchor: &Element) -> Option<u64> {
    let href = anchor.attr("href")?;
    let (path, fragment) = href.rsplit_once("#p")?;

    let board_relative = path.starts_with('/') && !path.starts_with("//");
    if !(path.is_empty() || board_relative || anchor.has_class("quotelink")) {
        return None;
    }

    fragment.parse().ok()
}

/// Map each target post to the posts linking to it, in batch order.
///
/// Self-links and repeated links from the same post are ignored.
fn collect_references(posts: &[Post], documents: &[Document]) -> HashMap<u64, Vec<u64>> {
    let mut references: HashMap<u64, Vec<u64>> = HashMap::new();

    for (post, doc) in posts.iter().zip(documents) {
        let mut targets = Vec::new();
        collect_targets(&doc.nodes, &mut targets);

        for target in targets {
            if target == post.id {
                continue;
            }
            let sources = references.entry(target).or_default();
            if !sources.contains(&post.id) {
                sources.push(post.id);
            }
        }
    }

    references
}

fn collect_targets(nodes: &[Node], targets: &mut Vec<u64>) {
    for node in nodes {
        match node {
            Node::Anchor(el) => {
                if let Some(target) = reply_target(el) {
                    targets.push(target);
                }
            }
            Node::Span(el) | Node::Element(el) => collect_targets(&el.children, targets),
            Node::Text(_) | Node::LineBreak => {}
        }
    }
}

/// Tag reply links with their target and mark links to the OP
fn annotate_references(doc: &mut Document, root_id: u64) {
    doc.for_each_element_mut(&mut |el: &mut Element| {
        if el.tag != "a" {
            return;
        }
        let Some(target) = reply_target(el) else {
            return;
        };

        el.add_class(&format!("ref-{target}"));

        if target == root_id && !el.text().ends_with(OP_MARKER) {
            el.children.push(Node::Text(OP_MARKER.to_string()));
            markup::merge_text(&mut el.children);
        }
    });
}

fn highlight_code(doc: &mut Document) {
    doc.for_each_element_mut(&mut |el: &mut Element| {
        if highlight::is_code_block(el) {
            highlight::highlight_element(el);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(id: u64, root: u64, html: &str) -> Post {
        let mut post = Post::new("g", root, id);
        post.content_raw = Some(html.to_string());
        post
    }

    fn quotelink(target: u64) -> String {
        format!(r##"<a href="#p{target}" class="quotelink">&gt;&gt;{target}</a>"##)
    }

    fn thread() -> Vec<Post> {
        vec![
            post(1, 1, "Thread about <wbr>things"),
            post(2, 1, &format!("{}<br>agreed", quotelink(1))),
            post(3, 1, &format!("{}<br>{}<br>no", quotelink(2), quotelink(1))),
            post(4, 1, &format!("{}{}", quotelink(2), quotelink(2))),
        ]
    }

    #[test]
    fn test_reply_references() {
        let processed = ContentProvider::default().process_posts(&thread(), &Board::new("g", "Technology"));

        assert_eq!(processed[0].replies, vec![2, 3]);
        assert_eq!(processed[1].replies, vec![3, 4]);
        assert!(processed[2].replies.is_empty());
        assert!(processed[3].replies.is_empty());
    }

    #[test]
    fn test_own_reference_not_counted() {
        let posts = vec![post(1, 1, "op"), post(2, 1, &quotelink(2))];
        let processed = ContentProvider::default().process_posts(&posts, &Board::new("g", "Technology"));
        assert!(processed[1].replies.is_empty());
    }

    #[test]
    fn test_op_marker() {
        let processed = ContentProvider::default().process_posts(&thread(), &Board::new("g", "Technology"));

        let reply_to_op = processed[1].content.as_deref().unwrap();
        assert!(reply_to_op.contains("&gt;&gt;1 (OP)</a>"));
        assert!(reply_to_op.contains(r#"class="quotelink ref-1""#));

        let reply_to_other = processed[3].content.as_deref().unwrap();
        assert!(!reply_to_other.contains(OP_MARKER));
        assert!(reply_to_other.contains(r#"class="quotelink ref-2""#));

        assert_eq!(styled::to_plain(&processed[1].body), ">>1 (OP)\nagreed");
    }

    #[test]
    fn test_soft_breaks_removed() {
        let posts = vec![post(
            1,
            1,
            r#"<a href="https://example.com/verylong">https://example.com/very<wbr>long</a>"#,
        )];
        let processed = ContentProvider::default().process_posts(&posts, &Board::new("g", "Technology"));

        assert!(!processed[0].content.as_deref().unwrap().contains("wbr"));
        let span = &processed[0].body.lines[0].spans[0];
        assert_eq!(span.content, "https://example.com/verylong");
        assert_eq!(span.style, ContentStyles::default().link);
    }

    #[test]
    fn test_idempotent() {
        let provider = ContentProvider::default();
        let board = Board::new("g", "Technology");
        let posts = thread();

        assert_eq!(provider.process_posts(&posts, &board), provider.process_posts(&posts, &board));
    }

    #[test]
    fn test_input_not_mutated() {
        let posts = thread();
        let before = posts.clone();
        let _ = ContentProvider::default().process_posts(&posts, &Board::new("g", "Technology"));
        assert_eq!(posts, before);
    }

    #[test]
    fn test_code_highlighting_by_board() {
        let posts = vec![post(1, 1, r#"<pre class="prettyprint">if (x)<br>  return;</pre>"#)];

        let mut code_board = Board::new("g", "Technology");
        code_board.code_tags = true;
        let highlighted = ContentProvider::default().process_posts(&posts, &code_board);
        let html = highlighted[0].content.as_deref().unwrap();
        assert!(html.contains(r#"<span class="keyword">if</span>"#));
        assert!(html.contains(r#"<span class="punctuation">(</span>"#));
        assert!(html.contains("<br>"));

        let plain = ContentProvider::default().process_posts(&posts, &Board::new("b", "Random"));
        assert!(!plain[0].content.as_deref().unwrap().contains("keyword"));

        // Flattened text is unchanged by highlighting
        assert_eq!(
            styled::to_plain(&highlighted[0].body),
            styled::to_plain(&plain[0].body)
        );
    }

    #[test]
    fn test_missing_content() {
        let posts = vec![Post::new("g", 1, 1)];
        let processed = ContentProvider::default().process_posts(&posts, &Board::new("g", "Technology"));
        assert!(processed[0].content.is_none());
        assert!(processed[0].replies.is_empty());
    }

    #[test]
    fn test_parse_failure_falls_back_to_input() {
        let mut posts = thread();
        posts[2].content_raw = Some("<div>".repeat(64));

        let processed = ContentProvider::default().process_posts(&posts, &Board::new("g", "Technology"));
        assert_eq!(processed, posts);
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(plain_text("a<wbr>b<br>&gt;c"), "ab\n>c");
    }

    #[test]
    fn test_reply_target() {
        let cross = Element {
            tag: "a".to_string(),
            attrs: vec![("href".to_string(), "/g/thread/100#p105".to_string())],
            children: Vec::new(),
        };
        assert_eq!(reply_target(&cross), Some(105));

        let external = Element {
            tag: "a".to_string(),
            attrs: vec![("href".to_string(), "https://example.com".to_string())],
            children: Vec::new(),
        };
        assert_eq!(reply_target(&external), None);

        let external_fragment = Element {
            tag: "a".to_string(),
            attrs: vec![("href".to_string(), "https://example.com/doc#p3".to_string())],
            children: Vec::new(),
        };
        assert_eq!(reply_target(&external_fragment), None);

        let protocol_relative = Element {
            tag: "a".to_string(),
            attrs: vec![("href".to_string(), "//example.com/doc#p3".to_string())],
            children: Vec::new(),
        };
        assert_eq!(reply_target(&protocol_relative), None);
    }

    #[test]
    fn test_external_link_with_fragment_stays_a_link() {
        let posts = vec![
            post(1, 1, "op"),
            post(3, 1, "third"),
            post(4, 1, r#"<a href="https://example.com/doc#p3">doc</a>"#),
        ];
        let processed = ContentProvider::default().process_posts(&posts, &Board::new("g", "Technology"));

        assert!(processed[1].replies.is_empty());
        assert!(!processed[2].content.as_deref().unwrap().contains("ref-3"));

        let span = &processed[2].body.lines[0].spans[0];
        assert_eq!(span.content, "doc");
        assert_eq!(span.style, ContentStyles::default().link);
    }
}
