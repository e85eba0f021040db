//! Building a [`DocumentTree`] from HTML source and serializing it back.
//!
//! The builder follows the parts of the HTML tree construction rules that
//! change where text nodes end up (void elements, raw text, a handful of
//! implied end tags), so that addresses computed on this tree match the
//! ones a browser would compute on its DOM. It is not a conforming parser.

use html_escape::{decode_html_entities, encode_double_quoted_attribute, encode_text};
use rangemark_syntax::{
    SyntaxKind, end_tag_name, is_raw_text_element, is_void_element, lex, parse_start_tag,
};

use crate::tree::{DocumentTree, NodeId, NodeKind};

/// Tag of the synthetic element every parsed document hangs under.
pub const DOCUMENT_ROOT_TAG: &str = "#document";

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "div", "dl", "fieldset", "figure", "footer",
    "form", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "main", "nav", "ol", "p", "pre",
    "section", "table", "ul",
];

/// Parse HTML source into a document tree rooted at [`DOCUMENT_ROOT_TAG`].
///
/// Never fails: malformed markup yields a best-effort tree, stray end tags
/// are ignored and unclosed elements are closed at end of input. Doctypes
/// and processing instructions are dropped; comments are kept as nodes.
pub fn parse_html(input: &str) -> DocumentTree {
    let mut tree = DocumentTree::new(DOCUMENT_ROOT_TAG);
    let mut open: Vec<NodeId> = vec![tree.root()];
    let mut pending_text = String::new();

    for token in lex(input) {
        match token.kind {
            SyntaxKind::TEXT => pending_text.push_str(&decode_html_entities(token.text)),
            SyntaxKind::RAW_TEXT => pending_text.push_str(token.text),
            SyntaxKind::START_TAG => {
                flush_text(&mut tree, &open, &mut pending_text);
                let Some(tag) = parse_start_tag(token.text) else {
                    continue;
                };

                while open.len() > 1 {
                    let top = open[open.len() - 1];
                    match tree.tag(top) {
                        Some(open_tag) if closes_implicitly(open_tag, &tag.name) => {
                            open.pop();
                        }
                        _ => break,
                    }
                }

                let attributes = tag
                    .attributes
                    .into_iter()
                    .map(|(name, value)| (name, decode_html_entities(&value).into_owned()))
                    .collect();
                let parent = current(&open, &tree);
                let element = tree.append_element(parent, &tag.name, attributes);
                if !tag.self_closing && !is_void_element(&tag.name) {
                    open.push(element);
                }
            }
            SyntaxKind::END_TAG => {
                let Some(name) = end_tag_name(token.text) else {
                    continue;
                };
                // Stray end tags neither close anything nor split text
                if let Some(depth) = open
                    .iter()
                    .skip(1)
                    .rposition(|&node| tree.tag(node) == Some(name.as_str()))
                {
                    flush_text(&mut tree, &open, &mut pending_text);
                    open.truncate(depth + 1);
                }
            }
            SyntaxKind::COMMENT => {
                flush_text(&mut tree, &open, &mut pending_text);
                let body = token
                    .text
                    .strip_prefix("<!--")
                    .unwrap_or(token.text);
                let body = body.strip_suffix("-->").unwrap_or(body);
                let parent = current(&open, &tree);
                tree.append_comment(parent, body);
            }
            SyntaxKind::DOCTYPE | SyntaxKind::PROCESSING_INSTRUCTION => {}
        }
    }

    flush_text(&mut tree, &open, &mut pending_text);
    tree
}

fn current(open: &[NodeId], tree: &DocumentTree) -> NodeId {
    open.last().copied().unwrap_or_else(|| tree.root())
}

fn flush_text(tree: &mut DocumentTree, open: &[NodeId], pending: &mut String) {
    if pending.is_empty() {
        return;
    }
    let parent = current(open, tree);
    tree.append_text(parent, pending);
    pending.clear();
}

/// Whether opening `new_tag` ends an open `open_tag` element.
fn closes_implicitly(open_tag: &str, new_tag: &str) -> bool {
    match open_tag {
        "p" => BLOCK_ELEMENTS.contains(&new_tag),
        "li" => new_tag == "li",
        "dt" | "dd" => matches!(new_tag, "dt" | "dd"),
        "option" => new_tag == "option",
        "tr" => new_tag == "tr",
        "td" | "th" => matches!(new_tag, "td" | "th" | "tr"),
        _ => false,
    }
}

/// Serialize the children of `node` (its inner HTML).
pub fn to_html(tree: &DocumentTree, node: NodeId) -> String {
    let mut out = String::new();
    for &child in tree.children(node) {
        write_node(tree, child, false, &mut out);
    }
    out
}

/// Serialize `node` itself (its outer HTML).
pub fn to_outer_html(tree: &DocumentTree, node: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, node, false, &mut out);
    out
}

fn write_node(tree: &DocumentTree, node: NodeId, raw: bool, out: &mut String) {
    match tree.kind(node) {
        NodeKind::Text(text) if raw => out.push_str(text),
        NodeKind::Text(text) => out.push_str(&encode_text(text)),
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Element { tag, attributes } => {
            out.push('<');
            out.push_str(tag);
            for (name, value) in attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(&encode_double_quoted_attribute(value));
                out.push('"');
            }
            out.push('>');

            if is_void_element(tag) {
                return;
            }

            let raw_children = is_raw_text_element(tag) && tag != "textarea" && tag != "title";
            for &child in tree.children(node) {
                write_node(tree, child, raw_children, out);
            }

            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
}
