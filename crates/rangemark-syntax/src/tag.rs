//! Tag token parsing: names, attributes and self-closing flags.
//!
//! Attribute values are returned exactly as written (minus quotes);
//! entity decoding is left to the tree builder.

/// Elements that never have children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose content is not markup.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "title"];

/// A parsed start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartTag {
    /// Lowercased tag name
    pub name: String,
    /// Attributes in source order, names lowercased
    pub attributes: Vec<(String, String)>,
    /// Written as `<name ... />`
    pub self_closing: bool,
}

pub fn is_void_element(name: &str) -> bool {
    VOID_ELEMENTS.contains(&name)
}

pub fn is_raw_text_element(name: &str) -> bool {
    RAW_TEXT_ELEMENTS.contains(&name)
}

/// Parse the text of a `START_TAG` token.
///
/// Returns `None` when the text is not a start tag at all.
pub fn parse_start_tag(text: &str) -> Option<StartTag> {
    let inner = text.strip_prefix('<')?.strip_suffix('>')?;
    let (inner, self_closing) = match inner.strip_suffix('/') {
        Some(rest) => (rest, true),
        None => (inner, false),
    };

    let name_len = inner
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == ':'))
        .unwrap_or(inner.len());
    if name_len == 0 {
        return None;
    }
    let name = inner[..name_len].to_ascii_lowercase();
    let attributes = parse_attributes(&inner[name_len..]);

    Some(StartTag {
        name,
        attributes,
        self_closing,
    })
}

/// Lowercased name of an `END_TAG` token.
pub fn end_tag_name(text: &str) -> Option<String> {
    let inner = text.strip_prefix("</")?.strip_suffix('>')?;
    let name = inner.trim_end();
    if name.is_empty() {
        return None;
    }
    Some(name.to_ascii_lowercase())
}

fn parse_attributes(mut rest: &str) -> Vec<(String, String)> {
    let mut attributes = Vec::new();

    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '/');
        if rest.is_empty() {
            break;
        }

        let name_len = rest
            .find(|c: char| c.is_whitespace() || c == '=' || c == '/')
            .unwrap_or(rest.len());
        let name = rest[..name_len].to_ascii_lowercase();
        rest = rest[name_len..].trim_start();

        let value = if let Some(after_eq) = rest.strip_prefix('=') {
            let after_eq = after_eq.trim_start();
            let (value, remaining) = read_value(after_eq);
            rest = remaining;
            value
        } else {
            String::new()
        };

        if !name.is_empty() && !attributes.iter().any(|(n, _)| *n == name) {
            attributes.push((name, value));
        }
    }

    attributes
}

fn read_value(input: &str) -> (String, &str) {
    match input.chars().next() {
        Some(quote @ ('"' | '\'')) => {
            let body = &input[1..];
            match body.find(quote) {
                Some(end) => (body[..end].to_string(), &body[end + 1..]),
                None => (body.to_string(), ""),
            }
        }
        _ => {
            let end = input.find(char::is_whitespace).unwrap_or(input.len());
            (input[..end].to_string(), &input[end..])
        }
    }
}
