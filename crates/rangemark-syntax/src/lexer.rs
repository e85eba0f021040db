//! # Lexer - Tokenizing HTML Source
//!
//! This module breaks HTML source into tokens using the [Logos] lexer
//! generator.
//!
//! [Logos]: https://docs.rs/logos
//!
//! ## The Lossless Guarantee
//!
//! **Every byte in the input appears in exactly one token.** Nothing is
//! skipped, so a document can always be reconstructed from its tokens:
//!
//! ```
//! use rangemark_syntax::lexer::lex;
//!
//! let input = "<p class=\"lead\">Hello, <b>world</b>!</p>";
//! let tokens = lex(input);
//!
//! let reconstructed: String = tokens.iter().map(|t| t.text).collect();
//! assert_eq!(input, reconstructed);
//! ```
//!
//! ## Context the DFA cannot see
//!
//! Two constructs need more than a regular expression:
//!
//! - Comments run until the first `-->`, which may contain `>` characters.
//!   Logos only matches the opening `<!--`; [`lex`] extends the token.
//! - The content of raw text elements (`script`, `style`, `textarea`,
//!   `title`) is not markup. After their start tag [`lex`] consumes
//!   everything up to the matching end tag as one `RAW_TEXT` token.
//!
//! A `<` that starts no valid construct is a Logos error and becomes `TEXT`.

use logos::Logos;

use crate::syntax_kind::SyntaxKind;
use crate::tag::{is_raw_text_element, parse_start_tag};

/// Token kinds produced by the Logos lexer.
///
/// Separate from [`SyntaxKind`] because Logos needs to derive on it and
/// because comments and raw text are finished by [`lex`], not by Logos.
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Opening of a comment; the body is consumed by the driver
    #[token("<!--")]
    CommentOpen,

    /// `<!DOCTYPE html>` and friends
    #[regex(r"<![A-Za-z][^>]*>")]
    Doctype,

    /// `<?xml ...?>`
    #[regex(r"<\?[^>]*>")]
    ProcessingInstruction,

    /// `</name>`
    #[regex(r"</[A-Za-z][A-Za-z0-9:-]*[ \t\r\n\x0C]*>")]
    EndTag,

    /// `<name attr=value ...>`, quoted values may contain `>`
    #[regex(r#"<[A-Za-z][A-Za-z0-9:-]*([^>"']|"[^"]*"|'[^']*')*>"#)]
    StartTag,

    /// Character data
    #[regex(r"[^<]+")]
    Text,
}

impl TokenKind {
    /// Convert to SyntaxKind.
    pub fn to_syntax_kind(self) -> SyntaxKind {
        match self {
            TokenKind::CommentOpen => SyntaxKind::COMMENT,
            TokenKind::Doctype => SyntaxKind::DOCTYPE,
            TokenKind::ProcessingInstruction => SyntaxKind::PROCESSING_INSTRUCTION,
            TokenKind::EndTag => SyntaxKind::END_TAG,
            TokenKind::StartTag => SyntaxKind::START_TAG,
            TokenKind::Text => SyntaxKind::TEXT,
        }
    }
}

/// A lexed token with its kind and text slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
}

/// Lex the input into a sequence of tokens.
///
/// Guarantees that all bytes from the input appear in the output tokens.
pub fn lex(input: &str) -> Vec<Token<'_>> {
    lex_with_spans(input)
        .into_iter()
        .map(|(token, _)| token)
        .collect()
}

/// Lex and return tokens along with their byte spans.
pub fn lex_with_spans(input: &str) -> Vec<(Token<'_>, std::ops::Range<usize>)> {
    let mut tokens = Vec::new();
    let mut lexer = TokenKind::lexer(input);

    while let Some(result) = lexer.next() {
        match result {
            Ok(TokenKind::CommentOpen) => {
                let body = lexer
                    .remainder()
                    .find("-->")
                    .map_or(lexer.remainder().len(), |end| end + 3);
                lexer.bump(body);
                push(&mut tokens, input, SyntaxKind::COMMENT, lexer.span());
            }
            Ok(TokenKind::StartTag) => {
                push(&mut tokens, input, SyntaxKind::START_TAG, lexer.span());

                let tag = parse_start_tag(lexer.slice());
                if let Some(tag) = tag
                    && !tag.self_closing
                    && is_raw_text_element(&tag.name)
                {
                    let raw_len = find_end_tag(lexer.remainder(), &tag.name);
                    if raw_len > 0 {
                        let start = lexer.span().end;
                        lexer.bump(raw_len);
                        push(&mut tokens, input, SyntaxKind::RAW_TEXT, start..start + raw_len);
                    }
                }
            }
            Ok(kind) => push(&mut tokens, input, kind.to_syntax_kind(), lexer.span()),
            // Logos error means a stray `<` - treat as TEXT
            Err(()) => push(&mut tokens, input, SyntaxKind::TEXT, lexer.span()),
        }
    }

    tokens
}

fn push<'a>(
    tokens: &mut Vec<(Token<'a>, std::ops::Range<usize>)>,
    input: &'a str,
    kind: SyntaxKind,
    span: std::ops::Range<usize>,
) {
    let text = &input[span.clone()];
    tokens.push((Token { kind, text }, span));
}

/// Byte length of raw text before `</name`, matched case-insensitively.
fn find_end_tag(remainder: &str, name: &str) -> usize {
    let needle = format!("</{name}");
    // ASCII lowercasing keeps byte offsets intact
    remainder
        .to_ascii_lowercase()
        .find(&needle)
        .unwrap_or(remainder.len())
}
