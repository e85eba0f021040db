//! # rangemark-syntax
//!
//! A lossless HTML tokenizer built on [Logos].
//!
//! [Logos]: https://docs.rs/logos
//!
//! The highlight engine needs a document tree whose text nodes line up
//! exactly with what a browser would produce for the same markup, so
//! addresses computed here resolve against the browser's DOM too. This
//! crate only does the first step: turning source text into a flat token
//! stream where **every byte** belongs to exactly one token.
//!
//! ```text
//! "<p>Hi <b>there</b></p>" → [START_TAG, TEXT("Hi "), START_TAG, TEXT, END_TAG, END_TAG]
//! ```
//!
//! ## Module Structure
//!
//! ```text
//! rangemark-syntax/
//! ├── lib.rs          # This file - public API
//! ├── syntax_kind.rs  # SyntaxKind enum for tokens
//! ├── lexer.rs        # Logos-based tokenizer
//! └── tag.rs          # Start/end tag parsing (names, attributes)
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use rangemark_syntax::{lex, SyntaxKind};
//!
//! let tokens = lex("<p>Hello</p>");
//! assert_eq!(tokens[0].kind, SyntaxKind::START_TAG);
//! assert_eq!(tokens[1].text, "Hello");
//! ```
//!
//! Tree building (void elements, implied end tags, entity decoding) lives in
//! the engine crate, which owns the document tree type.

pub mod lexer;
pub mod syntax_kind;
pub mod tag;

pub use lexer::{Token, lex, lex_with_spans};
pub use syntax_kind::SyntaxKind;
pub use tag::{StartTag, end_tag_name, is_raw_text_element, is_void_element, parse_start_tag};
