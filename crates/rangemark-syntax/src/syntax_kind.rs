//! SyntaxKind enum for all tokens produced by the HTML lexer.
//!
//! Every byte in the source belongs to exactly one token of one of these kinds.

/// All token kinds of the HTML token stream.
///
/// We use SCREAMING_CASE following the rust-analyzer convention for SyntaxKind.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    /// Character data between tags
    TEXT,
    /// Unparsed content of `script`, `style`, `textarea` and `title`
    RAW_TEXT,
    /// `<tag attr="value">` or `<tag/>`
    START_TAG,
    /// `</tag>`
    END_TAG,
    /// `<!-- ... -->`
    COMMENT,
    /// `<!DOCTYPE ...>` and other `<!...>` declarations
    DOCTYPE,
    /// `<?...>`
    PROCESSING_INSTRUCTION,
}

impl SyntaxKind {
    /// Whether tokens of this kind carry document text.
    pub fn is_text(self) -> bool {
        matches!(self, SyntaxKind::TEXT | SyntaxKind::RAW_TEXT)
    }

    /// Whether tokens of this kind leave no trace in a tree.
    ///
    /// Comments are not trivia: they stay in the tree so serialization
    /// round-trips, they just carry no addressable text.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::DOCTYPE | SyntaxKind::PROCESSING_INSTRUCTION
        )
    }
}
