//! Syntax kinds for the Rowan-based CST
//!
//! This enum defines all possible node and token kinds in the syntax tree of a
//! grammar file: the header, prequel constructs, parser/lexer rules and the
//! element structure of their alternatives.

/// All syntax kinds (tokens and nodes) of the grammar language
///
/// Tokens are leaf nodes (identifiers, keywords, punctuation, opaque blocks).
/// Nodes are composite (rules, alternatives, elements).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u16)]
#[allow(non_camel_case_types)]
pub enum SyntaxKind {
    // =========================================================================
    // TRIVIA (whitespace and comments - preserved but not semantically meaningful)
    // =========================================================================
    WHITESPACE = 0,
    LINE_COMMENT,
    BLOCK_COMMENT,
    DOC_COMMENT, // /** ... */

    // =========================================================================
    // LITERALS AND OPAQUE BLOCKS
    // =========================================================================
    IDENT,         // expr, INT
    STRING,        // 'abc'
    INT,           // 42
    ACTION,        // { target code }
    BRACKET_BLOCK, // [a-z] or [int x]

    // =========================================================================
    // PUNCTUATION
    // =========================================================================
    COLON,       // :
    COLON_COLON, // ::
    SEMICOLON,   // ;
    PIPE,        // |
    L_PAREN,     // (
    R_PAREN,     // )
    L_BRACE,     // {  (only inside options/tokens/channels)
    R_BRACE,     // }
    QUESTION,    // ?
    STAR,        // *
    PLUS,        // +
    PLUS_EQ,     // +=
    EQ,          // =
    TILDE,       // ~
    DOT,         // .
    DOT_DOT,     // ..
    ARROW,       // ->
    COMMA,       // ,
    HASH,        // #
    AT,          // @
    LT,          // <
    GT,          // >

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    GRAMMAR_KW,
    LEXER_KW,
    PARSER_KW,
    FRAGMENT_KW,
    IMPORT_KW,
    OPTIONS_KW,
    TOKENS_KW,
    CHANNELS_KW,
    MODE_KW,
    RETURNS_KW,
    LOCALS_KW,
    THROWS_KW,
    CATCH_KW,
    FINALLY_KW,
    PUBLIC_KW,
    PRIVATE_KW,
    PROTECTED_KW,

    // =========================================================================
    // NODES - file structure
    // =========================================================================
    SOURCE_FILE,
    GRAMMAR_DECL,
    NAME,     // declared name
    NAME_REF, // referenced name outside rule bodies (imports, options, commands)
    OPTIONS_SPEC,
    OPTION,
    IMPORT_DECL,
    IMPORT_ITEM,
    TOKENS_SPEC,
    CHANNELS_SPEC,
    TOKEN_DECL,
    CHANNEL_DECL,
    NAMED_ACTION,
    MODE_SECTION,

    // =========================================================================
    // NODES - rules
    // =========================================================================
    PARSER_RULE,
    LEXER_RULE,
    ARG_SPEC,
    RETURNS_SPEC,
    LOCALS_SPEC,
    THROWS_SPEC,
    RULE_ACTION,
    EXCEPTION_HANDLER,
    FINALLY_CLAUSE,

    // =========================================================================
    // NODES - alternatives and elements
    // =========================================================================
    ALT_LIST,
    ALTERNATIVE,
    ALT_LABEL,
    ELEMENT_OPTIONS,
    LABELED_ELEMENT,
    EBNF_ELEMENT,
    BLOCK,
    RULE_REF,
    TOKEN_REF,
    STRING_LITERAL,
    CHAR_RANGE,
    CHAR_SET,
    WILDCARD,
    NOT_ELEMENT,
    ACTION_ELEMENT,
    PREDICATE,
    LEXER_COMMANDS,
    LEXER_COMMAND,

    // =========================================================================
    // SPECIAL
    // =========================================================================
    ERROR,

    #[doc(hidden)]
    __LAST,
}

impl SyntaxKind {
    /// Check if this is a trivia token (whitespace or comment)
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            Self::WHITESPACE | Self::LINE_COMMENT | Self::BLOCK_COMMENT | Self::DOC_COMMENT
        )
    }

    /// Check if this is a keyword
    pub fn is_keyword(self) -> bool {
        (self as u16) >= (Self::GRAMMAR_KW as u16) && (self as u16) <= (Self::PROTECTED_KW as u16)
    }

    /// Rule modifiers that may precede a rule name
    pub fn is_rule_modifier(self) -> bool {
        matches!(
            self,
            Self::FRAGMENT_KW | Self::PUBLIC_KW | Self::PRIVATE_KW | Self::PROTECTED_KW
        )
    }

    /// Kinds that introduce an EBNF suffix
    pub fn is_ebnf_suffix(self) -> bool {
        matches!(self, Self::QUESTION | Self::STAR | Self::PLUS)
    }
}

impl From<SyntaxKind> for rowan::SyntaxKind {
    fn from(kind: SyntaxKind) -> Self {
        Self(kind as u16)
    }
}

impl From<rowan::SyntaxKind> for SyntaxKind {
    fn from(raw: rowan::SyntaxKind) -> Self {
        assert!(raw.0 < SyntaxKind::__LAST as u16);
        // Safety: we control all syntax kinds and check bounds above
        unsafe { std::mem::transmute::<u16, SyntaxKind>(raw.0) }
    }
}

/// Language definition for Rowan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GrammarLanguage {}

impl rowan::Language for GrammarLanguage {
    type Kind = SyntaxKind;

    fn kind_from_raw(raw: rowan::SyntaxKind) -> Self::Kind {
        raw.into()
    }

    fn kind_to_raw(kind: Self::Kind) -> rowan::SyntaxKind {
        kind.into()
    }
}

pub type SyntaxNode = rowan::SyntaxNode<GrammarLanguage>;
pub type SyntaxToken = rowan::SyntaxToken<GrammarLanguage>;
pub type SyntaxElement = rowan::SyntaxElement<GrammarLanguage>;
pub type SyntaxNodeChildren = rowan::SyntaxNodeChildren<GrammarLanguage>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_roundtrip() {
        for kind in [SyntaxKind::WHITESPACE, SyntaxKind::PARSER_RULE, SyntaxKind::ERROR] {
            let raw: rowan::SyntaxKind = kind.into();
            assert_eq!(SyntaxKind::from(raw), kind);
        }
    }

    #[test]
    fn test_classification() {
        assert!(SyntaxKind::DOC_COMMENT.is_trivia());
        assert!(!SyntaxKind::IDENT.is_trivia());
        assert!(SyntaxKind::MODE_KW.is_keyword());
        assert!(!SyntaxKind::SOURCE_FILE.is_keyword());
        assert!(SyntaxKind::FRAGMENT_KW.is_rule_modifier());
    }
}
