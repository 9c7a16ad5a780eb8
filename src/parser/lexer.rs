//! Logos-based lexer for grammar files
//!
//! Fast tokenization using the logos crate. Action blocks (`{ ... }`) need
//! brace matching, which a regular language cannot express, so the wrapper
//! extends the logos `{` token by hand unless the brace opens an
//! `options`/`tokens`/`channels` list.

use super::syntax_kind::SyntaxKind;
use logos::Logos;
use rowan::TextSize;

/// A token with its kind, text, and position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: SyntaxKind,
    pub text: &'a str,
    pub offset: TextSize,
}

/// Lexer wrapping the logos-generated tokenizer
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, LogosToken>,
    offset: u32,
    prev_significant: Option<SyntaxKind>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            inner: LogosToken::lexer(input),
            offset: 0,
            prev_significant: None,
        }
    }

    /// A `{` opens an ordinary brace list only directly after these keywords.
    fn opens_brace_list(&self) -> bool {
        matches!(
            self.prev_significant,
            Some(SyntaxKind::OPTIONS_KW | SyntaxKind::TOKENS_KW | SyntaxKind::CHANNELS_KW)
        )
    }

    /// Extend the current `{` token to its matching `}`.
    fn lex_action(&mut self) -> SyntaxKind {
        match action_len(self.inner.remainder()) {
            Some(len) => {
                self.inner.bump(len);
                SyntaxKind::ACTION
            }
            None => {
                let rest = self.inner.remainder().len();
                self.inner.bump(rest);
                SyntaxKind::ERROR
            }
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let logos_token = self.inner.next()?;

        let kind = match logos_token {
            Ok(LogosToken::LBrace) if !self.opens_brace_list() => self.lex_action(),
            Ok(t) => t.into(),
            Err(()) => SyntaxKind::ERROR,
        };

        let text = self.inner.slice();
        let offset = TextSize::new(self.offset);
        self.offset += text.len() as u32;

        let kind = if kind == SyntaxKind::BLOCK_COMMENT && is_doc_comment(text) {
            SyntaxKind::DOC_COMMENT
        } else {
            kind
        };
        if !kind.is_trivia() {
            self.prev_significant = Some(kind);
        }

        Some(Token { kind, text, offset })
    }
}

/// Tokenize an entire string into a Vec
pub fn tokenize(input: &str) -> Vec<Token<'_>> {
    Lexer::new(input).collect()
}

fn is_doc_comment(text: &str) -> bool {
    text.starts_with("/**") && text != "/**/"
}

/// Length (in bytes) of an action body following its opening `{`, including
/// the closing `}`. Quoted strings and comments inside the action do not count
/// braces. Returns `None` if the action is never closed.
fn action_len(rest: &str) -> Option<usize> {
    let bytes = rest.as_bytes();
    let mut depth = 1usize;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            quote @ (b'"' | b'\'') => {
                i += 1;
                while i < bytes.len() && bytes[i] != quote && bytes[i] != b'\n' {
                    if bytes[i] == b'\\' {
                        i += 1;
                    }
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => match rest[i + 2..].find("*/") {
                Some(end) => i += 2 + end + 1,
                None => return None,
            },
            _ => {}
        }
        i += 1;
    }
    None
}

/// Consume a block comment body. An unterminated comment swallows the rest of
/// the input and lexes as an error.
fn block_comment(lex: &mut logos::Lexer<LogosToken>) -> bool {
    match lex.remainder().find("*/") {
        Some(end) => {
            lex.bump(end + 2);
            true
        }
        None => {
            let rest = lex.remainder().len();
            lex.bump(rest);
            false
        }
    }
}

/// Logos token enum - maps to SyntaxKind
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
pub enum LogosToken {
    // =========================================================================
    // TRIVIA
    // =========================================================================
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r"//[^\n]*")]
    LineComment,

    #[token("/*", block_comment)]
    BlockComment,

    // =========================================================================
    // LITERALS
    // =========================================================================
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*")]
    Ident,

    #[regex(r"'([^'\\\r\n]|\\.)*'")]
    String,

    #[regex(r"'([^'\\\r\n]|\\.)*")]
    UnterminatedString,

    #[regex(r"[0-9]+")]
    Int,

    #[regex(r"\[([^\]\\]|\\.)*\]")]
    BracketBlock,

    // =========================================================================
    // MULTI-CHARACTER PUNCTUATION (must come before single-char)
    // =========================================================================
    #[token("::")]
    ColonColon,

    #[token("+=")]
    PlusEq,

    #[token("..")]
    DotDot,

    #[token("->")]
    Arrow,

    // =========================================================================
    // SINGLE-CHARACTER PUNCTUATION
    // =========================================================================
    #[token(":")]
    Colon,

    #[token(";")]
    Semicolon,

    #[token("|")]
    Pipe,

    #[token("(")]
    LParen,

    #[token(")")]
    RParen,

    #[token("{")]
    LBrace,

    #[token("}")]
    RBrace,

    #[token("[")]
    LBracket,

    #[token("?")]
    Question,

    #[token("*")]
    Star,

    #[token("+")]
    Plus,

    #[token("=")]
    Eq,

    #[token("~")]
    Tilde,

    #[token(".")]
    Dot,

    #[token(",")]
    Comma,

    #[token("#")]
    Hash,

    #[token("@")]
    At,

    #[token("<")]
    Lt,

    #[token(">")]
    Gt,

    // =========================================================================
    // KEYWORDS
    // =========================================================================
    #[token("grammar")]
    GrammarKw,
    #[token("lexer")]
    LexerKw,
    #[token("parser")]
    ParserKw,
    #[token("fragment")]
    FragmentKw,
    #[token("import")]
    ImportKw,
    #[token("options")]
    OptionsKw,
    #[token("tokens")]
    TokensKw,
    #[token("channels")]
    ChannelsKw,
    #[token("mode")]
    ModeKw,
    #[token("returns")]
    ReturnsKw,
    #[token("locals")]
    LocalsKw,
    #[token("throws")]
    ThrowsKw,
    #[token("catch")]
    CatchKw,
    #[token("finally")]
    FinallyKw,
    #[token("public")]
    PublicKw,
    #[token("private")]
    PrivateKw,
    #[token("protected")]
    ProtectedKw,
}

impl From<LogosToken> for SyntaxKind {
    fn from(token: LogosToken) -> Self {
        use LogosToken::*;
        match token {
            Whitespace => SyntaxKind::WHITESPACE,
            LineComment => SyntaxKind::LINE_COMMENT,
            BlockComment => SyntaxKind::BLOCK_COMMENT,
            Ident => SyntaxKind::IDENT,
            String => SyntaxKind::STRING,
            UnterminatedString => SyntaxKind::ERROR,
            Int => SyntaxKind::INT,
            BracketBlock => SyntaxKind::BRACKET_BLOCK,
            ColonColon => SyntaxKind::COLON_COLON,
            PlusEq => SyntaxKind::PLUS_EQ,
            DotDot => SyntaxKind::DOT_DOT,
            Arrow => SyntaxKind::ARROW,
            Colon => SyntaxKind::COLON,
            Semicolon => SyntaxKind::SEMICOLON,
            Pipe => SyntaxKind::PIPE,
            LParen => SyntaxKind::L_PAREN,
            RParen => SyntaxKind::R_PAREN,
            LBrace => SyntaxKind::L_BRACE,
            RBrace => SyntaxKind::R_BRACE,
            LBracket => SyntaxKind::ERROR,
            Question => SyntaxKind::QUESTION,
            Star => SyntaxKind::STAR,
            Plus => SyntaxKind::PLUS,
            Eq => SyntaxKind::EQ,
            Tilde => SyntaxKind::TILDE,
            Dot => SyntaxKind::DOT,
            Comma => SyntaxKind::COMMA,
            Hash => SyntaxKind::HASH,
            At => SyntaxKind::AT,
            Lt => SyntaxKind::LT,
            Gt => SyntaxKind::GT,
            GrammarKw => SyntaxKind::GRAMMAR_KW,
            LexerKw => SyntaxKind::LEXER_KW,
            ParserKw => SyntaxKind::PARSER_KW,
            FragmentKw => SyntaxKind::FRAGMENT_KW,
            ImportKw => SyntaxKind::IMPORT_KW,
            OptionsKw => SyntaxKind::OPTIONS_KW,
            TokensKw => SyntaxKind::TOKENS_KW,
            ChannelsKw => SyntaxKind::CHANNELS_KW,
            ModeKw => SyntaxKind::MODE_KW,
            ReturnsKw => SyntaxKind::RETURNS_KW,
            LocalsKw => SyntaxKind::LOCALS_KW,
            ThrowsKw => SyntaxKind::THROWS_KW,
            CatchKw => SyntaxKind::CATCH_KW,
            FinallyKw => SyntaxKind::FINALLY_KW,
            PublicKw => SyntaxKind::PUBLIC_KW,
            PrivateKw => SyntaxKind::PRIVATE_KW,
            ProtectedKw => SyntaxKind::PROTECTED_KW,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<SyntaxKind> {
        Lexer::new(input)
            .map(|t| t.kind)
            .filter(|k| !k.is_trivia())
            .collect()
    }

    #[test]
    fn test_lex_header() {
        let tokens: Vec<_> = Lexer::new("grammar Expr;").collect();
        assert_eq!(tokens.len(), 4); // grammar, whitespace, Expr, ;
        assert_eq!(tokens[0].kind, SyntaxKind::GRAMMAR_KW);
        assert_eq!(tokens[1].kind, SyntaxKind::WHITESPACE);
        assert_eq!(tokens[2].kind, SyntaxKind::IDENT);
        assert_eq!(tokens[3].kind, SyntaxKind::SEMICOLON);
    }

    #[test]
    fn test_lex_offsets_are_contiguous() {
        let input = "a : 'x' {foo();} B* ;";
        let mut expected = 0u32;
        for token in Lexer::new(input) {
            assert_eq!(u32::from(token.offset), expected);
            expected += token.text.len() as u32;
        }
        assert_eq!(expected as usize, input.len());
    }

    #[test]
    fn test_lex_action_is_one_token() {
        let tokens: Vec<_> = Lexer::new("@members { int x = '}'; { } }").collect();
        let action = tokens.iter().find(|t| t.kind == SyntaxKind::ACTION);
        assert_eq!(action.map(|t| t.text), Some("{ int x = '}'; { } }"));
    }

    #[test]
    fn test_lex_brace_list_after_options() {
        assert_eq!(
            kinds("options { tokenVocab = L; }"),
            vec![
                SyntaxKind::OPTIONS_KW,
                SyntaxKind::L_BRACE,
                SyntaxKind::IDENT,
                SyntaxKind::EQ,
                SyntaxKind::IDENT,
                SyntaxKind::SEMICOLON,
                SyntaxKind::R_BRACE,
            ]
        );
        assert_eq!(
            kinds("tokens /* c */ { A }"),
            vec![
                SyntaxKind::TOKENS_KW,
                SyntaxKind::L_BRACE,
                SyntaxKind::IDENT,
                SyntaxKind::R_BRACE,
            ]
        );
    }

    #[test]
    fn test_lex_unterminated_action_runs_to_eof() {
        let tokens: Vec<_> = Lexer::new("a : {x ;\nb : c ;").collect();
        let last = tokens.last().map(|t| (t.kind, t.text));
        assert_eq!(last, Some((SyntaxKind::ERROR, "{x ;\nb : c ;")));
    }

    #[test]
    fn test_lex_strings() {
        assert_eq!(kinds(r"'a\'b'"), vec![SyntaxKind::STRING]);
        assert_eq!(kinds("'abc"), vec![SyntaxKind::ERROR]);
    }

    #[test]
    fn test_lex_char_set_and_range() {
        assert_eq!(
            kinds(r"[a-z\]] 'a'..'z'"),
            vec![
                SyntaxKind::BRACKET_BLOCK,
                SyntaxKind::STRING,
                SyntaxKind::DOT_DOT,
                SyntaxKind::STRING,
            ]
        );
    }

    #[test]
    fn test_lex_doc_comment() {
        let tokens: Vec<_> = Lexer::new("/** docs */ /**/ /* plain */").collect();
        assert_eq!(tokens[0].kind, SyntaxKind::DOC_COMMENT);
        assert_eq!(tokens[2].kind, SyntaxKind::BLOCK_COMMENT);
        assert_eq!(tokens[4].kind, SyntaxKind::BLOCK_COMMENT);
    }

    #[test]
    fn test_lex_keywords_vs_idents() {
        assert_eq!(
            kinds("fragment fragments mode modeX"),
            vec![
                SyntaxKind::FRAGMENT_KW,
                SyntaxKind::IDENT,
                SyntaxKind::MODE_KW,
                SyntaxKind::IDENT,
            ]
        );
    }

    #[test]
    fn test_action_len_skips_comments() {
        assert_eq!(action_len("// }\n}"), Some(6));
        assert_eq!(action_len("/* } */ }"), Some(9));
        assert_eq!(action_len("{"), None);
    }
}
