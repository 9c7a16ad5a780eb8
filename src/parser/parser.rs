//! Recursive descent parser for grammar files
//!
//! Builds a rowan GreenNode tree from tokens.
//! Supports error recovery and produces a lossless CST: every input byte ends
//! up in exactly one token of the tree, including skipped garbage which is
//! wrapped in `ERROR` nodes.

use super::lexer::{Token, tokenize};
use super::syntax_kind::SyntaxKind;
use rowan::{Checkpoint, GreenNode, GreenNodeBuilder, TextRange, TextSize};
use tokio_util::sync::CancellationToken;

/// Parse result containing the green tree and any errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parse {
    pub green: GreenNode,
    pub errors: Vec<SyntaxError>,
}

impl Parse {
    /// Get the root syntax node
    pub fn syntax(&self) -> super::SyntaxNode {
        super::SyntaxNode::new_root(self.green.clone())
    }

    /// Typed root of the tree
    pub fn source_file(&self) -> super::ast::SourceFile {
        super::ast::SourceFile::from_root(self.syntax())
    }

    /// Check if parsing succeeded without errors
    pub fn ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// A syntax error with location and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub message: String,
    pub range: TextRange,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>, range: TextRange) -> Self {
        Self {
            message: message.into(),
            range,
        }
    }
}

/// Parse grammar source text into a CST
pub fn parse(input: &str) -> Parse {
    let tokens = tokenize(input);
    let mut parser = Parser::new(&tokens, input, None);
    parser.parse_source_file();
    parser.finish()
}

/// Parse grammar source text, giving up early once `cancel` fires.
///
/// Returns `None` if the token was cancelled before parsing completed.
pub fn parse_cancellable(input: &str, cancel: &CancellationToken) -> Option<Parse> {
    if cancel.is_cancelled() {
        return None;
    }
    let tokens = tokenize(input);
    let mut parser = Parser::new(&tokens, input, Some(cancel));
    parser.parse_source_file();
    if cancel.is_cancelled() {
        return None;
    }
    Some(parser.finish())
}

/// Whether an identifier names a token (lexer rule) rather than a parser rule
pub fn is_token_name(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// The parser state
struct Parser<'a> {
    tokens: &'a [Token<'a>],
    pos: usize,
    builder: GreenNodeBuilder<'static>,
    errors: Vec<SyntaxError>,
    text_len: TextSize,
    last_end: TextSize,
    saw_header: bool,
    cancel: Option<&'a CancellationToken>,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token<'a>], input: &str, cancel: Option<&'a CancellationToken>) -> Self {
        Self {
            tokens,
            pos: 0,
            builder: GreenNodeBuilder::new(),
            errors: Vec::new(),
            text_len: TextSize::of(input),
            last_end: TextSize::new(0),
            saw_header: false,
            cancel,
        }
    }

    fn finish(self) -> Parse {
        Parse {
            green: self.builder.finish(),
            errors: self.errors,
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|c| c.is_cancelled())
    }

    // =========================================================================
    // Token inspection (all lookahead skips trivia)
    // =========================================================================

    fn nth_token(&self, n: usize) -> Option<&'a Token<'a>> {
        let tokens = self.tokens;
        tokens[self.pos..].iter().filter(|t| !t.kind.is_trivia()).nth(n)
    }

    fn current(&self) -> Option<&'a Token<'a>> {
        self.nth_token(0)
    }

    fn current_kind(&self) -> SyntaxKind {
        self.current().map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    fn current_text(&self) -> &'a str {
        self.current().map(|t| t.text).unwrap_or("")
    }

    fn at(&self, kind: SyntaxKind) -> bool {
        !self.at_eof() && self.current_kind() == kind
    }

    fn at_any(&self, kinds: &[SyntaxKind]) -> bool {
        !self.at_eof() && kinds.contains(&self.current_kind())
    }

    fn at_eof(&self) -> bool {
        self.current().is_none()
    }

    fn nth(&self, n: usize) -> SyntaxKind {
        self.nth_token(n).map(|t| t.kind).unwrap_or(SyntaxKind::ERROR)
    }

    /// `name :` or `name[args] returns ...` - the start of a rule
    fn at_rule_start(&self) -> bool {
        if !self.at(SyntaxKind::IDENT) {
            return false;
        }
        let is_prequel = |kind| {
            matches!(
                kind,
                SyntaxKind::COLON
                    | SyntaxKind::RETURNS_KW
                    | SyntaxKind::LOCALS_KW
                    | SyntaxKind::THROWS_KW
            )
        };
        match self.nth(1) {
            SyntaxKind::BRACKET_BLOCK => {
                is_prequel(self.nth(2)) || matches!(self.nth(2), SyntaxKind::OPTIONS_KW | SyntaxKind::AT)
            }
            kind => is_prequel(kind),
        }
    }

    /// Synchronisation points for error recovery at file level
    fn at_member_start(&self) -> bool {
        if self.at_eof() {
            return false;
        }
        match self.current_kind() {
            SyntaxKind::GRAMMAR_KW
            | SyntaxKind::OPTIONS_KW
            | SyntaxKind::IMPORT_KW
            | SyntaxKind::TOKENS_KW
            | SyntaxKind::CHANNELS_KW
            | SyntaxKind::AT
            | SyntaxKind::MODE_KW => true,
            kind if kind.is_rule_modifier() => true,
            SyntaxKind::LEXER_KW | SyntaxKind::PARSER_KW => self.nth(1) == SyntaxKind::GRAMMAR_KW,
            SyntaxKind::IDENT => self.at_rule_start(),
            _ => false,
        }
    }

    fn at_element_start(&self) -> bool {
        if self.at_eof() {
            return false;
        }
        match self.current_kind() {
            SyntaxKind::IDENT => !self.at_rule_start(),
            SyntaxKind::STRING
            | SyntaxKind::L_PAREN
            | SyntaxKind::DOT
            | SyntaxKind::TILDE
            | SyntaxKind::ACTION
            | SyntaxKind::BRACKET_BLOCK
            | SyntaxKind::ERROR => true,
            _ => false,
        }
    }

    fn at_action_name(&self) -> bool {
        self.at_any(&[SyntaxKind::IDENT, SyntaxKind::PARSER_KW, SyntaxKind::LEXER_KW])
    }

    // =========================================================================
    // Token consumption
    // =========================================================================

    fn bump(&mut self) {
        self.skip_trivia();
        let tokens = self.tokens;
        if let Some(token) = tokens.get(self.pos) {
            if token.kind == SyntaxKind::ERROR {
                let range = TextRange::at(token.offset, TextSize::of(token.text));
                self.errors
                    .push(SyntaxError::new(lexical_error_message(token.text), range));
            }
            self.builder.token(token.kind.into(), token.text);
            self.last_end = token.offset + TextSize::of(token.text);
            self.pos += 1;
        }
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: SyntaxKind) -> bool {
        if self.eat(kind) {
            true
        } else {
            self.error(format!("expected {}", token_name(kind)));
            false
        }
    }

    fn skip_trivia(&mut self) {
        let tokens = self.tokens;
        while let Some(token) = tokens.get(self.pos) {
            if !token.kind.is_trivia() {
                break;
            }
            self.builder.token(token.kind.into(), token.text);
            self.pos += 1;
        }
    }

    // =========================================================================
    // Error handling
    // =========================================================================

    fn error(&mut self, message: impl Into<String>) {
        let range = self
            .current()
            .map(|t| TextRange::at(t.offset, TextSize::of(t.text)))
            .unwrap_or_else(|| TextRange::empty(self.text_len));
        self.errors.push(SyntaxError::new(message, range));
    }

    /// Report an error right after the previous significant token
    fn error_after_previous(&mut self, message: impl Into<String>) {
        self.errors
            .push(SyntaxError::new(message, TextRange::empty(self.last_end)));
    }

    /// Report an error and skip tokens until a recovery token or the start of
    /// the next grammar member.
    fn error_recover(&mut self, message: impl Into<String>, recovery: &[SyntaxKind]) {
        self.error(message);
        self.start_node(SyntaxKind::ERROR);
        // Always consume at least one token to make progress
        let mut consumed = false;
        while !self.at_eof() && !self.at_any(recovery) && !(consumed && self.at_member_start()) {
            self.bump();
            consumed = true;
        }
        if !consumed && !self.at_eof() {
            self.bump();
        }
        self.finish_node();
    }

    /// Wrap a lexically invalid token; `bump` reports it.
    fn bump_error_token(&mut self) {
        self.start_node(SyntaxKind::ERROR);
        self.bump();
        self.finish_node();
    }

    // =========================================================================
    // Node building helpers
    // =========================================================================

    /// Leading trivia stays outside the node so node ranges start at a token.
    fn start_node(&mut self, kind: SyntaxKind) {
        self.skip_trivia();
        self.builder.start_node(kind.into());
    }

    fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    fn checkpoint(&mut self) -> Checkpoint {
        self.skip_trivia();
        self.builder.checkpoint()
    }

    fn parse_name(&mut self, what: &str) {
        if self.at(SyntaxKind::IDENT) {
            self.start_node(SyntaxKind::NAME);
            self.bump();
            self.finish_node();
        } else {
            self.error(format!("expected {what}"));
        }
    }

    fn parse_name_ref(&mut self) {
        self.start_node(SyntaxKind::NAME_REF);
        self.bump();
        self.finish_node();
    }

    // =========================================================================
    // File structure
    // =========================================================================

    /// SourceFile = GrammarMember*
    fn parse_source_file(&mut self) {
        self.start_node(SyntaxKind::SOURCE_FILE);

        while !self.at_eof() {
            if self.is_cancelled() {
                break;
            }
            let pos_before = self.pos;
            self.parse_member();
            // Safety: if we didn't make progress, force-skip a token
            if self.pos == pos_before && !self.at_eof() {
                self.error(format!("stuck on token: {:?}", self.current_kind()));
                self.bump();
            }
        }
        self.skip_trivia();

        if !self.saw_header {
            self.errors.insert(
                0,
                SyntaxError::new(
                    "missing grammar declaration",
                    TextRange::empty(TextSize::new(0)),
                ),
            );
        }

        self.finish_node();
    }

    fn parse_member(&mut self) {
        match self.current_kind() {
            SyntaxKind::GRAMMAR_KW => self.parse_grammar_decl(),
            SyntaxKind::LEXER_KW | SyntaxKind::PARSER_KW if self.nth(1) == SyntaxKind::GRAMMAR_KW => {
                self.parse_grammar_decl()
            }
            SyntaxKind::OPTIONS_KW => self.parse_options_spec(),
            SyntaxKind::IMPORT_KW => self.parse_import(),
            SyntaxKind::TOKENS_KW => self.parse_name_list(SyntaxKind::TOKENS_SPEC, SyntaxKind::TOKEN_DECL),
            SyntaxKind::CHANNELS_KW => {
                self.parse_name_list(SyntaxKind::CHANNELS_SPEC, SyntaxKind::CHANNEL_DECL)
            }
            SyntaxKind::AT => self.parse_named_action(),
            SyntaxKind::MODE_KW => self.parse_mode_section(),
            SyntaxKind::IDENT
            | SyntaxKind::FRAGMENT_KW
            | SyntaxKind::PUBLIC_KW
            | SyntaxKind::PRIVATE_KW
            | SyntaxKind::PROTECTED_KW => self.parse_rule(self.rule_kind_ahead()),
            SyntaxKind::ERROR => self.bump_error_token(),
            kind => {
                self.error_recover(
                    format!("expected grammar member, found {}", token_name(kind)),
                    &[SyntaxKind::SEMICOLON],
                );
                self.eat(SyntaxKind::SEMICOLON);
            }
        }
    }

    /// GrammarDecl = ('lexer' | 'parser')? 'grammar' Name ';'
    fn parse_grammar_decl(&mut self) {
        self.saw_header = true;
        self.start_node(SyntaxKind::GRAMMAR_DECL);
        if self.at_any(&[SyntaxKind::LEXER_KW, SyntaxKind::PARSER_KW]) {
            self.bump();
        }
        self.expect(SyntaxKind::GRAMMAR_KW);
        self.parse_name("grammar name");
        self.expect(SyntaxKind::SEMICOLON);
        self.finish_node();
    }

    /// OptionsSpec = 'options' '{' (Ident '=' OptionValue ';')* '}'
    fn parse_options_spec(&mut self) {
        self.start_node(SyntaxKind::OPTIONS_SPEC);
        self.bump();
        if self.expect(SyntaxKind::L_BRACE) {
            while !self.at_eof() && !self.at(SyntaxKind::R_BRACE) {
                if self.at(SyntaxKind::IDENT) && !self.at_rule_start() {
                    self.parse_option();
                } else if self.at_member_start() {
                    break;
                } else {
                    self.error_recover("expected option name", &[SyntaxKind::R_BRACE, SyntaxKind::SEMICOLON]);
                    self.eat(SyntaxKind::SEMICOLON);
                }
            }
            self.expect(SyntaxKind::R_BRACE);
        }
        self.finish_node();
    }

    fn parse_option(&mut self) {
        self.start_node(SyntaxKind::OPTION);
        self.bump();
        if self.expect(SyntaxKind::EQ) {
            match self.current_kind() {
                SyntaxKind::IDENT if !self.at_eof() => {
                    self.start_node(SyntaxKind::NAME_REF);
                    self.bump();
                    while self.at(SyntaxKind::DOT) && self.nth(1) == SyntaxKind::IDENT {
                        self.bump();
                        self.bump();
                    }
                    self.finish_node();
                }
                SyntaxKind::STRING | SyntaxKind::INT | SyntaxKind::ACTION if !self.at_eof() => self.bump(),
                _ => self.error("expected option value"),
            }
        }
        self.expect(SyntaxKind::SEMICOLON);
        self.finish_node();
    }

    /// Import = 'import' ImportItem (',' ImportItem)* ';'
    /// ImportItem = (Name '=')? NameRef
    fn parse_import(&mut self) {
        self.start_node(SyntaxKind::IMPORT_DECL);
        self.bump();
        loop {
            self.start_node(SyntaxKind::IMPORT_ITEM);
            if self.at(SyntaxKind::IDENT) && self.nth(1) == SyntaxKind::EQ {
                self.parse_name("import alias");
                self.bump();
            }
            if self.at(SyntaxKind::IDENT) {
                self.parse_name_ref();
            } else {
                self.error("expected grammar name");
            }
            self.finish_node();
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        self.expect(SyntaxKind::SEMICOLON);
        self.finish_node();
    }

    /// TokensSpec = 'tokens' '{' (Ident (',' Ident)* ','?)? '}', same shape for channels
    fn parse_name_list(&mut self, spec: SyntaxKind, decl: SyntaxKind) {
        self.start_node(spec);
        self.bump();
        if self.expect(SyntaxKind::L_BRACE) {
            while self.at(SyntaxKind::IDENT) {
                self.start_node(decl);
                self.parse_name("identifier");
                self.finish_node();
                if !self.eat(SyntaxKind::COMMA) {
                    break;
                }
            }
            if !self.at_eof() && !self.at(SyntaxKind::R_BRACE) && !self.at_member_start() {
                self.error_recover("expected identifier", &[SyntaxKind::R_BRACE]);
            }
            self.expect(SyntaxKind::R_BRACE);
        }
        self.finish_node();
    }

    /// NamedAction = '@' (ActionScope '::')? Ident Action
    fn parse_named_action(&mut self) {
        self.start_node(SyntaxKind::NAMED_ACTION);
        self.bump();
        if self.at_action_name() {
            self.start_node(SyntaxKind::NAME);
            self.bump();
            if self.at(SyntaxKind::COLON_COLON) {
                self.bump();
                if self.at_action_name() {
                    self.bump();
                } else {
                    self.error("expected action name");
                }
            }
            self.finish_node();
        } else {
            self.error("expected action name");
        }
        self.expect(SyntaxKind::ACTION);
        self.finish_node();
    }

    /// ModeSection = 'mode' Name ';' LexerRule*
    fn parse_mode_section(&mut self) {
        self.start_node(SyntaxKind::MODE_SECTION);
        self.bump();
        self.parse_name("mode name");
        self.expect(SyntaxKind::SEMICOLON);

        while !self.at_eof() && !self.at(SyntaxKind::MODE_KW) {
            if self.is_cancelled() {
                break;
            }
            let pos_before = self.pos;
            match self.current_kind() {
                SyntaxKind::IDENT
                | SyntaxKind::FRAGMENT_KW
                | SyntaxKind::PUBLIC_KW
                | SyntaxKind::PRIVATE_KW
                | SyntaxKind::PROTECTED_KW => self.parse_rule(self.rule_kind_ahead()),
                SyntaxKind::ERROR => self.bump_error_token(),
                _ if self.at_member_start() => break,
                kind => {
                    self.error_recover(
                        format!("expected lexer rule, found {}", token_name(kind)),
                        &[SyntaxKind::SEMICOLON],
                    );
                    self.eat(SyntaxKind::SEMICOLON);
                }
            }
            if self.pos == pos_before && !self.at_eof() {
                self.error(format!("stuck on token: {:?}", self.current_kind()));
                self.bump();
            }
        }

        self.finish_node();
    }

    // =========================================================================
    // Rules
    // =========================================================================

    fn rule_kind_ahead(&self) -> SyntaxKind {
        let mut n = 0;
        while self.nth(n).is_rule_modifier() {
            n += 1;
        }
        match self.nth_token(n) {
            Some(token) if token.kind == SyntaxKind::IDENT => {
                if is_token_name(token.text) {
                    SyntaxKind::LEXER_RULE
                } else {
                    SyntaxKind::PARSER_RULE
                }
            }
            _ if self.at(SyntaxKind::FRAGMENT_KW) => SyntaxKind::LEXER_RULE,
            _ => SyntaxKind::PARSER_RULE,
        }
    }

    /// Rule = Modifier* Name Prequel* ':' AltList ';' ExceptionGroup
    fn parse_rule(&mut self, kind: SyntaxKind) {
        self.start_node(kind);
        while self.current_kind().is_rule_modifier() && !self.at_eof() {
            self.bump();
        }
        self.parse_name("rule name");
        self.parse_rule_prequel();

        if !self.eat(SyntaxKind::COLON) {
            self.error("expected ':' after rule name");
            if self.at_eof() || self.at_member_start() || !self.at_element_start() {
                self.finish_node();
                return;
            }
        }

        self.parse_alt_list();
        self.parse_rule_end();
        self.parse_exception_group();
        self.finish_node();
    }

    fn parse_rule_prequel(&mut self) {
        while !self.at_eof() {
            match self.current_kind() {
                SyntaxKind::BRACKET_BLOCK => {
                    self.start_node(SyntaxKind::ARG_SPEC);
                    self.bump();
                    self.finish_node();
                }
                SyntaxKind::RETURNS_KW => self.parse_bracket_spec(SyntaxKind::RETURNS_SPEC),
                SyntaxKind::LOCALS_KW => self.parse_bracket_spec(SyntaxKind::LOCALS_SPEC),
                SyntaxKind::THROWS_KW => {
                    self.start_node(SyntaxKind::THROWS_SPEC);
                    self.bump();
                    self.expect(SyntaxKind::IDENT);
                    while self.eat(SyntaxKind::COMMA) {
                        self.expect(SyntaxKind::IDENT);
                    }
                    self.finish_node();
                }
                SyntaxKind::OPTIONS_KW => self.parse_options_spec(),
                SyntaxKind::AT => {
                    self.start_node(SyntaxKind::RULE_ACTION);
                    self.bump();
                    self.expect(SyntaxKind::IDENT);
                    self.expect(SyntaxKind::ACTION);
                    self.finish_node();
                }
                _ => break,
            }
        }
    }

    fn parse_bracket_spec(&mut self, kind: SyntaxKind) {
        self.start_node(kind);
        self.bump();
        self.expect(SyntaxKind::BRACKET_BLOCK);
        self.finish_node();
    }

    /// A rule ends at ';'. A missing ';' right before the next rule closes the
    /// rule anyway so the following rules still parse.
    fn parse_rule_end(&mut self) {
        if self.eat(SyntaxKind::SEMICOLON) {
            return;
        }
        if self.at_eof() || self.at_member_start() {
            self.error_after_previous("missing ';' at end of rule");
            return;
        }
        let found = token_name(self.current_kind());
        self.error_recover(
            format!("unexpected {found} in rule body"),
            &[SyntaxKind::SEMICOLON],
        );
        self.eat(SyntaxKind::SEMICOLON);
    }

    fn parse_exception_group(&mut self) {
        while self.at(SyntaxKind::CATCH_KW) {
            self.start_node(SyntaxKind::EXCEPTION_HANDLER);
            self.bump();
            self.expect(SyntaxKind::BRACKET_BLOCK);
            self.expect(SyntaxKind::ACTION);
            self.finish_node();
        }
        if self.at(SyntaxKind::FINALLY_KW) {
            self.start_node(SyntaxKind::FINALLY_CLAUSE);
            self.bump();
            self.expect(SyntaxKind::ACTION);
            self.finish_node();
        }
    }

    // =========================================================================
    // Alternatives and elements
    // =========================================================================

    /// AltList = Alternative ('|' Alternative)*
    fn parse_alt_list(&mut self) {
        self.start_node(SyntaxKind::ALT_LIST);
        self.parse_alternative();
        while self.eat(SyntaxKind::PIPE) {
            self.parse_alternative();
        }
        self.finish_node();
    }

    /// Alternative = ElementOptions? Element* ('#' Ident)? LexerCommands?
    fn parse_alternative(&mut self) {
        self.start_node(SyntaxKind::ALTERNATIVE);
        if self.at(SyntaxKind::LT) {
            self.parse_element_options();
        }
        while self.at_element_start() {
            self.parse_element();
        }
        if self.at(SyntaxKind::HASH) {
            self.start_node(SyntaxKind::ALT_LABEL);
            self.bump();
            self.parse_name("alternative label");
            self.finish_node();
        }
        if self.at(SyntaxKind::ARROW) {
            self.parse_lexer_commands();
        }
        self.finish_node();
    }

    /// Element = (Ident ('=' | '+=') Atom | Atom) EbnfSuffix?
    fn parse_element(&mut self) {
        let checkpoint = self.checkpoint();
        if self.at(SyntaxKind::IDENT) && matches!(self.nth(1), SyntaxKind::EQ | SyntaxKind::PLUS_EQ) {
            self.start_node(SyntaxKind::LABELED_ELEMENT);
            self.bump();
            self.bump();
            if self.at_element_start() {
                self.parse_atom();
            } else {
                self.error("expected element after label");
            }
            self.finish_node();
        } else {
            self.parse_atom();
        }

        if !self.at_eof() && self.current_kind().is_ebnf_suffix() {
            self.builder
                .start_node_at(checkpoint, SyntaxKind::EBNF_ELEMENT.into());
            self.bump();
            // non-greedy
            self.eat(SyntaxKind::QUESTION);
            self.finish_node();
        }
    }

    fn parse_atom(&mut self) {
        match self.current_kind() {
            SyntaxKind::IDENT => {
                let kind = if is_token_name(self.current_text()) {
                    SyntaxKind::TOKEN_REF
                } else {
                    SyntaxKind::RULE_REF
                };
                self.start_node(kind);
                self.bump();
                if kind == SyntaxKind::RULE_REF && self.at(SyntaxKind::BRACKET_BLOCK) {
                    self.start_node(SyntaxKind::ARG_SPEC);
                    self.bump();
                    self.finish_node();
                }
                self.parse_opt_element_options();
                self.finish_node();
            }
            SyntaxKind::STRING if self.nth(1) == SyntaxKind::DOT_DOT => {
                self.start_node(SyntaxKind::CHAR_RANGE);
                self.bump();
                self.bump();
                if !self.eat(SyntaxKind::STRING) {
                    self.error("expected literal after '..'");
                }
                self.finish_node();
            }
            SyntaxKind::STRING => {
                self.start_node(SyntaxKind::STRING_LITERAL);
                self.bump();
                self.parse_opt_element_options();
                self.finish_node();
            }
            SyntaxKind::L_PAREN => self.parse_block(),
            SyntaxKind::DOT => {
                self.start_node(SyntaxKind::WILDCARD);
                self.bump();
                self.parse_opt_element_options();
                self.finish_node();
            }
            SyntaxKind::TILDE => {
                self.start_node(SyntaxKind::NOT_ELEMENT);
                self.bump();
                if self.at_element_start() {
                    self.parse_atom();
                } else {
                    self.error("expected set element after '~'");
                }
                self.finish_node();
            }
            SyntaxKind::ACTION if self.nth(1) == SyntaxKind::QUESTION => {
                self.start_node(SyntaxKind::PREDICATE);
                self.bump();
                self.bump();
                self.parse_opt_element_options();
                self.finish_node();
            }
            SyntaxKind::ACTION => {
                self.start_node(SyntaxKind::ACTION_ELEMENT);
                self.bump();
                self.finish_node();
            }
            SyntaxKind::BRACKET_BLOCK => {
                self.start_node(SyntaxKind::CHAR_SET);
                self.bump();
                self.finish_node();
            }
            _ => self.bump_error_token(),
        }
    }

    /// Block = '(' (OptionsSpec ':')? AltList ')'
    fn parse_block(&mut self) {
        self.start_node(SyntaxKind::BLOCK);
        self.bump();
        if self.at(SyntaxKind::OPTIONS_KW) {
            self.parse_options_spec();
            self.expect(SyntaxKind::COLON);
        }
        self.parse_alt_list();
        self.expect(SyntaxKind::R_PAREN);
        self.finish_node();
    }

    fn parse_opt_element_options(&mut self) {
        if self.at(SyntaxKind::LT) {
            self.parse_element_options();
        }
    }

    /// ElementOptions = '<' ... '>'
    fn parse_element_options(&mut self) {
        self.start_node(SyntaxKind::ELEMENT_OPTIONS);
        self.bump();
        while !self.at_eof()
            && !self.at_any(&[
                SyntaxKind::GT,
                SyntaxKind::SEMICOLON,
                SyntaxKind::PIPE,
                SyntaxKind::R_PAREN,
            ])
        {
            self.bump();
        }
        self.expect(SyntaxKind::GT);
        self.finish_node();
    }

    /// LexerCommands = '->' LexerCommand (',' LexerCommand)*
    fn parse_lexer_commands(&mut self) {
        self.start_node(SyntaxKind::LEXER_COMMANDS);
        self.bump();
        loop {
            self.parse_lexer_command();
            if !self.eat(SyntaxKind::COMMA) {
                break;
            }
        }
        self.finish_node();
    }

    /// LexerCommand = (Ident | 'mode') ('(' (NameRef | Int) ')')?
    fn parse_lexer_command(&mut self) {
        self.start_node(SyntaxKind::LEXER_COMMAND);
        if self.at_any(&[SyntaxKind::IDENT, SyntaxKind::MODE_KW]) {
            self.bump();
        } else {
            self.error("expected lexer command");
        }
        if self.eat(SyntaxKind::L_PAREN) {
            if self.at(SyntaxKind::IDENT) {
                self.parse_name_ref();
            } else if !self.eat(SyntaxKind::INT) {
                self.error("expected lexer command argument");
            }
            self.expect(SyntaxKind::R_PAREN);
        }
        self.finish_node();
    }
}

fn lexical_error_message(text: &str) -> String {
    if text.starts_with('\'') {
        "unterminated string literal".to_string()
    } else if text.starts_with('{') {
        "unterminated action block".to_string()
    } else if text.starts_with("/*") {
        "unterminated comment".to_string()
    } else if text.starts_with('[') {
        "unterminated bracket block".to_string()
    } else {
        format!("unrecognized input `{text}`")
    }
}

fn token_name(kind: SyntaxKind) -> String {
    let punct = match kind {
        SyntaxKind::COLON => ":",
        SyntaxKind::COLON_COLON => "::",
        SyntaxKind::SEMICOLON => ";",
        SyntaxKind::PIPE => "|",
        SyntaxKind::L_PAREN => "(",
        SyntaxKind::R_PAREN => ")",
        SyntaxKind::L_BRACE => "{",
        SyntaxKind::R_BRACE => "}",
        SyntaxKind::QUESTION => "?",
        SyntaxKind::STAR => "*",
        SyntaxKind::PLUS => "+",
        SyntaxKind::PLUS_EQ => "+=",
        SyntaxKind::EQ => "=",
        SyntaxKind::TILDE => "~",
        SyntaxKind::DOT => ".",
        SyntaxKind::DOT_DOT => "..",
        SyntaxKind::ARROW => "->",
        SyntaxKind::COMMA => ",",
        SyntaxKind::HASH => "#",
        SyntaxKind::AT => "@",
        SyntaxKind::LT => "<",
        SyntaxKind::GT => ">",
        SyntaxKind::IDENT => return "identifier".to_string(),
        SyntaxKind::STRING => return "string literal".to_string(),
        SyntaxKind::INT => return "integer".to_string(),
        SyntaxKind::ACTION => return "action block".to_string(),
        SyntaxKind::BRACKET_BLOCK => return "bracket block".to_string(),
        kind if kind.is_keyword() => {
            let name = format!("{kind:?}");
            let word = name.trim_end_matches("_KW").to_lowercase();
            return format!("'{word}'");
        }
        kind => return format!("{kind:?}"),
    };
    format!("'{punct}'")
}
