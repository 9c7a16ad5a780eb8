//! Typed AST wrappers over the untyped rowan CST.
//!
//! This module provides strongly-typed accessors for grammar syntax nodes.
//! Each struct wraps a SyntaxNode and provides methods to access children.
//! The closed enums ([`GrammarMember`], [`Rule`], [`RuleElement`]) are what
//! every tree walker in the crate matches on.

use super::syntax_kind::SyntaxKind;
use super::{SyntaxNode, SyntaxToken};

/// Trait for AST nodes that wrap a SyntaxNode
pub trait AstNode: Sized {
    fn can_cast(kind: SyntaxKind) -> bool;
    fn cast(node: SyntaxNode) -> Option<Self>;
    fn syntax(&self) -> &SyntaxNode;
}

// ============================================================================
// Helper macros
// ============================================================================

macro_rules! ast_node {
    ($name:ident, $kind:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(SyntaxNode);

        impl AstNode for $name {
            fn can_cast(kind: SyntaxKind) -> bool {
                kind == SyntaxKind::$kind
            }

            fn cast(node: SyntaxNode) -> Option<Self> {
                if Self::can_cast(node.kind()) {
                    Some(Self(node))
                } else {
                    None
                }
            }

            fn syntax(&self) -> &SyntaxNode {
                &self.0
            }
        }
    };
}

fn child<N: AstNode>(node: &SyntaxNode) -> Option<N> {
    node.children().find_map(N::cast)
}

fn children<N: AstNode>(node: &SyntaxNode) -> impl Iterator<Item = N> {
    node.children().filter_map(N::cast)
}

fn token(node: &SyntaxNode, kind: SyntaxKind) -> Option<SyntaxToken> {
    node.children_with_tokens()
        .filter_map(|e| e.into_token())
        .find(|t| t.kind() == kind)
}

fn has_token(node: &SyntaxNode, kind: SyntaxKind) -> bool {
    token(node, kind).is_some()
}

/// Concatenated text of the significant tokens under `node`
fn significant_text(node: &SyntaxNode) -> String {
    node.descendants_with_tokens()
        .filter_map(|e| e.into_token())
        .filter(|t| !t.kind().is_trivia())
        .map(|t| t.text().to_string())
        .collect()
}

/// The `/** ... */` comment directly preceding a declaration, cleaned of its
/// delimiters and leading `*` gutters.
pub fn doc_comment(node: &SyntaxNode) -> Option<String> {
    let mut prev = node.first_token()?.prev_token();
    while let Some(tok) = prev {
        match tok.kind() {
            SyntaxKind::WHITESPACE => prev = tok.prev_token(),
            SyntaxKind::DOC_COMMENT => return Some(clean_doc(tok.text())),
            _ => return None,
        }
    }
    None
}

fn clean_doc(text: &str) -> String {
    let inner = text
        .strip_prefix("/**")
        .and_then(|t| t.strip_suffix("*/"))
        .unwrap_or(text);
    inner
        .lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').map(str::trim_start).unwrap_or(line)
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

// ============================================================================
// Root
// ============================================================================

ast_node!(SourceFile, SOURCE_FILE);

impl SourceFile {
    /// Wrap the root of a parse tree
    pub fn from_root(root: SyntaxNode) -> Self {
        Self(root)
    }

    pub fn members(&self) -> impl Iterator<Item = GrammarMember> + '_ {
        children(&self.0)
    }

    /// The first grammar header, if any
    pub fn header(&self) -> Option<GrammarDecl> {
        child(&self.0)
    }

    /// All rules, including those declared inside mode sections
    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        self.0.descendants().filter_map(Rule::cast)
    }
}

// ============================================================================
// Grammar members
// ============================================================================

/// Any top-level member of a grammar file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GrammarMember {
    Header(GrammarDecl),
    Options(OptionsSpec),
    Import(ImportDecl),
    Tokens(TokensSpec),
    Channels(ChannelsSpec),
    NamedAction(NamedAction),
    Rule(Rule),
    Mode(ModeSection),
}

impl AstNode for GrammarMember {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::GRAMMAR_DECL
                | SyntaxKind::OPTIONS_SPEC
                | SyntaxKind::IMPORT_DECL
                | SyntaxKind::TOKENS_SPEC
                | SyntaxKind::CHANNELS_SPEC
                | SyntaxKind::NAMED_ACTION
                | SyntaxKind::PARSER_RULE
                | SyntaxKind::LEXER_RULE
                | SyntaxKind::MODE_SECTION
        )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::GRAMMAR_DECL => Some(Self::Header(GrammarDecl(node))),
            SyntaxKind::OPTIONS_SPEC => Some(Self::Options(OptionsSpec(node))),
            SyntaxKind::IMPORT_DECL => Some(Self::Import(ImportDecl(node))),
            SyntaxKind::TOKENS_SPEC => Some(Self::Tokens(TokensSpec(node))),
            SyntaxKind::CHANNELS_SPEC => Some(Self::Channels(ChannelsSpec(node))),
            SyntaxKind::NAMED_ACTION => Some(Self::NamedAction(NamedAction(node))),
            SyntaxKind::PARSER_RULE | SyntaxKind::LEXER_RULE => Rule::cast(node).map(Self::Rule),
            SyntaxKind::MODE_SECTION => Some(Self::Mode(ModeSection(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Header(n) => n.syntax(),
            Self::Options(n) => n.syntax(),
            Self::Import(n) => n.syntax(),
            Self::Tokens(n) => n.syntax(),
            Self::Channels(n) => n.syntax(),
            Self::NamedAction(n) => n.syntax(),
            Self::Rule(n) => n.syntax(),
            Self::Mode(n) => n.syntax(),
        }
    }
}

// ============================================================================
// Header
// ============================================================================

/// Which kind of grammar a file declares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum GrammarType {
    #[default]
    Combined,
    Lexer,
    Parser,
}

impl GrammarType {
    pub fn keyword(self) -> &'static str {
        match self {
            GrammarType::Combined => "grammar",
            GrammarType::Lexer => "lexer grammar",
            GrammarType::Parser => "parser grammar",
        }
    }

    /// Whether lexer rules may be declared
    pub fn allows_lexer_rules(self) -> bool {
        !matches!(self, GrammarType::Parser)
    }

    /// Whether parser rules may be declared
    pub fn allows_parser_rules(self) -> bool {
        !matches!(self, GrammarType::Lexer)
    }
}

ast_node!(GrammarDecl, GRAMMAR_DECL);

impl GrammarDecl {
    pub fn grammar_type(&self) -> GrammarType {
        if has_token(&self.0, SyntaxKind::LEXER_KW) {
            GrammarType::Lexer
        } else if has_token(&self.0, SyntaxKind::PARSER_KW) {
            GrammarType::Parser
        } else {
            GrammarType::Combined
        }
    }

    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }
}

// ============================================================================
// Names
// ============================================================================

ast_node!(Name, NAME);

impl Name {
    pub fn text(&self) -> String {
        significant_text(&self.0)
    }
}

ast_node!(NameRef, NAME_REF);

impl NameRef {
    pub fn text(&self) -> String {
        significant_text(&self.0)
    }
}

// ============================================================================
// Prequel constructs
// ============================================================================

ast_node!(OptionsSpec, OPTIONS_SPEC);

impl OptionsSpec {
    pub fn options(&self) -> impl Iterator<Item = GrammarOption> + '_ {
        children(&self.0)
    }

    /// The value of the `tokenVocab` option, if set to a name
    pub fn token_vocab(&self) -> Option<NameRef> {
        self.options()
            .find(|o| o.name().as_deref() == Some("tokenVocab"))
            .and_then(|o| o.value_ref())
    }
}

ast_node!(GrammarOption, OPTION);

impl GrammarOption {
    pub fn name(&self) -> Option<String> {
        token(&self.0, SyntaxKind::IDENT).map(|t| t.text().to_string())
    }

    pub fn value_ref(&self) -> Option<NameRef> {
        child(&self.0)
    }
}

ast_node!(ImportDecl, IMPORT_DECL);

impl ImportDecl {
    pub fn items(&self) -> impl Iterator<Item = ImportItem> + '_ {
        children(&self.0)
    }
}

ast_node!(ImportItem, IMPORT_ITEM);

impl ImportItem {
    /// `X` in `import X = Y;`
    pub fn alias(&self) -> Option<Name> {
        child(&self.0)
    }

    /// The imported grammar
    pub fn target(&self) -> Option<NameRef> {
        child(&self.0)
    }
}

ast_node!(TokensSpec, TOKENS_SPEC);

impl TokensSpec {
    pub fn tokens(&self) -> impl Iterator<Item = TokenDecl> + '_ {
        children(&self.0)
    }
}

ast_node!(TokenDecl, TOKEN_DECL);

impl TokenDecl {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }
}

ast_node!(ChannelsSpec, CHANNELS_SPEC);

impl ChannelsSpec {
    pub fn channels(&self) -> impl Iterator<Item = ChannelDecl> + '_ {
        children(&self.0)
    }
}

ast_node!(ChannelDecl, CHANNEL_DECL);

impl ChannelDecl {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }
}

ast_node!(NamedAction, NAMED_ACTION);

impl NamedAction {
    /// `scope::name` or just `name`
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    /// Split the name into explicit scope and action name
    pub fn scope_and_name(&self) -> Option<(Option<String>, String)> {
        let text = self.name()?.text();
        match text.split_once("::") {
            Some((scope, name)) => Some((Some(scope.to_string()), name.to_string())),
            None => Some((None, text)),
        }
    }
}

ast_node!(ModeSection, MODE_SECTION);

impl ModeSection {
    pub fn name(&self) -> Option<Name> {
        child(&self.0)
    }

    pub fn rules(&self) -> impl Iterator<Item = Rule> + '_ {
        children(&self.0)
    }
}

// ============================================================================
// Rules
// ============================================================================

/// A parser or lexer rule
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule {
    Parser(ParserRule),
    Lexer(LexerRule),
}

impl AstNode for Rule {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(kind, SyntaxKind::PARSER_RULE | SyntaxKind::LEXER_RULE)
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::PARSER_RULE => Some(Self::Parser(ParserRule(node))),
            SyntaxKind::LEXER_RULE => Some(Self::Lexer(LexerRule(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Parser(n) => n.syntax(),
            Self::Lexer(n) => n.syntax(),
        }
    }
}

impl Rule {
    pub fn name(&self) -> Option<Name> {
        child(self.syntax())
    }

    pub fn alt_list(&self) -> Option<AltList> {
        child(self.syntax())
    }

    pub fn is_lexer(&self) -> bool {
        matches!(self, Rule::Lexer(_))
    }

    pub fn is_fragment(&self) -> bool {
        has_token(self.syntax(), SyntaxKind::FRAGMENT_KW)
    }

    /// The mode section this rule is declared in, if any
    pub fn mode(&self) -> Option<ModeSection> {
        self.syntax().parent().and_then(ModeSection::cast)
    }

    pub fn doc(&self) -> Option<String> {
        doc_comment(self.syntax())
    }

    /// Argument, return and local declarations as written, for signatures
    pub fn signature_parts(&self) -> Vec<String> {
        self.syntax()
            .children()
            .filter(|n| {
                matches!(
                    n.kind(),
                    SyntaxKind::ARG_SPEC | SyntaxKind::RETURNS_SPEC | SyntaxKind::LOCALS_SPEC
                )
            })
            .map(|n| {
                n.descendants_with_tokens()
                    .filter_map(|e| e.into_token())
                    .filter(|t| !t.kind().is_trivia())
                    .map(|t| t.text().to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect()
    }

    /// The single string literal this rule's body consists of, e.g. `'+'` for
    /// `PLUS : '+' ;`
    pub fn single_literal(&self) -> Option<String> {
        let alt_list = self.alt_list()?;
        let mut alternatives = alt_list.alternatives();
        let alternative = alternatives.next()?;
        if alternatives.next().is_some() {
            return None;
        }
        let mut elements = alternative.elements();
        let element = elements.next()?;
        if elements.next().is_some() {
            return None;
        }
        match element {
            RuleElement::Literal(lit) => lit.text(),
            _ => None,
        }
    }
}

ast_node!(ParserRule, PARSER_RULE);
ast_node!(LexerRule, LEXER_RULE);

// ============================================================================
// Alternatives
// ============================================================================

ast_node!(AltList, ALT_LIST);

impl AltList {
    pub fn alternatives(&self) -> impl Iterator<Item = Alternative> + '_ {
        children(&self.0)
    }
}

ast_node!(Alternative, ALTERNATIVE);

impl Alternative {
    pub fn elements(&self) -> impl Iterator<Item = RuleElement> + '_ {
        children(&self.0)
    }

    /// `# Label`
    pub fn label(&self) -> Option<Name> {
        child::<AltLabel>(&self.0).and_then(|l| child(&l.0))
    }

    pub fn commands(&self) -> Option<LexerCommands> {
        child(&self.0)
    }
}

ast_node!(AltLabel, ALT_LABEL);

/// An element of an alternative
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleElement {
    Labeled(LabeledElement),
    Ebnf(EbnfElement),
    Block(Block),
    RuleRef(RuleRef),
    TokenRef(TokenRef),
    Literal(StringLiteral),
    CharRange(CharRange),
    CharSet(CharSet),
    Wildcard(Wildcard),
    Not(NotElement),
    Action(ActionElement),
    Predicate(Predicate),
}

impl AstNode for RuleElement {
    fn can_cast(kind: SyntaxKind) -> bool {
        matches!(
            kind,
            SyntaxKind::LABELED_ELEMENT
                | SyntaxKind::EBNF_ELEMENT
                | SyntaxKind::BLOCK
                | SyntaxKind::RULE_REF
                | SyntaxKind::TOKEN_REF
                | SyntaxKind::STRING_LITERAL
                | SyntaxKind::CHAR_RANGE
                | SyntaxKind::CHAR_SET
                | SyntaxKind::WILDCARD
                | SyntaxKind::NOT_ELEMENT
                | SyntaxKind::ACTION_ELEMENT
                | SyntaxKind::PREDICATE
        )
    }

    fn cast(node: SyntaxNode) -> Option<Self> {
        match node.kind() {
            SyntaxKind::LABELED_ELEMENT => Some(Self::Labeled(LabeledElement(node))),
            SyntaxKind::EBNF_ELEMENT => Some(Self::Ebnf(EbnfElement(node))),
            SyntaxKind::BLOCK => Some(Self::Block(Block(node))),
            SyntaxKind::RULE_REF => Some(Self::RuleRef(RuleRef(node))),
            SyntaxKind::TOKEN_REF => Some(Self::TokenRef(TokenRef(node))),
            SyntaxKind::STRING_LITERAL => Some(Self::Literal(StringLiteral(node))),
            SyntaxKind::CHAR_RANGE => Some(Self::CharRange(CharRange(node))),
            SyntaxKind::CHAR_SET => Some(Self::CharSet(CharSet(node))),
            SyntaxKind::WILDCARD => Some(Self::Wildcard(Wildcard(node))),
            SyntaxKind::NOT_ELEMENT => Some(Self::Not(NotElement(node))),
            SyntaxKind::ACTION_ELEMENT => Some(Self::Action(ActionElement(node))),
            SyntaxKind::PREDICATE => Some(Self::Predicate(Predicate(node))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Labeled(n) => n.syntax(),
            Self::Ebnf(n) => n.syntax(),
            Self::Block(n) => n.syntax(),
            Self::RuleRef(n) => n.syntax(),
            Self::TokenRef(n) => n.syntax(),
            Self::Literal(n) => n.syntax(),
            Self::CharRange(n) => n.syntax(),
            Self::CharSet(n) => n.syntax(),
            Self::Wildcard(n) => n.syntax(),
            Self::Not(n) => n.syntax(),
            Self::Action(n) => n.syntax(),
            Self::Predicate(n) => n.syntax(),
        }
    }
}

ast_node!(LabeledElement, LABELED_ELEMENT);

impl LabeledElement {
    pub fn label(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }

    /// `x+=e` collects into a list
    pub fn is_list(&self) -> bool {
        has_token(&self.0, SyntaxKind::PLUS_EQ)
    }

    pub fn element(&self) -> Option<RuleElement> {
        child(&self.0)
    }
}

/// EBNF repetition operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EbnfSuffix {
    Optional,
    ZeroOrMore,
    OneOrMore,
}

ast_node!(EbnfElement, EBNF_ELEMENT);

impl EbnfElement {
    pub fn element(&self) -> Option<RuleElement> {
        child(&self.0)
    }

    pub fn suffix(&self) -> Option<EbnfSuffix> {
        self.suffix_tokens().next().and_then(|t| match t.kind() {
            SyntaxKind::QUESTION => Some(EbnfSuffix::Optional),
            SyntaxKind::STAR => Some(EbnfSuffix::ZeroOrMore),
            SyntaxKind::PLUS => Some(EbnfSuffix::OneOrMore),
            _ => None,
        })
    }

    /// `a*?` style non-greedy operator
    pub fn is_greedy(&self) -> bool {
        self.suffix_tokens().count() < 2
    }

    fn suffix_tokens(&self) -> impl Iterator<Item = SyntaxToken> + '_ {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind().is_ebnf_suffix())
    }
}

ast_node!(Block, BLOCK);

impl Block {
    pub fn alt_list(&self) -> Option<AltList> {
        child(&self.0)
    }
}

ast_node!(RuleRef, RULE_REF);

impl RuleRef {
    pub fn ident(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }
}

ast_node!(TokenRef, TOKEN_REF);

impl TokenRef {
    pub fn ident(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::IDENT)
    }
}

ast_node!(StringLiteral, STRING_LITERAL);

impl StringLiteral {
    pub fn token(&self) -> Option<SyntaxToken> {
        token(&self.0, SyntaxKind::STRING)
    }

    /// The literal including its quotes, e.g. `'+'`
    pub fn text(&self) -> Option<String> {
        self.token().map(|t| t.text().to_string())
    }
}

ast_node!(CharRange, CHAR_RANGE);

impl CharRange {
    pub fn bounds(&self) -> Option<(String, String)> {
        let mut strings = self
            .0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .filter(|t| t.kind() == SyntaxKind::STRING);
        let lo = strings.next()?.text().to_string();
        let hi = strings.next()?.text().to_string();
        Some((lo, hi))
    }
}

ast_node!(CharSet, CHAR_SET);

impl CharSet {
    pub fn text(&self) -> String {
        significant_text(&self.0)
    }
}

ast_node!(Wildcard, WILDCARD);

ast_node!(NotElement, NOT_ELEMENT);

impl NotElement {
    pub fn element(&self) -> Option<RuleElement> {
        child(&self.0)
    }
}

ast_node!(ActionElement, ACTION_ELEMENT);

impl ActionElement {
    pub fn text(&self) -> String {
        significant_text(&self.0)
    }
}

ast_node!(Predicate, PREDICATE);

impl Predicate {
    /// The predicate action without the trailing `?`
    pub fn text(&self) -> String {
        token(&self.0, SyntaxKind::ACTION)
            .map(|t| t.text().to_string())
            .unwrap_or_default()
    }
}

// ============================================================================
// Lexer commands
// ============================================================================

ast_node!(LexerCommands, LEXER_COMMANDS);

impl LexerCommands {
    pub fn commands(&self) -> impl Iterator<Item = LexerCommand> + '_ {
        children(&self.0)
    }
}

/// Lexer command names after `->`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LexerCommandKind {
    Skip,
    More,
    PopMode,
    Channel,
    Mode,
    PushMode,
    Type,
    Unknown(String),
}

impl LexerCommandKind {
    pub fn from_name(name: &str) -> Self {
        match name {
            "skip" => Self::Skip,
            "more" => Self::More,
            "popMode" => Self::PopMode,
            "channel" => Self::Channel,
            "mode" => Self::Mode,
            "pushMode" => Self::PushMode,
            "type" => Self::Type,
            other => Self::Unknown(other.to_string()),
        }
    }
}

ast_node!(LexerCommand, LEXER_COMMAND);

impl LexerCommand {
    pub fn name(&self) -> Option<String> {
        self.0
            .children_with_tokens()
            .filter_map(|e| e.into_token())
            .find(|t| matches!(t.kind(), SyntaxKind::IDENT | SyntaxKind::MODE_KW))
            .map(|t| t.text().to_string())
    }

    pub fn kind(&self) -> Option<LexerCommandKind> {
        self.name().map(|n| LexerCommandKind::from_name(&n))
    }

    /// Identifier argument, e.g. `HIDDEN` in `channel(HIDDEN)`
    pub fn argument(&self) -> Option<NameRef> {
        child(&self.0)
    }

    /// Argument text as written, including integer arguments
    pub fn argument_text(&self) -> Option<String> {
        if let Some(arg) = self.argument() {
            return Some(arg.text());
        }
        token(&self.0, SyntaxKind::INT).map(|t| t.text().to_string())
    }
}
