//! Symbol extraction from the AST into per-file symbol tables.
//!
//! Walks the declaration-shaped members of one file (header, imports,
//! `tokens`/`channels` lists, named actions, modes and rules) and produces the
//! file's [`SymbolTable`]. References are not looked at here; see
//! [`super::resolve`].

use std::sync::Arc;

use indexmap::IndexMap;
use smol_str::SmolStr;
use tracing::trace;

use super::diagnostics::{Diagnostic, DiagnosticKind, RelatedInfo, Severity};
use crate::base::{FileId, LineIndex, Span, TextRange};
use crate::parser::{AstNode, GrammarMember, GrammarType, Name, Rule, SourceFile, doc_comment};

// ============================================================================
// SYMBOL TYPES
// ============================================================================

/// What a symbol declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    Grammar,
    ParserRule,
    LexerRule,
    /// Declared in `tokens { ... }`
    VirtualToken,
    /// Declared in `channels { ... }`
    TokenChannel,
    LexerMode,
    /// `@scope::name { ... }`
    NamedAction,
    /// An `import` delegate
    ImportedGrammar,
}

impl SymbolKind {
    pub fn display(&self) -> &'static str {
        match self {
            SymbolKind::Grammar => "grammar",
            SymbolKind::ParserRule => "parser rule",
            SymbolKind::LexerRule => "lexer rule",
            SymbolKind::VirtualToken => "token",
            SymbolKind::TokenChannel => "channel",
            SymbolKind::LexerMode => "mode",
            SymbolKind::NamedAction => "action",
            SymbolKind::ImportedGrammar => "imported grammar",
        }
    }

    /// Symbols a token reference can bind to
    pub fn is_token(&self) -> bool {
        matches!(self, SymbolKind::LexerRule | SymbolKind::VirtualToken)
    }

    pub fn is_rule(&self) -> bool {
        matches!(self, SymbolKind::ParserRule | SymbolKind::LexerRule)
    }

    /// Kinds sharing a namespace for duplicate detection
    fn namespace(&self) -> Namespace {
        match self {
            SymbolKind::LexerRule | SymbolKind::VirtualToken => Namespace::Token,
            SymbolKind::Grammar => Namespace::Grammar,
            SymbolKind::ParserRule => Namespace::ParserRule,
            SymbolKind::TokenChannel => Namespace::Channel,
            SymbolKind::LexerMode => Namespace::Mode,
            SymbolKind::NamedAction => Namespace::Action,
            SymbolKind::ImportedGrammar => Namespace::Import,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Namespace {
    Grammar,
    ParserRule,
    Token,
    Channel,
    Mode,
    Action,
    Import,
}

/// A declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: SmolStr,
    pub kind: SymbolKind,
    /// Declaring file
    pub file: FileId,
    /// Range of the name token
    pub range: TextRange,
    /// Line/column form of `range`
    pub span: Span,
    /// Range of the whole declaration
    pub decl_range: TextRange,
    pub is_fragment: bool,
    /// Enclosing lexer mode, for lexer rules after a `mode` line
    pub mode: Option<SmolStr>,
    /// The literal a lexer rule matches when its body is a single literal
    pub literal: Option<SmolStr>,
    /// Rule arguments/returns/locals as written
    pub detail: Option<SmolStr>,
    /// Text of the preceding doc comment
    pub doc: Option<Arc<str>>,
}

impl Symbol {
    /// One-line signature used by hover, e.g. `fragment DIGIT` or `grammar Expr`
    pub fn signature(&self) -> String {
        let mut sig = match self.kind {
            SymbolKind::LexerRule if self.is_fragment => format!("fragment {}", self.name),
            SymbolKind::Grammar | SymbolKind::ParserRule | SymbolKind::LexerRule => {
                self.name.to_string()
            }
            SymbolKind::VirtualToken => format!("tokens {{ {} }}", self.name),
            SymbolKind::TokenChannel => format!("channels {{ {} }}", self.name),
            SymbolKind::LexerMode => format!("mode {}", self.name),
            SymbolKind::NamedAction => format!("@{}", self.name),
            SymbolKind::ImportedGrammar => format!("import {}", self.name),
        };
        if let Some(detail) = &self.detail {
            sig.push(' ');
            sig.push_str(detail);
        }
        if let Some(literal) = &self.literal {
            sig.push_str(" : ");
            sig.push_str(literal);
        }
        sig
    }
}

/// The `grammar X;` line of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarHeader {
    pub name: SmolStr,
    pub grammar_type: GrammarType,
    pub range: TextRange,
    pub span: Span,
}

/// How another grammar is pulled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportKind {
    /// `import X;` - all rules become visible
    Delegate,
    /// `options { tokenVocab = X; }` - only tokens become visible
    TokenVocab,
}

/// One edge of the import graph as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarImport {
    /// Name of the imported grammar
    pub name: SmolStr,
    pub kind: ImportKind,
    /// Range of the grammar name in the import
    pub range: TextRange,
    pub span: Span,
}

// ============================================================================
// SYMBOL TABLE
// ============================================================================

/// All declarations of one file, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: IndexMap<SmolStr, Vec<usize>>,
    by_literal: IndexMap<SmolStr, Vec<usize>>,
    pub header: Option<GrammarHeader>,
    pub imports: Vec<GrammarImport>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, symbol: Symbol) {
        let idx = self.symbols.len();
        self.by_name.entry(symbol.name.clone()).or_default().push(idx);
        if let Some(literal) = &symbol.literal {
            self.by_literal.entry(literal.clone()).or_default().push(idx);
        }
        self.symbols.push(symbol);
    }

    /// All symbols in declaration order (duplicates included).
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// All symbols named `name`, in declaration order.
    pub fn lookup<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.by_name
            .get(name)
            .into_iter()
            .flatten()
            .map(|&idx| &self.symbols[idx])
    }

    /// Lexer rules whose body is exactly `literal` (quotes included).
    pub fn lookup_literal<'a>(&'a self, literal: &str) -> impl Iterator<Item = &'a Symbol> + 'a {
        self.by_literal
            .get(literal)
            .into_iter()
            .flatten()
            .map(|&idx| &self.symbols[idx])
    }

    /// First declared rule named `name`.
    pub fn rule(&self, name: &str) -> Option<&Symbol> {
        self.lookup(name).find(|s| s.kind.is_rule())
    }

    pub fn grammar_name(&self) -> Option<&SmolStr> {
        self.header.as_ref().map(|h| &h.name)
    }

    pub fn grammar_type(&self) -> GrammarType {
        self.header
            .as_ref()
            .map(|h| h.grammar_type)
            .unwrap_or_default()
    }

    pub fn rule_count(&self) -> usize {
        self.symbols.iter().filter(|s| s.kind.is_rule()).count()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Whether two tables export the same names, so dependents resolve the same.
    pub fn same_exports(&self, other: &SymbolTable) -> bool {
        self.header == other.header && self.symbols == other.symbols
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Result of building the table for one file.
#[derive(Debug, Clone, Default)]
pub struct ExtractionResult {
    pub table: SymbolTable,
    pub diagnostics: Vec<Diagnostic>,
}

struct Extractor<'a> {
    file: FileId,
    line_index: &'a LineIndex,
    table: SymbolTable,
    first_seen: IndexMap<(SmolStr, Namespace), usize>,
    diagnostics: Vec<Diagnostic>,
}

/// Build the symbol table of one parsed file.
pub fn extract_symbols(file: FileId, root: &SourceFile, line_index: &LineIndex) -> ExtractionResult {
    let mut extractor = Extractor {
        file,
        line_index,
        table: SymbolTable::new(),
        first_seen: IndexMap::new(),
        diagnostics: Vec::new(),
    };

    // The header decides default action scopes, so read it first.
    if let Some(header) = root.header()
        && let Some(name) = header.name()
    {
        let range = name.syntax().text_range();
        extractor.table.header = Some(GrammarHeader {
            name: name.text().into(),
            grammar_type: header.grammar_type(),
            range,
            span: line_index.span(range),
        });
    }

    for member in root.members() {
        extractor.member(member);
    }

    trace!(
        file = file.index(),
        symbols = extractor.table.len(),
        "extracted symbols"
    );

    ExtractionResult {
        table: extractor.table,
        diagnostics: extractor.diagnostics,
    }
}

impl Extractor<'_> {
    fn member(&mut self, member: GrammarMember) {
        match member {
            GrammarMember::Header(header) => {
                if let Some(name) = header.name()
                    && let Some(idx) =
                        self.declare(SymbolKind::Grammar, &name, header.syntax().text_range())
                {
                    self.table.symbols[idx].doc = doc_comment(header.syntax()).map(Arc::from);
                }
            }
            GrammarMember::Options(options) => {
                if let Some(vocab) = options.token_vocab() {
                    let range = vocab.syntax().text_range();
                    self.table.imports.push(GrammarImport {
                        name: vocab.text().into(),
                        kind: ImportKind::TokenVocab,
                        range,
                        span: self.line_index.span(range),
                    });
                }
            }
            GrammarMember::Import(import) => {
                for item in import.items() {
                    let Some(target) = item.target() else {
                        continue;
                    };
                    let range = target.syntax().text_range();
                    self.table.imports.push(GrammarImport {
                        name: target.text().into(),
                        kind: ImportKind::Delegate,
                        range,
                        span: self.line_index.span(range),
                    });
                    let item_range = item.syntax().text_range();
                    match item.alias() {
                        Some(alias) => {
                            self.declare(SymbolKind::ImportedGrammar, &alias, item_range);
                        }
                        None => {
                            self.declare_at(
                                SymbolKind::ImportedGrammar,
                                target.text().into(),
                                range,
                                item_range,
                            );
                        }
                    }
                }
            }
            GrammarMember::Tokens(tokens) => {
                for decl in tokens.tokens() {
                    if let Some(name) = decl.name() {
                        self.declare(SymbolKind::VirtualToken, &name, decl.syntax().text_range());
                    }
                }
            }
            GrammarMember::Channels(channels) => {
                for decl in channels.channels() {
                    if let Some(name) = decl.name() {
                        self.declare(SymbolKind::TokenChannel, &name, decl.syntax().text_range());
                    }
                }
            }
            GrammarMember::NamedAction(action) => {
                let Some((scope, name)) = action.scope_and_name() else {
                    return;
                };
                let Some(name_node) = action.name() else {
                    return;
                };
                let scope = scope.unwrap_or_else(|| self.default_action_scope().to_string());
                let range = name_node.syntax().text_range();
                self.declare_at(
                    SymbolKind::NamedAction,
                    format!("{scope}::{name}").into(),
                    range,
                    action.syntax().text_range(),
                );
            }
            GrammarMember::Rule(rule) => self.rule(rule),
            GrammarMember::Mode(mode) => {
                if let Some(name) = mode.name()
                    && let Some(idx) =
                        self.declare(SymbolKind::LexerMode, &name, mode.syntax().text_range())
                {
                    self.table.symbols[idx].doc = doc_comment(mode.syntax()).map(Arc::from);
                }
                for rule in mode.rules() {
                    self.rule(rule);
                }
            }
        }
    }

    fn default_action_scope(&self) -> &'static str {
        match self.table.grammar_type() {
            GrammarType::Lexer => "lexer",
            GrammarType::Combined | GrammarType::Parser => "parser",
        }
    }

    fn rule(&mut self, rule: Rule) {
        let Some(name) = rule.name() else {
            return;
        };
        let kind = match rule {
            Rule::Parser(_) => SymbolKind::ParserRule,
            Rule::Lexer(_) => SymbolKind::LexerRule,
        };
        let Some(idx) = self.declare(kind, &name, rule.syntax().text_range()) else {
            return;
        };

        let parts = rule.signature_parts();
        let symbol = &mut self.table.symbols[idx];
        symbol.is_fragment = rule.is_fragment();
        symbol.mode = rule.mode().and_then(|m| m.name()).map(|n| n.text().into());
        symbol.doc = rule.doc().map(Arc::from);
        if !parts.is_empty() {
            symbol.detail = Some(parts.join(" ").into());
        }
        if kind == SymbolKind::LexerRule
            && !symbol.is_fragment
            && let Some(literal) = rule.single_literal()
        {
            let literal: SmolStr = literal.into();
            symbol.literal = Some(literal.clone());
            self.table.by_literal.entry(literal).or_default().push(idx);
        }
    }

    fn declare(&mut self, kind: SymbolKind, name: &Name, decl_range: TextRange) -> Option<usize> {
        let text = name.text();
        if text.is_empty() {
            return None;
        }
        Some(self.declare_at(kind, text.into(), name.syntax().text_range(), decl_range))
    }

    fn declare_at(
        &mut self,
        kind: SymbolKind,
        name: SmolStr,
        range: TextRange,
        decl_range: TextRange,
    ) -> usize {
        let symbol = Symbol {
            name: name.clone(),
            kind,
            file: self.file,
            range,
            span: self.line_index.span(range),
            decl_range,
            is_fragment: false,
            mode: None,
            literal: None,
            detail: None,
            doc: None,
        };

        let key = (name, kind.namespace());
        let idx = self.table.symbols.len();
        match self.first_seen.get(&key) {
            Some(&first) => {
                let first = self.table.symbols[first].clone();
                self.duplicate(&symbol, &first);
            }
            None => {
                self.first_seen.insert(key, idx);
            }
        }
        self.table.insert(symbol);
        idx
    }

    fn duplicate(&mut self, symbol: &Symbol, first: &Symbol) {
        let severity = if symbol.kind != first.kind {
            // A virtual token later given a lexer rule is legal but redundant
            Severity::Warning
        } else {
            Severity::Error
        };
        trace!(name = %symbol.name, "duplicate declaration");
        self.diagnostics.push(
            Diagnostic::new(
                DiagnosticKind::DuplicateDeclaration,
                self.file,
                symbol.range,
                symbol.span,
                format!(
                    "duplicate declaration: {} '{}' is already declared",
                    symbol.kind.display(),
                    symbol.name
                ),
            )
            .with_severity(severity)
            .with_related(RelatedInfo {
                file: first.file,
                range: first.range,
                span: first.span,
                message: Arc::from(format!("first declaration of '{}'", first.name)),
            }),
        );
    }
}
