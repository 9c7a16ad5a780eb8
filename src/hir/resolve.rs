//! Name resolution: binds every reference in a file to its declarations.
//!
//! Resolution order for a name is: built-ins, then the file's own table, then
//! the import closure in the order the caller provides. The closure is an
//! ordered slice of already-committed tables; the resolver never follows
//! imports itself, so import cycles cannot make it recurse.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smol_str::SmolStr;
use tracing::trace;

use super::diagnostics::{Diagnostic, DiagnosticKind, RelatedInfo};
use super::symbols::{Symbol, SymbolKind, SymbolTable};
use crate::base::{FileId, LineIndex, Span, TextRange};
use crate::parser::{
    AltList, AstNode, GrammarMember, GrammarType, LexerCommandKind, LexerCommands, NameRef, Rule,
    RuleElement, SourceFile, StringLiteral,
};

// ============================================================================
// REFERENCE TYPES
// ============================================================================

/// What a reference is looking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceKind {
    /// Parser rule reference, e.g. `expr`
    Rule,
    /// Token reference, e.g. `INT`, or the argument of `type(T)`
    Token,
    /// String literal in a parser rule, e.g. `'+'`
    Literal,
    /// Argument of `mode(M)` / `pushMode(M)`
    Mode,
    /// Argument of `channel(C)`
    Channel,
    /// Imported grammar or `tokenVocab` value
    Grammar,
}

impl ReferenceKind {
    pub fn display(&self) -> &'static str {
        match self {
            ReferenceKind::Rule => "rule",
            ReferenceKind::Token => "token",
            ReferenceKind::Literal => "literal",
            ReferenceKind::Mode => "mode",
            ReferenceKind::Channel => "channel",
            ReferenceKind::Grammar => "grammar",
        }
    }

    /// Whether `symbol` can be the target of a reference of this kind.
    pub fn matches(&self, symbol: &Symbol) -> bool {
        match self {
            ReferenceKind::Rule => symbol.kind == SymbolKind::ParserRule,
            ReferenceKind::Token => symbol.kind.is_token(),
            ReferenceKind::Literal => symbol.kind == SymbolKind::LexerRule,
            ReferenceKind::Mode => symbol.kind == SymbolKind::LexerMode,
            ReferenceKind::Channel => symbol.kind == SymbolKind::TokenChannel,
            ReferenceKind::Grammar => symbol.kind == SymbolKind::Grammar,
        }
    }
}

/// Names every grammar can use without declaring them.
pub fn is_built_in(kind: ReferenceKind, name: &str) -> bool {
    match kind {
        ReferenceKind::Token => name == "EOF",
        ReferenceKind::Channel => matches!(name, "HIDDEN" | "DEFAULT_TOKEN_CHANNEL"),
        ReferenceKind::Mode => name == "DEFAULT_MODE",
        ReferenceKind::Rule | ReferenceKind::Literal | ReferenceKind::Grammar => false,
    }
}

/// Outcome of resolving one reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Matching declarations; the first is the definition target.
    Resolved(Vec<Symbol>),
    /// A predefined name such as `EOF`, or an implicit literal token.
    BuiltIn,
    Unresolved,
}

impl Resolution {
    /// The go-to-definition target.
    pub fn definition(&self) -> Option<&Symbol> {
        match self {
            Resolution::Resolved(targets) => targets.first(),
            _ => None,
        }
    }

    pub fn targets(&self) -> &[Symbol] {
        match self {
            Resolution::Resolved(targets) => targets,
            _ => &[],
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Resolution::Resolved(_))
    }

    /// Resolved to declarations in more than one file.
    pub fn is_ambiguous(&self) -> bool {
        let files: FxHashSet<FileId> = self.targets().iter().map(|s| s.file).collect();
        files.len() > 1
    }
}

/// A usage site of a name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reference {
    pub file: FileId,
    pub range: TextRange,
    pub span: Span,
    pub name: SmolStr,
    pub kind: ReferenceKind,
    /// The rule the reference occurs in
    pub enclosing_rule: Option<SmolStr>,
    pub resolution: Resolution,
}

// ============================================================================
// IMPORT CLOSURE INPUT
// ============================================================================

/// What an imported table exposes to the importer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    /// Reached through `import` delegates only
    All,
    /// Reached through a `tokenVocab` edge somewhere on the path
    TokensOnly,
}

impl Visibility {
    pub fn exposes(&self, symbol: &Symbol) -> bool {
        match self {
            Visibility::All => true,
            Visibility::TokensOnly => symbol.kind.is_token(),
        }
    }
}

/// One member of a file's import closure, as the resolver sees it.
#[derive(Debug, Clone)]
pub struct ImportedTable {
    pub file: FileId,
    pub table: Arc<SymbolTable>,
    pub visibility: Visibility,
    /// Import distance from the resolving file (direct imports are 1)
    pub depth: u32,
}

// ============================================================================
// RESOLVER
// ============================================================================

/// References and diagnostics produced for one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveOutput {
    pub references: Vec<Reference>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Resolver for the references of one file.
#[derive(Clone, Debug)]
pub struct Resolver<'a> {
    file: FileId,
    table: &'a SymbolTable,
    line_index: &'a LineIndex,
    closure: &'a [ImportedTable],
    grammars: Option<&'a FxHashMap<SmolStr, Symbol>>,
    report_unresolved_imports: bool,
}

impl<'a> Resolver<'a> {
    /// Create a resolver that only sees the file's own table.
    pub fn new(file: FileId, table: &'a SymbolTable, line_index: &'a LineIndex) -> Self {
        Self {
            file,
            table,
            line_index,
            closure: &[],
            grammars: None,
            report_unresolved_imports: true,
        }
    }

    /// Set the ordered import closure.
    pub fn with_closure(mut self, closure: &'a [ImportedTable]) -> Self {
        self.closure = closure;
        self
    }

    /// Set the grammar-name targets of this file's imports.
    pub fn with_grammars(mut self, grammars: &'a FxHashMap<SmolStr, Symbol>) -> Self {
        self.grammars = Some(grammars);
        self
    }

    pub fn with_unresolved_imports(mut self, report: bool) -> Self {
        self.report_unresolved_imports = report;
        self
    }

    /// Resolve a single name.
    pub fn lookup(&self, name: &str, kind: ReferenceKind) -> Resolution {
        if is_built_in(kind, name) {
            return Resolution::BuiltIn;
        }
        if kind == ReferenceKind::Grammar {
            return match self.grammars.and_then(|g| g.get(name)) {
                Some(symbol) => Resolution::Resolved(vec![symbol.clone()]),
                None => Resolution::Unresolved,
            };
        }

        let own = candidates(self.table, name, kind, Visibility::All);
        if !own.is_empty() {
            return Resolution::Resolved(own);
        }

        let mut found = Vec::new();
        for entry in self.closure {
            found.extend(candidates(&entry.table, name, kind, entry.visibility));
        }
        if found.is_empty() {
            Resolution::Unresolved
        } else {
            Resolution::Resolved(found)
        }
    }

    /// Resolve every reference in the file.
    pub fn resolve(&self, root: &SourceFile) -> ResolveOutput {
        let mut walk = Walk {
            resolver: self,
            grammar_type: self.table.grammar_type(),
            out: ResolveOutput::default(),
        };
        for member in root.members() {
            walk.member(member);
        }
        trace!(
            file = self.file.index(),
            references = walk.out.references.len(),
            diagnostics = walk.out.diagnostics.len(),
            "resolved file"
        );
        walk.out
    }
}

fn candidates(
    table: &SymbolTable,
    name: &str,
    kind: ReferenceKind,
    visibility: Visibility,
) -> Vec<Symbol> {
    let keep = |s: &&Symbol| kind.matches(s) && visibility.exposes(s);
    match kind {
        ReferenceKind::Literal => table.lookup_literal(name).filter(keep).cloned().collect(),
        _ => table.lookup(name).filter(keep).cloned().collect(),
    }
}

// ============================================================================
// TREE WALK
// ============================================================================

struct RuleContext {
    name: Option<SmolStr>,
    is_lexer: bool,
}

struct Walk<'r, 'a> {
    resolver: &'r Resolver<'a>,
    grammar_type: GrammarType,
    out: ResolveOutput,
}

impl Walk<'_, '_> {
    fn member(&mut self, member: GrammarMember) {
        match member {
            GrammarMember::Header(_)
            | GrammarMember::Tokens(_)
            | GrammarMember::Channels(_)
            | GrammarMember::NamedAction(_) => {}
            GrammarMember::Options(options) => {
                if let Some(vocab) = options.token_vocab() {
                    self.grammar_reference(vocab);
                }
            }
            GrammarMember::Import(import) => {
                for target in import.items().filter_map(|item| item.target()) {
                    self.grammar_reference(target);
                }
            }
            GrammarMember::Rule(rule) => self.rule(rule),
            GrammarMember::Mode(mode) => {
                for rule in mode.rules() {
                    self.rule(rule);
                }
            }
        }
    }

    fn rule(&mut self, rule: Rule) {
        let ctx = RuleContext {
            name: rule.name().map(|n| n.text().into()),
            is_lexer: rule.is_lexer(),
        };
        if let Some(alts) = rule.alt_list() {
            self.alt_list(&alts, &ctx);
        }
    }

    fn alt_list(&mut self, alts: &AltList, ctx: &RuleContext) {
        for alt in alts.alternatives() {
            for element in alt.elements() {
                self.element(element, ctx);
            }
            if let Some(commands) = alt.commands() {
                self.commands(&commands, ctx);
            }
        }
    }

    fn element(&mut self, element: RuleElement, ctx: &RuleContext) {
        match element {
            RuleElement::Labeled(labeled) => {
                if let Some(inner) = labeled.element() {
                    self.element(inner, ctx);
                }
            }
            RuleElement::Ebnf(ebnf) => {
                if let Some(inner) = ebnf.element() {
                    self.element(inner, ctx);
                }
            }
            RuleElement::Not(not) => {
                if let Some(inner) = not.element() {
                    self.element(inner, ctx);
                }
            }
            RuleElement::Block(block) => {
                if let Some(alts) = block.alt_list() {
                    self.alt_list(&alts, ctx);
                }
            }
            RuleElement::RuleRef(rule_ref) => {
                if let Some(ident) = rule_ref.ident() {
                    self.reference(ident.text().into(), ReferenceKind::Rule, ident.text_range(), ctx);
                }
            }
            RuleElement::TokenRef(token_ref) => {
                if let Some(ident) = token_ref.ident() {
                    self.reference(ident.text().into(), ReferenceKind::Token, ident.text_range(), ctx);
                }
            }
            RuleElement::Literal(literal) => {
                // Literals inside lexer rules define text, they do not refer to tokens
                if !ctx.is_lexer {
                    self.literal(&literal, ctx);
                }
            }
            RuleElement::CharRange(_)
            | RuleElement::CharSet(_)
            | RuleElement::Wildcard(_)
            | RuleElement::Action(_)
            | RuleElement::Predicate(_) => {}
        }
    }

    fn commands(&mut self, commands: &LexerCommands, ctx: &RuleContext) {
        for command in commands.commands() {
            let Some(arg) = command.argument() else {
                continue;
            };
            let kind = match command.kind() {
                Some(LexerCommandKind::Mode | LexerCommandKind::PushMode) => ReferenceKind::Mode,
                Some(LexerCommandKind::Channel) => ReferenceKind::Channel,
                Some(LexerCommandKind::Type) => ReferenceKind::Token,
                Some(
                    LexerCommandKind::Skip
                    | LexerCommandKind::More
                    | LexerCommandKind::PopMode
                    | LexerCommandKind::Unknown(_),
                )
                | None => continue,
            };
            self.reference(arg.text().into(), kind, arg.syntax().text_range(), ctx);
        }
    }

    fn grammar_reference(&mut self, name_ref: NameRef) {
        let name: SmolStr = name_ref.text().into();
        let range = name_ref.syntax().text_range();
        let span = self.resolver.line_index.span(range);
        let resolution = self.resolver.lookup(&name, ReferenceKind::Grammar);
        if resolution == Resolution::Unresolved && self.resolver.report_unresolved_imports {
            self.out.diagnostics.push(Diagnostic::new(
                DiagnosticKind::UnresolvedImport,
                self.resolver.file,
                range,
                span,
                format!("imported grammar '{name}' is not loaded"),
            ));
        }
        self.push(name, ReferenceKind::Grammar, range, span, None, resolution);
    }

    fn literal(&mut self, literal: &StringLiteral, ctx: &RuleContext) {
        let Some(token) = literal.token() else {
            return;
        };
        let name: SmolStr = token.text().into();
        let range = token.text_range();
        let span = self.resolver.line_index.span(range);
        let mut resolution = self.resolver.lookup(&name, ReferenceKind::Literal);
        if resolution == Resolution::Unresolved {
            if self.grammar_type == GrammarType::Parser {
                self.out.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::ImplicitTokenInParser,
                    self.resolver.file,
                    range,
                    span,
                    format!("cannot create implicit token for literal {name} in a parser grammar"),
                ));
            } else {
                resolution = Resolution::BuiltIn;
            }
        }
        self.report_ambiguity(&name, range, span, &resolution);
        self.push(name, ReferenceKind::Literal, range, span, ctx.name.clone(), resolution);
    }

    /// Warn when `resolution` has targets in more than one file.
    fn report_ambiguity(&mut self, name: &str, range: TextRange, span: Span, resolution: &Resolution) {
        let Resolution::Resolved(targets) = resolution else {
            return;
        };
        if !resolution.is_ambiguous() {
            return;
        }
        let files: FxHashSet<FileId> = targets.iter().map(|s| s.file).collect();
        let mut diag = Diagnostic::new(
            DiagnosticKind::AmbiguousReference,
            self.resolver.file,
            range,
            span,
            format!(
                "ambiguous reference: '{}' is declared in {} imported grammars",
                name,
                files.len()
            ),
        );
        for candidate in targets {
            diag = diag.with_related(RelatedInfo {
                file: candidate.file,
                range: candidate.range,
                span: candidate.span,
                message: Arc::from(format!("candidate {} '{}'", candidate.kind.display(), candidate.name)),
            });
        }
        self.out.diagnostics.push(diag);
    }

    fn reference(&mut self, name: SmolStr, kind: ReferenceKind, range: TextRange, ctx: &RuleContext) {
        let file = self.resolver.file;
        let span = self.resolver.line_index.span(range);
        let resolution = self.resolver.lookup(&name, kind);
        let rule_name = ctx.name.as_deref().unwrap_or("?");

        match &resolution {
            Resolution::Unresolved => {
                self.out.diagnostics.push(Diagnostic::new(
                    DiagnosticKind::UnresolvedReference,
                    file,
                    range,
                    span,
                    format!("unresolved reference: {} '{}' is not declared", kind.display(), name),
                ));
            }
            Resolution::Resolved(targets) => {
                self.report_ambiguity(&name, range, span, &resolution);
                if let Some(target) = targets.first() {
                    if !ctx.is_lexer && kind == ReferenceKind::Token && target.is_fragment {
                        self.out.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::FragmentInParserRule,
                            file,
                            range,
                            span,
                            format!("parser rule '{rule_name}' cannot reference fragment token '{name}'"),
                        ));
                    }
                    if ctx.is_lexer && target.kind == SymbolKind::ParserRule {
                        self.out.diagnostics.push(Diagnostic::new(
                            DiagnosticKind::ParserRuleInLexerRule,
                            file,
                            range,
                            span,
                            format!("lexer rule '{rule_name}' cannot reference parser rule '{name}'"),
                        ));
                    }
                }
            }
            Resolution::BuiltIn => {}
        }

        self.push(name, kind, range, span, ctx.name.clone(), resolution);
    }

    fn push(
        &mut self,
        name: SmolStr,
        kind: ReferenceKind,
        range: TextRange,
        span: Span,
        enclosing_rule: Option<SmolStr>,
        resolution: Resolution,
    ) {
        trace!(
            name = %name,
            kind = kind.display(),
            resolved = resolution.is_resolved(),
            "reference"
        );
        self.out.references.push(Reference {
            file: self.resolver.file,
            range,
            span,
            name,
            kind,
            enclosing_rule,
            resolution,
        });
    }
}
