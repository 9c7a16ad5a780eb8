//! Per-file grammar checks that need the whole tree and table.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use super::diagnostics::{Diagnostic, DiagnosticKind, RelatedInfo};
use super::symbols::SymbolTable;
use crate::base::{FileId, LineIndex, TextRange};
use crate::parser::{AltList, AstNode, EbnfSuffix, GrammarMember, GrammarType, Rule, RuleElement, SourceFile};

/// Run every grammar check for one file.
///
/// `file_stem` is the file name without extension, used for the
/// grammar-name check; pass `None` to skip it.
pub fn check_grammar(
    file: FileId,
    root: &SourceFile,
    table: &SymbolTable,
    line_index: &LineIndex,
    file_stem: Option<&str>,
) -> Vec<Diagnostic> {
    let checker = Checker {
        file,
        table,
        line_index,
    };
    let mut diagnostics = Vec::new();
    checker.rule_placement(root, &mut diagnostics);
    checker.left_recursion(root, &mut diagnostics);
    if let Some(stem) = file_stem {
        checker.grammar_name(stem, &mut diagnostics);
    }
    checker.empty_grammar(&mut diagnostics);
    trace!(file = file.index(), count = diagnostics.len(), "grammar checks");
    diagnostics
}

struct Checker<'a> {
    file: FileId,
    table: &'a SymbolTable,
    line_index: &'a LineIndex,
}

impl Checker<'_> {
    fn diagnostic(&self, kind: DiagnosticKind, range: TextRange, message: String) -> Diagnostic {
        Diagnostic::new(kind, self.file, range, self.line_index.span(range), message)
    }

    // ========================================================================
    // RULE PLACEMENT
    // ========================================================================

    fn rule_placement(&self, root: &SourceFile, out: &mut Vec<Diagnostic>) {
        let grammar_type = self.table.grammar_type();
        for member in root.members() {
            match member {
                GrammarMember::Rule(rule) => self.check_rule_kind(&rule, grammar_type, out),
                GrammarMember::Mode(mode) => {
                    if grammar_type != GrammarType::Lexer {
                        let range = mode
                            .name()
                            .map(|n| n.syntax().text_range())
                            .unwrap_or_else(|| mode.syntax().text_range());
                        out.push(self.diagnostic(
                            DiagnosticKind::RuleNotAllowed,
                            range,
                            format!("lexer modes are not allowed in a {} grammar", describe(grammar_type)),
                        ));
                    }
                    for rule in mode.rules() {
                        self.check_rule_kind(&rule, grammar_type, out);
                    }
                }
                GrammarMember::Header(_)
                | GrammarMember::Options(_)
                | GrammarMember::Import(_)
                | GrammarMember::Tokens(_)
                | GrammarMember::Channels(_)
                | GrammarMember::NamedAction(_) => {}
            }
        }
    }

    fn check_rule_kind(&self, rule: &Rule, grammar_type: GrammarType, out: &mut Vec<Diagnostic>) {
        let Some(name) = rule.name() else {
            return;
        };
        let message = match rule {
            Rule::Lexer(_) if !grammar_type.allows_lexer_rules() => {
                format!("lexer rule '{}' not allowed in a parser grammar", name.text())
            }
            Rule::Parser(_) if !grammar_type.allows_parser_rules() => {
                format!("parser rule '{}' not allowed in a lexer grammar", name.text())
            }
            _ => return,
        };
        out.push(self.diagnostic(DiagnosticKind::RuleNotAllowed, name.syntax().text_range(), message));
    }

    // ========================================================================
    // LEFT RECURSION
    // ========================================================================

    /// Report rules that can derive themselves without consuming input.
    ///
    /// Builds a graph with an edge `a -> b` whenever `b` can be the leftmost
    /// element of `a`. Every strongly connected component with more than one
    /// rule is mutual left recursion. A self loop is only an error for lexer
    /// rules; parser rules may be directly left-recursive.
    fn left_recursion(&self, root: &SourceFile, out: &mut Vec<Diagnostic>) {
        let mut graph: DiGraph<RuleNode, ()> = DiGraph::new();
        let mut by_name: FxHashMap<SmolStr, NodeIndex> = FxHashMap::default();
        let mut rules = Vec::new();

        for rule in root.rules() {
            let Some(name) = rule.name() else {
                continue;
            };
            let name: SmolStr = name.text().into();
            if by_name.contains_key(&name) {
                continue;
            }
            let range = rule
                .name()
                .map(|n| n.syntax().text_range())
                .unwrap_or_else(|| rule.syntax().text_range());
            let idx = graph.add_node(RuleNode {
                name: name.clone(),
                range,
                is_lexer: rule.is_lexer(),
            });
            by_name.insert(name, idx);
            rules.push((idx, rule));
        }

        for (from, rule) in &rules {
            let Some(alts) = rule.alt_list() else {
                continue;
            };
            let mut leading = Vec::new();
            leading_refs(&alts, rule.is_lexer(), &mut leading);
            for name in leading {
                if let Some(&to) = by_name.get(&name)
                    && graph[to].is_lexer == rule.is_lexer()
                    && graph.find_edge(*from, to).is_none()
                {
                    graph.add_edge(*from, to, ());
                }
            }
        }

        for mut component in tarjan_scc(&graph) {
            component.sort();
            if component.len() > 1 {
                let names: Vec<&str> = component.iter().map(|&n| graph[n].name.as_str()).collect();
                for &idx in &component {
                    let node = &graph[idx];
                    let mut diag = self.diagnostic(
                        DiagnosticKind::LeftRecursion,
                        node.range,
                        format!(
                            "rule '{}' is mutually left-recursive with {}",
                            node.name,
                            quoted_except(&names, &node.name)
                        ),
                    );
                    for &other in component.iter().filter(|&&other| other != idx) {
                        let other = &graph[other];
                        diag = diag.with_related(RelatedInfo {
                            file: self.file,
                            range: other.range,
                            span: self.line_index.span(other.range),
                            message: format!("'{}' declared here", other.name).into(),
                        });
                    }
                    out.push(diag);
                }
            } else if let Some(&idx) = component.first() {
                let node = &graph[idx];
                if node.is_lexer && graph.find_edge(idx, idx).is_some() {
                    out.push(self.diagnostic(
                        DiagnosticKind::LeftRecursion,
                        node.range,
                        format!("lexer rule '{}' is left-recursive", node.name),
                    ));
                }
            }
        }
    }

    // ========================================================================
    // FILE-LEVEL CHECKS
    // ========================================================================

    fn grammar_name(&self, stem: &str, out: &mut Vec<Diagnostic>) {
        let Some(header) = &self.table.header else {
            return;
        };
        if header.name != stem {
            out.push(self.diagnostic(
                DiagnosticKind::GrammarNameMismatch,
                header.range,
                format!("grammar name '{}' does not match file name '{}'", header.name, stem),
            ));
        }
    }

    fn empty_grammar(&self, out: &mut Vec<Diagnostic>) {
        let Some(header) = &self.table.header else {
            return;
        };
        if self.table.rule_count() == 0 {
            out.push(self.diagnostic(
                DiagnosticKind::EmptyGrammar,
                header.range,
                format!("grammar '{}' declares no rules", header.name),
            ));
        }
    }
}

struct RuleNode {
    name: SmolStr,
    range: TextRange,
    is_lexer: bool,
}

fn describe(grammar_type: GrammarType) -> &'static str {
    match grammar_type {
        GrammarType::Combined => "combined",
        GrammarType::Lexer => "lexer",
        GrammarType::Parser => "parser",
    }
}

fn quoted_except(names: &[&str], skip: &str) -> String {
    names
        .iter()
        .filter(|n| **n != skip)
        .map(|n| format!("'{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Collect the rule names that can start `alts`. Returns whether `alts` can
/// match the empty string.
fn leading_refs(alts: &AltList, is_lexer: bool, out: &mut Vec<SmolStr>) -> bool {
    let mut nullable = false;
    for alt in alts.alternatives() {
        let mut alt_nullable = true;
        for element in alt.elements() {
            if !leading_element(element, is_lexer, out) {
                alt_nullable = false;
                break;
            }
        }
        nullable |= alt_nullable;
    }
    nullable
}

fn leading_element(element: RuleElement, is_lexer: bool, out: &mut Vec<SmolStr>) -> bool {
    match element {
        RuleElement::Labeled(labeled) => labeled
            .element()
            .is_some_and(|inner| leading_element(inner, is_lexer, out)),
        RuleElement::Ebnf(ebnf) => {
            let inner_nullable = ebnf
                .element()
                .is_some_and(|inner| leading_element(inner, is_lexer, out));
            inner_nullable
                || matches!(ebnf.suffix(), Some(EbnfSuffix::Optional | EbnfSuffix::ZeroOrMore))
        }
        RuleElement::Block(block) => block
            .alt_list()
            .is_some_and(|alts| leading_refs(&alts, is_lexer, out)),
        RuleElement::RuleRef(rule_ref) => {
            if !is_lexer && let Some(ident) = rule_ref.ident() {
                out.push(ident.text().into());
            }
            false
        }
        RuleElement::TokenRef(token_ref) => {
            if is_lexer && let Some(ident) = token_ref.ident() {
                out.push(ident.text().into());
            }
            false
        }
        RuleElement::Action(_) | RuleElement::Predicate(_) => true,
        RuleElement::Literal(_)
        | RuleElement::CharRange(_)
        | RuleElement::CharSet(_)
        | RuleElement::Wildcard(_)
        | RuleElement::Not(_) => false,
    }
}
