//! Railroad-diagram source for a rule, and the rule under a selection.
//!
//! The diagram is an owned tree describing the rule's alternative structure;
//! laying it out and drawing it is up to the caller.

use std::path::Path;

use smol_str::SmolStr;

use super::QueryError;
use super::goto::offset_at;
use super::text_utils::is_identifier;
use crate::base::{FileId, Position};
use crate::hir::SymbolKind;
use crate::parser::{AltList, Alternative, AstNode, EbnfSuffix, LexerCommands, Rule, RuleElement};
use crate::registry::Snapshot;

/// One node of a railroad diagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagramNode {
    /// `a | b | c`
    Choice(Vec<DiagramNode>),
    /// `a b c`; empty for an empty alternative
    Sequence(Vec<DiagramNode>),
    Optional(Box<DiagramNode>),
    ZeroOrMore(Box<DiagramNode>),
    OneOrMore(Box<DiagramNode>),
    /// Token reference, e.g. `INT`
    Terminal(SmolStr),
    /// Parser rule reference, e.g. `expr`
    NonTerminal(SmolStr),
    /// String literal with quotes, e.g. `'+'`
    Literal(SmolStr),
    /// `[a-z]` or `'a'..'z'`
    CharSet(SmolStr),
    Wildcard,
    /// `~x`
    Negation(Box<DiagramNode>),
    Action(SmolStr),
    Predicate(SmolStr),
    /// `-> skip, channel(HIDDEN)` as written, one entry per command
    Commands(Vec<SmolStr>),
}

/// The diagram of one rule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleDiagram {
    pub name: SmolStr,
    pub file: FileId,
    pub kind: SymbolKind,
    pub root: DiagramNode,
}

/// Build the diagram of the rule named `rule_name` in the file at `path`.
///
/// Returns `Ok(None)` if the file is not loaded or declares no such rule.
pub fn diagram_source(
    snapshot: &Snapshot,
    path: &Path,
    rule_name: &str,
) -> Result<Option<RuleDiagram>, QueryError> {
    if !is_identifier(rule_name) {
        return Err(QueryError::InvalidArgument(format!(
            "'{rule_name}' is not a rule name"
        )));
    }
    let Some(file) = snapshot.file_by_path(path) else {
        return Ok(None);
    };
    let root = file.syntax();
    let Some(rule) = root
        .rules()
        .find(|rule| rule.name().is_some_and(|name| name.text() == rule_name))
    else {
        return Ok(None);
    };

    let node = rule
        .alt_list()
        .map(|alts| alt_list_node(&alts))
        .unwrap_or(DiagramNode::Sequence(Vec::new()));
    Ok(Some(RuleDiagram {
        name: SmolStr::new(rule_name),
        file: file.id(),
        kind: if rule.is_lexer() {
            SymbolKind::LexerRule
        } else {
            SymbolKind::ParserRule
        },
        root: node,
    }))
}

fn alt_list_node(alts: &AltList) -> DiagramNode {
    let mut choices: Vec<DiagramNode> = alts.alternatives().map(|alt| alternative_node(&alt)).collect();
    if choices.len() == 1 {
        choices.remove(0)
    } else {
        DiagramNode::Choice(choices)
    }
}

fn alternative_node(alt: &Alternative) -> DiagramNode {
    let mut items: Vec<DiagramNode> = alt.elements().filter_map(element_node).collect();
    if let Some(commands) = alt.commands() {
        items.push(commands_node(&commands));
    }
    if items.len() == 1 {
        items.remove(0)
    } else {
        DiagramNode::Sequence(items)
    }
}

fn element_node(element: RuleElement) -> Option<DiagramNode> {
    let node = match element {
        RuleElement::Labeled(labeled) => return labeled.element().and_then(element_node),
        RuleElement::Ebnf(ebnf) => {
            let inner = Box::new(ebnf.element().and_then(element_node)?);
            match ebnf.suffix() {
                Some(EbnfSuffix::Optional) => DiagramNode::Optional(inner),
                Some(EbnfSuffix::ZeroOrMore) => DiagramNode::ZeroOrMore(inner),
                Some(EbnfSuffix::OneOrMore) => DiagramNode::OneOrMore(inner),
                None => *inner,
            }
        }
        RuleElement::Block(block) => block
            .alt_list()
            .map(|alts| alt_list_node(&alts))
            .unwrap_or(DiagramNode::Sequence(Vec::new())),
        RuleElement::RuleRef(rule_ref) => DiagramNode::NonTerminal(rule_ref.ident()?.text().into()),
        RuleElement::TokenRef(token_ref) => DiagramNode::Terminal(token_ref.ident()?.text().into()),
        RuleElement::Literal(literal) => DiagramNode::Literal(literal.text()?.into()),
        RuleElement::CharRange(range) => {
            let (lo, hi) = range.bounds()?;
            DiagramNode::CharSet(format!("{lo}..{hi}").into())
        }
        RuleElement::CharSet(set) => DiagramNode::CharSet(set.text().into()),
        RuleElement::Wildcard(_) => DiagramNode::Wildcard,
        RuleElement::Not(not) => DiagramNode::Negation(Box::new(not.element().and_then(element_node)?)),
        RuleElement::Action(action) => DiagramNode::Action(action.text().into()),
        RuleElement::Predicate(predicate) => DiagramNode::Predicate(predicate.text().into()),
    };
    Some(node)
}

fn commands_node(commands: &LexerCommands) -> DiagramNode {
    DiagramNode::Commands(
        commands
            .commands()
            .filter_map(|command| {
                let name = command.name()?;
                Some(match command.argument_text() {
                    Some(arg) => format!("{name}({arg})").into(),
                    None => name.into(),
                })
            })
            .collect(),
    )
}

/// Name of the rule enclosing `position`, the "active selection" used to
/// pick which diagram to show.
pub fn rule_at(
    snapshot: &Snapshot,
    path: &Path,
    position: Position,
) -> Result<Option<SmolStr>, QueryError> {
    let Some(file) = snapshot.file_by_path(path) else {
        return Ok(None);
    };
    let offset = offset_at(file, position)?;
    let root = file.syntax();
    let tokens = root.syntax().token_at_offset(offset);
    let name = [tokens.clone().right_biased(), tokens.left_biased()]
        .into_iter()
        .flatten()
        .find_map(|token| token.parent_ancestors().find_map(Rule::cast))
        .and_then(|rule| rule.name())
        .map(|name| SmolStr::new(name.text()));
    Ok(name)
}
