//! Parser tests
//!
//! Rule classification, error recovery and losslessness of the CST.

use rstest::rstest;
use rulesmith::parser::{AstNode, GrammarType, Rule, SyntaxKind, parse};

fn rule_names(input: &str) -> Vec<(String, bool)> {
    parse(input)
        .source_file()
        .rules()
        .filter_map(|rule| Some((rule.name()?.text(), rule.is_lexer())))
        .collect()
}

// ============================================================================
// RULE KINDS
// ============================================================================

#[rstest]
#[case::parser_rule("grammar G; expr : INT ;", "expr", false)]
#[case::lexer_rule("grammar G; INT : [0-9]+ ;", "INT", true)]
#[case::fragment("lexer grammar L; fragment DIGIT : [0-9] ;", "DIGIT", true)]
#[case::underscore_start("grammar G; _hidden : A ;", "_hidden", false)]
#[case::in_mode("lexer grammar L; mode STR; CHARS : ~'\"'+ ;", "CHARS", true)]
fn test_rule_kind_follows_first_letter(#[case] input: &str, #[case] name: &str, #[case] lexer: bool) {
    let parse = parse(input);
    assert!(parse.ok(), "errors: {:?}", parse.errors);
    assert_eq!(rule_names(input), vec![(name.to_string(), lexer)]);
}

#[rstest]
#[case::combined("grammar G;", GrammarType::Combined)]
#[case::lexer("lexer grammar L;", GrammarType::Lexer)]
#[case::parser("parser grammar P;", GrammarType::Parser)]
fn test_grammar_type(#[case] input: &str, #[case] expected: GrammarType) {
    let header = parse(input).source_file().header().unwrap();
    assert_eq!(header.grammar_type(), expected);
}

#[test]
fn test_fragment_flag() {
    let file = parse("lexer grammar L; fragment D : [0-9] ; NUM : D+ ;").source_file();
    let flags: Vec<bool> = file.rules().map(|r| r.is_fragment()).collect();
    assert_eq!(flags, vec![true, false]);
}

#[test]
fn test_mode_rules_know_their_mode() {
    let input = "lexer grammar L;\nA : 'a' ;\nmode INSIDE;\nB : 'b' ;\n";
    let file = parse(input).source_file();
    let modes: Vec<Option<String>> = file
        .rules()
        .map(|r| r.mode().and_then(|m| m.name()).map(|n| n.text()))
        .collect();
    assert_eq!(modes, vec![None, Some("INSIDE".to_string())]);
}

#[test]
fn test_doc_comment_attaches_to_rule() {
    let file = parse("grammar G;\n/** Top level. */\nstart : A ;\n").source_file();
    let rule = file.rules().next().unwrap();
    assert_eq!(rule.doc().as_deref(), Some("Top level."));
}

// ============================================================================
// ERROR RECOVERY
// ============================================================================

#[rstest]
#[case::missing_semicolon("grammar G;\na : b\nb : 'x' ;\n", "missing ';'", 2)]
#[case::unterminated_string("grammar G;\nA : 'abc ;\nB : 'b' ;\n", "unterminated string literal", 2)]
#[case::stray_tokens("grammar G;\n) ) ;\nr : X ;\n", "expected grammar member", 1)]
fn test_recovery_keeps_following_rules(#[case] input: &str, #[case] message: &str, #[case] rules: usize) {
    let parse = parse(input);
    assert!(
        parse.errors.iter().any(|e| e.message.contains(message)),
        "errors: {:?}",
        parse.errors
    );
    assert_eq!(parse.source_file().rules().count(), rules);
}

#[test]
fn test_unterminated_action_runs_to_end_of_file() {
    let parse = parse("grammar G;\nr : A { code ;\ns : B ;\n");
    assert!(
        parse.errors.iter().any(|e| e.message == "unterminated action block"),
        "errors: {:?}",
        parse.errors
    );
    let names: Vec<String> = parse
        .source_file()
        .rules()
        .filter_map(|r| r.name().map(|n| n.text()))
        .collect();
    assert_eq!(names, vec!["r"]);
}

#[test]
fn test_error_ranges_lie_within_text() {
    let input = "grammar G;\nr : ( A | ;\nB : 'b\n";
    let parse = parse(input);
    assert!(!parse.ok());
    for error in &parse.errors {
        assert!(
            usize::from(error.range.end()) <= input.len(),
            "error {:?} past end of input",
            error
        );
    }
}

#[test]
fn test_missing_header() {
    let parse = parse("r : A ;");
    assert_eq!(parse.errors[0].message, "missing grammar declaration");
    assert_eq!(parse.source_file().rules().count(), 1);
}

// ============================================================================
// LOSSLESSNESS
// ============================================================================

#[rstest]
#[case::plain("grammar G;\nr : A ;\n")]
#[case::comments("grammar G; // line\n/* block */ r : A ; /** doc */ B : 'b' ;")]
#[case::options("grammar G;\noptions { tokenVocab = L; }\nimport X, Y = Z;\n")]
#[case::actions("grammar G;\n@header { package x; }\nr : {p}? A {a();} ;\n")]
#[case::commands("lexer grammar L;\nWS : [ \\t]+ -> channel(HIDDEN), skip ;\n")]
#[case::broken("grammar G;\nr : ( A | ;\nB : 'b\n")]
#[case::unicode("grammar G;\nr : 'é' 'ü' ;\n")]
fn test_tree_reproduces_input(#[case] input: &str) {
    let parse = parse(input);
    assert_eq!(parse.syntax().text().to_string(), input);
}

#[test]
fn test_rule_cast_matches_kind() {
    let parse = parse("grammar G; r : A ; A : 'a' ;");
    let kinds: Vec<SyntaxKind> = parse
        .syntax()
        .descendants()
        .filter_map(Rule::cast)
        .map(|rule| rule.syntax().kind())
        .collect();
    assert_eq!(kinds, vec![SyntaxKind::PARSER_RULE, SyntaxKind::LEXER_RULE]);
}
