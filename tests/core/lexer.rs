//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Routec.
//! The Routec project belongs to the Dunimd Team.

use routec::dsl::{Lexer, ParserConfig, StatementParser, TokenKind};
use routec::{Diagnostics, Landmark, PortRef, RouterGraph, Severity, StaticRegistry};

fn parse_with(text: &str, config: &ParserConfig) -> (RouterGraph, Diagnostics) {
    let mut graph = RouterGraph::new();
    let mut diag = Diagnostics::new();
    StatementParser::new(text, &Landmark::file("conf.click"), &mut graph, &mut diag)
        .with_config(config)
        .finish();
    (graph, diag)
}

fn parse(text: &str) -> (RouterGraph, Diagnostics) {
    parse_with(text, &ParserConfig::default())
}

#[test]
fn test_declarations_and_connection() {
    let (graph, diag) = parse("a :: Class1; b :: Class2; a -> b;");
    assert!(diag.is_empty(), "{}", diag.render());

    let names: Vec<&str> = graph.elements().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["a", "b"]);
    assert_eq!(graph.element("b").unwrap().class, "Class2");
    assert_eq!(graph.connections().len(), 1);
    assert_eq!(
        graph.connections()[0].endpoints(),
        (PortRef::new("a", 0), PortRef::new("b", 0))
    );
}

#[test]
fn test_forward_references_resolve_at_finish() {
    let (graph, diag) = parse("a -> b; a :: A; b :: B;");
    assert!(diag.is_empty(), "{}", diag.render());
    assert_eq!(graph.connection_count(), 1);
}

#[test]
fn test_dangling_endpoints_are_reported_once() {
    let (_, diag) = parse("a :: A; a -> ghost; ghost [1] -> a;");
    let errors: Vec<String> = diag.errors().map(|d| d.message.clone()).collect();
    assert_eq!(errors, vec!["undeclared element `ghost`".to_string()]);
}

#[test]
fn test_diagnostics_carry_landmark_lines() {
    let (_, diag) = parse("a :: A;\n\nb :: ;\n");
    let error = diag.errors().next().expect("one error");
    assert_eq!(error.landmark, Landmark::new("conf.click", 3));
    assert!(error.to_string().starts_with("conf.click:3: "), "{}", error);
}

#[test]
fn test_every_syntax_error_is_reported() {
    let (graph, diag) = parse("a :: ;\nb :: B;\nc -> [z] b;\nd :: D e;\nf :: F;");
    assert_eq!(diag.nerrors(), 3, "{}", diag.render());
    assert!(graph.has_element("b"));
    assert!(graph.has_element("f"));
}

#[test]
fn test_redeclaration_is_a_statement_error() {
    let (graph, diag) = parse("a :: A; a :: B;");
    assert_eq!(diag.nerrors(), 1);
    assert!(diag.render().contains("redeclaration of element `a`"));
    assert_eq!(graph.element("a").unwrap().class, "A");
}

#[test]
fn test_multiple_declaration() {
    let (graph, diag) = parse("q1, q2, q3 :: Queue(100);");
    assert!(diag.is_empty(), "{}", diag.render());
    assert_eq!(graph.element_count(), 3);
    assert!(graph.elements().iter().all(|e| e.configuration == "100"));
}

#[test]
fn test_configuration_strings_are_kept_verbatim() {
    let (graph, diag) = parse(
        "c :: Classifier(12/0800, /* arp */ 12/0806,\n  -);\nd :: Print(\"a;b)\", 3);",
    );
    assert!(diag.is_empty(), "{}", diag.render());
    assert_eq!(graph.element("c").unwrap().configuration, "12/0800,   12/0806,\n  -");
    assert_eq!(graph.element("d").unwrap().configuration, "\"a;b)\", 3");
}

#[test]
fn test_registry_classes_create_anonymous_elements() {
    let registry: StaticRegistry = ["Idle", "Discard"].into_iter().collect();
    let mut graph = RouterGraph::new();
    let mut diag = Diagnostics::new();
    StatementParser::new("Idle -> Discard;", &Landmark::file("t"), &mut graph, &mut diag)
        .with_registry(Some(&registry))
        .finish();

    assert!(diag.is_empty(), "{}", diag.render());
    let classes: Vec<&str> = graph.elements().iter().map(|e| e.class.as_str()).collect();
    assert_eq!(classes, vec!["Idle", "Discard"]);
    assert_eq!(graph.connections()[0].to_string(), "Idle@1 -> Discard@2");
}

#[test]
fn test_unknown_classes_with_a_registry() {
    let registry: StaticRegistry = ["Queue"].into_iter().collect();
    let mut graph = RouterGraph::new();
    let mut diag = Diagnostics::new();
    StatementParser::new("q :: Queue; w :: Wat;", &Landmark::file("t"), &mut graph, &mut diag)
        .with_registry(Some(&registry))
        .finish();
    assert_eq!(diag.nerrors(), 1);
    assert!(diag.render().contains("unknown element class `Wat` for `w`"));
}

#[test]
fn test_line_directives() {
    let text = "a :: A;\n# 100 \"orig.click\"\nb :: ;\n";
    let (_, diag) = parse(text);
    assert_eq!(
        diag.errors().next().map(|d| d.landmark.clone()),
        Some(Landmark::new("orig.click", 100))
    );

    let ignoring = ParserConfig {
        ignore_line_directives: true,
    };
    let (_, diag) = parse_with(text, &ignoring);
    assert_eq!(
        diag.errors().next().map(|d| d.landmark.clone()),
        Some(Landmark::new("conf.click", 3))
    );
}

#[test]
fn test_malformed_line_directive_warns() {
    let (graph, diag) = parse("#pragma once\na :: A;");
    assert_eq!(diag.nerrors(), 0);
    assert_eq!(diag.nwarnings(), 1);
    assert_eq!(diag.iter().next().map(|d| d.severity), Some(Severity::Warning));
    assert!(graph.has_element("a"));
}

#[test]
fn test_hash_outside_line_start_is_a_syntax_error() {
    let (_, diag) = parse("a :: A; # 3");
    assert_eq!(diag.nerrors(), 1, "{}", diag.render());
}

#[test]
fn test_lexer_pushback() {
    let mut diag = Diagnostics::new();
    let mut lexer = Lexer::new("a -> b", &Landmark::file("t"));
    let first = lexer.next_token(&mut diag);
    lexer.unlex(first.clone());
    assert_eq!(lexer.next_token(&mut diag), first);
    assert_eq!(lexer.next_token(&mut diag).kind, TokenKind::Arrow);
}

#[test]
fn test_unterminated_compound_is_reported() {
    let (_, diag) = parse("elementclass Open { a :: A;");
    assert!(diag.render().contains("unterminated element class `Open`"));
}
