//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Routec.
//! The Routec project belongs to the Dunimd Team.

use std::fs;
use std::sync::Arc;

use routec::archive::{self, Archive, ArchiveEntry};
use routec::{
    ArchiveError, CompilerConfig, Landmark, OutputTarget, PortRef, RouterCompiler, RouterError,
    StaticRegistry,
};

fn archive_bytes(members: &[(&str, &str)]) -> Vec<u8> {
    let archive: Archive = members
        .iter()
        .map(|(name, data)| ArchiveEntry::new(*name, *data))
        .collect();
    archive::encode(&archive).unwrap()
}

#[test]
fn test_plain_text_round_trip() {
    let compiler = RouterCompiler::new();
    let first = compiler.read_expr("a :: Class1; b :: Class2; a -> b;").unwrap();
    let graph = &first.graph;
    assert_eq!(graph.element_count(), 2);
    assert_eq!(
        graph.connections()[0].endpoints(),
        (PortRef::new("a", 0), PortRef::new("b", 0))
    );

    let text = compiler.render(graph).unwrap();
    assert_eq!(text, b"a :: Class1;\nb :: Class2;\n\na -> b;\n");

    let second = compiler.read(&text, &Landmark::file("again"), false).unwrap();
    assert_eq!(second.graph.elements().len(), 2);
    assert_eq!(second.graph.element("a").unwrap().class, "Class1");
    assert_eq!(
        second.graph.connections()[0].endpoints(),
        graph.connections()[0].endpoints()
    );
}

#[test]
fn test_archive_round_trip_keeps_carried_members() {
    let compiler = RouterCompiler::new();
    let input = archive_bytes(&[("config", "x :: Y;"), ("extra", "hello")]);
    assert_eq!(input[0], b'!');

    let compilation = compiler.read(&input, &Landmark::file("in.ar"), false).unwrap();
    let graph = &compilation.graph;
    assert_eq!(graph.element_count(), 1);
    assert_eq!(graph.element("x").unwrap().class, "Y");
    let carried: Vec<&str> = graph.archive().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(carried, vec!["extra"]);

    let output = compiler.render(graph).unwrap();
    let decoded = archive::decode(&output).unwrap().expect("output is an archive");
    let names: Vec<&str> = decoded.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["config", "extra"]);
    assert_eq!(decoded.find_live("config").unwrap().mode, 0o644);
    assert_eq!(decoded.find_live("extra").unwrap().data, b"hello");

    let again = compiler.read(&output, &Landmark::file("out.ar"), false).unwrap();
    assert_eq!(again.graph.element("x").unwrap().class, "Y");
    assert_eq!(again.graph.element_count(), 1);
}

#[test]
fn test_archive_without_config_is_fatal() {
    let compiler = RouterCompiler::new();
    let input = archive_bytes(&[("extra", "hello")]);
    let err = compiler.read(&input, &Landmark::file("in.ar"), false).unwrap_err();
    assert!(matches!(err, RouterError::Format(ArchiveError::MissingConfig)));
    assert_eq!(err.to_string(), "archive error: archive has no `config' section");

    let err = compiler
        .read_best_effort(&archive_bytes(&[]), &Landmark::file("empty.ar"))
        .unwrap_err();
    assert!(matches!(err, RouterError::Format(ArchiveError::MissingConfig)));
}

#[test]
fn test_last_live_config_wins() {
    let compiler = RouterCompiler::new();
    let input = archive_bytes(&[("config", "old :: Old;"), ("config", "new :: New;")]);
    let compilation = compiler.read(&input, &Landmark::file("in.ar"), false).unwrap();
    assert!(compilation.graph.has_element("new"));
    assert!(!compilation.graph.has_element("old"));
    assert!(compilation.graph.archive().is_empty());
}

#[test]
fn test_archive_with_only_config_writes_plain_text() {
    let compiler = RouterCompiler::new();
    let input = archive_bytes(&[("config", "x :: Y;")]);
    let compilation = compiler.read(&input, &Landmark::file("in.ar"), false).unwrap();
    assert_eq!(compiler.render(&compilation.graph).unwrap(), b"x :: Y;\n");
}

#[test]
fn test_errors_fail_the_compile_but_best_effort_keeps_the_graph() {
    let compiler = RouterCompiler::new();
    let text = b"a :: A; b :: ; a -> nowhere;";

    let err = compiler.read(text, &Landmark::file("bad.click"), false).unwrap_err();
    let diagnostics = err.diagnostics().expect("compile error carries diagnostics");
    assert_eq!(diagnostics.nerrors(), 2, "{}", diagnostics.render());

    let partial = compiler.read_best_effort(text, &Landmark::file("bad.click")).unwrap();
    assert!(!partial.is_ok());
    assert!(partial.graph.has_element("a"));
    assert_eq!(partial.diagnostics.nerrors(), 2);
}

#[test]
fn test_empty_configuration_warns() {
    let compiler = RouterCompiler::new();
    let compilation = compiler.read(b"  \n\t", &Landmark::file("e"), false).unwrap();
    assert!(compilation.graph.is_empty());
    assert_eq!(compilation.diagnostics.nwarnings(), 1);

    let quiet = compiler.read(b"", &Landmark::file("e"), true).unwrap();
    assert!(quiet.diagnostics.is_empty());
}

#[test]
fn test_library_members_are_spliced() {
    let compiler = RouterCompiler::new();
    let input = archive_bytes(&[
        ("config", "require(library stage.click); a :: A; a -> s;"),
        ("stage.click", "s :: Stage;"),
    ]);
    let compilation = compiler.read(&input, &Landmark::file("in.ar"), false).unwrap();
    assert_eq!(compilation.graph.element("s").unwrap().class, "Stage");
    assert_eq!(compilation.graph.connection_count(), 1);
}

#[test]
fn test_recursive_library_is_an_error() {
    let compiler = RouterCompiler::new();
    let input = archive_bytes(&[
        ("config", "require(library loop.click);"),
        ("loop.click", "require(library loop.click);"),
    ]);
    let err = compiler.read(&input, &Landmark::file("in.ar"), false).unwrap_err();
    assert!(err
        .diagnostics()
        .unwrap()
        .render()
        .contains("recursive inclusion of library `loop.click`"));
}

#[test]
fn test_registry_from_config() {
    let config = CompilerConfig::from_json_str(r#"{"known_classes": ["Queue"]}"#).unwrap();
    let compiler = RouterCompiler::new().with_config(config);
    assert!(compiler.read_expr("q :: Queue;").is_ok());
    assert!(compiler.read_expr("q :: Mystery;").is_err());

    let explicit = RouterCompiler::new()
        .with_registry(Arc::new(StaticRegistry::new().with_class("Mystery")))
        .with_config(CompilerConfig::default());
    assert!(explicit.read_expr("q :: Mystery;").is_ok());
}

#[test]
fn test_files_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("router.ar");
    fs::write(&input, archive_bytes(&[("config", "x :: Y;"), ("extra", "hello")])).unwrap();

    let compiler = RouterCompiler::new();
    let compilation = compiler.read_file(&input).unwrap();
    assert!(compilation.graph.has_element("x"));

    let output = dir.path().join("out.ar");
    let target = OutputTarget::parse(output.to_str().unwrap());
    compiler.write(&compilation.graph, &target).unwrap();
    let written = fs::read(&output).unwrap();
    let decoded = archive::decode(&written).unwrap().unwrap();
    assert_eq!(decoded.find_live("extra").unwrap().text(), "hello");
}

#[test]
fn test_missing_file_names_the_path() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.click");
    let err = RouterCompiler::new().read_file(&missing).unwrap_err();
    match err {
        RouterError::Io(message) => assert!(message.contains("missing.click"), "{}", message),
        other => panic!("expected an IO error, got {:?}", other),
    }
}

#[test]
fn test_write_to_buffer() {
    let compiler = RouterCompiler::new();
    let compilation = compiler.read_expr("a :: A; a [2] -> [1] a;").unwrap();
    let mut out = Vec::new();
    compiler.write_to(&compilation.graph, &mut out).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "a :: A;\n\na [2] -> [1] a;\n");
}
