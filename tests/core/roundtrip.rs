//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Routec.
//! The Routec project belongs to the Dunimd Team.

use proptest::prelude::*;
use routec::archive::{self, Archive, ArchiveEntry};
use routec::{Landmark, PortRef, RouterCompiler, RouterGraph};

#[derive(Clone, Debug)]
struct GraphSpec {
    elements: Vec<(String, String)>,
    connections: Vec<(usize, u32, usize, u32)>,
}

fn graph_spec() -> impl Strategy<Value = GraphSpec> {
    (1usize..8).prop_flat_map(|n| {
        let class = "[A-Z][a-zA-Z]{0,6}";
        let config = prop_oneof![Just(String::new()), "[a-z0-9]{1,4}(, [a-z0-9]{1,4}){0,2}"];
        (
            prop::collection::vec((class, config), n),
            prop::collection::vec((0..n, 0u32..3, 0..n, 0u32..3), 0..12),
        )
            .prop_map(|(elements, connections)| GraphSpec {
                elements,
                connections,
            })
    })
}

fn build(spec: &GraphSpec) -> RouterGraph {
    let mut graph = RouterGraph::new();
    for (i, (class, config)) in spec.elements.iter().enumerate() {
        graph
            .declare_element(format!("e{}", i), class.clone(), config.clone(), Landmark::default())
            .unwrap();
    }
    for &(from, out, to, input) in &spec.connections {
        graph.connect(
            PortRef::new(format!("e{}", from), out),
            PortRef::new(format!("e{}", to), input),
            Landmark::default(),
        );
    }
    graph
}

fn endpoint_multiset(graph: &RouterGraph) -> Vec<(PortRef, PortRef)> {
    let mut endpoints: Vec<_> = graph.connections().iter().map(|c| c.endpoints()).collect();
    endpoints.sort();
    endpoints
}

fn archive_entry() -> impl Strategy<Value = ArchiveEntry> {
    (
        "[a-z][a-z0-9._-]{0,24}",
        prop::collection::vec(any::<u8>(), 0..64),
        0u64..4_000_000_000,
        0u32..65_536,
        0u32..65_536,
        0u32..0o7777,
    )
        .prop_map(|(name, data, timestamp, uid, gid, mode)| ArchiveEntry {
            timestamp,
            uid,
            gid,
            mode,
            ..ArchiveEntry::new(name, data)
        })
}

proptest! {
    #[test]
    fn parse_of_serialized_graph_preserves_topology(spec in graph_spec()) {
        let graph = build(&spec);
        let compiler = RouterCompiler::new().allow_empty(true);
        let text = compiler.render(&graph).unwrap();
        let reparsed = compiler.read(&text, &Landmark::file("roundtrip"), true).unwrap().graph;

        let before: Vec<_> = graph.elements().iter().map(|e| (&e.name, &e.class, &e.configuration)).collect();
        let after: Vec<_> = reparsed.elements().iter().map(|e| (&e.name, &e.class, &e.configuration)).collect();
        prop_assert_eq!(before, after);
        prop_assert_eq!(endpoint_multiset(&graph), endpoint_multiset(&reparsed));
    }

    #[test]
    fn accepted_declarations_always_read_back(
        name in "[a-z@/._-]{1,8}|require|elementclass",
        config in "[a-z0-9(),\" /*-]{0,10}",
    ) {
        let mut graph = RouterGraph::new();
        if graph.declare_element(name.clone(), "Idle", config.clone(), Landmark::default()).is_ok() {
            let compiler = RouterCompiler::new().allow_empty(true);
            let text = compiler.render(&graph).unwrap();
            let reparsed = compiler.read(&text, &Landmark::file("roundtrip"), true).unwrap().graph;
            let element = reparsed.element(&name);
            prop_assert!(element.is_some(), "{}", String::from_utf8_lossy(&text));
            prop_assert_eq!(&element.unwrap().configuration, &config);
        }
    }

    #[test]
    fn encoded_archives_are_a_fixed_point(entries in prop::collection::vec(archive_entry(), 0..8)) {
        let archive: Archive = entries.into_iter().collect();
        let bytes = archive::encode(&archive).unwrap();
        let decoded = archive::decode(&bytes).unwrap().unwrap();
        prop_assert_eq!(&decoded, &archive);
        prop_assert_eq!(archive::encode(&decoded).unwrap(), bytes);
    }

    #[test]
    fn decode_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..512)) {
        let mut input = archive::ARCHIVE_MAGIC.to_vec();
        input.extend_from_slice(&bytes);
        let _ = archive::decode(&input);
    }
}
