//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Routec.
//! The Routec project belongs to the Dunimd Team.

use routec::archive::{self, Archive, ArchiveEntry, ARCHIVE_MAGIC};
use routec::ArchiveError;

fn entry(name: &str, data: &str) -> ArchiveEntry {
    ArchiveEntry {
        timestamp: 1_700_000_000,
        uid: 1000,
        gid: 100,
        ..ArchiveEntry::new(name, data)
    }
}

#[test]
fn test_empty_archive_is_just_the_magic() {
    let bytes = archive::encode(&Archive::new()).unwrap();
    assert_eq!(bytes, ARCHIVE_MAGIC);

    let decoded = archive::decode(&bytes).unwrap().unwrap();
    assert!(decoded.is_empty());
}

#[test]
fn test_plain_text_is_not_an_archive() {
    assert_eq!(archive::decode(b"a :: Queue;").unwrap(), None);
    assert_eq!(archive::decode(b"").unwrap(), None);
    assert_eq!(archive::decode(b"!<nope>\n"), Err(ArchiveError::BadMagic));
}

#[test]
fn test_encode_is_a_stable_normal_form() {
    let archive: Archive = vec![
        entry("config", "x :: Y;"),
        entry("a-rather-long-member-name.click", "odd"),
        entry("dir/file", ""),
        entry("extra", "hello"),
    ]
    .into_iter()
    .collect();

    let first = archive::encode(&archive).unwrap();
    let decoded = archive::decode(&first).unwrap().unwrap();
    assert_eq!(decoded, archive);
    assert_eq!(archive::encode(&decoded).unwrap(), first);
}

#[test]
fn test_later_entries_shadow_earlier_ones() {
    let mut archive = Archive::new();
    archive.push(entry("x", "first"));
    archive.push(entry("y", "other"));
    archive.push(entry("x", "second"));

    assert_eq!(archive.len(), 3);
    assert_eq!(archive.find_live("x").map(|e| e.data.as_slice()), Some(&b"second"[..]));
    assert!(!archive.entries()[0].live);

    // Both versions are written; decoding recovers the same liveness.
    let decoded = archive::decode(&archive::encode(&archive).unwrap()).unwrap().unwrap();
    assert_eq!(decoded.len(), 3);
    let live: Vec<bool> = decoded.iter().map(|e| e.live).collect();
    assert_eq!(live, vec![false, true, true]);
    assert_eq!(decoded.find_live("x").map(|e| e.text().into_owned()), Some("second".to_string()));
}

#[test]
fn test_truncated_member_data() {
    let archive: Archive = vec![entry("config", "x :: Y;\n")].into_iter().collect();
    let bytes = archive::encode(&archive).unwrap();

    let err = archive::decode(&bytes[..bytes.len() - 3]).unwrap_err();
    assert!(matches!(err, ArchiveError::Truncated(_)), "{:?}", err);

    let err = archive::decode(&bytes[..ARCHIVE_MAGIC.len() + 20]).unwrap_err();
    assert!(matches!(err, ArchiveError::Truncated(_)), "{:?}", err);
}

#[test]
fn test_bad_header_terminator() {
    let archive: Archive = vec![entry("config", "x")].into_iter().collect();
    let mut bytes = archive::encode(&archive).unwrap();
    bytes[ARCHIVE_MAGIC.len() + 58] = b'!';
    assert!(matches!(
        archive::decode(&bytes),
        Err(ArchiveError::BadHeader { .. })
    ));
}

#[test]
fn test_oversized_fields_fail_to_encode() {
    let mut big = entry("config", "x");
    big.uid = 12_345_678;
    let archive: Archive = vec![big].into_iter().collect();
    match archive::encode(&archive) {
        Err(ArchiveError::FieldOverflow { field, value, .. }) => {
            assert_eq!(field, "uid");
            assert_eq!(value, 12_345_678);
        }
        other => panic!("expected overflow, got {:?}", other),
    }
}

#[test]
fn test_hand_written_bsd_and_symbol_members() {
    fn header(name: &str, size: usize) -> Vec<u8> {
        format!("{:<16}{:<12}{:<6}{:<6}{:<8}{:<10}`\n", name, "0", "0", "0", "644", size).into_bytes()
    }

    let mut bytes = ARCHIVE_MAGIC.to_vec();
    bytes.extend(header("/", 4));
    bytes.extend_from_slice(b"\0\0\0\0");
    bytes.extend(header("#1/12", 12 + 7));
    bytes.extend_from_slice(b"long.name.ck");
    bytes.extend_from_slice(b"payload\n");
    bytes.extend(header("config/", 4));
    bytes.extend_from_slice(b"a::b");

    let decoded = archive::decode(&bytes).unwrap().unwrap();
    let names: Vec<&str> = decoded.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["long.name.ck", "config"]);
    assert_eq!(decoded.find_live("long.name.ck").unwrap().data, b"payload");

    // Hand-written input settles into the normal form after one pass.
    let normal = archive::encode(&decoded).unwrap();
    let again = archive::decode(&normal).unwrap().unwrap();
    assert_eq!(again, decoded);
    assert_eq!(archive::encode(&again).unwrap(), normal);
}

#[test]
fn test_names_with_the_table_terminator_are_rejected() {
    let archive: Archive = vec![entry("bad/\nname", "x")].into_iter().collect();
    assert!(matches!(
        archive::encode(&archive),
        Err(ArchiveError::InvalidName(_))
    ));
}

#[test]
fn test_from_entries_shadows_by_name() {
    let archive = Archive::from_entries(vec![entry("x", "old"), entry("x", "new"), entry("y", "")]);
    let flags: Vec<bool> = archive.iter().map(|e| e.live).collect();
    assert_eq!(flags, vec![false, true, true]);
    assert_eq!(archive.find_live("x").unwrap().data, b"new");

    let decoded = archive::decode(&archive::encode(&archive).unwrap()).unwrap().unwrap();
    assert_eq!(decoded, archive);
}

#[test]
fn test_encode_rejects_liveness_shadowing_cannot_reproduce() {
    let archive: Archive = vec![entry("x", "a"), entry("y", "b")].into_iter().collect();
    let mut value = serde_json::to_value(&archive).unwrap();
    value["entries"][1]["live"] = serde_json::Value::Bool(false);
    let dead_tail: Archive = serde_json::from_value(value).unwrap();
    assert!(dead_tail.find_live("y").is_none());

    assert_eq!(
        archive::encode(&dead_tail),
        Err(ArchiveError::LivenessConflict("y".to_string()))
    );

    let shadowed: Archive = vec![entry("x", "a"), entry("x", "b")].into_iter().collect();
    let mut value = serde_json::to_value(&shadowed).unwrap();
    value["entries"][0]["live"] = serde_json::Value::Bool(true);
    let both_live: Archive = serde_json::from_value(value).unwrap();
    assert_eq!(
        archive::encode(&both_live),
        Err(ArchiveError::LivenessConflict("x".to_string()))
    );
}
