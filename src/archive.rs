//! Copyright © 2025-2026 Wenze Wei. All Rights Reserved.
//!
//! This file is part of Routec.
//! The Routec project belongs to the Dunimd Team.
//!
//! Licensed under the Apache License, Version 2.0 (the "License");
//! You may not use this file except in compliance with the License.
//! You may obtain a copy of the License at
//!
//!     http://www.apache.org/licenses/LICENSE-2.0
//!
//! Unless required by applicable law or agreed to in writing, software
//! distributed under the License is distributed on an "AS IS" BASIS,
//! WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//! See the License for the specific language governing permissions and
//! limitations under the License.

//! # Archive Codec
//!
//! Reads and writes the `ar` container used to ship a router configuration
//! together with auxiliary named blobs. The primary configuration lives in
//! the member named [`CONFIG_SECTION`].
//!
//! ## Layout
//!
//! ```text
//! !<arch>\n
//! [60-byte header][data][\n if data length is odd]   (repeated)
//! ```
//!
//! Each header holds the name (16 bytes), modification time (12, decimal),
//! owner uid (6), gid (6), mode (8, octal), data size (10) and the
//! terminator `` `\n ``. Names that do not fit the name column go to a GNU
//! `//` long-name table and are referenced as `/offset`. BSD `#1/len` names
//! are accepted on input.
//!
//! ## Liveness
//!
//! The archive is an append-only log. A later member with the same name
//! shadows an earlier one: both are kept (and both are re-encoded), but only
//! the last is live and visible through [`Archive::find_live`].

use std::borrow::Cow;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::ArchiveError;

/// Leading bytes of every archive.
pub const ARCHIVE_MAGIC: &[u8] = b"!<arch>\n";

/// Name of the member holding the primary configuration text.
pub const CONFIG_SECTION: &str = "config";

/// Permission bits given to freshly written members.
pub const DEFAULT_MODE: u32 = 0o644;

const HEADER_LEN: usize = 60;
const HEADER_END: &[u8] = b"`\n";
const LONG_NAME_END: &[u8] = b"/\n";

/// One named blob inside an archive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveEntry {
    pub name: String,
    pub data: Vec<u8>,
    /// Modification time, seconds since the Unix epoch.
    pub timestamp: u64,
    pub uid: u32,
    pub gid: u32,
    pub mode: u32,
    pub live: bool,
}

impl ArchiveEntry {
    /// Entry with zeroed ownership and time, mode `0644`.
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            timestamp: 0,
            uid: 0,
            gid: 0,
            mode: DEFAULT_MODE,
            live: true,
        }
    }

    /// Entry stamped with the current time and the process's effective owner.
    pub fn stamped(name: impl Into<String>, data: impl Into<Vec<u8>>, mode: u32) -> Self {
        let (uid, gid) = process_owner();
        Self {
            timestamp: now_timestamp(),
            uid,
            gid,
            mode,
            ..Self::new(name, data)
        }
    }

    /// Member data as text; invalid UTF-8 is replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

fn now_timestamp() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

#[cfg(unix)]
fn process_owner() -> (u32, u32) {
    // SAFETY: geteuid/getegid have no preconditions and cannot fail.
    let (uid, gid) = unsafe { (libc::geteuid(), libc::getegid()) };
    (uid as u32, gid as u32)
}

#[cfg(not(unix))]
fn process_owner() -> (u32, u32) {
    (0, 0)
}

/// Ordered collection of archive members.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Archive {
    entries: Vec<ArchiveEntry>,
}

impl Archive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps entries in order. Liveness is recomputed: the last entry of
    /// each name is live and earlier ones are shadowed.
    pub fn from_entries(mut entries: Vec<ArchiveEntry>) -> Self {
        shadow_by_name(&mut entries);
        Self { entries }
    }

    /// Name of the first entry whose liveness disagrees with last-of-name
    /// shadowing, if any.
    fn liveness_conflict(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .rev()
            .find(|e| e.live != seen.insert(e.name.as_str()))
            .map(|e| e.name.as_str())
    }

    /// Appends `entry` as the live version of its name. Earlier entries with
    /// the same name stay in the log but are no longer live.
    pub fn push(&mut self, mut entry: ArchiveEntry) {
        for older in self.entries.iter_mut().filter(|e| e.name == entry.name) {
            older.live = false;
        }
        entry.live = true;
        self.entries.push(entry);
    }

    /// Last live entry called `name`.
    pub fn find_live(&self, name: &str) -> Option<&ArchiveEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.live && e.name == name)
    }

    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ArchiveEntry> {
        self.entries.iter()
    }

    pub fn live(&self) -> impl Iterator<Item = &ArchiveEntry> {
        self.entries.iter().filter(|e| e.live)
    }

    /// Whether any live entry has a name other than `name`.
    pub fn has_live_except(&self, name: &str) -> bool {
        self.live().any(|e| e.name != name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<ArchiveEntry> {
        self.entries
    }
}

impl FromIterator<ArchiveEntry> for Archive {
    fn from_iter<I: IntoIterator<Item = ArchiveEntry>>(iter: I) -> Self {
        let mut archive = Archive::new();
        for entry in iter {
            archive.push(entry);
        }
        archive
    }
}

impl<'a> IntoIterator for &'a Archive {
    type Item = &'a ArchiveEntry;
    type IntoIter = std::slice::Iter<'a, ArchiveEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Whether `bytes` should be attempted as an archive at all.
pub fn is_archive(bytes: &[u8]) -> bool {
    bytes.first() == Some(&b'!')
}

/// Decodes an archive. `Ok(None)` means the input is not an archive and
/// should be treated as plain configuration text.
pub fn decode(bytes: &[u8]) -> Result<Option<Archive>, ArchiveError> {
    if !is_archive(bytes) {
        return Ok(None);
    }
    if !bytes.starts_with(ARCHIVE_MAGIC) {
        return Err(ArchiveError::BadMagic);
    }

    let mut entries = Vec::new();
    let mut long_names: Option<&[u8]> = None;
    let mut pos = ARCHIVE_MAGIC.len();

    while pos < bytes.len() {
        let offset = pos;
        let header = bytes.get(pos..pos + HEADER_LEN).ok_or_else(|| {
            ArchiveError::Truncated(format!("incomplete member header at byte {}", offset))
        })?;
        if &header[58..60] != HEADER_END {
            return Err(bad_header(offset, "missing header terminator"));
        }

        let raw_name = trim_trailing_spaces(&header[0..16]);
        let timestamp = parse_field(&header[16..28], 10, offset, "timestamp")?;
        let uid = narrow(parse_field(&header[28..34], 10, offset, "uid")?, offset, "uid")?;
        let gid = narrow(parse_field(&header[34..40], 10, offset, "gid")?, offset, "gid")?;
        let mode = narrow(parse_field(&header[40..48], 8, offset, "mode")?, offset, "mode")?;
        let size = parse_field(&header[48..58], 10, offset, "size")? as usize;

        let start = pos + HEADER_LEN;
        let mut data = bytes.get(start..start.saturating_add(size)).ok_or_else(|| {
            ArchiveError::Truncated(format!(
                "member at byte {} declares {} bytes but only {} remain",
                offset,
                size,
                bytes.len() - start
            ))
        })?;
        pos = start + size;
        if size % 2 == 1 && bytes.get(pos) == Some(&b'\n') {
            pos += 1;
        }

        let name = match raw_name {
            b"//" => {
                long_names = Some(data);
                continue;
            }
            b"/" | b"/SYM64/" => continue,
            _ if raw_name.starts_with(b"#1/") => {
                let len = parse_field(&raw_name[3..], 10, offset, "name length")? as usize;
                if len > data.len() {
                    return Err(bad_header(offset, "name longer than member data"));
                }
                let (name, rest) = data.split_at(len);
                data = rest;
                let name = name.split(|&b| b == 0).next().unwrap_or_default();
                String::from_utf8_lossy(name).into_owned()
            }
            _ if is_long_name_ref(raw_name) => {
                let table = long_names
                    .ok_or_else(|| bad_header(offset, "long name without a name table"))?;
                let at = parse_field(&raw_name[1..], 10, offset, "name offset")? as usize;
                let tail = table
                    .get(at..)
                    .ok_or_else(|| bad_header(offset, "long name offset out of range"))?;
                let end = find(tail, LONG_NAME_END)
                    .or_else(|| tail.iter().position(|&b| b == b'\n'))
                    .unwrap_or(tail.len());
                String::from_utf8_lossy(&tail[..end]).into_owned()
            }
            _ => {
                let name = raw_name.strip_suffix(b"/").unwrap_or(raw_name);
                String::from_utf8_lossy(name).into_owned()
            }
        };

        entries.push(ArchiveEntry {
            name,
            data: data.to_vec(),
            timestamp,
            uid,
            gid,
            mode,
            live: true,
        });
    }

    shadow_by_name(&mut entries);

    log::debug!("decoded archive with {} member(s)", entries.len());
    Ok(Some(Archive { entries }))
}

fn shadow_by_name(entries: &mut [ArchiveEntry]) {
    let mut seen = HashSet::new();
    for entry in entries.iter_mut().rev() {
        entry.live = seen.insert(entry.name.clone());
    }
}

/// Encodes every entry, live or not, in order. The stream carries no
/// liveness flags: an archive whose flags differ from last-of-name
/// shadowing fails with [`ArchiveError::LivenessConflict`].
pub fn encode(archive: &Archive) -> Result<Vec<u8>, ArchiveError> {
    if let Some(name) = archive.liveness_conflict() {
        return Err(ArchiveError::LivenessConflict(name.to_string()));
    }
    let mut table = Vec::new();
    let mut name_fields = Vec::with_capacity(archive.len());
    for entry in archive {
        if find(entry.name.as_bytes(), LONG_NAME_END).is_some() {
            return Err(ArchiveError::InvalidName(entry.name.clone()));
        }
        if needs_long_name(&entry.name) {
            name_fields.push(format!("/{}", table.len()));
            table.extend_from_slice(entry.name.as_bytes());
            table.extend_from_slice(LONG_NAME_END);
        } else {
            name_fields.push(format!("{}/", entry.name));
        }
    }

    let mut out = ARCHIVE_MAGIC.to_vec();
    if !table.is_empty() {
        let header = HeaderFields {
            name: "//",
            timestamp: None,
            uid: None,
            gid: None,
            mode: None,
            size: table.len(),
        };
        header.write(&mut out, "//")?;
        push_data(&mut out, &table);
    }

    for (entry, name_field) in archive.iter().zip(&name_fields) {
        let header = HeaderFields {
            name: name_field,
            timestamp: Some(entry.timestamp.to_string()),
            uid: Some(entry.uid.to_string()),
            gid: Some(entry.gid.to_string()),
            mode: Some(format!("{:o}", entry.mode)),
            size: entry.data.len(),
        };
        header.write(&mut out, &entry.name)?;
        push_data(&mut out, &entry.data);
    }

    Ok(out)
}

struct HeaderFields<'a> {
    name: &'a str,
    timestamp: Option<String>,
    uid: Option<String>,
    gid: Option<String>,
    mode: Option<String>,
    size: usize,
}

impl HeaderFields<'_> {
    fn write(&self, out: &mut Vec<u8>, member: &str) -> Result<(), ArchiveError> {
        let size = self.size.to_string();
        let columns: [(&str, Option<&str>, usize, u32); 5] = [
            ("timestamp", self.timestamp.as_deref(), 12, 10),
            ("uid", self.uid.as_deref(), 6, 10),
            ("gid", self.gid.as_deref(), 6, 10),
            ("mode", self.mode.as_deref(), 8, 8),
            ("size", Some(size.as_str()), 10, 10),
        ];

        let start = out.len();
        push_padded(out, self.name.as_bytes(), 16);
        for (field, text, width, radix) in columns {
            let text = text.unwrap_or("");
            if text.len() > width {
                return Err(ArchiveError::FieldOverflow {
                    name: member.to_string(),
                    field: field.to_string(),
                    value: u64::from_str_radix(text, radix).unwrap_or(u64::MAX),
                });
            }
            push_padded(out, text.as_bytes(), width);
        }
        out.extend_from_slice(HEADER_END);
        debug_assert_eq!(out.len() - start, HEADER_LEN);
        Ok(())
    }
}

fn push_padded(out: &mut Vec<u8>, bytes: &[u8], width: usize) {
    out.extend_from_slice(bytes);
    out.resize(out.len() + width.saturating_sub(bytes.len()), b' ');
}

fn push_data(out: &mut Vec<u8>, data: &[u8]) {
    out.extend_from_slice(data);
    if data.len() % 2 == 1 {
        out.push(b'\n');
    }
}

fn needs_long_name(name: &str) -> bool {
    name.is_empty() || name.len() > 15 || name.contains('/') || name.ends_with(' ')
}

fn is_long_name_ref(raw: &[u8]) -> bool {
    raw.len() > 1 && raw[0] == b'/' && raw[1..].iter().all(u8::is_ascii_digit)
}

fn trim_trailing_spaces(field: &[u8]) -> &[u8] {
    let end = field
        .iter()
        .rposition(|&b| b != b' ')
        .map_or(0, |i| i + 1);
    &field[..end]
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn parse_field(field: &[u8], radix: u32, offset: usize, what: &str) -> Result<u64, ArchiveError> {
    let text = std::str::from_utf8(field)
        .map_err(|_| bad_header(offset, format!("non-text {} field", what)))?
        .trim();
    if text.is_empty() {
        return Ok(0);
    }
    u64::from_str_radix(text, radix)
        .map_err(|_| bad_header(offset, format!("bad {} field {:?}", what, text)))
}

fn narrow(value: u64, offset: usize, what: &str) -> Result<u32, ArchiveError> {
    u32::try_from(value).map_err(|_| bad_header(offset, format!("{} {} out of range", what, value)))
}

fn bad_header(offset: usize, message: impl Into<String>) -> ArchiveError {
    ArchiveError::BadHeader {
        offset,
        message: message.into(),
    }
}
