// Copyright (c) The cargo-guppy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The "frob" persisted-index codec: fixed little-endian lengths,
//! length-prefixed strings, deterministic element order, no external
//! binary-serialization crate -- forward compatibility across format
//! versions is not guaranteed, and the format needs exact control over
//! byte layout.
//!
//! `MethodSetIndex` blob: `{Strings[], MethodSets[]}`.
//! `TestIndex` blob: `{Files[{Tests[{URI, Range, Name}]}]}`.

use methodset::{Method, MethodSet, MethodSetIndex};
use testindex::{FileTests, TestEntry, TestIndex};
use wscore::{FileIdx, Fingerprint, Interner, Position, StringIdx};

use crate::errors::Error;

/// Bumped whenever the wire layout changes; readers reject anything
/// else rather than attempt a best-effort decode (spec §6: "readers
/// reject mismatched versions").
const FORMAT_VERSION: u32 = 1;

fn write_u32(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_u64(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

fn write_bool(buf: &mut Vec<u8>, v: bool) {
    buf.push(u8::from(v));
}

fn write_str(buf: &mut Vec<u8>, s: &str) {
    write_u32(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

fn write_position(buf: &mut Vec<u8>, position: Position) {
    write_u32(buf, position.file.0);
    write_u32(buf, position.offset);
    write_u32(buf, position.len);
}

fn write_option_string_idx(buf: &mut Vec<u8>, idx: Option<StringIdx>) {
    match idx {
        Some(idx) => {
            write_bool(buf, true);
            write_u32(buf, idx.index() as u32);
        }
        None => write_bool(buf, false),
    }
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        let end = self.pos.checked_add(n).ok_or_else(|| Error::Bug("index length overflow".into()))?;
        let slice = self
            .buf
            .get(self.pos..end)
            .ok_or_else(|| Error::Bug("truncated persisted index".into()))?;
        self.pos = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_u64(&mut self) -> Result<u64, Error> {
        let bytes = self.take(8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn read_bool(&mut self) -> Result<bool, Error> {
        Ok(self.take(1)?[0] != 0)
    }

    fn read_str(&mut self) -> Result<String, Error> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|e| Error::Bug(format!("non-UTF-8 string in index: {e}")))
    }

    fn read_position(&mut self) -> Result<Position, Error> {
        let file = FileIdx(self.read_u32()?);
        let offset = self.read_u32()?;
        let len = self.read_u32()?;
        Ok(Position::new(file, offset, len))
    }

    fn read_option_string_idx(&mut self) -> Result<Option<StringIdx>, Error> {
        if self.read_bool()? {
            Ok(Some(StringIdx::from_raw(self.read_u32()?)))
        } else {
            Ok(None)
        }
    }
}

fn check_version(reader: &mut Reader<'_>) -> Result<(), Error> {
    let version = reader.read_u32()?;
    if version != FORMAT_VERSION {
        return Err(Error::Bug(format!(
            "unsupported persisted index version {version} (expected {FORMAT_VERSION})"
        )));
    }
    Ok(())
}

pub fn encode_method_set_index(index: &MethodSetIndex) -> Vec<u8> {
    let mut buf = Vec::new();
    write_u32(&mut buf, FORMAT_VERSION);

    let strings: Vec<&str> = index.strings.iter().collect();
    write_u32(&mut buf, strings.len() as u32);
    for s in strings {
        write_str(&mut buf, s);
    }

    write_u32(&mut buf, index.method_sets.len() as u32);
    for mset in &index.method_sets {
        write_position(&mut buf, mset.position);
        write_bool(&mut buf, mset.is_interface);
        write_bool(&mut buf, mset.tricky);
        write_u64(&mut buf, mset.mask);
        write_u32(&mut buf, mset.methods.len() as u32);
        for m in &mset.methods {
            write_str(&mut buf, &m.id);
            write_str(&mut buf, &m.fingerprint);
            write_u32(&mut buf, m.sum);
            write_bool(&mut buf, m.tricky);
            write_position(&mut buf, m.position);
            write_option_string_idx(&mut buf, m.pkg_path_idx);
            write_option_string_idx(&mut buf, m.object_path_idx);
        }
    }
    buf
}

pub fn decode_method_set_index(bytes: &[u8]) -> Result<MethodSetIndex, Error> {
    let mut reader = Reader::new(bytes);
    check_version(&mut reader)?;

    let string_count = reader.read_u32()? as usize;
    let mut strings = Vec::with_capacity(string_count);
    for _ in 0..string_count {
        strings.push(reader.read_str()?.into_boxed_str());
    }
    let interner = Interner::from_ordered(strings);

    let method_set_count = reader.read_u32()? as usize;
    let mut method_sets = Vec::with_capacity(method_set_count);
    for _ in 0..method_set_count {
        let position = reader.read_position()?;
        let is_interface = reader.read_bool()?;
        let _tricky = reader.read_bool()?;
        let _mask = reader.read_u64()?;
        let method_count = reader.read_u32()? as usize;
        let mut methods = Vec::with_capacity(method_count);
        for _ in 0..method_count {
            let id = reader.read_str()?;
            let fingerprint_text = reader.read_str()?;
            let sum = reader.read_u32()?;
            let tricky = reader.read_bool()?;
            let method_position = reader.read_position()?;
            let pkg_path_idx = reader.read_option_string_idx()?;
            let object_path_idx = reader.read_option_string_idx()?;
            methods.push(Method {
                id,
                fingerprint: fingerprint_text,
                sum,
                tricky,
                position: method_position,
                pkg_path_idx,
                object_path_idx,
            });
        }
        // `MethodSet::new` recomputes mask/tricky from the decoded
        // methods rather than trusting the persisted scalars, so a
        // hand-edited or corrupted blob can't desynchronize them from
        // the method list it carries.
        method_sets.push(MethodSet::new(position, is_interface, methods));
    }

    Ok(MethodSetIndex {
        strings: interner,
        method_sets,
    })
}

pub fn encode_test_index(index: &TestIndex) -> Vec<u8> {
    let mut buf = Vec::new();
    write_u32(&mut buf, FORMAT_VERSION);
    write_u32(&mut buf, index.files.len() as u32);
    for file in &index.files {
        write_str(&mut buf, &file.uri);
        write_u32(&mut buf, file.tests.len() as u32);
        for test in &file.tests {
            write_position(&mut buf, test.location);
            write_str(&mut buf, &test.name);
        }
    }
    buf
}

pub fn decode_test_index(bytes: &[u8]) -> Result<TestIndex, Error> {
    let mut reader = Reader::new(bytes);
    check_version(&mut reader)?;

    let file_count = reader.read_u32()? as usize;
    let mut files = Vec::with_capacity(file_count);
    for _ in 0..file_count {
        let uri = reader.read_str()?;
        let test_count = reader.read_u32()? as usize;
        let mut tests = Vec::with_capacity(test_count);
        for _ in 0..test_count {
            let location = reader.read_position()?;
            let name = reader.read_str()?;
            tests.push(TestEntry { location, name });
        }
        files.push(FileTests { uri, tests });
    }
    Ok(TestIndex { files })
}
