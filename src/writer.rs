//! PDF document writer.
//!
//! Serializes the object graph in object-number order, capturing each
//! object's start position into its reference, then emits either a
//! classic `xref` table + `trailer` or a cross-reference stream with
//! packed object streams, and closes with `startxref` / `%%EOF`.
//!
//! Signed documents are passed through byte-exact; unflattened chains
//! are saved as another incremental update over the imported bytes.

use std::io::Write;
use std::sync::Mutex;

use byteorder::{BigEndian, WriteBytesExt};
use chrono::Local;
use log::debug;
use md5::{Digest, Md5};

use crate::document::{Document, OpenMode, Version};
use crate::error::{Error, Result};
use crate::filters;
use crate::object::{Dictionary, HexString, Object, ObjectId, Stream, StringEncoding};
use crate::object_stream::{is_compressible, ObjectStreamBuilder};
use crate::security::SecurityHandler;
use crate::trailer::{
    CrossReferenceStream, CrossReferenceStreamEntry, TrailerKind, XrefEntryType,
};

/// Spelling of the emitted cross-reference section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XrefStyle {
    /// Match the spelling the file came in with
    #[default]
    Auto,
    /// Classic `xref` table + `trailer`
    Classic,
    /// PDF 1.5 cross-reference stream
    Stream,
}

/// Options for [`Document::save_with`].
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Cross-reference section spelling
    pub xref_style: XrefStyle,
    /// Pack compressible objects into object streams (stream style only)
    pub pack_object_streams: bool,
    /// FlateDecode unfiltered stream payloads on the way out
    pub compress_streams: bool,
    /// Renumber 1..N before writing (flattened documents only)
    pub renumber: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            xref_style: XrefStyle::Auto,
            pack_object_streams: true,
            compress_streams: false,
            renumber: false,
        }
    }
}

/// Serializer for PDF values.
///
/// Dictionary keys are written in insertion order; hex strings keep
/// the digit case they were read with.
pub struct ObjectSerializer;

impl ObjectSerializer {
    /// Serialize a value to bytes.
    pub fn serialize(value: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        // Writing to a Vec cannot fail.
        Self::write_value(&mut buf, value).expect("in-memory write");
        buf
    }

    /// Serialize an `n g obj … endobj` wrapper.
    pub fn serialize_indirect(id: ObjectId, value: &Object) -> Vec<u8> {
        let mut buf = Vec::new();
        write!(buf, "{} {} obj\n", id.number, id.generation).expect("in-memory write");
        Self::write_value(&mut buf, value).expect("in-memory write");
        buf.extend_from_slice(b"\nendobj\n");
        buf
    }

    fn write_value<W: Write>(w: &mut W, value: &Object) -> std::io::Result<()> {
        match value {
            Object::Null => write!(w, "null"),
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" }),
            Object::Integer(i) => write!(w, "{}", i),
            Object::UInteger(u) => write!(w, "{}", u),
            Object::Real(r) => Self::write_real(w, *r),
            Object::Name(n) => Self::write_name(w, n),
            Object::String(s, _) => Self::write_literal_string(w, s),
            Object::HexString(h) => Self::write_hex_string(w, h),
            Object::Array(items) => Self::write_array(w, items),
            Object::Dictionary(dict) => Self::write_dictionary(w, dict),
            Object::Stream(stream) => Self::write_stream(w, stream),
            Object::Reference(id) => write!(w, "{} {} R", id.number, id.generation),
        }
    }

    fn write_real<W: Write>(w: &mut W, value: f64) -> std::io::Result<()> {
        if value.fract() == 0.0 && value.abs() < 1e15 {
            write!(w, "{}", value as i64)
        } else {
            let formatted = format!("{:.5}", value);
            write!(w, "{}", formatted.trim_end_matches('0').trim_end_matches('.'))
        }
    }

    /// Names escape delimiter and non-regular bytes as `#XX`.
    fn write_name<W: Write>(w: &mut W, name: &str) -> std::io::Result<()> {
        write!(w, "/")?;
        for byte in name.bytes() {
            let regular = (0x21..=0x7E).contains(&byte)
                && !matches!(
                    byte,
                    b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
                );
            if regular {
                w.write_all(&[byte])?;
            } else {
                write!(w, "#{:02X}", byte)?;
            }
        }
        Ok(())
    }

    /// Literal strings escape the structural characters and spell
    /// non-printable bytes in octal, which round-trips binary content.
    fn write_literal_string<W: Write>(w: &mut W, data: &[u8]) -> std::io::Result<()> {
        write!(w, "(")?;
        for &byte in data {
            match byte {
                b'(' => write!(w, "\\(")?,
                b')' => write!(w, "\\)")?,
                b'\\' => write!(w, "\\\\")?,
                b'\n' => write!(w, "\\n")?,
                b'\r' => write!(w, "\\r")?,
                b'\t' => write!(w, "\\t")?,
                0x08 => write!(w, "\\b")?,
                0x0C => write!(w, "\\f")?,
                0x20..=0x7E => w.write_all(&[byte])?,
                other => write!(w, "\\{:03o}", other)?,
            }
        }
        write!(w, ")")
    }

    fn write_hex_string<W: Write>(w: &mut W, hex: &HexString) -> std::io::Result<()> {
        write!(w, "<")?;
        for byte in &hex.data {
            if hex.uppercase {
                write!(w, "{:02X}", byte)?;
            } else {
                write!(w, "{:02x}", byte)?;
            }
        }
        write!(w, ">")
    }

    fn write_array<W: Write>(w: &mut W, items: &[Object]) -> std::io::Result<()> {
        write!(w, "[")?;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(w, " ")?;
            }
            Self::write_value(w, item)?;
        }
        write!(w, "]")
    }

    fn write_dictionary<W: Write>(w: &mut W, dict: &Dictionary) -> std::io::Result<()> {
        write!(w, "<<")?;
        for (key, value) in dict.iter() {
            write!(w, " ")?;
            Self::write_name(w, key)?;
            write!(w, " ")?;
            Self::write_value(w, value)?;
        }
        write!(w, " >>")
    }

    fn write_stream<W: Write>(w: &mut W, stream: &Stream) -> std::io::Result<()> {
        Self::write_dictionary(w, &stream.dict)?;
        write!(w, "\nstream\n")?;
        w.write_all(stream.data())?;
        write!(w, "\nendstream")
    }
}

/// Entry point behind `Document::save_with`.
pub(crate) fn write_document(
    document: &mut Document,
    sink: &mut dyn Write,
    options: &SaveOptions,
) -> Result<()> {
    if document.has_signature() {
        // Byte-exact preservation over the signed span; the imported
        // bytes are returned verbatim.
        let original = document
            .original_bytes()
            .cloned()
            .ok_or(Error::ReadOnly)?;
        sink.write_all(&original)?;
        return Ok(());
    }

    prepare_for_save(document, options)?;
    if options.renumber {
        document.renumber()?;
    }

    let handler = document.take_security_handler();
    let result = if !document.is_flattened()
        && document.trailer_count() > 1
        && document.original_bytes().is_some()
    {
        write_incremental(document, sink, handler.as_deref())
    } else {
        write_full(document, sink, options, handler.as_deref())
    };
    document.restore_security_handler(handler);
    result
}

/// Walk all indirect objects before positions are assigned so byte
/// content can materialize (`/Length` updates, optional compression).
fn prepare_for_save(document: &mut Document, options: &SaveOptions) -> Result<()> {
    for id in document.latest_references() {
        let reference = match document.lookup_reference_mut(id) {
            Some(r) => r,
            None => continue,
        };
        if let Some(Object::Stream(stream)) = reference.value_mut() {
            if options.compress_streams && !stream.is_filtered() {
                stream.zip()?;
            }
        }
    }
    if document.open_mode() == OpenMode::Modify {
        stamp_modify(document)?;
    }
    Ok(())
}

/// Modify-mode bookkeeping: regenerate the second `/ID` half and stamp
/// `/ModDate` in the info dictionary.
fn stamp_modify(document: &mut Document) -> Result<()> {
    let stamp = Local::now().format("D:%Y%m%d%H%M%S").to_string();

    let mut hasher = Md5::new();
    hasher.update(stamp.as_bytes());
    if let Some(original) = document.original_bytes() {
        hasher.update(&original[..original.len().min(1024)]);
    }
    hasher.update(document.max_object_number().to_be_bytes());
    let digest = hasher.finalize();
    let fresh = Object::HexString(HexString {
        data: digest.to_vec(),
        encoding: StringEncoding::Raw,
        uppercase: true,
    });

    let trailer = document.trailer_mut();
    let first = trailer
        .dict
        .get_array("ID")
        .ok()
        .flatten()
        .and_then(|a| a.first().cloned())
        .unwrap_or_else(|| fresh.clone());
    trailer.dict.set("ID", Object::Array(vec![first, fresh]));

    let info_id = trailer.dict.get_reference("Info").ok().flatten();
    if let Some(info_id) = info_id {
        if let Some(Object::Dictionary(info)) = document.resolve(info_id).cloned() {
            let mut info = info;
            info.set(
                "ModDate",
                Object::String(stamp.into_bytes(), StringEncoding::Raw),
            );
            document.set_object(info_id, Object::Dictionary(info))?;
        }
    }
    Ok(())
}

/// Whether a value is a cross-reference stream or object-stream
/// container carried over from the imported file. Those are rebuilt by
/// the writer; copying them would duplicate their content.
fn is_regenerated_container(value: &Object) -> bool {
    value
        .as_stream()
        .and_then(|s| s.dict.type_of())
        .map_or(false, |t| t == "XRef" || t == "ObjStm")
}

/// Position-capture pass: measure each object's serialization and store
/// its start offset into its reference, without emitting anything.
///
/// Runs ahead of the whole-document encrypt hook so the handler sees
/// every object positioned. The emission loop re-captures offsets, so
/// the cross-reference stays exact even when the transform changes
/// body lengths.
fn assign_positions(document: &mut Document, ids: &[ObjectId], start: u64) {
    let mut cursor = start;
    for id in ids {
        let body = match document.resolve(*id) {
            Some(value) => value.clone(),
            None => Object::Null,
        };
        if is_regenerated_container(&body) {
            continue;
        }
        let length = ObjectSerializer::serialize_indirect(*id, &body).len() as u64;
        if let Some(reference) = document.lookup_reference_mut(*id) {
            reference.position = cursor;
            reference.containing_stream = None;
        }
        cursor += length;
    }
}

fn effective_style(document: &Document, options: &SaveOptions) -> XrefStyle {
    match options.xref_style {
        XrefStyle::Auto => {
            if document.trailer().is_xref_stream() {
                XrefStyle::Stream
            } else {
                XrefStyle::Classic
            }
        }
        other => other,
    }
}

#[derive(Default)]
struct PackerState {
    builders: Vec<ObjectStreamBuilder>,
}

/// Allocates the viable object stream and routes members into it.
///
/// The lock mirrors the builder-level one: shared-document programmatic
/// construction must not race the lazy allocation.
struct StreamPacker {
    state: Mutex<PackerState>,
}

impl StreamPacker {
    fn new() -> Self {
        Self {
            state: Mutex::new(PackerState::default()),
        }
    }

    /// Append a serialized member to the viable stream, opening a new
    /// one at capacity. `/Extends` chains every later stream back to
    /// the first, keeping one root per chain.
    fn append(
        &self,
        alloc: &mut dyn FnMut() -> u32,
        member_number: u32,
        serialized: &[u8],
    ) -> (u32, u16) {
        let mut state = self.state.lock().expect("packer lock");
        let needs_new = state.builders.last().map_or(true, ObjectStreamBuilder::is_full);
        if needs_new {
            let extends = state
                .builders
                .last()
                .map(|prev| prev.extends().unwrap_or(ObjectId::new(prev.number(), 0)));
            state.builders.push(ObjectStreamBuilder::new(alloc(), extends));
        }
        let builder = state.builders.last().expect("viable stream present");
        let index = builder.append(member_number, serialized);
        (builder.number(), index)
    }

    fn into_builders(self) -> Vec<ObjectStreamBuilder> {
        self.state.into_inner().expect("packer lock").builders
    }
}

/// Full rewrite: header, bodies, cross-reference section, tail.
fn write_full(
    document: &mut Document,
    sink: &mut dyn Write,
    options: &SaveOptions,
    handler: Option<&dyn SecurityHandler>,
) -> Result<()> {
    let style = effective_style(document, options);
    if style == XrefStyle::Stream && (document.version.major, document.version.minor) < (1, 5) {
        document.version = Version::V1_5;
    }

    let mut out: Vec<u8> = Vec::new();
    write_header(&mut out, document)?;

    let ids = document.latest_references();
    if let Some(handler) = handler {
        // The encrypt hook runs once, after all objects are positioned
        // and before any body is written.
        assign_positions(document, &ids, out.len() as u64);
        handler.encrypt_document(document)?;
    }
    // Strings inside object streams are not individually encrypted, so
    // an encrypted save keeps every object in a type-1 entry.
    let pack =
        style == XrefStyle::Stream && options.pack_object_streams && handler.is_none();
    let encrypt_id = document
        .trailer()
        .dict
        .get_reference("Encrypt")
        .ok()
        .flatten();

    let mut next_number = document.max_object_number();
    let mut alloc = || {
        next_number += 1;
        next_number
    };
    let packer = StreamPacker::new();
    let mut in_file: Vec<(ObjectId, u64)> = Vec::new();
    let mut in_stream: Vec<(ObjectId, u32, u16)> = Vec::new();

    for id in &ids {
        let body = document.resolve(*id).cloned().unwrap_or(Object::Null);
        // Imported cross-reference streams and object-stream containers
        // are regenerated, not copied.
        if is_regenerated_container(&body) {
            continue;
        }
        // The encrypt dictionary stays out of object streams.
        let packable =
            pack && is_compressible(*id, &body) && Some(*id) != encrypt_id;
        if packable {
            let serialized = ObjectSerializer::serialize(&body);
            let (container, index) = packer.append(&mut alloc, id.number, &serialized);
            in_stream.push((*id, container, index));
            if let Some(reference) = document.lookup_reference_mut(*id) {
                reference.position = 0;
                reference.containing_stream = Some(crate::xref::CompressedLocation {
                    stream_number: container,
                    index,
                });
            }
        } else {
            let position = out.len() as u64;
            out.extend_from_slice(&ObjectSerializer::serialize_indirect(*id, &body));
            in_file.push((*id, position));
            if let Some(reference) = document.lookup_reference_mut(*id) {
                reference.position = position;
                reference.containing_stream = None;
            }
        }
    }

    // Containers are positioned after their members.
    for builder in packer.into_builders() {
        let id = ObjectId::new(builder.number(), 0);
        let stream = builder.into_stream();
        let position = out.len() as u64;
        out.extend_from_slice(&ObjectSerializer::serialize_indirect(
            id,
            &Object::Stream(stream),
        ));
        in_file.push((id, position));
    }

    match style {
        XrefStyle::Classic | XrefStyle::Auto => {
            let xref_position = out.len() as u64;
            write_classic_xref(&mut out, &in_file)?;

            let mut dict = document.trailer().dict.clone();
            dict.remove("Prev");
            // Stream-form bookkeeping has no place in a classic trailer.
            for key in ["Type", "W", "Index", "XRefStm"] {
                dict.remove(key);
            }
            dict.set(
                "Size",
                Object::from_i64(i64::from(document.max_object_number()) + 1),
            );
            out.extend_from_slice(b"trailer\n");
            out.extend_from_slice(&ObjectSerializer::serialize(&Object::Dictionary(
                dict.clone(),
            )));
            write!(out, "\nstartxref\n{}\n%%EOF\n", xref_position)?;
            document.trailer_mut().dict = dict;
        }
        XrefStyle::Stream => {
            let stream_number = alloc();
            let xref_position = out.len() as u64;

            let mut entries: Vec<CrossReferenceStreamEntry> = Vec::new();
            for (id, position) in &in_file {
                entries.push(CrossReferenceStreamEntry {
                    entry_type: XrefEntryType::InFile,
                    field2: *position,
                    field3: u32::from(id.generation),
                    object_number: id.number,
                });
            }
            for (id, container, index) in &in_stream {
                entries.push(CrossReferenceStreamEntry {
                    entry_type: XrefEntryType::InStream,
                    field2: u64::from(*container),
                    field3: u32::from(*index),
                    object_number: id.number,
                });
            }
            entries.push(CrossReferenceStreamEntry {
                entry_type: XrefEntryType::InFile,
                field2: xref_position,
                field3: 0,
                object_number: stream_number,
            });

            let prev_widths = match &document.trailer().kind {
                TrailerKind::Stream(stream) => Some(stream.widths),
                TrailerKind::Classic => None,
            };
            let (stream, state) = build_xref_stream(
                entries,
                &document.trailer().dict,
                prev_widths,
                stream_number + 1,
                None,
            )?;
            out.extend_from_slice(&ObjectSerializer::serialize_indirect(
                ObjectId::new(stream_number, 0),
                &Object::Stream(stream),
            ));
            write!(out, "startxref\n{}\n%%EOF\n", xref_position)?;
            document.trailer_mut().kind = TrailerKind::Stream(state);
        }
    }

    sink.write_all(&out)?;
    Ok(())
}

/// Incremental update: imported bytes, then the working generation's
/// objects and a cross-reference section chained via `/Prev`.
fn write_incremental(
    document: &mut Document,
    sink: &mut dyn Write,
    handler: Option<&dyn SecurityHandler>,
) -> Result<()> {
    let original = document
        .original_bytes()
        .cloned()
        .ok_or(Error::ReadOnly)?;
    let mut out: Vec<u8> = original.to_vec();
    if out.last() != Some(&b'\n') {
        out.push(b'\n');
    }
    debug!(
        "incremental update over {} imported bytes",
        original.len()
    );

    let ids = document.trailer().xref_table.all_references();
    if let Some(handler) = handler {
        assign_positions(document, &ids, out.len() as u64);
        handler.encrypt_document(document)?;
    }
    let mut in_file: Vec<(ObjectId, u64)> = Vec::new();
    for id in &ids {
        let body = document.resolve(*id).cloned().unwrap_or(Object::Null);
        if is_regenerated_container(&body) {
            continue;
        }
        let position = out.len() as u64;
        out.extend_from_slice(&ObjectSerializer::serialize_indirect(*id, &body));
        in_file.push((*id, position));
        if let Some(reference) = document.lookup_reference_mut(*id) {
            reference.position = position;
            reference.containing_stream = None;
        }
    }

    let prev = document.imported_startxref();
    let size = i64::from(document.max_object_number()) + 1;
    let mut dict = document.trailer().dict.clone();
    if !dict.contains("Root") {
        if let Ok(root) = document.catalog() {
            dict.set("Root", Object::Reference(root));
        }
    }
    dict.set("Size", Object::from_i64(size));
    dict.set("Prev", Object::from_i64(prev as i64));

    if document.trailer().is_xref_stream() {
        let stream_number = document.max_object_number() + 1;
        let xref_position = out.len() as u64;
        let mut entries: Vec<CrossReferenceStreamEntry> = in_file
            .iter()
            .map(|(id, position)| CrossReferenceStreamEntry {
                entry_type: XrefEntryType::InFile,
                field2: *position,
                field3: u32::from(id.generation),
                object_number: id.number,
            })
            .collect();
        entries.push(CrossReferenceStreamEntry {
            entry_type: XrefEntryType::InFile,
            field2: xref_position,
            field3: 0,
            object_number: stream_number,
        });
        let prev_widths = match &document.trailer().kind {
            TrailerKind::Stream(stream) => Some(stream.widths),
            TrailerKind::Classic => None,
        };
        let (stream, state) =
            build_xref_stream(entries, &dict, prev_widths, stream_number + 1, Some(prev))?;
        out.extend_from_slice(&ObjectSerializer::serialize_indirect(
            ObjectId::new(stream_number, 0),
            &Object::Stream(stream),
        ));
        write!(out, "startxref\n{}\n%%EOF\n", xref_position)?;
        document.trailer_mut().kind = TrailerKind::Stream(state);
    } else {
        let xref_position = out.len() as u64;
        write_classic_update_xref(&mut out, &in_file)?;
        out.extend_from_slice(b"trailer\n");
        out.extend_from_slice(&ObjectSerializer::serialize(&Object::Dictionary(dict)));
        write!(out, "\nstartxref\n{}\n%%EOF\n", xref_position)?;
    }

    sink.write_all(&out)?;
    Ok(())
}

fn write_header(out: &mut Vec<u8>, document: &Document) -> Result<()> {
    write!(out, "%PDF-{}\n", document.version)?;
    let mark = document.binary_mark.unwrap_or([0xE2, 0xE3, 0xCF, 0xD3]);
    out.push(b'%');
    out.extend_from_slice(&mark);
    out.push(b'\n');
    Ok(())
}

/// Classic table: the free-list head in its own subsection, then the
/// in-use entries grouped by contiguous object numbers so gaps stay
/// observable.
fn write_classic_xref(out: &mut Vec<u8>, in_file: &[(ObjectId, u64)]) -> Result<()> {
    let mut entries: Vec<(ObjectId, u64)> = in_file.to_vec();
    entries.sort_by_key(|(id, _)| id.number);

    out.extend_from_slice(b"xref\n");
    out.extend_from_slice(b"0 1\n");
    out.extend_from_slice(b"0000000000 65535 f\r\n");
    for group in contiguous_groups(&entries) {
        write!(out, "{} {}\n", group[0].0.number, group.len())?;
        for (id, position) in group {
            write!(out, "{:010} {:05} n\r\n", position, id.generation)?;
        }
    }
    Ok(())
}

/// Update-section table: no free head, just the changed entries.
fn write_classic_update_xref(out: &mut Vec<u8>, in_file: &[(ObjectId, u64)]) -> Result<()> {
    let mut entries: Vec<(ObjectId, u64)> = in_file.to_vec();
    entries.sort_by_key(|(id, _)| id.number);
    out.extend_from_slice(b"xref\n");
    for group in contiguous_groups(&entries) {
        write!(out, "{} {}\n", group[0].0.number, group.len())?;
        for (id, position) in group {
            write!(out, "{:010} {:05} n\r\n", position, id.generation)?;
        }
    }
    Ok(())
}

/// Split number-sorted entries into runs of consecutive numbers.
fn contiguous_groups(entries: &[(ObjectId, u64)]) -> Vec<&[(ObjectId, u64)]> {
    let mut groups = Vec::new();
    let mut start = 0;
    for i in 1..=entries.len() {
        let split = i == entries.len()
            || entries[i].0.number != entries[i - 1].0.number + 1;
        if split {
            groups.push(&entries[start..i]);
            start = i;
        }
    }
    groups
}

fn byte_width(value: u64) -> usize {
    if value == 0 {
        1
    } else {
        ((64 - value.leading_zeros()) as usize).div_ceil(8)
    }
}

/// Build the cross-reference stream object per the emission algorithm:
/// sort, widen field 2 (never narrow), big-endian truncated fields,
/// PNG-Up + Flate, `/Index` runs with the implicit free-list head.
fn build_xref_stream(
    mut entries: Vec<CrossReferenceStreamEntry>,
    base_dict: &Dictionary,
    prev_widths: Option<[usize; 3]>,
    size: u32,
    prev: Option<u64>,
) -> Result<(Stream, CrossReferenceStream)> {
    entries.sort_by_key(|e| e.object_number);
    if prev.is_none() && entries.first().map_or(false, |e| e.object_number >= 1) {
        entries.insert(
            0,
            CrossReferenceStreamEntry {
                entry_type: XrefEntryType::Free,
                field2: 0,
                field3: 65535,
                object_number: 0,
            },
        );
    }

    let mut widths = prev_widths.unwrap_or([1, 1, 2]);
    widths[0] = widths[0].max(1);
    widths[2] = widths[2].max(2);
    let max_position = entries
        .iter()
        .filter(|e| e.entry_type == XrefEntryType::InFile)
        .map(|e| e.field2)
        .max()
        .unwrap_or(0);
    let needed = byte_width(max_position);
    if needed > 4 {
        return Err(Error::XrefWidthOverflow(max_position));
    }
    widths[1] = widths[1].max(needed);

    let columns: usize = widths.iter().sum();
    let mut rows = Vec::with_capacity(entries.len() * columns);
    for entry in &entries {
        write_field(&mut rows, u64::from(entry.entry_type.code()), widths[0]);
        write_field(&mut rows, entry.field2, widths[1]);
        write_field(&mut rows, u64::from(entry.field3), widths[2]);
    }

    let index = index_runs(&entries);

    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name("XRef".to_string()));
    dict.set("Size", Object::from_i64(i64::from(size)));
    for key in ["Root", "Info", "ID", "Encrypt"] {
        if let Some(value) = base_dict.get(key) {
            dict.set(key, value.clone());
        }
    }
    if let Some(prev) = prev {
        dict.set("Prev", Object::from_i64(prev as i64));
    }
    dict.set(
        "W",
        Object::Array(widths.iter().map(|&w| Object::from_usize(w)).collect()),
    );
    dict.set("Index", Object::Array(index));
    dict.set("Filter", Object::Name("FlateDecode".to_string()));
    let mut parms = Dictionary::new();
    parms.set("Columns", Object::from_usize(columns));
    parms.set("Predictor", Object::Integer(12));
    dict.set("DecodeParms", Object::Dictionary(parms));

    let payload = filters::flate_encode(&filters::png_up_encode(&rows, columns));
    let stream = Stream::new(dict, payload);
    let state = CrossReferenceStream {
        entries,
        widths,
    };
    Ok((stream, state))
}

/// Truncate a field to its configured width, big-endian.
fn write_field(rows: &mut Vec<u8>, value: u64, width: usize) {
    let mask = if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * width)) - 1
    };
    rows.write_uint::<BigEndian>(value & mask, width)
        .expect("in-memory write");
}

/// `/Index`: runs of consecutive object numbers as `[first count …]`.
fn index_runs(entries: &[CrossReferenceStreamEntry]) -> Vec<Object> {
    let mut index = Vec::new();
    let mut run_start = 0usize;
    for i in 1..=entries.len() {
        let split = i == entries.len()
            || entries[i].object_number != entries[i - 1].object_number + 1;
        if split {
            index.push(Object::from_i64(i64::from(entries[run_start].object_number)));
            index.push(Object::from_i64((i - run_start) as i64));
            run_start = i;
        }
    }
    index
}
