//! Trailer generations and the trailer chain.
//!
//! Each incremental update of a PDF contributes one [`Trailer`]: a
//! dictionary, its own cross-reference table, and the object streams it
//! introduced. The chain is ordered newest-first; `prev` is the next
//! index up. Cross-reference streams keep their decoded entry list and
//! width triple so rewrites never narrow `/W`.

use std::collections::HashSet;

use log::debug;

use crate::error::Result;
use crate::object::{Dictionary, ObjectId};
use crate::object_stream::ObjectStream;
use crate::xref::CrossReferenceTable;

/// Cross-reference stream entry type (PDF 1.5, Table 3.16).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntryType {
    /// Type 0: member of the free list
    Free,
    /// Type 1: object at a byte offset in the file
    InFile,
    /// Type 2: object inside an object stream
    InStream,
}

impl XrefEntryType {
    /// The on-disk field-1 value.
    pub fn code(self) -> u8 {
        match self {
            XrefEntryType::Free => 0,
            XrefEntryType::InFile => 1,
            XrefEntryType::InStream => 2,
        }
    }
}

/// One decoded cross-reference stream entry.
///
/// Field semantics depend on the type: for type 1, `field2` is the byte
/// offset and `field3` the generation; for type 2, `field2` is the
/// containing stream's object number and `field3` the member index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossReferenceStreamEntry {
    /// Entry type (field 1)
    pub entry_type: XrefEntryType,
    /// Field 2 (offset / containing stream number / next free)
    pub field2: u64,
    /// Field 3 (generation / member index)
    pub field3: u32,
    /// Object number the entry describes
    pub object_number: u32,
}

/// The stream form of a cross-reference section.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceStream {
    /// Decoded entries in file order
    pub entries: Vec<CrossReferenceStreamEntry>,
    /// Width triple `/W`; never narrowed on rewrite
    pub widths: [usize; 3],
}

impl CrossReferenceStream {
    /// A fresh stream with the narrowest default widths.
    ///
    /// Field 3 starts at two bytes: the free-list head carries
    /// generation 65535 and fields are truncated to their width.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            widths: [1, 1, 2],
        }
    }

    /// A stream whose widths were read from a file.
    pub fn with_widths(widths: [usize; 3]) -> Self {
        Self {
            entries: Vec::new(),
            widths,
        }
    }
}

/// How a cross-reference section was (or will be) spelled.
#[derive(Debug, Clone)]
pub enum TrailerKind {
    /// Classic `xref` table + `trailer` dictionary
    Classic,
    /// PDF 1.5 cross-reference stream
    Stream(CrossReferenceStream),
}

/// One update generation of the document.
#[derive(Debug, Clone)]
pub struct Trailer {
    /// Trailer dictionary (for xref streams, the stream's dictionary)
    pub dict: Dictionary,
    /// Cross-reference table owned by this generation
    pub xref_table: CrossReferenceTable,
    /// Object stream containers this generation introduced
    pub object_streams: Vec<ObjectStream>,
    /// Set when the generation is covered by a signature
    pub is_read_only: bool,
    /// Set when this generation carries the linearization dictionary
    pub is_linearized_hint: bool,
    /// Section spelling
    pub kind: TrailerKind,
}

impl Trailer {
    /// A classic-table trailer.
    pub fn new_classic(dict: Dictionary) -> Self {
        Self {
            dict,
            xref_table: CrossReferenceTable::new(),
            object_streams: Vec::new(),
            is_read_only: false,
            is_linearized_hint: false,
            kind: TrailerKind::Classic,
        }
    }

    /// A cross-reference-stream trailer.
    pub fn new_stream(dict: Dictionary, stream: CrossReferenceStream) -> Self {
        Self {
            dict,
            xref_table: CrossReferenceTable::new(),
            object_streams: Vec::new(),
            is_read_only: false,
            is_linearized_hint: false,
            kind: TrailerKind::Stream(stream),
        }
    }

    /// Whether this generation's section is a cross-reference stream.
    pub fn is_xref_stream(&self) -> bool {
        matches!(self.kind, TrailerKind::Stream(_))
    }

    /// Byte offset of the previous generation's section, from `/Prev`.
    pub fn prev_offset(&self) -> Option<u64> {
        self.dict
            .get("Prev")
            .and_then(crate::object::Object::as_i64)
            .and_then(|v| u64::try_from(v).ok())
    }

    /// The document catalog reference, from `/Root`.
    pub fn root(&self) -> Option<ObjectId> {
        self.dict.get_reference("Root").ok().flatten()
    }
}

/// Post-parse disposition of a trailer chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    /// Single trailer, no signature: flatten
    Flatten,
    /// Signed: every generation is read-only, bytes preserved
    PreserveSigned,
    /// Incremental overlay over a linearized file: merge the top trailer
    MergeLinearizedOverlay,
    /// Keep as-is; saving appends another update
    Keep,
}

/// Classify a freshly parsed chain.
pub fn classify_chain(trailers: &[Trailer], has_signature: bool, linearized: bool) -> ChainState {
    let all_stream = trailers.iter().all(Trailer::is_xref_stream);
    if has_signature && (trailers.len() == 1 || all_stream) {
        return ChainState::PreserveSigned;
    }
    if trailers.len() == 1 && !has_signature {
        return ChainState::Flatten;
    }
    if all_stream && trailers.len() > 2 && linearized && !has_signature {
        return ChainState::MergeLinearizedOverlay;
    }
    ChainState::Keep
}

/// Merge the newest trailer into the rest of the chain.
///
/// Each of its references either replaces a prior same-id reference in
/// an older trailer or is appended to the immediate predecessor. The
/// top trailer's object streams die with it: their containers are not
/// carried over and member locations are cleared so the next save
/// repacks them.
pub(crate) fn merge_top_overlay(trailers: &mut Vec<Trailer>) -> Result<()> {
    if trailers.len() < 2 {
        return Ok(());
    }
    let mut top = trailers.remove(0);
    let dropped_containers: HashSet<u32> =
        top.object_streams.iter().map(|s| s.number).collect();
    debug!(
        "merging overlay trailer: {} refs, {} object stream(s) dropped",
        top.xref_table.len(),
        dropped_containers.len()
    );

    for id in top.xref_table.all_references() {
        let mut reference = match top.xref_table.remove(id) {
            Some(r) => r,
            None => continue,
        };
        if dropped_containers.contains(&id.number) {
            continue;
        }
        reference.containing_stream = None;

        let mut replaced = false;
        for trailer in trailers.iter_mut() {
            if trailer.xref_table.contains(id) {
                trailer.xref_table.remove(id);
                trailer.xref_table.add(reference.clone())?;
                replaced = true;
                break;
            }
        }
        if !replaced {
            trailers[0].xref_table.add(reference)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;
    use crate::xref::Reference;

    fn stream_trailer() -> Trailer {
        Trailer::new_stream(Dictionary::new(), CrossReferenceStream::new())
    }

    #[test]
    fn test_classify_single_unsigned_flattens() {
        let trailers = vec![Trailer::new_classic(Dictionary::new())];
        assert_eq!(classify_chain(&trailers, false, false), ChainState::Flatten);
    }

    #[test]
    fn test_classify_signed_preserves() {
        let trailers = vec![Trailer::new_classic(Dictionary::new())];
        assert_eq!(
            classify_chain(&trailers, true, false),
            ChainState::PreserveSigned
        );
        let trailers = vec![stream_trailer(), stream_trailer()];
        assert_eq!(
            classify_chain(&trailers, true, false),
            ChainState::PreserveSigned
        );
    }

    #[test]
    fn test_classify_linearized_overlay_merges() {
        let trailers = vec![stream_trailer(), stream_trailer(), stream_trailer()];
        assert_eq!(
            classify_chain(&trailers, false, true),
            ChainState::MergeLinearizedOverlay
        );
    }

    #[test]
    fn test_classify_everything_else_keeps() {
        // Two trailers only: incremental update, no merge.
        let trailers = vec![stream_trailer(), stream_trailer()];
        assert_eq!(classify_chain(&trailers, false, true), ChainState::Keep);
        // Mixed spelling never merges.
        let trailers = vec![
            stream_trailer(),
            Trailer::new_classic(Dictionary::new()),
            stream_trailer(),
        ];
        assert_eq!(classify_chain(&trailers, false, true), ChainState::Keep);
    }

    #[test]
    fn test_merge_replaces_and_appends() {
        // T3 (top) carries a replacement for object 2 and a new object 9.
        let mut t3 = stream_trailer();
        let mut replacement = Reference::new(ObjectId::new(2, 0));
        replacement.set_value(Object::Integer(20));
        t3.xref_table.add(replacement).unwrap();
        let mut fresh = Reference::new(ObjectId::new(9, 0));
        fresh.set_value(Object::Integer(90));
        t3.xref_table.add(fresh).unwrap();

        let mut t2 = stream_trailer();
        t2.xref_table
            .add(Reference::new(ObjectId::new(5, 0)))
            .unwrap();

        let mut t1 = stream_trailer();
        let mut original = Reference::new(ObjectId::new(2, 0));
        original.set_value(Object::Integer(2));
        t1.xref_table.add(original).unwrap();

        let mut trailers = vec![t3, t2, t1];
        merge_top_overlay(&mut trailers).unwrap();

        assert_eq!(trailers.len(), 2);
        // Replacement landed in T1 where the same id lived.
        let in_t1 = trailers[1]
            .xref_table
            .lookup(ObjectId::new(2, 0))
            .unwrap()
            .value()
            .unwrap();
        assert_eq!(*in_t1, Object::Integer(20));
        // The new object was appended to the immediate predecessor T2.
        assert!(trailers[0].xref_table.contains(ObjectId::new(9, 0)));
    }

    #[test]
    fn test_merge_drops_object_stream_containers() {
        let mut t3 = stream_trailer();
        let builder = crate::object_stream::ObjectStreamBuilder::new(30, None);
        builder.append(8, b"1");
        let stream = builder.into_stream();
        t3.object_streams
            .push(ObjectStream::parse(30, &stream).unwrap());
        // Container's own type-1 entry plus its member's type-2 entry.
        t3.xref_table
            .add(Reference::at_position(ObjectId::new(30, 0), 500))
            .unwrap();
        let mut member = Reference::in_stream(ObjectId::new(8, 0), 30, 0);
        member.set_value(Object::Integer(1));
        t3.xref_table.add(member).unwrap();

        let t2 = stream_trailer();
        let t1 = stream_trailer();
        let mut trailers = vec![t3, t2, t1];
        merge_top_overlay(&mut trailers).unwrap();

        // Container gone, member kept with its stream location cleared.
        assert!(!trailers[0].xref_table.contains(ObjectId::new(30, 0)));
        let member = trailers[0]
            .xref_table
            .lookup(ObjectId::new(8, 0))
            .unwrap();
        assert!(member.containing_stream.is_none());
    }

    #[test]
    fn test_prev_offset() {
        let mut dict = Dictionary::new();
        dict.set("Prev", Object::Integer(1234));
        let trailer = Trailer::new_classic(dict);
        assert_eq!(trailer.prev_offset(), Some(1234));
    }
}
