//! PDF object model.
//!
//! The object graph is a tagged sum (`Object`) plus an arena of
//! indirect objects keyed by [`ObjectId`] inside the cross-reference
//! tables. References are explicit values; dereferencing is a table
//! lookup, never a pointer chase, which keeps the cyclic PDF graph
//! (pages ↔ parent, forms ↔ resources) free of ownership cycles.

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::filters;

/// Identifier of an indirect object: object number and generation.
///
/// Two ids are equal iff both components match. The pair (0, 65535) is
/// the head of the free list and never names a real object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    /// Object number (positive for real objects)
    pub number: u32,
    /// Generation number
    pub generation: u16,
}

impl ObjectId {
    /// Head of the free list, `0 65535`.
    pub const FREE_HEAD: ObjectId = ObjectId {
        number: 0,
        generation: 65535,
    };

    /// Create a new object id.
    pub fn new(number: u32, generation: u16) -> Self {
        Self { number, generation }
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// Encoding hint carried by parsed byte strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StringEncoding {
    /// Uninterpreted bytes
    #[default]
    Raw,
    /// PDFDocEncoding
    PdfDoc,
    /// UTF-16 big-endian (BOM `FE FF`)
    Utf16Be,
    /// UTF-16 little-endian (BOM `FF FE`)
    Utf16Le,
}

/// A hex-written string, with enough state to reproduce its spelling.
#[derive(Debug, Clone, PartialEq)]
pub struct HexString {
    /// Decoded bytes (odd trailing digit zero-padded)
    pub data: Vec<u8>,
    /// Encoding hint from the BOM test
    pub encoding: StringEncoding,
    /// Whether the source spelled any hex digit in uppercase
    pub uppercase: bool,
}

/// An axis-aligned rectangle, `[llx lly urx ury]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rectangle {
    pub llx: f64,
    pub lly: f64,
    pub urx: f64,
    pub ury: f64,
}

/// PDF object representation.
///
/// Integers fitting in signed 32 bits are `Integer`; values that only
/// fit unsigned 32 bits are `UInteger`; anything wider degrades to
/// `Real`. Scalars may be indirect on imported files and round-trip
/// through the same variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Signed 32-bit integer
    Integer(i32),
    /// Unsigned 32-bit integer (beyond i32 range)
    UInteger(u32),
    /// Real (floating-point) value
    Real(f64),
    /// Name (written with a leading `/`)
    Name(String),
    /// Literal byte string with its encoding hint
    String(Vec<u8>, StringEncoding),
    /// Hex-written byte string
    HexString(HexString),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (insertion-ordered key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + raw bytes)
    Stream(Stream),
    /// Indirect object reference
    Reference(ObjectId),
}

impl Object {
    /// Build the narrowest numeric variant that holds `value`.
    pub fn from_i64(value: i64) -> Object {
        if let Ok(v) = i32::try_from(value) {
            Object::Integer(v)
        } else if let Ok(v) = u32::try_from(value) {
            Object::UInteger(v)
        } else {
            Object::Real(value as f64)
        }
    }

    /// Build the narrowest numeric variant that holds `value`.
    pub fn from_usize(value: usize) -> Object {
        Object::from_i64(value as i64)
    }

    /// Human-readable type name, without the data.
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::UInteger(_) => "UInteger",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(..) => "String",
            Object::HexString(_) => "HexString",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to a signed integer. Covers both integer variants.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(i64::from(*i)),
            Object::UInteger(u) => Some(i64::from(*u)),
            _ => None,
        }
    }

    /// Try to cast to a float. Integer variants coerce.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(f64::from(*i)),
            Object::UInteger(u) => Some(f64::from(*u)),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Try to cast to string bytes. Covers both string spellings.
    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            Object::String(s, _) => Some(s),
            Object::HexString(h) => Some(&h.data),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&[Object]> {
        match self {
            Object::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for streams too.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Mutable dictionary access. Works for streams too.
    pub fn as_dict_mut(&mut self) -> Option<&mut Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&mut s.dict),
            _ => None,
        }
    }

    /// Try to cast to stream.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable stream access.
    pub fn as_stream_mut(&mut self) -> Option<&mut Stream> {
        match self {
            Object::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Decode a string object's bytes to text using its encoding hint.
    ///
    /// UTF-16 variants honor the BOM; raw bytes fall back to a lossy
    /// Latin-1 style mapping, which matches how viewers display
    /// untagged strings.
    pub fn as_text(&self) -> Option<String> {
        let (bytes, encoding) = match self {
            Object::String(s, e) => (s.as_slice(), *e),
            Object::HexString(h) => (h.data.as_slice(), h.encoding),
            _ => return None,
        };
        Some(decode_text(bytes, encoding))
    }
}

/// Decode string bytes per the tagged encoding.
pub(crate) fn decode_text(bytes: &[u8], encoding: StringEncoding) -> String {
    match encoding {
        StringEncoding::Utf16Be | StringEncoding::Utf16Le => {
            let body = bytes.get(2..).unwrap_or(&[]);
            let units: Vec<u16> = body
                .chunks_exact(2)
                .map(|c| {
                    if encoding == StringEncoding::Utf16Be {
                        u16::from_be_bytes([c[0], c[1]])
                    } else {
                        u16::from_le_bytes([c[0], c[1]])
                    }
                })
                .collect();
            char::decode_utf16(units.iter().copied())
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        StringEncoding::Raw | StringEncoding::PdfDoc => {
            bytes.iter().map(|&b| b as char).collect()
        }
    }
}

/// Dictionary with insertion-ordered keys.
///
/// Key iteration order is preserved from parse through write; tests and
/// signature byte ranges depend on it. For duplicate keys in parsed
/// input the first occurrence wins.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dictionary {
    entries: IndexMap<String, Object>,
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a value.
    pub fn get(&self, key: &str) -> Option<&Object> {
        self.entries.get(key)
    }

    /// Mutable lookup.
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Object> {
        self.entries.get_mut(key)
    }

    /// Insert or overwrite a value.
    pub fn set(&mut self, key: impl Into<String>, value: Object) {
        self.entries.insert(key.into(), value);
    }

    /// Remove a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<Object> {
        self.entries.shift_remove(key)
    }

    /// Whether the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(|k| k.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Object)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Mutable entry iteration in insertion order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Object)> {
        self.entries.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the dictionary has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The `/Type` entry as a name, if present.
    pub fn type_of(&self) -> Option<&str> {
        self.get("Type").and_then(Object::as_name)
    }

    /// Integer accessor: 0 when absent, error on type mismatch.
    pub fn get_integer(&self, key: &str) -> Result<i64> {
        match self.get(key) {
            None => Ok(0),
            Some(obj) => obj.as_i64().ok_or(Error::InvalidObjectType {
                expected: "Integer",
                found: obj.type_name(),
            }),
        }
    }

    /// Real accessor: 0.0 when absent, error on type mismatch.
    /// Integer values coerce.
    pub fn get_real(&self, key: &str) -> Result<f64> {
        match self.get(key) {
            None => Ok(0.0),
            Some(obj) => obj.as_f64().ok_or(Error::InvalidObjectType {
                expected: "Real",
                found: obj.type_name(),
            }),
        }
    }

    /// Boolean accessor: false when absent, error on type mismatch.
    pub fn get_boolean(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            None => Ok(false),
            Some(obj) => obj.as_bool().ok_or(Error::InvalidObjectType {
                expected: "Boolean",
                found: obj.type_name(),
            }),
        }
    }

    /// Name accessor: empty string when absent, error on type mismatch.
    pub fn get_name(&self, key: &str) -> Result<&str> {
        match self.get(key) {
            None => Ok(""),
            Some(obj) => obj.as_name().ok_or(Error::InvalidObjectType {
                expected: "Name",
                found: obj.type_name(),
            }),
        }
    }

    /// String accessor: `None` when absent, error on type mismatch.
    pub fn get_string(&self, key: &str) -> Result<Option<&[u8]>> {
        match self.get(key) {
            None => Ok(None),
            Some(obj) => obj
                .as_string_bytes()
                .map(Some)
                .ok_or(Error::InvalidObjectType {
                    expected: "String",
                    found: obj.type_name(),
                }),
        }
    }

    /// Dictionary accessor: `None` when absent, error on type mismatch.
    pub fn get_dictionary(&self, key: &str) -> Result<Option<&Dictionary>> {
        match self.get(key) {
            None => Ok(None),
            Some(Object::Dictionary(d)) => Ok(Some(d)),
            Some(Object::Stream(s)) => Ok(Some(&s.dict)),
            Some(obj) => Err(Error::InvalidObjectType {
                expected: "Dictionary",
                found: obj.type_name(),
            }),
        }
    }

    /// Array accessor: `None` when absent, error on type mismatch.
    pub fn get_array(&self, key: &str) -> Result<Option<&[Object]>> {
        match self.get(key) {
            None => Ok(None),
            Some(Object::Array(a)) => Ok(Some(a)),
            Some(obj) => Err(Error::InvalidObjectType {
                expected: "Array",
                found: obj.type_name(),
            }),
        }
    }

    /// Reference accessor: `None` when absent, error on type mismatch.
    pub fn get_reference(&self, key: &str) -> Result<Option<ObjectId>> {
        match self.get(key) {
            None => Ok(None),
            Some(Object::Reference(id)) => Ok(Some(*id)),
            Some(obj) => Err(Error::InvalidObjectType {
                expected: "Reference",
                found: obj.type_name(),
            }),
        }
    }

    /// Rectangle accessor: `None` when absent, error on malformed value.
    ///
    /// Expects a four-number array `[llx lly urx ury]`.
    pub fn get_rectangle(&self, key: &str) -> Result<Option<Rectangle>> {
        let arr = match self.get_array(key)? {
            None => return Ok(None),
            Some(a) => a,
        };
        if arr.len() != 4 {
            return Err(Error::InvalidObjectType {
                expected: "Rectangle",
                found: "Array",
            });
        }
        let mut nums = [0.0f64; 4];
        for (slot, obj) in nums.iter_mut().zip(arr) {
            *slot = obj.as_f64().ok_or(Error::InvalidObjectType {
                expected: "Rectangle",
                found: obj.type_name(),
            })?;
        }
        Ok(Some(Rectangle {
            llx: nums[0],
            lly: nums[1],
            urx: nums[2],
            ury: nums[3],
        }))
    }
}

impl FromIterator<(String, Object)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (String, Object)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// A stream object: dictionary plus raw bytes.
///
/// The byte buffer holds whatever the file holds; [`Stream::try_unfilter`]
/// decodes the `/Filter` chain in place and [`Stream::zip`] re-applies
/// FlateDecode for output.
#[derive(Debug, Clone)]
pub struct Stream {
    /// Stream dictionary
    pub dict: Dictionary,
    data: Vec<u8>,
    /// Checksum of the buffer as loaded, for change detection
    loaded_checksum: u64,
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        // The load-time checksum is bookkeeping, not content.
        self.dict == other.dict && self.data == other.data
    }
}

impl Stream {
    /// Create a stream from a dictionary and raw bytes.
    ///
    /// `/Length` is set to match the buffer.
    pub fn new(mut dict: Dictionary, data: Vec<u8>) -> Self {
        dict.set("Length", Object::from_usize(data.len()));
        let loaded_checksum = calc_checksum(&data);
        Self {
            dict,
            data,
            loaded_checksum,
        }
    }

    /// The raw byte buffer as currently stored.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the byte buffer, updating `/Length`.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.dict.set("Length", Object::from_usize(data.len()));
        self.data = data;
    }

    /// Whether the buffer changed since load.
    pub fn is_dirty(&self) -> bool {
        calc_checksum(&self.data) != self.loaded_checksum
    }

    /// Whether a `/Filter` chain is currently applied.
    pub fn is_filtered(&self) -> bool {
        self.dict.contains("Filter")
    }

    /// Decode the `/Filter` chain in place.
    ///
    /// On success the buffer holds the unfiltered bytes and `/Filter`
    /// and `/DecodeParms` are stripped so a later [`Stream::zip`] cannot
    /// double-filter. A stream with no filter is left untouched.
    pub fn try_unfilter(&mut self) -> Result<()> {
        if !self.is_filtered() {
            return Ok(());
        }
        let decoded = filters::decode_chain(
            &self.data,
            self.dict.get("Filter"),
            self.dict.get("DecodeParms"),
        )?;
        self.dict.remove("Filter");
        self.dict.remove("DecodeParms");
        self.set_data(decoded);
        Ok(())
    }

    /// Decode the `/Filter` chain into a fresh buffer, leaving the
    /// stream untouched.
    pub fn decoded_data(&self) -> Result<Vec<u8>> {
        if !self.is_filtered() {
            return Ok(self.data.clone());
        }
        filters::decode_chain(
            &self.data,
            self.dict.get("Filter"),
            self.dict.get("DecodeParms"),
        )
    }

    /// Apply FlateDecode for output.
    ///
    /// A stream that already carries a filter is left as is.
    pub fn zip(&mut self) -> Result<()> {
        if self.is_filtered() {
            return Ok(());
        }
        let compressed = filters::flate_encode(&self.data);
        self.set_data(compressed);
        self.dict.set("Filter", Object::Name("FlateDecode".to_string()));
        Ok(())
    }
}

/// Visit every reference nested in a value, depth first.
pub(crate) fn visit_references(obj: &Object, f: &mut dyn FnMut(ObjectId)) {
    match obj {
        Object::Reference(id) => f(*id),
        Object::Array(items) => {
            for item in items {
                visit_references(item, f);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter() {
                visit_references(value, f);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter() {
                visit_references(value, f);
            }
        }
        _ => {}
    }
}

/// Visit every reference nested in a value, with mutable access.
pub(crate) fn visit_references_mut(obj: &mut Object, f: &mut dyn FnMut(&mut ObjectId)) {
    match obj {
        Object::Reference(id) => f(id),
        Object::Array(items) => {
            for item in items {
                visit_references_mut(item, f);
            }
        }
        Object::Dictionary(dict) => {
            for (_, value) in dict.iter_mut() {
                visit_references_mut(value, f);
            }
        }
        Object::Stream(stream) => {
            for (_, value) in stream.dict.iter_mut() {
                visit_references_mut(value, f);
            }
        }
        _ => {}
    }
}

const CHECKSUM_MOD: u64 = 65521;

/// Length-suffixed checksum over a byte buffer.
///
/// Two 16-bit byte-sum accumulators (mod 65521) are packed above a
/// 32-bit length: `((s2 << 16 | s1) << 32) | len`. The empty buffer
/// yields 0. Used to detect stream buffers that changed since load.
pub fn calc_checksum(data: &[u8]) -> u64 {
    if data.is_empty() {
        return 0;
    }
    let mut s1: u64 = 0;
    let mut s2: u64 = 0;
    for &byte in data {
        s1 = (s1 + u64::from(byte)) % CHECKSUM_MOD;
        s2 = (s2 + u64::from(byte)) % CHECKSUM_MOD;
    }
    ((s2 << 16 | s1) << 32) | data.len() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_id_equality() {
        assert_eq!(ObjectId::new(1, 0), ObjectId::new(1, 0));
        assert_ne!(ObjectId::new(1, 0), ObjectId::new(1, 1));
        assert_ne!(ObjectId::new(1, 0), ObjectId::new(2, 0));
        assert_eq!(format!("{}", ObjectId::new(10, 0)), "10 0 R");
    }

    #[test]
    fn test_free_head_constant() {
        assert_eq!(ObjectId::FREE_HEAD, ObjectId::new(0, 65535));
    }

    #[test]
    fn test_numeric_narrowing() {
        assert_eq!(Object::from_i64(123), Object::Integer(123));
        assert_eq!(Object::from_i64(-7), Object::Integer(-7));
        assert_eq!(Object::from_i64(2_996_984_786), Object::UInteger(2_996_984_786));
        assert!(matches!(Object::from_i64(264_584_027_963_392), Object::Real(_)));
    }

    #[test]
    fn test_as_i64_covers_both_integer_variants() {
        assert_eq!(Object::Integer(-5).as_i64(), Some(-5));
        assert_eq!(Object::UInteger(3_000_000_000).as_i64(), Some(3_000_000_000));
        assert_eq!(Object::Real(1.5).as_i64(), None);
    }

    #[test]
    fn test_dictionary_insertion_order() {
        let mut dict = Dictionary::new();
        dict.set("Zebra", Object::Integer(1));
        dict.set("Alpha", Object::Integer(2));
        dict.set("Mango", Object::Integer(3));
        let keys: Vec<&str> = dict.keys().collect();
        assert_eq!(keys, vec!["Zebra", "Alpha", "Mango"]);
    }

    #[test]
    fn test_dictionary_integer_accessor_default_and_mismatch() {
        let mut dict = Dictionary::new();
        dict.set("N", Object::Integer(5));
        dict.set("Bad", Object::Name("x".to_string()));
        assert_eq!(dict.get_integer("N").unwrap(), 5);
        assert_eq!(dict.get_integer("Missing").unwrap(), 0);
        assert!(dict.get_integer("Bad").is_err());
    }

    #[test]
    fn test_dictionary_object_accessors() {
        let mut inner = Dictionary::new();
        inner.set("Kind", Object::Name("Inner".to_string()));
        let mut dict = Dictionary::new();
        dict.set("D", Object::Dictionary(inner));
        dict.set("R", Object::Reference(ObjectId::new(4, 0)));

        assert!(dict.get_dictionary("D").unwrap().is_some());
        assert!(dict.get_dictionary("Missing").unwrap().is_none());
        assert_eq!(dict.get_reference("R").unwrap(), Some(ObjectId::new(4, 0)));
        assert!(dict.get_dictionary("R").is_err());
    }

    #[test]
    fn test_get_rectangle() {
        let mut dict = Dictionary::new();
        dict.set(
            "MediaBox",
            Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(612.0),
                Object::Real(792.0),
            ]),
        );
        let rect = dict.get_rectangle("MediaBox").unwrap().unwrap();
        assert_eq!(rect.urx, 612.0);
        assert_eq!(rect.ury, 792.0);
        assert!(dict.get_rectangle("CropBox").unwrap().is_none());
    }

    #[test]
    fn test_stream_sets_length() {
        let stream = Stream::new(Dictionary::new(), b"hello".to_vec());
        assert_eq!(stream.dict.get_integer("Length").unwrap(), 5);
    }

    #[test]
    fn test_stream_zip_then_unfilter_round_trip() {
        let mut stream = Stream::new(Dictionary::new(), b"payload payload payload".to_vec());
        stream.zip().unwrap();
        assert_eq!(stream.dict.get_name("Filter").unwrap(), "FlateDecode");
        stream.try_unfilter().unwrap();
        assert!(!stream.is_filtered());
        assert_eq!(stream.data(), b"payload payload payload");
    }

    #[test]
    fn test_zip_skips_filtered_stream() {
        let mut dict = Dictionary::new();
        dict.set("Filter", Object::Name("FlateDecode".to_string()));
        let mut stream = Stream {
            dict,
            data: b"already compressed".to_vec(),
            loaded_checksum: 0,
        };
        stream.zip().unwrap();
        assert_eq!(stream.data(), b"already compressed");
    }

    #[test]
    fn test_stream_dirty_tracking() {
        let mut stream = Stream::new(Dictionary::new(), b"abc".to_vec());
        assert!(!stream.is_dirty());
        stream.set_data(b"abcd".to_vec());
        assert!(stream.is_dirty());
    }

    #[test]
    fn test_calc_checksum_values() {
        assert_eq!(calc_checksum(&[]), 0);
        assert_eq!(calc_checksum(&[0x00]), 1);
        assert_eq!(calc_checksum(&[1, 2, 3]), ((6u64 << 16 | 6) << 32) | 3);
    }

    #[test]
    fn test_as_text_utf16be() {
        let bytes = vec![0xFE, 0xFF, 0x00, b'H', 0x00, b'i'];
        let obj = Object::String(bytes, StringEncoding::Utf16Be);
        assert_eq!(obj.as_text().unwrap(), "Hi");
    }

    #[test]
    fn test_as_text_empty_unicode_body() {
        let obj = Object::String(vec![0xFE, 0xFF], StringEncoding::Utf16Be);
        assert_eq!(obj.as_text().unwrap(), "");
    }

    #[test]
    fn test_as_dict_covers_stream() {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name("XObject".to_string()));
        let obj = Object::Stream(Stream::new(dict, Vec::new()));
        assert_eq!(obj.as_dict().unwrap().type_of(), Some("XObject"));
    }
}
