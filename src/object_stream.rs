//! Object streams (`/Type /ObjStm`).
//!
//! An object stream packs several non-stream indirect objects into one
//! compressed payload:
//!
//! ```text
//! << /Type /ObjStm /N 3 /First 14 /Filter /FlateDecode >>
//! stream
//! 10 0 11 6 12 12    % pairs: object number, offset after /First
//! <obj 10> <obj 11> <obj 12>
//! endstream
//! ```
//!
//! [`ObjectStream`] is the parsed form; [`ObjectStreamBuilder`] is the
//! writer-side accumulator. Streams may chain via `/Extends`, forming a
//! DAG with one root per chain.

use std::sync::Mutex;

use log::warn;

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::parser;

/// Member capacity after which a stream stops being viable.
///
/// A heuristic, not a format limit.
pub const MAX_MEMBERS: usize = 100;

/// A parsed object stream container.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    /// Object number of the container itself
    pub number: u32,
    /// The container's dictionary
    pub dict: Dictionary,
    /// `(object number, payload offset)` pairs in header order
    pub header: Vec<(u32, usize)>,
    payload: Vec<u8>,
    first: usize,
}

impl ObjectStream {
    /// Parse a container from its stream object.
    pub fn parse(number: u32, stream: &Stream) -> Result<Self> {
        if stream.dict.type_of() != Some("ObjStm") {
            return Err(Error::InvalidObjectType {
                expected: "ObjStm",
                found: "Stream",
            });
        }
        let n = stream.dict.get_integer("N")?;
        let first = stream.dict.get_integer("First")?;
        if !(0..=1_000_000).contains(&n) || !(0..=10_000_000).contains(&first) {
            return Err(Error::ParseError {
                offset: 0,
                reason: format!("implausible object stream header: /N {} /First {}", n, first),
            });
        }
        let n = n as usize;
        let first = first as usize;

        let payload = stream.decoded_data()?;
        if payload.len() < first {
            return Err(Error::ParseError {
                offset: 0,
                reason: format!(
                    "object stream shorter than /First: {} < {}",
                    payload.len(),
                    first
                ),
            });
        }

        let header = parse_header_pairs(&payload[..first], n)?;
        Ok(Self {
            number,
            dict: stream.dict.clone(),
            header,
            payload,
            first,
        })
    }

    /// The `/Extends` target, if this stream extends another.
    pub fn extends(&self) -> Option<ObjectId> {
        match self.dict.get("Extends") {
            Some(Object::Reference(id)) => Some(*id),
            _ => None,
        }
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.header.len()
    }

    /// Whether the stream has no members.
    pub fn is_empty(&self) -> bool {
        self.header.is_empty()
    }

    /// Parse the member at a header index.
    ///
    /// Members are top-level values (never streams) with generation 0.
    pub fn parse_member(&self, index: usize) -> Result<(ObjectId, Object)> {
        let (object_number, offset) = *self.header.get(index).ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!(
                "object stream {} has no member index {}",
                self.number, index
            ),
        })?;
        let start = self.first + offset;
        if start >= self.payload.len() {
            return Err(Error::ParseError {
                offset: start,
                reason: format!(
                    "member {} offset {} beyond payload length {}",
                    object_number,
                    offset,
                    self.payload.len()
                ),
            });
        }
        let value = parser::parse_value_at(&self.payload, start)?;
        Ok((ObjectId::new(object_number, 0), value))
    }

    /// Parse every member, skipping ones that fail to parse.
    pub fn parse_members(&self) -> Vec<(ObjectId, Object)> {
        let mut members = Vec::with_capacity(self.header.len());
        for index in 0..self.header.len() {
            match self.parse_member(index) {
                Ok(member) => members.push(member),
                Err(e) => {
                    warn!(
                        "skipping member {} of object stream {}: {}",
                        index, self.number, e
                    );
                }
            }
        }
        members
    }
}

/// Parse the `N` header pairs before `/First`.
fn parse_header_pairs(data: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count);
    let mut lexer = crate::lexer::Lexer::new(data);
    for index in 0..count {
        let number = scan_header_integer(&mut lexer, index)?;
        let offset = scan_header_integer(&mut lexer, index)?;
        pairs.push((number as u32, offset as usize));
    }
    Ok(pairs)
}

fn scan_header_integer(lexer: &mut crate::lexer::Lexer<'_>, index: usize) -> Result<i64> {
    match lexer.scan_next_token()? {
        crate::lexer::Symbol::Integer | crate::lexer::Symbol::UInteger => {
            Ok(lexer.integer_value())
        }
        _ => Err(Error::ParseError {
            offset: lexer.token_start(),
            reason: format!("malformed object stream header at pair {}", index),
        }),
    }
}

#[derive(Debug, Default)]
struct BuilderMembers {
    header: Vec<(u32, usize)>,
    payload: Vec<u8>,
}

/// Writer-side accumulator for one object stream.
///
/// Appends are mutex-guarded in case a caller shares the document
/// across threads during programmatic construction; the write path
/// itself is single-threaded.
#[derive(Debug)]
pub struct ObjectStreamBuilder {
    number: u32,
    extends: Option<ObjectId>,
    members: Mutex<BuilderMembers>,
}

impl ObjectStreamBuilder {
    /// Create a builder for the container with the given object number.
    pub fn new(number: u32, extends: Option<ObjectId>) -> Self {
        Self {
            number,
            extends,
            members: Mutex::new(BuilderMembers::default()),
        }
    }

    /// Object number of the container.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The chain root this stream extends, if any.
    pub fn extends(&self) -> Option<ObjectId> {
        self.extends
    }

    /// Current member count.
    pub fn len(&self) -> usize {
        self.members.lock().expect("object stream lock").header.len()
    }

    /// Whether no members were appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the stream reached capacity and a new one must be opened.
    pub fn is_full(&self) -> bool {
        self.len() >= MAX_MEMBERS
    }

    /// Append one serialized member; returns its index in the stream.
    pub fn append(&self, object_number: u32, serialized: &[u8]) -> u16 {
        let mut members = self.members.lock().expect("object stream lock");
        let index = members.header.len() as u16;
        let offset = members.payload.len();
        members.header.push((object_number, offset));
        members.payload.extend_from_slice(serialized);
        // Keep members separable when reparsed.
        members.payload.push(b'\n');
        index
    }

    /// Assemble the container stream: header prefix, `/First`,
    /// FlateDecode payload.
    pub fn into_stream(self) -> Stream {
        let members = self.members.into_inner().expect("object stream lock");

        let mut prefix = Vec::new();
        for (number, offset) in &members.header {
            prefix.extend_from_slice(format!("{} {} ", number, offset).as_bytes());
        }

        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name("ObjStm".to_string()));
        dict.set("N", Object::from_usize(members.header.len()));
        dict.set("First", Object::from_usize(prefix.len()));
        if let Some(root) = self.extends {
            dict.set("Extends", Object::Reference(root));
        }

        let mut payload = prefix;
        payload.extend_from_slice(&members.payload);

        let mut stream = Stream::new(dict, payload);
        // Freshly built, so this cannot carry a filter yet.
        let _ = stream.zip();
        stream
    }
}

/// Decide whether a value may live inside an object stream.
///
/// Streams (content streams, form XObjects, object streams themselves)
/// and objects with a non-zero generation take type-1 entries instead.
pub fn is_compressible(id: ObjectId, value: &Object) -> bool {
    id.generation == 0 && !matches!(value, Object::Stream(_))
}
