//! PDF parser.
//!
//! Combines lexer symbols into objects and reads a complete trailer
//! chain tail-first: find `startxref`, read the cross-reference section
//! there (classic table or cross-reference stream), follow `/Prev`,
//! decompress object-stream members, load every referenced object, and
//! fix nested references up against the live tables.
//!
//! All parse errors unwind to [`crate::document::Document::open`]; no
//! partial document escapes.

use std::collections::{HashMap, HashSet};

use byteorder::{BigEndian, ByteOrder};
use log::{debug, warn};

use crate::document::{Document, Linearization, OpenMode, OpenOptions, Version};
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Symbol};
use crate::object::{Dictionary, HexString, Object, ObjectId, Stream};
use crate::object_stream::ObjectStream;
use crate::security::PasswordValidity;
use crate::trailer::{
    classify_chain, merge_top_overlay, ChainState, CrossReferenceStream,
    CrossReferenceStreamEntry, Trailer, XrefEntryType,
};
use crate::xref::Reference;

/// Upper bound on classic subsection entry counts, against hostile
/// headers.
const MAX_SUBSECTION_ENTRIES: i64 = 1_000_000;

/// Resolves an indirect `/Length` to its integer value.
type LengthResolver<'r> = &'r dyn Fn(ObjectId) -> Option<u64>;

/// Symbol-to-object assembler over a positioned lexer.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    /// Parser over a buffer, starting at the beginning.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            lexer: Lexer::new(buf),
        }
    }

    /// Parser positioned at an absolute offset.
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        let mut parser = Self::new(buf);
        parser.lexer.set_position(pos);
        parser
    }

    /// The underlying lexer.
    pub fn lexer(&mut self) -> &mut Lexer<'a> {
        &mut self.lexer
    }

    fn unexpected(&self, expected: &'static str) -> Error {
        Error::UnexpectedSymbol {
            offset: self.lexer.token_start(),
            expected,
        }
    }

    /// Next symbol, with comments skipped.
    fn scan(&mut self) -> Result<Symbol> {
        loop {
            let symbol = self.lexer.scan_next_token()?;
            if symbol != Symbol::Comment {
                return Ok(symbol);
            }
        }
    }

    /// Parse the next value.
    pub fn parse_value(&mut self) -> Result<Object> {
        let symbol = self.scan()?;
        self.assemble(symbol, None)
    }

    /// Assemble the value the scanned symbol begins.
    fn assemble(&mut self, symbol: Symbol, resolver: Option<LengthResolver<'_>>) -> Result<Object> {
        match symbol {
            Symbol::Null => Ok(Object::Null),
            Symbol::Boolean => Ok(Object::Boolean(self.lexer.boolean_value())),
            Symbol::Integer => {
                let value = self.lexer.integer_value();
                let restore = self.lexer.position();
                if let Some(id) = self.try_reference(value) {
                    return Ok(Object::Reference(id));
                }
                self.lexer.set_position(restore);
                Ok(Object::from_i64(value))
            }
            Symbol::UInteger => {
                let value = self.lexer.uinteger_value();
                let restore = self.lexer.position();
                if let Some(id) = self.try_reference(i64::from(value)) {
                    return Ok(Object::Reference(id));
                }
                self.lexer.set_position(restore);
                Ok(Object::UInteger(value))
            }
            Symbol::Real => Ok(Object::Real(self.lexer.real_value())),
            Symbol::Name => Ok(Object::Name(self.lexer.token_string())),
            Symbol::String | Symbol::UnicodeString => Ok(Object::String(
                self.lexer.token().to_vec(),
                self.lexer.string_encoding(),
            )),
            Symbol::HexString | Symbol::UnicodeHexString => Ok(Object::HexString(HexString {
                data: self.lexer.token().to_vec(),
                encoding: self.lexer.string_encoding(),
                uppercase: self.lexer.hex_uppercase(),
            })),
            Symbol::BeginArray => self.parse_array(resolver),
            Symbol::BeginDictionary => self.parse_dictionary_or_stream(resolver, None),
            _ => Err(self.unexpected("value")),
        }
    }

    /// Lookahead for `gen R` after an integer. Failures leave the
    /// caller to restore the position and keep the plain number.
    fn try_reference(&mut self, number: i64) -> Option<ObjectId> {
        if number <= 0 || u32::try_from(number).is_err() {
            return None;
        }
        if self.lexer.scan_next_token().ok()? != Symbol::Integer {
            return None;
        }
        let generation = self.lexer.integer_value();
        if !(0..=65535).contains(&generation) {
            return None;
        }
        if self.lexer.scan_next_token().ok()? != Symbol::R {
            return None;
        }
        Some(ObjectId::new(number as u32, generation as u16))
    }

    fn parse_array(&mut self, resolver: Option<LengthResolver<'_>>) -> Result<Object> {
        let mut items = Vec::new();
        loop {
            let symbol = self.scan()?;
            match symbol {
                Symbol::EndArray => break,
                Symbol::Eof => return Err(Error::UnexpectedEof),
                _ => items.push(self.assemble(symbol, resolver)?),
            }
        }
        Ok(Object::Array(items))
    }

    /// Parse a dictionary body after `<<`, then decide whether a stream
    /// follows.
    fn parse_dictionary_or_stream(
        &mut self,
        resolver: Option<LengthResolver<'_>>,
        id: Option<ObjectId>,
    ) -> Result<Object> {
        let dict = self.parse_dictionary_body(resolver)?;
        let restore = self.lexer.position();
        match self.scan() {
            Ok(Symbol::BeginStream) => self.parse_stream_body(dict, resolver, id),
            _ => {
                self.lexer.set_position(restore);
                Ok(Object::Dictionary(dict))
            }
        }
    }

    fn parse_dictionary_body(&mut self, resolver: Option<LengthResolver<'_>>) -> Result<Dictionary> {
        let mut dict = Dictionary::new();
        loop {
            let symbol = self.scan()?;
            let key = match symbol {
                Symbol::EndDictionary => break,
                Symbol::Name => self.lexer.token_string(),
                Symbol::Eof => return Err(Error::UnexpectedEof),
                _ => return Err(self.unexpected("name key or >>")),
            };
            let value_symbol = self.scan()?;
            let value = self.assemble(value_symbol, resolver)?;
            // First insertion wins for duplicate parsed keys.
            if dict.contains(&key) {
                warn!("duplicate dictionary key /{} ignored", key);
            } else {
                dict.set(key, value);
            }
        }
        Ok(dict)
    }

    fn parse_stream_body(
        &mut self,
        dict: Dictionary,
        resolver: Option<LengthResolver<'_>>,
        id: Option<ObjectId>,
    ) -> Result<Object> {
        if !self.lexer.stream_eol_ok() {
            return Err(Error::ParseError {
                offset: self.lexer.position(),
                reason: "stream keyword not followed by LF or CR-LF".to_string(),
            });
        }
        let length = match dict.get("Length") {
            Some(obj) if obj.as_i64().is_some() => obj.as_i64().unwrap_or(0),
            Some(Object::Reference(length_id)) => {
                let resolved = resolver.and_then(|r| r(*length_id));
                match resolved {
                    Some(v) => v as i64,
                    None => {
                        return Err(Error::ParseError {
                            offset: self.lexer.position(),
                            reason: format!("unresolvable stream /Length {}", length_id),
                        })
                    }
                }
            }
            _ => {
                return Err(Error::ParseError {
                    offset: self.lexer.position(),
                    reason: "stream without usable /Length".to_string(),
                })
            }
        };
        if length < 0 {
            return Err(Error::ParseError {
                offset: self.lexer.position(),
                reason: format!("negative stream /Length {}", length),
            });
        }

        let data = self.lexer.read_stream(length as usize)?.to_vec();
        match self.scan() {
            Ok(Symbol::EndStream) => {}
            _ => {
                return Err(match id {
                    Some(id) => Error::StreamLength(id.number, id.generation),
                    None => Error::ParseError {
                        offset: self.lexer.position(),
                        reason: "endstream not found where /Length points".to_string(),
                    },
                })
            }
        }
        Ok(Object::Stream(Stream::new(dict, data)))
    }

    /// Parse a full `n g obj … endobj` wrapper.
    pub fn parse_indirect_object(
        &mut self,
        resolver: Option<LengthResolver<'_>>,
    ) -> Result<(ObjectId, Object)> {
        let number = match self.scan()? {
            Symbol::Integer | Symbol::UInteger => self.lexer.integer_value(),
            _ => return Err(self.unexpected("object number")),
        };
        let generation = match self.scan()? {
            Symbol::Integer => self.lexer.integer_value(),
            _ => return Err(self.unexpected("generation number")),
        };
        if self.scan()? != Symbol::Obj {
            return Err(self.unexpected("obj"));
        }
        let number = u32::try_from(number).map_err(|_| self.unexpected("object number"))?;
        let generation =
            u16::try_from(generation).map_err(|_| self.unexpected("generation number"))?;
        let id = ObjectId::new(number, generation);

        let symbol = self.scan()?;
        let value = if symbol == Symbol::EndObj {
            return Ok((id, Object::Null));
        } else if symbol == Symbol::BeginDictionary {
            self.parse_dictionary_or_stream(resolver, Some(id))?
        } else {
            self.assemble(symbol, resolver)?
        };

        if self.scan()? != Symbol::EndObj {
            return Err(self.unexpected("endobj"));
        }
        Ok((id, value))
    }
}

/// Parse a standalone value at an offset (object stream members).
pub(crate) fn parse_value_at(buf: &[u8], pos: usize) -> Result<Object> {
    Parser::at(buf, pos).parse_value()
}

/// Locate the `startxref` offset by scanning backward from EOF.
pub(crate) fn find_startxref(buf: &[u8]) -> Result<u64> {
    let window = buf.len().min(2048);
    let tail_start = buf.len() - window;
    let tail = &buf[tail_start..];
    let keyword_pos = tail
        .windows(9)
        .rposition(|w| w == b"startxref")
        .ok_or(Error::InvalidXref)?;

    let mut parser = Parser::at(buf, tail_start + keyword_pos);
    if parser.scan()? != Symbol::StartXRef {
        return Err(Error::InvalidXref);
    }
    match parser.scan()? {
        Symbol::Integer | Symbol::UInteger => Ok(parser.lexer.integer_value() as u64),
        _ => Err(Error::InvalidXref),
    }
}

/// Parse the `%PDF-M.m` header and the optional binary comment line.
fn parse_header(buf: &[u8]) -> Result<(Version, Option<[u8; 4]>, usize)> {
    let header_pos = buf
        .windows(5)
        .take(1024)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| {
            let shown = String::from_utf8_lossy(&buf[..buf.len().min(8)]).into_owned();
            Error::InvalidHeader(shown)
        })?;

    let rest = &buf[header_pos + 5..];
    let line_end = rest
        .iter()
        .position(|&b| b == b'\r' || b == b'\n')
        .unwrap_or(rest.len());
    let line = std::str::from_utf8(&rest[..line_end])
        .map_err(|_| Error::InvalidHeader("non-ASCII version".to_string()))?;
    let mut parts = line.trim().splitn(2, '.');
    let major: u8 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;
    let minor: u8 = parts
        .next()
        .and_then(|p| p.parse().ok())
        .ok_or_else(|| Error::InvalidHeader(line.to_string()))?;

    // The binary comment sits on line 2: '%' then four bytes >= 128.
    let mut binary_mark = None;
    let after_line = &rest[line_end..];
    let body_start = after_line
        .iter()
        .position(|&b| b != b'\r' && b != b'\n')
        .unwrap_or(after_line.len());
    let second_line = &after_line[body_start..];
    if second_line.first() == Some(&b'%') && second_line.len() >= 5 {
        let mark = &second_line[1..5];
        if mark.iter().all(|&b| b >= 128) {
            binary_mark = Some([mark[0], mark[1], mark[2], mark[3]]);
        }
    }

    Ok((Version { major, minor }, binary_mark, header_pos))
}

/// Chain reader over the whole file buffer.
struct Loader<'a> {
    buf: &'a [u8],
}

impl<'a> Loader<'a> {
    /// Read the trailer chain, newest first.
    fn read_chain(&self, start: u64) -> Result<Vec<Trailer>> {
        let mut trailers = Vec::new();
        let mut next = Some(start as usize);
        let mut seen = HashSet::new();

        while let Some(offset) = next {
            if offset >= self.buf.len() {
                return Err(Error::InvalidXref);
            }
            if !seen.insert(offset) {
                warn!("circular /Prev chain at offset {}", offset);
                break;
            }
            let trailer = self.read_trailer_at(offset)?;
            next = trailer.prev_offset().map(|v| v as usize);
            trailers.push(trailer);
        }
        if trailers.is_empty() {
            return Err(Error::InvalidXref);
        }
        Ok(trailers)
    }

    /// Read one cross-reference section, classic or stream form.
    fn read_trailer_at(&self, offset: usize) -> Result<Trailer> {
        let mut parser = Parser::at(self.buf, offset);
        let symbol = parser.scan()?;
        if symbol == Symbol::XRef {
            debug!("classic xref section at offset {}", offset);
            self.read_classic_section(parser)
        } else {
            debug!("cross-reference stream at offset {}", offset);
            self.read_stream_section(offset)
        }
    }

    fn read_classic_section(&self, mut parser: Parser<'a>) -> Result<Trailer> {
        let mut pending: Vec<Reference> = Vec::new();

        loop {
            match parser.scan()? {
                Symbol::Trailer => break,
                Symbol::Integer | Symbol::UInteger => {
                    let first = parser.lexer.integer_value();
                    let count = match parser.scan()? {
                        Symbol::Integer | Symbol::UInteger => parser.lexer.integer_value(),
                        _ => return Err(Error::InvalidXref),
                    };
                    if first < 0 || count < 0 || count > MAX_SUBSECTION_ENTRIES {
                        return Err(Error::InvalidXref);
                    }
                    for i in 0..count {
                        let position = match parser.scan()? {
                            Symbol::Integer | Symbol::UInteger => parser.lexer.integer_value(),
                            _ => return Err(Error::InvalidXref),
                        };
                        let generation = match parser.scan()? {
                            Symbol::Integer | Symbol::UInteger => parser.lexer.integer_value(),
                            _ => return Err(Error::InvalidXref),
                        };
                        let in_use = match parser.scan()? {
                            Symbol::Keyword => match parser.lexer.token() {
                                b"n" => true,
                                b"f" => false,
                                _ => return Err(Error::InvalidXref),
                            },
                            _ => return Err(Error::InvalidXref),
                        };
                        let number = (first + i) as u32;
                        if in_use && number != 0 {
                            pending.push(Reference::at_position(
                                ObjectId::new(number, generation as u16),
                                position as u64,
                            ));
                        }
                    }
                }
                _ => return Err(Error::InvalidXref),
            }
        }

        if parser.scan()? != Symbol::BeginDictionary {
            return Err(Error::InvalidXref);
        }
        let dict = parser.parse_dictionary_body(None)?;
        let mut trailer = Trailer::new_classic(dict);
        for reference in pending {
            let id = reference.id();
            if trailer.xref_table.contains(id) {
                warn!("duplicate xref entry for {} ignored", id);
                continue;
            }
            trailer.xref_table.add(reference)?;
        }
        Ok(trailer)
    }

    fn read_stream_section(&self, offset: usize) -> Result<Trailer> {
        let mut parser = Parser::at(self.buf, offset);
        let (_, object) = parser.parse_indirect_object(None).map_err(|e| {
            debug!("not a cross-reference stream at {}: {}", offset, e);
            Error::InvalidXref
        })?;
        let stream = match &object {
            Object::Stream(s) if s.dict.type_of() == Some("XRef") => s,
            _ => return Err(Error::InvalidXref),
        };

        let widths = Self::read_widths(&stream.dict)?;
        let entry_size: usize = widths.iter().sum();
        if entry_size == 0 {
            return Err(Error::InvalidXref);
        }

        let size = stream.dict.get_integer("Size").map_err(|_| Error::InvalidXref)?;
        let index_ranges = Self::read_index_ranges(&stream.dict, size)?;
        let data = stream.decoded_data()?;

        let mut xref_stream = CrossReferenceStream::with_widths(widths);
        let mut trailer_dict = stream.dict.clone();
        // The payload metadata describes the file we read, not the one
        // we will write.
        trailer_dict.remove("Length");
        trailer_dict.remove("Filter");
        trailer_dict.remove("DecodeParms");
        let mut pending: Vec<Reference> = Vec::new();

        let mut cursor = 0usize;
        for (first, count) in index_ranges {
            for i in 0..count {
                if cursor + entry_size > data.len() {
                    return Err(Error::InvalidXref);
                }
                let entry = &data[cursor..cursor + entry_size];
                cursor += entry_size;

                let entry_type = if widths[0] == 0 {
                    1
                } else {
                    read_field(&entry[..widths[0]])
                };
                let field2 = read_field(&entry[widths[0]..widths[0] + widths[1]]);
                let field3 = read_field(&entry[widths[0] + widths[1]..]);
                let number = first + i;

                let entry_type = match entry_type {
                    0 => XrefEntryType::Free,
                    1 => XrefEntryType::InFile,
                    2 => XrefEntryType::InStream,
                    other => {
                        return Err(Error::ParseError {
                            offset,
                            reason: format!("invalid xref entry type {}", other),
                        })
                    }
                };
                xref_stream.entries.push(CrossReferenceStreamEntry {
                    entry_type,
                    field2,
                    field3: field3 as u32,
                    object_number: number,
                });

                match entry_type {
                    XrefEntryType::Free => {}
                    XrefEntryType::InFile => {
                        if number != 0 {
                            pending.push(Reference::at_position(
                                ObjectId::new(number, field3 as u16),
                                field2,
                            ));
                        }
                    }
                    XrefEntryType::InStream => {
                        pending.push(Reference::in_stream(
                            ObjectId::new(number, 0),
                            field2 as u32,
                            field3 as u16,
                        ));
                    }
                }
            }
        }

        let mut trailer = Trailer::new_stream(trailer_dict, xref_stream);
        for reference in pending {
            let id = reference.id();
            if trailer.xref_table.contains(id) {
                warn!("duplicate xref stream entry for {} ignored", id);
                continue;
            }
            trailer.xref_table.add(reference)?;
        }
        Ok(trailer)
    }

    fn read_widths(dict: &Dictionary) -> Result<[usize; 3]> {
        let w = dict
            .get_array("W")
            .map_err(|_| Error::InvalidXref)?
            .ok_or(Error::InvalidXref)?;
        if w.len() != 3 {
            return Err(Error::InvalidXref);
        }
        let mut widths = [0usize; 3];
        for (slot, obj) in widths.iter_mut().zip(w) {
            let value = obj.as_i64().ok_or(Error::InvalidXref)?;
            if !(0..=8).contains(&value) {
                return Err(Error::InvalidXref);
            }
            *slot = value as usize;
        }
        Ok(widths)
    }

    fn read_index_ranges(dict: &Dictionary, size: i64) -> Result<Vec<(u32, u32)>> {
        match dict.get_array("Index").map_err(|_| Error::InvalidXref)? {
            None => Ok(vec![(0, size.max(0) as u32)]),
            Some(index) => {
                if index.len() % 2 != 0 {
                    return Err(Error::InvalidXref);
                }
                let mut ranges = Vec::with_capacity(index.len() / 2);
                for pair in index.chunks_exact(2) {
                    let first = pair[0].as_i64().ok_or(Error::InvalidXref)?;
                    let count = pair[1].as_i64().ok_or(Error::InvalidXref)?;
                    if first < 0 || count < 0 {
                        return Err(Error::InvalidXref);
                    }
                    ranges.push((first as u32, count as u32));
                }
                Ok(ranges)
            }
        }
    }
}

/// Big-endian field of 0..=8 bytes.
fn read_field(data: &[u8]) -> u64 {
    if data.is_empty() {
        0
    } else {
        BigEndian::read_uint(data, data.len())
    }
}

/// Open a document from a byte buffer.
///
/// This is the single entry point behind `Document::open`; every parse
/// failure unwinds here.
pub(crate) fn load_document(buf: Vec<u8>, mut options: OpenOptions) -> Result<Document> {
    let (version, binary_mark, _header_pos) = parse_header(&buf)?;
    let startxref = find_startxref(&buf)?;
    if startxref as usize >= buf.len() {
        return Err(Error::InvalidXref);
    }

    let loader = Loader { buf: &buf };
    let mut trailers = loader.read_chain(startxref)?;
    debug!(
        "read {} trailer generation(s), startxref {}",
        trailers.len(),
        startxref
    );

    // Directory of top-level positions, newest generation winning, for
    // indirect /Length resolution during object loading.
    let mut positions: HashMap<u32, u64> = HashMap::new();
    for trailer in trailers.iter().rev() {
        for (id, reference) in trailer.xref_table.iter() {
            if reference.containing_stream.is_none() {
                positions.insert(id.number, reference.position);
            }
        }
    }

    // Password round before any object decoding beyond the xref proper.
    let password_validity =
        validate_encryption(&buf, &trailers, &positions, &mut options)?;

    load_top_level_objects(&buf, &mut trailers, &positions, options.security_handler.as_deref())?;
    load_compressed_objects(&mut trailers)?;

    let has_signature = detect_signature(&trailers);
    let linearization = detect_linearization(&mut trailers);

    let state = classify_chain(&trailers, has_signature, linearization.is_some());
    debug!("trailer chain state: {:?}", state);

    let mut document = Document::from_parse(
        version,
        binary_mark,
        trailers,
        options.mode,
        options.security_handler,
        password_validity,
        linearization,
        has_signature,
        bytes::Bytes::from(buf),
        startxref,
    );

    match state {
        ChainState::Flatten => document.flatten(),
        ChainState::PreserveSigned => document.mark_read_only(),
        ChainState::MergeLinearizedOverlay => {
            merge_top_overlay(document.trailers_mut())?;
            document.drop_linearization();
        }
        ChainState::Keep => {}
    }

    document.fix_references(document.trailer_count() > 1)?;
    Ok(document)
}

/// Run the password validation round when `/Encrypt` is present.
fn validate_encryption(
    buf: &[u8],
    trailers: &[Trailer],
    positions: &HashMap<u32, u64>,
    options: &mut OpenOptions,
) -> Result<Option<PasswordValidity>> {
    let newest = &trailers[0];
    let encrypt = match newest.dict.get("Encrypt") {
        None => return Ok(None),
        Some(obj) => obj.clone(),
    };
    let encrypt_dict = match encrypt {
        Object::Dictionary(d) => d,
        Object::Reference(id) => {
            let position = *positions
                .get(&id.number)
                .ok_or(Error::ObjectNotFound(id.number, id.generation))?;
            let (_, value) = Parser::at(buf, position as usize).parse_indirect_object(None)?;
            match value {
                Object::Dictionary(d) => d,
                other => {
                    return Err(Error::InvalidObjectType {
                        expected: "Dictionary",
                        found: other.type_name(),
                    })
                }
            }
        }
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Dictionary",
                found: other.type_name(),
            })
        }
    };

    let handler = options
        .security_handler
        .as_mut()
        .ok_or(Error::PasswordRequired)?;

    let mut validity = handler.validate_password(&encrypt_dict, &options.password)?;
    let wants_retry = matches!(validity, PasswordValidity::Invalid)
        || (matches!(validity, PasswordValidity::UserPassword)
            && options.mode == OpenMode::Modify);
    if wants_retry {
        if let Some(provider) = options.password_provider.as_mut() {
            if let Some(password) = provider() {
                validity = handler.validate_password(&encrypt_dict, &password)?;
            }
        }
    }
    if matches!(validity, PasswordValidity::Invalid) {
        return Err(Error::InvalidPassword);
    }
    Ok(Some(validity))
}

/// Load every unbound top-level reference by seeking to its position.
fn load_top_level_objects(
    buf: &[u8],
    trailers: &mut [Trailer],
    positions: &HashMap<u32, u64>,
    handler: Option<&dyn crate::security::SecurityHandler>,
) -> Result<()> {
    let resolver = |id: ObjectId| -> Option<u64> {
        let position = positions.get(&id.number)?;
        let (_, value) = Parser::at(buf, *position as usize)
            .parse_indirect_object(None)
            .ok()?;
        value.as_i64().and_then(|v| u64::try_from(v).ok())
    };

    for trailer in trailers.iter_mut() {
        for id in trailer.xref_table.all_references() {
            let reference = match trailer.xref_table.lookup_mut(id) {
                Some(r) => r,
                None => continue,
            };
            if reference.containing_stream.is_some() || reference.is_bound() {
                continue;
            }
            let position = reference.position as usize;
            let mut parser = Parser::at(buf, position);
            let (parsed_id, mut value) = parser.parse_indirect_object(Some(&resolver))?;
            if parsed_id.number != id.number {
                return Err(Error::ParseError {
                    offset: position,
                    reason: format!(
                        "object header {} does not match xref entry {}",
                        parsed_id, id
                    ),
                });
            }
            if parsed_id.generation != id.generation {
                warn!(
                    "generation mismatch for object {}: header says {}",
                    id, parsed_id.generation
                );
            }
            if let Some(handler) = handler {
                handler.decrypt_object(id, &mut value)?;
            }
            reference.set_value(value);
        }
    }
    Ok(())
}

/// Decompress type-2 entries through their object streams.
fn load_compressed_objects(trailers: &mut [Trailer]) -> Result<()> {
    // Every container number any type-2 entry names.
    let mut needed: HashSet<u32> = HashSet::new();
    for trailer in trailers.iter() {
        for (_, reference) in trailer.xref_table.iter() {
            if let Some(location) = reference.containing_stream {
                needed.insert(location.stream_number);
            }
        }
    }
    if needed.is_empty() {
        return Ok(());
    }

    // Parse each container once, registering it with the trailer whose
    // table owns the container's entry.
    let mut containers: HashMap<u32, ObjectStream> = HashMap::new();
    for number in needed {
        let mut parsed = None;
        for trailer in trailers.iter() {
            let candidate = trailer
                .xref_table
                .lookup_number(number)
                .and_then(|r| r.value())
                .and_then(Object::as_stream);
            if let Some(stream) = candidate {
                parsed = Some(ObjectStream::parse(number, stream)?);
                break;
            }
        }
        match parsed {
            Some(stream) => {
                for trailer in trailers.iter_mut() {
                    if trailer.xref_table.lookup_number(number).is_some() {
                        trailer.object_streams.push(stream.clone());
                        break;
                    }
                }
                containers.insert(number, stream);
            }
            None => warn!("object stream {} referenced but not present", number),
        }
    }

    for trailer in trailers.iter_mut() {
        for id in trailer.xref_table.all_references() {
            let reference = match trailer.xref_table.lookup_mut(id) {
                Some(r) => r,
                None => continue,
            };
            let location = match reference.containing_stream {
                Some(l) if !reference.is_bound() => l,
                _ => continue,
            };
            let container = match containers.get(&location.stream_number) {
                Some(c) => c,
                None => continue,
            };
            let (member_id, value) = container.parse_member(location.index as usize)?;
            if member_id.number != id.number {
                warn!(
                    "object stream {} header lists {} at index {}, xref expected {}",
                    location.stream_number, member_id, location.index, id
                );
            }
            reference.set_value(value);
        }
    }
    Ok(())
}

/// Whether any loaded object is a signature dictionary.
fn detect_signature(trailers: &[Trailer]) -> bool {
    for trailer in trailers {
        for (_, reference) in trailer.xref_table.iter() {
            if let Some(dict) = reference.value().and_then(Object::as_dict) {
                if dict.type_of() == Some("Sig") {
                    return true;
                }
            }
        }
    }
    false
}

/// Record linearization parameters when the first-page dictionary is
/// present, and flag the trailer generation carrying it.
fn detect_linearization(trailers: &mut [Trailer]) -> Option<Linearization> {
    let mut found: Option<(usize, ObjectId, u64, u64, u64)> = None;
    'outer: for (index, trailer) in trailers.iter().enumerate() {
        for (id, reference) in trailer.xref_table.iter() {
            let dict = match reference.value().and_then(Object::as_dict) {
                Some(d) if d.contains("Linearized") => d,
                _ => continue,
            };
            let file_length = dict.get_integer("L").unwrap_or(0).max(0) as u64;
            let hints = dict.get_array("H").ok().flatten().unwrap_or(&[]);
            let hint_offset = hints.first().and_then(Object::as_i64).unwrap_or(0) as u64;
            let hint_length = hints.get(1).and_then(Object::as_i64).unwrap_or(0) as u64;
            found = Some((index, *id, file_length, hint_offset, hint_length));
            break 'outer;
        }
    }

    let (index, object, file_length, hint_offset, hint_length) = found?;
    trailers[index].is_linearized_hint = true;

    // The hint stream is named by byte position, not by reference.
    let mut hint_stream = None;
    for trailer in trailers.iter() {
        for (id, reference) in trailer.xref_table.iter() {
            if reference.containing_stream.is_none() && reference.position == hint_offset {
                hint_stream = Some(*id);
            }
        }
    }

    Some(Linearization {
        object,
        file_length,
        hint_offset,
        hint_length,
        hint_stream,
    })
}
