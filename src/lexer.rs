//! PDF lexer (tokenizer).
//!
//! A [`Lexer`] is positioned over the document's byte buffer and hands
//! out one [`Symbol`] per call to [`Lexer::scan_next_token`]. The raw
//! bytes of the last token and its numeric value are kept on the lexer;
//! the parser combines symbols into objects.
//!
//! # PDF Syntax Overview
//!
//! - Numbers: integers (42, +17, -123) and reals (3.14, -.002)
//! - Strings: literal ((Hello)) and hexadecimal (<48656C6C6F>)
//! - Names: identifiers starting with / (/Type, /Pages)
//! - Keywords: true, false, null, obj, endobj, stream, endstream,
//!   xref, trailer, startxref, R
//! - Delimiters: `[`, `]`, `<<`, `>>`, `(`, `)`, `{`, `}`, `/`, `%`
//!
//! Strings prefixed with a UTF-16 BOM are classified as Unicode
//! variants; hex strings remember whether the source used uppercase
//! digits so the writer can reproduce the spelling.

use nom::{
    bytes::complete::take_while,
    character::complete::{char, digit1, one_of},
    combinator::opt,
    sequence::preceded,
    IResult,
};

use crate::error::{Error, Result};
use crate::object::StringEncoding;

/// Token classes recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// Nothing scanned yet
    None,
    /// `%` comment (outside the header)
    Comment,
    /// Signed 32-bit integer
    Integer,
    /// Integer that only fits unsigned 32 bits
    UInteger,
    /// Real number (or integer wider than 32 bits)
    Real,
    /// Literal string
    String,
    /// Hexadecimal string
    HexString,
    /// Literal string with a UTF-16 BOM
    UnicodeString,
    /// Hexadecimal string with a UTF-16 BOM
    UnicodeHexString,
    /// Name (`/...`)
    Name,
    /// Unclassified keyword (content operators, `{`, `}`)
    Keyword,
    /// `true` or `false`
    Boolean,
    /// `null`
    Null,
    /// Reference marker `R`
    R,
    /// `obj`
    Obj,
    /// `endobj`
    EndObj,
    /// `stream`
    BeginStream,
    /// `endstream`
    EndStream,
    /// `xref`
    XRef,
    /// `trailer`
    Trailer,
    /// `startxref`
    StartXRef,
    /// `[`
    BeginArray,
    /// `]`
    EndArray,
    /// `<<`
    BeginDictionary,
    /// `>>`
    EndDictionary,
    /// End of input
    Eof,
}

/// PDF whitespace per the classic set, plus bytes 11 and 173 which
/// appear in legacy files.
pub fn is_whitespace(byte: u8) -> bool {
    matches!(byte, 0x00 | 0x09 | 0x0A | 0x0B | 0x0C | 0x0D | 0x20 | 0xAD)
}

/// PDF delimiter characters.
pub fn is_delimiter(byte: u8) -> bool {
    matches!(
        byte,
        b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
    )
}

fn ends_token(byte: u8) -> bool {
    is_whitespace(byte) || is_delimiter(byte)
}

/// Recognize an optionally signed number span; nom-style so the span
/// arithmetic stays in one place.
///
/// Returns the remaining input and whether a decimal point was seen.
fn number_span(input: &[u8]) -> IResult<&[u8], bool> {
    let (rest, _sign) = opt(one_of::<_, _, nom::error::Error<&[u8]>>("+-"))(input)?;
    let (rest, int_part) = opt(digit1)(rest)?;
    let (rest, frac_part) = opt(preceded(char('.'), opt(digit1)))(rest)?;
    if int_part.is_none() && frac_part.is_none() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }
    Ok((rest, frac_part.is_some()))
}

/// Recognize a name body after `/`.
fn name_span(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while(|c: u8| !ends_token(c))(input)
}

/// Recognize a keyword body (alphabetic run).
fn keyword_span(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while(|c: u8| c.is_ascii_alphabetic())(input)
}

/// Decode `#XX` escape sequences in a name body.
///
/// Invalid sequences keep the `#` literal, matching lenient readers.
fn decode_name_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == b'#' {
            let decoded = raw
                .get(i + 1..i + 3)
                .and_then(|hex| std::str::from_utf8(hex).ok())
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                result.push(byte);
                i += 3;
                continue;
            }
        }
        result.push(raw[i]);
        i += 1;
    }
    result
}

/// Byte-level tokenizer over a positioned buffer.
pub struct Lexer<'a> {
    buf: &'a [u8],
    pos: usize,
    token_start: usize,
    symbol: Symbol,
    token: Vec<u8>,
    integer_value: i64,
    real_value: f64,
    boolean_value: bool,
    string_encoding: StringEncoding,
    hex_uppercase: bool,
    stream_eol_ok: bool,
}

impl<'a> Lexer<'a> {
    /// Create a lexer over a byte buffer, positioned at the start.
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            token_start: 0,
            symbol: Symbol::None,
            token: Vec::new(),
            integer_value: 0,
            real_value: 0.0,
            boolean_value: false,
            string_encoding: StringEncoding::Raw,
            hex_uppercase: false,
            stream_eol_ok: false,
        }
    }

    /// Total buffer length.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current byte position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Seek to an absolute byte position.
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos.min(self.buf.len());
    }

    /// Byte position where the last token started.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// The last token's classification.
    pub fn symbol(&self) -> Symbol {
        self.symbol
    }

    /// Raw bytes of the last token.
    ///
    /// For strings these are the assembled (escape-decoded) bytes; for
    /// names the `#XX`-decoded body without the slash.
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    /// Last token as text (lossy for non-UTF-8 bytes).
    pub fn token_string(&self) -> String {
        String::from_utf8_lossy(&self.token).into_owned()
    }

    /// Numeric value of the last integer-class token (Integer or
    /// UInteger), widened to i64.
    pub fn integer_value(&self) -> i64 {
        self.integer_value
    }

    /// Numeric value of the last UInteger token.
    pub fn uinteger_value(&self) -> u32 {
        self.integer_value as u32
    }

    /// Numeric value of the last Real token.
    pub fn real_value(&self) -> f64 {
        self.real_value
    }

    /// Value of the last Boolean token.
    pub fn boolean_value(&self) -> bool {
        self.boolean_value
    }

    /// Encoding hint of the last string token (from the BOM test).
    pub fn string_encoding(&self) -> StringEncoding {
        self.string_encoding
    }

    /// Whether the last hex string used any uppercase digit.
    pub fn hex_uppercase(&self) -> bool {
        self.hex_uppercase
    }

    /// Whether the last `stream` keyword was followed by a legal
    /// payload delimiter (LF or CR-LF).
    pub fn stream_eol_ok(&self) -> bool {
        self.stream_eol_ok
    }

    /// Byte at the current position, without consuming it.
    pub fn peek_byte(&self) -> Option<u8> {
        self.peek()
    }

    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn peek_at(&self, ahead: usize) -> Option<u8> {
        self.buf.get(self.pos + ahead).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.peek() {
            if is_whitespace(byte) {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    /// Advance a nom recognizer over the remaining input.
    fn advance_with<T>(
        &mut self,
        recognizer: impl Fn(&'a [u8]) -> IResult<&'a [u8], T>,
    ) -> Option<(T, &'a [u8])> {
        let buf = self.buf;
        let input = &buf[self.pos..];
        let (rest, value) = recognizer(input).ok()?;
        let consumed = input.len() - rest.len();
        let span = &input[..consumed];
        self.pos += consumed;
        Some((value, span))
    }

    /// Scan the next token and classify it.
    pub fn scan_next_token(&mut self) -> Result<Symbol> {
        self.skip_whitespace();
        self.token_start = self.pos;
        self.token.clear();
        self.string_encoding = StringEncoding::Raw;

        let byte = match self.peek() {
            None => {
                self.symbol = Symbol::Eof;
                return Ok(Symbol::Eof);
            }
            Some(b) => b,
        };

        let symbol = match byte {
            b'%' => self.scan_comment(),
            b'/' => self.scan_name()?,
            b'+' | b'-' | b'.' | b'0'..=b'9' => self.scan_number()?,
            b'(' => self.scan_literal_string()?,
            b'<' => {
                if self.peek_at(1) == Some(b'<') {
                    self.pos += 2;
                    Symbol::BeginDictionary
                } else {
                    self.scan_hex_string()?
                }
            }
            b'>' => {
                if self.peek_at(1) == Some(b'>') {
                    self.pos += 2;
                    Symbol::EndDictionary
                } else {
                    return Err(self.malformed("unpaired '>'"));
                }
            }
            b'[' => {
                self.pos += 1;
                Symbol::BeginArray
            }
            b']' => {
                self.pos += 1;
                Symbol::EndArray
            }
            b'{' | b'}' => {
                self.token.push(byte);
                self.pos += 1;
                Symbol::Keyword
            }
            b if b.is_ascii_alphabetic() => self.scan_keyword()?,
            other => {
                return Err(Error::ParseError {
                    offset: self.pos,
                    reason: format!("unexpected byte 0x{:02X}", other),
                })
            }
        };

        self.symbol = symbol;
        Ok(symbol)
    }

    /// Read `length` raw bytes from the current position.
    ///
    /// Used for stream payload extraction; the position advances past
    /// the returned slice.
    pub fn read_stream(&mut self, length: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(length)
            .filter(|&e| e <= self.buf.len())
            .ok_or(Error::UnexpectedEof)?;
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn malformed(&self, reason: &str) -> Error {
        Error::ParseError {
            offset: self.token_start,
            reason: reason.to_string(),
        }
    }

    fn scan_comment(&mut self) -> Symbol {
        // Consume '%' and everything up to the line end.
        self.pos += 1;
        while let Some(byte) = self.peek() {
            if byte == b'\r' || byte == b'\n' {
                break;
            }
            self.token.push(byte);
            self.pos += 1;
        }
        Symbol::Comment
    }

    fn scan_name(&mut self) -> Result<Symbol> {
        self.pos += 1; // consume '/'
        let (_, span) = self
            .advance_with(name_span)
            .ok_or_else(|| self.malformed("invalid name"))?;
        self.token = decode_name_escapes(span);
        Ok(Symbol::Name)
    }

    fn scan_number(&mut self) -> Result<Symbol> {
        let (has_fraction, span) = self
            .advance_with(number_span)
            .ok_or_else(|| self.malformed("invalid number"))?;
        // A second decimal point would start another number token;
        // reject it here rather than hand back nonsense.
        if self.peek() == Some(b'.') {
            return Err(self.malformed("number with more than one decimal point"));
        }
        self.token.extend_from_slice(span);
        let text = std::str::from_utf8(span)
            .map_err(|_| self.malformed("non-ASCII number"))?;

        if has_fraction {
            self.real_value = text
                .parse::<f64>()
                .map_err(|_| self.malformed("unparseable real"))?;
            return Ok(Symbol::Real);
        }

        let digits = text.strip_prefix('+').unwrap_or(text);
        match digits.parse::<i64>() {
            Ok(value) => {
                if i32::try_from(value).is_ok() {
                    self.integer_value = value;
                    Ok(Symbol::Integer)
                } else if u32::try_from(value).is_ok() {
                    self.integer_value = value;
                    Ok(Symbol::UInteger)
                } else {
                    self.real_value = value as f64;
                    Ok(Symbol::Real)
                }
            }
            // Wider than i64: degrade to a real.
            Err(_) => {
                self.real_value = digits
                    .parse::<f64>()
                    .map_err(|_| self.malformed("unparseable number"))?;
                Ok(Symbol::Real)
            }
        }
    }

    fn scan_literal_string(&mut self) -> Result<Symbol> {
        self.pos += 1; // consume '('
        let mut depth = 1usize;

        loop {
            let byte = self.bump().ok_or(Error::UnexpectedEof)?;
            match byte {
                b'(' => {
                    depth += 1;
                    self.token.push(byte);
                }
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                    self.token.push(byte);
                }
                b'\\' => self.scan_string_escape()?,
                b'\r' => {
                    // EOL inside a string is recorded as a single LF.
                    if self.peek() == Some(b'\n') {
                        self.pos += 1;
                    }
                    self.token.push(b'\n');
                }
                other => self.token.push(other),
            }
        }

        Ok(self.classify_string_bom(false))
    }

    fn scan_string_escape(&mut self) -> Result<()> {
        let byte = self.bump().ok_or(Error::UnexpectedEof)?;
        match byte {
            b'n' => self.token.push(b'\n'),
            b'r' => self.token.push(b'\r'),
            b't' => self.token.push(b'\t'),
            b'b' => self.token.push(0x08),
            b'f' => self.token.push(0x0C),
            b'(' => self.token.push(b'('),
            b')' => self.token.push(b')'),
            b'\\' => self.token.push(b'\\'),
            b'\r' => {
                // Line continuation: swallow CR or CRLF.
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
            }
            b'\n' => {}
            b'0'..=b'7' => {
                let mut value = u16::from(byte - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(d @ b'0'..=b'7') => {
                            value = value * 8 + u16::from(d - b'0');
                            self.pos += 1;
                        }
                        _ => break,
                    }
                }
                self.token.push((value & 0xFF) as u8);
            }
            // Unknown escape: the backslash is dropped, the char kept.
            other => self.token.push(other),
        }
        Ok(())
    }

    fn scan_hex_string(&mut self) -> Result<Symbol> {
        self.pos += 1; // consume '<'
        self.hex_uppercase = false;
        let mut high: Option<u8> = None;

        loop {
            let byte = self.bump().ok_or(Error::UnexpectedEof)?;
            let digit = match byte {
                b'>' => break,
                b'0'..=b'9' => byte - b'0',
                b'a'..=b'f' => byte - b'a' + 10,
                b'A'..=b'F' => {
                    self.hex_uppercase = true;
                    byte - b'A' + 10
                }
                b if is_whitespace(b) => continue,
                other => {
                    return Err(Error::ParseError {
                        offset: self.pos - 1,
                        reason: format!("invalid hex digit 0x{:02X}", other),
                    })
                }
            };
            match high.take() {
                None => high = Some(digit),
                Some(h) => self.token.push((h << 4) | digit),
            }
        }
        // A dangling final digit is implicitly zero-padded.
        if let Some(h) = high {
            self.token.push(h << 4);
        }

        Ok(self.classify_string_bom(true))
    }

    /// Apply the BOM test to the assembled string bytes.
    fn classify_string_bom(&mut self, hex: bool) -> Symbol {
        if self.token.starts_with(&[0xFE, 0xFF]) {
            self.string_encoding = StringEncoding::Utf16Be;
        } else if self.token.starts_with(&[0xFF, 0xFE]) {
            self.string_encoding = StringEncoding::Utf16Le;
        } else {
            self.string_encoding = StringEncoding::Raw;
            return if hex { Symbol::HexString } else { Symbol::String };
        }
        if hex {
            Symbol::UnicodeHexString
        } else {
            Symbol::UnicodeString
        }
    }

    fn scan_keyword(&mut self) -> Result<Symbol> {
        let (_, span) = self
            .advance_with(keyword_span)
            .ok_or_else(|| self.malformed("invalid keyword"))?;
        self.token.extend_from_slice(span);

        let symbol = match span {
            b"obj" => Symbol::Obj,
            b"endobj" => Symbol::EndObj,
            b"stream" => {
                self.consume_stream_eol();
                Symbol::BeginStream
            }
            b"endstream" => Symbol::EndStream,
            b"xref" => Symbol::XRef,
            b"trailer" => Symbol::Trailer,
            b"startxref" => Symbol::StartXRef,
            b"true" => {
                self.boolean_value = true;
                Symbol::Boolean
            }
            b"false" => {
                self.boolean_value = false;
                Symbol::Boolean
            }
            b"null" => Symbol::Null,
            b"R" => Symbol::R,
            _ => Symbol::Keyword,
        };
        Ok(symbol)
    }

    /// Position past the EOL after the `stream` keyword.
    ///
    /// Only LF or CR-LF delimit the payload. A bare CR is left in place
    /// so the parser can enforce the rule.
    fn consume_stream_eol(&mut self) {
        self.stream_eol_ok = match self.peek() {
            Some(b'\r') if self.peek_at(1) == Some(b'\n') => {
                self.pos += 2;
                true
            }
            Some(b'\n') => {
                self.pos += 1;
                true
            }
            _ => false,
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(input: &[u8]) -> Vec<Symbol> {
        let mut lexer = Lexer::new(input);
        let mut symbols = Vec::new();
        loop {
            let sym = lexer.scan_next_token().unwrap();
            if sym == Symbol::Eof {
                break;
            }
            symbols.push(sym);
        }
        symbols
    }

    #[test]
    fn test_parse_positive_integer() {
        let mut lexer = Lexer::new(b"+123");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Integer);
        assert_eq!(lexer.integer_value(), 123);
    }

    #[test]
    fn test_parse_negative_real() {
        let mut lexer = Lexer::new(b"-0.25");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Real);
        assert_eq!(lexer.real_value(), -0.25);
    }

    #[test]
    fn test_parse_uinteger_beyond_i32() {
        let mut lexer = Lexer::new(b"2996984786");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::UInteger);
        assert_eq!(lexer.uinteger_value(), 2_996_984_786);
        assert_eq!(lexer.integer_value(), 2_996_984_786);
    }

    #[test]
    fn test_parse_wide_integer_degrades_to_real() {
        let mut lexer = Lexer::new(b"264584027963392");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Real);
        assert_eq!(lexer.real_value(), 264_584_027_963_392.0);
    }

    #[test]
    fn test_parse_real_starting_with_dot() {
        let mut lexer = Lexer::new(b"-.002");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Real);
        assert_eq!(lexer.real_value(), -0.002);
    }

    #[test]
    fn test_double_decimal_point_rejected() {
        let mut lexer = Lexer::new(b"1.2.3");
        assert!(lexer.scan_next_token().is_err());
    }

    #[test]
    fn test_literal_string_nested_parens() {
        let mut lexer = Lexer::new(b"(Hello (nested) World)");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::String);
        assert_eq!(lexer.token(), b"Hello (nested) World");
    }

    #[test]
    fn test_empty_literal_string() {
        let mut lexer = Lexer::new(b"()");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::String);
        assert!(lexer.token().is_empty());
    }

    #[test]
    fn test_literal_string_escapes() {
        let mut lexer = Lexer::new(b"(a\\tb\\(c\\)\\\\d\\101)");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::String);
        assert_eq!(lexer.token(), b"a\tb(c)\\dA");
    }

    #[test]
    fn test_literal_string_line_continuation() {
        let mut lexer = Lexer::new(b"(one\\\r\ntwo)");
        lexer.scan_next_token().unwrap();
        assert_eq!(lexer.token(), b"onetwo");
    }

    #[test]
    fn test_literal_string_eol_normalized() {
        let mut lexer = Lexer::new(b"(a\r\nb\rc)");
        lexer.scan_next_token().unwrap();
        assert_eq!(lexer.token(), b"a\nb\nc");
    }

    #[test]
    fn test_octal_escape_overflow_masked() {
        let mut lexer = Lexer::new(b"(\\777)");
        lexer.scan_next_token().unwrap();
        assert_eq!(lexer.token(), &[0xFF]);
    }

    #[test]
    fn test_hex_string_uppercase_tracked() {
        let mut lexer = Lexer::new(b"<4A 4B>");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::HexString);
        assert_eq!(lexer.token(), &[0x4A, 0x4B]);
        assert!(lexer.hex_uppercase());

        let mut lexer = Lexer::new(b"<4a 4b>");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::HexString);
        assert!(!lexer.hex_uppercase());
    }

    #[test]
    fn test_hex_string_odd_digit_padded() {
        let mut lexer = Lexer::new(b"<4A4>");
        lexer.scan_next_token().unwrap();
        assert_eq!(lexer.token(), &[0x4A, 0x40]);
    }

    #[test]
    fn test_unicode_string_bom() {
        let mut lexer = Lexer::new(b"(\xFE\xFF\x00H)");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::UnicodeString);
        assert_eq!(lexer.string_encoding(), StringEncoding::Utf16Be);
    }

    #[test]
    fn test_unicode_hex_string_bom_le() {
        let mut lexer = Lexer::new(b"<FFFE4800>");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::UnicodeHexString);
        assert_eq!(lexer.string_encoding(), StringEncoding::Utf16Le);
    }

    #[test]
    fn test_empty_unicode_body() {
        let mut lexer = Lexer::new(b"<FEFF>");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::UnicodeHexString);
        assert_eq!(lexer.token(), &[0xFE, 0xFF]);
    }

    #[test]
    fn test_name_with_hex_escape() {
        let mut lexer = Lexer::new(b"/A#20B");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Name);
        assert_eq!(lexer.token(), b"A B");
    }

    #[test]
    fn test_name_with_invalid_escape_kept() {
        let mut lexer = Lexer::new(b"/A#ZZ");
        lexer.scan_next_token().unwrap();
        assert_eq!(lexer.token(), b"A#ZZ");
    }

    #[test]
    fn test_keywords() {
        let symbols = scan_all(b"1 0 obj << /T [1] >> endobj stream\nendstream xref trailer startxref true null R");
        assert_eq!(
            symbols,
            vec![
                Symbol::Integer,
                Symbol::Integer,
                Symbol::Obj,
                Symbol::BeginDictionary,
                Symbol::Name,
                Symbol::BeginArray,
                Symbol::Integer,
                Symbol::EndArray,
                Symbol::EndDictionary,
                Symbol::EndObj,
                Symbol::BeginStream,
                Symbol::EndStream,
                Symbol::XRef,
                Symbol::Trailer,
                Symbol::StartXRef,
                Symbol::Boolean,
                Symbol::Null,
                Symbol::R,
            ]
        );
    }

    #[test]
    fn test_unknown_keyword() {
        let mut lexer = Lexer::new(b"Tj");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Keyword);
        assert_eq!(lexer.token(), b"Tj");
    }

    #[test]
    fn test_comment_symbol() {
        let mut lexer = Lexer::new(b"% a comment\n42");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Comment);
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Integer);
        assert_eq!(lexer.integer_value(), 42);
    }

    #[test]
    fn test_legacy_whitespace_bytes() {
        let mut lexer = Lexer::new(b"\x0B\xAD 7");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Integer);
        assert_eq!(lexer.integer_value(), 7);
    }

    #[test]
    fn test_stream_eol_lf_consumed() {
        let mut lexer = Lexer::new(b"stream\nDATA");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::BeginStream);
        assert_eq!(lexer.read_stream(4).unwrap(), b"DATA");
    }

    #[test]
    fn test_stream_eol_crlf_consumed() {
        let mut lexer = Lexer::new(b"stream\r\nDATA");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::BeginStream);
        assert_eq!(lexer.read_stream(4).unwrap(), b"DATA");
    }

    #[test]
    fn test_stream_bare_cr_left_in_place() {
        let mut lexer = Lexer::new(b"stream\rDATA");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::BeginStream);
        // The parser sees the CR and can reject the file.
        assert!(!lexer.stream_eol_ok());
        assert_eq!(lexer.read_stream(1).unwrap(), b"\r");
    }

    #[test]
    fn test_stream_eol_flag_set_for_lf() {
        let mut lexer = Lexer::new(b"stream\nD");
        lexer.scan_next_token().unwrap();
        assert!(lexer.stream_eol_ok());
    }

    #[test]
    fn test_read_stream_past_eof() {
        let mut lexer = Lexer::new(b"ab");
        assert!(matches!(lexer.read_stream(3), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn test_set_position_backtracks() {
        let mut lexer = Lexer::new(b"1 2 R");
        let start = lexer.position();
        lexer.scan_next_token().unwrap();
        lexer.scan_next_token().unwrap();
        lexer.set_position(start);
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Integer);
        assert_eq!(lexer.integer_value(), 1);
    }

    #[test]
    fn test_dict_vs_hex_disambiguation() {
        let mut lexer = Lexer::new(b"<< /A <4142> >>");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::BeginDictionary);
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Name);
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::HexString);
        assert_eq!(lexer.token(), b"AB");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::EndDictionary);
    }

    #[test]
    fn test_eof() {
        let mut lexer = Lexer::new(b"   ");
        assert_eq!(lexer.scan_next_token().unwrap(), Symbol::Eof);
    }
}
