//! Error types for the PDF structural core.
//!
//! All parse errors unwind to the `Document::open` entry point; no
//! partial document is returned on failure.

/// Result type alias for PDF core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during PDF parsing, mutation and writing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where the error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Unexpected symbol while assembling an object
    #[error("Unexpected symbol at byte {offset}: expected {expected}")]
    UnexpectedSymbol {
        /// Byte offset where the symbol started
        offset: usize,
        /// What the parser was looking for
        expected: &'static str,
    },

    /// Missing or structurally damaged cross-reference section
    #[error("Invalid cross-reference table")]
    InvalidXref,

    /// Stream payload does not match its /Length entry
    #[error("Stream length mismatch for object {0} {1} R")]
    StreamLength(u32, u16),

    /// Referenced object not found in any cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: &'static str,
        /// Actual object type found
        found: &'static str,
    },

    /// Unexpected end of file
    #[error("End of file reached unexpectedly")]
    UnexpectedEof,

    /// Unsupported stream filter
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Unsupported predictor function in /DecodeParms
    #[error("Unsupported predictor: {0}")]
    UnsupportedPredictor(i64),

    /// Unsupported feature (generic)
    #[error("Unsupported feature: {0}")]
    Unsupported(String),

    /// Duplicate ObjectID added to a cross-reference table
    #[error("Duplicate object in cross-reference table: {0} {1} R")]
    DuplicateObject(u32, u16),

    /// Renumbering found a reference to an object that no table holds
    #[error("Dangling reference during renumber: {0} {1} R")]
    DanglingReference(u32, u16),

    /// A cross-reference stream field does not fit in 4 bytes
    #[error("Cross-reference stream field overflow: {0} exceeds 4-byte width")]
    XrefWidthOverflow(u64),

    /// Attempted mutation of a read-only (signed) trailer generation
    #[error("Document is read-only: it carries a digital signature")]
    ReadOnly,

    /// The file is encrypted and no password was supplied
    #[error("Password required: document carries an /Encrypt dictionary")]
    PasswordRequired,

    /// The supplied password did not validate
    #[error("Invalid password")]
    InvalidPassword,

    /// The operation requires the owner password
    #[error("Owner password required")]
    OwnerPasswordRequired,

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// IO error from the underlying byte source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = Error::ParseError {
            offset: 1234,
            reason: "invalid token".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1234"));
        assert!(msg.contains("invalid token"));
    }

    #[test]
    fn test_object_not_found_message() {
        let err = Error::ObjectNotFound(10, 0);
        assert!(format!("{}", err).contains("10 0 R"));
    }

    #[test]
    fn test_duplicate_object_message() {
        let err = Error::DuplicateObject(7, 1);
        assert!(format!("{}", err).contains("7 1 R"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
