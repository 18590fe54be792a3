//! Security handler hook.
//!
//! The core owns no cryptography. When a document carries `/Encrypt`,
//! an installed [`SecurityHandler`] is asked to validate the password
//! after the cross-reference machinery is read and before any object
//! decoding; during save it transforms the whole document's string and
//! stream bytes once, after every object is positioned and before any
//! object body is written. The protocol behind those calls lives
//! outside this crate.

use crate::document::Document;
use crate::error::Result;
use crate::object::{Dictionary, Object, ObjectId};

/// Outcome of a password validation round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordValidity {
    /// The password opens nothing
    Invalid,
    /// The password grants user access
    UserPassword,
    /// The password grants owner access
    OwnerPassword,
}

/// Callback asked for another password when validation fails (or when
/// Modify mode holds only a user password).
pub type PasswordProvider = Box<dyn FnMut() -> Option<Vec<u8>>>;

/// Transform hooks implemented by an external security handler.
pub trait SecurityHandler {
    /// Validate a password against the document's `/Encrypt` dictionary.
    fn validate_password(
        &mut self,
        encrypt: &Dictionary,
        password: &[u8],
    ) -> Result<PasswordValidity>;

    /// Decrypt one object's string and stream bytes in place. The
    /// parser calls this per object as it loads.
    fn decrypt_object(&self, id: ObjectId, object: &mut Object) -> Result<()>;

    /// Encrypt the document's string and stream bytes in place.
    ///
    /// The writer invokes this exactly once per save, after every
    /// object's start position is captured and before any object body
    /// is emitted. [`Document::for_each_object_mut`] visits the latest
    /// version of every object for the transform.
    fn encrypt_document(&self, document: &mut Document) -> Result<()>;
}
