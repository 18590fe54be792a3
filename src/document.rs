//! The document: root container of the object graph.
//!
//! A [`Document`] owns the trailer chain, resolves references against
//! the latest generation of each object, gates mutation on the signed
//! read-only state, and synthesizes the shared dead object for
//! references that resolve nowhere.

use std::collections::HashMap;

use bytes::Bytes;
use log::{debug, warn};

use crate::error::{Error, Result};
use crate::object::{visit_references, visit_references_mut, Dictionary, Object, ObjectId};
use crate::parser;
use crate::security::{PasswordProvider, PasswordValidity, SecurityHandler};
use crate::trailer::Trailer;
use crate::writer::{self, SaveOptions};
use crate::xref::{CrossReferenceTable, Reference};

/// PDF file version, from the `%PDF-M.m` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
}

impl Version {
    /// PDF 1.4, the oldest version this writer emits classic tables for.
    pub const V1_4: Version = Version { major: 1, minor: 4 };
    /// PDF 1.5, the first with cross-reference and object streams.
    pub const V1_5: Version = Version { major: 1, minor: 5 };
    /// PDF 1.7.
    pub const V1_7: Version = Version { major: 1, minor: 7 };
}

impl Default for Version {
    fn default() -> Self {
        Version::V1_7
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// How a document was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Read access only
    ReadOnly,
    /// Read-write; saving regenerates `/ID` and stamps `/ModDate`
    #[default]
    Modify,
    /// Importing objects into another document
    Import,
}

/// Options for [`Document::open_with`].
#[derive(Default)]
pub struct OpenOptions {
    /// Open mode
    pub mode: OpenMode,
    /// Password tried against `/Encrypt` (empty by default)
    pub password: Vec<u8>,
    /// External security handler for encrypted files
    pub security_handler: Option<Box<dyn SecurityHandler>>,
    /// Callback for another password when the first one fails
    pub password_provider: Option<PasswordProvider>,
}

impl OpenOptions {
    /// Options for a given mode, everything else default.
    pub fn with_mode(mode: OpenMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }
}

/// Linearization parameters recorded at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Linearization {
    /// Id of the linearization dictionary
    pub object: ObjectId,
    /// `/L`: total file length the dictionary claims
    pub file_length: u64,
    /// `/H`: byte offset of the hint stream
    pub hint_offset: u64,
    /// `/H`: length of the hint stream
    pub hint_length: u64,
    /// The hint stream, looked up by position in the xref
    pub hint_stream: Option<ObjectId>,
}

/// Root container owning the trailer chain and the object graph.
pub struct Document {
    /// File version emitted in the header
    pub version: Version,
    /// Binary comment bytes after the header line
    pub binary_mark: Option<[u8; 4]>,
    trailers: Vec<Trailer>,
    flattened: bool,
    open_mode: OpenMode,
    security_handler: Option<Box<dyn SecurityHandler>>,
    password_validity: Option<PasswordValidity>,
    linearization: Option<Linearization>,
    has_signature: bool,
    original: Option<Bytes>,
    startxref: u64,
    dead_object: Option<ObjectId>,
    dead_object_count: u32,
}

impl Document {
    /// Create an empty document with one writable trailer generation.
    pub fn new(version: Version) -> Self {
        Self {
            version,
            binary_mark: None,
            trailers: vec![Trailer::new_classic(Dictionary::new())],
            flattened: true,
            open_mode: OpenMode::Modify,
            security_handler: None,
            password_validity: None,
            linearization: None,
            has_signature: false,
            original: None,
            startxref: 0,
            dead_object: None,
            dead_object_count: 0,
        }
    }

    /// Open a document from bytes with default options.
    pub fn open(buf: Vec<u8>) -> Result<Self> {
        parser::load_document(buf, OpenOptions::default())
    }

    /// Open a document from bytes.
    pub fn open_with(buf: Vec<u8>, options: OpenOptions) -> Result<Self> {
        parser::load_document(buf, options)
    }

    /// Open a document from a file path.
    pub fn open_file(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Self::open(std::fs::read(path)?)
    }

    /// Assemble a document from parse results.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_parse(
        version: Version,
        binary_mark: Option<[u8; 4]>,
        trailers: Vec<Trailer>,
        open_mode: OpenMode,
        security_handler: Option<Box<dyn SecurityHandler>>,
        password_validity: Option<PasswordValidity>,
        linearization: Option<Linearization>,
        has_signature: bool,
        original: Bytes,
        startxref: u64,
    ) -> Self {
        Self {
            version,
            binary_mark,
            trailers,
            flattened: false,
            open_mode,
            security_handler,
            password_validity,
            linearization,
            has_signature,
            original: Some(original),
            startxref,
            dead_object: None,
            dead_object_count: 0,
        }
    }

    /// The newest (working) trailer generation.
    pub fn trailer(&self) -> &Trailer {
        &self.trailers[0]
    }

    /// Mutable access to the working trailer.
    pub fn trailer_mut(&mut self) -> &mut Trailer {
        &mut self.trailers[0]
    }

    /// All trailer generations, newest first.
    pub fn trailers(&self) -> &[Trailer] {
        &self.trailers
    }

    pub(crate) fn trailers_mut(&mut self) -> &mut Vec<Trailer> {
        &mut self.trailers
    }

    /// Number of trailer generations in the chain.
    pub fn trailer_count(&self) -> usize {
        self.trailers.len()
    }

    /// The working cross-reference table.
    ///
    /// After flattening this is the single trailer's table.
    pub fn current_table(&self) -> &CrossReferenceTable {
        &self.trailers[0].xref_table
    }

    /// Whether the chain was collapsed to a single generation.
    pub fn is_flattened(&self) -> bool {
        self.flattened
    }

    /// Whether any `/Type /Sig` dictionary was found at open.
    pub fn has_signature(&self) -> bool {
        self.has_signature
    }

    /// Whether the working generation rejects mutation.
    pub fn is_read_only(&self) -> bool {
        self.trailers[0].is_read_only
    }

    /// The open mode.
    pub fn open_mode(&self) -> OpenMode {
        self.open_mode
    }

    /// Password validation outcome, when `/Encrypt` was present.
    pub fn password_validity(&self) -> Option<PasswordValidity> {
        self.password_validity
    }

    /// Linearization parameters, when the file was linearized.
    pub fn linearization(&self) -> Option<&Linearization> {
        self.linearization.as_ref()
    }

    /// Raw bytes of the file as imported.
    pub fn original_bytes(&self) -> Option<&Bytes> {
        self.original.as_ref()
    }

    /// Byte offset of the newest cross-reference section as imported.
    pub(crate) fn imported_startxref(&self) -> u64 {
        self.startxref
    }

    /// The document catalog reference, from the working trailer `/Root`.
    pub fn catalog(&self) -> Result<ObjectId> {
        for trailer in &self.trailers {
            if let Some(root) = trailer.root() {
                return Ok(root);
            }
        }
        Err(Error::ObjectNotFound(0, 0))
    }

    /// Times the dead object stood in for an unresolvable reference.
    pub fn dead_object_count(&self) -> u32 {
        self.dead_object_count
    }

    pub(crate) fn take_security_handler(&mut self) -> Option<Box<dyn SecurityHandler>> {
        self.security_handler.take()
    }

    pub(crate) fn restore_security_handler(&mut self, handler: Option<Box<dyn SecurityHandler>>) {
        self.security_handler = handler;
    }

    /// Install a security handler (programmatic construction).
    pub fn set_security_handler(&mut self, handler: Box<dyn SecurityHandler>) {
        self.security_handler = Some(handler);
    }

    /// Collapse the chain bookkeeping to a single generation.
    pub(crate) fn flatten(&mut self) {
        debug_assert_eq!(self.trailers.len(), 1);
        self.trailers[0].dict.remove("Prev");
        self.flattened = true;
    }

    /// Mark every generation read-only (signed documents).
    pub(crate) fn mark_read_only(&mut self) {
        for trailer in &mut self.trailers {
            trailer.is_read_only = true;
        }
    }

    /// Remove the linearization dictionary; the saved file is no longer
    /// linearized.
    pub(crate) fn drop_linearization(&mut self) {
        if let Some(info) = self.linearization.take() {
            for trailer in &mut self.trailers {
                if trailer.xref_table.remove(info.object).is_some() {
                    debug!("dropped linearization dictionary {}", info.object);
                    break;
                }
            }
            for trailer in &mut self.trailers {
                trailer.is_linearized_hint = false;
            }
        }
    }

    /// Highest object number across all generations.
    pub fn max_object_number(&self) -> u32 {
        self.trailers
            .iter()
            .map(|t| t.xref_table.max_object_number())
            .max()
            .unwrap_or(0)
    }

    /// Latest generation per object number, newest trailer winning.
    ///
    /// Table iteration is ascending in (number, generation), so within
    /// one generation the highest generation lands last; walking the
    /// chain oldest-first lets the newest trailer overwrite the rest.
    pub fn latest_generations(&self) -> HashMap<u32, u16> {
        let mut latest = HashMap::new();
        for trailer in self.trailers.iter().rev() {
            for (id, _) in trailer.xref_table.iter() {
                latest.insert(id.number, id.generation);
            }
        }
        latest
    }

    /// Ids of the latest version of every object, ordered by number.
    pub fn latest_references(&self) -> Vec<ObjectId> {
        let mut ids: Vec<ObjectId> = self
            .latest_generations()
            .into_iter()
            .map(|(number, generation)| ObjectId::new(number, generation))
            .collect();
        ids.sort();
        ids
    }

    /// Resolve a reference to its object, newest generation first.
    pub fn resolve(&self, id: ObjectId) -> Option<&Object> {
        for trailer in &self.trailers {
            if let Some(reference) = trailer.xref_table.lookup(id) {
                if let Some(value) = reference.value() {
                    return Some(value);
                }
            }
        }
        for trailer in &self.trailers {
            if let Some(reference) = trailer.xref_table.lookup_number(id.number) {
                if let Some(value) = reference.value() {
                    return Some(value);
                }
            }
        }
        None
    }

    /// Visit the latest version of every object mutably.
    ///
    /// Security handlers transform string and stream bytes through
    /// this during [`crate::security::SecurityHandler::encrypt_document`].
    pub fn for_each_object_mut<F: FnMut(ObjectId, &mut Object)>(&mut self, mut f: F) {
        for id in self.latest_references() {
            if let Some(reference) = self.lookup_reference_mut(id) {
                if let Some(value) = reference.value_mut() {
                    f(id, value);
                }
            }
        }
    }

    /// The reference record behind an id, newest trailer first.
    pub(crate) fn lookup_reference_mut(&mut self, id: ObjectId) -> Option<&mut Reference> {
        let index = self
            .trailers
            .iter()
            .position(|t| t.xref_table.contains(id))?;
        self.trailers[index].xref_table.lookup_mut(id)
    }

    /// Dereference, substituting the shared dead object when nothing
    /// backs the reference.
    pub fn dereference(&mut self, id: ObjectId) -> Result<&Object> {
        let target = if self.resolve(id).is_some() {
            id
        } else {
            warn!("reference {} resolves nowhere, substituting dead object", id);
            self.ensure_dead_object()?
        };
        self.resolve(target)
            .ok_or(Error::ObjectNotFound(id.number, id.generation))
    }

    /// The shared dead object, created on first use.
    fn ensure_dead_object(&mut self) -> Result<ObjectId> {
        self.dead_object_count += 1;
        let count = self.dead_object_count;
        match self.dead_object {
            Some(id) => {
                if let Some(reference) = self.lookup_reference_mut(id) {
                    if let Some(dict) = reference.value_mut().and_then(Object::as_dict_mut) {
                        dict.set("DeadObjectCount", Object::from_i64(i64::from(count)));
                    }
                }
                Ok(id)
            }
            None => {
                let mut dict = Dictionary::new();
                dict.set("DeadObjectCount", Object::from_i64(i64::from(count)));
                // Graph repair, not user mutation: bypass the open-mode
                // gate so broken read-only files still open.
                let id = ObjectId::new(self.max_object_number() + 1, 0);
                let mut reference = Reference::new(id);
                reference.set_value(Object::Dictionary(dict));
                self.trailers[0].xref_table.add(reference)?;
                self.dead_object = Some(id);
                Ok(id)
            }
        }
    }

    fn check_writable(&self) -> Result<()> {
        if self.trailers[0].is_read_only || self.open_mode == OpenMode::ReadOnly {
            Err(Error::ReadOnly)
        } else {
            Ok(())
        }
    }

    /// Register a value as a new indirect object.
    ///
    /// The number is allocated above every generation's maximum so a
    /// removed object's slot is never reused within a session.
    pub fn add_object(&mut self, value: Object) -> Result<ObjectId> {
        self.check_writable()?;
        let id = ObjectId::new(self.max_object_number() + 1, 0);
        let mut reference = Reference::new(id);
        reference.set_value(value);
        self.trailers[0].xref_table.add(reference)?;
        Ok(id)
    }

    /// Replace the value of an existing object.
    ///
    /// On an unflattened chain the replacement shadows the old version
    /// in the working generation, which is what the next incremental
    /// save writes out.
    pub fn set_object(&mut self, id: ObjectId, value: Object) -> Result<()> {
        self.check_writable()?;
        if let Some(reference) = self.trailers[0].xref_table.lookup_mut(id) {
            reference.set_value(value);
            return Ok(());
        }
        if self.trailers.iter().any(|t| t.xref_table.contains(id)) {
            let mut reference = Reference::new(id);
            reference.set_value(value);
            self.trailers[0].xref_table.add(reference)?;
            return Ok(());
        }
        Err(Error::ObjectNotFound(id.number, id.generation))
    }

    /// Destroy an object. Missing ids are a no-op.
    pub fn remove_object(&mut self, id: ObjectId) -> Result<()> {
        self.check_writable()?;
        for trailer in &mut self.trailers {
            if trailer.is_read_only {
                continue;
            }
            trailer.xref_table.remove(id);
        }
        Ok(())
    }

    /// Drop every object not reachable from the trailer roots.
    ///
    /// Returns the number of objects removed.
    pub fn compact(&mut self) -> usize {
        let mut roots = Vec::new();
        for (_, value) in self.trailers[0].dict.iter() {
            visit_references(value, &mut |id| roots.push(id));
        }
        self.trailers[0].xref_table.compact(&roots)
    }

    /// Renumber the working table 1..N and rewrite every reference,
    /// including the trailer dictionary's.
    ///
    /// Only a flattened document can renumber; a live `/Prev` chain
    /// pins imported numbers.
    pub fn renumber(&mut self) -> Result<()> {
        if !self.flattened || self.trailers.len() != 1 {
            return Err(Error::Unsupported(
                "renumber requires a flattened trailer chain".to_string(),
            ));
        }
        self.check_writable()?;
        let mapping = self.trailers[0].xref_table.renumber()?;
        let trailer = &mut self.trailers[0];
        for (_, value) in trailer.dict.iter_mut() {
            visit_references_mut(value, &mut |id| {
                if let Some(new) = mapping.get(id) {
                    *id = *new;
                }
            });
        }
        if let Some(dead) = self.dead_object {
            self.dead_object = mapping.get(&dead).copied();
        }
        Ok(())
    }

    /// Re-bind nested references against live objects.
    ///
    /// With `force_document`, stale references are rewritten to the
    /// document-wide latest version of their object number. References
    /// that resolve nowhere are rewired to the shared dead object.
    pub fn fix_references(&mut self, force_document: bool) -> Result<()> {
        if self.is_read_only() {
            return Ok(());
        }
        let latest = self.latest_generations();
        let latest_arg = if force_document { Some(&latest) } else { None };

        let mut unresolved = Vec::new();
        for trailer in &mut self.trailers {
            unresolved.extend(trailer.xref_table.fix_xrefs(latest_arg));
        }
        // A reference another generation backs is not dead.
        unresolved.retain(|id| !latest.contains_key(&id.number));
        unresolved.sort();
        unresolved.dedup();

        if unresolved.is_empty() {
            return Ok(());
        }

        debug!(
            "rewiring {} unresolvable reference(s) to the dead object",
            unresolved.len()
        );
        let dead = self.ensure_dead_object()?;
        self.dead_object_count += unresolved.len() as u32 - 1;
        let count = self.dead_object_count;
        for trailer in &mut self.trailers {
            for (_, reference) in trailer.xref_table.iter_mut() {
                if let Some(value) = reference.value_mut() {
                    visit_references_mut(value, &mut |id| {
                        if unresolved.binary_search(id).is_ok() {
                            *id = dead;
                        }
                    });
                }
            }
        }
        if let Some(reference) = self.lookup_reference_mut(dead) {
            if let Some(dict) = reference.value_mut().and_then(Object::as_dict_mut) {
                dict.set("DeadObjectCount", Object::from_i64(i64::from(count)));
            }
        }
        Ok(())
    }

    /// Save with default options.
    pub fn save(&mut self, sink: &mut dyn std::io::Write) -> Result<()> {
        self.save_with(sink, &SaveOptions::default())
    }

    /// Save with explicit options.
    pub fn save_with(
        &mut self,
        sink: &mut dyn std::io::Write,
        options: &SaveOptions,
    ) -> Result<()> {
        writer::write_document(self, sink, options)
    }

    /// Save to a file path with default options.
    pub fn save_to(&mut self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let mut file = std::fs::File::create(path)?;
        self.save(&mut file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Stream;

    fn catalog_document() -> Document {
        let mut document = Document::new(Version::V1_7);
        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name("Pages".to_string()));
        pages.set("Count", Object::Integer(0));
        pages.set("Kids", Object::Array(Vec::new()));
        let pages_id = document.add_object(Object::Dictionary(pages)).unwrap();

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name("Catalog".to_string()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = document.add_object(Object::Dictionary(catalog)).unwrap();

        let trailer = document.trailer_mut();
        trailer.dict.set("Root", Object::Reference(catalog_id));
        document
    }

    #[test]
    fn test_new_document_allocates_sequentially() {
        let mut document = Document::new(Version::V1_7);
        let a = document.add_object(Object::Integer(1)).unwrap();
        let b = document.add_object(Object::Integer(2)).unwrap();
        assert_eq!(a, ObjectId::new(1, 0));
        assert_eq!(b, ObjectId::new(2, 0));
        assert_eq!(document.max_object_number(), 2);
    }

    #[test]
    fn test_removed_slot_not_reused() {
        let mut document = Document::new(Version::V1_7);
        let a = document.add_object(Object::Integer(1)).unwrap();
        document.remove_object(a).unwrap();
        let b = document.add_object(Object::Integer(2)).unwrap();
        assert_eq!(b, ObjectId::new(2, 0));
    }

    #[test]
    fn test_resolve_and_set() {
        let mut document = catalog_document();
        let catalog_id = document.catalog().unwrap();
        assert_eq!(
            document
                .resolve(catalog_id)
                .unwrap()
                .as_dict()
                .unwrap()
                .type_of(),
            Some("Catalog")
        );
        document
            .set_object(catalog_id, Object::Integer(9))
            .unwrap();
        assert_eq!(document.resolve(catalog_id), Some(&Object::Integer(9)));
    }

    #[test]
    fn test_dereference_dead_object() {
        let mut document = Document::new(Version::V1_7);
        let ghost = ObjectId::new(41, 0);
        let value = document.dereference(ghost).unwrap().clone();
        let dict = value.as_dict().unwrap();
        assert_eq!(dict.get_integer("DeadObjectCount").unwrap(), 1);
        assert_eq!(document.dead_object_count(), 1);
    }

    #[test]
    fn test_read_only_rejects_mutation() {
        let mut document = Document::new(Version::V1_7);
        document.mark_read_only();
        assert!(matches!(
            document.add_object(Object::Null),
            Err(Error::ReadOnly)
        ));
    }

    #[test]
    fn test_compact_removes_orphans() {
        let mut document = catalog_document();
        document
            .add_object(Object::Stream(Stream::new(
                Dictionary::new(),
                b"orphan".to_vec(),
            )))
            .unwrap();
        let removed = document.compact();
        assert_eq!(removed, 1);
        // Catalog and pages survive.
        assert_eq!(document.current_table().len(), 2);
    }

    #[test]
    fn test_renumber_updates_trailer_dict() {
        let mut document = catalog_document();
        // Open a gap.
        let filler = document.add_object(Object::Null).unwrap();
        document.remove_object(filler).unwrap();
        let extra = document.add_object(Object::Integer(5)).unwrap();
        assert_eq!(extra.number, 4);

        document.renumber().unwrap();
        let ids = document.current_table().all_references();
        assert_eq!(
            ids,
            vec![
                ObjectId::new(1, 0),
                ObjectId::new(2, 0),
                ObjectId::new(3, 0)
            ]
        );
        // Trailer /Root still points at the catalog.
        let root = document.catalog().unwrap();
        assert_eq!(
            document
                .resolve(root)
                .unwrap()
                .as_dict()
                .unwrap()
                .type_of(),
            Some("Catalog")
        );
    }

    #[test]
    fn test_fix_references_rewires_to_dead_object() {
        let mut document = catalog_document();
        let mut dict = Dictionary::new();
        dict.set("Broken", Object::Reference(ObjectId::new(77, 0)));
        let holder = document.add_object(Object::Dictionary(dict)).unwrap();

        document.fix_references(false).unwrap();

        let holder_dict = document.resolve(holder).unwrap().as_dict().unwrap();
        let target = holder_dict.get_reference("Broken").unwrap().unwrap();
        let dead = document.resolve(target).unwrap().as_dict().unwrap();
        assert!(dead.contains("DeadObjectCount"));
    }

    #[test]
    fn test_version_display() {
        assert_eq!(Version::V1_5.to_string(), "1.5");
    }
}
