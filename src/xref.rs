//! Cross-reference table.
//!
//! Each trailer generation owns one [`CrossReferenceTable`] mapping
//! object ids to [`Reference`] records. A reference carries the byte
//! position of its object (or its slot within an object stream) and the
//! lazily bound value; dereferencing is a table lookup.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, HashSet};

use log::warn;

use crate::error::{Error, Result};
use crate::object::{visit_references, visit_references_mut, Object, ObjectId};

/// Location of a compressed object inside an object stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedLocation {
    /// Object number of the containing `/Type /ObjStm`
    pub stream_number: u32,
    /// Index of the object within the stream's header
    pub index: u16,
}

/// One cross-reference record: id, position, and the lazily bound value.
///
/// The id is immutable once the reference is in a table; only a global
/// renumber changes it. `containing_stream` is set for objects living
/// inside an object stream and empty for top-level objects.
#[derive(Debug, Clone)]
pub struct Reference {
    id: ObjectId,
    /// Byte position of the object in the file (0 until positioned)
    pub position: u64,
    /// Set when the object lives inside an object stream
    pub containing_stream: Option<CompressedLocation>,
    value: Option<Object>,
}

impl Reference {
    /// Create an unbound reference. Number 0 means "allocate on add".
    pub fn new(id: ObjectId) -> Self {
        Self {
            id,
            position: 0,
            containing_stream: None,
            value: None,
        }
    }

    /// Create a reference to a top-level object at a byte position.
    pub fn at_position(id: ObjectId, position: u64) -> Self {
        Self {
            id,
            position,
            containing_stream: None,
            value: None,
        }
    }

    /// Create a reference to an object inside an object stream.
    pub fn in_stream(id: ObjectId, stream_number: u32, index: u16) -> Self {
        Self {
            id,
            position: 0,
            containing_stream: Some(CompressedLocation {
                stream_number,
                index,
            }),
            value: None,
        }
    }

    /// The reference's object id.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    /// The bound value, if dereferenced already.
    pub fn value(&self) -> Option<&Object> {
        self.value.as_ref()
    }

    /// Mutable access to the bound value.
    pub fn value_mut(&mut self) -> Option<&mut Object> {
        self.value.as_mut()
    }

    /// Bind the resolved value. Idempotent by construction: rebinding
    /// replaces the previous value.
    pub fn set_value(&mut self, value: Object) {
        self.value = Some(value);
    }

    /// Whether the value has been bound.
    pub fn is_bound(&self) -> bool {
        self.value.is_some()
    }
}

/// Mapping ObjectID → Reference for one trailer generation.
#[derive(Debug, Clone, Default)]
pub struct CrossReferenceTable {
    entries: BTreeMap<ObjectId, Reference>,
    max_object_number: u32,
    snapshot: RefCell<Option<Vec<ObjectId>>>,
}

impl CrossReferenceTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Highest object number ever registered. Monotonically
    /// non-decreasing; removals do not lower it.
    pub fn max_object_number(&self) -> u32 {
        self.max_object_number
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert a reference; allocates the next free number when the
    /// reference comes in with number 0.
    ///
    /// Returns the id the reference ended up under.
    pub fn add(&mut self, mut reference: Reference) -> Result<ObjectId> {
        if reference.id.number == 0 {
            reference.id = ObjectId::new(self.max_object_number + 1, 0);
        }
        let id = reference.id;
        if self.entries.contains_key(&id) {
            return Err(Error::DuplicateObject(id.number, id.generation));
        }
        self.max_object_number = self.max_object_number.max(id.number);
        self.entries.insert(id, reference);
        self.invalidate();
        Ok(id)
    }

    /// Register a value as a new indirect object, allocating its number.
    pub fn add_object(&mut self, value: Object) -> Result<ObjectId> {
        let mut reference = Reference::new(ObjectId::new(0, 0));
        reference.set_value(value);
        self.add(reference)
    }

    /// Remove an entry. Missing ids are a no-op.
    pub fn remove(&mut self, id: ObjectId) -> Option<Reference> {
        let removed = self.entries.remove(&id);
        if removed.is_some() {
            self.invalidate();
        }
        removed
    }

    /// Whether the exact id is present.
    pub fn contains(&self, id: ObjectId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Exact lookup.
    pub fn lookup(&self, id: ObjectId) -> Option<&Reference> {
        self.entries.get(&id)
    }

    /// Exact lookup, mutable.
    pub fn lookup_mut(&mut self, id: ObjectId) -> Option<&mut Reference> {
        self.entries.get_mut(&id)
    }

    /// Highest-generation entry for an object number.
    pub fn lookup_number(&self, number: u32) -> Option<&Reference> {
        self.entries
            .range(ObjectId::new(number, 0)..=ObjectId::new(number, u16::MAX))
            .next_back()
            .map(|(_, r)| r)
    }

    /// Highest-generation entry for an object number, mutable.
    pub fn lookup_number_mut(&mut self, number: u32) -> Option<&mut Reference> {
        self.entries
            .range_mut(ObjectId::new(number, 0)..=ObjectId::new(number, u16::MAX))
            .next_back()
            .map(|(_, r)| r)
    }

    /// Snapshot of all ids, ordered by (object number asc, generation
    /// desc). Cached until the next mutation.
    pub fn all_references(&self) -> Vec<ObjectId> {
        if let Some(cached) = self.snapshot.borrow().as_ref() {
            return cached.clone();
        }
        let mut ids: Vec<ObjectId> = self.entries.keys().copied().collect();
        ids.sort_by(|a, b| {
            a.number
                .cmp(&b.number)
                .then(b.generation.cmp(&a.generation))
        });
        *self.snapshot.borrow_mut() = Some(ids.clone());
        ids
    }

    /// Iterate entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&ObjectId, &Reference)> {
        self.entries.iter()
    }

    /// Iterate entries mutably in id order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&ObjectId, &mut Reference)> {
        self.entries.iter_mut().map(|(k, v)| (k, v))
    }

    fn invalidate(&mut self) {
        self.snapshot.get_mut().take();
    }

    /// Retain only entries transitively reachable from `roots`.
    ///
    /// Returns the number of entries removed.
    pub fn compact(&mut self, roots: &[ObjectId]) -> usize {
        let mut reachable: HashSet<ObjectId> = HashSet::new();
        let mut stack: Vec<ObjectId> = Vec::new();

        for &root in roots {
            if let Some(id) = self.resolve_id(root) {
                stack.push(id);
            }
        }
        while let Some(id) = stack.pop() {
            if !reachable.insert(id) {
                continue;
            }
            let reference = match self.entries.get(&id) {
                Some(r) => r,
                None => continue,
            };
            if let Some(value) = reference.value() {
                visit_references(value, &mut |nested| {
                    if let Some(target) = self.resolve_id(nested) {
                        if !reachable.contains(&target) {
                            stack.push(target);
                        }
                    }
                });
            }
        }

        let before = self.entries.len();
        self.entries.retain(|id, _| reachable.contains(id));
        self.invalidate();
        before - self.entries.len()
    }

    /// Resolve an id to the one actually stored: exact match first,
    /// then the highest generation for the number.
    fn resolve_id(&self, id: ObjectId) -> Option<ObjectId> {
        if self.entries.contains_key(&id) {
            return Some(id);
        }
        self.lookup_number(id.number).map(|r| r.id())
    }

    /// Renumber all entries 1..N, preserving `all_references` order.
    ///
    /// Every nested reference is remapped; a nested reference to an
    /// object no table entry backs is an integrity error. Returns the
    /// old-to-new mapping so callers can rewrite references held
    /// outside the table (the trailer dictionary).
    pub fn renumber(&mut self) -> Result<HashMap<ObjectId, ObjectId>> {
        let order = self.all_references();
        let mut mapping: HashMap<ObjectId, ObjectId> = HashMap::with_capacity(order.len());
        for (index, old) in order.iter().enumerate() {
            mapping.insert(*old, ObjectId::new(index as u32 + 1, 0));
        }
        // Numbers sharing a slot across generations collapse onto the
        // highest generation; map the bare number as a fallback too.
        let mut number_mapping: HashMap<u32, ObjectId> = HashMap::new();
        for old in order.iter().rev() {
            number_mapping.insert(old.number, mapping[old]);
        }

        let mut remapped = BTreeMap::new();
        for old in order {
            let mut reference = self.entries.remove(&old).expect("snapshot id present");
            let new_id = mapping[&old];
            let mut dangling: Option<ObjectId> = None;
            if let Some(value) = reference.value_mut() {
                visit_references_mut(value, &mut |nested| {
                    if let Some(new) = mapping.get(nested) {
                        *nested = *new;
                    } else if let Some(new) = number_mapping.get(&nested.number) {
                        *nested = *new;
                    } else if dangling.is_none() {
                        dangling = Some(*nested);
                    }
                });
            }
            if let Some(id) = dangling {
                return Err(Error::DanglingReference(id.number, id.generation));
            }
            reference.id = new_id;
            remapped.insert(new_id, reference);
        }

        self.max_object_number = remapped.len() as u32;
        self.entries = remapped;
        self.invalidate();
        Ok(mapping)
    }

    /// Re-bind nested references to live objects.
    ///
    /// With `latest` set (the document-wide number → generation
    /// directory), a reference whose exact id is stale is rewritten to
    /// the latest version of its object number. Returns the ids that
    /// resolved nowhere; the document substitutes its dead object for
    /// those.
    pub fn fix_xrefs(&mut self, latest: Option<&HashMap<u32, u16>>) -> Vec<ObjectId> {
        let known: HashSet<ObjectId> = self.entries.keys().copied().collect();
        let local_latest: HashMap<u32, u16> =
            self.entries.keys().fold(HashMap::new(), |mut acc, id| {
                let slot = acc.entry(id.number).or_insert(id.generation);
                *slot = (*slot).max(id.generation);
                acc
            });

        let mut unresolved: Vec<ObjectId> = Vec::new();
        for reference in self.entries.values_mut() {
            if let Some(value) = reference.value_mut() {
                visit_references_mut(value, &mut |nested| {
                    if known.contains(nested) {
                        return;
                    }
                    if let Some(map) = latest {
                        if let Some(&generation) = map.get(&nested.number) {
                            nested.generation = generation;
                            return;
                        }
                    }
                    if let Some(&generation) = local_latest.get(&nested.number) {
                        nested.generation = generation;
                        return;
                    }
                    if !unresolved.contains(nested) {
                        unresolved.push(*nested);
                    }
                });
            }
        }
        if !unresolved.is_empty() {
            warn!(
                "{} unresolved reference(s) after fix-up, first: {}",
                unresolved.len(),
                unresolved[0]
            );
        }
        unresolved
    }
}
