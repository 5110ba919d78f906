//! Typed object cache of a node.
//!
//! Objects are partitioned by `ObjectType`; only registered types are cached.
//! Within a type, objects are kept in id order, which is also insertion order
//! for objects created here since ids are allocated monotonically.
//!
//! A `Cursor` borrows the store, so `shrink` (which needs `&mut`) cannot run
//! while any cursor is open: eviction never pulls an entry out from under an
//! iteration.

use robot::{Error, Object, ObjectId, ObjectType, Payload, Result};
use std::collections::btree_map::BTreeMap;
use std::collections::HashMap;
use std::ops::Bound::{Excluded, Unbounded};

/// Capacity of a type registered without an explicit one.
pub const DEFAULT_TYPE_CAPACITY: usize = 100_000;

#[derive(Debug)]
struct TypeTable {
    objects: BTreeMap<ObjectId, Object>,
    capacity: usize,
    next_id: ObjectId,
}

#[derive(Debug, Default)]
pub struct ObjectStore {
    tables: HashMap<ObjectType, TypeTable>,
}

impl ObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables caching of `object_type` with at most `capacity` entries.
    ///
    /// Re-registering keeps the cached objects and only changes the capacity.
    pub fn register_type(&mut self, object_type: ObjectType, capacity: usize) {
        self.tables
            .entry(object_type)
            .and_modify(|table| table.capacity = capacity)
            .or_insert_with(|| TypeTable {
                objects: BTreeMap::new(),
                capacity,
                next_id: 1,
            });
    }

    pub fn is_registered(&self, object_type: ObjectType) -> bool {
        self.tables.contains_key(&object_type)
    }

    /// Allocates a new blank object of `object_type`.
    ///
    /// # Returns
    ///
    /// * `Ok(&mut Object)` to fill in.
    /// * `Err(Error::ResourceUnavailable)` if the type is unregistered or full.
    pub fn create_object(&mut self, object_type: ObjectType) -> Result<&mut Object> {
        let table = self.table_mut(object_type)?;
        if table.objects.len() >= table.capacity {
            return Err(full(object_type, table.capacity));
        }
        let id = allocate_id(object_type, table)?;
        Ok(table
            .objects
            .entry(id)
            .or_insert_with(|| Object::new(id, Payload::blank(object_type))))
    }

    /// Inserts or replaces an object received from elsewhere.
    ///
    /// An object with id `0` gets the next free id.
    pub fn put(&mut self, object: Object) -> Result<ObjectId> {
        let object_type = object.get_type();
        let table = self.table_mut(object_type)?;

        let id = match object.get_id() {
            0 => allocate_id(object_type, table)?,
            id => id,
        };
        if !table.objects.contains_key(&id) && table.objects.len() >= table.capacity {
            return Err(full(object_type, table.capacity));
        }
        table.next_id = table.next_id.max(id.saturating_add(1));
        table
            .objects
            .insert(id, Object::new(id, object.get_payload().clone()));
        Ok(id)
    }

    pub fn get_object(&self, object_type: ObjectType, id: ObjectId) -> Option<&Object> {
        self.tables.get(&object_type)?.objects.get(&id)
    }

    pub fn get_object_mut(&mut self, object_type: ObjectType, id: ObjectId) -> Option<&mut Object> {
        self.tables.get_mut(&object_type)?.objects.get_mut(&id)
    }

    pub fn get_object_count(&self, object_type: ObjectType) -> usize {
        self.tables
            .get(&object_type)
            .map_or(0, |table| table.objects.len())
    }

    /// Evicts the oldest objects of `object_type` until at most `target_count` remain.
    ///
    /// # Returns
    ///
    /// The number of evicted objects.
    pub fn shrink(&mut self, object_type: ObjectType, target_count: usize) -> Result<usize> {
        let table = self.table_mut(object_type)?;
        let mut evicted = 0;
        while table.objects.len() > target_count {
            if table.objects.pop_first().is_none() {
                break;
            }
            evicted += 1;
        }
        Ok(evicted)
    }

    /// Opens a cursor over `object_type`.
    ///
    /// `offset` is applied by `Cursor::objects` and `Cursor::robjects`: that
    /// many objects are skipped from the start (or the end).
    pub fn create_cursor(&self, object_type: ObjectType, offset: usize) -> Result<Cursor<'_>> {
        let table = self
            .tables
            .get(&object_type)
            .ok_or_else(|| unregistered(object_type))?;
        Ok(Cursor {
            objects: &table.objects,
            position: Position::BeforeFirst,
            offset,
        })
    }

    fn table_mut(&mut self, object_type: ObjectType) -> Result<&mut TypeTable> {
        self.tables
            .get_mut(&object_type)
            .ok_or_else(|| unregistered(object_type))
    }
}

fn unregistered(object_type: ObjectType) -> Error {
    Error::ResourceUnavailable(format!("object type '{}' is not cached", object_type))
}

/// Hands out the next free id. Ids saturate at `ObjectId::MAX`, which is
/// handed out once.
fn allocate_id(object_type: ObjectType, table: &mut TypeTable) -> Result<ObjectId> {
    let id = table.next_id;
    if table.objects.contains_key(&id) {
        return Err(Error::ResourceUnavailable(format!(
            "ids of '{}' are exhausted",
            object_type
        )));
    }
    table.next_id = id.saturating_add(1);
    Ok(id)
}

fn full(object_type: ObjectType, capacity: usize) -> Error {
    Error::ResourceUnavailable(format!(
        "cache of '{}' is full ({} objects)",
        object_type, capacity
    ))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    BeforeFirst,
    At(ObjectId),
    AfterLast,
}

/// Iteration handle over one object type.
///
/// Every move returns the object under the cursor, or `None` once it runs off
/// either end.
#[derive(Debug)]
pub struct Cursor<'a> {
    objects: &'a BTreeMap<ObjectId, Object>,
    position: Position,
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn first(&mut self) -> Option<&'a Object> {
        let found = self.objects.values().next();
        self.settle(found, Position::AfterLast)
    }

    pub fn last(&mut self) -> Option<&'a Object> {
        let found = self.objects.values().next_back();
        self.settle(found, Position::BeforeFirst)
    }

    pub fn next(&mut self) -> Option<&'a Object> {
        let found = match self.position {
            Position::BeforeFirst => self.objects.values().next(),
            Position::At(id) => self.objects.range((Excluded(id), Unbounded)).next().map(|(_, o)| o),
            Position::AfterLast => None,
        };
        self.settle(found, Position::AfterLast)
    }

    pub fn prev(&mut self) -> Option<&'a Object> {
        let found = match self.position {
            Position::AfterLast => self.objects.values().next_back(),
            Position::At(id) => self.objects.range(..id).next_back().map(|(_, o)| o),
            Position::BeforeFirst => None,
        };
        self.settle(found, Position::BeforeFirst)
    }

    /// Moves `n` steps forward (`n > 0`) or backward (`n < 0`) from the current position.
    pub fn offset(&mut self, n: i64) -> Option<&'a Object> {
        let mut current = self.current();
        for _ in 0..n.unsigned_abs() {
            current = if n > 0 { self.next() } else { self.prev() };
            if current.is_none() {
                break;
            }
        }
        current
    }

    /// Forward sequence, starting `offset` objects after the first one.
    pub fn objects(mut self) -> impl Iterator<Item = &'a Object> {
        let mut head = self.first();
        if self.offset > 0 && head.is_some() {
            head = self.offset(self.offset as i64);
        }
        std::iter::successors(head, move |_| self.next())
    }

    /// Reverse sequence, starting `offset` objects before the last one.
    pub fn robjects(mut self) -> impl Iterator<Item = &'a Object> {
        let mut head = self.last();
        if self.offset > 0 && head.is_some() {
            head = self.offset(-(self.offset as i64));
        }
        std::iter::successors(head, move |_| self.prev())
    }

    /// Forward sequence paired with a flag set on the final element.
    pub fn objects_with_last_flag(self) -> impl Iterator<Item = (&'a Object, bool)> {
        let mut objects = self.objects().peekable();
        std::iter::from_fn(move || {
            let object = objects.next()?;
            Some((object, objects.peek().is_none()))
        })
    }

    fn current(&self) -> Option<&'a Object> {
        match self.position {
            Position::At(id) => self.objects.get(&id),
            _ => None,
        }
    }

    fn settle(&mut self, found: Option<&'a Object>, end: Position) -> Option<&'a Object> {
        self.position = match found {
            Some(object) => Position::At(object.get_id()),
            None => end,
        };
        found
    }
}
