//! Object stream deserialization context
//!
//! Objects in an Orb are stored as an MFC-style object stream. An
//! [`Archive`] is a cursor over that stream: a type's [`Loadable::load`]
//! walks it field by field, and nested objects are materialized through a
//! [`ClassRegistry`] keyed by the class name written in the stream.
//!
//! # Object tags
//!
//! Every object reference starts with a u16 tag:
//!
//! ```text
//! 0x0000            null reference
//! 0xFFFF            new class: u16 schema, u16 name length, name bytes,
//!                   then the object's fields
//! 0x8000 | index    new object of the class mapped at `index`,
//!                   then the object's fields
//! index (< 0x8000)  back-reference to the object mapped at `index`
//! ```
//!
//! The object map starts with the null slot at index 0. A new class takes
//! two slots (the class and its first object); every other new object takes
//! one.

use binrw::BinRead;
use std::any::{Any, TypeId};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Seek, SeekFrom};
use std::rc::Rc;
use tracing::{debug, trace};

use crate::error::{OrbError, OrbResult};
use crate::preallocation;

/// Tag for a null object reference
pub const NULL_TAG: u16 = 0x0000;

/// Tag introducing a class not seen before in this stream
pub const NEW_CLASS_TAG: u16 = 0xFFFF;

/// Flag marking a tag as a class index rather than an object index
pub const CLASS_TAG: u16 = 0x8000;

/// `read_count` escape: the real count follows as a u32
const BIG_COUNT_TAG: u16 = 0xFFFF;

/// Object-safe `Read + Seek`
pub trait ReadSeek: Read + Seek {}

impl<T: Read + Seek + ?Sized> ReadSeek for T {}

/// A type that reconstructs its fields from an object stream
pub trait Loadable: Any {
    /// Read this object's fields from the archive
    fn load(&mut self, archive: &mut Archive<'_>) -> OrbResult<()>;
}

/// Shared handle to an object created by the stream
pub type ObjectRef = Rc<RefCell<dyn Loadable>>;

/// Constructor for a registered class
pub type ClassFactory = fn() -> ObjectRef;

fn construct<T: Loadable + Default>() -> ObjectRef {
    Rc::new(RefCell::new(T::default()))
}

/// Borrow a shared object as its concrete type
///
/// Returns `None` when the object is of another type or is currently
/// mutably borrowed, as it is while its own `load` is still running.
pub fn borrow_as<T: Loadable>(object: &ObjectRef) -> Option<Ref<'_, T>> {
    let borrowed = object.try_borrow().ok()?;
    Ref::filter_map(borrowed, |o| (o as &dyn Any).downcast_ref::<T>()).ok()
}

/// Mutably borrow a shared object as its concrete type
///
/// Returns `None` when the object is of another type or is already borrowed.
pub fn borrow_mut_as<T: Loadable>(object: &ObjectRef) -> Option<RefMut<'_, T>> {
    let borrowed = object.try_borrow_mut().ok()?;
    RefMut::filter_map(borrowed, |o| (o as &mut dyn Any).downcast_mut::<T>()).ok()
}

fn concrete_type(object: &ObjectRef) -> TypeId {
    let borrowed = object.borrow();
    let any: &dyn Any = &*borrowed;
    any.type_id()
}

/// Maps stream class names to constructors
#[derive(Default, Clone)]
pub struct ClassRegistry {
    factories: HashMap<String, ClassFactory>,
}

impl ClassRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under the class name used in the stream
    pub fn register<T: Loadable + Default>(&mut self, class_name: impl Into<String>) -> &mut Self {
        self.register_factory(class_name, construct::<T>)
    }

    /// Register a custom constructor
    pub fn register_factory(
        &mut self,
        class_name: impl Into<String>,
        factory: ClassFactory,
    ) -> &mut Self {
        self.factories.insert(class_name.into(), factory);
        self
    }

    /// Check whether a class name is registered
    pub fn contains(&self, class_name: &str) -> bool {
        self.factories.contains_key(class_name)
    }

    /// Instantiate a class by name
    pub fn create(&self, class_name: &str) -> Option<ObjectRef> {
        self.factories.get(class_name).map(|factory| factory())
    }

    /// Number of registered classes
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for ClassRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.factories.keys().collect();
        names.sort();
        f.debug_struct("ClassRegistry")
            .field("classes", &names)
            .finish()
    }
}

#[derive(Clone)]
enum MapSlot {
    Null,
    Root,
    Object {
        class: Rc<str>,
        object: ObjectRef,
        type_id: TypeId,
    },
}

/// Deserialization cursor over an object stream
pub struct Archive<'a> {
    reader: &'a mut dyn ReadSeek,
    registry: &'a ClassRegistry,
    slots: Vec<MapSlot>,
}

impl<'a> Archive<'a> {
    /// Bind a context to the reader's current position
    pub fn new(reader: &'a mut dyn ReadSeek, registry: &'a ClassRegistry) -> Self {
        Self {
            reader,
            registry,
            slots: vec![MapSlot::Null],
        }
    }

    /// Reserve the next map slot for the root object
    ///
    /// The root is constructed by the caller rather than by the stream, but
    /// still occupies a slot so that later indices line up with the
    /// producer's numbering.
    pub fn map_object(&mut self) {
        self.slots.push(MapSlot::Root);
    }

    /// Number of occupied map slots, including the null slot
    pub fn mapped_count(&self) -> usize {
        self.slots.len()
    }

    /// Current stream position
    pub fn position(&mut self) -> OrbResult<u64> {
        Ok(self.reader.stream_position()?)
    }

    /// Move the cursor to an absolute position
    pub fn seek(&mut self, offset: u64) -> OrbResult<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        Ok(())
    }

    /// Read one byte
    pub fn read_byte(&mut self) -> OrbResult<u8> {
        Ok(u8::read_le(&mut self.reader)?)
    }

    /// Read a little-endian u16
    pub fn read_word(&mut self) -> OrbResult<u16> {
        Ok(u16::read_le(&mut self.reader)?)
    }

    /// Read a little-endian u32
    pub fn read_dword(&mut self) -> OrbResult<u32> {
        Ok(u32::read_le(&mut self.reader)?)
    }

    /// Read an element count
    ///
    /// Counts below 0xFFFF are stored as a u16; larger ones as 0xFFFF
    /// followed by a u32.
    pub fn read_count(&mut self) -> OrbResult<u32> {
        let count = self.read_word()?;
        if count == BIG_COUNT_TAG {
            return self.read_dword();
        }
        Ok(u32::from(count))
    }

    /// Read exactly `len` raw bytes
    pub fn read_bytes(&mut self, len: usize) -> OrbResult<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a string prefixed by a one-byte length
    pub fn read_string(&mut self) -> OrbResult<String> {
        let len = self.read_byte()?;
        let bytes = self.read_bytes(usize::from(len))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read a value stored inline, without an object tag
    pub fn read_inline<T: Loadable + Default>(&mut self) -> OrbResult<T> {
        let mut value = T::default();
        value.load(self)?;
        Ok(value)
    }

    /// Read a tagged object reference
    ///
    /// New objects are created through the registry and loaded before
    /// being returned; back-references return the already-loaded object.
    pub fn read_object(&mut self) -> OrbResult<Option<ObjectRef>> {
        Ok(self.read_tagged()?.map(|(object, _)| object))
    }

    /// Read a non-null object reference of a known type
    ///
    /// The type is checked against the class the object was created as, so
    /// a back-reference to an object whose `load` is still running is
    /// accepted without borrowing it.
    pub fn read_object_as<T: Loadable>(&mut self) -> OrbResult<ObjectRef> {
        match self.read_tagged()? {
            Some((object, type_id)) if type_id == TypeId::of::<T>() => Ok(object),
            _ => Err(OrbError::UnexpectedType(std::any::type_name::<T>())),
        }
    }

    fn read_tagged(&mut self) -> OrbResult<Option<(ObjectRef, TypeId)>> {
        let tag = self.read_word()?;
        match tag {
            NULL_TAG => Ok(None),
            NEW_CLASS_TAG => {
                let _schema = self.read_word()?;
                let len = self.read_word()?;
                let name = self.read_bytes(usize::from(len))?;
                let class: Rc<str> = Rc::from(String::from_utf8_lossy(&name).as_ref());

                let object = self.instantiate(&class)?;
                let type_id = concrete_type(&object);
                debug!("New class {} at slot {}", class, self.slots.len());
                let slot = MapSlot::Object {
                    class,
                    object: Rc::clone(&object),
                    type_id,
                };
                // Class slot, then object slot
                self.slots.push(slot.clone());
                self.slots.push(slot);

                object.borrow_mut().load(self)?;
                Ok(Some((object, type_id)))
            }
            tag if tag & CLASS_TAG != 0 => {
                let class = match self.slot(tag, tag & !CLASS_TAG)? {
                    MapSlot::Object { class, .. } => class,
                    MapSlot::Root => return Err(OrbError::RootReference),
                    MapSlot::Null => return Err(self.invalid_reference(tag)),
                };

                let object = self.instantiate(&class)?;
                let type_id = concrete_type(&object);
                trace!("New {} object at slot {}", class, self.slots.len());
                self.slots.push(MapSlot::Object {
                    class,
                    object: Rc::clone(&object),
                    type_id,
                });

                object.borrow_mut().load(self)?;
                Ok(Some((object, type_id)))
            }
            tag => match self.slot(tag, tag)? {
                MapSlot::Object {
                    object, type_id, ..
                } => Ok(Some((object, type_id))),
                MapSlot::Root => Err(OrbError::RootReference),
                MapSlot::Null => Err(self.invalid_reference(tag)),
            },
        }
    }

    /// Read a count followed by that many object references
    ///
    /// Null references are kept so that positions match the stream.
    pub fn read_object_array(&mut self) -> OrbResult<Vec<Option<ObjectRef>>> {
        let count = self.read_count()?;
        let mut objects = Vec::with_capacity(preallocation(count));
        for _ in 0..count {
            objects.push(self.read_object()?);
        }
        Ok(objects)
    }

    fn slot(&self, tag: u16, index: u16) -> OrbResult<MapSlot> {
        self.slots
            .get(usize::from(index))
            .cloned()
            .ok_or_else(|| self.invalid_reference(tag))
    }

    fn invalid_reference(&self, tag: u16) -> OrbError {
        OrbError::InvalidObjectReference {
            tag,
            mapped: self.slots.len(),
        }
    }

    fn instantiate(&self, class: &str) -> OrbResult<ObjectRef> {
        self.registry
            .create(class)
            .ok_or_else(|| OrbError::UnknownClass(class.to_string()))
    }
}

impl fmt::Debug for Archive<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("mapped", &self.slots.len())
            .field("registry", self.registry)
            .finish_non_exhaustive()
    }
}
