//! Deterministic value cells.
//!
//! Every piece of mutable state a command execution owns lives in a
//! [`CellStore`]: an arena of named, typed slots indexed by declaration
//! order. Behaviors only hold [`ValueCell`] handles, so the complete state
//! of an execution is the flat, ordered list of `(name, kind, value)`
//! records the store exposes. That list is what state hashing, snapshots
//! and rollback operate on, generically over every command kind.
//!
//! Misuse is a programmer error and panics immediately:
//! - declaring the same name twice in one store
//! - reading or writing through a handle whose slot does not exist
//! - reading or writing with a type whose kind differs from the slot

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::error::{CommandError, Result};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};

/// Storage kind of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    /// `bool`.
    Bool,
    /// Signed integer, also used for small enums.
    Int,
    /// Fixed-point scalar.
    Fixed,
    /// Fixed-point vector.
    Vector,
    /// Optional entity reference.
    Entity,
    /// Ordered entity references.
    EntityList,
    /// Optional text.
    Text,
}

/// Value held by a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellValue {
    /// Boolean flag.
    Bool(bool),
    /// Signed integer.
    Int(i64),
    /// Fixed-point scalar.
    Fixed(#[serde(with = "fixed_serde")] Fixed),
    /// Fixed-point vector.
    Vector(Vec2Fixed),
    /// Optional entity reference.
    Entity(Option<EntityId>),
    /// Ordered entity references.
    EntityList(Vec<EntityId>),
    /// Optional text.
    Text(Option<String>),
}

impl CellValue {
    /// Kind of this value.
    #[must_use]
    pub const fn kind(&self) -> CellKind {
        match self {
            Self::Bool(_) => CellKind::Bool,
            Self::Int(_) => CellKind::Int,
            Self::Fixed(_) => CellKind::Fixed,
            Self::Vector(_) => CellKind::Vector,
            Self::Entity(_) => CellKind::Entity,
            Self::EntityList(_) => CellKind::EntityList,
            Self::Text(_) => CellKind::Text,
        }
    }
}

/// Types that can be stored in a cell.
///
/// Implement this for domain enums by mapping them onto [`CellKind::Int`].
pub trait CellType: Sized {
    /// Slot kind used for this type.
    const KIND: CellKind;

    /// Convert into a slot value.
    fn into_value(self) -> CellValue;

    /// Convert back from a slot value. `None` if the value does not fit.
    fn from_value(value: &CellValue) -> Option<Self>;
}

impl CellType for bool {
    const KIND: CellKind = CellKind::Bool;

    fn into_value(self) -> CellValue {
        CellValue::Bool(self)
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Bool(v) => Some(*v),
            _ => None,
        }
    }
}

impl CellType for i64 {
    const KIND: CellKind = CellKind::Int;

    fn into_value(self) -> CellValue {
        CellValue::Int(self)
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl CellType for u32 {
    const KIND: CellKind = CellKind::Int;

    fn into_value(self) -> CellValue {
        CellValue::Int(i64::from(self))
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Int(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl CellType for Fixed {
    const KIND: CellKind = CellKind::Fixed;

    fn into_value(self) -> CellValue {
        CellValue::Fixed(self)
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Fixed(v) => Some(*v),
            _ => None,
        }
    }
}

impl CellType for Vec2Fixed {
    const KIND: CellKind = CellKind::Vector;

    fn into_value(self) -> CellValue {
        CellValue::Vector(self)
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Vector(v) => Some(*v),
            _ => None,
        }
    }
}

impl CellType for Option<EntityId> {
    const KIND: CellKind = CellKind::Entity;

    fn into_value(self) -> CellValue {
        CellValue::Entity(self)
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Entity(v) => Some(*v),
            _ => None,
        }
    }
}

impl CellType for Vec<EntityId> {
    const KIND: CellKind = CellKind::EntityList;

    fn into_value(self) -> CellValue {
        CellValue::EntityList(self)
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::EntityList(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl CellType for Option<String> {
    const KIND: CellKind = CellKind::Text;

    fn into_value(self) -> CellValue {
        CellValue::Text(self)
    }

    fn from_value(value: &CellValue) -> Option<Self> {
        match value {
            CellValue::Text(v) => Some(v.clone()),
            _ => None,
        }
    }
}

/// Typed handle to a slot of a [`CellStore`].
///
/// Handles are plain indices: copying one never copies state.
pub struct ValueCell<T> {
    index: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ValueCell<T> {
    /// Declaration index of the slot.
    #[must_use]
    pub const fn index(self) -> usize {
        self.index as usize
    }
}

impl<T> Clone for ValueCell<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ValueCell<T> {}

impl<T> fmt::Debug for ValueCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValueCell#{}", self.index)
    }
}

/// One named slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRecord {
    /// Declared name.
    pub name: String,
    /// Current value.
    pub value: CellValue,
}

impl FieldRecord {
    /// Kind of the slot.
    #[must_use]
    pub const fn kind(&self) -> CellKind {
        self.value.kind()
    }
}

/// Frozen copy of a store's slots, used for rollback and serialization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Slots in declaration order.
    pub fields: Vec<FieldRecord>,
}

/// Arena of typed slots owned by one command execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellStore {
    slots: Vec<FieldRecord>,
}

impl CellStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Declare a new slot with an initial value.
    ///
    /// # Panics
    ///
    /// Panics if a slot with this name already exists.
    pub fn declare<T: CellType>(&mut self, name: &str, initial: T) -> ValueCell<T> {
        assert!(
            self.slots.iter().all(|slot| slot.name != name),
            "cell '{name}' declared twice"
        );
        let index = u32::try_from(self.slots.len()).unwrap_or(u32::MAX);
        self.slots.push(FieldRecord {
            name: name.to_string(),
            value: initial.into_value(),
        });
        ValueCell {
            index,
            _marker: PhantomData,
        }
    }

    /// Read the value of a slot.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to a slot of matching kind.
    #[must_use]
    pub fn read<T: CellType>(&self, cell: ValueCell<T>) -> T {
        let slot = self.slot(cell);
        match T::from_value(&slot.value) {
            Some(value) => value,
            None => panic!(
                "cell '{}' holds {:?}, read as {:?}",
                slot.name,
                slot.value.kind(),
                T::KIND
            ),
        }
    }

    /// Overwrite the value of a slot.
    ///
    /// # Panics
    ///
    /// Panics if the handle does not belong to a slot of matching kind.
    pub fn write<T: CellType>(&mut self, cell: ValueCell<T>, value: T) {
        let index = cell.index();
        let slot = match self.slots.get_mut(index) {
            Some(slot) => slot,
            None => panic!("cell #{index} used before it was declared"),
        };
        assert!(
            slot.value.kind() == T::KIND,
            "cell '{}' holds {:?}, written as {:?}",
            slot.name,
            slot.value.kind(),
            T::KIND
        );
        slot.value = value.into_value();
    }

    fn slot<T>(&self, cell: ValueCell<T>) -> &FieldRecord {
        let index = cell.index();
        match self.slots.get(index) {
            Some(slot) => slot,
            None => panic!("cell #{index} used before it was declared"),
        }
    }

    /// Number of declared slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot has been declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Visit every slot in declaration order.
    pub fn for_each_field<F>(&self, mut visitor: F)
    where
        F: FnMut(&str, CellKind, &CellValue),
    {
        for slot in &self.slots {
            visitor(&slot.name, slot.value.kind(), &slot.value);
        }
    }

    /// Iterate slots in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldRecord> {
        self.slots.iter()
    }

    /// Copy the current slot values.
    #[must_use]
    pub fn snapshot(&self) -> CellSnapshot {
        CellSnapshot {
            fields: self.slots.clone(),
        }
    }

    /// Roll every slot back to a snapshot taken from a store of the same layout.
    ///
    /// The store is left untouched when the layouts differ.
    pub fn restore(&mut self, snapshot: &CellSnapshot) -> Result<()> {
        if snapshot.fields.len() != self.slots.len() {
            return Err(CommandError::CellLayoutMismatch {
                index: self.slots.len().min(snapshot.fields.len()),
                expected: format!("{} slots", self.slots.len()),
                found: format!("{} slots", snapshot.fields.len()),
            });
        }
        for (index, (ours, theirs)) in self.slots.iter().zip(&snapshot.fields).enumerate() {
            if ours.name != theirs.name || ours.kind() != theirs.kind() {
                return Err(CommandError::CellLayoutMismatch {
                    index,
                    expected: format!("{}: {:?}", ours.name, ours.kind()),
                    found: format!("{}: {:?}", theirs.name, theirs.kind()),
                });
            }
        }
        self.slots.clone_from(&snapshot.fields);
        Ok(())
    }

    /// Feed every slot into a hasher in declaration order.
    pub fn hash_into<H: Hasher>(&self, state: &mut H) {
        self.slots.len().hash(state);
        for slot in &self.slots {
            slot.hash(state);
        }
    }
}
