//! Global singleton values keyed by type

use std::any::Any;
use std::collections::HashMap;

use crate::tag::TypeTag;

/// At most one value per type.
#[derive(Default)]
pub struct Resources {
    slots: HashMap<TypeTag, Box<dyn Any>>,
}

impl Resources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` unless a value of this type is already present.
    pub fn insert<T: 'static>(&mut self, value: T) -> bool {
        let tag = TypeTag::of::<T>();
        if self.slots.contains_key(&tag) {
            return false;
        }
        self.slots.insert(tag, Box::new(value));
        true
    }

    pub fn get<T: 'static>(&self) -> Option<&T> {
        self.slots.get(&TypeTag::of::<T>())?.downcast_ref::<T>()
    }

    pub fn get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.slots.get_mut(&TypeTag::of::<T>())?.downcast_mut::<T>()
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.slots.contains_key(&TypeTag::of::<T>())
    }

    pub fn remove<T: 'static>(&mut self) -> Option<T> {
        let boxed = self.slots.remove(&TypeTag::of::<T>())?;
        boxed.downcast::<T>().ok().map(|value| *value)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
