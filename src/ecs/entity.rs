//! Entity handles and the identifier issuer

use std::fmt;

/// Raw entity id type
pub type EntityId = u32;

/// Opaque entity handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Entity(EntityId);

impl Entity {
    /// Handle that never refers to a live entity.
    pub const NULL: Self = Self(EntityId::MAX);

    pub const fn from_raw(id: EntityId) -> Self {
        Self(id)
    }

    pub const fn id(self) -> EntityId {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == EntityId::MAX
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("#null")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Hands out monotonically increasing entity handles.
///
/// Ids are never recycled; the only way to see an id again is [`reset`](Self::reset).
#[derive(Debug, Clone)]
pub struct EntityIssuer {
    first: EntityId,
    next: EntityId,
}

impl EntityIssuer {
    pub fn new(first: EntityId) -> Self {
        assert!(
            first != EntityId::MAX,
            "first entity id collides with the null handle"
        );
        Self { first, next: first }
    }

    pub fn issue(&mut self) -> Entity {
        assert!(self.next != EntityId::MAX, "entity id space exhausted");
        let entity = Entity(self.next);
        self.next += 1;
        entity
    }

    /// Make sure `entity` is never issued later on.
    pub fn reserve(&mut self, entity: Entity) {
        if entity.0 >= self.next {
            self.next = entity.0.saturating_add(1);
        }
    }

    /// The id the next call to [`issue`](Self::issue) returns
    pub fn peek(&self) -> EntityId {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = self.first;
    }
}

impl Default for EntityIssuer {
    fn default() -> Self {
        Self::new(1)
    }
}
