//! Dense-index set for integral keys.
//!
//! The sparse side maps a key to its position inside `dense`, or [`VACANT`].
//! It is split into fixed-size pages allocated on first use, so a large key
//! costs one page rather than an array as long as the key. Keys are used
//! directly as indices and lookups never hash. Removal moves the last dense
//! element into the freed slot, which keeps `dense` packed and every
//! operation O(1).

use super::Entity;

const VACANT: usize = usize::MAX;
const PAGE_SIZE: usize = 1024;

type Page = Box<[usize; PAGE_SIZE]>;

/// Keys that can address the sparse side of a [`SparseSet`].
pub trait SparseKey: Copy + Eq {
    fn to_index(self) -> usize;
}

macro_rules! impl_sparse_key {
    ($($ty:ty),*) => {
        $(
            impl SparseKey for $ty {
                #[inline]
                fn to_index(self) -> usize {
                    self as usize
                }
            }
        )*
    };
}

impl_sparse_key!(u16, u32, u64, usize);

impl SparseKey for Entity {
    #[inline]
    fn to_index(self) -> usize {
        self.id() as usize
    }
}

#[inline]
fn split(index: usize) -> (usize, usize) {
    (index / PAGE_SIZE, index % PAGE_SIZE)
}

#[derive(Debug, Clone)]
pub struct SparseSet<K> {
    dense: Vec<K>,
    pages: Vec<Option<Page>>,
}

impl<K: SparseKey> SparseSet<K> {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            pages: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            dense: Vec::with_capacity(capacity),
            pages: Vec::with_capacity(capacity.div_ceil(PAGE_SIZE)),
        }
    }

    /// Append `key` to the dense array. Inserting a key twice is a caller bug.
    pub fn insert(&mut self, key: K) {
        debug_assert!(!self.contains(key), "key inserted twice into sparse set");
        let slot = self.dense.len();
        *self.slot_mut(key.to_index()) = slot;
        self.dense.push(key);
    }

    /// Remove `key`, returning the dense slot it occupied.
    ///
    /// The element that was last in `dense` now lives in that slot.
    pub fn remove(&mut self, key: K) -> Option<usize> {
        let slot = self.index_of(key)?;
        self.dense.swap_remove(slot);
        if let Some(&moved) = self.dense.get(slot) {
            *self.slot_mut(moved.to_index()) = slot;
        }
        *self.slot_mut(key.to_index()) = VACANT;
        Some(slot)
    }

    #[inline]
    pub fn index_of(&self, key: K) -> Option<usize> {
        let (page, offset) = split(key.to_index());
        match self.pages.get(page) {
            Some(Some(page)) if page[offset] != VACANT => Some(page[offset]),
            _ => None,
        }
    }

    #[inline]
    pub fn contains(&self, key: K) -> bool {
        self.index_of(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn as_slice(&self) -> &[K] {
        &self.dense
    }

    pub fn iter(&self) -> impl Iterator<Item = K> + '_ {
        self.dense.iter().copied()
    }

    pub fn clear(&mut self) {
        self.dense.clear();
        self.pages.clear();
    }

    /// Sparse entry for `index`, allocating its page if needed
    fn slot_mut(&mut self, index: usize) -> &mut usize {
        let (page, offset) = split(index);
        if page >= self.pages.len() {
            self.pages.resize_with(page + 1, || None);
        }
        let page = self.pages[page].get_or_insert_with(|| Box::new([VACANT; PAGE_SIZE]));
        &mut page[offset]
    }
}

impl<K: SparseKey> Default for SparseSet<K> {
    fn default() -> Self {
        Self::new()
    }
}
