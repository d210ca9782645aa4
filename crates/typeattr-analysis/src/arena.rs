//! Append-only storage addressed by typed keys.
//!
//! Objects, types, scopes, packages and declarations all live in arenas
//! owned by [`TCObjects`](crate::objects::TCObjects). Nothing is ever
//! removed, so a key stays valid for the lifetime of its arena.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

/// A key into an [`Arena`].
pub trait ArenaKey: Copy + Eq + std::hash::Hash + std::fmt::Debug {
    fn from_usize(idx: usize) -> Self;
    fn as_usize(&self) -> usize;
    fn null() -> Self;
    fn is_null(&self) -> bool {
        *self == Self::null()
    }
}

#[derive(Debug)]
pub struct Arena<K: ArenaKey, V> {
    vec: Vec<V>,
    _marker: PhantomData<K>,
}

impl<K: ArenaKey, V> Default for Arena<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, V> Arena<K, V> {
    pub fn new() -> Self {
        Self {
            vec: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Stores `value` and returns the key it can be reached by.
    #[inline]
    pub fn insert(&mut self, value: V) -> K {
        let idx = self.vec.len();
        self.vec.push(value);
        K::from_usize(idx)
    }

    #[inline]
    pub fn get(&self, key: K) -> Option<&V> {
        self.vec.get(key.as_usize())
    }

    #[inline]
    pub fn get_mut(&mut self, key: K) -> Option<&mut V> {
        self.vec.get_mut(key.as_usize())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vec.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    /// Iterates in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.vec
            .iter()
            .enumerate()
            .map(|(i, v)| (K::from_usize(i), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = K> {
        (0..self.vec.len()).map(K::from_usize)
    }
}

impl<K: ArenaKey, V> Index<K> for Arena<K, V> {
    type Output = V;

    #[inline]
    fn index(&self, key: K) -> &Self::Output {
        &self.vec[key.as_usize()]
    }
}

impl<K: ArenaKey, V> IndexMut<K> for Arena<K, V> {
    #[inline]
    fn index_mut(&mut self, key: K) -> &mut Self::Output {
        &mut self.vec[key.as_usize()]
    }
}

/// Declares one or more `u32` newtype keys implementing [`ArenaKey`].
#[macro_export]
macro_rules! define_key {
    ($($(#[$attr:meta])* $vis:vis struct $name:ident;)*) => {
        $(
            $(#[$attr])*
            #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
            #[repr(transparent)]
            $vis struct $name(u32);

            impl $name {
                #[inline]
                pub fn raw(&self) -> u32 {
                    self.0
                }
            }

            impl $crate::arena::ArenaKey for $name {
                #[inline]
                fn from_usize(idx: usize) -> Self {
                    Self(idx as u32)
                }

                #[inline]
                fn as_usize(&self) -> usize {
                    self.0 as usize
                }

                #[inline]
                fn null() -> Self {
                    Self(u32::MAX)
                }
            }
        )*
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    define_key! {
        struct NameKey;
    }

    #[test]
    fn test_keys_follow_insertion_order() {
        let mut arena: Arena<NameKey, &str> = Arena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert!(a < b);
        assert_eq!(arena[b], "b");
        assert_eq!(arena.keys().collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_index_mut_updates_in_place() {
        let mut arena: Arena<NameKey, Vec<u8>> = Arena::new();
        let k = arena.insert(vec![1]);
        arena[k].push(2);
        assert_eq!(arena.get(k).map(Vec::len), Some(2));
        assert!(arena.get(NameKey::null()).is_none());
    }
}
