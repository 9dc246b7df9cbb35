// Handles and generational storage
//
// Every GPU object is referred to by a Handle<T>: a slot index plus the
// generation the slot had when the object was inserted. Removing an object
// bumps the slot generation, so stale handles read as "not found" instead of
// aliasing whatever reuses the slot.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// Typed, copyable reference to a resource stored in a [`Pool`].
///
/// The type parameter is the frontend kind (`Handle<Buffer>`, `Handle<Fence>`),
/// so handles of different kinds never mix. The default value is the invalid
/// sentinel: pools never hand out generation 0.
pub struct Handle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub(crate) const fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    pub fn is_valid(&self) -> bool {
        self.generation != 0
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = std::any::type_name::<T>();
        let kind = kind.rsplit("::").next().unwrap_or(kind);
        write!(f, "Handle<{}>({}v{})", kind, self.index, self.generation)
    }
}

enum Slot<V> {
    Occupied(V),
    Vacant { next_free: Option<u32> },
}

struct Entry<V> {
    generation: u32,
    slot: Slot<V>,
}

/// Generational storage table: values of type `V` addressed by `Handle<K>`.
///
/// Insert, lookup and removal are O(1); freed slots are recycled LIFO.
pub struct Pool<V, K> {
    entries: Vec<Entry<V>>,
    free_head: Option<u32>,
    len: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<V, K> Default for Pool<V, K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, K> Pool<V, K> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_head: None,
            len: 0,
            _kind: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn insert(&mut self, value: V) -> Handle<K> {
        self.len += 1;

        if let Some(index) = self.free_head {
            let entry = &mut self.entries[index as usize];
            if let Slot::Vacant { next_free } = entry.slot {
                self.free_head = next_free;
            }
            entry.slot = Slot::Occupied(value);
            return Handle::new(index, entry.generation);
        }

        let index = self.entries.len() as u32;
        self.entries.push(Entry {
            generation: 1,
            slot: Slot::Occupied(value),
        });
        Handle::new(index, 1)
    }

    pub fn get(&self, handle: Handle<K>) -> Option<&V> {
        match self.entries.get(handle.index as usize) {
            Some(Entry {
                generation,
                slot: Slot::Occupied(value),
            }) if *generation == handle.generation => Some(value),
            _ => None,
        }
    }

    pub fn get_mut(&mut self, handle: Handle<K>) -> Option<&mut V> {
        match self.entries.get_mut(handle.index as usize) {
            Some(Entry {
                generation,
                slot: Slot::Occupied(value),
            }) if *generation == handle.generation => Some(value),
            _ => None,
        }
    }

    pub fn contains(&self, handle: Handle<K>) -> bool {
        self.get(handle).is_some()
    }

    /// Remove the value behind `handle`. Stale or default handles are a no-op.
    pub fn remove(&mut self, handle: Handle<K>) -> Option<V> {
        if !self.contains(handle) {
            return None;
        }

        let entry = &mut self.entries[handle.index as usize];
        let old = std::mem::replace(
            &mut entry.slot,
            Slot::Vacant {
                next_free: self.free_head,
            },
        );
        // Generation 0 is reserved for the invalid handle
        entry.generation = match entry.generation.wrapping_add(1) {
            0 => 1,
            g => g,
        };
        self.free_head = Some(handle.index);
        self.len -= 1;

        match old {
            Slot::Occupied(value) => Some(value),
            Slot::Vacant { .. } => None,
        }
    }

    /// Remove every value matching `predicate`, returning them with their
    /// former handles. Used for cascading deletion.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<(Handle<K>, V)>
    where
        F: FnMut(&V) -> bool,
    {
        let doomed: Vec<Handle<K>> = self
            .iter()
            .filter(|(_, value)| predicate(value))
            .map(|(handle, _)| handle)
            .collect();

        doomed
            .into_iter()
            .filter_map(|handle| self.remove(handle).map(|value| (handle, value)))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Handle<K>, &V)> {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match &entry.slot {
                Slot::Occupied(value) => Some((Handle::new(index as u32, entry.generation), value)),
                Slot::Vacant { .. } => None,
            })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle<K>, &mut V)> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(index, entry)| {
                let generation = entry.generation;
                match &mut entry.slot {
                    Slot::Occupied(value) => Some((Handle::new(index as u32, generation), value)),
                    Slot::Vacant { .. } => None,
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Thing;

    #[test]
    fn test_default_handle_is_invalid() {
        let handle: Handle<Thing> = Handle::default();
        assert!(!handle.is_valid());
        assert_eq!(handle.index(), 0);
        assert_eq!(handle.generation(), 0);
    }

    #[test]
    fn test_insert_get_remove() {
        let mut pool: Pool<&str, Thing> = Pool::new();
        let a = pool.insert("a");
        let b = pool.insert("b");

        assert!(a.is_valid());
        assert_ne!(a, b);
        assert_eq!(pool.get(a), Some(&"a"));
        assert_eq!(pool.get(b), Some(&"b"));
        assert_eq!(pool.len(), 2);

        assert_eq!(pool.remove(a), Some("a"));
        assert_eq!(pool.get(a), None);
        assert_eq!(pool.len(), 1);
    }

    #[test]
    fn test_stale_handle_after_slot_reuse() {
        let mut pool: Pool<u32, Thing> = Pool::new();
        let old = pool.insert(1);
        pool.remove(old);

        let new = pool.insert(2);
        assert_eq!(new.index(), old.index());
        assert_ne!(new.generation(), old.generation());

        assert!(pool.get(old).is_none());
        assert_eq!(pool.get(new), Some(&2));
    }

    #[test]
    fn test_double_remove_is_noop() {
        let mut pool: Pool<u32, Thing> = Pool::new();
        let handle = pool.insert(7);
        assert_eq!(pool.remove(handle), Some(7));
        assert_eq!(pool.remove(handle), None);
        assert_eq!(pool.remove(Handle::default()), None);
        assert!(pool.is_empty());
    }

    #[test]
    fn test_out_of_range_index() {
        let pool: Pool<u32, Thing> = Pool::new();
        assert!(pool.get(Handle::new(42, 1)).is_none());
    }

    #[test]
    fn test_free_list_is_lifo() {
        let mut pool: Pool<u32, Thing> = Pool::new();
        let handles: Vec<_> = (0..4).map(|i| pool.insert(i)).collect();
        pool.remove(handles[1]);
        pool.remove(handles[3]);

        assert_eq!(pool.insert(10).index(), 3);
        assert_eq!(pool.insert(11).index(), 1);
        assert_eq!(pool.insert(12).index(), 4);
    }

    #[test]
    fn test_remove_where() {
        let mut pool: Pool<u32, Thing> = Pool::new();
        let keep = pool.insert(1);
        pool.insert(2);
        pool.insert(4);

        let removed = pool.remove_where(|v| v % 2 == 0);
        assert_eq!(removed.len(), 2);
        assert_eq!(pool.len(), 1);
        assert!(pool.contains(keep));
        assert!(removed.iter().all(|(h, _)| !pool.contains(*h)));
    }

    #[test]
    fn test_iter_yields_live_handles() {
        let mut pool: Pool<u32, Thing> = Pool::new();
        let a = pool.insert(1);
        let b = pool.insert(2);
        pool.remove(a);

        let live: Vec<_> = pool.iter().map(|(h, v)| (h, *v)).collect();
        assert_eq!(live, vec![(b, 2)]);
    }
}
