#![forbid(unsafe_code)]

use std::fmt;
use std::ops::Index;

/// A type-safe index into a [ProtectionSet]. Carries the generation of the
/// entry so that a stale index is detected after its entry was reused.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ProtectionIndex {
    index: usize,
    generation: u32,
}

impl ProtectionIndex {
    /// Returns the position of the entry in the protection set.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Debug for ProtectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtectionIndex({}, generation {})", self.index, self.generation)
    }
}

impl fmt::Display for ProtectionIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index)
    }
}

/// A collection that assigns an index to every object added to it, and allows
/// removing objects while reusing their indices later. The term store keeps
/// its external roots in here, which is why it is called a protection set.
#[derive(Debug)]
pub struct ProtectionSet<T> {
    roots: Vec<Entry<T>>,
    free: Option<usize>,
    number_of_insertions: u64,
    size: usize,
}

#[derive(Debug)]
enum Entry<T> {
    Filled(T, u32),
    Free(Option<usize>, u32),
}

impl<T> Entry<T> {
    fn generation(&self) -> u32 {
        match self {
            Entry::Filled(_, generation) | Entry::Free(_, generation) => *generation,
        }
    }
}

impl<T> Default for ProtectionSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ProtectionSet<T> {
    /// Creates a new empty protection set.
    pub fn new() -> Self {
        ProtectionSet {
            roots: Vec::new(),
            free: None,
            number_of_insertions: 0,
            size: 0,
        }
    }

    /// Returns the number of insertions into the protection set.
    pub fn number_of_insertions(&self) -> u64 {
        self.number_of_insertions
    }

    /// Returns the number of roots in the protection set
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over all objects in the protection set.
    pub fn iter(&self) -> impl Iterator<Item = (ProtectionIndex, &T)> {
        self.roots.iter().enumerate().filter_map(|(index, entry)| match entry {
            Entry::Filled(object, generation) => Some((
                ProtectionIndex {
                    index,
                    generation: *generation,
                },
                object,
            )),
            Entry::Free(_, _) => None,
        })
    }

    /// Returns whether the index refers to an object in the protection set.
    pub fn contains_root(&self, index: ProtectionIndex) -> bool {
        matches!(self.roots.get(index.index), Some(Entry::Filled(_, generation)) if *generation == index.generation)
    }

    /// Adds the given object to the protection set and returns its index.
    pub fn protect(&mut self, object: T) -> ProtectionIndex {
        self.number_of_insertions += 1;
        self.size += 1;

        match self.free {
            Some(index) => {
                let generation = self.roots[index].generation();
                match self.roots[index] {
                    Entry::Free(next, _) => self.free = next,
                    Entry::Filled(_, _) => panic!("The free list should not point to a filled entry"),
                }

                self.roots[index] = Entry::Filled(object, generation);
                ProtectionIndex { index, generation }
            }
            None => {
                self.roots.push(Entry::Filled(object, 0));
                ProtectionIndex {
                    index: self.roots.len() - 1,
                    generation: 0,
                }
            }
        }
    }

    /// Removes the object with the given index and returns it. The index must
    /// have been returned by [ProtectionSet::protect] and not been removed yet.
    pub fn unprotect(&mut self, index: ProtectionIndex) -> T {
        assert!(self.contains_root(index), "{index:?} does not refer to a protected object");

        self.size -= 1;
        let entry = std::mem::replace(
            &mut self.roots[index.index],
            Entry::Free(self.free, index.generation.wrapping_add(1)),
        );
        self.free = Some(index.index);

        match entry {
            Entry::Filled(object, _) => object,
            Entry::Free(_, _) => unreachable!("The entry was checked to be filled"),
        }
    }
}

impl<T> Index<ProtectionIndex> for ProtectionSet<T> {
    type Output = T;

    fn index(&self, index: ProtectionIndex) -> &Self::Output {
        match &self.roots[index.index] {
            Entry::Filled(value, generation) if *generation == index.generation => value,
            _ => panic!("Attempting to index a free entry {index:?}"),
        }
    }
}
