use std::cell::Cell;
use std::collections::BTreeMap;
use std::fmt;
use std::ptr::NonNull;

use bitvec::vec::BitVec;
use itertools::Itertools;
use log::debug;

/// A single word of a slot. Words are mutated through shared references, so a
/// slot can be updated while other slots are borrowed.
pub type Word = Cell<u64>;

/// The default number of words in a block, 64 KiB.
pub const DEFAULT_BLOCK_WORDS: usize = 1 << 13;

/// Points to the first word of a slot handed out by a [BlockAllocator].
///
/// Comparisons and hashing use the address of the slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SlotPointer(NonNull<Word>);

impl SlotPointer {
    /// Returns the address of the slot, which is never zero.
    pub fn address(self) -> usize {
        self.0.as_ptr().expose_provenance()
    }

    /// Returns the word at the given index of the slot.
    ///
    /// # Safety
    ///
    /// The index must be smaller than the slot size, and the allocator that
    /// handed out the slot must still exist. Blocks are only released when the
    /// allocator is dropped, so the memory stays valid even after the slot has
    /// been deallocated; the contents are then meaningless.
    pub unsafe fn word<'a>(self, index: usize) -> &'a Word {
        unsafe { &*self.0.as_ptr().add(index) }
    }

    /// Converts an address obtained from [SlotPointer::address] back into a pointer.
    ///
    /// # Safety
    ///
    /// The address must be the address of a slot of a live allocator, see
    /// [BlockAllocator::is_live] to check this for addresses of unknown origin.
    pub unsafe fn from_address(address: usize) -> Option<SlotPointer> {
        NonNull::new(std::ptr::with_exposed_provenance_mut::<Word>(address)).map(SlotPointer)
    }
}

impl fmt::Debug for SlotPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.address())
    }
}

/// A block allocator that hands out slots of `header_words + size_class`
/// words, where every size class has its own blocks and free list.
///
/// # Details
///
/// Blocks are registered in an ordered index by their start address, and keep
/// one liveness bit per slot. Together these answer [BlockAllocator::is_live]
/// for arbitrary addresses without knowing what is stored in the slots. Freed
/// slots are linked into an intrusive free list through their first word.
pub struct BlockAllocator {
    header_words: usize,
    block_words: usize,

    classes: Vec<SizeClass>,
    blocks: Vec<Block>,

    /// Maps the start address of every block to its index in `blocks`.
    address_index: BTreeMap<usize, usize>,
}

#[derive(Default)]
struct SizeClass {
    /// Head of the intrusive free list.
    free: Option<SlotPointer>,
    free_slots: usize,
    in_use: usize,

    /// The most recent block of this class, which may have unused slots at its end.
    current_block: Option<usize>,
}

struct Block {
    data: Box<[Word]>,
    slot_words: usize,
    size_class: usize,

    /// The number of slots that have been handed out at least once.
    length: usize,
    capacity: usize,

    live: BitVec,
}

impl Block {
    fn new(size_class: usize, slot_words: usize, block_words: usize) -> Block {
        let capacity = (block_words / slot_words).max(1);
        let data: Box<[Word]> = (0..capacity * slot_words).map(|_| Cell::new(0)).collect();

        Block {
            data,
            slot_words,
            size_class,
            length: 0,
            capacity,
            live: BitVec::repeat(false, capacity),
        }
    }

    fn start(&self) -> usize {
        self.data.as_ptr() as usize
    }

    fn slot_bytes(&self) -> usize {
        self.slot_words * size_of::<Word>()
    }

    /// Returns the index of the slot starting at the given address, if any.
    fn slot_index(&self, address: usize) -> Option<usize> {
        let offset = address.checked_sub(self.start())?;
        if offset % self.slot_bytes() != 0 {
            return None;
        }

        let index = offset / self.slot_bytes();
        (index < self.length).then_some(index)
    }

    fn slot(&self, index: usize) -> SlotPointer {
        debug_assert!(index < self.capacity);
        let start = NonNull::from(&self.data[..]).cast::<Word>();

        // Safety: the offset of the slot lies within the block.
        SlotPointer(unsafe { start.add(index * self.slot_words) })
    }
}

impl BlockAllocator {
    /// Creates an allocator whose slots start with `header_words` words, using
    /// blocks of (at least) `block_words` words.
    pub fn new(header_words: usize, block_words: usize) -> BlockAllocator {
        BlockAllocator {
            header_words,
            block_words,
            classes: Vec::new(),
            blocks: Vec::new(),
            address_index: BTreeMap::new(),
        }
    }

    /// Allocates a slot of the given size class. Returns the slot and whether a
    /// new block had to be created for it. The words of a fresh slot are zero,
    /// a reused slot keeps its previous contents.
    pub fn allocate(&mut self, size_class: usize) -> (SlotPointer, bool) {
        if self.classes.len() <= size_class {
            self.classes.resize_with(size_class + 1, SizeClass::default);
        }

        if let Some(slot) = self.classes[size_class].free {
            // Safety: slots on the free list belong to a block of this allocator.
            let next = unsafe { slot.word(0).get() };
            let class = &mut self.classes[size_class];
            class.free = unsafe { SlotPointer::from_address(next as usize) };
            class.free_slots -= 1;
            class.in_use += 1;

            self.set_live(slot, true);
            return (slot, false);
        }

        let (block_index, grown) = match self.classes[size_class].current_block {
            Some(index) if self.blocks[index].length < self.blocks[index].capacity => (index, false),
            _ => (self.grow(size_class), true),
        };

        let block = &mut self.blocks[block_index];
        let slot = block.slot(block.length);
        block.live.set(block.length, true);
        block.length += 1;

        self.classes[size_class].in_use += 1;
        (slot, grown)
    }

    /// Returns the slot to the free list of its size class.
    ///
    /// # Safety
    ///
    /// The slot must have been returned by [BlockAllocator::allocate] of this
    /// allocator for the same size class, and must not be deallocated twice.
    pub unsafe fn deallocate(&mut self, slot: SlotPointer, size_class: usize) {
        debug_assert!(self.is_live(slot.address()), "Slot {slot:?} is not allocated");
        self.set_live(slot, false);

        let class = &mut self.classes[size_class];
        let next = class.free.map_or(0, |free| free.address() as u64);
        unsafe { slot.word(0).set(next) };

        class.free = Some(slot);
        class.free_slots += 1;
        class.in_use -= 1;
    }

    /// Returns true iff the address is the start of a slot that is currently allocated.
    pub fn is_live(&self, address: usize) -> bool {
        self.find_block(address)
            .and_then(|block| {
                let block = &self.blocks[block];
                block.slot_index(address).map(|index| block.live[index])
            })
            .unwrap_or(false)
    }

    /// The number of allocated slots of the given size class.
    pub fn in_use(&self, size_class: usize) -> usize {
        self.classes.get(size_class).map_or(0, |class| class.in_use)
    }

    /// The number of allocated slots over all size classes.
    pub fn total_in_use(&self) -> usize {
        self.classes.iter().map(|class| class.in_use).sum()
    }

    /// The number of slots on the free list of the given size class.
    pub fn free_slots(&self, size_class: usize) -> usize {
        self.classes.get(size_class).map_or(0, |class| class.free_slots)
    }

    pub fn number_of_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// The number of bytes occupied by all blocks.
    pub fn allocated_bytes(&self) -> usize {
        self.blocks.iter().map(|block| block.data.len() * size_of::<Word>()).sum()
    }

    pub fn header_words(&self) -> usize {
        self.header_words
    }

    /// Creates a new block for the given size class and returns its index.
    fn grow(&mut self, size_class: usize) -> usize {
        let block = Block::new(size_class, self.header_words + size_class, self.block_words);
        let index = self.blocks.len();

        debug!(
            "Allocated block {index} for size class {size_class} with {} slots",
            block.capacity
        );

        self.address_index.insert(block.start(), index);
        self.blocks.push(block);
        self.classes[size_class].current_block = Some(index);
        index
    }

    /// Returns the index of the block whose memory range contains the address.
    fn find_block(&self, address: usize) -> Option<usize> {
        let (&start, &index) = self.address_index.range(..=address).next_back()?;
        let block = &self.blocks[index];
        (address - start < block.data.len() * size_of::<Word>()).then_some(index)
    }

    fn set_live(&mut self, slot: SlotPointer, value: bool) {
        if let Some(block_index) = self.find_block(slot.address()) {
            let block = &mut self.blocks[block_index];
            if let Some(index) = block.slot_index(slot.address()) {
                block.live.set(index, value);
            }
        }
    }
}

impl fmt::Debug for BlockAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let classes = self
            .classes
            .iter()
            .enumerate()
            .filter(|(_, class)| class.in_use + class.free_slots > 0)
            .map(|(size_class, class)| format!("{size_class}: {} in use, {} free", class.in_use, class.free_slots));

        write!(
            f,
            "{} blocks, size classes [{}], block sizes [{}]",
            self.blocks.len(),
            classes.format(", "),
            self.blocks.iter().map(|block| block.size_class).format(", ")
        )
    }
}
