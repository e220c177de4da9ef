/*!
 * Segregated Free List
 * Per-class free stacks linked through an out-of-band slot table
 */

use crate::core::limits::NUM_SIZE_CLASSES;
use crate::memory::size_class::SizeClass;

/// Slot index meaning "no block"
pub(super) const NIL: u32 = u32::MAX;

/// Tag of one 32-byte granule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum SlotState {
    /// Not the first granule of a block, or not yet carved
    Interior,
    Free(SizeClass),
    Allocated(SizeClass),
}

/// Bookkeeping for one granule of the region
///
/// Only slots at a block start carry meaning. The link is used while the block is on a
/// free list; the generation counts how often the block has been handed out.
#[derive(Debug, Clone, Copy)]
pub(super) struct Slot {
    pub state: SlotState,
    pub next: u32,
    pub generation: u32,
}

impl Slot {
    const EMPTY: Slot = Slot {
        state: SlotState::Interior,
        next: NIL,
        generation: 0,
    };
}

/// One entry of the size-class table
#[derive(Debug, Clone, Copy)]
pub(super) struct ClassEntry {
    pub head: u32,
    pub free: usize,
    /// Blocks currently living in this class, free or allocated
    pub carved: usize,
}

impl ClassEntry {
    const EMPTY: ClassEntry = ClassEntry {
        head: NIL,
        free: 0,
        carved: 0,
    };
}

/// Segregated free lists over a fixed slot table
///
/// The slot table is sized once at init; pushing and popping never allocates.
#[derive(Debug)]
pub(super) struct SegregatedFreeList {
    classes: [ClassEntry; NUM_SIZE_CLASSES],
    slots: Box<[Slot]>,
}

impl SegregatedFreeList {
    pub fn new(granules: usize) -> Self {
        Self {
            classes: [ClassEntry::EMPTY; NUM_SIZE_CLASSES],
            slots: vec![Slot::EMPTY; granules].into_boxed_slice(),
        }
    }

    #[inline]
    pub fn granules(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slot(&self, index: u32) -> Option<&Slot> {
        self.slots.get(index as usize)
    }

    #[inline]
    pub fn class(&self, class: SizeClass) -> &ClassEntry {
        &self.classes[class.index()]
    }

    pub fn classes(&self) -> &[ClassEntry; NUM_SIZE_CLASSES] {
        &self.classes
    }

    /// Register a freshly carved block and leave it free
    pub fn carve_free(&mut self, index: u32, class: SizeClass) {
        self.enroll(class);
        self.push(index, class);
    }

    /// Count a freshly carved block that goes straight to a caller
    pub fn enroll(&mut self, class: SizeClass) {
        self.classes[class.index()].carved += 1;
    }

    /// Drop a block from its class because it is about to be split
    pub fn retire(&mut self, class: SizeClass) {
        let entry = &mut self.classes[class.index()];
        entry.carved = entry.carved.saturating_sub(1);
    }

    pub fn push(&mut self, index: u32, class: SizeClass) {
        let entry = &mut self.classes[class.index()];
        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Free(class);
        slot.next = entry.head;
        entry.head = index;
        entry.free += 1;
    }

    pub fn pop(&mut self, class: SizeClass) -> Option<u32> {
        let entry = &mut self.classes[class.index()];
        if entry.head == NIL {
            return None;
        }
        let index = entry.head;
        let slot = &mut self.slots[index as usize];
        entry.head = slot.next;
        entry.free -= 1;
        slot.next = NIL;
        slot.state = SlotState::Interior;
        Some(index)
    }

    /// Hand a block out; returns its new generation
    pub fn mark_allocated(&mut self, index: u32, class: SizeClass) -> u32 {
        let slot = &mut self.slots[index as usize];
        slot.state = SlotState::Allocated(class);
        slot.next = NIL;
        slot.generation = slot.generation.wrapping_add(1);
        slot.generation
    }

    /// Smallest class above `class` with a free block
    pub fn first_populated_above(&self, class: SizeClass) -> Option<SizeClass> {
        class
            .above()
            .find(|c| self.classes[c.index()].head != NIL)
    }
}
