//! The flat cell store.
//!
//! Cells live contiguously in one word array as `[info, port_0, ..,
//! port_{arity-1}]`. Allocation is bump-at-the-end with size-bucketed LIFO
//! free lists: freeing records the address in the bucket for that size,
//! allocating pops the bucket before growing the array. There is no
//! coalescing and no reuse tagging, so a freed-then-reused address is
//! indistinguishable from its prior identity; callers must not hold a cell
//! address across an allocation.
//!
//! The pending redex list and the rewrite counter live here too, so that
//! compiled rewrite procedures can enqueue follow-up work while they
//! mutate the store.

use crate::encoding::info_kind;
use crate::kind::KindId;
use crate::port::Port;

/// Size in words of the largest cell: one info word plus 15 ports.
pub const MAX_CELL_WORDS: usize = 16;

#[derive(Debug)]
pub struct Memory {
    words: Vec<u32>,
    /// Free lists indexed by cell size in words.
    buckets: [Vec<u32>; MAX_CELL_WORDS + 1],
    /// Pending redex list: cell addresses to examine next generation.
    pub red: Vec<u32>,
    /// Rewrite counter, bumped once per processed pending entry.
    pub rwt: u64,
}

impl Memory {
    pub fn new() -> Self {
        Memory {
            words: Vec::new(),
            buckets: std::array::from_fn(|_| Vec::new()),
            red: Vec::new(),
            rwt: 0,
        }
    }

    /// Allocates `size` contiguous words, reusing a freed slot of the same
    /// size when one is available. Never fails; the backing store grows
    /// unbounded.
    pub fn alloc(&mut self, size: u32) -> u32 {
        debug_assert!(size as usize <= MAX_CELL_WORDS);
        if let Some(addr) = self.buckets[size as usize].pop() {
            return addr;
        }
        let addr = self.words.len() as u32;
        self.words.resize(self.words.len() + size as usize, 0);
        addr
    }

    /// Returns a cell's storage to the bucket for its size. The payload is
    /// left in place; it is overwritten on the next allocation of that
    /// bucket.
    pub fn free(&mut self, addr: u32, size: u32) {
        self.buckets[size as usize].push(addr);
    }

    #[inline(always)]
    pub fn info(&self, addr: u32) -> u32 {
        self.words[addr as usize]
    }

    #[inline(always)]
    pub fn set_info(&mut self, addr: u32, info: u32) {
        self.words[addr as usize] = info;
    }

    /// The kind id of the cell at `addr`.
    #[inline(always)]
    pub fn kind_at(&self, addr: u32) -> KindId {
        info_kind(self.info(addr))
    }

    /// Reads port `slot` of the cell at `addr`.
    #[inline(always)]
    pub fn port(&self, addr: u32, slot: u8) -> Port {
        Port::from_u32(self.words[addr as usize + 1 + slot as usize])
    }

    #[inline(always)]
    pub fn set_port(&mut self, addr: u32, slot: u8, value: Port) {
        self.words[addr as usize + 1 + slot as usize] = value.as_u32();
    }

    /// Reads the port value stored at the location `loc` points to.
    #[inline(always)]
    pub fn load(&self, loc: Port) -> Port {
        self.port(loc.addr(), loc.slot())
    }

    /// Overwrites the port value stored at the location `loc` points to.
    #[inline(always)]
    pub fn store(&mut self, loc: Port, value: Port) {
        self.set_port(loc.addr(), loc.slot(), value);
    }

    /// Current length of the backing array in words.
    pub fn len_words(&self) -> usize {
        self.words.len()
    }

    /// Number of freed-and-unreused slots in the bucket for `size`.
    pub fn free_count(&self, size: u32) -> usize {
        self.buckets[size as usize].len()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::pack_info;

    #[test]
    fn alloc_bumps_then_reuses_lifo() {
        let mut mem = Memory::new();
        let a = mem.alloc(4);
        let b = mem.alloc(4);
        assert_eq!(a, 0);
        assert_eq!(b, 4);
        assert_eq!(mem.len_words(), 8);

        mem.free(a, 4);
        mem.free(b, 4);
        // LIFO: the most recently freed slot comes back first.
        assert_eq!(mem.alloc(4), b);
        assert_eq!(mem.alloc(4), a);
        // Reuse must not have grown the backing store.
        assert_eq!(mem.len_words(), 8);
    }

    #[test]
    fn buckets_are_per_size() {
        let mut mem = Memory::new();
        let small = mem.alloc(2);
        mem.free(small, 2);
        // A different size must not pick up the freed slot.
        let big = mem.alloc(4);
        assert_ne!(big, small);
        assert_eq!(mem.alloc(2), small);
    }

    #[test]
    fn address_zero_is_reusable() {
        let mut mem = Memory::new();
        let a = mem.alloc(3);
        assert_eq!(a, 0);
        mem.free(a, 3);
        assert_eq!(mem.alloc(3), 0);
    }

    #[test]
    fn cell_words_round_trip() {
        let mut mem = Memory::new();
        let addr = mem.alloc(3);
        mem.set_info(addr, pack_info(18));
        mem.set_port(addr, 0, Port::new(7, 1));
        mem.set_port(addr, 1, Port::new(addr, 1));
        assert_eq!(mem.kind_at(addr), 18);
        assert_eq!(mem.port(addr, 0), Port::new(7, 1));

        let loc = Port::new(addr, 1);
        assert_eq!(mem.load(loc), loc);
        mem.store(loc, Port::new(9, 0));
        assert_eq!(mem.load(loc), Port::new(9, 0));
    }
}
