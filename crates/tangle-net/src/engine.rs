//! Generation-based reduction engine.
//!
//! The engine owns a live [`Memory`] and borrows the compiled dispatch
//! table. Reduction advances in generations: [`Engine::step`] swaps out the
//! current pending redex list, confirms each entry against the live net
//! (entries can be stale, the rewrite that would have consumed them may
//! already have happened) and applies the compiled procedure for each
//! confirmed pair.
//!
//! Within one generation rewrites run in worklist order but are
//! order-independent in outcome: [`attach`]'s path compression lets any
//! pointer that still aims at a mid-rewrite placeholder resolve to the
//! final cell no matter which redex of the batch fired first.

use log::{debug, trace};

use crate::encoding::is_air;
use crate::kind::KindRegistry;
use crate::mem::Memory;
use crate::port::Port;
use crate::rules::CompiledRules;

/// A confirmed active pair, tagged before dispatch.
///
/// The self-loop case is selected by the engine, not discovered inside the
/// rewrite procedures: a cell whose principal port loops back to itself is
/// an erasure, everything else is an ordinary pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redex {
    /// Two distinct cells whose principal ports face each other.
    Pair(u32, u32),
    /// A cell whose principal port loops back to itself.
    Erase(u32),
}

/// Enqueues `addr` when its principal port targets slot 0 of some cell.
///
/// Mutuality is not verified here; [`Engine::step`] re-confirms entries
/// when it processes them, so over-approximating is harmless.
pub fn check_redex(mem: &mut Memory, addr: u32) {
    if mem.port(addr, 0).is_principal() {
        mem.red.push(addr);
    }
}

/// Resolves the port stored at `loc` through any chain of Air placeholders
/// and overwrites it with the final target (path compression), making
/// later lookups O(1).
pub fn attach(mem: &mut Memory, loc: Port) {
    let mut next = mem.load(loc);
    while is_air(mem.kind_at(next.addr())) {
        next = mem.load(next);
    }
    mem.store(loc, next);
}

/// Repopulates the pending list with a full linear pass over memory,
/// advancing `1 + arity` words per cell. Used to seed reduction for a
/// freshly loaded net, which starts with an empty pending list.
pub fn scan_all(mem: &mut Memory, registry: &KindRegistry) {
    mem.red.clear();
    let mut addr = 0u32;
    while (addr as usize) < mem.len_words() {
        let kind = mem.kind_at(addr);
        let arity = registry.arity(kind);
        // Freed placeholders and arity-0 cells have no principal port to
        // examine.
        if !is_air(kind) && arity > 0 {
            check_redex(mem, addr);
        }
        addr += 1 + arity as u32;
    }
}

/// Drives a net to quiescence against a compiled rule set.
pub struct Engine<'rules> {
    mem: Memory,
    rules: &'rules CompiledRules,
}

impl<'rules> Engine<'rules> {
    pub fn new(mem: Memory, rules: &'rules CompiledRules) -> Self {
        Engine { mem, rules }
    }

    pub fn memory(&self) -> &Memory {
        &self.mem
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.mem
    }

    pub fn into_memory(self) -> Memory {
        self.mem
    }

    /// Rewrite counter: one tick per processed pending entry, fired or not.
    pub fn rewrites(&self) -> u64 {
        self.mem.rwt
    }

    /// Whether the pending list is empty.
    pub fn is_quiescent(&self) -> bool {
        self.mem.red.is_empty()
    }

    /// Seeds the pending list from the whole net.
    pub fn scan_all(&mut self) {
        scan_all(&mut self.mem, self.rules.registry());
    }

    /// Runs one generation: drains the current pending list and applies a
    /// compiled rewrite for every entry that still confirms as a mutual
    /// principal-principal pair. Returns the number of processed entries.
    pub fn step(&mut self) -> usize {
        let pending = std::mem::take(&mut self.mem.red);
        for &a in &pending {
            let a_out0 = self.mem.port(a, 0);
            let b = a_out0.addr();
            let b_out0 = self.mem.port(b, 0);
            if a_out0.is_principal() && b_out0.is_principal() {
                let redex = if a == b {
                    Redex::Erase(a)
                } else {
                    Redex::Pair(a, b)
                };
                let fired = self.rules.rewrite(&mut self.mem, redex);
                trace!("redex {:?}: {}", redex, if fired { "fired" } else { "no match" });
            }
            // One tick per processed entry, not per confirmed rewrite;
            // progress metrics depend on this exact counting.
            self.mem.rwt += 1;
        }
        pending.len()
    }

    /// Runs generations until the pending list drains or the optional cap
    /// is reached. Returns the number of generations executed.
    pub fn run(&mut self, max_generations: Option<usize>) -> usize {
        let mut generations = 0;
        while !self.mem.red.is_empty() {
            if max_generations.is_some_and(|max| generations >= max) {
                break;
            }
            let processed = self.step();
            generations += 1;
            debug!("generation {}: {} pending entries", generations, processed);
        }
        generations
    }
}
