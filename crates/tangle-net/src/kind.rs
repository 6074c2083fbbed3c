//! The kind registry: the immutable table of node types.
//!
//! Ids 0-15 are the Air placeholders (one per arity, id doubles as arity),
//! 16 and 17 are the fixed built-ins `Rot` and `Era`, and user kinds are
//! assigned ids from 18 up in declaration order. Once rule compilation
//! finishes the registry never changes; the id space stays dense and stable
//! for the lifetime of the dispatch table.

use fxhash::FxHashMap;

use crate::encoding::{AIR_KINDS, MAX_ARITY};
use crate::rules::RuleError;

/// Numeric id of a registered kind, as stored in cell info words.
pub type KindId = u16;

/// Fixed built-in: the root-marker agent.
pub const ROT: KindId = 16;
/// Fixed built-in: the eraser agent.
pub const ERA: KindId = 17;
/// First id handed out to user-declared kinds.
pub const FIRST_USER: KindId = 18;

/// A registered node kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kind {
    pub name: String,
    pub arity: u8,
    pub id: KindId,
}

/// Name and id indexed table of kinds, pre-seeded with the built-ins.
///
/// Re-declaring a name rebinds it to a fresh id (last write wins); the old
/// id keeps its slot so ids already written into cells stay valid.
#[derive(Debug, Clone)]
pub struct KindRegistry {
    kinds: Vec<Kind>,
    by_name: FxHashMap<String, KindId>,
}

impl KindRegistry {
    pub fn new() -> Self {
        let mut registry = KindRegistry {
            kinds: Vec::with_capacity(FIRST_USER as usize),
            by_name: FxHashMap::default(),
        };
        for arity in 0..AIR_KINDS as u8 {
            registry.insert(format!("Air{}", arity), arity);
        }
        registry.insert("Rot".to_string(), 1);
        registry.insert("Era".to_string(), 1);
        registry
    }

    fn insert(&mut self, name: String, arity: u8) -> KindId {
        let id = self.kinds.len() as KindId;
        self.by_name.insert(name.clone(), id);
        self.kinds.push(Kind { name, arity, id });
        id
    }

    /// Registers a user kind, rebinding the name if it already exists.
    pub fn declare(&mut self, name: &str, arity: u8) -> Result<KindId, RuleError> {
        if arity > MAX_ARITY {
            return Err(RuleError::ArityTooLarge {
                name: name.to_string(),
                arity,
            });
        }
        Ok(self.insert(name.to_string(), arity))
    }

    /// Looks a kind up by name.
    pub fn id(&self, name: &str) -> Option<KindId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: KindId) -> Option<&Kind> {
        self.kinds.get(id as usize)
    }

    /// The declared arity of `id`.
    ///
    /// # Panics
    /// Panics if `id` was never registered; info words only ever hold
    /// registered ids.
    #[inline]
    pub fn arity(&self, id: KindId) -> u8 {
        self.kinds[id as usize].arity
    }

    #[inline]
    pub fn name(&self, id: KindId) -> &str {
        &self.kinds[id as usize].name
    }

    /// Total number of registered kinds, built-ins included.
    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    /// Iterates over all registered kinds in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Kind> {
        self.kinds.iter()
    }
}

impl Default for KindRegistry {
    fn default() -> Self {
        Self::new()
    }
}
