//! Info-word encoding for cells.
//!
//! Every cell starts with one info word packing its kind id plus two
//! reserved flag bits:
//!
//! | Bits  | Field       | Purpose                                        |
//! | :---- | :---------- | :--------------------------------------------- |
//! | 0-14  | Kind id     | Index into the kind registry                   |
//! | 15    | Settled     | Reserved, kept for format compatibility        |
//! | 16    | Numeric     | Reserved placeholder for numeric payload ports |
//!
//! The settled bit belonged to an alternate traversal strategy and is not
//! exercised by the reduction path; it is decoded and re-emitted verbatim
//! but never assigned new meaning.

use crate::kind::KindId;

pub const KIND_MASK: u32 = 0x7FFF;
pub const SETTLED_BIT: u32 = 1 << 15;
pub const NUMERIC_BIT: u32 = 1 << 16;

/// Kind ids below this are Air placeholders, one per arity.
pub const AIR_KINDS: KindId = 16;

/// Largest arity a kind may declare. Bounded by the Air id space: a freed
/// cell must have an Air placeholder of its exact arity.
pub const MAX_ARITY: u8 = 15;

/// Encodes the info word for a freshly written cell.
#[inline(always)]
pub const fn pack_info(kind: KindId) -> u32 {
    kind as u32 & KIND_MASK
}

/// Decodes the kind id from an info word.
#[inline(always)]
pub const fn info_kind(info: u32) -> KindId {
    (info & KIND_MASK) as KindId
}

/// Whether a kind id denotes an Air placeholder.
#[inline(always)]
pub const fn is_air(kind: KindId) -> bool {
    kind < AIR_KINDS
}

/// The Air placeholder kind sized for `arity` ports.
#[inline(always)]
pub const fn air_for_arity(arity: u8) -> KindId {
    arity as KindId
}

/// Decodes the reserved settled flag.
#[inline(always)]
pub const fn is_settled(info: u32) -> bool {
    info & SETTLED_BIT != 0
}

/// Sets the reserved settled flag.
#[inline(always)]
pub const fn set_settled(info: u32) -> u32 {
    info | SETTLED_BIT
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn info_round_trips_kind() {
        assert_eq!(info_kind(pack_info(18)), 18);
        assert_eq!(info_kind(pack_info(0x7FFF)), 0x7FFF);
    }

    #[test]
    fn settled_bit_does_not_disturb_kind() {
        let info = set_settled(pack_info(21));
        assert!(is_settled(info));
        assert_eq!(info_kind(info), 21);
        assert!(!is_settled(pack_info(21)));
    }

    #[test]
    fn air_kinds_are_their_arity() {
        for arity in 0..=MAX_ARITY {
            assert!(is_air(air_for_arity(arity)));
        }
        assert!(!is_air(16));
    }
}
