/// A packed reference to one port of one cell in the flat cell store.
///
/// A Port is a 32-bit value identifying a port in the net. It encodes two
/// fields in a compact format for cheap comparison and storage:
///
/// Structure (32 bits):
/// - bits 0-3: slot index within the destination cell (0 = principal port)
/// - bits 4-31: destination cell address (word offset into [`Memory`])
///
/// The 4-bit slot field is what caps a kind's arity: no cell can have more
/// than 16 addressable port slots.
///
/// [`Memory`]: crate::mem::Memory
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Port(u32);

impl Port {
    /// Creates a port pointing at `slot` of the cell at `addr`.
    #[inline(always)]
    pub fn new(addr: u32, slot: u8) -> Self {
        Self((addr << 4) | (slot as u32 & 0xF))
    }

    /// Gets the destination cell address.
    #[inline(always)]
    pub fn addr(self) -> u32 {
        self.0 >> 4
    }

    /// Gets the slot index within the destination cell.
    #[inline(always)]
    pub fn slot(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    /// Whether this port targets a principal port (slot 0).
    #[inline(always)]
    pub fn is_principal(self) -> bool {
        self.0 & 0xF == 0
    }

    /// Returns the raw 32-bit value.
    #[inline(always)]
    pub fn as_u32(self) -> u32 {
        self.0
    }

    /// Creates a port from a raw 32-bit value.
    #[inline(always)]
    pub fn from_u32(value: u32) -> Self {
        Self(value)
    }
}
