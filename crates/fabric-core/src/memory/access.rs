//! Byte-lane masking and word indexing shared by the storage ports.

/// Bytes per bus word.
pub const WORD_BYTES: u32 = 4;
/// Number of byte lanes in a bus word.
pub const BYTE_LANES: usize = 4;
/// Low address bits that select a byte lane instead of a word.
pub const LANE_ADDRESS_BITS: u32 = 2;

/// Per-request byte-select mask, one bit per byte lane.
///
/// Bit `i` enables lane `i`, where lane 0 is the least significant byte of
/// the word. Only the low four bits are meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ByteSelect(u8);

impl ByteSelect {
    /// No lanes selected.
    pub const NONE: Self = Self(0);
    /// All four lanes selected.
    pub const ALL: Self = Self(0b1111);

    /// Builds a mask from its low four bits; higher bits are discarded.
    #[must_use]
    pub const fn new(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    /// Returns the raw 4-bit mask.
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` when `lane` is selected.
    #[must_use]
    pub const fn lane_enabled(self, lane: usize) -> bool {
        lane < BYTE_LANES && (self.0 >> lane) & 1 == 1
    }

    /// Returns `true` when no lane is selected.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Expands the mask to a 32-bit value with `0xFF` in every selected lane.
    #[must_use]
    pub const fn lane_mask(self) -> u32 {
        let mut mask = 0_u32;
        let mut lane = 0_u32;
        while lane < WORD_BYTES {
            if (self.0 >> lane) & 1 == 1 {
                mask |= 0xFF << (lane * 8);
            }
            lane += 1;
        }
        mask
    }

    /// Gates all four lanes together by a single enable condition.
    #[must_use]
    pub const fn gate(self, enable: bool) -> Self {
        if enable {
            self
        } else {
            Self::NONE
        }
    }
}

/// Merges `data` into `old` on the lanes selected by `select`.
///
/// Unselected lanes keep their byte from `old`.
#[must_use]
pub const fn merge_lanes(old: u32, data: u32, select: ByteSelect) -> u32 {
    let mask = select.lane_mask();
    (old & !mask) | (data & mask)
}

/// Maps a byte address onto a word index of a store holding `depth` words.
///
/// `depth` must be a non-zero power of two. Lane bits are dropped and the
/// remaining word address wraps modulo `depth`.
#[must_use]
pub const fn word_index(addr: u32, depth: usize) -> usize {
    ((addr >> LANE_ADDRESS_BITS) as usize) & (depth - 1)
}
