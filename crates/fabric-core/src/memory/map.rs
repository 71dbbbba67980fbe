//! Data-segment address map and selector decoder.

/// Number of high-order address bits that form the destination selector.
pub const SELECTOR_BITS: u8 = 4;
/// Default bus address width in bits.
pub const DEFAULT_ADDRESS_WIDTH: u8 = 32;
/// Smallest supported bus address width in bits.
pub const MIN_ADDRESS_WIDTH: u8 = 8;
/// Largest supported bus address width in bits.
pub const MAX_ADDRESS_WIDTH: u8 = 32;

/// Selector value routed to the data store.
pub const DATA_STORE_SELECTOR: u8 = 0x1;
/// Selector value routed to the output register.
pub const OUTPUT_REGISTER_SELECTOR: u8 = 0x2;

/// Base address of the data-store window in the default 32-bit map.
pub const DATA_STORE_BASE: u32 = 0x1000_0000;
/// Base address of the output-register window in the default 32-bit map.
pub const OUTPUT_REGISTER_BASE: u32 = 0x2000_0000;

/// Destination selected by a data-segment address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Destination {
    /// Data store (`0x1xxx_xxxx`).
    DataStore,
    /// Output register (`0x2xxx_xxxx`).
    OutputRegister,
    /// Any other selector; reads return zero and writes are dropped.
    Unmapped,
}

impl Destination {
    /// Maps a 4-bit selector value onto its destination.
    #[must_use]
    pub const fn from_selector(selector: u8) -> Self {
        match selector & 0xF {
            DATA_STORE_SELECTOR => Self::DataStore,
            OUTPUT_REGISTER_SELECTOR => Self::OutputRegister,
            _ => Self::Unmapped,
        }
    }

    /// Returns `true` for destinations backed by a device.
    #[must_use]
    pub const fn is_mapped(self) -> bool {
        !matches!(self, Self::Unmapped)
    }
}

/// Returns the mask of bits that exist on a bus of `width` bits.
#[must_use]
pub const fn address_mask(width: u8) -> u32 {
    if width >= MAX_ADDRESS_WIDTH {
        u32::MAX
    } else {
        (1_u32 << width) - 1
    }
}

/// Extracts the selector nibble from `addr` on a bus of `width` bits.
///
/// `width` is clamped to `MIN_ADDRESS_WIDTH..=MAX_ADDRESS_WIDTH`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub const fn selector(addr: u32, width: u8) -> u8 {
    let width = if width < MIN_ADDRESS_WIDTH {
        MIN_ADDRESS_WIDTH
    } else if width > MAX_ADDRESS_WIDTH {
        MAX_ADDRESS_WIDTH
    } else {
        width
    };
    let shift = width - SELECTOR_BITS;
    (((addr & address_mask(width)) >> shift) & 0xF) as u8
}

/// Decodes a 32-bit data-segment address into its destination.
#[must_use]
pub const fn decode_destination(addr: u32) -> Destination {
    decode_destination_with_width(addr, DEFAULT_ADDRESS_WIDTH)
}

/// Decodes an address on a bus of `width` bits into its destination.
#[must_use]
pub const fn decode_destination_with_width(addr: u32, width: u8) -> Destination {
    Destination::from_selector(selector(addr, width))
}

const _: () = assert_default_map_layout();

const fn assert_default_map_layout() {
    assert!(
        matches!(decode_destination(DATA_STORE_BASE), Destination::DataStore),
        "data store base must decode to the data store"
    );
    assert!(
        matches!(
            decode_destination(OUTPUT_REGISTER_BASE),
            Destination::OutputRegister
        ),
        "output register base must decode to the output register"
    );
    assert!(
        matches!(
            decode_destination(OUTPUT_REGISTER_BASE - 1),
            Destination::DataStore
        ),
        "data store window must end where the output register begins"
    );
    assert!(
        matches!(decode_destination(0), Destination::Unmapped),
        "address zero must be unmapped on the data segment"
    );
}
