//! Storage units, byte-lane masking, and the data-segment address map.

/// Byte-lane masking and word indexing.
pub mod access;
/// Data-segment address map and selector decoder.
pub mod map;
/// Instruction and data storage units.
pub mod storage;

pub use access::{merge_lanes, word_index, ByteSelect, BYTE_LANES, LANE_ADDRESS_BITS, WORD_BYTES};
pub use map::{
    address_mask, decode_destination, decode_destination_with_width, selector, Destination,
    DATA_STORE_BASE, DATA_STORE_SELECTOR, DEFAULT_ADDRESS_WIDTH, MAX_ADDRESS_WIDTH,
    MIN_ADDRESS_WIDTH, OUTPUT_REGISTER_BASE, OUTPUT_REGISTER_SELECTOR, SELECTOR_BITS,
};
pub use storage::{validate_depth, DataStore, InstructionStore, WritePort, DEFAULT_STORE_DEPTH};
