//! Cycle-level model of a single-master SoC bus fabric.

/// Storage units, byte-lane masking, and the data-segment address map.
pub mod memory;
pub use memory::{
    address_mask, decode_destination, decode_destination_with_width, merge_lanes, selector,
    validate_depth, word_index, ByteSelect, DataStore, Destination, InstructionStore, WritePort,
    BYTE_LANES, DATA_STORE_BASE, DATA_STORE_SELECTOR, DEFAULT_ADDRESS_WIDTH, DEFAULT_STORE_DEPTH,
    LANE_ADDRESS_BITS, MAX_ADDRESS_WIDTH, MIN_ADDRESS_WIDTH, OUTPUT_REGISTER_BASE,
    OUTPUT_REGISTER_SELECTOR, SELECTOR_BITS, WORD_BYTES,
};

/// Memory-mapped output register.
pub mod output;
pub use output::OutputRegister;

/// Construction, image, and snapshot error types.
pub mod error;
pub use error::{FabricError, ImageError, SnapshotError, StoreKind};

/// Firmware image packing.
pub mod image;
pub use image::words_from_le_bytes;

/// Fixed one-cycle acknowledgment delay.
pub mod timing;
pub use timing::{AckDelay, AckState, ACK_LATENCY_CYCLES};

/// Public host-facing API contract and integration types.
pub mod api;
pub use api::{
    BusMaster, BusOutputs, BusRequests, CombinationalView, DataRequest, FabricConfig,
    InstructionRequest, NullTraceSink, RunOutcome, Segment, SegmentOutputs, TraceEvent, TraceSink,
};

/// Activity counters.
pub mod diag;
pub use diag::FabricCounters;

/// Versioned runtime-state snapshots.
pub mod snapshot;
pub use snapshot::{FabricSnapshot, SnapshotVersion};

/// Two-segment bus fabric and run loop.
pub mod fabric;
pub use fabric::{run_cycles, run_cycles_with, BusFabric};

#[cfg(test)]
use proptest as _;
#[cfg(test)]
use rstest as _;
