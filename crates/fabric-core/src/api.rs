//! Public host-facing contracts: configuration, bus-master signals, and
//! trace hooks.

use crate::{
    ByteSelect, Destination, FabricError, StoreKind, DEFAULT_ADDRESS_WIDTH, DEFAULT_STORE_DEPTH,
    MAX_ADDRESS_WIDTH, MIN_ADDRESS_WIDTH,
};

/// Construction-time configuration for a fabric instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FabricConfig {
    /// Instruction-store depth in words.
    pub instruction_depth: usize,
    /// Data-store depth in words.
    pub data_depth: usize,
    /// Bus address width in bits.
    pub address_width: u8,
    /// Whether the output register drives an external indicator line.
    pub has_indicator: bool,
}

impl Default for FabricConfig {
    fn default() -> Self {
        Self {
            instruction_depth: DEFAULT_STORE_DEPTH,
            data_depth: DEFAULT_STORE_DEPTH,
            address_width: DEFAULT_ADDRESS_WIDTH,
            has_indicator: false,
        }
    }
}

impl FabricConfig {
    /// Checks every construction-time parameter.
    ///
    /// # Errors
    ///
    /// Returns the first invalid depth or an out-of-range address width.
    pub const fn validate(&self) -> Result<(), FabricError> {
        if let Err(error) = crate::validate_depth(StoreKind::Instruction, self.instruction_depth) {
            return Err(error);
        }
        if let Err(error) = crate::validate_depth(StoreKind::Data, self.data_depth) {
            return Err(error);
        }
        if self.address_width < MIN_ADDRESS_WIDTH || self.address_width > MAX_ADDRESS_WIDTH {
            return Err(FabricError::AddressWidthOutOfRange {
                width: self.address_width,
            });
        }
        Ok(())
    }
}

/// Identifies one of the two independent bus segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Segment {
    /// Read-only instruction fetch segment.
    Instruction,
    /// Read-write data segment.
    Data,
}

/// Master-driven signals on the instruction segment for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InstructionRequest {
    /// `cycle-active`: a transaction is in progress this cycle.
    pub cycle_active: bool,
    /// Byte address; routed to the read port whether or not active.
    pub address: u32,
}

impl InstructionRequest {
    /// No transaction, address held at zero.
    pub const IDLE: Self = Self {
        cycle_active: false,
        address: 0,
    };

    /// Active fetch from `address`.
    #[must_use]
    pub const fn fetch(address: u32) -> Self {
        Self {
            cycle_active: true,
            address,
        }
    }
}

/// Master-driven signals on the data segment for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DataRequest {
    /// `cycle-active`: a transaction is in progress this cycle.
    pub cycle_active: bool,
    /// Byte address; routed to the read port whether or not active.
    pub address: u32,
    /// Transaction is a write.
    pub write_enable: bool,
    /// Word to write.
    pub write_data: u32,
    /// Lanes of `write_data` to commit.
    pub byte_select: ByteSelect,
}

impl DataRequest {
    /// No transaction, all signals low.
    pub const IDLE: Self = Self {
        cycle_active: false,
        address: 0,
        write_enable: false,
        write_data: 0,
        byte_select: ByteSelect::NONE,
    };

    /// Active read of the word at `address`.
    #[must_use]
    pub const fn read(address: u32) -> Self {
        Self {
            cycle_active: true,
            address,
            write_enable: false,
            write_data: 0,
            byte_select: ByteSelect::ALL,
        }
    }

    /// Active write of the `select`ed lanes of `data` at `address`.
    #[must_use]
    pub const fn write(address: u32, data: u32, select: ByteSelect) -> Self {
        Self {
            cycle_active: true,
            address,
            write_enable: true,
            write_data: data,
            byte_select: select,
        }
    }
}

/// Everything the master drives in one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BusRequests {
    /// Instruction segment signals.
    pub instruction: InstructionRequest,
    /// Data segment signals.
    pub data: DataRequest,
}

/// Fabric-driven signals on one segment, as seen by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct SegmentOutputs {
    /// Asserted exactly one cycle after `cycle-active`.
    pub ack: bool,
    /// Word read for the address driven on the previous cycle.
    pub read_data: u32,
}

/// Fabric-driven signals on both segments for one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct BusOutputs {
    /// Instruction segment outputs.
    pub instruction: SegmentOutputs,
    /// Data segment outputs.
    pub data: SegmentOutputs,
}

impl BusOutputs {
    /// Outputs for `segment`.
    #[must_use]
    pub const fn segment(&self, segment: Segment) -> SegmentOutputs {
        match segment {
            Segment::Instruction => self.instruction,
            Segment::Data => self.data,
        }
    }
}

/// External processor core driving the fabric.
///
/// The master sees the outputs visible at the start of a cycle and returns
/// the signals it drives for that same cycle. It must keep at most one
/// unacknowledged transaction per segment.
pub trait BusMaster {
    /// Drives cycle `cycle` given the fabric outputs visible in it.
    fn drive(&mut self, cycle: u64, outputs: &BusOutputs) -> BusRequests;
}

/// Aggregated outcome of [`crate::run_cycles`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RunOutcome {
    /// Cycles simulated by this call.
    pub cycles: u64,
    /// Instruction-segment acks observed by the master.
    pub instruction_acks: u64,
    /// Data-segment acks observed by the master.
    pub data_acks: u64,
}

/// Trace events emitted in commit order when a sink is attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TraceEvent {
    /// `cycle-active` sampled on a segment at this edge.
    Request {
        /// Cycle the request was driven in.
        cycle: u64,
        /// Segment carrying the request.
        segment: Segment,
        /// Byte address.
        address: u32,
        /// True for data-segment writes.
        is_write: bool,
    },
    /// `ack` driven to the master during this cycle.
    Ack {
        /// Cycle the ack is visible in.
        cycle: u64,
        /// Segment carrying the ack.
        segment: Segment,
    },
    /// Data store word updated at this edge.
    DataStoreWrite {
        /// Cycle the write was driven in.
        cycle: u64,
        /// Word index that changed.
        index: usize,
        /// Lanes committed.
        select: ByteSelect,
        /// Word value after the merge.
        value: u32,
    },
    /// Output register replaced at this edge.
    OutputWrite {
        /// Cycle the write was driven in.
        cycle: u64,
        /// New register value.
        value: u32,
    },
    /// Active data-segment request decoded to no device.
    UnmappedAccess {
        /// Cycle the request was driven in.
        cycle: u64,
        /// Byte address.
        address: u32,
        /// True when the dropped request was a write.
        is_write: bool,
    },
    /// External indicator line changed level.
    IndicatorChanged {
        /// Cycle the causing write was driven in.
        cycle: u64,
        /// New line level.
        level: bool,
    },
}

/// Sink trait for deterministic trace hooks.
pub trait TraceSink {
    /// Records an event in commit order.
    fn on_event(&mut self, event: TraceEvent);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NullTraceSink;

impl TraceSink for NullTraceSink {
    fn on_event(&mut self, _event: TraceEvent) {}
}

impl TraceSink for Vec<TraceEvent> {
    fn on_event(&mut self, event: TraceEvent) {
        self.push(event);
    }
}

/// Result of the combinational phase of one cycle.
///
/// Computed from the current state and the master's signals before any
/// clocked element changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CombinationalView {
    /// Destination decoded from the data-segment address.
    pub destination: Destination,
    /// Instruction-store read port output for the current address.
    pub instruction_word: u32,
    /// Data-segment read value for the current address; zero unless the
    /// address decodes to the data store.
    pub data_word: u32,
    /// Data-store write port inputs after decode gating.
    pub data_write: crate::WritePort,
    /// Value the output register takes at the edge, when written.
    pub output_write: Option<u32>,
}
