//! Saturating activity counters for observing a running fabric.

use crate::{Destination, Segment};

/// Activity counters updated at every clock edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct FabricCounters {
    /// Clock edges simulated.
    pub cycles: u64,
    /// Acks driven on the instruction segment.
    pub instruction_acks: u64,
    /// Acks driven on the data segment.
    pub data_acks: u64,
    /// Data-store words changed by the write port.
    pub data_store_writes: u64,
    /// Output register writes.
    pub output_writes: u64,
    /// Active data-segment requests that decoded to no device.
    pub unmapped_accesses: u64,
}

impl FabricCounters {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one clock edge.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_cycle(&mut self) {
        self.cycles = self.cycles.saturating_add(1);
    }

    /// Records an ack scheduled on `segment`.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_ack(&mut self, segment: Segment) {
        match segment {
            Segment::Instruction => {
                self.instruction_acks = self.instruction_acks.saturating_add(1);
            }
            Segment::Data => {
                self.data_acks = self.data_acks.saturating_add(1);
            }
        }
    }

    /// Records a committed write by destination.
    ///
    /// Unmapped writes never commit; the fabric counts them once per
    /// request through [`Self::record_unmapped`] instead.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_write(&mut self, destination: Destination) {
        match destination {
            Destination::DataStore => {
                self.data_store_writes = self.data_store_writes.saturating_add(1);
            }
            Destination::OutputRegister => {
                self.output_writes = self.output_writes.saturating_add(1);
            }
            Destination::Unmapped => {}
        }
    }

    /// Records an active request to an unmapped address.
    #[allow(clippy::missing_const_for_fn)]
    pub fn record_unmapped(&mut self) {
        self.unmapped_accesses = self.unmapped_accesses.saturating_add(1);
    }

    /// Resets all counters to zero.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
