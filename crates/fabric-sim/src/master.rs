//! Scripted stand-in for the processor core.

use fabric_core::{BusMaster, BusOutputs, BusRequests, DataRequest, InstructionRequest};
use log::debug;

use crate::script::ScriptOp;

/// A data read acknowledged by the fabric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadResult {
    /// Cycle the ack was observed in.
    pub cycle: u64,
    /// Byte address read.
    pub address: u32,
    /// Word returned with the ack.
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InFlight {
    Read(u32),
    Write,
}

/// Bus master that fetches the instruction stream sequentially and replays a
/// script on the data segment.
///
/// Fetched words are counted but not executed. Each segment keeps at most one
/// request outstanding and issues the next one in the cycle its ack arrives.
#[derive(Debug, Clone)]
pub struct ScriptedMaster {
    ops: Vec<ScriptOp>,
    next: usize,
    repeat: bool,
    pc: u32,
    fetch_pending: bool,
    in_flight: Option<InFlight>,
    idle_remaining: u64,
    fetched: u64,
    reads: Vec<ReadResult>,
}

impl ScriptedMaster {
    /// Creates a master replaying `ops` once, or forever when `repeat` is set.
    #[must_use]
    pub const fn new(ops: Vec<ScriptOp>, repeat: bool) -> Self {
        Self {
            ops,
            next: 0,
            repeat,
            pc: 0,
            fetch_pending: false,
            in_flight: None,
            idle_remaining: 0,
            fetched: 0,
            reads: Vec::new(),
        }
    }

    /// Address of the next instruction fetch.
    #[must_use]
    pub const fn pc(&self) -> u32 {
        self.pc
    }

    /// Instruction words acknowledged so far.
    #[must_use]
    pub const fn fetched(&self) -> u64 {
        self.fetched
    }

    /// Data reads acknowledged so far, in order.
    #[must_use]
    pub fn reads(&self) -> &[ReadResult] {
        &self.reads
    }

    /// Returns `true` once every script step has been issued and answered.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn script_done(&self) -> bool {
        !self.repeat
            && self.next >= self.ops.len()
            && self.in_flight.is_none()
            && self.idle_remaining == 0
    }

    fn next_op(&mut self) -> Option<ScriptOp> {
        if self.next >= self.ops.len() {
            if !self.repeat || self.ops.is_empty() {
                return None;
            }
            self.next = 0;
        }
        let op = self.ops[self.next];
        self.next += 1;
        Some(op)
    }

    fn next_data_request(&mut self) -> DataRequest {
        if self.in_flight.is_some() {
            return DataRequest::IDLE;
        }
        if self.idle_remaining > 0 {
            self.idle_remaining -= 1;
            return DataRequest::IDLE;
        }

        match self.next_op() {
            Some(ScriptOp::Write {
                address,
                data,
                select,
            }) => {
                self.in_flight = Some(InFlight::Write);
                DataRequest::write(address, data, select)
            }
            Some(ScriptOp::Read { address }) => {
                self.in_flight = Some(InFlight::Read(address));
                DataRequest::read(address)
            }
            Some(ScriptOp::Idle { cycles }) => {
                self.idle_remaining = cycles.saturating_sub(1);
                DataRequest::IDLE
            }
            None => DataRequest::IDLE,
        }
    }
}

impl BusMaster for ScriptedMaster {
    fn drive(&mut self, cycle: u64, outputs: &BusOutputs) -> BusRequests {
        if outputs.instruction.ack && self.fetch_pending {
            self.fetch_pending = false;
            self.fetched += 1;
            self.pc = self.pc.wrapping_add(4);
        }

        if outputs.data.ack {
            if let Some(InFlight::Read(address)) = self.in_flight {
                debug!(
                    "cycle {cycle}: read {address:#010x} -> {:#010x}",
                    outputs.data.read_data
                );
                self.reads.push(ReadResult {
                    cycle,
                    address,
                    value: outputs.data.read_data,
                });
            }
            self.in_flight = None;
        }

        let instruction = if self.fetch_pending {
            InstructionRequest::IDLE
        } else {
            self.fetch_pending = true;
            InstructionRequest::fetch(self.pc)
        };

        BusRequests {
            instruction,
            data: self.next_data_request(),
        }
    }
}
