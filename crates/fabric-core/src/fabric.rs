//! Bus fabric composing the address decoder, both storage units, and the
//! output register behind two independently acknowledged segments.
//!
//! Every simulated cycle runs in two phases:
//! 1. Evaluate: decode the data address, drive both read ports, and gate the
//!    write enables from the current state and the master's signals.
//! 2. Commit: at the clock edge, latch read data, apply the gated writes, and
//!    shift `cycle-active` into the ack delay registers.
//!
//! Reads evaluated in phase 1 always see the pre-edge contents, which gives
//! the data store its non-transparent read-during-write behaviour and the
//! fixed one-cycle round trip on both segments.

use std::convert::Infallible;

use log::{debug, trace};

use crate::{
    address_mask, decode_destination_with_width, word_index, AckDelay, AckState, BusMaster,
    BusOutputs, BusRequests, CombinationalView, DataStore, Destination, FabricConfig,
    FabricCounters, FabricError, FabricSnapshot, InstructionStore, NullTraceSink, OutputRegister,
    RunOutcome, Segment, SegmentOutputs, SnapshotError, SnapshotVersion, TraceEvent, TraceSink,
    WritePort,
};

/// Cycle-level model of the instruction and data bus segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusFabric {
    config: FabricConfig,
    instruction_store: InstructionStore,
    data_store: DataStore,
    output: OutputRegister,
    instruction_ack: AckDelay,
    data_ack: AckDelay,
    instruction_read: u32,
    data_read: u32,
    cycle: u64,
    counters: FabricCounters,
}

impl BusFabric {
    /// Builds a fabric with the instruction store preloaded from `image`.
    ///
    /// # Errors
    ///
    /// Returns a [`FabricError`] when the configuration is invalid or the
    /// image does not fit in the instruction store.
    pub fn new(config: FabricConfig, image: &[u32]) -> Result<Self, FabricError> {
        config.validate()?;
        let instruction_store = InstructionStore::from_image(image, config.instruction_depth)?;
        let data_store = DataStore::zeroed(config.data_depth)?;

        debug!(
            "fabric ready: {} image words, imem {} words, dmem {} words, {}-bit addresses",
            image.len(),
            config.instruction_depth,
            config.data_depth,
            config.address_width
        );

        Ok(Self {
            config,
            instruction_store,
            data_store,
            output: OutputRegister::default(),
            instruction_ack: AckDelay::default(),
            data_ack: AckDelay::default(),
            instruction_read: 0,
            data_read: 0,
            cycle: 0,
            counters: FabricCounters::new(),
        })
    }

    /// Construction-time configuration.
    #[must_use]
    pub const fn config(&self) -> &FabricConfig {
        &self.config
    }

    /// Number of clock edges since construction or reset.
    #[must_use]
    pub const fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Registered outputs visible to the master during the current cycle.
    #[must_use]
    pub const fn outputs(&self) -> BusOutputs {
        BusOutputs {
            instruction: SegmentOutputs {
                ack: self.instruction_ack.ack(),
                read_data: self.instruction_read,
            },
            data: SegmentOutputs {
                ack: self.data_ack.ack(),
                read_data: self.data_read,
            },
        }
    }

    /// Ack delay state of `segment`.
    #[must_use]
    pub const fn ack_state(&self, segment: Segment) -> AckState {
        match segment {
            Segment::Instruction => self.instruction_ack.state(),
            Segment::Data => self.data_ack.state(),
        }
    }

    /// Current output register value.
    #[must_use]
    pub const fn output_register(&self) -> u32 {
        self.output.value()
    }

    /// Indicator line level, or `None` when no indicator is attached.
    #[must_use]
    pub const fn indicator(&self) -> Option<bool> {
        if self.config.has_indicator {
            Some(self.output.indicator_level())
        } else {
            None
        }
    }

    /// Instruction store contents.
    #[must_use]
    pub const fn instruction_store(&self) -> &InstructionStore {
        &self.instruction_store
    }

    /// Data store contents.
    #[must_use]
    pub const fn data_store(&self) -> &DataStore {
        &self.data_store
    }

    /// Activity counters since construction or reset.
    #[must_use]
    pub const fn counters(&self) -> &FabricCounters {
        &self.counters
    }

    /// Phase 1: computes every combinational signal for `requests` without
    /// touching clocked state.
    #[must_use]
    pub fn evaluate(&self, requests: &BusRequests) -> CombinationalView {
        let width = self.config.address_width;
        let mask = address_mask(width);
        let data = &requests.data;
        let data_addr = data.address & mask;
        let destination = decode_destination_with_width(data_addr, width);

        let data_word = match destination {
            Destination::DataStore => self.data_store.read(data_addr),
            Destination::OutputRegister | Destination::Unmapped => 0,
        };

        let store_enable = destination == Destination::DataStore && data.write_enable;
        let data_write = WritePort {
            addr: data_addr,
            data: data.write_data,
            select: data.byte_select.gate(store_enable),
            enable: store_enable,
        };
        let output_write = (destination == Destination::OutputRegister && data.write_enable)
            .then_some(data.write_data);

        CombinationalView {
            destination,
            instruction_word: self
                .instruction_store
                .read(requests.instruction.address & mask),
            data_word,
            data_write,
            output_write,
        }
    }

    /// Simulates one clock cycle and returns the outputs visible in the next.
    pub fn step(&mut self, requests: &BusRequests) -> BusOutputs {
        self.step_traced(requests, &mut NullTraceSink)
    }

    /// Simulates one clock cycle, reporting state changes to `sink`.
    pub fn step_traced(&mut self, requests: &BusRequests, sink: &mut dyn TraceSink) -> BusOutputs {
        let view = self.evaluate(requests);
        self.commit(requests, &view, sink);
        self.outputs()
    }

    /// Phase 2: the clock edge.
    fn commit(&mut self, requests: &BusRequests, view: &CombinationalView, sink: &mut dyn TraceSink) {
        let cycle = self.cycle;
        let data = &requests.data;

        if requests.instruction.cycle_active {
            sink.on_event(TraceEvent::Request {
                cycle,
                segment: Segment::Instruction,
                address: requests.instruction.address,
                is_write: false,
            });
        }

        if data.cycle_active {
            sink.on_event(TraceEvent::Request {
                cycle,
                segment: Segment::Data,
                address: data.address,
                is_write: data.write_enable,
            });
            if !view.destination.is_mapped() {
                trace!(
                    "cycle {cycle}: unmapped {} at {:#010x} dropped",
                    if data.write_enable { "write" } else { "read" },
                    data.address
                );
                self.counters.record_unmapped();
                sink.on_event(TraceEvent::UnmappedAccess {
                    cycle,
                    address: data.address,
                    is_write: data.write_enable,
                });
            }
        }

        // Read data is sampled before the write lands.
        self.instruction_read = view.instruction_word;
        self.data_read = view.data_word;

        if let Some(value) = self.data_store.write(&view.data_write) {
            let index = word_index(view.data_write.addr, self.data_store.depth());
            trace!(
                "cycle {cycle}: dmem[{index}] <- {value:#010x} (lanes {:#06b})",
                view.data_write.select.bits()
            );
            self.counters.record_write(Destination::DataStore);
            sink.on_event(TraceEvent::DataStoreWrite {
                cycle,
                index,
                select: view.data_write.select,
                value,
            });
        }

        if let Some(value) = view.output_write {
            let previous_level = self.output.indicator_level();
            self.output.latch(value);
            trace!("cycle {cycle}: output register <- {value:#010x}");
            self.counters.record_write(Destination::OutputRegister);
            sink.on_event(TraceEvent::OutputWrite { cycle, value });

            let level = self.output.indicator_level();
            if self.config.has_indicator && level != previous_level {
                sink.on_event(TraceEvent::IndicatorChanged { cycle, level });
            }
        }

        self.instruction_ack.clock(requests.instruction.cycle_active);
        self.data_ack.clock(data.cycle_active);
        self.cycle += 1;
        self.counters.record_cycle();

        for segment in [Segment::Instruction, Segment::Data] {
            if self.ack_state(segment) == AckState::AckPending {
                self.counters.record_ack(segment);
                sink.on_event(TraceEvent::Ack {
                    cycle: self.cycle,
                    segment,
                });
            }
        }
    }

    /// Returns every clocked element to its power-on value.
    ///
    /// The data store is zero-filled and the output register cleared. The
    /// instruction store keeps its firmware image.
    pub fn reset(&mut self) {
        self.data_store.clear();
        self.output = OutputRegister::default();
        self.instruction_ack.reset();
        self.data_ack.reset();
        self.instruction_read = 0;
        self.data_read = 0;
        self.cycle = 0;
        self.counters.reset();
        debug!("fabric reset");
    }

    /// Captures all runtime state except the immutable instruction image.
    #[must_use]
    pub fn snapshot(&self) -> FabricSnapshot {
        FabricSnapshot {
            version: SnapshotVersion::V1,
            config: self.config,
            cycle: self.cycle,
            data: self.data_store.words().into(),
            output: self.output.value(),
            instruction_ack: self.instruction_ack.state(),
            data_ack: self.data_ack.state(),
            instruction_read: self.instruction_read,
            data_read: self.data_read,
        }
    }

    /// Rebuilds a fabric from `snapshot`, reloading the instruction store
    /// from `image`. Counters restart from zero.
    ///
    /// # Errors
    ///
    /// Returns a [`SnapshotError`] when the configuration or image is
    /// invalid, or the data store does not match the configured depth.
    pub fn restore(snapshot: FabricSnapshot, image: &[u32]) -> Result<Self, SnapshotError> {
        let FabricSnapshot {
            version: SnapshotVersion::V1,
            config,
            cycle,
            data,
            output,
            instruction_ack,
            data_ack,
            instruction_read,
            data_read,
        } = snapshot;

        config.validate()?;
        if data.len() != config.data_depth {
            return Err(SnapshotError::DataLengthMismatch {
                expected: config.data_depth,
                actual: data.len(),
            });
        }

        let instruction_store = InstructionStore::from_image(image, config.instruction_depth)?;
        let data_store = DataStore::from_words(data)?;
        debug!("fabric restored at cycle {cycle}");

        Ok(Self {
            config,
            instruction_store,
            data_store,
            output: OutputRegister::with_value(output),
            instruction_ack: AckDelay::with_state(instruction_ack),
            data_ack: AckDelay::with_state(data_ack),
            instruction_read,
            data_read,
            cycle,
            counters: FabricCounters::new(),
        })
    }
}

/// Drives `fabric` from `master` for `cycles` clock cycles.
///
/// Each cycle the master sees the currently visible outputs, drives its
/// requests, and the fabric advances one edge.
pub fn run_cycles<M: BusMaster + ?Sized>(
    fabric: &mut BusFabric,
    master: &mut M,
    cycles: u64,
    sink: &mut dyn TraceSink,
) -> RunOutcome {
    let observed = run_cycles_with(fabric, master, cycles, sink, |_, _, _| {
        Ok::<(), Infallible>(())
    });
    match observed {
        Ok(outcome) => outcome,
        Err(never) => match never {},
    }
}

/// [`run_cycles`] with a per-cycle observer.
///
/// `observe` runs after the master has driven a cycle and before the clock
/// edge, so the fabric it sees still holds the pre-edge state. The first
/// error stops the run.
///
/// # Errors
///
/// Returns the first error produced by `observe`.
pub fn run_cycles_with<M, F, E>(
    fabric: &mut BusFabric,
    master: &mut M,
    cycles: u64,
    sink: &mut dyn TraceSink,
    mut observe: F,
) -> Result<RunOutcome, E>
where
    M: BusMaster + ?Sized,
    F: FnMut(&BusFabric, &BusRequests, &BusOutputs) -> Result<(), E>,
{
    let mut outcome = RunOutcome::default();
    for _ in 0..cycles {
        let outputs = fabric.outputs();
        if outputs.instruction.ack {
            outcome.instruction_acks += 1;
        }
        if outputs.data.ack {
            outcome.data_acks += 1;
        }
        let requests = master.drive(fabric.cycle(), &outputs);
        observe(fabric, &requests, &outputs)?;
        fabric.step_traced(&requests, sink);
        outcome.cycles += 1;
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::{run_cycles_with, BusFabric};
    use crate::{
        AckState, BusMaster, BusOutputs, BusRequests, ByteSelect, DataRequest, Destination,
        FabricConfig, InstructionRequest, NullTraceSink, Segment, TraceEvent,
    };

    fn fabric() -> BusFabric {
        BusFabric::new(FabricConfig::default(), &[0x13, 0x13]).expect("valid fabric")
    }

    fn data(request: DataRequest) -> BusRequests {
        BusRequests {
            instruction: InstructionRequest::IDLE,
            data: request,
        }
    }

    #[test]
    fn evaluate_gates_store_write_by_decode() {
        let fabric = fabric();
        let view = fabric.evaluate(&data(DataRequest::write(
            0x2000_0000,
            5,
            ByteSelect::ALL,
        )));
        assert_eq!(view.destination, Destination::OutputRegister);
        assert!(!view.data_write.enable);
        assert!(view.data_write.select.is_empty());
        assert_eq!(view.output_write, Some(5));

        let view = fabric.evaluate(&data(DataRequest::write(
            0x1000_0000,
            5,
            ByteSelect::new(0b0110),
        )));
        assert!(view.data_write.enable);
        assert_eq!(view.data_write.select, ByteSelect::new(0b0110));
        assert_eq!(view.output_write, None);
    }

    #[test]
    fn evaluate_does_not_touch_state() {
        let fabric = fabric();
        let before = fabric.clone();
        let _ = fabric.evaluate(&data(DataRequest::write(0x1000_0000, 1, ByteSelect::ALL)));
        assert_eq!(fabric, before);
    }

    #[test]
    fn instruction_read_data_follows_address_without_cycle_active() {
        let mut fabric = fabric();
        let requests = BusRequests {
            instruction: InstructionRequest {
                cycle_active: false,
                address: 4,
            },
            data: DataRequest::IDLE,
        };
        let outputs = fabric.step(&requests);
        assert!(!outputs.instruction.ack);
        assert_eq!(outputs.instruction.read_data, 0x13);
    }

    #[test]
    fn trace_reports_commit_order() {
        let mut fabric = BusFabric::new(
            FabricConfig {
                has_indicator: true,
                ..FabricConfig::default()
            },
            &[],
        )
        .expect("valid fabric");
        let mut events = Vec::new();
        fabric.step_traced(
            &data(DataRequest::write(0x2000_0000, 1, ByteSelect::ALL)),
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                TraceEvent::Request {
                    cycle: 0,
                    segment: Segment::Data,
                    address: 0x2000_0000,
                    is_write: true,
                },
                TraceEvent::OutputWrite { cycle: 0, value: 1 },
                TraceEvent::IndicatorChanged {
                    cycle: 0,
                    level: true
                },
                TraceEvent::Ack {
                    cycle: 1,
                    segment: Segment::Data
                },
            ]
        );
    }

    #[test]
    fn indicator_is_absent_without_hookup() {
        let mut fabric = fabric();
        fabric.step(&data(DataRequest::write(0x2000_0000, 1, ByteSelect::ALL)));
        assert_eq!(fabric.output_register(), 1);
        assert_eq!(fabric.indicator(), None);
    }

    #[test]
    fn reset_keeps_image_and_clears_runtime_state() {
        let mut fabric = fabric();
        fabric.step(&data(DataRequest::write(0x1000_0000, 9, ByteSelect::ALL)));
        fabric.step(&data(DataRequest::write(0x2000_0000, 9, ByteSelect::ALL)));
        assert_eq!(fabric.ack_state(Segment::Data), AckState::AckPending);

        fabric.reset();

        assert_eq!(fabric.cycle(), 0);
        assert_eq!(fabric.output_register(), 0);
        assert_eq!(fabric.data_store().read(0), 0);
        assert_eq!(fabric.ack_state(Segment::Data), AckState::Idle);
        assert_eq!(fabric.instruction_store().read(0), 0x13);
        assert_eq!(fabric.counters().cycles, 0);
    }

    struct CountingWriter;

    impl BusMaster for CountingWriter {
        fn drive(&mut self, cycle: u64, _outputs: &BusOutputs) -> BusRequests {
            BusRequests {
                instruction: InstructionRequest::fetch(0),
                data: DataRequest::write(
                    0x2000_0000,
                    u32::try_from(cycle).unwrap_or(0),
                    ByteSelect::ALL,
                ),
            }
        }
    }

    #[test]
    fn observer_sees_pre_edge_state_every_cycle() {
        let mut fabric = fabric();
        let mut seen = Vec::new();
        let outcome =
            run_cycles_with(&mut fabric, &mut CountingWriter, 3, &mut NullTraceSink, |f, r, o| {
                seen.push((f.cycle(), f.output_register(), r.data.write_data, o.data.ack));
                Ok::<(), ()>(())
            })
            .expect("observer never fails");

        assert_eq!(outcome.cycles, 3);
        assert_eq!(outcome.data_acks, 2);
        assert_eq!(seen, vec![(0, 0, 0, false), (1, 0, 1, true), (2, 1, 2, true)]);
    }

    #[test]
    fn observer_error_stops_before_the_edge() {
        let mut fabric = fabric();
        let result =
            run_cycles_with(&mut fabric, &mut CountingWriter, 10, &mut NullTraceSink, |f, _, _| {
                if f.cycle() == 2 {
                    Err("stop")
                } else {
                    Ok(())
                }
            });

        assert_eq!(result, Err("stop"));
        assert_eq!(fabric.cycle(), 2);
        assert_eq!(fabric.output_register(), 1);
    }
}
