//! Deterministic trace fingerprint used for cross-host comparison.
//!
//! Runs a fixed fetch/store pattern for 1000 cycles and hashes every trace
//! event plus the final data store and output register.

use fabric_core::{
    run_cycles, BusFabric, BusMaster, BusOutputs, BusRequests, ByteSelect, DataRequest,
    FabricConfig, InstructionRequest, Segment, TraceEvent, TraceSink,
};
use log as _;
use proptest as _;
use rstest as _;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const CYCLES: u64 = 1000;

/// Walks the image and the data store, blinking the output register every
/// 16 stores.
#[derive(Default)]
struct PatternMaster {
    pc: u32,
    stores: u32,
    fetch_pending: bool,
    data_pending: bool,
}

impl BusMaster for PatternMaster {
    fn drive(&mut self, _cycle: u64, outputs: &BusOutputs) -> BusRequests {
        if outputs.instruction.ack {
            self.pc = outputs.instruction.read_data.wrapping_add(self.pc) & 0xFFC;
            self.fetch_pending = false;
        }
        if outputs.data.ack {
            self.stores = self.stores.wrapping_add(1);
            self.data_pending = false;
        }

        let instruction = if self.fetch_pending {
            InstructionRequest::IDLE
        } else {
            self.fetch_pending = true;
            InstructionRequest::fetch(self.pc)
        };
        let data = if self.data_pending {
            DataRequest::IDLE
        } else {
            self.data_pending = true;
            if self.stores % 16 == 15 {
                DataRequest::write(0x2000_0000, self.stores >> 4, ByteSelect::ALL)
            } else {
                let select = ByteSelect::new(self.stores.to_le_bytes()[0]);
                DataRequest::write(0x1000_0000 | (self.stores << 2), self.pc, select)
            }
        };
        BusRequests { instruction, data }
    }
}

struct HashSink {
    hash: u64,
}

impl HashSink {
    fn bytes(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.hash ^= u64::from(*byte);
            self.hash = self.hash.wrapping_mul(0x1000_0000_01B3);
        }
    }
}

const fn segment_tag(segment: Segment) -> u8 {
    match segment {
        Segment::Instruction => 0,
        Segment::Data => 1,
    }
}

impl TraceSink for HashSink {
    fn on_event(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::Request {
                cycle,
                segment,
                address,
                is_write,
            } => {
                self.bytes(&[0x10, segment_tag(segment), u8::from(is_write)]);
                self.bytes(&cycle.to_le_bytes());
                self.bytes(&address.to_le_bytes());
            }
            TraceEvent::Ack { cycle, segment } => {
                self.bytes(&[0x11, segment_tag(segment)]);
                self.bytes(&cycle.to_le_bytes());
            }
            TraceEvent::DataStoreWrite {
                cycle,
                index,
                select,
                value,
            } => {
                self.bytes(&[0x12, select.bits()]);
                self.bytes(&cycle.to_le_bytes());
                self.bytes(&index.to_le_bytes());
                self.bytes(&value.to_le_bytes());
            }
            TraceEvent::OutputWrite { cycle, value } => {
                self.bytes(&[0x13]);
                self.bytes(&cycle.to_le_bytes());
                self.bytes(&value.to_le_bytes());
            }
            TraceEvent::UnmappedAccess {
                cycle,
                address,
                is_write,
            } => {
                self.bytes(&[0x14, u8::from(is_write)]);
                self.bytes(&cycle.to_le_bytes());
                self.bytes(&address.to_le_bytes());
            }
            TraceEvent::IndicatorChanged { cycle, level } => {
                self.bytes(&[0x15, u8::from(level)]);
                self.bytes(&cycle.to_le_bytes());
            }
        }
    }
}

fn main() {
    let image: Vec<u32> = (0..256_u32).map(|word| word.wrapping_mul(0x9E37_79B9) & 0xFC).collect();
    let config = FabricConfig {
        has_indicator: true,
        ..FabricConfig::default()
    };
    let Ok(mut fabric) = BusFabric::new(config, &image) else {
        eprintln!("image does not fit the default configuration");
        std::process::exit(1);
    };

    let mut master = PatternMaster::default();
    let mut sink = HashSink {
        hash: 0xcbf2_9ce4_8422_2325,
    };
    let outcome = run_cycles(&mut fabric, &mut master, CYCLES, &mut sink);

    for word in fabric.data_store().words() {
        sink.bytes(&word.to_le_bytes());
    }
    sink.bytes(&fabric.output_register().to_le_bytes());
    sink.bytes(&outcome.instruction_acks.to_le_bytes());
    sink.bytes(&outcome.data_acks.to_le_bytes());

    println!("{:016x}", sink.hash);
}
