//! Bus protocol conformance: decode, byte-lane merging, ack timing, and the
//! reference board scenarios.

#![allow(clippy::pedantic, clippy::nursery)]

use fabric_core::{
    address_mask, decode_destination, run_cycles, BusFabric, BusMaster, BusOutputs, BusRequests, ByteSelect,
    DataRequest, Destination, FabricConfig, InstructionRequest, NullTraceSink, TraceEvent,
    ACK_LATENCY_CYCLES,
};
use log as _;
use proptest::prelude::*;
use rstest::rstest;
#[cfg(feature = "serde")]
use serde as _;
use thiserror as _;

const NOP: u32 = 0x0000_0013;

fn board(image: &[u32]) -> BusFabric {
    let config = FabricConfig {
        has_indicator: true,
        ..FabricConfig::default()
    };
    BusFabric::new(config, image).expect("reference configuration is valid")
}

fn data_only(request: DataRequest) -> BusRequests {
    BusRequests {
        instruction: InstructionRequest::IDLE,
        data: request,
    }
}

fn fetch_only(address: u32) -> BusRequests {
    BusRequests {
        instruction: InstructionRequest::fetch(address),
        data: DataRequest::IDLE,
    }
}

#[test]
fn image_words_fetch_back_and_tail_is_zero() {
    let mut fabric = board(&[NOP, NOP]);

    let outputs = fabric.step(&fetch_only(0));
    assert!(outputs.instruction.ack);
    assert_eq!(outputs.instruction.read_data, NOP);

    let outputs = fabric.step(&fetch_only(4));
    assert!(outputs.instruction.ack);
    assert_eq!(outputs.instruction.read_data, NOP);

    let outputs = fabric.step(&fetch_only(8));
    assert!(outputs.instruction.ack);
    assert_eq!(outputs.instruction.read_data, 0);
}

#[test]
fn oversized_image_fails_before_running() {
    let config = FabricConfig {
        instruction_depth: 2,
        ..FabricConfig::default()
    };
    let error = BusFabric::new(config, &[NOP, NOP, NOP]).expect_err("image must not fit");
    assert_eq!(
        error.to_string(),
        "firmware image has 3 words but the instruction store holds 2"
    );
}

#[test]
fn masked_data_write_replaces_only_low_lanes() {
    let mut fabric = board(&[]);
    assert_eq!(fabric.data_store().words()[1], 0);

    let outputs = fabric.step(&data_only(DataRequest::write(
        0x1000_0004,
        0xAABB_CCDD,
        ByteSelect::new(0b0011),
    )));
    assert!(outputs.data.ack);
    assert_eq!(fabric.data_store().words()[1], 0x0000_CCDD);

    let outputs = fabric.step(&data_only(DataRequest::read(0x1000_0004)));
    assert!(outputs.data.ack);
    assert_eq!(outputs.data.read_data, 0x0000_CCDD);
}

#[test]
fn output_register_write_drives_indicator() {
    let mut fabric = board(&[]);
    assert_eq!(fabric.indicator(), Some(false));

    let outputs = fabric.step(&data_only(DataRequest::write(
        0x2000_0000,
        0x0000_0007,
        ByteSelect::ALL,
    )));

    assert!(outputs.data.ack);
    assert_eq!(fabric.output_register(), 0x0000_0007);
    assert_eq!(fabric.indicator(), Some(true));
}

#[test]
fn output_register_ignores_byte_select() {
    let mut fabric = board(&[]);
    fabric.step(&data_only(DataRequest::write(
        0x2000_0010,
        0xDEAD_BEEF,
        ByteSelect::new(0b0001),
    )));
    assert_eq!(fabric.output_register(), 0xDEAD_BEEF);

    fabric.step(&data_only(DataRequest::write(
        0x2000_0000,
        0x1234_5678,
        ByteSelect::NONE,
    )));
    assert_eq!(fabric.output_register(), 0x1234_5678);
}

#[test]
fn output_register_is_read_as_zero() {
    let mut fabric = board(&[]);
    fabric.step(&data_only(DataRequest::write(
        0x2000_0000,
        0xFFFF_FFFF,
        ByteSelect::ALL,
    )));
    let outputs = fabric.step(&data_only(DataRequest::read(0x2000_0000)));
    assert!(outputs.data.ack);
    assert_eq!(outputs.data.read_data, 0);
}

#[test]
fn unmapped_write_is_acknowledged_and_dropped() {
    let mut fabric = board(&[]);
    let before = fabric.snapshot();
    let mut events = Vec::new();

    let outputs = fabric.step_traced(
        &data_only(DataRequest::write(0x3ABC_DEF0, u32::MAX, ByteSelect::ALL)),
        &mut events,
    );

    assert!(outputs.data.ack);
    assert_eq!(outputs.data.read_data, 0);
    assert_eq!(fabric.output_register(), 0);
    assert!(fabric.data_store().words().iter().all(|word| *word == 0));
    assert_eq!(fabric.snapshot().data, before.data);
    assert_eq!(fabric.counters().unmapped_accesses, 1);
    assert!(events.contains(&TraceEvent::UnmappedAccess {
        cycle: 0,
        address: 0x3ABC_DEF0,
        is_write: true,
    }));

    let outputs = fabric.step(&data_only(DataRequest::read(0x3ABC_DEF0)));
    assert!(outputs.data.ack);
    assert_eq!(outputs.data.read_data, 0);
}

#[rstest]
#[case(0x0000_0000)]
#[case(0x3000_0000)]
#[case(0x8000_0010)]
#[case(0xF000_0000)]
fn writes_outside_the_map_change_nothing(#[case] address: u32) {
    let mut fabric = board(&[]);
    fabric.step(&data_only(DataRequest::write(address, 0x5555_5555, ByteSelect::ALL)));
    assert_eq!(fabric.output_register(), 0);
    assert_eq!(fabric.counters().data_store_writes, 0);
    assert_eq!(fabric.counters().output_writes, 0);
}

#[test]
fn read_during_write_returns_previous_word() {
    let mut fabric = board(&[]);
    fabric.step(&data_only(DataRequest::write(
        0x1000_0020,
        0x1111_1111,
        ByteSelect::ALL,
    )));

    let outputs = fabric.step(&data_only(DataRequest::write(
        0x1000_0020,
        0x2222_2222,
        ByteSelect::ALL,
    )));
    assert_eq!(outputs.data.read_data, 0x1111_1111);

    let outputs = fabric.step(&data_only(DataRequest::read(0x1000_0020)));
    assert_eq!(outputs.data.read_data, 0x2222_2222);
}

#[test]
fn data_addresses_wrap_modulo_depth() {
    let mut fabric = board(&[]);
    fabric.step(&data_only(DataRequest::write(
        0x1000_0000 + 4 * 1024 + 8,
        0xCAFE_F00D,
        ByteSelect::ALL,
    )));
    assert_eq!(fabric.data_store().words()[2], 0xCAFE_F00D);
}

#[test]
fn back_to_back_requests_each_get_an_ack() {
    let mut fabric = board(&[NOP; 4]);
    let mut acks = 0;
    for word in 0..4 {
        let outputs = fabric.step(&fetch_only(word * 4));
        assert!(outputs.instruction.ack);
        assert_eq!(outputs.instruction.read_data, NOP);
        acks += 1;
    }
    let outputs = fabric.step(&BusRequests::default());
    assert!(!outputs.instruction.ack);
    assert_eq!(acks, fabric.counters().instruction_acks);
}

#[test]
fn segments_acknowledge_independently() {
    let mut fabric = board(&[NOP]);
    let outputs = fabric.step(&fetch_only(0));
    assert!(outputs.instruction.ack);
    assert!(!outputs.data.ack);

    let outputs = fabric.step(&data_only(DataRequest::read(0x1000_0000)));
    assert!(!outputs.instruction.ack);
    assert!(outputs.data.ack);
}

#[rstest]
#[case(8)]
#[case(16)]
#[case(24)]
fn narrow_bus_masks_addresses_before_decode_and_indexing(#[case] width: u8) {
    let config = FabricConfig {
        instruction_depth: 4,
        data_depth: 4,
        address_width: width,
        has_indicator: false,
    };
    let mut fabric = BusFabric::new(config, &[0x11, 0x22, 0x33, 0x44]).expect("valid fabric");
    let above_bus = !address_mask(width);
    let window = |selector: u32| above_bus | (selector << (width - 4));

    let outputs = fabric.step(&fetch_only(above_bus | 4));
    assert_eq!(outputs.instruction.read_data, 0x22);

    fabric.step(&data_only(DataRequest::write(window(0x1) | 4, 0x55, ByteSelect::ALL)));
    assert_eq!(fabric.data_store().words()[1], 0x55);

    fabric.step(&data_only(DataRequest::write(window(0x2), 9, ByteSelect::ALL)));
    assert_eq!(fabric.output_register(), 9);

    fabric.step(&data_only(DataRequest::write(window(0x3), 0xEE, ByteSelect::ALL)));
    assert_eq!(fabric.output_register(), 9);
    assert_eq!(fabric.data_store().words(), &[0, 0x55, 0, 0]);
    assert_eq!(fabric.counters().unmapped_accesses, 1);
}

#[test]
fn sixteen_bit_bus_ignores_upper_address_bits() {
    let config = FabricConfig {
        address_width: 16,
        ..FabricConfig::default()
    };
    let mut fabric = BusFabric::new(config, &[NOP, 0x8]).expect("valid fabric");

    let outputs = fabric.step(&fetch_only(0xFFFF_0004));
    assert_eq!(outputs.instruction.read_data, 0x8);

    fabric.step(&data_only(DataRequest::write(0xABCD_1004, 0x55, ByteSelect::ALL)));
    assert_eq!(fabric.data_store().words()[1], 0x55);

    fabric.step(&data_only(DataRequest::write(0x2000, 9, ByteSelect::ALL)));
    assert_eq!(fabric.output_register(), 9);

    fabric.step(&data_only(DataRequest::write(0x3000, 1, ByteSelect::ALL)));
    assert_eq!(fabric.output_register(), 9);
    assert_eq!(fabric.counters().data_store_writes, 1);
}

#[test]
fn write_enable_applies_without_cycle_active() {
    let mut fabric = board(&[]);
    let outputs = fabric.step(&data_only(DataRequest {
        cycle_active: false,
        address: 0x1000_0008,
        write_enable: true,
        write_data: 0x77,
        byte_select: ByteSelect::ALL,
    }));

    assert!(!outputs.data.ack);
    assert_eq!(fabric.data_store().words()[2], 0x77);
    assert_eq!(fabric.counters().data_acks, 0);
}

/// Fetches sequentially and blinks the output register like the reference
/// firmware, keeping one request outstanding per segment.
struct BlinkMaster {
    pc: u32,
    level: u32,
    fetch_pending: bool,
    store_pending: bool,
}

impl BusMaster for BlinkMaster {
    fn drive(&mut self, _cycle: u64, outputs: &BusOutputs) -> BusRequests {
        if outputs.instruction.ack {
            self.pc += 4;
            self.fetch_pending = false;
        }
        if outputs.data.ack {
            self.level ^= 1;
            self.store_pending = false;
        }

        let instruction = if self.fetch_pending {
            InstructionRequest::IDLE
        } else {
            self.fetch_pending = true;
            InstructionRequest::fetch(self.pc)
        };
        let data = if self.store_pending {
            DataRequest::IDLE
        } else {
            self.store_pending = true;
            DataRequest::write(0x2000_0000, self.level, ByteSelect::ALL)
        };
        BusRequests { instruction, data }
    }
}

#[test]
fn run_loop_drives_master_with_one_request_outstanding() {
    let mut fabric = board(&[NOP; 8]);
    let mut master = BlinkMaster {
        pc: 0,
        level: 1,
        fetch_pending: false,
        store_pending: false,
    };

    let outcome = run_cycles(&mut fabric, &mut master, 10, &mut NullTraceSink);

    assert_eq!(outcome.cycles, 10);
    // Each ack frees its segment for a new request in the same cycle, so
    // every cycle after the first observes an ack.
    assert_eq!(outcome.instruction_acks, 9);
    assert_eq!(outcome.data_acks, 9);
    assert_eq!(master.pc, 36);
    assert_eq!(fabric.counters().output_writes, 10);
    assert_eq!(fabric.output_register(), 0);
    assert_eq!(fabric.indicator(), Some(false));
}

proptest! {
    #[test]
    fn decode_depends_only_on_top_nibble(addr in any::<u32>(), low in any::<u32>()) {
        let nibble = addr >> 28;
        let other = (nibble << 28) | (low & 0x0FFF_FFFF);
        prop_assert_eq!(decode_destination(addr), decode_destination(other));
        let expected = match nibble {
            0x1 => Destination::DataStore,
            0x2 => Destination::OutputRegister,
            _ => Destination::Unmapped,
        };
        prop_assert_eq!(decode_destination(addr), expected);
    }

    #[test]
    fn ack_follows_cycle_active_by_exactly_one_cycle(
        script in prop::collection::vec(
            (any::<bool>(), any::<bool>(), any::<u32>(), any::<bool>(), any::<u32>()),
            1..64,
        )
    ) {
        let mut fabric = board(&[NOP; 16]);
        let mut previous = (false, false);
        prop_assert!(!fabric.outputs().instruction.ack);
        prop_assert!(!fabric.outputs().data.ack);

        for (fetch, access, address, write, value) in script {
            let requests = BusRequests {
                instruction: InstructionRequest { cycle_active: fetch, address },
                data: DataRequest {
                    cycle_active: access,
                    address,
                    write_enable: access && write,
                    write_data: value,
                    byte_select: ByteSelect::new(value as u8),
                },
            };
            let visible = fabric.outputs();
            prop_assert_eq!(visible.instruction.ack, previous.0);
            prop_assert_eq!(visible.data.ack, previous.1);

            let outputs = fabric.step(&requests);
            prop_assert_eq!(outputs.instruction.ack, fetch);
            prop_assert_eq!(outputs.data.ack, access);
            previous = (fetch, access);
        }
        prop_assert_eq!(ACK_LATENCY_CYCLES, 1);
    }

    #[test]
    fn masked_store_write_obeys_lane_law(
        index in 0_u32..1024,
        initial in any::<u32>(),
        data in any::<u32>(),
        bits in 0_u8..16,
    ) {
        let mut fabric = board(&[]);
        let address = 0x1000_0000 | (index << 2);
        fabric.step(&data_only(DataRequest::write(address, initial, ByteSelect::ALL)));
        fabric.step(&data_only(DataRequest::write(address, data, ByteSelect::new(bits))));
        let outputs = fabric.step(&data_only(DataRequest::read(address)));

        let got = outputs.data.read_data.to_le_bytes();
        let old = initial.to_le_bytes();
        let new = data.to_le_bytes();
        for lane in 0..4 {
            let expected = if (bits >> lane) & 1 == 1 { new[lane] } else { old[lane] };
            prop_assert_eq!(got[lane], expected);
        }
    }

    #[test]
    fn output_register_changes_only_on_selector_two(
        address in any::<u32>(),
        data in any::<u32>(),
    ) {
        let mut fabric = board(&[]);
        fabric.step(&data_only(DataRequest::write(address, data, ByteSelect::ALL)));
        if address >> 28 == 0x2 {
            prop_assert_eq!(fabric.output_register(), data);
        } else {
            prop_assert_eq!(fabric.output_register(), 0);
        }
    }
}
