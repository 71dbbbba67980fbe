#![no_main]

use fabric_core::{
    decode_destination, merge_lanes, word_index, words_from_le_bytes, BusFabric, BusRequests,
    ByteSelect, DataRequest, FabricConfig, InstructionRequest,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 10 {
        return;
    }

    let image = words_from_le_bytes(&data[..data.len() & !3]).unwrap_or_default();
    let config = FabricConfig {
        instruction_depth: 64,
        data_depth: 64,
        has_indicator: true,
        ..FabricConfig::default()
    };
    let Ok(mut fabric) = BusFabric::new(config, &image) else {
        return;
    };

    for chunk in data.chunks_exact(10) {
        let address = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let value = u32::from_le_bytes([chunk[4], chunk[5], chunk[6], chunk[7]]);
        let strobes = chunk[8];
        let select = ByteSelect::new(chunk[9]);

        let _ = decode_destination(address);
        let _ = word_index(address, 64);
        let _ = merge_lanes(address, value, select);

        let requests = BusRequests {
            instruction: InstructionRequest {
                cycle_active: strobes & 1 != 0,
                address: value,
            },
            data: DataRequest {
                cycle_active: strobes & 2 != 0,
                address,
                write_enable: strobes & 4 != 0,
                write_data: value,
                byte_select: select,
            },
        };
        let outputs = fabric.step(&requests);
        assert_eq!(outputs.instruction.ack, requests.instruction.cycle_active);
        assert_eq!(outputs.data.ack, requests.data.cycle_active);
    }
});
