//! Value Change Dump output for the bus signals.
//!
//! One sample per cycle, taken after the master has driven its requests and
//! before the clock edge. Only signals that changed since the previous
//! sample are written.

use std::io::{self, Write};

use fabric_core::{BusOutputs, BusRequests};

/// Clock period of the reference board (20 MHz) in nanoseconds.
pub const CLOCK_PERIOD_NS: u64 = 50;

struct Signal {
    name: &'static str,
    width: u8,
    id: char,
}

impl Signal {
    const fn new(name: &'static str, width: u8, id: char) -> Self {
        Self { name, width, id }
    }
}

const SIGNALS: [Signal; 13] = [
    Signal::new("ibus_cyc", 1, '!'),
    Signal::new("ibus_adr", 32, '"'),
    Signal::new("ibus_ack", 1, '#'),
    Signal::new("ibus_dat_r", 32, '$'),
    Signal::new("dbus_cyc", 1, '%'),
    Signal::new("dbus_we", 1, '&'),
    Signal::new("dbus_adr", 32, '\''),
    Signal::new("dbus_dat_w", 32, '('),
    Signal::new("dbus_sel", 4, ')'),
    Signal::new("dbus_ack", 1, '*'),
    Signal::new("dbus_dat_r", 32, '+'),
    Signal::new("gpo", 32, ','),
    Signal::new("led", 1, '-'),
];

/// Streams bus activity as a VCD file.
pub struct VcdWriter<W: Write> {
    out: W,
    last: Option<[u32; SIGNALS.len()]>,
}

impl<W: Write> VcdWriter<W> {
    /// Writes the VCD header and returns a writer ready for samples.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from `out`.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "$version fabric-sim {} $end", env!("CARGO_PKG_VERSION"))?;
        writeln!(out, "$timescale 1ns $end")?;
        writeln!(out, "$scope module fabric $end")?;
        for signal in &SIGNALS {
            writeln!(
                out,
                "$var wire {} {} {} $end",
                signal.width, signal.id, signal.name
            )?;
        }
        writeln!(out, "$upscope $end")?;
        writeln!(out, "$enddefinitions $end")?;
        Ok(Self { out, last: None })
    }

    /// Records the signals driven during `cycle`.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying writer.
    pub fn sample(
        &mut self,
        cycle: u64,
        requests: &BusRequests,
        outputs: &BusOutputs,
        output_register: u32,
    ) -> io::Result<()> {
        let values = [
            u32::from(requests.instruction.cycle_active),
            requests.instruction.address,
            u32::from(outputs.instruction.ack),
            outputs.instruction.read_data,
            u32::from(requests.data.cycle_active),
            u32::from(requests.data.write_enable),
            requests.data.address,
            requests.data.write_data,
            u32::from(requests.data.byte_select.bits()),
            u32::from(outputs.data.ack),
            outputs.data.read_data,
            output_register,
            output_register & 1,
        ];

        let changed: Vec<usize> = match &self.last {
            Some(last) => (0..SIGNALS.len()).filter(|&i| last[i] != values[i]).collect(),
            None => (0..SIGNALS.len()).collect(),
        };
        if changed.is_empty() {
            return Ok(());
        }

        writeln!(self.out, "#{}", cycle.saturating_mul(CLOCK_PERIOD_NS))?;
        for index in changed {
            let signal = &SIGNALS[index];
            let value = values[index];
            if signal.width == 1 {
                writeln!(self.out, "{}{}", value & 1, signal.id)?;
            } else {
                writeln!(self.out, "b{value:b} {}", signal.id)?;
            }
        }
        self.last = Some(values);
        Ok(())
    }

    /// Writes the final timestamp and flushes the writer.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the underlying writer.
    pub fn finish(mut self, cycles: u64) -> io::Result<W> {
        writeln!(self.out, "#{}", cycles.saturating_mul(CLOCK_PERIOD_NS))?;
        self.out.flush()?;
        Ok(self.out)
    }
}
