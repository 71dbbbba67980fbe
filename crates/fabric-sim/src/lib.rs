//! Simulation front-end for the bus fabric.
//!
//! Loads a firmware image, drives the fabric with a [`ScriptedMaster`], and
//! optionally records the bus signals as a VCD file.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use anyhow::Context;
use clap as _;
use env_logger as _;
use fabric_core::{
    run_cycles_with, words_from_le_bytes, BusFabric, BusMaster, FabricCounters, RunOutcome,
    TraceEvent, TraceSink,
};
use log::{debug, info, trace};
#[cfg(test)]
use tempfile as _;

pub mod master;
pub mod script;
pub mod vcd;

pub use master::{ReadResult, ScriptedMaster};
pub use script::{parse_script, ScriptError, ScriptErrorKind, ScriptOp};
pub use vcd::{VcdWriter, CLOCK_PERIOD_NS};

/// Default run length, matching the reference testbench.
pub const DEFAULT_CYCLES: u64 = 1000;

/// Reads a raw little-endian firmware image.
///
/// # Errors
///
/// Fails when the file cannot be read or its length is not a whole number
/// of words.
pub fn load_image(path: &Path) -> anyhow::Result<Vec<u32>> {
    let bytes =
        fs::read(path).with_context(|| format!("failed to read image {}", path.display()))?;
    let words = words_from_le_bytes(&bytes)
        .with_context(|| format!("invalid image {}", path.display()))?;
    debug!("loaded {} words from {}", words.len(), path.display());
    Ok(words)
}

/// Reads and parses a data-segment script.
///
/// # Errors
///
/// Fails when the file cannot be read or does not parse.
pub fn load_script(path: &Path) -> anyhow::Result<Vec<ScriptOp>> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read script {}", path.display()))?;
    let ops = parse_script(&source).with_context(|| format!("in script {}", path.display()))?;
    debug!("parsed {} script steps from {}", ops.len(), path.display());
    Ok(ops)
}

/// Trace sink that forwards fabric events to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl TraceSink for LogSink {
    fn on_event(&mut self, event: TraceEvent) {
        match event {
            TraceEvent::IndicatorChanged { cycle, level } => {
                info!("cycle {cycle}: led {}", if level { "on" } else { "off" });
            }
            TraceEvent::OutputWrite { cycle, value } => {
                debug!("cycle {cycle}: gpo <- {value:#010x}");
            }
            TraceEvent::UnmappedAccess {
                cycle,
                address,
                is_write,
            } => {
                debug!(
                    "cycle {cycle}: unmapped {} {address:#010x}",
                    if is_write { "write" } else { "read" }
                );
            }
            other => trace!("{other:?}"),
        }
    }
}

/// Drives `fabric` from `master` for `cycles` cycles, logging trace events
/// and sampling every cycle into `vcd` when given.
///
/// # Errors
///
/// Propagates I/O errors from the VCD writer.
pub fn simulate<M, W>(
    fabric: &mut BusFabric,
    master: &mut M,
    cycles: u64,
    mut vcd: Option<&mut VcdWriter<W>>,
) -> io::Result<RunOutcome>
where
    M: BusMaster + ?Sized,
    W: Write,
{
    run_cycles_with(fabric, master, cycles, &mut LogSink, |fabric, requests, outputs| {
        match vcd.as_mut() {
            Some(vcd) => vcd.sample(
                fabric.cycle(),
                requests,
                outputs,
                fabric.output_register(),
            ),
            None => Ok(()),
        }
    })
}

/// End-of-run report printed by the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// Acks observed by the master during the run.
    pub outcome: RunOutcome,
    /// Fabric activity counters.
    pub counters: FabricCounters,
    /// Final output register value.
    pub output_register: u32,
    /// Final indicator level, if attached.
    pub indicator: Option<bool>,
}

impl Summary {
    /// Collects the report for `fabric` after a run.
    #[must_use]
    pub const fn new(fabric: &BusFabric, outcome: RunOutcome) -> Self {
        Self {
            outcome,
            counters: *fabric.counters(),
            output_register: fabric.output_register(),
            indicator: fabric.indicator(),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cycles:            {}", self.outcome.cycles)?;
        writeln!(f, "instruction acks:  {}", self.outcome.instruction_acks)?;
        writeln!(f, "data acks:         {}", self.outcome.data_acks)?;
        writeln!(f, "data store writes: {}", self.counters.data_store_writes)?;
        writeln!(f, "output writes:     {}", self.counters.output_writes)?;
        writeln!(f, "unmapped accesses: {}", self.counters.unmapped_accesses)?;
        writeln!(f, "output register:   {:#010x}", self.output_register)?;
        let indicator = match self.indicator {
            Some(true) => "on",
            Some(false) => "off",
            None => "not attached",
        };
        write!(f, "indicator:         {indicator}")
    }
}
