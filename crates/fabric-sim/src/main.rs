//! CLI entry point for the fabric simulator.

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fabric_core::{BusFabric, FabricConfig, DEFAULT_STORE_DEPTH};
use fabric_sim::{
    load_image, load_script, simulate, ScriptedMaster, Summary, VcdWriter, DEFAULT_CYCLES,
};
use log::info;
#[cfg(test)]
use tempfile as _;
use thiserror as _;

#[derive(Parser, Debug)]
#[command(name = "fabric-sim", version)]
#[command(about = "Cycle-level simulator for the instruction/data bus fabric", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a firmware image against a scripted bus master
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Raw little-endian firmware image
    image: PathBuf,

    /// Number of clock cycles to simulate
    #[arg(long, default_value_t = DEFAULT_CYCLES)]
    cycles: u64,

    /// Data-segment transaction script
    #[arg(long)]
    script: Option<PathBuf>,

    /// Restart the script when it finishes
    #[arg(long, requires = "script")]
    repeat: bool,

    /// Write a Value Change Dump of the bus signals
    #[arg(long)]
    vcd: Option<PathBuf>,

    /// Attach the external indicator to output register bit 0
    #[arg(long)]
    indicator: bool,

    /// Instruction store depth in words (power of two)
    #[arg(long, default_value_t = DEFAULT_STORE_DEPTH)]
    imem_depth: usize,

    /// Data store depth in words (power of two)
    #[arg(long, default_value_t = DEFAULT_STORE_DEPTH)]
    dmem_depth: usize,
}

fn run(args: &RunArgs) -> anyhow::Result<()> {
    let image = load_image(&args.image)?;
    let ops = match &args.script {
        Some(path) => load_script(path)?,
        None => Vec::new(),
    };

    let config = FabricConfig {
        instruction_depth: args.imem_depth,
        data_depth: args.dmem_depth,
        has_indicator: args.indicator,
        ..FabricConfig::default()
    };
    let mut fabric = BusFabric::new(config, &image).context("invalid fabric configuration")?;
    let mut master = ScriptedMaster::new(ops, args.repeat);
    info!(
        "running {} for {} cycles",
        args.image.display(),
        args.cycles
    );

    let outcome = if let Some(path) = &args.vcd {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        let mut vcd = VcdWriter::new(BufWriter::new(file))
            .with_context(|| format!("failed to write {}", path.display()))?;
        let outcome = simulate(&mut fabric, &mut master, args.cycles, Some(&mut vcd))
            .with_context(|| format!("failed to write {}", path.display()))?;
        vcd.finish(outcome.cycles)
            .with_context(|| format!("failed to write {}", path.display()))?;
        outcome
    } else {
        simulate::<_, std::io::Sink>(&mut fabric, &mut master, args.cycles, None)?
    };

    for read in master.reads() {
        println!(
            "read  {:#010x} -> {:#010x} (cycle {})",
            read.address, read.value, read.cycle
        );
    }
    if !args.repeat && !master.script_done() {
        println!("script still running after {} cycles", outcome.cycles);
    }
    println!("{}", Summary::new(&fabric, outcome));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match &cli.command {
        Command::Run(args) => run(args),
    }
}
