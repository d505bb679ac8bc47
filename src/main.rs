//! accelgen: build accelerator designs and run them on the reference
//! simulator.
mod cmdline;

use accel_designs::{build_design, design_inputs};
use accel_ir::Printer;
use accel_opt::passes::WellFormed;
use accel_sim::{MemoryData, SimConfig, SimResult, Simulator};
use accel_utils::Error;
use cmdline::Opts;

fn main() -> SimResult<()> {
    let opts = Opts::get_opts()?;

    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(opts.log_level)
        .target(env_logger::Target::Stderr)
        .init();

    let ctx = build_design(&opts.design)?;
    let mut out = opts.output.get_write()?;

    if opts.emit {
        if !opts.skip_verification {
            WellFormed::validate(&ctx)?;
        }
        Printer::write_context(&ctx, &mut out)?;
        return Ok(());
    }

    let mut data = match &opts.data_file {
        Some(path) => MemoryData::from_file(path)?,
        None => MemoryData::new(),
    };
    if let Some(path) = &opts.input_file {
        let text = std::fs::read_to_string(path).map_err(|err| {
            Error::invalid_file(format!("cannot read {}: {err}", path.display()))
        })?;
        for mem in design_inputs(&opts.design, &text)? {
            data.insert(mem.name, mem.data, mem.width as u32);
        }
    }

    let config = SimConfig {
        max_cycles: opts.max_cycles,
        skip_verification: opts.skip_verification,
    };
    let mut sim = Simulator::new(&ctx, config)?;
    sim.load_data(&data)?;
    let cycles = sim.run()?;
    log::info!("`{}' finished in {cycles} cycles", sim.entrypoint());

    sim.dump_memories(opts.dump_all_memories).to_writer(&mut out)?;
    Ok(())
}
