//! Command line parsing for the accelgen driver.
use accel_designs::DESIGNS;
use accel_utils::{Error, OutputFile};
use argh::FromArgs;
use itertools::Itertools;
use std::path::PathBuf;

#[derive(FromArgs)]
#[argh(help_triggers("-h", "--help"))]
/// Build an accelerator design and simulate it or print it.
pub struct Opts {
    /// name of the design: calories, rps, rucksack or topk
    #[argh(positional)]
    pub design: String,

    /// output file, default is stdout
    #[argh(
        option,
        short = 'o',
        long = "output",
        default = "OutputFile::Stdout"
    )]
    pub output: OutputFile,

    /// JSON file used to initialize the external memories
    #[argh(option, short = 'd', long = "data")]
    pub data_file: Option<PathBuf>,

    /// puzzle text to encode into the external memories. Applied after the
    /// data file
    #[argh(option, short = 'i', long = "input")]
    pub input_file: Option<PathBuf>,

    /// print the design instead of simulating it
    #[argh(switch, long = "emit")]
    pub emit: bool,

    /// give up after this many cycles
    #[argh(option, long = "max-cycles")]
    pub max_cycles: Option<u64>,

    /// skip the legality checks before simulating
    #[argh(switch, long = "no-verify")]
    pub skip_verification: bool,

    /// logging level
    #[argh(option, long = "log-level", default = "log::LevelFilter::Warn")]
    pub log_level: log::LevelFilter,

    /// dump every memory of the design rather than just the external ones
    #[argh(switch, long = "dump-all-memories")]
    pub dump_all_memories: bool,
}

impl Opts {
    /// Parse the command line and check the design name.
    pub fn get_opts() -> Result<Opts, Error> {
        let opts: Opts = argh::from_env();
        if !DESIGNS.contains(&opts.design.as_str()) {
            return Err(Error::misc(format!(
                "unknown design `{}'. Known designs: {}",
                opts.design,
                DESIGNS.iter().join(", ")
            )));
        }
        Ok(opts)
    }
}
