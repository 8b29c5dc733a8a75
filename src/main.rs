use std::path::PathBuf;

use clap::Parser;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use unfolding_zdd::pipeline::{self, Options};

/// Count spanning trees, non-overlapping edge unfoldings, and
/// non-isomorphic unfoldings of a polyhedron 1-skeleton.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Edge-ordered graph file: one `u v` pair per line
    graph_file: PathBuf,

    /// MOPE list (JSON-Lines, one {"edges": [...]} object per line);
    /// enables the overlap filter
    mope_file: Option<PathBuf>,

    /// Automorphism list (JSON); enables the Burnside phase
    #[arg(long, value_name = "FILE")]
    automorphisms: Option<PathBuf>,

    /// Split the run into 2^N memory partitions
    #[arg(long, value_name = "N", default_value_t = 0, value_parser = clap::value_parser!(u32).range(0..=30))]
    split_depth: u32,

    /// Log phase progress at debug level too
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // The JSON result goes to stdout; everything else stays on stderr.
    simplelog::TermLogger::init(
        if cli.verbose {
            simplelog::LevelFilter::Debug
        } else {
            simplelog::LevelFilter::Info
        },
        simplelog::Config::default(),
        simplelog::TerminalMode::Stderr,
        simplelog::ColorChoice::Auto,
    )?;

    let options = Options {
        graph_path: cli.graph_file,
        mope_path: cli.mope_file,
        automorphism_path: cli.automorphisms,
        split_depth: cli.split_depth,
    };

    let mut progress = |mark: &str| log::info!("{}", mark);
    let output = pipeline::run(&options, &mut progress)?;

    println!("{}", serde_json::to_string_pretty(&output.report)?);

    if !output.burnside_divisible {
        return Err(eyre!("Burnside sum is not divisible by the group order"));
    }
    Ok(())
}
