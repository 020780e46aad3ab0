use std::{
    error::Error,
    fs::{self, File},
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    process,
};

use clap::Parser;
use cordyceps_avl::{command, AvlSet};
use log::{error, info, warn, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

/// Counts keys in closed ranges over a balanced search tree.
///
/// Reads `k <key>` and `q <low> <high>` commands and writes one count per query.
#[derive(Parser)]
#[command(version, about)]
struct Options {
    /// File to read commands from. Standard input is used when omitted.
    input: Option<PathBuf>,

    /// Write the final tree as a Graphviz digraph to this path.
    #[arg(long, value_name = "PATH")]
    dot: Option<PathBuf>,

    /// Refuse to draw trees taller than this.
    #[arg(long, default_value_t = 7)]
    max_dot_height: usize,

    /// Increase log verbosity. May be repeated.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Box<dyn Error>> {
    let options = Options::parse();

    let level = match options.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;

    let stdout = io::stdout();
    if let Err(e) = run(&options, BufWriter::new(stdout.lock())) {
        error!("{e}");
        process::exit(1);
    }

    Ok(())
}

fn run<W: Write>(options: &Options, output: W) -> Result<AvlSet<i64>, Box<dyn Error>> {
    let mut set = AvlSet::new();

    let summary = match &options.input {
        Some(path) => {
            info!("reading commands from {}", path.display());
            let file = File::open(path)?;
            command::run(BufReader::new(file), output, &mut set)?
        }
        None => {
            info!("reading commands from standard input");
            command::run(io::stdin().lock(), output, &mut set)?
        }
    };

    info!(
        "{} inserts, {} queries, {} skipped tokens; {} keys, height {}",
        summary.inserts,
        summary.queries,
        summary.skipped,
        set.len(),
        set.height()
    );

    if let Some(path) = &options.dot {
        write_dot(&set, path, options.max_dot_height)?;
    }

    Ok(set)
}

// Returns `false` without touching `path` if the tree is taller than `max_height`.
fn write_dot(set: &AvlSet<i64>, path: &Path, max_height: usize) -> Result<bool, Box<dyn Error>> {
    if set.height() > max_height {
        warn!(
            "not drawing tree of height {} (limit is {max_height})",
            set.height()
        );
        return Ok(false);
    }

    let mut graph = String::new();
    set.dotgraph("tree", &mut graph)?;
    fs::write(path, graph)?;
    info!("wrote tree graph to {}", path.display());

    Ok(true)
}
