use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{debug, info, Level, LevelFilter, Log, Metadata, Record};

use wvm::config::Config;
use wvm::error::Error;
use wvm::parser;
use wvm::runtime::{Executor, Instantiator, RuntimeError, Value};

#[derive(Parser)]
#[command(name = "wvm", version, about = "WebAssembly MVP virtual machine")]
struct Cli {
    /// Path to a .wasm binary.
    file: PathBuf,

    /// Arguments for the entry function, as <type>:<value> (e.g. i32:5).
    args: Vec<Value>,

    /// Export name of the entry function.
    #[arg(long)]
    entry: Option<String>,

    /// JSON file with runtime settings.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print the module summary and the final stack.
    #[arg(long)]
    debug: bool,

    /// Log every dispatched instruction.
    #[arg(long)]
    trace: bool,

    /// Trap after this many instructions.
    #[arg(long)]
    max_steps: Option<u64>,
}

struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            match record.level() {
                Level::Info => eprintln!("[wvm] {}", record.args()),
                level => eprintln!("[wvm {}] {}", level, record.args()),
            }
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn main() {
    let cli = Cli::parse();

    let level = if cli.trace {
        LevelFilter::Trace
    } else if cli.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }

    if let Err(e) = run(cli) {
        match e.downcast_ref::<Error>() {
            Some(err) => eprintln!("{}", err.report()),
            None => eprintln!("[wvm] {e:#}"),
        }
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path).map_err(Error::from)?,
        None => Config::default(),
    };
    if let Some(entry) = cli.entry {
        config.entry = entry;
    }
    if cli.max_steps.is_some() {
        config.max_steps = cli.max_steps;
    }
    config.debug |= cli.debug;

    let module = parser::load(&cli.file).map_err(Error::from)?;
    if config.debug {
        print!("{module}");
    }

    let runtime = Instantiator::instantiate(&module, &config).map_err(Error::from)?;
    let mut executor = Executor::new(runtime, &config);
    let entry = executor
        .runtime()
        .entry
        .ok_or_else(|| Error::from(RuntimeError::EntryNotFound(config.entry.clone())))?;
    debug!("entry '{}' is func[{}]", config.entry, entry);

    let results = executor.invoke(entry, &cli.args).map_err(Error::from)?;
    if config.debug {
        info!(
            "{} instructions, {} immediate cache hits",
            executor.steps(),
            executor.immediate_cache().hits()
        );
        info!("final stack: {:?}", results);
    }
    if let [value] = results.as_slice() {
        println!("{value}");
    }
    Ok(())
}
