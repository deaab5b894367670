use std::{
    fs::File,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::Context;
use chip::{
    chip8::ChipSet,
    definitions::{cpu, timer},
    resources::Rom,
    sound::{BeepCounter, Beeper},
    Config,
};
use clap::Parser;
use env_logger::{Env, Target};

mod keymap;
#[cfg(feature = "sdl")]
mod sdl;
mod terminal;

use terminal::{TerminalDisplay, TerminalInput, TerminalSpeaker};

/// Runs a chip8 program. The keypad is mapped onto the keys `1234 qwer asdf zxcv`,
/// Esc quits.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// The program to run
    rom: PathBuf,

    /// Instructions executed per second
    #[arg(long, default_value_t = cpu::HERTZ)]
    hz: u64,

    /// Seed for the random numbers, for repeatable runs
    #[arg(long)]
    seed: Option<u64>,

    /// Write the log into this file, filtered by `RUST_LOG`
    #[arg(long)]
    log: Option<PathBuf>,

    /// Open a window with sound instead of drawing into the terminal
    #[cfg(feature = "sdl")]
    #[arg(long)]
    sdl: bool,

    /// The size of a single pixel in the window
    #[cfg(feature = "sdl")]
    #[arg(long, default_value_t = 12)]
    scale: u32,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            cpu_hz: self.hz,
            timer_hz: timer::HERTZ,
            seed: self.seed,
        }
    }
}

/// The terminal is owned by the screen while running, so the log goes into a file.
fn setup_logging(path: Option<&Path>) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path,
        None => return Ok(()),
    };
    let file = File::create(path)
        .with_context(|| format!("Unable to create the log file {}", path.display()))?;

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .target(Target::Pipe(Box::new(file)))
        .try_init()?;
    Ok(())
}

fn run(args: &Args) -> anyhow::Result<()> {
    let rom = Rom::from_file(&args.rom)
        .with_context(|| format!("Unable to load {}", args.rom.display()))?;
    let config = args.config();

    let counter = BeepCounter::new();
    let machine = ChipSet::with_callback(&rom, Beeper::new(counter.clone()));

    #[cfg(feature = "sdl")]
    if args.sdl {
        return sdl::run(machine, counter, &config, args.scale);
    }

    let display = TerminalDisplay::new(rom.get_name()).context("Unable to set up the terminal")?;
    let input = TerminalInput::new();
    let speaker = TerminalSpeaker::new(counter);

    chip::run(machine, display, input, speaker, &config)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(err) = setup_logging(args.log.as_deref()) {
        eprintln!("Error: {:#}", err);
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Ok(()) => {
            log::info!("closed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}
