use std::io;
use std::path::PathBuf;
use std::time::Duration;

use structopt::StructOpt;

use chip8_vm::emulator::config::ConfigOpt;
use chip8_vm::emulator::input::DummyInput;
use chip8_vm::emulator::output::DummyOutput;
use chip8_vm::emulator::rom::RomFile;
use chip8_vm::emulator::{Emulator, Scheduler};

/// Run a program without a screen or keyboard, then print what it drew.
#[derive(StructOpt)]
struct Opt {
    /// The program to execute
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Seconds of emulated time to run for
    #[structopt(long, default_value = "5")]
    seconds: f64,

    #[structopt(flatten)]
    config: ConfigOpt,
}

/// Negative spans run for no time at all, spans too long for a `Duration` are refused.
fn emulated_time(seconds: f64) -> io::Result<Duration> {
    Duration::try_from_secs_f64(seconds.max(0.0))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, format!("--seconds {}: {}", seconds, e)))
}

fn main() -> io::Result<()> {
    pretty_env_logger::init();

    let opt = Opt::from_args();
    log::info!("Executing {:?} for {}s", &opt.input, opt.seconds);

    let seconds = emulated_time(opt.seconds)?;

    let emulator = Emulator::with_input(DummyInput, opt.config.quirks());
    let mut scheduler = Scheduler::new(emulator, DummyOutput::new(), RomFile::new(opt.input), opt.config.speed());
    scheduler.reset()?;

    // Emulated time only, so this finishes as fast as the host allows
    scheduler.advance(seconds);

    let emulator = scheduler.emulator();
    print!("{}", emulator.framebuffer());
    println!(
        "PC={:#05x} I={:#05x} V={:02X?} DT={} ST={}",
        emulator.program_counter(),
        emulator.index(),
        emulator.registers(),
        emulator.delay_timer(),
        emulator.sound_timer()
    );
    if let Some(fault) = emulator.last_fault() {
        println!("Last fault: {}", fault);
    }

    Ok(())
}
