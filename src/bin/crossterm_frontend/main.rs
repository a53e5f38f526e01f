use std::path::PathBuf;
use std::sync::mpsc::channel;
use std::sync::Arc;

use structopt::StructOpt;

use chip8_vm::emulator::config::ConfigOpt;
use chip8_vm::emulator::input::Keypad;
use chip8_vm::emulator::rom::RomFile;
use chip8_vm::emulator::{Emulator, Scheduler};

mod crossterm_io;
mod key_buffer;
mod key_manager;
use crossterm_io::CrosstermOutput;
use key_manager::KeyManager;

/// The program options.
#[derive(StructOpt)]
struct Opt {
    /// The program to execute
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Map keys 0-9 and a-f directly to the keypad instead of by position
    #[structopt(long)]
    hex_keys: bool,

    #[structopt(flatten)]
    config: ConfigOpt,
}

fn main() -> std::io::Result<()> {
    env_logger::init();

    let opt = Opt::from_args();
    log::info!("Executing {:?}", &opt.input);

    let keypad = Arc::new(Keypad::new());
    let (sender, receiver) = channel();

    let emulator = Emulator::with_input(keypad.clone(), opt.config.quirks());
    let output = CrosstermOutput::new()?;
    let mut scheduler = Scheduler::new(emulator, output, RomFile::new(opt.input), opt.config.speed());
    scheduler.reset()?;

    // Stops listening for keys when dropped
    let _key_manager = KeyManager::new(keypad, sender, opt.hex_keys);
    scheduler.run(&receiver);

    Ok(())
}
