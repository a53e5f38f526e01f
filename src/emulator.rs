//! The interpreter and everything it needs from the outside world.

pub mod config;
pub mod emulator;
pub mod fault;
pub mod input;
pub mod instruction;
pub mod memory;
pub mod output;
pub mod rom;
pub mod scheduler;

pub use self::config::{Quirks, Speed};
pub use self::emulator::Emulator;
pub use self::fault::Fault;
pub use self::scheduler::{Command, Scheduler};
