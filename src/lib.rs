/*!

A CHIP-8 virtual machine as specified at https://en.wikipedia.org/wiki/CHIP-8.

# Crossterm Frontend

If you want to try the emulator on some programs, there is a ready-to-use implementation
you can run by using `cargo run --release --bin crossterm_frontend -- <program>`.
The keypad is the usual `1234/qwer/asdf/zxcv` block, or the keys 0-9 and a-f with `--hex-keys`.
`p` pauses and resumes, `n` steps one instruction, `Enter` resets and `Esc` quits.

Run with `--help` to see the quirk toggles and speed settings.

# Library

The main way of running a program is to load instructions as bytes.

```rust
use chip8_vm::emulator::Emulator;

let mut emulator = Emulator::new();

// Load a program at address 0x200.
let program = [0x60, 0x0A, 0x61, 0x0B, 0x80, 0x14];
emulator.load(&program).unwrap();
emulator.run_batch(3);
assert_eq!(emulator.register(0), 21);
```

Alternatively, you can experiment by executing instructions manually.

```rust
use chip8_vm::emulator::Emulator;
use chip8_vm::emulator::instruction::{Instruction, Reg, Const, Addr};

let mut emulator = Emulator::new();

// Execute instructions manually
emulator.execute_single(Instruction::ClearScreen).unwrap();

// Or many sequentially
emulator.execute_many(&[
    Instruction::Goto(Addr(0x250)),
    Instruction::SetRegToConst(Reg(0xA), Const(35)),
    Instruction::SetRegToReg(Reg(0xB), Reg(0xA))
]).unwrap();
assert_eq!(emulator.register(0xB), 35);
```

## Running in time

`Scheduler` decrements the timers and runs batches of instructions as time passes.
Keys come from an `EmulatorInput` such as a shared `Keypad`, and the screen goes
to an `EmulatorOutput`.

```rust
use std::sync::Arc;
use std::time::Duration;
use chip8_vm::emulator::{Emulator, Quirks, Scheduler, Speed};
use chip8_vm::emulator::input::Keypad;
use chip8_vm::emulator::output::DummyOutput;

let keypad = Arc::new(Keypad::new());
let emulator = Emulator::with_input(keypad.clone(), Quirks::default());
let program = vec![0xF0, 0x0A]; // Wait for a key, store it in V0
let mut scheduler = Scheduler::new(emulator, DummyOutput::new(), program, Speed::default());

scheduler.reset().unwrap();
keypad.press(0x7);
scheduler.advance(Duration::from_millis(20));
assert_eq!(scheduler.emulator().register(0), 0x7);
```
*/

pub mod emulator;
pub mod util;
