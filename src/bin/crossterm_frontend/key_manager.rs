use super::crossterm_io::{key_to_command, key_to_u8, term};
use super::key_buffer::KeyBuffer;
use chip8_vm::emulator::input::Keypad;
use chip8_vm::emulator::Command;
use crossterm::event::{poll, read, Event};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const HOLD_TIMEOUT: Duration = Duration::from_millis(250);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A struct for managing keypresses that will automatically
/// start a thread that grabs keypresses.
///
/// Keypad keys go to the shared `Keypad`, control keys to the scheduler.
pub struct KeyManager {
    stop: Arc<AtomicBool>,
    event_listener: Option<JoinHandle<()>>,
}

impl KeyManager {
    pub fn new(keypad: Arc<Keypad>, commands: Sender<Command>, hex_keys: bool) -> KeyManager {
        let stop = Arc::new(AtomicBool::new(false));
        let listener = EventListener {
            keypad,
            commands,
            hex_keys,
            stop: stop.clone(),
            key_buffer: KeyBuffer::new(HOLD_TIMEOUT),
        };
        let event_listener = thread::spawn(move || {
            if let Err(e) = listener.run() {
                log::error!("Key listener failed: {}", e);
            }
        });
        KeyManager {
            stop,
            event_listener: Some(event_listener),
        }
    }
}

impl Drop for KeyManager {
    fn drop(&mut self) {
        // Tell the event listener to stop, and wait for it
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.event_listener.take() {
            let _ = handle.join();
        }
    }
}

struct EventListener {
    keypad: Arc<Keypad>,
    commands: Sender<Command>,
    hex_keys: bool,
    stop: Arc<AtomicBool>,
    key_buffer: KeyBuffer,
}

impl EventListener {
    fn run(mut self) -> io::Result<()> {
        while !self.stop.load(Ordering::Relaxed) {
            if term(poll(POLL_INTERVAL))? {
                if let Event::Key(key_event) = term(read())? {
                    log::debug!("Got key {:?}", key_event);
                    if let Some(command) = key_to_command(key_event.code) {
                        if self.commands.send(command).is_err() || command == Command::Quit {
                            break;
                        }
                    } else if let Some(key) = key_to_u8(key_event.code, self.hex_keys) {
                        self.keypad.press(key);
                        self.key_buffer.push(key, Instant::now());
                    }
                }
            }

            for key in self.key_buffer.pop_expired(Instant::now()) {
                self.keypad.release(key);
            }
        }
        Ok(())
    }
}
