use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const NUM_KEYS: usize = 16;

/// Represents an input device that is capable of providing keys in the range 0..0xF.
pub trait EmulatorInput {
    /// Whether `key` is held down. Keys above 0xF are never pressed.
    fn is_pressed(&self, key: u8) -> bool;

    /// The lowest key that is currently held down.
    fn first_pressed(&self) -> Option<u8> {
        (0..NUM_KEYS as u8).find(|key| self.is_pressed(*key))
    }
}

impl<T: EmulatorInput + ?Sized> EmulatorInput for Arc<T> {
    fn is_pressed(&self, key: u8) -> bool {
        (**self).is_pressed(key)
    }
}

impl<T: EmulatorInput + ?Sized> EmulatorInput for &T {
    fn is_pressed(&self, key: u8) -> bool {
        (**self).is_pressed(key)
    }
}

/// An input device that never provides any input
pub struct DummyInput;

impl EmulatorInput for DummyInput {
    fn is_pressed(&self, _: u8) -> bool {
        false
    }
}

/// Sixteen pressed/released slots.
///
/// Written by whatever listens for key events, read by the emulator.
/// Wrap it in an `Arc` to share it between threads; each slot is
/// updated atomically, so readers see either the old or the new state.
#[derive(Default)]
pub struct Keypad {
    keys: [AtomicBool; NUM_KEYS],
}

impl Keypad {
    pub fn new() -> Keypad {
        Keypad::default()
    }

    pub fn set(&self, key: u8, pressed: bool) {
        match self.keys.get(key as usize) {
            Some(slot) => slot.store(pressed, Ordering::Relaxed),
            None => log::warn!("Ignoring state of unknown key {:#x}", key),
        }
    }

    pub fn press(&self, key: u8) {
        self.set(key, true);
    }

    pub fn release(&self, key: u8) {
        self.set(key, false);
    }

    pub fn release_all(&self) {
        for slot in self.keys.iter() {
            slot.store(false, Ordering::Relaxed);
        }
    }
}

impl EmulatorInput for Keypad {
    fn is_pressed(&self, key: u8) -> bool {
        self.keys
            .get(key as usize)
            .map_or(false, |slot| slot.load(Ordering::Relaxed))
    }
}
