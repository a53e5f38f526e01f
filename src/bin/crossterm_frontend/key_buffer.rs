use std::time::{Duration, Instant};

const NUM_KEYS: usize = 16;

/// Remembers when each key was last pressed.
///
/// Terminals report presses (and repeats) but no releases,
/// so a key counts as held until `timeout` passes without a new press.
pub struct KeyBuffer {
    timeout: Duration,
    pressed_at: [Option<Instant>; NUM_KEYS],
}

impl KeyBuffer {
    pub fn new(timeout: Duration) -> KeyBuffer {
        KeyBuffer {
            timeout,
            pressed_at: [None; NUM_KEYS],
        }
    }

    /// Register a keypress at `now`.
    pub fn push(&mut self, key: u8, now: Instant) {
        if let Some(slot) = self.pressed_at.get_mut(key as usize) {
            *slot = Some(now);
        }
    }

    /// Forget and return every key that has not been pressed for `timeout`.
    pub fn pop_expired(&mut self, now: Instant) -> Vec<u8> {
        let timeout = self.timeout;
        let mut expired = Vec::new();
        for (key, slot) in self.pressed_at.iter_mut().enumerate() {
            if let Some(pressed_at) = *slot {
                if now.duration_since(pressed_at) >= timeout {
                    *slot = None;
                    expired.push(key as u8);
                }
            }
        }
        expired
    }
}
