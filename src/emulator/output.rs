use crate::emulator::fault::Fault;
use std::fmt;

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 32;

type Cells = [[u8; SCREEN_WIDTH]; SCREEN_HEIGHT];
const EMPTY_SCREEN: Cells = [[0; SCREEN_WIDTH]; SCREEN_HEIGHT];

/// The logical 64x32 screen. Each cell is 0 (off) or 1 (on).
///
/// Only the emulator mutates it; renderers read it.
#[derive(Clone, PartialEq, Eq)]
pub struct Framebuffer {
    cells: Cells,
}

impl Framebuffer {
    pub fn new() -> Framebuffer {
        Framebuffer { cells: EMPTY_SCREEN }
    }

    /// Get the cell at column `x`, row `y`. Out of range cells are off.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.cells.get(y).and_then(|row| row.get(x)).copied().unwrap_or(0)
    }

    /// Flip the cell at `(x, y)`, returning true if it was on
    /// (i.e. the flip turned it off, a collision).
    pub(crate) fn flip(&mut self, x: usize, y: usize) -> bool {
        let cell = &mut self.cells[y][x];
        let collision = *cell == 1;
        *cell ^= 1;
        collision
    }

    #[cfg(test)]
    pub(crate) fn set(&mut self, x: usize, y: usize, state: u8) {
        self.cells[y][x] = state;
    }

    pub fn clear(&mut self) {
        self.cells = EMPTY_SCREEN;
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u8; SCREEN_WIDTH]> {
        self.cells.iter()
    }

    /// Number of cells that are on.
    pub fn lit(&self) -> usize {
        self.cells.iter().flatten().filter(|c| **c == 1).count()
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            for c in row.iter() {
                write!(f, "{}", if *c == 1 { "#" } else { " " })?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

impl fmt::Debug for Framebuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Framebuffer {{")?;
        for row in self.rows() {
            let line: String = row.iter().map(|c| if *c == 1 { '#' } else { '.' }).collect();
            writeln!(f, "    {}", line)?;
        }
        write!(f, "}}")
    }
}

/// Represents a screen the framebuffer can be presented on.
pub trait EmulatorOutput {
    /// Called after instructions have changed the framebuffer.
    fn refresh(&mut self, frame: &Framebuffer);

    /// Called when the pause state or the latest fault changes.
    fn status(&mut self, _paused: bool, _fault: Option<Fault>) {}
}

/// An output device that only counts how often it was refreshed.
pub struct DummyOutput {
    refreshes: usize,
}

impl DummyOutput {
    pub fn new() -> DummyOutput {
        DummyOutput { refreshes: 0 }
    }

    pub fn refreshes(&self) -> usize {
        self.refreshes
    }
}

impl Default for DummyOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl EmulatorOutput for DummyOutput {
    fn refresh(&mut self, _: &Framebuffer) {
        self.refreshes += 1;
    }
}
