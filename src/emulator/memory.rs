use crate::emulator::fault::Fault;

pub const MEM_SIZE: usize = 4096;
pub const PROGRAM_START: usize = 0x200;

/// Bytes per glyph in the font table.
pub const FONT_GLYPH_SIZE: usize = 5;

/// Hexadecimal digits 0-F, stored at address 0.
pub const FONT: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// The 4 KiB address space. Every access is bounds checked,
/// and out of range accesses leave memory untouched.
pub struct Memory {
    bytes: Box<[u8; MEM_SIZE]>,
}

impl Memory {
    /// Zeroed memory with the font table loaded.
    pub fn new() -> Memory {
        let mut bytes = Box::new([0; MEM_SIZE]);
        bytes[..FONT.len()].copy_from_slice(&FONT);
        Memory { bytes }
    }

    pub fn read(&self, address: usize) -> Result<u8, Fault> {
        self.bytes
            .get(address)
            .copied()
            .ok_or(Fault::MemoryOutOfBounds { address })
    }

    /// Read a big-endian word.
    pub fn read_word(&self, address: usize) -> Result<u16, Fault> {
        let left = self.read(address)?;
        let right = self.read(address + 1)?;
        Ok((left as u16) << 8 | right as u16)
    }

    pub fn write(&mut self, address: usize, value: u8) -> Result<(), Fault> {
        match self.bytes.get_mut(address) {
            Some(byte) => {
                *byte = value;
                Ok(())
            }
            None => Err(Fault::MemoryOutOfBounds { address }),
        }
    }

    /// Copy a buffer into memory starting at `address`.
    /// Either every byte fits and is written, or nothing is written.
    pub fn copy_from(&mut self, address: usize, buffer: &[u8]) -> Result<(), Fault> {
        if address > MEM_SIZE || buffer.len() > MEM_SIZE - address {
            log::debug!(
                "Rejected copy of {} bytes to {:#05x}, at most {} bytes fit",
                buffer.len(),
                address,
                MEM_SIZE.saturating_sub(address)
            );
            return Err(Fault::MemoryOutOfBounds { address: address.max(MEM_SIZE) });
        }
        self.bytes[address..address + buffer.len()].copy_from_slice(buffer);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..]
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
