/// A structure for easily splitting an opcode into the fields
/// the CHIP-8 instruction set encodes in it.
///
/// With an opcode written as four hexadecimal digits `KXYN`,
/// the nibbles give the kind and the X, Y and N operands,
/// `nn` is the last byte and `nnn` the last 12 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitSplitter(u8, u8);

impl BitSplitter {
    pub fn from_u16(value: u16) -> BitSplitter {
        BitSplitter((value >> 8) as u8, (value & 0x00FF) as u8)
    }

    /// Left-shift the first component 8 bits,
    /// then take bitwise or with the second component.
    pub fn as_u16(&self) -> u16 {
        ((self.0 as u16) << 8) | self.1 as u16
    }

    /// The four nibbles, most significant first.
    pub fn as_four_u8(&self) -> (u8, u8, u8, u8) {
        (self.0 >> 4, self.0 & 0x0F, self.1 >> 4, self.1 & 0x0F)
    }

    pub fn nn(&self) -> u8 {
        self.1
    }

    pub fn nnn(&self) -> u16 {
        self.as_u16() & 0x0FFF
    }
}

/// Expand a byte into its eight bits, most significant bit first.
pub fn byte_to_bits(byte: u8) -> [u8; 8] {
    let mut bits = [0; 8];
    for (j, bit) in bits.iter_mut().enumerate() {
        *bit = (byte >> (7 - j)) & 1;
    }
    bits
}
