//! Main RAM and scratchpad
//!
//! Both are plain little-endian byte arrays with width-agnostic access.
//! Main RAM powers on filled with a recognizable garbage pattern so reads
//! of never-written memory stand out in trace dumps instead of looking
//! like legitimate zeros.

/// 2MB of main RAM.
pub const RAM_SIZE: usize = 2 * 1024 * 1024;

/// 1KB of scratchpad (the D-cache mapped as fast RAM).
pub const SCRATCHPAD_SIZE: usize = 1024;

/// Power-on fill pattern for main RAM.
pub const RAM_GARBAGE: u8 = 0xca;

pub struct Ram {
    data: Vec<u8>,
}

impl Ram {
    pub fn new() -> Self {
        Ram {
            data: vec![RAM_GARBAGE; RAM_SIZE],
        }
    }

    pub fn load8(&self, offset: u32) -> u8 {
        self.data[offset as usize]
    }

    pub fn load16(&self, offset: u32) -> u16 {
        let i = offset as usize;
        u16::from_le_bytes([self.data[i], self.data[i + 1]])
    }

    pub fn load32(&self, offset: u32) -> u32 {
        let i = offset as usize;
        u32::from_le_bytes([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn store8(&mut self, offset: u32, value: u8) {
        self.data[offset as usize] = value;
    }

    pub fn store16(&mut self, offset: u32, value: u16) {
        let i = offset as usize;
        self.data[i..i + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn store32(&mut self, offset: u32, value: u32) {
        let i = offset as usize;
        self.data[i..i + 4].copy_from_slice(&value.to_le_bytes());
    }

    /// Bulk copy into RAM, used for sideloading executables. The
    /// destination window must fit; callers validate against `RAM_SIZE`.
    pub fn write_block(&mut self, offset: u32, data: &[u8]) {
        let i = offset as usize;
        self.data[i..i + data.len()].copy_from_slice(data);
    }
}

impl Default for Ram {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Scratchpad {
    data: [u8; SCRATCHPAD_SIZE],
}

impl Scratchpad {
    pub fn new() -> Self {
        Scratchpad {
            data: [0; SCRATCHPAD_SIZE],
        }
    }

    pub fn load8(&self, offset: u32) -> u8 {
        self.data[offset as usize]
    }

    pub fn load16(&self, offset: u32) -> u16 {
        let i = offset as usize;
        u16::from_le_bytes([self.data[i], self.data[i + 1]])
    }

    pub fn load32(&self, offset: u32) -> u32 {
        let i = offset as usize;
        u32::from_le_bytes([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    pub fn store8(&mut self, offset: u32, value: u8) {
        self.data[offset as usize] = value;
    }

    pub fn store16(&mut self, offset: u32, value: u16) {
        let i = offset as usize;
        self.data[i..i + 2].copy_from_slice(&value.to_le_bytes());
    }

    pub fn store32(&mut self, offset: u32, value: u32) {
        let i = offset as usize;
        self.data[i..i + 4].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for Scratchpad {
    fn default() -> Self {
        Self::new()
    }
}
