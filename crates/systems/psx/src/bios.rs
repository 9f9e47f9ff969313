//! BIOS ROM image

use crate::PsxError;

/// Every retail PSX BIOS image is exactly 512KB.
pub const BIOS_SIZE: usize = 512 * 1024;

/// A validated 512KB BIOS ROM, read-only once loaded.
pub struct Bios {
    data: Vec<u8>,
}

impl Bios {
    /// Validate and take ownership of a BIOS image. Anything that is not
    /// exactly 512KB is rejected.
    pub fn new(data: &[u8]) -> Result<Self, PsxError> {
        if data.len() != BIOS_SIZE {
            return Err(PsxError::InvalidBios {
                size: data.len(),
                expected: BIOS_SIZE,
            });
        }
        Ok(Bios {
            data: data.to_vec(),
        })
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
}
