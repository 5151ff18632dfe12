//! Flat guest address space.
//!
//! The real hardware walks a GTT to turn a graphics address into a CPU
//! pointer; this simulator has no MMU to model, so `GuestMemory` is just a
//! byte vector with bounds-checked accessors standing in for
//! `map_gtt_offset`.

use std::fmt;

/// A translation or bounds failure while reading/writing guest memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemError {
    /// `address + len` runs past the end of the guest image.
    OutOfRange { address: u64, len: usize, size: usize },
}

impl fmt::Display for MemError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemError::OutOfRange { address, len, size } => write!(
                f,
                "guest access at 0x{address:x} len {len} exceeds memory size {size}"
            ),
        }
    }
}

impl std::error::Error for MemError {}

/// The guest's linear address space, backed by a single owned buffer.
pub struct GuestMemory {
    bytes: Vec<u8>,
}

impl GuestMemory {
    pub fn new(bytes: Vec<u8>) -> Self {
        GuestMemory { bytes }
    }

    pub fn with_size(size: usize) -> Self {
        GuestMemory { bytes: vec![0; size] }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Load a region starting at `address` at a caller-provided offset,
    /// growing the image if necessary. Used to seed scenarios from a config
    /// file's `{address, bytes}` regions.
    pub fn load(&mut self, address: u64, data: &[u8]) {
        let start = address as usize;
        let end = start + data.len();
        if end > self.bytes.len() {
            self.bytes.resize(end, 0);
        }
        self.bytes[start..end].copy_from_slice(data);
    }

    pub fn read(&self, address: u64, len: usize) -> Result<&[u8], MemError> {
        let start = address as usize;
        let end = start.checked_add(len).ok_or(MemError::OutOfRange {
            address,
            len,
            size: self.bytes.len(),
        })?;
        self.bytes.get(start..end).ok_or(MemError::OutOfRange {
            address,
            len,
            size: self.bytes.len(),
        })
    }

    pub fn write(&mut self, address: u64, data: &[u8]) -> Result<(), MemError> {
        let start = address as usize;
        let end = start + data.len();
        if end > self.bytes.len() {
            return Err(MemError::OutOfRange {
                address,
                len: data.len(),
                size: self.bytes.len(),
            });
        }
        self.bytes[start..end].copy_from_slice(data);
        Ok(())
    }

    pub fn read_u32(&self, address: u64) -> Result<u32, MemError> {
        let bytes = self.read(address, 4)?;
        Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_u64(&self, address: u64) -> Result<u64, MemError> {
        let bytes = self.read(address, 8)?;
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    pub fn read_f32(&self, address: u64) -> Result<f32, MemError> {
        Ok(f32::from_bits(self.read_u32(address)?))
    }

    /// Read `count` little-endian dwords starting at `address`.
    pub fn read_dwords(&self, address: u64, count: usize) -> Result<Vec<u32>, MemError> {
        let bytes = self.read(address, count * 4)?;
        Ok(bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_write_roundtrip() {
        let mut mem = GuestMemory::with_size(64);
        mem.write(4, &[1, 2, 3, 4]).unwrap();
        assert_eq!(mem.read(4, 4).unwrap(), &[1, 2, 3, 4]);
    }

    #[test]
    fn out_of_range_is_an_error_not_a_panic() {
        let mem = GuestMemory::with_size(16);
        assert!(matches!(mem.read(10, 16), Err(MemError::OutOfRange { .. })));
    }

    #[test]
    fn load_grows_backing_buffer() {
        let mut mem = GuestMemory::with_size(0);
        mem.load(8, &[0xaa; 4]);
        assert_eq!(mem.read(8, 4).unwrap(), &[0xaa; 4]);
    }
}
