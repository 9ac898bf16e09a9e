//! Linear memory: one growable, zero-initialised byte buffer sized in 64KiB pages.
//!
//! Every access is bounds-checked against the current size before the buffer
//! is touched; an access that does not fit traps rather than clamping.

use byteorder::{ByteOrder, LittleEndian};

use super::RuntimeError;

/// Page size in bytes (64KiB)
pub const PAGE_SIZE: usize = 65536;

/// Largest page count a 32-bit address space can hold
pub const MAX_PAGES: u32 = 65536;

#[derive(Debug)]
pub struct Memory {
    data: Vec<u8>,
    current_pages: u32,
    max_pages: Option<u32>,
    /// Hard ceiling applied on top of the declared maximum.
    ceiling: u32,
}

impl Memory {
    /// Allocates `initial_pages` of zeroed memory.
    ///
    /// Fails if the initial size exceeds the declared maximum or the ceiling,
    /// or if the buffer cannot be allocated.
    pub fn new(initial_pages: u32, max_pages: Option<u32>, ceiling: u32) -> Result<Self, RuntimeError> {
        let ceiling = ceiling.min(MAX_PAGES);
        let limit = max_pages.map_or(ceiling, |max| max.min(ceiling));
        if initial_pages > limit {
            return Err(RuntimeError::MemoryExceedsMax {
                initial: initial_pages,
                maximum: limit,
            });
        }

        let exceeds = || RuntimeError::MemoryExceedsMax {
            initial: initial_pages,
            maximum: limit,
        };
        let bytes = (initial_pages as usize)
            .checked_mul(PAGE_SIZE)
            .ok_or_else(exceeds)?;
        let mut data = Vec::new();
        data.try_reserve_exact(bytes).map_err(|_| exceeds())?;
        data.resize(bytes, 0);

        Ok(Memory {
            data,
            current_pages: initial_pages,
            max_pages,
            ceiling,
        })
    }

    /// Current size in pages
    pub fn size(&self) -> u32 {
        self.current_pages
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    pub fn max_pages(&self) -> Option<u32> {
        self.max_pages
    }

    /// Grows by `delta_pages`, zero-filling the new pages.
    ///
    /// Returns the previous size in pages, or -1 if no growth occurred.
    pub fn grow(&mut self, delta_pages: u32) -> i32 {
        let current = self.current_pages;
        let Some(new_pages) = current.checked_add(delta_pages) else {
            return -1;
        };

        let limit = self.max_pages.map_or(self.ceiling, |max| max.min(self.ceiling));
        if new_pages > limit {
            return -1;
        }

        let new_bytes = new_pages as usize * PAGE_SIZE;
        match self.data.try_reserve(new_bytes - self.data.len()) {
            Ok(()) => {
                self.data.resize(new_bytes, 0);
                self.current_pages = new_pages;
                current as i32
            }
            Err(_) => -1,
        }
    }

    #[inline]
    fn check_bounds(&self, addr: u64, width: usize) -> Result<usize, RuntimeError> {
        match addr.checked_add(width as u64) {
            Some(end) if end <= self.data.len() as u64 => Ok(addr as usize),
            _ => Err(RuntimeError::MemoryAccessOutOfBounds {
                address: addr,
                width,
                size: self.data.len(),
            }),
        }
    }

    pub fn read_bytes(&self, addr: u64, len: usize) -> Result<&[u8], RuntimeError> {
        let start = self.check_bounds(addr, len)?;
        Ok(&self.data[start..start + len])
    }

    pub fn write_bytes(&mut self, addr: u64, bytes: &[u8]) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, bytes.len())?;
        self.data[start..start + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    pub fn read_u8(&self, addr: u64) -> Result<u8, RuntimeError> {
        let addr = self.check_bounds(addr, 1)?;
        Ok(self.data[addr])
    }

    pub fn read_u16(&self, addr: u64) -> Result<u16, RuntimeError> {
        Ok(LittleEndian::read_u16(self.read_bytes(addr, 2)?))
    }

    pub fn read_u32(&self, addr: u64) -> Result<u32, RuntimeError> {
        Ok(LittleEndian::read_u32(self.read_bytes(addr, 4)?))
    }

    pub fn read_u64(&self, addr: u64) -> Result<u64, RuntimeError> {
        Ok(LittleEndian::read_u64(self.read_bytes(addr, 8)?))
    }

    pub fn read_f32(&self, addr: u64) -> Result<f32, RuntimeError> {
        Ok(LittleEndian::read_f32(self.read_bytes(addr, 4)?))
    }

    pub fn read_f64(&self, addr: u64) -> Result<f64, RuntimeError> {
        Ok(LittleEndian::read_f64(self.read_bytes(addr, 8)?))
    }

    pub fn write_u8(&mut self, addr: u64, value: u8) -> Result<(), RuntimeError> {
        let addr = self.check_bounds(addr, 1)?;
        self.data[addr] = value;
        Ok(())
    }

    pub fn write_u16(&mut self, addr: u64, value: u16) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 2)?;
        LittleEndian::write_u16(&mut self.data[start..start + 2], value);
        Ok(())
    }

    pub fn write_u32(&mut self, addr: u64, value: u32) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 4)?;
        LittleEndian::write_u32(&mut self.data[start..start + 4], value);
        Ok(())
    }

    pub fn write_u64(&mut self, addr: u64, value: u64) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 8)?;
        LittleEndian::write_u64(&mut self.data[start..start + 8], value);
        Ok(())
    }

    pub fn write_f32(&mut self, addr: u64, value: f32) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 4)?;
        LittleEndian::write_f32(&mut self.data[start..start + 4], value);
        Ok(())
    }

    pub fn write_f64(&mut self, addr: u64, value: f64) -> Result<(), RuntimeError> {
        let start = self.check_bounds(addr, 8)?;
        LittleEndian::write_f64(&mut self.data[start..start + 8], value);
        Ok(())
    }
}
