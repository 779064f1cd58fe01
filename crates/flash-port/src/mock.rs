//! Deterministic in-memory flash for off-target tests.
//!
//! Generalizes the inline fake-flash `#[cfg(test)]` impl `idubrov-x2-feed`'s
//! `crates/eeprom` used (which simply wrote `0xffff_ffff` over a page to
//! fake an erase) into a standalone, reusable [`FlashPort`] so
//! `eeprom-emu`'s own test suite does not have to re-derive it.

use std::vec;
use std::vec::Vec;

use crate::{FlashError, FlashPort, FlashResult};

/// A flash device backed by a plain `Vec<u8>`. Byte program clears bits the
/// way real NOR flash does (`current & value`); page erase fills a page with
/// `0xFF`; reads are pure.
pub struct MockFlash {
    data: Vec<u8>,
    page_size: u32,
}

impl MockFlash {
    /// Create a fully-erased flash of `total_size` bytes, `page_size` bytes
    /// per page. `total_size` must be a multiple of `page_size`.
    pub fn new(total_size: u32, page_size: u32) -> Self {
        assert_eq!(total_size % page_size, 0, "total_size must be a multiple of page_size");
        MockFlash {
            data: vec![0xFFu8; total_size as usize],
            page_size,
        }
    }

    /// Build a mock flash from raw bytes already in some state — used to
    /// seed a crash scenario (e.g. "the hardware looked like this the
    /// instant power was lost") before handing it to a fresh `Eeprom`.
    pub fn from_bytes(data: Vec<u8>, page_size: u32) -> Self {
        assert_eq!(data.len() as u32 % page_size, 0, "data length must be a multiple of page_size");
        MockFlash { data, page_size }
    }

    /// Snapshot the raw bytes, e.g. to seed another `MockFlash` mid-test.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Total capacity in bytes.
    pub fn len(&self) -> u32 {
        self.data.len() as u32
    }
}

impl FlashPort for MockFlash {
    fn read_byte(&self, addr: u32) -> u8 {
        self.data[addr as usize]
    }

    fn write_byte(&mut self, addr: u32, value: u8) -> FlashResult {
        let slot = &mut self.data[addr as usize];
        *slot &= value;
        Ok(())
    }

    fn erase_page(&mut self, page_base: u32) -> FlashResult {
        let start = page_base as usize;
        let end = start + self.page_size as usize;
        if end > self.data.len() {
            return Err(FlashError::WriteProtected);
        }
        for byte in &mut self.data[start..end] {
            *byte = 0xFF;
        }
        Ok(())
    }
}
