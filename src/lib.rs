//! Byte-addressable EEPROM emulation on top of an MCU's internal NOR flash.
//!
//! Flash only supports page-granular erase and once-written bits
//! (program clears bits, erase restores a page to all `0xFF`). This crate
//! presents a fixed-size array of logical bytes that can be read and
//! rewritten arbitrarily often, journaling writes across two or more flash
//! pages and rotating between them so that no single page is erased more
//! often than the logical EEPROM has actually been rewritten (divided by
//! how many live addresses fit in a page).
//!
//! Descended from `idubrov-x2-feed`'s `crates/eeprom`, which emulated a
//! 16-bit tag/value store for a specific STM32 part directly on top of its
//! `FLASH` peripheral. This crate generalizes that design to an arbitrary
//! [`flash_port::FlashPort`] and an 8-bit logical address space, and adds
//! the explicit page state machine, erase-counter rotation, and crash
//! recovery that the original C EEPROM emulation this was modeled on
//! (`eeprom.c`) implements but the STM32 16-bit version did not need,
//! because it relied on its flash peripheral's own page-erase-cycle
//! headroom instead of wear leveling.
//!
//! # Examples
//! ```
//! use eeprom_emu::{Config, Eeprom};
//! use flash_port::mock::MockFlash;
//!
//! let cfg = Config {
//!     base_addr: 0,
//!     page_size: 1024,
//!     page_count: 2,
//!     lock_page: 0x10000,
//!     ee_size: 16,
//! };
//! let flash = MockFlash::new(cfg.page_size * cfg.page_count as u32, cfg.page_size);
//! let mut eeprom = Eeprom::init(flash, cfg).expect("failed to init EEPROM");
//! eeprom.write_byte(1, 0xde).expect("failed to write data to EEPROM");
//! eeprom.write_byte(2, 0xef).expect("failed to write data to EEPROM");
//! assert_eq!(0xde, eeprom.read_byte(1).unwrap());
//! assert_eq!(0xef, eeprom.read_byte(2).unwrap());
//! assert_eq!(0xFF, eeprom.read_byte(3).unwrap());
//! ```
//!
//! # Panics
//! Never panics on untrusted input — bad addresses are rejected with
//! [`Error::BadAddress`]. `debug_assert!`-guarded internal invariants can
//! still panic in debug builds if the flash port itself misbehaves.
#![no_std]
#![warn(missing_docs)]
#![deny(warnings)]

mod bitmap;
mod compact;
mod config;
mod cursor;
mod header;
mod page;
mod record;
mod recovery;

#[cfg(test)]
mod tests;

pub use config::{Config, ConfigError, ValidatedConfig};
pub use cursor::Cursor;
pub use header::PageStatus;
pub use flash_port::{self, FlashError, FlashPort};

use bitmap::Bitmap;

/// Errors the public API can return. Addresses are rejected before any
/// flash access; flash failures are propagated with their underlying
/// [`FlashError`]; [`Error::Read`] is a defensive "this should not happen"
/// signal that the presence bitmap and the flash contents disagreed;
/// [`Error::Sector`] means recovery could not elect any page at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// A logical address (or, for block operations, an address range) fell
    /// outside `[0, EE_SIZE)`.
    BadAddress,
    /// The supplied [`Config`] failed validation.
    Config(ConfigError),
    /// A flash program or erase did not complete successfully.
    Write(FlashError),
    /// The presence bitmap claimed an address was written, but no matching
    /// record was found in the active page. Indicates corruption or a
    /// violated invariant; should never occur if the flash port is sound.
    Read,
    /// Recovery could not elect any page at all, e.g. because the flash
    /// port itself is non-functional enough that even a fresh format
    /// fails.
    Sector,
}

/// EEPROM controller. Owns the flash port, the validated geometry, the
/// in-RAM active-page cursor, and the presence bitmap — the entire runtime
/// handle; there is no hidden global state.
pub struct Eeprom<F> {
    flash: F,
    cfg: ValidatedConfig,
    cursor: Cursor,
    bitmap: Bitmap,
}

impl<F: FlashPort> Eeprom<F> {
    /// Validate `config`, run the recovery scan over `flash`, and return a
    /// ready-to-use controller. Must be called once, before any read or
    /// write, and mirrors `eeprom_init()` in the original source together
    /// with the geometry checks `EEPROM::new` used to perform.
    pub fn init(flash: F, config: Config) -> Result<Self, Error> {
        let cfg = config.validate().map_err(Error::Config)?;
        let mut flash = flash;
        let (cursor, bitmap) = recovery::recover(&mut flash, &cfg)?;
        Ok(Eeprom {
            flash,
            cfg,
            cursor,
            bitmap,
        })
    }

    /// Read the value stored at logical address `addr`. Returns `0xFF` for
    /// any address that has never been written (in this boot or a prior
    /// one). Never mutates flash.
    pub fn read_byte(&self, addr: u8) -> Result<u8, Error> {
        self.check_addr(addr)?;
        if !self.bitmap.get(addr) {
            return Ok(0xFF);
        }
        record::find_latest(&self.flash, self.cursor.base_addr, self.cursor.tail, addr)
            .ok_or(Error::Read)
    }

    /// Write `value` to logical address `addr`. Triggers compaction
    /// first if the active page is full.
    pub fn write_byte(&mut self, addr: u8, value: u8) -> Result<(), Error> {
        self.check_addr(addr)?;

        if self.cursor.tail == self.cfg.get().page_size {
            let (cursor, bitmap) = compact::compact(&mut self.flash, &self.cfg, &self.cursor)?;
            self.cursor = cursor;
            self.bitmap = bitmap;
        }

        let new_tail = record::append_record(
            &mut self.flash,
            self.cursor.base_addr,
            self.cursor.tail,
            addr,
            value,
        )
        .map_err(Error::Write)?;
        self.cursor.tail = new_tail;
        self.bitmap.set(addr);
        Ok(())
    }

    /// Read `buf.len()` consecutive logical bytes starting at `addr`, as
    /// `buf.len()` successive [`Eeprom::read_byte`] calls. The whole range
    /// is bounds-checked up front; an out-of-range request never touches
    /// flash.
    pub fn read_block(&self, addr: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.check_range(addr, buf.len())?;
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.read_byte(addr + i as u8)?;
        }
        Ok(())
    }

    /// Write `buf` to `buf.len()` consecutive logical addresses starting
    /// at `addr`, as `buf.len()` successive [`Eeprom::write_byte`] calls.
    /// The whole range is bounds-checked up front, but individual byte
    /// failures partway through are not rolled back.
    pub fn write_block(&mut self, addr: u8, buf: &[u8]) -> Result<(), Error> {
        self.check_range(addr, buf.len())?;
        for (i, &value) in buf.iter().enumerate() {
            self.write_byte(addr + i as u8, value)?;
        }
        Ok(())
    }

    fn check_addr(&self, addr: u8) -> Result<(), Error> {
        if addr as usize >= self.cfg.get().ee_size as usize {
            Err(Error::BadAddress)
        } else {
            Ok(())
        }
    }

    fn check_range(&self, addr: u8, len: usize) -> Result<(), Error> {
        if addr as usize + len > self.cfg.get().ee_size as usize {
            Err(Error::BadAddress)
        } else {
            Ok(())
        }
    }
}
