//! Flash port: the contract a concrete MCU flash driver must satisfy for the
//! EEPROM emulation core in `eeprom-emu`.
//!
//! This crate deliberately knows nothing about wear leveling, page headers or
//! records. It is the seam between that core and whatever byte-program /
//! page-erase / write-key protocol a given flash controller actually needs —
//! the per-device table the original C source kept as a giant match on MCU
//! family lives on the other side of this trait, not inside it.
#![no_std]
#![warn(missing_docs)]
#![deny(warnings)]

#[cfg(feature = "std")]
extern crate std;

#[cfg(feature = "std")]
pub mod mock;

/// Flash operation error, surfaced by a concrete [`FlashPort`] implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FlashError {
    /// Programming and erase controller is busy with another operation.
    Busy,
    /// Timed out waiting for a program or erase to complete.
    Timeout,
    /// The target address or page is write-protected.
    WriteProtected,
    /// A read-back verify (where the concrete port performs one) did not
    /// match the value just programmed.
    VerifyFailed,
}

/// Result type for all [`FlashPort`] operations.
pub type FlashResult<T = ()> = Result<T, FlashError>;

/// Contract a concrete MCU flash driver provides to the EEPROM core.
///
/// Implementations are responsible for anything device-specific: the
/// write-key unlock sequence, disabling interrupts around the actual
/// byte-program/page-erase primitives so the key sequence cannot be
/// disturbed, and enabling a VDD monitor if the part requires one before
/// programming. None of that is visible to callers of this trait.
pub trait FlashPort {
    /// Read a single byte. Pure; never mutates flash. Reads `0xFF` for any
    /// byte that has never been programmed since its page was last erased.
    fn read_byte(&self, addr: u32) -> u8;

    /// Program a single byte at `addr`. Flash can only clear bits (`1 -> 0`);
    /// bits already `0` cannot be set back to `1` without an erase. A port
    /// may legitimately leave the byte unchanged on failure — the core does
    /// not rely on partial programs being visible.
    fn write_byte(&mut self, addr: u32, value: u8) -> FlashResult;

    /// Erase the page beginning at `page_base`, restoring every byte in it
    /// to `0xFF`. `page_base` is always the address of the first byte of a
    /// page as described by this port's [`FlashGeometry`].
    fn erase_page(&mut self, page_base: u32) -> FlashResult;
}

/// Static flash geometry for a device family, supplied by a concrete flash
/// port rather than hard-coded into the emulation core.
///
/// This replaces the per-MCU table the original C source carried
/// (`Fxxx_Flash_Parameters.h`): rather than one core that knows about every
/// supported part, each port picks (or defines) the preset appropriate to
/// its hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlashGeometry {
    /// Size in bytes of a single erasable flash page.
    pub page_size: u32,
    /// Address of the first byte of the lock page; the emulation region
    /// must end at or before this address.
    pub lock_page: u32,
}

impl FlashGeometry {
    /// STM32F103 medium-density devices: 1 KiB pages.
    pub const STM32F103_MEDIUM: FlashGeometry = FlashGeometry {
        page_size: 1024,
        lock_page: 0x0801_FC00,
    };

    /// STM32F103 high-density devices: 2 KiB pages.
    pub const STM32F103_HIGH: FlashGeometry = FlashGeometry {
        page_size: 2048,
        lock_page: 0x0803_F800,
    };

    /// 8051-class parts with small pages, as used by the original
    /// single-page-table EEPROM emulation this crate's core was modeled on.
    pub const SMALL_8051: FlashGeometry = FlashGeometry {
        page_size: 512,
        lock_page: 0x1C00,
    };
}
