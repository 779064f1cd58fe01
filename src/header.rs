//! Page header codec: the first four bytes of every emulation page — one
//! status byte plus a 3-byte monotonic erase counter.
//!
//! Grounded in `eeprom.c`'s `eeprom_format_page`/`eeprom_is_formatted`. The
//! original source exists in at least two variants that disagree on the
//! byte order of the 24-bit erase counter; this crate fixes bytes 1, 2, 3 as
//! MSB, middle, LSB of the counter and uses that order consistently in both
//! directions.

use flash_port::FlashPort;

/// Status byte of a freshly erased or formatted-and-empty page.
pub const STATUS_ERASED: u8 = 0xFF;
/// Status byte of a page that is the target of an in-progress compaction.
pub const STATUS_RECEIVING: u8 = 0xAA;
/// Status byte of the page currently accepting new writes.
pub const STATUS_ACTIVE: u8 = 0x00;

/// Largest representable erase count; saturates here instead of wrapping.
pub const ERASE_COUNT_MAX: u32 = 0x00FF_FFFF;

/// Interpreted page status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PageStatus {
    /// Status byte `0xFF`: either freshly erased or formatted-and-empty.
    Erased,
    /// Status byte `0xAA`: compaction target, copy in progress.
    Receiving,
    /// Status byte `0x00`: the page currently accepting writes.
    Active,
    /// Any other byte. Treated as erased-with-garbage-payload by the
    /// recovery scan, never as a legal state on its own.
    Corrupt,
}

/// Read and interpret the status byte at offset 0 of `page_base`.
pub fn read_status<F: FlashPort>(flash: &F, page_base: u32) -> PageStatus {
    match flash.read_byte(page_base) {
        STATUS_ERASED => PageStatus::Erased,
        STATUS_RECEIVING => PageStatus::Receiving,
        STATUS_ACTIVE => PageStatus::Active,
        _ => PageStatus::Corrupt,
    }
}

/// Program the status byte at offset 0 of `page_base`. Only legal as a
/// strict bit-clear of the current value (`0xFF -> 0xAA -> 0x00`); callers
/// are responsible for only invoking this along a legal transition (see
/// the page state machine in `crate::page`).
pub fn write_status<F: FlashPort>(
    flash: &mut F,
    page_base: u32,
    status: u8,
) -> flash_port::FlashResult {
    flash.write_byte(page_base, status)
}

/// Read the 3-byte big-endian (MSB..LSB) erase counter at offsets 1..3 of
/// `page_base`. `0xFFFFFF` means "never formatted".
pub fn read_erase_count<F: FlashPort>(flash: &F, page_base: u32) -> u32 {
    let b1 = flash.read_byte(page_base + 1) as u32;
    let b2 = flash.read_byte(page_base + 2) as u32;
    let b3 = flash.read_byte(page_base + 3) as u32;
    (b1 << 16) | (b2 << 8) | b3
}

/// Program the 3-byte big-endian erase counter at offsets 1..3 of
/// `page_base`. Only meaningful immediately after an erase (the bytes can
/// only move `1 -> 0`).
pub fn write_erase_count<F: FlashPort>(
    flash: &mut F,
    page_base: u32,
    count: u32,
) -> flash_port::FlashResult {
    let count = count.min(ERASE_COUNT_MAX);
    flash.write_byte(page_base + 1, (count >> 16) as u8)?;
    flash.write_byte(page_base + 2, (count >> 8) as u8)?;
    flash.write_byte(page_base + 3, count as u8)
}
