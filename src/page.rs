//! Page state machine: ERASED / RECEIVING / ACTIVE, the four legal
//! transitions between them, and formatting. Grounded in `eeprom.c`'s
//! `eeprom_format_page` and `eeprom_is_formatted`.

use core::ops::ControlFlow;

use flash_port::FlashPort;

use crate::header::{self, PageStatus, ERASE_COUNT_MAX, STATUS_ACTIVE, STATUS_RECEIVING};
use crate::record;

/// Erase `page_base` and re-stamp its erase counter, incremented by one
/// (saturating at `0xFFFFFF`). `0xFFFFFF` ("never formatted") is treated as
/// a starting count of 0 so the very first format of a page yields counter
/// `1`. The status byte is left at `0xFF` (ERASED); the page does not
/// become ACTIVE here.
pub fn format_page<F: FlashPort>(
    flash: &mut F,
    page_base: u32,
) -> flash_port::FlashResult {
    let raw = header::read_erase_count(flash, page_base);
    let base = if raw == ERASE_COUNT_MAX { 0 } else { raw };
    let new_count = (base + 1).min(ERASE_COUNT_MAX);
    flash.erase_page(page_base)?;
    header::write_erase_count(flash, page_base, new_count)
}

/// `true` if `page_base` is ERASED with a valid (non-`0xFFFFFF`) erase
/// counter and every record slot still reads `0xFF`. A page whose status
/// byte is `0xFF` but which fails either check is "erased-with-garbage" and
/// must be reformatted before use.
pub fn is_properly_formatted<F: FlashPort>(flash: &F, page_base: u32, page_size: u32) -> bool {
    if header::read_status(flash, page_base) != PageStatus::Erased {
        return false;
    }
    if header::read_erase_count(flash, page_base) == ERASE_COUNT_MAX {
        return false;
    }
    record::scan_records(flash, page_base, page_size, |_offset, addr, value| {
        if addr == record::UNUSED_ADDR && value == record::UNUSED_ADDR {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    })
    .is_none()
}

/// Ensure `page_base` is in ERASED state with a valid header, formatting it
/// first if it is not already. Used before a page is promoted to RECEIVING
/// or ACTIVE.
pub fn ensure_formatted<F: FlashPort>(
    flash: &mut F,
    page_base: u32,
    page_size: u32,
) -> flash_port::FlashResult {
    if is_properly_formatted(flash, page_base, page_size) {
        Ok(())
    } else {
        format_page(flash, page_base)
    }
}

/// ERASED -> RECEIVING: begin using `page_base` as a compaction target.
pub fn mark_receiving<F: FlashPort>(flash: &mut F, page_base: u32) -> flash_port::FlashResult {
    header::write_status(flash, page_base, STATUS_RECEIVING)
}

/// ERASED -> ACTIVE or RECEIVING -> ACTIVE: the single-byte commit that
/// makes `page_base` the page accepting new writes.
pub fn mark_active<F: FlashPort>(flash: &mut F, page_base: u32) -> flash_port::FlashResult {
    header::write_status(flash, page_base, STATUS_ACTIVE)
}
