//! Record codec: the append-only log of `(logical_addr, value)` pairs past
//! a page's 4-byte header. Grounded in `eeprom.c`'s `eeprom_write_byte`,
//! `eeprom_read_byte` and `flash_copy_page`.

use core::ops::ControlFlow;

use flash_port::FlashPort;

use crate::config::EE_VARIABLE_SIZE;

/// `0xFF` in the address byte position means "this slot has never been
/// written" — the log tail.
pub const UNUSED_ADDR: u8 = 0xFF;

/// Append `(addr, value)` at `page_base + tail`.
///
/// Programs the address byte first, then the value byte: a
/// crash between the two leaves a record whose address is set but whose
/// value reads `0xFF`, which recovery treats as "this address was written
/// `0xFF`" — indistinguishable from never having been written, which is
/// the neutral, safe interpretation.
///
/// Returns the new tail on success.
pub fn append_record<F: FlashPort>(
    flash: &mut F,
    page_base: u32,
    tail: u32,
    addr: u8,
    value: u8,
) -> flash_port::FlashResult<u32> {
    flash.write_byte(page_base + tail, addr)?;
    flash.write_byte(page_base + tail + 1, value)?;
    Ok(tail + EE_VARIABLE_SIZE)
}

/// Visit every record slot in `page_base + [EE_TAG_SIZE, page_size)`, in
/// ascending offset order, until `visit` returns [`ControlFlow::Break`] or
/// the page is exhausted.
pub fn scan_records<F: FlashPort, B>(
    flash: &F,
    page_base: u32,
    page_size: u32,
    mut visit: impl FnMut(u32, u8, u8) -> ControlFlow<B>,
) -> Option<B> {
    let mut offset = crate::config::EE_TAG_SIZE;
    while offset < page_size {
        let addr = flash.read_byte(page_base + offset);
        let value = flash.read_byte(page_base + offset + 1);
        if let ControlFlow::Break(b) = visit(offset, addr, value) {
            return Some(b);
        }
        offset += EE_VARIABLE_SIZE;
    }
    None
}

/// Offset of the first unused record slot at or after `EE_TAG_SIZE` — the
/// append point (`tail`).
pub fn find_tail<F: FlashPort>(flash: &F, page_base: u32, page_size: u32) -> u32 {
    scan_records(flash, page_base, page_size, |offset, addr, _value| {
        if addr == UNUSED_ADDR {
            ControlFlow::Break(offset)
        } else {
            ControlFlow::Continue(())
        }
    })
    .unwrap_or(page_size)
}

/// Scan records from `high_offset` (exclusive) down to `EE_TAG_SIZE`,
/// returning the value of the first record whose address byte equals
/// `addr`. `high_offset` is normally the current tail; records at or past
/// it are unprogrammed and can never match a real address.
pub fn find_latest<F: FlashPort>(
    flash: &F,
    page_base: u32,
    high_offset: u32,
    addr: u8,
) -> Option<u8> {
    let mut offset = high_offset;
    while offset > crate::config::EE_TAG_SIZE {
        offset -= EE_VARIABLE_SIZE;
        let a = flash.read_byte(page_base + offset);
        if a == addr {
            return Some(flash.read_byte(page_base + offset + 1));
        }
    }
    None
}
