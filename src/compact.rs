//! Compaction: copy the latest value of every live logical address from a
//! full active page into a freshly formatted successor, then retire the
//! source. Grounded in `eeprom.c`'s `flash_copy_page`, restructured into six
//! numbered steps (select successor, mark RECEIVING, copy, mark ACTIVE,
//! retire source, install cursor) so each commit point is visible in the
//! code, not just in comments. Unlike `flash_copy_page`, which programs the
//! triggering write into the destination page before compaction begins,
//! this runs compaction to completion first and lets the caller append the
//! triggering write afterward through the normal path.

use flash_port::FlashPort;

use crate::bitmap::Bitmap;
use crate::config::{ValidatedConfig, EE_TAG_SIZE, EE_VARIABLE_SIZE};
use crate::cursor::Cursor;
use crate::page;
use crate::record::UNUSED_ADDR;
use crate::Error;

/// Run compaction against the full active page described by `cursor`.
/// Returns the new cursor (pointing at the freshly-active successor) and
/// the presence bitmap rebuilt from the records actually copied.
pub fn compact<F: FlashPort>(
    flash: &mut F,
    cfg: &ValidatedConfig,
    cursor: &Cursor,
) -> Result<(Cursor, Bitmap), Error> {
    let geometry = cfg.get();
    let page_size = geometry.page_size;

    // 1. Select successor.
    let next_idx = (cursor.idx + 1) % geometry.page_count;
    let dest_base = cfg.page_base(next_idx);
    page::ensure_formatted(flash, dest_base, page_size).map_err(Error::Write)?;

    // 2. Mark RECEIVING.
    page::mark_receiving(flash, dest_base).map_err(Error::Write)?;

    // 3. Copy, scanning the source from the highest offset downward so the
    // first observation of each address is its newest value.
    let mut working = Bitmap::new(cfg.bitmap_size());
    let mut dest_tail = EE_TAG_SIZE;
    let mut src_offset = cursor.tail;
    while src_offset > EE_TAG_SIZE {
        src_offset -= EE_VARIABLE_SIZE;
        let addr = flash.read_byte(cursor.base_addr + src_offset);
        let value = flash.read_byte(cursor.base_addr + src_offset + 1);
        if addr == UNUSED_ADDR {
            continue;
        }
        if addr as usize >= geometry.ee_size as usize {
            continue; // garbage address, not a live logical byte
        }
        if !working.get(addr) {
            flash
                .write_byte(dest_base + dest_tail, addr)
                .map_err(Error::Write)?;
            flash
                .write_byte(dest_base + dest_tail + 1, value)
                .map_err(Error::Write)?;
            working.set(addr);
            dest_tail += EE_VARIABLE_SIZE;
        }
    }

    // 4. Mark ACTIVE: the single-byte commit point.
    page::mark_active(flash, dest_base).map_err(Error::Write)?;

    // 5. Retire source.
    page::format_page(flash, cursor.base_addr).map_err(Error::Write)?;

    // 6. Install cursor; the bitmap built during the copy already reflects
    // exactly the addresses now present in the destination page.
    let new_cursor = Cursor {
        idx: next_idx,
        base_addr: dest_base,
        tail: dest_tail,
    };
    Ok((new_cursor, working))
}
