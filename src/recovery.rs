//! Startup recovery scan: inspect every emulation page, repair torn states,
//! elect a single ACTIVE page, and initialize the cursor and presence
//! bitmap. Grounded in `eeprom.c`'s `eeprom_check_pages` / `eeprom_scan_page`,
//! generalized from the fixed two-page case to `FL_PAGES` pages and
//! rewritten to resolve "two ACTIVE pages" by keeping the non-full one (the
//! page still being written when compaction's single-byte commit landed,
//! rather than the stale full page compaction was copying out of).

use crate::bitmap::Bitmap;
use crate::config::{ValidatedConfig, MAX_PAGES};
use crate::cursor::Cursor;
use crate::header::{read_status, PageStatus};
use crate::page;
use crate::record::{self, UNUSED_ADDR};
use crate::Error;
use flash_port::FlashPort;

/// `true` if the last record slot of `page_base` has been written — the
/// page has no room left for another record.
fn is_full<F: FlashPort>(flash: &F, page_base: u32, page_size: u32) -> bool {
    let last_slot = page_base + page_size - crate::config::EE_VARIABLE_SIZE;
    flash.read_byte(last_slot) != UNUSED_ADDR
}

/// Run the recovery scan and return the elected active page's cursor and a
/// freshly rebuilt presence bitmap. Always succeeds as long as the flash
/// port itself is functional: any unrecognized header is handled by the
/// safe fallback of reformatting, which only discards already-indeterminate
/// data.
pub fn recover<F: FlashPort>(flash: &mut F, cfg: &ValidatedConfig) -> Result<(Cursor, Bitmap), Error> {
    let geometry = cfg.get();
    let page_size = geometry.page_size;
    let page_count = geometry.page_count as usize;
    debug_assert!(page_count <= MAX_PAGES);

    let mut active: [bool; MAX_PAGES] = [false; MAX_PAGES];

    for idx in 0..page_count {
        let page_base = cfg.page_base(idx as u8);
        match read_status(flash, page_base) {
            PageStatus::Receiving => {
                // Interrupted copy: abandon it. The source page (still
                // ACTIVE) retains every value that was ever committed.
                page::format_page(flash, page_base).map_err(Error::Write)?;
            }
            PageStatus::Erased => {
                if !page::is_properly_formatted(flash, page_base, page_size) {
                    page::format_page(flash, page_base).map_err(Error::Write)?;
                }
            }
            PageStatus::Active => {
                active[idx] = true;
            }
            PageStatus::Corrupt => {
                page::format_page(flash, page_base).map_err(Error::Write)?;
            }
        }
    }

    let winner = elect_active(flash, cfg, &active, page_count)?;

    let winner_base = cfg.page_base(winner);
    let tail = record::find_tail(flash, winner_base, page_size);

    let mut bitmap = Bitmap::new(cfg.bitmap_size());
    record::scan_records(flash, winner_base, tail, |_offset, addr, _value| {
        if addr < geometry.ee_size {
            bitmap.set(addr);
        }
        core::ops::ControlFlow::<()>::Continue(())
    });

    Ok((
        Cursor {
            idx: winner,
            base_addr: winner_base,
            tail,
        },
        bitmap,
    ))
}

/// Resolve zero, one, or several ACTIVE pages down to exactly one,
/// reformatting every loser along the way.
fn elect_active<F: FlashPort>(
    flash: &mut F,
    cfg: &ValidatedConfig,
    active: &[bool; MAX_PAGES],
    page_count: usize,
) -> Result<u8, Error> {
    let geometry = cfg.get();
    let page_size = geometry.page_size;

    let found: usize = active[..page_count].iter().filter(|b| **b).count();
    if found == 0 {
        // First-ever boot (or every page was corrupt): promote page 0.
        page::mark_active(flash, cfg.page_base(0)).map_err(Error::Write)?;
        return Ok(0);
    }

    if found == 1 {
        let idx = active[..page_count].iter().position(|b| *b).unwrap() as u8;
        return Ok(idx);
    }

    // Multiple ACTIVE pages: keep the first non-full one (the destination
    // of a compaction whose commit landed but whose source was not yet
    // retired); if every candidate is full, keep the lowest-indexed one.
    let mut winner: Option<u8> = None;
    for idx in 0..page_count {
        if !active[idx] {
            continue;
        }
        let base = cfg.page_base(idx as u8);
        if !is_full(flash, base, page_size) {
            winner = Some(idx as u8);
            break;
        }
    }
    let winner = winner.unwrap_or_else(|| {
        active[..page_count].iter().position(|b| *b).unwrap() as u8
    });

    for idx in 0..page_count {
        if active[idx] && idx as u8 != winner {
            page::format_page(flash, cfg.page_base(idx as u8)).map_err(Error::Write)?;
        }
    }
    Ok(winner)
}
