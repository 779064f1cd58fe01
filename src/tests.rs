//! Tests for the public API and the crash-recovery machinery behind it.
//! Grounded in the `#[cfg(test)] mod tests` convention declared (but never
//! checked in) by `idubrov-x2-feed`'s `crates/eeprom/src/lib.rs`, and in
//! the fake-flash-as-`Vec<u8>` style used by the `idubrov-eeprom` lineage's
//! own `do_erase_page` test double. Exercises the core correctness properties
//! (exactly one active page, read-after-write, overwrite keeps only the
//! latest value, crash safety during compaction and mid-write, erase-count
//! monotonicity and wear-leveling) and the end-to-end scenarios they imply.

use pretty_assertions::assert_eq;

use flash_port::mock::MockFlash;

use crate::config::EE_TAG_SIZE;
use crate::header;
use crate::{Config, Eeprom, Error};

/// `EE_SIZE=16, FL_PAGES=2, FL_PAGE_SIZE=1024` — a representative
/// production-sized geometry.
fn scenario_config() -> Config {
    Config {
        base_addr: 0,
        page_size: 1024,
        page_count: 2,
        lock_page: 1024 * 2,
        ee_size: 16,
    }
}

fn scenario_flash() -> MockFlash {
    let cfg = scenario_config();
    MockFlash::new(cfg.page_size * cfg.page_count as u32, cfg.page_size)
}

/// Small geometry used where a test wants to fill a page in a handful of
/// writes. `K = (page_size - EE_TAG_SIZE) / EE_VARIABLE_SIZE = 10`.
fn small_config() -> Config {
    Config {
        base_addr: 0,
        page_size: 24,
        page_count: 2,
        lock_page: 24 * 2,
        ee_size: 8,
    }
}

fn small_flash() -> MockFlash {
    let cfg = small_config();
    MockFlash::new(cfg.page_size * cfg.page_count as u32, cfg.page_size)
}

// --- Config validation -----------------------------------------------------

#[test]
fn rejects_too_few_pages() {
    let mut cfg = scenario_config();
    cfg.page_count = 1;
    assert_eq!(
        Err(crate::ConfigError::TooFewPages),
        cfg.validate().map(|_| ())
    );
}

#[test]
fn rejects_unaligned_base() {
    let mut cfg = scenario_config();
    cfg.base_addr = 1;
    assert_eq!(
        Err(crate::ConfigError::BaseNotPageAligned),
        cfg.validate().map(|_| ())
    );
}

#[test]
fn rejects_region_overlapping_lock_page() {
    let mut cfg = scenario_config();
    cfg.lock_page = cfg.page_size; // only room for one page
    assert_eq!(
        Err(crate::ConfigError::RegionOverlapsLockPage),
        cfg.validate().map(|_| ())
    );
}

#[test]
fn rejects_ee_size_not_multiple_of_8() {
    let mut cfg = scenario_config();
    cfg.ee_size = 15;
    assert_eq!(
        Err(crate::ConfigError::EeSizeNotMultipleOf8),
        cfg.validate().map(|_| ())
    );
}

#[test]
fn rejects_ee_size_too_large_for_page() {
    let mut cfg = scenario_config();
    cfg.page_size = 16; // K = (16-4)/2 = 6 < 16
    assert_eq!(
        Err(crate::ConfigError::EeSizeTooLarge),
        cfg.validate().map(|_| ())
    );
}

#[test]
fn rejects_ee_size_equal_to_page_capacity() {
    // K = (52-4)/2 = 24. ee_size == K would let a fully-live page overflow
    // the successor during compact-then-append (compaction copies all 24
    // live records, then the triggering write needs a 25th slot), so only
    // ee_size <= K-1 may validate.
    let mut cfg = small_config();
    cfg.page_size = 52;
    cfg.lock_page = 52 * 2;

    cfg.ee_size = 24; // == K
    assert_eq!(
        Err(crate::ConfigError::EeSizeTooLarge),
        cfg.validate().map(|_| ())
    );

    cfg.ee_size = 16; // comfortably <= K-1
    assert!(cfg.validate().is_ok());
}

// --- Scenario 1: fresh init --------------------------------------------------

#[test]
fn fresh_init_reads_all_ff_and_elects_one_active_page() {
    let flash = scenario_flash();
    let cfg = scenario_config();
    let eeprom = Eeprom::init(flash, cfg).expect("init");

    for addr in 0..cfg.ee_size {
        assert_eq!(0xFF, eeprom.read_byte(addr).unwrap());
    }

    // Exactly one page ACTIVE, counter 0x000001 (P1).
    let mut active_count = 0;
    for idx in 0..cfg.page_count {
        let base = idx as u32 * cfg.page_size;
        if header::read_status(&eeprom.flash, base) == header::PageStatus::Active {
            active_count += 1;
            assert_eq!(1, header::read_erase_count(&eeprom.flash, base));
        }
    }
    assert_eq!(1, active_count);
}

// --- Scenario 2: basic write/read -------------------------------------------

#[test]
fn basic_write_read() {
    let flash = scenario_flash();
    let cfg = scenario_config();
    let mut eeprom = Eeprom::init(flash, cfg).unwrap();

    eeprom.write_byte(0, 0x55).unwrap();
    eeprom.write_byte(1, 0x56).unwrap();

    assert_eq!(0x55, eeprom.read_byte(0).unwrap());
    assert_eq!(0x56, eeprom.read_byte(1).unwrap());
    assert_eq!(0xFF, eeprom.read_byte(2).unwrap());
}

// --- Scenario 3: overwrite keeps latest -------------------------------------

#[test]
fn overwrite_keeps_latest_value_and_keeps_all_records() {
    let flash = scenario_flash();
    let cfg = scenario_config();
    let mut eeprom = Eeprom::init(flash, cfg).unwrap();

    eeprom.write_byte(0, 0x11).unwrap();
    eeprom.write_byte(0, 0x22).unwrap();
    eeprom.write_byte(0, 0x33).unwrap();

    assert_eq!(0x33, eeprom.read_byte(0).unwrap());

    // Exactly three records with address 0 exist in the active page: old
    // records for an overwritten address are not erased mid-page, only
    // superseded by scan order.
    let base = eeprom.cursor.base_addr;
    let mut count = 0;
    let mut offset = EE_TAG_SIZE;
    while offset < eeprom.cursor.tail {
        if eeprom.flash.read_byte(base + offset) == 0 {
            count += 1;
        }
        offset += 2;
    }
    assert_eq!(3, count);
}

// --- Scenario 4: compaction trigger (small geometry, K = 10) ---------------

#[test]
fn compaction_dedups_and_appends_triggering_write() {
    let flash = small_flash();
    let cfg = small_config();
    let mut eeprom = Eeprom::init(flash, cfg).unwrap();

    let page0_base = eeprom.cursor.base_addr;
    assert_eq!(1, header::read_erase_count(&eeprom.flash, page0_base));

    // 9 writes to address 0, then 1 write to address 1: exactly K=10
    // appends, filling the page without yet triggering compaction.
    for v in 0..9u8 {
        eeprom.write_byte(0, v).unwrap();
    }
    eeprom.write_byte(1, 0xAA).unwrap();
    assert_eq!(cfg.page_size, eeprom.cursor.tail);
    assert_eq!(0, eeprom.cursor.idx);

    // This write finds the page full and compacts first.
    eeprom.write_byte(2, 0xBB).unwrap();

    assert_eq!(1, eeprom.cursor.idx);
    assert_eq!(8, eeprom.read_byte(0).unwrap());
    assert_eq!(0xAA, eeprom.read_byte(1).unwrap());
    assert_eq!(0xBB, eeprom.read_byte(2).unwrap());

    // New active page holds exactly 3 live records.
    assert_eq!(EE_TAG_SIZE + 3 * 2, eeprom.cursor.tail);

    // The retired page is ERASED with its erase counter incremented.
    assert_eq!(
        header::PageStatus::Erased,
        header::read_status(&eeprom.flash, page0_base)
    );
    assert_eq!(2, header::read_erase_count(&eeprom.flash, page0_base));
}

// --- Scenario 5: crash during compaction (RECEIVING) ------------------------

#[test]
fn recovers_from_crash_after_receiving_marker_before_commit() {
    let flash = small_flash();
    let cfg = small_config();
    let mut eeprom = Eeprom::init(flash, cfg).unwrap();

    for v in 0..9u8 {
        eeprom.write_byte(0, v).unwrap();
    }
    eeprom.write_byte(1, 0xAA).unwrap();
    assert_eq!(cfg.page_size, eeprom.cursor.tail); // page 0 now full

    // Simulate compaction starting (page::ensure_formatted + mark_receiving
    // on the successor) then losing power before the commit to ACTIVE.
    let dest_base = cfg.page_size; // page 1
    crate::page::mark_receiving(&mut eeprom.flash, dest_base).unwrap();

    let bytes = eeprom.flash.bytes().to_vec();
    let crashed_flash = MockFlash::from_bytes(bytes, cfg.page_size);

    let recovered = Eeprom::init(crashed_flash, cfg).expect("recovery must succeed");

    // Destination was reformatted; source page remains ACTIVE with all
    // prior values intact.
    assert_eq!(0, recovered.cursor.idx);
    assert_eq!(8, recovered.read_byte(0).unwrap());
    assert_eq!(0xAA, recovered.read_byte(1).unwrap());
    assert_eq!(
        header::PageStatus::Erased,
        header::read_status(&recovered.flash, dest_base)
    );
}

// --- Scenario 6: crash mid-write --------------------------------------------

#[test]
fn crash_mid_write_leaves_value_as_if_never_written() {
    let flash = small_flash();
    let cfg = small_config();
    let mut eeprom = Eeprom::init(flash, cfg).unwrap();

    // `addr = 3` has never been written. Program only the address byte of
    // the next record, simulating power loss before the value byte lands.
    let tail = eeprom.cursor.tail;
    let base = eeprom.cursor.base_addr;
    eeprom.flash.write_byte(base + tail, 3).unwrap();

    let bytes = eeprom.flash.bytes().to_vec();
    let crashed_flash = MockFlash::from_bytes(bytes, cfg.page_size);
    let recovered = Eeprom::init(crashed_flash, cfg).expect("recovery must succeed");

    assert_eq!(0xFF, recovered.read_byte(3).unwrap());
}

// --- Bad address handling ---------------------------------------------------

#[test]
fn rejects_out_of_range_address() {
    let flash = scenario_flash();
    let cfg = scenario_config();
    let mut eeprom = Eeprom::init(flash, cfg).unwrap();

    assert_eq!(Err(Error::BadAddress), eeprom.write_byte(cfg.ee_size, 1));
    assert_eq!(Err(Error::BadAddress), eeprom.read_byte(cfg.ee_size));
}

#[test]
fn block_operations_bounds_check_before_touching_flash() {
    let flash = scenario_flash();
    let cfg = scenario_config();
    let mut eeprom = Eeprom::init(flash, cfg).unwrap();

    let buf = [1u8, 2, 3];
    assert_eq!(
        Err(Error::BadAddress),
        eeprom.write_block(cfg.ee_size - 1, &buf)
    );

    eeprom.write_block(0, &buf).unwrap();
    let mut out = [0u8; 3];
    eeprom.read_block(0, &mut out).unwrap();
    assert_eq!(buf, out);
}

// --- P5/P6: erase counter monotonicity and rotation bound -------------------

#[test]
fn erase_counters_never_decrease_and_stay_bounded_across_many_writes() {
    let flash = small_flash();
    let cfg = small_config();
    let mut eeprom = Eeprom::init(flash, cfg).unwrap();

    let k = (cfg.page_size - EE_TAG_SIZE) / 2; // records per page
    let mut last_counts = [0u32; 2];

    let total_writes = k * 6; // force several rotations
    for n in 0..total_writes {
        eeprom.write_byte((n % cfg.ee_size as u32) as u8, n as u8).unwrap();

        for idx in 0..cfg.page_count {
            let base = idx as u32 * cfg.page_size;
            let count = header::read_erase_count(&eeprom.flash, base);
            assert!(count >= last_counts[idx as usize], "erase counter decreased");
            last_counts[idx as usize] = count;
        }
    }

    // After any compaction at most `ee_size` records survive, so at least
    // `k - ee_size` further writes are needed before the next one; no page's
    // erase counter can exceed 1 + the total number of compactions that can
    // possibly fit in `total_writes` writes at that minimum cadence.
    let gap = k - cfg.ee_size as u32;
    let max_count = last_counts.iter().copied().max().unwrap();
    let bound = 1 + (total_writes + gap - 1) / gap;
    assert!(
        max_count <= bound,
        "max erase counter {} exceeds rotation bound {}",
        max_count,
        bound
    );
}

#[test]
fn read_of_untouched_address_is_ff_across_reinit() {
    let flash = scenario_flash();
    let cfg = scenario_config();
    let eeprom = Eeprom::init(flash, cfg).unwrap();
    let bytes = eeprom.flash.bytes().to_vec();
    drop(eeprom);

    let reopened = MockFlash::from_bytes(bytes, cfg.page_size);
    let eeprom = Eeprom::init(reopened, cfg).unwrap();
    for addr in 0..cfg.ee_size {
        assert_eq!(0xFF, eeprom.read_byte(addr).unwrap());
    }
}
