//! The in-RAM active-page cursor: which page is active, its base address,
//! and the append offset within it.

/// Invariant: `EE_TAG_SIZE <= tail <= page_size` and `tail` sits at an
/// `EE_VARIABLE_SIZE`-aligned offset from `EE_TAG_SIZE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    /// Index of the active page within the emulation region, `[0, FL_PAGES)`.
    pub idx: u8,
    /// Flash address of the first byte of the active page.
    pub base_addr: u32,
    /// Byte offset within the active page of the next record slot.
    pub tail: u32,
}
