//! Trailer geometry.
//!
//! Pure arithmetic over the flash write alignment. The trailer grows from
//! the end of a slot backward: magic, swap_size, image_ok, copy_done,
//! swap-info, then (on encrypting builds) the two key slots, with the swap
//! status entries below. Every cell starts at a multiple of the write
//! alignment so it can be written in a single aligned operation.

use crate::magic::MAGIC_SZ;

/// Markers recorded per sector-pair operation: pre-swap, post-move and
/// post-copy.
pub const STATUS_STATE_COUNT: u32 = 3;

/// Largest number of sector-pair operations a single swap can take; bounds
/// the status area.
pub const STATUS_MAX_ENTRIES: u32 = 128;

/// Round `x` up to the next multiple of `align` (a power of two).
pub const fn align_up(x: u32, align: u32) -> u32 {
    (x + align - 1) & !(align - 1)
}

/// Bytes the magic field occupies, padded to the write alignment.
pub const fn magic_align(min_write_sz: u32) -> u32 {
    align_up(MAGIC_SZ as u32, min_write_sz)
}

/// Bytes one aux field cell (swap_size, image_ok, copy_done, swap-info)
/// occupies.
pub const fn max_align(min_write_sz: u32) -> u32 {
    if min_write_sz > 8 {
        min_write_sz
    } else {
        8
    }
}

/// Bytes one encryption key slot occupies, padded to the write alignment.
#[cfg(feature = "enc-images")]
pub const fn enc_align(min_write_sz: u32) -> u32 {
    align_up(crate::enc::ENC_SLOT_SZ as u32, min_write_sz)
}

/// Space used for the swap bookkeeping fields themselves, excluding the
/// sector-by-sector progress entries.
pub const fn trailer_info_sz(min_write_sz: u32) -> u32 {
    #[cfg(feature = "enc-images")]
    let enc = 2 * enc_align(min_write_sz);
    #[cfg(not(feature = "enc-images"))]
    let enc = 0;

    enc + 4 * max_align(min_write_sz) + magic_align(min_write_sz)
}

/// Space used to record the progress of a single sector-pair operation.
pub const fn status_entry_sz(min_write_sz: u32) -> u32 {
    STATUS_STATE_COUNT * min_write_sz
}

/// Space used for the full set of progress entries.
pub const fn status_sz(min_write_sz: u32) -> u32 {
    STATUS_MAX_ENTRIES * status_entry_sz(min_write_sz)
}

/// Total trailer size at the tail of a slot.
pub const fn trailer_sz(min_write_sz: u32) -> u32 {
    status_sz(min_write_sz) + trailer_info_sz(min_write_sz)
}

/// Trailer size in the scratch area.
///
/// Scratch only holds status while the last sector pair of the slots is
/// swapped, so a single entry's worth of progress suffices.
#[cfg(feature = "swap-using-scratch")]
pub const fn scratch_trailer_sz(min_write_sz: u32) -> u32 {
    status_entry_sz(min_write_sz) + trailer_info_sz(min_write_sz)
}

/// Offset of the magic in an area of `area_size` bytes.
///
/// The magic is the last field written in any durable transition; a valid
/// magic vouches for every field below it.
pub const fn magic_off(area_size: u32, min_write_sz: u32) -> u32 {
    area_size - magic_align(min_write_sz)
}

/// Offset of the swap-size field.
pub const fn swap_size_off(area_size: u32, min_write_sz: u32) -> u32 {
    magic_off(area_size, min_write_sz) - max_align(min_write_sz)
}

/// Offset of the image-ok flag.
pub const fn image_ok_off(area_size: u32, min_write_sz: u32) -> u32 {
    swap_size_off(area_size, min_write_sz) - max_align(min_write_sz)
}

/// Offset of the copy-done flag.
pub const fn copy_done_off(area_size: u32, min_write_sz: u32) -> u32 {
    image_ok_off(area_size, min_write_sz) - max_align(min_write_sz)
}

/// Offset of the swap-info cell.
pub const fn swap_info_off(area_size: u32, min_write_sz: u32) -> u32 {
    copy_done_off(area_size, min_write_sz) - max_align(min_write_sz)
}

/// Offset of encryption key slot `slot`, directly below the aux fields.
#[cfg(feature = "enc-images")]
pub const fn enc_key_off(area_size: u32, min_write_sz: u32, slot: u8) -> u32 {
    swap_info_off(area_size, min_write_sz) - (slot as u32 + 1) * enc_align(min_write_sz)
}
