//! Upgrade strategies and the largest image each allows in a slot.
//!
//! Strategies differ only in how much of a slot the firmware payload may
//! use: the bookkeeping at the tail claims whole sectors, and a
//! scratch-mediated swap additionally needs the last sector pair's state to
//! fit into a single scratch sector. Every other trailer operation is
//! strategy-agnostic, so the strategy is a plain tag dispatched by `match`.

use crate::{flash::FlashArea, log, status, trailer, Error};

#[cfg(feature = "swap-using-scratch")]
use crate::layout;

/// Slot activation strategy the outer loader was built for.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Strategy {
    /// Three-way swap through a scratch partition.
    #[cfg(feature = "swap-using-scratch")]
    ScratchSwap,
    /// Swap by moving the primary down one sector; no scratch.
    MoveSwap,
    /// The staged image simply overwrites the primary.
    Overwrite,
    /// Execute the image from the slot it was staged to.
    DirectXip,
    /// Copy the image to RAM and run it there.
    RamLoad,
    /// One application slot, no upgrade state.
    SingleSlot,
    /// Recovery-loader configuration, no upgrade state.
    FirmwareLoader,
}

/// View of the outer loader's configuration the size oracle needs.
pub struct LoaderState<'a, A: FlashArea> {
    /// Largest write unit across the areas a swap touches; trailer cells
    /// are spaced at this alignment in every slot.
    pub write_sz: u32,
    /// Strategy the loader runs.
    pub strategy: Strategy,
    /// The image's slot pair, primary first. Only the scratch-swap arm
    /// consults these.
    pub slots: [&'a A; 2],
}

/// Index of the first sector of `fap` that holds any trailer byte.
///
/// Walks from the last sector toward lower addresses until the accumulated
/// size covers `trailer_sz`; sectors may differ in size.
pub fn first_trailer_sector(fap: &impl FlashArea, trailer_sz: u32) -> Result<usize, Error> {
    let mut sector = fap.sector_count().checked_sub(1).ok_or(Error::Geometry)?;
    let mut covered = fap.sector_at(sector)?.size;

    while covered < trailer_sz {
        sector = sector.checked_sub(1).ok_or(Error::Geometry)?;
        covered += fap.sector_at(sector)?.size;
    }

    Ok(sector)
}

#[cfg(feature = "swap-using-scratch")]
fn first_trailer_sector_end(fap: &impl FlashArea, trailer_sz: u32) -> Result<u32, Error> {
    let sector = first_trailer_sector(fap, trailer_sz)?;
    Ok(fap.sector_at(sector)?.end())
}

/// Exclusive upper bound on the firmware bytes that can be placed at the
/// start of `fap` while leaving the bookkeeping of `state`'s strategy room.
///
/// A failed sector lookup reports `0`: no image passes, and the failure
/// surfaces downstream as an image-too-large rejection instead of admitting
/// an image that would collide with the trailer.
pub fn max_image_size<A: FlashArea>(state: &LoaderState<'_, A>, fap: &A) -> u32 {
    match state.strategy {
        #[cfg(feature = "swap-using-scratch")]
        Strategy::ScratchSwap => scratch_max_image_size(state, fap),
        Strategy::MoveSwap => match fap.sector_containing(status::status_off(fap)) {
            Ok(sector) => sector.off,
            Err(_) => {
                log::error!("cannot determine the sector holding the trailer");
                0
            }
        },
        Strategy::Overwrite | Strategy::DirectXip | Strategy::RamLoad => {
            trailer::swap_info_off(fap)
        }
        Strategy::SingleSlot | Strategy::FirmwareLoader => status::status_off(fap),
    }
}

/// The scratch copy of the last sector pair's swap must hold one status
/// entry plus the info fields within a single scratch sector. When the
/// first sector carrying trailer bytes in either slot cannot accommodate
/// that much, the image is pushed down to make room.
#[cfg(feature = "swap-using-scratch")]
fn scratch_max_image_size<A: FlashArea>(state: &LoaderState<'_, A>, fap: &A) -> u32 {
    let slot_trailer_sz = layout::trailer_sz(state.write_sz);
    let slot_trailer_off = fap.size() - slot_trailer_sz;

    let [primary, secondary] = state.slots;
    let ends = (
        first_trailer_sector_end(primary, slot_trailer_sz),
        first_trailer_sector_end(secondary, slot_trailer_sz),
    );
    let (primary_end, secondary_end) = match ends {
        (Ok(p), Ok(s)) => (p, s),
        _ => {
            log::error!("cannot determine the sector holding the trailer");
            return 0;
        }
    };

    let trailer_in_first_sector = primary_end.max(secondary_end) - slot_trailer_off;

    let scratch_trailer_sz = layout::scratch_trailer_sz(state.write_sz);
    let trailer_padding = scratch_trailer_sz.saturating_sub(trailer_in_first_sector);

    slot_trailer_off - trailer_padding
}
