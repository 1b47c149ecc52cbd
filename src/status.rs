//! Locating the live swap record after a reset.

use crate::{
    flash::{AreaId, FlashArea, FlashMap},
    layout, log,
    magic::MagicState,
    trailer, Error,
};

/// Offset of the swap status region in `fap`.
pub fn status_off(fap: &impl FlashArea) -> u32 {
    let elem_sz = fap.align();

    #[cfg(feature = "swap-using-scratch")]
    let off_from_end = if fap.id() == AreaId::Scratch {
        layout::scratch_trailer_sz(elem_sz)
    } else {
        layout::trailer_sz(elem_sz)
    };
    #[cfg(not(feature = "swap-using-scratch"))]
    let off_from_end = layout::trailer_sz(elem_sz);

    debug_assert!(off_from_end <= fap.size());
    fap.size() - off_from_end
}

/// Number of progress entries `fap` holds for image `image_index`: a single
/// sector-pair's worth of markers on scratch, the full set on the image's
/// own slots.
pub fn status_entries(image_index: u8, fap: &impl FlashArea) -> Result<u32, Error> {
    match fap.id() {
        #[cfg(feature = "swap-using-scratch")]
        AreaId::Scratch => Ok(layout::STATUS_STATE_COUNT),
        AreaId::Primary(idx) | AreaId::Secondary(idx) if idx == image_index => {
            Ok(layout::STATUS_STATE_COUNT * layout::STATUS_MAX_ENTRIES)
        }
        _ => Err(Error::InvalidArea),
    }
}

/// Locate the area holding the live swap record of image `image_index`
/// after an aborted swap.
///
/// In the middle of a swap the valid magic lives on scratch or on the
/// primary slot; both end up as temporary storage while the swap advances,
/// and the magic is written last, so a good magic vouches for the rest of
/// the record. The secondary slot never holds it and is not probed.
///
/// On success the returned handle stays open; closing it is the caller's
/// duty. On every failure path each probed handle is closed again.
pub fn find_status<M: FlashMap>(map: &M, image_index: u8) -> Result<M::Area, Error> {
    #[cfg(feature = "swap-using-scratch")]
    let areas = [AreaId::Scratch, AreaId::Primary(image_index)];
    #[cfg(not(feature = "swap-using-scratch"))]
    let areas = [AreaId::Primary(image_index)];

    for id in areas {
        let mut fap = map.open(id)?;
        if trailer::read_magic(&mut fap)? == MagicState::Good {
            return Ok(fap);
        }
    }

    log::debug!("no swap status found; image={}", image_index);
    Err(Error::NotFound)
}
