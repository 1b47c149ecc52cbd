//! Typed access to the individual trailer fields.
//!
//! Within one swap milestone the writer records status entries first, then
//! the aux fields, then the magic; a reader that finds a good magic may
//! trust everything below it, and any prefix of that sequence is a legal
//! post-reset state. Each field is written in a single operation at the
//! area's write alignment, padded with the erased value so the surrounding
//! cells stay untouched.

use crate::{
    flash::FlashArea,
    layout, log,
    magic::{self, MagicState},
    Error,
};

/// Offset of the magic in `fap`.
pub fn magic_off(fap: &impl FlashArea) -> u32 {
    layout::magic_off(fap.size(), fap.align())
}

/// Offset of the swap-size field in `fap`.
pub fn swap_size_off(fap: &impl FlashArea) -> u32 {
    layout::swap_size_off(fap.size(), fap.align())
}

/// Offset of the image-ok flag in `fap`.
pub fn image_ok_off(fap: &impl FlashArea) -> u32 {
    layout::image_ok_off(fap.size(), fap.align())
}

/// Offset of the copy-done flag in `fap`.
pub fn copy_done_off(fap: &impl FlashArea) -> u32 {
    layout::copy_done_off(fap.size(), fap.align())
}

/// Offset of the swap-info cell in `fap`.
pub fn swap_info_off(fap: &impl FlashArea) -> u32 {
    layout::swap_info_off(fap.size(), fap.align())
}

/// Intent recorded in the swap-info cell before a swap begins.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum SwapType {
    /// No upgrade requested.
    None,
    /// Swap to the staged image; revert unless the new image confirms.
    Test,
    /// Swap to the staged image permanently.
    Perm,
    /// Swap back to the previous image.
    Revert,
    /// The previous swap attempt failed.
    Fail,
}

impl SwapType {
    pub const fn to_byte(self) -> u8 {
        match self {
            SwapType::None => 1,
            SwapType::Test => 2,
            SwapType::Perm => 3,
            SwapType::Revert => 4,
            SwapType::Fail => 5,
        }
    }

    /// Anything unrecognized, including an erased cell, reads as `None`.
    pub const fn from_byte(v: u8) -> SwapType {
        match v {
            2 => SwapType::Test,
            3 => SwapType::Perm,
            4 => SwapType::Revert,
            5 => SwapType::Fail,
            _ => SwapType::None,
        }
    }
}

/// Pack a swap-info byte: swap type in the low nibble, image number in the
/// high nibble.
pub const fn swap_info_pack(swap_type: SwapType, image_num: u8) -> u8 {
    (image_num << 4) | (swap_type.to_byte() & 0x0f)
}

/// Split a swap-info byte into swap type and image number.
pub const fn swap_info_unpack(swap_info: u8) -> (SwapType, u8) {
    (SwapType::from_byte(swap_info & 0x0f), swap_info >> 4)
}

/// State of a single-byte trailer flag (copy-done, image-ok).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub enum Flag {
    Set,
    Unset,
    Bad,
}

impl Flag {
    /// The one byte value meaning "flag set".
    pub const SET: u8 = 0x01;

    /// Classify a flag byte against the device's erased value.
    pub const fn decode(v: u8, erased_val: u8) -> Flag {
        if v == Flag::SET {
            Flag::Set
        } else if v == erased_val {
            Flag::Unset
        } else {
            Flag::Bad
        }
    }
}

/// Everything the trailer records about an in-progress swap.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "use-defmt", derive(defmt::Format))]
pub struct SwapState {
    pub magic: MagicState,
    pub swap_type: SwapType,
    pub image_num: u8,
    pub copy_done: Flag,
    pub image_ok: Flag,
}

/// Bounds the stack buffer used to pad field payloads up to the write
/// alignment; covers write units up to 32 bytes for every field.
const FIELD_BUF_SZ: usize = 64;

/// Write `payload` at `off`, padded up to the write alignment with the
/// erased value so the whole cell is written in one aligned operation.
pub fn write_trailer_field(
    fap: &mut impl FlashArea,
    off: u32,
    payload: &[u8],
) -> Result<(), Error> {
    let len = layout::align_up(payload.len() as u32, fap.align()) as usize;
    if len > FIELD_BUF_SZ {
        return Err(Error::Geometry);
    }
    let mut buf = [0u8; FIELD_BUF_SZ];
    buf[..payload.len()].copy_from_slice(payload);
    buf[payload.len()..len].fill(fap.erased_val());
    fap.write(off, &buf[..len])
}

/// Read and classify the trailer magic of `fap`.
pub fn read_magic(fap: &mut impl FlashArea) -> Result<MagicState, Error> {
    let off = magic_off(fap);
    let mut buf = [0u8; magic::MAGIC_SZ];
    fap.read(off, &mut buf)?;
    Ok(magic::decode(&buf, fap.erased_val()))
}

/// Write the trailer magic, zero-padded up to its aligned cell.
///
/// The last write of any durable state transition.
pub fn write_magic(fap: &mut impl FlashArea) -> Result<(), Error> {
    let off = magic_off(fap);
    log::debug!(
        "writing magic; slot={} off={:#x}",
        crate::current_slot(),
        off
    );
    let len = layout::magic_align(fap.align()) as usize;
    if len > FIELD_BUF_SZ {
        return Err(Error::Geometry);
    }
    let mut buf = [0u8; FIELD_BUF_SZ];
    buf[..magic::MAGIC_SZ].copy_from_slice(&magic::MAGIC);
    fap.write(off, &buf[..len])
}

/// Read the staged image size recorded for the swap.
pub fn read_swap_size(fap: &mut impl FlashArea) -> Result<u32, Error> {
    let off = swap_size_off(fap);
    let mut buf = [0u8; 4];
    fap.read(off, &mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Record the staged image size for the swap.
pub fn write_swap_size(fap: &mut impl FlashArea, swap_size: u32) -> Result<(), Error> {
    let off = swap_size_off(fap);
    log::debug!("writing swap_size; off={:#x}", off);
    write_trailer_field(fap, off, &swap_size.to_le_bytes())
}

/// Read the image-ok flag.
pub fn read_image_ok(fap: &mut impl FlashArea) -> Result<Flag, Error> {
    let off = image_ok_off(fap);
    read_flag(fap, off)
}

/// Set the image-ok flag: the new image confirmed itself, no revert.
pub fn write_image_ok(fap: &mut impl FlashArea) -> Result<(), Error> {
    let off = image_ok_off(fap);
    log::debug!("writing image_ok; off={:#x}", off);
    write_trailer_field(fap, off, &[Flag::SET])
}

/// Read the copy-done flag.
pub fn read_copy_done(fap: &mut impl FlashArea) -> Result<Flag, Error> {
    let off = copy_done_off(fap);
    read_flag(fap, off)
}

/// Set the copy-done flag: the swap itself finished.
pub fn write_copy_done(fap: &mut impl FlashArea) -> Result<(), Error> {
    let off = copy_done_off(fap);
    log::debug!("writing copy_done; off={:#x}", off);
    write_trailer_field(fap, off, &[Flag::SET])
}

/// Read the swap-info cell: upgrade intent plus image number.
///
/// An erased cell reads as ([`SwapType::None`], 0).
pub fn read_swap_info(fap: &mut impl FlashArea) -> Result<(SwapType, u8), Error> {
    let off = swap_info_off(fap);
    let mut buf = [0u8; 1];
    fap.read(off, &mut buf)?;
    if buf[0] == fap.erased_val() {
        return Ok((SwapType::None, 0));
    }
    Ok(swap_info_unpack(buf[0]))
}

/// Record the upgrade intent and image number.
pub fn write_swap_info(
    fap: &mut impl FlashArea,
    swap_type: SwapType,
    image_num: u8,
) -> Result<(), Error> {
    let off = swap_info_off(fap);
    log::debug!(
        "writing swap_info; off={:#x} swap_type={} image_num={}",
        off,
        swap_type.to_byte(),
        image_num
    );
    write_trailer_field(fap, off, &[swap_info_pack(swap_type, image_num)])
}

/// Read the whole swap record of `fap` in one pass.
///
/// A reset may have interrupted the writer anywhere, so callers must trust
/// the aux fields only when `magic` is [`MagicState::Good`].
pub fn read_swap_state(fap: &mut impl FlashArea) -> Result<SwapState, Error> {
    let magic = read_magic(fap)?;
    let (swap_type, image_num) = read_swap_info(fap)?;
    let copy_done = read_copy_done(fap)?;
    let image_ok = read_image_ok(fap)?;
    Ok(SwapState {
        magic,
        swap_type,
        image_num,
        copy_done,
        image_ok,
    })
}

fn read_flag(fap: &mut impl FlashArea, off: u32) -> Result<Flag, Error> {
    let mut buf = [0u8; 1];
    fap.read(off, &mut buf)?;
    Ok(Flag::decode(buf[0], fap.erased_val()))
}
