//! Per-slot encryption key material co-resident with the trailer.
//!
//! Two entries, indexed by slot, sit directly below the swap-info cell.
//! Depending on the build either the wrapped key itself is stored, or the
//! whole key TLV, which is handed to the external unwrap routine on read.

use crate::{flash::FlashArea, layout, log, trailer, Error};

/// Length of a wrapped image-encryption key.
pub const ENC_KEY_LEN: usize = 16;

/// Length of the full encrypted-key TLV.
pub const ENC_TLV_LEN: usize = 48;

/// Bytes one key slot stores before alignment padding.
#[cfg(feature = "swap-save-enctlv")]
pub const ENC_SLOT_SZ: usize = ENC_TLV_LEN;
#[cfg(not(feature = "swap-save-enctlv"))]
pub const ENC_SLOT_SZ: usize = ENC_KEY_LEN;

/// External key-unwrap routine (consumed).
///
/// Only invoked for TLV material that is not fully erased.
pub trait KeyUnwrap {
    fn unwrap(&mut self, tlv: &[u8; ENC_TLV_LEN]) -> Result<[u8; ENC_KEY_LEN], Error>;
}

/// Key material carried in the boot status while a swap runs.
///
/// Slots whose on-flash entry was erased keep their previous contents; a
/// fresh status starts out with every byte at 0xff.
#[derive(Clone, Debug)]
pub struct EncStatus {
    pub keys: [[u8; ENC_KEY_LEN]; 2],
    #[cfg(feature = "swap-save-enctlv")]
    pub tlvs: [[u8; ENC_TLV_LEN]; 2],
}

impl EncStatus {
    pub const fn new() -> Self {
        Self {
            keys: [[0xff; ENC_KEY_LEN]; 2],
            #[cfg(feature = "swap-save-enctlv")]
            tlvs: [[0xff; ENC_TLV_LEN]; 2],
        }
    }
}

impl Default for EncStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// Offset of key slot `slot` in `fap`.
pub fn enc_key_off(fap: &impl FlashArea, slot: u8) -> u32 {
    layout::enc_key_off(fap.size(), fap.align(), slot)
}

/// Read the key material of `slot` into `status`.
///
/// A fully-erased TLV means no key was saved for the slot; the unwrap
/// routine is skipped and `status.keys[slot]` stays untouched.
#[cfg(feature = "swap-save-enctlv")]
pub fn read_enc_key(
    fap: &mut impl FlashArea,
    slot: u8,
    status: &mut EncStatus,
    unwrap: &mut impl KeyUnwrap,
) -> Result<(), Error> {
    let off = enc_key_off(fap, slot);
    let mut tlv = [0u8; ENC_TLV_LEN];
    fap.read(off, &mut tlv)?;

    let erased_val = fap.erased_val();
    if tlv.iter().any(|b| *b != erased_val) {
        status.keys[slot as usize] = unwrap.unwrap(&tlv)?;
    }
    status.tlvs[slot as usize] = tlv;
    Ok(())
}

/// Read the wrapped key of `slot` into `status`.
#[cfg(not(feature = "swap-save-enctlv"))]
pub fn read_enc_key(
    fap: &mut impl FlashArea,
    slot: u8,
    status: &mut EncStatus,
) -> Result<(), Error> {
    let off = enc_key_off(fap, slot);
    fap.read(off, &mut status.keys[slot as usize])
}

/// Write the key material of `slot` from `status`.
pub fn write_enc_key(
    fap: &mut impl FlashArea,
    slot: u8,
    status: &EncStatus,
) -> Result<(), Error> {
    let off = enc_key_off(fap, slot);
    log::debug!("writing enc_key; slot={} off={:#x}", slot, off);

    #[cfg(feature = "swap-save-enctlv")]
    let payload = &status.tlvs[slot as usize][..];
    #[cfg(not(feature = "swap-save-enctlv"))]
    let payload = &status.keys[slot as usize][..];

    trailer::write_trailer_field(fap, off, payload)
}
